//! Vehicle registry domain models.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The vehicle/company pair an ident resolves to.
///
/// Produced by the registry's bulk ident lookup; attached to every
/// telemetry record normalized from a message carrying that ident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryResolution {
    pub vehicle_id: Uuid,
    pub company_id: Uuid,
}
