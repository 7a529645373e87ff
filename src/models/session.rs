use serde::{Deserialize, Serialize};

use super::role::Role;

/// Identity of the signed-in sender, as handed over by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub sender_id: String,
    pub sender_name: String,
    pub role: Role,
}
