use crate::domain_model::{RoleName, Username};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "lowercase")]
pub enum C2SCommand {
    WhoAmI,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "lowercase")]
pub enum S2CEvent {
    Identity(IdentitySummary),
    SessionEnded(SessionEnded),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IdentitySummary {
    pub username: Username,
    pub roles: Vec<RoleName>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionEnded {
    pub reason: String,
}
