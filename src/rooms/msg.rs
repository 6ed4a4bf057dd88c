use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Inbound {
    #[serde(rename = "Token", alias = "token")]
    pub token: String,
    #[serde(rename = "Content", alias = "content", default)]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outbound {
    pub login: String,
    pub content: String,
}
