//! Request payload shapes for the built-in commands.

use {
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetChatsRequest {
    /// Unix seconds. Zero or negative means every chat.
    #[serde(default)]
    pub min_timestamp: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetChatRequest {
    pub chat_guid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetContactRequest {
    pub user_guid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRecentMessagesRequest {
    pub chat_guid: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetMessagesAfterRequest {
    pub chat_guid: String,
    /// Unix seconds.
    pub timestamp: f64,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveIdentifierRequest {
    pub identifier: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveIdentifierResponse {
    pub guid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepareDmRequest {
    pub guid: String,
}

/// One-way log line forwarded between processes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRequest {
    pub level: String,
    #[serde(default)]
    pub module: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_fields_default() {
        let req: GetRecentMessagesRequest =
            serde_json::from_value(serde_json::json!({ "chat_guid": "iMessage;-;a@b.co" }))
                .unwrap();
        assert_eq!(req.limit, None);

        let req: GetChatsRequest = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(req.min_timestamp, 0.0);

        let req: LogRequest = serde_json::from_value(
            serde_json::json!({ "level": "WARN", "message": "hello" }),
        )
        .unwrap();
        assert!(req.module.is_empty());
        assert!(req.metadata.is_empty());
    }

    #[test]
    fn missing_required_field_fails() {
        let err = serde_json::from_value::<GetChatRequest>(serde_json::json!({ "guid": "x" }));
        assert!(err.is_err());
    }
}
