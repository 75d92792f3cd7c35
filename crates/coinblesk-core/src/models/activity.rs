use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Audit log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub creation_date: Option<DateTime<Utc>>,
}

/// Request from another server, e.g. to raise the trust level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub server_url: String,
    #[serde(default)]
    pub trust_level: Option<i32>,
    #[serde(default)]
    pub answered: bool,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub creation_date: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub answered_date: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_message() {
        let json = r#"{"id":1,"subject":"Upgrade","message":"please","serverUrl":"https://bank.example","trustLevel":2,"answered":false,"creationDate":1420070400000,"answeredDate":null}"#;
        let message: Message = serde_json::from_str(json).unwrap();
        assert_eq!(message.trust_level, Some(2));
        assert!(message.answered_date.is_none());
        assert!(message.creation_date.is_some());
    }
}
