use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    #[serde(default)]
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub payment_address: Option<String>,
    #[serde(default)]
    pub balance: Option<f64>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub creation_date: Option<DateTime<Utc>>,
}

impl UserAccount {
    pub fn display_email(&self) -> &str {
        self.email.as_deref().unwrap_or("-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_with_epoch_millis() {
        let json = r#"{"id":3,"username":"alice","email":"alice@example.com","creationDate":1420070400000,"password":null}"#;
        let user: UserAccount = serde_json::from_str(json).unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.display_email(), "alice@example.com");
        assert_eq!(user.creation_date.unwrap().format("%Y-%m-%d").to_string(), "2015-01-01");
    }

    #[test]
    fn test_deserialize_minimal() {
        let user: UserAccount = serde_json::from_str(r#"{"username":"bob"}"#).unwrap();
        assert_eq!(user.id, 0);
        assert!(user.creation_date.is_none());
        assert_eq!(user.display_email(), "-");
    }
}
