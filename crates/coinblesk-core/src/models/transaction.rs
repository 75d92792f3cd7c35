use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One transaction between this server and another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerTransaction {
    #[serde(default)]
    pub amount: f64,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub received: bool,
    #[serde(default)]
    pub server_url: Option<String>,
    #[serde(default, rename = "transactionID")]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub verified: bool,
}

impl ServerTransaction {
    /// Amount signed by direction: incoming positive, outgoing negative
    pub fn signed_amount(&self) -> f64 {
        if self.received {
            self.amount
        } else {
            -self.amount
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_history_entry() {
        let json = r#"{"amount":0.75,"timestamp":1420070400000,"received":false,"serverUrl":"https://bank.example","transactionID":"abc","verified":true}"#;
        let tx: ServerTransaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.transaction_id.as_deref(), Some("abc"));
        assert_eq!(tx.signed_amount(), -0.75);
        assert!(tx.verified);
    }
}
