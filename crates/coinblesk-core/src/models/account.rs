use std::fmt;

use serde::{Deserialize, Serialize};

/// How far this server trusts another one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum TrustLevel {
    NoTrust,
    HybridTrust,
    FullTrust,
}

impl From<i32> for TrustLevel {
    fn from(level: i32) -> Self {
        match level {
            i32::MIN..=0 => TrustLevel::NoTrust,
            1 => TrustLevel::HybridTrust,
            _ => TrustLevel::FullTrust,
        }
    }
}

impl From<TrustLevel> for i32 {
    fn from(level: TrustLevel) -> Self {
        match level {
            TrustLevel::NoTrust => 0,
            TrustLevel::HybridTrust => 1,
            TrustLevel::FullTrust => 2,
        }
    }
}

impl fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrustLevel::NoTrust => "No trust",
            TrustLevel::HybridTrust => "Hybrid trust",
            TrustLevel::FullTrust => "Full trust",
        };
        f.write_str(name)
    }
}

/// A trust relation with another CoinBlesk server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerAccount {
    #[serde(default)]
    pub id: i64,
    pub url: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub payin_address: Option<String>,
    #[serde(default)]
    pub payout_address: Option<String>,
    #[serde(default = "default_trust")]
    pub trust_level: TrustLevel,
    #[serde(default)]
    pub active_balance: f64,
    #[serde(default)]
    pub balance_limit: f64,
    #[serde(default)]
    pub user_balance_limit: f64,
    #[serde(default, rename = "nOfKeys")]
    pub n_of_keys: Option<i32>,
}

fn default_trust() -> TrustLevel {
    TrustLevel::NoTrust
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trust_level_from_wire() {
        assert_eq!(TrustLevel::from(0), TrustLevel::NoTrust);
        assert_eq!(TrustLevel::from(1), TrustLevel::HybridTrust);
        assert_eq!(TrustLevel::from(2), TrustLevel::FullTrust);
        assert_eq!(i32::from(TrustLevel::FullTrust), 2);
        assert!(TrustLevel::FullTrust > TrustLevel::HybridTrust);
    }

    #[test]
    fn test_deserialize_server_account() {
        let json = r#"{
            "id": 7,
            "url": "https://bank.example",
            "email": "ops@bank.example",
            "trustLevel": 1,
            "activeBalance": 0.5,
            "balanceLimit": 2.0,
            "userBalanceLimit": 0.25,
            "nOfKeys": 2
        }"#;
        let account: ServerAccount = serde_json::from_str(json).unwrap();
        assert_eq!(account.trust_level, TrustLevel::HybridTrust);
        assert_eq!(account.balance_limit, 2.0);
        assert_eq!(account.n_of_keys, Some(2));

        let back = serde_json::to_value(&account).unwrap();
        assert_eq!(back["trustLevel"], 1);
    }
}
