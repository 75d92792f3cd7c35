use serde::{Deserialize, Serialize};

/// Pay out to `payout_address` at `hour` on `day` once the balance passes `balance_limit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayOutRule {
    #[serde(default)]
    pub id: i64,
    pub hour: i32,
    pub day: i32,
    #[serde(default)]
    pub server_account_id: i64,
    #[serde(default)]
    pub balance_limit: Option<f64>,
    pub payout_address: String,
}

/// Wire wrapper for a server account's rules
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayOutRules {
    #[serde(default, rename = "serverPayOutRulesList")]
    pub rules: Vec<PayOutRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_wire_name() {
        let rules = PayOutRules {
            rules: vec![PayOutRule {
                id: 0,
                hour: 12,
                day: 1,
                server_account_id: 3,
                balance_limit: None,
                payout_address: "1BoatSLRHtKNngkdXEeobR76b53LETtpyT".to_string(),
            }],
            message: None,
        };
        let value = serde_json::to_value(&rules).unwrap();
        assert_eq!(value["serverPayOutRulesList"][0]["hour"], 12);
        assert!(value.get("message").is_none());
    }
}
