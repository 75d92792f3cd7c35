//! Typed wrappers over the admin endpoints.
//!
//! Each method issues one request through the [`SessionGateway`], parses the
//! JSON answer, and normalises failures with [`ApiError::normalize`].

use reqwest::Response;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;
use urlencoding::encode;

use crate::gateway::{ApiRequest, SessionGateway};
use crate::models::{
    Activity, Message, PayOutRule, PayOutRules, ServerAccount, ServerTransaction, TrustLevel,
    UserAccount,
};

use super::ApiError;

/// API client for the console screens.
/// Clone is cheap - it shares the gateway.
#[derive(Clone)]
pub struct ConsoleApi {
    gateway: SessionGateway,
}

impl ConsoleApi {
    pub fn new(gateway: SessionGateway) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &SessionGateway {
        &self.gateway
    }

    async fn send(&self, request: ApiRequest) -> Result<Response, ApiError> {
        self.gateway.execute(request).await.map_err(ApiError::normalize)
    }

    async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let path = request.path.clone();
        let response = self.send(request).await?;
        let text = response.text().await.map_err(|_| ApiError::RequestFailed)?;
        serde_json::from_str(&text).map_err(|e| {
            debug!(path = %path, error = %e, "Unexpected response body");
            ApiError::InvalidResponse(format!("{}: {}", path, e))
        })
    }

    async fn submit(&self, request: ApiRequest) -> Result<(), ApiError> {
        self.send(request).await.map(|_| ())
    }

    // ===== Home =====

    /// Sum of all server account balances
    pub async fn balance(&self) -> Result<f64, ApiError> {
        self.fetch(ApiRequest::get("home/balance")).await
    }

    pub async fn last_transactions(&self) -> Result<Vec<ServerTransaction>, ApiError> {
        self.fetch(ApiRequest::get("home/lastThreeTransaction")).await
    }

    pub async fn admins(&self) -> Result<Vec<UserAccount>, ApiError> {
        self.fetch(ApiRequest::get("home/admins")).await
    }

    pub async fn user(&self, username: &str) -> Result<UserAccount, ApiError> {
        self.fetch(ApiRequest::get(format!("home/user/{}", encode(username))))
            .await
    }

    pub async fn update_mail(&self, username: &str, email: &str) -> Result<(), ApiError> {
        let request = ApiRequest::get(format!("home/updateMail/{}", encode(username)))
            .query("newemail", email);
        self.submit(request).await
    }

    pub async fn update_password(&self, username: &str, password: &str) -> Result<(), ApiError> {
        let request = ApiRequest::get(format!("home/updatePassword/{}", encode(username)))
            .query("password", password);
        self.submit(request).await
    }

    pub async fn invite_admin(&self, email: &str) -> Result<(), ApiError> {
        self.submit(ApiRequest::get("home/inviteAdmin").query("email", email))
            .await
    }

    // ===== Users =====

    pub async fn users(&self) -> Result<Vec<UserAccount>, ApiError> {
        self.fetch(ApiRequest::post("users/all")).await
    }

    pub async fn send_mail_to_all(&self, subject: &str, message: &str) -> Result<(), ApiError> {
        // Parameters travel in the query, but the endpoint only accepts JSON requests.
        let request = ApiRequest::post("users/sendMailToAll")
            .query("subject", subject)
            .query("text", message)
            .json(&json!({}))?;
        self.submit(request).await
    }

    // ===== Relations =====

    pub async fn server_accounts(&self) -> Result<Vec<ServerAccount>, ApiError> {
        self.fetch(ApiRequest::post("relation/accounts")).await
    }

    pub async fn server_account(&self, id: i64) -> Result<ServerAccount, ApiError> {
        let request = ApiRequest::post("serveraccount/accountData").json(&json!({ "id": id }))?;
        self.fetch(request).await
    }

    pub async fn create_server_account(&self, email: &str, url: &str) -> Result<(), ApiError> {
        let request = ApiRequest::post("relation/createNewAccount")
            .json(&json!({ "email": email, "url": url }))?;
        self.submit(request).await
    }

    pub async fn delete_server_account(&self, url: &str) -> Result<(), ApiError> {
        let request = ApiRequest::post("serveraccount/deleteAccount").json(&json!({ "url": url }))?;
        self.submit(request).await
    }

    pub async fn update_trust_level(
        &self,
        account: &ServerAccount,
        trust_level: TrustLevel,
    ) -> Result<(), ApiError> {
        let request = ApiRequest::post("serveraccount/updateTrustLevel").json(&json!({
            "trustLevel": i32::from(trust_level),
            "trustLevelOld": i32::from(account.trust_level),
            "url": account.url,
        }))?;
        self.submit(request).await
    }

    /// Change the account's balance limit. Returns false without calling
    /// the server when the limit is unchanged.
    pub async fn update_balance_limit(
        &self,
        account: &ServerAccount,
        balance_limit: f64,
    ) -> Result<bool, ApiError> {
        if account.balance_limit == balance_limit {
            return Ok(false);
        }
        let request = ApiRequest::post("serveraccount/updateBalanceLimit").json(&json!({
            "activeBalance": account.active_balance,
            "balanceLimit": balance_limit,
            "url": account.url,
        }))?;
        self.submit(request).await.map(|_| true)
    }

    /// Same as [`update_balance_limit`](Self::update_balance_limit) for the per-user limit
    pub async fn update_user_balance_limit(
        &self,
        account: &ServerAccount,
        user_balance_limit: f64,
    ) -> Result<bool, ApiError> {
        if account.user_balance_limit == user_balance_limit {
            return Ok(false);
        }
        let request = ApiRequest::post("serveraccount/updateUserBalanceLimit").json(&json!({
            "activeBalance": account.active_balance,
            "userBalanceLimit": user_balance_limit,
            "url": account.url,
        }))?;
        self.submit(request).await.map(|_| true)
    }

    // ===== History and activity =====

    pub async fn history(&self) -> Result<Vec<ServerTransaction>, ApiError> {
        self.fetch(ApiRequest::get("history/transactions")).await
    }

    pub async fn activities(&self) -> Result<Vec<Activity>, ApiError> {
        self.fetch(ApiRequest::get("activities/logs")).await
    }

    // ===== Messages =====

    pub async fn messages(&self) -> Result<Vec<Message>, ApiError> {
        self.fetch(ApiRequest::post("messages/all")).await
    }

    pub async fn accept_message(&self, message: &Message) -> Result<(), ApiError> {
        self.answer_message("messages/accept", message).await
    }

    pub async fn decline_message(&self, message: &Message) -> Result<(), ApiError> {
        self.answer_message("messages/decline", message).await
    }

    async fn answer_message(&self, path: &str, message: &Message) -> Result<(), ApiError> {
        let request = ApiRequest::post(path)
            .json(&json!({ "trustLevel": message.trust_level, "url": message.server_url }))?;
        self.submit(request).await
    }

    // ===== Payout rules =====

    pub async fn payout_rules(&self, url: &str) -> Result<Vec<PayOutRule>, ApiError> {
        let rules: PayOutRules = self
            .fetch(ApiRequest::get("serverRules/get").query("url", url))
            .await?;
        Ok(rules.rules)
    }

    pub async fn create_payout_rules(&self, url: &str, rules: Vec<PayOutRule>) -> Result<(), ApiError> {
        let body = PayOutRules {
            rules,
            message: None,
        };
        let request = ApiRequest::post("serverRules/create")
            .query("url", url)
            .json(&body)?;
        self.submit(request).await
    }

    pub async fn reset_payout_rules(&self, url: &str) -> Result<(), ApiError> {
        self.submit(ApiRequest::post("serverRules/reset").query("url", url))
            .await
    }
}
