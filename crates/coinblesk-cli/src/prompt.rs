//! Interactive re-authentication.
//!
//! Listens for `AuthenticationRequired` and asks for credentials on the
//! terminal, so whatever command was running continues after the login.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::debug;

use coinblesk_core::{ApiError, AuthEvent, Credentials, SessionGateway, Subscription};

/// Attempts before the prompt gives up and the waiting command fails.
const MAX_LOGIN_ATTEMPTS: usize = 3;

/// Where credentials come from, given the username to offer as default.
/// Called on a blocking thread.
pub type CredentialSource = Arc<dyn Fn(Option<String>) -> Result<Credentials> + Send + Sync>;

/// Keeps the prompt alive; dropping it unsubscribes.
pub struct LoginPrompt {
    _subscription: Subscription,
}

impl LoginPrompt {
    /// Prompt on the terminal
    pub fn install(gateway: &SessionGateway, last_username: Option<String>) -> Self {
        Self::install_with(gateway, last_username, Arc::new(prompt_credentials))
    }

    pub fn install_with(gateway: &SessionGateway, last_username: Option<String>, source: CredentialSource) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = gateway.bus().subscribe(move |event| {
            if *event == AuthEvent::AuthenticationRequired {
                let _ = tx.send(());
            }
        });

        tokio::spawn(run(gateway.clone(), rx, last_username, source));

        Self {
            _subscription: subscription,
        }
    }
}

async fn run(
    gateway: SessionGateway,
    mut rx: mpsc::UnboundedReceiver<()>,
    last_username: Option<String>,
    source: CredentialSource,
) {
    while rx.recv().await.is_some() {
        let notice = gateway.session().write().take_notice();
        if let Some(notice) = notice {
            eprintln!("{}", notice);
        }

        if !reauthenticate(&gateway, &last_username, &source).await {
            // Stop listening first so the discard below does not prompt again.
            drop(rx);
            gateway.bus().publish(AuthEvent::AuthenticationRequired);
            return;
        }
    }
}

/// Ask until a login succeeds. False when the user could not log in.
async fn reauthenticate(gateway: &SessionGateway, last_username: &Option<String>, source: &CredentialSource) -> bool {
    for attempt in 1..=MAX_LOGIN_ATTEMPTS {
        let default_username = last_username.clone();
        let source = Arc::clone(source);
        let credentials = match tokio::task::spawn_blocking(move || source(default_username)).await {
            Ok(Ok(credentials)) => credentials,
            Ok(Err(e)) => {
                debug!(error = %e, "Could not read credentials");
                return false;
            }
            Err(e) => {
                debug!(error = %e, "Prompt task failed");
                return false;
            }
        };

        match gateway.login(credentials).await {
            Ok(()) => return true,
            Err(ApiError::InvalidCredentials) if attempt < MAX_LOGIN_ATTEMPTS => {
                eprintln!("Invalid username or password, try again.");
            }
            Err(e) => {
                eprintln!("Login failed: {}", e);
                return false;
            }
        }
    }
    false
}

pub fn prompt_credentials(last_username: Option<String>) -> Result<Credentials> {
    let username = prompt_username(last_username.as_deref())?;
    let password = rpassword::prompt_password("Password: ")?;
    Ok(Credentials::new(username, password))
}

fn prompt_username(default: Option<&str>) -> Result<String> {
    match default {
        Some(last) => print!("Username [{}]: ", last),
        None => print!("Username: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    Ok(match default {
        Some(last) if input.is_empty() => last.to_string(),
        _ => input.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::time::Duration;

    use coinblesk_core::gateway::ApiRequest;
    use coinblesk_core::{EventBus, GatewayConfig, Session};
    use parking_lot::Mutex;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway(server: &MockServer) -> SessionGateway {
        let mut config = GatewayConfig::new(server.uri());
        config.fetch_profile_on_login = false;
        config.replay_timeout = Duration::from_secs(5);
        SessionGateway::new(config, Session::shared(), EventBus::new(), None).unwrap()
    }

    /// Hands out the given passwords for alice in order, then fails.
    fn scripted(passwords: &[&str]) -> (CredentialSource, Arc<Mutex<Vec<Option<String>>>>) {
        let queue: Mutex<VecDeque<String>> = Mutex::new(passwords.iter().map(|p| p.to_string()).collect());
        let defaults = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&defaults);
        let source: CredentialSource = Arc::new(move |default: Option<String>| -> Result<Credentials> {
            seen.lock().push(default);
            let password = queue
                .lock()
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("no more input"))?;
            Ok(Credentials::new("alice", password))
        });
        (source, defaults)
    }

    async fn mount_login(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/j_spring_security_check"))
            .and(body_string_contains("j_password=secret"))
            .respond_with(ResponseTemplate::new(200).insert_header("Set-Cookie", "JSESSIONID=sess-1; Path=/"))
            .with_priority(1)
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/j_spring_security_check"))
            .respond_with(ResponseTemplate::new(401))
            .mount(server)
            .await;
    }

    async fn mount_balance(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/home/balance"))
            .and(header("cookie", "JSESSIONID=sess-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("42.5"))
            .with_priority(1)
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/home/balance"))
            .respond_with(ResponseTemplate::new(401))
            .mount(server)
            .await;
    }

    async fn login_attempts(server: &MockServer) -> usize {
        server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == "/j_spring_security_check")
            .count()
    }

    #[tokio::test]
    async fn test_retries_after_invalid_credentials() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        let gateway = gateway(&server);
        let (source, defaults) = scripted(&["wrong", "secret"]);

        let last = Some("alice".to_string());
        assert!(reauthenticate(&gateway, &last, &source).await);
        assert!(gateway.session().read().is_authenticated());
        assert_eq!(login_attempts(&server).await, 2);
        assert_eq!(*defaults.lock(), vec![last.clone(), last]);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        let gateway = gateway(&server);
        let (source, _) = scripted(&["a", "b", "c", "secret"]);

        assert!(!reauthenticate(&gateway, &None, &source).await);
        assert!(!gateway.session().read().is_authenticated());
        assert_eq!(login_attempts(&server).await, MAX_LOGIN_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_interrupted_command_completes_after_prompt() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        mount_balance(&server).await;
        let gateway = gateway(&server);
        let (source, _) = scripted(&["wrong", "secret"]);
        let _prompt = LoginPrompt::install_with(&gateway, None, source);

        let response = tokio::time::timeout(Duration::from_secs(3), gateway.execute(ApiRequest::get("home/balance")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(response.text().await.unwrap(), "42.5");
        assert_eq!(gateway.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_giving_up_fails_the_waiting_command() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        mount_balance(&server).await;
        let gateway = gateway(&server);
        let (source, _) = scripted(&["a", "b", "c"]);
        let _prompt = LoginPrompt::install_with(&gateway, None, source);

        let result = tokio::time::timeout(Duration::from_secs(3), gateway.execute(ApiRequest::get("home/balance")))
            .await
            .unwrap();
        assert!(matches!(result, Err(ApiError::ReplayDiscarded)));
        assert_eq!(gateway.pending_len(), 0);
        assert_eq!(login_attempts(&server).await, MAX_LOGIN_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_unreadable_input_fails_the_waiting_command() {
        let server = MockServer::start().await;
        mount_balance(&server).await;
        let gateway = gateway(&server);
        let (source, _) = scripted(&[]);
        let _prompt = LoginPrompt::install_with(&gateway, None, source);

        let result = tokio::time::timeout(Duration::from_secs(3), gateway.execute(ApiRequest::get("home/balance")))
            .await
            .unwrap();
        assert!(matches!(result, Err(ApiError::ReplayDiscarded)));
        assert_eq!(login_attempts(&server).await, 0);
    }
}
