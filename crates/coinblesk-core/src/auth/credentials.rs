use std::fmt;

/// Username and password for a single login attempt.
///
/// Never written to disk; dropped as soon as the login request is built.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Form fields expected by the server's login endpoint
    pub(crate) fn form_fields(&self) -> Vec<(String, String)> {
        vec![
            ("j_username".to_string(), self.username.clone()),
            ("j_password".to_string(), self.password.clone()),
        ]
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials::new("alice", "secret");
        let printed = format!("{:?}", creds);
        assert!(printed.contains("alice"));
        assert!(!printed.contains("secret"));
    }

    #[test]
    fn test_form_fields() {
        let creds = Credentials::new("alice", "secret");
        assert_eq!(
            creds.form_fields(),
            vec![
                ("j_username".to_string(), "alice".to_string()),
                ("j_password".to_string(), "secret".to_string()),
            ]
        );
    }
}
