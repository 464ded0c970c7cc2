use std::{env, fmt::Display, str::FromStr};

use tracing::{info, warn};

pub const MAX_POST_LENGTH: usize = 500;
pub const MAX_NAME_LENGTH: usize = 60;
pub const MAX_USERNAME_LENGTH: usize = 30;
pub const SEARCH_RESULT_LIMIT: usize = 10;

pub const USERS_LIST_KEY: &str = "users_list";
pub const FEED_KEY: &str = "feed";
pub const TOKENS_LIST_KEY: &str = "tokens_list";

pub fn user_key(id: &str) -> String {
    format!("user:{id}")
}

pub fn post_key(id: &str) -> String {
    format!("post:{id}")
}

pub fn token_key(token: &str) -> String {
    format!("token:{token}")
}

/// Unique index entry mapping a username to its user id.
pub fn username_key(username: &str) -> String {
    format!("username:{username}")
}

/// Unique index entry mapping an email to its user id.
pub fn email_key(email: &str) -> String {
    format!("email:{email}")
}

pub fn token_expiration_hours() -> i64 {
    try_load("ALKABETA_TOKEN_EXPIRATION_HOURS", 24)
}

pub fn seed_demo_data() -> bool {
    try_load("ALKABETA_SEED_DEMO_DATA", false)
}

/// Settings for the native server binary.
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn load() -> Self {
        Self {
            host: try_load("ALKABETA_HOST", "0.0.0.0".to_string()),
            port: try_load("ALKABETA_PORT", 3000),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
            default
        }),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_helpers_namespace_documents() {
        assert_eq!(user_key("abc"), "user:abc");
        assert_eq!(post_key("abc"), "post:abc");
        assert_eq!(token_key("abc"), "token:abc");
        assert_eq!(username_key("alice"), "username:alice");
        assert_eq!(email_key("alice@x.com"), "email:alice@x.com");
    }

    #[test]
    fn unset_variable_falls_back_to_default() {
        let value: u16 = try_load("ALKABETA_TEST_SURELY_UNSET_VARIABLE", 42);
        assert_eq!(value, 42);
    }
}
