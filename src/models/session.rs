use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::User;

/// Identity of the caller, resolved once per request and passed to handlers.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Session {
    #[serde(rename = "id")]
    pub user_id: String,
    pub username: String,
    pub name: String,
    pub image: String,
}

impl From<&User> for Session {
    fn from(user: &User) -> Self {
        Session {
            user_id: user.id.clone(),
            username: user.username.clone(),
            name: user.name.clone(),
            image: user.image.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct TokenData {
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}
