use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored user document. `password` holds an Argon2 PHC string.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct User {
    pub id: String,
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub bio: String,
    pub created_at: DateTime<Utc>,
}

/// What registration hands back: never the password.
#[derive(Serialize, Debug)]
pub struct RegisteredUser {
    pub id: String,
    pub name: String,
    pub username: String,
    pub email: String,
}

/// Search result entry.
#[derive(Serialize, Debug)]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub username: String,
    pub image: String,
}

impl User {
    pub fn registered(&self) -> RegisteredUser {
        RegisteredUser {
            id: self.id.clone(),
            name: self.name.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            username: self.username.clone(),
            image: self.image.clone(),
        }
    }
}
