use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::User;
use crate::core::helpers::{new_id, now, to_iso};

/// Stored post document. `author` is a user id, `likes` a list of user ids
/// without duplicates.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Post {
    pub id: String,
    pub author: String,
    pub content: String,
    #[serde(default)]
    pub likes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn new(author: &str, content: &str) -> Self {
        let created_at = now();
        Post {
            id: new_id(),
            author: author.to_string(),
            content: content.to_string(),
            likes: Vec::new(),
            created_at,
            updated_at: created_at,
        }
    }

    pub fn edit(&mut self, content: &str) {
        self.content = content.to_string();
        self.updated_at = now();
    }

    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.likes.iter().any(|id| id == user_id)
    }

    /// Flips `user_id`'s like. Returns whether the post is now liked by them.
    pub fn toggle_like(&mut self, user_id: &str) -> bool {
        if self.is_liked_by(user_id) {
            self.likes.retain(|id| id != user_id);
            false
        } else {
            self.likes.push(user_id.to_string());
            true
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct AuthorSummary {
    pub id: String,
    pub name: String,
    pub username: String,
}

/// Wire shape of a post with its author embedded.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: String,
    pub content: String,
    pub author: AuthorSummary,
    pub likes: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl PostResponse {
    pub fn new(post: Post, author: &User) -> Self {
        PostResponse {
            id: post.id,
            content: post.content,
            author: AuthorSummary {
                id: author.id.clone(),
                name: author.name.clone(),
                username: author.username.clone(),
            },
            likes: post.likes,
            created_at: to_iso(&post.created_at),
            updated_at: to_iso(&post.updated_at),
        }
    }
}
