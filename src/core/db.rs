use tracing::info;

use crate::config::{user_key, username_key};
use crate::core::store::DocumentStore;
use crate::posts::insert_post;
use crate::users::{insert_user, Registration};

struct DemoUser {
    name: &'static str,
    username: &'static str,
    bio: &'static str,
    posts: &'static [&'static str],
}

const DEMO_USERS: &[DemoUser] = &[
    DemoUser {
        name: "Alice",
        username: "alice",
        bio: "Hola, soy Alice",
        posts: &[
            "¡Bienvenidos a AlkaBeta! Con ganas de compartir ideas por aquí.",
            "Acabo de terminar un proyecto enorme. Día productivo.",
        ],
    },
    DemoUser {
        name: "Bob",
        username: "bob",
        bio: "El rincón de Bob en internet",
        posts: &["¡Hola a todos! Recién llegado a AlkaBeta."],
    },
];

/// Creates the demo accounts (password = username, email
/// `<username>@alkabeta.local`) and their posts. Users that already exist are
/// left untouched, so running this on every start is harmless.
pub fn init_demo_data<S: DocumentStore>(store: &S) -> anyhow::Result<()> {
    for demo in DEMO_USERS {
        if store.exists(&username_key(demo.username))? {
            continue;
        }

        let registration = Registration {
            name: demo.name.to_string(),
            username: demo.username.to_string(),
            email: format!("{}@alkabeta.local", demo.username),
            password: demo.username.to_string(),
        };

        let mut user = match insert_user(store, registration)? {
            Ok(user) => user,
            Err(e) => {
                info!(username = demo.username, reason = %e, "demo user skipped");
                continue;
            }
        };
        user.bio = demo.bio.to_string();
        store.set_json(&user_key(&user.id), &user)?;

        for content in demo.posts {
            insert_post(store, &user.id, content)?;
        }

        info!(username = demo.username, "demo user created");
    }

    Ok(())
}
