//! AlkaBeta: a small social network API.
//!
//! Users register and log in, write short text posts, like each other's posts
//! and search for people by name or username. All state lives in a key/value
//! document store (see [`core::store`]).
//!
//! The crate builds two ways:
//! - as a Spin HTTP component (`wasm32`), backed by the Spin key/value store;
//! - as a native binary (`src/bin/main.rs`), where an actix-web server adapts
//!   requests onto the same router with an in-memory store.

pub mod auth;
pub mod config;
pub mod core;
pub mod models;
pub mod posts;
pub mod router;
pub mod users;

#[cfg(not(target_arch = "wasm32"))]
pub mod server;

use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global subscriber, writing to stderr. `RUST_LOG` overrides the
/// default `info` level. Calls after the first are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(target_arch = "wasm32")]
mod component {
    use spin_sdk::{
        http::{IntoResponse, Request},
        http_component,
        key_value::Store,
    };

    use crate::{config, core::db, router};

    #[http_component]
    fn handle(req: Request) -> anyhow::Result<impl IntoResponse> {
        crate::init_tracing();
        let store = Store::open_default()?;
        if config::seed_demo_data() {
            db::init_demo_data(&store)?;
        }
        Ok(router::route(&store, &req))
    }
}
