//! Native actix-web host for the router, backed by a [`MemoryStore`].

use std::sync::Arc;

use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use tracing::{info, warn};

use crate::config::{self, ServerConfig};
use crate::core::db;
use crate::core::store::MemoryStore;
use crate::router;

pub struct AppState {
    pub store: Arc<MemoryStore>,
}

impl AppState {
    pub fn new(store: Arc<MemoryStore>) -> web::Data<Self> {
        web::Data::new(Self { store })
    }
}

mod adapter {
    use actix_web::http::StatusCode;
    use actix_web::HttpRequest;
    use spin_sdk::http::{Method, Request, Response};

    pub fn actix_to_spin_request(req: &HttpRequest, body: actix_web::web::Bytes) -> Request {
        let method = match req.method().as_str() {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "HEAD" => Method::Head,
            "OPTIONS" => Method::Options,
            "PATCH" => Method::Patch,
            other => Method::Other(other.to_string()),
        };

        let uri = req.uri().to_string();

        let mut builder = Request::builder();
        builder.method(method).uri(&uri);

        // Copy headers
        for (name, value) in req.headers() {
            if let Ok(val_str) = value.to_str() {
                builder.header(name.as_str(), val_str);
            }
        }

        builder.body(body.to_vec()).build()
    }

    pub fn spin_to_actix_response(spin_resp: &Response) -> actix_web::HttpResponse {
        let status =
            StatusCode::from_u16(*spin_resp.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut response = actix_web::HttpResponse::build(status);
        if let Some(content_type) = spin_resp
            .header("Content-Type")
            .and_then(|value| value.as_str())
        {
            response.content_type(content_type);
        }

        response.body(spin_resp.body().to_vec())
    }
}

/// Catch-all service: every request goes through [`router::route`].
pub async fn handle_all(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
) -> HttpResponse {
    let spin_req = adapter::actix_to_spin_request(&req, body);
    let store = Arc::clone(&state.store);

    // handlers are synchronous and hash passwords; keep them off the reactor
    match web::block(move || router::route(store.as_ref(), &spin_req)).await {
        Ok(spin_resp) => adapter::spin_to_actix_response(&spin_resp),
        Err(e) => {
            warn!(error = %e, "request handler did not complete");
            HttpResponse::InternalServerError()
                .json(serde_json::json!({ "message": "Error interno del servidor" }))
        }
    }
}

pub async fn run() -> std::io::Result<()> {
    let server_config = ServerConfig::load();
    let store = Arc::new(MemoryStore::new());

    if config::seed_demo_data() {
        db::init_demo_data(store.as_ref()).map_err(std::io::Error::other)?;
    }

    let state = AppState::new(store);
    let address = server_config.address();
    info!("Server listening on http://{address}");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .default_service(web::route().to(handle_all))
    })
    .bind(&address)?
    .run()
    .await
}
