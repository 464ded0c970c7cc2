//! Method/path dispatch shared by the Spin component and the native server.
//!
//! The router resolves the caller's session once, hands it to the handlers
//! that need it, and is the single place where unexpected failures are
//! logged and turned into a generic 500.

use spin_sdk::http::{Method, Request, Response};
use tracing::error;

use crate::core::errors::ApiError;
use crate::core::store::DocumentStore;
use crate::{auth, posts, users};

pub fn route<S: DocumentStore>(store: &S, req: &Request) -> Response {
    let path = req.path().split('?').next().unwrap_or_default();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let session = match auth::session(store, req) {
        Ok(session) => session,
        Err(e) => return internal_error(e, "Error al verificar la sesión"),
    };
    let session = session.as_ref();

    let (result, context) = match (req.method(), segments.as_slice()) {
        (Method::Get, ["posts"]) => (posts::list_posts(store, req), "Error al obtener posts"),
        (Method::Post, ["posts"]) => (
            posts::create_post(store, session, req),
            "Error al crear post",
        ),
        (Method::Get, ["posts", id]) => (posts::get_post(store, id), "Error al obtener post"),
        (Method::Put, ["posts", id]) => (
            posts::update_post(store, session, id, req),
            "Error al actualizar post",
        ),
        (Method::Delete, ["posts", id]) => (
            posts::delete_post(store, session, id),
            "Error al eliminar post",
        ),
        (Method::Post, ["posts", id, "like"]) => (
            posts::toggle_like(store, session, id),
            "Error al procesar like",
        ),
        (Method::Post, ["users", "register"]) => (
            users::register_user(store, req),
            "Error al registrar usuario",
        ),
        (Method::Get, ["users", "search"]) => {
            (users::search_users(store, req), "Error al buscar usuarios")
        }
        (Method::Get, ["users", username, "posts"]) => (
            posts::list_user_posts(store, &decode_segment(username)),
            "Error al obtener posts del usuario",
        ),
        (Method::Post, ["auth", "login"]) => {
            (auth::login_user(store, req), "Error al iniciar sesión")
        }
        (Method::Post, ["auth", "logout"]) => {
            (auth::logout_user(store, req), "Error al cerrar sesión")
        }
        (Method::Get, ["auth", "session"]) => {
            (auth::current_session(session), "Error al obtener la sesión")
        }
        _ => return ApiError::not_found("Ruta no encontrada").into(),
    };

    match result {
        Ok(resp) => resp,
        Err(e) => internal_error(e, context),
    }
}

fn decode_segment(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

fn internal_error(err: anyhow::Error, context: &str) -> Response {
    error!(error = ?err, "{context}");
    ApiError::InternalError(context.to_string()).into()
}
