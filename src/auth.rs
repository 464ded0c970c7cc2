use std::collections::HashSet;

use serde::Deserialize;
use spin_sdk::http::{Request, Response};
use tracing::{debug, info};

use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::{bearer_token, json_response, new_id, now, verify_password};
use crate::core::store::DocumentStore;
use crate::models::{Session, TokenData, User};

#[derive(Deserialize)]
struct Credentials {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

/// Resolves the caller's session from its bearer token.
///
/// Expired tokens and tokens whose user disappeared yield `None`.
pub fn session<S: DocumentStore>(store: &S, req: &Request) -> anyhow::Result<Option<Session>> {
    let Some(token) = bearer_token(req) else {
        return Ok(None);
    };

    let Some(data) = store.get_json::<TokenData>(&token_key(token))? else {
        return Ok(None);
    };

    if is_expired(&data, token_expiration_hours()) {
        return Ok(None);
    }

    Ok(store
        .get_json::<User>(&user_key(&data.user_id))?
        .as_ref()
        .map(Session::from))
}

pub fn login_user<S: DocumentStore>(store: &S, req: &Request) -> anyhow::Result<Response> {
    let creds: Credentials = match serde_json::from_slice(req.body()) {
        Ok(c) => c,
        Err(_) => return Ok(ApiError::bad_request("Cuerpo de la petición inválido").into()),
    };

    if creds.email.is_empty() || creds.password.is_empty() {
        return Ok(ApiError::bad_request("Email y contraseña son obligatorios").into());
    }

    let user = match store.get_json::<String>(&email_key(&creds.email))? {
        Some(id) => store.get_json::<User>(&user_key(&id))?,
        None => None,
    };

    let Some(user) = user.filter(|u| verify_password(&creds.password, &u.password)) else {
        return Ok(invalid_credentials());
    };

    let token = new_id();
    let data = TokenData {
        user_id: user.id.clone(),
        created_at: now(),
    };
    store.set_json(&token_key(&token), &data)?;

    let expired = prune_expired_tokens(store)?;
    store.update_json(TOKENS_LIST_KEY, |tokens: &mut Option<Vec<String>>| {
        let tokens = tokens.get_or_insert_with(Vec::new);
        tokens.retain(|t| !expired.contains(t));
        tokens.push(token.clone())
    })?;

    info!(user_id = %user.id, "user logged in");

    json_response(
        200,
        &serde_json::json!({
            "token": token,
            "user": Session::from(&user),
        }),
    )
}

pub fn logout_user<S: DocumentStore>(store: &S, req: &Request) -> anyhow::Result<Response> {
    let Some(token) = bearer_token(req) else {
        return Ok(ApiError::Unauthorized.into());
    };

    store.delete(&token_key(token))?;
    store.update_json(TOKENS_LIST_KEY, |tokens: &mut Option<Vec<String>>| {
        if let Some(tokens) = tokens {
            tokens.retain(|t| t != token);
        }
    })?;

    json_response(
        200,
        &serde_json::json!({ "message": "Sesión cerrada correctamente" }),
    )
}

pub fn current_session(session: Option<&Session>) -> anyhow::Result<Response> {
    match session {
        Some(session) => json_response(200, &serde_json::json!({ "user": session })),
        None => Ok(ApiError::Unauthorized.into()),
    }
}

fn is_expired(data: &TokenData, lifetime_hours: i64) -> bool {
    (now() - data.created_at).num_hours() > lifetime_hours
}

/// Deletes the documents of expired tokens listed in `tokens_list` and returns
/// every listed token that is no longer valid, for removal from the list.
fn prune_expired_tokens<S: DocumentStore>(store: &S) -> anyhow::Result<HashSet<String>> {
    let lifetime_hours = token_expiration_hours();
    let listed: Vec<String> = store.get_json(TOKENS_LIST_KEY)?.unwrap_or_default();

    let mut expired = HashSet::new();
    for token in listed {
        let key = token_key(&token);
        match store.get_json::<TokenData>(&key)? {
            Some(data) if !is_expired(&data, lifetime_hours) => {}
            Some(_) => {
                store.delete(&key)?;
                expired.insert(token);
            }
            None => {
                expired.insert(token);
            }
        }
    }

    if !expired.is_empty() {
        debug!(count = expired.len(), "pruned expired tokens");
    }
    Ok(expired)
}

fn invalid_credentials() -> Response {
    let resp = serde_json::json!({ "message": "Credenciales inválidas" });
    Response::builder()
        .status(401)
        .header("Content-Type", "application/json")
        .body(resp.to_string().into_bytes())
        .build()
}
