use regex::RegexBuilder;
use serde::Deserialize;
use spin_sdk::http::{Request, Response};
use tracing::{info, warn};

use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::{char_len, hash_password, json_response, new_id, now};
use crate::core::query_params::{get_non_empty, parse_query_params};
use crate::core::store::DocumentStore;
use crate::models::{User, UserSummary};

#[derive(Deserialize, Default)]
#[serde(default)]
pub(crate) struct Registration {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

impl Registration {
    pub(crate) fn validate(&self) -> Result<(), ApiError> {
        if self.name.is_empty()
            || self.username.is_empty()
            || self.email.is_empty()
            || self.password.is_empty()
        {
            return Err(ApiError::bad_request("Todos los campos son obligatorios"));
        }
        if char_len(&self.name) > MAX_NAME_LENGTH {
            return Err(ApiError::bad_request(format!(
                "El nombre no puede tener más de {MAX_NAME_LENGTH} caracteres"
            )));
        }
        if char_len(&self.username) > MAX_USERNAME_LENGTH {
            return Err(ApiError::bad_request(format!(
                "El nombre de usuario no puede tener más de {MAX_USERNAME_LENGTH} caracteres"
            )));
        }
        Ok(())
    }
}

pub fn register_user<S: DocumentStore>(store: &S, req: &Request) -> anyhow::Result<Response> {
    let input: Registration = match serde_json::from_slice(req.body()) {
        Ok(input) => input,
        Err(_) => return Ok(ApiError::bad_request("Cuerpo de la petición inválido").into()),
    };

    if let Err(e) = input.validate() {
        return Ok(e.into());
    }

    let user = match insert_user(store, input)? {
        Ok(user) => user,
        Err(e) => return Ok(e.into()),
    };

    info!(user_id = %user.id, username = %user.username, "user registered");

    json_response(
        201,
        &serde_json::json!({
            "message": "Usuario registrado correctamente",
            "user": user.registered(),
        }),
    )
}

/// Persists a validated registration.
///
/// The `email:` and `username:` index keys are reserved with
/// [`DocumentStore::insert_new`] before the user document is written, so two
/// concurrent registrations cannot both claim the same handle. A duplicate
/// yields `Ok(Err(_))` and leaves the store as it was.
pub(crate) fn insert_user<S: DocumentStore>(
    store: &S,
    input: Registration,
) -> anyhow::Result<Result<User, ApiError>> {
    let id = new_id();

    let email_index = email_key(&input.email);
    if !store.insert_new(&email_index, &id)? {
        return Ok(Err(ApiError::bad_request("Este correo ya está registrado")));
    }

    let username_index = username_key(&input.username);
    if !store.insert_new(&username_index, &id)? {
        store.delete(&email_index)?;
        return Ok(Err(ApiError::bad_request(
            "Este nombre de usuario ya está en uso",
        )));
    }

    let reserved = [email_index.as_str(), username_index.as_str()];

    let user = match build_user(id, input) {
        Ok(user) => user,
        Err(e) => {
            release(store, &reserved);
            return Err(e);
        }
    };

    let document = user_key(&user.id);
    if let Err(e) = store.set_json(&document, &user) {
        release(store, &reserved);
        return Err(e);
    }

    let listed = store.update_json(USERS_LIST_KEY, |users: &mut Option<Vec<String>>| {
        users.get_or_insert_with(Vec::new).push(user.id.clone())
    });
    if let Err(e) = listed {
        release(store, &[document.as_str(), email_index.as_str(), username_index.as_str()]);
        return Err(e);
    }

    Ok(Ok(user))
}

fn build_user(id: String, input: Registration) -> anyhow::Result<User> {
    Ok(User {
        id,
        password: hash_password(&input.password)?,
        name: input.name,
        username: input.username,
        email: input.email,
        image: String::new(),
        bio: String::new(),
        created_at: now(),
    })
}

/// Best-effort rollback of the keys a failed registration wrote.
fn release<S: DocumentStore>(store: &S, keys: &[&str]) {
    for key in keys {
        if let Err(e) = store.delete(key) {
            warn!(key = %key, error = %e, "failed to release registration key");
        }
    }
}

/// Case-insensitive substring search over name and username, in registration
/// order, capped at `SEARCH_RESULT_LIMIT`.
pub fn search_users<S: DocumentStore>(store: &S, req: &Request) -> anyhow::Result<Response> {
    let params = parse_query_params(&req.uri());
    let Some(query) = get_non_empty(&params, "q") else {
        return Ok(ApiError::bad_request("Se requiere un término de búsqueda").into());
    };

    let matcher = RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .build()?;

    let ids: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    let mut results: Vec<UserSummary> = Vec::new();

    for id in &ids {
        if results.len() >= SEARCH_RESULT_LIMIT {
            break;
        }
        if let Some(user) = store.get_json::<User>(&user_key(id))? {
            if matcher.is_match(&user.name) || matcher.is_match(&user.username) {
                results.push(user.summary());
            }
        }
    }

    json_response(200, &results)
}
