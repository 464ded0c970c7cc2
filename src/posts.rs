use std::collections::HashMap;

use serde::Deserialize;
use spin_sdk::http::{Request, Response};
use tracing::{info, warn};

use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::{char_len, json_response, validate_uuid};
use crate::core::query_params::{get_non_empty, parse_query_params};
use crate::core::store::DocumentStore;
use crate::models::{Post, PostResponse, Session, User};

const INVALID_ID: &str = "ID de post inválido";
const POST_NOT_FOUND: &str = "Post no encontrado";

#[derive(Deserialize)]
struct PostInput {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortOrder {
    Newest,
    Popular,
}

impl SortOrder {
    fn parse(raw: Option<&str>) -> Option<Self> {
        match raw {
            None | Some("newest") => Some(SortOrder::Newest),
            Some("popular") => Some(SortOrder::Popular),
            Some(_) => None,
        }
    }

    fn apply(self, posts: &mut [Post]) {
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if self == SortOrder::Popular {
            // stable: equal like counts keep newest-first
            posts.sort_by(|a, b| b.likes.len().cmp(&a.likes.len()));
        }
    }
}

fn parse_input(req: &Request) -> Result<PostInput, ApiError> {
    serde_json::from_slice(req.body())
        .map_err(|_| ApiError::bad_request("Cuerpo de la petición inválido"))
}

/// Content must be present, not blank and at most `MAX_POST_LENGTH` characters.
fn validate_content(content: Option<&str>) -> Result<&str, ApiError> {
    let content = content
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("El contenido del post es obligatorio"))?;

    if char_len(content) > MAX_POST_LENGTH {
        return Err(ApiError::bad_request(format!(
            "El post no puede tener más de {MAX_POST_LENGTH} caracteres"
        )));
    }

    Ok(content)
}

fn load_posts<S: DocumentStore>(store: &S) -> anyhow::Result<Vec<Post>> {
    let feed: Vec<String> = store.get_json(FEED_KEY)?.unwrap_or_default();
    let mut posts = Vec::with_capacity(feed.len());
    for id in &feed {
        match store.get_json::<Post>(&post_key(id))? {
            Some(p) => posts.push(p),
            None => warn!(post_id = %id, "feed references a missing post"),
        }
    }
    Ok(posts)
}

/// Embeds each post's author, fetching every distinct author once.
fn populate<S: DocumentStore>(store: &S, posts: Vec<Post>) -> anyhow::Result<Vec<PostResponse>> {
    let mut authors: HashMap<String, User> = HashMap::new();
    let mut out = Vec::with_capacity(posts.len());

    for post in posts {
        if !authors.contains_key(&post.author) {
            let user = store
                .get_json::<User>(&user_key(&post.author))?
                .ok_or_else(|| {
                    anyhow::anyhow!("author {} of post {} not found", post.author, post.id)
                })?;
            authors.insert(post.author.clone(), user);
        }
        let author = &authors[&post.author];
        out.push(PostResponse::new(post, author));
    }

    Ok(out)
}

fn populate_one<S: DocumentStore>(store: &S, post: Post) -> anyhow::Result<PostResponse> {
    let mut populated = populate(store, vec![post])?;
    populated
        .pop()
        .ok_or_else(|| anyhow::anyhow!("populate returned no post"))
}

pub fn list_posts<S: DocumentStore>(store: &S, req: &Request) -> anyhow::Result<Response> {
    let params = parse_query_params(&req.uri());
    let Some(order) = SortOrder::parse(get_non_empty(&params, "sort")) else {
        return Ok(ApiError::bad_request("Criterio de orden inválido").into());
    };

    let mut posts = load_posts(store)?;
    order.apply(&mut posts);

    json_response(200, &populate(store, posts)?)
}

pub fn list_user_posts<S: DocumentStore>(store: &S, username: &str) -> anyhow::Result<Response> {
    let Some(user_id) = store.get_json::<String>(&username_key(username))? else {
        return Ok(ApiError::not_found("Usuario no encontrado").into());
    };

    let mut posts: Vec<Post> = load_posts(store)?
        .into_iter()
        .filter(|p| p.author == user_id)
        .collect();
    SortOrder::Newest.apply(&mut posts);

    json_response(200, &populate(store, posts)?)
}

pub fn get_post<S: DocumentStore>(store: &S, post_id: &str) -> anyhow::Result<Response> {
    if !validate_uuid(post_id) {
        return Ok(ApiError::bad_request(INVALID_ID).into());
    }

    match store.get_json::<Post>(&post_key(post_id))? {
        Some(post) => json_response(200, &populate_one(store, post)?),
        None => Ok(ApiError::not_found(POST_NOT_FOUND).into()),
    }
}

pub fn create_post<S: DocumentStore>(
    store: &S,
    session: Option<&Session>,
    req: &Request,
) -> anyhow::Result<Response> {
    let Some(session) = session else {
        return Ok(ApiError::Unauthorized.into());
    };

    let input = match parse_input(req) {
        Ok(input) => input,
        Err(e) => return Ok(e.into()),
    };
    let content = match validate_content(input.content.as_deref()) {
        Ok(content) => content,
        Err(e) => return Ok(e.into()),
    };

    let post = insert_post(store, &session.user_id, content)?;

    info!(post_id = %post.id, author = %session.user_id, "post created");

    json_response(
        201,
        &serde_json::json!({
            "message": "Post creado correctamente",
            "post": populate_one(store, post)?,
        }),
    )
}

/// Stores a new post and links it at the head of the feed.
pub(crate) fn insert_post<S: DocumentStore>(
    store: &S,
    author_id: &str,
    content: &str,
) -> anyhow::Result<Post> {
    let post = Post::new(author_id, content);
    store.set_json(&post_key(&post.id), &post)?;

    // prepend newest
    store.update_json(FEED_KEY, |feed: &mut Option<Vec<String>>| {
        feed.get_or_insert_with(Vec::new).insert(0, post.id.clone())
    })?;

    Ok(post)
}

pub fn update_post<S: DocumentStore>(
    store: &S,
    session: Option<&Session>,
    post_id: &str,
    req: &Request,
) -> anyhow::Result<Response> {
    let Some(session) = session else {
        return Ok(ApiError::Unauthorized.into());
    };

    if !validate_uuid(post_id) {
        return Ok(ApiError::bad_request(INVALID_ID).into());
    }

    let input = match parse_input(req) {
        Ok(input) => input,
        Err(e) => return Ok(e.into()),
    };
    let content = match validate_content(input.content.as_deref()) {
        Ok(content) => content,
        Err(e) => return Ok(e.into()),
    };

    // ownership check and write in one store update
    let outcome = store.update_json(&post_key(post_id), |doc: &mut Option<Post>| match doc {
        None => Err(ApiError::not_found(POST_NOT_FOUND)),
        Some(post) if post.author != session.user_id => Err(ApiError::forbidden(
            "No tienes permiso para editar este post",
        )),
        Some(post) => {
            post.edit(content);
            Ok(post.clone())
        }
    })?;

    let post = match outcome {
        Ok(post) => post,
        Err(e) => return Ok(e.into()),
    };

    info!(post_id = %post.id, "post updated");

    json_response(
        200,
        &serde_json::json!({
            "message": "Post actualizado correctamente",
            "post": populate_one(store, post)?,
        }),
    )
}

pub fn delete_post<S: DocumentStore>(
    store: &S,
    session: Option<&Session>,
    post_id: &str,
) -> anyhow::Result<Response> {
    let Some(session) = session else {
        return Ok(ApiError::Unauthorized.into());
    };

    if !validate_uuid(post_id) {
        return Ok(ApiError::bad_request(INVALID_ID).into());
    }

    let outcome = store.update_json(&post_key(post_id), |doc: &mut Option<Post>| {
        let author = doc.as_ref().map(|p| p.author.clone());
        match author {
            None => Err(ApiError::not_found(POST_NOT_FOUND)),
            Some(author) if author != session.user_id => Err(ApiError::forbidden(
                "No tienes permiso para eliminar este post",
            )),
            Some(_) => {
                *doc = None;
                Ok(())
            }
        }
    })?;

    if let Err(e) = outcome {
        return Ok(e.into());
    }

    store.update_json(FEED_KEY, |feed: &mut Option<Vec<String>>| {
        if let Some(feed) = feed {
            feed.retain(|id| id != post_id);
        }
    })?;

    info!(post_id = %post_id, "post deleted");

    json_response(
        200,
        &serde_json::json!({ "message": "Post eliminado correctamente" }),
    )
}

/// Likes or unlikes a post for the session user. Membership test and write
/// happen inside one store update, so concurrent toggles serialize.
pub fn toggle_like<S: DocumentStore>(
    store: &S,
    session: Option<&Session>,
    post_id: &str,
) -> anyhow::Result<Response> {
    let Some(session) = session else {
        return Ok(ApiError::Unauthorized.into());
    };

    if !validate_uuid(post_id) {
        return Ok(ApiError::bad_request(INVALID_ID).into());
    }

    let toggled = store.update_json(&post_key(post_id), |doc: &mut Option<Post>| {
        doc.as_mut()
            .map(|post| (post.toggle_like(&session.user_id), post.likes.len()))
    })?;

    let Some((liked, likes_count)) = toggled else {
        return Ok(ApiError::not_found(POST_NOT_FOUND).into());
    };

    json_response(
        200,
        &serde_json::json!({
            "message": if liked { "Like agregado" } else { "Like removido" },
            "liked": liked,
            "likesCount": likes_count,
        }),
    )
}
