//! Feed handlers - posts are public to read and owner-only to change.

use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;
use uuid::Uuid;

use quill_core::domain::{Creator, PostView};
use quill_core::services::ImageSource;
use quill_shared::dto::{
    CreatePostResponse, CreatorResponse, MessageResponse, PostEnvelope, PostResponse,
    PostsPageResponse,
};

use super::form::read_post_form;
use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    /// Kept as text so that junk falls back to the first page.
    pub page: Option<String>,
}

/// GET /feed/posts?page=N
pub async fn list_posts(
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let page = query.page.as_deref().and_then(|p| p.trim().parse::<i64>().ok());

    let result = state.feed.list_posts(page).await?;

    Ok(HttpResponse::Ok().json(PostsPageResponse {
        message: "Fetched posts successfully.".to_string(),
        posts: result.posts.into_iter().map(post_response).collect(),
        total_items: result.total_items,
    }))
}

/// POST /feed/post - Protected route
pub async fn create_post(
    state: web::Data<AppState>,
    identity: Identity,
    req: HttpRequest,
    payload: web::Payload,
) -> AppResult<HttpResponse> {
    let form = read_post_form(&req, payload, state.max_image_bytes).await?;

    let image = match form.image {
        ImageSource::Upload(upload) => Some(upload),
        ImageSource::Existing(_) | ImageSource::Missing => None,
    };

    let view = state
        .feed
        .create_post(identity.user_id, form.input, image)
        .await?;

    let creator = creator_response(&view.creator);
    Ok(HttpResponse::Created().json(CreatePostResponse {
        message: "Post created successfully!".to_string(),
        post: post_response(view),
        creator,
    }))
}

/// GET /feed/post/{postId}
pub async fn get_post(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let post_id = parse_post_id(&path)?;

    let view = state.feed.get_post(post_id).await?;

    Ok(HttpResponse::Ok().json(PostEnvelope {
        message: "Post fetched.".to_string(),
        post: post_response(view),
    }))
}

/// PUT /feed/post/{postId} - Protected route
pub async fn update_post(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
    req: HttpRequest,
    payload: web::Payload,
) -> AppResult<HttpResponse> {
    let post_id = parse_post_id(&path)?;
    let form = read_post_form(&req, payload, state.max_image_bytes).await?;

    let view = state
        .feed
        .update_post(identity.user_id, post_id, form.input, form.image)
        .await?;

    Ok(HttpResponse::Ok().json(PostEnvelope {
        message: "Post updated!".to_string(),
        post: post_response(view),
    }))
}

/// DELETE /feed/post/{postId} - Protected route
pub async fn delete_post(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let post_id = parse_post_id(&path)?;

    state.feed.delete_post(identity.user_id, post_id).await?;

    Ok(HttpResponse::Ok().json(MessageResponse::new("Post deleted.")))
}

/// Ids that do not parse can never match a post.
fn parse_post_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound("Could not find post.".to_string()))
}

pub(crate) fn creator_response(creator: &Creator) -> CreatorResponse {
    CreatorResponse {
        id: creator.id,
        name: creator.name.clone(),
    }
}

pub(crate) fn post_response(view: PostView) -> PostResponse {
    let creator = creator_response(&view.creator);
    let post = view.post;
    PostResponse {
        id: post.id,
        title: post.title,
        content: post.content,
        image_url: post.image_url,
        creator,
        created_at: post.created_at,
        updated_at: post.updated_at,
    }
}
