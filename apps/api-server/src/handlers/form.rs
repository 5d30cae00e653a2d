//! Post form decoding: multipart uploads or a JSON body.

use actix_multipart::{Field, Multipart};
use actix_web::{HttpRequest, http::header, web};
use bytes::BytesMut;
use futures::StreamExt;

use quill_core::ports::ImageUpload;
use quill_core::services::{ImageSource, PostInput};
use quill_shared::dto::PostJsonRequest;

use crate::middleware::error::{AppError, AppResult};

/// Upper bound for text fields and JSON bodies.
const TEXT_LIMIT: usize = 64 * 1024;

/// A decoded create/update post body.
#[derive(Debug)]
pub struct PostForm {
    pub input: PostInput,
    pub image: ImageSource,
}

/// Decode a post body from `multipart/form-data` or `application/json`.
///
/// In multipart bodies `image` is either a file part or a text part holding
/// the post's current image path.
pub async fn read_post_form(
    req: &HttpRequest,
    payload: web::Payload,
    max_image_bytes: usize,
) -> AppResult<PostForm> {
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        read_multipart(req, payload, max_image_bytes).await
    } else if content_type.starts_with("application/json") {
        read_json(payload).await
    } else {
        Err(AppError::malformed(format!(
            "unsupported content type '{content_type}'"
        )))
    }
}

async fn read_multipart(
    req: &HttpRequest,
    payload: web::Payload,
    max_image_bytes: usize,
) -> AppResult<PostForm> {
    let mut multipart = Multipart::new(req.headers(), payload);

    let mut title = String::new();
    let mut content = String::new();
    let mut image = ImageSource::Missing;

    while let Some(field) = multipart.next().await {
        let mut field = field.map_err(AppError::malformed)?;
        let name = field.name().unwrap_or_default().to_string();

        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);

        match (name.as_str(), file_name) {
            ("image", Some(file_name)) => {
                let content_type = field
                    .content_type()
                    .map(|mime| mime.essence_str().to_string())
                    .unwrap_or_default();
                let data = read_field(&mut field, max_image_bytes, "image").await?;

                tracing::debug!(%file_name, %content_type, bytes = data.len(), "Received image");
                image =
                    ImageSource::Upload(ImageUpload::new(file_name, content_type, data.freeze()));
            }
            ("image", None) => {
                let text = read_text(&mut field, "image").await?;
                if !text.trim().is_empty() {
                    image = ImageSource::Existing(text.trim().to_string());
                }
            }
            ("title", _) => title = read_text(&mut field, "title").await?,
            ("content", _) => content = read_text(&mut field, "content").await?,
            _ => {
                // Unknown parts are drained and dropped
                read_field(&mut field, TEXT_LIMIT, &name).await?;
            }
        }
    }

    Ok(PostForm {
        input: PostInput::new(&title, &content),
        image,
    })
}

async fn read_json(mut payload: web::Payload) -> AppResult<PostForm> {
    let mut body = BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(AppError::malformed)?;
        if body.len() + chunk.len() > TEXT_LIMIT {
            return Err(AppError::malformed("JSON body too large"));
        }
        body.extend_from_slice(&chunk);
    }

    let req: PostJsonRequest = serde_json::from_slice(&body).map_err(AppError::malformed)?;

    let image = match req.image {
        Some(path) if !path.trim().is_empty() => ImageSource::Existing(path.trim().to_string()),
        _ => ImageSource::Missing,
    };

    Ok(PostForm {
        input: PostInput::new(&req.title, &req.content),
        image,
    })
}

async fn read_field(field: &mut Field, limit: usize, name: &str) -> AppResult<BytesMut> {
    let mut data = BytesMut::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(AppError::malformed)?;
        if data.len() + chunk.len() > limit {
            return Err(AppError::invalid_field(
                name,
                format!("Must not exceed {limit} bytes."),
            ));
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

async fn read_text(field: &mut Field, name: &str) -> AppResult<String> {
    let data = read_field(field, TEXT_LIMIT, name).await?;
    String::from_utf8(data.to_vec()).map_err(AppError::malformed)
}
