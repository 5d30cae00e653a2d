//! Blog feed: listing, fetching and owner-only mutation of posts.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::domain::{Creator, Post, PostPage, PostView};
use crate::error::DomainError;
use crate::ports::{
    ImageStore, ImageUpload, PostEvent, PostNotifier, PostRepository, UserRepository,
};

/// Fixed feed page size.
pub const POSTS_PER_PAGE: u64 = 2;

/// Editable post fields after trimming.
#[derive(Debug, Clone, Validate)]
pub struct PostInput {
    #[validate(length(min = 5, message = "Title must be at least 5 characters long."))]
    pub title: String,
    #[validate(length(min = 5, message = "Content must be at least 5 characters long."))]
    pub content: String,
}

impl PostInput {
    pub fn new(title: &str, content: &str) -> Self {
        Self {
            title: title.trim().to_string(),
            content: content.trim().to_string(),
        }
    }
}

/// Where the image of an updated post comes from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// A newly uploaded file replaces the current image.
    Upload(ImageUpload),
    /// The client refers to the image the post already has.
    Existing(String),
    Missing,
}

/// Clamp a requested page number to the first page when absent or below 1.
pub fn normalize_page(page: Option<i64>) -> u64 {
    page.filter(|p| *p >= 1).map(|p| p as u64).unwrap_or(1)
}

/// Feed service - every post mutation is broadcast through the notifier.
pub struct FeedService {
    posts: Arc<dyn PostRepository>,
    users: Arc<dyn UserRepository>,
    images: Arc<dyn ImageStore>,
    notifier: Arc<dyn PostNotifier>,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        users: Arc<dyn UserRepository>,
        images: Arc<dyn ImageStore>,
        notifier: Arc<dyn PostNotifier>,
    ) -> Self {
        Self {
            posts,
            users,
            images,
            notifier,
        }
    }

    /// One page of posts, newest first, with the total post count.
    pub async fn list_posts(&self, page: Option<i64>) -> Result<PostPage, DomainError> {
        let page = normalize_page(page);
        let offset = (page - 1).saturating_mul(POSTS_PER_PAGE);

        let total_items = self.posts.count().await?;
        if offset >= total_items {
            return Ok(PostPage {
                posts: Vec::new(),
                total_items,
            });
        }
        let posts = self.posts.find_page(offset, POSTS_PER_PAGE).await?;

        let mut creator_ids: Vec<Uuid> = posts.iter().map(|p| p.creator_id).collect();
        creator_ids.sort();
        creator_ids.dedup();

        let creators: HashMap<Uuid, Creator> = self
            .users
            .find_by_ids(&creator_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, Creator { id: u.id, name: u.name }))
            .collect();

        let posts = posts
            .into_iter()
            .map(|post| {
                let creator = creators.get(&post.creator_id).cloned().unwrap_or_else(|| {
                    tracing::warn!(
                        post_id = %post.id,
                        creator_id = %post.creator_id,
                        "Post creator is missing"
                    );
                    Creator {
                        id: post.creator_id,
                        name: String::new(),
                    }
                });
                PostView { post, creator }
            })
            .collect();

        Ok(PostPage { posts, total_items })
    }

    pub async fn get_post(&self, post_id: Uuid) -> Result<PostView, DomainError> {
        let post = self.find_post(post_id).await?;
        let creator = self.creator_of(&post).await?;
        Ok(PostView { post, creator })
    }

    /// Create a post owned by `user_id`. An accepted image is required.
    pub async fn create_post(
        &self,
        user_id: Uuid,
        input: PostInput,
        image: Option<ImageUpload>,
    ) -> Result<PostView, DomainError> {
        input.validate()?;
        let upload = image
            .filter(ImageUpload::is_accepted)
            .ok_or_else(|| DomainError::invalid_field("image", "No image provided."))?;

        let user = self.users.find_by_id(user_id).await?.ok_or(DomainError::NotFound {
            entity_type: "User",
            id: user_id,
        })?;

        let image_url = self.images.store(&upload).await?;
        let post = Post::new(user_id, input.title, input.content, image_url.clone());

        let post = match self.posts.insert_for_creator(post).await {
            Ok(post) => post,
            Err(e) => {
                self.discard_image(&image_url).await;
                return Err(e.into());
            }
        };

        tracing::info!(post_id = %post.id, user_id = %user_id, "Post created");

        let view = PostView {
            post,
            creator: Creator {
                id: user.id,
                name: user.name,
            },
        };
        self.notifier.broadcast(&PostEvent::Created(view.clone()));

        Ok(view)
    }

    /// Replace title, content and optionally the image of a post owned by `user_id`.
    pub async fn update_post(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        input: PostInput,
        image: ImageSource,
    ) -> Result<PostView, DomainError> {
        input.validate()?;
        let image = match image {
            ImageSource::Upload(upload) if upload.is_accepted() => ImageSource::Upload(upload),
            ImageSource::Existing(url) if !url.trim().is_empty() => {
                ImageSource::Existing(url.trim().to_string())
            }
            _ => return Err(DomainError::invalid_field("image", "No file picked.")),
        };

        let mut post = self.find_post(post_id).await?;
        ensure_creator(&post, user_id)?;

        let previous_image = post.image_url.clone();
        let image_url = match image {
            ImageSource::Upload(upload) => self.images.store(&upload).await?,
            ImageSource::Existing(reference) if refers_to(&reference, &previous_image) => {
                previous_image.clone()
            }
            _ => {
                return Err(DomainError::invalid_field(
                    "image",
                    "Image reference does not match the post.",
                ));
            }
        };
        let image_changed = image_url != previous_image;

        post.title = input.title;
        post.content = input.content;
        post.image_url = image_url.clone();
        post.updated_at = Utc::now();

        let post = match self.posts.update(post).await {
            Ok(post) => post,
            Err(e) => {
                if image_changed {
                    self.discard_image(&image_url).await;
                }
                return Err(e.into());
            }
        };

        if image_changed {
            self.discard_image(&previous_image).await;
        }

        tracing::info!(post_id = %post.id, image_changed, "Post updated");

        let creator = self.creator_of(&post).await?;
        let view = PostView { post, creator };
        self.notifier.broadcast(&PostEvent::Updated(view.clone()));

        Ok(view)
    }

    /// Delete a post owned by `user_id` together with its image.
    pub async fn delete_post(&self, user_id: Uuid, post_id: Uuid) -> Result<(), DomainError> {
        let post = self.find_post(post_id).await?;
        ensure_creator(&post, user_id)?;

        self.posts.delete_for_creator(&post).await?;
        self.discard_image(&post.image_url).await;

        tracing::info!(post_id = %post.id, user_id = %user_id, "Post deleted");

        self.notifier.broadcast(&PostEvent::Deleted(post.id));

        Ok(())
    }

    async fn find_post(&self, post_id: Uuid) -> Result<Post, DomainError> {
        self.posts
            .find_by_id(post_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity_type: "Post",
                id: post_id,
            })
    }

    async fn creator_of(&self, post: &Post) -> Result<Creator, DomainError> {
        let user = self
            .users
            .find_by_id(post.creator_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity_type: "User",
                id: post.creator_id,
            })?;

        Ok(Creator {
            id: user.id,
            name: user.name,
        })
    }

    /// Best-effort: a file that cannot be removed is only logged.
    async fn discard_image(&self, image_url: &str) {
        if let Err(e) = self.images.remove(image_url).await {
            tracing::warn!(image_url = %image_url, error = %e, "Failed to remove image");
        }
    }
}

fn ensure_creator(post: &Post, user_id: Uuid) -> Result<(), DomainError> {
    if post.is_created_by(user_id) {
        Ok(())
    } else {
        Err(DomainError::Forbidden("Not authorized!".to_string()))
    }
}

/// Accepts `images/x.png`, `/images/x.png` or an absolute URL ending in the stored path.
fn refers_to(reference: &str, image_url: &str) -> bool {
    let reference = reference.trim_start_matches('/');
    reference == image_url || reference.ends_with(&format!("/{image_url}"))
}
