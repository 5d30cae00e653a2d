//! Auth and feed services wired to the in-memory store, Argon2, JWT and a
//! temporary image directory.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::broadcast::Receiver;
use uuid::Uuid;

use quill_core::domain::{DEFAULT_STATUS, Post, User};
use quill_core::error::RepoError;
use quill_core::ports::{
    BaseRepository, ImageStore, ImageUpload, PostEvent, PostRepository, StorageError,
    TokenService, UserRepository,
};
use quill_core::services::{AuthService, FeedService, ImageSource, PostInput, SignupInput};
use quill_core::{DomainError, ErrorKind};
use quill_infra::database::{InMemoryPostRepository, InMemoryUserRepository};
use quill_infra::{
    Argon2PasswordService, BroadcastNotifier, InMemoryStore, JwtConfig, JwtTokenService,
    LocalImageStore,
};

struct Harness {
    store: InMemoryStore,
    tokens: Arc<JwtTokenService>,
    auth: AuthService,
    feed: FeedService,
    events: Receiver<PostEvent>,
    images: LocalImageStore,
    _dir: tempfile::TempDir,
}

fn harness() -> Harness {
    harness_with_images(|store| Arc::new(store) as Arc<dyn ImageStore>)
}

fn harness_with_images(
    wrap: impl FnOnce(LocalImageStore) -> Arc<dyn ImageStore>,
) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let images = LocalImageStore::new(dir.path().join("images"));
    let store = InMemoryStore::new();
    let tokens = Arc::new(JwtTokenService::new(JwtConfig {
        secret: "test-secret".to_string(),
        ..JwtConfig::default()
    }));
    let notifier = Arc::new(BroadcastNotifier::default());
    let events = notifier.subscribe();

    let auth = AuthService::new(
        Arc::new(store.users()),
        Arc::new(Argon2PasswordService::new()),
        tokens.clone(),
    );
    let feed = FeedService::new(
        Arc::new(store.posts()),
        Arc::new(store.users()),
        wrap(images.clone()),
        notifier,
    );

    Harness {
        store,
        tokens,
        auth,
        feed,
        events,
        images,
        _dir: dir,
    }
}

fn png(name: &str) -> ImageUpload {
    ImageUpload::new(name, "image/png", vec![1u8, 2, 3])
}

async fn signup(h: &Harness, email: &str, name: &str) -> Uuid {
    h.auth
        .signup(SignupInput::new(email, "pass1", name))
        .await
        .unwrap()
        .id
}

fn kind<T: std::fmt::Debug>(result: Result<T, DomainError>) -> ErrorKind {
    result.unwrap_err().kind()
}

#[tokio::test]
async fn test_signup_stores_hashed_password() {
    let h = harness();

    let id = signup(&h, "a@x.com", "A").await;

    let user = h.store.users().find_by_id(id).await.unwrap().unwrap();
    assert_ne!(user.password_hash, "pass1");
    assert_eq!(user.status, DEFAULT_STATUS);
    assert_eq!(user.name, "A");
}

#[tokio::test]
async fn test_signup_rejects_duplicates_and_bad_input() {
    let h = harness();
    signup(&h, "a@x.com", "A").await;

    let duplicate = h.auth.signup(SignupInput::new("A@X.COM", "pass1", "B")).await;
    match duplicate.unwrap_err() {
        DomainError::Validation { errors, .. } => assert_eq!(errors[0].field, "email"),
        other => panic!("unexpected error: {other:?}"),
    }

    let invalid = h.auth.signup(SignupInput::new("nope", "1234", " ")).await;
    match invalid.unwrap_err() {
        DomainError::Validation { errors, .. } => {
            let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
            assert_eq!(fields, vec!["email", "name", "password"]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_login_rejects_wrong_password_and_unknown_email() {
    let h = harness();
    signup(&h, "a@x.com", "A").await;

    assert_eq!(kind(h.auth.login("a@x.com", "wrong").await), ErrorKind::Unauthorized);
    assert_eq!(kind(h.auth.login("b@x.com", "pass1").await), ErrorKind::Unauthorized);
}

#[tokio::test]
async fn test_login_token_decodes_to_user() {
    let h = harness();
    let id = signup(&h, "a@x.com", "A").await;

    let outcome = h.auth.login("a@x.com", "pass1").await.unwrap();

    assert_eq!(outcome.user_id, id);
    assert_eq!(outcome.expires_in, 3600);
    let claims = h.tokens.validate_token(&outcome.token).unwrap();
    assert_eq!(claims.user_id, id);
    assert_eq!(claims.email, "a@x.com");
}

#[tokio::test]
async fn test_status_read_and_update() {
    let h = harness();
    let id = signup(&h, "a@x.com", "A").await;

    assert_eq!(h.auth.status(id).await.unwrap(), DEFAULT_STATUS);

    h.auth.update_status(id, "  Writing  ").await.unwrap();
    assert_eq!(h.auth.status(id).await.unwrap(), "Writing");

    assert_eq!(kind(h.auth.update_status(id, "   ").await), ErrorKind::Validation);
    assert_eq!(kind(h.auth.status(Uuid::new_v4()).await), ErrorKind::NotFound);
    assert_eq!(
        kind(h.auth.update_status(Uuid::new_v4(), "Away").await),
        ErrorKind::NotFound
    );
}

/// User repository that lets a pending post land between any read of the
/// user and the next status write, the way a concurrent create would.
struct InterleavedUsers {
    users: InMemoryUserRepository,
    posts: InMemoryPostRepository,
    pending: Mutex<Option<Post>>,
}

impl InterleavedUsers {
    async fn land_pending_post(&self) {
        let pending = self.pending.lock().unwrap().take();
        if let Some(post) = pending {
            self.posts.insert_for_creator(post).await.unwrap();
        }
    }
}

#[async_trait]
impl BaseRepository<User, Uuid> for InterleavedUsers {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let snapshot = self.users.find_by_id(id).await;
        self.land_pending_post().await;
        snapshot
    }

    async fn insert(&self, user: User) -> Result<User, RepoError> {
        self.users.insert(user).await
    }

    async fn update(&self, user: User) -> Result<User, RepoError> {
        self.users.update(user).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.users.delete(id).await
    }
}

#[async_trait]
impl UserRepository for InterleavedUsers {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        self.users.find_by_email(email).await
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
        self.users.find_by_ids(ids).await
    }

    async fn update_status(&self, id: Uuid, status: &str) -> Result<(), RepoError> {
        self.land_pending_post().await;
        self.users.update_status(id, status).await
    }
}

#[tokio::test]
async fn test_status_update_keeps_concurrently_created_post() {
    let h = harness();
    let id = signup(&h, "a@x.com", "A").await;
    let post = Post::new(
        id,
        "Racing post".to_string(),
        "Some content".to_string(),
        "images/a.png".to_string(),
    );
    let post_id = post.id;
    let auth = AuthService::new(
        Arc::new(InterleavedUsers {
            users: h.store.users(),
            posts: h.store.posts(),
            pending: Mutex::new(Some(post)),
        }),
        Arc::new(Argon2PasswordService::new()),
        h.tokens.clone(),
    );

    auth.update_status(id, "Busy").await.unwrap();

    let owner = h.store.users().find_by_id(id).await.unwrap().unwrap();
    assert_eq!(owner.status, "Busy");
    assert_eq!(owner.posts, vec![post_id]);
}

#[tokio::test]
async fn test_create_post_links_creator_and_broadcasts() {
    let mut h = harness();
    let id = signup(&h, "a@x.com", "A").await;

    let view = h
        .feed
        .create_post(id, PostInput::new("First post", "Hello there"), Some(png("a.png")))
        .await
        .unwrap();

    assert_eq!(view.creator.name, "A");
    assert_eq!(view.post.creator_id, id);
    let owner = h.store.users().find_by_id(id).await.unwrap().unwrap();
    assert_eq!(owner.posts, vec![view.post.id]);

    match h.events.recv().await.unwrap() {
        PostEvent::Created(event) => assert_eq!(event.post.id, view.post.id),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_create_post_requires_accepted_image() {
    let h = harness();
    let id = signup(&h, "a@x.com", "A").await;
    let input = PostInput::new("First post", "Hello there");

    assert_eq!(
        kind(h.feed.create_post(id, input.clone(), None).await),
        ErrorKind::Validation
    );
    let gif = ImageUpload::new("a.gif", "image/gif", vec![1u8]);
    assert_eq!(
        kind(h.feed.create_post(id, input, Some(gif)).await),
        ErrorKind::Validation
    );
    assert_eq!(
        kind(
            h.feed
                .create_post(id, PostInput::new("Hi", "Hello there"), Some(png("a.png")))
                .await
        ),
        ErrorKind::Validation
    );

    let owner = h.store.users().find_by_id(id).await.unwrap().unwrap();
    assert!(owner.posts.is_empty());
}

#[tokio::test]
async fn test_list_posts_pages_newest_first() {
    let h = harness();
    let id = signup(&h, "a@x.com", "A").await;
    for n in 0..3 {
        h.feed
            .create_post(
                id,
                PostInput::new(&format!("Post {n}"), "Some content"),
                Some(png("a.png")),
            )
            .await
            .unwrap();
    }

    let first = h.feed.list_posts(Some(1)).await.unwrap();
    let second = h.feed.list_posts(Some(2)).await.unwrap();
    let clamped = h.feed.list_posts(Some(0)).await.unwrap();

    assert_eq!(first.total_items, 3);
    assert_eq!(first.posts.len(), 2);
    assert_eq!(second.posts.len(), 1);
    assert!(first.posts[0].post.created_at >= first.posts[1].post.created_at);
    assert!(first.posts[1].post.created_at >= second.posts[0].post.created_at);
    assert_eq!(first.posts[0].creator.name, "A");
    assert_eq!(
        clamped.posts.iter().map(|v| v.post.id).collect::<Vec<_>>(),
        first.posts.iter().map(|v| v.post.id).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_list_posts_past_the_end_is_empty() {
    let h = harness();
    let id = signup(&h, "a@x.com", "A").await;
    h.feed
        .create_post(id, PostInput::new("Only post", "Some content"), Some(png("a.png")))
        .await
        .unwrap();

    for page in [2, i64::MAX / 2, i64::MAX] {
        let result = h.feed.list_posts(Some(page)).await.unwrap();
        assert!(result.posts.is_empty());
        assert_eq!(result.total_items, 1);
    }
}

#[tokio::test]
async fn test_get_missing_post_is_not_found() {
    let h = harness();

    assert_eq!(kind(h.feed.get_post(Uuid::new_v4()).await), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_non_creator_cannot_update_or_delete() {
    let h = harness();
    let owner = signup(&h, "a@x.com", "A").await;
    let intruder = signup(&h, "b@x.com", "B").await;
    let view = h
        .feed
        .create_post(owner, PostInput::new("Original", "Original body"), Some(png("a.png")))
        .await
        .unwrap();
    let post_id = view.post.id;

    let update = h
        .feed
        .update_post(
            intruder,
            post_id,
            PostInput::new("Hijacked", "Hijacked body"),
            ImageSource::Existing(view.post.image_url.clone()),
        )
        .await;
    assert_eq!(kind(update), ErrorKind::Forbidden);
    assert_eq!(kind(h.feed.delete_post(intruder, post_id).await), ErrorKind::Forbidden);

    let unchanged = h.feed.get_post(post_id).await.unwrap();
    assert_eq!(unchanged.post.title, "Original");
    let owner_after = h.store.users().find_by_id(owner).await.unwrap().unwrap();
    assert_eq!(owner_after.posts, vec![post_id]);
}

#[tokio::test]
async fn test_update_with_new_image_replaces_file() {
    let h = harness();
    let id = signup(&h, "a@x.com", "A").await;
    let view = h
        .feed
        .create_post(id, PostInput::new("Original", "Original body"), Some(png("a.png")))
        .await
        .unwrap();
    let old_path = h.images.root().join(view.post.image_url.trim_start_matches("images/"));
    assert!(old_path.exists());

    let updated = h
        .feed
        .update_post(
            id,
            view.post.id,
            PostInput::new("Renamed", "New body text"),
            ImageSource::Upload(png("b.png")),
        )
        .await
        .unwrap();

    assert_eq!(updated.post.title, "Renamed");
    assert_ne!(updated.post.image_url, view.post.image_url);
    assert!(!old_path.exists());
}

#[tokio::test]
async fn test_update_image_reference_rules() {
    let h = harness();
    let id = signup(&h, "a@x.com", "A").await;
    let view = h
        .feed
        .create_post(id, PostInput::new("Original", "Original body"), Some(png("a.png")))
        .await
        .unwrap();
    let input = PostInput::new("Renamed", "New body text");

    let kept = h
        .feed
        .update_post(
            id,
            view.post.id,
            input.clone(),
            ImageSource::Existing(view.post.image_url.clone()),
        )
        .await
        .unwrap();
    assert_eq!(kept.post.image_url, view.post.image_url);

    let missing = h
        .feed
        .update_post(id, view.post.id, input.clone(), ImageSource::Missing)
        .await;
    assert_eq!(kind(missing), ErrorKind::Validation);

    let foreign = h
        .feed
        .update_post(id, view.post.id, input, ImageSource::Existing("images/other.png".into()))
        .await;
    assert_eq!(kind(foreign), ErrorKind::Validation);
}

#[tokio::test]
async fn test_delete_post_unlinks_and_broadcasts_id() {
    let mut h = harness();
    let id = signup(&h, "a@x.com", "A").await;
    let keep = h
        .feed
        .create_post(id, PostInput::new("Keep this", "Some content"), Some(png("a.png")))
        .await
        .unwrap();
    let drop = h
        .feed
        .create_post(id, PostInput::new("Drop this", "Some content"), Some(png("b.png")))
        .await
        .unwrap();
    let before = h.store.users().find_by_id(id).await.unwrap().unwrap().posts.len();

    h.feed.delete_post(id, drop.post.id).await.unwrap();

    let owner = h.store.users().find_by_id(id).await.unwrap().unwrap();
    assert_eq!(owner.posts.len(), before - 1);
    assert_eq!(owner.posts, vec![keep.post.id]);
    assert_eq!(kind(h.feed.get_post(drop.post.id).await), ErrorKind::NotFound);

    let mut last = None;
    while let Ok(event) = h.events.try_recv() {
        last = Some(event);
    }
    match last {
        Some(PostEvent::Deleted(post_id)) => assert_eq!(post_id, drop.post.id),
        other => panic!("unexpected event: {other:?}"),
    }
}

/// Stores images normally but can never delete them.
struct UndeletableImages(LocalImageStore);

#[async_trait]
impl ImageStore for UndeletableImages {
    async fn store(&self, upload: &ImageUpload) -> Result<String, StorageError> {
        self.0.store(upload).await
    }

    async fn remove(&self, _image_url: &str) -> Result<(), StorageError> {
        Err(StorageError::Io("permission denied".to_string()))
    }
}

#[tokio::test]
async fn test_image_removal_failure_does_not_fail_delete() {
    let h =
        harness_with_images(|store| Arc::new(UndeletableImages(store)) as Arc<dyn ImageStore>);
    let id = signup(&h, "a@x.com", "A").await;
    let view = h
        .feed
        .create_post(id, PostInput::new("Some title", "Some content"), Some(png("a.png")))
        .await
        .unwrap();

    h.feed.delete_post(id, view.post.id).await.unwrap();

    assert_eq!(h.feed.list_posts(None).await.unwrap().total_items, 0);
}
