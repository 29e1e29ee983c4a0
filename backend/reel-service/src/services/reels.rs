use std::sync::Arc;

use tracing::info;

use crate::clock::Clock;
use crate::domain::{FeedItem, NewPost, Post, DEFAULT_POST_TITLE};
use crate::error::{AppError, AppResult};
use crate::repository::UserDirectory;

/// Registration of already-stored reel files and the global feed
#[derive(Clone)]
pub struct ReelService {
    directory: Arc<dyn UserDirectory>,
    clock: Arc<dyn Clock>,
}

impl ReelService {
    pub fn new(directory: Arc<dyn UserDirectory>, clock: Arc<dyn Clock>) -> Self {
        Self { directory, clock }
    }

    pub async fn register(&self, owner: &str, title: Option<&str>, file: &str) -> AppResult<Post> {
        let file = file.trim();
        if file.is_empty() {
            return Err(AppError::Validation("File reference is required".into()));
        }
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_POST_TITLE);

        let post = self
            .directory
            .add_post(
                owner,
                NewPost {
                    title: title.to_string(),
                    file: file.to_string(),
                    created_at: self.clock.now(),
                },
            )
            .await?;
        info!(post_id = %post.id, "reel registered");
        Ok(post)
    }

    /// Every reel, newest first
    pub async fn feed(&self) -> AppResult<Vec<FeedItem>> {
        self.directory.all_posts().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::domain::NewUser;
    use crate::repository::InMemoryStore;
    use chrono::{Duration, Utc};

    async fn setup() -> (ReelService, Arc<ManualClock>) {
        let store = Arc::new(InMemoryStore::new());
        for email in ["a@x.io", "b@x.io"] {
            store
                .create_user(NewUser {
                    email: email.into(),
                    name: email.into(),
                    password_hash: None,
                })
                .await
                .unwrap();
        }
        let clock = Arc::new(ManualClock::new(Utc::now()));
        (ReelService::new(store, clock.clone()), clock)
    }

    #[tokio::test]
    async fn missing_title_defaults() {
        let (service, _) = setup().await;
        let post = service.register("a@x.io", None, "/uploads/1.mp4").await.unwrap();
        assert_eq!(post.title, "Untitled");
        let post = service.register("a@x.io", Some("  "), "/uploads/2.mp4").await.unwrap();
        assert_eq!(post.title, "Untitled");
    }

    #[tokio::test]
    async fn empty_file_rejected() {
        let (service, _) = setup().await;
        assert!(matches!(
            service.register("a@x.io", Some("x"), "").await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn feed_is_newest_first_with_owner() {
        let (service, clock) = setup().await;
        service.register("a@x.io", Some("first"), "/uploads/1.mp4").await.unwrap();
        clock.advance(Duration::minutes(1));
        service.register("b@x.io", Some("second"), "/uploads/2.mp4").await.unwrap();

        let feed = service.feed().await.unwrap();
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].title, "second");
        assert_eq!(feed[0].owner_email, "b@x.io");
        assert_eq!(feed[1].owner_email, "a@x.io");
    }
}
