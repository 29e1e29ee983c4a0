use std::sync::Arc;

use crate::domain::{normalize_email, ProfileUpdate, PublicProfile, User};
use crate::error::{AppError, AppResult};
use crate::repository::UserDirectory;

pub const MIN_SEARCH_LEN: usize = 2;
pub const SEARCH_LIMIT: usize = 20;

#[derive(Clone)]
pub struct UserService {
    directory: Arc<dyn UserDirectory>,
}

impl UserService {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }

    pub async fn get_profile(&self, email: &str) -> AppResult<User> {
        self.directory
            .find_user(&normalize_email(email))
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }

    /// Blank fields are ignored rather than clearing the stored value
    pub async fn update_profile(&self, email: &str, update: ProfileUpdate) -> AppResult<User> {
        let clean = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let update = ProfileUpdate {
            name: clean(update.name),
            profile_pic: clean(update.profile_pic),
        };
        self.directory.update_profile(email, update).await
    }

    /// Case-insensitive match on name or email, excluding the caller.
    /// Queries shorter than two characters return nothing.
    pub async fn search(&self, me: &str, query: &str) -> AppResult<Vec<PublicProfile>> {
        let query = query.trim();
        if query.chars().count() < MIN_SEARCH_LEN {
            return Ok(Vec::new());
        }
        self.directory.search_users(query, me, SEARCH_LIMIT).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewUser;
    use crate::repository::InMemoryStore;

    async fn service() -> UserService {
        let store = Arc::new(InMemoryStore::new());
        for i in 0..25 {
            store
                .create_user(NewUser {
                    email: format!("user{i:02}@x.io"),
                    name: format!("Member {i}"),
                    password_hash: None,
                })
                .await
                .unwrap();
        }
        UserService::new(store)
    }

    #[tokio::test]
    async fn short_queries_return_nothing() {
        let service = service().await;
        assert!(service.search("user00@x.io", "u").await.unwrap().is_empty());
        assert!(service.search("user00@x.io", " ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_is_capped_and_excludes_caller() {
        let service = service().await;
        let found = service.search("user00@x.io", "MEMBER").await.unwrap();
        assert_eq!(found.len(), SEARCH_LIMIT);
        assert!(found.iter().all(|p| p.email != "user00@x.io"));
    }

    #[tokio::test]
    async fn blank_update_fields_are_ignored() {
        let service = service().await;
        let updated = service
            .update_profile(
                "user01@x.io",
                ProfileUpdate {
                    name: Some("  ".into()),
                    profile_pic: Some("/uploads/me.png".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Member 1");
        assert_eq!(updated.profile_pic, "/uploads/me.png");
    }

    #[tokio::test]
    async fn unknown_profile_is_not_found() {
        let service = service().await;
        assert!(matches!(
            service.get_profile("ghost@x.io").await,
            Err(AppError::NotFound(_))
        ));
    }
}
