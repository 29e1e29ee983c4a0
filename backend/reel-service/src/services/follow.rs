use std::sync::Arc;

use tracing::info;

use crate::domain::{normalize_email, FollowAction, PublicProfile};
use crate::error::{AppError, AppResult};
use crate::metrics::FOLLOW_TOGGLES_TOTAL;
use crate::repository::UserDirectory;

#[derive(Clone)]
pub struct FollowService {
    directory: Arc<dyn UserDirectory>,
}

impl FollowService {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }

    /// Follow `target` or, if already following, unfollow it.
    pub async fn toggle(&self, actor: &str, target: &str) -> AppResult<FollowAction> {
        let target = normalize_email(target);
        if target.is_empty() {
            return Err(AppError::Validation("Target email is required".into()));
        }
        if actor == target {
            return Err(AppError::SelfFollow);
        }

        let action = self.directory.toggle_follow(actor, &target).await?;
        FOLLOW_TOGGLES_TOTAL
            .with_label_values(&[action.as_str()])
            .inc();
        info!(action = action.as_str(), "follow graph updated");
        Ok(action)
    }

    pub async fn followers(&self, email: &str) -> AppResult<Vec<PublicProfile>> {
        let user = self
            .directory
            .find_user(&normalize_email(email))
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;
        self.directory.profiles_for(&user.followers).await
    }

    pub async fn following(&self, email: &str) -> AppResult<Vec<PublicProfile>> {
        let user = self
            .directory
            .find_user(&normalize_email(email))
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;
        self.directory.profiles_for(&user.following).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewUser;
    use crate::repository::InMemoryStore;

    async fn service_with(emails: &[&str]) -> (FollowService, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        for email in emails {
            store
                .create_user(NewUser {
                    email: email.to_string(),
                    name: email.to_string(),
                    password_hash: None,
                })
                .await
                .unwrap();
        }
        (FollowService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn toggling_twice_restores_graph() {
        let (service, store) = service_with(&["a@x.io", "b@x.io"]).await;
        let before_a = store.find_user("a@x.io").await.unwrap().unwrap();
        let before_b = store.find_user("b@x.io").await.unwrap().unwrap();

        assert_eq!(service.toggle("a@x.io", "b@x.io").await.unwrap(), FollowAction::Follow);
        assert_eq!(service.toggle("a@x.io", "b@x.io").await.unwrap(), FollowAction::Unfollow);

        let after_a = store.find_user("a@x.io").await.unwrap().unwrap();
        let after_b = store.find_user("b@x.io").await.unwrap().unwrap();
        assert_eq!(before_a.following, after_a.following);
        assert_eq!(before_a.followers, after_a.followers);
        assert_eq!(before_b.following, after_b.following);
        assert_eq!(before_b.followers, after_b.followers);
    }

    #[tokio::test]
    async fn self_follow_always_fails() {
        let (service, _) = service_with(&["a@x.io"]).await;
        assert!(matches!(
            service.toggle("a@x.io", "a@x.io").await,
            Err(AppError::SelfFollow)
        ));
        assert!(matches!(
            service.toggle("a@x.io", " A@X.io ").await,
            Err(AppError::SelfFollow)
        ));
    }

    #[tokio::test]
    async fn lists_resolve_profiles() {
        let (service, _) = service_with(&["a@x.io", "b@x.io", "c@x.io"]).await;
        service.toggle("b@x.io", "a@x.io").await.unwrap();
        service.toggle("c@x.io", "a@x.io").await.unwrap();

        let followers = service.followers("a@x.io").await.unwrap();
        let emails: Vec<_> = followers.iter().map(|p| p.email.as_str()).collect();
        assert_eq!(emails, vec!["b@x.io", "c@x.io"]);

        let following = service.following("b@x.io").await.unwrap();
        assert_eq!(following.len(), 1);
        assert_eq!(following[0].email, "a@x.io");

        assert!(matches!(
            service.followers("ghost@x.io").await,
            Err(AppError::NotFound(_))
        ));
    }
}
