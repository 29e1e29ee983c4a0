use std::sync::Arc;

use tracing::info;

use crate::clock::Clock;
use crate::domain::{normalize_email, Message, NewMessage};
use crate::error::{AppError, AppResult};
use crate::metrics::MESSAGES_SENT_TOTAL;
use crate::repository::{MessageStore, UserDirectory};

pub const CONVERSATION_LIMIT: usize = 100;

#[derive(Clone)]
pub struct MessageService {
    directory: Arc<dyn UserDirectory>,
    messages: Arc<dyn MessageStore>,
    clock: Arc<dyn Clock>,
}

impl MessageService {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        messages: Arc<dyn MessageStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            directory,
            messages,
            clock,
        }
    }

    pub async fn send_message(
        &self,
        sender: &str,
        receiver: &str,
        content: &str,
    ) -> AppResult<Message> {
        let receiver = normalize_email(receiver);
        let content = content.trim();
        if receiver.is_empty() || content.is_empty() {
            return Err(AppError::Validation(
                "Receiver and content are required".into(),
            ));
        }

        if self.directory.find_user(&receiver).await?.is_none() {
            return Err(AppError::NotFound("Receiver not found".into()));
        }

        let message = self
            .messages
            .insert_message(NewMessage {
                sender: sender.to_string(),
                receiver,
                content: content.to_string(),
                created_at: self.clock.now(),
            })
            .await?;

        MESSAGES_SENT_TOTAL.inc();
        info!(message_id = %message.id, "message stored");
        Ok(message)
    }

    /// Latest messages between `me` and `other`, oldest first.
    /// Marks what `other` sent to `me` up to the newest returned message as
    /// read; the returned messages carry their state from before that update.
    pub async fn fetch_conversation(&self, me: &str, other: &str) -> AppResult<Vec<Message>> {
        let other = normalize_email(other);
        let thread = self
            .messages
            .conversation(me, &other, CONVERSATION_LIMIT)
            .await?;
        // Anything stored after the read above stays unread
        if let Some(newest) = thread.last().map(|m| m.created_at) {
            let marked = self.messages.mark_read(&other, me, newest).await?;
            if marked > 0 {
                tracing::debug!(marked, "messages marked read");
            }
        }
        Ok(thread)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::domain::NewUser;
    use crate::repository::InMemoryStore;
    use chrono::{Duration, Utc};

    async fn setup() -> (MessageService, Arc<ManualClock>) {
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
        (MessageService::new(store.clone(), store, clock.clone()), clock)
    }

    #[tokio::test]
    async fn content_is_trimmed() {
        let (service, _) = setup().await;
        let message = service.send_message("a@x.io", "b@x.io", "  hello  ").await.unwrap();
        assert_eq!(message.content, "hello");
        assert!(!message.read);
    }

    #[tokio::test]
    async fn blank_content_rejected() {
        let (service, _) = setup().await;
        assert!(matches!(
            service.send_message("a@x.io", "b@x.io", "   ").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.send_message("a@x.io", "", "hi").await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn unknown_receiver_rejected() {
        let (service, _) = setup().await;
        assert!(matches!(
            service.send_message("a@x.io", "ghost@x.io", "hi").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn fetching_marks_incoming_read() {
        let (service, clock) = setup().await;
        service.send_message("b@x.io", "a@x.io", "first").await.unwrap();
        clock.advance(Duration::seconds(1));
        service.send_message("a@x.io", "b@x.io", "second").await.unwrap();
        clock.advance(Duration::seconds(1));
        service.send_message("b@x.io", "a@x.io", "third").await.unwrap();

        let first = service.fetch_conversation("a@x.io", "b@x.io").await.unwrap();
        let contents: Vec<_> = first.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
        assert!(first.iter().all(|m| !m.read));

        let again = service.fetch_conversation("a@x.io", "b@x.io").await.unwrap();
        for message in &again {
            assert_eq!(message.read, message.sender == "b@x.io");
        }
    }

    /// Message log where a new message from b lands right after each
    /// conversation read, before the caller gets to mark anything
    struct ArrivingStore {
        inner: InMemoryStore,
    }

    #[async_trait::async_trait]
    impl MessageStore for ArrivingStore {
        async fn insert_message(&self, message: NewMessage) -> AppResult<Message> {
            self.inner.insert_message(message).await
        }

        async fn latest_with_each(
            &self,
            me: &str,
            peers: &[String],
        ) -> AppResult<std::collections::HashMap<String, Message>> {
            self.inner.latest_with_each(me, peers).await
        }

        async fn conversation(&self, a: &str, b: &str, limit: usize) -> AppResult<Vec<Message>> {
            let thread = self.inner.conversation(a, b, limit).await?;
            let after = thread.last().map(|m| m.created_at).unwrap_or_else(Utc::now);
            self.inner
                .insert_message(NewMessage {
                    sender: "b@x.io".into(),
                    receiver: "a@x.io".into(),
                    content: "just arrived".into(),
                    created_at: after + Duration::seconds(1),
                })
                .await?;
            Ok(thread)
        }

        async fn mark_read(
            &self,
            from: &str,
            to: &str,
            up_to: chrono::DateTime<Utc>,
        ) -> AppResult<u64> {
            self.inner.mark_read(from, to, up_to).await
        }
    }

    #[tokio::test]
    async fn message_arriving_during_fetch_stays_unread() {
        let directory = Arc::new(InMemoryStore::new());
        for email in ["a@x.io", "b@x.io"] {
            directory
                .create_user(NewUser {
                    email: email.into(),
                    name: email.into(),
                    password_hash: None,
                })
                .await
                .unwrap();
        }
        let log = Arc::new(ArrivingStore {
            inner: InMemoryStore::new(),
        });
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let service = MessageService::new(directory, log.clone(), clock);

        service.send_message("b@x.io", "a@x.io", "hello").await.unwrap();
        let thread = service.fetch_conversation("a@x.io", "b@x.io").await.unwrap();
        assert_eq!(thread.len(), 1);

        let stored = log.inner.conversation("a@x.io", "b@x.io", 100).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored[0].read);
        assert_eq!(stored[1].content, "just arrived");
        assert!(!stored[1].read);
    }
}
