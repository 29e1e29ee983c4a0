use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::{ContactSummary, User};
use crate::error::{AppError, AppResult};
use crate::repository::{MessageStore, UserDirectory};

pub const PREVIEW_CHARS: usize = 50;

/// Builds the chat contact list: everyone the user follows or is followed by,
/// each with the latest message exchanged, most recent conversation first.
#[derive(Clone)]
pub struct ContactAggregator {
    directory: Arc<dyn UserDirectory>,
    messages: Arc<dyn MessageStore>,
}

/// Following first, then followers, without duplicates or the user themself.
pub fn contact_candidates(user: &User) -> Vec<String> {
    let mut seen = HashSet::new();
    user.following
        .iter()
        .chain(user.followers.iter())
        .filter(|email| **email != user.email)
        .filter(|email| seen.insert(email.as_str()))
        .cloned()
        .collect()
}

/// First 50 characters, with `...` appended when the content is longer.
pub fn preview(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

pub fn format_time(at: DateTime<Utc>) -> String {
    at.format("%H:%M").to_string()
}

fn contact_order(a: &ContactSummary, b: &ContactSummary) -> Ordering {
    match (a.last_message_at, b.last_message_at) {
        (Some(x), Some(y)) => y.cmp(&x).then_with(|| a.email.cmp(&b.email)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.email.cmp(&b.email),
    }
}

/// Contacts with messages first, newest first; the rest by email.
pub fn sort_contacts(contacts: &mut [ContactSummary]) {
    contacts.sort_by(contact_order);
}

impl ContactAggregator {
    pub fn new(directory: Arc<dyn UserDirectory>, messages: Arc<dyn MessageStore>) -> Self {
        Self {
            directory,
            messages,
        }
    }

    pub async fn list_chat_contacts(&self, me: &str) -> AppResult<Vec<ContactSummary>> {
        let user = self
            .directory
            .find_user(me)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;

        let candidates = contact_candidates(&user);
        // Contacts whose account no longer exists drop out here
        let profiles = self.directory.profiles_for(&candidates).await?;
        let mut latest = self.messages.latest_with_each(me, &candidates).await?;

        let mut contacts: Vec<ContactSummary> = profiles
            .into_iter()
            .map(|profile| {
                let last = latest.remove(&profile.email);
                ContactSummary {
                    last_message: last.as_ref().map(|m| preview(&m.content)),
                    last_message_time: last.as_ref().map(|m| format_time(m.created_at)),
                    last_message_at: last.map(|m| m.created_at),
                    email: profile.email,
                    name: profile.name,
                    profile_pic: profile.profile_pic,
                }
            })
            .collect();

        sort_contacts(&mut contacts);
        tracing::debug!(count = contacts.len(), "chat contacts assembled");
        Ok(contacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Analytics, Message, NewMessage, NewUser};
    use crate::repository::InMemoryStore;
    use chrono::{Duration, TimeZone};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    fn summary(email: &str, at: Option<DateTime<Utc>>) -> ContactSummary {
        ContactSummary {
            email: email.into(),
            name: email.into(),
            profile_pic: "/default.png".into(),
            last_message: at.map(|_| "hi".into()),
            last_message_time: at.map(format_time),
            last_message_at: at,
        }
    }

    #[test]
    fn preview_truncates_past_fifty_chars() {
        let fifty = "a".repeat(50);
        let fifty_one = "b".repeat(51);
        assert_eq!(preview(&fifty), fifty);
        assert_eq!(preview(&fifty_one), format!("{}...", "b".repeat(50)));
        assert_eq!(preview(""), "");
    }

    #[test]
    fn preview_counts_chars_not_bytes() {
        let text = "é".repeat(51);
        assert_eq!(preview(&text), format!("{}...", "é".repeat(50)));
    }

    #[test]
    fn time_is_hours_and_minutes() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 59).unwrap();
        assert_eq!(format_time(at), "07:05");
    }

    #[test]
    fn sorts_recent_first_then_silent() {
        let now = Utc::now();
        let mut contacts = vec![
            summary("c3@x.io", None),
            summary("c2@x.io", Some(now - Duration::hours(1))),
            summary("c1@x.io", Some(now - Duration::minutes(5))),
        ];
        sort_contacts(&mut contacts);
        let order: Vec<_> = contacts.iter().map(|c| c.email.as_str()).collect();
        assert_eq!(order, vec!["c1@x.io", "c2@x.io", "c3@x.io"]);
    }

    #[test]
    fn sorts_on_timestamp_not_formatted_time() {
        // 23:00 yesterday formats "later" than 01:00 today
        let today = Utc.with_ymd_and_hms(2024, 3, 10, 1, 0, 0).unwrap();
        let yesterday = Utc.with_ymd_and_hms(2024, 3, 9, 23, 0, 0).unwrap();
        let mut contacts = vec![summary("old@x.io", Some(yesterday)), summary("new@x.io", Some(today))];
        sort_contacts(&mut contacts);
        assert_eq!(contacts[0].email, "new@x.io");
    }

    #[test]
    fn ties_and_silent_contacts_order_by_email() {
        let at = Utc::now();
        let mut contacts = vec![
            summary("z@x.io", None),
            summary("b@x.io", Some(at)),
            summary("y@x.io", None),
            summary("a@x.io", Some(at)),
        ];
        sort_contacts(&mut contacts);
        let order: Vec<_> = contacts.iter().map(|c| c.email.as_str()).collect();
        assert_eq!(order, vec!["a@x.io", "b@x.io", "y@x.io", "z@x.io"]);
    }

    #[test]
    fn candidates_union_dedupes_and_drops_self() {
        let user = User {
            email: "me@x.io".into(),
            name: "me".into(),
            profile_pic: "/default.png".into(),
            password_hash: None,
            posts: vec![],
            analytics: Analytics::default(),
            followers: vec!["b@x.io".into(), "c@x.io".into(), "me@x.io".into()],
            following: vec!["a@x.io".into(), "b@x.io".into()],
        };
        assert_eq!(contact_candidates(&user), vec!["a@x.io", "b@x.io", "c@x.io"]);
    }

    #[tokio::test]
    async fn lists_contacts_with_latest_message() {
        let store = Arc::new(InMemoryStore::new());
        for email in ["me@x.io", "c1@x.io", "c2@x.io", "c3@x.io"] {
            store
                .create_user(NewUser {
                    email: email.into(),
                    name: email.into(),
                    password_hash: None,
                })
                .await
                .unwrap();
        }
        store.toggle_follow("me@x.io", "c1@x.io").await.unwrap();
        store.toggle_follow("c2@x.io", "me@x.io").await.unwrap();
        store.toggle_follow("me@x.io", "c3@x.io").await.unwrap();

        let now = Utc::now();
        for (from, to, content, at) in [
            ("c2@x.io", "me@x.io", "an hour ago", now - Duration::hours(1)),
            ("me@x.io", "c1@x.io", "older", now - Duration::minutes(30)),
            ("c1@x.io", "me@x.io", "five minutes ago", now - Duration::minutes(5)),
        ] {
            store
                .insert_message(NewMessage {
                    sender: from.into(),
                    receiver: to.into(),
                    content: content.into(),
                    created_at: at,
                })
                .await
                .unwrap();
        }

        let aggregator = ContactAggregator::new(store.clone(), store.clone());
        let contacts = aggregator.list_chat_contacts("me@x.io").await.unwrap();

        let order: Vec<_> = contacts.iter().map(|c| c.email.as_str()).collect();
        assert_eq!(order, vec!["c1@x.io", "c2@x.io", "c3@x.io"]);
        assert_eq!(contacts[0].last_message.as_deref(), Some("five minutes ago"));
        assert!(contacts[2].last_message.is_none());
        assert!(contacts[2].last_message_time.is_none());
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let store = Arc::new(InMemoryStore::new());
        let aggregator = ContactAggregator::new(store.clone(), store);
        assert!(matches!(
            aggregator.list_chat_contacts("ghost@x.io").await,
            Err(AppError::NotFound(_))
        ));
    }

    /// Counts round trips to the message log
    struct CountingLog {
        inner: InMemoryStore,
        lookups: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl MessageStore for CountingLog {
        async fn insert_message(&self, message: NewMessage) -> AppResult<Message> {
            self.inner.insert_message(message).await
        }

        async fn latest_with_each(
            &self,
            me: &str,
            peers: &[String],
        ) -> AppResult<HashMap<String, Message>> {
            self.lookups.fetch_add(1, AtomicOrdering::SeqCst);
            self.inner.latest_with_each(me, peers).await
        }

        async fn conversation(&self, a: &str, b: &str, limit: usize) -> AppResult<Vec<Message>> {
            self.inner.conversation(a, b, limit).await
        }

        async fn mark_read(&self, from: &str, to: &str, up_to: DateTime<Utc>) -> AppResult<u64> {
            self.inner.mark_read(from, to, up_to).await
        }
    }

    #[tokio::test]
    async fn many_contacts_resolved_in_one_lookup() {
        let directory = Arc::new(InMemoryStore::new());
        let log = Arc::new(CountingLog {
            inner: InMemoryStore::new(),
            lookups: AtomicUsize::new(0),
        });
        directory
            .create_user(NewUser {
                email: "me@x.io".into(),
                name: "me".into(),
                password_hash: None,
            })
            .await
            .unwrap();

        let now = Utc::now();
        for i in 0..300 {
            let email = format!("fan{i:03}@x.io");
            directory
                .create_user(NewUser {
                    email: email.clone(),
                    name: email.clone(),
                    password_hash: None,
                })
                .await
                .unwrap();
            directory.toggle_follow(&email, "me@x.io").await.unwrap();
            if i % 10 == 0 {
                log.insert_message(NewMessage {
                    sender: email,
                    receiver: "me@x.io".into(),
                    content: format!("hello {i}"),
                    created_at: now + Duration::seconds(i),
                })
                .await
                .unwrap();
            }
        }

        let aggregator = ContactAggregator::new(directory, log.clone());
        let contacts = aggregator.list_chat_contacts("me@x.io").await.unwrap();

        assert_eq!(contacts.len(), 300);
        assert_eq!(log.lookups.load(AtomicOrdering::SeqCst), 1);
        assert_eq!(contacts[0].email, "fan290@x.io");
        assert_eq!(contacts[0].last_message.as_deref(), Some("hello 290"));
        assert_eq!(contacts.iter().filter(|c| c.last_message.is_some()).count(), 30);
    }
}
