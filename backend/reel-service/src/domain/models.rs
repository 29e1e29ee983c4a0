use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_PROFILE_PIC: &str = "/default.png";
pub const DEFAULT_POST_TITLE: &str = "Untitled";

/// Canonical form of an email used as identity key
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Aggregate counters summed over every post a user owns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analytics {
    pub views: i64,
    pub likes: i64,
}

/// User entity with its posts and both sides of the follow graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    pub name: String,
    pub profile_pic: String,
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub posts: Vec<Post>,
    pub analytics: Analytics,
    pub followers: Vec<String>,
    pub following: Vec<String>,
}

impl User {
    pub fn is_following(&self, other: &str) -> bool {
        self.following.iter().any(|e| e == other)
    }

    pub fn public_profile(&self) -> PublicProfile {
        PublicProfile {
            name: self.name.clone(),
            email: self.email.clone(),
            profile_pic: self.profile_pic.clone(),
        }
    }
}

/// Reel entity - a registered video file owned by one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    /// Stored file reference, unique across the service
    pub file: String,
    pub views: i64,
    pub likes: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub file: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub profile_pic: Option<String>,
}

/// Direct message between two users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender: String,
    pub receiver: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub sender: String,
    pub receiver: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl NewMessage {
    pub fn into_message(self) -> Message {
        Message {
            id: Uuid::new_v4(),
            sender: self.sender,
            receiver: self.receiver,
            content: self.content,
            created_at: self.created_at,
            read: false,
        }
    }
}

/// One row of the chat contact list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactSummary {
    pub email: String,
    pub name: String,
    pub profile_pic: String,
    pub last_message: Option<String>,
    /// `HH:MM` in UTC
    pub last_message_time: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicProfile {
    pub name: String,
    pub email: String,
    pub profile_pic: String,
}

/// Post flattened with its owner for the feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: Uuid,
    pub title: String,
    pub file: String,
    pub views: i64,
    pub likes: i64,
    pub created_at: DateTime<Utc>,
    pub owner_email: String,
    pub owner_name: String,
    pub owner_profile_pic: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowAction {
    Follow,
    Unfollow,
}

impl FollowAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            FollowAction::Follow => "follow",
            FollowAction::Unfollow => "unfollow",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterKind {
    Like,
    View,
}

impl CounterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CounterKind::Like => "like",
            CounterKind::View => "view",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_is_never_serialized() {
        let user = User {
            email: "a@x.io".into(),
            name: "a".into(),
            profile_pic: DEFAULT_PROFILE_PIC.into(),
            password_hash: Some("$argon2id$secret".into()),
            posts: vec![],
            analytics: Analytics::default(),
            followers: vec![],
            following: vec![],
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("password_hash"));
    }

    #[test]
    fn emails_are_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn follow_action_wire_format() {
        assert_eq!(
            serde_json::to_value(FollowAction::Unfollow).unwrap(),
            serde_json::json!("unfollow")
        );
    }
}
