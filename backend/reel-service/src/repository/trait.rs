use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::domain::{
    CounterKind, FeedItem, FollowAction, Message, NewMessage, NewPost, NewUser, Post,
    ProfileUpdate, PublicProfile, User,
};
use crate::error::AppResult;

/// User profiles, their posts, and the follow graph.
/// Both the in-memory store and PostgresStore implement this.
#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    /// Full user record with posts, counters and both follow lists
    async fn find_user(&self, email: &str) -> AppResult<Option<User>>;

    /// Fails with `EmailTaken` if the email is already registered
    async fn create_user(&self, user: NewUser) -> AppResult<User>;

    async fn update_profile(&self, email: &str, update: ProfileUpdate) -> AppResult<User>;

    async fn set_password_hash(&self, email: &str, password_hash: &str) -> AppResult<()>;

    /// Follow `target` if `actor` does not follow it yet, otherwise unfollow.
    /// Both users' views of the edge change together.
    async fn toggle_follow(&self, actor: &str, target: &str) -> AppResult<FollowAction>;

    /// Public profiles for the given emails, in input order; unknown emails are skipped
    async fn profiles_for(&self, emails: &[String]) -> AppResult<Vec<PublicProfile>>;

    /// Case-insensitive substring match on name or email
    async fn search_users(
        &self,
        query: &str,
        exclude: &str,
        limit: usize,
    ) -> AppResult<Vec<PublicProfile>>;

    /// Fails with `Conflict` if the file reference is already registered
    async fn add_post(&self, owner: &str, post: NewPost) -> AppResult<Post>;

    /// Every post with its owner, newest first
    async fn all_posts(&self) -> AppResult<Vec<FeedItem>>;

    /// Increment the post counter and its owner's aggregate; returns the new post-level value
    async fn increment_post_counter(&self, file: &str, kind: CounterKind) -> AppResult<i64>;
}

/// Append-only log of direct messages.
#[async_trait::async_trait]
pub trait MessageStore: Send + Sync {
    async fn insert_message(&self, message: NewMessage) -> AppResult<Message>;

    /// For each peer, the most recent message exchanged with `me` in either
    /// direction, keyed by peer email. Peers with no messages are absent.
    /// Among messages with the same timestamp the last one stored wins.
    async fn latest_with_each(
        &self,
        me: &str,
        peers: &[String],
    ) -> AppResult<HashMap<String, Message>>;

    /// The most recent `limit` messages between `a` and `b`, oldest first
    async fn conversation(&self, a: &str, b: &str, limit: usize) -> AppResult<Vec<Message>>;

    /// Mark messages from `from` to `to` created at or before `up_to` read;
    /// returns how many changed
    async fn mark_read(&self, from: &str, to: &str, up_to: DateTime<Utc>) -> AppResult<u64>;
}
