use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::r#trait::{MessageStore, UserDirectory};
use crate::domain::{
    Analytics, CounterKind, FeedItem, FollowAction, Message, NewMessage, NewPost, NewUser, Post,
    ProfileUpdate, PublicProfile, User, DEFAULT_PROFILE_PIC,
};
use crate::error::{AppError, AppResult};

#[derive(Default)]
struct Directory {
    users: HashMap<String, User>,
    /// file reference -> owner email
    post_owners: HashMap<String, String>,
}

/// Process-local store used by tests and by deployments without a database.
///
/// Every mutation holds the write lock for its whole read-modify-write, so
/// follow toggles and counter increments never act on a stale copy.
#[derive(Default)]
pub struct InMemoryStore {
    directory: RwLock<Directory>,
    messages: RwLock<Vec<Message>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn involves(message: &Message, a: &str, b: &str) -> bool {
    (message.sender == a && message.receiver == b) || (message.sender == b && message.receiver == a)
}

#[async_trait::async_trait]
impl UserDirectory for InMemoryStore {
    async fn find_user(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self.directory.read().await.users.get(email).cloned())
    }

    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let mut dir = self.directory.write().await;
        if dir.users.contains_key(&user.email) {
            return Err(AppError::EmailTaken);
        }
        let created = User {
            email: user.email.clone(),
            name: user.name,
            profile_pic: DEFAULT_PROFILE_PIC.to_string(),
            password_hash: user.password_hash,
            posts: Vec::new(),
            analytics: Analytics::default(),
            followers: Vec::new(),
            following: Vec::new(),
        };
        dir.users.insert(user.email, created.clone());
        Ok(created)
    }

    async fn update_profile(&self, email: &str, update: ProfileUpdate) -> AppResult<User> {
        let mut dir = self.directory.write().await;
        let user = dir
            .users
            .get_mut(email)
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;
        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(pic) = update.profile_pic {
            user.profile_pic = pic;
        }
        Ok(user.clone())
    }

    async fn set_password_hash(&self, email: &str, password_hash: &str) -> AppResult<()> {
        let mut dir = self.directory.write().await;
        let user = dir
            .users
            .get_mut(email)
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;
        user.password_hash = Some(password_hash.to_string());
        Ok(())
    }

    async fn toggle_follow(&self, actor: &str, target: &str) -> AppResult<FollowAction> {
        let mut dir = self.directory.write().await;
        if !dir.users.contains_key(actor) || !dir.users.contains_key(target) {
            return Err(AppError::NotFound("User not found".into()));
        }

        let already = dir
            .users
            .get(actor)
            .map(|u| u.is_following(target))
            .unwrap_or(false);

        if let Some(actor_user) = dir.users.get_mut(actor) {
            if already {
                actor_user.following.retain(|e| e != target);
            } else {
                actor_user.following.push(target.to_string());
            }
        }
        if let Some(target_user) = dir.users.get_mut(target) {
            if already {
                target_user.followers.retain(|e| e != actor);
            } else {
                target_user.followers.push(actor.to_string());
            }
        }

        Ok(if already {
            FollowAction::Unfollow
        } else {
            FollowAction::Follow
        })
    }

    async fn profiles_for(&self, emails: &[String]) -> AppResult<Vec<PublicProfile>> {
        let dir = self.directory.read().await;
        Ok(emails
            .iter()
            .filter_map(|email| dir.users.get(email).map(User::public_profile))
            .collect())
    }

    async fn search_users(
        &self,
        query: &str,
        exclude: &str,
        limit: usize,
    ) -> AppResult<Vec<PublicProfile>> {
        let needle = query.to_lowercase();
        let dir = self.directory.read().await;
        let mut matches: Vec<PublicProfile> = dir
            .users
            .values()
            .filter(|u| u.email != exclude)
            .filter(|u| {
                u.name.to_lowercase().contains(&needle) || u.email.to_lowercase().contains(&needle)
            })
            .map(User::public_profile)
            .collect();
        matches.sort_by(|a, b| a.email.cmp(&b.email));
        matches.truncate(limit);
        Ok(matches)
    }

    async fn add_post(&self, owner: &str, post: NewPost) -> AppResult<Post> {
        let mut dir = self.directory.write().await;
        if dir.post_owners.contains_key(&post.file) {
            return Err(AppError::Conflict("File is already registered".into()));
        }
        let user = dir
            .users
            .get_mut(owner)
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;
        let created = Post {
            id: Uuid::new_v4(),
            title: post.title,
            file: post.file,
            views: 0,
            likes: 0,
            created_at: post.created_at,
        };
        user.posts.push(created.clone());
        dir.post_owners
            .insert(created.file.clone(), owner.to_string());
        Ok(created)
    }

    async fn all_posts(&self) -> AppResult<Vec<FeedItem>> {
        let dir = self.directory.read().await;
        let mut feed: Vec<FeedItem> = dir
            .users
            .values()
            .flat_map(|user| {
                user.posts.iter().map(move |post| FeedItem {
                    id: post.id,
                    title: post.title.clone(),
                    file: post.file.clone(),
                    views: post.views,
                    likes: post.likes,
                    created_at: post.created_at,
                    owner_email: user.email.clone(),
                    owner_name: user.name.clone(),
                    owner_profile_pic: user.profile_pic.clone(),
                })
            })
            .collect();
        feed.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.file.cmp(&b.file)));
        Ok(feed)
    }

    async fn increment_post_counter(&self, file: &str, kind: CounterKind) -> AppResult<i64> {
        let mut dir = self.directory.write().await;
        let owner = dir
            .post_owners
            .get(file)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Reel not found".into()))?;
        let user = dir
            .users
            .get_mut(&owner)
            .ok_or_else(|| AppError::NotFound("Reel not found".into()))?;
        let post = user
            .posts
            .iter_mut()
            .find(|p| p.file == file)
            .ok_or_else(|| AppError::NotFound("Reel not found".into()))?;

        let value = match kind {
            CounterKind::Like => {
                post.likes += 1;
                post.likes
            }
            CounterKind::View => {
                post.views += 1;
                post.views
            }
        };
        match kind {
            CounterKind::Like => user.analytics.likes += 1,
            CounterKind::View => user.analytics.views += 1,
        }
        Ok(value)
    }
}

#[async_trait::async_trait]
impl MessageStore for InMemoryStore {
    async fn insert_message(&self, message: NewMessage) -> AppResult<Message> {
        let stored = message.into_message();
        self.messages.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn latest_with_each(
        &self,
        me: &str,
        peers: &[String],
    ) -> AppResult<HashMap<String, Message>> {
        let peers: HashSet<&str> = peers.iter().map(String::as_str).collect();
        let messages = self.messages.read().await;
        let mut latest: HashMap<String, Message> = HashMap::new();

        // Log order is insertion order, so `>=` lets the later of two equal timestamps win
        for message in messages.iter() {
            let peer = if message.sender == me {
                message.receiver.as_str()
            } else if message.receiver == me {
                message.sender.as_str()
            } else {
                continue;
            };
            if !peers.contains(peer) {
                continue;
            }
            match latest.get(peer) {
                Some(current) if current.created_at > message.created_at => {}
                _ => {
                    latest.insert(peer.to_string(), message.clone());
                }
            }
        }
        Ok(latest)
    }

    async fn conversation(&self, a: &str, b: &str, limit: usize) -> AppResult<Vec<Message>> {
        let messages = self.messages.read().await;
        let mut thread: Vec<Message> = messages
            .iter()
            .filter(|m| involves(m, a, b))
            .cloned()
            .collect();
        thread.sort_by_key(|m| m.created_at);
        let skip = thread.len().saturating_sub(limit);
        Ok(thread.split_off(skip))
    }

    async fn mark_read(&self, from: &str, to: &str, up_to: DateTime<Utc>) -> AppResult<u64> {
        let mut messages = self.messages.write().await;
        let mut changed = 0;
        for message in messages
            .iter_mut()
            .filter(|m| m.sender == from && m.receiver == to && !m.read && m.created_at <= up_to)
        {
            message.read = true;
            changed += 1;
        }
        Ok(changed)
    }
}
