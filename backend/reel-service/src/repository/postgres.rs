use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::r#trait::{MessageStore, UserDirectory};
use crate::domain::{
    Analytics, CounterKind, FeedItem, FollowAction, Message, NewMessage, NewPost, NewUser, Post,
    ProfileUpdate, PublicProfile, User, DEFAULT_PROFILE_PIC,
};
use crate::error::{AppError, AppResult};

/// PostgreSQL-backed directory and message log (source of truth)
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    email: String,
    name: String,
    profile_pic: String,
    password_hash: Option<String>,
    total_views: i64,
    total_likes: i64,
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    title: String,
    file_ref: String,
    views: i64,
    likes: i64,
    created_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            title: row.title,
            file: row.file_ref,
            views: row.views,
            likes: row.likes,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct FeedRow {
    id: Uuid,
    title: String,
    file_ref: String,
    views: i64,
    likes: i64,
    created_at: DateTime<Utc>,
    owner_email: String,
    owner_name: String,
    owner_profile_pic: String,
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    name: String,
    email: String,
    profile_pic: String,
}

impl From<ProfileRow> for PublicProfile {
    fn from(row: ProfileRow) -> Self {
        PublicProfile {
            name: row.name,
            email: row.email,
            profile_pic: row.profile_pic,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    sender_email: String,
    receiver_email: String,
    content: String,
    created_at: DateTime<Utc>,
    is_read: bool,
}

#[derive(sqlx::FromRow)]
struct LatestRow {
    peer: String,
    #[sqlx(flatten)]
    message: MessageRow,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            id: row.id,
            sender: row.sender_email,
            receiver: row.receiver_email,
            content: row.content,
            created_at: row.created_at,
            read: row.is_read,
        }
    }
}

/// Escape `%`, `_` and `\` so user input matches literally inside ILIKE
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn edge_list(&self, sql: &str, email: &str) -> AppResult<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(sql)
            .bind(email)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(e,)| e).collect())
    }
}

#[async_trait::async_trait]
impl UserDirectory for PostgresStore {
    async fn find_user(&self, email: &str) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT email, name, profile_pic, password_hash, total_views, total_likes
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let posts = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, title, file_ref, views, likes, created_at
            FROM posts
            WHERE owner_email = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await?;

        let followers = self
            .edge_list(
                "SELECT follower_email FROM follows WHERE followee_email = $1 ORDER BY created_at",
                email,
            )
            .await?;
        let following = self
            .edge_list(
                "SELECT followee_email FROM follows WHERE follower_email = $1 ORDER BY created_at",
                email,
            )
            .await?;

        Ok(Some(User {
            email: row.email,
            name: row.name,
            profile_pic: row.profile_pic,
            password_hash: row.password_hash,
            posts: posts.into_iter().map(Post::from).collect(),
            analytics: Analytics {
                views: row.total_views,
                likes: row.total_likes,
            },
            followers,
            following,
        }))
    }

    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (email, name, profile_pic, password_hash, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(&user.email)
        .bind(&user.name)
        .bind(DEFAULT_PROFILE_PIC)
        .bind(&user.password_hash)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::EmailTaken);
        }

        debug!("Created user in PostgreSQL");
        Ok(User {
            email: user.email,
            name: user.name,
            profile_pic: DEFAULT_PROFILE_PIC.to_string(),
            password_hash: user.password_hash,
            posts: Vec::new(),
            analytics: Analytics::default(),
            followers: Vec::new(),
            following: Vec::new(),
        })
    }

    async fn update_profile(&self, email: &str, update: ProfileUpdate) -> AppResult<User> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                profile_pic = COALESCE($3, profile_pic)
            WHERE email = $1
            "#,
        )
        .bind(email)
        .bind(update.name)
        .bind(update.profile_pic)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".into()));
        }

        self.find_user(email)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }

    async fn set_password_hash(&self, email: &str, password_hash: &str) -> AppResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE email = $1")
            .bind(email)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".into()));
        }
        Ok(())
    }

    async fn toggle_follow(&self, actor: &str, target: &str) -> AppResult<FollowAction> {
        let mut tx = self.pool.begin().await?;

        // Lock both users so concurrent toggles on the same pair serialize
        let locked: Vec<(String,)> = sqlx::query_as(
            "SELECT email FROM users WHERE email = ANY($1) ORDER BY email FOR UPDATE",
        )
        .bind(vec![actor.to_string(), target.to_string()])
        .fetch_all(&mut *tx)
        .await?;

        if locked.len() != 2 {
            return Err(AppError::NotFound("User not found".into()));
        }

        let removed = sqlx::query(
            "DELETE FROM follows WHERE follower_email = $1 AND followee_email = $2",
        )
        .bind(actor)
        .bind(target)
        .execute(&mut *tx)
        .await?;

        let action = if removed.rows_affected() > 0 {
            FollowAction::Unfollow
        } else {
            sqlx::query(
                r#"
                INSERT INTO follows (follower_email, followee_email, created_at)
                VALUES ($1, $2, NOW())
                ON CONFLICT (follower_email, followee_email) DO NOTHING
                "#,
            )
            .bind(actor)
            .bind(target)
            .execute(&mut *tx)
            .await?;
            FollowAction::Follow
        };

        tx.commit().await?;

        debug!(action = action.as_str(), "Toggled follow edge in PostgreSQL");
        Ok(action)
    }

    async fn profiles_for(&self, emails: &[String]) -> AppResult<Vec<PublicProfile>> {
        if emails.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, ProfileRow>(
            "SELECT name, email, profile_pic FROM users WHERE email = ANY($1)",
        )
        .bind(emails)
        .fetch_all(&self.pool)
        .await?;

        let mut by_email: HashMap<String, PublicProfile> = rows
            .into_iter()
            .map(|row| (row.email.clone(), PublicProfile::from(row)))
            .collect();

        Ok(emails
            .iter()
            .filter_map(|email| by_email.remove(email))
            .collect())
    }

    async fn search_users(
        &self,
        query: &str,
        exclude: &str,
        limit: usize,
    ) -> AppResult<Vec<PublicProfile>> {
        let rows = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT name, email, profile_pic
            FROM users
            WHERE email <> $1
              AND (name ILIKE $2 ESCAPE '\' OR email ILIKE $2 ESCAPE '\')
            ORDER BY email
            LIMIT $3
            "#,
        )
        .bind(exclude)
        .bind(like_pattern(query))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(PublicProfile::from).collect())
    }

    async fn add_post(&self, owner: &str, post: NewPost) -> AppResult<Post> {
        let exists: Option<(String,)> = sqlx::query_as("SELECT email FROM users WHERE email = $1")
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound("User not found".into()));
        }

        let row = sqlx::query_as::<_, PostRow>(
            r#"
            INSERT INTO posts (id, owner_email, title, file_ref, views, likes, created_at)
            VALUES ($1, $2, $3, $4, 0, 0, $5)
            ON CONFLICT (file_ref) DO NOTHING
            RETURNING id, title, file_ref, views, likes, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner)
        .bind(&post.title)
        .bind(&post.file)
        .bind(post.created_at)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Post::from)
            .ok_or_else(|| AppError::Conflict("File is already registered".into()))
    }

    async fn all_posts(&self) -> AppResult<Vec<FeedItem>> {
        let rows = sqlx::query_as::<_, FeedRow>(
            r#"
            SELECT p.id, p.title, p.file_ref, p.views, p.likes, p.created_at,
                   u.email AS owner_email, u.name AS owner_name, u.profile_pic AS owner_profile_pic
            FROM posts p
            JOIN users u ON u.email = p.owner_email
            ORDER BY p.created_at DESC, p.file_ref ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| FeedItem {
                id: row.id,
                title: row.title,
                file: row.file_ref,
                views: row.views,
                likes: row.likes,
                created_at: row.created_at,
                owner_email: row.owner_email,
                owner_name: row.owner_name,
                owner_profile_pic: row.owner_profile_pic,
            })
            .collect())
    }

    async fn increment_post_counter(&self, file: &str, kind: CounterKind) -> AppResult<i64> {
        let (post_sql, owner_sql) = match kind {
            CounterKind::Like => (
                "UPDATE posts SET likes = likes + 1 WHERE file_ref = $1 RETURNING owner_email, likes",
                "UPDATE users SET total_likes = total_likes + 1 WHERE email = $1",
            ),
            CounterKind::View => (
                "UPDATE posts SET views = views + 1 WHERE file_ref = $1 RETURNING owner_email, views",
                "UPDATE users SET total_views = total_views + 1 WHERE email = $1",
            ),
        };

        let mut tx = self.pool.begin().await?;

        let updated: Option<(String, i64)> = sqlx::query_as(post_sql)
            .bind(file)
            .fetch_optional(&mut *tx)
            .await?;
        let Some((owner, value)) = updated else {
            return Err(AppError::NotFound("Reel not found".into()));
        };

        sqlx::query(owner_sql)
            .bind(&owner)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(value)
    }
}

#[async_trait::async_trait]
impl MessageStore for PostgresStore {
    async fn insert_message(&self, message: NewMessage) -> AppResult<Message> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            INSERT INTO messages (id, sender_email, receiver_email, content, created_at, is_read)
            VALUES ($1, $2, $3, $4, $5, FALSE)
            RETURNING id, sender_email, receiver_email, content, created_at, is_read
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&message.sender)
        .bind(&message.receiver)
        .bind(&message.content)
        .bind(message.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn latest_with_each(
        &self,
        me: &str,
        peers: &[String],
    ) -> AppResult<HashMap<String, Message>> {
        if peers.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, LatestRow>(
            r#"
            SELECT DISTINCT ON (peer)
                   peer, id, sender_email, receiver_email, content, created_at, is_read
            FROM (
                SELECT CASE WHEN sender_email = $1 THEN receiver_email ELSE sender_email END AS peer,
                       id, sender_email, receiver_email, content, created_at, is_read, seq
                FROM messages
                WHERE (sender_email = $1 AND receiver_email = ANY($2))
                   OR (receiver_email = $1 AND sender_email = ANY($2))
            ) threads
            ORDER BY peer, created_at DESC, seq DESC
            "#,
        )
        .bind(me)
        .bind(peers)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.peer, Message::from(row.message)))
            .collect())
    }

    async fn conversation(&self, a: &str, b: &str, limit: usize) -> AppResult<Vec<Message>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, sender_email, receiver_email, content, created_at, is_read
            FROM (
                SELECT id, sender_email, receiver_email, content, created_at, is_read, seq
                FROM messages
                WHERE (sender_email = $1 AND receiver_email = $2)
                   OR (sender_email = $2 AND receiver_email = $1)
                ORDER BY created_at DESC, seq DESC
                LIMIT $3
            ) recent
            ORDER BY created_at ASC, seq ASC
            "#,
        )
        .bind(a)
        .bind(b)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Message::from).collect())
    }

    async fn mark_read(&self, from: &str, to: &str, up_to: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE messages SET is_read = TRUE
            WHERE sender_email = $1 AND receiver_email = $2 AND NOT is_read
              AND created_at <= $3
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(up_to)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
