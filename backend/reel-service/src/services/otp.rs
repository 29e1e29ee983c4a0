/// One-time code issuing and verification
///
/// Codes are six digits, single use, and scoped by purpose: a login code
/// never satisfies a password reset and vice versa.
///
/// # Storage
/// - `InMemoryOtpStore`: DashMap keyed by (purpose, email), swept periodically
/// - `RedisOtpStore`: `otp:{purpose}:{email}` holding the JSON record
///
/// Expiry is judged against the record's `expires_at` and the injected
/// [`Clock`], never against the backing store's own TTL, so an expired code
/// is reported as `Expired` rather than as missing.
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use rand::Rng;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::config::OtpConfig;
use crate::error::{AppError, AppResult};
use crate::logging::mask_email;
use crate::metrics::OTP_VERIFICATIONS_TOTAL;

/// Extra lifetime given to Redis keys past the code's expiry
const REDIS_GRACE_SECS: i64 = 60;

/// Delete the record only when its code matches ARGV[1]; returns the record or nil
static TAKE_MATCHING_SCRIPT: Lazy<redis::Script> = Lazy::new(|| {
    redis::Script::new(
        r#"
        local raw = redis.call('GET', KEYS[1])
        if not raw then
            return false
        end
        local ok, record = pcall(cjson.decode, raw)
        if ok and record.code == ARGV[1] then
            redis.call('DEL', KEYS[1])
            return raw
        end
        return false
        "#,
    )
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtpPurpose {
    Login,
    Reset,
}

impl OtpPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpPurpose::Login => "login",
            OtpPurpose::Reset => "reset",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpRecord {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

impl OtpRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[async_trait::async_trait]
pub trait OtpStore: Send + Sync {
    /// Store `record`, replacing any earlier code for the same purpose and email
    async fn put(
        &self,
        purpose: OtpPurpose,
        email: &str,
        record: OtpRecord,
        ttl: Duration,
    ) -> AppResult<()>;

    async fn get(&self, purpose: OtpPurpose, email: &str) -> AppResult<Option<OtpRecord>>;

    /// Atomically remove and return the record if its code equals `code`.
    /// Of several concurrent callers with the same code, at most one gets it.
    async fn take_matching(
        &self,
        purpose: OtpPurpose,
        email: &str,
        code: &str,
    ) -> AppResult<Option<OtpRecord>>;

    async fn remove(&self, purpose: OtpPurpose, email: &str) -> AppResult<()>;
}

/// Process-local code store
#[derive(Default)]
pub struct InMemoryOtpStore {
    entries: DashMap<(OtpPurpose, String), OtpRecord>,
}

impl InMemoryOtpStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every record already past expiry; returns how many were removed
    pub fn cleanup_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, record| !record.is_expired(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, "expired one-time codes swept");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait::async_trait]
impl OtpStore for InMemoryOtpStore {
    async fn put(
        &self,
        purpose: OtpPurpose,
        email: &str,
        record: OtpRecord,
        _ttl: Duration,
    ) -> AppResult<()> {
        self.entries.insert((purpose, email.to_string()), record);
        Ok(())
    }

    async fn get(&self, purpose: OtpPurpose, email: &str) -> AppResult<Option<OtpRecord>> {
        Ok(self
            .entries
            .get(&(purpose, email.to_string()))
            .map(|entry| entry.value().clone()))
    }

    async fn take_matching(
        &self,
        purpose: OtpPurpose,
        email: &str,
        code: &str,
    ) -> AppResult<Option<OtpRecord>> {
        Ok(self
            .entries
            .remove_if(&(purpose, email.to_string()), |_, record| record.code == code)
            .map(|(_, record)| record))
    }

    async fn remove(&self, purpose: OtpPurpose, email: &str) -> AppResult<()> {
        self.entries.remove(&(purpose, email.to_string()));
        Ok(())
    }
}

/// Redis-backed code store shared by every instance
#[derive(Clone)]
pub struct RedisOtpStore {
    redis: ConnectionManager,
}

impl RedisOtpStore {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    fn key(purpose: OtpPurpose, email: &str) -> String {
        format!("otp:{}:{}", purpose.as_str(), email.to_lowercase())
    }
}

#[async_trait::async_trait]
impl OtpStore for RedisOtpStore {
    async fn put(
        &self,
        purpose: OtpPurpose,
        email: &str,
        record: OtpRecord,
        ttl: Duration,
    ) -> AppResult<()> {
        let payload = serde_json::to_string(&record)
            .map_err(|e| AppError::Internal(format!("Failed to encode code record: {e}")))?;
        let mut conn = self.redis.clone();

        redis::cmd("SET")
            .arg(Self::key(purpose, email))
            .arg(payload)
            .arg("EX")
            .arg(ttl.num_seconds().max(1) + REDIS_GRACE_SECS)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn get(&self, purpose: OtpPurpose, email: &str) -> AppResult<Option<OtpRecord>> {
        let mut conn = self.redis.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(Self::key(purpose, email))
            .query_async(&mut conn)
            .await?;

        match raw {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(record) => Ok(Some(record)),
                Err(e) => {
                    warn!(error = %e, "discarding unreadable code record");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    async fn take_matching(
        &self,
        purpose: OtpPurpose,
        email: &str,
        code: &str,
    ) -> AppResult<Option<OtpRecord>> {
        let mut conn = self.redis.clone();
        let raw: Option<String> = TAKE_MATCHING_SCRIPT
            .key(Self::key(purpose, email))
            .arg(code)
            .invoke_async(&mut conn)
            .await?;

        match raw {
            Some(raw) => serde_json::from_str(&raw).map(Some).map_err(|e| {
                AppError::Internal(format!("Failed to decode code record: {e}"))
            }),
            None => Ok(None),
        }
    }

    async fn remove(&self, purpose: OtpPurpose, email: &str) -> AppResult<()> {
        let mut conn = self.redis.clone();
        redis::cmd("DEL")
            .arg(Self::key(purpose, email))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct OtpService {
    store: Arc<dyn OtpStore>,
    clock: Arc<dyn Clock>,
    config: OtpConfig,
}

impl OtpService {
    pub fn new(store: Arc<dyn OtpStore>, clock: Arc<dyn Clock>, config: OtpConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    fn ttl(&self, purpose: OtpPurpose) -> Duration {
        match purpose {
            OtpPurpose::Login => Duration::seconds(self.config.login_ttl_secs),
            OtpPurpose::Reset => Duration::seconds(self.config.reset_ttl_secs),
        }
    }

    fn generate_code() -> String {
        rand::thread_rng().gen_range(100_000..=999_999).to_string()
    }

    /// Issue a fresh code, replacing any outstanding one for the same purpose
    pub async fn issue(&self, purpose: OtpPurpose, email: &str) -> AppResult<String> {
        let code = Self::generate_code();
        let ttl = self.ttl(purpose);
        let record = OtpRecord {
            code: code.clone(),
            expires_at: self.clock.now() + ttl,
        };
        self.store.put(purpose, email, record, ttl).await?;
        debug!(purpose = purpose.as_str(), email = %mask_email(email), "one-time code issued");
        Ok(code)
    }

    /// Check `code` and consume it on success.
    ///
    /// The matching record is taken out of the store in one step, so a code
    /// can be redeemed once even under concurrent requests. A wrong code
    /// leaves the outstanding one in place; an expired one is removed
    /// whether or not it matches.
    pub async fn verify(&self, purpose: OtpPurpose, email: &str, code: &str) -> AppResult<()> {
        let now = self.clock.now();

        if let Some(record) = self.store.take_matching(purpose, email, code.trim()).await? {
            if record.is_expired(now) {
                OTP_VERIFICATIONS_TOTAL.with_label_values(&["expired"]).inc();
                return Err(AppError::Expired);
            }
            OTP_VERIFICATIONS_TOTAL.with_label_values(&["success"]).inc();
            return Ok(());
        }

        match self.store.get(purpose, email).await? {
            None => {
                OTP_VERIFICATIONS_TOTAL.with_label_values(&["missing"]).inc();
                Err(AppError::NotFound(
                    "No code was requested for this email".into(),
                ))
            }
            Some(record) if record.is_expired(now) => {
                self.store.remove(purpose, email).await?;
                OTP_VERIFICATIONS_TOTAL.with_label_values(&["expired"]).inc();
                Err(AppError::Expired)
            }
            Some(_) => {
                OTP_VERIFICATIONS_TOTAL.with_label_values(&["mismatch"]).inc();
                Err(AppError::CodeMismatch)
            }
        }
    }
}
