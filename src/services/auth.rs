//! Authentication service implementation
//!
//! Verification of mini-app `initData` tokens signed with the bot token, and the
//! per-lesson access policy (administrator or effective teacher).

use std::collections::BTreeMap;
use std::sync::Arc;
use chrono::{DateTime, Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::debug;
use crate::services::replacement::ReplacementResolver;
use crate::utils::clock::Clock;
use crate::utils::errors::{CourseDeskError, Result};
use crate::utils::logging::log_auth_failure;

type HmacSha256 = Hmac<Sha256>;

/// Key of the first HMAC round, fixed by the Telegram Web App protocol
const WEB_APP_KEY: &[u8] = b"WebAppData";

/// Identity extracted from a valid `initData`
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedInitData {
    /// `user.id`, stringified for lookups
    pub external_user_id: String,
    pub telegram_id: i64,
    pub display_name: String,
    pub auth_date: DateTime<Utc>,
    /// All signed fields except `hash`
    pub fields: BTreeMap<String, String>,
}

/// Verifies `initData` strings against the bot token
#[derive(Clone)]
pub struct InitDataVerifier {
    bot_token: String,
    max_age: Duration,
    clock: Arc<dyn Clock>,
}

impl InitDataVerifier {
    pub fn new(bot_token: impl Into<String>, max_age_seconds: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            bot_token: bot_token.into(),
            max_age: Duration::seconds(max_age_seconds),
            clock,
        }
    }

    /// Verify against the current time
    pub fn verify(&self, init_data: &str) -> Result<VerifiedInitData> {
        self.verify_at(init_data, self.clock.now())
    }

    /// Verify against an explicit instant. Every failure is reported as the same
    /// [`CourseDeskError::AuthInvalid`].
    pub fn verify_at(&self, init_data: &str, now: DateTime<Utc>) -> Result<VerifiedInitData> {
        match self.check(init_data, now) {
            Some(verified) => {
                debug!(external_user_id = %verified.external_user_id, "initData verified");
                Ok(verified)
            }
            None => {
                log_auth_failure("init_data");
                Err(CourseDeskError::AuthInvalid)
            }
        }
    }

    fn check(&self, init_data: &str, now: DateTime<Utc>) -> Option<VerifiedInitData> {
        let mut fields = parse_pairs(init_data)?;
        let hash = fields.remove("hash")?;

        let expected = sign(&self.bot_token, &data_check_string(&fields))?;
        if !bool::from(expected.as_bytes().ct_eq(hash.as_bytes())) {
            return None;
        }

        let auth_timestamp: i64 = fields.get("auth_date")?.parse().ok()?;
        let auth_date = Utc.timestamp_opt(auth_timestamp, 0).single()?;
        if now - auth_date > self.max_age {
            return None;
        }

        let user: serde_json::Value = serde_json::from_str(fields.get("user")?).ok()?;
        let telegram_id = user.get("id")?.as_i64()?;
        let display_name = display_name(&user).unwrap_or_else(|| telegram_id.to_string());

        Some(VerifiedInitData {
            external_user_id: telegram_id.to_string(),
            telegram_id,
            display_name,
            auth_date,
            fields,
        })
    }
}

/// Decode the URL-encoded pairs. Repeated keys make the token ambiguous and are rejected.
fn parse_pairs(init_data: &str) -> Option<BTreeMap<String, String>> {
    let mut fields = BTreeMap::new();
    for (key, value) in url::form_urlencoded::parse(init_data.as_bytes()) {
        if fields.insert(key.into_owned(), value.into_owned()).is_some() {
            return None;
        }
    }
    Some(fields)
}

/// `key=value` lines in key order, joined by `\n`
pub fn data_check_string(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Hex HMAC of the data-check string, keyed by `HMAC("WebAppData", bot_token)`
fn sign(bot_token: &str, data_check_string: &str) -> Option<String> {
    let mut secret = HmacSha256::new_from_slice(WEB_APP_KEY).ok()?;
    secret.update(bot_token.as_bytes());
    let secret_key = secret.finalize().into_bytes();

    let mut mac = HmacSha256::new_from_slice(&secret_key).ok()?;
    mac.update(data_check_string.as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Build a signed, URL-encoded `initData` string the way the Telegram client does.
/// Used by local tooling and tests.
pub fn sign_init_data(bot_token: &str, fields: &BTreeMap<String, String>) -> Result<String> {
    let hash = sign(bot_token, &data_check_string(fields))
        .ok_or_else(|| CourseDeskError::Validation("Unable to sign initData".to_string()))?;

    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in fields {
        serializer.append_pair(key, value);
    }
    serializer.append_pair("hash", &hash);
    Ok(serializer.finish())
}

fn display_name(user: &serde_json::Value) -> Option<String> {
    let first = user.get("first_name").and_then(|v| v.as_str()).unwrap_or_default();
    let last = user.get("last_name").and_then(|v| v.as_str()).unwrap_or_default();
    let full = format!("{} {}", first, last).trim().to_string();
    if !full.is_empty() {
        return Some(full);
    }
    user.get("username").and_then(|v| v.as_str()).map(|s| s.to_string())
}

/// Who is asking for access to a lesson
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    Admin,
    Teacher(i64),
}

/// Lesson access decisions on top of [`ReplacementResolver`]
#[derive(Clone)]
pub struct AccessPolicy {
    resolver: ReplacementResolver,
}

impl AccessPolicy {
    pub fn new(resolver: ReplacementResolver) -> Self {
        Self { resolver }
    }

    /// Administrators may touch any lesson; teachers only lessons they effectively own
    pub async fn authorize(&self, lesson_id: i64, caller: Caller) -> Result<()> {
        let teacher_id = match caller {
            Caller::Admin => return Ok(()),
            Caller::Teacher(teacher_id) => teacher_id,
        };

        let effective = self.resolver.effective_teacher(lesson_id).await?;
        if effective == teacher_id {
            Ok(())
        } else {
            Err(CourseDeskError::Forbidden(format!(
                "Teacher {} is not assigned to lesson {}",
                teacher_id, lesson_id
            )))
        }
    }
}
