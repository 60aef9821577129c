//! In-memory storage for admin verification codes and the session tokens
//! issued once a code is confirmed.
//!
//! Three maps are kept: pending codes keyed by `"{session_id}-{page_url}"`,
//! issued tokens, and the last send time per key for rate limiting. Every
//! entry carries its own deadline; [`VerificationStore::sweep`] drops the
//! stale ones and [`spawn_sweeper`] runs it periodically for as long as the
//! store is alive.

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rand::Rng;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::VerificationConfig;

/// Result of checking a submitted code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Code matched and has been consumed.
    Verified,
    /// Code did not match; the caller may try again.
    Mismatch { remaining_attempts: u32 },
    /// Code existed but its deadline has passed. It has been removed.
    Expired,
    /// Attempt limit reached. Further attempts fail until the code expires.
    Locked,
    /// No code was issued for this key.
    Missing,
}

#[derive(Debug, Clone)]
struct CodeEntry {
    code: String,
    expires_at: Instant,
    attempts: u32,
}

/// Counts of entries removed by one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub codes: usize,
    pub tokens: usize,
    pub send_marks: usize,
}

impl SweepStats {
    pub fn total(&self) -> usize {
        self.codes + self.tokens + self.send_marks
    }
}

pub struct VerificationStore {
    codes: DashMap<String, CodeEntry>,
    tokens: DashMap<String, Instant>,
    last_sent: DashMap<String, Instant>,
    code_ttl: Duration,
    token_ttl: Duration,
    send_interval: Duration,
    max_attempts: u32,
}

/// Build the storage key for a session/page pair.
pub fn code_key(session_id: &str, page_url: &str) -> String {
    format!("{session_id}-{page_url}")
}

/// Generate a zero-padded 6-digit code.
pub fn generate_code() -> String {
    format!("{:06}", rand::rng().random_range(0..1_000_000u32))
}

impl VerificationStore {
    pub fn new(config: &VerificationConfig) -> Self {
        Self {
            codes: DashMap::new(),
            tokens: DashMap::new(),
            last_sent: DashMap::new(),
            code_ttl: Duration::from_secs(config.code_ttl_secs),
            token_ttl: Duration::from_secs(config.token_ttl_secs),
            send_interval: Duration::from_secs(config.send_interval_secs),
            max_attempts: config.max_attempts,
        }
    }

    pub fn code_ttl(&self) -> Duration {
        self.code_ttl
    }

    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    /// Store a code for `key`, replacing any previous one and resetting attempts.
    pub fn set_code(&self, key: &str, code: &str) {
        self.set_code_at(key, code, Instant::now());
    }

    fn set_code_at(&self, key: &str, code: &str, now: Instant) {
        self.codes.insert(
            key.to_string(),
            CodeEntry {
                code: code.to_string(),
                expires_at: now + self.code_ttl,
                attempts: 0,
            },
        );
    }

    /// Return the pending code for `key` if it has not expired.
    pub fn get_code(&self, key: &str) -> Option<String> {
        self.get_code_at(key, Instant::now())
    }

    fn get_code_at(&self, key: &str, now: Instant) -> Option<String> {
        self.codes
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.code.clone())
    }

    pub fn delete_code(&self, key: &str) -> bool {
        self.codes.remove(key).is_some()
    }

    /// Number of failed attempts recorded against `key`.
    pub fn attempts(&self, key: &str) -> u32 {
        self.codes.get(key).map(|e| e.attempts).unwrap_or(0)
    }

    /// Check `input` against the code stored for `key`.
    pub fn verify_code(&self, key: &str, input: &str) -> VerifyOutcome {
        self.verify_code_at(key, input, Instant::now())
    }

    fn verify_code_at(&self, key: &str, input: &str, now: Instant) -> VerifyOutcome {
        let Some(mut entry) = self.codes.get_mut(key) else {
            return VerifyOutcome::Missing;
        };

        if entry.expires_at <= now {
            drop(entry);
            self.codes.remove(key);
            return VerifyOutcome::Expired;
        }

        if entry.attempts >= self.max_attempts {
            return VerifyOutcome::Locked;
        }

        if entry.code == input.trim() {
            drop(entry);
            self.codes.remove(key);
            return VerifyOutcome::Verified;
        }

        entry.attempts += 1;
        VerifyOutcome::Mismatch {
            remaining_attempts: self.max_attempts.saturating_sub(entry.attempts),
        }
    }

    /// Record a send for `key`. Fails with the seconds left when the previous
    /// send is still inside the rate-limit window.
    pub fn check_send_rate(&self, key: &str) -> Result<(), u64> {
        self.check_send_rate_at(key, Instant::now())
    }

    fn check_send_rate_at(&self, key: &str, now: Instant) -> Result<(), u64> {
        // The entry guard holds the shard lock, so concurrent sends for one key
        // see each other's mark.
        match self.last_sent.entry(key.to_string()) {
            Entry::Occupied(mut last) => {
                let elapsed = now.saturating_duration_since(*last.get());
                if elapsed < self.send_interval {
                    let left = self.send_interval - elapsed;
                    return Err(left.as_secs_f64().ceil().max(1.0) as u64);
                }
                last.insert(now);
            }
            Entry::Vacant(slot) => {
                slot.insert(now);
            }
        }
        Ok(())
    }

    /// Forget the last send for `key` so a failed delivery can be retried at once.
    pub fn clear_send_mark(&self, key: &str) {
        self.last_sent.remove(key);
    }

    /// Issue a new random 64-hex-character token.
    pub fn issue_token(&self) -> String {
        self.issue_token_at(Instant::now())
    }

    fn issue_token_at(&self, now: Instant) -> String {
        let bytes: [u8; 32] = rand::random();
        let token = hex::encode(bytes);
        self.tokens.insert(token.clone(), now + self.token_ttl);
        token
    }

    pub fn validate_token(&self, token: &str) -> bool {
        self.validate_token_at(token, Instant::now())
    }

    fn validate_token_at(&self, token: &str, now: Instant) -> bool {
        self.tokens
            .get(token)
            .is_some_and(|expires_at| *expires_at > now)
    }

    pub fn revoke_token(&self, token: &str) -> bool {
        self.tokens.remove(token).is_some()
    }

    /// Remove every expired code, token and send mark.
    pub fn sweep(&self) -> SweepStats {
        self.sweep_at(Instant::now())
    }

    fn sweep_at(&self, now: Instant) -> SweepStats {
        let before = (self.codes.len(), self.tokens.len(), self.last_sent.len());

        self.codes.retain(|_, entry| entry.expires_at > now);
        self.tokens.retain(|_, expires_at| *expires_at > now);
        let window = self.send_interval;
        self.last_sent
            .retain(|_, sent| now.saturating_duration_since(*sent) < window);

        SweepStats {
            codes: before.0 - self.codes.len(),
            tokens: before.1 - self.tokens.len(),
            send_marks: before.2 - self.last_sent.len(),
        }
    }
}

/// Run [`VerificationStore::sweep`] every `every` until the store is dropped.
pub fn spawn_sweeper(store: &Arc<VerificationStore>, every: Duration) -> JoinHandle<()> {
    let weak: Weak<VerificationStore> = Arc::downgrade(store);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // The first tick completes immediately.
        interval.tick().await;

        loop {
            interval.tick().await;

            let Some(store) = weak.upgrade() else {
                debug!("Verification store dropped, stopping sweeper");
                break;
            };

            let stats = store.sweep();
            if stats.total() > 0 {
                debug!(
                    codes = stats.codes,
                    tokens = stats.tokens,
                    send_marks = stats.send_marks,
                    "Swept expired verification entries"
                );
            }
        }
    })
}
