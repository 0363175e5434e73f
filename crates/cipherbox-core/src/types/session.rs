//! Refresh-token session records.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One live refresh token in a user's session set.
///
/// Only the SHA-256 digest of the token is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    /// Lowercase hex SHA-256 of the raw token.
    pub token_hash: String,
    /// When the token was issued.
    pub issued_at: DateTime<Utc>,
    /// When the token stops verifying, if it expires at all.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Result of an atomic rotation attempt against the session store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationOutcome {
    /// The presented token was a member; it has been replaced.
    Rotated,
    /// The presented token was evicted by retention, not rotated away. The
    /// set is left untouched.
    Retired,
    /// The presented token was neither live nor retired; the user's set has
    /// been emptied in the same operation.
    ReuseDetected,
}

/// Retired tokens kept per live slot, for tokens that never expire.
const RETIRED_PER_LIVE: usize = 4;
/// Upper bound on the expiry grace, one day.
const MAX_EXPIRY_GRACE_SECS: u64 = 86_400;

/// A user's refresh tokens: the live set plus the tokens retention pushed
/// out of it.
///
/// Retired hashes let a device whose token was evicted get a plain "session
/// ended" instead of tripping reuse detection. Tokens consumed by rotation
/// are never retired; presenting one again is reuse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSet {
    /// Tokens that may still be rotated, in insertion order.
    pub live: Vec<SessionToken>,
    /// Evicted tokens, oldest eviction first.
    pub retired: Vec<SessionToken>,
}

impl SessionSet {
    pub fn is_live(&self, token_hash: &str) -> bool {
        self.live.iter().any(|t| t.token_hash == token_hash)
    }

    pub fn is_retired(&self, token_hash: &str) -> bool {
        self.retired.iter().any(|t| t.token_hash == token_hash)
    }

    /// Drop every live and retired token.
    pub fn clear(&mut self) {
        self.live.clear();
        self.retired.clear();
    }
}

/// How many tokens a user keeps and when expired ones are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    max_tokens: usize,
    expiry_grace: Duration,
}

impl RetentionPolicy {
    /// Keep at most `max_tokens` live tokens (never fewer than one).
    pub fn new(max_tokens: usize) -> Self {
        Self {
            max_tokens: max_tokens.max(1),
            expiry_grace: Duration::zero(),
        }
    }

    /// Keep expired tokens for `seconds` past their expiry. Set this to the
    /// verifier's leeway so a token that still verifies is still found.
    pub fn with_expiry_grace(mut self, seconds: u64) -> Self {
        self.expiry_grace = Duration::seconds(seconds.min(MAX_EXPIRY_GRACE_SECS) as i64);
        self
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Cap on retired tokens kept per user.
    pub fn max_retired(&self) -> usize {
        self.max_tokens * RETIRED_PER_LIVE
    }

    pub fn expiry_grace(&self) -> Duration {
        self.expiry_grace
    }

    /// Whether `token` can no longer verify at `now`, grace included.
    pub fn is_dead(&self, token: &SessionToken, now: DateTime<Utc>) -> bool {
        token
            .expires_at
            .is_some_and(|exp| exp + self.expiry_grace <= now)
    }

    /// Apply the policy in place: drop dead tokens, move the oldest live
    /// tokens past the cap into `retired`, then trim `retired`.
    pub fn apply(&self, set: &mut SessionSet, now: DateTime<Utc>) {
        set.live.retain(|t| !self.is_dead(t, now));
        if set.live.len() > self.max_tokens {
            set.live.sort_by_key(|t| t.issued_at);
            let excess = set.live.len() - self.max_tokens;
            set.retired.extend(set.live.drain(..excess));
        }

        set.retired.retain(|t| !self.is_dead(t, now));
        if set.retired.len() > self.max_retired() {
            let excess = set.retired.len() - self.max_retired();
            set.retired.drain(..excess);
        }
    }
}
