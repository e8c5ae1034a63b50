use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a registered listener.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// User a bearer token resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: UserId,
    pub email: String,
}

/// Opaque bearer credential taken from an `Authorization` header.
///
/// `Debug` never prints the token.
///
/// ```
/// use core_auth::BearerToken;
///
/// let token = BearerToken::from_header("Bearer abc.def").unwrap();
/// assert_eq!(token.as_str(), "abc.def");
/// assert!(BearerToken::from_header("Basic dXNlcg==").is_none());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    const PREFIX: &'static str = "Bearer ";

    /// Parse `Bearer <token>`. The scheme is case-sensitive and the token
    /// must be non-empty.
    pub fn from_header(header: &str) -> Option<Self> {
        let token = header.strip_prefix(Self::PREFIX)?.trim();
        if token.is_empty() {
            None
        } else {
            Some(Self(token.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken([REDACTED])")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Inactive,
    Cancelled,
    PastDue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    Monthly,
    Yearly,
}

/// Subscription record as stored by the billing side. Read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub user_id: UserId,
    pub plan_type: Option<PlanType>,
    pub status: SubscriptionStatus,
    /// End of the paid period, Unix epoch milliseconds. `None` means open
    /// ended.
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
}

impl Subscription {
    /// Entitled iff active and the period has not ended at `now_millis`.
    ///
    /// A period ending exactly at `now_millis` has ended.
    pub fn is_entitled(&self, now_millis: i64) -> bool {
        self.status == SubscriptionStatus::Active
            && self
                .current_period_end
                .map_or(true, |end| end > now_millis)
    }
}

/// What the catalog knows about the content behind an audio resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub podcast_id: String,
    pub episode_id: Option<String>,
    /// Inherited from the owning podcast.
    pub premium: bool,
}

impl CatalogEntry {
    pub fn free(podcast_id: impl Into<String>) -> Self {
        Self {
            podcast_id: podcast_id.into(),
            episode_id: None,
            premium: false,
        }
    }

    pub fn premium(podcast_id: impl Into<String>) -> Self {
        Self {
            premium: true,
            ..Self::free(podcast_id)
        }
    }

    pub fn with_episode(mut self, episode_id: impl Into<String>) -> Self {
        self.episode_id = Some(episode_id.into());
        self
    }
}

/// Successful access decision. Computed per request and never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrant {
    pub resource: String,
    pub premium: bool,
    /// Set only when a credential had to be checked.
    pub user: Option<UserId>,
}
