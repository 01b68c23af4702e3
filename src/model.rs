//! Wire model for match results, deferred deep links and app registration.
//!
//! Field names map 1:1 to snake_case wire names through the serde attributes
//! on each struct; those attributes are the field table, and the same derive
//! drives both decoding and encoding so the mapping is bidirectional.
//!
//! # Type Hierarchy
//!
//! ```text
//! MatchResponse
//! ├── match: MatchDetails
//! │   ├── deeplink: Option<DeeplinkMatch>
//! │   │   ├── id, target_url
//! │   │   ├── metadata: {String → DynamicValue}
//! │   │   ├── campaign_id: Option<String>
//! │   │   ├── matched_at, expires_at: Option
//! │   │   └── attribution: Option<Attribution>
//! │   ├── confidence_score: f64
//! │   ├── ttl_seconds: u64
//! │   └── fingerprint: Option<Fingerprint>
//! ├── deep_link: Option<String>
//! └── attribution: Option<Attribution>
//! ```
//!
//! Optional fields decode to `None` when missing and are left out when
//! encoding. A blank string is a value: `"source": ""` stays `Some("")`.
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::dynamic::{self, DynamicMap};
use crate::fingerprint::Fingerprint;
use crate::timestamp;

/// Campaign / source / medium triple explaining an install.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Attribution {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medium: Option<String>,
}

impl Attribution {
    /// True when all three fields are unknown.
    pub fn is_unknown(&self) -> bool {
        self.campaign.is_none() && self.source.is_none() && self.medium.is_none()
    }
}

/// One resolved deep link match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeeplinkMatch {
    pub id: String,
    pub target_url: String,
    /// Server-defined extras. Missing, `null` or non-object values decode
    /// as an empty map.
    #[serde(default, deserialize_with = "dynamic::map_or_empty")]
    pub metadata: DynamicMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
    #[serde(with = "timestamp")]
    pub matched_at: DateTime<Utc>,
    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<Attribution>,
}

impl DeeplinkMatch {
    /// `expires_at`, when present, must not precede `matched_at`.
    pub fn has_consistent_expiry(&self) -> bool {
        self.expires_at
            .is_none_or(|expires_at| expires_at >= self.matched_at)
    }

    /// Instant after which this record is stale: the earlier of
    /// `matched_at + ttl` and `expires_at`.
    pub fn valid_until(&self, ttl_seconds: u64) -> DateTime<Utc> {
        let by_ttl = add_ttl(self.matched_at, ttl_seconds);
        match self.expires_at {
            Some(expires_at) if expires_at < by_ttl => expires_at,
            _ => by_ttl,
        }
    }
}

/// The `match` sub-record of a [`MatchResponse`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deeplink: Option<DeeplinkMatch>,
    /// Raw server value. Not clamped on decode; see [`Self::clamped_confidence`].
    pub confidence_score: f64,
    pub ttl_seconds: u64,
    /// The fingerprint as the server saw it. Informational only: an echo
    /// that does not decode as a [`Fingerprint`] is dropped to `None`.
    #[serde(
        default,
        deserialize_with = "fingerprint_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub fingerprint: Option<Fingerprint>,
}

impl MatchDetails {
    /// Confidence pulled into `[0.0, 1.0]`; NaN counts as `0.0`.
    ///
    /// Out-of-range scores are a server bug that is tolerated, so the decoded
    /// record keeps the original and only threshold checks see this value.
    pub fn clamped_confidence(&self) -> f64 {
        if self.confidence_score.is_nan() {
            0.0
        } else {
            self.confidence_score.clamp(0.0, 1.0)
        }
    }
}

/// Full server answer to a match request.
///
/// No `deeplink` record and no top-level `deep_link` is a valid "no confident
/// match" answer, not an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchResponse {
    #[serde(rename = "match")]
    pub details: MatchDetails,
    #[serde(
        default,
        alias = "deepLink",
        skip_serializing_if = "Option::is_none"
    )]
    pub deep_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<Attribution>,
}

impl MatchResponse {
    /// Deep link URL carried by the response, preferring the match record.
    pub fn resolved_deep_link(&self) -> Option<&str> {
        self.details
            .deeplink
            .as_ref()
            .map(|record| record.target_url.as_str())
            .or(self.deep_link.as_deref())
    }

    /// Attribution carried by the response, taken whole from the match record
    /// when it has one, otherwise from the top level. Fields are never mixed
    /// across the two sources.
    pub fn resolved_attribution(&self) -> Option<&Attribution> {
        self.details
            .deeplink
            .as_ref()
            .and_then(|record| record.attribution.as_ref())
            .or(self.attribution.as_ref())
    }
}

/// Answer of the simpler deferred-link check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DeferredDeepLinkResponse {
    #[serde(
        default,
        alias = "deepLink",
        skip_serializing_if = "Option::is_none"
    )]
    pub deep_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<Attribution>,
}

/// App registration and account state returned at SDK init.
///
/// Read-only context: decoded and passed through, never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InitResponse {
    pub app: AppInfo,
    pub account: AccountInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppInfo {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ios_bundle_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub android_package_name: Option<String>,
    #[serde(default)]
    pub custom_domains: Vec<CustomDomain>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomDomain {
    pub domain: String,
    #[serde(default)]
    pub verified: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountInfo {
    pub status: String,
    pub credits_remaining: i64,
    pub rate_limits: RateLimits,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateLimits {
    pub requests_per_second: f64,
    pub requests_per_day: u64,
}

fn fingerprint_or_none<'de, D>(deserializer: D) -> Result<Option<Fingerprint>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| serde_json::from_value(value).ok()))
}

/// `start + ttl_seconds`, saturating at the maximum representable instant.
pub(crate) fn add_ttl(start: DateTime<Utc>, ttl_seconds: u64) -> DateTime<Utc> {
    i64::try_from(ttl_seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|ttl| start.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
