//! Match client: request, decode, validate.
//!
//! [`MatchClient::request_match`] posts a [`Fingerprint`] (plus custom
//! parameters) to the matching service, decodes the [`MatchResponse`] and
//! runs the local validity policy before anything reaches the caller:
//!
//! 1. the clamped confidence must reach `min_confidence`,
//! 2. a deep link must be present (record or top-level),
//! 3. `now` must be before `matched_at + ttl_seconds` and before `expires_at`.
//!
//! A response failing the policy is a successful [`MatchOutcome::NoMatch`];
//! only transport, protocol and precondition failures are errors.
//!
//! Each call owns its request; the client holds nothing mutable, so one
//! instance can serve concurrent callers. Dropping the returned future
//! cancels the in-flight request and skips result handling.
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{Instrument, Level, debug, info, warn};

use crate::config::DeferlinkConfig;
use crate::dynamic::DynamicMap;
use crate::error::DeferlinkError;
use crate::fingerprint::Fingerprint;
use crate::model::{
    Attribution, DeeplinkMatch, DeferredDeepLinkResponse, MatchResponse, add_ttl,
};
use crate::request::{ApiRequest, endpoint_url};
use crate::transport::Transport;

/// Result of a structurally successful match attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Matched(ResolvedMatch),
    NoMatch(NoMatchReason),
}

impl MatchOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, MatchOutcome::Matched(_))
    }

    pub fn as_match(&self) -> Option<&ResolvedMatch> {
        match self {
            MatchOutcome::Matched(m) => Some(m),
            MatchOutcome::NoMatch(_) => None,
        }
    }
}

/// Why a decoded response was not surfaced as a match.
#[derive(Debug, Clone, PartialEq)]
pub enum NoMatchReason {
    /// Neither a deeplink record nor a top-level deep link was sent.
    NoDeepLink,
    /// Clamped confidence fell short of the configured threshold.
    BelowThreshold { score: f64, threshold: f64 },
    /// The match is past its TTL or `expires_at`.
    Expired { at: DateTime<Utc> },
}

impl NoMatchReason {
    fn label(&self) -> &'static str {
        match self {
            NoMatchReason::NoDeepLink => "no_deep_link",
            NoMatchReason::BelowThreshold { .. } => "below_threshold",
            NoMatchReason::Expired { .. } => "expired",
        }
    }
}

/// A match that passed the validity policy.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMatch {
    /// Destination URL: the record's `target_url`, else the top-level link.
    pub deep_link: String,
    /// Confidence exactly as the server sent it.
    pub confidence_score: f64,
    /// Instant after which this match must no longer be trusted.
    pub valid_until: DateTime<Utc>,
    pub deeplink: Option<DeeplinkMatch>,
    pub attribution: Option<Attribution>,
}

/// Apply the validity policy to a decoded response at `now`.
///
/// When no deeplink record is present there is no `matched_at`, so the TTL
/// window starts at `now` and a zero TTL is already expired. A NaN
/// `threshold` rejects every response.
pub fn evaluate_match(response: &MatchResponse, threshold: f64, now: DateTime<Utc>) -> MatchOutcome {
    let details = &response.details;

    let score = details.clamped_confidence();
    if threshold.is_nan() || score < threshold {
        return MatchOutcome::NoMatch(NoMatchReason::BelowThreshold { score, threshold });
    }

    let Some(deep_link) = response.resolved_deep_link() else {
        return MatchOutcome::NoMatch(NoMatchReason::NoDeepLink);
    };

    let valid_until = match &details.deeplink {
        Some(record) if !record.has_consistent_expiry() => {
            return MatchOutcome::NoMatch(NoMatchReason::Expired {
                at: record.expires_at.unwrap_or(record.matched_at),
            });
        }
        Some(record) => record.valid_until(details.ttl_seconds),
        None => add_ttl(now, details.ttl_seconds),
    };
    if now >= valid_until {
        return MatchOutcome::NoMatch(NoMatchReason::Expired { at: valid_until });
    }

    MatchOutcome::Matched(ResolvedMatch {
        deep_link: deep_link.to_owned(),
        confidence_score: details.confidence_score,
        valid_until,
        deeplink: details.deeplink.clone(),
        attribution: response.resolved_attribution().cloned(),
    })
}

#[derive(Serialize)]
struct MatchRequestBody<'a> {
    #[serde(flatten)]
    fingerprint: &'a Fingerprint,
    #[serde(skip_serializing_if = "DynamicMap::is_empty")]
    custom_parameters: DynamicMap,
}

/// Client for the matching service over a pluggable [`Transport`].
#[derive(Debug, Clone)]
pub struct MatchClient<T> {
    config: Arc<DeferlinkConfig>,
    transport: T,
}

impl<T: Transport> MatchClient<T> {
    pub fn new(config: DeferlinkConfig, transport: T) -> Self {
        Self {
            config: Arc::new(config),
            transport,
        }
    }

    pub fn config(&self) -> &DeferlinkConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Request a match, validating against the wall clock.
    pub async fn request_match(&self, fingerprint: &Fingerprint) -> Result<MatchOutcome, DeferlinkError> {
        self.request_match_with(fingerprint, &DynamicMap::new(), Utc::now())
            .await
    }

    /// Request a match, validating against an explicit `now`.
    pub async fn request_match_at(
        &self,
        fingerprint: &Fingerprint,
        now: DateTime<Utc>,
    ) -> Result<MatchOutcome, DeferlinkError> {
        self.request_match_with(fingerprint, &DynamicMap::new(), now)
            .await
    }

    /// Request a match with per-call custom parameters layered over the
    /// configured ones (per-call values win).
    pub async fn request_match_with(
        &self,
        fingerprint: &Fingerprint,
        extra_parameters: &DynamicMap,
        now: DateTime<Utc>,
    ) -> Result<MatchOutcome, DeferlinkError> {
        let start = Instant::now();
        let span = tracing::span!(
            Level::INFO,
            "match.request",
            platform = %fingerprint.platform,
            path = %self.config.match_path
        );

        let result = async {
            let response: MatchResponse = self
                .post(&self.config.match_path, fingerprint, extra_parameters)
                .await?;
            Ok::<_, DeferlinkError>(evaluate_match(&response, self.config.min_confidence, now))
        }
        .instrument(span.clone())
        .await;

        let _guard = span.enter();
        let elapsed_micros = start.elapsed().as_micros();
        match &result {
            Ok(MatchOutcome::Matched(found)) => info!(
                deep_link = %found.deep_link,
                confidence = found.confidence_score,
                elapsed_micros,
                "match_found"
            ),
            Ok(MatchOutcome::NoMatch(reason)) => info!(
                reason = reason.label(),
                elapsed_micros,
                "match_rejected"
            ),
            Err(err) => warn!(error = %err, elapsed_micros, "match_failure"),
        }
        result
    }

    /// Simpler deferred-link check: returns the server's deep link and
    /// attribution without confidence or TTL evaluation.
    pub async fn check_deferred_deep_link(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<DeferredDeepLinkResponse, DeferlinkError> {
        let start = Instant::now();
        let span = tracing::span!(Level::INFO, "match.deferred", platform = %fingerprint.platform);
        let result: Result<DeferredDeepLinkResponse, DeferlinkError> = self
            .post(&self.config.deferred_path, fingerprint, &DynamicMap::new())
            .instrument(span.clone())
            .await;

        let _guard = span.enter();
        let elapsed_micros = start.elapsed().as_micros();
        match &result {
            Ok(resp) => info!(
                has_deep_link = resp.deep_link.is_some(),
                elapsed_micros,
                "deferred_check_success"
            ),
            Err(err) => warn!(error = %err, elapsed_micros, "deferred_check_failure"),
        }
        result
    }

    async fn post<R: DeserializeOwned>(
        &self,
        path: &str,
        fingerprint: &Fingerprint,
        extra_parameters: &DynamicMap,
    ) -> Result<R, DeferlinkError> {
        // Checked before anything touches the network.
        let api_key = self
            .config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(DeferlinkError::NotInitialized)?;
        self.config.validate()?;

        let url = endpoint_url(&self.config.base_url, path)?;

        let mut custom_parameters = self.config.custom_parameters.clone();
        custom_parameters.extend(
            extra_parameters
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        let body = MatchRequestBody {
            fingerprint,
            custom_parameters,
        };
        let request = ApiRequest::post_json(url, &body)?
            .with_header("Authorization", format!("Bearer {api_key}"));

        if self.config.log_verbose {
            debug!(
                url = %request.url(),
                body = %String::from_utf8_lossy(request.body().map(|b| b.as_ref()).unwrap_or_default()),
                "request_body"
            );
        }

        let response = self.transport.send(request).await?;

        if self.config.log_verbose {
            debug!(
                status = response.status,
                body = %String::from_utf8_lossy(&response.body),
                "response_body"
            );
        }

        if !response.is_success() {
            return Err(DeferlinkError::server(
                Some(response.status),
                String::from_utf8_lossy(&response.body).into_owned(),
            ));
        }

        serde_json::from_slice(&response.body).map_err(|e| {
            DeferlinkError::server(None, format!("undecodable response body: {e}"))
        })
    }
}
