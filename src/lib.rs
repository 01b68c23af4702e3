//! Deferred deep-link SDK core.
//!
//! This crate turns device signals into a fingerprint, submits it to the
//! matching service and interprets the probabilistic answer: which deep link
//! and which campaign caused this install, and whether the answer can still
//! be trusted.
//!
//! ## Pieces
//!
//! - [`generate`] builds a [`Fingerprint`] from host [`DeviceSignals`].
//! - [`MatchResponse`], [`DeeplinkMatch`], [`Attribution`] model the server's
//!   answer; [`DynamicValue`] carries server-defined metadata.
//! - [`MatchClient`] sends the request through a [`Transport`] and applies the
//!   confidence and TTL policy ([`evaluate_match`]).
//!
//! ## Example
//!
//! ```no_run
//! use chrono::Utc;
//! use deferlink::{generate, DeferlinkConfig, DeviceSignals, HttpTransport, MatchClient, MatchOutcome};
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DeferlinkConfig::default().with_api_key("dl_live_xxx");
//! let transport = HttpTransport::new(Duration::from_secs(config.timeout_secs))?;
//! let client = MatchClient::new(config, transport);
//!
//! let fingerprint = generate(&DeviceSignals {
//!     platform: "ios".into(),
//!     device_model: "iPhone15,2".into(),
//!     os_version: "17.2".into(),
//!     screen_width: 393.0,
//!     screen_height: 852.0,
//!     screen_scale: 3.0,
//!     timezone: "Europe/Berlin".into(),
//!     installed_at: Utc::now(),
//!     last_opened_at: Utc::now(),
//!     ..Default::default()
//! });
//!
//! match client.request_match(&fingerprint).await? {
//!     MatchOutcome::Matched(found) => println!("open {}", found.deep_link),
//!     MatchOutcome::NoMatch(reason) => println!("organic install: {reason:?}"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Observability
//!
//! Every call runs inside a `tracing` span and emits one outcome event
//! (`match_found`, `match_rejected`, `match_failure`). Install any subscriber
//! to collect them; with `log_verbose` set, request and response bodies are
//! logged at debug level.

mod client;
mod config;
mod dynamic;
mod error;
mod fingerprint;
mod model;
mod request;
pub mod timestamp;
mod transport;

pub use crate::client::{MatchClient, MatchOutcome, NoMatchReason, ResolvedMatch, evaluate_match};
pub use crate::config::{
    ConfigError, DEFAULT_BASE_URL, DEFAULT_DEFERRED_PATH, DEFAULT_MATCH_PATH,
    DEFAULT_MIN_CONFIDENCE, DEFAULT_TIMEOUT_SECS, DeferlinkConfig,
};
pub use crate::dynamic::{DynamicMap, DynamicValue};
pub use crate::error::DeferlinkError;
pub use crate::fingerprint::{
    DEFAULT_LANGUAGE, DeviceSignals, Fingerprint, generate, hardware_fingerprint_hash,
    screen_resolution,
};
pub use crate::model::{
    AccountInfo, AppInfo, Attribution, CustomDomain, DeeplinkMatch, DeferredDeepLinkResponse,
    InitResponse, MatchDetails, MatchResponse, RateLimits,
};
pub use crate::request::{ApiRequest, Method, build_url, endpoint_url};
#[cfg(feature = "http")]
pub use crate::transport::HttpTransport;
pub use crate::transport::{Transport, TransportError, TransportResponse};
pub use url::Url;
