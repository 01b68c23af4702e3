//! Device fingerprint construction.
//!
//! A [`Fingerprint`] is the snapshot of device and install identity sent to
//! the matching backend. It is built once per match attempt from
//! [`DeviceSignals`] the host has already collected; nothing here touches the
//! network, disk or platform APIs.
//!
//! # Policies
//!
//! - Screen resolution is `round(width*scale)xround(height*scale)`.
//! - The advertising identifier is kept only when tracking is enabled.
//! - Missing optional signals are omitted, never replaced by `""`.
//! - Language falls back to `"en"`.
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use deferlink::{generate, DeviceSignals};
//!
//! let now = Utc::now();
//! let signals = DeviceSignals {
//!     platform: "ios".into(),
//!     device_model: "iPhone15,2".into(),
//!     os_version: "17.2".into(),
//!     screen_width: 393.0,
//!     screen_height: 852.0,
//!     screen_scale: 3.0,
//!     timezone: "Europe/Berlin".into(),
//!     installed_at: now,
//!     last_opened_at: now,
//!     ..Default::default()
//! };
//!
//! let fp = generate(&signals);
//! assert_eq!(fp.screen_resolution, "1179x2556");
//! assert_eq!(fp.language, "en");
//! assert!(fp.advertising_id.is_none());
//! ```
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::timestamp;

/// Language reported when the host has none.
pub const DEFAULT_LANGUAGE: &str = "en";

const SDK_NAME: &str = "deferlink-sdk";

/// Raw signals handed over by the host platform.
///
/// Permission-gated values arrive already authorized: `None` means the
/// platform did not provide them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DeviceSignals {
    /// Platform name, e.g. `"ios"` or `"android"`.
    pub platform: String,
    pub device_model: String,
    pub os_version: String,
    /// Screen width in points.
    pub screen_width: f64,
    /// Screen height in points.
    pub screen_height: f64,
    /// Pixel scale factor (points to pixels).
    pub screen_scale: f64,
    /// IANA timezone identifier.
    pub timezone: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub carrier: Option<String>,
    /// User agent of the host web view, if the host exposes one.
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub advertising_id: Option<String>,
    #[serde(default)]
    pub ad_tracking_enabled: bool,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub vendor_id: Option<String>,
    #[serde(default)]
    pub hardware_fingerprint: Option<String>,
    #[serde(with = "timestamp", default = "Utc::now")]
    pub installed_at: DateTime<Utc>,
    #[serde(with = "timestamp", default = "Utc::now")]
    pub last_opened_at: DateTime<Utc>,
}

/// Device and install snapshot submitted for matching.
///
/// Wire names are the snake_case field names. Optional identifiers are left
/// out of the encoding entirely when absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fingerprint {
    pub user_agent: String,
    pub platform: String,
    pub os_version: String,
    pub device_model: String,
    pub language: String,
    pub timezone: String,
    pub screen_resolution: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
    #[serde(with = "timestamp")]
    pub install_timestamp: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub last_opened_timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advertising_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_fingerprint: Option<String>,
}

/// Build a [`Fingerprint`] from host signals. Never fails.
pub fn generate(signals: &DeviceSignals) -> Fingerprint {
    let language = signals
        .language
        .as_deref()
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .unwrap_or(DEFAULT_LANGUAGE)
        .to_owned();

    let advertising_id = if signals.ad_tracking_enabled {
        signals.advertising_id.clone()
    } else {
        None
    };

    let user_agent = signals
        .user_agent
        .clone()
        .unwrap_or_else(|| default_user_agent(signals));

    Fingerprint {
        user_agent,
        platform: signals.platform.clone(),
        os_version: signals.os_version.clone(),
        device_model: signals.device_model.clone(),
        language,
        timezone: signals.timezone.clone(),
        screen_resolution: screen_resolution(
            signals.screen_width,
            signals.screen_height,
            signals.screen_scale,
        ),
        carrier: signals.carrier.clone(),
        install_timestamp: timestamp::truncate(signals.installed_at),
        last_opened_timestamp: timestamp::truncate(signals.last_opened_at),
        device_id: signals.device_id.clone(),
        advertising_id,
        vendor_id: signals.vendor_id.clone(),
        hardware_fingerprint: signals.hardware_fingerprint.clone(),
    }
}

/// Pixel resolution string, `"<w>x<h>"`.
pub fn screen_resolution(width: f64, height: f64, scale: f64) -> String {
    let px = |points: f64| (points * scale).round() as i64;
    format!("{}x{}", px(width), px(height))
}

/// Hex SHA-256 over the stable hardware signals.
///
/// Hosts that want a hardware hash compute it with this and pass it back in
/// [`DeviceSignals::hardware_fingerprint`]; [`generate`] never fills it in on
/// its own.
pub fn hardware_fingerprint_hash(signals: &DeviceSignals) -> String {
    let resolution = screen_resolution(
        signals.screen_width,
        signals.screen_height,
        signals.screen_scale,
    );
    let mut hasher = Sha256::new();
    for part in [
        signals.platform.as_str(),
        signals.device_model.as_str(),
        signals.os_version.as_str(),
        resolution.as_str(),
        signals.timezone.as_str(),
    ] {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

fn default_user_agent(signals: &DeviceSignals) -> String {
    format!(
        "{SDK_NAME}/{} ({} {}; {})",
        env!("CARGO_PKG_VERSION"),
        signals.platform,
        signals.os_version,
        signals.device_model
    )
}
