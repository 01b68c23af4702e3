//! Shared test double for the transport seam.
#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use deferlink::{
    ApiRequest, DeferlinkConfig, DeviceSignals, Fingerprint, Transport, TransportError,
    TransportResponse, generate,
};

enum Canned {
    Response(u16, Vec<u8>),
    Failure(io::ErrorKind, &'static str),
}

/// Returns the same canned answer for every call and records what it saw.
pub struct MockTransport {
    canned: Canned,
    delay: Option<Duration>,
    calls: AtomicUsize,
    completed: AtomicUsize,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn json(status: u16, body: serde_json::Value) -> Arc<Self> {
        Self::raw(status, body.to_string())
    }

    pub fn raw(status: u16, body: impl Into<Vec<u8>>) -> Arc<Self> {
        Arc::new(Self::with(Canned::Response(status, body.into()), None))
    }

    pub fn failing(kind: io::ErrorKind, message: &'static str) -> Arc<Self> {
        Arc::new(Self::with(Canned::Failure(kind, message), None))
    }

    /// Answers `body` only after `delay`.
    pub fn slow(delay: Duration, body: serde_json::Value) -> Arc<Self> {
        Arc::new(Self::with(
            Canned::Response(200, body.to_string().into_bytes()),
            Some(delay),
        ))
    }

    fn with(canned: Canned, delay: Option<Duration>) -> Self {
        Self {
            canned,
            delay,
            calls: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<ApiRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    pub fn last_body(&self) -> serde_json::Value {
        let request = self.last_request().expect("no request was sent");
        serde_json::from_slice(request.body().expect("request has a body")).unwrap()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<TransportResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        match &self.canned {
            Canned::Response(status, body) => Ok(TransportResponse::new(*status, body.clone())),
            Canned::Failure(kind, message) => Err(TransportError::new(io::Error::new(*kind, *message))),
        }
    }
}

pub fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, h, m, 0).unwrap()
}

pub fn config() -> DeferlinkConfig {
    DeferlinkConfig::default()
        .with_api_key("test-key")
        .with_base_url("https://api.example.test")
        .with_min_confidence(0.8)
}

pub fn signals() -> DeviceSignals {
    DeviceSignals {
        platform: "ios".into(),
        device_model: "iPhone15,2".into(),
        os_version: "17.2".into(),
        screen_width: 393.0,
        screen_height: 852.0,
        screen_scale: 3.0,
        timezone: "Europe/Berlin".into(),
        language: Some("de".into()),
        installed_at: at(0, 0),
        last_opened_at: at(0, 5),
        ..Default::default()
    }
}

pub fn fingerprint() -> Fingerprint {
    generate(&signals())
}

pub fn scenario_body() -> serde_json::Value {
    serde_json::json!({
        "match": {
            "confidence_score": 0.92,
            "ttl_seconds": 3600,
            "deeplink": {
                "id": "m1",
                "target_url": "https://x/y",
                "metadata": {},
                "matched_at": "2024-01-01T00:00:00Z",
                "expires_at": "2024-01-01T01:00:00Z"
            }
        }
    })
}
