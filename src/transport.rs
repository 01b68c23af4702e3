//! The transport seam.
//!
//! The match client never talks to the network itself: it hands an
//! [`ApiRequest`] to a [`Transport`] and gets status + body bytes back.
//! Production code uses [`HttpTransport`] (feature `http`); tests plug in a
//! double that returns canned bytes.
//!
//! Cancellation follows the future: dropping the future returned by
//! [`Transport::send`] must abort the exchange.
use std::error::Error as StdError;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::request::ApiRequest;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Failure reported by a transport. Wraps the original error untouched so
/// callers can downcast it through [`std::error::Error::source`].
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(#[source] BoxError);

impl TransportError {
    pub fn new<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        TransportError(err.into())
    }

    /// The wrapped error.
    pub fn inner(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.0.as_ref()
    }

    pub fn into_inner(self) -> BoxError {
        self.0
    }
}

/// Raw response handed back by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Bytes,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one request and returns the raw response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<TransportResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(&self, request: ApiRequest) -> Result<TransportResponse, TransportError> {
        (**self).send(request).await
    }
}

#[cfg(feature = "http")]
pub use self::http::HttpTransport;

#[cfg(feature = "http")]
mod http {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::{Transport, TransportError, TransportResponse};
    use crate::request::{ApiRequest, Method};

    /// reqwest-backed transport with connection pooling and rustls.
    #[derive(Debug, Clone)]
    pub struct HttpTransport {
        client: reqwest::Client,
    }

    impl HttpTransport {
        /// Client with the given overall request timeout.
        pub fn new(timeout: Duration) -> Result<Self, TransportError> {
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .connect_timeout(timeout.min(Duration::from_secs(10)))
                .pool_max_idle_per_host(4)
                .build()
                .map_err(TransportError::new)?;
            Ok(Self { client })
        }

        /// Reuse an existing reqwest client.
        pub fn from_client(client: reqwest::Client) -> Self {
            Self { client }
        }
    }

    #[async_trait]
    impl Transport for HttpTransport {
        async fn send(&self, request: ApiRequest) -> Result<TransportResponse, TransportError> {
            let mut builder = match request.method() {
                Method::Get => self.client.get(request.url().clone()),
                Method::Post => self.client.post(request.url().clone()),
            };
            for (name, value) in request.headers() {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if let Some(body) = request.body() {
                builder = builder.body(body.clone());
            }

            let response = builder.send().await.map_err(TransportError::new)?;
            let status = response.status().as_u16();
            let body = response.bytes().await.map_err(TransportError::new)?;
            Ok(TransportResponse { status, body })
        }
    }
}
