//! Connection manager: the SUBSCRIBE call and its first-response outcome
//! taxonomy.

use bytes::Bytes;
use futures_util::Stream;
use reqwest::Client;
use url::Url;

use crate::constants::CONNECT_TIMEOUT;
use crate::error::{Result, TrackerError};

const SUBSCRIBE_BODY: &str = r#"{"type":"SUBSCRIBE"}"#;

/// Issues the SUBSCRIBE POST and classifies the first response. Redirects
/// are never followed automatically — a 307 must surface as
/// [`TrackerError::Redirect`], not be silently chased to a different host.
pub struct ConnectionManager {
    http: Client,
}

impl ConnectionManager {
    pub fn new() -> Self {
        let http = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("failed to build reqwest client");
        Self { http }
    }

    /// Attempt one SUBSCRIBE call against `master`. On a 2xx response,
    /// returns the chunked body as a stream the caller pulls one chunk at a
    /// time, so back-pressure stays cooperative rather than buffering the
    /// whole (potentially unbounded) stream. On anything else, returns the
    /// matching [`TrackerError`] for the caller's own retry policy (silent
    /// on redirect, logged otherwise).
    pub async fn connect(&self, master: &Url) -> Result<impl Stream<Item = reqwest::Result<Bytes>> + use<>> {
        tracing::debug!(%master, "POST /api/v1 SUBSCRIBE");
        let request = self.http.post(master.clone()).header(reqwest::header::CONTENT_TYPE, "application/json").body(SUBSCRIBE_BODY);

        let response = tokio::time::timeout(CONNECT_TIMEOUT, request.send())
            .await
            .map_err(|_| TrackerError::ConnectTimeout)??;

        let status = response.status();
        if status == reqwest::StatusCode::TEMPORARY_REDIRECT {
            return Err(TrackerError::Redirect);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TrackerError::HttpStatus { status, body });
        }

        Ok(response.bytes_stream())
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}
