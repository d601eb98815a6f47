//! Thin, typed wrapper around the backend's HTTP surface.
//!
//! Provides ergonomic async methods ([`ApiClient::status`],
//! [`ApiClient::teams`], [`ApiClient::team_qr`], ...) that accept and return
//! Rust-native types so the gate, console, and dispatcher modules never
//! touch raw requests or JSON directly.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::config::ConsoleConfig;
use crate::error::ApiError;
use crate::roster::Team;

/// Lock status endpoint, polled and fetched once at startup.
pub(crate) const STATUS_PATH: &str = "/api/super/status";
/// WebSocket feed of push status messages, shared across consoles.
pub(crate) const STATUS_FEED_PATH: &str = "/api/super/status/feed";
/// Full roster fetch; the client filters and paginates locally.
pub(crate) const TEAMS_PATH: &str = "/api/teams";
/// Bulk CSV import of teams.
pub(crate) const UPLOAD_CSV_PATH: &str = "/api/teams/upload-csv";

/// Result of a lock status check.
///
/// The console is locked when access is not allowed *or* a forced logout has
/// been requested; both fields default to their locked-leaning values so a
/// sparse payload never accidentally unlocks the console.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StatusReport {
    /// Whether the console may be used.
    pub allowed: bool,
    /// Super-admin requested an immediate logout.
    pub force_logout: bool,
}

impl StatusReport {
    /// Project the report onto the single boolean the lock gate tracks.
    pub fn locked(&self) -> bool {
        !self.allowed || self.force_logout
    }
}

/// The QR endpoint answers with either a bare object or a one-element list;
/// both decode here and are normalized by [`first_qr`].
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum QrPayload {
    Many(Vec<QrEntry>),
    One(QrEntry),
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct QrEntry {
    #[serde(default)]
    qr: Option<String>,
}

/// Normalize either QR payload shape to the first QR image, if any.
///
/// Extracted from [`ApiClient::team_qr`] so shape handling can be
/// unit-tested without a live backend.
pub(crate) fn first_qr(payload: QrPayload) -> Option<String> {
    match payload {
        QrPayload::One(entry) => entry.qr,
        QrPayload::Many(entries) => entries.into_iter().next().and_then(|e| e.qr),
    }
}

/// Typed client for the registration backend.
///
/// Two underlying HTTP clients back it: one-shot calls carry the configured
/// request timeout, while streaming requests (SSE log consoles) must not --
/// a total-response timeout would kill a healthy long-lived stream.
///
/// `Clone` is cheap: `reqwest::Client` wraps a shared connection pool and
/// the strings are `Arc`ed.
#[derive(Clone)]
pub struct ApiClient {
    oneshot: reqwest::Client,
    streaming: reqwest::Client,
    base_url: Arc<str>,
    app_id: Arc<str>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("app_id", &self.app_id)
            .finish()
    }
}

impl ApiClient {
    /// Build a client from the console configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] if the underlying HTTP client cannot
    /// be constructed.
    pub fn new(config: &ConsoleConfig) -> Result<Self, ApiError> {
        let oneshot = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        let streaming = reqwest::Client::builder()
            .connect_timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            oneshot,
            streaming,
            base_url: Arc::from(config.base_url.as_str()),
            app_id: Arc::from(config.app_id.as_str()),
        })
    }

    /// Absolute URL for a backend path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Identity used to scope push status messages to this console.
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// WebSocket URL of the push status feed (`http` → `ws`, `https` → `wss`).
    pub fn push_feed_url(&self) -> String {
        let base: &str = &self.base_url;
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!("{ws_base}{STATUS_FEED_PATH}")
    }

    /// GET a JSON payload from `path` and decode it.
    ///
    /// Non-2xx responses become [`ApiError::BadStatus`]; a body that decodes
    /// as something else becomes [`ApiError::Malformed`].
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.oneshot.get(self.url(path)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::BadStatus {
                endpoint: path.to_string(),
                status: status.as_u16(),
            });
        }
        // Read the body as text first so decode failures surface as
        // `Malformed` rather than vanishing into a transport error.
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Fetch the current lock status.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`]; the lock gate treats all of them as "keep the
    /// previous state".
    pub async fn status(&self) -> Result<StatusReport, ApiError> {
        self.get_json(STATUS_PATH).await
    }

    /// Fetch the full team roster.
    pub async fn teams(&self) -> Result<Vec<Team>, ApiError> {
        self.get_json(TEAMS_PATH).await
    }

    /// Fetch a single team's QR image (a data URI or URL).
    ///
    /// Handles both response shapes the backend is known to produce: a bare
    /// `{ qr }` object and a one-element `[{ qr }]` list.
    ///
    /// # Returns
    ///
    /// `Ok(None)` if the backend answered successfully but carried no QR.
    pub async fn team_qr(&self, team_id: &str) -> Result<Option<String>, ApiError> {
        let path = format!("{TEAMS_PATH}/{team_id}/qrs");
        let payload: QrPayload = self.get_json(&path).await?;
        Ok(first_qr(payload))
    }

    /// Fire-and-forget single-team test mail.
    ///
    /// The response body is not inspected beyond the status code.
    pub async fn send_test_mail(&self, team_id: &str) -> Result<(), ApiError> {
        let path = format!("/api/admin/send-qr-mail/{team_id}");
        let response = self.oneshot.post(self.url(&path)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::BadStatus {
                endpoint: path,
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    /// Bulk-import teams from a CSV file.
    ///
    /// The response is not inspected beyond success or failure; the backend
    /// owns all CSV parsing semantics.
    pub async fn upload_csv(&self, file_name: &str, bytes: Vec<u8>) -> Result<(), ApiError> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("text/csv")?;
        let form = reqwest::multipart::Form::new().part("file", part);
        let response = self
            .oneshot
            .post(self.url(UPLOAD_CSV_PATH))
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::BadStatus {
                endpoint: UPLOAD_CSV_PATH.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    /// Open a server-sent-events stream at an absolute URL.
    ///
    /// Uses the streaming client (no total-response timeout) and checks the
    /// status before handing the response to the console transport.
    pub(crate) async fn open_sse(&self, url: &str) -> Result<reqwest::Response, ApiError> {
        let response = self
            .streaming
            .get(url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::BadStatus {
                endpoint: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ApiClient {
        let config = ConsoleConfig::new("http://localhost:5000", "console-a");
        ApiClient::new(&config).expect("client construction")
    }

    #[test]
    fn url_joins_base_and_path() {
        assert_eq!(client().url("/api/teams"), "http://localhost:5000/api/teams");
    }

    #[test]
    fn push_feed_url_swaps_scheme() {
        assert_eq!(
            client().push_feed_url(),
            "ws://localhost:5000/api/super/status/feed"
        );
        let tls = ConsoleConfig::new("https://backend.example", "console-a");
        let tls_client = ApiClient::new(&tls).expect("client construction");
        assert_eq!(
            tls_client.push_feed_url(),
            "wss://backend.example/api/super/status/feed"
        );
    }

    // --- StatusReport projection ---

    #[test]
    fn status_report_locked_projection() {
        let allowed: StatusReport = serde_json::from_str(r#"{"allowed": true}"#).expect("decode");
        assert!(!allowed.locked());

        let denied: StatusReport = serde_json::from_str(r#"{"allowed": false}"#).expect("decode");
        assert!(denied.locked());

        let forced: StatusReport =
            serde_json::from_str(r#"{"allowed": true, "forceLogout": true}"#).expect("decode");
        assert!(forced.locked());

        // A sparse payload leans locked rather than accidentally unlocking.
        let sparse: StatusReport = serde_json::from_str("{}").expect("decode");
        assert!(sparse.locked());
    }

    // --- QR payload shape normalization ---

    #[test]
    fn qr_payload_bare_object() {
        let payload: QrPayload =
            serde_json::from_str(r#"{"qr": "data:image/png;base64,AAAA"}"#).expect("decode");
        assert_eq!(
            first_qr(payload).as_deref(),
            Some("data:image/png;base64,AAAA")
        );
    }

    #[test]
    fn qr_payload_one_element_list() {
        let payload: QrPayload =
            serde_json::from_str(r#"[{"qr": "data:image/png;base64,BBBB"}]"#).expect("decode");
        assert_eq!(
            first_qr(payload).as_deref(),
            Some("data:image/png;base64,BBBB")
        );
    }

    #[test]
    fn qr_payload_empty_list_and_missing_field() {
        let payload: QrPayload = serde_json::from_str("[]").expect("decode");
        assert_eq!(first_qr(payload), None);

        let payload: QrPayload = serde_json::from_str("{}").expect("decode");
        assert_eq!(first_qr(payload), None);
    }
}
