//! # Digiseller Client
//!
//! HTTP calls to the Digiseller API: signed login and the sales listing.
//!
//! ## Endpoints
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST {base}/apilogin                                                   │
//! │    { "seller_id", "timestamp", "sign" }                                 │
//! │    ◄── { "retval": 0, "token": "..." }                                  │
//! │                                                                         │
//! │  POST {base}/seller-sells/v2?token=<token>                              │
//! │    { "date_start", "date_finish", "returned": 0, "page", "rows" }       │
//! │    ◄── { "rows": [ {...}, {...} ] }     (missing/empty = no orders)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Error Mapping
//! - network failure or timeout → [`SyncError::Transport`] / [`SyncError::Timeout`]
//! - non-2xx status → [`SyncError::RemoteHttp`]
//! - body of the wrong shape → [`SyncError::RemoteData`]
//! - login with `retval != 0` → [`SyncError::RemoteAuth`]

use chrono::Utc;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{Credentials, DigisellerSettings};
use crate::credentials::sign;
use crate::error::{SyncError, SyncResult};
use digisales_core::{FetchWindow, RawSaleRow};

/// Login never waits longer than this, whatever the request timeout.
const LOGIN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    seller_id: Value,
    timestamp: i64,
    sign: &'a str,
}

#[derive(Debug, Serialize)]
struct ListingRequest {
    date_start: String,
    date_finish: String,
    returned: u8,
    page: u32,
    rows: u32,
}

#[derive(Debug, Deserialize)]
struct ListingResponse {
    #[serde(default)]
    retval: Option<i64>,
    #[serde(default)]
    rows: Option<Vec<RawSaleRow>>,
}

/// Upper bound on window halvings in one `fetch_window` call. Enough to
/// narrow a window reaching back to the sync epoch down to one second.
const DEFAULT_MAX_SPLITS: u32 = 64;

/// Rows collected across the pages of one window.
#[derive(Debug, Default)]
pub struct WindowRows {
    pub rows: Vec<RawSaleRow>,
    /// Listing requests made, across all sub-windows.
    pub pages: u32,
    /// Times a window was halved because it hit the page ceiling.
    pub splits: u32,
    /// Sub-windows that still hit the page ceiling and could not be split.
    pub truncated: Vec<FetchWindow>,
}

impl WindowRows {
    pub fn is_complete(&self) -> bool {
        self.truncated.is_empty()
    }
}

/// Digiseller API client.
#[derive(Debug, Clone)]
pub struct DigisellerClient {
    http: Client,
    base_url: String,
    page_size: u32,
    max_pages: u32,
    max_splits: u32,
    timeout: Duration,
}

impl DigisellerClient {
    pub fn new(settings: &DigisellerSettings) -> SyncResult<Self> {
        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()?;

        Ok(DigisellerClient {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            page_size: settings.page_size,
            max_pages: settings.max_pages,
            max_splits: DEFAULT_MAX_SPLITS,
            timeout: settings.request_timeout(),
        })
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Exchanges credentials for a token.
    pub async fn login(&self, credentials: &Credentials) -> SyncResult<String> {
        let timestamp = Utc::now().timestamp();
        let signature = sign(&credentials.api_key, timestamp);
        // The API expects a numeric seller id; keep non-numeric ids verbatim.
        let seller_id = credentials
            .seller_id
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::from(credentials.seller_id.clone()));

        let login_timeout = LOGIN_TIMEOUT.min(self.timeout);
        let response = self
            .http
            .post(format!("{}/apilogin", self.base_url))
            .header(ACCEPT, "application/json")
            .timeout(login_timeout)
            .json(&LoginRequest {
                seller_id,
                timestamp,
                sign: &signature,
            })
            .send()
            .await
            .map_err(|e| send_error(e, login_timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| send_error(e, login_timeout))?;

        if !status.is_success() {
            return Err(SyncError::RemoteHttp {
                status: status.as_u16(),
                body,
            });
        }

        let data: Value = serde_json::from_str(&body)?;
        let retval = data.get("retval").and_then(Value::as_i64);
        match (retval, data.get("token").and_then(Value::as_str)) {
            (Some(0), Some(token)) if !token.is_empty() => Ok(token.to_string()),
            _ => Err(SyncError::RemoteAuth {
                retval: retval.unwrap_or(-1),
                payload: body,
            }),
        }
    }

    /// Fetches one page of the sales listing.
    pub async fn fetch_page(
        &self,
        token: &str,
        window: &FetchWindow,
        page: u32,
    ) -> SyncResult<Vec<RawSaleRow>> {
        let request = ListingRequest {
            date_start: window.date_start(),
            date_finish: window.date_finish(),
            returned: 0,
            page,
            rows: self.page_size,
        };

        debug!(
            page,
            date_start = %request.date_start,
            date_finish = %request.date_finish,
            "Requesting sales page"
        );

        let response = self
            .http
            .post(format!("{}/seller-sells/v2", self.base_url))
            .query(&[("token", token)])
            .header(ACCEPT, "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| send_error(e, self.timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| send_error(e, self.timeout))?;

        if !status.is_success() {
            return Err(SyncError::RemoteHttp {
                status: status.as_u16(),
                body,
            });
        }

        let listing: ListingResponse = serde_json::from_str(&body)?;
        let rows = listing.rows.unwrap_or_default();

        if rows.is_empty() {
            if let Some(retval) = listing.retval.filter(|r| *r != 0) {
                return Err(SyncError::RemoteData(format!(
                    "listing rejected (retval {retval}): {body}"
                )));
            }
        }

        Ok(rows)
    }

    /// Fetches every row in `window`.
    ///
    /// Each window is read page by page until a short page. A window that
    /// still returns a full page at `max_pages` is halved and both halves are
    /// fetched again, oldest first, so the listing order of the remote does
    /// not matter. Windows that cannot be halved any further, or that hit the
    /// split limit, keep what they returned and are reported in
    /// [`WindowRows::truncated`].
    pub async fn fetch_window(&self, token: &str, window: &FetchWindow) -> SyncResult<WindowRows> {
        let mut collected = WindowRows::default();
        let mut pending = vec![*window];

        while let Some(current) = pending.pop() {
            let (rows, pages, complete) = self.fetch_pages(token, &current).await?;
            collected.pages += pages;

            if complete {
                collected.rows.extend(rows);
                continue;
            }

            match current.split().filter(|_| collected.splits < self.max_splits) {
                Some((older, newer)) => {
                    debug!(
                        date_start = %current.date_start(),
                        date_finish = %current.date_finish(),
                        "Page limit reached, splitting window"
                    );
                    collected.splits += 1;
                    pending.push(newer);
                    pending.push(older);
                }
                None => {
                    warn!(
                        date_start = %current.date_start(),
                        date_finish = %current.date_finish(),
                        max_pages = self.max_pages,
                        "Page limit reached on a window that cannot be split, rows may be missing"
                    );
                    collected.rows.extend(rows);
                    collected.truncated.push(current);
                }
            }
        }

        Ok(collected)
    }

    /// Reads pages 1..=`max_pages`; `complete` is false if the last was full.
    async fn fetch_pages(
        &self,
        token: &str,
        window: &FetchWindow,
    ) -> SyncResult<(Vec<RawSaleRow>, u32, bool)> {
        let mut rows = Vec::new();

        for page in 1..=self.max_pages {
            let batch = self.fetch_page(token, window, page).await?;
            let count = batch.len();
            rows.extend(batch);

            if count < self.page_size as usize {
                return Ok((rows, page, true));
            }
        }

        Ok((rows, self.max_pages, false))
    }
}

fn send_error(err: reqwest::Error, timeout: Duration) -> SyncError {
    if err.is_timeout() {
        SyncError::Timeout(timeout.as_secs())
    } else {
        SyncError::from(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use digisales_core::window::parse_remote_timestamp;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn settings(base_url: &str, page_size: u32, max_pages: u32) -> DigisellerSettings {
        DigisellerSettings {
            seller_id: Some("777".to_string()),
            api_key: Some("key".to_string()),
            base_url: base_url.to_string(),
            page_size,
            max_pages,
            request_timeout_secs: 5,
            token_ttl_secs: 60,
        }
    }

    fn credentials() -> Credentials {
        Credentials {
            seller_id: "777".to_string(),
            api_key: "key".to_string(),
        }
    }

    fn window() -> FetchWindow {
        FetchWindow {
            start: parse_remote_timestamp("start", "2024-01-01 00:00:01").unwrap(),
            end: parse_remote_timestamp("end", "2024-01-02 00:00:00").unwrap(),
        }
    }

    fn rows(count: usize, offset: usize) -> Vec<serde_json::Value> {
        (0..count)
            .map(|i| {
                json!({
                    "invoice_id": i + offset,
                    "product_id": 1,
                    "product_name": "p",
                    "product_entry": "e",
                    "date_put": "2024-01-01 10:00:00"
                })
            })
            .collect()
    }

    fn signed_correctly(request: &Request) -> bool {
        let body: serde_json::Value = match serde_json::from_slice(&request.body) {
            Ok(v) => v,
            Err(_) => return false,
        };
        let ts = body["timestamp"].as_i64().unwrap_or_default();
        body["sign"].as_str() == Some(sign("key", ts).as_str()) && body["seller_id"] == json!(777)
    }

    #[tokio::test]
    async fn login_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/apilogin"))
            .and(header("accept", "application/json"))
            .and(signed_correctly)
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"retval": 0, "token": "T-1"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = DigisellerClient::new(&settings(&server.uri(), 500, 20)).unwrap();
        assert_eq!(client.login(&credentials()).await.unwrap(), "T-1");
    }

    #[tokio::test]
    async fn login_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/apilogin"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"retval": 1, "desc": "bad sign"})),
            )
            .mount(&server)
            .await;

        let client = DigisellerClient::new(&settings(&server.uri(), 500, 20)).unwrap();
        match client.login(&credentials()).await.unwrap_err() {
            SyncError::RemoteAuth { retval, payload } => {
                assert_eq!(retval, 1);
                assert!(payload.contains("bad sign"));
            }
            other => panic!("expected RemoteAuth, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_page_sends_contract_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/seller-sells/v2"))
            .and(query_param("token", "T-1"))
            .and(header("accept", "application/json"))
            .and(header("content-type", "application/json"))
            .and(body_partial_json(json!({
                "date_start": "2024-01-01 00:00:01",
                "date_finish": "2024-01-02 00:00:00",
                "returned": 0,
                "page": 1,
                "rows": 500
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "retval": 0,
                "rows": rows(2, 0)
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = DigisellerClient::new(&settings(&server.uri(), 500, 20)).unwrap();
        let page = client.fetch_page("T-1", &window(), 1).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[1].invoice_id.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn fetch_page_missing_rows_means_empty() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/seller-sells/v2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"retval": 0})))
            .mount(&server)
            .await;

        let client = DigisellerClient::new(&settings(&server.uri(), 500, 20)).unwrap();
        assert!(client.fetch_page("T", &window(), 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fetch_page_http_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/seller-sells/v2"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let client = DigisellerClient::new(&settings(&server.uri(), 500, 20)).unwrap();
        match client.fetch_page("T", &window(), 1).await.unwrap_err() {
            SyncError::RemoteHttp { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body, "bad gateway");
            }
            other => panic!("expected RemoteHttp, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_page_bad_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/seller-sells/v2"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = DigisellerClient::new(&settings(&server.uri(), 500, 20)).unwrap();
        assert!(matches!(
            client.fetch_page("T", &window(), 1).await,
            Err(SyncError::RemoteData(_))
        ));
    }

    #[tokio::test]
    async fn fetch_window_stops_on_short_page() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/seller-sells/v2"))
            .and(body_partial_json(json!({"page": 1})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rows": rows(2, 0)})))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/seller-sells/v2"))
            .and(body_partial_json(json!({"page": 2})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rows": rows(1, 2)})))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/seller-sells/v2"))
            .and(body_partial_json(json!({"page": 3})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rows": []})))
            .expect(0)
            .mount(&server)
            .await;

        let client = DigisellerClient::new(&settings(&server.uri(), 2, 20)).unwrap();
        let fetched = client.fetch_window("T", &window()).await.unwrap();
        assert_eq!(fetched.rows.len(), 3);
        assert_eq!(fetched.pages, 2);
        assert!(fetched.is_complete());
    }

    /// Serves `sales` (invoice id, date) newest first, honouring the window
    /// and page fields of the request body.
    fn listing_between(sales: Vec<(i64, &'static str)>) -> impl Fn(&Request) -> ResponseTemplate {
        move |request: &Request| {
            let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
            let start = body["date_start"].as_str().unwrap().to_string();
            let finish = body["date_finish"].as_str().unwrap().to_string();
            let page = body["page"].as_u64().unwrap() as usize;
            let size = body["rows"].as_u64().unwrap() as usize;

            let mut matching: Vec<_> = sales
                .iter()
                .filter(|(_, at)| *at >= start.as_str() && *at <= finish.as_str())
                .collect();
            matching.sort_by(|a, b| b.1.cmp(a.1));

            let rows: Vec<_> = matching
                .into_iter()
                .skip((page - 1) * size)
                .take(size)
                .map(|(id, at)| {
                    json!({
                        "invoice_id": id,
                        "product_id": 1,
                        "product_name": "p",
                        "product_entry": "e",
                        "date_put": at,
                        "date_pay": at
                    })
                })
                .collect();
            ResponseTemplate::new(200).set_body_json(json!({ "rows": rows }))
        }
    }

    #[tokio::test]
    async fn fetch_window_splits_instead_of_dropping_rows() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/seller-sells/v2"))
            .respond_with(listing_between(vec![
                (1, "2024-01-01 03:00:00"),
                (2, "2024-01-01 09:00:00"),
                (3, "2024-01-01 15:00:00"),
                (4, "2024-01-01 18:00:00"),
                (5, "2024-01-01 21:00:00"),
            ]))
            .mount(&server)
            .await;

        let client = DigisellerClient::new(&settings(&server.uri(), 2, 1)).unwrap();
        let fetched = client.fetch_window("T", &window()).await.unwrap();

        let mut ids: Vec<_> = fetched
            .rows
            .iter()
            .map(|r| r.invoice_id.clone().unwrap())
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
        assert!(fetched.is_complete());
        assert!(fetched.splits >= 1);
    }

    #[tokio::test]
    async fn fetch_window_reports_windows_it_cannot_split() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/seller-sells/v2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rows": rows(2, 0)})))
            .expect(3)
            .mount(&server)
            .await;

        let mut client = DigisellerClient::new(&settings(&server.uri(), 2, 1)).unwrap();
        client.max_splits = 1;
        let fetched = client.fetch_window("T", &window()).await.unwrap();

        let (older, newer) = window().split().unwrap();
        assert_eq!(fetched.splits, 1);
        assert_eq!(fetched.pages, 3);
        assert_eq!(fetched.truncated, vec![older, newer]);
        assert_eq!(fetched.rows.len(), 4);
    }

    #[tokio::test]
    async fn single_second_window_is_truncated_not_split() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/seller-sells/v2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rows": rows(2, 0)})))
            .expect(3)
            .mount(&server)
            .await;

        let at = parse_remote_timestamp("at", "2024-01-01 10:00:00").unwrap();
        let instant = FetchWindow { start: at, end: at };

        let client = DigisellerClient::new(&settings(&server.uri(), 2, 3)).unwrap();
        let fetched = client.fetch_window("T", &instant).await.unwrap();

        assert_eq!(fetched.pages, 3);
        assert_eq!(fetched.splits, 0);
        assert_eq!(fetched.rows.len(), 6);
        assert_eq!(fetched.truncated, vec![instant]);
    }

    #[tokio::test]
    async fn unreachable_server_is_transport_error() {
        // Nothing listens on port 9 (discard) locally
        let client = DigisellerClient::new(&settings("http://127.0.0.1:9", 500, 20)).unwrap();
        let err = client.login(&credentials()).await.unwrap_err();
        assert!(err.is_retryable(), "got {err:?}");
    }
}
