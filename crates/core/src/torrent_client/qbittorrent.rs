//! qBittorrent torrent client implementation (Web API v2).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{multipart, Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::filter::category::is_within;
use crate::registry::ClientDescriptor;

use super::{
    AddTorrentRequest, AddTorrentResult, Reachability, TorrentClient, TorrentClientError,
    TorrentInfo,
};

/// qBittorrent client implementation.
pub struct QBittorrentClient {
    client: Client,
    name: String,
    url: String,
    username: String,
    password: String,
    /// Set once logged in; cleared when the session expires.
    session: Arc<RwLock<Option<String>>>,
}

impl QBittorrentClient {
    /// Create a new qBittorrent client for a configured instance.
    pub fn new(descriptor: &ClientDescriptor) -> Result<Self, TorrentClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(descriptor.timeout_secs as u64))
            .cookie_store(true)
            .build()
            .map_err(|e| {
                TorrentClientError::ConnectionFailed(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            name: descriptor.name.clone(),
            url: descriptor.url.clone(),
            username: descriptor.username.clone(),
            password: descriptor.password.clone(),
            session: Arc::new(RwLock::new(None)),
        })
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// Login and store session cookie.
    async fn login(&self) -> Result<(), TorrentClientError> {
        let params = [
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
        ];

        let response = self
            .client
            .post(self.endpoint("/api/v2/auth/login"))
            .form(&params)
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if body.contains("Ok.") {
            debug!(client = %self.name, "qBittorrent login successful");
            // Session cookie is stored by the cookie jar
            let mut session = self.session.write().await;
            *session = Some("authenticated".to_string());
            Ok(())
        } else if body.contains("Fails.") || status == StatusCode::FORBIDDEN {
            Err(TorrentClientError::AuthenticationFailed(
                "Invalid credentials".to_string(),
            ))
        } else {
            Err(TorrentClientError::AuthenticationFailed(format!(
                "Unexpected response: {}",
                body.chars().take(100).collect::<String>()
            )))
        }
    }

    /// Ensure we have a valid session, logging in if needed.
    async fn ensure_authenticated(&self) -> Result<(), TorrentClientError> {
        let session = self.session.read().await;
        if session.is_some() {
            return Ok(());
        }
        drop(session);
        self.login().await
    }

    /// Send an authenticated request, logging in again once on HTTP 403.
    ///
    /// `build` is called again for the retry since multipart bodies cannot
    /// be cloned.
    async fn send<F>(&self, build: F) -> Result<Response, TorrentClientError>
    where
        F: Fn() -> Result<RequestBuilder, TorrentClientError>,
    {
        self.ensure_authenticated().await?;

        let response = build()?.send().await.map_err(map_request_error)?;
        if response.status() != StatusCode::FORBIDDEN {
            return Ok(response);
        }

        warn!(client = %self.name, "qBittorrent session expired, re-authenticating");
        {
            let mut session = self.session.write().await;
            *session = None;
        }
        self.login().await?;

        build()?.send().await.map_err(map_request_error)
    }

    async fn get_text(&self, path: &str) -> Result<String, TorrentClientError> {
        let url = self.endpoint(path);
        let response = self.send(|| Ok(self.client.get(&url))).await?;
        read_text(response).await
    }

    async fn post_form(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Response, TorrentClientError> {
        let url = self.endpoint(path);
        self.send(|| Ok(self.client.post(&url).form(params))).await
    }
}

fn map_request_error(e: reqwest::Error) -> TorrentClientError {
    if e.is_timeout() {
        TorrentClientError::Timeout
    } else if e.is_connect() {
        TorrentClientError::ConnectionFailed(e.to_string())
    } else {
        TorrentClientError::ApiError(e.to_string())
    }
}

async fn read_text(response: Response) -> Result<String, TorrentClientError> {
    let status = response.status();
    if !status.is_success() {
        return Err(TorrentClientError::ApiError(format!("HTTP {}", status)));
    }
    response
        .text()
        .await
        .map_err(|e| TorrentClientError::ApiError(e.to_string()))
}

/// qBittorrent torrent info response.
#[derive(Debug, Deserialize)]
struct QBTorrentInfo {
    hash: String,
    name: String,
    state: String,
    progress: f64,
    #[serde(default)]
    size: i64,
    #[serde(default)]
    dlspeed: i64,
    #[serde(default)]
    upspeed: i64,
    #[serde(default)]
    added_on: i64,
    #[serde(default)]
    category: String,
}

impl QBTorrentInfo {
    fn into_torrent_info(self) -> TorrentInfo {
        TorrentInfo {
            hash: self.hash.to_lowercase(),
            name: self.name,
            category: self.category,
            state: self.state,
            progress: self.progress,
            size_bytes: self.size.max(0) as u64,
            download_speed: self.dlspeed.max(0) as u64,
            upload_speed: self.upspeed.max(0) as u64,
            added_at: timestamp_to_datetime(self.added_on),
        }
    }
}

/// Convert Unix timestamp to DateTime<Utc>.
fn timestamp_to_datetime(ts: i64) -> Option<DateTime<Utc>> {
    if ts > 0 {
        Utc.timestamp_opt(ts, 0).single()
    } else {
        None
    }
}

fn join_hashes(hashes: &[String]) -> String {
    hashes
        .iter()
        .map(|h| h.to_lowercase())
        .collect::<Vec<_>>()
        .join("|")
}

#[async_trait]
impl TorrentClient for QBittorrentClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_torrents(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<TorrentInfo>, TorrentClientError> {
        // The API's category parameter is an exact match, so subcategories
        // are filtered here instead.
        let response = self.get_text("/api/v2/torrents/info").await?;
        let torrents: Vec<QBTorrentInfo> = serde_json::from_str(&response)
            .map_err(|e| TorrentClientError::ApiError(format!("Failed to parse response: {}", e)))?;

        let mut results: Vec<TorrentInfo> =
            torrents.into_iter().map(|t| t.into_torrent_info()).collect();

        if let Some(scope) = category {
            results.retain(|t| is_within(&t.category, scope));
        }

        debug!(client = %self.name, count = results.len(), "Listed torrents");
        Ok(results)
    }

    async fn categories(&self) -> Result<Vec<String>, TorrentClientError> {
        let response = self.get_text("/api/v2/torrents/categories").await?;
        let categories: HashMap<String, serde_json::Value> = serde_json::from_str(&response)
            .map_err(|e| TorrentClientError::ApiError(format!("Failed to parse response: {}", e)))?;

        let mut names: Vec<String> = categories.into_keys().collect();
        names.sort();
        Ok(names)
    }

    async fn add_torrent(
        &self,
        request: AddTorrentRequest,
    ) -> Result<AddTorrentResult, TorrentClientError> {
        let url = self.endpoint("/api/v2/torrents/add");
        let filename = request
            .filename
            .clone()
            .unwrap_or_else(|| format!("{}.torrent", request.hash));

        let response = self
            .send(|| {
                let file_part = multipart::Part::bytes(request.data.clone())
                    .file_name(filename.clone())
                    .mime_str("application/x-bittorrent")
                    .map_err(|e| TorrentClientError::InvalidTorrent(e.to_string()))?;

                let mut form = multipart::Form::new().part("torrents", file_part);
                if let Some(cat) = &request.category {
                    form = form.text("category", cat.clone());
                }
                if request.stopped {
                    // `stopped` since qBittorrent 5.0, `paused` before.
                    form = form.text("stopped", "true").text("paused", "true");
                }
                Ok(self.client.post(&url).multipart(form))
            })
            .await?;

        let body = read_text(response).await?;
        if body.contains("Fails.") {
            return Err(TorrentClientError::Rejected(format!(
                "{} refused torrent {}",
                self.name, request.hash
            )));
        }

        Ok(AddTorrentResult {
            hash: request.hash.to_lowercase(),
        })
    }

    async fn start_torrents(&self, hashes: &[String]) -> Result<(), TorrentClientError> {
        let joined = join_hashes(hashes);
        let params = [("hashes", joined.as_str())];

        let response = self.post_form("/api/v2/torrents/start", &params).await?;
        if response.status() == StatusCode::NOT_FOUND {
            // Pre-5.0 instances only know the old endpoint name.
            debug!(client = %self.name, "Falling back to /torrents/resume");
            let response = self.post_form("/api/v2/torrents/resume", &params).await?;
            read_text(response).await?;
            return Ok(());
        }
        read_text(response).await?;
        Ok(())
    }

    async fn recheck_torrents(&self, hashes: &[String]) -> Result<(), TorrentClientError> {
        let joined = join_hashes(hashes);
        let response = self
            .post_form("/api/v2/torrents/recheck", &[("hashes", joined.as_str())])
            .await?;
        read_text(response).await?;
        Ok(())
    }

    async fn export_torrent(&self, hash: &str) -> Result<Vec<u8>, TorrentClientError> {
        let hash_lower = hash.to_lowercase();
        let url = self.endpoint(&format!(
            "/api/v2/torrents/export?hash={}",
            urlencoding::encode(&hash_lower)
        ));
        let response = self.send(|| Ok(self.client.get(&url))).await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(TorrentClientError::TorrentNotFound(hash_lower));
        }
        if !status.is_success() {
            return Err(TorrentClientError::ApiError(format!("HTTP {}", status)));
        }
        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| TorrentClientError::ApiError(e.to_string()))
    }

    async fn logout(&self) -> Result<(), TorrentClientError> {
        let mut session = self.session.write().await;
        if session.take().is_none() {
            return Ok(());
        }

        let response = self
            .client
            .post(self.endpoint("/api/v2/auth/logout"))
            .send()
            .await
            .map_err(map_request_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(TorrentClientError::ApiError(format!("HTTP {}", status)));
        }
        debug!(client = %self.name, "qBittorrent logout successful");
        Ok(())
    }

    async fn probe(&self) -> Reachability {
        // Any HTTP answer counts; only transport failures mean unreachable.
        match self.client.get(self.base_url()).send().await {
            Ok(_) => Reachability::Reachable,
            Err(e) => Reachability::Unreachable(map_request_error(e).to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use httpmock::prelude::*;
    use serde_json::json;

    fn descriptor(url: &str) -> ClientDescriptor {
        ClientDescriptor {
            name: "test".to_string(),
            url: url.to_string(),
            username: "admin".to_string(),
            password: "adminadmin".to_string(),
            category: None,
            timeout_secs: 5,
        }
    }

    fn client_for(server: &MockServer) -> QBittorrentClient {
        QBittorrentClient::new(&descriptor(&server.base_url())).unwrap()
    }

    fn mock_login(server: &MockServer) -> httpmock::Mock<'_> {
        server.mock(|when, then| {
            when.method(POST).path("/api/v2/auth/login");
            then.status(200).body("Ok.");
        })
    }

    #[test]
    fn test_timestamp_to_datetime() {
        let dt = timestamp_to_datetime(1703980800);
        assert!(dt.is_some());
        let dt = dt.unwrap();
        assert_eq!(dt.year(), 2023);

        let invalid = timestamp_to_datetime(-1);
        assert!(invalid.is_none());

        let zero = timestamp_to_datetime(0);
        assert!(zero.is_none());
    }

    #[test]
    fn test_qb_torrent_info_conversion() {
        let qb_info = QBTorrentInfo {
            hash: "ABC123".to_string(),
            name: "Test Torrent".to_string(),
            state: "stoppedUP".to_string(),
            progress: 1.0,
            size: 1000000,
            dlspeed: -1,
            upspeed: 1000,
            added_on: 1703980800,
            category: "movies/hd".to_string(),
        };

        let info = qb_info.into_torrent_info();
        assert_eq!(info.hash, "abc123"); // lowercase
        assert_eq!(info.name, "Test Torrent");
        assert_eq!(info.state, "stoppedUP");
        assert_eq!(info.size_bytes, 1000000);
        assert_eq!(info.download_speed, 0);
        assert_eq!(info.upload_speed, 1000);
        assert_eq!(info.category, "movies/hd");
        assert!(info.added_at.is_some());
    }

    #[test]
    fn test_join_hashes() {
        let hashes = vec!["ABC".to_string(), "def".to_string()];
        assert_eq!(join_hashes(&hashes), "abc|def");
    }

    #[tokio::test]
    async fn test_list_torrents_logs_in_once_and_scopes_category() {
        let server = MockServer::start_async().await;
        let login = mock_login(&server);
        server.mock(|when, then| {
            when.method(GET).path("/api/v2/torrents/info");
            then.status(200).json_body(json!([
                {"hash": "AAA", "name": "a", "state": "stoppedUP", "progress": 1.0, "category": "movies"},
                {"hash": "bbb", "name": "b", "state": "stalledDL", "progress": 0.5, "category": "movies/hd"},
                {"hash": "ccc", "name": "c", "state": "uploading", "progress": 1.0, "category": "moviesarchive"}
            ]));
        });

        let client = client_for(&server);
        let all = client.list_torrents(None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].hash, "aaa");

        let scoped = client.list_torrents(Some("movies")).await.unwrap();
        let hashes: Vec<_> = scoped.iter().map(|t| t.hash.as_str()).collect();
        assert_eq!(hashes, vec!["aaa", "bbb"]);

        login.assert_async().await;
    }

    #[tokio::test]
    async fn test_logout_only_after_login() {
        let server = MockServer::start_async().await;
        mock_login(&server);
        let logout = server.mock(|when, then| {
            when.method(POST).path("/api/v2/auth/logout");
            then.status(200);
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/v2/torrents/categories");
            then.status(200).json_body(json!({}));
        });

        let client = client_for(&server);
        client.logout().await.unwrap();
        assert_eq!(logout.hits_async().await, 0);

        client.categories().await.unwrap();
        client.logout().await.unwrap();
        client.logout().await.unwrap();
        assert_eq!(logout.hits_async().await, 1);
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/api/v2/auth/login");
            then.status(200).body("Fails.");
        });

        let err = client_for(&server).list_torrents(None).await.unwrap_err();
        assert!(matches!(err, TorrentClientError::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn test_categories() {
        let server = MockServer::start_async().await;
        mock_login(&server);
        server.mock(|when, then| {
            when.method(GET).path("/api/v2/torrents/categories");
            then.status(200).json_body(json!({
                "tv": {"name": "tv", "savePath": ""},
                "movies": {"name": "movies", "savePath": ""}
            }));
        });

        let categories = client_for(&server).categories().await.unwrap();
        assert_eq!(categories, vec!["movies".to_string(), "tv".to_string()]);
    }

    #[tokio::test]
    async fn test_add_torrent_ok() {
        let server = MockServer::start_async().await;
        mock_login(&server);
        let add = server.mock(|when, then| {
            when.method(POST).path("/api/v2/torrents/add");
            then.status(200).body("Ok.");
        });

        let request = AddTorrentRequest::new(vec![1, 2, 3], "ABCDEF").with_stopped(true);
        let result = client_for(&server).add_torrent(request).await.unwrap();
        assert_eq!(result.hash, "abcdef");
        add.assert_async().await;
    }

    #[tokio::test]
    async fn test_add_torrent_fails_is_rejected() {
        let server = MockServer::start_async().await;
        mock_login(&server);
        server.mock(|when, then| {
            when.method(POST).path("/api/v2/torrents/add");
            then.status(200).body("Fails.");
        });

        let request = AddTorrentRequest::new(vec![1, 2, 3], "abcdef");
        let err = client_for(&server).add_torrent(request).await.unwrap_err();
        assert!(matches!(err, TorrentClientError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_start_falls_back_to_resume() {
        let server = MockServer::start_async().await;
        mock_login(&server);
        let start = server.mock(|when, then| {
            when.method(POST).path("/api/v2/torrents/start");
            then.status(404);
        });
        let resume = server.mock(|when, then| {
            when.method(POST).path("/api/v2/torrents/resume");
            then.status(200);
        });

        client_for(&server)
            .start_torrents(&["abc".to_string()])
            .await
            .unwrap();
        start.assert_async().await;
        resume.assert_async().await;
    }

    #[tokio::test]
    async fn test_recheck_http_error() {
        let server = MockServer::start_async().await;
        mock_login(&server);
        server.mock(|when, then| {
            when.method(POST).path("/api/v2/torrents/recheck");
            then.status(500);
        });

        let err = client_for(&server)
            .recheck_torrents(&["abc".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, TorrentClientError::ApiError(_)));
    }

    #[tokio::test]
    async fn test_export_torrent() {
        let server = MockServer::start_async().await;
        mock_login(&server);
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/v2/torrents/export")
                .query_param("hash", "abc");
            then.status(200).body("d4:infode");
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/v2/torrents/export")
                .query_param("hash", "missing");
            then.status(404);
        });

        let client = client_for(&server);
        assert_eq!(client.export_torrent("ABC").await.unwrap(), b"d4:infode".to_vec());
        assert!(matches!(
            client.export_torrent("missing").await.unwrap_err(),
            TorrentClientError::TorrentNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_probe() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(200);
        });
        assert_eq!(client_for(&server).probe().await, Reachability::Reachable);

        let closed = QBittorrentClient::new(&descriptor("http://127.0.0.1:1")).unwrap();
        assert!(!closed.probe().await.is_reachable());
    }

    #[tokio::test]
    async fn test_connection_refused_is_connectivity_error() {
        let client = QBittorrentClient::new(&descriptor("http://127.0.0.1:1")).unwrap();
        let err = client.list_torrents(None).await.unwrap_err();
        assert!(err.is_connectivity());
    }
}
