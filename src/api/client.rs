//! Authenticated JSON-over-HTTP client.
//!
//! Wraps [`reqwest`] with the conventions every backend call shares:
//! a bearer token on each request, 401/403 triggering re-authentication,
//! and non-2xx answers mapped to [`BoardError`].

use crate::{
    api::TokenProvider,
    config::ClientConfig,
    error::{BoardError, Result},
};
use reqwest::{header, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    scopes: Vec<String>,
    tokens: Arc<dyn TokenProvider>,
}

impl ApiClient {
    /// Builds a client for `config.api_base_url` with the configured timeout
    pub fn new(config: &ClientConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| BoardError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(http, config, tokens))
    }

    /// Reuses an existing [`reqwest::Client`] (shared connection pool)
    pub fn with_client(
        http: reqwest::Client,
        config: &ClientConfig,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            scopes: config.api_scope.iter().cloned().collect(),
            tokens,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path such as `/api/boards`
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(self.request(Method::GET, path).await?).await?;
        Ok(response.json::<T>().await?)
    }

    pub async fn get_json_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let builder = self.request(Method::GET, path).await?.query(query);
        let response = self.send(builder).await?;
        Ok(response.json::<T>().await?)
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::POST, path).await?.json(body);
        let response = self.send(builder).await?;
        Ok(response.json::<T>().await?)
    }

    /// `PATCH` whose response body is ignored
    pub async fn patch<B>(&self, path: &str, body: &B) -> Result<()>
    where
        B: Serialize + ?Sized + Sync,
    {
        let builder = self.request(Method::PATCH, path).await?.json(body);
        self.send(builder).await?;
        Ok(())
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send(self.request(Method::DELETE, path).await?).await?;
        Ok(())
    }

    async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let token = self.tokens.access_token(&self.scopes).await?;
        Ok(self
            .http
            .request(method, self.url(path))
            .header(header::CONTENT_TYPE, "application/json")
            .bearer_auth(token))
    }

    /// Sends the request and maps the status to an error where needed.
    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await?;
        let status = response.status().as_u16();

        if status == 401 || status == 403 {
            tracing::warn!(status, url = %response.url(), "request rejected; re-authenticating");
            if let Err(err) = self.tokens.reauthenticate().await {
                tracing::warn!(error = %err, "re-authentication failed");
            }
            return Err(BoardError::Unauthorized { status });
        }
        if !response.status().is_success() {
            tracing::debug!(status, url = %response.url(), "request failed");
            return Err(BoardError::RequestFailed { status });
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::StaticToken;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    #[derive(Default)]
    struct CountingTokens {
        issued: AtomicUsize,
        reauthenticated: AtomicUsize,
    }

    #[async_trait]
    impl TokenProvider for CountingTokens {
        async fn access_token(&self, _scopes: &[String]) -> Result<String> {
            self.issued.fetch_add(1, Ordering::SeqCst);
            Ok("t0k3n".to_string())
        }

        async fn reauthenticate(&self) -> Result<()> {
            self.reauthenticated.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Answers a single request with `status_line` and an optional JSON body
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "{status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}")
    }

    fn counting_client(base: &str) -> (ApiClient, Arc<CountingTokens>) {
        let tokens = Arc::new(CountingTokens::default());
        let config = ClientConfig {
            api_base_url: base.to_string(),
            ..ClientConfig::default()
        };
        let client = ApiClient::new(&config, tokens.clone()).unwrap();
        (client, tokens)
    }

    fn client(base: &str) -> ApiClient {
        let config = ClientConfig {
            api_base_url: base.to_string(),
            api_scope: Some("api://pulseboard/.default".to_string()),
            ..ClientConfig::default()
        };
        ApiClient::new(&config, Arc::new(StaticToken::new("t0k3n"))).unwrap()
    }

    #[test]
    fn test_url_joining() {
        let client = client("http://localhost:8000/");
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(client.url("/api/boards"), "http://localhost:8000/api/boards");
        assert_eq!(client.url("api/cards"), "http://localhost:8000/api/cards");
    }

    #[test]
    fn test_scopes_from_config() {
        let client = client("http://localhost:8000");
        assert_eq!(client.scopes, vec!["api://pulseboard/.default".to_string()]);
    }

    #[tokio::test]
    async fn test_request_carries_bearer_token() {
        let client = client("http://localhost:8000");
        let request = client
            .request(Method::DELETE, "/api/cards/t1")
            .await
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(request.method(), Method::DELETE);
        assert_eq!(request.url().as_str(), "http://localhost:8000/api/cards/t1");
        assert_eq!(
            request.headers()[header::AUTHORIZATION].to_str().unwrap(),
            "Bearer t0k3n"
        );
        assert_eq!(
            request.headers()[header::CONTENT_TYPE].to_str().unwrap(),
            "application/json"
        );
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        // port 9 (discard) is closed on test machines
        let client = client("http://127.0.0.1:9");
        let err = client.delete("/api/cards/t1").await.unwrap_err();
        assert!(matches!(err, BoardError::Network(_)));
    }

    #[tokio::test]
    async fn test_unauthorized_triggers_reauthentication() {
        let cases = [
            ("HTTP/1.1 401 Unauthorized", 401),
            ("HTTP/1.1 403 Forbidden", 403),
        ];
        for (status_line, status) in cases {
            let base = serve_once(status_line, "").await;
            let (client, tokens) = counting_client(&base);

            let err = client.delete("/api/cards/t1").await.unwrap_err();
            assert_eq!(err, BoardError::Unauthorized { status });
            assert_eq!(err.to_string(), "unauthorized_or_forbidden");
            assert_eq!(tokens.reauthenticated.load(Ordering::SeqCst), 1);
            assert_eq!(tokens.issued.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn test_server_error_maps_to_request_failed() {
        let base = serve_once("HTTP/1.1 500 Internal Server Error", "").await;
        let (client, tokens) = counting_client(&base);

        let err = client
            .get_json::<serde_json::Value>("/api/boards")
            .await
            .unwrap_err();
        assert_eq!(err, BoardError::RequestFailed { status: 500 });
        assert_eq!(err.to_string(), "request_failed_500");
        assert_eq!(tokens.reauthenticated.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_success_decodes_body() {
        let base = serve_once("HTTP/1.1 200 OK", r#"{"items": [], "total": 0}"#).await;
        let (client, tokens) = counting_client(&base);

        let body: serde_json::Value = client.get_json("/api/boards").await.unwrap();
        assert_eq!(body["total"], 0);
        assert_eq!(tokens.reauthenticated.load(Ordering::SeqCst), 0);
    }
}
