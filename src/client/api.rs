//! Fetch wrapper for backend calls
//!
//! Resolves endpoints against the configured base URL, attaches the session
//! token as a Bearer header, and folds every outcome (success, HTTP error,
//! transport failure) into an [`ApiResponse`]. Nothing here returns `Err`.

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::token_store::TokenStore;

/// Fallback message for rejected requests without a server message
const GENERIC_ERROR: &str = "An error occurred";

/// Message for response bodies that do not match the expected type
const UNEXPECTED_FORMAT: &str = "Unexpected response format";

/// Status reported when no response was received at all
pub const NETWORK_ERROR_STATUS: u16 = 0;

/// Response body parsed by content type
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
}

/// Result of an API call; errors are carried as data
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    pub error: Option<String>,
    /// HTTP status, or [`NETWORK_ERROR_STATUS`] on transport failure
    pub status: u16,
}

impl<T> ApiResponse<T> {
    fn failure(error: impl Into<String>, status: u16) -> Self {
        Self {
            data: None,
            error: Some(error.into()),
            status,
        }
    }

    /// Check if the call reached the server and was accepted
    pub fn is_success(&self) -> bool {
        self.error.is_none() && (200..300).contains(&self.status)
    }

    /// Check if no response reached the client
    pub fn is_network_error(&self) -> bool {
        self.status == NETWORK_ERROR_STATUS
    }
}

impl ApiResponse<Payload> {
    /// Deserialize the payload into `T`, keeping status and error
    pub fn into_typed<T: DeserializeOwned>(self) -> ApiResponse<T> {
        let value = match self.data {
            None => {
                return ApiResponse {
                    data: None,
                    error: self.error,
                    status: self.status,
                };
            }
            Some(Payload::Json(value)) => value,
            Some(Payload::Text(text)) => Value::String(text),
        };

        match serde_json::from_value(value) {
            Ok(data) => ApiResponse {
                data: Some(data),
                error: self.error,
                status: self.status,
            },
            Err(e) => {
                tracing::warn!("Response body did not match expected type: {}", e);
                ApiResponse::failure(UNEXPECTED_FORMAT, self.status)
            }
        }
    }
}

/// Per-request options
#[derive(Debug, Clone)]
pub struct ApiOptions {
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Attach the stored session token (default true)
    pub requires_auth: bool,
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: Vec::new(),
            body: None,
            requires_auth: true,
        }
    }
}

impl ApiOptions {
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Send without the session token (credentials authorize the call instead)
    pub fn without_auth(mut self) -> Self {
        self.requires_auth = false;
        self
    }
}

/// HTTP client for the backend API
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: TokenStore,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, tokens: TokenStore) -> Self {
        Self::with_http_client(reqwest::Client::new(), base_url, tokens)
    }

    pub fn with_http_client(
        http: reqwest::Client,
        base_url: impl Into<String>,
        tokens: TokenStore,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            tokens,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URLs pass through, anything else is appended to the base URL
    pub fn resolve(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http") {
            endpoint.to_string()
        } else {
            format!("{}{}", self.base_url, endpoint)
        }
    }

    fn build_headers(&self, options: &ApiOptions) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        for (name, value) in &options.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => tracing::warn!("Skipping invalid header: {}", name),
            }
        }

        if options.requires_auth {
            match self.tokens.token() {
                Ok(Some(token)) => match HeaderValue::from_str(&format!("Bearer {token}")) {
                    Ok(value) => {
                        headers.insert(AUTHORIZATION, value);
                    }
                    Err(_) => tracing::warn!("Stored token is not a valid header value"),
                },
                // No session: the server answers 401 and the caller handles it
                Ok(None) => {}
                Err(e) => tracing::warn!("Could not read session token: {}", e),
            }
        }

        headers
    }

    /// Perform a request and normalize the outcome
    pub async fn request(&self, endpoint: &str, options: ApiOptions) -> ApiResponse<Payload> {
        let url = self.resolve(endpoint);
        let headers = self.build_headers(&options);

        let mut request = self.http.request(options.method.clone(), &url).headers(headers);
        if let Some(body) = &options.body {
            match serde_json::to_vec(body) {
                Ok(bytes) => request = request.body(bytes),
                Err(e) => return ApiResponse::failure(e.to_string(), NETWORK_ERROR_STATUS),
            }
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("{} {} failed: {}", options.method, url, e);
                return ApiResponse::failure(e.to_string(), NETWORK_ERROR_STATUS);
            }
        };

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let data = if content_type.contains("application/json") {
            response.json::<Value>().await.ok().map(Payload::Json)
        } else if content_type.contains("text/") {
            response.text().await.ok().map(Payload::Text)
        } else {
            None
        };

        if !status.is_success() {
            tracing::debug!("{} {} rejected with {}", options.method, url, status);
            let message = match &data {
                Some(Payload::Json(Value::Object(map))) => map
                    .get("message")
                    .and_then(Value::as_str)
                    .filter(|m| !m.is_empty())
                    .unwrap_or(GENERIC_ERROR)
                    .to_string(),
                _ => GENERIC_ERROR.to_string(),
            };
            return ApiResponse::failure(message, status.as_u16());
        }

        ApiResponse {
            data,
            error: None,
            status: status.as_u16(),
        }
    }

    /// Request with a JSON body, deserializing the response into `T`
    pub async fn send_json<T, B>(
        &self,
        endpoint: &str,
        body: Option<&B>,
        options: ApiOptions,
    ) -> ApiResponse<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let options = match body.map(serde_json::to_value).transpose() {
            Ok(Some(value)) => options.body(value),
            Ok(None) => options,
            Err(e) => return ApiResponse::failure(e.to_string(), NETWORK_ERROR_STATUS),
        };
        self.request(endpoint, options).await.into_typed()
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str, options: ApiOptions) -> ApiResponse<T> {
        self.send_json::<T, Value>(endpoint, None, options.method(Method::GET))
            .await
    }

    pub async fn post<T, B>(&self, endpoint: &str, body: &B, options: ApiOptions) -> ApiResponse<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(endpoint, Some(body), options.method(Method::POST))
            .await
    }

    pub async fn put<T, B>(&self, endpoint: &str, body: &B, options: ApiOptions) -> ApiResponse<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(endpoint, Some(body), options.method(Method::PUT))
            .await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: ApiOptions,
    ) -> ApiResponse<T> {
        self.send_json::<T, Value>(endpoint, None, options.method(Method::DELETE))
            .await
    }
}


#[cfg(test)]
mod tests {
    use super::test_backend::*;
    use super::*;
    use crate::client::token_store::User;
    use crate::client::token_store::test_support::memory_backends;
    use axum::{
        Json, Router,
        http::{HeaderMap as AxumHeaders, StatusCode},
        routing::{get, post},
    };
    use serde::Deserialize;
    use serde_json::json;

    async fn echo_headers(headers: AxumHeaders) -> Json<Value> {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        Json(json!({
            "authorization": get("authorization"),
            "content_type": get("content-type"),
            "x_trace": get("x-trace"),
        }))
    }

    fn stub_router() -> Router {
        Router::new()
            .route("/api/echo", get(echo_headers).post(echo_headers))
            .route("/api/body", post(|Json(body): Json<Value>| async move { Json(body) }))
            .route("/api/text", get(|| async { "plain text" }))
            .route("/api/empty", get(|| async { StatusCode::NO_CONTENT }))
            .route(
                "/api/bytes",
                get(|| async { ([("content-type", "application/octet-stream")], vec![1u8, 2, 3]) }),
            )
            .route(
                "/api/reject",
                get(|| async {
                    (
                        StatusCode::UNAUTHORIZED,
                        Json(json!({ "message": "Invalid credentials" })),
                    )
                }),
            )
            .route(
                "/api/reject-plain",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            )
    }

    #[derive(Debug, Deserialize)]
    struct Echo {
        authorization: Option<String>,
        content_type: Option<String>,
        x_trace: Option<String>,
    }

    fn alice() -> User {
        User {
            id: 1,
            username: "alice".to_string(),
        }
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let backends = memory_backends();
        let client = ApiClient::new("/api", backends.store);

        assert_eq!(client.resolve("/auth/login"), "/api/auth/login");
        assert_eq!(
            client.resolve("https://example.com/x"),
            "https://example.com/x"
        );
    }

    #[tokio::test]
    async fn test_attaches_bearer_token_when_present() {
        let base = spawn_backend(stub_router()).await;
        let backends = memory_backends();
        backends.store.save("abc.def.ghi", &alice()).unwrap();
        let client = ApiClient::new(base, backends.store);

        let response: ApiResponse<Echo> = client.get("/echo", ApiOptions::default()).await;

        assert!(response.is_success());
        let echo = response.data.unwrap();
        assert_eq!(echo.authorization.as_deref(), Some("Bearer abc.def.ghi"));
        assert_eq!(echo.content_type.as_deref(), Some("application/json"));
    }

    #[tokio::test]
    async fn test_without_auth_omits_token() {
        let base = spawn_backend(stub_router()).await;
        let backends = memory_backends();
        backends.store.save("abc.def.ghi", &alice()).unwrap();
        let client = ApiClient::new(base, backends.store);

        let response: ApiResponse<Echo> = client
            .get("/echo", ApiOptions::default().without_auth())
            .await;

        assert_eq!(response.data.unwrap().authorization, None);
    }

    #[tokio::test]
    async fn test_missing_token_still_sends() {
        let base = spawn_backend(stub_router()).await;
        let client = ApiClient::new(base, memory_backends().store);

        let response: ApiResponse<Echo> = client.get("/echo", ApiOptions::default()).await;

        assert_eq!(response.status, 200);
        assert_eq!(response.data.unwrap().authorization, None);
    }

    #[tokio::test]
    async fn test_caller_headers_are_sent() {
        let base = spawn_backend(stub_router()).await;
        let client = ApiClient::new(base, memory_backends().store);

        let response: ApiResponse<Echo> = client
            .get("/echo", ApiOptions::default().header("X-Trace", "t-1"))
            .await;

        assert_eq!(response.data.unwrap().x_trace.as_deref(), Some("t-1"));
    }

    #[tokio::test]
    async fn test_post_json_body() {
        let base = spawn_backend(stub_router()).await;
        let client = ApiClient::new(base, memory_backends().store);

        let response: ApiResponse<Value> = client
            .post(
                "/body",
                &json!({ "username": "alice", "password": "pw" }),
                ApiOptions::default(),
            )
            .await;

        assert_eq!(response.data.unwrap()["username"], "alice");
    }

    #[tokio::test]
    async fn test_text_body_parsed_as_text() {
        let base = spawn_backend(stub_router()).await;
        let client = ApiClient::new(base, memory_backends().store);

        let response = client.request("/text", ApiOptions::default()).await;

        assert_eq!(response.data, Some(Payload::Text("plain text".to_string())));
        assert_eq!(response.error, None);
    }

    #[tokio::test]
    async fn test_unknown_content_type_is_absent() {
        let base = spawn_backend(stub_router()).await;
        let client = ApiClient::new(base, memory_backends().store);

        let bytes = client.request("/bytes", ApiOptions::default()).await;
        assert_eq!(bytes.data, None);
        assert!(bytes.is_success());

        let empty = client.request("/empty", ApiOptions::default()).await;
        assert_eq!(empty.data, None);
        assert_eq!(empty.status, 204);
    }

    #[tokio::test]
    async fn test_rejection_uses_server_message() {
        let base = spawn_backend(stub_router()).await;
        let client = ApiClient::new(base, memory_backends().store);

        let response = client.request("/reject", ApiOptions::default()).await;

        assert_eq!(response.data, None);
        assert_eq!(response.error.as_deref(), Some("Invalid credentials"));
        assert_eq!(response.status, 401);
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn test_rejection_without_message_is_generic() {
        let base = spawn_backend(stub_router()).await;
        let client = ApiClient::new(base, memory_backends().store);

        let response = client.request("/reject-plain", ApiOptions::default()).await;

        assert_eq!(response.data, None);
        assert_eq!(response.error.as_deref(), Some("An error occurred"));
        assert_eq!(response.status, 500);
    }

    #[tokio::test]
    async fn test_network_failure_is_status_zero() {
        let client = ApiClient::new(unreachable_backend(), memory_backends().store);

        let response = client.request("/echo", ApiOptions::default()).await;

        assert_eq!(response.data, None);
        assert!(response.error.is_some());
        assert_eq!(response.status, 0);
        assert!(response.is_network_error());
    }

    #[tokio::test]
    async fn test_mismatched_body_is_unexpected_format() {
        #[derive(Debug, Deserialize)]
        struct NeedsToken {
            #[allow(dead_code)]
            access_token: String,
        }

        let base = spawn_backend(stub_router()).await;
        let client = ApiClient::new(base, memory_backends().store);

        let response: ApiResponse<NeedsToken> = client.get("/echo", ApiOptions::default()).await;

        assert!(response.data.is_none());
        assert_eq!(response.error.as_deref(), Some("Unexpected response format"));
        assert_eq!(response.status, 200);
    }
}
