use crate::api::config::ApiEndpointConfig;
use crate::error::{ApiError, TransportError};
use crate::model::{Delivery, DeviceIdentifier, Location, Token, UserInfo};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default resident API base.
pub const DEFAULT_BASE_URL: &str = "https://resident-api.luxerone.com/resident_api/v2";

/// Scheme used in the `Authorization` header.
const AUTH_SCHEME: &str = "LuxerOneApi";

/// Value of the `error` field that marks a rejected token.
const AUTHORIZATION_REQUIRED: &str = "ApiAuthorizationRequired";

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Error bodies longer than this are cut before landing in an error message.
const MAX_ERROR_BODY: usize = 512;

/// HTTP client for the Luxer One resident API.
///
/// Cloning is cheap and clones share one connection pool.
#[derive(Debug, Clone)]
pub struct LuxerClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<Token>,
}

impl LuxerClient {
    pub fn new(config: &ApiEndpointConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("luxer-core/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(TransportError::Network)?;

        Ok(Self::with_http_client(http, &config.base_url))
    }

    pub fn with_http_client(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Same connection pool, with `token` attached to every request.
    pub fn with_token(mut self, token: Token) -> Self {
        self.token = Some(token);
        self
    }

    /// Same connection pool, without any token.
    pub fn anonymous(&self) -> Self {
        Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            token: None,
        }
    }

    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    pub(crate) fn set_token(&mut self, token: Option<Token>) {
        self.token = token;
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn headers(&self) -> Result<HeaderMap, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = &self.token {
            let value = HeaderValue::from_str(&format!("{} {}", AUTH_SCHEME, token.as_str()))?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Execute one request and return the parsed JSON body.
    ///
    /// A body carrying `{"error": "ApiAuthorizationRequired"}` yields
    /// [`ApiError::Authorization`] whatever the HTTP status.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        query: &[(&str, &str)],
    ) -> Result<serde_json::Value, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("{} {}", method, url);

        let mut request = self
            .http
            .request(method.clone(), &url)
            .headers(self.headers()?);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let resp = request.send().await.map_err(TransportError::Network)?;
        let status = resp.status();
        let bytes = resp.bytes().await.map_err(TransportError::Network)?;

        let json = match serde_json::from_slice::<serde_json::Value>(&bytes) {
            Ok(json) => json,
            Err(e) if status.is_success() => return Err(TransportError::Decode(e).into()),
            Err(_) => {
                return Err(TransportError::Status {
                    status: status.as_u16(),
                    body: truncate_body(&String::from_utf8_lossy(&bytes)),
                }
                .into());
            }
        };

        if is_authorization_rejection(&json) {
            tracing::warn!("{} {} rejected the API token ({})", method, path, status);
            return Err(ApiError::Authorization);
        }

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: truncate_body(&json.to_string()),
            }
            .into());
        }

        Ok(json)
    }

    /// Execute and validate the body into `T` in one step.
    pub async fn execute_as<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &'static str,
        body: Option<&serde_json::Value>,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let json = self.execute(method, endpoint, body, query).await?;
        serde_json::from_value(json)
            .map_err(|source| TransportError::Shape { endpoint, source }.into())
    }

    async fn get_as<T: DeserializeOwned>(&self, endpoint: &'static str) -> Result<T, ApiError> {
        self.execute_as(Method::GET, endpoint, None, &[]).await
    }

    async fn post_as<B: Serialize, T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body).map_err(TransportError::Encode)?;
        self.execute_as(Method::POST, endpoint, Some(&body), &[]).await
    }

    /// Ask the service to e-mail a one-time code. `true` when acknowledged.
    pub async fn request_code(&self, email: &str) -> Result<bool, ApiError> {
        let resp: StatusResponse = self
            .post_as("/auth/loginUsingEmail", &LoginRequest { email })
            .await?;
        Ok(resp.status.as_deref() == Some("OK"))
    }

    /// Exchange a one-time code for an API token.
    pub async fn verify_code(
        &self,
        email: &str,
        code: &str,
        device: &DeviceIdentifier,
    ) -> Result<Token, ApiError> {
        let resp: TokenResponse = self
            .post_as(
                "/auth/verifyOtpUsingEmail",
                &VerifyRequest {
                    email,
                    uuid: device.as_str(),
                    otp: code,
                    r#as: "token",
                },
            )
            .await?;

        if resp.token.is_empty() {
            return Err(TransportError::Shape {
                endpoint: "/auth/verifyOtpUsingEmail",
                source: <serde_json::Error as serde::de::Error>::custom("empty token"),
            }
            .into());
        }
        Ok(resp.token)
    }

    /// Revoke `token` server side. The response body is ignored.
    pub async fn logout(&self, token: &Token) -> Result<(), ApiError> {
        let body = serde_json::json!({ "revoke": token.as_str() });
        self.execute(Method::POST, "/auth/logout", Some(&body), &[])
            .await
            .map(|_| ())
    }

    pub async fn user_info(&self) -> Result<UserInfo, ApiError> {
        self.get_as("/user/info").await
    }

    pub async fn locations(&self) -> Result<Vec<Location>, ApiError> {
        let resp: LocationsResponse = self.get_as("/locations/list").await?;
        Ok(resp.locations)
    }

    pub async fn pending_deliveries(&self) -> Result<Vec<Delivery>, ApiError> {
        let resp: DeliveriesResponse = self.get_as("/deliveries/pendings").await?;
        Ok(resp.deliveries)
    }
}

fn is_authorization_rejection(json: &serde_json::Value) -> bool {
    json.get("error").and_then(serde_json::Value::as_str) == Some(AUTHORIZATION_REQUIRED)
}

fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    email: &'a str,
    uuid: &'a str,
    otp: &'a str,
    r#as: &'a str,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Token,
}

#[derive(Debug, Deserialize)]
struct LocationsResponse {
    #[serde(default)]
    locations: Vec<Location>,
}

#[derive(Debug, Deserialize)]
struct DeliveriesResponse {
    #[serde(default)]
    deliveries: Vec<Delivery>,
}
