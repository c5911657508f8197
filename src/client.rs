use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::credentials::CredentialProvider;
use crate::error::{Error, RefreshError};
use crate::interaction::Interaction;
use crate::refresh::{RefreshCoordinator, TokenRefresher};
use crate::types::{AccessToken, RefreshToken, TokenPair};

/// Reason code that marks an unauthorized response as recoverable by refresh.
pub const TOKEN_EXPIRED_CODE: &str = "token.expired";

/// Replayable description of one API call.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    body: Option<serde_json::Value>,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Attach a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if `body` cannot be serialized.
    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, Error> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Body of an error response; only `code` drives behavior.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    #[serde(rename = "refreshToken")]
    refresh_token: &'a RefreshToken,
}

/// API client bound to the session's access token.
///
/// Unauthorized responses with the `token.expired` code are refreshed and
/// replayed transparently. Clones share the token, the cookie store and the
/// refresh queue.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    config: ClientConfig,
    credentials: CredentialProvider,
    interaction: Interaction,
    authorization: RwLock<Option<String>>,
    coordinator: RefreshCoordinator,
}

impl ApiClient {
    /// Create a client whose default `Authorization` header comes from the
    /// stored access token.
    #[must_use]
    pub fn new(
        config: ClientConfig,
        credentials: CredentialProvider,
        interaction: Interaction,
    ) -> Self {
        Self::with_http_client(reqwest::Client::new(), config, credentials, interaction)
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(
        http: reqwest::Client,
        config: ClientConfig,
        credentials: CredentialProvider,
        interaction: Interaction,
    ) -> Self {
        let coordinator = RefreshCoordinator::new(config.refresh_timeout());
        let authorization = RwLock::new(credentials.authorization());
        Self {
            inner: Arc::new(ClientInner {
                http,
                config,
                credentials,
                interaction,
                authorization,
                coordinator,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn credentials(&self) -> &CredentialProvider {
        &self.inner.credentials
    }

    #[must_use]
    pub fn interaction(&self) -> &Interaction {
        &self.inner.interaction
    }

    #[must_use]
    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.inner.coordinator
    }

    /// Current default `Authorization` header value.
    #[must_use]
    pub fn authorization(&self) -> Option<String> {
        self.inner.authorization.read().clone()
    }

    pub(crate) fn set_access_token(&self, token: &AccessToken) {
        self.inner.set_access_token(token);
    }

    /// Clear the session cookies and header, then go to the sign-in page.
    ///
    /// Works without any session context, so it is safe to call from
    /// anywhere that holds a client.
    pub fn sign_out(&self) {
        self.inner.sign_out();
    }

    /// Send a request, refreshing and replaying it once if the token expired.
    ///
    /// # Errors
    ///
    /// - [`Error::Http`] on network failure
    /// - [`Error::Status`] for non-auth error responses
    /// - [`Error::Refresh`] if the token expired and the refresh failed
    /// - [`Error::Unauthorized`] for other 401s with an interactive user (after sign-out)
    /// - [`Error::AuthTokenInvalid`] for other 401s on a server-rendered page
    pub async fn send(&self, request: ApiRequest) -> Result<Response, Error> {
        let authorization = self.authorization();
        let response = self.dispatch(&request, authorization.as_deref()).await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }
        if status != StatusCode::UNAUTHORIZED {
            return Err(status_error("api request", response).await);
        }

        let ErrorBody { code } = error_body(response).await;
        if code.as_deref() == Some(TOKEN_EXPIRED_CODE) {
            // A refresh settled while this request was in flight.
            let current = self.authorization();
            if let Some(current) = current.filter(|c| authorization.as_ref() != Some(c)) {
                tracing::debug!(path = %request.path, "Token rotated in flight, replaying");
                return self.replay(&request, &current).await;
            }
            tracing::debug!(path = %request.path, "Access token expired");
            let token = self.inner.coordinator.acquire(self.inner.clone()).await?;
            return self.replay(&request, &token.bearer()).await;
        }

        Err(self.inner.reject_unauthorized(code))
    }

    /// `GET` a JSON resource.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send); also [`Error::Http`] if the body is not valid JSON for `T`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let response = self.send(ApiRequest::get(path)).await?;
        response.json::<T>().await.map_err(Into::into)
    }

    /// `POST` a JSON body and decode the JSON response.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(ApiRequest::post(path).with_json(body)?).await?;
        response.json::<T>().await.map_err(Into::into)
    }

    /// Send without the auth interceptor. Used for endpoints that establish
    /// credentials rather than consume them.
    pub(crate) async fn send_public(&self, request: &ApiRequest) -> Result<Response, Error> {
        self.dispatch(request, None).await
    }

    async fn replay(&self, request: &ApiRequest, authorization: &str) -> Result<Response, Error> {
        let response = self.dispatch(request, Some(authorization)).await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            let ErrorBody { code } = error_body(response).await;
            tracing::warn!(path = %request.path, "Replayed request still unauthorized");
            return Err(self.inner.reject_unauthorized(code));
        }
        Err(status_error("api request", response).await)
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        authorization: Option<&str>,
    ) -> Result<Response, Error> {
        let url = self.inner.config.endpoint(&request.path)?;
        let mut builder = self.inner.http.request(request.method.clone(), url);
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        Ok(builder.send().await?)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.config.base_url().as_str())
            .field("interaction", &self.inner.interaction)
            .field("coordinator", &self.inner.coordinator)
            .finish_non_exhaustive()
    }
}

impl ClientInner {
    fn set_access_token(&self, token: &AccessToken) {
        *self.authorization.write() = Some(token.bearer());
    }

    fn sign_out(&self) {
        self.credentials.clear();
        *self.authorization.write() = None;
        tracing::info!("Signed out");
        self.interaction.navigate(self.config.sign_in_page());
    }

    /// Outcome of an unauthorized response that refresh cannot fix.
    fn reject_unauthorized(&self, code: Option<String>) -> Error {
        match self.interaction {
            Interaction::Interactive(_) => {
                tracing::warn!(code = ?code, "Unauthorized, ending session");
                self.sign_out();
                Error::Unauthorized { code }
            }
            Interaction::ServerRendered => {
                tracing::debug!(code = ?code, "Unauthorized during server render");
                Error::AuthTokenInvalid
            }
        }
    }
}

impl TokenRefresher for ClientInner {
    async fn refresh(&self) -> Result<AccessToken, RefreshError> {
        // Re-read: another client sharing the cookie store may have rotated it.
        let refresh_token = self.credentials.load().refresh_token;
        if refresh_token.is_empty() {
            return Err(RefreshError::MissingRefreshToken);
        }

        let url = self
            .config
            .endpoint(&self.config.refresh_path)
            .map_err(|e| RefreshError::Transport(e.to_string()))?;
        let mut builder = self.http.post(url).json(&RefreshRequest {
            refresh_token: &refresh_token,
        });
        // The API identifies the session from the expired bearer as well.
        if let Some(value) = self.authorization.read().clone() {
            builder = builder.header(AUTHORIZATION, value);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| RefreshError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let ErrorBody { code } = error_body(response).await;
            return Err(RefreshError::Rejected {
                status: status.as_u16(),
                code,
            });
        }

        let tokens: TokenPair = response
            .json()
            .await
            .map_err(|e| RefreshError::Decode(e.to_string()))?;

        self.credentials.store(&tokens);
        self.set_access_token(&tokens.access_token);
        Ok(tokens.access_token)
    }

    fn refresh_failed(&self, _error: &RefreshError) {
        if self.interaction.is_interactive() {
            self.sign_out();
        }
    }
}

async fn error_body(response: Response) -> ErrorBody {
    response.json::<ErrorBody>().await.unwrap_or_default()
}

pub(crate) async fn status_error(operation: &'static str, response: Response) -> Error {
    let status = response.status().as_u16();
    let detail = response.text().await.unwrap_or_default();
    Error::Status {
        operation,
        status,
        detail,
    }
}
