//! Token manager: access/refresh token lifecycle
//!
//! - Single-flight refresh: concurrent callers share one refresh call
//! - `fetch_with_auth`: bearer requests, retried once after a 401
//! - Sign-in, sign-up and sign-out against the auth service

use crate::config::{paths, ClientConfig};
use crate::error::{AuthError, RefreshCause, StoreError};
use crate::store::{CredentialKey, TokenStore};
use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use url::Url;

/// Receives the redirect to the sign-in entry point after a failed refresh
pub trait Navigator: Send + Sync {
    fn redirect(&self, location: &str);
}

/// Navigator for headless use: logs the redirect
#[derive(Debug, Default)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn redirect(&self, location: &str) {
        tracing::warn!(location, "session expired, sign in again");
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Body returned by the login and refresh endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct SessionResponse {
    pub session: SessionTokens,
    /// Opaque identity record, stored verbatim
    pub user: Value,
}

#[derive(Debug, Deserialize)]
struct RegisterResponse {
    user: Value,
    #[serde(default)]
    session: Option<SessionTokens>,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    error: String,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Method, headers and body of an authenticated request.
///
/// Kept intact so the retry after a refresh sends the identical request.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::new(Method::GET)
    }
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `body` as JSON, setting `Content-Type` unless the caller did
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, serde_json::Error> {
        self.body = Some(serde_json::to_vec(body)?);
        self.headers
            .entry(CONTENT_TYPE)
            .or_insert(HeaderValue::from_static("application/json"));
        Ok(self)
    }
}

type PendingRefresh = Shared<BoxFuture<'static, Result<String, RefreshCause>>>;

/// Owns the stored credentials and the in-flight refresh.
///
/// Cheap to clone; clones share the same refresh state.
#[derive(Clone)]
pub struct TokenManager {
    inner: Arc<Inner>,
}

struct Inner {
    client: reqwest::Client,
    config: ClientConfig,
    refresh_url: Url,
    store: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    pending: Mutex<Option<PendingRefresh>>,
}

impl TokenManager {
    pub fn new(
        config: ClientConfig,
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, AuthError> {
        let client = config.http_client()?;
        Self::with_client(client, config, store, navigator)
    }

    pub fn with_client(
        client: reqwest::Client,
        config: ClientConfig,
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, AuthError> {
        let refresh_url = config.endpoint(paths::REFRESH)?;
        Ok(Self {
            inner: Arc::new(Inner {
                client,
                config,
                refresh_url,
                store,
                navigator,
                pending: Mutex::new(None),
            }),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.inner.client
    }

    pub fn access_token(&self) -> Result<Option<String>, StoreError> {
        self.inner.store.get(CredentialKey::AccessToken)
    }

    pub fn refresh_token(&self) -> Result<Option<String>, StoreError> {
        self.inner.store.get(CredentialKey::RefreshToken)
    }

    /// The stored identity record, if signed in
    pub fn user(&self) -> Result<Option<Value>, StoreError> {
        match self.inner.store.get(CredentialKey::User)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.pending_slot().is_some()
    }

    /// Exchange the stored refresh token for a new pair.
    ///
    /// Joins the in-flight refresh if there is one. On failure the stored
    /// credentials are wiped and the navigator is sent to the sign-in page.
    pub async fn refresh_access_token(&self) -> Result<String, AuthError> {
        let pending = {
            let mut slot = self.inner.pending_slot();
            match slot.as_ref() {
                Some(pending) => {
                    tracing::debug!("joining in-flight token refresh");
                    pending.clone()
                }
                None => {
                    let refresh_token = self
                        .inner
                        .store
                        .get(CredentialKey::RefreshToken)?
                        .ok_or(AuthError::MissingRefreshToken)?;
                    let pending = spawn_refresh(Arc::clone(&self.inner), refresh_token);
                    *slot = Some(pending.clone());
                    pending
                }
            }
        };

        pending.await.map_err(AuthError::RefreshFailed)
    }

    /// Send a request with the stored bearer token.
    ///
    /// `url` is absolute or relative to the configured base URL. A 401
    /// triggers one refresh and one retry; the retry's response is returned
    /// as-is, even if it is another 401.
    pub async fn fetch_with_auth(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<Response, AuthError> {
        let token = self.access_token()?.ok_or(AuthError::MissingAccessToken)?;
        let url = self.inner.config.endpoint(url)?;

        let response = self.send(&url, &options, &token).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::debug!(%url, "request unauthorized, refreshing token");
        let token = self.refresh_access_token().await?;
        self.send(&url, &options, &token).await
    }

    async fn send(
        &self,
        url: &Url,
        options: &RequestOptions,
        token: &str,
    ) -> Result<Response, AuthError> {
        let mut headers = options.headers.clone();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?);

        let mut request = self
            .inner
            .client
            .request(options.method.clone(), url.clone())
            .headers(headers);
        if let Some(body) = &options.body {
            request = request.body(body.clone());
        }
        Ok(request.send().await?)
    }

    /// Sign in with email and password, storing the returned session
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Value, AuthError> {
        require("email", email)?;
        require("password", password)?;

        let response = self
            .inner
            .client
            .post(self.inner.config.endpoint(paths::LOGIN)?)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;
        let session: SessionResponse = read_json(response).await?;

        self.inner.persist(&session.session, &session.user)?;
        tracing::info!("signed in");
        Ok(session.user)
    }

    /// Create an account. Stores the session when the service returns one.
    pub async fn sign_up(&self, name: &str, email: &str, password: &str) -> Result<Value, AuthError> {
        require("name", name)?;
        require("email", email)?;
        require("password", password)?;

        let response = self
            .inner
            .client
            .post(self.inner.config.endpoint(paths::REGISTER)?)
            .json(&serde_json::json!({ "name": name, "email": email, "password": password }))
            .send()
            .await?;
        let registered: RegisterResponse = read_json(response).await?;

        if let Some(session) = &registered.session {
            self.inner.persist(session, &registered.user)?;
        }
        tracing::info!(signed_in = registered.session.is_some(), "account created");
        Ok(registered.user)
    }

    /// Notify the auth service (best effort) and forget stored credentials
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(token) = self.access_token()? {
            let result = self
                .inner
                .client
                .post(self.inner.config.endpoint(paths::LOGOUT)?)
                .bearer_auth(&token)
                .send()
                .await;
            match result {
                Ok(r) if r.status().is_success() => {}
                Ok(r) => tracing::warn!(status = %r.status(), "logout rejected by auth service"),
                Err(e) => tracing::warn!(error = %e, "logout request failed"),
            }
        }

        self.inner.store.clear()?;
        tracing::info!("signed out");
        Ok(())
    }
}

impl Inner {
    fn pending_slot(&self) -> MutexGuard<'_, Option<PendingRefresh>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, session: &SessionTokens, user: &Value) -> Result<(), StoreError> {
        self.store
            .set(CredentialKey::AccessToken, &session.access_token)?;
        self.store
            .set(CredentialKey::RefreshToken, &session.refresh_token)?;
        self.store.set(CredentialKey::User, &user.to_string())
    }

    async fn exchange(&self, refresh_token: &str) -> Result<String, RefreshCause> {
        tracing::info!("refreshing access token");

        let response = self
            .client
            .post(self.refresh_url.clone())
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
            .map_err(|e| RefreshCause::Transport(Arc::new(e)))?;

        if !response.status().is_success() {
            return Err(RefreshCause::Rejected(response.status()));
        }

        let body: SessionResponse = response
            .json()
            .await
            .map_err(|e| RefreshCause::Malformed(Arc::new(e)))?;

        self.persist(&body.session, &body.user)
            .map_err(|e| RefreshCause::Store(Arc::new(e)))?;

        Ok(body.session.access_token)
    }

    fn fail_session(&self, cause: &RefreshCause) {
        tracing::warn!(error = %cause, "token refresh failed, clearing credentials");
        if let Err(e) = self.store.clear() {
            tracing::error!(error = %e, "failed to clear stored credentials");
        }
        self.navigator.redirect(&self.config.sign_in_path);
    }
}

/// Run the refresh on its own task so it completes even if every waiter
/// is dropped. The task clears the pending slot once it settles.
fn spawn_refresh(inner: Arc<Inner>, refresh_token: String) -> PendingRefresh {
    let task = tokio::spawn(async move {
        let outcome = inner.exchange(&refresh_token).await;
        if let Err(cause) = &outcome {
            inner.fail_session(cause);
        }
        *inner.pending_slot() = None;
        outcome
    });

    task.map(|joined| joined.unwrap_or(Err(RefreshCause::Interrupted)))
        .boxed()
        .shared()
}

fn require(field: &'static str, value: &str) -> Result<(), AuthError> {
    if value.trim().is_empty() {
        return Err(AuthError::MissingField(field));
    }
    Ok(())
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, AuthError> {
    let status = response.status();
    if !status.is_success() {
        return Err(AuthError::Rejected {
            status,
            message: error_message(response).await,
        });
    }
    Ok(response.json().await?)
}

/// The `{error}` message of a failed response, or the status reason
pub(crate) async fn error_message(response: Response) -> String {
    let status = response.status();
    match response.json::<ServiceError>().await {
        Ok(body) => body.error,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    }
}
