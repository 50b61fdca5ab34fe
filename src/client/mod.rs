//! In-process API client with automatic session renewal.
//!
//! `Session` wraps any `tower::Service` transport (an `axum::Router` in
//! tests, a connector in deployments) and mirrors what a browser frontend
//! does: it keeps the session cookies in a jar, tracks the current user,
//! and on a 401 renews the access credential through the refresh endpoint
//! before replaying the failed call exactly once. Concurrent 401s share a
//! single in-flight refresh.

mod cookies;

use std::fmt::Display;
use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    body::{Body, Bytes},
    http::{Method, Request, Response, StatusCode, header},
};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde::de::DeserializeOwned;
use tower::{Service, ServiceExt};

use crate::api::Profile;

pub use cookies::CookieJar;

/// Errors surfaced by the client.
#[derive(Debug, Clone)]
pub enum ClientError {
    /// Session renewal failed; the caller must re-authenticate.
    Unauthenticated,
    /// The server answered with a non-success status.
    Api { status: u16, message: String },
    /// The transport failed or produced an unusable response.
    Transport(String),
}

impl Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Unauthenticated => write!(f, "Not authenticated"),
            ClientError::Api { status, message } => write!(f, "API error {}: {}", status, message),
            ClientError::Transport(msg) => write!(f, "Transport error: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {}

type RefreshFuture = Shared<BoxFuture<'static, Result<(), ClientError>>>;

/// An outgoing API call, buffered so it can be replayed after a refresh.
#[derive(Clone)]
struct ApiRequest {
    method: Method,
    path: &'static str,
    body: Option<serde_json::Value>,
}

impl ApiRequest {
    fn get(path: &'static str) -> Self {
        Self {
            method: Method::GET,
            path,
            body: None,
        }
    }

    fn post(path: &'static str) -> Self {
        Self {
            method: Method::POST,
            path,
            body: None,
        }
    }

    fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// A buffered API response.
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl ApiResponse {
    fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| ClientError::Transport(format!("Invalid response body: {}", e)))
    }

    /// The server's `{"message": ...}` payload, or the status line if the
    /// body is not in that shape.
    fn message(&self) -> String {
        #[derive(serde::Deserialize)]
        struct MessageBody {
            message: String,
        }
        self.json::<MessageBody>()
            .map(|b| b.message)
            .unwrap_or_else(|_| self.status.to_string())
    }

    fn into_result(self) -> Result<ApiResponse, ClientError> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(ClientError::Api {
                status: self.status.as_u16(),
                message: self.message(),
            })
        }
    }
}

struct SessionInner<S> {
    service: S,
    jar: CookieJar,
    user: Mutex<Option<Profile>>,
    pending_refresh: tokio::sync::Mutex<Option<RefreshFuture>>,
}

/// A client session over some HTTP transport.
pub struct Session<S> {
    inner: Arc<SessionInner<S>>,
}

impl<S> Clone for Session<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> Session<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + Sync + 'static,
    S::Error: Display + Send,
    S::Future: Send,
{
    pub fn new(service: S) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                service,
                jar: CookieJar::new(),
                user: Mutex::new(None),
                pending_refresh: tokio::sync::Mutex::new(None),
            }),
        }
    }

    /// The session's cookie jar.
    pub fn jar(&self) -> &CookieJar {
        &self.inner.jar
    }

    /// The last profile returned by the server, if any.
    pub fn current_user(&self) -> Option<Profile> {
        self.lock_user().clone()
    }

    fn lock_user(&self) -> std::sync::MutexGuard<'_, Option<Profile>> {
        self.inner
            .user
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Create an account and open a session.
    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Profile, ClientError> {
        let response = self
            .request(ApiRequest::post("/auth/signup").json(serde_json::json!({
                "name": name,
                "email": email,
                "password": password,
            })))
            .await?
            .into_result()?;

        let profile: Profile = response.json()?;
        *self.lock_user() = Some(profile.clone());
        Ok(profile)
    }

    /// Authenticate and open a session.
    pub async fn login(&self, email: &str, password: &str) -> Result<Profile, ClientError> {
        let response = self
            .request(ApiRequest::post("/auth/login").json(serde_json::json!({
                "email": email,
                "password": password,
            })))
            .await?
            .into_result()?;

        let profile: Profile = response.json()?;
        *self.lock_user() = Some(profile.clone());
        Ok(profile)
    }

    /// End the session. Local state is cleared even if the server call
    /// fails.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let result = self.request(ApiRequest::post("/auth/logout")).await;

        *self.lock_user() = None;
        self.inner.jar.clear();

        result?.into_result()?;
        Ok(())
    }

    /// Fetch the authenticated user's profile.
    pub async fn fetch_profile(&self) -> Result<Profile, ClientError> {
        let response = self
            .request(ApiRequest::get("/auth/profile"))
            .await?
            .into_result()?;

        let profile: Profile = response.json()?;
        *self.lock_user() = Some(profile.clone());
        Ok(profile)
    }

    /// Send one request. On a 401, renew the session (joining an in-flight
    /// renewal if one exists) and replay the call exactly once; the replay's
    /// outcome is returned as-is, so a second 401 is not retried.
    async fn request(&self, req: ApiRequest) -> Result<ApiResponse, ClientError> {
        let response = self.dispatch(&req).await?;
        if response.status != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        self.refresh().await?;
        self.dispatch(&req).await
    }

    /// Renew the access credential through the refresh endpoint, sharing a
    /// single in-flight call across concurrent 401s. On failure the local
    /// session state is cleared before the error propagates.
    async fn refresh(&self) -> Result<(), ClientError> {
        let (future, started_here) = {
            let mut pending = self.inner.pending_refresh.lock().await;
            match pending.as_ref() {
                Some(future) => (future.clone(), false),
                None => {
                    let session = self.clone();
                    let future: RefreshFuture =
                        async move { session.call_refresh_endpoint().await }
                            .boxed()
                            .shared();
                    *pending = Some(future.clone());
                    (future, true)
                }
            }
        };

        let result = future.await;

        if started_here {
            self.inner.pending_refresh.lock().await.take();
            if result.is_err() {
                self.inner.jar.clear();
                *self.lock_user() = None;
            }
        }

        result
    }

    async fn call_refresh_endpoint(&self) -> Result<(), ClientError> {
        let response = self
            .dispatch(&ApiRequest::post("/auth/refresh-token"))
            .await?;

        if response.status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthenticated);
        }
        response.into_result()?;
        Ok(())
    }

    /// One raw round trip: attach the jar, run the service, absorb any
    /// Set-Cookie headers, buffer the body.
    async fn dispatch(&self, req: &ApiRequest) -> Result<ApiResponse, ClientError> {
        let mut builder = Request::builder().method(req.method.clone()).uri(req.path);
        if let Some(cookie) = self.inner.jar.header() {
            builder = builder.header(header::COOKIE, cookie);
        }

        let request = match &req.body {
            Some(body) => {
                let bytes = serde_json::to_vec(body)
                    .map_err(|e| ClientError::Transport(e.to_string()))?;
                builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(bytes))
            }
            None => builder.body(Body::empty()),
        }
        .map_err(|e| ClientError::Transport(e.to_string()))?;

        let response = self
            .inner
            .service
            .clone()
            .oneshot(request)
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status();
        self.inner.jar.store(response.headers());

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Ok(ApiResponse { status, body })
    }
}
