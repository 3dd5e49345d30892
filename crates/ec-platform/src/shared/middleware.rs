//! API Middleware
//!
//! Authentication for Axum. A session token is read from the
//! `Authorization: Bearer` header or the session cookie.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tower::{Layer, Service};
use tracing::debug;

use crate::auth::session_service::{extract_bearer_token, SessionService};
use crate::shared::authorization::AuthContext;
use crate::shared::error::ClinicError;

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionService>,
}

/// Bearer header first, then the session cookie
fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(extract_bearer_token)
        .map(String::from)
        .or_else(|| {
            CookieJar::from_headers(headers)
                .get(cookie_name)
                .map(|c| c.value().to_string())
                .filter(|v| !v.is_empty())
        })
}

fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthContext, ClinicError> {
    let token = extract_token(headers, state.sessions.cookie_name()).ok_or(ClinicError::Unauthenticated)?;
    let claims = state.sessions.verify(&token)?;
    Ok(AuthContext::from_claims(claims))
}

/// Authenticated user extractor
pub struct Authenticated(pub AuthContext);

impl std::ops::Deref for Authenticated {
    type Target = AuthContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = ClinicError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by AuthLayer
        let app_state = parts
            .extensions
            .get::<AppState>()
            .ok_or_else(|| ClinicError::internal("Auth layer not installed"))?;

        authenticate(app_state, &parts.headers).map(Authenticated)
    }
}

/// Layer that injects `AppState` into request extensions
#[derive(Clone)]
pub struct AuthLayer {
    state: AppState,
}

impl AuthLayer {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            state: self.state.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    state: AppState,
}

impl<S, B> Service<axum::http::Request<B>> for AuthMiddleware<S>
where
    S: Service<axum::http::Request<B>, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        req.extensions_mut().insert(self.state.clone());

        let future = self.inner.call(req);
        Box::pin(future)
    }
}

/// Where a page request should go instead, if anywhere.
fn page_redirect(path: &str, context: Option<&AuthContext>) -> Option<String> {
    let admin_page = path == "/admin" || path.starts_with("/admin/");
    let dashboard_page = path == "/dashboard" || path.starts_with("/dashboard/");
    if !admin_page && !dashboard_page {
        return None;
    }

    match context {
        None => Some(format!("/login?next={}", urlencoding::encode(path))),
        Some(ctx) if admin_page && !ctx.is_admin() => Some("/".to_string()),
        Some(_) => None,
    }
}

/// Guard for the admin and dashboard pages.
///
/// Install inside `AuthLayer` with `axum::middleware::from_fn`.
pub async fn page_guard(request: Request, next: Next) -> Response {
    let context = request
        .extensions()
        .get::<AppState>()
        .and_then(|state| authenticate(state, request.headers()).ok());

    let path = request.uri().path();
    if let Some(target) = page_redirect(path, context.as_ref()) {
        debug!(path, target = %target, "Page guard redirect");
        return Redirect::temporary(&target).into_response();
    }

    next.run(request).await
}
