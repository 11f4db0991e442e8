//! Identity HTTP Handlers
//!
//! REST endpoints for signup, signin, signout, whoami and the generic identity
//! lookups. Every identity returned here goes through the [`ResponseSerializer`].

use crate::config::IdentityConfig;
use crate::directory::UserDirectory;
use crate::error::AuthError;
use crate::extractors::{Session, SessionCookie};
use crate::models::*;
use crate::password::PasswordHasher;
use crate::serializer::ResponseSerializer;
use crate::service::AuthService;
use crate::session::{resolve_current_identity, SessionState, SessionStore};

use axum::{
    extract::{Path, Query, State},
    http::{header::SET_COOKIE, StatusCode},
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use validator::Validate;

/// Everything a request handler needs
pub struct AppState {
    pub auth: AuthService,
    pub sessions: SessionStore,
    pub serializer: ResponseSerializer,
    pub cookie: SessionCookie,
}

/// Shared application state
pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(directory: Arc<dyn UserDirectory>, config: &IdentityConfig) -> Self {
        Self {
            auth: AuthService::new(directory, PasswordHasher::new()),
            sessions: SessionStore::from_config(config),
            serializer: ResponseSerializer::identity(),
            cookie: SessionCookie::from_config(config),
        }
    }

    /// Bind `user_id` to a fresh session and return its `Set-Cookie` value
    async fn start_session(&self, session: &Session, user_id: i64) -> Result<String, AuthError> {
        let token = self
            .sessions
            .establish(session.token.as_deref(), SessionState::signed_in(user_id))
            .await?;
        Ok(self.cookie.header_value(&token))
    }
}

// ============================================
// Route Builder
// ============================================

/// Create identity routes
pub fn create_routes(state: SharedState) -> Router {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/signin", post(signin))
        .route("/auth/signout", post(signout))
        .route("/auth/whoami", get(whoami))
        .route("/auth", get(find_identities))
        .route(
            "/auth/:id",
            get(find_identity)
                .patch(update_identity)
                .delete(remove_identity),
        )
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

// ============================================
// Signup / Signin / Signout
// ============================================

/// POST /auth/signup
///
/// Register a new identity and sign the session in as it
pub async fn signup(
    State(app): State<SharedState>,
    session: Session,
    Json(req): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, AuthError> {
    req.validate()?;

    let identity = app.auth.signup(&req.email, &req.password).await?;
    let cookie = app.start_session(&session, identity.id).await?;

    Ok((
        StatusCode::CREATED,
        AppendHeaders([(SET_COOKIE, cookie)]),
        app.serializer.json(&identity)?,
    ))
}

/// POST /auth/signin
///
/// Check credentials and sign the session in
pub async fn signin(
    State(app): State<SharedState>,
    session: Session,
    Json(req): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, AuthError> {
    req.validate()?;

    let identity = app.auth.signin(&req.email, &req.password).await?;
    let cookie = app.start_session(&session, identity.id).await?;

    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        app.serializer.json(&identity)?,
    ))
}

/// POST /auth/signout
///
/// Drop the session and expire its cookie
pub async fn signout(State(app): State<SharedState>, session: Session) -> impl IntoResponse {
    if let Some(token) = &session.token {
        let removed = app.sessions.remove(token).await;

        if let Some(user_id) = removed.and_then(|state| state.user_id) {
            tracing::info!(user_id, "Signed out");
        }
    }

    (
        AppendHeaders([(SET_COOKIE, app.cookie.clear_value())]),
        Json(MessageResponse::new("Signed out successfully")),
    )
}

/// GET /auth/whoami
///
/// Current identity, or `null` when the session has none
pub async fn whoami(
    State(app): State<SharedState>,
    session: Session,
) -> Result<Json<Value>, AuthError> {
    let identity = resolve_current_identity(&session.state, app.auth.directory()).await?;
    app.serializer.json(&identity)
}

// ============================================
// Identity Lookup / Update / Removal
// ============================================

/// GET /auth/:id
pub async fn find_identity(
    State(app): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AuthError> {
    let identity = app
        .auth
        .directory()
        .find_by_id(id)
        .await?
        .ok_or(AuthError::UserNotFound(id))?;

    app.serializer.json(&identity)
}

/// GET /auth?email=
///
/// Identities with the given email, or all of them when `email` is omitted
pub async fn find_identities(
    State(app): State<SharedState>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<Value>, AuthError> {
    let directory = app.auth.directory();
    let identities = match &query.email {
        Some(email) => directory.find_by_email(email).await?,
        None => directory.find_all().await?,
    };

    app.serializer.json(&identities)
}

/// PATCH /auth/:id
///
/// A new password is hashed before it reaches the directory.
pub async fn update_identity(
    State(app): State<SharedState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateIdentityRequest>,
) -> Result<Json<Value>, AuthError> {
    req.validate()?;

    let credential = match &req.password {
        Some(password) => Some(app.auth.hasher().hash(password).await?),
        None => None,
    };

    let changes = IdentityUpdate {
        email: req.email,
        credential,
    };
    if changes.is_empty() {
        return Err(AuthError::Validation("Nothing to update".to_string()));
    }

    let identity = app.auth.directory().update(id, changes).await?;

    tracing::info!(user_id = id, "Identity updated");
    app.serializer.json(&identity)
}

/// DELETE /auth/:id
pub async fn remove_identity(
    State(app): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AuthError> {
    let identity = app.auth.directory().remove(id).await?;

    tracing::info!(user_id = id, "Identity removed");
    app.serializer.json(&identity)
}
