use axum::{
    Form,
    extract::{State, rejection::FormRejection},
    response::{Html, IntoResponse, Redirect},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use photos_types::api::LoginForm;
use photos_types::models::Session;
use tracing::{debug, error, info};

use crate::error::ApiError;
use crate::gate::{self, SESSION_COOKIE};
use crate::pages;
use crate::state::AppState;

const BAD_CREDENTIALS: &str = "Invalid username or password";

/// GET /login
pub async fn login_form() -> Html<String> {
    Html(pages::login_page())
}

/// POST /login: verify credentials, issue the session cookie and redirect
/// to the gallery.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Form(form) = form.map_err(|e| ApiError::Validation(e.body_text()))?;

    let stored = state
        .db
        .user_by_username(&form.username)
        .await
        .map_err(ApiError::storage("lookup user"))?
        .map(|user| user.password_hash);

    // Hashing is CPU-bound; keep it off the async workers.
    let verifier = state.credentials.clone();
    let password = form.password;
    let verified =
        tokio::task::spawn_blocking(move || verifier.verify(&password, stored.as_deref()))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                ApiError::Internal(e.to_string())
            })?;

    if !verified {
        debug!("login rejected");
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS));
    }

    let session = state
        .sessions
        .create(&form.username)
        .await
        .map_err(ApiError::storage("create session"))?;
    info!(session = %session.id, username = %form.username, "login succeeded");

    let cookie = session_cookie(&session)?;
    Ok((jar.add(cookie), Redirect::to("/")))
}

/// POST /logout: delete the server-side session and clear the cookie.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    if let gate::GateOutcome::Authorized(session) = gate::check(&state.sessions, &jar).await {
        state
            .sessions
            .invalidate(session.id)
            .await
            .map_err(ApiError::storage("invalidate session"))?;
        info!(session = %session.id, "logged out");
    }
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    Ok((jar, Redirect::to("/")))
}

pub fn session_cookie(session: &Session) -> Result<Cookie<'static>, ApiError> {
    let expires = time::OffsetDateTime::from_unix_timestamp(session.expires_at.timestamp())
        .map_err(|e| ApiError::Internal(format!("cookie expiry: {e}")))?;
    Ok(Cookie::build((SESSION_COOKIE, session.id.to_string()))
        .http_only(true)
        .secure(true)
        .path("/")
        .expires(expires)
        .build())
}
