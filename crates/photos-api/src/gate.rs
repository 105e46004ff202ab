use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use photos_types::models::Session;
use tracing::{debug, error};

use crate::session::SessionManager;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "photos-login";

/// Result of checking a request's session cookie.
#[derive(Debug)]
pub enum GateOutcome {
    Authorized(Session),
    Rejected(Rejection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MissingCookie,
    UnknownSession,
    StorageFault,
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
    }
}

impl GateOutcome {
    pub fn session(self) -> Option<Session> {
        match self {
            Self::Authorized(session) => Some(session),
            Self::Rejected(_) => None,
        }
    }
}

pub async fn check(sessions: &SessionManager, jar: &CookieJar) -> GateOutcome {
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return GateOutcome::Rejected(Rejection::MissingCookie);
    };

    match sessions.lookup_token(cookie.value()).await {
        Ok(Some(session)) => GateOutcome::Authorized(session),
        Ok(None) => GateOutcome::Rejected(Rejection::UnknownSession),
        Err(e) => {
            error!(error = %e, "session lookup failed");
            GateOutcome::Rejected(Rejection::StorageFault)
        }
    }
}

/// Guard for routes that need a logged-in user. A rejected request never
/// reaches `next`; an authorized one gets the `Session` as an extension.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    match check(&state.sessions, &jar).await {
        GateOutcome::Authorized(session) => {
            req.extensions_mut().insert(session);
            next.run(req).await
        }
        GateOutcome::Rejected(reason) => {
            debug!(?reason, path = %req.uri().path(), "request rejected by auth gate");
            reason.into_response()
        }
    }
}
