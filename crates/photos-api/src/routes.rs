use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use tower_http::catch_panic::CatchPanicLayer;

use crate::state::AppState;
use crate::{auth, fault, gallery, gate, uploads};

/// The full route table. Routes under the auth gate never run their
/// handler without a valid session.
pub fn router(state: AppState) -> Router {
    let gated = Router::new()
        .route("/upload", get(uploads::upload_form).post(uploads::submit_upload))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            gate::require_session,
        ));

    let open = Router::new()
        .route("/", get(gallery::index))
        .route("/login", get(auth::login_form).post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/uploads/{id}", get(gallery::serve_upload))
        .route("/healthz", get(gallery::healthz));

    Router::new()
        .merge(open)
        .merge(gated)
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(CatchPanicLayer::custom(fault::panic_response))
        .with_state(state)
}
