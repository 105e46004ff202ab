//! Per-task fault containment. A panic inside one request or one
//! background task is logged and converted; it never reaches the runtime.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::FutureExt;
use tokio::task::JoinHandle;
use tracing::error;

/// Spawn a detached task whose panics are caught at its own boundary.
pub fn spawn_contained<F>(task: &'static str, fut: F) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(payload) = AssertUnwindSafe(fut).catch_unwind().await {
            error!(task, panic = %panic_message(payload.as_ref()), "background task panicked");
        }
    })
}

/// Response for a request whose handler panicked. Used with
/// `tower_http::catch_panic::CatchPanicLayer::custom`.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    error!(panic = %panic_message(payload.as_ref()), "request handler panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
}

pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn panicking_task_is_contained() {
        let handle = spawn_contained("test", async {
            if true {
                panic!("kaboom");
            }
        });
        assert!(handle.await.is_ok());
    }

    #[tokio::test]
    async fn healthy_task_runs_to_completion() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        spawn_contained("test", async move { flag.store(true, Ordering::SeqCst) })
            .await
            .unwrap();
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn panic_messages() {
        let s: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(s.as_ref()), "static");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "owned");
        let other: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }

    #[test]
    fn panic_response_is_500() {
        let resp = panic_response(Box::new("x"));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
