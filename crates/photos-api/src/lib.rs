pub mod auth;
pub mod blobs;
pub mod credentials;
pub mod error;
pub mod extract;
pub mod fault;
pub mod gallery;
pub mod gate;
pub mod pages;
pub mod routes;
pub mod session;
pub mod state;
pub mod uploads;

pub use routes::router;
pub use state::{AppState, AppStateInner, Settings};
