//! HTTP surface: `POST /login`, `GET /stats` and static assets.

mod server;
mod service;

pub use server::HttpServer;
pub use service::{router, AppState, LoginRequest};
