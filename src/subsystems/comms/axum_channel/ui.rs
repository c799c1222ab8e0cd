//! Web chat UI served at `/`.
//!
//! A single static page with a chat tab (tone dropdown, send and clear) and
//! a logs tab. It talks to the JSON API in [`super::api`].

use axum::response::Html;

const INDEX_HTML: &str = include_str!("index.html");

/// GET /
pub(super) async fn root() -> Html<&'static str> {
    Html(INDEX_HTML)
}
