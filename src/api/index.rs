use axum::response::Html;

const INDEX_PAGE: &str = include_str!("../../static/index.html");

/// Landing page for humans who open the gateway in a browser.
pub async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}
