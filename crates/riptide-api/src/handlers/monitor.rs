//! `GET /monitor` — a minimal HTML dashboard (§6.1).
//!
//! The full interactive monitor UI is out of scope; this stub gives an
//! operator a human-readable landing page that polls the JSON endpoints
//! (`/stats`, `/active-transfers`, `/traffic`) it links to.

use axum::response::Html;

pub async fn monitor() -> Html<&'static str> {
    Html(
        r#"<!doctype html>
<html>
<head><title>riptide-api monitor</title></head>
<body>
<h1>riptide-api</h1>
<ul>
<li><a href="/health">/health</a></li>
<li><a href="/stats">/stats</a></li>
<li><a href="/traffic">/traffic</a></li>
<li><a href="/active-transfers">/active-transfers</a></li>
</ul>
</body>
</html>"#,
    )
}
