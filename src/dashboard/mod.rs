//! Dashboard — Axum web server for monitoring surfaced deals.
//!
//! Serves a read-only REST API and a self-contained HTML page.
//! CORS enabled for local development.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, Method},
    response::Html,
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use routes::AppState;

/// The embedded dashboard page.
const DASHBOARD_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>DEALHUNTER Dashboard</title>
<style>
  body { font-family: system-ui, sans-serif; margin: 2rem; background: #111; color: #eee; }
  h1 { font-size: 1.4rem; }
  table { border-collapse: collapse; width: 100%; margin-top: 1rem; }
  th, td { border-bottom: 1px solid #333; padding: 0.4rem; text-align: left; }
  td.num { text-align: right; font-variant-numeric: tabular-nums; }
  a { color: #7cf; }
  #status { color: #aaa; }
</style>
</head>
<body>
<h1>DEALHUNTER Dashboard</h1>
<div id="status">Loading…</div>
<table>
  <thead><tr><th>Surfaced</th><th>Deal</th><th>Price</th><th>Estimate</th><th>Discount</th></tr></thead>
  <tbody id="opportunities"></tbody>
</table>
<script>
const money = v => "$" + v.toFixed(2);
const esc = s => s.replace(/[&<>"]/g, c => ({"&":"&amp;","<":"&lt;",">":"&gt;","\"":"&quot;"}[c]));
async function refresh() {
  const s = await (await fetch("/api/status")).json();
  document.getElementById("status").textContent =
    `${s.agent_name} | runs ${s.runs} (${s.failed_runs} failed) | surfaced ${s.opportunities_surfaced} | threshold ${money(s.threshold)}`;
  const opps = await (await fetch("/api/opportunities")).json();
  document.getElementById("opportunities").innerHTML = opps.reverse().map(o =>
    `<tr><td>${o.surfaced_at}</td><td><a href="${esc(o.url)}">${esc(o.description.slice(0, 80))}</a></td>` +
    `<td class="num">${money(o.price)}</td><td class="num">${money(o.estimate)}</td><td class="num">${money(o.discount)}</td></tr>`
  ).join("");
}
refresh();
setInterval(refresh, 30000);
</script>
</body>
</html>
"#;

/// Bind the dashboard port and serve in a background task.
pub async fn spawn_dashboard(state: AppState, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind dashboard port {port}"))?;

    info!(port, "Dashboard server starting on http://localhost:{port}");
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "Dashboard server error");
        }
    });

    Ok(())
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        // API routes
        .route("/api/status", get(routes::get_status))
        .route("/api/opportunities", get(routes::get_opportunities))
        .route("/api/runs", get(routes::get_runs))
        .route("/health", get(routes::health))
        // Dashboard HTML
        .route("/", get(serve_dashboard))
        .layer(cors)
        .with_state(state)
}

/// Serve the embedded HTML dashboard.
async fn serve_dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
