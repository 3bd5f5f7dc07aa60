//! Serve command: the chat page and its JSON API.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::web;

/// Run the web server until Ctrl+C.
pub async fn run_serve(
    host: Option<String>,
    port: Option<u16>,
    settings: Settings,
) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let idle_minutes = settings.server.session_idle_timeout_secs / 60;

    let orchestrator = Orchestrator::new(settings)?;

    Output::header("Tubechat");
    println!();
    Output::success(&format!("Open http://{}:{} in your browser", host, port));
    println!();
    println!("Endpoints:");
    Output::kv("Chat page", "GET    /");
    Output::kv("Health", "GET    /health");
    Output::kv("New session", "POST   /api/sessions");
    Output::kv("Session", "GET    /api/sessions/{id}");
    Output::kv("End session", "DELETE /api/sessions/{id}");
    Output::kv("API key", "PUT    /api/sessions/{id}/api-key");
    Output::kv("Load video", "POST   /api/sessions/{id}/video");
    Output::kv("Chat", "POST   /api/sessions/{id}/chat");
    Output::kv("Messages", "GET    /api/sessions/{id}/messages");
    println!();
    Output::info(&format!(
        "Idle sessions are ended after {} minutes. Press Ctrl+C to stop the server.",
        idle_minutes
    ));

    web::serve(orchestrator, &host, port).await
}
