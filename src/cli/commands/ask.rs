//! Ask command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::session::Session;
use anyhow::Result;

/// Run the ask command: load the video into a throwaway session and answer once.
pub async fn run_ask(url: &str, question: &str, api_key: &str, settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;

    let mut session = Session::new();
    session.set_api_key(api_key)?;

    let result = ask_once(&orchestrator, &mut session, url, question).await;
    session.discard_video().await;
    result
}

async fn ask_once(
    orchestrator: &Orchestrator,
    session: &mut Session,
    url: &str,
    question: &str,
) -> Result<()> {
    let spinner = Output::spinner("Fetching transcript and building index...");
    let outcome = match orchestrator.load_video(session, url).await {
        Ok(outcome) => outcome,
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to load video: {}", e));
            return Err(e.into());
        }
    };
    spinner.finish_and_clear();

    let video = &outcome.video;
    Output::video_info(
        &video.title,
        video.language.as_deref(),
        video.chunk_count,
        video.duration_seconds,
    );

    let spinner = Output::spinner("Thinking...");
    match orchestrator.chat(session, question).await {
        Ok(response) => {
            spinner.finish_and_clear();

            println!("\n{}\n", response.answer);

            if !response.sources.is_empty() {
                Output::header("Sources");
                for source in &response.sources {
                    Output::source(&source.timestamp, source.score, &source.content, &source.url);
                }
            }
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
