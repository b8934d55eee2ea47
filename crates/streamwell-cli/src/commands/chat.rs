//! `swell chat` and `swell resume` -- stream a reply to the terminal.
//!
//! Ctrl-C suspends the reply: the text so far is saved and
//! `swell resume --session <id>` picks it up again.
//!
//! # Example
//!
//! ```text
//! swell chat "2+2?"
//! swell chat "and 3+3?" --session s1 --no-reasoning
//! swell resume --session s1
//! ```

use clap::Args;
use streamwell_llm::{Result as StreamResult, StreamClient, StreamError};
use streamwell_types::{ConversationWindow, GenerationOutput, Turn};
use tracing::debug;

use super::{build_client, load_config};
use crate::render::Renderer;

/// Arguments for the `swell chat` subcommand.
#[derive(Args)]
pub struct ChatArgs {
    /// Message to send.
    pub message: String,

    /// Session id (default: a fresh UUID).
    #[arg(short, long)]
    pub session: Option<String>,

    /// Hide reasoning text.
    #[arg(long)]
    pub no_reasoning: bool,

    /// Config file path (overrides auto-discovery).
    #[arg(short, long)]
    pub config: Option<String>,
}

/// Arguments for the `swell resume` subcommand.
#[derive(Args)]
pub struct ResumeArgs {
    /// Session id to resume.
    #[arg(short, long)]
    pub session: String,

    /// Hide reasoning text.
    #[arg(long)]
    pub no_reasoning: bool,

    /// Config file path (overrides auto-discovery).
    #[arg(short, long)]
    pub config: Option<String>,
}

/// Run the chat command.
pub async fn run(args: ChatArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref()).await?;
    let session_id = args
        .session
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let window = ConversationWindow::new(
        session_id.clone(),
        vec![Turn::user(args.message)],
        config.request.window_size,
    );
    let client = build_client(config)?;

    let mut renderer = Renderer::new(!args.no_reasoning);
    let generation = client.generate(&window, |update| renderer.print(&update));
    finish(&client, &session_id, generation).await
}

/// Run the resume command.
pub async fn resume(args: ResumeArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref()).await?;
    let client = build_client(config)?;

    let mut renderer = Renderer::new(!args.no_reasoning);
    let generation = client.resume(&args.session, |update| renderer.print(&update));
    finish(&client, &args.session, generation).await
}

/// Drive `generation`, suspending it on Ctrl-C.
async fn finish(
    client: &StreamClient,
    session_id: &str,
    generation: impl Future<Output = StreamResult<GenerationOutput>>,
) -> anyhow::Result<()> {
    tokio::pin!(generation);
    let mut suspended = false;
    let result = tokio::select! {
        result = &mut generation => result,
        _ = tokio::signal::ctrl_c() => {
            let (saved, result) = tokio::join!(client.record_suspend(session_id), &mut generation);
            suspended = saved?;
            result
        }
    };

    match result {
        Ok(out) => {
            debug!(provider = %out.provider, session_id, "reply complete");
            Ok(())
        }
        Err(StreamError::Cancelled) if suspended => {
            eprintln!();
            eprintln!("Suspended. Continue with: swell resume --session {session_id}");
            Ok(())
        }
        Err(e) => {
            debug!(error = %e, session_id, "generation failed");
            anyhow::bail!("{}", e.user_message(&client.config().error_messages))
        }
    }
}
