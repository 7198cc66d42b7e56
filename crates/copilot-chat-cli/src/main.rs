mod render;

use clap::Parser;
use copilot_chat_client::config::{AgentType, PowerPlatformCloud};
use copilot_chat_client::middleware::record::ActivityRecorder;
use copilot_chat_client::{
    ChatSession, ClientError, ConnectionSettings, Conversation, HttpTransport, Transport,
    TurnResult, TurnSubscriber,
};
use copilot_chat_core::citation::format_references_text;
use render::TerminalRenderer;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Chat with a Copilot Studio agent from the terminal.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    #[arg(long, env = "COPILOT_ENVIRONMENT_ID", default_value = "")]
    environment_id: String,

    #[arg(long, env = "COPILOT_AGENT_IDENTIFIER", default_value = "")]
    agent_identifier: String,

    #[arg(long, env = "COPILOT_CLOUD", default_value = "prod")]
    cloud: PowerPlatformCloud,

    #[arg(long, env = "COPILOT_AGENT_TYPE", default_value = "published")]
    agent_type: AgentType,

    /// Full agent URL; overrides the environment and agent identifiers.
    #[arg(long, env = "COPILOT_DIRECT_CONNECT_URL")]
    direct_connect_url: Option<String>,

    /// Bearer token for the Power Platform API.
    #[arg(long, env = "COPILOT_ACCESS_TOKEN", hide_env_values = true)]
    access_token: String,

    /// Print the HTML rendering of each answer.
    #[arg(long, env = "COPILOT_HTML")]
    html: bool,

    /// Write the raw activities of the last turn to this JSON file.
    #[arg(long, env = "COPILOT_RECORD_ACTIVITIES")]
    record_activities: Option<PathBuf>,

    /// Log filter, overrides RUST_LOG.
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn settings(&self) -> ConnectionSettings {
        let settings = match &self.direct_connect_url {
            Some(url) => ConnectionSettings::direct(url.clone()),
            None => ConnectionSettings::new(&self.environment_id, &self.agent_identifier),
        };
        settings.with_cloud(self.cloud).with_agent_type(self.agent_type)
    }
}

fn init_logging(level: Option<&str>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(level) = level {
        builder.parse_filters(level);
    }
    builder.init();
}

fn print_answer(result: &TurnResult, html: bool) {
    let references = format_references_text(&result.citations);
    if !references.is_empty() {
        println!("\n{}", references.trim_end());
    }
    if html {
        println!("\n{}", result.html);
    }
    if let Some(suggestion) = &result.suggestion {
        println!("\nSuggestions: {suggestion}");
    }
    println!();
}

async fn start<T: Transport>(session: &mut ChatSession<T>) -> Result<(), ClientError> {
    if let Some(welcome) = session.ensure_started().await? {
        println!("{welcome}\n");
    }
    Ok(())
}

/// Handles `/new`. A failed handshake is reported and leaves the session
/// unstarted; the next question retries it.
async fn restart<T: Transport>(session: &mut ChatSession<T>) -> bool {
    session.new_chat();
    match start(session).await {
        Ok(()) => true,
        Err(err) => {
            eprintln!("\nError: {err}\n");
            false
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let transport = HttpTransport::builder()
        .with_settings(args.settings())
        .with_access_token(&args.access_token)
        .build()?;

    let mut conversation = Conversation::new(transport);
    if let Some(path) = &args.record_activities {
        log::info!("Recording activities to {}", path.display());
        conversation = conversation.with_transformer(ActivityRecorder::new(path));
    }
    let mut session = ChatSession::new(conversation);
    start(&mut session).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        render::prompt();
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let prompt = line.trim();
        match prompt {
            "" => continue,
            "/quit" | "/exit" => break,
            "/new" => {
                restart(&mut session).await;
                continue;
            }
            _ => {}
        }

        let renderer = Arc::new(TerminalRenderer::default());
        match session
            .ask(prompt, renderer.clone() as Arc<dyn TurnSubscriber>)
            .await
        {
            Ok(result) => {
                renderer.finish(&result.text);
                print_answer(&result, args.html);
            }
            Err(err) => eprintln!("\nError: {err}\n"),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_logging(args.log_level.as_deref());

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use copilot_chat_client::ActivityStream;
    use copilot_chat_core::types::ConversationId;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Refuses every handshake.
    #[derive(Default)]
    struct RefusingTransport {
        attempts: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Transport for RefusingTransport {
        async fn start_conversation(&self) -> Result<ActivityStream<'static>, ClientError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(ClientError::connection("handshake refused"))
        }

        async fn ask_question(
            &self,
            _text: &str,
            _conversation_id: &ConversationId,
        ) -> Result<ActivityStream<'static>, ClientError> {
            Err(ClientError::connection("no conversation"))
        }
    }

    #[tokio::test]
    async fn failed_restart_keeps_the_session_usable() {
        let transport = Arc::new(RefusingTransport::default());
        let mut session = ChatSession::new(Conversation::new(transport.clone()));

        assert!(!restart(&mut session).await);
        assert!(!session.conversation().is_started());

        assert!(!restart(&mut session).await);
        assert_eq!(transport.attempts.load(Ordering::SeqCst), 2);
    }
}
