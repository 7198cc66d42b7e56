//! Incremental terminal rendering of a turn.

use copilot_chat_client::TurnSubscriber;
use copilot_chat_core::citation::CITATION_OPEN;
use copilot_chat_core::event::{SearchResultEvent, ThoughtEvent};
use std::io::Write;
use std::sync::Mutex;

pub fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

/// Streams answer text to stdout and progress to stderr.
///
/// Text after an unterminated citation marker is held back until the marker
/// closes, so printed text never has to be taken back.
#[derive(Debug, Default)]
pub struct TerminalRenderer {
    printed: Mutex<String>,
}

impl TerminalRenderer {
    fn print_from(&self, text: &str) {
        let Ok(mut printed) = self.printed.lock() else {
            return;
        };
        let mut stdout = std::io::stdout().lock();
        if let Some(rest) = text.strip_prefix(printed.as_str()) {
            let _ = write!(stdout, "{rest}");
        } else {
            // The answer was replaced wholesale; start over on a fresh line.
            let _ = write!(stdout, "\n{text}");
        }
        let _ = stdout.flush();
        printed.clear();
        printed.push_str(text);
    }

    /// Prints whatever of the final answer has not been printed yet.
    pub fn finish(&self, text: &str) {
        self.print_from(text);
        println!();
    }
}

fn stable_prefix(preview: &str) -> &str {
    match preview.find(CITATION_OPEN) {
        Some(open) => &preview[..open],
        None => preview,
    }
}

#[async_trait::async_trait]
impl TurnSubscriber for TerminalRenderer {
    async fn on_status(&self, status: &str) {
        eprintln!("[{status}]");
    }

    async fn on_thought(&self, thought: &ThoughtEvent, _thoughts: &[ThoughtEvent]) {
        if thought.task.is_empty() {
            eprintln!("  * {}", thought.text);
        } else {
            eprintln!("  * {}: {}", thought.task, thought.text);
        }
    }

    async fn on_search_result(&self, result: &SearchResultEvent) {
        log::debug!("Search result {}: {} <{}>", result.index, result.title, result.url);
    }

    async fn on_content_changed(&self, preview: &str) {
        self.print_from(stable_prefix(preview));
    }
}
