//! Folding a turn's output events into renderable state.

use copilot_chat_core::citation::{
    CitationMetadata, CitationsByNum, clean_citations, format_references_html,
};
use copilot_chat_core::event::{OutputEvent, SearchResultEvent, ThoughtEvent};
use regex::Regex;
use std::sync::OnceLock;

fn search_citation_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| Regex::new(r"search(\d+)$").expect("search citation regex must compile"))
}

/// Accumulated state of one turn.
///
/// Build a fresh accumulator for every turn and feed it each event in order
/// with [`TurnAccumulator::apply`]; [`TurnAccumulator::finish`] produces the
/// final rendering.
#[derive(Debug, Clone, Default)]
pub struct TurnAccumulator {
    content: String,
    got_streaming: bool,
    status: Option<String>,
    thoughts: Vec<ThoughtEvent>,
    search_results: Vec<SearchResultEvent>,
    citation_metadata: CitationMetadata,
    suggestion: Option<String>,
    ended: bool,
}

/// Final rendering of a turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnResult {
    /// Raw answer text with citation markers intact.
    pub raw_text: String,
    /// Answer with clickable citation links and the references footer.
    pub html: String,
    /// Answer with plain `[n]` references and no footer.
    pub text: String,
    pub citations: CitationsByNum,
    pub suggestion: Option<String>,
    pub thoughts: Vec<ThoughtEvent>,
    pub search_results: Vec<SearchResultEvent>,
    /// Whether the service closed the conversation during this turn.
    pub ended: bool,
}

impl TurnAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one event into the turn state.
    pub fn apply(&mut self, event: &OutputEvent) {
        match event {
            OutputEvent::Status(e) => self.status = Some(e.text.clone()),
            OutputEvent::Thought(e) => self.thoughts.push(e.clone()),
            OutputEvent::SearchResult(e) => self.search_results.push(e.clone()),
            OutputEvent::ContentDelta(e) => {
                self.got_streaming = true;
                self.content.push_str(&e.delta);
            }
            OutputEvent::FinalContent(e) => {
                if !self.got_streaming {
                    self.content.clone_from(&e.text);
                }
            }
            OutputEvent::CitationMap(e) => self.merge_citations(&e.citations),
            OutputEvent::Suggestion(e) => self.suggestion = Some(e.text.clone()),
            OutputEvent::EndOfTurn(_) => self.ended = true,
        }
    }

    /// Merges citation metadata by id.
    ///
    /// Incoming records only fill fields that are still empty. Ids ending in
    /// `search{N}` that still lack a url borrow it from the search result with
    /// index `N` observed earlier in the turn.
    pub fn merge_citations(&mut self, incoming: &CitationMetadata) {
        for (id, record) in incoming {
            let entry = self.citation_metadata.entry(id.clone()).or_default();
            entry.fill_from(record);

            if !entry.url.is_empty() {
                continue;
            }
            let Some(index) = search_citation_regex()
                .captures(id)
                .and_then(|caps| caps[1].parse::<usize>().ok())
            else {
                continue;
            };
            if let Some(result) = self.search_results.iter().find(|r| r.index == index) {
                entry.url.clone_from(&result.url);
                if entry.title.is_empty() {
                    entry.title.clone_from(&result.title);
                }
            }
        }
    }

    /// Answer text so far, with citations rendered as plain `[n]`.
    pub fn preview(&self) -> String {
        clean_citations(&self.content, false, &CitationMetadata::new()).0
    }

    pub fn raw_text(&self) -> &str {
        &self.content
    }

    pub fn got_streaming(&self) -> bool {
        self.got_streaming
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn thoughts(&self) -> &[ThoughtEvent] {
        &self.thoughts
    }

    pub fn search_results(&self) -> &[SearchResultEvent] {
        &self.search_results
    }

    pub fn citation_metadata(&self) -> &CitationMetadata {
        &self.citation_metadata
    }

    pub fn suggestion(&self) -> Option<&str> {
        self.suggestion.as_deref()
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Renders the accumulated answer.
    ///
    /// Citation links are resolved once, against the full text and the merged
    /// metadata, rather than per streamed chunk.
    pub fn finish(self) -> TurnResult {
        let (mut html, citations) = clean_citations(&self.content, true, &self.citation_metadata);
        html.push_str(&format_references_html(&citations));
        let (text, _) = clean_citations(&self.content, false, &self.citation_metadata);

        TurnResult {
            raw_text: self.content,
            html,
            text,
            citations,
            suggestion: self.suggestion,
            thoughts: self.thoughts,
            search_results: self.search_results,
            ended: self.ended,
        }
    }
}
