//! UI-side orchestration for one page.
//!
//! A [`PageSession`] owns nothing but handles: the chat history in storage
//! stays the source of truth, and clones share one in-flight flag so a page
//! never has two provider calls running at once.

use crate::background::{BackgroundHandle, ChatPayload, SummarizePayload};
use crate::error::{Error, Result};
use crate::history::{ChatHistoryStore, SessionState};
use crate::prompts::PromptStore;
use crate::storage::Storage;
use crate::summarize::summarize_page;
use crate::types::{ChatMessage, PageContent, PageSummary};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Clone, Debug, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub messages: Vec<ChatMessage>,
    pub selected_prompt_id: Option<String>,
}

#[derive(Clone)]
pub struct PageSession {
    url: String,
    page: PageContent,
    history: ChatHistoryStore,
    prompts: PromptStore,
    background: BackgroundHandle,
    in_flight: Arc<AtomicBool>,
}

struct InFlightGuard(Arc<AtomicBool>);

impl InFlightGuard {
    fn acquire(flag: &Arc<AtomicBool>, url: &str) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::Busy(url.to_string()))?;
        Ok(Self(flag.clone()))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl PageSession {
    pub fn new(
        url: impl Into<String>,
        page: PageContent,
        storage: Storage,
        background: BackgroundHandle,
    ) -> Self {
        Self {
            url: url.into(),
            page,
            history: ChatHistoryStore::new(storage.clone()),
            prompts: PromptStore::new(storage),
            background,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn page(&self) -> &PageContent {
        &self.page
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn load(&self) -> Result<SessionSnapshot> {
        let (record, selected_prompt_id) = futures::try_join!(
            self.history.get_history(&self.url),
            self.prompts.selected_id(),
        )?;
        let messages = record.map(|r| r.messages).unwrap_or_default();
        let state = if messages.is_empty() {
            SessionState::NoHistory
        } else {
            SessionState::HistoryExists
        };
        Ok(SessionSnapshot {
            state,
            messages,
            selected_prompt_id,
        })
    }

    /// Summarize through the provider when the page has no history yet.
    /// An existing conversation is returned untouched.
    pub async fn summarize(&self, prompt_template: Option<String>) -> Result<Vec<ChatMessage>> {
        let _guard = InFlightGuard::acquire(&self.in_flight, &self.url)?;
        let snapshot = self.load().await?;
        if snapshot.state == SessionState::HistoryExists {
            return Ok(snapshot.messages);
        }

        let summary = self
            .background
            .summarize(SummarizePayload {
                title: self.page.title.clone(),
                text_content: self.page.text_content.clone(),
                prompt_id: snapshot.selected_prompt_id,
                prompt_template,
            })
            .await?;

        let messages = vec![ChatMessage::assistant(summary.summary)];
        self.history
            .save_history(&self.url, &self.page.title, &messages)
            .await?;
        Ok(messages)
    }

    /// Offline variant: extractive summary, no provider call.
    pub async fn summarize_offline(&self) -> Result<Vec<ChatMessage>> {
        let _guard = InFlightGuard::acquire(&self.in_flight, &self.url)?;
        let snapshot = self.load().await?;
        if snapshot.state == SessionState::HistoryExists {
            return Ok(snapshot.messages);
        }

        let messages = vec![ChatMessage::assistant(format_offline_summary(
            &summarize_page(&self.page),
        ))];
        self.history
            .save_history(&self.url, &self.page.title, &messages)
            .await?;
        Ok(messages)
    }

    /// Ask a follow-up; appends the user message and the reply.
    pub async fn send_follow_up(&self, text: &str) -> Result<Vec<ChatMessage>> {
        let question = text.trim();
        if question.is_empty() {
            return Err(Error::Validation("Message cannot be empty".into()));
        }
        let _guard = InFlightGuard::acquire(&self.in_flight, &self.url)?;
        let snapshot = self.load().await?;

        let reply = self
            .background
            .chat(ChatPayload {
                title: self.page.title.clone(),
                text_content: self.page.text_content.clone(),
                message: question.to_string(),
                history: snapshot.messages.clone(),
                prompt_id: snapshot.selected_prompt_id,
                prompt_template: None,
            })
            .await?;

        let mut messages = snapshot.messages;
        messages.push(ChatMessage::user(question));
        messages.push(reply);
        self.history
            .save_history(&self.url, &self.page.title, &messages)
            .await?;
        Ok(messages)
    }

    /// Drop this page's conversation. Fails with `Busy` while a reply is
    /// pending, since saving that reply would bring the conversation back.
    pub async fn new_chat(&self) -> Result<()> {
        let _guard = InFlightGuard::acquire(&self.in_flight, &self.url)?;
        self.history.clear_history(&self.url).await?;
        Ok(())
    }
}

pub fn format_offline_summary(summary: &PageSummary) -> String {
    let mut out = summary.summary.clone();
    if !summary.key_points.is_empty() {
        out.push_str("\n\n**Key points**\n");
        for point in &summary.key_points {
            out.push_str("\n- ");
            out.push_str(point);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_summary_lists_key_points() {
        let summary = PageSummary {
            summary: "Short.".into(),
            key_points: vec!["One two three four five.".into()],
            ..PageSummary::default()
        };
        assert_eq!(
            format_offline_summary(&summary),
            "Short.\n\n**Key points**\n\n- One two three four five."
        );
    }

    #[test]
    fn guard_is_exclusive_and_released_on_drop() {
        let flag = Arc::new(AtomicBool::new(false));
        let guard = InFlightGuard::acquire(&flag, "u").unwrap();
        assert!(InFlightGuard::acquire(&flag, "u").is_err());
        drop(guard);
        assert!(InFlightGuard::acquire(&flag, "u").is_ok());
    }
}
