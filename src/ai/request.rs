use super::LlmBackend;
use crate::error::Result;
use crate::prompts::fill_template;
use crate::summarize::MAX_KEY_POINTS;
use crate::types::ChatMessage;
use serde::{Deserialize, Serialize};

/// Page text beyond this many characters is cut before prompting.
pub const MAX_CONTENT_CHARS: usize = 12_000;
/// Page excerpt embedded in the chat system message.
pub const CHAT_EXCERPT_CHARS: usize = 500;

const CHAT_PREAMBLE: &str = "You are a helpful assistant answering follow-up questions about a web page the user is reading. \
Use the page context below and the conversation so far.";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiSummary {
    pub summary: String,
    pub key_points: Vec<String>,
}

pub fn truncate_content(text: &str) -> String {
    if text.chars().count() <= MAX_CONTENT_CHARS {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(MAX_CONTENT_CHARS).collect();
        format!("{truncated}...")
    }
}

pub fn build_summary_messages(title: &str, text_content: &str, template: &str) -> Vec<ChatMessage> {
    let content = truncate_content(text_content);
    vec![ChatMessage::user(fill_template(template, title, &content))]
}

pub fn build_chat_messages(
    title: &str,
    text_content: &str,
    template: &str,
    history: &[ChatMessage],
    message: &str,
) -> Vec<ChatMessage> {
    let content = truncate_content(text_content);
    let excerpt: String = content.chars().take(CHAT_EXCERPT_CHARS).collect();
    let context = fill_template(template, title, &excerpt);

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(format!("{CHAT_PREAMBLE}\n\n{context}")));
    messages.extend(history.iter().cloned());
    messages.push(ChatMessage::user(message));
    messages
}

/// Bullet or numbered list items of a markdown reply, markers stripped.
pub fn parse_key_points(reply: &str) -> Vec<String> {
    reply
        .lines()
        .filter_map(|line| strip_list_marker(line.trim()))
        .map(|item| item.replace("**", "").trim().to_string())
        .filter(|item| !item.is_empty())
        .take(MAX_KEY_POINTS)
        .collect()
}

fn strip_list_marker(line: &str) -> Option<&str> {
    for marker in ["- ", "* ", "• "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return Some(rest);
        }
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let rest = &line[digits..];
    rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") "))
}

pub async fn summarize_with(
    backend: &dyn LlmBackend,
    title: &str,
    text_content: &str,
    template: &str,
) -> Result<AiSummary> {
    let messages = build_summary_messages(title, text_content, template);
    let summary = backend.complete(&messages).await?;
    let key_points = parse_key_points(&summary);
    Ok(AiSummary {
        summary,
        key_points,
    })
}

pub async fn chat_with(
    backend: &dyn LlmBackend,
    title: &str,
    text_content: &str,
    template: &str,
    history: &[ChatMessage],
    message: &str,
) -> Result<ChatMessage> {
    let messages = build_chat_messages(title, text_content, template, history, message);
    let reply = backend.complete(&messages).await?;
    Ok(ChatMessage::assistant(reply))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::DEFAULT_PROMPT_TEMPLATE;
    use crate::types::Role;

    #[test]
    fn long_content_is_truncated_with_ellipsis() {
        let text = "a".repeat(15_000);
        let truncated = truncate_content(&text);
        assert_eq!(truncated.chars().count(), MAX_CONTENT_CHARS + 3);
        assert!(truncated.ends_with("a..."));
        assert_eq!(truncate_content("short"), "short");
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let text = "é".repeat(MAX_CONTENT_CHARS);
        assert_eq!(truncate_content(&text), text);
    }

    #[test]
    fn summary_prompt_embeds_truncated_content() {
        let text = "b".repeat(15_000);
        let messages = build_summary_messages("Title", &text, DEFAULT_PROMPT_TEMPLATE);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);
        let prompt = &messages[0].content;
        assert!(prompt.contains("Title: Title"));
        assert!(prompt.contains(&format!("{}...", "b".repeat(MAX_CONTENT_CHARS))));
        assert!(!prompt.contains(&"b".repeat(MAX_CONTENT_CHARS + 1)));
    }

    #[test]
    fn chat_messages_wrap_history() {
        let history = vec![ChatMessage::assistant("Summary"), ChatMessage::user("Q1")];
        let text = "c".repeat(2_000);
        let messages =
            build_chat_messages("Page", &text, "{title}|{content}", &history, "Q2");

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.ends_with(&format!("Page|{}", "c".repeat(500))));
        assert_eq!(messages[1], history[0]);
        assert_eq!(messages[2], history[1]);
        assert_eq!(messages[3].role, Role::User);
        assert_eq!(messages[3].content, "Q2");
    }

    #[test]
    fn key_points_come_from_list_items() {
        let reply = "Overall summary.\n\n## Key points\n- **First** point\n* Second\n1. Third\n2) Fourth\n• Fifth\n- Sixth\nNot a point";
        assert_eq!(
            parse_key_points(reply),
            vec!["First point", "Second", "Third", "Fourth", "Fifth"]
        );
        assert!(parse_key_points("No lists here.").is_empty());
    }
}
