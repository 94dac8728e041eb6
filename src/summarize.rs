//! Offline extractive summarizer used when no provider call is made.

use crate::types::{PageContent, PageSummary};

/// Below this many words the text is returned as-is.
pub const MIN_WORDS_TO_SUMMARIZE: usize = 50;
pub const MAX_SUMMARY_SENTENCES: usize = 3;
const SUMMARY_RATIO: f64 = 0.3;
pub const MAX_KEY_POINTS: usize = 5;

pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') && chars.peek().is_some_and(|next| next.is_whitespace())
        {
            push_sentence(&mut sentences, &current);
            current.clear();
            while chars.peek().is_some_and(|next| next.is_whitespace()) {
                chars.next();
            }
        }
    }
    push_sentence(&mut sentences, &current);
    sentences
}

fn push_sentence(sentences: &mut Vec<String>, candidate: &str) {
    let trimmed = candidate.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
}

fn word_count(sentence: &str) -> usize {
    sentence.split_whitespace().count()
}

fn is_all_caps(sentence: &str) -> bool {
    sentence.chars().any(char::is_alphabetic) && !sentence.chars().any(char::is_lowercase)
}

fn score_sentence(sentence: &str, index: usize, total: usize) -> u32 {
    let mut score = 0;
    if index == 0 {
        score += 3;
    }
    if index + 1 == total {
        score += 2;
    }
    if (10..=30).contains(&word_count(sentence)) {
        score += 1;
    }
    if is_all_caps(sentence) {
        score += 1;
    }
    score
}

/// Number of sentences a summary of `total` sentences keeps.
pub fn summary_length(total: usize) -> usize {
    ((total as f64 * SUMMARY_RATIO).ceil() as usize).min(MAX_SUMMARY_SENTENCES)
}

pub fn generate_summary(text: &str, word_count: usize) -> String {
    if word_count < MIN_WORDS_TO_SUMMARIZE {
        return text.to_string();
    }

    let sentences = split_sentences(text);
    let total = sentences.len();
    let mut ranked: Vec<(usize, u32)> = sentences
        .iter()
        .enumerate()
        .map(|(i, s)| (i, score_sentence(s, i, total)))
        .collect();
    // Stable sort keeps earlier sentences ahead on ties.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    let mut picked: Vec<usize> = ranked
        .into_iter()
        .take(summary_length(total))
        .map(|(i, _)| i)
        .collect();
    picked.sort_unstable();

    picked
        .into_iter()
        .map(|i| sentences[i].as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn extract_key_points(text: &str) -> Vec<String> {
    split_sentences(text)
        .into_iter()
        .filter(|s| (5..=25).contains(&word_count(s)))
        .take(MAX_KEY_POINTS)
        .collect()
}

pub fn summarize_page(content: &PageContent) -> PageSummary {
    PageSummary {
        title: content.title.clone(),
        text_content: content.text_content.clone(),
        word_count: content.word_count,
        summary: generate_summary(&content.text_content, content.word_count),
        key_points: extract_key_points(&content.text_content),
    }
}
