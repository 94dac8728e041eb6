//! Page text extraction.
//!
//! Stands in for the content script: turns an HTML document into the
//! title, cleaned body text and word count the rest of the pipeline uses.

use crate::error::{Error, Result};
use crate::summarize::summarize_page;
use crate::types::{PageContent, PageSummary};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

const UNTITLED: &str = "Untitled";

/// Elements whose text never renders.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "svg", "head"];

/// Elements that start a new line in rendered text.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "details", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "summary", "table",
    "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
];

pub fn extract_page_content(html: &str) -> PageContent {
    let document = Html::parse_document(html);

    let title = Selector::parse("title")
        .ok()
        .and_then(|sel| document.select(&sel).next())
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());

    let mut raw = String::new();
    match Selector::parse("body")
        .ok()
        .and_then(|sel| document.select(&sel).next())
    {
        Some(body) => collect_rendered_text(body, &mut raw),
        None => collect_rendered_text(document.root_element(), &mut raw),
    }

    let text_content = clean_text(&raw);
    let word_count = count_words(&text_content);

    PageContent {
        title,
        text_content,
        word_count,
    }
}

fn collect_rendered_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            // Source newlines are layout, not content.
            out.extend(text.chars().map(|c| if c == '\n' || c == '\r' { ' ' } else { c }));
        } else if let Some(child_el) = ElementRef::wrap(child) {
            let name = child_el.value().name();
            if SKIPPED_ELEMENTS.contains(&name) {
                continue;
            }
            if name == "br" {
                out.push('\n');
                continue;
            }
            let is_block = BLOCK_ELEMENTS.contains(&name);
            if is_block {
                out.push('\n');
            }
            collect_rendered_text(child_el, out);
            if is_block {
                out.push('\n');
            }
        }
    }
}

/// Collapse whitespace runs to a single space and line breaks to `". "`.
pub fn clean_text(raw: &str) -> String {
    raw.split(['\n', '\r'])
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(". ")
}

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().filter(|w| !w.is_empty()).count()
}

/// Fetch a page's HTML so it can be fed to [`extract_page_content`].
pub async fn fetch_page(url: &str) -> Result<String> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("sumpage/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()?;

    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::Network(format!(
            "Failed to fetch {url}: HTTP {}",
            status.as_u16()
        )));
    }
    tracing::debug!(%url, "fetched page");
    Ok(response.text().await?)
}

// ============================================
// Content script messages
// ============================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentRequest {
    GetPageContent,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentResponse {
    PageContentResponse(PageSummary),
}

/// Answers page-content requests for one loaded document.
pub struct ContentScript {
    html: String,
}

impl ContentScript {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    pub fn handle(&self, request: ContentRequest) -> ContentResponse {
        match request {
            ContentRequest::GetPageContent => {
                let content = extract_page_content(&self.html);
                ContentResponse::PageContentResponse(summarize_page(&content))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_falls_back_to_untitled() {
        let page = extract_page_content("<html><body><p>Hello there</p></body></html>");
        assert_eq!(page.title, "Untitled");
        assert_eq!(page.text_content, "Hello there");
        assert_eq!(page.word_count, 2);
    }

    #[test]
    fn blocks_become_sentence_breaks_and_scripts_are_skipped() {
        let html = r#"<html><head><title> My Page </title></head>
            <body>
              <h1>Heading</h1>
              <script>var hidden = 1;</script>
              <p>First   paragraph
                 continues here</p>
              <p>Second<br>line</p>
            </body></html>"#;
        let page = extract_page_content(html);
        assert_eq!(page.title, "My Page");
        assert_eq!(
            page.text_content,
            "Heading. First paragraph continues here. Second. line"
        );
        assert!(!page.text_content.contains("hidden"));
    }

    #[test]
    fn empty_document_has_no_words() {
        let page = extract_page_content("");
        assert_eq!(page.word_count, 0);
        assert_eq!(page.text_content, "");
    }

    #[test]
    fn clean_text_collapses_whitespace() {
        assert_eq!(clean_text("a \t b\n\n\n  c  "), "a b. c");
    }

    #[test]
    fn content_script_answers_with_summary() {
        let script = ContentScript::new("<title>T</title><body><p>Short text.</p></body>");
        let ContentResponse::PageContentResponse(summary) =
            script.handle(ContentRequest::GetPageContent);
        assert_eq!(summary.title, "T");
        assert_eq!(summary.summary, "Short text.");
    }

    #[test]
    fn content_messages_use_wire_names() {
        let request: ContentRequest =
            serde_json::from_str(r#"{"type":"GET_PAGE_CONTENT"}"#).unwrap();
        assert_eq!(request, ContentRequest::GetPageContent);

        let response = ContentResponse::PageContentResponse(PageSummary::default());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["type"], "PAGE_CONTENT_RESPONSE");
        assert_eq!(json["payload"]["wordCount"], 0);
    }
}
