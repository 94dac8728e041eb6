use comrak::plugins::syntect::SyntectAdapter;
use comrak::{ComrakOptions, ComrakPlugins, markdown_to_html_with_plugins};
use once_cell::sync::Lazy;
use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};

static MARKDOWN_OPTIONS: Lazy<ComrakOptions> = Lazy::new(|| {
    let mut options = ComrakOptions::default();
    options.extension.table = true;
    options.extension.footnotes = true;
    options.extension.strikethrough = true;
    options.extension.tasklist = true;
    // Replies come from a third party; raw HTML stays escaped.
    options.render.unsafe_ = false;
    options
});

const MESSAGE_TIME_FORMAT: &[FormatItem<'static>] = format_description!(
    "[year]-[month]-[day] [hour repr:12 padding:zero]:[minute padding:zero] [period case:upper]"
);

pub fn markdown_to_html(md: &str) -> String {
    let adapter = SyntectAdapter::new(Some("base16-ocean.dark"));
    let mut plugins = ComrakPlugins::default();
    plugins.render.codefence_syntax_highlighter = Some(&adapter);
    markdown_to_html_with_plugins(md, &MARKDOWN_OPTIONS, &plugins)
}

/// Local wall-clock rendering of a millisecond timestamp.
pub fn format_timestamp(millis: i64) -> Option<String> {
    let nanos = i128::from(millis) * 1_000_000;
    let mut datetime = OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()?;
    if let Ok(offset) = UtcOffset::current_local_offset() {
        datetime = datetime.to_offset(offset);
    }
    datetime.format(MESSAGE_TIME_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_lists_and_escapes_html() {
        let html = markdown_to_html("**Key points**\n\n- one\n- two\n\n<script>x</script>");
        assert!(html.contains("<strong>Key points</strong>"));
        assert!(html.contains("<li>one</li>"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn formats_timestamps() {
        let formatted = format_timestamp(0).unwrap();
        assert!(formatted.contains(':'));
        assert!(formatted.ends_with("AM") || formatted.ends_with("PM"));
    }
}
