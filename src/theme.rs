use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

pub struct ThemeDefinition {
    pub css: &'static str,
    pub label: &'static str,
}

pub fn theme_definition(mode: ThemeMode) -> ThemeDefinition {
    match mode {
        ThemeMode::Light => ThemeDefinition {
            css: LIGHT_THEME,
            label: "Light",
        },
        ThemeMode::Dark => ThemeDefinition {
            css: DARK_THEME,
            label: "Dark",
        },
    }
}

/// Layout shared by both palettes: button, panel slide, chat bubbles.
pub const SIDEBAR_CSS: &str = r#"
* { box-sizing: border-box; }
body { margin: 0; font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", sans-serif; }
.page-root { position: fixed; inset: 0; overflow: auto; }
.page-reader { max-width: 760px; margin: 0 auto; padding: 2rem 1.5rem 6rem; line-height: 1.6; }
.page-reader h1 { font-size: 1.6rem; }
.page-meta { color: var(--color-text-muted); font-size: 0.85rem; }
.toggle-button {
    position: fixed; width: 48px; height: 48px; border-radius: 50%;
    border: 1px solid var(--color-border); background: var(--color-accent);
    color: var(--color-accent-text); font-weight: 700; cursor: grab; z-index: 20;
    user-select: none; display: flex; align-items: center; justify-content: center;
}
.toggle-button.dragging { cursor: grabbing; opacity: 0.85; }
.sidebar-panel {
    position: fixed; top: 0; right: 0; bottom: 0; width: min(420px, 100vw);
    background: var(--color-bg-primary); color: var(--color-text-primary);
    border-left: 1px solid var(--color-border); box-shadow: -8px 0 24px rgba(0, 0, 0, 0.15);
    transform: translateX(100%); transition: transform 0.3s ease; z-index: 30;
    display: flex; flex-direction: column;
}
.sidebar-panel.open { transform: translateX(0); }
.panel-header { display: flex; align-items: center; justify-content: space-between; padding: 0.75rem 1rem; border-bottom: 1px solid var(--color-input-border); }
.panel-title { font-weight: 700; margin: 0; font-size: 1rem; }
.panel-body { flex: 1; overflow-y: auto; padding: 1rem; }
.btn { border: 1px solid var(--color-input-border); background: transparent; color: var(--color-text-primary); padding: 0.35rem 0.75rem; border-radius: 6px; cursor: pointer; }
.btn:hover { background: var(--color-surface-muted); }
.btn:disabled { opacity: 0.5; cursor: default; }
.btn-primary { background: var(--color-accent); color: var(--color-accent-text); border-color: var(--color-accent); }
.hstack { display: flex; gap: 0.5rem; align-items: center; }
.chat-list { display: flex; flex-direction: column; gap: 0.75rem; }
.message-row { display: flex; flex-direction: column; }
.message-row.user { align-items: flex-end; }
.bubble { padding: 0.6rem 0.8rem; border-radius: 10px; max-width: 100%; overflow-wrap: anywhere; }
.bubble.user { background: var(--color-chat-user-bg); color: var(--color-chat-user-text); }
.bubble.assistant { background: var(--color-chat-assistant-bg); color: var(--color-chat-assistant-text); border: 1px solid var(--color-input-border); }
.bubble-controls { display: flex; justify-content: flex-end; }
.action-btn { border: none; background: transparent; color: var(--color-text-muted); cursor: pointer; font-size: 0.75rem; }
.message-timestamp { color: var(--color-timestamp); font-size: 0.7rem; }
.shimmer-text { color: var(--color-text-muted); font-style: italic; }
.error-banner { border: 1px solid #c0392b; color: #c0392b; border-radius: 6px; padding: 0.6rem; margin-bottom: 0.75rem; }
.composer { border-top: 1px solid var(--color-input-border); padding: 0.75rem 1rem; }
.composer textarea { flex: 1; resize: none; padding: 0.5rem; border-radius: 6px; border: 1px solid var(--color-input-border); background: var(--color-input-bg); color: var(--color-text-primary); }
.settings-section { margin-bottom: 1.25rem; }
.section-title { font-size: 0.9rem; margin: 0 0 0.5rem; }
.field { display: flex; flex-direction: column; gap: 0.25rem; margin-bottom: 0.6rem; font-size: 0.85rem; }
.field input, .field select { padding: 0.4rem; border-radius: 6px; border: 1px solid var(--color-input-border); background: var(--color-input-bg); color: var(--color-text-primary); }
.form-status { font-size: 0.8rem; }
.form-status.error { color: #c0392b; }
.portal-menu { position: fixed; z-index: 40; background: var(--color-bg-primary); border: 1px solid var(--color-input-border); border-radius: 6px; min-width: 200px; }
.portal-menu button { display: block; width: 100%; text-align: left; border: none; background: transparent; color: var(--color-text-primary); padding: 0.45rem 0.75rem; cursor: pointer; }
.portal-menu button:hover { background: var(--color-surface-muted); }
.theme-toggle { display: flex; gap: 0.5rem; }
.theme-option.active { border-color: var(--color-border); font-weight: 700; }
.text-muted { color: var(--color-text-muted); }
"#;

const LIGHT_THEME: &str = r#"
:root {
    --color-bg-primary: #ffffff;
    --color-text-primary: #111111;
    --color-text-muted: #4a4a4a;
    --color-border: #000000;
    --color-surface-muted: #ececec;
    --color-input-border: #c2c2c2;
    --color-input-bg: #ffffff;
    --color-chat-user-bg: #111111;
    --color-chat-user-text: #ffffff;
    --color-chat-assistant-bg: #f7f7f7;
    --color-chat-assistant-text: #111111;
    --color-timestamp: #606060;
    --color-accent: #ff3509;
    --color-accent-text: #ffffff;
}
body { background: #fafafa; color: var(--color-text-primary); }
"#;

const DARK_THEME: &str = r#"
:root {
    --color-bg-primary: #0b0b0b;
    --color-text-primary: #f2f2f2;
    --color-text-muted: #bdbdbd;
    --color-border: #ffffff;
    --color-surface-muted: #1d1d1d;
    --color-input-border: #2f2f2f;
    --color-input-bg: #000000;
    --color-chat-user-bg: #f2f2f2;
    --color-chat-user-text: #000000;
    --color-chat-assistant-bg: #141414;
    --color-chat-assistant-text: #f2f2f2;
    --color-timestamp: #9b9b9b;
    --color-accent: #ff3509;
    --color-accent-text: #000000;
}
body { background: #000000; color: var(--color-text-primary); }
"#;
