use crate::history::SessionState;
use crate::prompts::PromptStore;
use crate::render::{format_timestamp, markdown_to_html};
use crate::session::PageSession;
use crate::types::{ChatMessage, Role};
use dioxus::events::Key;
use dioxus::prelude::*;

/// Screen point a portal menu opens at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MenuAnchor {
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Debug, PartialEq)]
enum Action {
    Summarize,
    SummarizeOffline,
    FollowUp(String),
}

#[derive(Clone, Debug, PartialEq)]
struct Failure {
    message: String,
    retry: Option<Action>,
    needs_settings: bool,
}

#[component]
pub fn SummaryView(
    prompt_menu: Signal<Option<MenuAnchor>>,
    on_open_settings: EventHandler<()>,
) -> Element {
    let session = use_context::<PageSession>();
    let mut messages = use_signal(Vec::<ChatMessage>::new);
    let mut state = use_signal(|| SessionState::NoHistory);
    let mut failure = use_signal(|| Option::<Failure>::None);
    let mut running = use_signal(|| false);
    let mut input = use_signal(String::new);
    let mut prompt_menu = prompt_menu;

    {
        let session = session.clone();
        use_future(move || {
            let session = session.clone();
            async move {
                match session.load().await {
                    Ok(snapshot) => {
                        state.set(snapshot.state);
                        messages.set(snapshot.messages);
                    }
                    Err(err) => failure.set(Some(Failure {
                        message: err.to_string(),
                        retry: None,
                        needs_settings: false,
                    })),
                }
            }
        });
    }

    let run = {
        let session = session.clone();
        use_callback(move |action: Action| {
            if running() {
                return;
            }
            let session = session.clone();
            running.set(true);
            failure.set(None);
            spawn(async move {
                let result = match &action {
                    Action::Summarize => session.summarize(None).await,
                    Action::SummarizeOffline => session.summarize_offline().await,
                    Action::FollowUp(text) => session.send_follow_up(text).await,
                };
                match result {
                    Ok(updated) => {
                        if matches!(action, Action::FollowUp(_)) {
                            input.set(String::new());
                        }
                        state.set(SessionState::HistoryExists);
                        messages.set(updated);
                    }
                    Err(err) => {
                        tracing::warn!(url = session.url(), error = %err, "sidebar request failed");
                        failure.set(Some(Failure {
                            message: err.to_string(),
                            needs_settings: err.kind() == crate::error::ErrorKind::ConfigMissing,
                            retry: err.is_retryable().then_some(action),
                        }));
                    }
                }
                running.set(false);
            });
        })
    };

    let new_chat = {
        let session = session.clone();
        move |_| {
            let session = session.clone();
            spawn(async move {
                match session.new_chat().await {
                    Ok(()) => {
                        messages.set(Vec::new());
                        state.set(SessionState::NoHistory);
                        failure.set(None);
                    }
                    Err(err) => failure.set(Some(Failure {
                        message: err.to_string(),
                        retry: None,
                        needs_settings: false,
                    })),
                }
            });
        }
    };

    let submit = move || {
        let text = input();
        if !text.trim().is_empty() {
            run.call(Action::FollowUp(text));
        }
    };

    let messages_snapshot = messages();
    let current_failure = failure();
    let busy = running();

    rsx! {
        div { class: "panel-body",
            if let Some(fail) = current_failure {
                div { class: "error-banner", role: "alert",
                    p { "{fail.message}" }
                    div { class: "hstack",
                        if let Some(action) = fail.retry {
                            button {
                                class: "btn", r#type: "button", disabled: busy,
                                onclick: move |_| run.call(action.clone()),
                                "Retry"
                            }
                        }
                        if fail.needs_settings {
                            button {
                                class: "btn", r#type: "button",
                                onclick: move |_| on_open_settings.call(()),
                                "Open settings"
                            }
                        }
                    }
                }
            }

            if state() == SessionState::NoHistory {
                div { class: "settings-section",
                    p { class: "text-muted", "No summary for this page yet." }
                    div { class: "hstack",
                        button {
                            class: "btn btn-primary", r#type: "button", disabled: busy,
                            onclick: move |_| run.call(Action::Summarize),
                            "Summarize"
                        }
                        button {
                            class: "btn", r#type: "button", disabled: busy,
                            onclick: move |_| run.call(Action::SummarizeOffline),
                            "Quick summary"
                        }
                        button {
                            class: "btn", r#type: "button",
                            onclick: move |evt| {
                                let point = evt.client_coordinates();
                                prompt_menu.set(Some(MenuAnchor { x: point.x, y: point.y }));
                            },
                            "Prompt ▾"
                        }
                    }
                }
            }

            div { class: "chat-list",
                for (i, msg) in messages_snapshot.iter().enumerate() {
                    MessageRow { key: "{i}", message: msg.clone() }
                }
                if busy {
                    div { class: "message-row assistant",
                        span { class: "shimmer-text", "Processing…" }
                    }
                }
            }
        }

        if state() == SessionState::HistoryExists {
            form { class: "composer",
                onsubmit: move |evt| evt.prevent_default(),
                div { class: "hstack",
                    textarea {
                        rows: "2", placeholder: "Ask a follow-up question",
                        value: "{input}", oninput: move |ev| input.set(ev.value()),
                        onkeydown: move |ev| {
                            if ev.key() == Key::Enter && !ev.modifiers().shift() {
                                ev.prevent_default();
                                submit();
                            }
                        },
                        disabled: busy,
                    }
                    div { style: "display: flex; flex-direction: column; gap: 0.25rem;",
                        button {
                            class: "btn btn-primary", r#type: "button",
                            disabled: busy || input().trim().is_empty(),
                            onclick: move |_| submit(),
                            "Send"
                        }
                        button {
                            class: "btn", r#type: "button", disabled: busy,
                            onclick: new_chat,
                            "New chat"
                        }
                    }
                }
            }
        }
    }
}

#[component]
fn MessageRow(message: ChatMessage) -> Element {
    let side = match message.role {
        Role::User => "user",
        Role::Assistant | Role::System => "assistant",
    };
    rsx! {
        div { class: "message-row {side}",
            div { class: "bubble {side}",
                if message.role == Role::User {
                    "{message.content}"
                } else {
                    AssistantBubble { content: message.content.clone() }
                }
            }
            if let Some(ts) = format_timestamp(message.timestamp) {
                span { class: "message-timestamp", "{ts}" }
            }
        }
    }
}

#[component]
fn AssistantBubble(content: String) -> Element {
    let content_html = markdown_to_html(&content);
    let copy_payload = content.clone();
    let on_copy = move |_| {
        let raw = copy_payload.clone();
        spawn(async move {
            #[cfg(any(feature = "desktop", feature = "mobile"))]
            {
                if let Ok(mut cb) = arboard::Clipboard::new() {
                    let _ = cb.set_text(raw);
                }
            }
            #[cfg(not(any(feature = "desktop", feature = "mobile")))]
            drop(raw);
        });
    };

    rsx! {
        div { class: "bubble-controls",
            button { class: "action-btn", title: "Copy markdown", onclick: on_copy, "Copy" }
        }
        div { class: "md", dangerous_inner_html: "{content_html}" }
    }
}

/// Prompt template picker, rendered outside the panel tree.
#[component]
pub fn PromptMenu(anchor: Signal<Option<MenuAnchor>>) -> Element {
    let prompts = use_context::<PromptStore>();
    let mut anchor = anchor;

    let mut templates = {
        let prompts = prompts.clone();
        use_resource(move || {
            let prompts = prompts.clone();
            async move { futures::try_join!(prompts.list(), prompts.selected_id()) }
        })
    };

    let choose = {
        let prompts = prompts.clone();
        use_callback(move |id: String| {
            let prompts = prompts.clone();
            spawn(async move {
                if let Err(err) = prompts.select(&id).await {
                    tracing::warn!(prompt_id = %id, error = %err, "could not select prompt");
                }
                templates.restart();
                anchor.set(None);
            });
        })
    };

    let Some(at) = anchor() else {
        return rsx! {};
    };

    let items: Vec<(String, String, String, bool)> = match &*templates.read_unchecked() {
        Some(Ok((list, selected))) => list
            .iter()
            .map(|template| {
                let active = selected.as_deref().map_or(template.is_default, |id| id == template.id);
                (
                    template.id.clone(),
                    template.id.clone(),
                    template.name.clone(),
                    active,
                )
            })
            .collect(),
        Some(Err(err)) => {
            tracing::warn!(error = %err, "could not load prompt templates");
            Vec::new()
        }
        None => Vec::new(),
    };

    rsx! {
        div { class: "portal-menu", style: "left: {at.x}px; top: {at.y}px;",
            for (key, id, name, active) in items {
                button {
                    key: "{key}",
                    r#type: "button",
                    onclick: move |_| choose.call(id.clone()),
                    if active { "✓ {name}" } else { "{name}" }
                }
            }
            button {
                r#type: "button",
                onclick: move |_| anchor.set(None),
                "Cancel"
            }
        }
    }
}
