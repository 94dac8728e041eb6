use crate::background::Background;
use crate::config::ConfigStore;
use crate::prompts::PromptStore;
use crate::session::PageSession;
use crate::sidebar::{ButtonPosition, ClickTarget, SidebarController, SidebarView, Viewport};
use crate::storage::Storage;
use crate::theme::{SIDEBAR_CSS, ThemeMode, theme_definition};
use crate::types::PageContent;
use crate::views::{MenuAnchor, PromptMenu, SettingsView, SummaryView};
use dioxus::prelude::*;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

const INITIAL_VIEWPORT: Viewport = Viewport {
    width: 1280.0,
    height: 800.0,
};

/// The page the sidebar is attached to, handed over at launch.
#[derive(Clone)]
pub struct PageContext {
    pub url: String,
    pub page: PageContent,
    pub storage: Storage,
}

pub fn launch(context: PageContext) {
    dioxus::LaunchBuilder::new().with_context(context).launch(App);
}

#[component]
pub fn App() -> Element {
    let context = use_context::<PageContext>();
    let theme = use_signal(ThemeMode::default);
    let mut sidebar = use_signal(|| SidebarController::new(INITIAL_VIEWPORT, None));
    let prompt_menu = use_signal(|| Option::<MenuAnchor>::None);
    // Set by inner handlers before the click bubbles up to the page root.
    let click_target = use_hook(|| Rc::new(Cell::new(ClickTarget::Outside)));

    let config = use_context_provider(|| ConfigStore::new(context.storage.clone()));
    use_context_provider(|| PromptStore::new(context.storage.clone()));
    use_context_provider(|| {
        let background = Background::new(context.storage.clone()).spawn();
        PageSession::new(
            context.url.clone(),
            context.page.clone(),
            context.storage.clone(),
            background,
        )
    });

    {
        let config = config.clone();
        use_future(move || {
            let config = config.clone();
            async move {
                match config.button_position().await {
                    Ok(Some(stored)) => sidebar.with_mut(|state| {
                        *state = SidebarController::new(state.viewport(), Some(stored));
                    }),
                    Ok(None) => {}
                    Err(err) => tracing::warn!(error = %err, "could not restore button position"),
                }
            }
        });
    }

    let persist_position = {
        let config = config.clone();
        use_callback(move |position: ButtonPosition| {
            let config = config.clone();
            spawn(async move {
                if let Err(err) = config.save_button_position(position).await {
                    tracing::warn!(error = %err, "could not persist button position");
                }
            });
        })
    };

    let on_root_click = {
        let click_target = click_target.clone();
        move |_: MouseEvent| {
            let target = click_target.replace(ClickTarget::Outside);
            sidebar.with_mut(|state| state.handle_click(Instant::now(), target));
        }
    };

    let mark = |target: ClickTarget| {
        let click_target = click_target.clone();
        move |_: MouseEvent| click_target.set(target)
    };

    let state = sidebar.read();
    let position = state.position();
    let is_open = state.is_open();
    let view = state.view();
    let button_class = if state.is_dragging() {
        "toggle-button dragging"
    } else {
        "toggle-button"
    };
    drop(state);
    let panel_class = if is_open {
        "sidebar-panel open"
    } else {
        "sidebar-panel"
    };
    let panel_body = match view {
        SidebarView::Main => rsx! {
            SummaryView {
                prompt_menu,
                on_open_settings: move |_| sidebar.with_mut(|state| state.show_settings()),
            }
        },
        SidebarView::Settings => rsx! { SettingsView { theme } },
    };

    rsx! {
        ThemeStyles { theme }
        div {
            class: "page-root",
            onclick: on_root_click,
            onresize: move |evt| {
                if let Ok(size) = evt.get_content_box_size() {
                    let moved = sidebar.with_mut(|state| {
                        state.set_viewport(Viewport::new(size.width, size.height))
                    });
                    if let Some(position) = moved {
                        persist_position.call(position);
                    }
                }
            },
            onmousemove: move |evt| {
                if sidebar.peek().is_pressed() {
                    let point = evt.client_coordinates();
                    sidebar.with_mut(|state| state.drag_to(point.x, point.y));
                }
            },
            onmouseup: move |_| {
                if sidebar.peek().is_pressed()
                    && let Some(position) = sidebar.with_mut(|state| state.end_drag())
                {
                    persist_position.call(position);
                }
            },

            PageReader { page: context.page.clone() }

            div {
                class: "{button_class}",
                style: "left: {position.x}px; top: {position.y}px;",
                title: "Summarize this page",
                onclick: mark(ClickTarget::ToggleButton),
                onmousedown: move |evt| {
                    let point = evt.client_coordinates();
                    sidebar.with_mut(|state| state.begin_drag(point.x, point.y));
                },
                onmouseup: move |evt| {
                    evt.stop_propagation();
                    let moved = sidebar.with_mut(|state| {
                        let moved = state.end_drag();
                        if moved.is_none() {
                            state.toggle(Instant::now());
                        }
                        moved
                    });
                    if let Some(position) = moved {
                        persist_position.call(position);
                    }
                },
                "S"
            }

            div {
                class: "{panel_class}",
                aria_hidden: (!is_open).to_string(),
                onclick: mark(ClickTarget::Panel),
                PanelHeader { sidebar, view }
                {panel_body}
            }

            div {
                onclick: mark(ClickTarget::PortalMenu),
                PromptMenu { anchor: prompt_menu }
            }
        }
    }
}

#[component]
fn ThemeStyles(theme: Signal<ThemeMode>) -> Element {
    let definition = theme_definition(theme());
    rsx! {
        style { dangerous_inner_html: "{SIDEBAR_CSS}" }
        style { dangerous_inner_html: "{definition.css}" }
    }
}

#[component]
fn PanelHeader(sidebar: Signal<SidebarController>, view: SidebarView) -> Element {
    let mut sidebar = sidebar;
    let title = match view {
        SidebarView::Main => "SumPage",
        SidebarView::Settings => "Settings",
    };
    rsx! {
        div { class: "panel-header",
            h2 { class: "panel-title", "{title}" }
            div { class: "hstack",
                if view == SidebarView::Main {
                    button {
                        class: "btn", r#type: "button", title: "Settings",
                        onclick: move |_| sidebar.with_mut(|state| state.show_settings()),
                        "Settings"
                    }
                } else {
                    button {
                        class: "btn", r#type: "button",
                        onclick: move |_| sidebar.with_mut(|state| state.show_main()),
                        "Back"
                    }
                }
                button {
                    class: "btn", r#type: "button", title: "Close",
                    onclick: move |_| sidebar.with_mut(|state| state.close()),
                    "×"
                }
            }
        }
    }
}

#[component]
fn PageReader(page: PageContent) -> Element {
    let paragraphs: Vec<String> = page
        .text_content
        .split(". ")
        .collect::<Vec<_>>()
        .chunks(4)
        .map(|chunk| chunk.join(". "))
        .collect();
    rsx! {
        article { class: "page-reader",
            h1 { "{page.title}" }
            p { class: "page-meta", "{page.word_count} words" }
            for (i, paragraph) in paragraphs.iter().enumerate() {
                p { key: "{i}", "{paragraph}" }
            }
        }
    }
}
