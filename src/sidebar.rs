//! Sidebar state: the draggable toggle button and the slide-in panel.
//!
//! Pure state with explicit time inputs; the Dioxus views and the tests drive
//! it the same way.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub const BUTTON_SIZE: f64 = 48.0;
const BUTTON_EDGE_GAP: f64 = 20.0;
/// Pointer travel below this is a click, not a drag.
pub const DRAG_THRESHOLD: f64 = 5.0;
/// Clicks this soon after opening never close the panel.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_millis(300);

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ButtonPosition {
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn clamp(&self, position: ButtonPosition) -> ButtonPosition {
        let max_x = (self.width - BUTTON_SIZE).max(0.0);
        let max_y = (self.height - BUTTON_SIZE).max(0.0);
        ButtonPosition {
            x: position.x.clamp(0.0, max_x),
            y: position.y.clamp(0.0, max_y),
        }
    }

    /// Right edge, vertically centred.
    pub fn default_position(&self) -> ButtonPosition {
        self.clamp(ButtonPosition {
            x: self.width - BUTTON_SIZE - BUTTON_EDGE_GAP,
            y: (self.height - BUTTON_SIZE) / 2.0,
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SidebarView {
    #[default]
    Main,
    Settings,
}

/// Where a click inside the page landed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClickTarget {
    Panel,
    ToggleButton,
    /// A dropdown rendered through a portal outside the panel tree.
    PortalMenu,
    Outside,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct DragState {
    offset_x: f64,
    offset_y: f64,
    start: ButtonPosition,
    moved: bool,
}

pub struct SidebarController {
    viewport: Viewport,
    position: ButtonPosition,
    drag: Option<DragState>,
    open: bool,
    opened_at: Option<Instant>,
    view: SidebarView,
    grace_period: Duration,
}

impl SidebarController {
    pub fn new(viewport: Viewport, stored: Option<ButtonPosition>) -> Self {
        let position = stored
            .map(|p| viewport.clamp(p))
            .unwrap_or_else(|| viewport.default_position());
        Self {
            viewport,
            position,
            drag: None,
            open: false,
            opened_at: None,
            view: SidebarView::Main,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn position(&self) -> ButtonPosition {
        self.position
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// A pointer is down on the button, moved or not.
    pub fn is_pressed(&self) -> bool {
        self.drag.is_some()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some_and(|d| d.moved)
    }

    pub fn view(&self) -> SidebarView {
        self.view
    }

    pub fn begin_drag(&mut self, pointer_x: f64, pointer_y: f64) {
        self.drag = Some(DragState {
            offset_x: pointer_x - self.position.x,
            offset_y: pointer_y - self.position.y,
            start: self.position,
            moved: false,
        });
    }

    pub fn drag_to(&mut self, pointer_x: f64, pointer_y: f64) -> ButtonPosition {
        if let Some(drag) = self.drag.as_mut() {
            let next = self.viewport.clamp(ButtonPosition {
                x: pointer_x - drag.offset_x,
                y: pointer_y - drag.offset_y,
            });
            let dx = next.x - drag.start.x;
            let dy = next.y - drag.start.y;
            if (dx * dx + dy * dy).sqrt() >= DRAG_THRESHOLD {
                drag.moved = true;
            }
            if drag.moved {
                self.position = next;
            }
        }
        self.position
    }

    /// Finish a drag. Returns the position to persist when the button moved;
    /// `None` means the gesture was a click.
    pub fn end_drag(&mut self) -> Option<ButtonPosition> {
        let drag = self.drag.take()?;
        drag.moved.then_some(self.position)
    }

    /// Re-clamp after a resize. Returns the new position when it changed.
    pub fn set_viewport(&mut self, viewport: Viewport) -> Option<ButtonPosition> {
        self.viewport = viewport;
        let clamped = viewport.clamp(self.position);
        if clamped == self.position {
            return None;
        }
        self.position = clamped;
        Some(clamped)
    }

    pub fn open(&mut self, now: Instant) {
        self.open = true;
        self.opened_at = Some(now);
    }

    pub fn close(&mut self) {
        self.open = false;
        self.opened_at = None;
        self.view = SidebarView::Main;
    }

    pub fn toggle(&mut self, now: Instant) {
        if self.open {
            self.close();
        } else {
            self.open(now);
        }
    }

    /// Apply a page click. Returns `true` when it closed the panel.
    pub fn handle_click(&mut self, now: Instant, target: ClickTarget) -> bool {
        if !self.open || target != ClickTarget::Outside {
            return false;
        }
        let within_grace = self
            .opened_at
            .is_some_and(|opened| now.saturating_duration_since(opened) < self.grace_period);
        if within_grace {
            return false;
        }
        self.close();
        true
    }

    pub fn show_settings(&mut self) {
        self.view = SidebarView::Settings;
    }

    pub fn show_main(&mut self) {
        self.view = SidebarView::Main;
    }
}
