pub mod ai;
pub mod background;
pub mod config;
pub mod error;
pub mod extract;
pub mod history;
pub mod prompts;
pub mod render;
pub mod session;
pub mod sidebar;
pub mod storage;
pub mod summarize;
pub mod types;

#[cfg(feature = "ui")]
pub mod theme;
#[cfg(feature = "ui")]
pub mod ui;
#[cfg(feature = "ui")]
pub mod views;
