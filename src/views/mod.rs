pub mod settings;
pub mod summary;

pub use settings::SettingsView;
pub use summary::{MenuAnchor, PromptMenu, SummaryView};
