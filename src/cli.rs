use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Summarize web pages and chat about them with an LLM provider.
#[derive(Parser, Debug)]
#[command(name = "sumpage")]
#[command(version)]
#[command(about = "Summarize web pages and chat about them.", long_about = None)]
pub struct Cli {
    /// Storage directory (defaults to $SUMPAGE_DATA_DIR or the user data dir)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract readable text from a page and run the offline summarizer
    Extract {
        /// HTML file or http(s) URL
        source: String,

        /// Print the PAGE_CONTENT_RESPONSE message as JSON
        #[arg(long)]
        json: bool,
    },

    /// Summarize a page with the active provider
    Summarize {
        /// HTML file or http(s) URL
        source: String,

        /// Use the extractive summarizer, no provider call
        #[arg(long)]
        offline: bool,

        /// Prompt template id to use for this request
        #[arg(long)]
        prompt: Option<String>,

        /// Render the reply as HTML
        #[arg(long)]
        html: bool,
    },

    /// Ask a follow-up question about a page
    Chat {
        /// HTML file or http(s) URL
        source: String,

        /// The question
        message: String,

        /// Render the reply as HTML
        #[arg(long)]
        html: bool,
    },

    /// Inspect or clear stored conversations
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },

    /// Manage prompt templates
    Templates {
        #[command(subcommand)]
        command: TemplateCommands,
    },

    /// Provider configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Open the page in the sidebar front end
    #[cfg(feature = "ui")]
    Sidebar {
        /// HTML file or http(s) URL
        source: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommands {
    /// Print the conversation stored for a page
    Show {
        /// Page URL or HTML file
        source: String,
    },
    /// Remove stored conversations
    Clear {
        /// Page URL or HTML file
        source: Option<String>,

        /// Remove every stored conversation
        #[arg(long, conflicts_with = "source")]
        all: bool,
    },
    /// List pages with a stored conversation, most recent first
    List,
}

#[derive(Subcommand, Debug)]
pub enum TemplateCommands {
    /// List prompt templates
    List,
    /// Add a template; use {title} and {content} as placeholders
    Add {
        name: String,
        template: String,
    },
    /// Delete a template
    Delete { id: String },
    /// Make a template the default
    Default { id: String },
    /// Select the template used for new summaries
    Select { id: String },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Create or update a provider config and make it active
    Set {
        /// deepseek, openai, anthropic, minimax or gemini
        provider: String,

        #[arg(long)]
        api_key: Option<String>,

        #[arg(long)]
        base_url: Option<String>,

        #[arg(long)]
        model: Option<String>,

        #[arg(long)]
        max_tokens: Option<u32>,

        #[arg(long)]
        temperature: Option<f64>,
    },
    /// Print the stored configuration with keys masked
    Show,
}
