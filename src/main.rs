mod cli;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use cli::{Cli, Commands, ConfigCommands, HistoryCommands, TemplateCommands};
use std::path::Path;
use sumpage::background::Background;
use sumpage::config::{ConfigStore, ProviderConfig, ProviderKind};
use sumpage::extract::{
    ContentRequest, ContentResponse, ContentScript, extract_page_content, fetch_page,
};
use sumpage::history::ChatHistoryStore;
use sumpage::prompts::PromptStore;
use sumpage::render::{format_timestamp, markdown_to_html};
use sumpage::session::PageSession;
use sumpage::storage::{FileStorage, Storage};
use sumpage::types::{ChatMessage, Role};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    init_tracing();
    match dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(err) if err.not_found() => {}
        Err(err) => tracing::warn!(error = %err, "could not load .env"),
    }

    let cli = Cli::parse();
    let storage = match &cli.data_dir {
        Some(dir) => Storage::new(FileStorage::new(dir)),
        None => Storage::detect(),
    };
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    match cli.command {
        // Dioxus drives its own event loop, so the page is loaded first and
        // the runtime dropped before launch.
        #[cfg(feature = "ui")]
        Commands::Sidebar { source } => {
            let (url, html) = runtime.block_on(load_html(&source))?;
            drop(runtime);
            sumpage::ui::launch(sumpage::ui::PageContext {
                url,
                page: extract_page_content(&html),
                storage,
            });
            Ok(())
        }
        command => runtime.block_on(run(command, storage)),
    }
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sumpage=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(command: Commands, storage: Storage) -> Result<()> {
    match command {
        Commands::Extract { source, json } => extract(&source, json).await,
        Commands::Summarize {
            source,
            offline,
            prompt,
            html,
        } => summarize(&storage, &source, offline, prompt.as_deref(), html).await,
        Commands::Chat {
            source,
            message,
            html,
        } => chat(&storage, &source, &message, html).await,
        Commands::History { command } => history(&storage, command).await,
        Commands::Templates { command } => templates(&storage, command).await,
        Commands::Config { command } => config(&storage, command).await,
        #[cfg(feature = "ui")]
        Commands::Sidebar { .. } => bail!("the sidebar cannot run inside the async runtime"),
    }
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Session key for a source: the URL itself, or a `file://` URL for local HTML.
fn page_url(source: &str) -> Result<String> {
    if is_remote(source) {
        return Ok(source.to_string());
    }
    let path = std::fs::canonicalize(source).with_context(|| format!("no such file: {source}"))?;
    file_url(&path)
}

fn file_url(path: &Path) -> Result<String> {
    url::Url::from_file_path(path)
        .map(|url| url.to_string())
        .map_err(|_| anyhow!("cannot build a URL for {}", path.display()))
}

async fn load_html(source: &str) -> Result<(String, String)> {
    let url = page_url(source)?;
    let html = if is_remote(source) {
        fetch_page(source)
            .await
            .with_context(|| format!("failed to fetch {source}"))?
    } else {
        tokio::fs::read_to_string(source)
            .await
            .with_context(|| format!("failed to read {source}"))?
    };
    Ok((url, html))
}

async fn open_session(storage: &Storage, source: &str) -> Result<PageSession> {
    let (url, html) = load_html(source).await?;
    let page = extract_page_content(&html);
    tracing::debug!(%url, words = page.word_count, "page loaded");
    let background = Background::new(storage.clone()).spawn();
    Ok(PageSession::new(url, page, storage.clone(), background))
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "you",
        Role::Assistant => "assistant",
        Role::System => "system",
    }
}

fn print_message(message: &ChatMessage, html: bool) {
    let when = format_timestamp(message.timestamp).unwrap_or_default();
    println!("[{}] {when}", role_label(message.role));
    if html {
        println!("{}", markdown_to_html(&message.content));
    } else {
        println!("{}\n", message.content);
    }
}

async fn extract(source: &str, json: bool) -> Result<()> {
    let (_, html) = load_html(source).await?;
    let ContentResponse::PageContentResponse(summary) =
        ContentScript::new(html).handle(ContentRequest::GetPageContent);

    if json {
        let response = ContentResponse::PageContentResponse(summary);
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!("{}", summary.title);
    println!("{} words\n", summary.word_count);
    println!("{}", summary.summary);
    if !summary.key_points.is_empty() {
        println!("\nKey points:");
        for point in &summary.key_points {
            println!("- {point}");
        }
    }
    Ok(())
}

async fn summarize(
    storage: &Storage,
    source: &str,
    offline: bool,
    prompt: Option<&str>,
    html: bool,
) -> Result<()> {
    let session = open_session(storage, source).await?;
    let messages = if offline {
        session.summarize_offline().await?
    } else {
        let template = match prompt {
            Some(id) => {
                let template = PromptStore::new(storage.clone())
                    .get(id)
                    .await?
                    .ok_or_else(|| anyhow!("unknown prompt template '{id}'"))?;
                Some(template.template)
            }
            None => None,
        };
        session.summarize(template).await?
    };

    for message in &messages {
        print_message(message, html);
    }
    Ok(())
}

async fn chat(storage: &Storage, source: &str, message: &str, html: bool) -> Result<()> {
    let session = open_session(storage, source).await?;
    let messages = session.send_follow_up(message).await?;
    if let Some(reply) = messages.last() {
        print_message(reply, html);
    }
    Ok(())
}

async fn history(storage: &Storage, command: HistoryCommands) -> Result<()> {
    let store = ChatHistoryStore::new(storage.clone());
    match command {
        HistoryCommands::Show { source } => {
            let url = page_url(&source)?;
            match store.get_history(&url).await? {
                Some(record) => {
                    println!("{}\n{url}\n", record.title);
                    for message in &record.messages {
                        print_message(message, false);
                    }
                }
                None => println!("No conversation stored for {url}"),
            }
        }
        HistoryCommands::Clear { source, all } => {
            if all {
                store.clear_all().await?;
                println!("Cleared all conversations");
            } else {
                let Some(source) = source else {
                    bail!("pass a page or --all");
                };
                let url = page_url(&source)?;
                if store.clear_history(&url).await? {
                    println!("Cleared conversation for {url}");
                } else {
                    println!("No conversation stored for {url}");
                }
            }
        }
        HistoryCommands::List => {
            let records = store.list_records().await?;
            if records.is_empty() {
                println!("No stored conversations");
            }
            for record in records {
                let when = format_timestamp(record.last_updated).unwrap_or_default();
                println!(
                    "{when}  {:>3} msgs  {}  {}",
                    record.messages.len(),
                    record.title,
                    record.url
                );
            }
        }
    }
    Ok(())
}

async fn templates(storage: &Storage, command: TemplateCommands) -> Result<()> {
    let store = PromptStore::new(storage.clone());
    match command {
        TemplateCommands::List => {
            let (templates, selected) = futures::try_join!(store.list(), store.selected_id())?;
            for template in templates {
                let marker = if selected.as_deref() == Some(template.id.as_str()) {
                    "*"
                } else {
                    " "
                };
                let default = if template.is_default { " (default)" } else { "" };
                println!("{marker} {}  {}{default}", template.id, template.name);
            }
        }
        TemplateCommands::Add { name, template } => {
            let created = store.create(&name, &template).await?;
            println!("Created {}", created.id);
        }
        TemplateCommands::Delete { id } => {
            store.delete(&id).await?;
            println!("Deleted {id}");
        }
        TemplateCommands::Default { id } => {
            store.set_default(&id).await?;
            println!("{id} is now the default");
        }
        TemplateCommands::Select { id } => {
            store.select(&id).await?;
            println!("Selected {id}");
        }
    }
    Ok(())
}

fn mask_key(key: &str) -> String {
    if key.is_empty() {
        return "(not set)".to_string();
    }
    let visible: String = key.chars().take(4).collect();
    format!("{visible}…")
}

async fn config(storage: &Storage, command: ConfigCommands) -> Result<()> {
    let store = ConfigStore::new(storage.clone());
    match command {
        ConfigCommands::Set {
            provider,
            api_key,
            base_url,
            model,
            max_tokens,
            temperature,
        } => {
            let kind: ProviderKind = provider.parse()?;
            let mut config = match store.provider_config(kind).await? {
                Some(existing) => existing,
                None => ProviderConfig::from_env(kind)
                    .unwrap_or_else(|| ProviderConfig::new(kind, "")),
            };
            if let Some(api_key) = api_key {
                config.api_key = api_key;
            }
            if let Some(base_url) = base_url {
                config.base_url = base_url;
            }
            if let Some(model) = model {
                config.model = model;
            }
            if let Some(max_tokens) = max_tokens {
                config.max_tokens = max_tokens;
            }
            if let Some(temperature) = temperature {
                config.temperature = temperature;
            }
            store.save_provider_config(&config).await?;
            store.select_provider(kind).await?;
            println!("Saved {} and made it active", kind.display_name());
        }
        ConfigCommands::Show => {
            let (settings, configs) =
                futures::try_join!(store.global_settings(), store.provider_configs())?;
            println!("active provider: {}", settings.selected_provider);
            if let Some(id) = &settings.selected_prompt_id {
                println!("selected prompt: {id}");
            }
            if let Some(position) = settings.button_position {
                println!("button position: {}, {}", position.x, position.y);
            }
            if configs.is_empty() {
                println!("no stored provider configs");
            }
            for config in configs.values() {
                println!(
                    "\n[{}]\n  base url:    {}\n  model:       {}\n  api key:     {}\n  max tokens:  {}\n  temperature: {}",
                    config.provider,
                    config.base_url,
                    config.model,
                    mask_key(&config.api_key),
                    config.max_tokens,
                    config.temperature
                );
            }
        }
    }
    Ok(())
}
