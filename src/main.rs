mod api;
mod cli;
mod feed;
mod logging;
mod render;
mod settings;

#[cfg(test)]
mod test_utils;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{info, warn};

use api::{FilterSet, Post, PostsClient};
use cli::{BrowseArgs, Cli, Commands, ConfigCommands, OutputFormat};
use feed::FeedController;
use render::RenderOptions;
use settings::{FeedConfig, Overrides, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_dir = settings::config_dir(cli.config_dir.as_ref());
    let log_dir = config_dir.as_deref().map(settings::logs_dir);
    let logs = logging::init(log_dir.as_deref(), cli.verbose)?;
    if cli.verbose {
        eprintln!("Logging to {}", logs.describe());
    }

    let settings = config_dir
        .as_ref()
        .map(|dir| {
            let path = settings::settings_path(dir);
            Settings::load(&path).unwrap_or_else(|e| {
                warn!(error = %e, "ignoring settings file");
                eprintln!("Warning: {:#}", e);
                Settings::default()
            })
        })
        .unwrap_or_default();

    let default_browse = BrowseArgs::default();
    match &cli.command {
        Some(Commands::Config(args)) => {
            handle_config_command(&args.command, &cli, config_dir.as_deref(), &settings)
        }
        Some(Commands::Categories) => {
            let config = FeedConfig::resolve(&settings, &overrides(&cli, None))?;
            list_categories(&config).await
        }
        Some(Commands::Browse(args)) => {
            let config = FeedConfig::resolve(&settings, &overrides(&cli, Some(args)))?;
            browse(&config, args).await
        }
        None => {
            let config = FeedConfig::resolve(&settings, &overrides(&cli, None))?;
            browse(&config, &default_browse).await
        }
    }
}

fn overrides(cli: &Cli, browse: Option<&BrowseArgs>) -> Overrides {
    Overrides {
        base_url: cli.base_url.clone(),
        token: cli.token.clone(),
        page_size: browse.and_then(|b| b.page_size).map(|n| n as usize),
        viewport_rows: browse.and_then(|b| b.rows).map(|n| n as usize),
    }
    .with_env()
}

fn handle_config_command(
    command: &ConfigCommands,
    cli: &Cli,
    config_dir: Option<&Path>,
    settings: &Settings,
) -> Result<()> {
    match command {
        ConfigCommands::Path => {
            if let Some(config_dir) = config_dir {
                println!("{}", settings::settings_path(config_dir).display());
            } else {
                eprintln!("Could not determine config directory");
            }
        }
        ConfigCommands::Show => {
            let config = FeedConfig::resolve(settings, &overrides(cli, None))?;
            let toml = toml::to_string_pretty(&config).context("Failed to serialize config")?;
            print!("{}", toml);
        }
        ConfigCommands::Init { force } => {
            let Some(config_dir) = config_dir else {
                bail!("Could not determine config directory");
            };
            let path = settings::settings_path(config_dir);
            if path.exists() && !force {
                bail!(
                    "{} already exists. Use --force to replace it.",
                    path.display()
                );
            }
            let Some(base_url) = cli.base_url.clone() else {
                bail!("Pass --base-url to record the API address");
            };
            let new_settings = Settings {
                base_url: Some(base_url),
                ..Default::default()
            };
            new_settings.save(&path)?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}

async fn list_categories(config: &FeedConfig) -> Result<()> {
    let client = PostsClient::new(config.client_config()).context("Failed to create API client")?;
    let categories = client
        .fetch_categories()
        .await
        .context("Failed to fetch categories")?;
    for category in categories {
        println!("{}\t{}", category.id, category.name);
    }
    Ok(())
}

fn filters_from(args: &BrowseArgs) -> FilterSet {
    let mut filters = FilterSet::new();
    if let Some(search) = &args.search {
        filters = filters.with_search(search.clone());
    }
    if let Some(category) = &args.category {
        filters = filters.with_category(category.clone());
    }
    if let Some(post_type) = args.post_type {
        filters = filters.with_type(post_type);
    }
    filters
}

async fn browse(config: &FeedConfig, args: &BrowseArgs) -> Result<()> {
    let client = PostsClient::new(config.client_config()).context("Failed to create API client")?;
    let mut feed =
        FeedController::<Post>::new(Arc::new(client), config.page_size, FilterSet::new());
    feed.set_filters(filters_from(args));

    info!(
        base_url = %config.base_url,
        page_size = config.page_size,
        rows = config.viewport_rows,
        "browsing {}",
        feed.filters()
    );
    scroll(&mut feed, config.viewport_rows, args.limit).await;

    match args.format {
        OutputFormat::Text => {
            let opts = RenderOptions {
                max_rows: args.limit,
                ..Default::default()
            };
            println!("{}", render::render_feed(&feed, &opts));
        }
        OutputFormat::Json => {
            let records = feed.records();
            let shown = args.limit.map_or(records.len(), |l| l.min(records.len()));
            let json =
                render::render_json(&records[..shown]).context("Failed to serialize posts")?;
            println!("{}", json);
        }
    }

    if let Some(error) = feed.last_error() {
        eprintln!("Stopped loading: {error}");
    }
    Ok(())
}

/// Moves a viewport of `rows` rows down the feed, letting the controller
/// request what each position needs, until the feed ends, `limit` posts are
/// loaded, or scrolling further cannot produce more rows.
async fn scroll(feed: &mut FeedController<Post>, rows: usize, limit: Option<usize>) {
    let rows = rows.max(1);
    let mut top = 0;
    loop {
        let bottom = top + rows - 1;
        let issued = feed.on_items_rendered(top, bottom);
        feed.settle().await;

        let loaded = feed.records().len();
        if !feed.has_more() || limit.is_some_and(|l| loaded >= l) {
            break;
        }
        if issued == 0 && bottom + 1 >= feed.item_count() {
            warn!(loaded, "feed stalled before its last page");
            break;
        }
        top = (top + rows).min(feed.item_count().saturating_sub(1));
    }
    info!(
        loaded = feed.records().len(),
        has_more = feed.has_more(),
        "scroll finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, PostType};
    use crate::test_utils::{ScriptedSource, posts};

    fn feed(source: &Arc<ScriptedSource>, page_size: usize) -> FeedController<Post> {
        FeedController::<Post>::new(source.clone(), page_size, FilterSet::new())
    }

    #[tokio::test]
    async fn scroll_walks_every_page() {
        let source = Arc::new(
            ScriptedSource::new()
                .page(0, posts(0..10), 3)
                .page(1, posts(10..20), 3)
                .page(2, posts(20..25), 3),
        );
        let mut feed = feed(&source, 10);

        scroll(&mut feed, 10, None).await;

        assert_eq!(feed.records().len(), 25);
        assert!(!feed.has_more());
        assert_eq!(source.call_count(), 3);
    }

    #[tokio::test]
    async fn scroll_stops_at_limit() {
        let source = Arc::new(
            ScriptedSource::new()
                .page(0, posts(0..10), 5)
                .page(1, posts(10..20), 5)
                .page(2, posts(20..30), 5),
        );
        let mut feed = feed(&source, 10);

        scroll(&mut feed, 4, Some(15)).await;

        assert_eq!(feed.records().len(), 20);
        assert!(feed.has_more());
        assert_eq!(source.call_count(), 2);
    }

    #[tokio::test]
    async fn scroll_stops_after_failed_page() {
        let source = Arc::new(
            ScriptedSource::new()
                .page(0, posts(0..10), 5)
                .failing(1, ApiError::HttpStatus(502, "Bad Gateway".into())),
        );
        let mut feed = feed(&source, 10);

        scroll(&mut feed, 10, None).await;

        assert_eq!(feed.records().len(), 10);
        assert!(!feed.has_more());
        assert!(feed.last_error().is_some());
        assert_eq!(source.call_count(), 2);
    }

    #[tokio::test]
    async fn scroll_gives_up_on_empty_page_that_claims_more() {
        let source = Arc::new(ScriptedSource::new().page(0, Vec::new(), 4));
        let mut feed = feed(&source, 10);

        scroll(&mut feed, 10, None).await;

        assert!(feed.records().is_empty());
        assert_eq!(source.call_count(), 1);
    }

    #[test]
    fn filters_from_browse_args() {
        let args = BrowseArgs {
            search: Some("garden".into()),
            category: Some(String::new()),
            post_type: Some(PostType::Inquiry),
            ..Default::default()
        };

        let filters = filters_from(&args);

        assert_eq!(filters.search(), Some("garden"));
        assert_eq!(filters.category(), None);
        assert_eq!(filters.post_type(), Some("INQUIRY"));
    }
}
