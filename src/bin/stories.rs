use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use storybox::config;
use storybox::db;
use storybox::layout::{FeedLayout, Slot};
use storybox::model::Story;
use storybox::store::SqliteStore;

#[derive(Debug, Parser)]
#[command(author, version, about = "Browse and edit the local story mirror")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Print JSON instead of a table
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List stories in feed order
    List {
        /// Only stories marked as favorite
        #[arg(long)]
        favorites: bool,
    },
    /// Show a single story
    Show { id: i64 },
    /// Mark a story as favorite
    Favorite { id: i64 },
    /// Clear the favorite mark of a story
    Unfavorite { id: i64 },
    /// Print the outcome of the latest sync pass
    Status,
    /// Print the grid slot layout for the current stories
    Grid,
}

fn print_row(s: &Story) {
    println!(
        "{:>10}  {}  {}",
        s.id,
        if s.favorite { "*" } else { " " },
        s.title
    );
}

async fn set_favorite(store: &SqliteStore, id: i64, favorite: bool) -> Result<()> {
    if !store.set_favorite(id, favorite).await? {
        return Err(anyhow!("story {} not found", id));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let pool = db::init_pool(&cfg.database_url()).await?;
    db::run_migrations(&pool).await?;
    let store = SqliteStore::new(pool);

    match args.command {
        Command::List { favorites } => {
            let stories = if favorites {
                store.list_favorites().await?
            } else {
                store.list_stories().await?
            };
            if args.json {
                println!("{}", serde_json::to_string_pretty(&stories)?);
            } else {
                stories.iter().for_each(print_row);
            }
        }
        Command::Show { id } => {
            let story = store
                .get_story(id)
                .await?
                .ok_or_else(|| anyhow!("story {} not found", id))?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&story)?);
            } else {
                print_row(&story);
                if let Some(category) = &story.category {
                    println!("category: {}", category);
                }
                if let Some(url) = &story.image_url {
                    println!("image: {}", url);
                }
                println!();
                println!("{}", story.body);
            }
        }
        Command::Favorite { id } => set_favorite(&store, id, true).await?,
        Command::Unfavorite { id } => set_favorite(&store, id, false).await?,
        Command::Status => {
            let state = store.sync_state().await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&state)?);
            } else {
                println!("{} (since {})", state.status, state.updated_at.to_rfc3339());
            }
        }
        Command::Grid => {
            let stories = store.list_stories().await?;
            let layout: FeedLayout = cfg.layout.into();
            for position in 0..layout.slot_count(stories.len()) {
                match layout.slot(position) {
                    Slot::Story(i) => println!("{:>4}  story {}", position, stories[i].id),
                    Slot::Filler => println!("{:>4}  -", position),
                }
            }
        }
    }

    Ok(())
}
