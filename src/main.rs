use clap::{Parser, Subcommand};
use humansize::{DECIMAL, format_size};
use mediathek_matcher::{
    Config, MatchedEpisodeInfo, MatcherError, MatchingEngine, MovieMatchResult, MovieMetadata,
    PersistenceError,
};
use std::path::PathBuf;
use std::process;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mediathek-matcher")]
#[command(version)]
#[command(about = "Finds episodes and movies in the MediathekView catalog")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path (defaults to the platform config directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(short = 'v', long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Find catalog entries for episodes of a show
    Episodes {
        /// TVDB id of the show
        #[arg(long)]
        tvdb_id: u32,

        /// Season number, or a year for daily shows
        #[arg(long)]
        season: Option<String>,

        /// Episode number, or MM/DD together with a year season
        #[arg(long)]
        episode: Option<String>,
    },

    /// Find catalog entries for a movie
    Movie {
        /// Localized title
        #[arg(long)]
        title: String,

        /// Original title, if different
        #[arg(long)]
        original_title: Option<String>,

        /// Release year
        #[arg(long)]
        year: Option<i32>,

        /// Runtime in minutes
        #[arg(long)]
        runtime: Option<u32>,
    },

    /// Generate (or show the existing) rule set for a show
    Generate {
        /// TVDB id of the show
        #[arg(long)]
        tvdb_id: u32,
    },

    /// List all catalog topics covered by rule sets
    Topics,
}

fn print_episode_match(index: usize, found: &MatchedEpisodeInfo) {
    let hit = &found.hit;
    println!("Match #{}", index + 1);
    println!(
        "  Episode: {} S{:02}E{:02} - {}",
        found.show_name,
        found.episode.season_number,
        found.episode.episode_number,
        found.episode.name
    );
    println!("  Catalog: [{}] {} - {}", hit.channel, hit.topic, hit.title);
    if let Some(date) = hit.catalog_date() {
        println!("  Published: {}", date);
    }
    println!(
        "  Duration: {} min, Size: {}",
        hit.duration / 60,
        format_size(hit.size, DECIMAL)
    );
    println!("  URL: {}", hit.best_url());
    println!(
        "  Matched by rule set {} on '{}'",
        found.ruleset_id, found.matched_fragment
    );
    println!();
}

fn print_movie_match(index: usize, found: &MovieMatchResult) {
    let hit = &found.hit;
    println!("Match #{} (score {}, {:?})", index + 1, found.score, found.tightness);
    println!("  Catalog: [{}] {} - {}", hit.channel, hit.topic, hit.title);
    match found.runtime_delta {
        Some(delta) => println!("  Duration: {} min ({} min off)", hit.duration / 60, delta),
        None => println!("  Duration: {} min", hit.duration / 60),
    }
    println!("  Size: {}", format_size(hit.size, DECIMAL));
    println!("  URL: {}", hit.best_url());
    println!();
}

async fn run(cli: Cli) -> Result<(), MatcherError> {
    let config = match cli.config.or_else(Config::default_path) {
        Some(path) => {
            debug!(path = %path.display(), "loading configuration");
            Config::load(&path)?
        }
        None => Config::default(),
    };

    let engine = MatchingEngine::from_config(&config)?;

    match cli.command {
        Command::Episodes {
            tvdb_id,
            season,
            episode,
        } => {
            let matches = engine
                .find_episodes(tvdb_id, season.as_deref(), episode.as_deref())
                .await?;

            println!("\n=== Episode Matches ===\n");
            if matches.is_empty() {
                println!("No matches found.");
                return Ok(());
            }
            for (index, found) in matches.iter().enumerate() {
                print_episode_match(index, found);
            }
            println!("Found {} catalog entries.", matches.len());
        }
        Command::Movie {
            title,
            original_title,
            year,
            runtime,
        } => {
            let movie = MovieMetadata {
                title,
                original_title,
                aliases: Vec::new(),
                year,
                runtime,
            };
            let matches = engine.find_movie(&movie).await;

            println!("\n=== Movie Matches ===\n");
            if matches.is_empty() {
                println!("No matches found.");
                return Ok(());
            }
            for (index, found) in matches.iter().enumerate() {
                print_movie_match(index, found);
            }
        }
        Command::Generate { tvdb_id } => match engine.generate_for(tvdb_id).await? {
            Some(ruleset) => {
                let json = serde_json::to_string_pretty(&ruleset).map_err(PersistenceError::from)?;
                println!("{}", json);
            }
            None => {
                eprintln!("Could not generate a rule set for show {}.", tvdb_id);
                process::exit(2);
            }
        },
        Command::Topics => {
            for topic in engine.topics().await? {
                println!("{}", topic);
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging with the specified level; RUST_LOG takes precedence
    let log_filter = format!("mediathek_matcher={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("\nError: {}", e);
        process::exit(1);
    }
}
