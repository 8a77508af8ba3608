//! Ingests a forum JSON dump into SQLite, scores comments, and builds a
//! trigram Markov model that talks back.

use clap::{Parser, Subcommand};
use eyre::{Context, Result};
use hackerbro::config::{load_file_config, resolve_db_path};
use hackerbro::ingest::ingest_dir;
use hackerbro::markov::generate::{TalkParams, talk};
use hackerbro::markov::model::Model;
use hackerbro::pipeline::run_rank;
use hackerbro::store::Store;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to the SQLite database. Defaults to `hackerbro.db`, or
    /// `db_path` from the config file, in that precedence order.
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Path to a specific configuration file.
    /// Defaults to $XDG_CONFIG_HOME/hackerbro/config.toml if present.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Suppress progress spinners.
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest every regular file in a directory not already recorded.
    Import {
        #[arg(long, value_name = "PATH")]
        dir: PathBuf,
    },
    /// Print story and comment match counts for a full-text query.
    Query {
        #[arg(long, value_name = "TEXT")]
        q: String,
    },
    /// Resolve, score, prune, and write the model artifact.
    Rank {
        #[arg(long, value_name = "PATH")]
        conf: PathBuf,
        #[arg(long, value_name = "TEXT")]
        filter: Option<String>,
        #[arg(long = "comment-limit", value_name = "N", default_value_t = 0)]
        comment_limit: i64,
        #[arg(short, long)]
        verbose: bool,
    },
    /// Print file/story/comment counts.
    Status,
    /// Load the model artifact and emit utterances.
    Talk {
        #[arg(long, value_name = "PATH")]
        conf: PathBuf,
        #[arg(long, default_value_t = 1)]
        count: u32,
        #[arg(long, default_value_t = 3)]
        continuity: u32,
        #[arg(long, default_value_t = 0)]
        stability: u32,
        #[arg(long, value_name = "TEXT", default_value = "")]
        init: String,
        #[arg(long = "rand-init", value_name = "SEED", default_value_t = 0)]
        rand_init: u64,
        #[arg(long = "rand-talk", value_name = "SEED", default_value_t = 0)]
        rand_talk: u64,
        #[arg(short, long)]
        verbose: bool,
    },
}

fn spinner(quiet: bool, message: &str) -> indicatif::ProgressBar {
    if quiet {
        return indicatif::ProgressBar::hidden();
    }
    let bar = indicatif::ProgressBar::new_spinner();
    bar.set_style(
        indicatif::ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let file_cfg = load_file_config(cli.config.as_deref())?;
    let db_path = resolve_db_path(cli.db, &file_cfg);
    let quiet = cli.quiet;

    match cli.command {
        Command::Import { dir } => {
            let mut store = Store::open(&db_path, false)?;
            let bar = spinner(quiet, "importing...");
            let stats = ingest_dir(&mut store, &dir, &bar)?;
            bar.finish_and_clear();
            println!(
                "imported {} file(s), skipped {} already known",
                stats.files_ingested, stats.files_skipped_known
            );
            println!(
                "{} records: {} stories, {} comments, {} jobs, {} polls, {} pollopts",
                stats.total, stats.stories, stats.comments, stats.jobs, stats.polls, stats.poll_opts
            );
            println!(
                "skipped: {} deleted, {} empty title, {} empty kids, {} Ask HN, {} empty text",
                stats.deleted, stats.empty_title, stats.empty_kids, stats.ask_hn, stats.empty_text
            );
        }
        Command::Query { q } => {
            let store = Store::open(&db_path, true)?;
            let stories = store.count_stories_matching(&q)?;
            let comments = store.count_comments_matching(&q)?;
            println!("stories matching {q:?}: {stories}");
            println!("comments matching {q:?}: {comments}");
        }
        Command::Rank {
            conf,
            filter,
            comment_limit,
            verbose,
        } => {
            let mut store = Store::open(&db_path, false)?;
            let bar = spinner(quiet, "ranking...");
            let stats = run_rank(&mut store, filter.as_deref(), comment_limit, &conf)?;
            bar.finish_and_clear();
            println!("wrote model artifact to {}", conf.display());
            if verbose {
                println!(
                    "resolved {} comments ({} orphaned), scored {} ({} scored zero)",
                    stats.resolved, stats.orphaned, stats.scored, stats.zero_scored
                );
                println!("model: {} words, {} keys", stats.words, stats.keys);
            }
        }
        Command::Status => {
            let store = Store::open(&db_path, true)?;
            println!("files: {}", store.known_files()?.len());
            println!("stories: {}", store.story_count()?);
            println!("comments: {}", store.comment_count()?);
        }
        Command::Talk {
            conf,
            count,
            continuity,
            stability,
            init,
            rand_init,
            rand_talk,
            verbose,
        } => {
            let model = Model::read(&conf).wrap_err("failed to load model artifact")?;
            if verbose {
                println!("loaded model: {} words, {} keys", model.words.len(), model.word_keys.len());
            }
            let params = TalkParams {
                continuity,
                stability,
                talk_init: init,
                rand_init,
                rand_talk,
            };
            for utterance in talk(&model, count, &params) {
                println!("{utterance}");
            }
        }
    }

    Ok(())
}
