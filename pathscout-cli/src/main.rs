use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use pathscout::{
    find_all, CliOverrides, FindError, FindKind, FinderConfig, LocalFs, LookupReport, PathFinder,
    SearchContext, SearchRequest,
};
use std::{num::NonZeroUsize, path::PathBuf, process};
use tracing::debug;
use tracing_subscriber::EnvFilter;

type Result<T> = std::result::Result<T, FindError>;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file, applied over the global and local ones
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG overrides it
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Number of threads used when looking up several names
    #[arg(short = 'j', long, global = true)]
    threads: Option<NonZeroUsize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find files along the search path
    Find {
        /// Names to look for
        #[arg(required = true)]
        names: Vec<String>,

        /// Search path, e.g. ".,/usr/include,src/**"
        #[arg(short, long)]
        path: Option<String>,

        /// Suffix tried when the bare name does not exist (repeatable)
        #[arg(short, long)]
        suffix: Vec<String>,

        /// Report every match instead of the first
        #[arg(short, long)]
        all: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Find a directory along the cd path
    Cd {
        /// Directory name to look for
        name: String,

        /// Directories to look in
        #[arg(long)]
        cdpath: Option<String>,

        /// Report every match instead of the first
        #[arg(short, long)]
        all: bool,
    },

    /// List the tags files in effect
    Tags {
        /// Tags option, e.g. "./tags;,tags"
        #[arg(long)]
        tags: Option<String>,

        /// File that "./" entries are relative to
        #[arg(long)]
        relative_to: Option<PathBuf>,
    },

    /// Run a single search from a root pattern
    Search {
        /// Root pattern, e.g. "/src/**2/include"
        #[arg(short, long)]
        root: String,

        /// Name to look for below each matching directory
        #[arg(short, long)]
        name: String,

        /// ";"-separated stop directories; enables upward search
        #[arg(long)]
        stop: Option<String>,

        /// Maximum descent depth
        #[arg(long)]
        level: Option<i32>,

        /// What a match may be
        #[arg(long, value_enum, default_value = "any")]
        kind: KindArg,

        /// Don't try alternate suffixes
        #[arg(long)]
        tag_mode: bool,

        /// File that a "./" root is relative to
        #[arg(long)]
        relative_to: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    File,
    Dir,
    Any,
}

impl From<KindArg> for FindKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::File => FindKind::File,
            KindArg::Dir => FindKind::Directory,
            KindArg::Any => FindKind::Either,
        }
    }
}

fn main() -> Result<()> {
    if !run()? {
        process::exit(1);
    }
    Ok(())
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Returns false when something asked for was not found.
fn run() -> Result<bool> {
    let cli = Cli::parse();

    let mut overrides = CliOverrides {
        thread_count: cli.threads,
        log_level: cli.log_level,
        ..CliOverrides::default()
    };
    match &cli.command {
        Commands::Find { path, suffix, .. } => {
            overrides.path = path.clone();
            overrides.suffixes = suffix.clone();
        }
        Commands::Cd { cdpath, .. } => overrides.cdpath = cdpath.clone(),
        Commands::Tags { tags, .. } => overrides.tags = tags.clone(),
        Commands::Search { level, .. } => overrides.max_level = *level,
    }

    let config = FinderConfig::load_from(cli.config.as_deref())?.merge_with_cli(overrides);
    init_logging(&config.log_level);
    debug!("Effective configuration: {:?}", config);
    let oracle = LocalFs::with_ignore_case(config.ignore_case);

    match cli.command {
        Commands::Find {
            names, all, json, ..
        } => {
            let report = find_all(&oracle, &names, &config, FindKind::Either, all)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report, names.len() > 1);
            }
            Ok(report.names_found == report.names_searched)
        }
        Commands::Cd { name, all, .. } => {
            let finder = PathFinder::find_directory(oracle, name.as_str(), &config);
            let found: Vec<_> = if all {
                finder.collect()
            } else {
                finder.take(1).collect()
            };
            if found.is_empty() {
                eprintln!(
                    "{}",
                    format!("Can't find directory \"{}\" in cdpath", name).red()
                );
                return Ok(false);
            }
            for path in found {
                println!("{}", path.display());
            }
            Ok(true)
        }
        Commands::Tags { relative_to, .. } => {
            let mut finder = PathFinder::tag_files(oracle, &config);
            if let Some(file) = relative_to {
                finder = finder.relative_to(file);
            }
            let mut any = false;
            for path in finder {
                println!("{}", path.display());
                any = true;
            }
            if !any {
                eprintln!("{}", "No tags file".yellow());
            }
            Ok(any)
        }
        Commands::Search {
            root,
            name,
            stop,
            kind,
            tag_mode,
            relative_to,
            ..
        } => {
            let mut request = SearchRequest::new(root, name)
                .with_max_level(config.max_level)
                .with_kind(kind.into())
                .with_tag_mode(tag_mode)
                .with_suffixes(config.suffixes.clone())
                .with_ignore_case(config.ignore_case);
            request.stop_dirs = stop;
            request.relative_to = relative_to;

            let mut ctx = SearchContext::init(oracle, request, None)?;
            let mut count = 0;
            while let Some(path) = ctx.step() {
                println!("{}", path.display());
                count += 1;
            }
            ctx.metrics().log_stats();
            ctx.cleanup();
            Ok(count > 0)
        }
    }
}

fn print_report(report: &LookupReport, with_names: bool) {
    for result in &report.results {
        if !result.is_found() {
            eprintln!(
                "{}",
                format!("Can't find file \"{}\" in path", result.name).red()
            );
            continue;
        }
        if with_names {
            println!("{}", result.name.blue());
        }
        for path in &result.matches {
            if with_names {
                println!("  {}", path.display());
            } else {
                println!("{}", path.display());
            }
        }
    }

    if with_names {
        println!(
            "\nFound {} of {} names ({} matches)",
            report.names_found.to_string().green(),
            report.names_searched,
            report.total_matches
        );
    }
}
