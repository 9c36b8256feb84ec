use anyhow::{anyhow, Context};
use clap::{crate_version, App, Arg};
use log::{debug, error, info};
use sitegen::build::{build_site, current_year, Error as BuildError, Summary};
use sitegen::config::{Config, Overrides};
use sitegen::readtime::WordCountMode;
use std::path::Path;
use std::process;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = App::new("sitegen")
        .version(crate_version!())
        .about("Builds HTML pages and a home page index from Markdown posts")
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .takes_value(true)
                .help("Project file to use instead of searching for sitegen.yaml"),
        )
        .arg(
            Arg::with_name("threads")
                .short("j")
                .long("threads")
                .value_name("N")
                .takes_value(true)
                .help("Number of threads used to parse posts (default: number of CPUs)"),
        )
        .arg(
            Arg::with_name("word-count")
                .long("word-count")
                .value_name("MODE")
                .takes_value(true)
                .possible_values(&["rendered", "source"])
                .help("What counts as a word: tokens of the rendered HTML or prose of the Markdown source"),
        )
        .arg(
            Arg::with_name("keep-going")
                .short("k")
                .long("keep-going")
                .help("Skip posts that fail instead of aborting; exits non-zero if any were skipped"),
        )
        .arg(
            Arg::with_name("strict")
                .long("strict")
                .help("Reject posts with a missing or blank title, date, or author"),
        )
        .get_matches();

    let threads = match matches.value_of("threads") {
        None => None,
        Some(threads) => Some(
            threads
                .parse::<usize>()
                .with_context(|| format!("Invalid thread count `{}`", threads))?,
        ),
    };
    let word_count = match matches.value_of("word-count") {
        None => None,
        Some(mode) => Some(mode.parse::<WordCountMode>().map_err(|err| anyhow!(err))?),
    };
    let overrides = Overrides {
        threads,
        word_count,
        keep_going: matches.is_present("keep-going"),
        strict_frontmatter: matches.is_present("strict"),
    };

    let config = match matches.value_of("config") {
        Some(path) => Config::from_project_file(Path::new(path), &overrides)?,
        None => Config::from_directory(&std::env::current_dir()?, &overrides)?,
    };
    debug!("{:#?}", config);

    if !report(build_site(&config, current_year())) {
        process::exit(1);
    }
    Ok(())
}

/// Logs the outcome of a build. Returns `false` if the build aborted or any
/// post was skipped.
fn report(result: Result<Summary, BuildError>) -> bool {
    let summary = match result {
        Ok(summary) => summary,
        Err(err) => {
            error!("{}", err);
            return false;
        }
    };
    for failure in &summary.failures {
        error!("{}: {}", failure.path.display(), failure.error);
    }
    if !summary.failures.is_empty() {
        error!(
            "{} of {} posts failed",
            summary.failures.len(),
            summary.failures.len() + summary.posts_written
        );
        return false;
    }

    info!("built {} posts", summary.posts_written);
    true
}
