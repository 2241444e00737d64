use clap::{Parser, Subcommand};
use inkpress::{config, output, site};
use std::path::{Path, PathBuf};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Flags for the avatar cache. Accepted before or after the subcommand.
#[derive(clap::Args, Clone, Default)]
struct CacheArgs {
    /// Ignore the avatar cache: fetch and re-encode unconditionally
    #[arg(long, global = true)]
    no_cache: bool,
}

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "inkpress")]
#[command(about = "Static blog generator with per-page inlined CSS")]
#[command(long_about = "\
Static blog generator with per-page inlined CSS

Site structure:

  site/
  ├── config.toml                  # Optional, see 'inkpress gen-config'
  ├── styles.scss                  # Compiled once, reduced per page
  ├── templates/
  │   ├── post.hbs                 # One page per post
  │   ├── index.hbs                # The post list
  │   └── head.hbs                 # Any template is also a partial: {{> head}}
  └── posts/
      └── 2016-03-09-hello.md      # '# Title', intro, two blank lines, body

Output goes to dist/, the avatar cache to tmp/.")]
#[command(version = version_string())]
struct Cli {
    /// Site root
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(flatten)]
    cache: CacheArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Build every page and the avatar images (default)
    Build,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    if let Err(e) = run(Cli::parse()) {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        None | Some(Command::Build) => build(&cli.root, &cli.cache),
        Some(Command::GenConfig) => {
            print!("{}", config::stock_config_toml());
            Ok(())
        }
    }
}

fn build(root: &Path, cache_args: &CacheArgs) -> Result<(), Box<dyn std::error::Error>> {
    println!("==> Building {}", root.display());
    let summary = site::build(
        root,
        &site::BuildOptions {
            no_cache: cache_args.no_cache,
        },
    )?;
    output::print_build_summary(&summary);
    Ok(())
}
