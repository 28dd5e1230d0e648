use blogsmith::render::Pipeline;
use blogsmith::site::{self, BuildMode, BuildOptions};
use blogsmith::{config, emit, output};
use clap::builder::BoolishValueParser;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "blogsmith")]
#[command(about = "Content build pipeline for markdown blogs")]
#[command(long_about = "\
Content build pipeline for markdown blogs

Posts and author profiles are markdown files with YAML front-matter. Every
document is validated, rendered, and enriched with computed fields; the build
then writes a tag index and a search index for the site to consume.

Project structure:

  my-blog/
  ├── config.toml                  # Site config (optional)
  ├── data/
  │   ├── blog/                    # Posts (.md / .mdx, nested folders allowed)
  │   │   ├── hello-world.mdx      # slug: hello-world
  │   │   └── series/part-one.mdx  # slug: series/part-one
  │   ├── authors/                 # Author profiles
  │   │   └── default.mdx
  │   └── references-data.json     # CSL-JSON bibliography (optional)
  ├── public/                      # Static files; search index written here
  └── app/tag-data.json            # Tag counts, written by the build

Required front-matter:
  Posts:   title, date
  Authors: name

Run 'blogsmith gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Project root
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Show per-document progress (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Flags shared by every command that loads documents.
#[derive(clap::Args, Clone)]
struct SiteArgs {
    /// Exclude drafts from published artifacts
    #[arg(long, env = "BLOGSMITH_PRODUCTION", value_parser = BoolishValueParser::new())]
    production: bool,

    /// Serve the site from a sub-path (overrides `base_path` in config.toml)
    #[arg(long, env = "BASE_PATH")]
    base_path: Option<String>,
}

impl SiteArgs {
    fn options(&self) -> BuildOptions {
        BuildOptions {
            mode: if self.production {
                BuildMode::Production
            } else {
                BuildMode::Development
            },
            base_path: self.base_path.clone().filter(|p| !p.is_empty()),
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Load every document and write the tag and search indices
    Build(SiteArgs),
    /// Validate every document without writing anything
    Check(SiteArgs),
    /// Print the tag index without writing it
    Tags(SiteArgs),
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    match cli.command {
        Command::Build(args) => {
            println!("==> Building {}", cli.root.display());
            let report = site::build(&cli.root, &args.options())?;
            output::print_build_output(&report, &cli.root);
        }
        Command::Check(args) => {
            println!("==> Checking {}", cli.root.display());
            let (site_config, registry) = site::load(&cli.root, &args.options())?;
            let pipeline = Pipeline::standard(&site_config.markdown)?;
            output::print_check_output(&registry, &pipeline.stage_ids());
            println!("==> Content is valid");
        }
        Command::Tags(args) => {
            let options = args.options();
            let (_, registry) = site::load(&cli.root, &options)?;
            let index = emit::tag_counts(registry.posts(), options.mode.is_production());
            output::print_tag_index(&index);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Install the stderr diagnostics subscriber. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let default_level = if verbose {
        LevelFilter::INFO
    } else {
        LevelFilter::WARN
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()?;
    Ok(())
}
