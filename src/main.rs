//! Command line front end of the API reference compiler.

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;

use apidoc_ultra::config::{parse_module, parse_root, ApiConfig};
use apidoc_ultra::loader::{gen_api, load_docstrings};

#[derive(Parser)]
#[command(name = "apidoc-ultra")]
#[command(version)]
#[command(about = "Compile the public API of Python modules into Markdown references")]
struct Cli {
    /// Modules to load, as MODULE=PATH
    #[arg(value_name = "MODULE=PATH")]
    modules: Vec<String>,

    /// Documents to generate, as TITLE=ROOT or ROOT (repeatable)
    #[arg(short, long = "root", value_name = "TITLE=ROOT")]
    roots: Vec<String>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Heading level of document titles
    #[arg(long)]
    level: Option<usize>,

    /// Emit a table of contents
    #[arg(long)]
    toc: bool,

    /// Do not emit heading anchors
    #[arg(long)]
    no_link: bool,

    /// Print documents instead of writing them
    #[arg(long)]
    dry: bool,

    /// JSON map of full dotted names to docstrings
    #[arg(long, value_name = "FILE")]
    docstrings: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Command line values take precedence over the configuration.
    fn apply(&self, config: &mut ApiConfig) -> Result<()> {
        if let Some(dir) = &self.dir {
            config.dir = dir.clone();
        }
        if let Some(level) = self.level {
            config.level = level;
        }
        config.toc |= self.toc;
        config.link &= !self.no_link;
        config.dry |= self.dry;
        for root in &self.roots {
            config.roots.push(parse_root(root)?);
        }
        for module in &self.modules {
            config.modules.push(parse_module(module)?);
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let mut config = ApiConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config)?;

    let docstrings = cli.docstrings.as_deref().map(load_docstrings).transpose()?;
    let docs = gen_api(&config, docstrings.as_ref())?;
    if config.dry {
        for doc in docs {
            println!("{}", "=".repeat(12));
            print!("{}", doc);
        }
    }
    Ok(())
}
