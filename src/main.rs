use anyhow::bail;
use clap::Parser;
use log::*;
use std::path::PathBuf;

use newsroom::{article, Config, Result, Site};

#[derive(Parser, Debug)]
#[command(name = "newsroom", about = "Build a static site from a JSON list of articles")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Parser, Debug)]
enum Command {
    /// Render every page, the feed, and the stylesheet into the output directory
    Build {
        #[arg(long = "root", default_value = ".")]
        root: String,
        /// Extra config file, applied on top of <root>/config.toml
        #[arg(long = "config")]
        config: Option<String>,
        /// Output directory. Defaults to `output_dir` from the config
        #[arg(long = "out")]
        out: Option<String>,
        /// Article data file, relative to the root. Defaults to `data_file` from the config
        #[arg(long = "data")]
        data: Option<String>,
        /// Timestamp used for the feed and for articles without a date
        #[arg(long = "build-time")]
        build_time: Option<String>,
    },
}

fn run(cli: Cli) -> Result<()> {
    match cli.cmd {
        Command::Build {
            root,
            config,
            out,
            data,
            build_time,
        } => {
            let root = PathBuf::from(root);
            let config = {
                let mut default_config = Config::read_if_exists(root.join("config.toml"))?;
                if let Some(config) = config.as_ref() {
                    default_config.extend(&mut Config::read(config)?);
                }
                if let Some(data) = data {
                    default_config.set("data_file", data);
                }
                default_config
            };
            let build_time = match build_time {
                Some(s) => match article::parse_timestamp(&s) {
                    Some(t) => t,
                    None => bail!("invalid --build-time: {}", s),
                },
                None => chrono::Utc::now(),
            };
            let site = Site::new(config, root, out.map(PathBuf::from), build_time);
            site.build()
        }
    }
}

fn main() {
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(LevelFilter::Info);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();

    if let Err(e) = run(Cli::parse()) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
