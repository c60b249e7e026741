//! orbitgrid: command-line front end for the step sequencer model

mod commands;
mod config;
mod script;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "usage: orbitgrid [--config <path>] <command>

commands:
  quantize <parameter> <value>   snap a raw value to its musical grid
  resize <hits> <length>         resample a hit string (x = hit, . = rest)
  inspect <session.json>         summarize a saved session
  script <file>                  replay an edit script and print the session JSON";

fn main() -> Result<()> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();

    let config_path = match args.iter().position(|a| a == "--config") {
        Some(i) => {
            if i + 1 >= args.len() {
                bail!("--config needs a path\n\n{}", USAGE);
            }
            let path = PathBuf::from(args.remove(i + 1));
            args.remove(i);
            Some(path)
        }
        None => None,
    };
    let config = config::load_config(config_path.as_deref());

    let filter = tracing_subscriber::EnvFilter::from_default_env();
    let filter = match config.logging.filter.parse::<Directive>() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let output = match args.as_slice() {
        ["quantize", parameter, value] => commands::quantize(parameter, value)?,
        ["resize", hits, length] => commands::resize_hits(hits, length)?,
        ["inspect", path] => {
            let session = commands::load_session(Path::new(path))?;
            commands::render_summary(&session)
        }
        ["script", path] => commands::script(Path::new(path), &config)
            .with_context(|| format!("script {} failed", path))?,
        ["help"] | ["--help"] | ["-h"] | [] => USAGE.to_string(),
        _ => bail!("unrecognized arguments\n\n{}", USAGE),
    };
    println!("{}", output.trim_end());
    Ok(())
}
