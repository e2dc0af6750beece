//! draftflow-inspect: validate and summarise a transport snapshot.
//!
//! Reads a conversation state in transport JSON from the file named by the
//! first argument, or from stdin when no argument (or `-`) is given, and
//! prints a summary. Exits non-zero if the snapshot does not decode.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: log filter (default: "info")

use std::io::Read;

use anyhow::Context;
use draftflow::state::{decode_str, StateSummary};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let source = std::env::args().nth(1).filter(|arg| arg != "-");
    let payload = match &source {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("reading {}", path))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("reading stdin")?;
            buffer
        }
    };

    let state = decode_str(&payload)
        .with_context(|| format!("decoding {}", source.as_deref().unwrap_or("stdin")))?;
    log::debug!("Decoded draftflow {} snapshot", draftflow::VERSION);

    print!("{}", StateSummary::of(&state));
    Ok(())
}
