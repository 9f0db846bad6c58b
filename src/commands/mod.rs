use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

pub mod config;
pub mod stream;

/// Parses a JSON argument, treating `@path` as a file reference and `-` as stdin.
pub(crate) fn parse_json_arg(raw: &str) -> Result<Value> {
    let text = if raw == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read JSON from stdin")?;
        buf
    } else if let Some(path) = raw.strip_prefix('@') {
        fs::read_to_string(Path::new(path))
            .with_context(|| format!("failed to read JSON file {path}"))?
    } else {
        raw.to_string()
    };
    serde_json::from_str(text.trim()).with_context(|| format!("invalid JSON: {}", text.trim()))
}
