//! Output formatting: human-readable, JSON, or YAML, selected via `--format`.

use std::io::{self, Write};

use clap::ValueEnum;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable, colorized summary.
    Human,
    /// Pretty-printed JSON, for scripting.
    Json,
    /// YAML, for piping into configuration tooling.
    Yaml,
}

/// Implemented by every CLI result type; `write_human` is the only method
/// that must be hand-written, `write_json`/`write_yaml` fall out of `Serialize`.
pub trait Output: Serialize {
    fn write_human<W: Write>(&self, writer: W) -> anyhow::Result<()>;

    fn write_json<W: Write>(&self, writer: W) -> anyhow::Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    fn write_yaml<W: Write>(&self, writer: W) -> anyhow::Result<()> {
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    fn write<W: Write>(&self, writer: W, format: OutputFormat) -> anyhow::Result<()> {
        match format {
            OutputFormat::Human => self.write_human(writer),
            OutputFormat::Json => self.write_json(writer),
            OutputFormat::Yaml => self.write_yaml(writer),
        }
    }
}

pub fn print<T: Output>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    value.write(io::stdout(), format)?;
    if format != OutputFormat::Human {
        println!();
    }
    Ok(())
}
