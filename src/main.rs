//! Command line front end: encode JSON series, decode buffers, inspect headers.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use gorilla_stream::input::{samples_from_json, samples_to_json};
use gorilla_stream::{checksum, Decoder, EncodeOptions, Encoder, OuterHeader, ScaleDecimals};

#[derive(Parser)]
#[command(name = "gorilla-stream", version)]
#[command(about = "Compress and decompress time series in the Gorilla stream format")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Encode a JSON array of [timestamp, value] pairs
    Encode {
        /// Input JSON file
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for the encoded buffer
        #[arg(short, long)]
        output: PathBuf,

        /// Enable value preprocessing (scaling)
        #[arg(long)]
        victoria_metrics: bool,

        /// Treat the series as a monotonic counter
        #[arg(long)]
        counter: bool,

        /// Decimal places to scale by: "auto" or an integer
        #[arg(long)]
        scale: Option<ScaleDecimals>,

        /// Options as a JSON object; flags given on the command line win
        #[arg(long)]
        options: Option<String>,
    },
    /// Decode a buffer back into JSON pairs
    Decode {
        /// Encoded input file
        #[arg(short, long)]
        input: PathBuf,

        /// Output JSON file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the outer header of an encoded buffer
    Inspect {
        /// Encoded input file
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match Cli::parse().command {
        Command::Encode {
            input,
            output,
            victoria_metrics,
            counter,
            scale,
            options,
        } => {
            let mut opts = match options {
                Some(json) => EncodeOptions::from_json(&json)?,
                None => EncodeOptions::default(),
            };
            opts.victoria_metrics |= victoria_metrics;
            opts.is_counter |= counter;
            if let Some(scale) = scale {
                opts.scale_decimals = scale;
            }
            encode_file(&input, &output, opts)
        }
        Command::Decode { input, output } => decode_file(&input, output.as_deref()),
        Command::Inspect { input } => inspect_file(&input),
    }
}

fn encode_file(input: &Path, output: &Path, opts: EncodeOptions) -> Result<()> {
    let text = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let samples = samples_from_json(&text)
        .with_context(|| format!("invalid series in {}", input.display()))?;

    let bytes = Encoder::new(opts).encode(&samples)?;
    fs::write(output, &bytes).with_context(|| format!("failed to write {}", output.display()))?;

    info!(
        "wrote {} samples as {} bytes to {}",
        samples.len(),
        bytes.len(),
        output.display()
    );
    Ok(())
}

fn decode_file(input: &Path, output: Option<&Path>) -> Result<()> {
    let bytes =
        fs::read(input).with_context(|| format!("failed to read {}", input.display()))?;
    let decoded = Decoder::decode_with_report(&bytes)?;
    let json = samples_to_json(&decoded.samples)?;

    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{json}")?;
        }
    }
    if !decoded.is_clean() {
        eprintln!(
            "{}: decoded with {} integrity warning(s)",
            input.display(),
            decoded.warnings.len()
        );
    }
    info!("decoded {} samples", decoded.samples.len());
    Ok(())
}

fn inspect_file(input: &Path) -> Result<()> {
    let bytes =
        fs::read(input).with_context(|| format!("failed to read {}", input.display()))?;
    let header = OuterHeader::parse(&bytes)?;
    let computed = checksum(header.payload(&bytes));

    let mut report = serde_json::to_value(&header)?;
    if let Some(fields) = report.as_object_mut() {
        fields.insert("header_size".into(), header.header_size().into());
        fields.insert("checksum_ok".into(), (computed == header.checksum).into());
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
