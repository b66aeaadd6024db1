use clap::Parser;
use notelens_context::chunk::{ChunkingConfig, chunk_text};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};

/// A CLI tool to chunk text into overlapping windows as JSON output.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input text file. If not provided, reads from stdin.
    #[arg(short, long)]
    input: Option<String>,

    /// Window length in characters.
    #[arg(short, long, default_value_t = 700)]
    chunk_size: usize,

    /// Characters shared between consecutive windows.
    #[arg(short, long, default_value_t = 100)]
    overlap: usize,
}

#[derive(Serialize)]
struct ChunkRecord<'a> {
    sequence: usize,
    length: usize,
    text: &'a str,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let text = if let Some(input_path) = args.input {
        fs::read_to_string(input_path)?
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    };

    let config = ChunkingConfig::new(args.chunk_size, args.overlap);
    let chunks = chunk_text(&text, &config)?;

    let records: Vec<ChunkRecord> = chunks
        .iter()
        .enumerate()
        .map(|(sequence, text)| ChunkRecord {
            sequence,
            length: text.len(),
            text,
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}
