use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;

mod decode;
mod encode;

#[derive(Debug, Parser)]
#[command(
    name = "nafpack",
    version,
    about = "Encode and decode Nucleotide Archive Format (NAF) files"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compress FASTA/FASTQ input into a NAF archive
    Encode(encode::EncodeArgs),
    /// Extract data from a NAF archive
    Decode(decode::DecodeArgs),
}

/// Removes a partially written output file unless disarmed.
struct OutputGuard {
    path: PathBuf,
    armed: bool,
}

impl OutputGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for OutputGuard {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::error!("can't remove incomplete output file {:?}: {}", self.path, e);
                }
            }
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_target(false)
        .format_timestamp(None)
        .init();

    let args = Args::parse();
    let result = match args.command {
        Command::Encode(args) => encode::run(&args),
        Command::Decode(args) => decode::run(&args),
    };

    if let Err(e) = result {
        eprintln!("nafpack error: {}", e);
        std::process::exit(1);
    }
}
