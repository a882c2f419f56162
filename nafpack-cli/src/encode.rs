use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::io::BufWriter;
use std::path::PathBuf;

use clap::Parser;
use clap::ValueEnum;

use nafpack::fastx::FastxReaderBuilder;
use nafpack::fastx::InputFormat;
use nafpack::EncoderBuilder;
use nafpack::Error;
use nafpack::SequenceType;
use nafpack::SpillDir;

use crate::OutputGuard;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Fasta,
    Fastq,
}

impl From<FormatArg> for InputFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Fasta => InputFormat::Fasta,
            FormatArg::Fastq => InputFormat::Fastq,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SequenceTypeArg {
    Dna,
    Rna,
    Protein,
    Text,
}

impl From<SequenceTypeArg> for SequenceType {
    fn from(ty: SequenceTypeArg) -> Self {
        match ty {
            SequenceTypeArg::Dna => SequenceType::Dna,
            SequenceTypeArg::Rna => SequenceType::Rna,
            SequenceTypeArg::Protein => SequenceType::Protein,
            SequenceTypeArg::Text => SequenceType::Text,
        }
    }
}

impl std::fmt::Display for SequenceTypeArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SequenceTypeArg::Dna => f.write_str("dna"),
            SequenceTypeArg::Rna => f.write_str("rna"),
            SequenceTypeArg::Protein => f.write_str("protein"),
            SequenceTypeArg::Text => f.write_str("text"),
        }
    }
}

#[derive(Debug, Parser)]
pub struct EncodeArgs {
    /// Write the archive to FILE instead of standard output
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
    /// Use zstd compression level N
    #[arg(short = 'l', long, value_name = "N", default_value_t = 1)]
    level: i32,
    /// Use a 2^N window with long-distance matching for the sequence stream
    #[arg(long, value_name = "N")]
    long: Option<u32>,
    /// Use DIR as temporary directory
    #[arg(long, value_name = "DIR", env = "TMPDIR")]
    temp_dir: Option<PathBuf>,
    /// Use NAME as prefix for temporary files
    #[arg(long, value_name = "NAME")]
    name: Option<String>,
    /// Store TITLE as dataset title
    #[arg(long, value_name = "TITLE")]
    title: Option<String>,
    /// Input file format (detected from the input when omitted)
    #[arg(short, long, value_name = "FORMAT", value_enum)]
    format: Option<FormatArg>,
    /// Input sequence type
    #[arg(short, long, value_name = "SEQTYPE", value_enum, default_value_t = SequenceTypeArg::Dna)]
    sequence: SequenceTypeArg,
    /// Fail on unexpected input characters
    #[arg(long)]
    strict: bool,
    /// Assume well-formed input and skip validation
    #[arg(long)]
    well_formed: bool,
    /// Override the stored line length to N
    #[arg(long, value_name = "N")]
    line_length: Option<u64>,
    /// Keep temporary files
    #[arg(long)]
    keep_temp_files: bool,
    /// Don't store the soft mask
    #[arg(long)]
    no_mask: bool,
    /// Input file (standard input if not specified)
    #[arg(value_name = "FILE")]
    filename: Option<PathBuf>,
}

pub fn run(args: &EncodeArgs) -> Result<(), Error> {
    if args.no_mask && args.sequence == SequenceTypeArg::Text {
        return Err(Error::InvalidConfig("'--no-mask' is meaningless for text input"));
    }

    let temp_dir = args
        .temp_dir
        .clone()
        .or_else(|| std::env::var_os("TMP").map(PathBuf::from))
        .ok_or(Error::InvalidConfig(
            "temporary directory is not specified; set TMPDIR or TMP, or pass --temp-dir",
        ))?;
    log::debug!("using temporary directory {:?}", temp_dir);

    let prefix = temp_prefix(args);
    log::debug!("temporary file prefix: {:?}", prefix);

    let input: Box<dyn BufRead> = match &args.filename {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(std::io::stdin().lock()),
    };

    let sequence_type = SequenceType::from(args.sequence);
    let mut parser_builder = FastxReaderBuilder::new(sequence_type);
    if let Some(format) = args.format {
        parser_builder.format(format.into());
    }
    parser_builder
        .strict(args.strict)
        .well_formed(args.well_formed);
    let mut parser = parser_builder.with_reader(input)?;

    if let Some(extension) = args.filename.as_ref().and_then(InputFormat::from_path) {
        if extension != parser.format() {
            log::warn!("input file extension does not match its actual format");
        }
    }

    let mut builder = EncoderBuilder::new(sequence_type);
    builder
        .id(true)
        .comment(true)
        .sequence(true)
        .quality(parser.format() == InputFormat::Fastq)
        .mask(!args.no_mask)
        .compression_level(args.level);
    if let Some(log2) = args.long {
        builder.window_log(log2);
    }
    if let Some(title) = &args.title {
        builder.title(title.clone());
    }

    let storage = SpillDir::new(&temp_dir, prefix)?.keep_files(args.keep_temp_files);
    let mut encoder = builder.with_storage(storage)?;

    for record in &mut parser {
        encoder.push(&record?)?;
    }
    encoder.set_line_length(args.line_length.unwrap_or_else(|| parser.longest_line()));

    match &args.output {
        Some(path) => {
            let mut guard = OutputGuard::new(path.clone());
            let file = File::create(path)?;
            encoder.write(BufWriter::new(file))?;
            guard.disarm();
        }
        None => {
            let stdout = std::io::stdout();
            encoder.write(BufWriter::new(stdout.lock()))?;
        }
    }

    if !args.well_formed {
        parser.stats().log_report(sequence_type);
    }
    log::debug!("processed {} sequences", parser.n_records());
    Ok(())
}

/// Temporary file prefix: dataset name, else input basename, else a
/// process-unique fallback.
fn temp_prefix(args: &EncodeArgs) -> String {
    if let Some(name) = &args.name {
        return name.clone();
    }
    if let Some(basename) = args
        .filename
        .as_ref()
        .and_then(|path| path.file_name())
        .and_then(|name| name.to_str())
    {
        return basename.to_string();
    }
    let salt = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.subsec_nanos() & 0x7FFF_FFFF)
        .unwrap_or(0);
    format!("{}-{}", std::process::id(), salt)
}
