use std::fs::File;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Cursor;
use std::io::Read;
use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use clap::ValueEnum;

use nafpack::DecoderBuilder;
use nafpack::Error;
use nafpack::Flag;
use nafpack::Flags;
use nafpack::Projection;
use nafpack::ProjectionWriter;

use crate::OutputGuard;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputKind {
    /// File format and version
    Format,
    /// List of archive sections
    PartList,
    /// Section sizes
    Sizes,
    /// Number of records
    Number,
    /// Dataset title
    Title,
    /// Record identifiers
    Ids,
    /// Full record names
    Names,
    /// Sequence lengths
    Lengths,
    /// Sum of sequence lengths
    TotalLength,
    /// Mask region lengths
    Mask,
    /// Total number of masked positions
    TotalMaskLength,
    /// 4-bit packed sequence stream (binary)
    #[value(name = "4bit")]
    FourBit,
    /// All sequences concatenated
    Seq,
    /// Sequences, one per line
    Sequences,
    /// Sequence character counts
    Charcount,
    /// Concatenated sequences, mask ignored
    Dna,
    /// Concatenated sequences, masked
    MaskedDna,
    /// FASTA output
    Fasta,
    /// FASTQ output
    Fastq,
}

impl From<OutputKind> for Projection {
    fn from(kind: OutputKind) -> Self {
        match kind {
            OutputKind::Format => Projection::Format,
            OutputKind::PartList => Projection::PartList,
            OutputKind::Sizes => Projection::Sizes,
            OutputKind::Number => Projection::Number,
            OutputKind::Title => Projection::Title,
            OutputKind::Ids => Projection::Ids,
            OutputKind::Names => Projection::Names,
            OutputKind::Lengths => Projection::Lengths,
            OutputKind::TotalLength => Projection::TotalLength,
            OutputKind::Mask => Projection::Mask,
            OutputKind::TotalMaskLength => Projection::TotalMaskLength,
            OutputKind::FourBit => Projection::FourBit,
            OutputKind::Seq => Projection::Seq,
            OutputKind::Sequences => Projection::Sequences,
            OutputKind::Charcount => Projection::CharCount,
            OutputKind::Dna => Projection::Dna,
            OutputKind::MaskedDna => Projection::MaskedDna,
            OutputKind::Fasta => Projection::Fasta,
            OutputKind::Fastq => Projection::Fastq,
        }
    }
}

#[derive(Debug, Parser)]
pub struct DecodeArgs {
    /// Write output to FILE instead of standard output
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
    /// Output type (default: fastq for archives with quality, else fasta)
    #[arg(short = 't', long = "type", value_name = "TYPE", value_enum)]
    output_type: Option<OutputKind>,
    /// Override line length to N for FASTA output (0 disables wrapping)
    #[arg(long, value_name = "N")]
    line_length: Option<u64>,
    /// Ignore the stored mask
    #[arg(long)]
    no_mask: bool,
    /// Input archive (standard input if not specified)
    #[arg(value_name = "FILE")]
    filename: Option<PathBuf>,
}

enum Input {
    File(PathBuf),
    // standard input is not seekable, so it is slurped up front
    Bytes(Vec<u8>),
}

pub fn run(args: &DecodeArgs) -> Result<(), Error> {
    let input = match &args.filename {
        Some(path) => Input::File(path.clone()),
        None => {
            let mut bytes = Vec::new();
            std::io::stdin().read_to_end(&mut bytes)?;
            Input::Bytes(bytes)
        }
    };

    let kind = match args.output_type {
        Some(kind) => kind,
        None => {
            let flags = read_flags(&input)?;
            if flags.test(Flag::Quality) {
                OutputKind::Fastq
            } else {
                OutputKind::Fasta
            }
        }
    };
    let projection = Projection::from(kind);

    match &args.output {
        Some(path) => {
            let mut guard = OutputGuard::new(path.clone());
            let file = BufWriter::new(File::create(path)?);
            render(args, projection, &input, file)?;
            guard.disarm();
        }
        None => {
            let stdout = std::io::stdout();
            render(args, projection, &input, BufWriter::new(stdout.lock()))?;
        }
    }
    Ok(())
}

/// Read just the archive header to pick the default output type.
fn read_flags(input: &Input) -> Result<Flags, Error> {
    let builder = DecoderBuilder::from_flags(Flags::new());
    let flags = match input {
        Input::File(path) => builder.with_path(path)?.header().flags(),
        Input::Bytes(bytes) => builder.with_bytes(bytes)?.header().flags(),
    };
    Ok(flags)
}

fn render<W: Write>(
    args: &DecodeArgs,
    projection: Projection,
    input: &Input,
    out: W,
) -> Result<(), Error> {
    let mut writer = ProjectionWriter::new(out);
    if let Some(line_length) = args.line_length {
        writer.line_length(line_length);
    }
    writer.mask(!args.no_mask);
    match input {
        Input::File(path) => writer.write(projection, BufReader::new(File::open(path)?)),
        Input::Bytes(bytes) => writer.write(projection, BufReader::new(Cursor::new(&bytes[..]))),
    }
}
