//! Rendering of archive projections.
//!
//! A [`Projection`] names one of the output kinds an archive can be
//! reduced to, from cheap metadata listings to full FASTA/FASTQ
//! reconstruction. Each projection declares which sections it needs, so
//! the payload of every other section is skipped over, never decompressed.

use std::io::BufRead;
use std::io::Seek;
use std::io::Write;

use crate::data::Flag;
use crate::data::Flags;
use crate::data::FormatVersion;
use crate::data::Record;
use crate::decoder::Decoder;
use crate::decoder::DecoderBuilder;
use crate::error::Error;

/// An output kind renderable from an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// Format name and version.
    Format,
    /// The list of sections present in the archive.
    PartList,
    /// Compressed and original sizes of every section.
    Sizes,
    /// The number of records.
    Number,
    /// The archive title.
    Title,
    /// Record identifiers, one per line.
    Ids,
    /// Full record names (identifier and comment), one per line.
    Names,
    /// Expanded sequence lengths, one per line.
    Lengths,
    /// The total sequence length.
    TotalLength,
    /// Mask run lengths, one per line.
    Mask,
    /// The total number of masked positions.
    TotalMaskLength,
    /// The raw 4-bit packed sequence stream.
    FourBit,
    /// All sequences concatenated, masked, without separators.
    Seq,
    /// Sequences, masked, one per line.
    Sequences,
    /// A tabulation of sequence character counts.
    CharCount,
    /// All sequences concatenated, mask ignored.
    Dna,
    /// All sequences concatenated, masked.
    MaskedDna,
    /// FASTA output.
    Fasta,
    /// FASTQ output.
    Fastq,
}

impl Projection {
    /// The sections this projection needs decoded.
    ///
    /// Sections outside this set are skipped by compressed size; their
    /// payload bytes are never read.
    pub fn flags(&self) -> Flags {
        match self {
            Projection::Format
            | Projection::PartList
            | Projection::Sizes
            | Projection::Number
            | Projection::Title
            | Projection::TotalLength => Flags::new(),
            Projection::Ids => Flags::from(Flag::Id),
            Projection::Names => Flag::Id | Flag::Comment,
            Projection::Lengths => Flags::from(Flag::Length),
            Projection::Mask | Projection::TotalMaskLength => Flags::from(Flag::Mask),
            Projection::FourBit => Flags::from(Flag::Sequence),
            Projection::Seq
            | Projection::Sequences
            | Projection::CharCount
            | Projection::Dna
            | Projection::MaskedDna => Flag::Sequence | Flag::Mask,
            Projection::Fasta => Flag::Id | Flag::Comment | Flag::Sequence | Flag::Mask,
            Projection::Fastq => Flag::Id | Flag::Comment | Flag::Sequence | Flag::Quality,
        }
    }
}

/// A renderer writing archive projections to an output stream.
pub struct ProjectionWriter<W: Write> {
    out: W,
    line_length: Option<u64>,
    mask: bool,
}

impl<W: Write> ProjectionWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            line_length: None,
            mask: true,
        }
    }

    /// Override the line length used to re-wrap FASTA output.
    ///
    /// By default the length stored in the archive header is used;
    /// a length of zero disables wrapping.
    pub fn line_length(&mut self, line_length: u64) -> &mut Self {
        self.line_length = Some(line_length);
        self
    }

    /// Whether to apply the stored soft mask to sequence output.
    pub fn mask(&mut self, mask: bool) -> &mut Self {
        self.mask = mask;
        self
    }

    /// Render `projection` from the archive in `reader`.
    pub fn write<R: BufRead + Seek>(
        &mut self,
        projection: Projection,
        reader: R,
    ) -> Result<(), Error> {
        let mut builder = DecoderBuilder::from_flags(projection.flags());
        match projection {
            Projection::Dna | Projection::Fastq => {
                builder.mask(false);
            }
            Projection::MaskedDna => {
                builder.mask(true);
            }
            Projection::Seq
            | Projection::Sequences
            | Projection::CharCount
            | Projection::Fasta => {
                builder.mask(self.mask);
            }
            _ => {}
        }
        let decoder = builder.with_reader(reader)?;

        // Text and protein sections carry their case in the sequence
        // itself; dropping the mask folds it away, except in FASTQ
        // output which always keeps the stored bytes.
        let fold_text = !self.mask
            && !decoder.sequence_type().is_nucleotide()
            && projection != Projection::Fastq;

        match projection {
            Projection::Format => self.write_format(decoder),
            Projection::PartList => self.write_part_list(decoder),
            Projection::Sizes => self.write_sizes(decoder),
            Projection::Number => self.write_number(decoder),
            Projection::Title => self.write_title(decoder),
            Projection::Ids => self.write_ids(decoder),
            Projection::Names => self.write_names(decoder),
            Projection::Lengths => self.write_lengths(decoder),
            Projection::TotalLength => self.write_total_length(decoder),
            Projection::Mask => self.write_mask(decoder),
            Projection::TotalMaskLength => self.write_total_mask_length(decoder),
            Projection::FourBit => self.write_four_bit(decoder),
            Projection::Seq | Projection::Dna | Projection::MaskedDna => {
                self.write_sequences(decoder, false, fold_text)
            }
            Projection::Sequences => self.write_sequences(decoder, true, fold_text),
            Projection::CharCount => self.write_char_count(decoder, fold_text),
            Projection::Fasta => self.write_fasta(decoder, fold_text),
            Projection::Fastq => self.write_fastq(decoder),
        }
    }

    fn write_format<R: BufRead + Seek>(&mut self, decoder: Decoder<'_, R>) -> Result<(), Error> {
        let header = decoder.header();
        match header.format_version() {
            FormatVersion::V1 => writeln!(self.out, "NAF v.1")?,
            FormatVersion::V2 => writeln!(self.out, "NAF v.2 ({})", header.sequence_type())?,
        }
        Ok(())
    }

    fn write_part_list<R: BufRead + Seek>(&mut self, decoder: Decoder<'_, R>) -> Result<(), Error> {
        let flags = decoder.header().flags();
        let mut printed = false;
        for flag in [
            Flag::Title,
            Flag::Id,
            Flag::Comment,
            Flag::Length,
            Flag::Mask,
            Flag::Sequence,
            Flag::Quality,
        ] {
            if flags.test(flag) {
                if printed {
                    write!(self.out, ", ")?;
                }
                write!(self.out, "{}", flag.section_name())?;
                printed = true;
            }
        }
        writeln!(self.out)?;
        Ok(())
    }

    fn write_sizes<R: BufRead + Seek>(&mut self, decoder: Decoder<'_, R>) -> Result<(), Error> {
        if let Some(title) = decoder.title() {
            writeln!(self.out, "Title: {}", title.len())?;
        }
        for section in decoder.section_sizes() {
            let ratio = if section.original_size > 0 {
                section.compressed_size as f64 / section.original_size as f64 * 100.0
            } else {
                0.0
            };
            writeln!(
                self.out,
                "{}: {} / {} ({:.3}%)",
                section.flag.section_name(),
                section.compressed_size,
                section.original_size,
                ratio
            )?;
        }
        Ok(())
    }

    fn write_number<R: BufRead + Seek>(&mut self, decoder: Decoder<'_, R>) -> Result<(), Error> {
        writeln!(self.out, "{}", decoder.header().number_of_sequences())?;
        Ok(())
    }

    fn write_title<R: BufRead + Seek>(&mut self, decoder: Decoder<'_, R>) -> Result<(), Error> {
        writeln!(self.out, "{}", decoder.title().unwrap_or(""))?;
        Ok(())
    }

    fn write_ids<R: BufRead + Seek>(&mut self, decoder: Decoder<'_, R>) -> Result<(), Error> {
        for record in decoder {
            if let Some(id) = record?.id {
                writeln!(self.out, "{}", id)?;
            }
        }
        Ok(())
    }

    fn write_names<R: BufRead + Seek>(&mut self, decoder: Decoder<'_, R>) -> Result<(), Error> {
        let separator = decoder.header().name_separator();
        for record in decoder {
            let record = record?;
            if record.id.is_none() && record.comment.is_none() {
                continue;
            }
            writeln!(self.out, "{}", format_name(&record, separator))?;
        }
        Ok(())
    }

    fn write_lengths<R: BufRead + Seek>(&mut self, decoder: Decoder<'_, R>) -> Result<(), Error> {
        for record in decoder {
            if let Some(length) = record?.length {
                writeln!(self.out, "{}", length)?;
            }
        }
        Ok(())
    }

    fn write_total_length<R: BufRead + Seek>(
        &mut self,
        decoder: Decoder<'_, R>,
    ) -> Result<(), Error> {
        let total = decoder
            .section_sizes()
            .iter()
            .find(|s| s.flag == Flag::Sequence)
            .map(|s| s.original_size)
            .unwrap_or(0);
        writeln!(self.out, "{}", total)?;
        Ok(())
    }

    fn write_mask<R: BufRead + Seek>(&mut self, mut decoder: Decoder<'_, R>) -> Result<(), Error> {
        if let Some(mask) = decoder.mask.take() {
            for unit in mask {
                writeln!(self.out, "{}", unit?.len())?;
            }
        }
        Ok(())
    }

    fn write_total_mask_length<R: BufRead + Seek>(
        &mut self,
        mut decoder: Decoder<'_, R>,
    ) -> Result<(), Error> {
        let mut total = 0u64;
        if let Some(mask) = decoder.mask.take() {
            for unit in mask {
                let unit = unit?;
                if unit.is_masked() {
                    total += unit.len();
                }
            }
        }
        writeln!(self.out, "{}", total)?;
        Ok(())
    }

    fn write_four_bit<R: BufRead + Seek>(
        &mut self,
        mut decoder: Decoder<'_, R>,
    ) -> Result<(), Error> {
        if let Some(seq) = decoder.seq.take() {
            let mut reader = seq.into_inner();
            std::io::copy(&mut reader, &mut self.out)?;
        }
        Ok(())
    }

    fn write_sequences<R: BufRead + Seek>(
        &mut self,
        decoder: Decoder<'_, R>,
        separate: bool,
        fold_text: bool,
    ) -> Result<(), Error> {
        for record in decoder {
            if let Some(mut sequence) = record?.sequence {
                if fold_text {
                    sequence.to_mut().make_ascii_uppercase();
                }
                self.out.write_all(sequence.as_bytes())?;
                if separate {
                    self.out.write_all(b"\n")?;
                }
            }
        }
        Ok(())
    }

    fn write_char_count<R: BufRead + Seek>(
        &mut self,
        decoder: Decoder<'_, R>,
        fold_text: bool,
    ) -> Result<(), Error> {
        let mut counts = [0u64; 256];
        for record in decoder {
            if let Some(sequence) = record?.sequence {
                for byte in sequence.bytes() {
                    let byte = if fold_text {
                        byte.to_ascii_uppercase()
                    } else {
                        byte
                    };
                    counts[byte as usize] += 1;
                }
            }
        }
        for (byte, &n) in counts.iter().enumerate() {
            if n == 0 {
                continue;
            }
            if (0x21..0x7F).contains(&byte) {
                writeln!(self.out, "{}\t{}", byte as u8 as char, n)?;
            } else {
                writeln!(self.out, "\\x{:02X}\t{}", byte, n)?;
            }
        }
        Ok(())
    }

    fn write_fasta<R: BufRead + Seek>(
        &mut self,
        decoder: Decoder<'_, R>,
        fold_text: bool,
    ) -> Result<(), Error> {
        if !decoder.header().flags().test(Flag::Sequence) {
            return Ok(());
        }
        let line_length = self.line_length.unwrap_or(decoder.header().line_length());
        let separator = decoder.header().name_separator();
        for record in decoder {
            let record = record?;
            writeln!(self.out, ">{}", format_name(&record, separator))?;
            let mut sequence = record.sequence.ok_or(Error::MissingField("sequence"))?;
            if fold_text {
                sequence.to_mut().make_ascii_uppercase();
            }
            if sequence.is_empty() {
                // empty sequences keep just their header line
                continue;
            }
            if line_length == 0 {
                writeln!(self.out, "{}", sequence)?;
            } else {
                for chunk in sequence.as_bytes().chunks(line_length as usize) {
                    self.out.write_all(chunk)?;
                    self.out.write_all(b"\n")?;
                }
            }
        }
        Ok(())
    }

    fn write_fastq<R: BufRead + Seek>(&mut self, decoder: Decoder<'_, R>) -> Result<(), Error> {
        if !decoder.header().flags().test(Flag::Sequence) {
            return Ok(());
        }
        let separator = decoder.header().name_separator();
        for record in decoder {
            let record = record?;
            let sequence = record
                .sequence
                .as_deref()
                .ok_or(Error::MissingField("sequence"))?;
            let quality = record
                .quality
                .as_deref()
                .ok_or(Error::MissingField("quality"))?;
            writeln!(self.out, "@{}", format_name(&record, separator))?;
            writeln!(self.out, "{}", sequence)?;
            writeln!(self.out, "+")?;
            writeln!(self.out, "{}", quality)?;
        }
        Ok(())
    }
}

/// Join identifier and comment with the archive's name separator.
fn format_name(record: &Record<'_>, separator: char) -> String {
    match (record.id.as_deref(), record.comment.as_deref()) {
        (Some(id), Some(comment)) if !comment.is_empty() => {
            format!("{}{}{}", id, separator, comment)
        }
        (Some(id), _) => id.to_string(),
        (None, Some(comment)) => comment.to_string(),
        (None, None) => String::new(),
    }
}
