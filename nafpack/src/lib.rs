#![doc = include_str!("../README.md")]

mod decoder;
mod encoder;

pub mod data;
pub mod error;
pub mod fastx;

cfg_if::cfg_if! {
    if #[cfg(feature = "arc")] {
        pub(crate) use std::sync::Arc as Rc;
    } else {
        pub(crate) use std::rc::Rc;
    }
}

pub use self::data::Flag;
pub use self::data::Flags;
pub use self::data::FormatVersion;
pub use self::data::Header;
pub use self::data::MaskUnit;
pub use self::data::Record;
pub use self::data::SectionSize;
pub use self::data::SequenceType;
pub use self::decoder::projection::Projection;
pub use self::decoder::projection::ProjectionWriter;
pub use self::decoder::Decoder;
pub use self::decoder::DecoderBuilder;
pub use self::encoder::storage::Memory;
pub use self::encoder::storage::SpillDir;
pub use self::encoder::storage::Storage;
pub use self::encoder::Encoder;
pub use self::encoder::EncoderBuilder;
pub use self::error::Error;
