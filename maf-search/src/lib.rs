pub use crate::capability::{BigBedFeature, BigBedQuery, CompressedFileReader, TabixQuery, TabixRow};
pub use crate::cache::ChunkCache;
pub use crate::codec::PackedSeq;
pub use crate::error::{MafError, Result};
pub use crate::fasta::{materialize as materialize_fasta, FastaOptions};
pub use crate::model::{visible_rows, AlignmentBlock, Row, Strand};
pub use crate::query::{BigMafSource, MafBlockSource, MafTabixSource, Region, TafSource};
pub use crate::render::{ColumnKind, PixelSpan, RenderState};
pub use crate::status::StatusCallback;
pub use crate::tai::TaiIndex;

pub mod bigmaf;
pub mod cache;
pub mod capability;
pub mod codec;
pub mod error;
pub mod fasta;
pub mod instructions;
pub mod maftabix;
pub mod model;
pub mod names;
pub mod query;
pub mod render;
pub mod status;
pub mod taf;
pub mod tai;
