//! Read records and the alignment operations that place them on the reference.
//!
//! A [`Read`] caches its aligned and unclipped boundaries and supports the
//! handful of in-place edits (trimming, soft-clip conversion) applied while
//! assemblies are refined.

mod cigar;
mod record;

pub use cigar::{cigar_to_string, parse_cigar, CigarOp, CigarOpKind};
pub use record::{PairRole, Read, ReadError};
