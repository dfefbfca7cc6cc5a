//! # Junction Assembly
//!
//! Local assembly of reads soft-clipped at a candidate structural-variant
//! breakpoint.
//!
//! ## Pipeline
//!
//! 1. **Junction assembly**: seed a consensus from the highest-quality
//!    junction read and merge the remaining reads base by base
//! 2. **Reference expansion**: grow the consensus back over the aligned bases
//!    of its reads
//! 3. **Mismatch splitting**: separate reads that disagree consistently into
//!    sibling assemblies
//! 4. **Reference-side assembly**: extend each final assembly into the
//!    flanking reference for mate support
//!
//! Bases below a configurable quality threshold act as wildcards throughout,
//! so sequencing noise never splits or rejects a read on its own.
//!
//! ## Usage Example
//!
//! ```ignore
//! use junction_assembler::{build_from_junction_reads, AssemblyConfig, Junction, Orientation};
//!
//! let junction = Junction::new("chr1", 1_000, Orientation::Forward);
//! let assembly = build_from_junction_reads(junction, &reads, false, AssemblyConfig::default())?;
//! for sequence in assembly.split_on_mismatches(32) {
//!     println!("{}", sequence.bases_string());
//! }
//! ```

#![warn(missing_docs, missing_debug_implementations)]

pub mod assembly; // Consensus building, splitting and reference extension
pub mod config; // Assembly thresholds
pub mod read; // Read records and CIGAR geometry

// Re-exports for convenience
pub use assembly::{
    build_from_junction_reads, expand_reference_bases, AssemblyError, AssemblyMismatchSplitter,
    Junction, JunctionAssembly, Orientation, RefBaseAssembly, SupportType,
};
pub use config::{AssemblyConfig, ConfigError};
pub use read::{parse_cigar, CigarOp, CigarOpKind, Read, ReadError};
