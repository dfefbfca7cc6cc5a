//! Local assembly of reads soft-clipped at a candidate breakpoint.
//!
//! A [`JunctionAssembly`] is seeded from the best junction read and grows a
//! quality-aware consensus as further reads are merged. Reads that disagree
//! consistently are separated by [`AssemblyMismatchSplitter`], and a
//! [`RefBaseAssembly`] carries the consensus out into the reference-side
//! flank for mate and discordant-read support.

mod base_match;
mod builder;
mod junction;
mod junction_assembly;
mod mismatches;
mod ref_base;
mod ref_side_soft_clip;
mod splitter;
mod support;

use thiserror::Error;

pub use base_match::{bases_match, find_unset_bases, slots_match, BaseCall};
pub use builder::{build_from_junction_reads, expand_reference_bases, read_qual_from_junction};
pub use junction::{Junction, Orientation};
pub use junction_assembly::JunctionAssembly;
pub use mismatches::{BaseMismatch, BaseMismatches, SequenceMismatches};
pub use ref_base::RefBaseAssembly;
pub use ref_side_soft_clip::RefSideSoftClip;
pub use splitter::{dedup_by_assembly_contains_another, AssemblyMismatchSplitter};
pub use support::{AssemblySupport, SupportType};

/// Errors raised while building an assembly.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssemblyError {
    /// No reads were supplied.
    #[error("no junction reads to assemble")]
    NoReads,

    /// A read could not be placed at the junction position.
    #[error("read {read} has no base at junction {junction}")]
    NoJunctionIndex {
        /// Read name.
        read: String,
        /// Junction as `chrom:pos:orient`.
        junction: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_name_the_read() {
        let err = AssemblyError::NoJunctionIndex {
            read: "r1".to_string(),
            junction: Junction::new("chr1", 100, Orientation::Reverse).to_string(),
        };
        assert_eq!(err.to_string(), "read r1 has no base at junction chr1:100:-1");
        assert_eq!(AssemblyError::NoReads.to_string(), "no junction reads to assemble");
    }
}
