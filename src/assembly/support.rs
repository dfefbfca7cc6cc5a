use std::ops::RangeInclusive;
use std::sync::Arc;

use crate::read::Read;

/// How a read came to support an assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupportType {
    /// Read soft-clipped at (or spanning) the junction.
    Junction,
    /// Read aligned to the reference-side flank only.
    Reference,
}

/// A read contributing bases to an assembly.
#[derive(Debug, Clone)]
pub struct AssemblySupport {
    /// The supporting read.
    pub read: Arc<Read>,
    /// How the read was added.
    pub support_type: SupportType,
    /// Assembly index of the first read base applied.
    pub assembly_index: usize,
    /// Read index at the junction position, if the read reaches it.
    pub junction_read_index: Option<usize>,
    /// Read indices applied to the assembly.
    pub read_index_range: RangeInclusive<usize>,
    /// Mismatches against the consensus on the junction side.
    pub junction_mismatches: usize,
    /// Mismatches against the consensus on the reference side.
    pub reference_mismatches: usize,
}

impl AssemblySupport {
    /// Number of read bases applied to the assembly.
    pub fn read_range_length(&self) -> usize {
        self.read_index_range.end() + 1 - self.read_index_range.start()
    }

    /// Total mismatches against the consensus.
    pub fn total_mismatches(&self) -> usize {
        self.junction_mismatches + self.reference_mismatches
    }
}
