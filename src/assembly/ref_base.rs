use std::fmt;
use std::sync::Arc;

use tracing::trace;

use super::base_match::{bases_match, merge_base, BaseCall};
use super::mismatches::SequenceMismatches;
use super::support::{AssemblySupport, SupportType};
use super::{Junction, JunctionAssembly};
use crate::read::Read;

/// Consensus over the reference-side flank of a junction assembly.
///
/// The window spans from the extension position to the junction. Forward
/// junctions place the junction base last, reverse junctions first.
#[derive(Debug, Clone)]
pub struct RefBaseAssembly {
    junction: Junction,
    extension_ref_position: i32,
    min_aligned_position: i32,
    max_aligned_position: i32,
    non_junction_read_extension: i32,
    junction_sequence_index: usize,
    low_base_qual_threshold: u8,
    slots: Vec<Option<BaseCall>>,
    support: Vec<AssemblySupport>,
    mismatches: SequenceMismatches,
}

impl RefBaseAssembly {
    /// Build the window and copy in the junction assembly's reference-side bases.
    ///
    /// # Panics
    ///
    /// Panics if `extension_ref_position` lies on the soft-clipped side of
    /// the junction.
    pub fn new(assembly: &JunctionAssembly, extension_ref_position: i32) -> Self {
        let junction = assembly.junction().clone();
        let is_forward = junction.is_forward();

        assert!(
            if is_forward {
                extension_ref_position <= junction.position
            } else {
                extension_ref_position >= junction.position
            },
            "reference extension {} lies past junction {}",
            extension_ref_position,
            junction
        );

        let assembly_length =
            (extension_ref_position - junction.position).unsigned_abs() as usize + 1;

        // aligned positions are set from supporting reads only
        let non_junction_read_extension = if is_forward {
            assembly.min_aligned_position() - extension_ref_position
        } else {
            extension_ref_position - assembly.max_aligned_position()
        };

        let junction_sequence_index = if is_forward { assembly_length - 1 } else { 0 };

        // copy by reference position, ignoring any mismatches the junction assembly holds
        let window_start = if is_forward { extension_ref_position } else { junction.position };
        let source = assembly.slots();
        let slots = (0..assembly_length)
            .map(|i| {
                let ref_offset = window_start + i as i32 - junction.position;
                let source_index = assembly.junction_index() as i64 + ref_offset as i64;
                usize::try_from(source_index)
                    .ok()
                    .and_then(|index| source.get(index).copied().flatten())
            })
            .collect();

        Self {
            min_aligned_position: junction.position,
            max_aligned_position: junction.position,
            junction,
            extension_ref_position,
            non_junction_read_extension,
            junction_sequence_index,
            low_base_qual_threshold: assembly.config().low_base_qual_threshold,
            slots,
            support: Vec::new(),
            mismatches: SequenceMismatches::new(),
        }
    }

    /// Lowest aligned position of the supporting reads.
    pub fn min_aligned_position(&self) -> i32 {
        self.min_aligned_position
    }

    /// Highest aligned position of the supporting reads.
    pub fn max_aligned_position(&self) -> i32 {
        self.max_aligned_position
    }

    /// Distance from the junction assembly's aligned edge to the extension position.
    pub fn non_junction_read_extension(&self) -> i32 {
        self.non_junction_read_extension
    }

    /// Consensus slots; `None` where no read has contributed.
    pub fn slots(&self) -> &[Option<BaseCall>] {
        &self.slots
    }

    /// Consensus bases, `N` for unset slots.
    pub fn bases(&self) -> Vec<u8> {
        self.slots.iter().map(|slot| slot.map_or(b'N', |call| call.base)).collect()
    }

    /// Consensus qualities, 0 for unset slots.
    pub fn base_quals(&self) -> Vec<u8> {
        self.slots.iter().map(|slot| slot.map_or(0, |call| call.qual)).collect()
    }

    /// Number of slots in the window.
    pub fn base_length(&self) -> usize {
        self.slots.len()
    }

    /// Supporting reads.
    pub fn support(&self) -> &[AssemblySupport] {
        &self.support
    }

    /// Number of supporting reads.
    pub fn support_count(&self) -> usize {
        self.support.len()
    }

    /// Disagreements recorded while merging reads.
    pub fn mismatches(&self) -> &SequenceMismatches {
        &self.mismatches
    }

    /// Test a read against the window and merge it when it fits.
    ///
    /// The read must overlap at least `required_overlap` populated bases and
    /// carry no more than `permitted_mismatches` against them.
    pub fn check_add_read(
        &mut self,
        read: Arc<Read>,
        support_type: SupportType,
        permitted_mismatches: usize,
        required_overlap: usize,
    ) -> bool {
        if read.cigar().is_empty() {
            return false;
        }

        let Some((read_start_index, assembly_start_index)) =
            self.read_assembly_start_indices(&read)
        else {
            return false;
        };

        if read_start_index >= read.bases_len() {
            return false;
        }

        let mut mismatch_count = 0;
        let mut overlapped_base_count = 0;

        let overlapping =
            (read_start_index..read.bases_len()).zip(assembly_start_index..self.slots.len());
        for (read_index, assembly_index) in overlapping {
            let Some(call) = self.slots[assembly_index] else {
                continue;
            };

            overlapped_base_count += 1;

            if !bases_match(
                read.bases()[read_index],
                call.base,
                read.base_quals()[read_index],
                call.qual,
                self.low_base_qual_threshold,
            ) {
                mismatch_count += 1;
                if mismatch_count > permitted_mismatches {
                    trace!(read = read.name(), "read exceeds reference-side mismatches");
                    return false;
                }
            }
        }

        if overlapped_base_count < required_overlap {
            return false;
        }

        self.add_read(read, support_type, read_start_index, assembly_start_index);
        true
    }

    /// Count populated bases from the junction outwards up to the first gap.
    pub fn valid_ref_base_length(&self) -> usize {
        let populated = |index: &usize| self.slots[*index].is_some();

        if self.junction.is_forward() {
            (0..=self.junction_sequence_index).rev().take_while(populated).count()
        } else {
            (self.junction_sequence_index..self.slots.len()).take_while(populated).count()
        }
    }

    fn read_assembly_start_indices(&self, read: &Read) -> Option<(usize, usize)> {
        let unclipped_start = read.unclipped_start();
        let junction_position = self.junction.position;

        if self.junction.is_forward() {
            if unclipped_start < self.extension_ref_position {
                // starts before the window
                return Some(((self.extension_ref_position - unclipped_start) as usize, 0));
            }
            if unclipped_start > junction_position {
                return None;
            }
            Some((0, (unclipped_start - self.extension_ref_position) as usize))
        } else {
            if unclipped_start < junction_position {
                // index off the relative start positions
                let read_start_index = (junction_position - unclipped_start) as usize;
                return Some((read_start_index, self.junction_sequence_index));
            }
            if unclipped_start > self.extension_ref_position {
                return None;
            }
            Some((0, (unclipped_start - junction_position) as usize))
        }
    }

    fn add_read(
        &mut self,
        read: Arc<Read>,
        support_type: SupportType,
        read_start_index: usize,
        assembly_start_index: usize,
    ) {
        let support_index = self.support.len();
        let threshold = self.low_base_qual_threshold;
        let mut mismatch_count = 0;
        let mut read_end_index = read_start_index;

        let overlapping =
            (read_start_index..read.bases_len()).zip(assembly_start_index..self.slots.len());
        for (read_index, assembly_index) in overlapping {
            let (base, qual) = (read.bases()[read_index], read.base_quals()[read_index]);

            if merge_base(&mut self.slots[assembly_index], base, qual, threshold) {
                mismatch_count += 1;
                self.mismatches.add(assembly_index, base, support_index, qual);
            }
            read_end_index = read_index;
        }

        if self.junction.is_forward() {
            self.min_aligned_position = self.min_aligned_position.min(read.alignment_start());
        } else {
            self.max_aligned_position = self.max_aligned_position.max(read.alignment_end());
        }

        let junction_read_index = read.index_at_reference_position(self.junction.position, true);

        self.support.push(AssemblySupport {
            read,
            support_type,
            assembly_index: assembly_start_index,
            junction_read_index,
            read_index_range: read_start_index..=read_end_index,
            junction_mismatches: 0,
            reference_mismatches: mismatch_count,
        });
    }
}

impl fmt::Display for RefBaseAssembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "junc({}) aligned({} - {}) initExtension(pos={} dist={}) length({})",
            self.junction,
            self.min_aligned_position,
            self.max_aligned_position,
            self.extension_ref_position,
            self.non_junction_read_extension,
            self.slots.len()
        )?;
        write!(
            f,
            " support({}) mismatches(pos={} all={})",
            self.support.len(),
            self.mismatches.position_count(),
            self.mismatches.distinct_base_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::{build_from_junction_reads, expand_reference_bases, Orientation};
    use crate::config::AssemblyConfig;
    use crate::read::parse_cigar;

    fn read(name: &str, start: i32, cigar: &str, bases: &[u8]) -> Arc<Read> {
        let cigar = parse_cigar(cigar).unwrap();
        let quals = vec![37u8; bases.len()];
        Arc::new(Read::new(name, "chr1", start, cigar, bases.to_vec(), quals).unwrap())
    }

    fn build(junction: Junction, reads: &[Arc<Read>]) -> JunctionAssembly {
        let mut assembly =
            build_from_junction_reads(junction, reads, false, AssemblyConfig::default()).unwrap();
        expand_reference_bases(&mut assembly);
        assembly
    }

    // reference 91-110: TTTTTGGGGGAAAAACCCCC, soft clip after 110: GTTG
    fn forward_assembly() -> JunctionAssembly {
        let junction = Junction::new("chr1", 110, Orientation::Forward);
        let reads = vec![
            read("a", 101, "10M4S", b"AAAAACCCCCGTTG"),
            read("b", 96, "15M4S", b"GGGGGAAAAACCCCCGTTG"),
        ];
        build(junction, &reads)
    }

    #[test]
    fn copies_reference_side_bases() {
        let assembly = forward_assembly();
        let ref_assembly = RefBaseAssembly::new(&assembly, 91);

        assert_eq!(ref_assembly.base_length(), 20);
        assert_eq!(ref_assembly.non_junction_read_extension(), 5);
        assert_eq!(String::from_utf8(ref_assembly.bases()).unwrap(), "NNNNNGGGGGAAAAACCCCC");
        assert_eq!(ref_assembly.valid_ref_base_length(), 15);
    }

    #[test]
    fn adds_overlapping_reference_read() {
        let assembly = forward_assembly();
        let mut ref_assembly = RefBaseAssembly::new(&assembly, 91);

        let mate = read("mate", 91, "12M", b"TTTTTGGGGGAA");
        assert!(ref_assembly.check_add_read(mate, SupportType::Reference, 1, 5));

        assert_eq!(String::from_utf8(ref_assembly.bases()).unwrap(), "TTTTTGGGGGAAAAACCCCC");
        assert_eq!(ref_assembly.valid_ref_base_length(), 20);
        assert_eq!(ref_assembly.min_aligned_position(), 91);
        assert_eq!(ref_assembly.support()[0].read_index_range, 0..=11);
    }

    #[test]
    fn rejects_insufficient_overlap_and_mismatches() {
        let assembly = forward_assembly();
        let mut ref_assembly = RefBaseAssembly::new(&assembly, 91);

        // only two populated bases overlapped
        let short = read("short", 88, "9M", b"CCCTTTTTG");
        assert!(!ref_assembly.check_add_read(short, SupportType::Reference, 1, 5));

        let mismatched = read("mm", 96, "10M", b"GGGGGTTTTT");
        assert!(!ref_assembly.check_add_read(mismatched, SupportType::Reference, 2, 5));

        // starts past the junction
        let beyond = read("beyond", 111, "10M", b"ACGTACGTAC");
        assert!(!ref_assembly.check_add_read(beyond, SupportType::Reference, 2, 0));

        assert_eq!(ref_assembly.support_count(), 0);
    }

    #[test]
    fn reverse_window_starts_at_junction() {
        let junction = Junction::new("chr1", 201, Orientation::Reverse);
        let reads = vec![read("a", 201, "4S8M", b"TGCAGGGGTTTT")];
        let assembly = build(junction, &reads);
        assert_eq!(assembly.bases_string(), "TGCAGGGGTTTT");

        let mut ref_assembly = RefBaseAssembly::new(&assembly, 215);
        assert_eq!(String::from_utf8(ref_assembly.bases()).unwrap(), "GGGGTTTTNNNNNNN");
        assert_eq!(ref_assembly.valid_ref_base_length(), 8);

        let mate = read("mate", 205, "11M", b"TTTTACGTACG");
        assert!(ref_assembly.check_add_read(mate, SupportType::Reference, 0, 4));
        assert_eq!(ref_assembly.valid_ref_base_length(), 15);
        assert_eq!(ref_assembly.max_aligned_position(), 215);
    }

    #[test]
    fn reverse_read_starting_before_junction() {
        let junction = Junction::new("chr1", 201, Orientation::Reverse);
        let reads = vec![read("a", 201, "4S8M", b"TGCAGGGGTTTT")];
        let assembly = build(junction, &reads);
        let mut ref_assembly = RefBaseAssembly::new(&assembly, 215);

        // aligned from 195, so six bases fall before the window
        let spanning = read("spanning", 195, "20M", b"AAAAAAGGGGTTTTACGTAC");
        assert!(ref_assembly.check_add_read(spanning, SupportType::Reference, 0, 8));

        let support = &ref_assembly.support()[0];
        assert_eq!(support.read_index_range, 6..=19);
        assert_eq!(support.assembly_index, 0);
        assert_eq!(support.junction_read_index, Some(6));
        assert_eq!(support.reference_mismatches, 0);
        assert_eq!(String::from_utf8(ref_assembly.bases()).unwrap(), "GGGGTTTTACGTACN");
        assert_eq!(ref_assembly.max_aligned_position(), 214);
    }

    #[test]
    fn unmapped_read_is_rejected() {
        let assembly = forward_assembly();
        let mut ref_assembly = RefBaseAssembly::new(&assembly, 91);

        let unmapped = read("unmapped", 95, "*", b"GGGGGAAAAA");
        assert!(!ref_assembly.check_add_read(unmapped, SupportType::Reference, 0, 0));
        assert_eq!(ref_assembly.support_count(), 0);
        assert_eq!(String::from_utf8(ref_assembly.bases()).unwrap(), "NNNNNGGGGGAAAAACCCCC");
    }

    #[test]
    #[should_panic(expected = "lies past junction")]
    fn extension_on_clipped_side_panics() {
        let assembly = forward_assembly();
        let _ = RefBaseAssembly::new(&assembly, 120);
    }
}
