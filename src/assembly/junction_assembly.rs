use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use tracing::trace;

use super::base_match::{bases_match, merge_base, BaseCall};
use super::mismatches::SequenceMismatches;
use super::ref_side_soft_clip::RefSideSoftClip;
use super::splitter::AssemblyMismatchSplitter;
use super::support::{AssemblySupport, SupportType};
use super::{Junction, Orientation};
use crate::config::AssemblyConfig;
use crate::read::Read;

/// Read bases mapped onto assembly slots: `assembly = read + offset`.
#[derive(Debug, Clone)]
struct Placement {
    read_range: RangeInclusive<usize>,
    offset: isize,
}

impl Placement {
    /// Clip `read_start..=read_end` to the `len` slots of an assembly.
    fn clipped(read_start: usize, read_end: usize, offset: isize, len: usize) -> Option<Self> {
        let first = (read_start as isize).max(-offset);
        let last = (read_end as isize).min(len as isize - 1 - offset);
        (first <= last).then(|| Self {
            read_range: first as usize..=last as usize,
            offset,
        })
    }

    fn assembly_index(&self, read_index: usize) -> usize {
        (read_index as isize + self.offset) as usize
    }

    fn assembly_start(&self) -> usize {
        self.assembly_index(*self.read_range.start())
    }
}

/// Consensus sequence anchored at a junction.
///
/// Slot `junction_index` holds the junction base itself. Forward junctions
/// extend to higher indices, reverse junctions to lower ones; reference
/// expansion later grows the array on the opposite side.
#[derive(Debug, Clone)]
pub struct JunctionAssembly {
    junction: Junction,
    config: AssemblyConfig,
    slots: Vec<Option<BaseCall>>,
    junction_index: usize,
    min_aligned_position: i32,
    max_aligned_position: i32,
    support: Vec<AssemblySupport>,
    mismatches: SequenceMismatches,
    ref_side_soft_clips: Vec<RefSideSoftClip>,
}

impl JunctionAssembly {
    /// Create an assembly spanning `max_extension` bases past the junction,
    /// seeded from `seed`.
    pub(crate) fn new(
        junction: Junction,
        seed: Arc<Read>,
        max_extension: usize,
        min_aligned_position: i32,
        max_aligned_position: i32,
        config: AssemblyConfig,
    ) -> Self {
        let junction_index = if junction.is_forward() { 0 } else { max_extension };

        let mut assembly = Self {
            junction,
            config,
            slots: vec![None; max_extension + 1],
            junction_index,
            min_aligned_position,
            max_aligned_position,
            support: Vec::new(),
            mismatches: SequenceMismatches::new(),
            ref_side_soft_clips: Vec::new(),
        };

        assembly.add_junction_read(seed, false);
        assembly
    }

    /// Breakpoint the assembly is anchored at.
    pub fn junction(&self) -> &Junction {
        &self.junction
    }

    /// Thresholds the assembly was built with.
    pub fn config(&self) -> &AssemblyConfig {
        &self.config
    }

    /// Index of the junction base.
    pub fn junction_index(&self) -> usize {
        self.junction_index
    }

    /// Lowest aligned position spanned by supporting reads.
    pub fn min_aligned_position(&self) -> i32 {
        self.min_aligned_position
    }

    /// Highest aligned position spanned by supporting reads.
    pub fn max_aligned_position(&self) -> i32 {
        self.max_aligned_position
    }

    /// Number of consensus slots.
    pub fn base_length(&self) -> usize {
        self.slots.len()
    }

    /// Number of bases past the junction.
    pub fn extension_length(&self) -> usize {
        if self.junction.is_forward() {
            self.slots.len() - 1 - self.junction_index
        } else {
            self.junction_index
        }
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

    /// Consensus bases as a string.
    pub fn bases_string(&self) -> String {
        String::from_utf8_lossy(&self.bases()).into_owned()
    }

    /// Supporting reads in the order they were added.
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

    /// Reference-side soft clips gathered during reference expansion.
    pub fn ref_side_soft_clips(&self) -> &[RefSideSoftClip] {
        &self.ref_side_soft_clips
    }

    /// Whether the read already supports the assembly.
    pub fn has_read_support(&self, read: &Read) -> bool {
        self.support.iter().any(|support| support.read.is_same_record(read))
    }

    fn junction_placement(&self, read: &Read) -> Option<(usize, Placement)> {
        let read_junction_index = read.index_at_reference_position(self.junction.position, true)?;

        let last = read.bases_len().checked_sub(1)?;
        let (read_start, read_end) = if self.junction.is_forward() {
            (read_junction_index, last)
        } else {
            (0, read_junction_index)
        };

        let offset = self.junction_index as isize - read_junction_index as isize;
        let placement = Placement::clipped(read_start, read_end, offset, self.slots.len())?;
        Some((read_junction_index, placement))
    }

    fn count_mismatches(&self, read: &Read, placement: &Placement) -> usize {
        let threshold = self.config.low_base_qual_threshold;

        placement
            .read_range
            .clone()
            .filter(|&i| match self.slots[placement.assembly_index(i)] {
                Some(call) => {
                    let (base, qual) = (read.bases()[i], read.base_quals()[i]);
                    !bases_match(base, call.base, qual, call.qual, threshold)
                }
                None => false,
            })
            .count()
    }

    fn merge_read(&mut self, read: &Read, placement: &Placement, support_index: usize) -> usize {
        let threshold = self.config.low_base_qual_threshold;
        let mut mismatch_count = 0;

        for i in placement.read_range.clone() {
            let index = placement.assembly_index(i);
            let (base, qual) = (read.bases()[i], read.base_quals()[i]);

            if merge_base(&mut self.slots[index], base, qual, threshold) {
                mismatch_count += 1;
                self.mismatches.add(index, base, support_index, qual);
            }
        }

        mismatch_count
    }

    /// Merge the junction-side bases of a read into the consensus.
    ///
    /// With `check_mismatches` the read is rejected untouched when it carries
    /// more than the permitted mismatches. Returns whether the read was added.
    pub fn add_junction_read(&mut self, read: Arc<Read>, check_mismatches: bool) -> bool {
        let Some((read_junction_index, placement)) = self.junction_placement(&read) else {
            trace!(read = read.name(), junction = %self.junction, "read does not reach junction");
            return false;
        };

        let permitted = self.config.max_base_mismatches;
        if check_mismatches && self.count_mismatches(&read, &placement) > permitted {
            trace!(
                read = read.name(),
                junction = %self.junction,
                "read exceeds permitted mismatches"
            );
            return false;
        }

        let support_index = self.support.len();
        let junction_mismatches = self.merge_read(&read, &placement, support_index);

        self.support.push(AssemblySupport {
            read,
            support_type: SupportType::Junction,
            assembly_index: placement.assembly_start(),
            junction_read_index: Some(read_junction_index),
            read_index_range: placement.read_range,
            junction_mismatches,
            reference_mismatches: 0,
        });

        true
    }

    /// Whether the read's junction-side bases fit the consensus within
    /// `permitted_mismatches`.
    pub fn check_read_matches(&self, read: &Read, permitted_mismatches: usize) -> bool {
        self.junction_placement(read)
            .map(|(_, placement)| self.count_mismatches(read, &placement) <= permitted_mismatches)
            .unwrap_or(false)
    }

    /// Add every read supporting `other` that does not yet support this assembly.
    pub fn check_add_read_support(&mut self, other: &JunctionAssembly) {
        for support in &other.support {
            if self.has_read_support(&support.read) {
                continue;
            }
            self.add_junction_read(Arc::clone(&support.read), false);
        }
    }

    /// Grow the consensus by `distance` unset slots on the reference side.
    pub(crate) fn extend_bases(
        &mut self,
        distance: usize,
        min_aligned_position: i32,
        max_aligned_position: i32,
    ) {
        if self.junction.is_forward() {
            let mut slots = vec![None; distance];
            slots.append(&mut self.slots);
            self.slots = slots;
            self.junction_index += distance;
            self.mismatches.shift(distance);
            for support in &mut self.support {
                support.assembly_index += distance;
            }
        } else {
            self.slots.resize(self.slots.len() + distance, None);
        }

        self.min_aligned_position = min_aligned_position;
        self.max_aligned_position = max_aligned_position;
    }

    /// Merge the aligned reference-side bases of an existing supporting read.
    pub(crate) fn extend_junction_read_support(&mut self, support_index: usize) {
        let read = Arc::clone(&self.support[support_index].read);
        let Some(read_junction_index) = self.support[support_index].junction_read_index else {
            return;
        };

        let (read_start, read_end) = if self.junction.is_forward() {
            let clip = read.left_clip_length().max(0) as usize;
            if read_junction_index == 0 || clip >= read_junction_index {
                return;
            }
            (clip, read_junction_index - 1)
        } else {
            let clip = read.right_clip_length().max(0) as usize;
            let Some(last) = read.bases_len().checked_sub(1) else {
                return;
            };
            if read_junction_index + clip >= last {
                return;
            }
            (read_junction_index + 1, last - clip)
        };

        let offset = self.junction_index as isize - read_junction_index as isize;
        let Some(placement) = Placement::clipped(read_start, read_end, offset, self.slots.len())
        else {
            return;
        };

        let mismatches = self.merge_read(&read, &placement, support_index);

        let support = &mut self.support[support_index];
        support.reference_mismatches += mismatches;

        let start = (*support.read_index_range.start()).min(*placement.read_range.start());
        let end = (*support.read_index_range.end()).max(*placement.read_range.end());
        support.read_index_range = start..=end;
        support.assembly_index = support.assembly_index.min(placement.assembly_start());
    }

    /// Record a soft clip on the reference side of a supporting read.
    pub(crate) fn check_add_ref_side_soft_clip(&mut self, support_index: usize) {
        let read = &self.support[support_index].read;

        let (position, orientation, length) = if self.junction.is_forward() {
            if !read.is_left_clipped() {
                return;
            }
            (read.alignment_start(), Orientation::Reverse, read.left_clip_length())
        } else {
            if !read.is_right_clipped() {
                return;
            }
            (read.alignment_end(), Orientation::Forward, read.right_clip_length())
        };

        if position == self.junction.position {
            return;
        }

        match self
            .ref_side_soft_clips
            .iter_mut()
            .find(|clip| clip.position == position && clip.orientation == orientation)
        {
            Some(clip) => clip.add(support_index, length),
            None => self
                .ref_side_soft_clips
                .push(RefSideSoftClip::new(position, orientation, support_index, length)),
        }
    }

    /// Split the assembly into one assembly per distinct supported sequence.
    pub fn split_on_mismatches(&self, min_sequence_length: usize) -> Vec<JunctionAssembly> {
        AssemblyMismatchSplitter::new(self).split_on_mismatches(min_sequence_length)
    }
}

impl fmt::Display for JunctionAssembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "junc({}) aligned({} - {}) length({}) junctionIndex({})",
            self.junction,
            self.min_aligned_position,
            self.max_aligned_position,
            self.slots.len(),
            self.junction_index
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
    use crate::read::parse_cigar;

    fn clipped_read(name: &str, start: i32, cigar: &str, bases: &[u8], qual: u8) -> Arc<Read> {
        let cigar = parse_cigar(cigar).unwrap();
        let quals = vec![qual; bases.len()];
        Arc::new(Read::new(name, "chr1", start, cigar, bases.to_vec(), quals).unwrap())
    }

    fn forward_junction() -> Junction {
        Junction::new("chr1", 110, Orientation::Forward)
    }

    // ten aligned bases at 101-110 then six soft-clipped bases
    const SEED: &[u8] = b"AAAAACCCCCGTTGCA";

    fn forward_assembly(seed: Arc<Read>) -> JunctionAssembly {
        JunctionAssembly::new(forward_junction(), seed, 6, 110, 116, AssemblyConfig::default())
    }

    #[test]
    fn seed_populates_junction_side() {
        let seed = clipped_read("seed", 101, "10M6S", SEED, 37);
        let assembly = forward_assembly(seed);

        assert_eq!(assembly.base_length(), 7);
        assert_eq!(assembly.extension_length(), 6);
        assert_eq!(assembly.junction_index(), 0);
        assert_eq!(assembly.bases_string(), "CGTTGCA");
        assert_eq!(assembly.support_count(), 1);
        assert_eq!(assembly.support()[0].read_index_range, 9..=15);
    }

    #[test]
    fn shorter_read_fills_prefix_and_counts_mismatches() {
        let seed = clipped_read("seed", 101, "10M6S", SEED, 37);
        let mut assembly = forward_assembly(seed);

        // starts later, extends three bases past the junction with one mismatch
        let other = clipped_read("other", 105, "6M3S", b"ACCCCCGAT", 37);
        assert!(assembly.add_junction_read(other, false));

        assert_eq!(assembly.bases_string(), "CGTTGCA");
        let support = &assembly.support()[1];
        assert_eq!(support.junction_mismatches, 1);
        assert_eq!(support.read_index_range, 5..=8);
        assert_eq!(assembly.mismatches().position_count(), 1);
        assert!(assembly.mismatches().get(2).is_some());
    }

    #[test]
    fn mismatch_check_rejects_without_applying() {
        let seed = clipped_read("seed", 101, "10M6S", SEED, 37);
        let config = AssemblyConfig::default().with_max_base_mismatches(1);
        let mut assembly = JunctionAssembly::new(forward_junction(), seed, 6, 110, 116, config);

        let noisy = clipped_read("noisy", 101, "10M6S", b"AAAAACCCCCGAAGCA", 37);
        assert!(!assembly.check_read_matches(&noisy, 1));
        assert!(!assembly.add_junction_read(noisy, true));
        assert_eq!(assembly.support_count(), 1);
        assert!(assembly.mismatches().is_empty());
    }

    #[test]
    fn unmapped_read_is_not_merged() {
        let seed = clipped_read("seed", 101, "10M6S", SEED, 37);
        let mut assembly = forward_assembly(seed);

        let unmapped = clipped_read("unmapped", 110, "*", b"TTTTTTTTTTTT", 40);
        assert!(!assembly.check_read_matches(&unmapped, 10));
        assert!(!assembly.add_junction_read(unmapped, false));

        assert_eq!(assembly.bases_string(), "CGTTGCA");
        assert_eq!(assembly.support_count(), 1);
        assert!(assembly.mismatches().is_empty());
    }

    #[test]
    fn reverse_junction_places_left_clip() {
        let junction = Junction::new("chr1", 201, Orientation::Reverse);
        let seed = clipped_read("seed", 201, "4S8M", b"TGCAGGGGTTTT", 37);
        let config = AssemblyConfig::default();
        let assembly = JunctionAssembly::new(junction, seed, 4, 197, 201, config);

        assert_eq!(assembly.junction_index(), 4);
        assert_eq!(assembly.bases_string(), "TGCAG");
        assert_eq!(assembly.extension_length(), 4);
    }

    #[test]
    fn merges_support_from_other_assembly() {
        let seed = clipped_read("seed", 101, "10M6S", SEED, 37);
        let mut first = forward_assembly(Arc::clone(&seed));
        let mut second = forward_assembly(seed);
        second.add_junction_read(clipped_read("extra", 103, "8M6S", b"AAACCCCCGTTGCA", 37), false);

        first.check_add_read_support(&second);
        assert_eq!(first.support_count(), 2);
        assert_eq!(first.support()[1].read.name(), "extra");
    }
}
