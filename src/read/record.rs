use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::cigar::{cigar_to_string, CigarOp, CigarOpKind};
use crate::assembly::Orientation;

/// Errors raised when a read record violates its construction contract.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReadError {
    /// CIGAR string could not be parsed.
    #[error("invalid CIGAR string '{0}'")]
    InvalidCigar(String),

    /// Base and quality arrays differ in length.
    #[error("read {name}: {bases} bases but {quals} base qualities")]
    LengthMismatch {
        /// Read name.
        name: String,
        /// Number of bases.
        bases: usize,
        /// Number of base qualities.
        quals: usize,
    },

    /// CIGAR read length disagrees with the base count.
    #[error("read {name}: CIGAR covers {cigar_len} read bases but sequence has {bases}")]
    CigarLength {
        /// Read name.
        name: String,
        /// Read bases consumed by the CIGAR.
        cigar_len: usize,
        /// Number of bases.
        bases: usize,
    },

    /// Mapped read without any aligned bases.
    #[error("read {0}: CIGAR has no aligned bases")]
    NoAlignedBases(String),
}

/// Position of a read within its sequenced pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PairRole {
    /// Single-end or unpaired read.
    #[default]
    Unpaired,
    /// First read of the pair.
    First,
    /// Second read of the pair.
    Second,
}

/// One sequenced fragment alignment with cached boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Read {
    name: String,
    chromosome: Arc<str>,
    cigar: Vec<CigarOp>,
    bases: Vec<u8>,
    base_quals: Vec<u8>,
    negative_strand: bool,
    pair_role: PairRole,
    supplementary: bool,
    mapping_quality: u8,
    num_events: u32,

    alignment_start: i32,
    alignment_end: i32,
    unclipped_start: i32,
    unclipped_end: i32,
}

impl Read {
    /// Construct a read from its alignment (1-based start) and payload.
    pub fn new(
        name: impl Into<String>,
        chromosome: impl Into<Arc<str>>,
        alignment_start: i32,
        cigar: Vec<CigarOp>,
        bases: impl Into<Vec<u8>>,
        base_quals: impl Into<Vec<u8>>,
    ) -> Result<Self, ReadError> {
        let name = name.into();
        let bases = bases.into();
        let base_quals = base_quals.into();

        if bases.len() != base_quals.len() {
            return Err(ReadError::LengthMismatch {
                name,
                bases: bases.len(),
                quals: base_quals.len(),
            });
        }

        if !cigar.is_empty() {
            let cigar_len: usize = cigar.iter().map(CigarOp::read_len).sum();
            if cigar_len != bases.len() {
                return Err(ReadError::CigarLength {
                    name,
                    cigar_len,
                    bases: bases.len(),
                });
            }
            if !cigar.iter().any(|op| op.kind == CigarOpKind::Match) {
                return Err(ReadError::NoAlignedBases(name));
            }
        }

        let mut read = Self {
            name,
            chromosome: chromosome.into(),
            cigar,
            bases,
            base_quals,
            negative_strand: false,
            pair_role: PairRole::Unpaired,
            supplementary: false,
            mapping_quality: 60,
            num_events: 0,
            alignment_start,
            alignment_end: alignment_start,
            unclipped_start: alignment_start,
            unclipped_end: alignment_start,
        };
        read.set_boundaries(alignment_start);
        Ok(read)
    }

    /// Mark the read as aligned to the negative strand.
    pub fn with_negative_strand(mut self, negative: bool) -> Self {
        self.negative_strand = negative;
        self
    }

    /// Set the read's role within its pair.
    pub fn with_pair_role(mut self, role: PairRole) -> Self {
        self.pair_role = role;
        self
    }

    /// Flag the record as a supplementary alignment.
    pub fn with_supplementary(mut self, supplementary: bool) -> Self {
        self.supplementary = supplementary;
        self
    }

    /// Set the mapping quality.
    pub fn with_mapping_quality(mut self, mapq: u8) -> Self {
        self.mapping_quality = mapq;
        self
    }

    /// Set the number of alignment events (NM).
    pub fn with_num_events(mut self, num_events: u32) -> Self {
        self.num_events = num_events;
        self
    }

    /// Recompute aligned and unclipped boundaries from the operation list.
    pub fn set_boundaries(&mut self, new_start: i32) {
        self.alignment_start = new_start;
        self.unclipped_start = new_start;

        if self.cigar.is_empty() {
            // undefined for unmapped reads
            self.alignment_end = new_start;
            self.unclipped_end = new_start;
            return;
        }

        let ref_len: i32 = self.cigar.iter().map(CigarOp::ref_len).sum();
        self.alignment_end = new_start + ref_len - 1;
        self.unclipped_end = self.alignment_end;

        let mut unhard = self.cigar.iter().filter(|op| op.kind != CigarOpKind::HardClip);

        if let Some(first) = unhard.next() {
            if first.kind == CigarOpKind::SoftClip {
                self.unclipped_start -= first.len as i32;
            }
        }

        if let Some(last) = unhard.next_back() {
            if last.kind == CigarOpKind::SoftClip {
                self.unclipped_end += last.len as i32;
            }
        }
    }

    /// Read name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Chromosome the read is aligned to.
    pub fn chromosome(&self) -> &str {
        &self.chromosome
    }

    /// Alignment operations.
    pub fn cigar(&self) -> &[CigarOp] {
        &self.cigar
    }

    /// Alignment operations in CIGAR string form.
    pub fn cigar_string(&self) -> String {
        cigar_to_string(&self.cigar)
    }

    /// First reference position covered by an aligned base.
    pub fn alignment_start(&self) -> i32 {
        self.alignment_start
    }

    /// Last reference position covered by an aligned base.
    pub fn alignment_end(&self) -> i32 {
        self.alignment_end
    }

    /// Alignment start extended by the leading soft clip.
    pub fn unclipped_start(&self) -> i32 {
        self.unclipped_start
    }

    /// Alignment end extended by the trailing soft clip.
    pub fn unclipped_end(&self) -> i32 {
        self.unclipped_end
    }

    /// Whether bases are soft-clipped at the start.
    pub fn is_left_clipped(&self) -> bool {
        self.unclipped_start < self.alignment_start
    }

    /// Whether bases are soft-clipped at the end.
    pub fn is_right_clipped(&self) -> bool {
        self.unclipped_end > self.alignment_end
    }

    /// Number of leading soft-clipped bases.
    pub fn left_clip_length(&self) -> i32 {
        self.alignment_start - self.unclipped_start
    }

    /// Number of trailing soft-clipped bases.
    pub fn right_clip_length(&self) -> i32 {
        self.unclipped_end - self.alignment_end
    }

    /// Read bases.
    pub fn bases(&self) -> &[u8] {
        &self.bases
    }

    /// Per-base Phred qualities.
    pub fn base_quals(&self) -> &[u8] {
        &self.base_quals
    }

    /// Number of read bases.
    pub fn bases_len(&self) -> usize {
        self.bases.len()
    }

    /// Whether the read aligns to the negative strand.
    pub fn is_negative_strand(&self) -> bool {
        self.negative_strand
    }

    /// Strand as an orientation: forward for the positive strand.
    pub fn orientation(&self) -> Orientation {
        if self.negative_strand {
            Orientation::Reverse
        } else {
            Orientation::Forward
        }
    }

    /// Role within the sequenced pair.
    pub fn pair_role(&self) -> PairRole {
        self.pair_role
    }

    /// Whether the record is a supplementary alignment.
    pub fn is_supplementary(&self) -> bool {
        self.supplementary
    }

    /// Mapping quality.
    pub fn mapping_quality(&self) -> u8 {
        self.mapping_quality
    }

    /// Number of alignment events (NM).
    pub fn num_events(&self) -> u32 {
        self.num_events
    }

    /// Whether both handles describe the same alignment record.
    pub fn is_same_record(&self, other: &Read) -> bool {
        self.name == other.name
            && self.pair_role == other.pair_role
            && self.supplementary == other.supplementary
    }

    /// Map a reference position to an index into the read bases.
    ///
    /// Positions inside the aligned span are resolved by walking the
    /// operations; a position inside a deletion maps to the base before it.
    /// Positions at or past either aligned boundary are extrapolated into the
    /// soft clip when `allow_extrapolation` is set. Returns `None` when the
    /// position cannot be placed on the read, and always for unmapped reads.
    pub fn index_at_reference_position(
        &self,
        ref_position: i32,
        allow_extrapolation: bool,
    ) -> Option<usize> {
        // unmapped reads have no reference coordinates
        if self.cigar.is_empty() || self.bases.is_empty() {
            return None;
        }

        if ref_position <= self.alignment_start {
            if !allow_extrapolation && ref_position < self.alignment_start {
                return None;
            }

            let base_diff = self.alignment_start - ref_position;
            let soft_clip_bases = self.left_clip_length();
            return (base_diff <= soft_clip_bases).then(|| (soft_clip_bases - base_diff) as usize);
        }

        if ref_position >= self.alignment_end {
            if !allow_extrapolation && ref_position > self.alignment_end {
                return None;
            }

            let base_diff = ref_position - self.alignment_end;
            let soft_clip_bases = self.right_clip_length();
            if base_diff > soft_clip_bases {
                return None;
            }
            return (self.bases.len() as i32 - (soft_clip_bases - base_diff) - 1)
                .try_into()
                .ok();
        }

        // boundaries may have been adjusted, so walk the operations directly
        let mut read_index = 0usize;
        let mut current_pos = self.alignment_start;

        for op in &self.cigar {
            if !op.kind.consumes_reference() {
                read_index += op.read_len();
                continue;
            }

            if current_pos == ref_position {
                break;
            }

            let op_len = op.len as i32;
            let within = ref_position >= current_pos && ref_position < current_pos + op_len;

            if !op.kind.consumes_read() {
                if within {
                    return Some(read_index.saturating_sub(1));
                }
                current_pos += op_len;
            } else {
                if within {
                    return Some(read_index + (ref_position - current_pos) as usize);
                }
                current_pos += op_len;
                read_index += op.len as usize;
            }
        }

        Some(read_index)
    }

    /// Remove `count` bases from one end of the read.
    ///
    /// Whole operations are consumed and the boundary operation shortened.
    /// The count is clamped so that at least one aligned base remains.
    pub fn trim_bases(&mut self, count: usize, from_start: bool) {
        let count = count.min(self.max_trimmable(from_start));
        if count == 0 {
            return;
        }

        let mut remaining = count;
        let mut new_start = self.alignment_start;

        if from_start {
            while let Some(op) = self.cigar.first().copied() {
                let read_len = op.read_len();

                if read_len == 0 {
                    // deletions and clips exposed at the new edge
                    new_start += op.ref_len();
                    self.cigar.remove(0);
                    continue;
                }

                if remaining == 0 {
                    break;
                }

                if read_len <= remaining {
                    self.cigar.remove(0);
                    remaining -= read_len;
                    new_start += op.ref_len();
                } else {
                    self.cigar[0].len -= remaining as u32;
                    if op.kind.consumes_reference() {
                        new_start += remaining as i32;
                    }
                    remaining = 0;
                }
            }

            self.bases.drain(..count);
            self.base_quals.drain(..count);
        } else {
            while let Some(op) = self.cigar.last().copied() {
                let read_len = op.read_len();

                if read_len == 0 {
                    self.cigar.pop();
                    continue;
                }

                if remaining == 0 {
                    break;
                }

                if read_len <= remaining {
                    self.cigar.pop();
                    remaining -= read_len;
                } else {
                    let last = self.cigar.len() - 1;
                    self.cigar[last].len -= remaining as u32;
                    remaining = 0;
                }
            }

            let new_len = self.bases.len() - count;
            self.bases.truncate(new_len);
            self.base_quals.truncate(new_len);
        }

        self.fold_edge_insertions();
        self.set_boundaries(new_start);
    }

    /// Merge an insertion exposed at either edge into the edge soft clip.
    fn fold_edge_insertions(&mut self) {
        let is_edge_clip =
            |op: &&CigarOp| matches!(op.kind, CigarOpKind::SoftClip | CigarOpKind::Insertion);

        let leading = self.cigar.iter().take_while(is_edge_clip).count();
        if self.cigar[..leading].iter().any(|op| op.kind == CigarOpKind::Insertion) {
            let len: u32 = self.cigar.drain(..leading).map(|op| op.len).sum();
            self.cigar.insert(0, CigarOp::new(CigarOpKind::SoftClip, len));
        }

        let tail = self.cigar.len() - self.cigar.iter().rev().take_while(is_edge_clip).count();
        if self.cigar[tail..].iter().any(|op| op.kind == CigarOpKind::Insertion) {
            let len: u32 = self.cigar.drain(tail..).map(|op| op.len).sum();
            self.cigar.push(CigarOp::new(CigarOpKind::SoftClip, len));
        }
    }

    fn max_trimmable(&self, from_start: bool) -> usize {
        let len = self.bases.len();
        if len == 0 {
            return 0;
        }

        let mut read_index = 0usize;
        let mut first_aligned = None;
        let mut last_aligned = None;

        for op in &self.cigar {
            if op.kind == CigarOpKind::Match {
                first_aligned.get_or_insert(read_index);
                last_aligned = Some(read_index + op.len as usize - 1);
            }
            read_index += op.read_len();
        }

        match (from_start, first_aligned, last_aligned) {
            (true, _, Some(last)) => last,
            (false, Some(first), _) => len - 1 - first,
            _ => len - 1,
        }
    }

    /// Replace an edge insertion or deletion with a soft clip.
    ///
    /// On the left the leading aligned block and the indel after it become a
    /// soft clip of `left_soft_clip` bases; likewise on the right. An existing
    /// soft clip on that edge is folded into the new one, so the clip length
    /// must count its bases too. Hard clips stay in place.
    pub fn convert_edge_indel_to_soft_clip(&mut self, left_soft_clip: u32, right_soft_clip: u32) {
        let mut new_start = self.alignment_start;

        if left_soft_clip > 0 {
            let hard = self.cigar.iter().take_while(|op| op.kind == CigarOpKind::HardClip).count();
            let soft = match self.cigar.get(hard) {
                Some(op) if op.kind == CigarOpKind::SoftClip => 1,
                _ => 0,
            };
            let block_end = hard + soft + 2;

            if self.cigar.len() > block_end {
                let removed: i32 = self.cigar.drain(hard..block_end).map(|op| op.ref_len()).sum();
                new_start += removed;
                self.cigar.insert(hard, CigarOp::new(CigarOpKind::SoftClip, left_soft_clip));
            }
        }

        if right_soft_clip > 0 {
            let hard =
                self.cigar.iter().rev().take_while(|op| op.kind == CigarOpKind::HardClip).count();
            let edge = self.cigar.len() - hard;
            let soft = match edge.checked_sub(1).and_then(|i| self.cigar.get(i)) {
                Some(op) if op.kind == CigarOpKind::SoftClip => 1,
                _ => 0,
            };

            if let Some(block_start) = edge.checked_sub(soft + 2).filter(|&start| start > 0) {
                self.cigar.drain(block_start..edge);
                let clip = CigarOp::new(CigarOpKind::SoftClip, right_soft_clip);
                self.cigar.insert(block_start, clip);
            }
        }

        debug_assert_eq!(
            self.cigar.iter().map(CigarOp::read_len).sum::<usize>(),
            self.bases.len(),
            "soft clip conversion must preserve read length"
        );

        self.set_boundaries(new_start);
    }
}

impl fmt::Display for Read {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id({}) coords({}:{}-{}) cigar({}) strand({}) nm({})",
            self.name,
            self.chromosome,
            self.alignment_start,
            self.alignment_end,
            self.cigar_string(),
            if self.negative_strand { '-' } else { '+' },
            self.num_events
        )
    }
}
