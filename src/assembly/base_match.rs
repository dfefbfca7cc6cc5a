use std::ops::RangeInclusive;

/// Base placed into a consensus slot together with its quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BaseCall {
    /// Base in uppercase ASCII.
    pub base: u8,
    /// Phred quality of the base.
    pub qual: u8,
}

impl BaseCall {
    /// Construct a base call.
    pub fn new(base: u8, qual: u8) -> Self {
        Self { base, qual }
    }
}

/// Quality-tolerant base comparison.
///
/// Bases match when identical, or when either quality is below the low-quality
/// threshold, in which case the low-quality base acts as a wildcard.
pub fn bases_match(
    first: u8,
    second: u8,
    first_qual: u8,
    second_qual: u8,
    low_qual_threshold: u8,
) -> bool {
    first == second || first_qual < low_qual_threshold || second_qual < low_qual_threshold
}

/// Compare two consensus slots; unset slots match anything.
pub fn slots_match(
    first: Option<BaseCall>,
    second: Option<BaseCall>,
    low_qual_threshold: u8,
) -> bool {
    match (first, second) {
        (Some(a), Some(b)) => bases_match(a.base, b.base, a.qual, b.qual, low_qual_threshold),
        _ => true,
    }
}

/// Merge a read base into a consensus slot.
///
/// An unset slot takes the read base. Agreeing bases, or a low-quality read
/// base, keep the higher quality. A disagreeing base replaces a low-quality
/// consensus base; otherwise the slot is left unchanged and `true` is
/// returned to flag a mismatch.
pub(crate) fn merge_base(
    slot: &mut Option<BaseCall>,
    base: u8,
    qual: u8,
    low_qual_threshold: u8,
) -> bool {
    match slot {
        None => {
            *slot = Some(BaseCall::new(base, qual));
            false
        }
        Some(call) if call.base == base || qual < low_qual_threshold => {
            call.qual = call.qual.max(qual);
            false
        }
        Some(call) if call.qual < low_qual_threshold => {
            *call = BaseCall::new(base, qual);
            false
        }
        Some(_) => true,
    }
}

/// Inclusive index ranges of consecutive unset slots.
pub fn find_unset_bases(slots: &[Option<BaseCall>]) -> Vec<RangeInclusive<usize>> {
    let mut ranges = Vec::new();
    let mut range_start: Option<usize> = None;

    for (i, slot) in slots.iter().enumerate() {
        match (slot, range_start) {
            (None, None) => range_start = Some(i),
            (Some(_), Some(start)) => {
                ranges.push(start..=i - 1);
                range_start = None;
            }
            _ => {}
        }
    }

    if let Some(start) = range_start {
        ranges.push(start..=slots.len() - 1);
    }

    ranges
}
