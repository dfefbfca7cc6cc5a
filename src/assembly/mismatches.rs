use std::collections::BTreeMap;

/// Alternate base observed at one assembly index, with the reads carrying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseMismatch {
    /// Alternate base.
    pub base: u8,
    /// Support-list indices of the reads carrying the base.
    pub support_indices: Vec<usize>,
    /// Sum of the alternate base qualities.
    pub qual_total: u32,
    /// Highest alternate base quality.
    pub max_qual: u8,
}

impl BaseMismatch {
    fn new(base: u8, support_index: usize, qual: u8) -> Self {
        Self {
            base,
            support_indices: vec![support_index],
            qual_total: qual as u32,
            max_qual: qual,
        }
    }

    fn add(&mut self, support_index: usize, qual: u8) {
        self.support_indices.push(support_index);
        self.qual_total += qual as u32;
        self.max_qual = self.max_qual.max(qual);
    }

    /// Number of reads carrying the alternate base.
    pub fn read_count(&self) -> usize {
        self.support_indices.len()
    }
}

/// All alternate bases recorded at one assembly index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaseMismatches {
    mismatches: Vec<BaseMismatch>,
}

impl BaseMismatches {
    fn add(&mut self, base: u8, support_index: usize, qual: u8) {
        match self.mismatches.iter_mut().find(|m| m.base == base) {
            Some(existing) => existing.add(support_index, qual),
            None => self.mismatches.push(BaseMismatch::new(base, support_index, qual)),
        }
    }

    /// Alternate bases in the order first observed.
    pub fn iter(&self) -> impl Iterator<Item = &BaseMismatch> {
        self.mismatches.iter()
    }

    /// Number of distinct alternate bases.
    pub fn len(&self) -> usize {
        self.mismatches.len()
    }

    /// Whether no alternate base is recorded.
    pub fn is_empty(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Sparse record of consensus disagreements, keyed by assembly index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceMismatches {
    indexed: BTreeMap<usize, BaseMismatches>,
}

impl SequenceMismatches {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `base` from the read at `support_index` disagreeing at `index`.
    pub fn add(&mut self, index: usize, base: u8, support_index: usize, qual: u8) {
        self.indexed.entry(index).or_default().add(base, support_index, qual);
    }

    /// Mismatches in ascending assembly index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &BaseMismatches)> {
        self.indexed.iter().map(|(index, mismatches)| (*index, mismatches))
    }

    /// Mismatches recorded at one index.
    pub fn get(&self, index: usize) -> Option<&BaseMismatches> {
        self.indexed.get(&index)
    }

    /// Number of assembly indices with at least one mismatch.
    pub fn position_count(&self) -> usize {
        self.indexed.len()
    }

    /// Number of distinct (index, base) mismatches.
    pub fn distinct_base_count(&self) -> usize {
        self.indexed.values().map(BaseMismatches::len).sum()
    }

    /// Move every index right by `offset` after bases are prepended.
    pub fn shift(&mut self, offset: usize) {
        if offset == 0 {
            return;
        }
        let indexed = std::mem::take(&mut self.indexed);
        self.indexed = indexed.into_iter().map(|(index, m)| (index + offset, m)).collect();
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.indexed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregates_by_index_and_base() {
        let mut mismatches = SequenceMismatches::new();
        mismatches.add(5, b'T', 1, 30);
        mismatches.add(5, b'T', 2, 37);
        mismatches.add(5, b'G', 3, 20);
        mismatches.add(9, b'A', 1, 30);

        assert_eq!(mismatches.position_count(), 2);
        assert_eq!(mismatches.distinct_base_count(), 3);

        let at_five: Vec<_> = mismatches.get(5).unwrap().iter().collect();
        assert_eq!(at_five[0].base, b'T');
        assert_eq!(at_five[0].support_indices, vec![1, 2]);
        assert_eq!(at_five[0].qual_total, 67);
        assert_eq!(at_five[0].max_qual, 37);
        assert_eq!(at_five[1].read_count(), 1);
    }

    #[test]
    fn shift_moves_indices() {
        let mut mismatches = SequenceMismatches::new();
        mismatches.add(0, b'C', 0, 30);
        mismatches.add(4, b'C', 0, 30);
        mismatches.shift(10);
        let indices: Vec<usize> = mismatches.iter().map(|(i, _)| i).collect();
        assert_eq!(indices, vec![10, 14]);
    }
}
