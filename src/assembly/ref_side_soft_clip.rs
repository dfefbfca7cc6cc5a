use super::Orientation;

/// Soft clips observed on the reference side of an assembly's reads.
///
/// A forward junction's reads may also be clipped on their left edge; those
/// clips are candidate breakends for a second, nearby junction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefSideSoftClip {
    /// Aligned position at which the clip starts.
    pub position: i32,
    /// Orientation of the clip (reverse for left clips).
    pub orientation: Orientation,
    /// Support-list indices of the clipped reads.
    pub support_indices: Vec<usize>,
    /// Longest clip length observed.
    pub max_length: i32,
}

impl RefSideSoftClip {
    pub(crate) fn new(
        position: i32,
        orientation: Orientation,
        support_index: usize,
        length: i32,
    ) -> Self {
        Self {
            position,
            orientation,
            support_indices: vec![support_index],
            max_length: length,
        }
    }

    pub(crate) fn add(&mut self, support_index: usize, length: i32) {
        if !self.support_indices.contains(&support_index) {
            self.support_indices.push(support_index);
        }
        self.max_length = self.max_length.max(length);
    }

    /// Number of reads with this clip.
    pub fn read_count(&self) -> usize {
        self.support_indices.len()
    }
}
