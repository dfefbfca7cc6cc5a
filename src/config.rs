//! Thresholds governing consensus merging, splitting and reference extension.

use thiserror::Error;

/// Errors raised for inconsistent assembly thresholds.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A threshold that must be positive was zero.
    #[error("invalid assembly configuration: {0} must be > 0")]
    ZeroThreshold(&'static str),

    /// Quality threshold outside the Phred range.
    #[error("invalid low base quality threshold {value} (must be <= {max})")]
    InvalidQuality {
        /// Supplied threshold.
        value: u8,
        /// Highest valid Phred quality.
        max: u8,
    },
}

/// Highest Phred quality representable in SAM/BAM.
pub const MAX_PHRED_QUALITY: u8 = 93;

/// Numeric configuration shared by every assembly stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AssemblyConfig {
    /// Bases below this quality match any base and may be overwritten.
    pub low_base_qual_threshold: u8,
    /// Reads needed to emit a split sequence or to trust a mismatch.
    pub min_read_support: usize,
    /// Minimum summed quality for a mismatch to define a split sequence.
    pub min_mismatch_total_qual: u32,
    /// Mismatches a read may carry and still support a sequence.
    pub max_base_mismatches: usize,
    /// Populated bases a read must overlap to join a reference-side assembly.
    pub ref_side_min_overlap: usize,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            low_base_qual_threshold: 26,
            min_read_support: 2,
            min_mismatch_total_qual: 60,
            max_base_mismatches: 2,
            ref_side_min_overlap: 10,
        }
    }
}

impl AssemblyConfig {
    /// Set the low base quality threshold.
    pub fn with_low_base_qual_threshold(mut self, threshold: u8) -> Self {
        self.low_base_qual_threshold = threshold;
        self
    }

    /// Set the minimum read support.
    pub fn with_min_read_support(mut self, reads: usize) -> Self {
        self.min_read_support = reads;
        self
    }

    /// Set the minimum mismatch quality total.
    pub fn with_min_mismatch_total_qual(mut self, qual: u32) -> Self {
        self.min_mismatch_total_qual = qual;
        self
    }

    /// Set the permitted base mismatches.
    pub fn with_max_base_mismatches(mut self, mismatches: usize) -> Self {
        self.max_base_mismatches = mismatches;
        self
    }

    /// Set the required reference-side overlap.
    pub fn with_ref_side_min_overlap(mut self, overlap: usize) -> Self {
        self.ref_side_min_overlap = overlap;
        self
    }

    /// Check the thresholds are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_read_support == 0 {
            return Err(ConfigError::ZeroThreshold("min_read_support"));
        }
        if self.low_base_qual_threshold > MAX_PHRED_QUALITY {
            return Err(ConfigError::InvalidQuality {
                value: self.low_base_qual_threshold,
                max: MAX_PHRED_QUALITY,
            });
        }
        Ok(())
    }
}
