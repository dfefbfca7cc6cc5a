use std::fmt;

use super::ReadError;

/// CIGAR operation kinds describing how a read aligns to the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CigarOpKind {
    /// Consuming match/mismatch (`M`, `=`, `X`).
    Match,
    /// Insertion relative to the reference.
    Insertion,
    /// Deletion relative to the reference.
    Deletion,
    /// Skipped reference region (`N`).
    Skip,
    /// Soft clipping (sequence present in read only).
    SoftClip,
    /// Hard clipping (trimmed sequence not present in read).
    HardClip,
}

impl CigarOpKind {
    /// Whether the operation advances along the reference.
    pub fn consumes_reference(self) -> bool {
        matches!(self, Self::Match | Self::Deletion | Self::Skip)
    }

    /// Whether the operation consumes bases of the read sequence.
    pub fn consumes_read(self) -> bool {
        matches!(self, Self::Match | Self::Insertion | Self::SoftClip)
    }

    fn code(self) -> char {
        match self {
            Self::Match => 'M',
            Self::Insertion => 'I',
            Self::Deletion => 'D',
            Self::Skip => 'N',
            Self::SoftClip => 'S',
            Self::HardClip => 'H',
        }
    }

    fn from_code(code: char) -> Option<Self> {
        match code {
            'M' | '=' | 'X' => Some(Self::Match),
            'I' => Some(Self::Insertion),
            'D' => Some(Self::Deletion),
            'N' => Some(Self::Skip),
            'S' => Some(Self::SoftClip),
            'H' => Some(Self::HardClip),
            _ => None,
        }
    }
}

/// CIGAR operation with length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CigarOp {
    /// Operation kind.
    pub kind: CigarOpKind,
    /// Number of bases affected by the operation.
    pub len: u32,
}

impl CigarOp {
    /// Construct a new CIGAR operation.
    pub fn new(kind: CigarOpKind, len: u32) -> Self {
        Self { kind, len }
    }

    /// Number of read bases consumed by this operation.
    pub fn read_len(&self) -> usize {
        if self.kind.consumes_read() {
            self.len as usize
        } else {
            0
        }
    }

    /// Number of reference bases consumed by this operation.
    pub fn ref_len(&self) -> i32 {
        if self.kind.consumes_reference() {
            self.len as i32
        } else {
            0
        }
    }
}

impl fmt::Display for CigarOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.len, self.kind.code())
    }
}

/// Parse a SAM-style CIGAR string such as `30M2I18M20S`.
///
/// `*` and the empty string denote an unmapped read and yield no operations.
pub fn parse_cigar(cigar: &str) -> Result<Vec<CigarOp>, ReadError> {
    if cigar.is_empty() || cigar == "*" {
        return Ok(Vec::new());
    }

    let mut ops = Vec::new();
    let mut len: Option<u32> = None;

    for c in cigar.chars() {
        if let Some(digit) = c.to_digit(10) {
            let current = len.unwrap_or(0);
            len = Some(
                current
                    .checked_mul(10)
                    .and_then(|v| v.checked_add(digit))
                    .ok_or_else(|| ReadError::InvalidCigar(cigar.to_string()))?,
            );
            continue;
        }

        let kind =
            CigarOpKind::from_code(c).ok_or_else(|| ReadError::InvalidCigar(cigar.to_string()))?;
        match len.take() {
            Some(op_len) if op_len > 0 => ops.push(CigarOp::new(kind, op_len)),
            _ => return Err(ReadError::InvalidCigar(cigar.to_string())),
        }
    }

    if len.is_some() {
        return Err(ReadError::InvalidCigar(cigar.to_string()));
    }

    Ok(ops)
}

/// Render operations back into CIGAR string form.
pub fn cigar_to_string(ops: &[CigarOp]) -> String {
    if ops.is_empty() {
        return "*".to_string();
    }
    ops.iter().map(|op| op.to_string()).collect()
}
