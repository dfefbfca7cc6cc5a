use std::fmt;
use std::sync::Arc;

/// Direction in which an assembly extends away from its junction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Orientation {
    /// Soft-clipped bases lie to the right of the junction.
    Forward,
    /// Soft-clipped bases lie to the left of the junction.
    Reverse,
}

impl Orientation {
    /// Conventional `+1` / `-1` encoding.
    pub fn as_i8(self) -> i8 {
        match self {
            Self::Forward => 1,
            Self::Reverse => -1,
        }
    }
}

/// Candidate breakpoint: chromosome, 1-based position and break orientation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Junction {
    /// Chromosome name.
    pub chromosome: Arc<str>,
    /// Last aligned reference position before the break.
    pub position: i32,
    /// Break orientation.
    pub orientation: Orientation,
}

impl Junction {
    /// Construct a junction.
    pub fn new(chromosome: impl Into<Arc<str>>, position: i32, orientation: Orientation) -> Self {
        Self {
            chromosome: chromosome.into(),
            position,
            orientation,
        }
    }

    /// Whether the assembly extends rightwards past the junction.
    pub fn is_forward(&self) -> bool {
        self.orientation == Orientation::Forward
    }
}

impl fmt::Display for Junction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.chromosome, self.position, self.orientation.as_i8())
    }
}
