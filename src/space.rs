use serde::{Deserialize, Serialize};

/// Shape and type metadata of the observations fed to a value function.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObservationSpace {
    /// Continuous observations of a fixed shape.
    Box { shape: Vec<usize> },
    /// A single integer observation in `0..n`.
    Discrete { n: usize },
}

impl ObservationSpace {
    pub fn boxed(shape: impl Into<Vec<usize>>) -> Self {
        Self::Box {
            shape: shape.into(),
        }
    }

    pub fn discrete(n: usize) -> Self {
        Self::Discrete { n }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            Self::Box { shape } => shape,
            Self::Discrete { .. } => &[],
        }
    }

    /// Number of scalar features one observation flattens to.
    pub fn flat_dim(&self) -> usize {
        match self {
            Self::Box { shape } => shape.iter().product(),
            Self::Discrete { .. } => 1,
        }
    }
}
