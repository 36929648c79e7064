use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};

/// Returns the compute device value functions are placed on when none is given.
pub fn get_device<B>() -> B::Device
where
    B: Backend,
    B::Device: Default,
{
    B::Device::default()
}

/// How the normalized value function checks injected standard deviations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StdValidation {
    /// Accept any value, including zero or negative ones.
    #[default]
    Unchecked,
    /// Reject values that are not finite and strictly positive.
    Positive,
}

impl StdValidation {
    pub fn accepts(self, std: f32) -> bool {
        match self {
            Self::Unchecked => true,
            Self::Positive => std.is_finite() && std > 0.0,
        }
    }
}

/// Construction options shared by the value functions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VfuncConfig {
    pub data_parallel: bool,
    /// Observation axis scattered across replicas: 0 for feed-forward
    /// batches, 1 for time-major recurrent sequences.
    pub parallel_dim: usize,
    pub std_validation: StdValidation,
}

impl VfuncConfig {
    pub fn with_data_parallel(mut self, parallel_dim: usize) -> Self {
        self.data_parallel = true;
        self.parallel_dim = parallel_dim;
        self
    }

    pub fn with_std_validation(mut self, validation: StdValidation) -> Self {
        self.std_validation = validation;
        self
    }
}
