pub mod base;
pub mod deterministic;
pub mod normalized;
pub mod output;

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;

use crate::error::VfuncError;

pub use base::{BaseVfunc, VfuncBase};
pub use deterministic::{DeterministicVfunc, DeterministicVfuncBuilder};
pub use normalized::NormalizedDeterministicVfunc;
pub use output::{AuxState, HS_KEY, Mask, Values, VfuncOutput};

/// `[batch, ...]` observations as `[batch, features]`. Rank-1 input is read as
/// one scalar feature per sample.
pub(crate) fn batch_major<B: Backend, const D: usize>(obs: Tensor<B, D>) -> Tensor<B, 2> {
    let dims = obs.dims();
    let batch = dims[0];
    let features = dims[1..].iter().product::<usize>();
    obs.reshape([batch, features])
}

/// `[time, batch, ...]` observations as `[time, batch, features]`.
pub(crate) fn time_major<B: Backend, const D: usize>(
    obs: Tensor<B, D>,
) -> Result<Tensor<B, 3>, VfuncError> {
    let dims = obs.dims();
    let (steps, batch) = match dims[..] {
        [steps, batch, ..] if steps > 0 && batch > 0 => (steps, batch),
        _ => {
            return Err(VfuncError::ShapeMismatch {
                expected: "non-empty [time, batch, ...] observations",
                actual: dims.to_vec(),
            });
        }
    };
    let features = dims[2..].iter().product::<usize>();
    Ok(obs.reshape([steps, batch, features]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::{NdArray, NdArrayDevice};

    type TestBackend = NdArray<f32>;

    #[test]
    fn batch_major_folds_trailing_axes() {
        let device = NdArrayDevice::Cpu;
        let obs = Tensor::<TestBackend, 4>::zeros([2, 3, 4, 5], &device);
        assert_eq!(batch_major(obs).dims(), [2, 60]);
        let scalars = Tensor::<TestBackend, 1>::zeros([6], &device);
        assert_eq!(batch_major(scalars).dims(), [6, 1]);
    }

    #[test]
    fn time_major_needs_time_and_batch_axes() {
        let device = NdArrayDevice::Cpu;
        let obs = Tensor::<TestBackend, 4>::zeros([3, 2, 2, 2], &device);
        assert_eq!(time_major(obs).expect("rank 4").dims(), [3, 2, 4]);
        let flat = Tensor::<TestBackend, 1>::zeros([3], &device);
        assert!(time_major(flat).is_err());
        let empty = Tensor::<TestBackend, 3>::zeros([0, 2, 1], &device);
        assert!(time_major(empty).is_err());
    }
}
