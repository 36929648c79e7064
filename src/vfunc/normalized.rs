use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor};
use log::warn;

use super::base::{BaseVfunc, VfuncBase};
use super::deterministic::DeterministicVfunc;
use crate::config::{StdValidation, VfuncConfig, get_device};
use crate::error::VfuncError;
use crate::net::{Recurrence, ValueNetwork};
use crate::space::ObservationSpace;
use crate::stats::RunningMeanStd;

/// Value function whose raw network output is rescaled as `raw * std + mean`.
///
/// Always runs the network directly on a single device. Recurrent networks are
/// rejected at construction: this variant has no hidden-state path.
#[derive(Debug)]
pub struct NormalizedDeterministicVfunc<B: Backend, N> {
    inner: DeterministicVfunc<B, N>,
    x_mean: Tensor<B, 1>,
    x_std: Tensor<B, 1>,
    std_validation: StdValidation,
}

impl<B: Backend, N: ValueNetwork<B>> NormalizedDeterministicVfunc<B, N> {
    pub fn new(ob_space: ObservationSpace, net: N) -> Result<Self, VfuncError> {
        Self::with_device(ob_space, net, get_device::<B>())
    }

    pub fn with_device(
        ob_space: ObservationSpace,
        net: N,
        device: B::Device,
    ) -> Result<Self, VfuncError> {
        if net.recurrence() == Recurrence::Recurrent {
            return Err(VfuncError::RecurrentUnsupported);
        }
        let x_mean = Tensor::from_floats([0.0], &device);
        let x_std = Tensor::from_floats([1.0], &device);
        Ok(Self {
            inner: DeterministicVfunc::with_device(ob_space, net, device),
            x_mean,
            x_std,
            std_validation: StdValidation::default(),
        })
    }

    /// Applies the std validation from `config`. Data-parallel settings are
    /// not supported by this variant and are ignored.
    pub fn from_config(
        ob_space: ObservationSpace,
        net: N,
        config: &VfuncConfig,
    ) -> Result<Self, VfuncError> {
        if config.data_parallel {
            warn!("normalized value functions run on a single device; data_parallel ignored");
        }
        Ok(Self::new(ob_space, net)?.with_std_validation(config.std_validation))
    }

    pub fn with_std_validation(mut self, validation: StdValidation) -> Self {
        self.std_validation = validation;
        self
    }

    pub fn net(&self) -> &N {
        self.inner.net()
    }

    pub fn mean(&self) -> &Tensor<B, 1> {
        &self.x_mean
    }

    pub fn std(&self) -> &Tensor<B, 1> {
        &self.x_std
    }

    /// Flattened network output before rescaling. An empty batch yields an
    /// empty vector.
    pub fn raw<const D: usize>(&self, obs: Tensor<B, D>) -> Tensor<B, 1> {
        let obs = super::batch_major(obs);
        if obs.dims()[0] == 0 {
            return Tensor::zeros([0], &obs.device());
        }
        self.inner.net().forward(obs).flatten(0, 1)
    }

    pub fn forward<const D: usize>(&self, obs: Tensor<B, D>) -> Tensor<B, 1> {
        let raw = self.raw(obs);
        let batch = raw.dims()[0];
        if batch == 0 {
            return raw;
        }
        let std = self.x_std.clone().repeat_dim(0, batch);
        let mean = self.x_mean.clone().repeat_dim(0, batch);
        raw * std + mean
    }

    /// Overwrites the mean buffer; `mean` must hold exactly one element.
    pub fn set_mean(&mut self, mean: Tensor<B, 1>) -> Result<(), VfuncError> {
        ensure_single(&mean)?;
        self.x_mean = mean.to_device(self.device());
        Ok(())
    }

    /// Overwrites the std buffer; `std` must hold exactly one element and pass
    /// the configured [`StdValidation`].
    pub fn set_std(&mut self, std: Tensor<B, 1>) -> Result<(), VfuncError> {
        ensure_single(&std)?;
        let value: f32 = std.clone().into_scalar().elem();
        if !self.std_validation.accepts(value) {
            return Err(VfuncError::InvalidStd(value));
        }
        if !value.is_finite() || value <= 0.0 {
            warn!("normalized value function std set to {value}");
        }
        self.x_std = std.to_device(self.device());
        Ok(())
    }

    pub fn set_mean_scalar(&mut self, mean: f32) -> Result<(), VfuncError> {
        let mean = Tensor::from_floats([mean], self.device());
        self.set_mean(mean)
    }

    pub fn set_std_scalar(&mut self, std: f32) -> Result<(), VfuncError> {
        let std = Tensor::from_floats([std], self.device());
        self.set_std(std)
    }

    /// Injects mean and std from running return statistics.
    pub fn sync_stats(&mut self, stats: &RunningMeanStd) -> Result<(), VfuncError> {
        self.set_std_scalar(stats.std() as f32)?;
        self.set_mean_scalar(stats.mean() as f32)
    }
}

impl<B: Backend, N: ValueNetwork<B>> BaseVfunc<B> for NormalizedDeterministicVfunc<B, N> {
    fn base(&self) -> &VfuncBase<B> {
        self.inner.base()
    }

    fn is_recurrent(&self) -> bool {
        false
    }
}

fn ensure_single<B: Backend>(buffer: &Tensor<B, 1>) -> Result<(), VfuncError> {
    let dims = buffer.dims();
    if dims[0] != 1 {
        return Err(VfuncError::ShapeMismatch {
            expected: "single-element buffer",
            actual: dims.to_vec(),
        });
    }
    Ok(())
}
