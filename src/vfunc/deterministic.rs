use burn::module::Module;
use burn::tensor::Tensor;
use burn::tensor::backend::Backend;
use log::debug;

use super::base::{BaseVfunc, VfuncBase};
use super::output::{AuxState, Mask, Values, VfuncOutput};
use super::{batch_major, time_major};
use crate::config::{VfuncConfig, get_device};
use crate::error::VfuncError;
use crate::net::{HiddenState, Recurrence, ValueNetwork};
use crate::parallel::{ExecutionStrategy, Replicated, SingleDevice};
use crate::space::ObservationSpace;

/// Builder for [`DeterministicVfunc`] with device placement and optional
/// data-parallel replication.
pub struct DeterministicVfuncBuilder<B: Backend, N> {
    ob_space: ObservationSpace,
    net: N,
    device: Option<B::Device>,
    replica_devices: Vec<B::Device>,
    config: VfuncConfig,
}

impl<B: Backend, N: ValueNetwork<B>> DeterministicVfuncBuilder<B, N> {
    pub fn new(ob_space: ObservationSpace, net: N) -> Self {
        Self {
            ob_space,
            net,
            device: None,
            replica_devices: Vec::new(),
            config: VfuncConfig::default(),
        }
    }

    /// Device the network is moved to. Defaults to the first replica device,
    /// then to [`get_device`].
    pub fn with_device(mut self, device: B::Device) -> Self {
        self.device = Some(device);
        self
    }

    pub fn with_config(mut self, config: VfuncConfig) -> Self {
        self.config = config;
        self
    }

    /// Enables replicated execution over `devices`, scattering along `dim`.
    pub fn with_data_parallel(mut self, devices: Vec<B::Device>, dim: usize) -> Self {
        self.replica_devices = devices;
        self.config = self.config.with_data_parallel(dim);
        self
    }

    pub fn build(self) -> Result<DeterministicVfunc<B, N>, VfuncError> {
        let recurrence = self.net.recurrence();
        let device = self
            .device
            .or_else(|| self.replica_devices.first().cloned())
            .unwrap_or_else(get_device::<B>);
        let dp_net = if self.config.data_parallel {
            let devices = if self.replica_devices.is_empty() {
                vec![device.clone()]
            } else {
                self.replica_devices
            };
            Some(Replicated::for_network(
                devices,
                self.config.parallel_dim,
                recurrence,
            )?)
        } else {
            None
        };
        debug!(
            "value function built: {:?} network, data parallel {}",
            recurrence,
            dp_net.is_some()
        );
        Ok(DeterministicVfunc {
            base: VfuncBase::new(self.ob_space, device.clone(), dp_net.is_some()),
            net: self.net.to_device(&device),
            recurrence,
            dp_net,
            dp_run: false,
        })
    }
}

/// Deterministic state-value function over a wrapped network.
///
/// Feed-forward networks yield one value per sample. Recurrent networks take
/// time-major sequences, carry hidden state between calls and yield one value
/// per step.
#[derive(Debug)]
pub struct DeterministicVfunc<B: Backend, N> {
    base: VfuncBase<B>,
    net: N,
    recurrence: Recurrence,
    dp_net: Option<Replicated<B>>,
    dp_run: bool,
}

impl<B: Backend, N: ValueNetwork<B>> DeterministicVfunc<B, N> {
    /// Single-device value function on [`get_device`].
    pub fn new(ob_space: ObservationSpace, net: N) -> Self {
        Self::with_device(ob_space, net, get_device::<B>())
    }

    pub fn with_device(ob_space: ObservationSpace, net: N, device: B::Device) -> Self {
        let recurrence = net.recurrence();
        Self {
            base: VfuncBase::new(ob_space, device.clone(), false),
            net: net.to_device(&device),
            recurrence,
            dp_net: None,
            dp_run: false,
        }
    }

    pub fn builder(ob_space: ObservationSpace, net: N) -> DeterministicVfuncBuilder<B, N> {
        DeterministicVfuncBuilder::new(ob_space, net)
    }

    pub fn net(&self) -> &N {
        &self.net
    }

    pub fn into_net(self) -> N {
        self.net
    }

    pub fn recurrence(&self) -> Recurrence {
        self.recurrence
    }

    pub fn replicated(&self) -> Option<&Replicated<B>> {
        self.dp_net.as_ref()
    }

    pub fn dp_run(&self) -> bool {
        self.dp_run
    }

    /// Routes forward passes through the replicated strategy.
    pub fn set_dp_run(&mut self, enabled: bool) -> Result<(), VfuncError> {
        if enabled && self.dp_net.is_none() {
            return Err(VfuncError::DataParallelUnavailable);
        }
        self.dp_run = enabled;
        Ok(())
    }

    /// Zero hidden state for `batch_size` sequences on this function's device.
    pub fn init_hs(&self, batch_size: usize) -> Result<HiddenState<B>, VfuncError> {
        self.net.init_hs(batch_size, self.device())
    }

    /// Value estimates for `obs`.
    ///
    /// Feed-forward networks read `obs` as `[batch, ...]`, ignore `hs` and
    /// `masks`, and return [`Values::Batch`] with an empty [`AuxState`]. An
    /// empty batch yields an empty `[0]` vector.
    ///
    /// Recurrent networks read `obs` as `[time, batch, ...]`. A missing `hs` is
    /// replaced by the network's zero state and a missing mask by zeros, both
    /// on this function's device. The result is [`Values::Sequence`] of shape
    /// `[time, batch]` and an [`AuxState`] holding the updated hidden state.
    /// Only the value axis is dropped: a single step still comes back as
    /// `[1, batch]`, never as `[batch]`.
    pub fn forward<const D: usize>(
        &self,
        obs: Tensor<B, D>,
        hs: Option<HiddenState<B>>,
        masks: Option<Mask<B>>,
    ) -> Result<VfuncOutput<B>, VfuncError> {
        match self.recurrence {
            Recurrence::FeedForward => Ok(VfuncOutput {
                values: Values::Batch(self.forward_batch(obs)?),
                aux: AuxState::empty(),
            }),
            Recurrence::Recurrent => self.forward_sequence(obs, hs, masks),
        }
    }

    /// Flat value vector for a feed-forward batch.
    pub fn forward_batch<const D: usize>(
        &self,
        obs: Tensor<B, D>,
    ) -> Result<Tensor<B, 1>, VfuncError> {
        let values = if self.dp_run {
            self.replicated_strategy()?.run(&self.net, batch_major(obs))?
        } else {
            SingleDevice.run(&self.net, batch_major(obs))?
        };
        Ok(values.flatten(0, 1))
    }

    fn forward_sequence<const D: usize>(
        &self,
        obs: Tensor<B, D>,
        hs: Option<HiddenState<B>>,
        masks: Option<Mask<B>>,
    ) -> Result<VfuncOutput<B>, VfuncError> {
        let obs = time_major(obs)?;
        let [steps, batch, _] = obs.dims();
        let hs = match hs {
            Some(hs) => hs,
            None => {
                debug!("initializing zero hidden state for batch of {batch}");
                self.net.init_hs(batch, self.device())?
            }
        };
        let masks = match masks {
            Some(masks) => masks.canonical(steps, batch)?,
            None => Tensor::zeros([steps, batch, 1], self.device()),
        };

        let (values, hs) = if self.dp_run {
            self.replicated_strategy()?
                .run_recurrent(&self.net, obs, hs, masks)?
        } else {
            SingleDevice.run_recurrent(&self.net, obs, hs, masks)?
        };

        let dims = values.dims();
        if dims[2] != 1 {
            return Err(VfuncError::ShapeMismatch {
                expected: "[time, batch, 1] recurrent values",
                actual: dims.to_vec(),
            });
        }
        Ok(VfuncOutput {
            values: Values::Sequence(values.reshape([dims[0], dims[1]])),
            aux: AuxState::with_hs(hs),
        })
    }

    fn replicated_strategy(&self) -> Result<&Replicated<B>, VfuncError> {
        self.dp_net
            .as_ref()
            .ok_or(VfuncError::DataParallelUnavailable)
    }
}

impl<B: Backend, N: ValueNetwork<B>> BaseVfunc<B> for DeterministicVfunc<B, N> {
    fn base(&self) -> &VfuncBase<B> {
        &self.base
    }

    fn is_recurrent(&self) -> bool {
        self.recurrence == Recurrence::Recurrent
    }
}
