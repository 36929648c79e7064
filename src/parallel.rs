use std::{panic, thread};

use burn::module::Module;
use burn::tensor::Tensor;
use burn::tensor::backend::Backend;
use log::debug;

use crate::error::VfuncError;
use crate::net::{HiddenState, Recurrence, ValueNetwork};

/// How a value function runs its network's forward pass.
pub trait ExecutionStrategy<B: Backend> {
    fn run<N: ValueNetwork<B>>(&self, net: &N, obs: Tensor<B, 2>)
        -> Result<Tensor<B, 2>, VfuncError>;

    fn run_recurrent<N: ValueNetwork<B>>(
        &self,
        net: &N,
        obs: Tensor<B, 3>,
        hs: HiddenState<B>,
        masks: Tensor<B, 3>,
    ) -> Result<(Tensor<B, 3>, HiddenState<B>), VfuncError>;
}

/// Runs the network as-is on the device its parameters live on.
#[derive(Clone, Copy, Debug, Default)]
pub struct SingleDevice;

impl<B: Backend> ExecutionStrategy<B> for SingleDevice {
    /// An empty batch yields `[0, 1]` without calling the network.
    fn run<N: ValueNetwork<B>>(
        &self,
        net: &N,
        obs: Tensor<B, 2>,
    ) -> Result<Tensor<B, 2>, VfuncError> {
        if obs.dims()[0] == 0 {
            return Ok(Tensor::zeros([0, 1], &obs.device()));
        }
        Ok(net.forward(obs))
    }

    fn run_recurrent<N: ValueNetwork<B>>(
        &self,
        net: &N,
        obs: Tensor<B, 3>,
        hs: HiddenState<B>,
        masks: Tensor<B, 3>,
    ) -> Result<(Tensor<B, 3>, HiddenState<B>), VfuncError> {
        net.forward_recurrent(obs, hs, masks)
    }
}

/// Scatters the batch across devices, runs a forked replica of the network on
/// each slice and gathers the results back on the input's device.
///
/// Each replica runs on its own scoped thread. A panicking replica is resumed
/// on the calling thread.
///
/// Feed-forward batches are scattered along dim 0. Recurrent sequences are
/// time-major and scattered along dim 1 so every replica sees whole sequences.
#[derive(Clone, Debug)]
pub struct Replicated<B: Backend> {
    devices: Vec<B::Device>,
    dim: usize,
}

impl<B: Backend> Replicated<B> {
    pub fn new(devices: Vec<B::Device>, dim: usize) -> Result<Self, VfuncError> {
        if devices.is_empty() {
            return Err(VfuncError::InvalidConfiguration(
                "data-parallel execution needs at least one device",
            ));
        }
        Ok(Self { devices, dim })
    }

    /// Like [`Replicated::new`], additionally checking that `dim` is the batch
    /// axis for networks of the given kind.
    pub fn for_network(
        devices: Vec<B::Device>,
        dim: usize,
        recurrence: Recurrence,
    ) -> Result<Self, VfuncError> {
        if dim != Self::batch_axis(recurrence) {
            return Err(VfuncError::InvalidConfiguration(match recurrence {
                Recurrence::FeedForward => "feed-forward replicas scatter along dim 0",
                Recurrence::Recurrent => "recurrent replicas scatter along dim 1",
            }));
        }
        Self::new(devices, dim)
    }

    pub fn batch_axis(recurrence: Recurrence) -> usize {
        match recurrence {
            Recurrence::FeedForward => 0,
            Recurrence::Recurrent => 1,
        }
    }

    pub fn devices(&self) -> &[B::Device] {
        &self.devices
    }

    pub fn dim(&self) -> usize {
        self.dim
    }
}

impl<B: Backend> ExecutionStrategy<B> for Replicated<B> {
    fn run<N: ValueNetwork<B>>(
        &self,
        net: &N,
        obs: Tensor<B, 2>,
    ) -> Result<Tensor<B, 2>, VfuncError> {
        if obs.dims()[0] == 0 {
            return SingleDevice.run(net, obs);
        }
        let home = obs.device();
        let chunks = obs.chunk(self.devices.len(), 0);
        debug!("scattering feed-forward batch over {} replicas", chunks.len());
        let outputs = thread::scope(|scope| {
            let handles: Vec<_> = chunks
                .into_iter()
                .zip(&self.devices)
                .map(|(chunk, device)| {
                    let replica = net.clone();
                    let device = device.clone();
                    scope.spawn(move || {
                        let replica = replica.fork(&device);
                        replica.forward(chunk.to_device(&device))
                    })
                })
                .collect();
            handles.into_iter().map(join_replica).collect::<Vec<_>>()
        });
        let outputs = outputs
            .into_iter()
            .map(|values| values.to_device(&home))
            .collect();
        Ok(Tensor::cat(outputs, 0))
    }

    fn run_recurrent<N: ValueNetwork<B>>(
        &self,
        net: &N,
        obs: Tensor<B, 3>,
        hs: HiddenState<B>,
        masks: Tensor<B, 3>,
    ) -> Result<(Tensor<B, 3>, HiddenState<B>), VfuncError> {
        if obs.dims()[1] == 0 {
            return SingleDevice.run_recurrent(net, obs, hs, masks);
        }
        let home = obs.device();
        let parts = self.devices.len();
        let obs_chunks = obs.chunk(parts, 1);
        let mask_chunks = masks.chunk(parts, 1);
        let hs_chunks = hs.split(parts);
        debug!(
            "scattering recurrent batch over {} replicas",
            obs_chunks.len()
        );

        let slices = obs_chunks
            .into_iter()
            .zip(mask_chunks)
            .zip(hs_chunks)
            .zip(&self.devices);
        let results = thread::scope(|scope| {
            let handles: Vec<_> = slices
                .map(|(((obs, masks), hs), device)| {
                    let replica = net.clone();
                    let device = device.clone();
                    scope.spawn(move || {
                        let replica = replica.fork(&device);
                        replica.forward_recurrent(
                            obs.to_device(&device),
                            hs.to_device(&device),
                            masks.to_device(&device),
                        )
                    })
                })
                .collect();
            handles.into_iter().map(join_replica).collect::<Vec<_>>()
        });

        let mut values = Vec::with_capacity(results.len());
        let mut states = Vec::with_capacity(results.len());
        for result in results {
            let (slice_values, slice_hs) = result?;
            values.push(slice_values.to_device(&home));
            states.push(slice_hs.to_device(&home));
        }
        let hs = HiddenState::concat(states).ok_or(VfuncError::ShapeMismatch {
            expected: "hidden state with a non-empty batch",
            actual: Vec::new(),
        })?;
        Ok((Tensor::cat(values, 1), hs))
    }
}

fn join_replica<T>(handle: thread::ScopedJoinHandle<'_, T>) -> T {
    handle
        .join()
        .unwrap_or_else(|payload| panic::resume_unwind(payload))
}
