use burn::tensor::backend::Backend;

use crate::space::ObservationSpace;

/// State every value function carries regardless of its network.
#[derive(Clone, Debug)]
pub struct VfuncBase<B: Backend> {
    ob_space: ObservationSpace,
    device: B::Device,
    data_parallel: bool,
}

impl<B: Backend> VfuncBase<B> {
    pub fn new(ob_space: ObservationSpace, device: B::Device, data_parallel: bool) -> Self {
        Self {
            ob_space,
            device,
            data_parallel,
        }
    }
}

/// Common surface of the value functions.
pub trait BaseVfunc<B: Backend> {
    fn base(&self) -> &VfuncBase<B>;

    fn is_recurrent(&self) -> bool;

    fn ob_space(&self) -> &ObservationSpace {
        &self.base().ob_space
    }

    /// Device the network parameters were placed on at construction.
    fn device(&self) -> &B::Device {
        &self.base().device
    }

    fn data_parallel(&self) -> bool {
        self.base().data_parallel
    }
}
