#![allow(dead_code)]

use burn::module::Module;
use burn::nn::{Initializer, Linear, LinearConfig};
use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use burn_ndarray::{NdArray, NdArrayDevice};

use vfuncs::{HiddenState, Recurrence, ValueNetwork, VfuncError};

pub type TestBackend = NdArray<f32>;

pub const DEVICE: NdArrayDevice = NdArrayDevice::Cpu;

/// Feed-forward net whose value is the sum of the observation features.
#[derive(Module, Debug)]
pub struct SumNet<B: Backend> {
    pub head: Linear<B>,
}

impl<B: Backend> SumNet<B> {
    pub fn new(features: usize, device: &B::Device) -> Self {
        let head = LinearConfig::new(features, 1)
            .with_bias(false)
            .with_initializer(Initializer::Ones)
            .init(device);
        Self { head }
    }
}

impl<B: Backend> ValueNetwork<B> for SumNet<B> {
    fn forward(&self, obs: Tensor<B, 2>) -> Tensor<B, 2> {
        self.head.forward(obs)
    }
}

/// Recurrent net that answers with the mask it was given as values and with
/// the incoming hidden state plus one as the next state.
#[derive(Module, Debug)]
pub struct EchoNet<B: Backend> {
    pub head: Linear<B>,
    pub hidden: usize,
}

impl<B: Backend> EchoNet<B> {
    pub fn new(features: usize, hidden: usize, device: &B::Device) -> Self {
        Self {
            head: LinearConfig::new(features, 1).init(device),
            hidden,
        }
    }
}

impl<B: Backend> ValueNetwork<B> for EchoNet<B> {
    fn recurrence(&self) -> Recurrence {
        Recurrence::Recurrent
    }

    fn forward(&self, obs: Tensor<B, 2>) -> Tensor<B, 2> {
        self.head.forward(obs)
    }

    fn init_hs(
        &self,
        batch_size: usize,
        device: &B::Device,
    ) -> Result<HiddenState<B>, VfuncError> {
        Ok(HiddenState::zeros(batch_size, self.hidden, false, device))
    }

    fn forward_recurrent(
        &self,
        _obs: Tensor<B, 3>,
        hs: HiddenState<B>,
        masks: Tensor<B, 3>,
    ) -> Result<(Tensor<B, 3>, HiddenState<B>), VfuncError> {
        Ok((masks, HiddenState::gru(hs.hidden.add_scalar(1.0))))
    }
}

pub fn tensor<const D: usize>(values: Vec<f32>, shape: [usize; D]) -> Tensor<TestBackend, D> {
    Tensor::from_data(TensorData::new(values, shape), &DEVICE)
}

pub fn floats<const D: usize>(tensor: Tensor<TestBackend, D>) -> Vec<f32> {
    tensor.into_data().to_vec::<f32>().expect("f32 tensor")
}

pub fn assert_close(left: &[f32], right: &[f32]) {
    assert_eq!(left.len(), right.len(), "length mismatch");
    for (a, b) in left.iter().zip(right) {
        assert!((a - b).abs() < 1.0e-5, "{a} != {b}");
    }
}
