use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::Tensor;
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;

use super::ValueNetwork;

pub const DEFAULT_HIDDEN: usize = 64;
pub const DEFAULT_STACK: usize = 2;

#[derive(Clone, Debug)]
pub struct MlpValueNetConfig {
    pub d_input: usize,
    pub d_hidden: usize,
    pub stack_depth: usize,
}

impl MlpValueNetConfig {
    pub fn new(d_input: usize) -> Self {
        Self {
            d_input,
            d_hidden: DEFAULT_HIDDEN,
            stack_depth: DEFAULT_STACK,
        }
    }

    pub fn with_hidden(mut self, d_hidden: usize) -> Self {
        self.d_hidden = d_hidden;
        self
    }

    pub fn with_stack_depth(mut self, stack_depth: usize) -> Self {
        self.stack_depth = stack_depth;
        self
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> MlpValueNet<B> {
        let mut stack = Vec::with_capacity(self.stack_depth);
        let mut input_size = self.d_input;
        for _ in 0..self.stack_depth {
            stack.push(LinearConfig::new(input_size, self.d_hidden).init(device));
            input_size = self.d_hidden;
        }
        let output = LinearConfig::new(input_size, 1).init(device);
        MlpValueNet { stack, output }
    }
}

/// Feed-forward state-value network: ReLU hidden stack and a scalar head.
#[derive(Module, Debug)]
pub struct MlpValueNet<B: Backend> {
    stack: Vec<Linear<B>>,
    output: Linear<B>,
}

impl<B: Backend> ValueNetwork<B> for MlpValueNet<B> {
    fn forward(&self, obs: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut activations = obs;
        for layer in &self.stack {
            activations = relu(layer.forward(activations));
        }
        self.output.forward(activations)
    }
}
