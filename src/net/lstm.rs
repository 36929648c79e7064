use burn::module::Module;
use burn::nn::{Linear, LinearConfig, Lstm, LstmConfig, LstmState};
use burn::tensor::Tensor;
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;

use super::{HiddenState, Recurrence, ValueNetwork};
use crate::error::VfuncError;

#[derive(Clone, Debug)]
pub struct LstmValueNetConfig {
    pub d_input: usize,
    pub d_embed: usize,
    pub d_hidden: usize,
}

impl LstmValueNetConfig {
    pub fn new(d_input: usize, d_hidden: usize) -> Self {
        Self {
            d_input,
            d_embed: d_hidden,
            d_hidden,
        }
    }

    pub fn with_embed(mut self, d_embed: usize) -> Self {
        self.d_embed = d_embed;
        self
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> LstmValueNet<B> {
        LstmValueNet {
            embed: LinearConfig::new(self.d_input, self.d_embed).init(device),
            lstm: LstmConfig::new(self.d_embed, self.d_hidden, true).init(device),
            output: LinearConfig::new(self.d_hidden, 1).init(device),
            d_hidden: self.d_hidden,
        }
    }
}

/// Recurrent state-value network: linear embedding, LSTM core and a scalar head.
///
/// Sequences are time-major. A mask value of 1 at step `t` marks an episode
/// boundary: the carried state is zeroed before step `t` is processed.
#[derive(Module, Debug)]
pub struct LstmValueNet<B: Backend> {
    embed: Linear<B>,
    lstm: Lstm<B>,
    output: Linear<B>,
    d_hidden: usize,
}

impl<B: Backend> LstmValueNet<B> {
    pub fn hidden_size(&self) -> usize {
        self.d_hidden
    }

    fn unroll(
        &self,
        obs: Tensor<B, 3>,
        hs: HiddenState<B>,
        masks: Tensor<B, 3>,
    ) -> (Tensor<B, 3>, HiddenState<B>) {
        let [steps, batch, features] = obs.dims();
        let device = obs.device();
        let mut hidden = hs.hidden;
        let mut cell = hs
            .cell
            .unwrap_or_else(|| Tensor::zeros([batch, self.d_hidden], &device));
        let mut values = Vec::with_capacity(steps);
        for t in 0..steps {
            let keep = masks
                .clone()
                .slice([t..t + 1, 0..batch, 0..1])
                .reshape([batch, 1])
                .neg()
                .add_scalar(1.0)
                .repeat_dim(1, self.d_hidden);
            hidden = hidden * keep.clone();
            cell = cell * keep;

            let step = obs
                .clone()
                .slice([t..t + 1, 0..batch, 0..features])
                .reshape([batch, 1, features]);
            let embedded = relu(self.embed.forward(step));
            let (output, state) = self
                .lstm
                .forward(embedded, Some(LstmState::new(cell, hidden)));
            hidden = state.hidden;
            cell = state.cell;

            let value = self
                .output
                .forward(output.reshape([batch, self.d_hidden]))
                .reshape([1, batch, 1]);
            values.push(value);
        }
        (Tensor::cat(values, 0), HiddenState::lstm(hidden, cell))
    }
}

impl<B: Backend> ValueNetwork<B> for LstmValueNet<B> {
    fn recurrence(&self) -> Recurrence {
        Recurrence::Recurrent
    }

    /// Single step from a zero state.
    fn forward(&self, obs: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch, features] = obs.dims();
        let device = obs.device();
        let hs = HiddenState::zeros(batch, self.d_hidden, true, &device);
        let masks = Tensor::zeros([1, batch, 1], &device);
        let (values, _) = self.unroll(obs.reshape([1, batch, features]), hs, masks);
        values.reshape([batch, 1])
    }

    fn init_hs(
        &self,
        batch_size: usize,
        device: &B::Device,
    ) -> Result<HiddenState<B>, VfuncError> {
        Ok(HiddenState::zeros(batch_size, self.d_hidden, true, device))
    }

    fn forward_recurrent(
        &self,
        obs: Tensor<B, 3>,
        hs: HiddenState<B>,
        masks: Tensor<B, 3>,
    ) -> Result<(Tensor<B, 3>, HiddenState<B>), VfuncError> {
        if obs.dims()[0] == 0 {
            return Err(VfuncError::ShapeMismatch {
                expected: "at least one time step",
                actual: obs.dims().to_vec(),
            });
        }
        Ok(self.unroll(obs, hs, masks))
    }
}
