pub mod lstm;
pub mod mlp;

use burn::module::Module;
use burn::tensor::Tensor;
use burn::tensor::backend::Backend;

use crate::error::VfuncError;

pub use lstm::{LstmValueNet, LstmValueNetConfig};
pub use mlp::{MlpValueNet, MlpValueNetConfig};

/// Whether a network carries hidden state between time steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Recurrence {
    FeedForward,
    Recurrent,
}

/// Network contract consumed by the value functions.
///
/// Feed-forward networks only implement [`ValueNetwork::forward`]. Recurrent
/// networks additionally report [`Recurrence::Recurrent`] and implement the
/// hidden-state initializer and the sequence pass.
pub trait ValueNetwork<B: Backend>: Module<B> {
    fn recurrence(&self) -> Recurrence {
        Recurrence::FeedForward
    }

    /// Maps `[batch, features]` observations to `[batch, 1]` values.
    fn forward(&self, obs: Tensor<B, 2>) -> Tensor<B, 2>;

    /// Zero hidden state for `batch_size` sequences.
    fn init_hs(
        &self,
        _batch_size: usize,
        _device: &B::Device,
    ) -> Result<HiddenState<B>, VfuncError> {
        Err(VfuncError::NotRecurrent)
    }

    /// Maps `[time, batch, features]` observations, the incoming hidden state
    /// and `[time, batch, 1]` masks to `[time, batch, 1]` values and the hidden
    /// state after the last step.
    fn forward_recurrent(
        &self,
        _obs: Tensor<B, 3>,
        _hs: HiddenState<B>,
        _masks: Tensor<B, 3>,
    ) -> Result<(Tensor<B, 3>, HiddenState<B>), VfuncError> {
        Err(VfuncError::NotRecurrent)
    }
}

/// Hidden state of a recurrent network, laid out `[batch, hidden]`.
///
/// `cell` is present for LSTM-style networks and absent for GRU-style ones.
#[derive(Clone, Debug)]
pub struct HiddenState<B: Backend> {
    pub hidden: Tensor<B, 2>,
    pub cell: Option<Tensor<B, 2>>,
}

impl<B: Backend> HiddenState<B> {
    pub fn lstm(hidden: Tensor<B, 2>, cell: Tensor<B, 2>) -> Self {
        Self {
            hidden,
            cell: Some(cell),
        }
    }

    pub fn gru(hidden: Tensor<B, 2>) -> Self {
        Self { hidden, cell: None }
    }

    pub fn zeros(
        batch_size: usize,
        hidden_size: usize,
        with_cell: bool,
        device: &B::Device,
    ) -> Self {
        let hidden = Tensor::zeros([batch_size, hidden_size], device);
        let cell = with_cell.then(|| Tensor::zeros([batch_size, hidden_size], device));
        Self { hidden, cell }
    }

    pub fn batch_size(&self) -> usize {
        self.hidden.dims()[0]
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden.dims()[1]
    }

    pub fn to_device(self, device: &B::Device) -> Self {
        Self {
            hidden: self.hidden.to_device(device),
            cell: self.cell.map(|cell| cell.to_device(device)),
        }
    }

    /// Splits the batch into at most `parts` contiguous chunks.
    pub fn split(self, parts: usize) -> Vec<Self> {
        let hidden = self.hidden.chunk(parts, 0);
        match self.cell {
            Some(cell) => hidden
                .into_iter()
                .zip(cell.chunk(parts, 0))
                .map(|(hidden, cell)| Self::lstm(hidden, cell))
                .collect(),
            None => hidden.into_iter().map(Self::gru).collect(),
        }
    }

    /// Joins states along the batch axis; `None` when `states` is empty.
    pub fn concat(states: Vec<Self>) -> Option<Self> {
        if states.is_empty() {
            return None;
        }
        let cells: Option<Vec<Tensor<B, 2>>> =
            states.iter().map(|state| state.cell.clone()).collect();
        let hidden = states.into_iter().map(|state| state.hidden).collect();
        Some(Self {
            hidden: Tensor::cat(hidden, 0),
            cell: cells.map(|cells| Tensor::cat(cells, 0)),
        })
    }
}
