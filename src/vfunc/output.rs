use burn::tensor::Tensor;
use burn::tensor::backend::Backend;

use crate::error::VfuncError;
use crate::net::HiddenState;

/// Key the updated hidden state is reported under in [`AuxState`].
pub const HS_KEY: &str = "hs";

/// Value estimates returned by a forward pass.
#[derive(Clone, Debug)]
pub enum Values<B: Backend> {
    /// One value per sample, `[batch]`.
    Batch(Tensor<B, 1>),
    /// One value per step of each sequence, `[time, batch]`.
    Sequence(Tensor<B, 2>),
}

impl<B: Backend> Values<B> {
    pub fn dims(&self) -> Vec<usize> {
        match self {
            Self::Batch(values) => values.dims().to_vec(),
            Self::Sequence(values) => values.dims().to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.dims().iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Time-major flattening for sequences.
    pub fn flatten(self) -> Tensor<B, 1> {
        match self {
            Self::Batch(values) => values,
            Self::Sequence(values) => values.flatten(0, 1),
        }
    }

    pub fn to_vec(&self) -> Result<Vec<f32>, VfuncError> {
        self.clone()
            .flatten()
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|err| VfuncError::TensorData(format!("{err:?}")))
    }

    pub fn into_batch(self) -> Option<Tensor<B, 1>> {
        match self {
            Self::Batch(values) => Some(values),
            Self::Sequence(_) => None,
        }
    }

    pub fn into_sequence(self) -> Option<Tensor<B, 2>> {
        match self {
            Self::Sequence(values) => Some(values),
            Self::Batch(_) => None,
        }
    }
}

/// Auxiliary state handed back next to the values.
///
/// Empty for feed-forward networks; holds exactly the updated hidden state for
/// recurrent ones.
#[derive(Clone, Debug)]
pub struct AuxState<B: Backend> {
    hs: Option<HiddenState<B>>,
}

impl<B: Backend> AuxState<B> {
    pub fn empty() -> Self {
        Self { hs: None }
    }

    pub fn with_hs(hs: HiddenState<B>) -> Self {
        Self { hs: Some(hs) }
    }

    pub fn len(&self) -> usize {
        usize::from(self.hs.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.hs.is_none()
    }

    pub fn get(&self, key: &str) -> Option<&HiddenState<B>> {
        if key == HS_KEY { self.hs.as_ref() } else { None }
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.hs.iter().map(|_| HS_KEY)
    }

    pub fn hs(&self) -> Option<&HiddenState<B>> {
        self.hs.as_ref()
    }

    pub fn into_hs(self) -> Option<HiddenState<B>> {
        self.hs
    }
}

impl<B: Backend> Default for AuxState<B> {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Clone, Debug)]
pub struct VfuncOutput<B: Backend> {
    pub values: Values<B>,
    pub aux: AuxState<B>,
}

/// Per-step validity mask of a recurrent batch.
///
/// Accepted layouts are `[time * batch]`, `[time, batch]` and
/// `[time, batch, 1]`; all are reshaped to `[time, batch, 1]` before use.
#[derive(Clone, Debug)]
pub enum Mask<B: Backend> {
    Flat(Tensor<B, 1>),
    Steps(Tensor<B, 2>),
    Full(Tensor<B, 3>),
}

impl<B: Backend> Mask<B> {
    pub fn dims(&self) -> Vec<usize> {
        match self {
            Self::Flat(mask) => mask.dims().to_vec(),
            Self::Steps(mask) => mask.dims().to_vec(),
            Self::Full(mask) => mask.dims().to_vec(),
        }
    }

    /// Reshapes to `[steps, batch, 1]` without touching the values.
    pub fn canonical(self, steps: usize, batch: usize) -> Result<Tensor<B, 3>, VfuncError> {
        let dims = self.dims();
        if dims.iter().product::<usize>() != steps * batch {
            return Err(VfuncError::ShapeMismatch {
                expected: "mask with time * batch elements",
                actual: dims,
            });
        }
        let shape = [steps, batch, 1];
        Ok(match self {
            Self::Flat(mask) => mask.reshape(shape),
            Self::Steps(mask) => mask.reshape(shape),
            Self::Full(mask) => mask.reshape(shape),
        })
    }
}

impl<B: Backend> From<Tensor<B, 1>> for Mask<B> {
    fn from(mask: Tensor<B, 1>) -> Self {
        Self::Flat(mask)
    }
}

impl<B: Backend> From<Tensor<B, 2>> for Mask<B> {
    fn from(mask: Tensor<B, 2>) -> Self {
        Self::Steps(mask)
    }
}

impl<B: Backend> From<Tensor<B, 3>> for Mask<B> {
    fn from(mask: Tensor<B, 3>) -> Self {
        Self::Full(mask)
    }
}
