//! State-value function heads for reinforcement learning on the Burn framework.

pub mod config;
pub mod error;
pub mod net;
pub mod parallel;
pub mod space;
pub mod stats;
pub mod vfunc;

pub use crate::config::{StdValidation, VfuncConfig, get_device};
pub use crate::error::{StatsCodecError, VfuncError};
pub use crate::net::{
    HiddenState, LstmValueNet, LstmValueNetConfig, MlpValueNet, MlpValueNetConfig, Recurrence,
    ValueNetwork,
};
pub use crate::parallel::{ExecutionStrategy, Replicated, SingleDevice};
pub use crate::space::ObservationSpace;
pub use crate::stats::RunningMeanStd;
pub use crate::vfunc::{
    AuxState, BaseVfunc, DeterministicVfunc, DeterministicVfuncBuilder, HS_KEY, Mask,
    NormalizedDeterministicVfunc, Values, VfuncBase, VfuncOutput,
};
