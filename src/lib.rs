//! An embedded backpropagating neural network.
//!
//! `embann` classifies batches of raw analog sensor readings with a small fully-connected
//! feed-forward network and trains it online, one labeled example at a time. It is meant for
//! constrained targets: all storage is reserved when the network is built, and the
//! encode / propagate / train hot path does not allocate after that.
//!
//! # Pipeline
//!
//! 1. [`Network::encode_input`] turns a batch of raw readings into a normalized histogram, one
//!    bin per input neuron.
//! 2. [`Network::propagate`] runs `tanh(Σ a·w · π)` through every layer and picks the most
//!    active output neuron (lowest index on ties).
//! 3. [`Network::train_step`] nudges the weights toward the one-hot target of the correct
//!    class. [`Network::train_for_duration`] and [`Network::train_until_converged`] repeat
//!    that step over a [`SampleSource`].
//!
//! # Numeric profiles
//!
//! Every numeric role (activation, weight, bias, neuron/layer/output/training counts) is an
//! associated type of a [`NumericProfile`], so one network type covers float and fixed-point
//! targets:
//!
//! - [`Float32`] / [`Float64`]: floating activations and weights; inference and training.
//! - [`Mac16`] / [`Vnni`]: fixed-point layouts; inference only.
//!
//! Integer scalars are fixed point over their full range, `value / MAX`, so `i16::MAX` reads
//! as `1.0`.
//!
//! # Panics vs `Result`
//!
//! Public operations validate their inputs and return [`Result`]. Accessors that take a
//! neuron index ([`Layer::edges`], [`Layer::activation`]) panic on an out-of-range index like
//! slice indexing does.
//!
//! # Quick start
//!
//! ```rust
//! use embann::{ConvergenceConfig, Float32, NetworkBuilder, SampleStore};
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! # fn main() -> embann::Result<()> {
//! let mut store = SampleStore::new(2, 6, 1023_u16)?;
//! store.push(0, &[10, 40, 80, 20, 60, 30])?;
//! store.push(1, &[990, 1000, 960, 1010, 980, 1020])?;
//!
//! let mut net = NetworkBuilder::<Float32>::new(4, 6, 1, 2)?.build_with_seed(0)?;
//! let mut rng = StdRng::seed_from_u64(0);
//! let cfg = ConvergenceConfig {
//!     learning_rate: 0.2,
//!     desired_cost: 0.05,
//!     max_steps: Some(2_000),
//!     ..ConvergenceConfig::default()
//! };
//! let report = net.train_until_converged(&store, &mut rng, &cfg)?;
//! assert!(report.converged);
//! assert!(report.steps < 2_000);
//! assert!(report.class_costs.iter().all(|&c| c <= cfg.desired_cost));
//!
//! net.encode_input(&[985_u16, 1000, 970, 1015, 990, 1005], 1023)?;
//! let _class = net.propagate();
//! # Ok(())
//! # }
//! ```
//!
//! # MSRV
//!
//! This crate's minimum supported Rust version (MSRV) is specified in `Cargo.toml`.

pub mod activation;
pub mod builder;
pub mod data;
pub mod driver;
pub mod encoder;
pub mod error;
pub mod layer;
pub mod network;
pub mod numeric;
pub mod train;

pub use builder::NetworkBuilder;
pub use data::{SampleSource, SampleStore};
pub use driver::{Clock, ConvergenceConfig, DurationConfig, SystemClock, TrainReport};
pub use encoder::InputBinning;
pub use error::{Error, Result};
pub use layer::{Edge, Layer, LayerKind};
pub use network::{Network, Properties};
pub use numeric::{
    DataType, Float32, Float64, FloatScalar, IndexScalar, Mac16, NumericProfile, Scalar, Vnni,
};
pub use train::Trainer;
