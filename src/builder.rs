//! Network builder.
//!
//! `NetworkBuilder` validates a requested shape against the numeric profile and then allocates
//! the whole graph in one pass:
//!
//! - one input layer of `num_inputs` neurons (activation only),
//! - `num_hidden_layers` hidden layers of `num_hidden` neurons each,
//! - one output layer of `num_outputs` neurons.
//!
//! Every hidden/output neuron owns one edge per neuron of the preceding layer. Weights and
//! biases are drawn independently from the open interval (-1, 1); activations start at zero.
//!
//! Storage is reserved up front. If the allocator cannot satisfy a reservation the process
//! aborts, so a partially built network is never returned.

use std::marker::PhantomData;

use rand::distributions::{Distribution, Open01};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, error, info};

use crate::encoder::InputBinning;
use crate::layer::{Edge, Layer, LayerKind};
use crate::network::Properties;
use crate::numeric::{Float32, IndexScalar, NumericProfile, Scalar};
use crate::{Error, Network, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Builder for a [`Network`].
///
/// Example:
///
/// ```rust
/// use embann::{Float32, NetworkBuilder};
///
/// # fn main() -> embann::Result<()> {
/// let net = NetworkBuilder::<Float32>::new(10, 10, 1, 3)?.build_with_seed(0)?;
/// assert_eq!(net.properties().num_layers(), 3);
/// # Ok(())
/// # }
/// ```
pub struct NetworkBuilder<P: NumericProfile = Float32> {
    num_inputs: usize,
    num_hidden: usize,
    num_hidden_layers: usize,
    num_outputs: usize,
    _profile: PhantomData<P>,
}

impl<P: NumericProfile> NetworkBuilder<P> {
    /// Validate a shape: every count must be positive and representable in the profile's
    /// count types.
    pub fn new(
        num_inputs: usize,
        num_hidden: usize,
        num_hidden_layers: usize,
        num_outputs: usize,
    ) -> Result<Self> {
        for (name, count) in [
            ("num_inputs", num_inputs),
            ("num_hidden", num_hidden),
            ("num_hidden_layers", num_hidden_layers),
            ("num_outputs", num_outputs),
        ] {
            if count == 0 {
                return Err(Error::InvalidConfig(format!("{name} must be > 0")));
            }
        }

        ensure_fits::<P::NeuronCount>("num_inputs", num_inputs)?;
        ensure_fits::<P::NeuronCount>("num_hidden", num_hidden)?;
        ensure_fits::<P::OutputCount>("num_outputs", num_outputs)?;
        ensure_fits::<P::LayerCount>(
            "num_hidden_layers + 2",
            num_hidden_layers.saturating_add(2),
        )?;

        let builder = Self {
            num_inputs,
            num_hidden,
            num_hidden_layers,
            num_outputs,
            _profile: PhantomData,
        };
        builder.edge_count()?;
        Ok(builder)
    }

    /// Total number of edges the network will own.
    pub fn edge_count(&self) -> Result<usize> {
        let first = self.num_hidden.checked_mul(self.num_inputs);
        let interior = self
            .num_hidden
            .checked_mul(self.num_hidden)
            .and_then(|per_layer| per_layer.checked_mul(self.num_hidden_layers - 1));
        let output = self.num_outputs.checked_mul(self.num_hidden);

        first
            .zip(interior)
            .and_then(|(a, b)| a.checked_add(b))
            .zip(output)
            .and_then(|(a, b)| a.checked_add(b))
            .ok_or_else(|| Error::InvalidConfig("network edge count overflows usize".to_owned()))
    }

    /// Build using a deterministic seed.
    pub fn build_with_seed(self, seed: u64) -> Result<Network<P>> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.build_with_rng(&mut rng)
    }

    /// Build using the provided RNG (typically the process-wide generator).
    pub fn build_with_rng<R: Rng + ?Sized>(self, rng: &mut R) -> Result<Network<P>> {
        let activation = <P::Activation as Scalar>::DATA_TYPE;
        let weight = <P::Weight as Scalar>::DATA_TYPE;
        let bias = <P::Bias as Scalar>::DATA_TYPE;
        let edges = self.edge_count()?;
        info!(
            inputs = self.num_inputs,
            hidden = self.num_hidden,
            hidden_layers = self.num_hidden_layers,
            outputs = self.num_outputs,
            edges,
            %activation,
            %weight,
            %bias,
            "building network"
        );

        let input = Layer::from_parts(
            LayerKind::Input,
            0,
            zeroed(self.num_inputs, P::Activation::ZERO),
            Vec::new(),
        );
        debug!(kind = ?input.kind(), neurons = self.num_inputs, "done layer");

        let mut hidden = reserve(self.num_hidden_layers);
        for idx in 0..self.num_hidden_layers {
            let fan_in = if idx == 0 {
                self.num_inputs
            } else {
                self.num_hidden
            };
            let layer = weighted_layer(LayerKind::Hidden(idx), self.num_hidden, fan_in, rng);
            debug!(kind = ?layer.kind(), neurons = self.num_hidden, fan_in, "done layer");
            hidden.push(layer);
        }

        let output = weighted_layer(LayerKind::Output, self.num_outputs, self.num_hidden, rng);
        debug!(
            kind = ?output.kind(),
            neurons = self.num_outputs,
            fan_in = self.num_hidden,
            "done layer"
        );

        let binning = InputBinning::from_buffers(
            zeroed(self.num_inputs, 0),
            zeroed(self.num_inputs, 0),
        );

        // `new` checked that these fit the profile's count types.
        let properties = Properties {
            num_layers: count::<P::LayerCount>(self.num_hidden_layers + 2)?,
            num_hidden_layers: count::<P::LayerCount>(self.num_hidden_layers)?,
            network_response: count::<P::OutputCount>(0)?,
        };

        Ok(Network::from_parts(input, hidden, output, properties, binning))
    }
}

fn ensure_fits<I: IndexScalar>(name: &str, value: usize) -> Result<()> {
    count::<I>(value).map(drop).map_err(|_| {
        Error::InvalidConfig(format!(
            "{name} = {value} does not fit the profile's {} count type",
            I::DATA_TYPE
        ))
    })
}

fn count<I: IndexScalar>(value: usize) -> Result<I> {
    I::from_usize(value)
        .ok_or_else(|| Error::InvalidConfig(format!("{value} does not fit {}", I::DATA_TYPE)))
}

fn weighted_layer<P: NumericProfile, R: Rng + ?Sized>(
    kind: LayerKind,
    num_neurons: usize,
    fan_in: usize,
    rng: &mut R,
) -> Layer<P> {
    let mut edges = reserve(num_neurons * fan_in);
    for _ in 0..num_neurons * fan_in {
        edges.push(Edge {
            weight: random_unit::<P::Weight, R>(rng),
            bias: random_unit::<P::Bias, R>(rng),
        });
    }
    Layer::from_parts(kind, fan_in, zeroed(num_neurons, P::Activation::ZERO), edges)
}

/// Uniform draw from (-1, 1) that stays strictly inside the interval after conversion to `T`.
fn random_unit<T: Scalar, R: Rng + ?Sized>(rng: &mut R) -> T {
    loop {
        let unit: f64 = Open01.sample(rng);
        let value = T::from_real(2.0 * unit - 1.0);
        if value.to_real().abs() < 1.0 {
            return value;
        }
    }
}

fn zeroed<T: Copy>(len: usize, value: T) -> Vec<T> {
    let mut buf = reserve(len);
    buf.resize(len, value);
    buf
}

/// Exact reservation; allocation failure is fatal.
fn reserve<T>(len: usize) -> Vec<T> {
    let mut buf = Vec::new();
    if let Err(err) = buf.try_reserve_exact(len) {
        error!(len, ?err, "network allocation failed");
        std::process::abort();
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::{Mac16, Vnni};

    #[test]
    fn every_weighted_neuron_has_one_edge_per_source_neuron() {
        let net = NetworkBuilder::<Float32>::new(5, 3, 3, 2)
            .unwrap()
            .build_with_seed(1)
            .unwrap();

        assert_eq!(net.properties().num_layers(), 5);
        assert_eq!(net.properties().num_hidden_layers(), 3);
        assert_eq!(net.input_layer().kind(), LayerKind::Input);
        for (idx, layer) in net.hidden_layers().iter().enumerate() {
            assert_eq!(layer.kind(), LayerKind::Hidden(idx));
        }
        assert_eq!(net.output_layer().kind(), LayerKind::Output);
        assert_eq!(net.hidden_layers()[0].fan_in(), 5);
        for layer in &net.hidden_layers()[1..] {
            assert_eq!(layer.fan_in(), 3);
        }
        assert_eq!(net.output_layer().fan_in(), 3);
        for k in 0..net.num_outputs() {
            assert_eq!(net.output_layer().edges(k).len(), 3);
        }
    }

    #[test]
    fn initial_parameters_are_inside_the_open_unit_interval() {
        let net = NetworkBuilder::<Float32>::new(8, 8, 2, 4)
            .unwrap()
            .build_with_seed(42)
            .unwrap();
        let layers = net.hidden_layers().iter().chain([net.output_layer()]);
        for layer in layers {
            for edge in layer.all_edges() {
                assert!(edge.weight > -1.0 && edge.weight < 1.0);
                assert!(edge.bias > -1.0 && edge.bias < 1.0);
            }
            assert!(layer.activations().iter().all(|&a| a == 0.0));
        }
        assert!(net.input_layer().activations().iter().all(|&a| a == 0.0));
    }

    #[test]
    fn seeded_build_is_deterministic() {
        let a = NetworkBuilder::<Float32>::new(4, 4, 1, 2)
            .unwrap()
            .build_with_seed(9)
            .unwrap();
        let b = NetworkBuilder::<Float32>::new(4, 4, 1, 2)
            .unwrap()
            .build_with_seed(9)
            .unwrap();
        assert_eq!(a.output_layer().all_edges(), b.output_layer().all_edges());
    }

    #[test]
    fn rejects_zero_counts() {
        assert!(NetworkBuilder::<Float32>::new(0, 4, 1, 2).is_err());
        assert!(NetworkBuilder::<Float32>::new(4, 0, 1, 2).is_err());
        assert!(NetworkBuilder::<Float32>::new(4, 4, 0, 2).is_err());
        assert!(NetworkBuilder::<Float32>::new(4, 4, 1, 0).is_err());
    }

    #[test]
    fn rejects_shapes_the_profile_cannot_count() {
        // Float32 counts layers in a u8: 254 hidden + 2 = 256 does not fit.
        let err = NetworkBuilder::<Float32>::new(2, 2, 254, 2).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        assert!(NetworkBuilder::<Float32>::new(2, 2, 253, 2).is_ok());
        assert!(NetworkBuilder::<Float32>::new(70_000, 2, 1, 2).is_err());
    }

    #[test]
    fn fixed_point_profiles_build_inside_the_unit_interval() {
        let net = NetworkBuilder::<Mac16>::new(4, 4, 1, 2)
            .unwrap()
            .build_with_seed(5)
            .unwrap();
        for edge in net.output_layer().all_edges() {
            assert!(edge.weight.to_real().abs() < 1.0);
        }

        let mut net = NetworkBuilder::<Vnni>::new(3, 3, 1, 2)
            .unwrap()
            .build_with_seed(5)
            .unwrap();
        net.encode_input(&[1_u16, 2, 700], 1023).unwrap();
        assert!(net.propagate() < 2);
    }
}
