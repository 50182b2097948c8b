use tracing::trace;

use crate::encoder::InputBinning;
use crate::layer::{Edge, Layer};
use crate::numeric::{Float32, IndexScalar, NumericProfile, Scalar};
use crate::{Error, Result};

/// Shape counters plus the most recent decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Properties<P: NumericProfile> {
    pub(crate) num_layers: P::LayerCount,
    pub(crate) num_hidden_layers: P::LayerCount,
    pub(crate) network_response: P::OutputCount,
}

impl<P: NumericProfile> Properties<P> {
    /// Hidden layers plus the input and output layers.
    #[inline]
    pub fn num_layers(&self) -> usize {
        self.num_layers.to_usize()
    }

    /// Returns the number of hidden layers.
    #[inline]
    pub fn num_hidden_layers(&self) -> usize {
        self.num_hidden_layers.to_usize()
    }

    /// Index of the winning output neuron from the last `propagate`.
    #[inline]
    pub fn network_response(&self) -> P::OutputCount {
        self.network_response
    }
}

/// A fully-connected feed-forward network: one input layer, one or more hidden layers of equal
/// width, one output layer.
///
/// Topology is fixed at construction ([`crate::NetworkBuilder`]). Only activations and edge
/// parameters change afterwards; layers are only handed out by shared reference:
///
/// ```rust,compile_fail
/// use embann::{Float32, NetworkBuilder};
///
/// let mut net = NetworkBuilder::<Float32>::new(2, 5, 1, 3).unwrap().build_with_seed(0).unwrap();
/// let wider = net.hidden_layers()[0].clone();
/// *net.output_layer_mut() = wider;
/// ```
#[derive(Debug, Clone)]
pub struct Network<P: NumericProfile = Float32> {
    input: Layer<P>,
    hidden: Vec<Layer<P>>,
    output: Layer<P>,
    properties: Properties<P>,
    binning: InputBinning,
}

impl<P: NumericProfile> Network<P> {
    pub(crate) fn from_parts(
        input: Layer<P>,
        hidden: Vec<Layer<P>>,
        output: Layer<P>,
        properties: Properties<P>,
        binning: InputBinning,
    ) -> Self {
        debug_assert!(!hidden.is_empty());
        Self {
            input,
            hidden,
            output,
            properties,
            binning,
        }
    }

    /// Shape counters and the last decision.
    #[inline]
    pub fn properties(&self) -> &Properties<P> {
        &self.properties
    }

    /// Input layer; its activations come from encoding or [`Network::set_inputs`].
    #[inline]
    pub fn input_layer(&self) -> &Layer<P> {
        &self.input
    }

    /// Hidden layers in propagation order.
    #[inline]
    pub fn hidden_layers(&self) -> &[Layer<P>] {
        &self.hidden
    }

    /// Output layer; one neuron per class.
    #[inline]
    pub fn output_layer(&self) -> &Layer<P> {
        &self.output
    }

    /// Incoming edges of neuron `neuron` in hidden layer `layer`, one per source neuron.
    ///
    /// Only edge parameters can be changed through this; the topology stays fixed.
    ///
    /// Panics if `layer` or `neuron` is out of range.
    #[inline]
    pub fn hidden_edges_mut(
        &mut self,
        layer: usize,
        neuron: usize,
    ) -> &mut [Edge<P::Weight, P::Bias>] {
        self.hidden[layer].edges_mut(neuron)
    }

    /// Incoming edges of output neuron `neuron`, one per last-hidden neuron.
    ///
    /// Panics if `neuron >= num_outputs()`.
    #[inline]
    pub fn output_edges_mut(&mut self, neuron: usize) -> &mut [Edge<P::Weight, P::Bias>] {
        self.output.edges_mut(neuron)
    }

    /// Input neurons, one per histogram bin.
    #[inline]
    pub fn num_inputs(&self) -> usize {
        self.input.num_neurons()
    }

    /// Width of every hidden layer.
    #[inline]
    pub fn num_hidden_neurons(&self) -> usize {
        self.hidden[0].num_neurons()
    }

    /// Output neurons, one per class.
    #[inline]
    pub fn num_outputs(&self) -> usize {
        self.output.num_neurons()
    }

    /// Binning state left behind by the last [`Network::encode_input`] call.
    #[inline]
    pub fn binning(&self) -> &InputBinning {
        &self.binning
    }

    #[inline]
    pub(crate) fn layers_for_training(
        &mut self,
    ) -> (&Layer<P>, &mut [Layer<P>], &mut Layer<P>) {
        (&self.input, &mut self.hidden, &mut self.output)
    }

    #[inline]
    pub(crate) fn encoder_parts(&mut self) -> (&mut InputBinning, &mut [P::Activation]) {
        (&mut self.binning, self.input.activations_mut())
    }

    /// Overwrite the input activations directly, bypassing histogram encoding.
    pub fn set_inputs(&mut self, values: &[P::Activation]) -> Result<()> {
        if values.len() != self.num_inputs() {
            return Err(Error::InvalidShape(format!(
                "got {} input values, network has {} input neurons",
                values.len(),
                self.num_inputs()
            )));
        }
        self.input.activations_mut().copy_from_slice(values);
        Ok(())
    }

    /// Forward pass from the current input activations.
    ///
    /// Runs sum-and-squash across every adjacent layer pair, records the winning output index
    /// in [`Properties::network_response`] and returns it. Ties go to the lowest index.
    pub fn propagate(&mut self) -> usize {
        self.hidden[0].sum_and_squash(self.input.activations());
        trace!("done input -> hidden layer 0");

        for idx in 1..self.hidden.len() {
            let (left, right) = self.hidden.split_at_mut(idx);
            right[0].sum_and_squash(left[idx - 1].activations());
            trace!("done hidden layer {} -> hidden layer {idx}", idx - 1);
        }

        let last = self.hidden.len() - 1;
        self.output.sum_and_squash(self.hidden[last].activations());
        trace!("done hidden layer {last} -> output layer");

        let decision = argmax(self.output.activations());
        // Output indices fit `OutputCount`; the builder rejects wider shapes.
        if let Some(response) = P::OutputCount::from_usize(decision) {
            self.properties.network_response = response;
        }
        trace!(decision, "network response");
        decision
    }

    /// Copy the last decision into `dest`.
    pub fn write_response(&self, dest: Option<&mut P::OutputCount>) -> Result<()> {
        let dest = dest.ok_or(Error::NoDestination)?;
        *dest = self.properties.network_response;
        Ok(())
    }

    /// Signed error `target - activation` of every output neuron against the one-hot target
    /// for `correct_class`.
    pub fn output_errors(&self, correct_class: usize) -> impl Iterator<Item = f64> + '_ {
        self.output
            .activations()
            .iter()
            .enumerate()
            .map(move |(i, &a)| one_hot(i, correct_class) - a.to_real())
    }

    /// Mean squared error of the output layer against the one-hot target.
    pub fn class_cost(&self, correct_class: usize) -> f64 {
        let total: f64 = self.output_errors(correct_class).map(|e| e * e).sum();
        total / self.num_outputs() as f64
    }
}

#[inline]
pub(crate) fn one_hot(index: usize, correct_class: usize) -> f64 {
    if index == correct_class { 1.0 } else { 0.0 }
}

/// First index holding the maximum. Strict `>` scanning left to right.
pub(crate) fn argmax<A: Scalar>(values: &[A]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}
