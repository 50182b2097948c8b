use crate::activation;
use crate::numeric::{NumericProfile, Scalar};

/// Position of a layer in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Input,
    /// Position among the hidden layers, starting at 0.
    Hidden(usize),
    Output,
}

/// Parameters of one connection from a source neuron into a destination neuron.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge<W, B> {
    pub weight: W,
    /// Stored and initialized but not added during propagation.
    pub bias: B,
}

/// One layer: the activation of every neuron plus the edges feeding them.
#[derive(Debug, Clone)]
pub struct Layer<P: NumericProfile> {
    kind: LayerKind,
    fan_in: usize,
    activations: Vec<P::Activation>,
    /// Row-major matrix with shape (num_neurons, fan_in): row `k` holds the incoming edges of
    /// neuron `k`, indexed by source neuron. Empty for the input layer.
    edges: Vec<Edge<P::Weight, P::Bias>>,
}

impl<P: NumericProfile> Layer<P> {
    pub(crate) fn from_parts(
        kind: LayerKind,
        fan_in: usize,
        activations: Vec<P::Activation>,
        edges: Vec<Edge<P::Weight, P::Bias>>,
    ) -> Self {
        debug_assert_eq!(edges.len(), activations.len() * fan_in);
        Self {
            kind,
            fan_in,
            activations,
            edges,
        }
    }

    /// Which layer this is.
    #[inline]
    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    /// Returns the number of neurons.
    #[inline]
    pub fn num_neurons(&self) -> usize {
        self.activations.len()
    }

    /// Number of incoming edges per neuron (0 for the input layer).
    #[inline]
    pub fn fan_in(&self) -> usize {
        self.fan_in
    }

    /// Current activation of every neuron.
    #[inline]
    pub fn activations(&self) -> &[P::Activation] {
        &self.activations
    }

    /// Current activation of `neuron`.
    ///
    /// Panics if `neuron >= num_neurons()`.
    #[inline]
    pub fn activation(&self, neuron: usize) -> P::Activation {
        self.activations[neuron]
    }

    #[inline]
    pub(crate) fn activations_mut(&mut self) -> &mut [P::Activation] {
        &mut self.activations
    }

    /// Incoming edges of `neuron`, one per source neuron.
    ///
    /// Panics if `neuron >= num_neurons()`.
    #[inline]
    pub fn edges(&self, neuron: usize) -> &[Edge<P::Weight, P::Bias>] {
        let start = neuron * self.fan_in;
        &self.edges[start..start + self.fan_in]
    }

    /// Mutable incoming edges of `neuron`.
    #[inline]
    pub(crate) fn edges_mut(&mut self, neuron: usize) -> &mut [Edge<P::Weight, P::Bias>] {
        let start = neuron * self.fan_in;
        &mut self.edges[start..start + self.fan_in]
    }

    /// Every incoming edge, row-major by destination neuron.
    #[inline]
    pub fn all_edges(&self) -> &[Edge<P::Weight, P::Bias>] {
        &self.edges
    }

    /// Forward step into this layer.
    ///
    /// Computes, for every neuron `k`:
    /// - `sum = Σ_j source[j] * weight(k <- j)`
    /// - `activation[k] = tanh(sum * π)`
    ///
    /// Shape contract: `source.len() == self.fan_in()`.
    #[inline]
    pub(crate) fn sum_and_squash(&mut self, source: &[P::Activation]) {
        debug_assert_eq!(source.len(), self.fan_in);
        debug_assert!(self.fan_in > 0, "input layer has no incoming edges");

        for (out, row) in self
            .activations
            .iter_mut()
            .zip(self.edges.chunks_exact(self.fan_in))
        {
            let mut sum = 0.0_f64;
            for (edge, &a) in row.iter().zip(source) {
                sum = a.to_real().mul_add(edge.weight.to_real(), sum);
            }
            *out = P::Activation::from_real(activation::squash(sum));
        }
    }
}
