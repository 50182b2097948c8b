//! Online backpropagation, one labeled sample at a time.
//!
//! A step moves the output layer toward the one-hot target of the correct class and pushes
//! the resulting error back through the edges feeding the first hidden layer:
//!
//! 1. `δ_out[i] = (target[i] - a[i]) * tanh_derivative(a[i])`
//! 2. `Δw_out[i][j] = δ_out[i] * h[j] * lr` over the last hidden layer, staged rather than
//!    applied immediately
//! 3. `δ_hidden[j] = Σ_i δ_out[i] * w_out[i][j]` using the pre-update output weights; the
//!    staged `Δw_out` is applied afterwards
//! 4. `w_in[j][k] += δ_hidden[j] * tanh_derivative(h0[j]) * x[k] * lr` for the edges from
//!    the input layer into first-hidden neuron `j`
//!
//! With one hidden layer (the supported case) the last and first hidden layers coincide and
//! this is plain two-layer backprop. With deeper networks, only the output edges and the
//! input→first-hidden edges learn. Interior hidden edges keep their initial weights.
//!
//! Training is only defined for floating activations and weights:
//!
//! ```rust,compile_fail
//! use embann::{Mac16, NetworkBuilder};
//!
//! let net = NetworkBuilder::<Mac16>::new(2, 2, 1, 2).unwrap().build_with_seed(0).unwrap();
//! let _trainer = net.trainer();
//! ```

use tracing::trace;

use crate::activation::tanh_derivative;
use crate::network::one_hot;
use crate::numeric::{FloatScalar, NumericProfile, Scalar};
use crate::{Error, Network, Result};

/// Reusable per-step buffers for training a specific network.
///
/// Allocate once via [`Network::trainer`] and reuse for every step.
#[derive(Debug, Clone)]
pub struct Trainer<P: NumericProfile> {
    d_output: Vec<P::Activation>,
    /// Row-major (num_outputs, num_hidden).
    output_weight_change: Vec<P::Weight>,
    /// One error term per last-hidden neuron.
    d_hidden: Vec<P::Activation>,
    num_hidden: usize,
}

impl<P> Trainer<P>
where
    P: NumericProfile,
    P::Activation: FloatScalar,
    P::Weight: FloatScalar,
{
    pub fn new(net: &Network<P>) -> Self {
        let num_hidden = net.num_hidden_neurons();
        Self {
            d_output: vec![P::Activation::ZERO; net.num_outputs()],
            output_weight_change: vec![P::Weight::ZERO; net.num_outputs() * num_hidden],
            d_hidden: vec![P::Activation::ZERO; num_hidden],
            num_hidden,
        }
    }

    /// Output-layer error terms from the most recent step.
    #[inline]
    pub fn output_deltas(&self) -> &[P::Activation] {
        &self.d_output
    }

    /// Hidden-layer error terms from the most recent step.
    #[inline]
    pub fn hidden_deltas(&self) -> &[P::Activation] {
        &self.d_hidden
    }

    fn matches(&self, net: &Network<P>) -> bool {
        self.d_output.len() == net.num_outputs()
            && self.num_hidden == net.num_hidden_neurons()
            && self.d_hidden.len() == net.num_hidden_neurons()
            && self.output_weight_change.len() == net.num_outputs() * net.num_hidden_neurons()
    }
}

impl<P> Network<P>
where
    P: NumericProfile,
    P::Activation: FloatScalar,
    P::Weight: FloatScalar,
{
    /// Convenience constructor: allocate training buffers for this network.
    #[inline]
    pub fn trainer(&self) -> Trainer<P> {
        Trainer::new(self)
    }

    /// One backpropagation update toward `correct_class`.
    ///
    /// Uses the activations left behind by the last [`Network::propagate`]; call that first
    /// with the sample being trained on.
    pub fn train_step(
        &mut self,
        trainer: &mut Trainer<P>,
        correct_class: usize,
        learning_rate: P::Weight,
    ) -> Result<()> {
        if correct_class >= self.num_outputs() {
            return Err(Error::ClassOutOfRange {
                class: correct_class,
                num_classes: self.num_outputs(),
            });
        }
        if !trainer.matches(self) {
            return Err(Error::InvalidShape(format!(
                "trainer was built for {} outputs x {} hidden neurons, network has {} x {}",
                trainer.d_output.len(),
                trainer.num_hidden,
                self.num_outputs(),
                self.num_hidden_neurons()
            )));
        }

        let num_hidden = trainer.num_hidden;
        let (input, hidden, output) = self.layers_for_training();
        let last = hidden.len() - 1;

        for (i, d_out) in trainer.d_output.iter_mut().enumerate() {
            let a = output.activation(i);
            let target = P::Activation::from_real(one_hot(i, correct_class));
            *d_out = (target - a) * tanh_derivative(a);

            let row = &mut trainer.output_weight_change[i * num_hidden..(i + 1) * num_hidden];
            for (change, &h) in row.iter_mut().zip(hidden[last].activations()) {
                let scaled = P::Weight::from_real(d_out.to_real() * h.to_real());
                *change = scaled * learning_rate;
            }
            trace!(output = i, delta = d_out.to_real(), "output delta");
        }

        let lr = learning_rate.to_real();
        for (j, d_hidden) in trainer.d_hidden.iter_mut().enumerate() {
            let mut sum = 0.0_f64;
            for (i, &d_out) in trainer.d_output.iter().enumerate() {
                let edge = &mut output.edges_mut(i)[j];
                sum += d_out.to_real() * edge.weight.to_real();
                edge.weight = edge.weight + trainer.output_weight_change[i * num_hidden + j];
            }
            *d_hidden = P::Activation::from_real(sum);

            let first = &mut hidden[0];
            let slope = tanh_derivative(first.activation(j)).to_real();
            let scale = sum * slope * lr;
            for (edge, &x) in first.edges_mut(j).iter_mut().zip(input.activations()) {
                edge.weight = edge.weight + P::Weight::from_real(scale * x.to_real());
            }
        }

        trace!(class = correct_class, "training step applied");
        Ok(())
    }
}
