//! Training drivers.
//!
//! Both drivers repeat the same step: pick a class uniformly, pick one of its stored examples
//! uniformly, encode and propagate it, then run one [`Network::train_step`]. They differ only
//! in when they stop.
//!
//! - [`Network::train_for_duration`] stops once a wall-clock budget is spent.
//! - [`Network::train_until_converged`] stops once every class's most recent cost is at or
//!   below a target (or after an optional step ceiling).

use std::fmt;
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, info};

use crate::data::SampleSource;
use crate::numeric::{FloatScalar, IndexScalar, NumericProfile, Scalar};
use crate::train::Trainer;
use crate::{Error, Network, Result};

/// Monotonic millisecond clock.
pub trait Clock {
    /// Milliseconds since an arbitrary fixed origin.
    fn elapsed_millis(&self) -> u64;
}

/// [`Clock`] backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn elapsed_millis(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
/// Configuration for [`Network::train_for_duration`].
pub struct DurationConfig {
    pub learning_rate: f64,
    /// Wall-clock budget. Zero runs no steps.
    pub duration: Duration,
    /// Log every step at `info`.
    pub verbose: bool,
}

impl Default for DurationConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            duration: Duration::from_secs(1),
            verbose: false,
        }
    }
}

impl DurationConfig {
    pub fn validate(&self) -> Result<()> {
        validate_learning_rate(self.learning_rate)
    }
}

#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
/// Configuration for [`Network::train_until_converged`].
pub struct ConvergenceConfig {
    pub learning_rate: f64,
    /// Every class's most recent cost must be `<=` this for training to stop.
    pub desired_cost: f64,
    pub verbose: bool,
    /// Optional ceiling on the number of steps.
    pub max_steps: Option<u64>,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            desired_cost: 0.01,
            verbose: false,
            max_steps: None,
        }
    }
}

impl ConvergenceConfig {
    pub fn validate(&self) -> Result<()> {
        validate_learning_rate(self.learning_rate)?;
        if self.desired_cost.is_nan() {
            return Err(Error::InvalidConfig("desired_cost must not be NaN".to_owned()));
        }
        Ok(())
    }
}

fn validate_learning_rate(learning_rate: f64) -> Result<()> {
    if !(learning_rate.is_finite() && learning_rate > 0.0) {
        return Err(Error::InvalidConfig(
            "learning_rate must be finite and > 0".to_owned(),
        ));
    }
    Ok(())
}

/// Summary of a driver run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrainReport {
    pub steps: u64,
    /// Set only by the convergence driver.
    pub converged: bool,
    /// Cost of each class at its most recent visit; `+inf` if never visited.
    pub class_costs: Vec<f64>,
    pub elapsed_ms: u64,
}

impl<P> Network<P>
where
    P: NumericProfile,
    P::Activation: FloatScalar,
    P::Weight: FloatScalar,
{
    /// Train on randomly drawn stored examples until `cfg.duration` has elapsed on `clock`.
    pub fn train_for_duration<S, C, R>(
        &mut self,
        source: &S,
        clock: &C,
        rng: &mut R,
        cfg: &DurationConfig,
    ) -> Result<TrainReport>
    where
        S: SampleSource + ?Sized,
        C: Clock + ?Sized,
        R: Rng + ?Sized,
    {
        cfg.validate()?;
        self.check_source(source)?;

        let mut trainer = self.trainer();
        let learning_rate = P::Weight::from_real(cfg.learning_rate);
        let budget = u64::try_from(cfg.duration.as_millis()).unwrap_or(u64::MAX);
        let mut class_costs = vec![f64::INFINITY; self.num_outputs()];
        let mut steps = 0_u64;

        info!(budget_ms = budget, learning_rate = cfg.learning_rate, "training for duration");
        let start = clock.elapsed_millis();
        while clock.elapsed_millis().saturating_sub(start) < budget {
            let (class, cost) =
                self.random_step(source, rng, &mut trainer, learning_rate, cfg.verbose)?;
            class_costs[class] = cost;
            steps += 1;
        }
        let elapsed_ms = clock.elapsed_millis().saturating_sub(start);

        info!(steps, elapsed_ms, "done training for duration");
        Ok(TrainReport {
            steps,
            converged: false,
            class_costs,
            elapsed_ms,
        })
    }

    /// Train on randomly drawn stored examples until every class's most recent cost is at or
    /// below `cfg.desired_cost`.
    ///
    /// Classes that have not been visited yet count as `+inf`, so every class must be drawn at
    /// least once before a finite target can be met.
    pub fn train_until_converged<S, R>(
        &mut self,
        source: &S,
        rng: &mut R,
        cfg: &ConvergenceConfig,
    ) -> Result<TrainReport>
    where
        S: SampleSource + ?Sized,
        R: Rng + ?Sized,
    {
        cfg.validate()?;
        self.check_source(source)?;

        let clock = SystemClock::new();
        let mut trainer = self.trainer();
        let learning_rate = P::Weight::from_real(cfg.learning_rate);
        let mut class_costs = vec![f64::INFINITY; self.num_outputs()];
        let mut steps = 0_u64;
        let mut converged = false;

        info!(
            desired_cost = cfg.desired_cost,
            learning_rate = cfg.learning_rate,
            max_steps = ?cfg.max_steps,
            "training until converged"
        );
        while !cfg.max_steps.is_some_and(|max| steps >= max) {
            let (class, cost) =
                self.random_step(source, rng, &mut trainer, learning_rate, cfg.verbose)?;
            class_costs[class] = cost;
            steps += 1;

            if cfg.verbose {
                info!(
                    step = steps,
                    ?class_costs,
                    desired_cost = cfg.desired_cost,
                    "class costs"
                );
            }
            if class_costs.iter().all(|&c| c <= cfg.desired_cost) {
                converged = true;
                break;
            }
        }
        let elapsed_ms = clock.elapsed_millis();

        info!(steps, converged, elapsed_ms, "done training until converged");
        Ok(TrainReport {
            steps,
            converged,
            class_costs,
            elapsed_ms,
        })
    }

    fn check_source<S: SampleSource + ?Sized>(&self, source: &S) -> Result<()> {
        if source.num_classes() != self.num_outputs() {
            return Err(Error::InvalidData(format!(
                "source has {} classes, network has {} outputs",
                source.num_classes(),
                self.num_outputs()
            )));
        }
        for class in 0..source.num_classes() {
            let entries = source.num_entries(class);
            if entries == 0 {
                return Err(Error::InvalidData(format!(
                    "class {class} has no stored examples"
                )));
            }
            if P::TrainingCount::from_usize(entries).is_none() {
                return Err(Error::InvalidConfig(format!(
                    "class {class} has {entries} examples, more than the profile's {} \
                     training count type can index",
                    <P::TrainingCount as IndexScalar>::DATA_TYPE
                )));
            }
        }
        Ok(())
    }

    /// Returns the trained class and its cost from the forward pass before the update.
    fn random_step<S, R>(
        &mut self,
        source: &S,
        rng: &mut R,
        trainer: &mut Trainer<P>,
        learning_rate: P::Weight,
        verbose: bool,
    ) -> Result<(usize, f64)>
    where
        S: SampleSource + ?Sized,
        R: Rng + ?Sized,
    {
        let class = rng.gen_range(0..self.num_outputs());
        let index = rng.gen_range(0..source.num_entries(class));

        self.encode_input(source.sample(class, index), source.max_input())?;
        let decision = self.propagate();
        let cost = self.class_cost(class);

        if verbose {
            let errors = OutputErrors { net: self, class };
            info!(class, index, decision, cost, ?errors, "output errors");
        } else {
            debug!(class, index, decision, cost, "training step");
        }

        self.train_step(trainer, class, learning_rate)?;
        Ok((class, cost))
    }
}

/// Formats the signed per-class errors as a list without collecting them.
struct OutputErrors<'a, P: NumericProfile> {
    net: &'a Network<P>,
    class: usize,
}

impl<P: NumericProfile> fmt::Debug for OutputErrors<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.net.output_errors(self.class))
            .finish()
    }
}
