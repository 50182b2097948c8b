use std::cell::Cell;
use std::time::Duration;

use embann::{
    Clock, ConvergenceConfig, DurationConfig, Float32, Float64, Network, NetworkBuilder,
    SampleSource, SampleStore,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn build(inputs: usize, hidden: usize, hidden_layers: usize, outputs: usize) -> Network<Float32> {
    NetworkBuilder::new(inputs, hidden, hidden_layers, outputs)
        .unwrap()
        .build_with_seed(0)
        .unwrap()
}

#[test]
fn four_bin_network_encodes_and_classifies_a_batch() {
    let mut net = build(4, 4, 1, 2);
    net.encode_input(&[0_u16, 2, 5, 9], 9).unwrap();

    let binning = net.binning();
    assert_eq!(binning.thresholds(), &[2, 5, 7, 9]);
    assert_eq!(binning.totals().iter().sum::<usize>(), 4);

    let densest = binning.totals()[binning.largest_group()] as f32;
    for (&a, &total) in net.input_layer().activations().iter().zip(binning.totals()) {
        assert_eq!(a, total as f32 / densest);
    }
    assert_eq!(net.input_layer().activation(binning.largest_group()), 1.0);

    let decision = net.propagate();
    assert!(decision < 2);
    let mut response = 0_u16;
    net.write_response(Some(&mut response)).unwrap();
    assert_eq!(response as usize, decision);
}

#[test]
fn random_batches_always_partition_cleanly() {
    let mut rng = StdRng::seed_from_u64(17);
    for num_inputs in [1_usize, 3, 8, 20] {
        let mut net = build(num_inputs, 3, 1, 2);
        for _ in 0..50 {
            let max_input: u16 = rng.gen_range(num_inputs as u16..=4095);
            let len = rng.gen_range(1..64);
            // Some samples overshoot the sensor range on purpose.
            let batch: Vec<u16> = (0..len)
                .map(|_| rng.gen_range(0..=max_input.saturating_add(50)))
                .collect();

            match net.encode_input(&batch, max_input) {
                Ok(()) => {}
                Err(embann::Error::EmptyHistogram { .. }) => continue,
                Err(err) => panic!("unexpected error: {err}"),
            }
            let binning = net.binning();
            assert!(binning.thresholds().windows(2).all(|w| w[0] < w[1]));
            assert_eq!(binning.thresholds().last(), Some(&u64::from(max_input)));
            assert_eq!(
                binning.totals().iter().sum::<usize>() + binning.out_of_range(),
                batch.len()
            );

            let activations = net.input_layer().activations();
            assert!(activations.iter().all(|&a| (0.0..=1.0).contains(&a)));
            assert_eq!(activations[binning.largest_group()], 1.0);
        }
    }
}

#[test]
fn propagate_is_deterministic() {
    let mut net = build(5, 6, 2, 3);
    net.encode_input(&[100_u16, 300, 300, 800, 1000], 1023).unwrap();

    let first = net.propagate();
    let outputs = net.output_layer().activations().to_vec();
    let second = net.propagate();

    assert_eq!(first, second);
    assert_eq!(net.output_layer().activations(), outputs.as_slice());
}

#[test]
fn equal_outputs_resolve_to_the_lowest_index() {
    let mut net = build(3, 3, 1, 3);
    for k in 0..3 {
        for edge in net.output_edges_mut(k) {
            edge.weight = 0.25;
        }
    }
    net.set_inputs(&[1.0, 0.5, 0.25]).unwrap();

    assert_eq!(net.propagate(), 0);
    assert_eq!(net.properties().network_response(), 0);
}

#[test]
fn one_step_moves_the_correct_output_toward_one() {
    let mut net = NetworkBuilder::<Float64>::new(4, 4, 1, 2)
        .unwrap()
        .build_with_seed(0)
        .unwrap();
    for k in 0..4 {
        for edge in net.hidden_edges_mut(0, k) {
            edge.weight = 0.1;
        }
    }
    for k in 0..2 {
        let weight = if k == 1 { 0.1 } else { -0.1 };
        for edge in net.output_edges_mut(k) {
            edge.weight = weight;
        }
    }
    net.encode_input(&[9_u16, 8, 1, 7], 9).unwrap();

    net.propagate();
    let before = net.output_layer().activation(1);
    let mut trainer = net.trainer();
    net.train_step(&mut trainer, 1, 0.05).unwrap();
    net.propagate();
    let after = net.output_layer().activation(1);

    assert!((1.0 - after).abs() < (1.0 - before).abs());
}

/// Ticks forward on every read.
struct TickClock {
    now: Cell<u64>,
    tick: u64,
}

impl Clock for TickClock {
    fn elapsed_millis(&self) -> u64 {
        let now = self.now.get();
        self.now.set(now + self.tick);
        now
    }
}

fn two_class_store() -> SampleStore<u16> {
    let mut rng = StdRng::seed_from_u64(5);
    let mut store = SampleStore::new(2, 16, 1023).unwrap();
    for class in 0..2 {
        let centre = if class == 0 { 200 } else { 800 };
        for _ in 0..8 {
            let sample: Vec<u16> = (0..16)
                .map(|_| rng.gen_range(centre - 120..centre + 120))
                .collect();
            store.push(class, &sample).unwrap();
        }
    }
    store
}

#[test]
fn time_bounded_training_counts_steps_against_the_clock() {
    let store = two_class_store();
    let clock = TickClock {
        now: Cell::new(0),
        tick: 10,
    };
    let cfg = DurationConfig {
        learning_rate: 0.1,
        duration: Duration::from_millis(500),
        verbose: true,
    };
    let mut net = build(4, 4, 1, 2);
    let mut rng = StdRng::seed_from_u64(1);
    let output_before = net.output_layer().all_edges().to_vec();
    let hidden_before = net.hidden_layers()[0].all_edges().to_vec();

    let report = net.train_for_duration(&store, &clock, &mut rng, &cfg).unwrap();
    assert_eq!(report.steps, 49);
    assert_eq!(report.class_costs.len(), store.num_classes());
    assert!(report.class_costs.iter().all(|c| c.is_finite() && *c >= 0.0));
    assert_ne!(net.output_layer().all_edges(), output_before.as_slice());
    assert_ne!(net.hidden_layers()[0].all_edges(), hidden_before.as_slice());
}

fn separable_store() -> SampleStore<u16> {
    let mut store = SampleStore::new(2, 6, 1023).unwrap();
    store.push(0, &[10, 40, 80, 20, 60, 30]).unwrap();
    store.push(1, &[990, 1000, 960, 1010, 980, 1020]).unwrap();
    store
}

#[test]
fn separable_classes_converge_to_a_finite_target() {
    let store = separable_store();
    let mut net = NetworkBuilder::<Float32>::new(4, 6, 1, 2)
        .unwrap()
        .build_with_seed(0)
        .unwrap();
    let mut rng = StdRng::seed_from_u64(0);
    let cfg = ConvergenceConfig {
        learning_rate: 0.2,
        desired_cost: 0.05,
        verbose: false,
        max_steps: Some(2_000),
    };

    let report = net.train_until_converged(&store, &mut rng, &cfg).unwrap();
    assert!(report.converged, "{report:?}");
    assert!(report.steps < 2_000);
    assert!(report.class_costs.iter().all(|&c| c <= cfg.desired_cost));

    for class in 0..2 {
        net.encode_input(store.sample(class, 0), store.max_input()).unwrap();
        net.propagate();
        assert!(net.class_cost(class) < 0.25);
    }
}

#[test]
fn reported_costs_are_the_last_visit_of_each_class() {
    let store = two_class_store();
    let start = build(4, 4, 1, 2);
    let seed_rng = StdRng::seed_from_u64(8);
    let cfg = ConvergenceConfig {
        learning_rate: 0.2,
        desired_cost: -1.0,
        verbose: false,
        max_steps: Some(30),
    };

    let mut net = start.clone();
    let mut rng = seed_rng.clone();
    let report = net.train_until_converged(&store, &mut rng, &cfg).unwrap();

    // Replay the same draws by hand.
    let mut replay = start;
    let mut rng = seed_rng;
    let mut trainer = replay.trainer();
    let mut costs = vec![f64::INFINITY; 2];
    for _ in 0..30 {
        let class = rng.gen_range(0..replay.num_outputs());
        let index = rng.gen_range(0..store.num_entries(class));
        replay.encode_input(store.sample(class, index), store.max_input()).unwrap();
        replay.propagate();
        costs[class] = replay.class_cost(class);
        replay.train_step(&mut trainer, class, 0.2).unwrap();
    }

    assert_eq!(report.class_costs, costs);
    assert_eq!(net.output_layer().all_edges(), replay.output_layer().all_edges());
}

#[test]
fn infinite_target_stops_after_exactly_one_step() {
    let store = two_class_store();
    let mut net = build(4, 4, 1, 2);
    let mut rng = StdRng::seed_from_u64(2);
    let cfg = ConvergenceConfig {
        desired_cost: f64::INFINITY,
        ..ConvergenceConfig::default()
    };

    let report = net.train_until_converged(&store, &mut rng, &cfg).unwrap();
    assert_eq!(report.steps, 1);
    assert!(report.converged);
    assert_eq!(report.class_costs.iter().filter(|c| c.is_finite()).count(), 1);
}

#[test]
fn target_below_minimum_cost_never_converges() {
    let store = two_class_store();
    let mut net = build(4, 4, 1, 2);
    let mut rng = StdRng::seed_from_u64(2);
    let cfg = ConvergenceConfig {
        learning_rate: 0.2,
        desired_cost: -0.5,
        verbose: false,
        max_steps: Some(500),
    };

    let report = net.train_until_converged(&store, &mut rng, &cfg).unwrap();
    assert_eq!(report.steps, 500);
    assert!(!report.converged);
}
