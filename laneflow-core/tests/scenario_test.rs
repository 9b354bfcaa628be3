//! Scenario tests: the worked three-vehicle example and seeded arrival
//! simulations checked against the Poisson test.

use laneflow_core::arrival::{analyze_arrivals, poisson_goodness_of_fit, ArrivalConfig, FitDecision};
use laneflow_core::domain::{CrossingEvent, VehicleId};
use laneflow_core::flow_speed::{compute_flow_speed, FlowSpeedConfig};
use laneflow_core::headway::{compute_headways, FlowRegime, HeadwayConfig};
use laneflow_core::headway_fit::{fit_headway_distribution, HeadwayFitConfig, HeadwayModel};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Exp, Poisson};

fn event(vehicle: u64, t: f64, v: f64) -> CrossingEvent {
    CrossingEvent {
        vehicle_id: VehicleId(vehicle),
        section_position: 400.0,
        crossing_time: t,
        interpolated_speed: v,
    }
}

// ── Worked example ───────────────────────────────────────────────────

#[test]
fn three_vehicle_example() {
    let events = vec![event(1, 10.0, 30.0), event(2, 12.0, 20.0), event(3, 12.5, 25.0)];

    let headways = compute_headways(&events, &HeadwayConfig::default());
    assert_eq!(headways.headways, vec![2.0, 0.5]);
    let summary = headways.summary().unwrap();
    assert!((summary.mean - 1.25).abs() < 1e-12);
    assert!((summary.coefficient_of_variation.value().unwrap() - 0.6).abs() < 1e-12);
    assert_eq!(summary.regime, Some(FlowRegime::Congested));

    let flow = compute_flow_speed(&events, 10.0, &FlowSpeedConfig::default()).unwrap();
    let window = &flow[0];
    assert!((window.time_mean_speed.value().unwrap() - 25.0).abs() < 1e-12);
    let space_mean = window.space_mean_speed.value().unwrap();
    assert!((space_mean - 24.324_324_324).abs() < 1e-6);
}

// ── Poisson simulation ───────────────────────────────────────────────

#[test]
fn simulated_poisson_counts_are_mostly_accepted() {
    let config = ArrivalConfig::default();
    let poisson = Poisson::new(5.0).unwrap();
    let mut accepted = 0;

    for seed in 0..50_u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let counts: Vec<u32> = (0..200).map(|_| poisson.sample(&mut rng) as u32).collect();
        let fit = poisson_goodness_of_fit(&counts, &config).unwrap();
        assert!(fit.degrees_of_freedom >= 3);
        if fit.decision == FitDecision::Accept {
            accepted += 1;
        }
    }

    assert!(accepted >= 40, "only {accepted}/50 seeded trials accepted");
}

#[test]
fn simulated_poisson_process_end_to_end() {
    // Exponential gaps at 0.5 veh/s give Poisson(5) counts per 10 s window.
    let mut rng = StdRng::seed_from_u64(42);
    let gaps = Exp::new(0.5).unwrap();
    let mut t = 0.0;
    let events: Vec<_> = (0..2000)
        .map(|i| {
            t += gaps.sample(&mut rng);
            event(i, t, 30.0)
        })
        .collect();

    let arrivals = analyze_arrivals(&events, 10.0, &ArrivalConfig::default()).unwrap();
    assert!((arrivals.lambda_hat - 5.0).abs() < 0.5);
    let dispersion = arrivals.dispersion_index.unwrap();
    assert!(dispersion > 0.7 && dispersion < 1.3, "dispersion {dispersion}");
    assert!(arrivals.goodness_of_fit.is_ok());

    let headways = compute_headways(&events, &HeadwayConfig::default());
    let fit = fit_headway_distribution(&headways.headways, &HeadwayFitConfig::default()).unwrap();
    assert_eq!(fit.best, HeadwayModel::Exponential);
    assert!((fit.exponential.rate - 0.5).abs() < 0.05);
}

#[test]
fn regular_arrivals_are_rejected() {
    let events: Vec<_> = (0..500).map(|i| event(i, i as f64 * 2.0, 30.0)).collect();
    let arrivals = analyze_arrivals(&events, 10.0, &ArrivalConfig::default()).unwrap();
    let fit = arrivals.goodness_of_fit.unwrap();
    assert_eq!(fit.decision, FitDecision::Reject);
    assert!(fit.p_value < 1e-6);
}
