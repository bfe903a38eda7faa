//! Long-horizon validation of the intermediate-axis (tennis-racket)
//! instability with the reference body: I = (0.36, 0.12, 0.44),
//! L = (2, 0, 0), a 2e-8 rad tilt about z, dt = 5e-6.
//!
//! Spinning about x (the intermediate moment) is unstable: the tiny tilt
//! grows exponentially until the body flips, transfers momentum through the
//! y/z axes, and settles back toward the x spin, over and over. The
//! corrector must hold the energy to its initial value throughout.

use nalgebra as na;
use spin_physics::{SimOptions, Simulation};

#[test]
fn flips_periodically_while_conserving_energy() {
    let mut sim = Simulation::new(&SimOptions::default());

    // 2 million steps = 10 s of simulated time, enough to reach the first
    // flip (~5.3 s for this body and tilt) and recover from it. Sample the
    // body-frame angular velocity along the way.
    let total_steps: u64 = 2_000_000;
    let sample_every: u64 = 10_000;

    let mut max_offaxis: f64 = 0.0;
    let mut offaxis_after_peak = f64::INFINITY;
    let mut peak_seen = false;
    let mut worst_energy_error: f64 = 0.0;

    let mut done = 0;
    while done < total_steps {
        done += sim.run(sample_every, 60_000).expect("correction diverged");

        let state = sim.state();
        let energy_error =
            ((state.current_energy() - state.initial_energy()) / state.initial_energy()).abs();
        worst_energy_error = worst_energy_error.max(energy_error);

        let omega_b = state.angular_velocity_body();
        let offaxis = na::Vector2::new(omega_b.y, omega_b.z).norm();
        if !peak_seen && offaxis > max_offaxis {
            max_offaxis = offaxis;
        }
        // Once the flip is well underway, watch for the recovery.
        if max_offaxis > 5.0 {
            peak_seen = true;
            offaxis_after_peak = offaxis_after_peak.min(offaxis);
        }
    }

    assert_eq!(done, total_steps);

    // Energy pinned to its initial value for the whole run.
    assert!(
        worst_energy_error < 1e-8,
        "worst relative energy error {worst_energy_error}"
    );

    // The perturbation grew from 2e-8 into a full momentum transfer...
    assert!(peak_seen, "no flip observed; max off-axis rate {max_offaxis}");
    // ...and then died back down: periodic exchange, not monotonic growth.
    assert!(
        offaxis_after_peak < 1.0,
        "off-axis rate never recovered below 1.0 (min after peak {offaxis_after_peak})"
    );
}

#[test]
fn x_spin_rate_is_bracketed_by_the_energy_surfaces() {
    // On the intersection of the two quadrics, |ω_x| can never exceed its
    // initial value and ω stays bounded by L/I_min.
    let mut sim = Simulation::new(&SimOptions::default());
    let omega_max = 2.0 / 0.12;

    for _ in 0..50 {
        sim.run(10_000, 60_000).unwrap();
        let omega_b = sim.state().angular_velocity_body();
        assert!(omega_b.x.abs() <= 2.0 / 0.36 * (1.0 + 1e-6));
        assert!(omega_b.norm() <= omega_max * (1.0 + 1e-6));
    }
}
