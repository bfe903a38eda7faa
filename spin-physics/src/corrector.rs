//! Projection of the body-frame momentum back onto the intersection of the
//! momentum sphere and the energy ellipsoid.
//!
//! The explicit orientation update preserves the momentum sphere (it only
//! ever rotates the momentum vector) but slowly drives it off the energy
//! ellipsoid. This module re-projects the point with an adaptive-gain
//! gradient descent on the summed squared quadric residuals. The scheme is a
//! heuristic: non-monotone steps are rejected and the gain backed off, and a
//! hard iteration cap bounds the cost per call. There is no convergence
//! proof; the cap and the gain floor are tuned values.

use nalgebra as na;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Gain multiplier after an accepted (improving) step.
const GAIN_GROWTH: f64 = 1.1;
/// Gain multiplier after a rejected (worsening or non-finite) step.
const GAIN_BACKOFF: f64 = 0.2;

/// Tuning for [`EllipsoidProjector`]. The defaults are tuned values with no
/// derivation behind them; they work, but treat them as starting points.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionOptions {
    /// Hard cap on descent iterations per call.
    pub max_iterations: u32,
    /// Convergence threshold on the summed squared residuals.
    pub error_threshold: f64,
    /// Starting value of the adaptive gain.
    pub initial_step_factor: f64,
    /// The gain is clamped here and the projection gives up below it.
    pub step_factor_floor: f64,
}

impl Default for ProjectionOptions {
    fn default() -> Self {
        Self {
            max_iterations: 30,
            error_threshold: 1e-22,
            initial_step_factor: 0.1,
            step_factor_floor: 1e-7,
        }
    }
}

/// The projection residual went NaN; the correction attempt is aborted.
///
/// Distinct from ordinary non-convergence, which the adaptive gain handles
/// by backing off. NaN means the inputs are poisoned (zero inertia,
/// non-finite dt) and iterating further cannot recover.
#[derive(Debug, Error)]
pub enum CorrectionError {
    #[error("ellipsoid projection residual is NaN")]
    NanResidual,
}

/// Iterative projector onto the sphere/ellipsoid intersection.
///
/// The adaptive gain persists across calls: consecutive corrections start
/// from the gain the previous one ended on, so a converged simulation keeps
/// a gain that tends to succeed in very few iterations.
#[derive(Debug, Clone)]
pub struct EllipsoidProjector {
    max_iterations: u32,
    error_threshold: f64,
    step_factor_floor: f64,
    step_factor: f64,
}

impl EllipsoidProjector {
    pub fn new(options: ProjectionOptions) -> Self {
        Self {
            max_iterations: options.max_iterations,
            error_threshold: options.error_threshold,
            step_factor_floor: options.step_factor_floor,
            step_factor: options.initial_step_factor,
        }
    }

    /// Current adaptive gain (diagnostic).
    pub fn step_factor(&self) -> f64 {
        self.step_factor
    }

    /// Project `p` onto the intersection of the two quadrics described by
    /// the elementwise inverse radii `inv_sphere` (momentum sphere) and
    /// `inv_ellipsoid` (energy ellipsoid).
    ///
    /// Returns the best point reached: either converged below the error
    /// threshold, or where the gain floor / iteration cap stopped the
    /// descent. A NaN residual is fatal and aborts the attempt.
    pub fn project(
        &mut self,
        p: na::Vector3<f64>,
        inv_sphere: &na::Vector3<f64>,
        inv_ellipsoid: &na::Vector3<f64>,
    ) -> Result<na::Vector3<f64>, CorrectionError> {
        let mut old_error: Option<f64> = None;
        let mut best = p;
        let mut new_p = p;

        let mut i = 0u32;
        loop {
            let a = new_p.component_mul(inv_sphere);
            let b = new_p.component_mul(inv_ellipsoid);
            let a2 = a.norm_squared();
            let b2 = b.norm_squared();
            let error = sq(a2 - 1.0) + sq(b2 - 1.0);

            if error < self.error_threshold {
                break;
            }
            if error.is_nan() {
                return Err(CorrectionError::NanResidual);
            }

            match old_error {
                None => old_error = Some(error),
                Some(prev) => {
                    if error >= prev || !error.is_finite() {
                        // Overshot: back off the gain and retry from the
                        // best accepted point.
                        self.step_factor *= GAIN_BACKOFF;
                        new_p = best;
                        if self.step_factor < self.step_factor_floor {
                            self.step_factor = self.step_factor_floor;
                            break;
                        }
                    } else {
                        self.step_factor *= GAIN_GROWTH;
                        best = new_p;
                        old_error = Some(error);
                    }
                }
            }

            if i > self.max_iterations {
                break;
            }
            i += 1;

            // Gradient of (‖a‖²−1)² + (‖b‖²−1)² in p, up to the inverse-radii
            // weighting already folded into a and b.
            let grad = a * (4.0 * (a2 - 1.0)) + b * (4.0 * (b2 - 1.0));
            new_p += grad * (self.step_factor * -2.0 * error / grad.norm_squared());
        }

        Ok(new_p)
    }
}

fn sq(x: f64) -> f64 {
    x * x
}
