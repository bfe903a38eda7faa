//! Torque-free rigid body attitude state and its one-step integrator.
//!
//! The formulation keeps the *world-frame* angular momentum L as the
//! conserved primary state: torque-free motion never changes it, so the
//! body-frame angular velocity is re-derived from L and the orientation
//! every step instead of being integrated itself. The only integrated
//! quantity is the orientation quaternion; the energy drift it accumulates
//! is removed by [`EllipsoidProjector`] after each step.

use nalgebra as na;

use crate::corrector::{CorrectionError, EllipsoidProjector};
use crate::quat;

/// Rotation state of a torque-free rigid body.
///
/// Constructed once per run; mutated in place by [`step`](Self::step) and
/// [`correct`](Self::correct). All other access is read-only: the
/// presentation layer polls the accessors after each batch of steps.
#[derive(Debug, Clone)]
pub struct AttitudeState {
    /// Orientation BODY -> WORLD, kept near unit norm by the approximate
    /// renormalization in the step.
    q_bw: na::Quaternion<f64>,
    /// Angular momentum in WORLD frame. Conserved: never reassigned after
    /// construction.
    l_world: na::Vector3<f64>,
    /// Principal moments of inertia (I_x, I_y, I_z), diagonal in BODY axes.
    i_body: na::Vector3<f64>,
    /// Angular velocity in WORLD frame, derived each step.
    omega_world: na::Vector3<f64>,
    /// Rotational kinetic energy at construction.
    initial_energy: f64,
    /// Rotational kinetic energy as of the start of the last step.
    current_energy: f64,
    /// Momentum sphere radii: ‖L‖ in all three components.
    momentum_radii: na::Vector3<f64>,
    /// Energy ellipsoid radii: sqrt(2 E0 I_i).
    energy_radii: na::Vector3<f64>,
    inv_momentum_radii: na::Vector3<f64>,
    inv_energy_radii: na::Vector3<f64>,
}

impl AttitudeState {
    /// Construct from an initial orientation, the conserved world-frame
    /// angular momentum, and the principal moments.
    ///
    /// Derives ω, fixes `initial_energy`, and freezes both conserved-surface
    /// radii; L and the radii never change for the lifetime of the state.
    pub fn new(
        q_bw: na::Quaternion<f64>,
        l_world: na::Vector3<f64>,
        i_body: na::Vector3<f64>,
    ) -> Self {
        let (omega_world, energy) = derive_omega_energy(&q_bw, &l_world, &i_body);

        let momentum_radii = na::Vector3::repeat(l_world.norm());
        let energy_radii = (i_body * (2.0 * energy)).map(f64::sqrt);

        Self {
            q_bw,
            l_world,
            i_body,
            omega_world,
            initial_energy: energy,
            current_energy: energy,
            momentum_radii,
            energy_radii,
            inv_momentum_radii: momentum_radii.map(f64::recip),
            inv_energy_radii: energy_radii.map(f64::recip),
        }
    }

    /// Advance the orientation by one explicit step of size `dt`.
    ///
    /// ω = q (q⁻¹ L ⊘ I), then q ← approx_normalize(exp(½ ω dt) · q): the
    /// incremental rotation is a world-frame one, composed on the left.
    /// A zero inertia component or non-finite dt is not special-cased here;
    /// the NaN it produces surfaces in the next correction.
    pub fn step(&mut self, dt: f64) {
        let inv_q = self.q_bw.conjugate();
        let l_body = quat::rotate(&inv_q, &self.l_world);
        let omega_body = l_body.component_div(&self.i_body);
        self.omega_world = quat::rotate(&self.q_bw, &omega_body);

        // E = ½ ω_b · (I ⊙ ω_b), with ω_b re-derived through the inverse
        // rotation so the diagnostic sees exactly what the update sees.
        let local_omega = quat::rotate(&inv_q, &self.omega_world);
        self.current_energy = 0.5 * local_omega.component_mul(&self.i_body).dot(&local_omega);

        let dq = quat::quat_exp_scaled(&self.omega_world, dt);
        self.q_bw = quat::normalize_approx(&(dq * self.q_bw));
    }

    /// Remove the energy drift of the last step.
    ///
    /// Projects the body-frame momentum back onto the sphere/ellipsoid
    /// intersection and applies the implied small corrective rotation.
    /// Note the frame: δ lives in BODY axes, so its quaternion composes on
    /// the *right* of the orientation, unlike the step's world-frame
    /// increment.
    pub fn correct(&mut self, projector: &mut EllipsoidProjector) -> Result<(), CorrectionError> {
        let p = quat::rotate(&self.q_bw.conjugate(), &self.l_world);
        let new_p = projector.project(p, &self.inv_momentum_radii, &self.inv_energy_radii)?;

        // Small-angle rotation taking p to new_p: sinθ·axis ≈ θ·axis for
        // the nearly parallel pair.
        let delta = new_p.cross(&p) / (p.norm_squared() * new_p.norm_squared()).sqrt();
        self.q_bw *= quat::quat_exp(&delta);
        Ok(())
    }

    /// Orientation BODY -> WORLD.
    pub fn orientation(&self) -> na::Quaternion<f64> {
        self.q_bw
    }

    /// Conserved angular momentum in WORLD frame.
    pub fn angular_momentum(&self) -> na::Vector3<f64> {
        self.l_world
    }

    /// Principal moments of inertia.
    pub fn inertia(&self) -> na::Vector3<f64> {
        self.i_body
    }

    /// Angular velocity in WORLD frame as of the last completed step.
    pub fn angular_velocity(&self) -> na::Vector3<f64> {
        self.omega_world
    }

    /// Angular velocity in BODY frame as of the last completed step.
    pub fn angular_velocity_body(&self) -> na::Vector3<f64> {
        quat::rotate(&self.q_bw.conjugate(), &self.omega_world)
    }

    pub fn initial_energy(&self) -> f64 {
        self.initial_energy
    }

    pub fn current_energy(&self) -> f64 {
        self.current_energy
    }

    /// Momentum sphere radii (all components equal to ‖L‖); for scaling a
    /// visual overlay.
    pub fn momentum_radii(&self) -> na::Vector3<f64> {
        self.momentum_radii
    }

    /// Energy ellipsoid radii sqrt(2 E0 I_i); for scaling a visual overlay.
    pub fn energy_radii(&self) -> na::Vector3<f64> {
        self.energy_radii
    }
}

/// ω and E implied by an orientation, a world-frame L, and the principal
/// moments.
fn derive_omega_energy(
    q_bw: &na::Quaternion<f64>,
    l_world: &na::Vector3<f64>,
    i_body: &na::Vector3<f64>,
) -> (na::Vector3<f64>, f64) {
    let inv_q = q_bw.conjugate();
    let omega_body = quat::rotate(&inv_q, l_world).component_div(i_body);
    let omega_world = quat::rotate(q_bw, &omega_body);
    let local_omega = quat::rotate(&inv_q, &omega_world);
    let energy = 0.5 * local_omega.component_mul(i_body).dot(&local_omega);
    (omega_world, energy)
}
