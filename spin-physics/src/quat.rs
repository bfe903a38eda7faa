//! Quaternion algebra for the orientation hot loop.
//!
//! Orientations are raw `na::Quaternion<f64>` values kept *near* unit norm,
//! not `na::UnitQuaternion`: the integrator renormalizes with a first-order
//! Newton step instead of an exact square root, and `UnitQuaternion`
//! constructors would force the exact normalize on every step. Hamilton
//! product, conjugate, scale, and add come from nalgebra; this module adds
//! the operations it does not provide in the required form.

use nalgebra as na;

/// Below this rotation angle [rad] the exponential map switches to its
/// Taylor-series branch to avoid the sin(x)/x singularity at x -> 0.
pub const SMALL_ANGLE: f64 = 2e-4;

/// Lengths below this are treated as zero by the exact normalize.
pub const NORM_EPSILON: f64 = 1e-30;

/// Exponential map: the quaternion exp(½ v·dt) rotating by ‖v‖·dt radians
/// about v.
///
/// Near zero angle, sin(θ/2)/θ is evaluated by its series 1/2 − θ²/48 to
/// keep the map smooth across the branch point.
pub fn quat_exp_scaled(v: &na::Vector3<f64>, dt: f64) -> na::Quaternion<f64> {
    let len = v.norm() * dt;
    let half = len * 0.5;
    let (sin_half, cos_half) = half.sin_cos();
    let sinc_half = if len >= SMALL_ANGLE {
        sin_half / len
    } else {
        0.5 - half * half / 12.0
    };
    let coeff = sinc_half * dt;
    na::Quaternion::new(cos_half, v.x * coeff, v.y * coeff, v.z * coeff)
}

/// Exponential map of an unscaled rotation vector.
pub fn quat_exp(v: &na::Vector3<f64>) -> na::Quaternion<f64> {
    quat_exp_scaled(v, 1.0)
}

/// First-order renormalization: q · 2/(1 + ‖q‖²).
///
/// One Newton step of 1/‖q‖ about 1, exact to first order in (‖q‖² − 1).
/// Only valid when q is already near unit norm, which the integrator
/// maintains; cheaper than the square root in [`normalize`].
pub fn normalize_approx(q: &na::Quaternion<f64>) -> na::Quaternion<f64> {
    q * (2.0 / (1.0 + q.norm_squared()))
}

/// Exact normalize. A length below [`NORM_EPSILON`] yields the zero
/// quaternion; this is the defined degenerate result, not an error.
pub fn normalize(q: &na::Quaternion<f64>) -> na::Quaternion<f64> {
    let len = q.norm();
    if len < NORM_EPSILON {
        na::Quaternion::new(0.0, 0.0, 0.0, 0.0)
    } else {
        q * (1.0 / len)
    }
}

/// Rotate v by the unit quaternion q without forming q·v·q⁻¹:
/// v' = 2(u·v)u + (s² − u·u)v + 2s(u×v), with s = q.w and u the vector part.
pub fn rotate(q: &na::Quaternion<f64>, v: &na::Vector3<f64>) -> na::Vector3<f64> {
    let u = q.imag();
    let s = q.scalar();
    u * (2.0 * u.dot(v)) + v * (s * s - u.norm_squared()) + u.cross(v) * (2.0 * s)
}

/// Rotate v by the inverse (conjugate) of the unit quaternion q.
pub fn rotate_inv(q: &na::Quaternion<f64>, v: &na::Vector3<f64>) -> na::Vector3<f64> {
    rotate(&q.conjugate(), v)
}
