//! Uniform sampling on a sphere's surface

use std::f64::consts::PI;

use rand::Rng;

use crate::core::types::DVec3;

/// Map two unit-interval samples to a point on the sphere of `radius`
///
/// Azimuth is `2π·u` and the polar angle is `acos(2v − 1)`; drawing the polar
/// angle uniformly instead would bunch points at the poles.
pub fn point_on_sphere(u: f64, v: f64, radius: f64) -> DVec3 {
    let theta = 2.0 * PI * u;
    let phi = (2.0 * v - 1.0).clamp(-1.0, 1.0).acos();

    DVec3::new(
        radius * theta.cos() * phi.sin(),
        radius * theta.sin() * phi.sin(),
        radius * phi.cos(),
    )
}

pub fn random_point_on_sphere<R: Rng + ?Sized>(rng: &mut R, radius: f64) -> DVec3 {
    let u: f64 = rng.gen();
    let v: f64 = rng.gen();
    point_on_sphere(u, v, radius)
}
