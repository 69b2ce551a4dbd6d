//! Photon packet and its random walk through turbid media

use crate::error::{PhotonError, Result};
use crate::fresnel::{snell_sin_theta_t, FresnelCoefficients};
use crate::material::{BulkMaterial, FreePath};
use crate::scene::{Geometry, HitTestOptions, MaterialLookup};
use crate::tally::EnergyTally;
use crate::vec3;
use crate::vec3::Vec3;
use num_traits::AsPrimitive;

/// Numerical parameters of the photon walk.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportParams<T> {
    /// distance kept from an interface when stopping in front of it or crossing it
    pub safety_distance: T,
    /// length of the probe segment in a non-interacting medium
    pub escape_distance: T,
    /// weight at or below which the photon plays Russian roulette
    pub roulette_threshold: T,
    /// survival probability of the roulette
    pub roulette_chance: T,
    /// abort a walk after this many steps
    pub max_steps: Option<usize>,
}

impl<T> Default for TransportParams<T>
where
    T: num_traits::Float + 'static + Copy,
    f64: AsPrimitive<T>,
{
    fn default() -> Self {
        Self {
            safety_distance: 1.0e-4.as_(),
            escape_distance: 1.0e4.as_(),
            roulette_threshold: 1.0e-4.as_(),
            roulette_chance: 0.1.as_(),
            max_steps: None,
        }
    }
}

impl<T> TransportParams<T>
where
    T: num_traits::Float + 'static + Copy + std::fmt::Debug,
    f64: AsPrimitive<T>,
{
    pub fn with_safety_distance(mut self, safety_distance: T) -> Self {
        self.safety_distance = safety_distance;
        self
    }

    pub fn with_escape_distance(mut self, escape_distance: T) -> Self {
        self.escape_distance = escape_distance;
        self
    }

    pub fn with_roulette(mut self, threshold: T, chance: T) -> Self {
        self.roulette_threshold = threshold;
        self.roulette_chance = chance;
        self
    }

    pub fn with_max_steps(mut self, max_steps: Option<usize>) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.safety_distance > T::zero()) {
            return Err(PhotonError::Configuration(format!(
                "safety distance must be positive ({:?})",
                self.safety_distance
            )));
        }
        if !(self.escape_distance > self.safety_distance) || !self.escape_distance.is_finite() {
            return Err(PhotonError::Configuration(format!(
                "escape distance must be finite and exceed the safety distance ({:?})",
                self.escape_distance
            )));
        }
        if !(self.roulette_threshold >= T::zero()) {
            return Err(PhotonError::Configuration(format!(
                "roulette threshold must be non-negative ({:?})",
                self.roulette_threshold
            )));
        }
        if !(self.roulette_chance > T::zero() && self.roulette_chance <= T::one()) {
            return Err(PhotonError::Configuration(format!(
                "roulette chance must lie in (0, 1] ({:?})",
                self.roulette_chance
            )));
        }
        Ok(())
    }
}

/// A packet of light with a statistical weight.
///
/// `e_perp` is a unit vector perpendicular to `direction`; together they form the
/// local frame in which the scattering angles are applied.
#[derive(Debug, Clone)]
pub struct Photon<T> {
    pub position: [T; 3],
    pub direction: [T; 3],
    pub e_perp: [T; 3],
    pub weight: T,
    pub wavelength: T,
    pub distance_traveled: T,
    pub num_scattering_events: usize,
    pub keep_statistics: bool,
    /// `(position, weight)` after every move, when `keep_statistics` is set
    pub statistics: Vec<([T; 3], T)>,
    original_position: [T; 3],
    original_direction: [T; 3],
    original_e_perp: [T; 3],
}

impl<T> Photon<T>
where
    T: num_traits::Float + 'static + Copy + std::fmt::Debug,
    f64: AsPrimitive<T>,
{
    /// `direction` is normalized; a photon along an axis gets the frame
    /// z -> x, x -> y, y -> z (with signs).
    pub fn new(position: [T; 3], direction: [T; 3], wavelength: T) -> Result<Self> {
        let mut direction = direction;
        if vec3::normalize_in_place(&mut direction).is_none() {
            return Err(PhotonError::ZeroDirection);
        }
        let e_perp = vec3::perpendicular_unit(&direction);
        Ok(Photon {
            position,
            direction,
            e_perp,
            weight: T::one(),
            wavelength,
            distance_traveled: T::zero(),
            num_scattering_events: 0,
            keep_statistics: false,
            statistics: vec![],
            original_position: position,
            original_direction: direction,
            original_e_perp: e_perp,
        })
    }

    /// Starts or stops recording; a recording starts with the launch sample.
    pub fn with_statistics(mut self, keep_statistics: bool) -> Self {
        self.keep_statistics = keep_statistics;
        self.statistics.clear();
        if keep_statistics {
            self.statistics.push((self.original_position, T::one()));
        }
        self
    }

    /// Back to the launch state, reusing the allocation of the statistics.
    pub fn reset(&mut self) {
        self.position = self.original_position;
        self.direction = self.original_direction;
        self.e_perp = self.original_e_perp;
        self.weight = T::one();
        self.distance_traveled = T::zero();
        self.num_scattering_events = 0;
        self.statistics.clear();
        if self.keep_statistics {
            self.statistics.push((self.original_position, T::one()));
        }
    }

    pub fn is_alive(&self) -> bool {
        self.weight > T::zero()
    }

    pub fn move_by(&mut self, distance: T) {
        self.position = vec3::axpy(distance, &self.direction, &self.position);
        self.distance_traveled = self.distance_traveled + distance;
        if self.keep_statistics {
            self.statistics.push((self.position, self.weight));
        }
    }

    /// Removes `delta` from the weight without going below zero and returns the
    /// amount actually removed.
    pub fn decrease_weight_by(&mut self, delta: T) -> T {
        let delta = delta.max(T::zero()).min(self.weight);
        self.weight = self.weight - delta;
        delta
    }

    pub fn multiply_weight_by(&mut self, scale: T) {
        self.weight = self.weight * scale;
    }

    /// Rotates `e_perp` by `phi` around the direction, then the direction by `theta`
    /// around the new `e_perp`.
    pub fn change_direction_by(&mut self, theta: T, phi: T) {
        self.e_perp = self.e_perp.rotate_around_axis(&self.direction, phi);
        self.orthonormalize_frame();
        self.direction = self.direction.rotate_around_axis(&self.e_perp, theta);
        self.orthonormalize_frame();
    }

    /// scattering event of the walk
    pub fn scatter_by(&mut self, theta: T, phi: T) {
        self.change_direction_by(theta, phi);
        self.num_scattering_events += 1;
    }

    /// normalizes the direction and makes `e_perp` a unit vector perpendicular to it
    fn orthonormalize_frame(&mut self) {
        vec3::normalize_in_place(&mut self.direction);
        let along = self.e_perp.dot(&self.direction);
        self.e_perp = self
            .e_perp
            .sub(&self.direction.scale(along))
            .try_normalize()
            .unwrap_or_else(|| vec3::perpendicular_unit(&self.direction));
    }

    /// Turns `e_perp` around the direction so that it becomes perpendicular to the plane
    /// of incidence spanned by the direction and `normal`. At normal incidence every
    /// frame qualifies and nothing changes.
    pub fn rotate_reference_frame_in_fresnel_plane(&mut self, normal: &[T; 3]) {
        let Some(mut s) = vec3::normalized_cross(&self.direction, normal) else {
            return;
        };
        if self.direction.dot(normal) < T::zero() {
            s = s.scale(-T::one());
        }
        let phi = self.e_perp.oriented_angle_with(&s, &self.direction);
        self.e_perp = self.e_perp.rotate_around_axis(&self.direction, phi);
        self.orthonormalize_frame();
    }

    /// angle of incidence in [0, pi/2] regardless of the side of the normal
    pub fn incidence_angle(&self, normal: &[T; 3]) -> T {
        vec3::normalized_dot(&self.direction, normal).abs().acos()
    }

    /// Draws reflection against the unpolarized Fresnel reflectance.
    pub fn is_reflected_from_interface<RNG>(
        &mut self,
        normal: &[T; 3],
        n_from: T,
        n_to: T,
        rng: &mut RNG,
    ) -> bool
    where
        RNG: rand::Rng,
    {
        self.rotate_reference_frame_in_fresnel_plane(normal);
        let cos_theta = vec3::normalized_dot(&self.direction, normal).abs();
        let probability = FresnelCoefficients::new(cos_theta, n_from, n_to).reflection_probability();
        let u: T = rng.gen::<f64>().as_();
        u < probability
    }

    /// Specular reflection, mirroring the direction about the interface plane.
    pub fn reflect_at_interface(&mut self, normal: &[T; 3]) {
        self.rotate_reference_frame_in_fresnel_plane(normal);
        let theta_i = self.incidence_angle(normal);
        let two: T = 2.0.as_();
        let pi: T = std::f64::consts::PI.as_();
        self.change_direction_by(-pi + two * theta_i, T::zero());
    }

    /// Refraction following Snell's law `n_from sin(theta_i) = n_to sin(theta_t)`.
    ///
    /// Fails if no refracted direction exists, which cannot happen after
    /// [`Photon::is_reflected_from_interface`] returned false for the same interface.
    pub fn transmit_through_interface(&mut self, normal: &[T; 3], n_from: T, n_to: T) -> Result<()> {
        self.rotate_reference_frame_in_fresnel_plane(normal);
        let theta_i = self.incidence_angle(normal);
        let sin_theta_t = snell_sin_theta_t(theta_i, n_from, n_to);
        // rounding between the reflectance and the angle
        let tolerance: T = 1.0e-6.as_();
        if sin_theta_t > T::one() + tolerance || sin_theta_t.is_nan() {
            return Err(PhotonError::TotalInternalReflection {
                sin_theta_t: sin_theta_t.to_f64().unwrap_or(f64::NAN),
            });
        }
        let theta_t = sin_theta_t.min(T::one()).asin();
        self.change_direction_by(theta_i - theta_t, T::zero());
        Ok(())
    }

    /// Russian roulette for photons whose weight dropped to the threshold: survivors
    /// carry `1 / chance` times their weight, the others are terminated.
    pub fn roulette<RNG>(&mut self, rng: &mut RNG, params: &TransportParams<T>)
    where
        RNG: rand::Rng,
    {
        if self.weight > T::zero() && self.weight <= params.roulette_threshold {
            let u: T = rng.gen::<f64>().as_();
            if u < params.roulette_chance {
                self.multiply_weight_by(T::one() / params.roulette_chance);
            } else {
                self.weight = T::zero();
            }
        }
    }

    fn check_step_limit(steps: usize, params: &TransportParams<T>) -> Result<()> {
        match params.max_steps {
            Some(max_steps) if steps > max_steps => Err(PhotonError::StepLimit(max_steps)),
            _ => Ok(()),
        }
    }

    /// Random walk inside an unbounded homogeneous medium until the photon dies.
    pub fn propagate_into_material<RNG, TALLY>(
        &mut self,
        material: &BulkMaterial<T>,
        rng: &mut RNG,
        params: &TransportParams<T>,
        tally: &mut TALLY,
    ) -> Result<()>
    where
        RNG: rand::Rng,
        TALLY: EnergyTally<T>,
    {
        let mut steps = 0;
        while self.is_alive() {
            steps += 1;
            Self::check_step_limit(steps, params)?;
            let (theta, phi) = material.sample_scattering_angles(rng)?;
            match material.sample_free_path(rng) {
                FreePath::Unbounded => {
                    tally.escape(&self.position, &self.direction, self.weight);
                    self.weight = T::zero();
                }
                FreePath::Finite(distance) => {
                    self.move_by(distance);
                    self.scatter_by(theta, phi);
                    let delta = material.absorb_energy(self);
                    tally.score(&self.position, delta);
                }
            }
            self.roulette(rng, params);
        }
        Ok(())
    }

    /// Random walk through a scene of regions separated by sharp interfaces.
    ///
    /// Every step probes the path to the next interaction point for an interface. At an
    /// interface the photon stops `safety_distance` in front of it and is either reflected
    /// or transmitted (moving `2 safety_distance` across). Without an interface the photon
    /// moves the whole free path, scatters and deposits energy. A photon in a
    /// non-interacting medium that meets no interface escapes.
    pub fn propagate_into_scene<SCENE, RNG, TALLY>(
        &mut self,
        scene: &SCENE,
        rng: &mut RNG,
        params: &TransportParams<T>,
        tally: &mut TALLY,
    ) -> Result<()>
    where
        SCENE: Geometry<T> + MaterialLookup<T>,
        RNG: rand::Rng,
        TALLY: EnergyTally<T>,
    {
        let options = HitTestOptions::closest();
        let two: T = 2.0.as_();
        let safety = params.safety_distance;
        let mut steps = 0;
        while self.is_alive() {
            steps += 1;
            Self::check_step_limit(steps, params)?;
            let material = scene.material_at(&self.position)?;
            let (theta, phi) = material.sample_scattering_angles(rng)?;
            let free_path = material.sample_free_path(rng);
            let distance = match free_path {
                FreePath::Finite(distance) => distance,
                FreePath::Unbounded => params.escape_distance,
            };
            let probe_end = vec3::axpy(distance + two * safety, &self.direction, &self.position);
            let hits = scene.intersect_segment(&self.position, &probe_end, &options)?;
            if let Some(hit) = hits.first() {
                let distance_to_interface = vec3::distance(&hit.position, &self.position);
                let (from, to) =
                    scene.materials_across(&self.position, &hit.position, &self.direction, safety)?;
                let (n_from, n_to) = (from.index, to.index);
                self.move_by((distance_to_interface - safety).max(T::zero()));
                if self.is_reflected_from_interface(&hit.normal, n_from, n_to, rng) {
                    self.reflect_at_interface(&hit.normal);
                } else {
                    self.transmit_through_interface(&hit.normal, n_from, n_to)?;
                    self.move_by(two * safety);
                }
            } else {
                match free_path {
                    FreePath::Unbounded => {
                        tally.escape(&self.position, &self.direction, self.weight);
                        self.weight = T::zero();
                    }
                    FreePath::Finite(distance) => {
                        self.move_by(distance);
                        self.scatter_by(theta, phi);
                        let delta = material.absorb_energy(self);
                        tally.score(&self.position, delta);
                    }
                }
            }
            self.roulette(rng, params);
        }
        Ok(())
    }
}

impl<T> std::fmt::Display for Photon<T>
where
    T: num_traits::Float,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let v = |x: T| x.to_f64().unwrap_or(f64::NAN);
        write!(
            f,
            "P: ({:.2},{:.2},{:.2}) D: ({:.2},{:.2},{:.2}) W: {:.2}",
            v(self.position[0]),
            v(self.position[1]),
            v(self.position[2]),
            v(self.direction[0]),
            v(self.direction[1]),
            v(self.direction[2]),
            v(self.weight)
        )
    }
}
