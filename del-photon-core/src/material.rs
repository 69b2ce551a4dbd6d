//! Homogeneous optical media

use crate::error::{PhotonError, Result};
use crate::photon::Photon;
use num_traits::AsPrimitive;

/// number of draws before the phase function sampler gives up
pub const MAX_SAMPLING_ATTEMPTS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhaseFunction<T> {
    Isotropic,
    /// anisotropy factor `g` in [-1, 1]
    HenyeyGreenstein { g: T },
}

/// Distance to the next interaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FreePath<T> {
    Finite(T),
    /// the medium neither scatters nor absorbs (`mu_t == 0`)
    Unbounded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BulkMaterial<T> {
    pub mu_s: T,
    pub mu_a: T,
    pub mu_t: T,
    /// fraction of the weight absorbed per interaction, `mu_a / mu_t`
    pub albedo: T,
    pub index: T,
    pub phase_function: PhaseFunction<T>,
}

impl<T> BulkMaterial<T>
where
    T: num_traits::Float + 'static + Copy + std::fmt::Debug,
    f64: AsPrimitive<T>,
{
    /// isotropic scattering medium
    pub fn new(mu_s: T, mu_a: T, index: T) -> Result<Self> {
        let valid = |v: T| v.is_finite() && v >= T::zero();
        if !valid(mu_s) || !valid(mu_a) {
            return Err(PhotonError::InvalidMaterial(format!(
                "coefficients must be finite and non-negative (mu_s={:?}, mu_a={:?})",
                mu_s, mu_a
            )));
        }
        if !index.is_finite() || index <= T::zero() {
            return Err(PhotonError::InvalidMaterial(format!(
                "refractive index must be positive (index={:?})",
                index
            )));
        }
        let mu_t = mu_s + mu_a;
        let albedo = if mu_t == T::zero() {
            T::zero()
        } else {
            mu_a / mu_t
        };
        Ok(BulkMaterial {
            mu_s,
            mu_a,
            mu_t,
            albedo,
            index,
            phase_function: PhaseFunction::Isotropic,
        })
    }

    pub fn henyey_greenstein(mu_s: T, mu_a: T, index: T, g: T) -> Result<Self> {
        if !(g >= -T::one() && g <= T::one()) {
            return Err(PhotonError::InvalidMaterial(format!(
                "anisotropy must lie in [-1, 1] (g={:?})",
                g
            )));
        }
        let mut material = Self::new(mu_s, mu_a, index)?;
        material.phase_function = PhaseFunction::HenyeyGreenstein { g };
        Ok(material)
    }

    /// non-interacting medium with unit index
    pub fn air() -> Self {
        BulkMaterial {
            mu_s: T::zero(),
            mu_a: T::zero(),
            mu_t: T::zero(),
            albedo: T::zero(),
            index: T::one(),
            phase_function: PhaseFunction::Isotropic,
        }
    }

    pub fn anisotropy(&self) -> T {
        match self.phase_function {
            PhaseFunction::Isotropic => T::zero(),
            PhaseFunction::HenyeyGreenstein { g } => g,
        }
    }

    pub fn is_interacting(&self) -> bool {
        self.mu_t > T::zero()
    }

    /// `None` for a non-interacting medium
    pub fn mean_free_path(&self) -> Option<T> {
        if self.is_interacting() {
            Some(T::one() / self.mu_t)
        } else {
            None
        }
    }

    /// `-ln(U) / mu_t` with `U` uniform in (0, 1]
    pub fn sample_free_path<RNG>(&self, rng: &mut RNG) -> FreePath<T>
    where
        RNG: rand::Rng,
    {
        if !self.is_interacting() {
            return FreePath::Unbounded;
        }
        let u: f64 = rng.sample(rand::distributions::OpenClosed01);
        let optical_depth: T = (-u.ln()).as_();
        FreePath::Finite(optical_depth / self.mu_t)
    }

    /// Polar angle `theta` in [0, pi] from the phase function and azimuth `phi` uniform in [0, 2pi).
    pub fn sample_scattering_angles<RNG>(&self, rng: &mut RNG) -> Result<(T, T)>
    where
        RNG: rand::Rng,
    {
        let pi: T = std::f64::consts::PI.as_();
        let phi: T = (2. * std::f64::consts::PI * rng.gen::<f64>()).as_();
        let g = self.anisotropy();
        for _ in 0..MAX_SAMPLING_ATTEMPTS {
            let theta = henyey_greenstein_theta(g, rng.gen::<f64>().as_());
            if theta >= T::zero() && theta <= pi {
                return Ok((theta, phi));
            }
        }
        Err(PhotonError::SamplingExhausted {
            attempts: MAX_SAMPLING_ATTEMPTS,
        })
    }

    /// Removes `weight * albedo` from the photon and returns the amount deposited.
    pub fn absorb_energy(&self, photon: &mut Photon<T>) -> T {
        let delta = photon.weight * self.albedo;
        photon.decrease_weight_by(delta)
    }
}

impl<T> std::fmt::Display for BulkMaterial<T>
where
    T: num_traits::Float,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let v = |x: T| x.to_f64().unwrap_or(f64::NAN);
        write!(
            f,
            " µs={} µa={} index={}",
            v(self.mu_s),
            v(self.mu_a),
            v(self.index)
        )?;
        if let PhaseFunction::HenyeyGreenstein { g } = self.phase_function {
            write!(f, " g={}", v(g))?;
        }
        Ok(())
    }
}

/// Inverse CDF of the Henyey-Greenstein phase function.
/// NaN is returned when rounding pushes the cosine out of [-1, 1].
pub fn henyey_greenstein_theta<T>(g: T, u: T) -> T
where
    T: num_traits::Float + 'static + Copy,
    f64: AsPrimitive<T>,
{
    let one = T::one();
    let two: T = 2.0.as_();
    if g == T::zero() {
        return (one - two * u).acos();
    }
    let s = (one - g * g) / (one - g + two * g * u);
    ((one + g * g - s * s) / (two * g)).acos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_derived_coefficients() -> anyhow::Result<()> {
        let m = BulkMaterial::<f64>::new(30., 0.5, 1.4)?;
        assert_eq!(m.mu_t, 30.5);
        assert!((m.albedo - 0.5 / 30.5).abs() < 1.0e-15);
        assert!((m.albedo - 0.0164).abs() < 1.0e-4);
        let air = BulkMaterial::<f64>::air();
        assert_eq!(air.albedo, 0.);
        assert!(air.mean_free_path().is_none());
        Ok(())
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(BulkMaterial::<f64>::new(-1., 0., 1.).is_err());
        assert!(BulkMaterial::<f64>::new(1., f64::NAN, 1.).is_err());
        assert!(BulkMaterial::<f64>::new(1., 0., 0.).is_err());
        assert!(BulkMaterial::<f64>::henyey_greenstein(1., 0., 1., 1.5).is_err());
        assert!(BulkMaterial::<f64>::henyey_greenstein(1., 0., 1., -1.).is_ok());
    }

    #[test]
    fn test_free_path_unbounded_in_vacuum() -> anyhow::Result<()> {
        let mut rng = rand_chacha::ChaChaRng::seed_from_u64(0);
        let m = BulkMaterial::<f32>::new(0., 0., 1.)?;
        assert_eq!(m.sample_free_path(&mut rng), FreePath::Unbounded);
        Ok(())
    }

    #[test]
    fn test_free_path_mean() -> anyhow::Result<()> {
        let mut rng = rand_chacha::ChaChaRng::seed_from_u64(1);
        let m = BulkMaterial::<f64>::new(8., 2., 1.)?;
        let n = 100_000;
        let mut sum = 0.;
        for _ in 0..n {
            let FreePath::Finite(d) = m.sample_free_path(&mut rng) else {
                panic!("interacting medium returned an unbounded path");
            };
            assert!(d >= 0. && d.is_finite());
            sum += d;
        }
        let mean = sum / n as f64;
        assert!((mean - 0.1).abs() < 0.002, "{}", mean);
        Ok(())
    }

    #[test]
    fn test_isotropic_angles() -> anyhow::Result<()> {
        let mut rng = rand_chacha::ChaChaRng::seed_from_u64(2);
        let m = BulkMaterial::<f64>::new(1., 0., 1.)?;
        let n = 100_000;
        let mut sum_cos = 0.;
        for _ in 0..n {
            let (theta, phi) = m.sample_scattering_angles(&mut rng)?;
            assert!((0.0..=std::f64::consts::PI).contains(&theta));
            assert!((0.0..2. * std::f64::consts::PI).contains(&phi));
            sum_cos += theta.cos();
        }
        assert!((sum_cos / n as f64).abs() < 0.01);
        Ok(())
    }

    #[test]
    fn test_henyey_greenstein_mean_cosine() -> anyhow::Result<()> {
        let mut rng = rand_chacha::ChaChaRng::seed_from_u64(3);
        for g in [-0.5, 0.3, 0.8, 0.95] {
            let m = BulkMaterial::<f64>::henyey_greenstein(10., 0.1, 1.4, g)?;
            let n = 50_000;
            let mut sum_cos = 0.;
            for _ in 0..n {
                let (theta, _phi) = m.sample_scattering_angles(&mut rng)?;
                sum_cos += theta.cos();
            }
            // <cos(theta)> = g for Henyey-Greenstein
            assert!((sum_cos / n as f64 - g).abs() < 0.01, "g={}", g);
        }
        Ok(())
    }

    #[test]
    fn test_extreme_anisotropy_stays_in_range() -> anyhow::Result<()> {
        let mut rng = rand_chacha::ChaChaRng::seed_from_u64(4);
        for g in [-1f32, 1f32, 0.999f32] {
            let m = BulkMaterial::henyey_greenstein(1f32, 0., 1., g)?;
            for _ in 0..10_000 {
                let (theta, _) = m.sample_scattering_angles(&mut rng)?;
                assert!((0.0..=std::f32::consts::PI).contains(&theta));
            }
        }
        Ok(())
    }

    #[test]
    fn test_sampling_exhausted_is_reported() {
        // every draw is NaN
        let mut m = BulkMaterial::<f64>::air();
        m.phase_function = PhaseFunction::HenyeyGreenstein { g: f64::NAN };
        let mut rng = rand_chacha::ChaChaRng::seed_from_u64(5);
        let res = m.sample_scattering_angles(&mut rng);
        assert_eq!(
            res,
            Err(PhotonError::SamplingExhausted {
                attempts: MAX_SAMPLING_ATTEMPTS
            })
        );
    }

    #[test]
    fn test_absorb_energy() -> anyhow::Result<()> {
        let m = BulkMaterial::<f64>::new(3., 1., 1.)?;
        let mut p = Photon::new([0.; 3], [0., 0., 1.], 632.)?;
        let delta = m.absorb_energy(&mut p);
        assert!((delta - 0.25).abs() < 1.0e-15);
        assert!((p.weight - 0.75).abs() < 1.0e-15);
        let delta = m.absorb_energy(&mut p);
        assert!((p.weight - 0.5625).abs() < 1.0e-15);
        assert!((delta - 0.1875).abs() < 1.0e-15);
        Ok(())
    }

    #[test]
    fn test_display() -> anyhow::Result<()> {
        let m = BulkMaterial::<f64>::henyey_greenstein(30., 0.5, 1.4, 0.8)?;
        assert_eq!(format!("{}", m), " µs=30 µa=0.5 index=1.4 g=0.8");
        Ok(())
    }
}
