//! Fresnel amplitude coefficients at a dielectric interface

use num_traits::AsPrimitive;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FresnelCoefficients<T> {
    pub rp: T,
    pub rs: T,
    pub tp: T,
    pub ts: T,
}

impl<T> FresnelCoefficients<T>
where
    T: num_traits::Float + 'static + Copy,
    f64: AsPrimitive<T>,
{
    /// * `cos_theta_from` - cosine of the incidence angle (sign is ignored)
    /// * `n_from`, `n_to` - refractive indices of the incident and the transmitted side
    pub fn new(cos_theta_from: T, n_from: T, n_to: T) -> Self {
        let one = T::one();
        let two: T = 2.0.as_();
        let cos_from = cos_theta_from.abs().min(one);
        let m = n_to / n_from;
        if m == one {
            return FresnelCoefficients {
                rp: T::zero(),
                rs: T::zero(),
                tp: one,
                ts: one,
            };
        }
        let sin_from = (one - cos_from * cos_from).max(T::zero()).sqrt();
        let sin_to = sin_from / m;
        if sin_to >= one {
            // past the critical angle
            return FresnelCoefficients {
                rp: one,
                rs: one,
                tp: T::zero(),
                ts: T::zero(),
            };
        }
        let cos_to = (one - sin_to * sin_to).sqrt();
        let tp = two * cos_from / (cos_to + m * cos_from);
        let ts = two * cos_from / (cos_from + m * cos_to);
        FresnelCoefficients {
            rp: tp * m - one,
            rs: ts - one,
            tp,
            ts,
        }
    }

    /// unpolarized intensity reflectance `(Rp^2 + Rs^2) / 2`
    pub fn reflection_probability(&self) -> T {
        let half: T = 0.5.as_();
        (self.rp * self.rp + self.rs * self.rs) * half
    }
}

/// `sin(theta_t)` from Snell's law, `n_from sin(theta_i) = n_to sin(theta_t)`.
///
/// The ratio is `n_from / n_to`, not its inverse, the same one [`FresnelCoefficients`]
/// uses, so both exceed one past the same critical angle.
pub fn snell_sin_theta_t<T>(theta_i: T, n_from: T, n_to: T) -> T
where
    T: num_traits::Float,
{
    theta_i.sin() * n_from / n_to
}

#[test]
fn test_matched_index_transmits() {
    let f = FresnelCoefficients::<f64>::new(0.3, 1.4, 1.4);
    assert_eq!(f.reflection_probability(), 0.);
    assert_eq!((f.tp, f.ts), (1., 1.));
}

#[test]
fn test_normal_incidence() {
    let (n1, n2) = (1.0f64, 1.5f64);
    let f = FresnelCoefficients::new(1.0, n1, n2);
    let expected = ((n2 - n1) / (n2 + n1)).powi(2);
    assert!((f.reflection_probability() - expected).abs() < 1.0e-12);
    // symmetric when coming from the other side
    let g = FresnelCoefficients::new(1.0, n2, n1);
    assert!((g.reflection_probability() - expected).abs() < 1.0e-12);
}

#[test]
fn test_total_internal_reflection() {
    let critical = (1.0f64 / 1.5).asin();
    let above = FresnelCoefficients::new((critical + 0.01).cos(), 1.5, 1.0);
    assert_eq!(above.reflection_probability(), 1.);
    let below = FresnelCoefficients::new((critical - 0.05).cos(), 1.5, 1.0);
    assert!(below.reflection_probability() < 1.);
    assert!(below.reflection_probability() > 0.);
    // the Fresnel cut-off and Snell's law agree on the critical angle
    assert!(snell_sin_theta_t(critical + 0.01, 1.5, 1.0) > 1.);
    assert!(snell_sin_theta_t(critical - 0.05, 1.5, 1.0) < 1.);
}

#[test]
fn test_reflectance_grows_towards_grazing() {
    let mut prev = 0f64;
    for i in 0..89 {
        let theta = (i as f64).to_radians();
        let r = FresnelCoefficients::new(theta.cos(), 1.0, 1.33).reflection_probability();
        assert!((0.0..=1.0).contains(&r));
        // Brewster's angle makes Rp vanish but the average keeps increasing past ~10 degrees
        if i > 60 {
            assert!(r >= prev);
        }
        prev = r;
    }
}

#[test]
fn test_snell_agrees_with_reflectance_at_critical_angle() {
    let (n_from, n_to) = (1.4f64, 1.0);
    let critical = (n_to / n_from).asin();
    assert!((snell_sin_theta_t(critical, n_from, n_to) - 1.).abs() < 1.0e-12);
    // glass to air bends away from the normal
    assert!(snell_sin_theta_t(0.5, n_from, n_to) > 0.5f64.sin());
    let past = critical + 1.0e-3;
    assert!(snell_sin_theta_t(past, n_from, n_to) > 1.);
    let f = FresnelCoefficients::new(past.cos(), n_from, n_to);
    assert_eq!(f.reflection_probability(), 1.);
    let before = critical - 1.0e-3;
    assert!(snell_sin_theta_t(before, n_from, n_to) < 1.);
    let f = FresnelCoefficients::new(before.cos(), n_from, n_to);
    assert!(f.reflection_probability() < 1.);
}
