//! 3D vector algebra on `[T; 3]` with a `Vec3` trait shared by the
//! `nalgebra::Vector3<T>` backend.

use num_traits::AsPrimitive;

/// relative tolerance of the parallel / perpendicular tests
pub const TOLERANCE: f64 = 1.0e-5;

pub trait Vec3<T>: Sized {
    fn add(&self, other: &Self) -> Self;
    fn sub(&self, other: &Self) -> Self;
    fn scale(&self, s: T) -> Self;
    fn dot(&self, other: &Self) -> T;
    fn cross(&self, other: &Self) -> Self;
    fn squared_norm(&self) -> T;
    fn norm(&self) -> T;
    /// `None` for the zero vector
    fn try_normalize(&self) -> Option<Self>;
    /// the caller must guard against the zero vector
    fn normalize(&self) -> Self;
    /// Rodrigues rotation around the unit vector `axis`
    fn rotate_around_axis(&self, axis: &Self, angle: T) -> Self;
    /// signed angle in [-pi, pi] from `self` to `other` measured around `axis`
    fn oriented_angle_with(&self, other: &Self, axis: &Self) -> T;
    fn is_parallel_to(&self, other: &Self) -> bool;
    fn is_perpendicular_to(&self, other: &Self) -> bool;
}

impl<T> Vec3<T> for [T; 3]
where
    T: num_traits::Float + 'static + Copy,
    f64: AsPrimitive<T>,
{
    fn add(&self, other: &Self) -> Self {
        add(self, other)
    }
    fn sub(&self, other: &Self) -> Self {
        sub(self, other)
    }
    fn scale(&self, s: T) -> Self {
        scale(self, s)
    }
    fn dot(&self, other: &Self) -> T {
        dot(self, other)
    }
    fn cross(&self, other: &Self) -> Self {
        cross(self, other)
    }
    fn squared_norm(&self) -> T {
        squared_norm(self)
    }
    fn norm(&self) -> T {
        norm(self)
    }
    fn try_normalize(&self) -> Option<Self> {
        let n = norm(self);
        if n == T::zero() || !n.is_finite() {
            return None;
        }
        Some(scale(self, T::one() / n))
    }
    fn normalize(&self) -> Self {
        normalized(self)
    }
    fn rotate_around_axis(&self, axis: &Self, angle: T) -> Self {
        rotate_around_axis(self, axis, angle)
    }
    fn oriented_angle_with(&self, other: &Self, axis: &Self) -> T {
        oriented_angle(self, other, axis)
    }
    fn is_parallel_to(&self, other: &Self) -> bool {
        is_parallel(self, other)
    }
    fn is_perpendicular_to(&self, other: &Self) -> bool {
        is_perpendicular(self, other)
    }
}

/// Same contract as the array backend, with rotations delegated to `nalgebra::Rotation3`.
impl<T> Vec3<T> for nalgebra::Vector3<T>
where
    T: nalgebra::RealField + num_traits::Float + 'static + Copy,
    f64: AsPrimitive<T>,
{
    fn add(&self, other: &Self) -> Self {
        self + other
    }
    fn sub(&self, other: &Self) -> Self {
        self - other
    }
    fn scale(&self, s: T) -> Self {
        nalgebra::Vector3::<T>::scale(self, s)
    }
    fn dot(&self, other: &Self) -> T {
        nalgebra::Vector3::<T>::dot(self, other)
    }
    fn cross(&self, other: &Self) -> Self {
        nalgebra::Vector3::<T>::cross(self, other)
    }
    fn squared_norm(&self) -> T {
        nalgebra::Vector3::<T>::norm_squared(self)
    }
    fn norm(&self) -> T {
        nalgebra::Vector3::<T>::norm(self)
    }
    fn try_normalize(&self) -> Option<Self> {
        nalgebra::Vector3::<T>::try_normalize(self, T::zero())
    }
    fn normalize(&self) -> Self {
        nalgebra::Vector3::<T>::normalize(self)
    }
    fn rotate_around_axis(&self, axis: &Self, angle: T) -> Self {
        let axis = nalgebra::Unit::new_unchecked(*axis);
        nalgebra::Rotation3::from_axis_angle(&axis, angle) * self
    }
    fn oriented_angle_with(&self, other: &Self, axis: &Self) -> T {
        oriented_angle(&to_array(self), &to_array(other), &to_array(axis))
    }
    fn is_parallel_to(&self, other: &Self) -> bool {
        is_parallel(&to_array(self), &to_array(other))
    }
    fn is_perpendicular_to(&self, other: &Self) -> bool {
        is_perpendicular(&to_array(self), &to_array(other))
    }
}

fn to_array<T>(v: &nalgebra::Vector3<T>) -> [T; 3]
where
    T: nalgebra::Scalar + Copy,
{
    [v[0], v[1], v[2]]
}

// ---------------------------

pub fn add<T>(a: &[T; 3], b: &[T; 3]) -> [T; 3]
where
    T: num_traits::Float,
{
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

pub fn sub<T>(a: &[T; 3], b: &[T; 3]) -> [T; 3]
where
    T: num_traits::Float,
{
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub fn scale<T>(a: &[T; 3], s: T) -> [T; 3]
where
    T: num_traits::Float,
{
    [a[0] * s, a[1] * s, a[2] * s]
}

/// `alpha * x + y`
pub fn axpy<T>(alpha: T, x: &[T; 3], y: &[T; 3]) -> [T; 3]
where
    T: num_traits::Float,
{
    [alpha * x[0] + y[0], alpha * x[1] + y[1], alpha * x[2] + y[2]]
}

pub fn dot<T>(a: &[T; 3], b: &[T; 3]) -> T
where
    T: num_traits::Float,
{
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub fn cross<T>(a: &[T; 3], b: &[T; 3]) -> [T; 3]
where
    T: num_traits::Float,
{
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub fn triple_product<T>(a: &[T; 3], b: &[T; 3], c: &[T; 3]) -> T
where
    T: num_traits::Float,
{
    dot(&cross(a, b), c)
}

pub fn squared_norm<T>(a: &[T; 3]) -> T
where
    T: num_traits::Float,
{
    dot(a, a)
}

pub fn norm<T>(a: &[T; 3]) -> T
where
    T: num_traits::Float,
{
    squared_norm(a).sqrt()
}

pub fn distance<T>(a: &[T; 3], b: &[T; 3]) -> T
where
    T: num_traits::Float,
{
    norm(&sub(a, b))
}

/// undefined (NaN) for the zero vector
pub fn normalized<T>(a: &[T; 3]) -> [T; 3]
where
    T: num_traits::Float,
{
    let inv = T::one() / norm(a);
    scale(a, inv)
}

/// Normalizes in place and returns the original length.
/// The vector is left untouched and `None` is returned if its length is zero.
pub fn normalize_in_place<T>(a: &mut [T; 3]) -> Option<T>
where
    T: num_traits::Float,
{
    let n = norm(a);
    if n == T::zero() || !n.is_finite() {
        return None;
    }
    let inv = T::one() / n;
    a[0] = a[0] * inv;
    a[1] = a[1] * inv;
    a[2] = a[2] * inv;
    Some(n)
}

/// cosine of the angle between `a` and `b`, clamped to [-1, 1]
pub fn normalized_dot<T>(a: &[T; 3], b: &[T; 3]) -> T
where
    T: num_traits::Float,
{
    let d = dot(a, b) / (norm(a) * norm(b));
    d.max(-T::one()).min(T::one())
}

/// unit vector along `a x b`, `None` if they are (anti-)parallel or zero
pub fn normalized_cross<T>(a: &[T; 3], b: &[T; 3]) -> Option<[T; 3]>
where
    T: num_traits::Float,
{
    let mut c = cross(a, b);
    normalize_in_place(&mut c).map(|_| c)
}

/// parametric distance from `org` along `dir` to the plane (`origin`, `normal`)
pub fn distance_to_plane<T>(org: &[T; 3], dir: &[T; 3], origin: &[T; 3], normal: &[T; 3]) -> T
where
    T: num_traits::Float,
{
    -dot(normal, &sub(org, origin)) / dot(normal, dir)
}

/// Rodrigues rotation of `v` around the unit vector `u`
pub fn rotate_around_axis<T>(v: &[T; 3], u: &[T; 3], theta: T) -> [T; 3]
where
    T: num_traits::Float,
{
    let c = theta.cos();
    let s = theta.sin();
    let omc = T::one() - c;
    let (ux, uy, uz) = (u[0], u[1], u[2]);
    let (x, y, z) = (v[0], v[1], v[2]);
    [
        (c + ux * ux * omc) * x + (ux * uy * omc - uz * s) * y + (ux * uz * omc + uy * s) * z,
        (uy * ux * omc + uz * s) * x + (c + uy * uy * omc) * y + (uy * uz * omc - ux * s) * z,
        (uz * ux * omc - uy * s) * x + (uz * uy * omc + ux * s) * y + (c + uz * uz * omc) * z,
    ]
}

pub fn rotate_around_x<T>(v: &[T; 3], phi: T) -> [T; 3]
where
    T: num_traits::Float,
{
    let (c, s) = (phi.cos(), phi.sin());
    [v[0], c * v[1] - s * v[2], s * v[1] + c * v[2]]
}

pub fn rotate_around_y<T>(v: &[T; 3], phi: T) -> [T; 3]
where
    T: num_traits::Float,
{
    let (c, s) = (phi.cos(), phi.sin());
    [s * v[2] + c * v[0], v[1], c * v[2] - s * v[0]]
}

pub fn rotate_around_z<T>(v: &[T; 3], phi: T) -> [T; 3]
where
    T: num_traits::Float,
{
    let (c, s) = (phi.cos(), phi.sin());
    [c * v[0] - s * v[1], s * v[0] + c * v[1], v[2]]
}

/// Signed angle from `a` to `b` around `axis`.
///
/// The magnitude comes from `atan2(|a x b|, a.b)` and lies in [0, pi]; it is negated when
/// `(a x b).axis < 0`. The result is the angle by which `a` must be rotated around `axis`
/// (when `axis` is perpendicular to both) to align with `b`.
pub fn oriented_angle<T>(a: &[T; 3], b: &[T; 3], axis: &[T; 3]) -> T
where
    T: num_traits::Float,
{
    let c = cross(a, b);
    let phi = norm(&c).atan2(dot(a, b));
    if dot(&c, axis) < T::zero() {
        -phi
    } else {
        phi
    }
}

/// same orientation within the relative tolerance
pub fn is_parallel<T>(a: &[T; 3], b: &[T; 3]) -> bool
where
    T: num_traits::Float + 'static,
    f64: AsPrimitive<T>,
{
    let dp = dot(a, b) / (norm(a) * norm(b));
    (dp - T::one()).abs() <= TOLERANCE.as_()
}

pub fn is_perpendicular<T>(a: &[T; 3], b: &[T; 3]) -> bool
where
    T: num_traits::Float + 'static,
    f64: AsPrimitive<T>,
{
    let dp = dot(a, b).abs() / (norm(a) * norm(b));
    dp <= TOLERANCE.as_()
}

pub fn is_unit<T>(a: &[T; 3]) -> bool
where
    T: num_traits::Float + 'static,
    f64: AsPrimitive<T>,
{
    (norm(a) - T::one()).abs() <= TOLERANCE.as_()
}

pub fn is_approx_equal<T>(a: &[T; 3], b: &[T; 3]) -> bool
where
    T: num_traits::Float + 'static,
    f64: AsPrimitive<T>,
{
    distance(a, b) <= TOLERANCE.as_()
}

/// Some unit vector perpendicular to the unit vector `n`.
/// The axis-aligned directions map cyclically (z -> x, x -> y, y -> z, with signs).
pub fn perpendicular_unit<T>(n: &[T; 3]) -> [T; 3]
where
    T: num_traits::Float + 'static,
    f64: AsPrimitive<T>,
{
    let (o, l) = (T::zero(), T::one());
    for (axis, perp) in [([o, o, l], [l, o, o]), ([l, o, o], [o, l, o]), ([o, l, o], [o, o, l])] {
        if is_parallel(n, &axis) {
            return perp;
        }
        if is_parallel(n, &scale(&axis, -l)) {
            return scale(&perp, -l);
        }
    }
    let t = if n[0].abs() > 0.1.as_() {
        [o, l, o]
    } else {
        [l, o, o]
    };
    normalized(&cross(&t, n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use rand::SeedableRng;

    const X: [f64; 3] = [1., 0., 0.];
    const Y: [f64; 3] = [0., 1., 0.];
    const Z: [f64; 3] = [0., 0., 1.];

    fn random_unit<RNG: Rng>(rng: &mut RNG) -> [f64; 3] {
        loop {
            let v = [
                rng.gen::<f64>() * 2. - 1.,
                rng.gen::<f64>() * 2. - 1.,
                rng.gen::<f64>() * 2. - 1.,
            ];
            let n = norm(&v);
            if n > 0.1 && n < 1. {
                return scale(&v, 1. / n);
            }
        }
    }

    #[test]
    fn test_cross_product_of_basis() {
        assert!(is_approx_equal(&X.cross(&Y), &Z));
        assert!(is_approx_equal(&Y.cross(&Z), &X));
        assert!(is_approx_equal(&Z.cross(&X), &Y));
    }

    #[test]
    fn test_cross_product_antisymmetry() {
        let mut rng = rand_chacha::ChaChaRng::seed_from_u64(0);
        for _ in 0..100 {
            let u = random_unit(&mut rng).scale(3.);
            let v = random_unit(&mut rng);
            let uv = u.cross(&v);
            let vu = v.cross(&u);
            assert!(is_approx_equal(&uv, &vu.scale(-1.)));
        }
    }

    #[test]
    fn test_dot_orthogonal() {
        assert!(X.dot(&Y).abs() < 1.0e-6);
        assert!(Y.dot(&Z).abs() < 1.0e-6);
        assert!(Z.dot(&X).abs() < 1.0e-6);
        assert!((X.dot(&X) - 1.).abs() < 1.0e-6);
    }

    #[test]
    fn test_perpendicular_symmetric_and_sign_invariant() {
        let mut rng = rand_chacha::ChaChaRng::seed_from_u64(1);
        for _ in 0..100 {
            let v = random_unit(&mut rng);
            let w = perpendicular_unit(&v);
            assert!(v.is_perpendicular_to(&w));
            assert!(w.is_perpendicular_to(&v));
            assert!(v.is_perpendicular_to(&w.scale(-1.)));
            let u = random_unit(&mut rng);
            assert_eq!(u.is_perpendicular_to(&v), v.is_perpendicular_to(&u));
            assert_eq!(u.is_perpendicular_to(&v), u.is_perpendicular_to(&v.scale(-2.)));
        }
    }

    #[test]
    fn test_parallel() {
        assert!(X.is_parallel_to(&X.scale(5.)));
        assert!(!X.is_parallel_to(&X.scale(-1.)));
        assert!(!X.is_parallel_to(&Y));
        assert!(Z.is_parallel_to(&[0., 1.0e-7, 1.]));
    }

    #[test]
    fn test_rotation_by_zero_angle() {
        let mut rng = rand_chacha::ChaChaRng::seed_from_u64(2);
        for _ in 0..100 {
            let u = random_unit(&mut rng);
            let axis = random_unit(&mut rng);
            let r = u.rotate_around_axis(&axis, 0.);
            assert!(distance(&r, &u) < 1.0e-6);
        }
    }

    #[test]
    fn test_rotation_around_itself() {
        let mut rng = rand_chacha::ChaChaRng::seed_from_u64(3);
        for _ in 0..100 {
            let u = random_unit(&mut rng);
            let angle = rng.gen::<f64>() * 4. * std::f64::consts::PI - 2. * std::f64::consts::PI;
            let r = u.rotate_around_axis(&u, angle);
            assert!(distance(&r, &u) < 1.0e-6);
        }
    }

    #[test]
    fn test_rotation_chain_returns_to_x() {
        let half_pi = std::f64::consts::FRAC_PI_2;
        let v = rotate_around_z(&X, half_pi);
        assert!(is_approx_equal(&v, &Y));
        let v = rotate_around_x(&v, half_pi);
        assert!(is_approx_equal(&v, &Z));
        let v = rotate_around_y(&v, half_pi);
        assert!(is_approx_equal(&v, &X));
        // same chain with the arbitrary-axis rotation
        let v = X.rotate_around_axis(&Z, half_pi);
        let v = v.rotate_around_axis(&X, half_pi);
        let v = v.rotate_around_axis(&Y, half_pi);
        assert!(is_approx_equal(&v, &X));
    }

    #[test]
    fn test_rotation_matches_nalgebra_backend() {
        let mut rng = rand_chacha::ChaChaRng::seed_from_u64(4);
        for _ in 0..200 {
            let v = random_unit(&mut rng).scale(2.);
            let axis = random_unit(&mut rng);
            let angle = (rng.gen::<f64>() - 0.5) * 6.;
            let r0 = v.rotate_around_axis(&axis, angle);
            let r1 = nalgebra::Vector3::<f64>::from(v)
                .rotate_around_axis(&nalgebra::Vector3::<f64>::from(axis), angle);
            assert!(distance(&r0, &[r1.x, r1.y, r1.z]) < 1.0e-10);
        }
    }

    #[test]
    fn test_array_methods_match_free_functions() {
        let mut rng = rand_chacha::ChaChaRng::seed_from_u64(5);
        for _ in 0..100 {
            let a = random_unit(&mut rng).scale(3.);
            let b = random_unit(&mut rng);
            assert_eq!(a.add(&b), add(&a, &b));
            assert_eq!(a.sub(&b), sub(&a, &b));
            assert_eq!(a.cross(&b), cross(&a, &b));
            assert_eq!(a.dot(&b), dot(&a, &b));
            assert_eq!(a.norm(), norm(&a));
            assert_eq!(a.try_normalize(), Some(normalized(&a)));
            let axis = normalized(&b);
            assert_eq!(a.rotate_around_axis(&axis, 0.7), rotate_around_axis(&a, &axis, 0.7));
        }
        assert!([0f64; 3].try_normalize().is_none());
        assert!([f64::NAN, 0., 0.].try_normalize().is_none());
    }

    #[test]
    fn test_nalgebra_backend_contract() {
        let x = nalgebra::Vector3::<f64>::new(1., 0., 0.);
        let y = nalgebra::Vector3::<f64>::new(0., 1., 0.);
        let z = Vec3::cross(&x, &y);
        assert!((Vec3::dot(&z, &nalgebra::Vector3::z()) - 1.).abs() < 1.0e-12);
        assert!(Vec3::is_perpendicular_to(&x, &y));
        assert!(Vec3::is_parallel_to(&x, &x.scale(3.)));
        assert!(Vec3::try_normalize(&nalgebra::Vector3::<f64>::zeros()).is_none());
        let phi = Vec3::oriented_angle_with(&x, &y, &z);
        assert!((phi - std::f64::consts::FRAC_PI_2).abs() < 1.0e-12);
    }

    #[test]
    fn test_oriented_angle() {
        let half_pi = std::f64::consts::FRAC_PI_2;
        assert!((X.oriented_angle_with(&Y, &Z) - half_pi).abs() < 1.0e-9);
        assert!((X.oriented_angle_with(&Y, &Z.scale(-1.)) + half_pi).abs() < 1.0e-9);
        assert!((Y.oriented_angle_with(&X, &Z) + half_pi).abs() < 1.0e-9);
        let obtuse = [-1., 1., 0.];
        let phi = X.oriented_angle_with(&obtuse, &Z);
        assert!((phi - 0.75 * std::f64::consts::PI).abs() < 1.0e-9);
        // rotating by the oriented angle aligns the vectors
        let mut rng = rand_chacha::ChaChaRng::seed_from_u64(5);
        for _ in 0..100 {
            let axis = random_unit(&mut rng);
            let a = perpendicular_unit(&axis);
            let b = a.rotate_around_axis(&axis, (rng.gen::<f64>() - 0.5) * 6.2);
            let phi = a.oriented_angle_with(&b, &axis);
            assert!((-std::f64::consts::PI..=std::f64::consts::PI).contains(&phi));
            assert!(distance(&a.rotate_around_axis(&axis, phi), &b) < 1.0e-9);
        }
    }

    #[test]
    fn test_normalize_in_place() {
        let mut v = [3f32, 0., 4.];
        assert_eq!(normalize_in_place(&mut v), Some(5.));
        assert!(is_unit(&v));
        let mut zero = [0f32; 3];
        assert_eq!(normalize_in_place(&mut zero), None);
        assert_eq!(zero, [0f32; 3]);
        assert!([0f64; 3].try_normalize().is_none());
    }

    #[test]
    fn test_distance_to_plane() {
        let d = distance_to_plane(&[0., 0., 0.], &[0., 0., 2.], &[0., 0., 1.], &Z);
        assert!((d - 0.5).abs() < 1.0e-12);
        assert!((triple_product(&X, &Y, &Z) - 1.).abs() < 1.0e-12);
    }

    #[test]
    fn test_perpendicular_unit_axis_mapping() {
        assert_eq!(perpendicular_unit(&Z), X);
        assert_eq!(perpendicular_unit(&X), Y);
        assert_eq!(perpendicular_unit(&Y), Z);
        assert_eq!(perpendicular_unit(&[0., 0., -1.]), [-1., 0., 0.]);
    }
}
