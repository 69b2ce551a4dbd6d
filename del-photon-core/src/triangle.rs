//! Triangle primitive with bounds and segment intersection

use crate::vec3::Vec3;
use num_traits::AsPrimitive;

/// Minimum distance from the segment start to an accepted hit, in scene units.
/// Also the sine of the angle below which a segment is parallel to the triangle.
pub const EPSILON: f64 = 1.0e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle<T> {
    pub p0: [T; 3],
    pub p1: [T; 3],
    pub p2: [T; 3],
    pub min: [T; 3],
    pub max: [T; 3],
}

impl<T> Triangle<T>
where
    T: num_traits::Float + 'static + Copy,
    f64: AsPrimitive<T>,
{
    pub fn new(p0: [T; 3], p1: [T; 3], p2: [T; 3]) -> Self {
        let mut min = p0;
        let mut max = p0;
        for p in [&p1, &p2] {
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }
        Triangle {
            p0,
            p1,
            p2,
            min,
            max,
        }
    }

    pub fn from_trimesh(tri2vtx: &[usize], vtx2xyz: &[T], i_tri: usize) -> Self {
        let i0 = tri2vtx[i_tri * 3];
        let i1 = tri2vtx[i_tri * 3 + 1];
        let i2 = tri2vtx[i_tri * 3 + 2];
        let p0 = arrayref::array_ref![vtx2xyz, i0 * 3, 3];
        let p1 = arrayref::array_ref![vtx2xyz, i1 * 3, 3];
        let p2 = arrayref::array_ref![vtx2xyz, i2 * 3, 3];
        Self::new(*p0, *p1, *p2)
    }

    /// `(p1 - p0) x (p2 - p0)`, twice the area, pointing outward for counter-clockwise winding
    pub fn area_normal(&self) -> [T; 3] {
        self.p1.sub(&self.p0).cross(&self.p2.sub(&self.p0))
    }

    /// `None` for a degenerate triangle
    pub fn unit_normal(&self) -> Option<[T; 3]> {
        self.area_normal().try_normalize()
    }

    pub fn area(&self) -> T {
        self.area_normal().norm() * 0.5.as_()
    }

    pub fn centroid(&self) -> [T; 3] {
        let third: T = (1. / 3.).as_();
        self.p0.add(&self.p1).add(&self.p2).scale(third)
    }

    /// Möller–Trumbore test against the segment from `a` to `b`.
    ///
    /// Returns the parameter `t` in (0, 1] of the hit point `a + t (b - a)`, where the hit
    /// lies more than EPSILON away from `a` whatever the length of the segment.
    pub fn intersection_against_segment(&self, a: &[T; 3], b: &[T; 3]) -> Option<T> {
        let eps: T = EPSILON.as_();
        let dir = b.sub(a);
        let len = dir.norm();
        let e1 = self.p1.sub(&self.p0);
        let e2 = self.p2.sub(&self.p0);
        let pvec = dir.cross(&e2);
        let det = e1.dot(&pvec);
        // det = |dir| |e1 x e2| sin(angle between segment and plane)
        if det.abs() <= eps * len * e1.cross(&e2).norm() {
            return None;
        }
        let inv_det = T::one() / det;
        let tvec = a.sub(&self.p0);
        let u = tvec.dot(&pvec) * inv_det;
        if u < T::zero() || u > T::one() {
            return None;
        }
        let qvec = tvec.cross(&e1);
        let v = dir.dot(&qvec) * inv_det;
        if v < T::zero() || u + v > T::one() {
            return None;
        }
        let t = e2.dot(&qvec) * inv_det;
        if t * len <= eps || t > T::one() {
            return None;
        }
        Some(t)
    }
}

pub fn triangles_from_trimesh<T>(tri2vtx: &[usize], vtx2xyz: &[T]) -> Vec<Triangle<T>>
where
    T: num_traits::Float + 'static + Copy,
    f64: AsPrimitive<T>,
{
    (0..tri2vtx.len() / 3)
        .map(|i_tri| Triangle::from_trimesh(tri2vtx, vtx2xyz, i_tri))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> Triangle<f64> {
        Triangle::new([0., 0., 0.], [1., 0., 0.], [0., 1., 0.])
    }

    #[test]
    fn test_bounds_and_normal() {
        let tri = Triangle::new([1., -2., 0.5], [-1., 3., 0.], [0., 0., 2.]);
        assert_eq!(tri.min, [-1., -2., 0.]);
        assert_eq!(tri.max, [1., 3., 2.]);
        let n = unit_triangle().unit_normal().unwrap();
        assert_eq!(n, [0., 0., 1.]);
        assert!((unit_triangle().area() - 0.5).abs() < 1.0e-15);
        let degenerate = Triangle::new([0., 0., 0.], [1., 1., 1.], [2., 2., 2.]);
        assert!(degenerate.unit_normal().is_none());
    }

    #[test]
    fn test_from_trimesh() {
        let vtx2xyz = [0., 0., 0., 1., 0., 0., 0., 1., 0., 0., 0., 1.];
        let tri2vtx = [0, 1, 2, 0, 3, 1];
        let tris = triangles_from_trimesh(&tri2vtx, &vtx2xyz);
        assert_eq!(tris.len(), 2);
        assert_eq!(tris[0], unit_triangle());
        assert_eq!(tris[1].p1, [0., 0., 1.]);
        assert_eq!(tris[1].min, [0., 0., 0.]);
    }

    #[test]
    fn test_segment_hit() {
        let tri = unit_triangle();
        let t = tri
            .intersection_against_segment(&[0.2, 0.2, 1.], &[0.2, 0.2, -1.])
            .unwrap();
        assert!((t - 0.5).abs() < 1.0e-12);
        // hit from behind is reported as well
        let t = tri
            .intersection_against_segment(&[0.2, 0.2, -1.], &[0.2, 0.2, 1.])
            .unwrap();
        assert!((t - 0.5).abs() < 1.0e-12);
    }

    #[test]
    fn test_segment_ending_on_plane() {
        let tri = unit_triangle();
        let t = tri
            .intersection_against_segment(&[0.2, 0.2, 1.], &[0.2, 0.2, 0.])
            .unwrap();
        assert!((t - 1.).abs() < 1.0e-12);
    }

    #[test]
    fn test_ray_through_vertex() {
        let tri = Triangle::new([1., 0., 0.], [1., 1., 0.], [1., 1., 1.]);
        let origin = [0., 0., 0.];
        let t = tri.intersection_against_segment(&origin, &[2., 0., 0.]);
        assert_eq!(t, Some(0.5));
        // shortened before the plane
        assert!(tri.intersection_against_segment(&origin, &[0.9, 0., 0.]).is_none());
        // offset outside the triangle
        assert!(tri
            .intersection_against_segment(&[0., -0.5, 0.], &[2., -0.5, 0.])
            .is_none());
        // reversed
        assert!(tri.intersection_against_segment(&origin, &[-2., 0., 0.]).is_none());
    }

    #[test]
    fn test_close_hit_on_long_segment() {
        let tri = unit_triangle();
        let a = [0.2, 0.2, -0.005];
        let t = tri
            .intersection_against_segment(&a, &[0.2, 0.2, 1.0e4])
            .unwrap();
        assert!((t * (1.0e4 + 0.005) - 0.005).abs() < 1.0e-9);
        // closer than the tolerance, whatever the length
        assert!(tri
            .intersection_against_segment(&[0.2, 0.2, -1.0e-7], &[0.2, 0.2, 1.0e4])
            .is_none());
        // short segment against a tiny triangle
        let tiny: Triangle<f64> = Triangle::new([0., 0., 0.], [1.0e-3, 0., 0.], [0., 1.0e-3, 0.]);
        let t = tiny
            .intersection_against_segment(&[2.0e-4, 2.0e-4, -1.0e-3], &[2.0e-4, 2.0e-4, 1.0e-3])
            .unwrap();
        assert!((t - 0.5).abs() < 1.0e-9);
    }

    #[test]
    fn test_segment_misses() {
        let tri = unit_triangle();
        // too short
        assert!(tri
            .intersection_against_segment(&[0.2, 0.2, 1.], &[0.2, 0.2, 0.5])
            .is_none());
        // off to the side
        assert!(tri
            .intersection_against_segment(&[0.8, 0.8, 1.], &[0.8, 0.8, -1.])
            .is_none());
        assert!(tri
            .intersection_against_segment(&[-0.1, 0.2, 1.], &[-0.1, 0.2, -1.])
            .is_none());
        // pointing away
        assert!(tri
            .intersection_against_segment(&[0.2, 0.2, 1.], &[0.2, 0.2, 2.])
            .is_none());
        // parallel to the plane
        assert!(tri
            .intersection_against_segment(&[-1., 0.2, 0.], &[2., 0.2, 0.])
            .is_none());
        // starting on the surface
        assert!(tri
            .intersection_against_segment(&[0.2, 0.2, 0.], &[0.2, 0.2, -1.])
            .is_none());
    }
}
