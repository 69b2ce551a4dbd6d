//! Closed triangle meshes of simple shapes, stored as flat `tri2vtx` / `vtx2xyz` arrays
//! with outward-facing counter-clockwise triangles.

use num_traits::AsPrimitive;

/// UV sphere centered at the origin with its poles on the y axis
///
/// * `n_longitude` - number of vertices around each ring (>= 3)
/// * `n_latitude` - number of bands between the poles (>= 2)
pub fn sphere_yup<Real>(radius: Real, n_longitude: usize, n_latitude: usize) -> (Vec<usize>, Vec<Real>)
where
    Real: num_traits::Float + 'static,
    f64: AsPrimitive<Real>,
{
    let nr = n_longitude.max(3);
    let nl = n_latitude.max(2);
    let num_vtx = 2 + (nl - 1) * nr;
    let mut vtx2xyz = Vec::<Real>::with_capacity(num_vtx * 3);
    vtx2xyz.extend_from_slice(&[Real::zero(), radius, Real::zero()]);
    for il in 1..nl {
        let theta = std::f64::consts::PI * il as f64 / nl as f64;
        let y: Real = radius * theta.cos().as_();
        let rho: Real = radius * theta.sin().as_();
        for ir in 0..nr {
            let phi = 2. * std::f64::consts::PI * ir as f64 / nr as f64;
            vtx2xyz.push(rho * phi.cos().as_());
            vtx2xyz.push(y);
            vtx2xyz.push(rho * phi.sin().as_());
        }
    }
    vtx2xyz.extend_from_slice(&[Real::zero(), -radius, Real::zero()]);
    //
    let ring = |il: usize, ir: usize| 1 + (il - 1) * nr + ir % nr;
    let i_bottom = num_vtx - 1;
    let mut tri2vtx = Vec::<usize>::with_capacity(nr * (nl - 1) * 6);
    for ir in 0..nr {
        tri2vtx.extend_from_slice(&[0, ring(1, ir + 1), ring(1, ir)]);
    }
    for il in 1..nl - 1 {
        for ir in 0..nr {
            let (a0, a1) = (ring(il, ir), ring(il, ir + 1));
            let (b0, b1) = (ring(il + 1, ir), ring(il + 1, ir + 1));
            tri2vtx.extend_from_slice(&[a0, a1, b1]);
            tri2vtx.extend_from_slice(&[a0, b1, b0]);
        }
    }
    for ir in 0..nr {
        tri2vtx.extend_from_slice(&[i_bottom, ring(nl - 1, ir), ring(nl - 1, ir + 1)]);
    }
    (tri2vtx, vtx2xyz)
}

/// axis-aligned box spanning `min` to `max`
pub fn cuboid<Real>(min: &[Real; 3], max: &[Real; 3]) -> (Vec<usize>, Vec<Real>)
where
    Real: num_traits::Float,
{
    let mut vtx2xyz = Vec::<Real>::with_capacity(24);
    for i_vtx in 0..8 {
        vtx2xyz.push(if i_vtx & 1 == 0 { min[0] } else { max[0] });
        vtx2xyz.push(if i_vtx & 2 == 0 { min[1] } else { max[1] });
        vtx2xyz.push(if i_vtx & 4 == 0 { min[2] } else { max[2] });
    }
    let tri2vtx = vec![
        0, 4, 6, 0, 6, 2, // -x
        1, 3, 7, 1, 7, 5, // +x
        0, 1, 5, 0, 5, 4, // -y
        2, 6, 7, 2, 7, 3, // +y
        0, 2, 3, 0, 3, 1, // -z
        4, 5, 7, 4, 7, 6, // +z
    ];
    (tri2vtx, vtx2xyz)
}

pub fn translate<Real>(vtx2xyz: &mut [Real], t: &[Real; 3])
where
    Real: num_traits::Float,
{
    for xyz in vtx2xyz.chunks_mut(3) {
        xyz[0] = xyz[0] + t[0];
        xyz[1] = xyz[1] + t[1];
        xyz[2] = xyz[2] + t[2];
    }
}
