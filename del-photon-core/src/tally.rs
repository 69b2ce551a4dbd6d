//! Recording of the energy deposited by photons

use crate::error::{PhotonError, Result};
use num_traits::AsPrimitive;

/// Receives the energy events of a photon walk.
pub trait EnergyTally<T> {
    /// `delta` of the photon weight was absorbed at `position`
    fn score(&mut self, position: &[T; 3], delta: T);

    /// the photon left the scene with `weight` through a non-interacting medium
    fn escape(&mut self, _position: &[T; 3], _direction: &[T; 3], _weight: T) {}
}

/// discards everything
impl<T> EnergyTally<T> for () {
    fn score(&mut self, _position: &[T; 3], _delta: T) {}
}

/// Voxel grid of absorbed energy.
///
/// The grid is centered on the z axis: x and y voxels are centered on zero, and the
/// z voxels start at the plane `z = 0` and grow into positive z.
/// Deposits outside the grid are clamped into the boundary voxels.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyGrid<T> {
    voxel_size: [T; 3],
    shape: [usize; 3],
    energy: Vec<T>,
}

impl<T> Default for EnergyGrid<T>
where
    T: num_traits::Float + 'static + Copy,
    f64: AsPrimitive<T>,
{
    fn default() -> Self {
        EnergyGrid {
            voxel_size: [0.1.as_(), 0.1.as_(), 0.01.as_()],
            shape: [11, 11, 11],
            energy: vec![T::zero(); 11 * 11 * 11],
        }
    }
}

impl<T> EnergyGrid<T>
where
    T: num_traits::Float + 'static + Copy,
    f64: AsPrimitive<T>,
{
    pub fn new(voxel_size: [T; 3], shape: [usize; 3]) -> Result<Self> {
        if voxel_size.iter().any(|&l| !(l > T::zero()) || !l.is_finite()) {
            return Err(PhotonError::Configuration(
                "voxel size must be positive".to_string(),
            ));
        }
        if shape.iter().any(|&n| n == 0) {
            return Err(PhotonError::Configuration(
                "grid must have at least one voxel along each axis".to_string(),
            ));
        }
        Ok(EnergyGrid {
            voxel_size,
            shape,
            energy: vec![T::zero(); shape[0] * shape[1] * shape[2]],
        })
    }

    /// grid of the same layout with every voxel at zero
    pub fn cleared(&self) -> Self {
        EnergyGrid {
            voxel_size: self.voxel_size,
            shape: self.shape,
            energy: vec![T::zero(); self.energy.len()],
        }
    }

    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn voxel_size(&self) -> [T; 3] {
        self.voxel_size
    }

    /// x fastest, then y, then z
    pub fn energy(&self) -> &[T] {
        &self.energy
    }

    pub fn get(&self, i: usize, j: usize, k: usize) -> T {
        self.energy[self.flat_index([i, j, k])]
    }

    fn flat_index(&self, ijk: [usize; 3]) -> usize {
        ijk[0] + self.shape[0] * (ijk[1] + self.shape[1] * ijk[2])
    }

    /// voxel containing `position`, clamped to the grid
    pub fn voxel_of(&self, position: &[T; 3]) -> [usize; 3] {
        let half: T = 0.5.as_();
        let mut ijk = [0usize; 3];
        for i_dim in 0..3 {
            let n = self.shape[i_dim];
            let s = position[i_dim] / self.voxel_size[i_dim];
            let f = if i_dim < 2 {
                let offset: T = (((n - 1) / 2) as f64).as_();
                (s + half).floor() + offset
            } else {
                s.floor()
            };
            let max: T = ((n - 1) as f64).as_();
            // NaN ends up in the first voxel
            ijk[i_dim] = f.max(T::zero()).min(max).to_usize().unwrap_or(0);
        }
        ijk
    }

    pub fn total(&self) -> T {
        self.energy.iter().fold(T::zero(), |acc, &e| acc + e)
    }

    pub fn merge(&mut self, other: &EnergyGrid<T>) -> Result<()> {
        if self.shape != other.shape || self.voxel_size != other.voxel_size {
            return Err(PhotonError::Configuration(
                "cannot merge energy grids of different layout".to_string(),
            ));
        }
        for (e, &o) in self.energy.iter_mut().zip(other.energy.iter()) {
            *e = *e + o;
        }
        Ok(())
    }

    /// Sums the grid along `axis`, returning the shape of the remaining two
    /// axes (in increasing axis order) and the values with the first of them fastest.
    pub fn plane_integration(&self, axis: usize) -> ([usize; 2], Vec<T>) {
        let (a0, a1) = other_axes(axis);
        let shape2 = [self.shape[a0], self.shape[a1]];
        let mut out = vec![T::zero(); shape2[0] * shape2[1]];
        for k in 0..self.shape[2] {
            for j in 0..self.shape[1] {
                for i in 0..self.shape[0] {
                    let ijk = [i, j, k];
                    let o = ijk[a0] + shape2[0] * ijk[a1];
                    out[o] = out[o] + self.energy[self.flat_index(ijk)];
                }
            }
        }
        (shape2, out)
    }

    /// Slice of the grid at `index` along `axis`, laid out like [`EnergyGrid::plane_integration`].
    pub fn plane_cut(&self, axis: usize, index: usize) -> Result<([usize; 2], Vec<T>)> {
        if axis > 2 || index >= self.shape[axis] {
            return Err(PhotonError::Configuration(format!(
                "plane {} along axis {} is outside the grid",
                index, axis
            )));
        }
        let (a0, a1) = other_axes(axis);
        let shape2 = [self.shape[a0], self.shape[a1]];
        let mut out = Vec::with_capacity(shape2[0] * shape2[1]);
        for i1 in 0..shape2[1] {
            for i0 in 0..shape2[0] {
                let mut ijk = [0usize; 3];
                ijk[axis] = index;
                ijk[a0] = i0;
                ijk[a1] = i1;
                out.push(self.energy[self.flat_index(ijk)]);
            }
        }
        Ok((shape2, out))
    }
}

fn other_axes(axis: usize) -> (usize, usize) {
    match axis {
        0 => (1, 2),
        1 => (0, 2),
        _ => (0, 1),
    }
}

impl<T> EnergyTally<T> for EnergyGrid<T>
where
    T: num_traits::Float + 'static + Copy,
    f64: AsPrimitive<T>,
{
    fn score(&mut self, position: &[T; 3], delta: T) {
        let i = self.flat_index(self.voxel_of(position));
        self.energy[i] = self.energy[i] + delta;
    }
}
