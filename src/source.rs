//! Light sources launching photons into a scene

use del_photon_core::photon::Photon;
use num_traits::AsPrimitive;

/// Every photon starts at the same point with the same direction.
#[derive(Debug, Clone)]
pub struct PencilBeam<T> {
    pub position: [T; 3],
    pub direction: [T; 3],
    /// in nanometers
    pub wavelength: T,
    /// record the `(position, weight)` trace of each photon
    pub keep_statistics: bool,
}

impl<T> PencilBeam<T>
where
    T: num_traits::Float + 'static + Copy + std::fmt::Debug,
    f64: AsPrimitive<T>,
{
    pub fn new(position: [T; 3], direction: [T; 3], wavelength: T) -> Self {
        PencilBeam {
            position,
            direction,
            wavelength,
            keep_statistics: false,
        }
    }

    pub fn with_statistics(mut self, keep_statistics: bool) -> Self {
        self.keep_statistics = keep_statistics;
        self
    }

    /// Photon to be reset and reused for every launch.
    pub fn photon(&self) -> del_photon_core::Result<Photon<T>> {
        Ok(Photon::new(self.position, self.direction, self.wavelength)?
            .with_statistics(self.keep_statistics))
    }
}

#[test]
fn test_pencil_beam() -> anyhow::Result<()> {
    let beam = PencilBeam::<f32>::new([0., 0., -1.], [0., 0., 3.], 632.8).with_statistics(true);
    let photon = beam.photon()?;
    assert_eq!(photon.direction, [0., 0., 1.]);
    assert_eq!(photon.weight, 1.);
    assert!(photon.keep_statistics);
    assert!(PencilBeam::<f32>::new([0.; 3], [0.; 3], 632.8).photon().is_err());
    Ok(())
}
