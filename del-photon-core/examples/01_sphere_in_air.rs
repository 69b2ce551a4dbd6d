use del_photon_core::kdtree::KdTreeParams;
use del_photon_core::material::BulkMaterial;
use del_photon_core::photon::{Photon, TransportParams};
use del_photon_core::scene::{Region, Scene};
use del_photon_core::tally::{EnergyGrid, EnergyTally};
use rand::SeedableRng;

/// absorbed energy on a grid, escaped weight summed
struct Detector {
    grid: EnergyGrid<f64>,
    escaped: f64,
    num_escaped: usize,
}

impl EnergyTally<f64> for Detector {
    fn score(&mut self, position: &[f64; 3], delta: f64) {
        self.grid.score(position, delta);
    }

    fn escape(&mut self, _position: &[f64; 3], _direction: &[f64; 3], weight: f64) {
        self.escaped += weight;
        self.num_escaped += 1;
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let (tri2vtx, mut vtx2xyz) = del_photon_core::trimesh3_primitive::sphere_yup::<f64>(1.0, 64, 32);
    // the grid starts at z = 0, so the sphere is moved to sit on that plane
    del_photon_core::trimesh3_primitive::translate(&mut vtx2xyz, &[0., 0., 1.]);
    let tissue = BulkMaterial::henyey_greenstein(10., 1., 1.4, 0.9)?;
    let scene = Scene::new(
        vec![Region::new("sphere", tri2vtx, vtx2xyz, tissue)],
        BulkMaterial::air(),
        &KdTreeParams::default(),
    )?;
    println!(
        "{} triangles, kd-tree with {} leaves and depth {}",
        scene.kdtree().triangles().len(),
        scene.kdtree().num_leaves(),
        scene.kdtree().depth()
    );
    let params = TransportParams::default();
    let mut detector = Detector {
        grid: EnergyGrid::new([0.2, 0.2, 0.2], [11, 11, 10])?,
        escaped: 0.,
        num_escaped: 0,
    };
    let num_photons = 10_000;
    let mut rng = rand_chacha::ChaChaRng::seed_from_u64(0);
    let mut photon = Photon::new([0.01, 0.02, -1.], [0., 0., 1.], 632.8)?;
    let time = std::time::Instant::now();
    for _i_photon in 0..num_photons {
        photon.reset();
        photon.propagate_into_scene(&scene, &mut rng, &params, &mut detector)?;
    }
    println!("{} photons in {:.2?}", num_photons, time.elapsed());
    let absorbed = detector.grid.total();
    println!(
        "absorbed {:.4}, escaped {:.4} ({} photons), lost to roulette {:.4}",
        absorbed / num_photons as f64,
        detector.escaped / num_photons as f64,
        detector.num_escaped,
        1. - (absorbed + detector.escaped) / num_photons as f64
    );
    let ([nx, ny], slice) = detector.grid.plane_cut(1, 5)?;
    println!("absorbed energy in the plane y = 0 ({}x{}):", nx, ny);
    for row in slice.chunks(nx) {
        let line: Vec<String> = row.iter().map(|e| format!("{:7.3}", e)).collect();
        println!("  {}", line.join(""));
    }
    Ok(())
}
