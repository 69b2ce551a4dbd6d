use del_photon_core::material::BulkMaterial;
use del_photon_core::photon::{Photon, TransportParams};
use del_photon_core::scene::Scene;
use del_photon_core::tally::EnergyGrid;
use rand::SeedableRng;

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let num_photons = 100_000;
    let material = BulkMaterial::<f64>::henyey_greenstein(30., 0.5, 1.4, 0.8)?;
    println!("{}", material);
    let scene = Scene::homogeneous(material);
    let params = TransportParams::default();
    let mut grid = EnergyGrid::<f64>::default();
    let mut rng = rand_chacha::ChaChaRng::seed_from_u64(0);
    let mut photon = Photon::new([0.; 3], [0., 0., 1.], 632.8)?;
    let mut num_steps = 0;
    let time = std::time::Instant::now();
    for _i_photon in 0..num_photons {
        photon.reset();
        photon.propagate_into_scene(&scene, &mut rng, &params, &mut grid)?;
        num_steps += photon.num_scattering_events;
    }
    let elapsed = time.elapsed();
    println!(
        "{} photons, {} scattering events in {:.2?} ({:.1} steps/ms)",
        num_photons,
        num_steps,
        elapsed,
        num_steps as f64 / elapsed.as_secs_f64() / 1000.
    );
    println!(
        "absorbed energy per photon: {:.4}",
        grid.total() / num_photons as f64
    );
    let [nx, ny, nz] = grid.shape();
    println!("absorbed energy per photon along z (z < 0 clamped into the first layer):");
    for k in 0..nz {
        let mut layer = 0.;
        for j in 0..ny {
            for i in 0..nx {
                layer += grid.get(i, j, k);
            }
        }
        println!("  z[{:2}] {:.4}", k, layer / num_photons as f64);
    }
    Ok(())
}
