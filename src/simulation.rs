//! Parallel batches of independent photon walks

use crate::config::SimulationConfig;
use crate::source::PencilBeam;
use del_photon_core::photon::Photon;
use del_photon_core::scene::{Geometry, MaterialLookup};
use del_photon_core::tally::{EnergyGrid, EnergyTally};
use num_traits::AsPrimitive;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation, checked between photons.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
pub struct SimulationReport<T> {
    /// photons whose walk was started
    pub photons_launched: usize,
    pub photons_completed: usize,
    /// photons discarded after an error in their walk
    pub photons_failed: usize,
    pub cancelled: bool,
    pub absorbed_energy: T,
    pub escaped_weight: T,
    /// averages over the completed photons
    pub mean_path_length: T,
    pub mean_scattering_events: T,
    pub energy_grid: Option<EnergyGrid<T>>,
}

/// Energy events of the photon in flight, kept apart until its walk succeeded.
struct StagedTally<T> {
    deposits: Vec<([T; 3], T)>,
    escaped: T,
}

impl<T> StagedTally<T>
where
    T: num_traits::Float,
{
    fn new() -> Self {
        StagedTally {
            deposits: vec![],
            escaped: T::zero(),
        }
    }

    fn clear(&mut self) {
        self.deposits.clear();
        self.escaped = T::zero();
    }
}

impl<T> EnergyTally<T> for StagedTally<T>
where
    T: num_traits::Float,
{
    fn score(&mut self, position: &[T; 3], delta: T) {
        self.deposits.push((*position, delta));
    }

    fn escape(&mut self, _position: &[T; 3], _direction: &[T; 3], weight: T) {
        self.escaped = self.escaped + weight;
    }
}

/// accumulation over the photons of one chunk
struct ChunkTally<T> {
    completed: usize,
    failed: usize,
    absorbed: T,
    escaped: T,
    path_length: T,
    scattering_events: usize,
    grid: Option<EnergyGrid<T>>,
}

impl<T> ChunkTally<T>
where
    T: num_traits::Float + 'static + Copy,
    f64: AsPrimitive<T>,
{
    fn new(grid: Option<&EnergyGrid<T>>) -> Self {
        ChunkTally {
            completed: 0,
            failed: 0,
            absorbed: T::zero(),
            escaped: T::zero(),
            path_length: T::zero(),
            scattering_events: 0,
            grid: grid.map(|g| g.cleared()),
        }
    }

    fn commit(&mut self, photon: &Photon<T>, staged: &StagedTally<T>) {
        self.completed += 1;
        self.path_length = self.path_length + photon.distance_traveled;
        self.scattering_events += photon.num_scattering_events;
        self.escaped = self.escaped + staged.escaped;
        for (position, delta) in &staged.deposits {
            self.absorbed = self.absorbed + *delta;
            if let Some(grid) = self.grid.as_mut() {
                grid.score(position, *delta);
            }
        }
    }

    fn merge(&mut self, other: &ChunkTally<T>) -> anyhow::Result<()> {
        self.completed += other.completed;
        self.failed += other.failed;
        self.absorbed = self.absorbed + other.absorbed;
        self.escaped = self.escaped + other.escaped;
        self.path_length = self.path_length + other.path_length;
        self.scattering_events += other.scattering_events;
        if let (Some(grid), Some(other_grid)) = (self.grid.as_mut(), other.grid.as_ref()) {
            grid.merge(other_grid)?;
        }
        Ok(())
    }
}

pub struct Simulation;

impl Simulation {
    /// Launches `config.num_photons` photons from `source` into `scene`.
    ///
    /// The photons are split into chunks run in parallel, each with its own random stream,
    /// so the result only depends on the seed and the chunk size. A photon whose walk fails
    /// is logged and discarded without touching the energy accounting.
    pub fn run<T, SCENE>(
        scene: &SCENE,
        source: &PencilBeam<T>,
        config: &SimulationConfig<T>,
        cancel: &CancelToken,
    ) -> anyhow::Result<SimulationReport<T>>
    where
        T: num_traits::Float + 'static + Copy + std::fmt::Debug + Send + Sync,
        f64: AsPrimitive<T>,
        SCENE: Geometry<T> + MaterialLookup<T> + Sync,
    {
        config.validate()?;
        let template = source.photon()?;
        let num_chunks = config.num_chunks();
        log::info!(
            "simulating {} photons in {} chunks",
            config.num_photons,
            num_chunks
        );
        let time = std::time::Instant::now();
        let run_chunk = |i_chunk: usize| -> ChunkTally<T> {
            let mut rng = rand_chacha::ChaChaRng::seed_from_u64(config.seed.wrapping_add(i_chunk as u64));
            let mut photon = template.clone();
            let mut staged = StagedTally::new();
            let mut chunk = ChunkTally::new(config.energy_grid.as_ref());
            let i_begin = i_chunk * config.chunk_size;
            let i_end = (i_begin + config.chunk_size).min(config.num_photons);
            for i_photon in i_begin..i_end {
                if cancel.is_cancelled() {
                    break;
                }
                photon.reset();
                staged.clear();
                match photon.propagate_into_scene(scene, &mut rng, &config.transport, &mut staged) {
                    Ok(()) => chunk.commit(&photon, &staged),
                    Err(err) => {
                        log::warn!("photon {} discarded: {}", i_photon, err);
                        chunk.failed += 1;
                    }
                }
            }
            log::debug!(
                "chunk {}: {} completed, {} failed",
                i_chunk,
                chunk.completed,
                chunk.failed
            );
            chunk
        };
        let chunks: Vec<ChunkTally<T>> = {
            use rayon::prelude::*;
            match config.num_threads {
                Some(num_threads) => rayon::ThreadPoolBuilder::new()
                    .num_threads(num_threads)
                    .build()?
                    .install(|| (0..num_chunks).into_par_iter().map(&run_chunk).collect()),
                None => (0..num_chunks).into_par_iter().map(&run_chunk).collect(),
            }
        };
        // reduce in chunk order so the sums do not depend on the scheduling
        let mut total = ChunkTally::new(config.energy_grid.as_ref());
        for chunk in &chunks {
            total.merge(chunk)?;
        }
        let photons_launched = total.completed + total.failed;
        let (mean_path_length, mean_scattering_events) = if total.completed > 0 {
            let n: T = (total.completed as f64).as_();
            let events: T = (total.scattering_events as f64).as_();
            (total.path_length / n, events / n)
        } else {
            (T::zero(), T::zero())
        };
        let report = SimulationReport {
            photons_launched,
            photons_completed: total.completed,
            photons_failed: total.failed,
            cancelled: photons_launched < config.num_photons,
            absorbed_energy: total.absorbed,
            escaped_weight: total.escaped,
            mean_path_length,
            mean_scattering_events,
            energy_grid: total.grid,
        };
        log::info!(
            "{} photons completed, {} failed in {:.2?} (absorbed {:?}, escaped {:?})",
            report.photons_completed,
            report.photons_failed,
            time.elapsed(),
            report.absorbed_energy,
            report.escaped_weight
        );
        Ok(report)
    }
}

#[test]
fn test_cancel_token() {
    let token = CancelToken::new();
    let shared = token.clone();
    assert!(!shared.is_cancelled());
    token.cancel();
    assert!(shared.is_cancelled());
}
