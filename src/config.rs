//! Settings of a batch simulation

use del_photon_core::photon::TransportParams;
use del_photon_core::tally::EnergyGrid;
use num_traits::AsPrimitive;

#[derive(Debug, Clone)]
pub struct SimulationConfig<T> {
    pub num_photons: usize,
    /// chunk `i` draws from a stream seeded with `seed + i`
    pub seed: u64,
    /// photons simulated in sequence by one work item
    pub chunk_size: usize,
    /// size of a dedicated thread pool, `None` for the global rayon pool
    pub num_threads: Option<usize>,
    pub transport: TransportParams<T>,
    /// layout of the absorbed energy grid, if one is wanted
    pub energy_grid: Option<EnergyGrid<T>>,
}

impl<T> Default for SimulationConfig<T>
where
    T: num_traits::Float + 'static + Copy,
    f64: AsPrimitive<T>,
{
    fn default() -> Self {
        Self {
            num_photons: 10_000,
            seed: 0,
            chunk_size: 1_000,
            num_threads: None,
            transport: TransportParams::default(),
            energy_grid: None,
        }
    }
}

impl<T> SimulationConfig<T>
where
    T: num_traits::Float + 'static + Copy + std::fmt::Debug,
    f64: AsPrimitive<T>,
{
    pub fn with_num_photons(mut self, num_photons: usize) -> Self {
        self.num_photons = num_photons;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_num_threads(mut self, num_threads: Option<usize>) -> Self {
        self.num_threads = num_threads;
        self
    }

    pub fn with_transport(mut self, transport: TransportParams<T>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_energy_grid(mut self, energy_grid: Option<EnergyGrid<T>>) -> Self {
        self.energy_grid = energy_grid;
        self
    }

    pub fn num_chunks(&self) -> usize {
        if self.chunk_size == 0 {
            return 0;
        }
        self.num_photons.div_ceil(self.chunk_size)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.chunk_size == 0 {
            anyhow::bail!("chunk size must be at least 1");
        }
        if self.num_threads == Some(0) {
            anyhow::bail!("thread count must be at least 1");
        }
        self.transport.validate()?;
        Ok(())
    }
}

#[test]
fn test_config_builder() -> anyhow::Result<()> {
    let config = SimulationConfig::<f64>::default()
        .with_num_photons(2_500)
        .with_chunk_size(1_000)
        .with_seed(7);
    config.validate()?;
    assert_eq!(config.num_chunks(), 3);
    assert_eq!(config.seed, 7);
    assert!(config.clone().with_chunk_size(0).validate().is_err());
    assert!(config.clone().with_num_threads(Some(0)).validate().is_err());
    let transport = TransportParams::default().with_roulette(1.0e-4, 1.5);
    assert!(config.with_transport(transport).validate().is_err());
    Ok(())
}
