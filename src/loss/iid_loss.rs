use rand::{distributions::Bernoulli, rngs::StdRng};
use rand_distr::Distribution;
use tracing::debug;

use crate::error::{Error, Result};

// 独立同分布丢包：每个包一次伯努利试验
#[derive(Debug)]
pub struct IidLoss {
    drop_dist: Bernoulli,
    rng: StdRng,
}

impl IidLoss {
    pub fn new(loss_rate: f64, rng: StdRng) -> Result<Self> {
        let drop_dist =
            Bernoulli::new(loss_rate).map_err(|_| Error::InvalidProbability(loss_rate))?;
        debug!(loss_rate, "iid loss configured");
        Ok(Self { drop_dist, rng })
    }

    pub fn drop_packet(&mut self) -> bool {
        self.drop_dist.sample(&mut self.rng)
    }
}
