//! Load balancing strategies for choosing among discovered instances

use crate::{DiscoveryError, ServiceInstance};
use rand::Rng;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Load balancing strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadBalancingStrategy {
    /// Uniform random choice over every returned instance
    #[default]
    Random,
    /// Cycle through instances in registry order
    RoundRobin,
}

impl FromStr for LoadBalancingStrategy {
    type Err = DiscoveryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "random" => Ok(LoadBalancingStrategy::Random),
            "round-robin" | "round_robin" | "roundrobin" => Ok(LoadBalancingStrategy::RoundRobin),
            other => Err(DiscoveryError::InvalidConfiguration(format!(
                "unknown LOAD_BALANCER '{}'",
                other
            ))),
        }
    }
}

/// Load balancer for selecting an instance based on a strategy
#[derive(Debug)]
pub struct LoadBalancer {
    strategy: LoadBalancingStrategy,
    round_robin_counter: Arc<AtomicUsize>,
}

impl LoadBalancer {
    /// Create a new load balancer with the specified strategy
    pub fn new(strategy: LoadBalancingStrategy) -> Self {
        Self {
            strategy,
            round_robin_counter: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Select an instance from the list based on the configured strategy
    pub fn select<'a>(&self, instances: &'a [ServiceInstance]) -> Option<&'a ServiceInstance> {
        if instances.is_empty() {
            return None;
        }

        match self.strategy {
            LoadBalancingStrategy::Random => {
                let index = rand::thread_rng().gen_range(0..instances.len());
                instances.get(index)
            }
            LoadBalancingStrategy::RoundRobin => {
                let current = self.round_robin_counter.fetch_add(1, Ordering::Relaxed);
                instances.get(current % instances.len())
            }
        }
    }
}

impl Default for LoadBalancer {
    fn default() -> Self {
        Self::new(LoadBalancingStrategy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn instances() -> Vec<ServiceInstance> {
        (1..=3)
            .map(|i| ServiceInstance::new(format!("orders-{}", i), "orders", format!("10.0.0.{}", i), 8080))
            .collect()
    }

    #[test]
    fn test_empty_returns_none() {
        let lb = LoadBalancer::default();
        assert!(lb.select(&[]).is_none());
    }

    #[test]
    fn test_random_is_roughly_uniform() {
        let lb = LoadBalancer::new(LoadBalancingStrategy::Random);
        let instances = instances();
        let mut counts: HashMap<String, usize> = HashMap::new();

        for _ in 0..3000 {
            let picked = lb.select(&instances).expect("non-empty");
            *counts.entry(picked.address.clone()).or_default() += 1;
        }

        assert_eq!(counts.len(), 3);
        for (address, count) in counts {
            assert!((800..=1200).contains(&count), "{} picked {} times", address, count);
        }
    }

    #[test]
    fn test_round_robin_cycles() {
        let lb = LoadBalancer::new(LoadBalancingStrategy::RoundRobin);
        let instances = instances();
        let picked: Vec<&str> = (0..4)
            .map(|_| lb.select(&instances).expect("non-empty").address.as_str())
            .collect();
        assert_eq!(picked, vec!["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.1"]);
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("random".parse::<LoadBalancingStrategy>().unwrap(), LoadBalancingStrategy::Random);
        assert_eq!("Round-Robin".parse::<LoadBalancingStrategy>().unwrap(), LoadBalancingStrategy::RoundRobin);
        assert!("sticky".parse::<LoadBalancingStrategy>().is_err());
    }
}
