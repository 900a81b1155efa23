//! Simulation - DST Test Harness
//!
//! TigerStyle: Simulation harness that provides deterministic environment.

use std::future::Future;
use std::sync::Arc;

use super::clock::SimClock;
use super::config::SimConfig;
use super::fault::{FaultConfig, FaultInjector, FaultInjectorBuilder, FaultType};
use super::rng::DeterministicRng;

/// Environment provided to simulation tests.
///
/// TigerStyle: All simulation resources in one place. Stores and teachers
/// built for the test share `faults` via `Arc` so a single injector governs
/// the whole run.
pub struct SimEnvironment {
    /// Simulation configuration
    pub config: SimConfig,
    /// Simulated clock
    pub clock: SimClock,
    /// Deterministic RNG
    pub rng: DeterministicRng,
    /// Fault injector (shared via Arc with stores and teachers)
    pub faults: Arc<FaultInjector>,
}

impl SimEnvironment {
    /// Advance simulated time in milliseconds.
    pub fn advance_time_ms(&self, ms: u64) -> u64 {
        self.clock.advance_ms(ms)
    }

    /// Advance simulated time in whole days.
    pub fn advance_time_days(&self, days: u32) -> u64 {
        self.clock.advance_days(days)
    }

    /// Get current simulated time in milliseconds.
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Sleep for the given milliseconds (async, waits for time to advance).
    pub async fn sleep_ms(&self, ms: u64) {
        self.clock.sleep_ms(ms).await;
    }
}

/// DST simulation harness.
///
/// TigerStyle:
/// - Single seed controls all randomness
/// - Faults are registered explicitly
/// - Environment is provided to test closure
pub struct Simulation {
    config: SimConfig,
    fault_configs: Vec<FaultConfig>,
}

impl Simulation {
    /// Create a new simulation with the given configuration.
    #[must_use]
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            fault_configs: Vec::new(),
        }
    }

    /// Register a fault to inject during simulation.
    ///
    /// TigerStyle: Fluent API for fault registration.
    #[must_use]
    pub fn with_fault(mut self, fault_config: FaultConfig) -> Self {
        self.fault_configs.push(fault_config);
        self
    }

    /// Add common durable-store faults.
    #[must_use]
    pub fn with_durable_faults(self, probability: f64) -> Self {
        self.with_fault(FaultConfig::new(FaultType::DurableWriteFail, probability))
            .with_fault(FaultConfig::new(FaultType::DurableReadFail, probability))
    }

    /// Add common teacher faults.
    #[must_use]
    pub fn with_teacher_faults(self, probability: f64) -> Self {
        self.with_fault(FaultConfig::new(FaultType::TeacherTimeout, probability))
            .with_fault(FaultConfig::new(FaultType::TeacherUnavailable, probability))
    }

    /// Run the simulation with the given test function.
    ///
    /// TigerStyle: Test function receives environment and returns Result.
    ///
    /// # Errors
    /// Returns any error from the test function.
    pub async fn run<F, Fut, E>(self, test_fn: F) -> Result<(), E>
    where
        F: FnOnce(SimEnvironment) -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        let env = self.build();
        test_fn(env).await
    }

    /// Build the simulation environment without running a test.
    ///
    /// Useful for custom test setups.
    #[must_use]
    pub fn build(self) -> SimEnvironment {
        let mut rng = DeterministicRng::new(self.config.seed());
        let clock = SimClock::new();

        let mut fault_builder = FaultInjectorBuilder::new(rng.fork());
        for fault_config in self.fault_configs {
            fault_builder = fault_builder.with_fault(fault_config);
        }
        // Arc so stores and teachers built for the test share the injector
        let faults = Arc::new(fault_builder.build());

        SimEnvironment {
            config: self.config,
            clock,
            rng,
            faults,
        }
    }
}

/// Create a simulation with optional seed.
///
/// TigerStyle: Factory function for common case.
#[must_use]
pub fn create_simulation(seed: Option<u64>) -> Simulation {
    let config = match seed {
        Some(s) => SimConfig::with_seed(s),
        None => SimConfig::from_env_or_random(),
    };
    Simulation::new(config)
}
