//! SA configuration.

/// Annealing schedule and budgets.
///
/// # Examples
///
/// ```
/// use u_teambalance::sa::SaConfig;
///
/// let config = SaConfig::default()
///     .with_initial_temperature(50.0)
///     .with_alpha(0.9)
///     .with_stall_levels(20)
///     .with_seed(7);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct SaConfig {
    pub initial_temperature: f64,

    /// The search freezes once the temperature falls to this value.
    pub min_temperature: f64,

    /// Geometric cooling factor, in (0, 1).
    pub alpha: f64,

    /// Moves proposed at each temperature level.
    pub moves_per_temperature: usize,

    /// Stop after this many consecutive levels without a new best.
    /// 0 = never.
    pub stall_levels: usize,

    /// Total proposed moves. 0 = no limit.
    pub max_moves: usize,

    pub seed: Option<u64>,
}

impl Default for SaConfig {
    fn default() -> Self {
        Self {
            initial_temperature: 10.0,
            min_temperature: 0.01,
            alpha: 0.95,
            moves_per_temperature: 50,
            stall_levels: 0,
            max_moves: 0,
            seed: None,
        }
    }
}

impl SaConfig {
    pub fn with_initial_temperature(mut self, t: f64) -> Self {
        self.initial_temperature = t;
        self
    }

    pub fn with_min_temperature(mut self, t: f64) -> Self {
        self.min_temperature = t;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_moves_per_temperature(mut self, n: usize) -> Self {
        self.moves_per_temperature = n;
        self
    }

    pub fn with_stall_levels(mut self, n: usize) -> Self {
        self.stall_levels = n;
        self
    }

    pub fn with_max_moves(mut self, n: usize) -> Self {
        self.max_moves = n;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.min_temperature > 0.0 && self.min_temperature < self.initial_temperature) {
            return Err(format!(
                "temperatures must satisfy 0 < min < initial, got min {} initial {}",
                self.min_temperature, self.initial_temperature
            ));
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(format!("alpha must be in (0, 1), got {}", self.alpha));
        }
        if self.moves_per_temperature == 0 {
            return Err("moves_per_temperature must be positive".into());
        }
        Ok(())
    }

    /// Number of temperature levels before freezing, ignoring other stops.
    pub fn level_count(&self) -> usize {
        if self.validate().is_err() {
            return 0;
        }
        let ratio = self.min_temperature / self.initial_temperature;
        (ratio.ln() / self.alpha.ln()).ceil() as usize
    }
}
