pub mod console;
pub mod error;
pub mod matchmaker;
pub mod metrics;
pub mod outcome;
pub mod pool;
pub mod queue;
pub mod rating;
pub mod simulation;
pub mod types;

pub use error::{ConfigError, SimError, SimResult};
pub use simulation::{generate_roster, ExperimentResult, RoundReport, Simulation};
pub use types::*;

use js_sys::Float64Array;
use wasm_bindgen::prelude::*;

/// Population used when the frontend does not supply a roster
const DEFAULT_POPULATION: usize = 51;
const DEFAULT_GODS: usize = 5;
const DEFAULT_RATING_RANGE: (f64, f64) = (1000.0, 2000.0);

/// Initialize panic hook and console logging
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    console::init();
}

fn js_error(context: &str, err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{}: {}", context, err))
}

fn parse_config(config_json: &str) -> Result<SimulationConfig, JsValue> {
    serde_json::from_str(config_json).map_err(|e| js_error("Config parse error", e))
}

fn parse_roster(roster_json: Option<String>, seed: u64) -> Result<Vec<PlayerSpec>, JsValue> {
    match roster_json {
        Some(json) => serde_json::from_str(&json).map_err(|e| js_error("Roster parse error", e)),
        None => generate_roster(DEFAULT_POPULATION, DEFAULT_GODS, DEFAULT_RATING_RANGE, seed)
            .map_err(|e| js_error("Roster error", e)),
    }
}

/// WASM-exposed simulation wrapper
#[wasm_bindgen]
pub struct SimulationEngine {
    sim: Simulation,
}

#[wasm_bindgen]
impl SimulationEngine {
    /// Create a new simulation with default config and a generated population
    #[wasm_bindgen(constructor)]
    pub fn new(seed: u64) -> Result<SimulationEngine, JsValue> {
        let roster = parse_roster(None, seed)?;
        let sim = Simulation::new(&roster, SimulationConfig::default(), seed)
            .map_err(|e| js_error("Simulation error", e))?;
        Ok(SimulationEngine { sim })
    }

    /// Create with custom config and, optionally, a roster of
    /// `{"id", "rating", "god"}` objects
    pub fn new_with_config(
        seed: u64,
        config_json: &str,
        roster_json: Option<String>,
    ) -> Result<SimulationEngine, JsValue> {
        let config = parse_config(config_json)?;
        let roster = parse_roster(roster_json, seed)?;
        let sim = Simulation::new(&roster, config, seed).map_err(|e| js_error("Simulation error", e))?;
        Ok(SimulationEngine { sim })
    }

    /// Create with custom config and a random population
    pub fn with_population(
        seed: u64,
        config_json: &str,
        count: usize,
        gods: usize,
        min_rating: f64,
        max_rating: f64,
    ) -> Result<SimulationEngine, JsValue> {
        let config = parse_config(config_json)?;
        let sim = Simulation::with_population(config, count, gods, (min_rating, max_rating), seed)
            .map_err(|e| js_error("Simulation error", e))?;
        Ok(SimulationEngine { sim })
    }

    /// Run a single round, returning what happened as JSON
    pub fn step(&mut self) -> Result<String, JsValue> {
        let report = self.sim.step().map_err(|e| js_error("Simulation error", e))?;
        serde_json::to_string(&report).map_err(|e| js_error("Serialization error", e))
    }

    /// Run multiple rounds
    pub fn run(&mut self, rounds: u64) -> Result<(), JsValue> {
        self.sim
            .run_rounds(rounds)
            .map_err(|e| js_error("Simulation error", e))
    }

    /// Run the configured `max_round` rounds
    pub fn run_to_end(&mut self) -> Result<(), JsValue> {
        self.sim.run().map_err(|e| js_error("Simulation error", e))
    }

    /// Get current simulation state as JSON
    pub fn get_state(&self) -> Result<String, JsValue> {
        self.sim
            .get_state_json()
            .map_err(|e| js_error("Serialization error", e))
    }

    pub fn get_round(&self) -> u64 {
        self.sim.current_round
    }

    pub fn get_total_players(&self) -> usize {
        self.sim.pool().len()
    }

    /// Waiting vs in-game counts
    pub fn get_player_counts(&self) -> String {
        serde_json::json!({
            "waiting": self.sim.queue().len(),
            "in_game": self.sim.players_in_games(),
            "active_games": self.sim.active_games().count(),
        })
        .to_string()
    }

    /// Get statistics JSON
    pub fn get_stats(&self) -> String {
        serde_json::to_string(self.sim.stats()).unwrap_or_default()
    }

    /// Get config as JSON
    pub fn get_config(&self) -> String {
        serde_json::to_string(self.sim.config()).unwrap_or_default()
    }

    /// Get default config as JSON
    pub fn get_default_config() -> String {
        serde_json::to_string(&SimulationConfig::default()).unwrap_or_default()
    }

    /// Raw per-round average rating of a class ("regular" or "god")
    pub fn class_series(&self, class: &str) -> Result<Float64Array, JsValue> {
        let class = parse_class(class)?;
        Ok(Float64Array::from(self.sim.stats().series(class).raw.as_slice()))
    }

    /// Smoothed per-round average rating of a class
    pub fn smoothed_class_series(&self, class: &str) -> Result<Float64Array, JsValue> {
        let class = parse_class(class)?;
        Ok(Float64Array::from(self.sim.stats().series(class).smoothed.as_slice()))
    }

    /// Rating after every round for one player (empty when history is off)
    pub fn player_history(&self, id: usize, smoothed: bool) -> Float64Array {
        if smoothed {
            let history = self.sim.smoothed_player_history(id).unwrap_or_default();
            Float64Array::from(history.as_slice())
        } else {
            Float64Array::from(self.sim.player_history(id).unwrap_or(&[]))
        }
    }

    /// Per-player summary
    pub fn get_players(&self) -> String {
        let players: Vec<_> = self
            .sim
            .pool()
            .iter()
            .map(|p| {
                serde_json::json!({
                    "id": p.id(),
                    "rating": p.rating(),
                    "class": p.skill_class().label(),
                    "state": p.state(),
                    "wait": p.wait(),
                    "wins": p.wins(),
                    "losses": p.losses(),
                    "win_ratio": p.win_ratio(),
                })
            })
            .collect();
        serde_json::to_string(&players).unwrap_or_default()
    }

    /// Games in progress, oldest first
    pub fn get_active_games(&self) -> String {
        let games: Vec<_> = self.sim.active_games().collect();
        serde_json::to_string(&games).unwrap_or_default()
    }

    /// Most recently resolved games
    pub fn get_recent_games(&self) -> String {
        let games: Vec<_> = self.sim.recent_games().collect();
        serde_json::to_string(&games).unwrap_or_default()
    }

    /// Histogram of the wait counter at placement
    pub fn get_wait_histogram(&self, num_bins: usize) -> String {
        let samples = &self.sim.stats().wait_samples;
        if samples.is_empty() || num_bins == 0 {
            return "[]".to_string();
        }

        let max_wait = samples.iter().copied().max().unwrap_or(0) as f64;
        let bin_width = (max_wait / num_bins as f64).max(1.0);

        let mut bins = vec![0usize; num_bins];
        for &sample in samples {
            let bin = ((sample as f64 / bin_width) as usize).min(num_bins - 1);
            bins[bin] += 1;
        }

        let histogram: Vec<_> = bins
            .iter()
            .enumerate()
            .map(|(i, &count)| {
                serde_json::json!({
                    "bin_start": i as f64 * bin_width,
                    "bin_end": (i + 1) as f64 * bin_width,
                    "count": count,
                })
            })
            .collect();

        serde_json::to_string(&histogram).unwrap_or_default()
    }
}

fn parse_class(class: &str) -> Result<SkillClass, JsValue> {
    SkillClass::ALL
        .into_iter()
        .find(|c| c.label() == class)
        .ok_or_else(|| JsValue::from_str(&format!("Unknown class: {}", class)))
}

/// Run a parameter sweep experiment
#[wasm_bindgen]
pub fn run_experiment(
    base_config_json: &str,
    roster_json: Option<String>,
    parameter: &str,
    values_json: &str,
    rounds_per_run: u64,
    seed: u64,
) -> Result<String, JsValue> {
    let mut base_config = parse_config(base_config_json)?;
    base_config.max_round = rounds_per_run;
    let roster = parse_roster(roster_json, seed)?;
    let values: Vec<f64> =
        serde_json::from_str(values_json).map_err(|e| js_error("Values parse error", e))?;

    let results = simulation::run_experiment(&base_config, &roster, parameter, &values, seed)
        .map_err(|e| js_error("Experiment error", e))?;

    serde_json::to_string(&results).map_err(|e| js_error("Serialization error", e))
}

/// Compare two configs on the same roster and seed
#[wasm_bindgen]
pub fn compare_configs(
    config_a_json: &str,
    config_b_json: &str,
    roster_json: Option<String>,
    rounds: u64,
    seed: u64,
) -> Result<String, JsValue> {
    let mut config_a = parse_config(config_a_json)?;
    let mut config_b = parse_config(config_b_json)?;
    config_a.max_round = rounds;
    config_b.max_round = rounds;
    let roster = parse_roster(roster_json, seed)?;

    let (a, b) = simulation::compare_configs(config_a, config_b, &roster, seed)
        .map_err(|e| js_error("Experiment error", e))?;

    let comparison = serde_json::json!({
        "config_a": a,
        "config_b": b,
    });

    serde_json::to_string(&comparison).map_err(|e| js_error("Serialization error", e))
}
