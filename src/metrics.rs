use crate::pool::PlayerPool;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Most recent placement waits kept for the histogram
pub const WAIT_SAMPLE_LIMIT: usize = 10_000;

/// Trailing moving average over a fixed window.
///
/// Until the window fills, the average covers the samples seen so far.
#[derive(Clone, Debug)]
pub struct MovingAverage {
    window: usize,
    buffer: VecDeque<f64>,
}

impl MovingAverage {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            buffer: VecDeque::with_capacity(window),
        }
    }

    /// Add a sample and return the current average
    pub fn push(&mut self, value: f64) -> f64 {
        if self.buffer.len() == self.window {
            self.buffer.pop_front();
        }
        self.buffer.push_back(value);
        self.value()
    }

    pub fn value(&self) -> f64 {
        if self.buffer.is_empty() {
            return 0.0;
        }
        self.buffer.iter().sum::<f64>() / self.buffer.len() as f64
    }
}

/// Trailing moving average of a whole series, one output per input
pub fn smooth(series: &[f64], window: usize) -> Vec<f64> {
    let mut average = MovingAverage::new(window);
    series.iter().map(|&v| average.push(v)).collect()
}

/// Average rating of one skill class, one sample per round
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClassSeries {
    pub raw: Vec<f64>,
    pub smoothed: Vec<f64>,
}

/// Run statistics read by the reporting layer
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SimulationStats {
    /// Rounds completed
    pub rounds: u64,
    pub games_formed: usize,
    pub games_resolved: usize,
    /// Rounds in which no game could be formed
    pub rounds_without_new_game: u64,

    /// Per-class average rating over time
    pub regular: ClassSeries,
    pub god: ClassSeries,

    /// Games played and won, indexed by `SkillClass::index`
    pub class_games: [usize; 2],
    pub class_wins: [usize; 2],

    /// Wait counter of players at the moment they were placed in a game,
    /// the latest [`WAIT_SAMPLE_LIMIT`] only
    pub wait_samples: VecDeque<u64>,
    /// Sum and count over every placement of the run
    pub wait_total: u64,
    pub placements: u64,
    /// Per round: mean and max wait of the players placed that round
    /// (0 when nobody was placed)
    pub avg_wait: Vec<f64>,
    pub max_wait: Vec<u64>,
}

impl SimulationStats {
    pub fn series(&self, class: SkillClass) -> &ClassSeries {
        match class {
            SkillClass::Regular => &self.regular,
            SkillClass::God => &self.god,
        }
    }

    fn series_mut(&mut self, class: SkillClass) -> &mut ClassSeries {
        match class {
            SkillClass::Regular => &mut self.regular,
            SkillClass::God => &mut self.god,
        }
    }

    /// Latest smoothed average rating of a class
    pub fn latest_smoothed(&self, class: SkillClass) -> Option<f64> {
        self.series(class).smoothed.last().copied()
    }

    /// Fraction of games won by members of a class
    pub fn class_win_rate(&self, class: SkillClass) -> f64 {
        let games = self.class_games[class.index()];
        if games > 0 {
            self.class_wins[class.index()] as f64 / games as f64
        } else {
            0.0
        }
    }

    /// Mean wait at placement over the whole run
    pub fn avg_wait_overall(&self) -> f64 {
        if self.placements == 0 {
            return 0.0;
        }
        self.wait_total as f64 / self.placements as f64
    }
}

/// Collects per-round metrics into [`SimulationStats`]
#[derive(Clone, Debug)]
pub struct MetricsRecorder {
    smoothing: usize,
    averages: [MovingAverage; 2],
    placed_waits: Vec<u64>,
    /// Rating after each round, per player in roster order
    player_history: Option<Vec<Vec<f64>>>,
    pub stats: SimulationStats,
}

impl MetricsRecorder {
    pub fn new(smoothing: usize, pool_size: usize, track_player_history: bool) -> Self {
        Self {
            smoothing,
            averages: [MovingAverage::new(smoothing), MovingAverage::new(smoothing)],
            placed_waits: Vec::new(),
            player_history: track_player_history.then(|| vec![Vec::new(); pool_size]),
            stats: SimulationStats::default(),
        }
    }

    pub fn smoothing(&self) -> usize {
        self.smoothing
    }

    /// Note the wait counter of a player about to be placed into a game
    pub fn record_placement(&mut self, wait: u64) {
        self.placed_waits.push(wait);
        self.stats.wait_total += wait;
        self.stats.placements += 1;
        if self.stats.wait_samples.len() == WAIT_SAMPLE_LIMIT {
            self.stats.wait_samples.pop_front();
        }
        self.stats.wait_samples.push_back(wait);
    }

    pub fn record_game_formed(&mut self) {
        self.stats.games_formed += 1;
    }

    pub fn record_result(&mut self, class: SkillClass, won: bool) {
        self.stats.class_games[class.index()] += 1;
        if won {
            self.stats.class_wins[class.index()] += 1;
        }
    }

    pub fn record_game_resolved(&mut self) {
        self.stats.games_resolved += 1;
    }

    /// Close the round: sample class averages, wait latency and histories
    pub fn end_round(&mut self, pool: &PlayerPool, formed_any: bool) {
        self.stats.rounds += 1;
        if !formed_any {
            self.stats.rounds_without_new_game += 1;
        }

        for class in SkillClass::ALL {
            if let Some(avg) = pool.class_average(class) {
                let smoothed = self.averages[class.index()].push(avg);
                let series = self.stats.series_mut(class);
                series.raw.push(avg);
                series.smoothed.push(smoothed);
            }
        }

        if self.placed_waits.is_empty() {
            self.stats.avg_wait.push(0.0);
            self.stats.max_wait.push(0);
        } else {
            let total: u64 = self.placed_waits.iter().sum();
            self.stats
                .avg_wait
                .push(total as f64 / self.placed_waits.len() as f64);
            self.stats
                .max_wait
                .push(self.placed_waits.iter().copied().max().unwrap_or(0));
            self.placed_waits.clear();
        }

        if let Some(history) = self.player_history.as_mut() {
            for (series, player) in history.iter_mut().zip(pool.iter()) {
                series.push(player.rating());
            }
        }
    }

    /// Rating history of the player at roster position `index`
    pub fn player_history(&self, index: usize) -> Option<&[f64]> {
        self.player_history
            .as_ref()
            .and_then(|h| h.get(index))
            .map(Vec::as_slice)
    }
}
