use crate::error::{SimError, SimResult};
use crate::pool::PlayerPool;
use crate::types::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Rating change applied to one participant
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RatingChange {
    pub id: PlayerId,
    pub before: f64,
    /// `k * (actual - expected)`, before any nudge
    pub delta: f64,
    pub after: f64,
}

/// Elo-style rating updater with optional nudge
pub struct RatingUpdater {
    k_factor: f64,
    nudge: Option<f64>,
}

impl RatingUpdater {
    pub fn new(k_factor: f64, nudge: Option<f64>) -> Self {
        Self {
            k_factor,
            nudge: nudge.filter(|&n| n != 0.0),
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(config.k_factor, config.active_nudge())
    }

    /// `k * (actual - expected)` with actual 1.0 for a win, 0.0 for a loss
    pub fn delta(&self, expected: f64, won: bool) -> f64 {
        let actual = if won { 1.0 } else { 0.0 };
        self.k_factor * (actual - expected)
    }

    /// Update every participant of a resolved game.
    ///
    /// `expected[t]` is the expected score of every member of team `t`. When a
    /// nudge is configured each player then receives an independent uniform
    /// perturbation in `[-nudge, nudge]`, drawn in team order.
    pub fn apply(
        &self,
        game: &Game,
        winner: usize,
        expected: &[f64],
        pool: &mut PlayerPool,
        rng: &mut impl Rng,
    ) -> SimResult<Vec<RatingChange>> {
        if expected.len() != game.teams.len() {
            return Err(SimError::ExpectationMismatch {
                game: game.id,
                teams: game.teams.len(),
                probabilities: expected.len(),
            });
        }
        let mut changes = Vec::with_capacity(game.size());

        for (team_idx, (team, &team_expected)) in game.teams.iter().zip(expected).enumerate() {
            let delta = self.delta(team_expected, team_idx == winner);

            for &id in team {
                let before = pool.rating(id)?;
                let mut after = before + delta;
                if let Some(nudge) = self.nudge {
                    after += rng.gen_range(-nudge..=nudge);
                }
                pool.set_rating(id, after)?;
                changes.push(RatingChange {
                    id,
                    before,
                    delta,
                    after,
                });
            }
        }

        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::elo_expected;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn setup() -> (PlayerPool, Game) {
        let roster = vec![
            PlayerSpec::new(0, 1600.0, false),
            PlayerSpec::new(1, 1400.0, false),
        ];
        let pool = PlayerPool::new(&roster, 1.0).unwrap();
        let game = Game {
            id: 0,
            formed_round: 0,
            teams: vec![vec![0], vec![1]],
        };
        (pool, game)
    }

    #[test]
    fn test_win_loss_deltas_are_antisymmetric() {
        let (mut pool, game) = setup();
        let p0 = elo_expected(1600.0, 1400.0);
        let updater = RatingUpdater::new(32.0, None);
        let mut rng = StdRng::seed_from_u64(1);

        let changes = updater
            .apply(&game, 1, &[p0, 1.0 - p0], &mut pool, &mut rng)
            .unwrap();

        assert!((changes[0].delta + changes[1].delta).abs() < 1e-12);
        assert!((changes[1].delta - 32.0 * p0).abs() < 1e-12);
        assert!((pool.rating(0).unwrap() - (1600.0 - 32.0 * p0)).abs() < 1e-12);
        assert!((pool.rating(1).unwrap() - (1400.0 + 32.0 * p0)).abs() < 1e-12);
    }

    #[test]
    fn test_expected_scores_must_cover_every_team() {
        let (mut pool, game) = setup();
        let updater = RatingUpdater::new(32.0, None);
        let mut rng = StdRng::seed_from_u64(1);

        let result = updater.apply(&game, 0, &[0.5], &mut pool, &mut rng);
        assert!(matches!(
            result,
            Err(SimError::ExpectationMismatch {
                teams: 2,
                probabilities: 1,
                ..
            })
        ));
        // Nothing was written
        assert_eq!(pool.rating(0).unwrap(), 1600.0);
        assert_eq!(pool.rating(1).unwrap(), 1400.0);
    }

    #[test]
    fn test_equal_ratings_move_by_half_k() {
        let updater = RatingUpdater::new(20.0, None);
        assert_eq!(updater.delta(0.5, true), 10.0);
        assert_eq!(updater.delta(0.5, false), -10.0);
    }

    #[test]
    fn test_zero_k_factor_freezes_ratings() {
        let (mut pool, game) = setup();
        let updater = RatingUpdater::new(0.0, None);
        let mut rng = StdRng::seed_from_u64(1);
        updater.apply(&game, 0, &[0.7, 0.3], &mut pool, &mut rng).unwrap();
        assert_eq!(pool.rating(0).unwrap(), 1600.0);
        assert_eq!(pool.rating(1).unwrap(), 1400.0);
    }

    #[test]
    fn test_no_nudge_draws_nothing() {
        let (mut pool, game) = setup();
        let updater = RatingUpdater::new(16.0, Some(0.0));
        let mut rng = StdRng::seed_from_u64(9);
        let mut reference = StdRng::seed_from_u64(9);

        updater.apply(&game, 0, &[0.5, 0.5], &mut pool, &mut rng).unwrap();
        // The generator must be untouched
        assert_eq!(rng.gen::<u64>(), reference.gen::<u64>());
        assert_eq!(pool.rating(0).unwrap(), 1608.0);
    }

    #[test]
    fn test_nudge_stays_within_scale() {
        let (mut pool, game) = setup();
        let updater = RatingUpdater::new(16.0, Some(5.0));
        let mut rng = StdRng::seed_from_u64(3);

        let changes = updater.apply(&game, 0, &[0.5, 0.5], &mut pool, &mut rng).unwrap();
        for change in &changes {
            let noise = change.after - (change.before + change.delta);
            assert!(noise.abs() <= 5.0 + 1e-9);
        }
    }
}
