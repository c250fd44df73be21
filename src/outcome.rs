//! Outcome model.
//!
//! A player's strength is `multiplier * 10^(rating / 400)`, with the
//! multiplier 1.0 for regular players and `god_boost` for gods. A team's
//! strength is the mean strength of its members, and its rating is
//! `400 * log10(strength)`. Team win probabilities are the normalised team
//! strengths `10^(R_t / 400) / sum_u 10^(R_u / 400)`, which for two teams is
//! exactly the Elo expected score `1 / (1 + 10^((R_b - R_a) / 400))`.

use crate::pool::PlayerPool;
use crate::types::*;
use rand::Rng;

/// Elo scale: a 400 point gap means 10:1 odds
pub const ELO_SCALE: f64 = 400.0;

/// Standard two-player Elo expected score of `a` against `b`
pub fn elo_expected(rating_a: f64, rating_b: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((rating_b - rating_a) / ELO_SCALE))
}

/// Rating of a team whose members have the given `(rating, multiplier)`
/// pairs. `-inf` when the team has no strength at all (empty, or every
/// member has a zero multiplier).
pub fn team_rating(members: &[(f64, f64)]) -> f64 {
    if members.is_empty() {
        return f64::NEG_INFINITY;
    }
    // Factor out the best member so the powers stay in range
    let top = members
        .iter()
        .map(|&(rating, _)| rating)
        .fold(f64::NEG_INFINITY, f64::max);
    let mean = members
        .iter()
        .map(|&(rating, multiplier)| multiplier * 10f64.powf((rating - top) / ELO_SCALE))
        .sum::<f64>()
        / members.len() as f64;

    if mean > 0.0 {
        top + ELO_SCALE * mean.log10()
    } else {
        f64::NEG_INFINITY
    }
}

/// Rating of each team. With `boosted == false` every multiplier is
/// treated as 1.0.
pub fn team_ratings(teams: &[Vec<PlayerId>], pool: &PlayerPool, boosted: bool) -> Vec<f64> {
    teams
        .iter()
        .map(|team| {
            let members: Vec<(f64, f64)> = team
                .iter()
                .filter_map(|&id| pool.get(id))
                .map(|p| {
                    let multiplier = if boosted { p.skill_multiplier() } else { 1.0 };
                    (p.rating(), multiplier)
                })
                .collect();
            team_rating(&members)
        })
        .collect()
}

/// Win probability per team from team ratings; always sums to one.
///
/// Teams whose rating is `-inf` (only gods, with `god_boost == 0`) cannot win
/// unless every team is in that state, in which case the game is a coin flip.
pub fn win_probabilities(ratings: &[f64]) -> Vec<f64> {
    if ratings.is_empty() {
        return Vec::new();
    }

    let max = ratings.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        let uniform = 1.0 / ratings.len() as f64;
        return vec![uniform; ratings.len()];
    }

    // Shift by the strongest team so the powers stay in range
    let strengths: Vec<f64> = ratings
        .iter()
        .map(|&r| 10f64.powf((r - max) / ELO_SCALE))
        .collect();
    let total: f64 = strengths.iter().sum();
    strengths.iter().map(|s| s / total).collect()
}

/// Samples game winners
pub struct OutcomeSimulator;

impl OutcomeSimulator {
    /// Boost-adjusted win probability of every team in the game
    pub fn probabilities(game: &Game, pool: &PlayerPool) -> Vec<f64> {
        win_probabilities(&team_ratings(&game.teams, pool, true))
    }

    /// Win probabilities ignoring god boosts
    pub fn rating_probabilities(game: &Game, pool: &PlayerPool) -> Vec<f64> {
        win_probabilities(&team_ratings(&game.teams, pool, false))
    }

    /// Draw a winning team index from the probabilities. Uses exactly one draw.
    pub fn sample_winner(probabilities: &[f64], rng: &mut impl Rng) -> usize {
        let roll: f64 = rng.gen();
        let mut cumulative = 0.0;
        for (team, &p) in probabilities.iter().enumerate() {
            cumulative += p;
            if roll < cumulative {
                return team;
            }
        }
        // Rounding left the roll above the last bucket: give it to the last team
        // that could win.
        probabilities
            .iter()
            .rposition(|&p| p > 0.0)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn pool(specs: &[(f64, bool)], god_boost: f64) -> PlayerPool {
        let roster: Vec<_> = specs
            .iter()
            .enumerate()
            .map(|(i, &(r, g))| PlayerSpec::new(i, r, g))
            .collect();
        PlayerPool::new(&roster, god_boost).unwrap()
    }

    #[test]
    fn test_two_teams_reduce_to_elo() {
        let pool = pool(&[(1500.0, false), (1500.0, false), (1400.0, false), (1400.0, false)], 1.0);
        let game = Game {
            id: 0,
            formed_round: 0,
            teams: vec![vec![0, 1], vec![2, 3]],
        };
        let probs = OutcomeSimulator::probabilities(&game, &pool);
        let expected = elo_expected(1500.0, 1400.0);
        assert!((probs[0] - expected).abs() < 1e-12);
        assert!((probs[0] + probs[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_team_strength_is_mean_member_strength() {
        // 10^(1/400 * 400) = 10: strengths 10 and 1 average to 5.5
        let rating = team_rating(&[(1400.0, 1.0), (1000.0, 1.0)]);
        assert!((rating - (1000.0 + ELO_SCALE * 5.5f64.log10())).abs() < 1e-9);
        assert_eq!(team_rating(&[(1500.0, 1.0)]), 1500.0);
        assert_eq!(team_rating(&[]), f64::NEG_INFINITY);
    }

    #[test]
    fn test_elo_expected_values() {
        assert!((elo_expected(1500.0, 1500.0) - 0.5).abs() < 1e-12);
        assert!((elo_expected(1900.0, 1500.0) - 10.0 / 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_god_boost_scales_strength() {
        // One god alone against an equal player: strength ratio is the boost
        let pool = pool(&[(1500.0, true), (1500.0, false)], 3.0);
        let game = Game {
            id: 0,
            formed_round: 0,
            teams: vec![vec![0], vec![1]],
        };
        let probs = OutcomeSimulator::probabilities(&game, &pool);
        assert!((probs[0] - 0.75).abs() < 1e-12);

        let plain = OutcomeSimulator::rating_probabilities(&game, &pool);
        assert!((plain[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_many_teams_sum_to_one_and_are_monotonic() {
        let probs = win_probabilities(&[1500.0, 1400.0, 1600.0, 1450.0]);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(probs[2] > probs[0]);
        assert!(probs[0] > probs[3]);
        assert!(probs[3] > probs[1]);
    }

    #[test]
    fn test_boost_scales_only_the_gods_share() {
        let pair = |boost| {
            let pool = pool(&[(1500.0, true), (1500.0, false), (1500.0, false), (1500.0, false)], boost);
            let game = Game {
                id: 0,
                formed_round: 0,
                teams: vec![vec![0, 1], vec![2, 3]],
            };
            OutcomeSimulator::probabilities(&game, &pool)
        };

        // Doubled god: team strength (2 + 1) / 2 against 1
        let probs = pair(2.0);
        assert!((probs[0] - 0.6).abs() < 1e-12);

        // Zero boost removes the god's share but the teammate still counts
        let probs = pair(0.0);
        assert!((probs[0] - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_boost_makes_team_unable_to_win() {
        assert_eq!(team_rating(&[(1500.0, 0.0), (1800.0, 0.0)]), f64::NEG_INFINITY);

        let probs = win_probabilities(&[f64::NEG_INFINITY, 1500.0]);
        assert_eq!(probs, vec![0.0, 1.0]);

        let probs = win_probabilities(&[f64::NEG_INFINITY, f64::NEG_INFINITY]);
        assert_eq!(probs, vec![0.5, 0.5]);
    }

    #[test]
    fn test_huge_ratings_stay_finite() {
        let probs = win_probabilities(&[1.0e6, 1.0e6 - 400.0]);
        assert!((probs[0] - 10.0 / 11.0).abs() < 1e-9);
        assert!((team_rating(&[(1.0e6, 1.0), (1.0e6, 1.0)]) - 1.0e6).abs() < 1e-6);
    }

    #[test]
    fn test_sample_winner_follows_probabilities() {
        let mut rng = StdRng::seed_from_u64(42);
        assert_eq!(OutcomeSimulator::sample_winner(&[0.0, 1.0], &mut rng), 1);
        assert_eq!(OutcomeSimulator::sample_winner(&[1.0, 0.0], &mut rng), 0);

        let mut wins = 0;
        for _ in 0..10_000 {
            if OutcomeSimulator::sample_winner(&[0.8, 0.2], &mut rng) == 0 {
                wins += 1;
            }
        }
        assert!(wins > 7_600 && wins < 8_400, "team 0 won {} times", wins);
    }
}
