use crate::pool::PlayerPool;
use crate::queue::MatchQueue;
use crate::types::*;

/// Anchor-and-nearest team former
pub struct Matchmaker {
    team_size: usize,
    team_number: usize,
}

impl Matchmaker {
    pub fn new(team_size: usize, team_number: usize) -> Self {
        Self {
            team_size,
            team_number,
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(config.team_size, config.team_number)
    }

    /// Players needed for one game
    pub fn game_size(&self) -> usize {
        self.team_size.saturating_mul(self.team_number)
    }

    /// Pick the players for the next game, in proximity order.
    ///
    /// The first entry is the anchor (longest-waiting player); the rest are the
    /// waiting players closest to the anchor's rating, nearest first. Equal
    /// distances keep queue order. Returns `None` when not enough players wait.
    pub fn select_candidates(&self, queue: &MatchQueue, pool: &PlayerPool) -> Option<Vec<PlayerId>> {
        let required = self.game_size();
        if required == 0 || queue.len() < required {
            return None;
        }

        // 1. Anchor: the player who waited the most
        let anchor = queue.longest_waiting(pool)?;
        let anchor_rating = pool.get(anchor)?.rating();

        // 2-3. Everyone else, by distance to the anchor's rating (stable sort)
        let mut by_distance: Vec<(PlayerId, f64)> = queue
            .as_slice()
            .iter()
            .copied()
            .filter(|&id| id != anchor)
            .filter_map(|id| {
                pool.get(id)
                    .map(|p| (id, (anchor_rating - p.rating()).abs()))
            })
            .collect();
        by_distance.sort_by(|a, b| a.1.total_cmp(&b.1));

        // 4. Anchor plus the nearest `required - 1`
        let mut candidates = Vec::with_capacity(required);
        candidates.push(anchor);
        candidates.extend(by_distance.iter().take(required - 1).map(|&(id, _)| id));

        if candidates.len() < required {
            return None;
        }
        Some(candidates)
    }

    /// Round-robin the proximity-ordered candidates across teams:
    /// candidate `i` joins team `i % team_number`.
    pub fn assign_teams(&self, candidates: &[PlayerId]) -> Vec<Vec<PlayerId>> {
        let mut teams: Vec<Vec<PlayerId>> = vec![Vec::with_capacity(self.team_size); self.team_number];
        for (i, &id) in candidates.iter().enumerate() {
            teams[i % self.team_number].push(id);
        }
        teams
    }

    /// Turn selected candidates into a game, moving them out of the queue
    pub fn place(
        &self,
        queue: &mut MatchQueue,
        pool: &mut PlayerPool,
        candidates: &[PlayerId],
        game_id: GameId,
        round: u64,
    ) -> Game {
        let teams = self.assign_teams(candidates);
        queue.remove_into_game(pool, candidates, game_id);

        log::debug!(
            "round {}: formed game {} anchored on player {} ({} teams of {})",
            round,
            game_id,
            candidates.first().copied().unwrap_or_default(),
            self.team_number,
            self.team_size
        );

        Game {
            id: game_id,
            formed_round: round,
            teams,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn setup(ratings: &[f64]) -> (PlayerPool, MatchQueue) {
        let roster: Vec<_> = ratings
            .iter()
            .enumerate()
            .map(|(i, &r)| PlayerSpec::new(i, r, false))
            .collect();
        let mut pool = PlayerPool::new(&roster, 1.0).unwrap();
        let mut queue = MatchQueue::new();
        for i in 0..ratings.len() {
            queue.enqueue(&mut pool, i);
        }
        (pool, queue)
    }

    fn form(matchmaker: &Matchmaker, queue: &mut MatchQueue, pool: &mut PlayerPool, game_id: GameId) -> Option<Game> {
        let candidates = matchmaker.select_candidates(queue, pool)?;
        Some(matchmaker.place(queue, pool, &candidates, game_id, 1))
    }

    #[test]
    fn test_candidates_are_anchor_then_nearest() {
        let (pool, queue) = setup(&[1500.0, 1000.0, 1510.0, 1450.0, 2000.0, 1490.0]);
        let matchmaker = Matchmaker::new(2, 2);

        let candidates = matchmaker.select_candidates(&queue, &pool).unwrap();
        // Anchor 0 (1500): then 1510 and 1490 tie at 10 (queue order), then 1450
        assert_eq!(candidates, vec![0, 2, 5, 3]);
    }

    #[test]
    fn test_anchor_is_longest_waiting() {
        let (mut pool, mut queue) = setup(&[1000.0, 1100.0, 1200.0, 1300.0, 1400.0]);
        queue.remove_into_game(&mut pool, &[3], 0);
        queue.advance_waits(&mut pool);
        queue.enqueue(&mut pool, 3);
        queue.remove_into_game(&mut pool, &[0, 1, 2], 1);
        queue.enqueue(&mut pool, 0);
        queue.enqueue(&mut pool, 1);
        queue.enqueue(&mut pool, 2);
        // Player 4 is the only one with a non-zero wait counter

        let matchmaker = Matchmaker::new(1, 2);
        let candidates = matchmaker.select_candidates(&queue, &pool).unwrap();
        assert_eq!(candidates, vec![4, 3]);
    }

    #[test]
    fn test_round_robin_assignment() {
        let matchmaker = Matchmaker::new(3, 2);
        let teams = matchmaker.assign_teams(&[10, 11, 12, 13, 14, 15]);
        assert_eq!(teams, vec![vec![10, 12, 14], vec![11, 13, 15]]);

        let matchmaker = Matchmaker::new(2, 3);
        let teams = matchmaker.assign_teams(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(teams, vec![vec![1, 4], vec![2, 5], vec![3, 6]]);
    }

    #[test]
    fn test_insufficient_queue_forms_nothing() {
        let (mut pool, mut queue) = setup(&[1000.0, 1100.0, 1200.0]);
        let matchmaker = Matchmaker::new(2, 2);
        assert!(matchmaker.select_candidates(&queue, &pool).is_none());
        assert!(form(&matchmaker, &mut queue, &mut pool, 0).is_none());
        assert_eq!(queue.len(), 3);

        let huge = Matchmaker::new(usize::MAX, 2);
        assert_eq!(huge.game_size(), usize::MAX);
        assert!(huge.select_candidates(&queue, &pool).is_none());
    }

    #[test]
    fn test_place_moves_players_out_of_queue() {
        let ratings: Vec<f64> = (0..9).map(|i| 1000.0 + 50.0 * i as f64).collect();
        let (mut pool, mut queue) = setup(&ratings);
        let matchmaker = Matchmaker::new(2, 2);

        let game = form(&matchmaker, &mut queue, &mut pool, 5).unwrap();
        assert_eq!(game.id, 5);
        assert_eq!(game.teams.len(), 2);
        assert!(game.teams.iter().all(|t| t.len() == 2));

        let ids: HashSet<_> = game.players().collect();
        assert_eq!(ids.len(), 4);
        assert_eq!(queue.len() + game.size(), pool.len());
        for id in ids {
            assert!(!queue.contains(id));
            assert_eq!(pool.get(id).unwrap().state(), PlayerState::InGame);
        }
    }

    #[test]
    fn test_balanced_team_ratings() {
        // Evenly spaced band: round robin alternates neighbours between teams,
        // so the averages differ by at most one rating step.
        let ratings: Vec<f64> = (0..10).map(|i| 1000.0 + 10.0 * i as f64).collect();
        let (mut pool, mut queue) = setup(&ratings);
        let matchmaker = Matchmaker::new(5, 2);
        let game = form(&matchmaker, &mut queue, &mut pool, 0).unwrap();

        let avg = |team: &Vec<PlayerId>| {
            team.iter().map(|&id| pool.rating(id).unwrap()).sum::<f64>() / team.len() as f64
        };
        let diff = (avg(&game.teams[0]) - avg(&game.teams[1])).abs();
        assert!(diff <= 10.0, "team averages differ by {}", diff);
    }
}
