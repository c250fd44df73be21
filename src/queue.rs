use crate::pool::PlayerPool;
use crate::types::*;

/// Players waiting to be matched, in enqueue order.
///
/// Wait counters live on the players themselves; the queue only owns the
/// ordering, which breaks ties between equal wait counters (earliest enqueued
/// first).
#[derive(Clone, Debug, Default)]
pub struct MatchQueue {
    waiting: Vec<PlayerId>,
}

impl MatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.waiting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.waiting.contains(&id)
    }

    /// Waiting ids, earliest enqueued first
    pub fn as_slice(&self) -> &[PlayerId] {
        &self.waiting
    }

    /// Append a player with a fresh wait counter
    pub fn enqueue(&mut self, pool: &mut PlayerPool, id: PlayerId) {
        if let Some(player) = pool.get_mut(id) {
            player.state = PlayerState::Waiting;
            player.current_game = None;
            player.wait = 0;
            self.waiting.push(id);
        }
    }

    /// Take the given players out of the queue and mark them as playing `game_id`
    pub fn remove_into_game(&mut self, pool: &mut PlayerPool, ids: &[PlayerId], game_id: GameId) {
        self.waiting.retain(|id| !ids.contains(id));
        for &id in ids {
            if let Some(player) = pool.get_mut(id) {
                player.state = PlayerState::InGame;
                player.current_game = Some(game_id);
                player.wait = 0;
            }
        }
    }

    /// One more round spent waiting for everyone still queued
    pub fn advance_waits(&self, pool: &mut PlayerPool) {
        for &id in &self.waiting {
            if let Some(player) = pool.get_mut(id) {
                player.wait += 1;
            }
        }
    }

    /// The player with the greatest wait counter; ties go to the earliest enqueued
    pub fn longest_waiting(&self, pool: &PlayerPool) -> Option<PlayerId> {
        let mut best: Option<(PlayerId, u64)> = None;
        for &id in &self.waiting {
            let wait = pool.get(id).map(Player::wait).unwrap_or(0);
            match best {
                Some((_, best_wait)) if wait <= best_wait => {}
                _ => best = Some((id, wait)),
            }
        }
        best.map(|(id, _)| id)
    }
}
