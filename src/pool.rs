use crate::error::{SimError, SimResult};
use crate::types::*;
use std::collections::HashMap;

/// Owner of every player in the run.
///
/// Players are stored in roster order so that iteration is reproducible.
#[derive(Clone, Debug)]
pub struct PlayerPool {
    players: Vec<Player>,
    index: HashMap<PlayerId, usize>,
}

impl PlayerPool {
    pub fn new(roster: &[PlayerSpec], god_boost: f64) -> SimResult<Self> {
        let mut players = Vec::with_capacity(roster.len());
        let mut index = HashMap::with_capacity(roster.len());

        for spec in roster {
            if !spec.rating.is_finite() {
                return Err(SimError::InvalidRating {
                    id: spec.id,
                    rating: spec.rating,
                });
            }
            if index.insert(spec.id, players.len()).is_some() {
                return Err(SimError::DuplicatePlayer(spec.id));
            }
            players.push(Player::new(spec.id, spec.rating, spec.god, god_boost));
        }

        Ok(Self { players, index })
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.index.get(&id).map(|&i| &self.players[i])
    }

    pub(crate) fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        match self.index.get(&id) {
            Some(&i) => Some(&mut self.players[i]),
            None => None,
        }
    }

    pub fn rating(&self, id: PlayerId) -> SimResult<f64> {
        self.get(id)
            .map(Player::rating)
            .ok_or(SimError::UnknownPlayer(id))
    }

    pub fn is_god(&self, id: PlayerId) -> SimResult<bool> {
        self.get(id)
            .map(Player::is_god)
            .ok_or(SimError::UnknownPlayer(id))
    }

    /// Overwrite a player's rating. Only the rating updater calls this.
    pub fn set_rating(&mut self, id: PlayerId, rating: f64) -> SimResult<()> {
        let player = self.get_mut(id).ok_or(SimError::UnknownPlayer(id))?;
        log::trace!("rating of player {} {:.2} -> {:.2}", id, player.rating, rating);
        player.rating = rating;
        Ok(())
    }

    /// Players in roster order
    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.players.iter().map(Player::id)
    }

    pub fn count(&self, class: SkillClass) -> usize {
        self.players
            .iter()
            .filter(|p| p.skill_class() == class)
            .count()
    }

    /// Mean rating of a skill class, `None` if the class is empty
    pub fn class_average(&self, class: SkillClass) -> Option<f64> {
        let (sum, count) = self
            .players
            .iter()
            .filter(|p| p.skill_class() == class)
            .fold((0.0, 0usize), |(sum, count), p| (sum + p.rating, count + 1));

        if count > 0 {
            Some(sum / count as f64)
        } else {
            None
        }
    }

    pub fn total_rating(&self) -> f64 {
        self.players.iter().map(Player::rating).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<PlayerSpec> {
        vec![
            PlayerSpec::new(10, 1000.0, true),
            PlayerSpec::new(11, 1400.0, false),
            PlayerSpec::new(12, 1600.0, false),
        ]
    }

    #[test]
    fn test_lookup_and_set_rating() {
        let mut pool = PlayerPool::new(&roster(), 2.0).unwrap();
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.rating(11).unwrap(), 1400.0);
        assert!(pool.is_god(10).unwrap());
        assert_eq!(pool.get(10).unwrap().skill_multiplier(), 2.0);
        assert_eq!(pool.get(11).unwrap().skill_multiplier(), 1.0);

        pool.set_rating(11, 1420.5).unwrap();
        assert_eq!(pool.rating(11).unwrap(), 1420.5);
        // Flag untouched by the rating write
        assert!(!pool.is_god(11).unwrap());
    }

    #[test]
    fn test_unknown_player() {
        let mut pool = PlayerPool::new(&roster(), 2.0).unwrap();
        assert!(matches!(pool.rating(99), Err(SimError::UnknownPlayer(99))));
        assert!(matches!(pool.set_rating(99, 1.0), Err(SimError::UnknownPlayer(99))));
    }

    #[test]
    fn test_rejects_duplicates_and_bad_ratings() {
        let mut specs = roster();
        specs.push(PlayerSpec::new(11, 1200.0, false));
        assert!(matches!(
            PlayerPool::new(&specs, 2.0),
            Err(SimError::DuplicatePlayer(11))
        ));

        let specs = vec![PlayerSpec::new(1, f64::NAN, false)];
        assert!(matches!(
            PlayerPool::new(&specs, 2.0),
            Err(SimError::InvalidRating { id: 1, .. })
        ));
    }

    #[test]
    fn test_class_average() {
        let pool = PlayerPool::new(&roster(), 2.0).unwrap();
        assert_eq!(pool.class_average(SkillClass::God), Some(1000.0));
        assert_eq!(pool.class_average(SkillClass::Regular), Some(1500.0));
        assert_eq!(pool.count(SkillClass::Regular), 2);
        assert_eq!(pool.total_rating(), 4000.0);

        let no_gods = PlayerPool::new(&roster()[1..], 2.0).unwrap();
        assert_eq!(no_gods.class_average(SkillClass::God), None);
    }

    #[test]
    fn test_iteration_follows_roster_order() {
        let pool = PlayerPool::new(&roster(), 2.0).unwrap();
        let ids: Vec<_> = pool.ids().collect();
        assert_eq!(ids, vec![10, 11, 12]);
    }
}
