use crate::player::{Player, PlayerId};
use log::info;
use std::collections::HashMap;

/// The single source of truth for which players exist right now.
///
/// Every `Player` is owned here, keyed by id. Other components refer to players by id
/// only, so removing the entry is enough to make a player disappear everywhere.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: HashMap<PlayerId, Player>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `player`. Returns false and keeps the existing entry if the id is taken.
    pub fn insert(&mut self, player: Player) -> bool {
        if self.players.contains_key(&player.id) {
            return false;
        }
        info!("Added player {}", player.id);
        self.players.insert(player.id.clone(), player);
        true
    }

    pub fn remove(&mut self, id: &PlayerId) -> Option<Player> {
        let removed = self.players.remove(id);
        if removed.is_some() {
            info!("Removed player {}", id);
        }
        removed
    }

    pub fn get(&self, id: &PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn get_mut(&mut self, id: &PlayerId) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    pub fn contains(&self, id: &PlayerId) -> bool {
        self.players.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Ids in sorted order, for stable iteration.
    pub fn ids(&self) -> Vec<PlayerId> {
        let mut ids: Vec<PlayerId> = self.players.keys().cloned().collect();
        ids.sort();
        ids
    }
}
