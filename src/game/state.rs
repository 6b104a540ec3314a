//! World state: entity arena, owner contexts and type-specific registries.
//!
//! Entities live in a map keyed by stable integer handles. Registries are
//! ordered handle lists that may briefly hold handles of removed entities;
//! they are compacted at the end of each tick, so removal during a scan is
//! O(1) and never invalidates the scan.

use hashbrown::HashMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

use crate::config::WorldConfig;
use crate::error::{ConfigError, SimError, SimResult};
use crate::game::entity::{CellType, Entity, EntityKind, ViewBox, Visibility};
use crate::game::hooks::GameMode;
use crate::game::player::{CellList, PlayerContext};
use crate::util::vec2::Vec2;

/// Unique player identifier
pub type PlayerId = Uuid;

/// Stable entity handle, never reused within a world
pub type EntityId = u64;

pub struct World {
    pub config: WorldConfig,
    entities: HashMap<EntityId, Entity>,
    players: HashMap<PlayerId, PlayerContext>,
    /// Join order, for deterministic iteration
    player_order: Vec<PlayerId>,
    nodes_player: Vec<EntityId>,
    nodes_ejected: Vec<EntityId>,
    nodes_virus: Vec<EntityId>,
    nodes_food: Vec<EntityId>,
    /// Entities with a move-engine impulse in flight
    nodes_moving: Vec<EntityId>,
    registries_dirty: bool,
    tick: u64,
    next_entity_id: EntityId,
    rng: StdRng,
}

impl World {
    /// Build a world from a config that has passed [`WorldConfig::validate`]
    pub fn try_new(config: WorldConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Build a world without validating `config`
    pub fn new(config: WorldConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            entities: HashMap::with_capacity(1024),
            players: HashMap::new(),
            player_order: Vec::new(),
            nodes_player: Vec::new(),
            nodes_ejected: Vec::new(),
            nodes_virus: Vec::new(),
            nodes_food: Vec::new(),
            nodes_moving: Vec::new(),
            registries_dirty: false,
            tick: 0,
            next_entity_id: 1,
            rng,
        }
    }

    // ------------------------------------------------------------------
    // Ticks
    // ------------------------------------------------------------------

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Close the current tick: compact registries and advance the counter
    pub fn end_tick(&mut self) {
        self.compact_registries();
        self.tick += 1;
    }

    // ------------------------------------------------------------------
    // Entity access
    // ------------------------------------------------------------------

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    fn alloc_entity_id(&mut self) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        id
    }

    /// Uniform angle in [0, 2PI)
    pub fn random_angle(&mut self) -> f64 {
        self.rng.gen_range(0.0..std::f64::consts::TAU)
    }

    pub fn random_position(&mut self) -> Vec2 {
        let b = self.config.border;
        Vec2::new(self.rng.gen_range(b.left..b.right), self.rng.gen_range(b.top..b.bottom))
    }

    // ------------------------------------------------------------------
    // Players
    // ------------------------------------------------------------------

    pub fn add_player(&mut self, name: impl Into<String>) -> PlayerId {
        let id = Uuid::new_v4();
        self.players.insert(id, PlayerContext::new(id, name.into()));
        self.player_order.push(id);
        id
    }

    pub fn player(&self, id: PlayerId) -> Option<&PlayerContext> {
        self.players.get(&id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut PlayerContext> {
        self.players.get_mut(&id)
    }

    pub fn player_ids(&self) -> &[PlayerId] {
        &self.player_order
    }

    /// Remove a player and every cell it still owns
    pub fn remove_player(&mut self, id: PlayerId, mode: &mut dyn GameMode) -> SimResult<()> {
        let cells = self.player_cell_ids(id)?;
        for cell in cells {
            self.remove(cell, mode);
        }
        self.players.remove(&id);
        self.player_order.retain(|&p| p != id);
        Ok(())
    }

    /// Snapshot of a player's cell handles, safe to iterate while mutating the world
    pub fn player_cell_ids(&self, id: PlayerId) -> SimResult<CellList> {
        self.players
            .get(&id)
            .map(|p| p.cells.clone())
            .ok_or(SimError::UnknownPlayer(id))
    }

    /// Live cells of a player, skipping handles whose entity is gone
    pub fn player_cells(&self, id: PlayerId) -> impl Iterator<Item = &Entity> + '_ {
        self.players
            .get(&id)
            .into_iter()
            .flat_map(|p| p.cells.iter())
            .filter_map(|cell| self.entities.get(cell))
    }

    pub fn player_total_mass(&self, id: PlayerId) -> f64 {
        self.player_cells(id).map(Entity::mass).sum()
    }

    /// Recompute aggregate stats for players whose cells changed mass
    pub fn refresh_player_stats(&mut self) {
        for i in 0..self.player_order.len() {
            let id = self.player_order[i];
            let dirty = self.players.get(&id).is_some_and(PlayerContext::is_mass_dirty);
            if dirty {
                let total = self.player_total_mass(id);
                if let Some(player) = self.players.get_mut(&id) {
                    player.update_mass_stats(total);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Mass
    // ------------------------------------------------------------------

    /// Set an entity's mass and notify its owner
    pub fn set_mass(&mut self, id: EntityId, mass: f64) -> SimResult<()> {
        let entity = self.entities.get_mut(&id).ok_or(SimError::UnknownEntity(id))?;
        entity.set_mass(mass)?;
        if let Some(owner) = entity.owner {
            if let Some(player) = self.players.get_mut(&owner) {
                player.mass_changed();
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Create an entity and register it through [`World::on_add`]
    pub fn spawn(
        &mut self,
        kind: EntityKind,
        owner: Option<PlayerId>,
        position: Vec2,
        mass: f64,
        mode: &mut dyn GameMode,
    ) -> SimResult<EntityId> {
        if let Some(owner) = owner {
            if !self.players.contains_key(&owner) {
                return Err(SimError::UnknownPlayer(owner));
            }
        }
        let id = self.alloc_entity_id();
        let entity = Entity::new(id, kind, owner, position, mass, self.tick)?;
        self.entities.insert(id, entity);
        self.on_add(id, mode);
        Ok(id)
    }

    /// Factory for a sibling cell split off `source`.
    ///
    /// The new cell starts at the source position with an impulse along
    /// `angle`, is born this tick (remerge `Locked`), and both cells get
    /// collision grace ticks.
    pub fn create_player_cell(
        &mut self,
        owner: PlayerId,
        source: EntityId,
        angle: f64,
        mass: f64,
        mode: &mut dyn GameMode,
    ) -> SimResult<EntityId> {
        let split = self.config.split;
        let (position, color, launch_speed) = {
            let source = self.entities.get(&source).ok_or(SimError::UnknownEntity(source))?;
            (
                source.position,
                source.color,
                source.speed(&self.config) * split.speed_multiplier,
            )
        };

        let id = self.spawn(EntityKind::player(), Some(owner), position, mass, mode)?;
        if let Some(cell) = self.entities.get_mut(&id) {
            cell.color = color;
            cell.motion.angle = angle;
            cell.set_move_engine(launch_speed, split.move_ticks, Some(split.decay));
            cell.collision_grace_ticks = split.collision_grace_ticks;
        }
        if let Some(source) = self.entities.get_mut(&source) {
            source.collision_grace_ticks = split.collision_grace_ticks;
        }
        self.set_as_moving(id);
        Ok(id)
    }

    /// Register a freshly inserted entity in type-specific lists and notify the mode
    pub fn on_add(&mut self, id: EntityId, mode: &mut dyn GameMode) {
        let Some(entity) = self.entities.get(&id) else {
            return;
        };
        match entity.cell_type() {
            CellType::Player => {
                self.nodes_player.push(id);
                if let Some(owner) = entity.owner {
                    match self.players.get_mut(&owner) {
                        Some(player) if !player.cells.contains(&id) => {
                            player.cells.push(id);
                            player.mass_changed();
                        }
                        Some(_) => {}
                        None => tracing::warn!("Cell {} added for unknown owner {}", id, owner),
                    }
                }
            }
            CellType::EjectedMass => self.nodes_ejected.push(id),
            CellType::Virus => self.nodes_virus.push(id),
            CellType::Food => self.nodes_food.push(id),
        }
        mode.on_cell_add(entity);
    }

    /// Remove an entity: detach it from its owner and the registries, then
    /// notify the mode. Effective immediately; returns `None` if already gone.
    pub fn remove(&mut self, id: EntityId, mode: &mut dyn GameMode) -> Option<Entity> {
        let entity = self.entities.remove(&id)?;
        if let Some(owner) = entity.owner {
            if let Some(player) = self.players.get_mut(&owner) {
                player.detach(id);
                player.mass_changed();
            }
        }
        self.registries_dirty = true;
        tracing::debug!(
            "Removed {:?} {} (killer: {:?})",
            entity.cell_type(),
            id,
            entity.killer
        );
        mode.on_cell_remove(&entity);
        Some(entity)
    }

    fn compact_registries(&mut self) {
        if !self.registries_dirty {
            return;
        }
        let entities = &self.entities;
        for list in [
            &mut self.nodes_player,
            &mut self.nodes_ejected,
            &mut self.nodes_virus,
            &mut self.nodes_food,
            &mut self.nodes_moving,
        ] {
            list.retain(|id| entities.contains_key(id));
        }
        self.registries_dirty = false;
    }

    // ------------------------------------------------------------------
    // Registries
    // ------------------------------------------------------------------

    /// Player-cell handles in insertion order (may include removed handles)
    pub fn player_nodes(&self) -> &[EntityId] {
        &self.nodes_player
    }

    pub fn ejected_nodes(&self) -> &[EntityId] {
        &self.nodes_ejected
    }

    pub fn virus_nodes(&self) -> &[EntityId] {
        &self.nodes_virus
    }

    pub fn food_nodes(&self) -> &[EntityId] {
        &self.nodes_food
    }

    pub fn moving_nodes(&self) -> &[EntityId] {
        &self.nodes_moving
    }

    pub fn set_as_moving(&mut self, id: EntityId) {
        if !self.nodes_moving.contains(&id) {
            self.nodes_moving.push(id);
        }
    }

    pub fn clear_moving(&mut self, id: EntityId) {
        self.nodes_moving.retain(|&m| m != id);
    }

    // ------------------------------------------------------------------
    // Visibility
    // ------------------------------------------------------------------

    /// Classify `target` against `viewer`'s viewport and own cells
    pub fn classify_visibility(
        &self,
        target: EntityId,
        view: &ViewBox,
        viewer: PlayerId,
    ) -> SimResult<Visibility> {
        let entity = self.get(target).ok_or(SimError::UnknownEntity(target))?;
        if !self.players.contains_key(&viewer) {
            return Err(SimError::UnknownPlayer(viewer));
        }
        Ok(entity.visible_in_viewport(view, self.player_cells(viewer)))
    }
}
