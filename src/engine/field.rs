use std::collections::BTreeMap;

use log::{debug, info};

use super::util::id::{IDFactory, ID};

pub type EntityID = ID<Character>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Team {
    Red,
    Blue,
}

impl Team {
    pub fn opponent(self) -> Self {
        match self {
            Team::Red => Team::Blue,
            Team::Blue => Team::Red,
        }
    }
}

/// A tile coordinate. Columns and rows count from 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Tile {
    pub x: i32,
    pub y: i32,
}

impl Tile {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Debug)]
pub struct Character {
    pub id: EntityID,
    pub name: String,
    pub team: Team,
    pub health: i32,
    pub max_health: i32,
    pub tile: Tile,
    pub hidden: bool,
    pub form: Option<i32>,
    /// Set on stand-ins: the character this one stands in for.
    pub stand_in_for: Option<EntityID>,
}

impl Character {
    pub fn new(name: impl Into<String>, team: Team, health: i32) -> Self {
        Self {
            // replaced when the character is added to a field
            id: IDFactory::<EntityID>::new().get_id(),
            name: name.into(),
            team,
            health,
            max_health: health,
            tile: Tile::new(1, 1),
            hidden: false,
            form: None,
            stand_in_for: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.health <= 0
    }

    pub fn is_stand_in(&self) -> bool {
        self.stand_in_for.is_some()
    }

    /// Whether this character takes up its tile.
    fn occupies(&self) -> bool {
        !self.hidden && !self.is_deleted()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddEntityStatus {
    Added(EntityID),
    /// The entity could not be placed and was discarded.
    Deleted,
}

/// The battle grid and every character on it.
pub struct Field {
    width: i32,
    height: i32,
    entities: BTreeMap<EntityID, Character>,
    ids: IDFactory<EntityID>,
    time_frozen: bool,
    highlight_tiles: bool,
}

impl Field {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            entities: BTreeMap::new(),
            ids: IDFactory::new(),
            time_frozen: false,
            highlight_tiles: true,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn contains(&self, tile: Tile) -> bool {
        (1..=self.width).contains(&tile.x) && (1..=self.height).contains(&tile.y)
    }

    pub fn occupant(&self, tile: Tile) -> Option<&Character> {
        self.entities.values().find(|c| c.tile == tile && c.occupies())
    }

    /// Places `character` on `tile`, assigning it a fresh id.
    pub fn add_entity(&mut self, mut character: Character, tile: Tile) -> AddEntityStatus {
        if !self.contains(tile) || self.occupant(tile).is_some() || character.is_deleted() {
            debug!("field: could not place {} at {:?}", character.name, tile);
            return AddEntityStatus::Deleted;
        }
        let id = self.ids.get_id();
        character.id = id;
        character.tile = tile;
        info!("field: {} entered at {:?} as {:?}", character.name, tile, id);
        self.entities.insert(id, character);
        AddEntityStatus::Added(id)
    }

    /// A copy of `of` that is not yet on the field. Used to keep a character
    /// on screen while the real one is hidden.
    pub fn make_stand_in(&self, of: EntityID) -> Option<Character> {
        self.entities.get(&of).map(|original| {
            let mut double = original.clone();
            double.hidden = false;
            double.stand_in_for = Some(of);
            double
        })
    }

    pub fn dealloc(&mut self, id: EntityID) -> Option<Character> {
        let removed = self.entities.remove(&id);
        if let Some(character) = &removed {
            debug!("field: removed {} {:?}", character.name, id);
        }
        removed
    }

    pub fn get(&self, id: EntityID) -> Option<&Character> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityID) -> Option<&mut Character> {
        self.entities.get_mut(&id)
    }

    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.entities.values()
    }

    pub fn hide(&mut self, id: EntityID) {
        if let Some(character) = self.entities.get_mut(&id) {
            character.hidden = true;
        }
    }

    pub fn reveal(&mut self, id: EntityID) {
        if let Some(character) = self.entities.get_mut(&id) {
            character.hidden = false;
        }
    }

    /// Moves a character if the destination is on the field and free.
    /// Nobody moves while time is frozen.
    pub fn move_to(&mut self, id: EntityID, tile: Tile) -> bool {
        if self.time_frozen {
            return false;
        }
        let free = self.contains(tile) && self.occupant(tile).map_or(true, |c| c.id == id);
        match self.entities.get_mut(&id) {
            Some(character) if free => {
                character.tile = tile;
                true
            }
            _ => false,
        }
    }

    /// The first opposing character that can be hit, nearest column first.
    pub fn nearest_target(&self, team: Team) -> Option<EntityID> {
        self.entities
            .values()
            .filter(|c| c.team != team && c.occupies() && !c.is_stand_in())
            .min_by_key(|c| (c.tile.x, c.id))
            .map(|c| c.id)
    }

    /// Applies damage. Frozen fields still accept hits.
    pub fn hit(&mut self, target: EntityID, damage: i32) -> bool {
        match self.entities.get_mut(&target) {
            Some(character) if !character.is_deleted() => {
                character.health = (character.health - damage).clamp(0, character.max_health);
                debug!("field: {} hit for {} ({} left)", character.name, damage, character.health);
                true
            }
            _ => false,
        }
    }

    pub fn heal(&mut self, target: EntityID, amount: i32) -> bool {
        self.hit(target, -amount)
    }

    pub fn set_health(&mut self, id: EntityID, health: i32) {
        if let Some(character) = self.entities.get_mut(&id) {
            character.health = health;
        }
    }

    pub fn toggle_time_freeze(&mut self, frozen: bool) {
        self.time_frozen = frozen;
    }

    pub fn is_time_frozen(&self) -> bool {
        self.time_frozen
    }

    pub fn highlight_tiles(&mut self, enabled: bool) {
        self.highlight_tiles = enabled;
    }

    pub fn is_highlighting(&self) -> bool {
        self.highlight_tiles
    }
}
