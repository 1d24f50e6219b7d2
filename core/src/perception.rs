//! Read-only snapshots of the live game state captured by the host each tick.
//!
//! Snapshots are partially unreliable: any entity, label, or panel may be
//! missing on a given tick. Every query therefore returns an `Option` and
//! callers treat absence as a guard condition.

use std::collections::HashMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::ScreenRect;

/// Well-known metadata fragments used to recognise entities.
pub mod metadata {
    /// Wave trigger object whose state machine counts waves.
    pub const WAVE_TRIGGER: &str = "Objects/Afflictionator";
    /// Player stash.
    pub const STASH: &str = "Metadata/MiscellaneousObjects/Stash";
    /// Suffix of the hideout map device path.
    pub const MAP_DEVICE_SUFFIX: &str = "MappingDevice";
    /// Texture suffix of the map fragment placed into the map device.
    pub const MAP_FRAGMENT_TEXTURE_SUFFIX: &str = "DeliriumFragment.dds";
    /// Essence monolith ground label.
    pub const ESSENCE_MONOLITH: &str = "Metadata/MiscellaneousObjects/Monolith";
    /// Tangle altar ground label.
    pub const TANGLE_ALTAR: &str = "Metadata/MiscellaneousObjects/PrimordialBosses/TangleAltar";
    /// Cleansing fire altar ground label.
    pub const CLEANSING_FIRE_ALTAR: &str =
        "Metadata/MiscellaneousObjects/PrimordialBosses/CleansingFireAltar";
    /// Crimson iron resource node.
    pub const CRIMSON_IRON_NODE: &str = "Settlers/Node/Objects/NodeTypes/CrimsonIron";
    /// Bismuth resource node.
    pub const BISMUTH_NODE: &str = "Settlers/Node/Objects/NodeTypes/Bismuth";
    /// Label suffix of currency piles that are picked up automatically.
    pub const GOLD_LABEL_SUFFIX: &str = " Gold";
    /// State machine entry naming a resource node's activation.
    pub const ACTIVATED_STATE: &str = "activated";
}

/// Unique identifier of an entity or item within the current area.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates a new entity identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Coarse entity classification reported by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Living creature that may be hostile.
    Monster,
    /// Openable container.
    Chest,
    /// Buff shrine.
    Shrine,
    /// Object with a minimap icon, such as the wave trigger or map device.
    IngameIcon,
    /// Portal leading back to the hideout or into a map.
    TownPortal,
    /// Static decoration or interactive object without an icon.
    MiscellaneousObject,
    /// Anything else.
    Other,
}

/// Monster rarity tier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rarity {
    /// Plain monster.
    #[default]
    Normal,
    /// Magic monster.
    Magic,
    /// Rare monster.
    Rare,
    /// Unique monster.
    Unique,
}

impl Rarity {
    /// Score contributed by a monster of this rarity to a fight weight.
    #[must_use]
    pub const fn fight_weight(self) -> u32 {
        match self {
            Self::Normal => 1,
            Self::Magic => 3,
            Self::Rare => 15,
            Self::Unique => 50,
        }
    }
}

/// Named integer states exposed by scripted objects.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMachineComponent {
    states: Vec<(String, i64)>,
}

impl StateMachineComponent {
    /// Creates a component from `(name, value)` pairs in reported order.
    #[must_use]
    pub fn new(states: Vec<(String, i64)>) -> Self {
        Self { states }
    }

    /// Value of the first state with the provided name.
    #[must_use]
    pub fn state(&self, name: &str) -> Option<i64> {
        self.states
            .iter()
            .find(|(state, _)| state == name)
            .map(|(_, value)| *value)
    }
}

/// Container flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChestComponent {
    /// Whether the container is a strongbox.
    pub is_strongbox: bool,
    /// Whether the container is locked.
    pub is_locked: bool,
    /// Whether the container was already opened.
    pub is_opened: bool,
}

/// Shrine flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShrineComponent {
    /// Whether the shrine can still be activated.
    pub is_available: bool,
}

/// Component kinds that may be attached to an [`EntitySnapshot`].
pub trait Component {
    /// Returns the component when the entity carries one.
    fn from_entity(entity: &EntitySnapshot) -> Option<&Self>;
}

impl Component for StateMachineComponent {
    fn from_entity(entity: &EntitySnapshot) -> Option<&Self> {
        entity.state_machine.as_ref()
    }
}

impl Component for ChestComponent {
    fn from_entity(entity: &EntitySnapshot) -> Option<&Self> {
        entity.chest.as_ref()
    }
}

impl Component for ShrineComponent {
    fn from_entity(entity: &EntitySnapshot) -> Option<&Self> {
        entity.shrine.as_ref()
    }
}

/// Immutable representation of a single entity.
#[derive(Clone, Debug, PartialEq)]
pub struct EntitySnapshot {
    /// Identifier of the entity.
    pub id: EntityId,
    /// Classification of the entity.
    pub kind: EntityKind,
    /// Metadata path identifying the entity template.
    pub metadata: String,
    /// Grid-space position.
    pub position: Vec2,
    /// Projected screen-space center of the entity bounds, when on screen.
    pub screen_position: Option<Vec2>,
    /// Grid-space distance to the player.
    pub distance: f32,
    /// Whether the entity is alive.
    pub is_alive: bool,
    /// Whether the entity can be targeted or interacted with.
    pub is_targetable: bool,
    /// Whether the entity is hostile to the player.
    pub is_hostile: bool,
    /// Rarity tier, meaningful for monsters.
    pub rarity: Rarity,
    /// Scripted state values, if any.
    pub state_machine: Option<StateMachineComponent>,
    /// Container flags, if the entity is a chest.
    pub chest: Option<ChestComponent>,
    /// Shrine flags, if the entity is a shrine.
    pub shrine: Option<ShrineComponent>,
}

impl EntitySnapshot {
    /// Creates a snapshot with neutral flags; callers fill in the rest.
    #[must_use]
    pub fn new(id: EntityId, kind: EntityKind, metadata: impl Into<String>, position: Vec2) -> Self {
        Self {
            id,
            kind,
            metadata: metadata.into(),
            position,
            screen_position: None,
            distance: 0.0,
            is_alive: true,
            is_targetable: true,
            is_hostile: false,
            rarity: Rarity::Normal,
            state_machine: None,
            chest: None,
            shrine: None,
        }
    }

    /// Looks up a component of type `T`.
    #[must_use]
    pub fn component<T: Component>(&self) -> Option<&T> {
        T::from_entity(self)
    }

    /// Reports whether the entity is a living, targetable, hostile monster.
    #[must_use]
    pub fn is_hostile_monster(&self) -> bool {
        self.kind == EntityKind::Monster && self.is_alive && self.is_targetable && self.is_hostile
    }
}

/// Read-only snapshot describing all valid entities around the player.
#[derive(Clone, Debug, Default)]
pub struct EntityView {
    snapshots: Vec<EntitySnapshot>,
}

impl EntityView {
    /// Creates a new entity view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<EntitySnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &EntitySnapshot> {
        self.snapshots.iter()
    }

    /// First entity in identifier order matching the predicate.
    pub fn first(&self, predicate: impl Fn(&EntitySnapshot) -> bool) -> Option<&EntitySnapshot> {
        self.snapshots.iter().find(|snapshot| predicate(*snapshot))
    }

    /// Entity matching the predicate that lies closest to the player.
    ///
    /// Ties resolve toward the lower identifier.
    pub fn closest(&self, predicate: impl Fn(&EntitySnapshot) -> bool) -> Option<&EntitySnapshot> {
        self.snapshots
            .iter()
            .filter(|snapshot| predicate(*snapshot))
            .min_by(|left, right| left.distance.total_cmp(&right.distance))
    }

    /// All living, targetable, hostile monsters.
    pub fn hostile_monsters(&self) -> impl Iterator<Item = &EntitySnapshot> {
        self.snapshots
            .iter()
            .filter(|snapshot| snapshot.is_hostile_monster())
    }

    /// Sum of rarity weights of hostile monsters strictly within `radius` of `position`.
    #[must_use]
    pub fn fight_weight(&self, position: Vec2, radius: f32) -> u32 {
        self.hostile_monsters()
            .filter(|monster| monster.position.distance(position) < radius)
            .map(|monster| monster.rarity.fight_weight())
            .sum()
    }

    /// The wave trigger object, if present.
    #[must_use]
    pub fn wave_trigger(&self) -> Option<&EntitySnapshot> {
        self.first(|entity| {
            entity.kind == EntityKind::IngameIcon && entity.metadata.contains(metadata::WAVE_TRIGGER)
        })
    }

    /// The player's stash, if present.
    #[must_use]
    pub fn stash(&self) -> Option<&EntitySnapshot> {
        self.first(|entity| entity.metadata.contains(metadata::STASH))
    }

    /// The hideout map device, if present.
    #[must_use]
    pub fn map_device(&self) -> Option<&EntitySnapshot> {
        self.first(|entity| {
            entity.kind == EntityKind::IngameIcon
                && entity.metadata.ends_with(metadata::MAP_DEVICE_SUFFIX)
        })
    }

    /// Closest town portal.
    #[must_use]
    pub fn closest_portal(&self) -> Option<&EntitySnapshot> {
        self.closest(|entity| entity.kind == EntityKind::TownPortal)
    }

    /// Closest unopened, unlocked strongbox.
    #[must_use]
    pub fn closest_strongbox(&self) -> Option<&EntitySnapshot> {
        self.closest(|entity| {
            entity.kind == EntityKind::Chest
                && entity
                    .component::<ChestComponent>()
                    .is_some_and(|chest| chest.is_strongbox && !chest.is_locked && !chest.is_opened)
        })
    }

    /// Closest shrine that can still be activated.
    #[must_use]
    pub fn closest_shrine(&self) -> Option<&EntitySnapshot> {
        self.closest(|entity| {
            entity.kind == EntityKind::Shrine
                && entity
                    .component::<ShrineComponent>()
                    .is_some_and(|shrine| shrine.is_available)
        })
    }

    /// Closest resource node whose `activated` state reads exactly zero.
    #[must_use]
    pub fn closest_resource_node(&self) -> Option<&EntitySnapshot> {
        self.closest(|entity| {
            entity.kind == EntityKind::IngameIcon
                && (entity.metadata.contains(metadata::CRIMSON_IRON_NODE)
                    || entity.metadata.contains(metadata::BISMUTH_NODE))
                && entity
                    .component::<StateMachineComponent>()
                    .and_then(|machine| machine.state(metadata::ACTIVATED_STATE))
                    == Some(0)
        })
    }
}

/// Visible ground label attached to an item or interactive object.
#[derive(Clone, Debug, PartialEq)]
pub struct GroundItem {
    /// Identifier of the labelled entity.
    pub entity: EntityId,
    /// Metadata path of the labelled entity.
    pub metadata: String,
    /// Grid-space position of the labelled entity.
    pub position: Vec2,
    /// Grid-space distance to the player.
    pub distance: f32,
    /// Label text, if readable.
    pub label_text: Option<String>,
    /// Whether the label is currently drawn.
    pub label_visible: bool,
    /// Screen-space bounds of the label.
    pub label_bounds: ScreenRect,
}

/// Item stored in the player's main inventory.
#[derive(Clone, Debug, PartialEq)]
pub struct InventoryItem {
    /// Identifier of the item.
    pub id: EntityId,
    /// Inventory column of the item's upper-left slot.
    pub column: u32,
    /// Inventory row of the item's upper-left slot.
    pub row: u32,
    /// Screen-space bounds of the item.
    pub bounds: ScreenRect,
}

impl InventoryItem {
    /// Number of inventory columns eligible for stashing; columns beyond are reserved.
    pub const STORABLE_COLUMNS: u32 = 11;

    /// Reports whether the item sits in a column that gets stashed.
    #[must_use]
    pub const fn is_storable(&self) -> bool {
        self.column < Self::STORABLE_COLUMNS
    }
}

/// Named panels and buttons the farmer interacts with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Panel {
    /// Map device window.
    MapDevice,
    /// Activate button inside the map device window.
    MapDeviceActivate,
    /// Inventory panel, shown while the stash is open.
    Inventory,
    /// Resurrect-at-checkpoint button of the death panel.
    ResurrectAtCheckpoint,
}

/// Visible user interface element.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UiElement {
    /// Whether the element is drawn and interactive.
    pub visible: bool,
    /// Screen-space bounds of the element.
    pub bounds: ScreenRect,
    /// Texture name, for icon-like elements.
    pub texture: Option<String>,
}

/// Read-only snapshot of the user interface.
#[derive(Clone, Debug, Default)]
pub struct UiView {
    /// Game window rectangle in screen space.
    pub window: ScreenRect,
    panels: HashMap<Panel, UiElement>,
    map_device_slots: Vec<UiElement>,
}

impl UiView {
    /// Creates a view covering the provided window.
    #[must_use]
    pub fn new(window: ScreenRect) -> Self {
        Self {
            window,
            panels: HashMap::new(),
            map_device_slots: Vec::new(),
        }
    }

    /// Records the state of a named panel.
    #[must_use]
    pub fn with_panel(mut self, panel: Panel, element: UiElement) -> Self {
        let _ = self.panels.insert(panel, element);
        self
    }

    /// Records the items shown in the map device's storage panel.
    #[must_use]
    pub fn with_map_device_slots(mut self, slots: Vec<UiElement>) -> Self {
        self.map_device_slots = slots;
        self
    }

    /// State of the named panel, if reported.
    #[must_use]
    pub fn panel(&self, panel: Panel) -> Option<&UiElement> {
        self.panels.get(&panel)
    }

    /// Reports whether the named panel is reported and visible.
    #[must_use]
    pub fn is_visible(&self, panel: Panel) -> bool {
        self.panel(panel).is_some_and(|element| element.visible)
    }

    /// Items shown in the map device's storage panel.
    #[must_use]
    pub fn map_device_slots(&self) -> &[UiElement] {
        &self.map_device_slots
    }
}

/// Player state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlayerSnapshot {
    /// Grid-space position.
    pub position: Vec2,
    /// Whether the player is alive.
    pub is_alive: bool,
    /// Whether the player is dead.
    pub is_dead: bool,
    /// Names of active buffs.
    pub buffs: Vec<String>,
}

impl PlayerSnapshot {
    /// Creates a living player standing at `position`.
    #[must_use]
    pub fn alive_at(position: Vec2) -> Self {
        Self {
            position,
            is_alive: true,
            is_dead: false,
            buffs: Vec::new(),
        }
    }

    /// Reports whether a buff with the exact name is active.
    #[must_use]
    pub fn has_buff(&self, name: &str) -> bool {
        self.buffs.iter().any(|buff| buff == name)
    }

    /// Reports whether the player is conclusively dead.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        !self.is_alive && self.is_dead
    }
}

/// Area the player currently stands in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AreaInfo {
    /// Hash identifying the area instance.
    pub hash: u32,
    /// Whether the area is the player's hideout.
    pub is_hideout: bool,
}

/// Everything the host reads from the game in a single tick.
#[derive(Clone, Debug, Default)]
pub struct Perception {
    /// Current area.
    pub area: AreaInfo,
    /// Player state.
    pub player: PlayerSnapshot,
    /// Valid entities around the player.
    pub entities: EntityView,
    /// Visible ground labels.
    pub ground_items: Vec<GroundItem>,
    /// Main inventory contents.
    pub inventory: Vec<InventoryItem>,
    /// User interface state.
    pub ui: UiView,
}

impl Perception {
    /// Closest visible ground label whose entity metadata matches one of `metadata`.
    #[must_use]
    pub fn closest_label(&self, metadata: &[&str]) -> Option<&GroundItem> {
        self.ground_items
            .iter()
            .filter(|item| metadata.iter().any(|candidate| item.metadata == *candidate))
            .min_by(|left, right| left.distance.total_cmp(&right.distance))
    }

    /// Closest essence monolith label.
    #[must_use]
    pub fn closest_essence(&self) -> Option<&GroundItem> {
        self.closest_label(&[metadata::ESSENCE_MONOLITH])
    }

    /// Closest primordial altar label.
    #[must_use]
    pub fn closest_altar(&self) -> Option<&GroundItem> {
        self.closest_label(&[metadata::TANGLE_ALTAR, metadata::CLEANSING_FIRE_ALTAR])
    }

    /// Number of inventory items that get stashed.
    #[must_use]
    pub fn storable_item_count(&self) -> usize {
        self.inventory.iter().filter(|item| item.is_storable()).count()
    }
}
