//! Deterministic simulated arena standing in for the game client.
//!
//! The arena owns everything the farmer can perceive: the player, the wave
//! trigger, monsters, loot and the user interface. Actions coming back from
//! the farmer arrive through [`InputSink`]; clicks are hit-tested against the
//! same screen projection the perception snapshot used.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, trace};
use wavefarm_core::{
    clamp_to_window, metadata, Action, AreaInfo, EntityId, EntityKind, EntitySnapshot,
    EntityView, GroundItem, InputSink, InventoryItem, KeyBinding, Modifier, MouseButton, Panel,
    Perception, PlayerSnapshot, Rarity, ScreenRect, Settings, StateMachineComponent, Timestamp,
    UiElement, UiView, Vec2,
};
use wavefarm_world::{
    AreaContext, GridDimensions, NamedTile, NamedTiles, TerrainSnapshot, WalkabilityGrid,
};

const TILE_COLUMNS: u32 = 4;
const TILE_ROWS: u32 = 3;
const TRIGGER_TILE: &str = "arena_trigger_pad";
const TRIGGER_TILE_INDEX: u32 = 5;

const WINDOW: ScreenRect = ScreenRect::new(Vec2::ZERO, Vec2::new(1920.0, 1080.0));
const SCREEN_CENTER: Vec2 = Vec2::new(960.0, 540.0);
const PIXELS_PER_UNIT: f32 = 8.0;
const INTERACT_RADIUS_PX: f32 = 40.0;
const LABEL_SIZE: Vec2 = Vec2::new(90.0, 36.0);
const INVENTORY_PANEL: ScreenRect = ScreenRect::new(Vec2::new(1260.0, 560.0), Vec2::new(650.0, 300.0));
const DEVICE_PANEL: ScreenRect = ScreenRect::new(Vec2::new(500.0, 200.0), Vec2::new(600.0, 500.0));
const ACTIVATE_BUTTON: ScreenRect = ScreenRect::new(Vec2::new(740.0, 640.0), Vec2::new(120.0, 40.0));
const FRAGMENT_SLOT: ScreenRect = ScreenRect::new(Vec2::new(560.0, 260.0), Vec2::new(50.0, 50.0));
const FRAGMENT_TEXTURE: &str = "Art/2DItems/Maps/DeliriumFragment.dds";

const INVENTORY_COLUMNS: u32 = 12;
const INVENTORY_CAPACITY: u32 = 60;
const PICKUP_RANGE: f32 = 25.0;
const WALK_STEP: f32 = 4.0;
const BLINK_STEP: f32 = 12.0;
const SPELL_RADIUS: f32 = 10.0;
const MONSTER_STEP: f32 = 0.5;
const MONSTER_REACH: f32 = 3.0;
const SPAWN_SPREAD: i32 = 20;
const DROP_CHANCE: f64 = 0.35;
const DROPS: [&str; 4] = ["Chaos Orb", "Divine Orb", "120 Gold", "Exalted Orb"];

const TRIGGER_ID: u32 = 1;
const STASH_ID: u32 = 2;
const PORTAL_ID: u32 = 3;
const DEVICE_ID: u32 = 4;
const FIRST_DYNAMIC_ID: u32 = 100;

const HIDEOUT: AreaInfo = AreaInfo {
    hash: 1,
    is_hideout: true,
};
const HIDEOUT_SIZE: usize = 21;
const HIDEOUT_ENTRANCE: Vec2 = Vec2::new(10.0, 10.0);
const HIDEOUT_DEVICE: Vec2 = Vec2::new(10.0, 4.0);
const HIDEOUT_PORTAL: Vec2 = Vec2::new(10.0, 16.0);
const MAP_HASH_BASE: u32 = 0x5eed_0000;
const MAP_ENTRANCE: Vec2 = Vec2::new(12.0, 36.0);
const MAP_STASH: Vec2 = Vec2::new(8.0, 8.0);
const MAP_PORTAL: Vec2 = Vec2::new(60.0, 38.0);
const FALLBACK_TRIGGER: Vec2 = Vec2::new(23.0, 23.0);

#[derive(Clone, Debug)]
struct Monster {
    id: u32,
    position: Vec2,
    rarity: Rarity,
    health: u32,
}

#[derive(Clone, Debug)]
struct Loot {
    id: u32,
    position: Vec2,
    label: String,
}

/// Simulated game client driven by the farmer's actions.
#[derive(Debug)]
pub(crate) struct Arena {
    rng: ChaCha8Rng,
    settings: Settings,
    now: Timestamp,
    area: AreaInfo,
    context: AreaContext,
    player: Vec2,
    buffs: Vec<String>,
    trigger: Vec2,
    wave: i64,
    wave_active: bool,
    monsters: Vec<Monster>,
    loot: Vec<Loot>,
    inventory: Vec<InventoryItem>,
    inventory_open: bool,
    device_open: bool,
    fragment_loaded: bool,
    portal_open: bool,
    next_id: u32,
    maps_opened: u32,
    travelled: bool,
}

impl Arena {
    /// Creates an arena with the player standing at the entrance of a fresh map.
    pub(crate) fn new(seed: u64, settings: Settings, now: Timestamp) -> Self {
        let area = AreaInfo {
            hash: MAP_HASH_BASE,
            is_hideout: false,
        };
        let context = build_map(area, &settings, now);
        let trigger = context.find_feature(TRIGGER_TILE).unwrap_or(FALLBACK_TRIGGER);
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            settings,
            now,
            area,
            context,
            player: MAP_ENTRANCE,
            buffs: Vec::new(),
            trigger,
            wave: 0,
            wave_active: false,
            monsters: Vec::new(),
            loot: Vec::new(),
            inventory: Vec::new(),
            inventory_open: false,
            device_open: false,
            fragment_loaded: false,
            portal_open: false,
            next_id: FIRST_DYNAMIC_ID,
            maps_opened: 0,
            travelled: false,
        }
    }

    /// Navigation context of the area the player stands in.
    pub(crate) fn context(&self) -> &AreaContext {
        &self.context
    }

    /// Current player position.
    pub(crate) fn player(&self) -> Vec2 {
        self.player
    }

    /// Returns the new area context once after the player changed area.
    pub(crate) fn take_travel(&mut self) -> Option<AreaContext> {
        if std::mem::take(&mut self.travelled) {
            Some(self.context.clone())
        } else {
            None
        }
    }

    /// Advances monsters by one step and ends the wave once they are all dead.
    pub(crate) fn step(&mut self, now: Timestamp) {
        self.now = now;
        let player = self.player;
        for monster in &mut self.monsters {
            let offset = player - monster.position;
            if offset.length() <= MONSTER_REACH {
                continue;
            }
            let next = monster.position + offset.clamp_length_max(MONSTER_STEP);
            if self.context.is_walkable(next) {
                monster.position = next;
            }
        }

        if self.wave_active && self.monsters.is_empty() {
            info!(wave = self.wave, "wave cleared");
            self.wave_active = false;
        }
    }

    /// Snapshot of everything the farmer can see this tick.
    pub(crate) fn perceive(&self) -> Perception {
        let mut entities = Vec::new();
        if self.area.is_hideout {
            entities.push(self.entity(
                DEVICE_ID,
                EntityKind::IngameIcon,
                "Metadata/MiscellaneousObjects/MappingDevice",
                HIDEOUT_DEVICE,
            ));
            if self.portal_open {
                entities.push(self.entity(
                    PORTAL_ID,
                    EntityKind::TownPortal,
                    "Metadata/MiscellaneousObjects/MultiplexPortal",
                    HIDEOUT_PORTAL,
                ));
            }
        } else {
            let mut trigger = self.entity(
                TRIGGER_ID,
                EntityKind::IngameIcon,
                "Metadata/Terrain/Leagues/Delirium/Objects/Afflictionator",
                self.trigger,
            );
            trigger.state_machine = Some(StateMachineComponent::new(vec![
                ("wave".to_owned(), self.wave),
                ("active".to_owned(), i64::from(self.wave > 0)),
                ("goodbye".to_owned(), i64::from(!self.wave_active)),
            ]));
            entities.push(trigger);
            entities.push(self.entity(
                STASH_ID,
                EntityKind::MiscellaneousObject,
                metadata::STASH,
                MAP_STASH,
            ));
            entities.push(self.entity(
                PORTAL_ID,
                EntityKind::TownPortal,
                "Metadata/MiscellaneousObjects/PlayerPortal",
                MAP_PORTAL,
            ));
            for monster in &self.monsters {
                let mut entity = self.entity(
                    monster.id,
                    EntityKind::Monster,
                    "Metadata/Monsters/Arena/Husk",
                    monster.position,
                );
                entity.is_hostile = true;
                entity.rarity = monster.rarity;
                entities.push(entity);
            }
        }

        let ground_items = self
            .loot
            .iter()
            .map(|loot| GroundItem {
                entity: EntityId::new(loot.id),
                metadata: "Metadata/Items/Currency/Arena".to_owned(),
                position: loot.position,
                distance: self.player.distance(loot.position),
                label_text: Some(loot.label.clone()),
                label_visible: true,
                label_bounds: self.label_bounds(loot.position),
            })
            .collect();

        Perception {
            area: self.area,
            player: PlayerSnapshot {
                position: self.player,
                is_alive: true,
                is_dead: false,
                buffs: self.buffs.clone(),
            },
            entities: EntityView::from_snapshots(entities),
            ground_items,
            inventory: self.inventory.clone(),
            ui: self.ui(),
        }
    }

    fn ui(&self) -> UiView {
        let mut ui = UiView::new(WINDOW);
        if self.inventory_open {
            ui = ui.with_panel(Panel::Inventory, shown(INVENTORY_PANEL));
        }
        if self.device_open {
            ui = ui.with_panel(Panel::MapDevice, shown(DEVICE_PANEL));
            if self.fragment_loaded {
                ui = ui.with_panel(Panel::MapDeviceActivate, shown(ACTIVATE_BUTTON));
            } else {
                ui = ui.with_map_device_slots(vec![UiElement {
                    visible: true,
                    bounds: FRAGMENT_SLOT,
                    texture: Some(FRAGMENT_TEXTURE.to_owned()),
                }]);
            }
        }
        ui
    }

    fn entity(&self, id: u32, kind: EntityKind, metadata: &str, position: Vec2) -> EntitySnapshot {
        let mut entity = EntitySnapshot::new(EntityId::new(id), kind, metadata, position);
        entity.distance = self.player.distance(position);
        entity.screen_position = Some(self.to_screen(position));
        entity
    }

    fn to_screen(&self, position: Vec2) -> Vec2 {
        SCREEN_CENTER + (position - self.player) * PIXELS_PER_UNIT
    }

    fn to_world(&self, screen: Vec2) -> Vec2 {
        self.player + (screen - SCREEN_CENTER) / PIXELS_PER_UNIT
    }

    fn label_bounds(&self, position: Vec2) -> ScreenRect {
        ScreenRect::new(self.to_screen(position) - LABEL_SIZE * 0.5, LABEL_SIZE)
    }

    fn near(&self, click: Vec2, position: Vec2) -> bool {
        self.to_screen(position).distance(click) <= INTERACT_RADIUS_PX
    }

    fn move_toward(&mut self, target: Vec2, key: &KeyBinding) {
        let cursor = clamp_to_window(
            self.to_screen(target),
            WINDOW,
            self.settings.clamp_size as f32,
        );
        let target = self.to_world(cursor);

        if *key == self.settings.combat_key {
            self.cast(target);
            return;
        }
        let step = if *key == self.settings.blink_key {
            BLINK_STEP
        } else if *key == self.settings.movement_key {
            WALK_STEP
        } else {
            return;
        };

        let next = self.player + (target - self.player).clamp_length_max(step);
        if self.context.is_walkable(next) {
            self.player = next;
        }
    }

    fn cast(&mut self, target: Vec2) {
        for monster in &mut self.monsters {
            if monster.position.distance(target) < SPELL_RADIUS {
                monster.health = monster.health.saturating_sub(1);
            }
        }

        let (dead, alive): (Vec<Monster>, Vec<Monster>) = std::mem::take(&mut self.monsters)
            .into_iter()
            .partition(|monster| monster.health == 0);
        self.monsters = alive;
        for monster in dead {
            trace!(monster = monster.id, "monster killed");
            if self.rng.gen_bool(DROP_CHANCE) {
                let label = DROPS[self.rng.gen_range(0..DROPS.len())].to_owned();
                let id = self.allocate_id();
                self.loot.push(Loot {
                    id,
                    position: monster.position,
                    label,
                });
            }
        }
    }

    fn click(&mut self, position: Vec2, button: MouseButton, modifier: Option<Modifier>) {
        if button == MouseButton::Right {
            if !self.area.is_hideout {
                info!("leaving map without a portal");
                self.travel_to_hideout();
            }
            return;
        }

        if self.area.is_hideout {
            self.click_hideout(position, modifier);
        } else {
            self.click_map(position, modifier);
        }
    }

    fn click_map(&mut self, position: Vec2, modifier: Option<Modifier>) {
        if self.inventory_open && modifier == Some(Modifier::Control) {
            if let Some(index) = self
                .inventory
                .iter()
                .position(|item| item.bounds.contains(position))
            {
                let item = self.inventory.remove(index);
                debug!(item = item.id.get(), "stashed item");
            }
            return;
        }

        let picked = self
            .loot
            .iter()
            .position(|loot| self.label_bounds(loot.position).contains(position));
        if let Some(index) = picked {
            let in_reach = self.player.distance(self.loot[index].position) <= PICKUP_RANGE;
            if in_reach && self.inventory.len() < INVENTORY_CAPACITY as usize {
                let loot = self.loot.remove(index);
                self.store(loot);
            }
            return;
        }

        if self.near(position, self.trigger) {
            self.start_wave();
        } else if self.near(position, MAP_STASH) {
            self.inventory_open = true;
        } else if self.near(position, MAP_PORTAL) {
            self.travel_to_hideout();
        }
    }

    fn click_hideout(&mut self, position: Vec2, modifier: Option<Modifier>) {
        if self.device_open {
            if self.fragment_loaded && ACTIVATE_BUTTON.contains(position) {
                info!("map device activated");
                self.device_open = false;
                self.fragment_loaded = false;
                self.portal_open = true;
                return;
            }
            if !self.fragment_loaded
                && modifier == Some(Modifier::Control)
                && FRAGMENT_SLOT.contains(position)
            {
                self.fragment_loaded = true;
                return;
            }
        }

        if self.portal_open && self.near(position, HIDEOUT_PORTAL) {
            self.travel_to_map();
        } else if self.near(position, HIDEOUT_DEVICE) {
            self.device_open = true;
        }
    }

    fn press(&mut self, key: &KeyBinding) {
        if *key == KeyBinding::ESCAPE {
            self.inventory_open = false;
            self.device_open = false;
        } else if *key == self.settings.sustain_key {
            if !self.buffs.contains(&self.settings.sustain_buff) {
                self.buffs.push(self.settings.sustain_buff.clone());
            }
        } else if *key == self.settings.mercenary_key {
            debug!(wave = self.wave, "support summoned");
        }
    }

    fn store(&mut self, loot: Loot) {
        let Some(slot) = (0..INVENTORY_CAPACITY).find(|slot| {
            let (column, row) = (slot % INVENTORY_COLUMNS, slot / INVENTORY_COLUMNS);
            !self
                .inventory
                .iter()
                .any(|item| item.column == column && item.row == row)
        }) else {
            return;
        };

        let (column, row) = (slot % INVENTORY_COLUMNS, slot / INVENTORY_COLUMNS);
        debug!(item = loot.id, label = %loot.label, column, row, "picked up item");
        self.inventory.push(InventoryItem {
            id: EntityId::new(loot.id),
            column,
            row,
            bounds: ScreenRect::new(
                Vec2::new(1270.0 + 53.0 * column as f32, 590.0 + 53.0 * row as f32),
                Vec2::splat(50.0),
            ),
        });
    }

    fn start_wave(&mut self) {
        if self.wave_active || self.wave >= i64::from(self.settings.max_waves) {
            return;
        }

        self.wave += 1;
        self.wave_active = true;
        let count = 2 + usize::try_from(self.wave).unwrap_or(0);
        for _ in 0..count {
            let position = self.spawn_position();
            let rarity = match self.rng.gen_range(0..100) {
                0..=69 => Rarity::Normal,
                70..=91 => Rarity::Magic,
                92..=98 => Rarity::Rare,
                _ => Rarity::Unique,
            };
            let health = match rarity {
                Rarity::Normal => 1,
                Rarity::Magic => 2,
                Rarity::Rare => 4,
                Rarity::Unique => 8,
            };
            let id = self.allocate_id();
            self.monsters.push(Monster {
                id,
                position,
                rarity,
                health,
            });
        }
        info!(wave = self.wave, monsters = count, "wave started");
    }

    fn spawn_position(&mut self) -> Vec2 {
        for _ in 0..10 {
            let offset = Vec2::new(
                self.rng.gen_range(-SPAWN_SPREAD..SPAWN_SPREAD) as f32,
                self.rng.gen_range(-SPAWN_SPREAD..SPAWN_SPREAD) as f32,
            );
            let candidate = self.trigger + offset;
            if self.context.is_walkable(candidate) {
                return candidate;
            }
        }
        self.trigger
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn travel_to_hideout(&mut self) {
        info!(waves = self.wave, "returning to hideout");
        self.area = HIDEOUT;
        self.context = build_hideout(&self.settings, self.now);
        self.player = HIDEOUT_ENTRANCE;
        self.reset_area_state();
    }

    fn travel_to_map(&mut self) {
        self.maps_opened += 1;
        self.area = AreaInfo {
            hash: MAP_HASH_BASE + self.maps_opened,
            is_hideout: false,
        };
        info!(area = self.area.hash, "entering new map");
        self.context = build_map(self.area, &self.settings, self.now);
        self.trigger = self.context.find_feature(TRIGGER_TILE).unwrap_or(FALLBACK_TRIGGER);
        self.player = MAP_ENTRANCE;
        self.reset_area_state();
    }

    fn reset_area_state(&mut self) {
        self.wave = 0;
        self.wave_active = false;
        self.monsters.clear();
        self.loot.clear();
        self.inventory_open = false;
        self.device_open = false;
        self.fragment_loaded = false;
        self.portal_open = false;
        self.travelled = true;
    }
}

impl InputSink for Arena {
    fn dispatch(&mut self, action: &Action) {
        trace!(?action, "input");
        match action {
            Action::MoveToward { target, key } => self.move_toward(*target, key),
            Action::Click {
                position,
                button,
                modifier,
            } => self.click(*position, *button, *modifier),
            Action::KeyPress { key } => self.press(key),
        }
    }
}

fn shown(bounds: ScreenRect) -> UiElement {
    UiElement {
        visible: true,
        bounds,
        texture: None,
    }
}

/// Walled room with a pillar, packed into the two-cells-per-byte terrain layer.
fn map_terrain() -> TerrainSnapshot<NamedTile> {
    let dimensions = GridDimensions::from_terrain(TILE_COLUMNS, TILE_ROWS);
    let width = dimensions.width as usize;
    let height = dimensions.height as usize;
    let bytes_per_row = (width + 1) / 2;
    let mut walkability = vec![0_u8; bytes_per_row * height];

    for row in 0..height {
        for column in 0..width {
            let inside = column >= 1 && row >= 1 && column + 1 < width && row + 1 < height;
            let pillar = (34..=38).contains(&column) && (8..=30).contains(&row);
            if inside && !pillar {
                let nibble = if column % 2 == 0 { 0x01 } else { 0x10 };
                walkability[row * bytes_per_row + column / 2] |= nibble;
            }
        }
    }

    let tiles = (0..TILE_COLUMNS * TILE_ROWS)
        .map(|index| {
            if index == TRIGGER_TILE_INDEX {
                NamedTile::new(TRIGGER_TILE, "Metadata/Terrain/Arena/trigger_pad.tdt")
            } else {
                NamedTile::new("", format!("Metadata/Terrain/Arena/floor_{index}.tdt"))
            }
        })
        .collect();

    TerrainSnapshot {
        columns: TILE_COLUMNS,
        rows: TILE_ROWS,
        bytes_per_row,
        walkability,
        tiles,
    }
}

fn build_map(area: AreaInfo, settings: &Settings, now: Timestamp) -> AreaContext {
    AreaContext::build_parallel(
        area,
        &map_terrain(),
        &NamedTiles,
        settings.chunk_resolution,
        now,
    )
}

fn build_hideout(settings: &Settings, now: Timestamp) -> AreaContext {
    let map = vec![".".repeat(HIDEOUT_SIZE); HIDEOUT_SIZE].join("\n");
    AreaContext::from_grid(
        HIDEOUT,
        WalkabilityGrid::from_ascii(&map),
        settings.chunk_resolution,
        now,
    )
}
