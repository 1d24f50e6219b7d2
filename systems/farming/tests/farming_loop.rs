use std::time::Duration;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use wavefarm_core::{
    metadata, Action, AreaInfo, CellCoord, Clock, EntityId, EntityKind, EntitySnapshot,
    EntityView, FarmEvent, FarmState, GroundItem, InventoryItem, ManualClock, Modifier,
    MouseButton, Panel, Perception, PlayerSnapshot, Rarity, ScreenRect, Settings,
    StateMachineComponent, Timestamp, UiElement, UiView, Vec2,
};
use wavefarm_system_farming::{FarmError, Farmer};
use wavefarm_world::{AreaContext, ChunkCoord, WalkabilityGrid};

const START: Timestamp = Timestamp::from_secs(1_000);
const MAP: AreaInfo = AreaInfo {
    hash: 7,
    is_hideout: false,
};
const HIDEOUT: AreaInfo = AreaInfo {
    hash: 1,
    is_hideout: true,
};

fn open_area(info: AreaInfo, width: usize, height: usize) -> AreaContext {
    let map = vec![".".repeat(width); height].join("\n");
    AreaContext::from_grid(info, WalkabilityGrid::from_ascii(&map), 10, START)
}

struct Harness {
    farmer: Farmer<ManualClock, ChaCha8Rng>,
    clock: ManualClock,
    actions: Vec<Action>,
    events: Vec<FarmEvent>,
}

impl Harness {
    fn new(settings: Settings, area: AreaContext) -> Self {
        let clock = ManualClock::starting_at(START);
        let farmer = Farmer::new(settings, area, clock.clone(), ChaCha8Rng::seed_from_u64(7));
        Self {
            farmer,
            clock,
            actions: Vec::new(),
            events: Vec::new(),
        }
    }

    fn tick(&mut self, perception: &Perception) -> FarmState {
        self.farmer
            .tick(perception, &mut self.actions, &mut self.events);
        self.farmer.state()
    }

    fn advance(&self, seconds: u64) {
        self.clock.advance(Duration::from_secs(seconds));
    }

    fn now(&self) -> Timestamp {
        self.clock.now()
    }
}

fn window() -> ScreenRect {
    ScreenRect::new(Vec2::ZERO, Vec2::new(1920.0, 1080.0))
}

fn visible() -> UiElement {
    UiElement {
        visible: true,
        bounds: ScreenRect::new(Vec2::new(900.0, 500.0), Vec2::new(120.0, 40.0)),
        texture: None,
    }
}

fn in_area(area: AreaInfo, player: Vec2) -> Perception {
    Perception {
        area,
        player: PlayerSnapshot::alive_at(player),
        ui: UiView::new(window()),
        ..Perception::default()
    }
}

fn with_entities(mut perception: Perception, entities: Vec<EntitySnapshot>) -> Perception {
    perception.entities = EntityView::from_snapshots(entities);
    perception
}

fn trigger(position: Vec2, states: &[(&str, i64)]) -> EntitySnapshot {
    let mut entity = EntitySnapshot::new(
        EntityId::new(1),
        EntityKind::IngameIcon,
        "Metadata/Terrain/Leagues/Delirium/Objects/Afflictionator",
        position,
    );
    entity.screen_position = Some(Vec2::new(960.0, 540.0));
    entity.state_machine = Some(StateMachineComponent::new(
        states
            .iter()
            .map(|(name, value)| ((*name).to_owned(), *value))
            .collect(),
    ));
    entity
}

fn monster(id: u32, position: Vec2, rarity: Rarity) -> EntitySnapshot {
    let mut entity = EntitySnapshot::new(
        EntityId::new(id),
        EntityKind::Monster,
        "Metadata/Monsters/Skeletons/Skeleton",
        position,
    );
    entity.is_hostile = true;
    entity.rarity = rarity;
    entity
}

fn stash(position: Vec2) -> EntitySnapshot {
    let mut entity = EntitySnapshot::new(
        EntityId::new(2),
        EntityKind::MiscellaneousObject,
        metadata::STASH,
        position,
    );
    entity.screen_position = Some(Vec2::new(700.0, 400.0));
    entity
}

fn ground_item(id: u32, position: Vec2, text: &str) -> GroundItem {
    GroundItem {
        entity: EntityId::new(id),
        metadata: "Metadata/Items/Currency/CurrencyRerollRare".to_owned(),
        position,
        distance: 0.0,
        label_text: Some(text.to_owned()),
        label_visible: true,
        label_bounds: ScreenRect::new(Vec2::new(600.0, 300.0), Vec2::new(80.0, 20.0)),
    }
}

fn full_inventory(count: u32) -> Vec<InventoryItem> {
    (0..count)
        .map(|index| {
            let (column, row) = (index % 10, index / 10);
            InventoryItem {
                id: EntityId::new(100 + index),
                column,
                row,
                bounds: ScreenRect::new(
                    Vec2::new(1270.0 + 53.0 * column as f32, 590.0 + 53.0 * row as f32),
                    Vec2::splat(50.0),
                ),
            }
        })
        .collect()
}

fn blacklisted(events: &[FarmEvent]) -> Vec<(Vec2, Timestamp)> {
    events
        .iter()
        .filter_map(|event| match event {
            FarmEvent::Blacklisted { position, until } => Some((*position, *until)),
            _ => None,
        })
        .collect()
}

#[test]
fn items_failing_pickup_are_skipped_for_ten_seconds() {
    let mut harness = Harness::new(Settings::default(), open_area(MAP, 40, 40));
    let position = Vec2::new(10.0, 10.0);
    let mut perception = in_area(MAP, position);
    perception.ground_items.push(ground_item(42, position, "Chaos Orb"));

    for _ in 0..5 {
        assert_eq!(harness.tick(&perception), FarmState::Looting);
        harness.advance(1);
    }
    let blacklisted_at = harness.now();
    assert_eq!(harness.tick(&perception), FarmState::Looting);

    let clicks = harness
        .actions
        .iter()
        .filter(|action| matches!(action, Action::Click { .. }))
        .count();
    assert_eq!(clicks, 5);
    let until = blacklisted_at.after(Duration::from_secs(10));
    assert_eq!(blacklisted(&harness.events), vec![(position, until)]);

    let farmer = &harness.farmer;
    assert!(farmer.closest_valid_item(&perception, blacklisted_at).is_none());
    assert!(farmer
        .closest_valid_item(&perception, blacklisted_at.after(Duration::from_millis(9_999)))
        .is_none());
    assert_eq!(
        farmer
            .closest_valid_item(&perception, until)
            .map(|item| item.entity),
        Some(EntityId::new(42))
    );

    harness.advance(1);
    assert_eq!(harness.tick(&perception), FarmState::Starting);
}

#[test]
fn gold_and_hidden_labels_are_never_looted() {
    let mut harness = Harness::new(Settings::default(), open_area(MAP, 40, 40));
    let position = Vec2::new(10.0, 10.0);
    let mut perception = in_area(MAP, position);
    perception.ground_items.push(ground_item(1, position, "500 Gold"));
    let mut hidden = ground_item(2, position, "Exalted Orb");
    hidden.label_visible = false;
    perception.ground_items.push(hidden);

    assert_eq!(harness.tick(&perception), FarmState::FindingMonolith);
    assert!(harness
        .farmer
        .closest_valid_item(&perception, START)
        .is_none());
}

#[test]
fn stale_paths_are_dropped_and_their_destination_blacklisted() {
    let mut harness = Harness::new(Settings::default(), open_area(MAP, 1210, 3));
    let destination = Vec2::new(1201.0, 1.0);
    let entities = vec![trigger(destination, &[])];
    let mut player = Vec2::new(1.0, 1.0);

    let state = harness.tick(&with_entities(in_area(MAP, player), entities.clone()));
    assert_eq!(state, FarmState::Starting);
    assert_eq!(harness.farmer.anchor(), Some(destination));

    harness.advance(1);
    let planned_at = harness.now();
    let _ = harness.tick(&with_entities(in_area(MAP, player), entities.clone()));
    let path = harness.farmer.path().expect("path toward the trigger");
    assert_eq!(path.created_at(), planned_at);
    assert_eq!(path.timeout(), Duration::from_secs(12));

    for _ in 0..11 {
        harness.advance(1);
        player.x += 0.5;
        let _ = harness.tick(&with_entities(in_area(MAP, player), entities.clone()));
    }
    assert!(blacklisted(&harness.events).is_empty());
    assert_eq!(
        harness.farmer.path().map(|path| path.created_at()),
        Some(planned_at)
    );

    harness.advance(1);
    player.x += 0.5;
    let abandoned_at = harness.now();
    let _ = harness.tick(&with_entities(in_area(MAP, player), entities));

    let until = abandoned_at.after(Duration::from_secs(15));
    assert_eq!(blacklisted(&harness.events), vec![(destination, until)]);
    let cell = CellCoord::new(1201, 1);
    let blacklist = harness.farmer.path_blacklist();
    let just_before = Timestamp::from_offset(until.offset() - Duration::from_millis(1));
    assert!(blacklist.contains(&cell, just_before));
    assert!(!blacklist.contains(&cell, until));
    assert_eq!(
        harness.farmer.path().map(|path| path.created_at()),
        Some(abandoned_at)
    );
}

#[test]
fn last_wave_ending_in_combat_finishes_and_leaves() {
    let settings = Settings {
        max_waves: 2,
        ..Settings::default()
    };
    let combat_key = settings.combat_key.clone();
    let mut harness = Harness::new(settings, open_area(MAP, 40, 40));
    let player = Vec2::new(10.0, 10.0);
    let anchor = Vec2::new(12.0, 10.0);
    let running = |wave: i64| {
        with_entities(
            in_area(MAP, player),
            vec![
                trigger(anchor, &[("wave", wave), ("active", 1), ("goodbye", 0)]),
                monster(10, Vec2::new(15.0, 10.0), Rarity::Magic),
            ],
        )
    };

    assert_eq!(harness.tick(&running(1)), FarmState::Starting);
    harness.advance(1);
    assert_eq!(harness.tick(&running(1)), FarmState::ReturningToAnchor);
    harness.advance(1);
    assert_eq!(harness.tick(&running(1)), FarmState::CombatHold);
    harness.advance(1);
    harness.actions.clear();
    assert_eq!(harness.tick(&running(2)), FarmState::CombatHold);
    assert!(harness.actions.contains(&Action::MoveToward {
        target: Vec2::new(15.0, 10.0),
        key: combat_key,
    }));

    let ended = with_entities(
        in_area(MAP, player),
        vec![trigger(anchor, &[("wave", 2), ("active", 1), ("goodbye", 1)])],
    );
    harness.advance(1);
    assert_eq!(harness.tick(&ended), FarmState::Finished);
    assert_eq!(harness.farmer.waves().wave(), 2);

    harness.advance(5);
    assert_eq!(harness.tick(&ended), FarmState::Finished);
    harness.advance(1);
    assert_eq!(harness.tick(&ended), FarmState::LeavingMap);

    harness.advance(1);
    harness.actions.clear();
    let _ = harness.tick(&ended);
    match harness.actions.last() {
        Some(Action::Click {
            position,
            button: MouseButton::Right,
            modifier: None,
        }) => assert!(position.distance(Vec2::new(200.0, 200.0)) <= 15.0 * 2.0_f32.sqrt()),
        other => panic!("expected a right click to leave, got {other:?}"),
    }
}

#[test]
fn combat_seek_heads_for_the_heaviest_fight() {
    let mut harness = Harness::new(Settings::default(), open_area(MAP, 60, 60));
    let player = Vec2::new(10.0, 10.0);
    let rare = Vec2::new(10.0, 45.0);
    let perception = with_entities(
        in_area(MAP, player),
        vec![
            trigger(Vec2::new(12.0, 10.0), &[("wave", 1), ("active", 1), ("goodbye", 0)]),
            monster(10, Vec2::new(40.0, 10.0), Rarity::Normal),
            monster(11, Vec2::new(42.0, 10.0), Rarity::Normal),
            monster(12, rare, Rarity::Rare),
        ],
    );

    let mut states = Vec::new();
    for _ in 0..5 {
        states.push(harness.tick(&perception));
        harness.advance(1);
    }

    assert_eq!(
        states,
        vec![
            FarmState::Starting,
            FarmState::ReturningToAnchor,
            FarmState::CombatHold,
            FarmState::CombatSeek,
            FarmState::CombatSeek,
        ]
    );
    assert_eq!(
        harness.farmer.path().map(|path| path.destination()),
        Some(rare)
    );
    assert!(blacklisted(&harness.events).is_empty());
}

#[test]
fn stashing_gives_up_after_ten_attempts() {
    let mut harness = Harness::new(Settings::default(), open_area(MAP, 40, 40));
    let position = Vec2::new(10.0, 10.0);

    let mut looting = with_entities(in_area(MAP, position), vec![stash(position)]);
    looting.ground_items.push(ground_item(42, position, "Divine Orb"));
    assert_eq!(harness.tick(&looting), FarmState::Looting);

    let mut full = looting.clone();
    full.inventory = full_inventory(30);
    full.ui = UiView::new(window()).with_panel(Panel::Inventory, visible());
    harness.advance(1);
    assert_eq!(harness.tick(&full), FarmState::Stashing);

    harness.actions.clear();
    for _ in 0..10 {
        harness.advance(1);
        assert_eq!(harness.tick(&full), FarmState::Stashing);
    }
    let stash_clicks = harness
        .actions
        .iter()
        .filter(|action| {
            matches!(
                action,
                Action::Click {
                    modifier: Some(Modifier::Control),
                    ..
                }
            )
        })
        .count();
    assert_eq!(stash_clicks, 10);

    harness.advance(1);
    assert_eq!(harness.tick(&full), FarmState::Error);
    assert_eq!(
        harness.farmer.error(),
        Some(&FarmError::StashFull { attempts: 10 })
    );
    assert_eq!(
        harness.events.last(),
        Some(&FarmEvent::Failed {
            message: "failed to stash item after 10 attempts, stash may be full".to_owned(),
        })
    );

    harness.actions.clear();
    harness.advance(1);
    assert_eq!(harness.tick(&full), FarmState::Error);
    assert!(harness.actions.is_empty());
}

#[test]
fn dying_a_fourth_time_on_one_wave_is_fatal() {
    let mut harness = Harness::new(Settings::default(), open_area(MAP, 40, 40));
    let position = Vec2::new(10.0, 10.0);
    let alive = in_area(MAP, position);
    let mut dead = alive.clone();
    dead.player = PlayerSnapshot {
        position,
        is_alive: false,
        is_dead: true,
        buffs: Vec::new(),
    };
    dead.ui = UiView::new(window()).with_panel(Panel::ResurrectAtCheckpoint, visible());

    for death in 1..=3 {
        assert_eq!(harness.tick(&dead), FarmState::Died);
        assert_eq!(harness.farmer.waves().deaths(), death);
        harness.advance(4);
        assert_eq!(harness.tick(&alive), FarmState::ReturningToAnchor);
        harness.advance(4);
    }

    assert_eq!(harness.tick(&dead), FarmState::Error);
    assert_eq!(
        harness.farmer.error(),
        Some(&FarmError::TooManyDeaths { max: 3, wave: 0 })
    );
}

#[test]
fn resurrect_button_is_clicked_while_dead() {
    let mut harness = Harness::new(Settings::default(), open_area(MAP, 40, 40));
    let mut dead = in_area(MAP, Vec2::new(10.0, 10.0));
    dead.player.is_alive = false;
    dead.player.is_dead = true;
    let button = visible();
    dead.ui = UiView::new(window()).with_panel(Panel::ResurrectAtCheckpoint, button.clone());

    assert_eq!(harness.tick(&dead), FarmState::Died);
    match harness.actions.last() {
        Some(Action::Click {
            position,
            button: MouseButton::Left,
            ..
        }) => assert!(position.distance(button.bounds.center()) <= 15.0 * 2.0_f32.sqrt()),
        other => panic!("expected a resurrect click, got {other:?}"),
    }
}

#[test]
fn resurrected_player_loots_before_leaving_died() {
    let mut harness = Harness::new(Settings::default(), open_area(MAP, 40, 40));
    let position = Vec2::new(10.0, 10.0);
    let mut alive = in_area(MAP, position);
    alive.ground_items.push(ground_item(42, position, "Chaos Orb"));
    let mut dead = alive.clone();
    dead.player.is_alive = false;
    dead.player.is_dead = true;

    assert_eq!(harness.tick(&dead), FarmState::Died);
    harness.advance(1);
    assert_eq!(harness.tick(&dead), FarmState::Died);
    assert_eq!(harness.farmer.waves().deaths(), 1);

    harness.advance(1);
    harness.actions.clear();
    assert_eq!(harness.tick(&alive), FarmState::Looting);
    assert_eq!(harness.farmer.waves().deaths(), 1);
    assert!(matches!(
        harness.actions.last(),
        Some(Action::Click {
            button: MouseButton::Left,
            modifier: None,
            ..
        })
    ));
}

#[test]
fn exploration_heads_for_the_farthest_open_chunk() {
    let mut harness = Harness::new(Settings::default(), open_area(MAP, 40, 40));
    let perception = in_area(MAP, Vec2::new(6.0, 6.0));

    assert_eq!(harness.tick(&perception), FarmState::FindingMonolith);
    let target = Vec2::new(35.0, 35.0);
    assert_eq!(
        harness.farmer.path().map(|path| path.destination()),
        Some(target)
    );

    let status = harness.farmer.status();
    assert_eq!(status.navigation_target, Some(target));
    let text = status.to_string();
    assert!(text.contains("State: FindingMonolith"));
    assert!(text.contains("Wave: 0 / 15"));
    assert!(text.contains("Navigating To: (35.0, 35.0)"));
}

#[test]
fn revealed_chunks_are_not_explored() {
    let mut harness = Harness::new(Settings::default(), open_area(MAP, 40, 40));
    assert!(harness
        .farmer
        .area_mut()
        .set_revealed(ChunkCoord::new(3, 3), true));

    let _ = harness.tick(&in_area(MAP, Vec2::new(6.0, 6.0)));

    let destination = harness.farmer.path().map(|path| path.destination());
    assert!(
        destination == Some(Vec2::new(35.0, 25.0)) || destination == Some(Vec2::new(25.0, 35.0)),
        "unexpected exploration target {destination:?}"
    );
}

#[test]
fn fully_explored_area_without_trigger_is_fatal() {
    let mut harness = Harness::new(Settings::default(), open_area(MAP, 20, 20));
    let player = Vec2::new(5.0, 5.0);
    let _ = harness.farmer.area_mut().reveal_within(player, 100.0);
    assert_eq!(harness.farmer.area().completeness(), 1.0);

    let perception = in_area(MAP, player);
    for _ in 0..10 {
        assert_eq!(harness.tick(&perception), FarmState::FindingMonolith);
        harness.advance(1);
    }
    harness.advance(1);
    assert_eq!(harness.tick(&perception), FarmState::Error);
    assert_eq!(harness.farmer.error(), Some(&FarmError::TriggerNotFound));
}

#[test]
fn unreachable_chunks_count_as_explored() {
    let row = format!("{}{}{}", ".".repeat(10), "#".repeat(10), ".".repeat(10));
    let map = vec![row; 10].join("\n");
    let area = AreaContext::from_grid(MAP, WalkabilityGrid::from_ascii(&map), 10, START);
    let mut harness = Harness::new(Settings::default(), area);
    assert!(harness
        .farmer
        .area_mut()
        .set_revealed(ChunkCoord::new(0, 0), true));
    assert_eq!(harness.farmer.area().completeness(), 0.5);

    let perception = in_area(MAP, Vec2::new(5.0, 5.0));
    for _ in 0..10 {
        assert_eq!(harness.tick(&perception), FarmState::FindingMonolith);
        assert!(harness.farmer.path().is_none());
        harness.advance(1);
    }
    harness.advance(1);
    assert_eq!(harness.tick(&perception), FarmState::Error);
    assert_eq!(harness.farmer.error(), Some(&FarmError::TriggerNotFound));
}

#[test]
fn area_changes_reset_the_run() {
    let mut harness = Harness::new(Settings::default(), open_area(MAP, 40, 40));
    let player = Vec2::new(10.0, 10.0);
    let perception = with_entities(
        in_area(MAP, player),
        vec![trigger(Vec2::new(12.0, 10.0), &[("wave", 3)])],
    );
    assert_eq!(harness.tick(&perception), FarmState::Starting);
    assert_eq!(harness.farmer.waves().wave(), 3);

    harness
        .farmer
        .on_area_changed(open_area(HIDEOUT, 20, 20), &mut harness.events);
    assert_eq!(harness.farmer.state(), FarmState::StartingNewMap);
    assert_eq!(
        harness.events.last(),
        Some(&FarmEvent::StateChanged {
            from: FarmState::Starting,
            to: FarmState::StartingNewMap,
            at: START,
        })
    );

    harness
        .farmer
        .on_area_changed(open_area(MAP, 40, 40), &mut harness.events);
    assert_eq!(harness.farmer.state(), FarmState::FindingMonolith);
    assert_eq!(harness.farmer.waves().wave(), 0);
    assert_eq!(harness.farmer.anchor(), None);
}

#[test]
fn dying_into_the_hideout_walks_back_through_the_portal() {
    let mut harness = Harness::new(Settings::default(), open_area(MAP, 40, 40));
    let mut dead = in_area(MAP, Vec2::new(10.0, 10.0));
    dead.player.is_alive = false;
    dead.player.is_dead = true;
    assert_eq!(harness.tick(&dead), FarmState::Died);

    harness
        .farmer
        .on_area_changed(open_area(HIDEOUT, 20, 20), &mut harness.events);
    assert_eq!(harness.farmer.state(), FarmState::EnteringMap);
}

#[test]
fn missing_map_device_is_fatal_after_the_search_timeout() {
    let mut harness = Harness::new(Settings::default(), open_area(HIDEOUT, 20, 20));
    assert_eq!(harness.farmer.state(), FarmState::StartingNewMap);
    let perception = in_area(HIDEOUT, Vec2::new(5.0, 5.0));

    for _ in 0..=10 {
        assert_eq!(harness.tick(&perception), FarmState::StartingNewMap);
        harness.advance(1);
    }
    assert_eq!(harness.tick(&perception), FarmState::Error);
    assert_eq!(
        harness.farmer.error(),
        Some(&FarmError::MapDeviceNotFound { seconds: 10 })
    );
}

#[test]
fn map_device_is_loaded_and_activated() {
    let mut harness = Harness::new(Settings::default(), open_area(HIDEOUT, 20, 20));
    let mut perception = in_area(HIDEOUT, Vec2::new(5.0, 5.0));
    let fragment = UiElement {
        visible: true,
        bounds: ScreenRect::new(Vec2::new(300.0, 300.0), Vec2::splat(40.0)),
        texture: Some("Art/2DItems/Maps/DeliriumFragment.dds".to_owned()),
    };
    perception.ui = UiView::new(window())
        .with_panel(Panel::MapDevice, visible())
        .with_map_device_slots(vec![fragment]);

    assert_eq!(harness.tick(&perception), FarmState::StartingNewMap);
    assert!(matches!(
        harness.actions.last(),
        Some(Action::Click {
            modifier: Some(Modifier::Control),
            ..
        })
    ));

    perception.ui = perception
        .ui
        .clone()
        .with_panel(Panel::MapDeviceActivate, visible());
    harness.advance(1);
    assert_eq!(harness.tick(&perception), FarmState::EnteringMap);
}

#[test]
fn map_device_without_fragments_is_fatal() {
    let mut harness = Harness::new(Settings::default(), open_area(HIDEOUT, 20, 20));
    let mut perception = in_area(HIDEOUT, Vec2::new(5.0, 5.0));
    perception.ui = UiView::new(window()).with_panel(Panel::MapDevice, visible());

    assert_eq!(harness.tick(&perception), FarmState::Error);
    assert_eq!(harness.farmer.error(), Some(&FarmError::NoMapFragments));
}

#[test]
fn instances_are_abandoned_after_twenty_minutes() {
    let mut harness = Harness::new(Settings::default(), open_area(MAP, 40, 40));
    let perception = in_area(MAP, Vec2::new(6.0, 6.0));
    assert_eq!(harness.tick(&perception), FarmState::FindingMonolith);

    harness.clock.set(START.after(Duration::from_secs(20 * 60)));
    assert_eq!(harness.tick(&perception), FarmState::FindingMonolith);

    harness.advance(1);
    assert_eq!(harness.tick(&perception), FarmState::LeavingMap);
}

#[test]
fn expired_instance_yields_to_looting_until_items_are_gone() {
    let mut harness = Harness::new(Settings::default(), open_area(MAP, 40, 40));
    let position = Vec2::new(10.0, 10.0);
    let empty = in_area(MAP, position);
    let mut loot = empty.clone();
    loot.ground_items.push(ground_item(42, position, "Chaos Orb"));
    assert_eq!(harness.tick(&empty), FarmState::FindingMonolith);

    harness.clock.set(START.after(Duration::from_secs(20 * 60 + 1)));
    let mut states = Vec::new();
    for _ in 0..3 {
        states.push(harness.tick(&loot));
        harness.advance(1);
    }
    assert_eq!(
        states,
        vec![
            FarmState::LeavingMap,
            FarmState::Looting,
            FarmState::LeavingMap,
        ]
    );

    harness.actions.clear();
    assert_eq!(harness.tick(&empty), FarmState::LeavingMap);
    assert!(matches!(
        harness.actions.last(),
        Some(Action::Click {
            button: MouseButton::Right,
            ..
        })
    ));
    harness.advance(4);
    assert_eq!(harness.tick(&empty), FarmState::LeavingMap);
}
