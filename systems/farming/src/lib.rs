#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Farming state machine that sequences waves, combat, looting and stashing.
//!
//! The [`Farmer`] is ticked once per host frame with a fresh [`Perception`].
//! Each tick runs a fixed series of global guards, then the handler of the
//! current [`FarmState`]. Handlers never block: every wait is a deadline
//! compared against the injected [`Clock`], and every side effect is an
//! [`Action`] pushed to the caller's buffer.

mod error;
mod retry;
mod states;
mod status;
mod wave;

use std::cmp::Reverse;
use std::collections::HashSet;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, info, warn};
use wavefarm_core::{
    metadata, Action, CellCoord, Clock, EntityId, EntitySnapshot, FarmEvent, FarmState,
    GroundItem, Modifier, MouseButton, Perception, Settings, Timestamp, Vec2,
};
use wavefarm_system_movement::{plan_path, Path, PathFollower};
use wavefarm_world::{AreaContext, ChunkCoord};

pub use error::FarmError;
pub use retry::{AttemptCounter, Blacklist};
pub use status::FarmerStatus;
pub use wave::WaveTracker;

const MAX_LOOT_ATTEMPTS: u32 = 5;
const ITEM_BLACKLIST_TTL: Duration = Duration::from_secs(10);
const MAX_STASH_ATTEMPTS: u32 = 10;
const MAX_WAVE_DEATHS: u32 = 3;
const INSTANCE_TIMEOUT: Duration = Duration::from_secs(20 * 60);
const PATH_BLACKLIST_TTL: Duration = Duration::from_secs(15);
const SEARCH_TIMEOUT: Duration = Duration::from_secs(10);
const EXPLORATION_COOLDOWN: Duration = Duration::from_secs(10);
const REPOSITION_DELAY: Duration = Duration::from_secs(2);
const SPELL_CAST_INTERVAL: Duration = Duration::from_millis(2200);
const MOVEMENT_STALL: Duration = Duration::from_secs(2);
const NUDGE_AFTER: Duration = Duration::from_secs(7);
const STATE_STUCK_AFTER: Duration = Duration::from_secs(15);
const SUPPORT_DELAY: Duration = Duration::from_secs(40);
const LOOT_LINGER: Duration = Duration::from_secs(1);

const DEFAULT_ACTION_DELAY: Duration = Duration::from_millis(150);
const ACTION_JITTER_MS: std::ops::Range<u64> = 50..150;
const CLICK_JITTER_PX: i32 = 15;

/// Outcome of a per-state handler.
#[derive(Debug)]
enum Transition {
    Stay,
    To(FarmState),
    Fail(FarmError),
}

/// Inputs and output buffers of a single tick.
struct Frame<'a> {
    perception: &'a Perception,
    now: Timestamp,
    actions: &'a mut Vec<Action>,
    events: &'a mut Vec<FarmEvent>,
}

/// Autonomous farmer driving the wave loop for one character.
#[derive(Debug)]
pub struct Farmer<C, R> {
    clock: C,
    rng: R,
    settings: Settings,
    area: AreaContext,
    state: FarmState,
    error: Option<FarmError>,
    path: Option<Path>,
    follower: PathFollower,
    waves: WaveTracker,
    anchor: Option<Vec2>,
    stash_position: Option<Vec2>,
    item_blacklist: Blacklist<EntityId>,
    path_blacklist: Blacklist<CellCoord>,
    exploration_cooldowns: Blacklist<ChunkCoord>,
    unreachable_chunks: HashSet<ChunkCoord>,
    loot_attempts: AttemptCounter<EntityId>,
    stash_attempts: AttemptCounter<EntityId>,
    next_action_at: Timestamp,
    next_cast_at: Timestamp,
    stop_looting_at: Timestamp,
    last_monster_in_range_at: Timestamp,
    state_changed_at: Timestamp,
    search_started_at: Timestamp,
    instance_started_at: Timestamp,
    last_position: Vec2,
    last_moved_at: Timestamp,
    trigger_visible: bool,
    item_visible: bool,
}

impl<C: Clock, R: Rng> Farmer<C, R> {
    /// Creates a farmer for the area the player currently stands in.
    ///
    /// In the hideout the farmer starts by opening a new map; anywhere else
    /// it starts looking for the wave trigger.
    #[must_use]
    pub fn new(settings: Settings, area: AreaContext, clock: C, rng: R) -> Self {
        let now = clock.now();
        let in_hideout = area.area().is_hideout;
        let mut farmer = Self {
            clock,
            rng,
            settings,
            area,
            state: FarmState::StartingNewMap,
            error: None,
            path: None,
            follower: PathFollower::new(),
            waves: WaveTracker::default(),
            anchor: None,
            stash_position: None,
            item_blacklist: Blacklist::new(ITEM_BLACKLIST_TTL),
            path_blacklist: Blacklist::new(PATH_BLACKLIST_TTL),
            exploration_cooldowns: Blacklist::new(EXPLORATION_COOLDOWN),
            unreachable_chunks: HashSet::new(),
            loot_attempts: AttemptCounter::default(),
            stash_attempts: AttemptCounter::default(),
            next_action_at: Timestamp::ZERO,
            next_cast_at: Timestamp::ZERO,
            stop_looting_at: Timestamp::ZERO,
            last_monster_in_range_at: Timestamp::ZERO,
            state_changed_at: now,
            search_started_at: now,
            instance_started_at: now,
            last_position: Vec2::ZERO,
            last_moved_at: now,
            trigger_visible: false,
            item_visible: false,
        };

        if !in_hideout {
            farmer.reset_for_new_map();
            farmer.state = FarmState::FindingMonolith;
        }
        farmer
    }

    /// Advances the state machine by one step.
    ///
    /// Input requests are appended to `out_actions` and observability events
    /// to `out_events`; neither buffer is cleared.
    pub fn tick(
        &mut self,
        perception: &Perception,
        out_actions: &mut Vec<Action>,
        out_events: &mut Vec<FarmEvent>,
    ) {
        let now = self.clock.now();
        let player = perception.player.position;

        if player != self.last_position {
            self.last_position = player;
            self.last_moved_at = now;
        }
        if now.saturating_since(self.last_moved_at) > MOVEMENT_STALL
            && self
                .path
                .as_ref()
                .is_some_and(|path| path.age(now) > MOVEMENT_STALL)
        {
            debug!("dropping path after movement stalled");
            self.path = None;
        }

        if self.state.is_terminal() || now < self.next_action_at {
            return;
        }

        let mut frame = Frame {
            perception,
            now,
            actions: out_actions,
            events: out_events,
        };

        if now.saturating_since(self.last_moved_at) > NUDGE_AFTER {
            warn!(state = %self.state, "no movement, nudging");
            self.last_moved_at = now;
            self.nudge(&mut frame);
        }

        if self.instance_expired(perception, now) && self.state != FarmState::LeavingMap {
            warn!(
                minutes = INSTANCE_TIMEOUT.as_secs() / 60,
                "instance timed out, abandoning run"
            );
            self.set_state(FarmState::LeavingMap, now, frame.events);
            return;
        }

        if perception.player.is_dead() && self.state != FarmState::Died {
            let deaths = self.waves.record_death();
            warn!(deaths, wave = self.waves.wave(), "player died");
            self.set_state(FarmState::Died, now, frame.events);
        }

        if now.saturating_since(self.state_changed_at) > STATE_STUCK_AFTER {
            warn!(state = %self.state, "state unchanged for too long, recovering");
            self.path = None;
            self.exploration_cooldowns.clear();
            self.path_blacklist.clear();
            self.stash_position = perception.entities.stash().map(|stash| stash.position);
            self.nudge(&mut frame);
            self.state_changed_at = now;
        }

        self.drop_stale_path(&mut frame);
        self.waves.observe(perception.entities.wave_trigger(), now);
        if self.stash_position.is_none() {
            self.stash_position = perception.entities.stash().map(|stash| stash.position);
        }
        self.item_blacklist.prune(now);

        let item_available = self.closest_valid_item(perception, now).is_some();
        self.item_visible = item_available;
        self.trigger_visible = perception.entities.wave_trigger().is_some();

        if item_available
            && !perception.player.is_dead()
            && !self.inventory_full(perception)
            && !matches!(self.state, FarmState::Looting | FarmState::Stashing)
        {
            if self.state == FarmState::LeavingMap && self.instance_expired(perception, now) {
                debug!("looting before leaving the expired instance");
            }
            self.set_state(FarmState::Looting, now, frame.events);
        }

        let transition = match self.state {
            FarmState::FindingMonolith => self.handle_finding_trigger(&mut frame),
            FarmState::LeavingMap => self.handle_leaving_map(&mut frame),
            FarmState::Starting => self.handle_starting(&mut frame),
            FarmState::StartingNewMap => self.handle_starting_new_map(&mut frame),
            FarmState::EnteringMap => self.handle_entering_map(&mut frame),
            FarmState::ReturningToAnchor => self.handle_returning_to_anchor(&mut frame),
            FarmState::CombatHold => self.handle_combat_hold(&mut frame),
            FarmState::CombatSeek => self.handle_combat_seek(&mut frame),
            FarmState::Exploring => self.handle_exploring(&mut frame),
            FarmState::Looting => self.handle_looting(&mut frame),
            FarmState::Stashing => self.handle_stashing(&mut frame),
            FarmState::Died => self.handle_died(&mut frame),
            FarmState::Finished => self.handle_finished(&mut frame),
            FarmState::Error => Transition::Stay,
        };

        match transition {
            Transition::Stay => {}
            Transition::To(state) => self.set_state(state, now, frame.events),
            Transition::Fail(error) => self.fail(error, now, frame.events),
        }
    }

    /// Installs the context of a freshly entered area.
    ///
    /// Entering the hideout leads to opening a new map, or straight back into
    /// the portal after a death. Entering anything else resets the per-map
    /// bookkeeping and starts looking for the wave trigger.
    pub fn on_area_changed(&mut self, area: AreaContext, out_events: &mut Vec<FarmEvent>) {
        let now = self.clock.now();
        let in_hideout = area.area().is_hideout;
        info!(area = area.area().hash, hideout = in_hideout, "area changed");
        self.area = area;
        self.path = None;

        if in_hideout {
            let next = if self.state == FarmState::Died {
                FarmState::EnteringMap
            } else {
                FarmState::StartingNewMap
            };
            self.set_state(next, now, out_events);
        } else {
            self.reset_for_new_map();
            self.set_state(FarmState::FindingMonolith, now, out_events);
        }
    }

    /// Forgets all per-map progress: waves, deaths, anchor, blacklists and stash.
    pub fn reset_for_new_map(&mut self) {
        self.waves.reset();
        self.anchor = None;
        self.stash_position = None;
        self.exploration_cooldowns.clear();
        self.unreachable_chunks.clear();
        self.path_blacklist.clear();
        self.instance_started_at = self.clock.now();
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> FarmState {
        self.state
    }

    /// Reason for the terminal error state, if the run failed.
    #[must_use]
    pub const fn error(&self) -> Option<&FarmError> {
        self.error.as_ref()
    }

    /// Wave progress.
    #[must_use]
    pub const fn waves(&self) -> &WaveTracker {
        &self.waves
    }

    /// Rally point next to the wave trigger.
    #[must_use]
    pub const fn anchor(&self) -> Option<Vec2> {
        self.anchor
    }

    /// Path currently being followed.
    #[must_use]
    pub const fn path(&self) -> Option<&Path> {
        self.path.as_ref()
    }

    /// Navigation context of the current area.
    #[must_use]
    pub const fn area(&self) -> &AreaContext {
        &self.area
    }

    /// Mutable navigation context, used by the host to reveal chunks.
    pub fn area_mut(&mut self) -> &mut AreaContext {
        &mut self.area
    }

    /// Settings the farmer was created with.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Ground items temporarily skipped after failed pickups.
    #[must_use]
    pub const fn item_blacklist(&self) -> &Blacklist<EntityId> {
        &self.item_blacklist
    }

    /// Destinations temporarily skipped after stale paths.
    #[must_use]
    pub const fn path_blacklist(&self) -> &Blacklist<CellCoord> {
        &self.path_blacklist
    }

    /// Closest ground item worth picking up at `now`.
    ///
    /// The label must be visible with readable text that does not name a gold
    /// pile, and the item must not be blacklisted.
    #[must_use]
    pub fn closest_valid_item<'p>(
        &self,
        perception: &'p Perception,
        now: Timestamp,
    ) -> Option<&'p GroundItem> {
        perception
            .ground_items
            .iter()
            .filter(|item| {
                item.label_visible
                    && item
                        .label_text
                        .as_deref()
                        .is_some_and(|text| !text.ends_with(metadata::GOLD_LABEL_SUFFIX))
                    && !self.item_blacklist.contains(&item.entity, now)
            })
            .min_by(|left, right| left.distance.total_cmp(&right.distance))
    }

    /// Summary of the farmer for status displays.
    #[must_use]
    pub fn status(&self) -> FarmerStatus {
        FarmerStatus {
            state: self.state,
            goal: status::goal(self.state),
            action: status::action(
                self.state,
                self.has_waypoints(),
                self.trigger_visible,
                self.item_visible,
            ),
            wave: self.waves.wave(),
            max_waves: self.settings.max_waves,
            wave_active: self.waves.is_active(),
            navigation_target: self.path.as_ref().map(Path::destination),
            path_nodes: self.path.as_ref().map(Path::len),
            anchor: self.anchor,
            error: self.error.as_ref().map(ToString::to_string),
        }
    }

    fn set_state(&mut self, to: FarmState, now: Timestamp, events: &mut Vec<FarmEvent>) {
        let from = self.state;
        if from == to {
            return;
        }

        info!(
            %from,
            %to,
            in_state_ms = now.saturating_since(self.state_changed_at).as_millis() as u64,
            "state changed"
        );
        self.state = to;
        self.path = None;
        self.state_changed_at = now;
        self.search_started_at = now;
        events.push(FarmEvent::StateChanged { from, to, at: now });
    }

    fn fail(&mut self, error: FarmError, now: Timestamp, events: &mut Vec<FarmEvent>) {
        warn!(%error, state = %self.state, "farming halted");
        let message = error.to_string();
        self.error = Some(error);
        self.set_state(FarmState::Error, now, events);
        events.push(FarmEvent::Failed { message });
    }

    fn instance_expired(&self, perception: &Perception, now: Timestamp) -> bool {
        !perception.area.is_hideout
            && now.saturating_since(self.instance_started_at) > INSTANCE_TIMEOUT
    }

    fn max_waves_reached(&self) -> bool {
        self.waves.wave() >= i64::from(self.settings.max_waves)
    }

    fn has_waypoints(&self) -> bool {
        self.path.as_ref().is_some_and(|path| path.next().is_some())
    }

    fn inventory_full(&self, perception: &Perception) -> bool {
        let threshold = usize::try_from(self.settings.store_inventory_count).unwrap_or(usize::MAX);
        perception.entities.stash().is_some() && perception.storable_item_count() >= threshold
    }

    fn delay(&mut self, base: Duration, now: Timestamp) {
        let jitter = Duration::from_millis(self.rng.gen_range(ACTION_JITTER_MS));
        self.next_action_at = now.after(base + jitter);
    }

    fn plan_to(&mut self, destination: Vec2, frame: &Frame<'_>) -> bool {
        self.path = plan_path(
            &self.area,
            frame.perception.player.position,
            destination,
            self.settings.node_radius(),
            frame.now,
        );
        self.path.is_some()
    }

    fn follow(&mut self, frame: &mut Frame<'_>) -> bool {
        match self.path.as_mut() {
            Some(path) => self.follower.follow(
                path,
                frame.perception.player.position,
                frame.now,
                &mut self.rng,
                &self.settings,
                frame.actions,
            ),
            None => false,
        }
    }

    fn click(
        &mut self,
        position: Vec2,
        button: MouseButton,
        modifier: Option<Modifier>,
        frame: &mut Frame<'_>,
    ) {
        let jitter = Vec2::new(
            self.rng.gen_range(-CLICK_JITTER_PX..CLICK_JITTER_PX) as f32,
            self.rng.gen_range(-CLICK_JITTER_PX..CLICK_JITTER_PX) as f32,
        );
        frame.actions.push(Action::Click {
            position: position + jitter,
            button,
            modifier,
        });
    }

    fn nudge(&mut self, frame: &mut Frame<'_>) {
        let target = self
            .area
            .random_nearby_walkable(frame.perception.player.position, &mut self.rng);
        frame.actions.push(Action::MoveToward {
            target,
            key: self.settings.blink_key.clone(),
        });
    }

    fn drop_stale_path(&mut self, frame: &mut Frame<'_>) {
        let Some(path) = self.path.as_ref() else {
            return;
        };
        if !path.is_stale(frame.now) {
            return;
        }

        let destination = path.destination();
        self.path = None;
        if let Some(cell) = CellCoord::from_point(destination) {
            let until = self.path_blacklist.insert(cell, frame.now);
            debug!(?destination, %until, "path went stale, blacklisting destination");
            frame.events.push(FarmEvent::Blacklisted {
                position: destination,
                until,
            });
        }
    }

    fn cast_combat(&mut self, monsters: &[&EntitySnapshot], frame: &mut Frame<'_>) {
        if !frame
            .perception
            .player
            .has_buff(&self.settings.sustain_buff)
        {
            frame.actions.push(Action::KeyPress {
                key: self.settings.sustain_key.clone(),
            });
        }

        if frame.now <= self.next_cast_at {
            return;
        }
        let Some(target) = monsters
            .iter()
            .min_by_key(|monster| Reverse(monster.rarity.fight_weight()))
        else {
            return;
        };

        frame.actions.push(Action::MoveToward {
            target: target.position,
            key: self.settings.combat_key.clone(),
        });
        let jitter = Duration::from_millis(self.rng.gen_range(ACTION_JITTER_MS));
        self.next_cast_at = frame.now.after(SPELL_CAST_INTERVAL + jitter);
    }
}
