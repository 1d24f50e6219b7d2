//! Per-state handlers of the farming loop.

use std::cmp::Reverse;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, info};
use wavefarm_core::{
    metadata, Action, CellCoord, Clock, EntitySnapshot, FarmEvent, FarmState, KeyBinding,
    Modifier, MouseButton, Panel, Timestamp, Vec2,
};
use wavefarm_world::Chunk;

use crate::{
    FarmError, Farmer, Frame, Transition, DEFAULT_ACTION_DELAY, LOOT_LINGER, MAX_LOOT_ATTEMPTS,
    MAX_STASH_ATTEMPTS, MAX_WAVE_DEATHS, REPOSITION_DELAY, SEARCH_TIMEOUT, SUPPORT_DELAY,
};

const PICKUP_DELAY: Duration = Duration::from_millis(500);
const STASH_WALK_DELAY: Duration = Duration::from_millis(250);
const PORTAL_DELAY: Duration = Duration::from_secs(1);
const LEAVE_DELAY: Duration = Duration::from_secs(3);
const RESURRECT_DELAY: Duration = Duration::from_secs(3);
const MAP_OPEN_DELAY: Duration = Duration::from_secs(5);
const PORTAL_ENTER_DISTANCE: f32 = 15.0;
const LEAVE_CLICK: Vec2 = Vec2::new(200.0, 200.0);

impl<C: Clock, R: Rng> Farmer<C, R> {
    pub(crate) fn handle_finding_trigger(&mut self, frame: &mut Frame<'_>) -> Transition {
        let perception = frame.perception;
        if let Some(trigger) = perception.entities.wave_trigger() {
            info!(position = ?trigger.position, "wave trigger found, anchoring");
            self.anchor = Some(trigger.position);
            return Transition::To(FarmState::Starting);
        }

        if !self.has_waypoints() && !self.plan_exploration(frame) {
            let searching = frame.now.saturating_since(self.search_started_at);
            if self.exploration_exhausted() && searching > SEARCH_TIMEOUT {
                return Transition::Fail(FarmError::TriggerNotFound);
            }
        }

        let _ = self.follow(frame);
        self.delay(DEFAULT_ACTION_DELAY, frame.now);
        Transition::Stay
    }

    pub(crate) fn handle_exploring(&mut self, frame: &mut Frame<'_>) -> Transition {
        let perception = frame.perception;
        if perception.entities.hostile_monsters().next().is_some() {
            return Transition::To(FarmState::CombatHold);
        }
        if !self.waves.is_active() && self.waves.wave() > 0 {
            return Transition::To(FarmState::Looting);
        }

        if !self.has_waypoints() && !self.plan_exploration(frame) {
            debug!("nothing left to explore");
            return Transition::To(FarmState::Looting);
        }

        let _ = self.follow(frame);
        self.delay(DEFAULT_ACTION_DELAY, frame.now);
        Transition::Stay
    }

    pub(crate) fn handle_starting(&mut self, frame: &mut Frame<'_>) -> Transition {
        let perception = frame.perception;
        if self.max_waves_reached() {
            return Transition::To(FarmState::Finished);
        }
        if self.waves.is_active() {
            return Transition::To(FarmState::ReturningToAnchor);
        }
        if self.item_visible && !self.inventory_full(perception) {
            return Transition::To(FarmState::Looting);
        }
        if let Some(ended) = self.waves.ended_at() {
            if frame.now < ended.after(self.wave_end_delay()) {
                return Transition::Stay;
            }
        }

        let Some(trigger) = perception
            .entities
            .wave_trigger()
            .filter(|trigger| trigger.is_targetable)
        else {
            if frame.now.saturating_since(self.search_started_at) > SEARCH_TIMEOUT {
                return Transition::To(FarmState::Exploring);
            }
            return Transition::Stay;
        };

        if self.anchor.is_none() {
            self.anchor = Some(trigger.position);
        }
        if perception.player.position.distance(trigger.position) > self.settings.node_radius() {
            if !self.has_waypoints() {
                let _ = self.plan_to(trigger.position, frame);
            }
            let _ = self.follow(frame);
        } else {
            self.path = None;
            if let Some(screen) = trigger.screen_position {
                debug!(wave = self.waves.wave() + 1, "starting wave");
                self.click(screen, MouseButton::Left, None, frame);
            }
        }

        self.delay(DEFAULT_ACTION_DELAY, frame.now);
        Transition::Stay
    }

    pub(crate) fn handle_returning_to_anchor(&mut self, frame: &mut Frame<'_>) -> Transition {
        let Some(anchor) = self.anchor else {
            return Transition::To(FarmState::CombatHold);
        };
        if frame.perception.player.position.distance(anchor) <= self.settings.node_radius() {
            return Transition::To(FarmState::CombatHold);
        }

        if !self.has_waypoints() {
            let _ = self.plan_to(anchor, frame);
        }
        let _ = self.follow(frame);
        self.delay(DEFAULT_ACTION_DELAY, frame.now);
        Transition::Stay
    }

    pub(crate) fn handle_combat_hold(&mut self, frame: &mut Frame<'_>) -> Transition {
        let perception = frame.perception;
        let player = perception.player.position;
        if !self.waves.is_active() {
            return if self.max_waves_reached() {
                Transition::To(FarmState::Finished)
            } else {
                Transition::To(FarmState::Looting)
            };
        }

        if self.settings.mercenary_support
            && !self.waves.support_used()
            && frame.now > self.waves.started_at().after(SUPPORT_DELAY)
        {
            info!(wave = self.waves.wave(), "calling for support");
            frame.actions.push(Action::KeyPress {
                key: self.settings.mercenary_key.clone(),
            });
            self.waves.use_support();
        }

        let monsters: Vec<&EntitySnapshot> = perception.entities.hostile_monsters().collect();
        if monsters.is_empty() {
            return Transition::To(FarmState::Exploring);
        }

        let combat_radius = self.settings.combat_radius();
        let in_range: Vec<&EntitySnapshot> = monsters
            .iter()
            .copied()
            .filter(|monster| monster.position.distance(player) < combat_radius)
            .collect();
        self.cast_combat(&in_range, frame);

        if in_range.is_empty() {
            if frame.now.saturating_since(self.last_monster_in_range_at) > REPOSITION_DELAY {
                return Transition::To(FarmState::CombatSeek);
            }
            if let Some(anchor) = self.anchor {
                if player.distance(anchor) > self.settings.node_radius() && !self.has_waypoints() {
                    let _ = self.plan_to(anchor, frame);
                }
            }
        } else {
            self.last_monster_in_range_at = frame.now;
            self.path = None;
        }

        let _ = self.follow(frame);
        self.delay(DEFAULT_ACTION_DELAY, frame.now);
        Transition::Stay
    }

    pub(crate) fn handle_combat_seek(&mut self, frame: &mut Frame<'_>) -> Transition {
        let perception = frame.perception;
        if !self.waves.is_active() {
            return Transition::To(FarmState::Looting);
        }

        let monsters: Vec<&EntitySnapshot> = perception.entities.hostile_monsters().collect();
        if monsters.is_empty() {
            return Transition::To(FarmState::Exploring);
        }
        self.cast_combat(&monsters, frame);

        if !self.has_waypoints() && !self.seek_heaviest_fight(&monsters, frame) {
            debug!("no reachable fight, exploring");
            return Transition::To(FarmState::Exploring);
        }

        let arrived = self.path.as_ref().is_some_and(|path| {
            perception.player.position.distance(path.destination()) < self.settings.combat_radius()
        });
        if arrived {
            return Transition::To(FarmState::CombatHold);
        }

        let _ = self.follow(frame);
        self.delay(DEFAULT_ACTION_DELAY, frame.now);
        Transition::Stay
    }

    pub(crate) fn handle_looting(&mut self, frame: &mut Frame<'_>) -> Transition {
        let perception = frame.perception;
        if self.inventory_full(perception) {
            return Transition::To(FarmState::Stashing);
        }
        self.delay(DEFAULT_ACTION_DELAY, frame.now);

        let Some(item) = self.closest_valid_item(perception, frame.now) else {
            if frame.now <= self.stop_looting_at {
                return Transition::Stay;
            }
            self.loot_attempts.reset();
            return if self.max_waves_reached() {
                Transition::To(FarmState::LeavingMap)
            } else {
                Transition::To(FarmState::Starting)
            };
        };

        if perception.player.position.distance(item.position) > self.settings.node_radius() {
            if !self.has_waypoints() {
                let _ = self.plan_to(item.position, frame);
            }
            let _ = self.follow(frame);
            return Transition::Stay;
        }

        let attempts = self.loot_attempts.record(item.entity);
        if attempts > MAX_LOOT_ATTEMPTS {
            let until = self.item_blacklist.insert(item.entity, frame.now);
            debug!(item = item.entity.get(), attempts, %until, "pickup keeps failing, skipping item");
            frame.events.push(FarmEvent::Blacklisted {
                position: item.position,
                until,
            });
            self.loot_attempts.reset();
            self.path = None;
            return Transition::Stay;
        }

        self.click(item.label_bounds.center(), MouseButton::Left, None, frame);
        self.delay(PICKUP_DELAY, frame.now);
        self.stop_looting_at = frame.now.after(LOOT_LINGER);
        Transition::Stay
    }

    pub(crate) fn handle_stashing(&mut self, frame: &mut Frame<'_>) -> Transition {
        let perception = frame.perception;
        if self.stash_position.is_none() {
            self.stash_position = perception.entities.stash().map(|stash| stash.position);
        }
        let Some(stash) = self.stash_position else {
            return Transition::Fail(FarmError::StashNotFound);
        };

        if perception.player.position.distance(stash) > self.settings.node_radius() {
            if !self.has_waypoints() {
                let _ = self.plan_to(stash, frame);
            }
            let _ = self.follow(frame);
            self.delay(STASH_WALK_DELAY, frame.now);
            return Transition::Stay;
        }

        let inventory_open = perception.ui.is_visible(Panel::Inventory);
        let Some(item) = perception.inventory.iter().find(|item| item.is_storable()) else {
            self.stash_attempts.reset();
            if inventory_open {
                frame.actions.push(Action::KeyPress {
                    key: KeyBinding::ESCAPE,
                });
            }
            return Transition::To(FarmState::Looting);
        };

        if self.stash_attempts.count() >= MAX_STASH_ATTEMPTS {
            return Transition::Fail(FarmError::StashFull {
                attempts: self.stash_attempts.count(),
            });
        }

        if !inventory_open {
            if let Some(screen) = perception.entities.stash().and_then(|stash| stash.screen_position) {
                self.click(screen, MouseButton::Left, None, frame);
            }
            self.delay(DEFAULT_ACTION_DELAY, frame.now);
            return Transition::Stay;
        }

        let _ = self.stash_attempts.record(item.id);
        self.click(
            item.bounds.center(),
            MouseButton::Left,
            Some(Modifier::Control),
            frame,
        );
        self.delay(DEFAULT_ACTION_DELAY, frame.now);
        Transition::Stay
    }

    pub(crate) fn handle_died(&mut self, frame: &mut Frame<'_>) -> Transition {
        let perception = frame.perception;
        if self.waves.deaths() > MAX_WAVE_DEATHS {
            return Transition::Fail(FarmError::TooManyDeaths {
                max: MAX_WAVE_DEATHS,
                wave: self.waves.wave(),
            });
        }

        if !perception.player.is_dead() {
            return if perception.player.is_alive {
                Transition::To(FarmState::ReturningToAnchor)
            } else {
                Transition::Stay
            };
        }

        if let Some(button) = perception
            .ui
            .panel(Panel::ResurrectAtCheckpoint)
            .filter(|button| button.visible)
        {
            self.click(button.bounds.center(), MouseButton::Left, None, frame);
            self.delay(RESURRECT_DELAY, frame.now);
        }
        Transition::Stay
    }

    pub(crate) fn handle_finished(&mut self, frame: &mut Frame<'_>) -> Transition {
        let ended = self.waves.ended_at().unwrap_or(Timestamp::ZERO);
        if frame.now > ended.after(self.wave_end_delay()) {
            return Transition::To(FarmState::LeavingMap);
        }
        Transition::Stay
    }

    pub(crate) fn handle_leaving_map(&mut self, frame: &mut Frame<'_>) -> Transition {
        let perception = frame.perception;
        if self.item_visible {
            return Transition::To(FarmState::Looting);
        }
        self.delay(DEFAULT_ACTION_DELAY, frame.now);

        let Some(portal) = perception.entities.closest_portal() else {
            self.click(LEAVE_CLICK, MouseButton::Right, None, frame);
            self.delay(LEAVE_DELAY, frame.now);
            return Transition::Stay;
        };

        if portal.distance > self.settings.node_radius() * 2.0 {
            if !self.has_waypoints() {
                let _ = self.plan_to(portal.position, frame);
            }
            let _ = self.follow(frame);
        } else if let Some(screen) = portal.screen_position {
            self.click(screen, MouseButton::Left, None, frame);
            self.delay(PORTAL_DELAY, frame.now);
        }
        Transition::Stay
    }

    pub(crate) fn handle_entering_map(&mut self, frame: &mut Frame<'_>) -> Transition {
        let perception = frame.perception;
        if !perception.area.is_hideout {
            return Transition::To(FarmState::ReturningToAnchor);
        }

        let Some(portal) = perception.entities.closest_portal() else {
            if frame.now.saturating_since(self.search_started_at) > SEARCH_TIMEOUT {
                return Transition::To(FarmState::StartingNewMap);
            }
            self.delay(STASH_WALK_DELAY, frame.now);
            return Transition::Stay;
        };

        if portal.distance > PORTAL_ENTER_DISTANCE {
            if !self.has_waypoints() {
                let _ = self.plan_to(portal.position, frame);
            }
            let _ = self.follow(frame);
        } else {
            self.path = None;
            if let Some(screen) = portal.screen_position {
                self.click(screen, MouseButton::Left, None, frame);
            }
        }
        self.delay(PORTAL_DELAY, frame.now);
        Transition::Stay
    }

    pub(crate) fn handle_starting_new_map(&mut self, frame: &mut Frame<'_>) -> Transition {
        let perception = frame.perception;
        if !perception.area.is_hideout {
            return Transition::Fail(FarmError::NotInHideout);
        }
        self.delay(DEFAULT_ACTION_DELAY, frame.now);

        if !perception.ui.is_visible(Panel::MapDevice) {
            let Some(device) = perception.entities.map_device() else {
                if frame.now.saturating_since(self.search_started_at) > SEARCH_TIMEOUT {
                    return Transition::Fail(FarmError::MapDeviceNotFound {
                        seconds: SEARCH_TIMEOUT.as_secs(),
                    });
                }
                return Transition::Stay;
            };

            if perception.player.position.distance(device.position)
                > self.settings.node_radius() * 2.0
            {
                if self.path.as_ref().map_or(true, |path| path.len() <= 1) {
                    let _ = self.plan_to(device.position, frame);
                }
                let _ = self.follow(frame);
            } else if let Some(screen) = device.screen_position {
                self.path = None;
                self.click(screen, MouseButton::Left, None, frame);
                self.delay(PORTAL_DELAY, frame.now);
            }
            return Transition::Stay;
        }

        if let Some(button) = perception
            .ui
            .panel(Panel::MapDeviceActivate)
            .filter(|button| button.visible)
        {
            info!("opening map");
            self.click(button.bounds.center(), MouseButton::Left, None, frame);
            self.delay(MAP_OPEN_DELAY, frame.now);
            return Transition::To(FarmState::EnteringMap);
        }

        let Some(fragment) = perception.ui.map_device_slots().iter().find(|slot| {
            slot.texture
                .as_deref()
                .is_some_and(|texture| texture.ends_with(metadata::MAP_FRAGMENT_TEXTURE_SUFFIX))
        }) else {
            return Transition::Fail(FarmError::NoMapFragments);
        };

        self.click(
            fragment.bounds.center(),
            MouseButton::Left,
            Some(Modifier::Control),
            frame,
        );
        self.delay(PICKUP_DELAY, frame.now);
        Transition::Stay
    }

    /// Plans toward the next exploration chunk and puts it on cooldown.
    ///
    /// Chunks without a route stay excluded for the rest of the map and the
    /// next candidate is tried. Returns `false` when no chunk can be planned.
    fn plan_exploration(&mut self, frame: &Frame<'_>) -> bool {
        while let Some(chunk) = self.next_exploration_chunk(frame) {
            if self.plan_to(chunk.position(), frame) {
                let _ = self.exploration_cooldowns.insert(chunk.coord(), frame.now);
                return true;
            }
            debug!(chunk = ?chunk.coord(), "exploration target unreachable");
            let _ = self.unreachable_chunks.insert(chunk.coord());
        }
        false
    }

    /// Reports whether every unrevealed chunk with walkable cells is unreachable.
    fn exploration_exhausted(&self) -> bool {
        self.area.chunks().iter().all(|chunk| {
            chunk.weight() == 0
                || chunk.is_revealed()
                || self.unreachable_chunks.contains(&chunk.coord())
        })
    }

    /// Farthest unrevealed chunk with walkable cells, heavier chunks winning ties.
    ///
    /// Chunks explored within the cooldown window are skipped.
    fn next_exploration_chunk(&self, frame: &Frame<'_>) -> Option<Chunk> {
        let player = frame.perception.player.position;
        self.area
            .chunks()
            .iter()
            .filter(|chunk| {
                chunk.weight() > 0
                    && !chunk.is_revealed()
                    && !self.exploration_cooldowns.contains(&chunk.coord(), frame.now)
                    && !self.unreachable_chunks.contains(&chunk.coord())
            })
            .max_by(|left, right| {
                player
                    .distance(left.position())
                    .total_cmp(&player.distance(right.position()))
                    .then(left.weight().cmp(&right.weight()))
            })
            .copied()
    }

    /// Plans toward the monster with the heaviest surrounding fight.
    ///
    /// Candidates whose planning fails are blacklisted by cell and the next
    /// heaviest is tried. Returns whether a path was planned.
    fn seek_heaviest_fight(&mut self, monsters: &[&EntitySnapshot], frame: &mut Frame<'_>) -> bool {
        let combat_radius = self.settings.combat_radius();
        let mut candidates: Vec<(u32, Vec2)> = monsters
            .iter()
            .filter(|monster| {
                CellCoord::from_point(monster.position)
                    .map_or(true, |cell| !self.path_blacklist.contains(&cell, frame.now))
            })
            .map(|monster| {
                (
                    frame
                        .perception
                        .entities
                        .fight_weight(monster.position, combat_radius),
                    monster.position,
                )
            })
            .collect();
        candidates.sort_by_key(|(weight, _)| Reverse(*weight));

        for (weight, position) in candidates {
            if self.plan_to(position, frame) {
                debug!(weight, ?position, "seeking fight");
                return true;
            }
            if let Some(cell) = CellCoord::from_point(position) {
                let until = self.path_blacklist.insert(cell, frame.now);
                frame.events.push(FarmEvent::Blacklisted { position, until });
            }
        }
        false
    }

    fn wave_end_delay(&self) -> Duration {
        Duration::from_secs(u64::from(self.settings.wave_end_delay))
    }
}
