//! Wave progress read from the wave trigger's state machine.

use wavefarm_core::{EntitySnapshot, StateMachineComponent, Timestamp};

const WAVE_STATE: &str = "wave";
const ACTIVE_STATE: &str = "active";
const GOODBYE_STATE: &str = "goodbye";

/// Wave counter, activity flag and per-wave bookkeeping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WaveTracker {
    wave: i64,
    active: bool,
    started_at: Timestamp,
    ended_at: Option<Timestamp>,
    support_used: bool,
    deaths: u32,
    last_death_wave: Option<i64>,
}

impl WaveTracker {
    /// Refreshes the tracker from the wave trigger, if one is visible.
    ///
    /// A rising wave number restarts the per-wave death count, start time and
    /// support flag. A wave is active while its `active` state is positive and
    /// its `goodbye` state is present and below one. Falling from active to
    /// inactive stamps the wave end time.
    pub fn observe(&mut self, trigger: Option<&EntitySnapshot>, now: Timestamp) {
        let Some(machine) = trigger.and_then(|entity| entity.component::<StateMachineComponent>())
        else {
            return;
        };

        let wave = machine.state(WAVE_STATE).unwrap_or(self.wave);
        if wave > self.wave {
            self.deaths = 0;
            self.started_at = now;
            self.support_used = false;
        }
        self.wave = wave;

        let active = machine.state(ACTIVE_STATE).is_some_and(|value| value > 0)
            && machine.state(GOODBYE_STATE).is_some_and(|value| value < 1);
        if self.active && !active {
            self.ended_at = Some(now);
        }
        self.active = active;
    }

    /// Counts a death against the current wave and returns the wave's total.
    pub fn record_death(&mut self) -> u32 {
        if self.last_death_wave != Some(self.wave) {
            self.deaths = 0;
            self.last_death_wave = Some(self.wave);
        }
        self.deaths += 1;
        self.deaths
    }

    /// Marks the once-per-wave support skill as used.
    pub fn use_support(&mut self) {
        self.support_used = true;
    }

    /// Forgets all progress, as when entering a fresh map.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Current wave number.
    #[must_use]
    pub const fn wave(&self) -> i64 {
        self.wave
    }

    /// Whether a wave is running.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Clock reading at which the current wave number was first seen.
    #[must_use]
    pub const fn started_at(&self) -> Timestamp {
        self.started_at
    }

    /// Clock reading at which the last wave ended, if any has.
    #[must_use]
    pub const fn ended_at(&self) -> Option<Timestamp> {
        self.ended_at
    }

    /// Whether the support skill was used during the current wave.
    #[must_use]
    pub const fn support_used(&self) -> bool {
        self.support_used
    }

    /// Deaths recorded on the current wave.
    #[must_use]
    pub const fn deaths(&self) -> u32 {
        self.deaths
    }
}
