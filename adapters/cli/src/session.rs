//! Fixed-step loop connecting the farmer to the simulated arena.

use std::time::Duration;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};
use wavefarm_core::{
    Action, Clock, FarmEvent, FarmState, InputSink, ManualClock, Settings, Timestamp,
};
use wavefarm_system_farming::{Farmer, FarmerStatus};

use crate::arena::Arena;

/// Seed offset separating the farmer's jitter stream from the arena's.
const FARMER_STREAM: u64 = 0x5eed;

/// One state transition observed during a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct TransitionRecord {
    /// Simulated time of the transition.
    pub(crate) at: Timestamp,
    /// State left.
    pub(crate) from: FarmState,
    /// State entered.
    pub(crate) to: FarmState,
}

/// Outcome of a simulated run.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct RunReport {
    /// Every state transition in order.
    pub(crate) transitions: Vec<TransitionRecord>,
    /// Messages of terminal failures.
    pub(crate) failures: Vec<String>,
    /// Number of destinations blacklisted.
    pub(crate) blacklisted: usize,
    /// Number of input actions dispatched.
    pub(crate) actions: usize,
    /// Farmer status after the final tick.
    pub(crate) status: FarmerStatus,
}

/// Runs the farmer against a freshly seeded arena for `ticks` fixed steps.
pub(crate) fn run(settings: Settings, ticks: u64, seed: u64, tick: Duration) -> RunReport {
    let clock = ManualClock::starting_at(Timestamp::ZERO);
    let mut arena = Arena::new(seed, settings.clone(), clock.now());
    let mut farmer = Farmer::new(
        settings.clone(),
        arena.context().clone(),
        clock.clone(),
        ChaCha8Rng::seed_from_u64(seed ^ FARMER_STREAM),
    );

    let mut report = RunReport {
        transitions: Vec::new(),
        failures: Vec::new(),
        blacklisted: 0,
        actions: 0,
        status: farmer.status(),
    };
    let mut actions: Vec<Action> = Vec::new();
    let mut events: Vec<FarmEvent> = Vec::new();

    for _ in 0..ticks {
        let perception = arena.perceive();
        farmer.tick(&perception, &mut actions, &mut events);

        report.actions += actions.len();
        for action in actions.drain(..) {
            arena.dispatch(&action);
        }
        if let Some(context) = arena.take_travel() {
            debug!(area = context.area().hash, "area changed");
            farmer.on_area_changed(context, &mut events);
        }
        let revealed = farmer
            .area_mut()
            .reveal_within(arena.player(), settings.view_radius());
        if revealed > 0 {
            debug!(revealed, "chunks revealed");
        }

        for event in events.drain(..) {
            match event {
                FarmEvent::StateChanged { from, to, at } => {
                    report.transitions.push(TransitionRecord { at, from, to });
                }
                FarmEvent::Blacklisted { .. } => report.blacklisted += 1,
                FarmEvent::Failed { message } => report.failures.push(message),
            }
        }

        if farmer.state() == FarmState::Error {
            break;
        }
        clock.advance(tick);
        arena.step(clock.now());
    }

    report.status = farmer.status();
    info!(
        transitions = report.transitions.len(),
        actions = report.actions,
        state = %report.status.state,
        "run finished"
    );
    report
}
