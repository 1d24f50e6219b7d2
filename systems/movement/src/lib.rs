#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Path planning and path following for the wave farming engine.
//!
//! A [`Path`] is planned once against the immutable area context, simplified
//! into a short list of waypoints, and then consumed from the front by the
//! [`PathFollower`] as the player reaches each waypoint.

use std::collections::VecDeque;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, trace};
use wavefarm_core::{Action, KeyBinding, Settings, Timestamp, Vec2};
use wavefarm_world::AreaContext;

const COLLINEAR_EPSILON: f32 = 0.001;
const MIN_PATH_TIMEOUT_SECS: f32 = 5.0;
const MAX_PATH_TIMEOUT_SECS: f32 = 20.0;
const TIMEOUT_DISTANCE_DIVISOR: f32 = 100.0;

const BLINK_CHANCE: f64 = 0.1;
const BLINK_BASE_COOLDOWN: Duration = Duration::from_millis(750);
const BLINK_COOLDOWN_JITTER_MS: std::ops::Range<u64> = 500..2000;

/// Ordered waypoints toward a fixed destination.
#[derive(Clone, Debug, PartialEq)]
pub struct Path {
    nodes: VecDeque<Vec2>,
    destination: Vec2,
    created_at: Timestamp,
    initial_distance: f32,
}

impl Path {
    /// Creates a path from raw waypoints, dropping interior collinear nodes.
    ///
    /// Nodes are visited from the second-to-last back to the first; whenever
    /// the segments entering and leaving the following node point the same way,
    /// that node is removed. The first and last nodes always survive. Paths
    /// with fewer than two nodes are kept as given and have no initial distance.
    #[must_use]
    pub fn new(nodes: Vec<Vec2>, created_at: Timestamp) -> Self {
        let destination = nodes.last().copied().unwrap_or(Vec2::ZERO);
        let mut nodes = nodes;
        let initial_distance = match (nodes.first(), nodes.last()) {
            (Some(first), Some(last)) if nodes.len() >= 2 => first.distance(*last),
            _ => 0.0,
        };

        if nodes.len() >= 2 {
            simplify(&mut nodes);
        }

        Self {
            nodes: nodes.into(),
            destination,
            created_at,
            initial_distance,
        }
    }

    /// Waypoint the follower should head toward, if any remain.
    #[must_use]
    pub fn next(&self) -> Option<Vec2> {
        self.nodes.front().copied()
    }

    /// Destination requested when the path was planned.
    #[must_use]
    pub const fn destination(&self) -> Vec2 {
        self.destination
    }

    /// Clock reading at which the path was planned.
    #[must_use]
    pub const fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Straight-line distance between the first and last raw node.
    #[must_use]
    pub const fn initial_distance(&self) -> f32 {
        self.initial_distance
    }

    /// Remaining waypoints, next one first.
    pub fn nodes(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.nodes.iter().copied()
    }

    /// Number of remaining waypoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Reports whether every waypoint has been consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Time the path may stay active before it is abandoned.
    ///
    /// Scales with the initial distance at one second per hundred units,
    /// clamped to five through twenty seconds.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        let seconds = (self.initial_distance / TIMEOUT_DISTANCE_DIVISOR)
            .clamp(MIN_PATH_TIMEOUT_SECS, MAX_PATH_TIMEOUT_SECS);
        Duration::from_secs_f32(seconds)
    }

    /// Time elapsed since the path was planned.
    #[must_use]
    pub fn age(&self, now: Timestamp) -> Duration {
        now.saturating_since(self.created_at)
    }

    /// Reports whether the path outlived its timeout.
    #[must_use]
    pub fn is_stale(&self, now: Timestamp) -> bool {
        self.age(now) >= self.timeout()
    }

    /// Drops the next waypoint when `position` lies strictly within `radius` of it.
    ///
    /// Returns whether a waypoint was consumed.
    pub fn consume_reached(&mut self, position: Vec2, radius: f32) -> bool {
        match self.nodes.front() {
            Some(next) if next.distance(position) < radius => {
                let _ = self.nodes.pop_front();
                true
            }
            _ => false,
        }
    }
}

fn simplify(nodes: &mut Vec<Vec2>) {
    let mut index = nodes.len() - 2;
    loop {
        if index + 2 < nodes.len() {
            let incoming = (nodes[index + 1] - nodes[index]).normalize_or_zero();
            let outgoing = (nodes[index + 2] - nodes[index + 1]).normalize_or_zero();
            if (incoming.dot(outgoing) - 1.0).abs() < COLLINEAR_EPSILON {
                let _ = nodes.remove(index + 1);
            }
        }

        if index == 0 {
            break;
        }
        index -= 1;
    }
}

/// Plans a simplified path from `start` to `destination`.
///
/// The raw grid route is thinned by `spacing` and then simplified. The final
/// waypoint is the exact requested destination rather than its grid cell.
/// Returns `None` when no route exists.
#[must_use]
pub fn plan_path(
    area: &AreaContext,
    start: Vec2,
    destination: Vec2,
    spacing: f32,
    now: Timestamp,
) -> Option<Path> {
    let Some(mut route) = area.find_route(start, destination, spacing) else {
        debug!(?start, ?destination, "no route");
        return None;
    };
    if let Some(last) = route.last_mut() {
        *last = destination;
    }

    let path = Path::new(route, now);
    trace!(
        waypoints = path.len(),
        distance = path.initial_distance(),
        "planned path"
    );
    Some(path)
}

/// Decides when the fast-travel key replaces the movement key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlinkPacer {
    ready_at: Timestamp,
}

impl BlinkPacer {
    /// Creates a pacer whose cooldown elapses at `ready_at`.
    #[must_use]
    pub const fn new(ready_at: Timestamp) -> Self {
        Self { ready_at }
    }

    /// Picks the key for the next movement step.
    ///
    /// Once the cooldown has elapsed each call rolls a one-in-ten chance to
    /// blink; a successful roll restarts the cooldown at 1.25 to 2.75 seconds.
    pub fn choose<'a, R: Rng + ?Sized>(
        &mut self,
        now: Timestamp,
        rng: &mut R,
        settings: &'a Settings,
    ) -> &'a KeyBinding {
        if now > self.ready_at && rng.gen_bool(BLINK_CHANCE) {
            let jitter = Duration::from_millis(rng.gen_range(BLINK_COOLDOWN_JITTER_MS));
            self.ready_at = now.after(BLINK_BASE_COOLDOWN + jitter);
            return &settings.blink_key;
        }
        &settings.movement_key
    }

    /// Clock reading after which blinking is allowed again.
    #[must_use]
    pub const fn ready_at(&self) -> Timestamp {
        self.ready_at
    }
}

/// Walks a [`Path`] one waypoint at a time.
#[derive(Clone, Debug, Default)]
pub struct PathFollower {
    pacer: BlinkPacer,
}

impl PathFollower {
    /// Creates a follower with a ready blink cooldown.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits a move toward the next waypoint and consumes it once reached.
    ///
    /// Returns `false` without emitting anything when the path is exhausted.
    pub fn follow<R: Rng + ?Sized>(
        &mut self,
        path: &mut Path,
        player: Vec2,
        now: Timestamp,
        rng: &mut R,
        settings: &Settings,
        out: &mut Vec<Action>,
    ) -> bool {
        let radius = settings.node_radius();
        let Some(target) = path.next() else {
            let _ = path.consume_reached(player, radius);
            return false;
        };

        let key = self.pacer.choose(now, rng, settings).clone();
        out.push(Action::MoveToward { target, key });
        let _ = path.consume_reached(player, radius);
        true
    }

    /// Blink cooldown state.
    #[must_use]
    pub const fn pacer(&self) -> &BlinkPacer {
        &self.pacer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(raw: &[(f32, f32)]) -> Vec<Vec2> {
        raw.iter().map(|&(x, y)| Vec2::new(x, y)).collect()
    }

    #[test]
    fn straight_runs_collapse_to_endpoints() {
        let path = Path::new(
            points(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (5.0, 5.0)]),
            Timestamp::ZERO,
        );
        assert_eq!(
            path.nodes().collect::<Vec<_>>(),
            points(&[(0.0, 0.0), (5.0, 5.0)])
        );
    }

    #[test]
    fn genuine_turns_are_kept() {
        let path = Path::new(
            points(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]),
            Timestamp::ZERO,
        );
        assert_eq!(path.len(), 3);
    }

    #[test]
    fn mixed_route_keeps_only_corners() {
        let path = Path::new(
            points(&[
                (0.0, 0.0),
                (1.0, 0.0),
                (2.0, 0.0),
                (3.0, 1.0),
                (4.0, 2.0),
                (4.0, 3.0),
            ]),
            Timestamp::ZERO,
        );
        assert_eq!(
            path.nodes().collect::<Vec<_>>(),
            points(&[(0.0, 0.0), (2.0, 0.0), (4.0, 2.0), (4.0, 3.0)])
        );
        assert_eq!(path.destination(), Vec2::new(4.0, 3.0));
    }

    #[test]
    fn single_node_paths_are_inert() {
        let path = Path::new(points(&[(3.0, 4.0)]), Timestamp::ZERO);
        assert_eq!(path.len(), 1);
        assert_eq!(path.initial_distance(), 0.0);
        assert_eq!(path.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn simplify_handles_two_nodes() {
        let mut nodes = points(&[(0.0, 0.0), (1.0, 0.0)]);
        simplify(&mut nodes);
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn repeated_points_are_not_collapsed() {
        let path = Path::new(
            points(&[(0.0, 0.0), (1.0, 0.0), (1.0, 0.0), (2.0, 0.0)]),
            Timestamp::ZERO,
        );
        assert_eq!(path.len(), 4);
    }
}
