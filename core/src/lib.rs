#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the wave farming engine.
//!
//! This crate defines the message surface that connects the host adapter, the
//! immutable per-area context, and the pure systems. The host captures a
//! [`Perception`] snapshot every tick, systems read it together with the area
//! context, and respond exclusively with [`Action`] requests that the host
//! forwards to an [`InputSink`]. Systems never block: every timing decision is
//! a comparison against a [`Timestamp`] produced by an injected [`Clock`].

use std::borrow::Cow;
use std::fmt;

pub use glam::Vec2;
use serde::{Deserialize, Serialize};

pub mod perception;
pub mod settings;
pub mod time;

pub use perception::{
    metadata, AreaInfo, ChestComponent, Component, EntityId, EntityKind, EntitySnapshot, EntityView,
    GroundItem, InventoryItem, Panel, Perception, PlayerSnapshot, Rarity, ShrineComponent,
    StateMachineComponent, UiElement, UiView,
};
pub use settings::{Settings, SettingsError};
pub use time::{Clock, ManualClock, SystemClock, Timestamp};

/// Number of grid units spanned by a single terrain tile.
pub const TILE_WORLD_UNIT: u32 = 23;

/// Location of a single walkability grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Truncates a grid-space point onto the cell that contains it.
    ///
    /// Points with a negative or non-finite component have no cell.
    #[must_use]
    pub fn from_point(point: Vec2) -> Option<Self> {
        if !point.x.is_finite() || !point.y.is_finite() || point.x < 0.0 || point.y < 0.0 {
            return None;
        }
        Some(Self::new(point.x as u32, point.y as u32))
    }

    /// Grid-space point anchored at the cell's origin corner.
    #[must_use]
    pub fn to_point(self) -> Vec2 {
        Vec2::new(self.column as f32, self.row as f32)
    }

    /// Computes the Chebyshev distance, the number of 8-directional steps between cells.
    #[must_use]
    pub fn chebyshev_distance(self, other: CellCoord) -> u32 {
        self.column
            .abs_diff(other.column)
            .max(self.row.abs_diff(other.row))
    }
}

/// Axis-aligned rectangle in screen space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenRect {
    /// Upper-left corner of the rectangle.
    pub origin: Vec2,
    /// Width and height of the rectangle.
    pub size: Vec2,
}

impl ScreenRect {
    /// Creates a rectangle from its upper-left corner and size.
    #[must_use]
    pub const fn new(origin: Vec2, size: Vec2) -> Self {
        Self { origin, size }
    }

    /// Center point of the rectangle.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        self.origin + self.size * 0.5
    }

    /// Reports whether the point lies inside the rectangle, edges included.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        let max = self.origin + self.size;
        point.x >= self.origin.x && point.y >= self.origin.y && point.x <= max.x && point.y <= max.y
    }
}

/// Keeps a projected screen point inside the usable part of the game window.
///
/// The window is shrunk by a fixed margin that keeps clicks away from the
/// frame and the bottom HUD. Points already inside are returned unchanged;
/// points outside are pulled onto a circle of `clamp_size` pixels around the
/// window center along the original direction.
#[must_use]
pub fn clamp_to_window(point: Vec2, window: ScreenRect, clamp_size: f32) -> Vec2 {
    let usable = ScreenRect::new(
        window.origin + Vec2::new(10.0, 10.0),
        window.size - Vec2::new(20.0, 130.0),
    );
    if usable.contains(point) {
        return point;
    }

    let center = usable.size * 0.5;
    let direction = (point - center).normalize_or_zero();
    center + direction * clamp_size
}

/// Named key binding forwarded verbatim to the input sink.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyBinding(Cow<'static, str>);

impl KeyBinding {
    /// Escape key, used to close panels.
    pub const ESCAPE: Self = Self::from_static("Escape");

    /// Creates a binding from a static key name.
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Creates a binding from an owned key name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// Key name understood by the input sink.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mouse button pressed by a click request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    /// Primary button.
    Left,
    /// Secondary button.
    Right,
}

/// Modifier key held for the duration of a click.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Modifier {
    /// Control key, used for quick-transfer clicks.
    Control,
}

/// Fire-and-forget requests emitted by systems for the input collaborator.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    /// Points the cursor at a grid-space position and presses the key there.
    MoveToward {
        /// Grid-space position the cursor should hover.
        target: Vec2,
        /// Key pressed once the cursor is in place.
        key: KeyBinding,
    },
    /// Clicks a screen-space position.
    Click {
        /// Screen-space position, already jittered when appropriate.
        position: Vec2,
        /// Mouse button to press.
        button: MouseButton,
        /// Modifier held while clicking, if any.
        modifier: Option<Modifier>,
    },
    /// Taps a key without moving the cursor.
    KeyPress {
        /// Key to press and release.
        key: KeyBinding,
    },
}

/// Consumer of [`Action`] requests, implemented by the host's input layer.
pub trait InputSink {
    /// Forwards a single action; implementations must not block the caller.
    fn dispatch(&mut self, action: &Action);
}

impl InputSink for Vec<Action> {
    fn dispatch(&mut self, action: &Action) {
        self.push(action.clone());
    }
}

/// States of the farming state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FarmState {
    /// Walking to the wave trigger and starting the next wave.
    Starting,
    /// Searching the area for the wave trigger to anchor on.
    FindingMonolith,
    /// Opening a new map from the hideout map device.
    StartingNewMap,
    /// Walking through the portal into the opened map.
    EnteringMap,
    /// Leaving the map through a town portal.
    LeavingMap,
    /// Walking back to the anchor position before a wave.
    ReturningToAnchor,
    /// Holding the anchor and fighting nearby enemies.
    CombatHold,
    /// Moving toward the most valuable distant group of enemies.
    CombatSeek,
    /// Walking toward unexplored regions of the area.
    Exploring,
    /// Picking up ground items.
    Looting,
    /// Depositing inventory into the stash.
    Stashing,
    /// Waiting for resurrection after dying.
    Died,
    /// All waves are complete; waiting for loot before leaving.
    Finished,
    /// Fatal condition; all automated action halts.
    Error,
}

impl FarmState {
    /// Reports whether the state halts the run until an external reset.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Error)
    }
}

impl fmt::Display for FarmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Structured observability events emitted by the farmer.
#[derive(Clone, Debug, PartialEq)]
pub enum FarmEvent {
    /// The state machine moved between two states.
    StateChanged {
        /// State active before the transition.
        from: FarmState,
        /// State active after the transition.
        to: FarmState,
        /// Clock reading at the moment of the transition.
        at: Timestamp,
    },
    /// A destination or item was excluded from future attempts for a while.
    Blacklisted {
        /// Grid-space position that was excluded.
        position: Vec2,
        /// Clock reading at which the exclusion lapses.
        until: Timestamp,
    },
    /// The farmer entered the terminal error state.
    Failed {
        /// Human-readable explanation of the failure.
        message: String,
    },
}
