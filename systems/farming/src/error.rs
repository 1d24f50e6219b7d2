//! Fatal conditions that halt the farming run.

use thiserror::Error;

/// Reasons the farmer enters the terminal error state.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FarmError {
    /// No stash entity was visible when items needed depositing.
    #[error("could not find stash")]
    StashNotFound,
    /// Stashing kept failing for the same inventory.
    #[error("failed to stash item after {attempts} attempts, stash may be full")]
    StashFull {
        /// Number of consecutive attempts made.
        attempts: u32,
    },
    /// A new map was requested outside of the hideout.
    #[error("attempted to start a new map while not in the hideout")]
    NotInHideout,
    /// The hideout map device never appeared.
    #[error("could not find the map device in the hideout after {seconds} seconds")]
    MapDeviceNotFound {
        /// Search window that elapsed.
        seconds: u64,
    },
    /// The map device storage held no usable fragment.
    #[error("no map fragments found in the map device")]
    NoMapFragments,
    /// The area was fully explored without finding the wave trigger.
    #[error("explored the whole area without finding the wave trigger")]
    TriggerNotFound,
    /// The player died too often during a single wave.
    #[error("died more than {max} times on wave {wave}, abandoning run")]
    TooManyDeaths {
        /// Death limit that was exceeded.
        max: u32,
        /// Wave on which the deaths happened.
        wave: i64,
    },
}
