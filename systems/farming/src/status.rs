//! Human-readable snapshot of the farmer for status displays.

use std::fmt;

use wavefarm_core::{FarmState, Vec2};

/// Point-in-time summary of what the farmer is doing.
#[derive(Clone, Debug, PartialEq)]
pub struct FarmerStatus {
    /// Current state.
    pub state: FarmState,
    /// What the current state is trying to achieve.
    pub goal: &'static str,
    /// What the farmer is doing right now.
    pub action: &'static str,
    /// Current wave number.
    pub wave: i64,
    /// Wave count that finishes the run.
    pub max_waves: u32,
    /// Whether a wave is running.
    pub wave_active: bool,
    /// Destination of the current path.
    pub navigation_target: Option<Vec2>,
    /// Waypoints left on the current path.
    pub path_nodes: Option<usize>,
    /// Rally point next to the wave trigger.
    pub anchor: Option<Vec2>,
    /// Reason for the terminal error state.
    pub error: Option<String>,
}

impl fmt::Display for FarmerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "State: {}", self.state)?;
        writeln!(f, "Goal: {}", self.goal)?;
        writeln!(f, "Action: {}", self.action)?;
        writeln!(f, "Wave: {} / {}", self.wave, self.max_waves)?;
        writeln!(f, "Wave Active: {}", self.wave_active)?;
        match self.navigation_target {
            Some(target) => writeln!(f, "Navigating To: ({:.1}, {:.1})", target.x, target.y)?,
            None => writeln!(f, "Navigating To: None")?,
        }
        match self.path_nodes {
            Some(nodes) => writeln!(f, "Path Nodes: {nodes}")?,
            None => writeln!(f, "Path Nodes: -")?,
        }
        match self.anchor {
            Some(anchor) => writeln!(f, "Anchor Point: ({:.1}, {:.1})", anchor.x, anchor.y)?,
            None => writeln!(f, "Anchor Point: Not Set")?,
        }
        write!(f, "Error: {}", self.error.as_deref().unwrap_or(""))
    }
}

pub(crate) fn goal(state: FarmState) -> &'static str {
    match state {
        FarmState::Starting | FarmState::FindingMonolith => "Start the next wave.",
        FarmState::CombatHold | FarmState::CombatSeek => "Kill all monsters.",
        FarmState::Exploring => "Find remaining monsters or the wave trigger.",
        FarmState::Looting => "Pick up valuable items.",
        FarmState::Stashing => "Deposit items into stash.",
        FarmState::Finished | FarmState::LeavingMap => "Run is complete, leaving map.",
        FarmState::StartingNewMap | FarmState::EnteringMap => "Open and enter a new map.",
        FarmState::ReturningToAnchor => "Return to the wave trigger.",
        FarmState::Died => "Recover from death.",
        FarmState::Error => "Idle.",
    }
}

pub(crate) fn action(
    state: FarmState,
    following_path: bool,
    trigger_visible: bool,
    item_visible: bool,
) -> &'static str {
    if following_path {
        return "Following path...";
    }

    match state {
        FarmState::Starting if trigger_visible => "Interacting with wave trigger",
        FarmState::Starting => "Searching for wave trigger",
        FarmState::FindingMonolith => "Exploring to find the wave trigger for an anchor point.",
        FarmState::LeavingMap => "Using portal or leaving map.",
        FarmState::CombatHold => "Holding position, fighting nearby enemies.",
        FarmState::CombatSeek => "Seeking distant enemies.",
        FarmState::Exploring => "Calculating new exploration path",
        FarmState::Looting if item_visible => "Moving to item",
        FarmState::Looting => "Searching for items",
        FarmState::Stashing => "Interacting with stash",
        _ => "No specific action.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lists_every_field() {
        let status = FarmerStatus {
            state: FarmState::CombatHold,
            goal: goal(FarmState::CombatHold),
            action: action(FarmState::CombatHold, false, true, false),
            wave: 3,
            max_waves: 15,
            wave_active: true,
            navigation_target: None,
            path_nodes: None,
            anchor: Some(Vec2::new(12.0, 40.5)),
            error: None,
        };

        let text = status.to_string();
        assert!(text.starts_with("State: CombatHold\n"));
        assert!(text.contains("Goal: Kill all monsters."));
        assert!(text.contains("Wave: 3 / 15"));
        assert!(text.contains("Anchor Point: (12.0, 40.5)"));
        assert!(text.ends_with("Error: "));
    }

    #[test]
    fn active_path_overrides_state_action() {
        assert_eq!(
            action(FarmState::Looting, true, false, true),
            "Following path..."
        );
        assert_eq!(
            action(FarmState::Looting, false, false, true),
            "Moving to item"
        );
    }
}
