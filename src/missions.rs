//! Mission and rank tables.

use crate::protocol::{MISSION_BUTTONS, Tag};
use crate::status::{self, StatusText};

#[derive(Debug)]
pub struct MissionDefinition {
    pub name: &'static str,
    /// Event that counts as a hit.
    pub target: Tag,
    /// Hits required at the first rank.
    pub hits: u16,
    /// Points at the first rank; scales with rank level.
    pub reward: u32,
    /// Imperative phrase the progress text is built from.
    pub objective: &'static str,
}

/// Indexed by mission-select button.
pub static MISSIONS: [MissionDefinition; MISSION_BUTTONS] = [
    MissionDefinition {
        name: "Target Practice",
        target: Tag::DropTarget,
        hits: 6,
        reward: 15_000,
        objective: "Hit the drop targets",
    },
    MissionDefinition {
        name: "Bumper Assault",
        target: Tag::PopBumper,
        hits: 8,
        reward: 10_000,
        objective: "Hit the Attack Bumpers",
    },
    MissionDefinition {
        name: "Hyperspace Run",
        target: Tag::Hyperspace,
        hits: 3,
        reward: 25_000,
        objective: "Fly through Hyperspace",
    },
];

pub const RANKS: [&str; 9] = [
    "Cadet",
    "Ensign",
    "Lieutenant",
    "Captain",
    "Lt Commander",
    "Commander",
    "Commodore",
    "Admiral",
    "Fleet Admiral",
];

pub const MAX_RANK: u8 = (RANKS.len() - 1) as u8;

/// Extra hits required per rank above the first.
const HITS_PER_RANK: u16 = 2;

pub fn mission(index: usize) -> Option<&'static MissionDefinition> {
    MISSIONS.get(index)
}

/// Name of rank index `rank`, clamped to the top rank.
pub fn rank_name(rank: u8) -> &'static str {
    RANKS[usize::from(rank.min(MAX_RANK))]
}

/// 1-based rank level used for scaling.
pub const fn rank_level(rank: u8) -> u32 {
    rank as u32 + 1
}

impl MissionDefinition {
    pub fn required_hits(&self, rank: u8) -> u16 {
        self.hits + HITS_PER_RANK * u16::from(rank.min(MAX_RANK))
    }

    pub fn reward(&self, rank: u8) -> u32 {
        self.reward * rank_level(rank)
    }

    /// "Hit the Attack Bumpers 8 times", or the singular form for one hit.
    pub fn progress_text(&self, hits_left: u16) -> StatusText {
        if hits_left == 1 {
            status::format(format_args!("{} 1 more time", self.objective))
        } else {
            status::format(format_args!("{} {} times", self.objective, hits_left))
        }
    }

    pub fn selected_text(&self) -> StatusText {
        status::format(format_args!("{} - Enter Hyperspace to accept", self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_text_plural_and_singular() {
        let bumpers = &MISSIONS[1];
        assert_eq!(bumpers.progress_text(8).as_str(), "Hit the Attack Bumpers 8 times");
        assert_eq!(bumpers.progress_text(1).as_str(), "Hit the Attack Bumpers 1 more time");
    }

    #[test]
    fn scales_with_rank() {
        let run = &MISSIONS[2];
        assert_eq!(run.required_hits(0), 3);
        assert_eq!(run.required_hits(2), 7);
        assert_eq!(run.reward(0), 25_000);
        assert_eq!(run.reward(3), 100_000);
        assert_eq!(run.required_hits(200), run.required_hits(MAX_RANK));
    }

    #[test]
    fn rank_names_clamp() {
        assert_eq!(rank_name(0), "Cadet");
        assert_eq!(rank_name(MAX_RANK), "Fleet Admiral");
        assert_eq!(rank_name(42), "Fleet Admiral");
        assert!(mission(MISSION_BUTTONS).is_none());
    }
}
