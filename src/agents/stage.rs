//! Stage identities.
//!
//! The four processing roles a conversation moves through. A `Stage` doubles
//! as the routing tag stored in the conversation state, which is why it
//! serializes to the short verb form (`"coordinate"`, `"research"`, ...).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::state::HandoffField;

/// One of the four sequential processing roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Interprets the request, talks to the user, decides when to finish.
    #[default]
    Coordinate,
    /// Gathers facts for the draft.
    Research,
    /// Writes the draft.
    Draft,
    /// Polishes the draft into the final response.
    Edit,
}

impl Stage {
    /// All stages in cycle order.
    pub const ALL: [Stage; 4] = [Stage::Coordinate, Stage::Research, Stage::Draft, Stage::Edit];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Coordinate => "coordinate",
            Stage::Research => "research",
            Stage::Draft => "draft",
            Stage::Edit => "edit",
        }
    }

    /// Human-readable role name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Stage::Coordinate => "Coordinator",
            Stage::Research => "Researcher",
            Stage::Draft => "Drafter",
            Stage::Edit => "Editor",
        }
    }

    /// The stage that runs after this one produces a plain reply.
    ///
    /// Research -> Draft -> Edit -> Coordinate -> Research.
    pub fn successor(&self) -> Stage {
        match self {
            Stage::Coordinate => Stage::Research,
            Stage::Research => Stage::Draft,
            Stage::Draft => Stage::Edit,
            Stage::Edit => Stage::Coordinate,
        }
    }

    /// The handoff field this stage writes.
    pub fn writes(&self) -> HandoffField {
        match self {
            Stage::Coordinate => HandoffField::CoordinatorInstructions,
            Stage::Research => HandoffField::ResearchSummary,
            Stage::Draft => HandoffField::DraftText,
            Stage::Edit => HandoffField::FinalResponse,
        }
    }

    /// The handoff field this stage reads, if it reads exactly one.
    ///
    /// The Coordinator reads the current document instead, which is derived
    /// from two fields.
    pub fn reads(&self) -> Option<HandoffField> {
        match self {
            Stage::Coordinate => None,
            Stage::Research => Some(HandoffField::CoordinatorInstructions),
            Stage::Draft => Some(HandoffField::ResearchSummary),
            Stage::Edit => Some(HandoffField::DraftText),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "coordinate" | "coordinator" => Ok(Stage::Coordinate),
            "research" | "researcher" => Ok(Stage::Research),
            "draft" | "drafter" => Ok(Stage::Draft),
            "edit" | "editor" => Ok(Stage::Edit),
            _ => Err(format!("Unknown stage: {}", s)),
        }
    }
}
