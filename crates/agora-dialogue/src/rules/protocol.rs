//! Move admission rules

use crate::error::ProtocolViolation;
use agora_core::{Move, MoveId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Read-only view of the moves a dialogue holds
pub trait MoveLookup {
    fn find_move(&self, id: MoveId) -> Option<&Move>;
}

/// A constraint a candidate move must satisfy before it is admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolRule {
    /// A player may not reply to their own move
    AttackOnOwnMove,
    /// The same move may not be repeated within a branch.
    /// Admits everything; callers of persuasion dialogues can use
    /// `PersuasionDialogue::is_repeated_move` instead.
    NoRepeatInBranch,
}

impl ProtocolRule {
    pub const ALL: [ProtocolRule; 2] = [Self::AttackOnOwnMove, Self::NoRepeatInBranch];

    pub fn name(self) -> &'static str {
        match self {
            Self::AttackOnOwnMove => "attack_on_own_move",
            Self::NoRepeatInBranch => "no_repeat_in_branch",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::AttackOnOwnMove => "a player may not reply to a move they played themselves",
            Self::NoRepeatInBranch => "declared only; admits every move",
        }
    }

    /// Check `candidate` against the dialogue it is about to enter
    pub fn evaluate(self, dialogue: &dyn MoveLookup, candidate: &Move) -> Option<ProtocolViolation> {
        match self {
            Self::AttackOnOwnMove => {
                let target = dialogue.find_move(candidate.target()?)?;
                let player = candidate.player()?;
                if !target.played_by(player) {
                    return None;
                }
                Some(ProtocolViolation {
                    rule: self,
                    offending: candidate.clone(),
                    reason: format!("{} replied to their own move #{}", player, target.id()),
                })
            }
            Self::NoRepeatInBranch => None,
        }
    }
}

impl fmt::Display for ProtocolRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Evaluate `rules` in order and stop at the first violation
pub fn first_violation(
    rules: &[ProtocolRule],
    dialogue: &dyn MoveLookup,
    candidate: &Move,
) -> Option<ProtocolViolation> {
    rules.iter().find_map(|rule| rule.evaluate(dialogue, candidate))
}
