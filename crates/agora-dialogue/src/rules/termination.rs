//! Termination rules

use crate::rules::protocol::MoveLookup;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a dialogue ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminationReason {
    pub rule: TerminationRule,
    pub detail: String,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.rule, self.detail)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationRule {
    /// Nobody is left to take part
    NoParticipants,
    /// A full round passed in which everyone skipped
    InactiveRound,
}

impl TerminationRule {
    pub const ALL: [TerminationRule; 2] = [Self::NoParticipants, Self::InactiveRound];

    pub fn name(self) -> &'static str {
        match self {
            Self::NoParticipants => "no_participants",
            Self::InactiveRound => "inactive_round",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::NoParticipants => "ends the dialogue once no participant remains",
            Self::InactiveRound => "ends the dialogue after a full round of skipped turns",
        }
    }

    pub fn evaluate(
        self,
        _dialogue: &dyn MoveLookup,
        participant_count: usize,
        consecutive_skips: usize,
    ) -> Option<TerminationReason> {
        match self {
            Self::NoParticipants if participant_count == 0 => Some(TerminationReason {
                rule: self,
                detail: "no participants left".to_string(),
            }),
            // the first skipper is counted again when the round comes back to them
            Self::InactiveRound if consecutive_skips > participant_count => {
                Some(TerminationReason {
                    rule: self,
                    detail: format!(
                        "{} consecutive skips with {} participants",
                        consecutive_skips, participant_count
                    ),
                })
            }
            Self::NoParticipants | Self::InactiveRound => None,
        }
    }
}

impl fmt::Display for TerminationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Evaluate `rules` in order and return the first reason to stop
pub fn first_termination(
    rules: &[TerminationRule],
    dialogue: &dyn MoveLookup,
    participant_count: usize,
    consecutive_skips: usize,
) -> Option<TerminationReason> {
    rules
        .iter()
        .find_map(|rule| rule.evaluate(dialogue, participant_count, consecutive_skips))
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::{Move, MoveId};

    struct Empty;

    impl MoveLookup for Empty {
        fn find_move(&self, _id: MoveId) -> Option<&Move> {
            None
        }
    }

    #[test]
    fn test_no_participants() {
        assert!(TerminationRule::NoParticipants.evaluate(&Empty, 0, 0).is_some());
        assert!(TerminationRule::NoParticipants.evaluate(&Empty, 1, 0).is_none());
    }

    #[test]
    fn test_inactive_round_needs_participants_plus_one() {
        let rule = TerminationRule::InactiveRound;
        assert!(rule.evaluate(&Empty, 3, 3).is_none());
        assert!(rule.evaluate(&Empty, 3, 4).is_some());
        assert!(rule.evaluate(&Empty, 3, 5).is_some());
    }

    #[test]
    fn test_first_termination_order() {
        let reason = first_termination(&TerminationRule::ALL, &Empty, 0, 1).unwrap();
        assert_eq!(reason.rule, TerminationRule::NoParticipants);
        assert!(first_termination(&TerminationRule::ALL, &Empty, 2, 2).is_none());
    }
}
