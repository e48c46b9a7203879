//! Outcome selection rules

use crate::deliberation::{DeliberationDialogue, Proposal};
use crate::error::DialogueError;
use crate::persuasion::{Commitments, PersuasionDialogue};
use crate::status::distinct_players;
use agora_core::ParticipantId;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a deliberation picks its winning proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliberationOutcome {
    /// Earliest proposal that is still in
    #[default]
    FirstThatIsIn,
    /// A uniformly shuffled scan over the proposals
    RandomInProposal,
}

impl DeliberationOutcome {
    pub const ALL: [DeliberationOutcome; 2] = [Self::FirstThatIsIn, Self::RandomInProposal];

    pub fn name(self) -> &'static str {
        match self {
            Self::FirstThatIsIn => "first_that_is_in",
            Self::RandomInProposal => "random_in_proposal",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::FirstThatIsIn => "the first proposal, in order of creation, that is in",
            Self::RandomInProposal => "a proposal that is in, chosen at random",
        }
    }

    /// Pick the winning proposal, if any proposal is in
    pub fn select<'a, R: Rng + ?Sized>(
        self,
        dialogue: &'a DeliberationDialogue,
        rng: &mut R,
    ) -> Result<Option<&'a Proposal>, DialogueError> {
        let matching = dialogue.config().concede_matching;
        let mut candidates: Vec<&Proposal> = dialogue.proposals().iter().collect();
        match self {
            Self::FirstThatIsIn => {}
            Self::RandomInProposal => candidates.shuffle(rng),
        }
        for proposal in candidates {
            if proposal.is_accepted(matching)? {
                return Ok(Some(proposal));
            }
        }
        Ok(None)
    }
}

impl fmt::Display for DeliberationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a persuasion picks its winners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersuasionOutcome {
    /// Everyone behind a live reason wins
    #[default]
    ConflictResolution,
    /// Winners only count when all of them hold the topic
    PurePersuasion,
}

impl PersuasionOutcome {
    pub const ALL: [PersuasionOutcome; 2] = [Self::ConflictResolution, Self::PurePersuasion];

    pub fn name(self) -> &'static str {
        match self {
            Self::ConflictResolution => "conflict_resolution",
            Self::PurePersuasion => "pure_persuasion",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::ConflictResolution => "players behind the active attackers",
            Self::PurePersuasion => {
                "players behind the active attackers, only if all are committed to the topic"
            }
        }
    }

    /// Distinct players of the active attackers, in order of first appearance
    pub fn select(
        self,
        dialogue: &PersuasionDialogue,
        commitments: &dyn Commitments,
    ) -> Result<Vec<ParticipantId>, DialogueError> {
        let active = dialogue.active_attackers()?;
        let winners: Vec<ParticipantId> =
            distinct_players(&active).into_iter().cloned().collect();
        match self {
            Self::ConflictResolution => Ok(winners),
            Self::PurePersuasion => {
                let topic = dialogue.topic();
                if winners.iter().all(|w| commitments.is_committed(w, topic)) {
                    Ok(winners)
                } else {
                    Ok(Vec::new())
                }
            }
        }
    }
}

impl fmt::Display for PersuasionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
