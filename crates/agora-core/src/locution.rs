//! Locution taxonomy
//!
//! Every utterance kind is a variant of [`Locution`]. Capabilities are a
//! property of the variant, answered by [`Locution::capabilities`]. All
//! dispatch goes through exhaustive matches, so adding a variant breaks the
//! build until every site is updated.

use crate::moves::MoveId;
use crate::proposition::{Argument, Proposition};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Capability tags a locution can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Opens a reply tree (proposal or persuasion topic)
    ProposalOpening,
    /// Challenges or rebuts its target
    Attacking,
    /// Concedes to or retracts from its target
    Surrendering,
    /// Only meaningful in deliberation dialogues
    Deliberation,
    /// Carries no target and never attaches to a reply tree
    NonTargeted,
}

/// A concrete option put forward by a `propose` move
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConcreteProposal {
    /// The option itself
    pub option: Proposition,
    /// Goal the option is meant to achieve
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<Proposition>,
}

impl ConcreteProposal {
    pub fn new(option: Proposition) -> Self {
        Self { option, goal: None }
    }

    pub fn with_goal(mut self, goal: Proposition) -> Self {
        self.goal = Some(goal);
        self
    }
}

/// Two options compared by a preference locution
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OptionPair {
    pub first: Proposition,
    pub second: Proposition,
}

/// Topic (and optional goal) named by dialogue-control locutions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DialogueTopic {
    pub topic: Proposition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<Proposition>,
}

/// A typed utterance
///
/// Serialized externally tagged with kebab-case names, e.g.
/// `{"why": "p(a)"}` or `{"reject": 3}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Locution {
    /// Put forward an option in a deliberation
    Propose(ConcreteProposal),
    /// Open a persuasion dialogue on a proposition
    Claim(Proposition),
    /// Challenge a premise
    Why(Proposition),
    /// Give an argument
    Argue(Argument),
    /// Accept a proposition (possibly only part of an argument)
    Concede(Proposition),
    /// Withdraw a proposition
    Retract(Proposition),
    /// Reject the referenced proposal
    Reject(MoveId),
    /// Ask why the referenced proposal was rejected
    WhyReject(MoveId),
    /// Ask why the referenced proposal was made
    WhyPropose(MoveId),
    /// Withdraw an earlier rejection of the referenced proposal
    DropReject(MoveId),
    /// Share a belief with everyone
    Inform(Proposition),
    /// State a strict preference
    Prefer(OptionPair),
    /// State indifference between two options
    PreferEqual(OptionPair),
    JoinDialogue(DialogueTopic),
    OpenDialogue(DialogueTopic),
    DenyDialogue(DialogueTopic),
}

/// Fieldless mirror of [`Locution`], used for reporting and error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocutionKind {
    Propose,
    Claim,
    Why,
    Argue,
    Concede,
    Retract,
    Reject,
    WhyReject,
    WhyPropose,
    DropReject,
    Inform,
    Prefer,
    PreferEqual,
    JoinDialogue,
    OpenDialogue,
    DenyDialogue,
}

impl LocutionKind {
    /// Wire name of the kind
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Propose => "propose",
            Self::Claim => "claim",
            Self::Why => "why",
            Self::Argue => "argue",
            Self::Concede => "concede",
            Self::Retract => "retract",
            Self::Reject => "reject",
            Self::WhyReject => "why-reject",
            Self::WhyPropose => "why-propose",
            Self::DropReject => "drop-reject",
            Self::Inform => "inform",
            Self::Prefer => "prefer",
            Self::PreferEqual => "prefer-equal",
            Self::JoinDialogue => "join-dialogue",
            Self::OpenDialogue => "open-dialogue",
            Self::DenyDialogue => "deny-dialogue",
        }
    }
}

impl fmt::Display for LocutionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

use Capability::{Attacking, Deliberation, NonTargeted, ProposalOpening, Surrendering};

impl Locution {
    /// Capability tags of this locution
    pub fn capabilities(&self) -> &'static [Capability] {
        match self {
            Self::Propose(_) => &[ProposalOpening, Deliberation],
            Self::Claim(_) => &[ProposalOpening],
            Self::Why(_) | Self::Argue(_) => &[Attacking],
            Self::Concede(_) | Self::Retract(_) => &[Surrendering],
            Self::Reject(_) | Self::WhyReject(_) | Self::WhyPropose(_) => {
                &[Attacking, Deliberation]
            }
            Self::DropReject(_) => &[Surrendering, Deliberation],
            Self::Inform(_)
            | Self::Prefer(_)
            | Self::PreferEqual(_)
            | Self::JoinDialogue(_)
            | Self::OpenDialogue(_)
            | Self::DenyDialogue(_) => &[NonTargeted, Deliberation],
        }
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    pub fn is_proposal_opening(&self) -> bool {
        self.has(ProposalOpening)
    }

    pub fn is_attacking(&self) -> bool {
        self.has(Attacking)
    }

    pub fn is_surrendering(&self) -> bool {
        self.has(Surrendering)
    }

    /// Whether the locution replies to another move
    pub fn is_targeted(&self) -> bool {
        !self.has(NonTargeted) && !self.is_proposal_opening()
    }

    pub fn is_deliberation_only(&self) -> bool {
        self.has(Deliberation)
    }

    pub fn kind(&self) -> LocutionKind {
        match self {
            Self::Propose(_) => LocutionKind::Propose,
            Self::Claim(_) => LocutionKind::Claim,
            Self::Why(_) => LocutionKind::Why,
            Self::Argue(_) => LocutionKind::Argue,
            Self::Concede(_) => LocutionKind::Concede,
            Self::Retract(_) => LocutionKind::Retract,
            Self::Reject(_) => LocutionKind::Reject,
            Self::WhyReject(_) => LocutionKind::WhyReject,
            Self::WhyPropose(_) => LocutionKind::WhyPropose,
            Self::DropReject(_) => LocutionKind::DropReject,
            Self::Inform(_) => LocutionKind::Inform,
            Self::Prefer(_) => LocutionKind::Prefer,
            Self::PreferEqual(_) => LocutionKind::PreferEqual,
            Self::JoinDialogue(_) => LocutionKind::JoinDialogue,
            Self::OpenDialogue(_) => LocutionKind::OpenDialogue,
            Self::DenyDialogue(_) => LocutionKind::DenyDialogue,
        }
    }

    /// The proposition a move with this locution stands for
    ///
    /// This is what a `concede` reply has to match to count as a full
    /// surrender.
    pub fn claimed_proposition(&self) -> Option<&Proposition> {
        match self {
            Self::Propose(proposal) => Some(&proposal.option),
            Self::Claim(proposition) => Some(proposition),
            Self::Argue(argument) => Some(&argument.claim),
            Self::Why(_)
            | Self::Concede(_)
            | Self::Retract(_)
            | Self::Reject(_)
            | Self::WhyReject(_)
            | Self::WhyPropose(_)
            | Self::DropReject(_)
            | Self::Inform(_)
            | Self::Prefer(_)
            | Self::PreferEqual(_)
            | Self::JoinDialogue(_)
            | Self::OpenDialogue(_)
            | Self::DenyDialogue(_) => None,
        }
    }

    /// Conceded proposition of a `concede`
    pub fn conceded_term(&self) -> Option<&Proposition> {
        match self {
            Self::Concede(proposition) => Some(proposition),
            _ => None,
        }
    }

    /// Proposal referenced by the rejection family of locutions
    pub fn proposal_ref(&self) -> Option<MoveId> {
        match self {
            Self::Reject(id) | Self::WhyReject(id) | Self::WhyPropose(id) | Self::DropReject(id) => {
                Some(*id)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Locution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.kind();
        match self {
            Self::Propose(proposal) => match &proposal.goal {
                Some(goal) => write!(f, "{}({} for {})", kind, proposal.option, goal),
                None => write!(f, "{}({})", kind, proposal.option),
            },
            Self::Claim(p) | Self::Why(p) | Self::Concede(p) | Self::Retract(p) | Self::Inform(p) => {
                write!(f, "{}({})", kind, p)
            }
            Self::Argue(argument) => write!(f, "{}({})", kind, argument),
            Self::Reject(id) | Self::WhyReject(id) | Self::WhyPropose(id) | Self::DropReject(id) => {
                write!(f, "{}(#{})", kind, id)
            }
            Self::Prefer(pair) | Self::PreferEqual(pair) => {
                write!(f, "{}({}, {})", kind, pair.first, pair.second)
            }
            Self::JoinDialogue(topic) | Self::OpenDialogue(topic) | Self::DenyDialogue(topic) => {
                write!(f, "{}({})", kind, topic.topic)
            }
        }
    }
}
