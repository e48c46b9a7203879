//! Errors returned by the dialogue engines

use crate::rules::ProtocolRule;
use agora_core::{LocutionKind, Move, MoveId, TreeError};
use serde::Serialize;
use std::fmt;

/// A move refused by a protocol rule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtocolViolation {
    /// Rule that refused the move
    pub rule: ProtocolRule,
    /// The offending move
    pub offending: Move,
    /// Human-readable reason
    pub reason: String,
}

impl fmt::Display for ProtocolViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} rejected {}: {}", self.rule, self.offending, self.reason)
    }
}

/// Errors from `update` and the status queries
///
/// A failed `update` leaves the dialogue exactly as it was before the call.
#[derive(Debug, thiserror::Error)]
pub enum DialogueError {
    #[error("state violation: {0}")]
    StateViolation(String),
    #[error("move #{move_id} has no usable target (target: {target:?})")]
    TargetNotFound {
        move_id: MoveId,
        target: Option<MoveId>,
    },
    #[error("locution '{kind}' is not supported in {dialogue} dialogues")]
    UnsupportedLocution {
        kind: LocutionKind,
        dialogue: &'static str,
    },
    #[error("protocol violation: {0}")]
    ProtocolViolation(Box<ProtocolViolation>),
    #[error("move #{0} is not in the dialogue")]
    NotInTree(MoveId),
    #[error(transparent)]
    Tree(#[from] TreeError),
}

impl From<ProtocolViolation> for DialogueError {
    fn from(violation: ProtocolViolation) -> Self {
        Self::ProtocolViolation(Box::new(violation))
    }
}
