//! Moves and the per-session move factory

use crate::locution::Locution;
use crate::tree::Indexed;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a move, unique within one dialogue session
pub type MoveId = u64;

/// Name of a dialogue participant
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ParticipantId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A single utterance
///
/// Immutable once built. Only a [`MoveFactory`] hands out ids, so every
/// move in a session has a distinct one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Move {
    id: MoveId,
    /// `None` for moves made by the system
    player: Option<ParticipantId>,
    /// The move this one replies to
    target: Option<MoveId>,
    locution: Locution,
}

impl Move {
    pub fn id(&self) -> MoveId {
        self.id
    }

    pub fn player(&self) -> Option<&ParticipantId> {
        self.player.as_ref()
    }

    pub fn target(&self) -> Option<MoveId> {
        self.target
    }

    pub fn locution(&self) -> &Locution {
        &self.locution
    }

    pub fn is_system(&self) -> bool {
        self.player.is_none()
    }

    pub fn played_by(&self, participant: &ParticipantId) -> bool {
        self.player.as_ref() == Some(participant)
    }
}

impl Indexed for Move {
    fn index(&self) -> MoveId {
        self.id
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.player {
            Some(player) => write!(f, "#{} {}: {}", self.id, player, self.locution)?,
            None => write!(f, "#{} system: {}", self.id, self.locution)?,
        }
        if let Some(target) = self.target {
            write!(f, " -> #{}", target)?;
        }
        Ok(())
    }
}

/// Hands out move ids for one dialogue session, starting at zero
#[derive(Debug, Clone, Default)]
pub struct MoveFactory {
    next_id: MoveId,
}

impl MoveFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a move with the next id
    pub fn build(
        &mut self,
        player: Option<ParticipantId>,
        target: Option<MoveId>,
        locution: Locution,
    ) -> Move {
        let id = self.next_id;
        self.next_id += 1;
        Move {
            id,
            player,
            target,
            locution,
        }
    }

    /// Build a move played by `player`
    pub fn play(
        &mut self,
        player: impl Into<ParticipantId>,
        target: Option<MoveId>,
        locution: Locution,
    ) -> Move {
        self.build(Some(player.into()), target, locution)
    }

    /// Id the next built move will get
    pub fn peek_next_id(&self) -> MoveId {
        self.next_id
    }

    /// Start a new session
    pub fn reset(&mut self) {
        self.next_id = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposition::Proposition;

    #[test]
    fn test_factory_assigns_sequential_ids() {
        let mut factory = MoveFactory::new();
        let a = factory.play("alice", None, Locution::Claim(Proposition::atom("p")));
        let b = factory.play("bob", Some(a.id()), Locution::Why(Proposition::atom("p")));
        assert_eq!(a.id(), 0);
        assert_eq!(b.id(), 1);
        assert_eq!(b.target(), Some(0));
        assert_eq!(factory.peek_next_id(), 2);

        factory.reset();
        let c = factory.build(None, None, Locution::Inform(Proposition::atom("q")));
        assert_eq!(c.id(), 0);
        assert!(c.is_system());
    }

    #[test]
    fn test_factories_are_independent() {
        let mut first = MoveFactory::new();
        let mut second = MoveFactory::new();
        first.play("alice", None, Locution::Claim(Proposition::atom("p")));
        let m = second.play("bob", None, Locution::Claim(Proposition::atom("p")));
        assert_eq!(m.id(), 0);
    }

    #[test]
    fn test_display() {
        let mut factory = MoveFactory::new();
        factory.play("alice", None, Locution::Claim(Proposition::atom("p")));
        let m = factory.play("bob", Some(0), Locution::Why(Proposition::atom("p")));
        assert_eq!(m.to_string(), "#1 bob: why(p) -> #0");
        assert!(m.played_by(&ParticipantId::new("bob")));
    }
}
