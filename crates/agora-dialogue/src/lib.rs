//! # Agora Dialogue
//!
//! Dialogue engines built on [`agora_core`]:
//! - [`DeliberationDialogue`]: proposals, each with its own reply tree
//! - [`PersuasionDialogue`]: a single tree rooted at a claim, with commitments
//! - [`status`]: the `is_in` predicate and active attackers
//! - [`rules`]: protocol, termination and outcome rules
//!
//! ```rust
//! use agora_core::{ConcreteProposal, Locution, MoveFactory, Proposition};
//! use agora_dialogue::{DeliberationDialogue, DeliberationState};
//!
//! let mut factory = MoveFactory::new();
//! let mut dialogue = DeliberationDialogue::new(Proposition::atom("dinner"), None);
//! dialogue.set_state(DeliberationState::Deliberating);
//!
//! let pizza = ConcreteProposal::new(Proposition::atom("pizza"));
//! dialogue
//!     .update(vec![factory.play("alice", None, Locution::Propose(pizza))])
//!     .unwrap();
//! assert!(dialogue.is_in(0).unwrap());
//!
//! dialogue
//!     .update(vec![factory.play("bob", Some(0), Locution::Reject(0))])
//!     .unwrap();
//! assert!(!dialogue.is_in(0).unwrap());
//! ```

pub mod config;
pub mod deliberation;
pub mod error;
pub mod persuasion;
pub mod rules;
pub mod status;

pub use config::{ConfigError, EngineConfig};
pub use deliberation::{DeliberationDialogue, DeliberationState, Proposal};
pub use error::{DialogueError, ProtocolViolation};
pub use persuasion::{CommitmentStore, Commitments, PersuasionDialogue, PersuasionState};
pub use rules::{
    DeliberationOutcome, MoveLookup, PersuasionOutcome, ProtocolRule, TerminationReason,
    TerminationRule,
};
pub use status::{active_attackers, is_in, ConcedeMatching};
