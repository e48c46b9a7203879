//! # Agora Core
//!
//! Core types for the Agora dialogue engine:
//! - [`IndexedTree`]: arena tree with O(1) lookup by move id
//! - [`Move`] / [`MoveFactory`]: immutable utterances and their per-session id counter
//! - [`Locution`]: the closed set of utterance kinds and their capabilities
//! - [`Proposition`] / [`Argument`]: payloads produced by the inference engine
//!
//! ```rust
//! use agora_core::{IndexedTree, Locution, MoveFactory, Proposition};
//!
//! let mut factory = MoveFactory::new();
//! let claim = factory.play("alice", None, Locution::Claim(Proposition::atom("rain")));
//! let why = factory.play("bob", Some(claim.id()), Locution::Why(Proposition::atom("rain")));
//!
//! let mut tree = IndexedTree::with_root(claim);
//! tree.insert(0, why).unwrap();
//! assert_eq!(tree.children(0), Some(&[1][..]));
//! ```

pub mod locution;
pub mod moves;
pub mod proposition;
pub mod tree;

pub use locution::{Capability, ConcreteProposal, DialogueTopic, Locution, LocutionKind, OptionPair};
pub use moves::{Move, MoveFactory, MoveId, ParticipantId};
pub use proposition::{Argument, ParseError, Proposition, Term, MAX_TERM_DEPTH};
pub use tree::{Indexed, IndexedTree, Lookup, NodeRef, TreeError};
