//! Protocol, termination and outcome rules
//!
//! Rules are plain enums so a session can list them in configuration.
//! Each one is a pure function of the dialogue state it is handed.

pub mod outcome;
pub mod protocol;
pub mod termination;

pub use outcome::{DeliberationOutcome, PersuasionOutcome};
pub use protocol::{first_violation, MoveLookup, ProtocolRule};
pub use termination::{first_termination, TerminationReason, TerminationRule};
