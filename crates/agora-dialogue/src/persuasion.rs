//! Persuasion dialogues
//!
//! A single reply tree rooted at a `claim` on a fixed topic. Besides the
//! tree the dialogue keeps each participant's commitments and, per move,
//! who has surrendered to it.

use crate::config::EngineConfig;
use crate::error::{DialogueError, ProtocolViolation};
use crate::rules::{first_termination, first_violation, MoveLookup, TerminationReason};
use crate::status;
use agora_core::{IndexedTree, Locution, Move, MoveId, ParticipantId, Proposition, TreeError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

/// Lifecycle of a persuasion dialogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersuasionState {
    #[default]
    Unopened,
    Active,
    Terminated,
}

impl fmt::Display for PersuasionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unopened => write!(f, "unopened"),
            Self::Active => write!(f, "active"),
            Self::Terminated => write!(f, "terminated"),
        }
    }
}

/// Source of participant commitments
pub trait Commitments {
    fn is_committed(&self, participant: &ParticipantId, proposition: &Proposition) -> bool;
}

/// Per-participant commitment sets, insertion ordered
#[derive(Debug, Clone, Default, Serialize)]
pub struct CommitmentStore {
    stores: HashMap<ParticipantId, Vec<Proposition>>,
}

impl CommitmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a commitment; returns whether it was new
    pub fn commit(&mut self, participant: &ParticipantId, proposition: &Proposition) -> bool {
        let store = self.stores.entry(participant.clone()).or_default();
        if store.contains(proposition) {
            return false;
        }
        store.push(proposition.clone());
        true
    }

    /// Withdraw a commitment; returns whether it was held
    pub fn retract(&mut self, participant: &ParticipantId, proposition: &Proposition) -> bool {
        self.withdraw(participant, proposition).is_some()
    }

    /// Remove a commitment and report where it sat
    fn withdraw(
        &mut self,
        participant: &ParticipantId,
        proposition: &Proposition,
    ) -> Option<usize> {
        let store = self.stores.get_mut(participant)?;
        let position = store.iter().position(|p| p == proposition)?;
        store.remove(position);
        Some(position)
    }

    pub fn commitments_of(&self, participant: &ParticipantId) -> &[Proposition] {
        self.stores
            .get(participant)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

impl Commitments for CommitmentStore {
    fn is_committed(&self, participant: &ParticipantId, proposition: &Proposition) -> bool {
        self.commitments_of(participant).contains(proposition)
    }
}

/// One change made while applying a move, kept so a failed batch can be
/// undone
#[derive(Debug, Clone)]
enum Undo {
    Opened(MoveId),
    Reply(MoveId),
    Surrendered(MoveId),
    Committed {
        participant: ParticipantId,
        created: bool,
    },
    Retracted {
        participant: ParticipantId,
        position: usize,
        proposition: Proposition,
    },
}

/// A single-topic persuasion dialogue
#[derive(Debug, Clone)]
pub struct PersuasionDialogue {
    topic: Proposition,
    state: PersuasionState,
    tree: IndexedTree<Move>,
    commitments: CommitmentStore,
    surrenders: HashMap<MoveId, Vec<ParticipantId>>,
    termination: Option<TerminationReason>,
    config: EngineConfig,
}

impl PersuasionDialogue {
    pub fn new(topic: Proposition) -> Self {
        Self::with_config(topic, EngineConfig::default())
    }

    pub fn with_config(topic: Proposition, config: EngineConfig) -> Self {
        Self {
            topic,
            state: PersuasionState::Unopened,
            tree: IndexedTree::new(),
            commitments: CommitmentStore::new(),
            surrenders: HashMap::new(),
            termination: None,
            config,
        }
    }

    pub fn topic(&self) -> &Proposition {
        &self.topic
    }

    pub fn state(&self) -> PersuasionState {
        self.state
    }

    pub fn set_state(&mut self, state: PersuasionState) {
        if self.state != state {
            info!(from = %self.state, to = %state, "persuasion state changed");
            self.state = state;
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tree(&self) -> &IndexedTree<Move> {
        &self.tree
    }

    pub fn commitments(&self) -> &CommitmentStore {
        &self.commitments
    }

    pub fn termination_reason(&self) -> Option<&TerminationReason> {
        self.termination.as_ref()
    }

    /// Players who surrendered to move `id`, in the order they did
    pub fn surrendered_by(&self, id: MoveId) -> &[ParticipantId] {
        self.surrenders
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn has_surrendered(&self, participant: &ParticipantId, id: MoveId) -> bool {
        self.surrendered_by(id).contains(participant)
    }

    /// Apply a batch of moves in order, all or nothing
    pub fn update(&mut self, moves: impl IntoIterator<Item = Move>) -> Result<(), DialogueError> {
        if self.state == PersuasionState::Terminated {
            return Err(DialogueError::StateViolation(
                "the dialogue has terminated".to_string(),
            ));
        }
        let mut journal = Vec::new();
        for mv in moves {
            let id = mv.id();
            if let Err(err) = self.apply(mv, &mut journal) {
                warn!(move_id = id, error = %err, undone = journal.len(), "batch rejected");
                self.rollback(journal);
                return Err(err);
            }
        }
        debug!(moves = self.tree.len(), "batch applied");
        Ok(())
    }

    /// Undo journalled changes, newest first
    fn rollback(&mut self, journal: Vec<Undo>) {
        for undo in journal.into_iter().rev() {
            match undo {
                Undo::Opened(id) | Undo::Reply(id) => {
                    if let Err(err) = self.tree.remove_subtree(id) {
                        warn!(move_id = id, error = %err, "rollback could not detach move");
                    }
                    if self.tree.is_empty() {
                        self.state = PersuasionState::Unopened;
                    }
                }
                Undo::Surrendered(target) => {
                    if let Some(players) = self.surrenders.get_mut(&target) {
                        players.pop();
                        if players.is_empty() {
                            self.surrenders.remove(&target);
                        }
                    }
                }
                Undo::Committed {
                    participant,
                    created,
                } => {
                    if let Some(store) = self.commitments.stores.get_mut(&participant) {
                        store.pop();
                        if created && store.is_empty() {
                            self.commitments.stores.remove(&participant);
                        }
                    }
                }
                Undo::Retracted {
                    participant,
                    position,
                    proposition,
                } => {
                    let store = self.commitments.stores.entry(participant).or_default();
                    store.insert(position.min(store.len()), proposition);
                }
            }
        }
    }

    /// First protocol rule the move would break, if any
    pub fn check(&self, candidate: &Move) -> Option<ProtocolViolation> {
        first_violation(&self.config.protocol_rules, self, candidate)
    }

    fn apply(&mut self, mv: Move, journal: &mut Vec<Undo>) -> Result<(), DialogueError> {
        if mv.locution().is_deliberation_only() {
            return Err(DialogueError::UnsupportedLocution {
                kind: mv.locution().kind(),
                dialogue: "persuasion",
            });
        }
        if self.state == PersuasionState::Unopened {
            return self.open(mv, journal);
        }
        if let Some(violation) = self.check(&mv) {
            return Err(violation.into());
        }
        if let Locution::Claim(_) = mv.locution() {
            return Err(DialogueError::StateViolation(format!(
                "move #{} claims after the dialogue was opened",
                mv.id()
            )));
        }
        self.attach(mv, journal).map(|_| ())
    }

    fn open(&mut self, mv: Move, journal: &mut Vec<Undo>) -> Result<(), DialogueError> {
        let opens_topic = matches!(mv.locution(), Locution::Claim(p) if *p == self.topic);
        if !opens_topic || mv.target().is_some() {
            return Err(DialogueError::StateViolation(format!(
                "the first move must claim '{}', got {}",
                self.topic,
                mv.locution()
            )));
        }
        self.record_commitments(&mv, journal);
        let id = self.tree.set_root(mv)?;
        journal.push(Undo::Opened(id));
        info!(move_id = id, topic = %self.topic, "persuasion opened");
        self.set_state(PersuasionState::Active);
        Ok(())
    }

    /// Attach a reply under its target, with commitment and surrender
    /// bookkeeping but no protocol check and no rollback
    pub fn add_persuasion_move_node(&mut self, mv: Move) -> Result<MoveId, DialogueError> {
        self.attach(mv, &mut Vec::new())
    }

    fn attach(&mut self, mv: Move, journal: &mut Vec<Undo>) -> Result<MoveId, DialogueError> {
        let target = match mv.target() {
            Some(target) if self.tree.contains(target) => target,
            target => {
                return Err(DialogueError::TargetNotFound {
                    move_id: mv.id(),
                    target,
                })
            }
        };
        if self.tree.contains(mv.id()) {
            return Err(TreeError::DuplicateId(mv.id()).into());
        }
        if mv.locution().is_surrendering() {
            if let Some(player) = mv.player() {
                self.surrenders.entry(target).or_default().push(player.clone());
                journal.push(Undo::Surrendered(target));
            }
        }
        self.record_commitments(&mv, journal);
        let id = self.tree.insert(target, mv)?;
        journal.push(Undo::Reply(id));
        debug!(move_id = id, target, "reply attached");
        Ok(id)
    }

    fn record_commitments(&mut self, mv: &Move, journal: &mut Vec<Undo>) {
        let Some(player) = mv.player() else {
            return;
        };
        match mv.locution() {
            Locution::Claim(p) | Locution::Concede(p) => self.commit(player, p, journal),
            Locution::Argue(argument) => {
                self.commit(player, &argument.claim, journal);
                for premise in argument.premise_closure() {
                    self.commit(player, premise, journal);
                }
            }
            Locution::Retract(p) => {
                if let Some(position) = self.commitments.withdraw(player, p) {
                    journal.push(Undo::Retracted {
                        participant: player.clone(),
                        position,
                        proposition: p.clone(),
                    });
                }
            }
            Locution::Why(_)
            | Locution::Propose(_)
            | Locution::Reject(_)
            | Locution::WhyReject(_)
            | Locution::WhyPropose(_)
            | Locution::DropReject(_)
            | Locution::Inform(_)
            | Locution::Prefer(_)
            | Locution::PreferEqual(_)
            | Locution::JoinDialogue(_)
            | Locution::OpenDialogue(_)
            | Locution::DenyDialogue(_) => {}
        }
    }

    fn commit(
        &mut self,
        player: &ParticipantId,
        proposition: &Proposition,
        journal: &mut Vec<Undo>,
    ) {
        let created = !self.commitments.stores.contains_key(player);
        if self.commitments.commit(player, proposition) {
            journal.push(Undo::Committed {
                participant: player.clone(),
                created,
            });
        }
    }

    pub fn is_in(&self, id: MoveId) -> Result<bool, DialogueError> {
        status::is_in(&self.tree, id, self.config.concede_matching)
    }

    /// Status of every move in the tree, computed in one pass
    pub fn statuses(&self) -> Result<HashMap<MoveId, bool>, DialogueError> {
        status::statuses(&self.tree, self.config.concede_matching)
    }

    /// Direct replies to `id`, in the order they were played
    pub fn replies(&self, id: MoveId) -> Result<Vec<&Move>, DialogueError> {
        let node = self.tree.find(id).ok_or(DialogueError::NotInTree(id))?;
        Ok(node.children().map(|c| c.data()).collect())
    }

    pub fn find_node_by_index(&self, id: MoveId) -> Option<&Move> {
        self.tree.find(id).map(|n| n.data())
    }

    pub fn active_attackers(&self) -> Result<Vec<&Move>, DialogueError> {
        status::active_attackers(&self.tree, self.config.concede_matching)
    }

    /// Whether a move with the same locution is already anywhere in the tree
    pub fn is_repeated_move(&self, candidate: &Move) -> bool {
        self.tree
            .iter()
            .any(|node| node.data().locution() == candidate.locution())
    }

    /// First configured termination rule that fires
    pub fn check_termination(
        &self,
        participant_count: usize,
        consecutive_skips: usize,
    ) -> Option<TerminationReason> {
        first_termination(
            &self.config.termination_rules,
            self,
            participant_count,
            consecutive_skips,
        )
    }

    pub fn terminate(&mut self, reason: TerminationReason) {
        info!(reason = %reason, "persuasion terminated");
        self.termination = Some(reason);
        self.set_state(PersuasionState::Terminated);
    }

    /// Winners under the configured outcome rule, judged against the
    /// dialogue's own commitment store
    pub fn winners(&self) -> Result<Vec<ParticipantId>, DialogueError> {
        self.config
            .persuasion_outcome
            .select(self, &self.commitments)
    }
}

impl MoveLookup for PersuasionDialogue {
    fn find_move(&self, id: MoveId) -> Option<&Move> {
        self.find_node_by_index(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::{Argument, ConcreteProposal, MoveFactory};

    fn prop(s: &str) -> Proposition {
        Proposition::parse(s).unwrap()
    }

    fn opened() -> (MoveFactory, PersuasionDialogue) {
        let mut factory = MoveFactory::new();
        let mut dialogue = PersuasionDialogue::new(prop("safe(car)"));
        dialogue
            .update(vec![factory.play("alice", None, Locution::Claim(prop("safe(car)")))])
            .unwrap();
        (factory, dialogue)
    }

    #[test]
    fn test_first_move_must_claim_topic() {
        let mut factory = MoveFactory::new();
        let mut dialogue = PersuasionDialogue::new(prop("safe(car)"));
        let err = dialogue
            .update(vec![factory.play("alice", None, Locution::Claim(prop("fast(car)")))])
            .unwrap_err();
        assert!(matches!(err, DialogueError::StateViolation(_)));
        assert_eq!(dialogue.state(), PersuasionState::Unopened);

        let err = dialogue
            .update(vec![factory.play("alice", None, Locution::Why(prop("safe(car)")))])
            .unwrap_err();
        assert!(matches!(err, DialogueError::StateViolation(_)));
    }

    #[test]
    fn test_opening_activates_and_commits() {
        let (_, dialogue) = opened();
        assert_eq!(dialogue.state(), PersuasionState::Active);
        assert!(dialogue.is_in(0).unwrap());
        assert!(dialogue
            .commitments()
            .is_committed(&ParticipantId::new("alice"), &prop("safe(car)")));
    }

    #[test]
    fn test_deliberation_locutions_are_unsupported() {
        let (mut factory, mut dialogue) = opened();
        let err = dialogue
            .update(vec![factory.play(
                "bob",
                None,
                Locution::Propose(ConcreteProposal::new(prop("bike"))),
            )])
            .unwrap_err();
        assert!(matches!(
            err,
            DialogueError::UnsupportedLocution { dialogue: "persuasion", .. }
        ));
        let err = dialogue
            .update(vec![factory.play("bob", Some(0), Locution::Reject(0))])
            .unwrap_err();
        assert!(matches!(err, DialogueError::UnsupportedLocution { .. }));
    }

    #[test]
    fn test_second_claim_is_rejected() {
        let (mut factory, mut dialogue) = opened();
        let err = dialogue
            .update(vec![factory.play("bob", None, Locution::Claim(prop("safe(car)")))])
            .unwrap_err();
        assert!(matches!(err, DialogueError::StateViolation(_)));
    }

    #[test]
    fn test_commitment_and_surrender_bookkeeping() {
        let (mut factory, mut dialogue) = opened();
        let bob = ParticipantId::new("bob");
        let alice = ParticipantId::new("alice");
        let argument = Argument::new(prop("safe(car)")).with_premise(prop("airbags(car)"));
        dialogue
            .update(vec![factory.play("bob", Some(0), Locution::Why(prop("safe(car)")))])
            .unwrap();
        dialogue
            .update(vec![factory.play("alice", Some(1), Locution::Argue(argument))])
            .unwrap();
        assert!(dialogue.commitments().is_committed(&alice, &prop("airbags(car)")));

        dialogue
            .update(vec![factory.play("bob", Some(2), Locution::Concede(prop("safe(car)")))])
            .unwrap();
        assert!(dialogue.commitments().is_committed(&bob, &prop("safe(car)")));
        assert_eq!(dialogue.surrendered_by(2), &[bob.clone()]);
        assert!(dialogue.has_surrendered(&bob, 2));
        assert!(!dialogue.has_surrendered(&bob, 0));

        dialogue
            .update(vec![factory.play("alice", Some(1), Locution::Retract(prop("safe(car)")))])
            .unwrap();
        assert!(!dialogue.commitments().is_committed(&alice, &prop("safe(car)")));
        assert!(dialogue.commitments().is_committed(&alice, &prop("airbags(car)")));
    }

    #[test]
    fn test_is_repeated_move() {
        let (mut factory, mut dialogue) = opened();
        dialogue
            .update(vec![factory.play("bob", Some(0), Locution::Why(prop("safe(car)")))])
            .unwrap();
        let again = factory.play("carol", Some(0), Locution::Why(prop("safe(car)")));
        let fresh = factory.play("carol", Some(0), Locution::Why(prop("cheap(car)")));
        assert!(dialogue.is_repeated_move(&again));
        assert!(!dialogue.is_repeated_move(&fresh));
    }

    #[test]
    fn test_unknown_target_fails() {
        let (mut factory, mut dialogue) = opened();
        let err = dialogue
            .update(vec![factory.play("bob", Some(42), Locution::Why(prop("safe(car)")))])
            .unwrap_err();
        assert!(matches!(
            err,
            DialogueError::TargetNotFound { target: Some(42), .. }
        ));
    }

    #[test]
    fn test_reused_id_is_rejected() {
        let (mut factory, mut dialogue) = opened();
        dialogue
            .update(vec![factory.play("bob", Some(0), Locution::Why(prop("safe(car)")))])
            .unwrap();
        factory.reset();
        factory.play("carol", None, Locution::Claim(prop("safe(car)")));
        let reused = factory.play("carol", Some(0), Locution::Why(prop("cheap(car)")));
        let err = dialogue.update(vec![reused]).unwrap_err();
        assert!(matches!(err, DialogueError::Tree(TreeError::DuplicateId(1))));
        assert_eq!(dialogue.tree().len(), 2);
        assert_eq!(dialogue.replies(0).unwrap().len(), 1);
    }

    #[test]
    fn test_failed_batch_restores_commitments_and_surrenders() {
        let (mut factory, mut dialogue) = opened();
        let alice = ParticipantId::new("alice");
        let bob = ParticipantId::new("bob");
        let argument = Argument::new(prop("safe(car)"))
            .with_premise(prop("airbags(car)"))
            .with_premise(prop("abs(car)"));
        dialogue
            .update(vec![
                factory.play("bob", Some(0), Locution::Why(prop("safe(car)"))),
                factory.play("alice", Some(1), Locution::Argue(argument)),
            ])
            .unwrap();
        let before = dialogue.commitments().commitments_of(&alice).to_vec();
        assert_eq!(
            before,
            vec![prop("safe(car)"), prop("airbags(car)"), prop("abs(car)")]
        );

        let err = dialogue
            .update(vec![
                factory.play("bob", Some(2), Locution::Concede(prop("safe(car)"))),
                factory.play("alice", Some(3), Locution::Retract(prop("airbags(car)"))),
                factory.play("bob", Some(99), Locution::Why(prop("abs(car)"))),
            ])
            .unwrap_err();
        assert!(matches!(err, DialogueError::TargetNotFound { .. }));

        assert_eq!(dialogue.commitments().commitments_of(&alice), before.as_slice());
        assert!(dialogue.commitments().commitments_of(&bob).is_empty());
        assert!(dialogue.surrendered_by(2).is_empty());
        assert_eq!(dialogue.tree().len(), 3);
        dialogue.tree().check_integrity().unwrap();
        assert!(dialogue.is_in(0).unwrap());
    }

    #[test]
    fn test_failed_opening_batch_leaves_dialogue_unopened() {
        let mut factory = MoveFactory::new();
        let mut dialogue = PersuasionDialogue::new(prop("safe(car)"));
        let err = dialogue
            .update(vec![
                factory.play("alice", None, Locution::Claim(prop("safe(car)"))),
                factory.play("bob", Some(7), Locution::Why(prop("safe(car)"))),
            ])
            .unwrap_err();
        assert!(matches!(err, DialogueError::TargetNotFound { .. }));
        assert_eq!(dialogue.state(), PersuasionState::Unopened);
        assert!(dialogue.tree().is_empty());
        assert!(dialogue
            .commitments()
            .commitments_of(&ParticipantId::new("alice"))
            .is_empty());

        factory.reset();
        dialogue
            .update(vec![factory.play("alice", None, Locution::Claim(prop("safe(car)")))])
            .unwrap();
        assert_eq!(dialogue.state(), PersuasionState::Active);
    }

    #[test]
    fn test_statuses_agree_with_is_in() {
        let (mut factory, mut dialogue) = opened();
        dialogue
            .update(vec![
                factory.play("bob", Some(0), Locution::Why(prop("safe(car)"))),
                factory.play("bob", Some(0), Locution::Concede(prop("safe(car)"))),
            ])
            .unwrap();
        let all = dialogue.statuses().unwrap();
        assert_eq!(all.len(), 3);
        for (id, status) in all {
            assert_eq!(status, dialogue.is_in(id).unwrap());
        }
    }
}
