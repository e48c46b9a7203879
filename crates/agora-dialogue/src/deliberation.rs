//! Deliberation dialogues
//!
//! Participants put forward proposals and argue about them. Every proposal
//! owns the reply tree rooted at its `propose` move; replies are routed to
//! whichever proposal holds their target.

use crate::config::EngineConfig;
use crate::error::{DialogueError, ProtocolViolation};
use crate::rules::{first_termination, first_violation, MoveLookup, TerminationReason};
use crate::status::{self, ConcedeMatching};
use agora_core::{
    ConcreteProposal, IndexedTree, Locution, Lookup, Move, MoveId, ParticipantId, Proposition,
    TreeError,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

/// Lifecycle of a deliberation dialogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliberationState {
    #[default]
    Unopened,
    Joining,
    Deliberating,
    Terminating,
    Terminated,
}

impl fmt::Display for DeliberationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unopened => write!(f, "unopened"),
            Self::Joining => write!(f, "joining"),
            Self::Deliberating => write!(f, "deliberating"),
            Self::Terminating => write!(f, "terminating"),
            Self::Terminated => write!(f, "terminated"),
        }
    }
}

/// A proposal and its reply tree
#[derive(Debug, Clone)]
pub struct Proposal {
    id: MoveId,
    option: ConcreteProposal,
    proposer: Option<ParticipantId>,
    tree: IndexedTree<Move>,
}

impl Proposal {
    /// Open a proposal rooted at a `propose` move
    pub fn open(root: Move) -> Result<Self, DialogueError> {
        let option = match root.locution() {
            Locution::Propose(option) => option.clone(),
            other => {
                return Err(DialogueError::StateViolation(format!(
                    "a proposal must be opened by a propose move, got {}",
                    other.kind()
                )))
            }
        };
        Ok(Self {
            id: root.id(),
            option,
            proposer: root.player().cloned(),
            tree: IndexedTree::with_root(root),
        })
    }

    /// Id of the `propose` move
    pub fn id(&self) -> MoveId {
        self.id
    }

    pub fn option(&self) -> &ConcreteProposal {
        &self.option
    }

    pub fn proposer(&self) -> Option<&ParticipantId> {
        self.proposer.as_ref()
    }

    pub fn tree(&self) -> &IndexedTree<Move> {
        &self.tree
    }

    pub fn contains(&self, id: MoveId) -> bool {
        self.tree.contains(id)
    }

    pub fn locate(&self, id: MoveId) -> Lookup<'_, Move> {
        self.tree.locate(id)
    }

    /// Attach a reply under its target, which must be in this proposal
    pub fn add_move_node(&mut self, mv: Move) -> Result<MoveId, DialogueError> {
        let target = mv.target().ok_or(DialogueError::TargetNotFound {
            move_id: mv.id(),
            target: None,
        })?;
        if !self.tree.contains(target) {
            return Err(DialogueError::TargetNotFound {
                move_id: mv.id(),
                target: Some(target),
            });
        }
        Ok(self.tree.insert(target, mv)?)
    }

    pub fn is_in(&self, id: MoveId, matching: ConcedeMatching) -> Result<bool, DialogueError> {
        status::is_in(&self.tree, id, matching)
    }

    /// Status of every move in the proposal, computed in one pass
    pub fn statuses(
        &self,
        matching: ConcedeMatching,
    ) -> Result<HashMap<MoveId, bool>, DialogueError> {
        status::statuses(&self.tree, matching)
    }

    /// Whether the proposal itself currently stands
    pub fn is_accepted(&self, matching: ConcedeMatching) -> Result<bool, DialogueError> {
        self.is_in(self.id, matching)
    }

    /// Direct replies to `id`, in the order they were played
    pub fn replies(&self, id: MoveId) -> Result<Vec<&Move>, DialogueError> {
        let node = self.tree.find(id).ok_or(DialogueError::NotInTree(id))?;
        Ok(node.children().map(|c| c.data()).collect())
    }

    pub fn active_attackers(&self, matching: ConcedeMatching) -> Result<Vec<&Move>, DialogueError> {
        status::active_attackers(&self.tree, matching)
    }

    /// Number of moves in the proposal, root included
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

/// A change made by one applied move, kept so a failed batch can be undone
#[derive(Debug, Clone, Copy)]
enum Applied {
    Opened,
    Informed,
    NonTargeted,
    Reply { proposal: usize, id: MoveId },
    Unchanged,
}

/// A multi-proposal deliberation dialogue
#[derive(Debug, Clone)]
pub struct DeliberationDialogue {
    state: DeliberationState,
    topic: Proposition,
    goal: Option<Proposition>,
    proposals: Vec<Proposal>,
    informed: Vec<Proposition>,
    non_targeted: Vec<Move>,
    termination: Option<TerminationReason>,
    config: EngineConfig,
}

impl DeliberationDialogue {
    pub fn new(topic: Proposition, goal: Option<Proposition>) -> Self {
        Self::with_config(topic, goal, EngineConfig::default())
    }

    pub fn with_config(topic: Proposition, goal: Option<Proposition>, config: EngineConfig) -> Self {
        Self {
            state: DeliberationState::Unopened,
            topic,
            goal,
            proposals: Vec::new(),
            informed: Vec::new(),
            non_targeted: Vec::new(),
            termination: None,
            config,
        }
    }

    pub fn state(&self) -> DeliberationState {
        self.state
    }

    pub fn set_state(&mut self, state: DeliberationState) {
        if self.state != state {
            info!(from = %self.state, to = %state, "deliberation state changed");
            self.state = state;
        }
    }

    pub fn topic(&self) -> &Proposition {
        &self.topic
    }

    pub fn goal(&self) -> Option<&Proposition> {
        self.goal.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Proposals in the order they were made
    pub fn proposals(&self) -> &[Proposal] {
        &self.proposals
    }

    /// Proposal opened by move `id`
    pub fn proposal(&self, id: MoveId) -> Option<&Proposal> {
        self.proposals.iter().find(|p| p.id() == id)
    }

    /// Beliefs shared with `inform`, in the order first informed
    pub fn informed_beliefs(&self) -> &[Proposition] {
        &self.informed
    }

    pub fn is_informed(&self, belief: &Proposition) -> bool {
        self.informed.contains(belief)
    }

    /// Preference and dialogue-control moves, which never join a tree
    pub fn non_targeted(&self) -> &[Move] {
        &self.non_targeted
    }

    pub fn termination_reason(&self) -> Option<&TerminationReason> {
        self.termination.as_ref()
    }

    /// Apply a batch of moves in order
    ///
    /// Either every move is applied or none is: on error the dialogue is
    /// left exactly as it was before the call.
    pub fn update(&mut self, moves: impl IntoIterator<Item = Move>) -> Result<(), DialogueError> {
        if self.state == DeliberationState::Terminated {
            return Err(DialogueError::StateViolation(
                "the dialogue has terminated".to_string(),
            ));
        }
        let mut journal = Vec::new();
        for mv in moves {
            let id = mv.id();
            match self.apply(mv) {
                Ok(change) => journal.push(change),
                Err(err) => {
                    warn!(move_id = id, error = %err, undone = journal.len(), "batch rejected");
                    self.rollback(journal);
                    return Err(err);
                }
            }
        }
        debug!(
            applied = journal.len(),
            proposals = self.proposals.len(),
            "batch applied"
        );
        Ok(())
    }

    /// Undo journalled changes, newest first
    fn rollback(&mut self, journal: Vec<Applied>) {
        for change in journal.into_iter().rev() {
            match change {
                Applied::Opened => {
                    self.proposals.pop();
                }
                Applied::Informed => {
                    self.informed.pop();
                }
                Applied::NonTargeted => {
                    self.non_targeted.pop();
                }
                Applied::Reply { proposal, id } => {
                    if let Some(proposal) = self.proposals.get_mut(proposal) {
                        if let Err(err) = proposal.tree.remove_subtree(id) {
                            warn!(move_id = id, error = %err, "rollback could not detach reply");
                        }
                    }
                }
                Applied::Unchanged => {}
            }
        }
    }

    /// First protocol rule the move would break, if any
    pub fn check(&self, candidate: &Move) -> Option<ProtocolViolation> {
        first_violation(&self.config.protocol_rules, self, candidate)
    }

    fn apply(&mut self, mv: Move) -> Result<Applied, DialogueError> {
        if let Some(violation) = self.check(&mv) {
            return Err(violation.into());
        }
        self.ensure_unused(mv.id())?;
        match mv.locution() {
            Locution::Propose(_) => self.open_proposal(mv).map(|_| Applied::Opened),
            Locution::Inform(belief) => {
                debug!(move_id = mv.id(), "belief informed");
                if self.informed.contains(belief) {
                    return Ok(Applied::Unchanged);
                }
                self.informed.push(belief.clone());
                Ok(Applied::Informed)
            }
            Locution::Prefer(_)
            | Locution::PreferEqual(_)
            | Locution::JoinDialogue(_)
            | Locution::OpenDialogue(_)
            | Locution::DenyDialogue(_) => {
                debug!(move_id = mv.id(), kind = %mv.locution().kind(), "non-targeted move recorded");
                self.non_targeted.push(mv);
                Ok(Applied::NonTargeted)
            }
            Locution::Why(_)
            | Locution::Argue(_)
            | Locution::Concede(_)
            | Locution::Retract(_)
            | Locution::Reject(_)
            | Locution::WhyReject(_)
            | Locution::WhyPropose(_)
            | Locution::DropReject(_) => self
                .attach(mv)
                .map(|(proposal, id)| Applied::Reply { proposal, id }),
            Locution::Claim(_) => Err(DialogueError::UnsupportedLocution {
                kind: mv.locution().kind(),
                dialogue: "deliberation",
            }),
        }
    }

    /// Move ids are unique across every proposal and the non-targeted list
    fn ensure_unused(&self, id: MoveId) -> Result<(), DialogueError> {
        let taken = self.find_node_by_index(id).is_some()
            || self.non_targeted.iter().any(|m| m.id() == id);
        if taken {
            return Err(TreeError::DuplicateId(id).into());
        }
        Ok(())
    }

    fn open_proposal(&mut self, mv: Move) -> Result<MoveId, DialogueError> {
        if self.state != DeliberationState::Deliberating {
            return Err(DialogueError::StateViolation(format!(
                "move #{} proposes while the dialogue is {}",
                mv.id(),
                self.state
            )));
        }
        let proposal = Proposal::open(mv)?;
        let id = proposal.id();
        debug!(move_id = id, option = %proposal.option().option, "proposal opened");
        self.proposals.push(proposal);
        Ok(id)
    }

    /// Attach a reply to the first proposal, in creation order, that holds
    /// its target
    ///
    /// Unlike [`update`](Self::update) this applies a single move with no
    /// protocol check and no rollback.
    pub fn add_move_node(&mut self, mv: Move) -> Result<MoveId, DialogueError> {
        self.ensure_unused(mv.id())?;
        self.attach(mv).map(|(_, id)| id)
    }

    /// Route a reply to its proposal; returns the proposal's position and
    /// the reply id
    fn attach(&mut self, mv: Move) -> Result<(usize, MoveId), DialogueError> {
        let Some(target) = mv.target() else {
            return Err(DialogueError::TargetNotFound {
                move_id: mv.id(),
                target: None,
            });
        };
        for (position, proposal) in self.proposals.iter_mut().enumerate() {
            let found = match proposal.locate(target) {
                Lookup::Found(_) => true,
                Lookup::NotInThisTree => false,
                Lookup::Structural(err) => return Err(err.into()),
            };
            if found {
                debug!(move_id = mv.id(), target, proposal = proposal.id(), "reply attached");
                return proposal.add_move_node(mv).map(|id| (position, id));
            }
        }
        Err(DialogueError::TargetNotFound {
            move_id: mv.id(),
            target: Some(target),
        })
    }

    fn proposal_holding(&self, id: MoveId) -> Result<&Proposal, DialogueError> {
        self.proposals
            .iter()
            .find(|p| p.contains(id))
            .ok_or(DialogueError::NotInTree(id))
    }

    /// Dialectical status of any move in any proposal
    pub fn is_in(&self, id: MoveId) -> Result<bool, DialogueError> {
        self.proposal_holding(id)?
            .is_in(id, self.config.concede_matching)
    }

    /// Direct replies to `id`
    pub fn replies(&self, id: MoveId) -> Result<Vec<&Move>, DialogueError> {
        self.proposal_holding(id)?.replies(id)
    }

    /// Look a move up in any proposal
    pub fn find_node_by_index(&self, id: MoveId) -> Option<&Move> {
        self.proposals
            .iter()
            .find_map(|p| p.tree().find(id).map(|n| n.data()))
    }

    /// Active attackers of every proposal, proposals in creation order
    pub fn active_attackers(&self) -> Result<Vec<&Move>, DialogueError> {
        let mut out = Vec::new();
        for proposal in &self.proposals {
            out.extend(proposal.active_attackers(self.config.concede_matching)?);
        }
        Ok(out)
    }

    /// Proposals that currently stand, in creation order
    pub fn accepted_proposals(&self) -> Result<Vec<&Proposal>, DialogueError> {
        let mut out = Vec::new();
        for proposal in &self.proposals {
            if proposal.is_accepted(self.config.concede_matching)? {
                out.push(proposal);
            }
        }
        Ok(out)
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
        info!(reason = %reason, "deliberation terminated");
        self.termination = Some(reason);
        self.set_state(DeliberationState::Terminated);
    }

    /// Winning proposal under the configured outcome rule
    pub fn winner<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Option<&Proposal>, DialogueError> {
        self.config.deliberation_outcome.select(self, rng)
    }
}

impl MoveLookup for DeliberationDialogue {
    fn find_move(&self, id: MoveId) -> Option<&Move> {
        self.find_node_by_index(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::{MoveFactory, OptionPair};

    fn prop(s: &str) -> Proposition {
        Proposition::parse(s).unwrap()
    }

    fn open_dialogue() -> DeliberationDialogue {
        let mut dialogue = DeliberationDialogue::new(prop("dinner"), Some(prop("fed")));
        dialogue.set_state(DeliberationState::Deliberating);
        dialogue
    }

    fn propose(factory: &mut MoveFactory, player: &str, option: &str) -> Move {
        factory.play(player, None, Locution::Propose(ConcreteProposal::new(prop(option))))
    }

    #[test]
    fn test_propose_requires_deliberating() {
        let mut factory = MoveFactory::new();
        let mut dialogue = DeliberationDialogue::new(prop("dinner"), None);
        let err = dialogue
            .update(vec![propose(&mut factory, "alice", "pizza")])
            .unwrap_err();
        assert!(matches!(err, DialogueError::StateViolation(_)));
        assert!(dialogue.proposals().is_empty());
    }

    #[test]
    fn test_replies_route_to_owning_proposal() {
        let mut factory = MoveFactory::new();
        let mut dialogue = open_dialogue();
        dialogue
            .update(vec![
                propose(&mut factory, "alice", "pizza"),
                propose(&mut factory, "bob", "sushi"),
            ])
            .unwrap();
        dialogue
            .update(vec![factory.play("alice", Some(1), Locution::Reject(1))])
            .unwrap();

        assert_eq!(dialogue.proposals()[0].len(), 1);
        assert_eq!(dialogue.proposals()[1].len(), 2);
        assert!(dialogue.is_in(0).unwrap());
        assert!(!dialogue.is_in(1).unwrap());
        assert_eq!(dialogue.replies(1).unwrap()[0].id(), 2);
        assert_eq!(dialogue.find_node_by_index(2).map(|m| m.id()), Some(2));
    }

    #[test]
    fn test_inform_and_non_targeted_moves_stay_out_of_trees() {
        let mut factory = MoveFactory::new();
        let mut dialogue = open_dialogue();
        let pair = OptionPair {
            first: prop("pizza"),
            second: prop("sushi"),
        };
        dialogue
            .update(vec![
                factory.play("alice", None, Locution::Inform(prop("open(pizzeria)"))),
                factory.play("bob", None, Locution::Inform(prop("open(pizzeria)"))),
                factory.play("bob", None, Locution::Prefer(pair)),
            ])
            .unwrap();
        assert_eq!(dialogue.informed_beliefs(), &[prop("open(pizzeria)")]);
        assert!(dialogue.is_informed(&prop("open(pizzeria)")));
        assert_eq!(dialogue.non_targeted().len(), 1);
        assert!(dialogue.proposals().is_empty());
        assert!(matches!(dialogue.is_in(2), Err(DialogueError::NotInTree(2))));
    }

    #[test]
    fn test_reply_without_target_fails() {
        let mut factory = MoveFactory::new();
        let mut dialogue = open_dialogue();
        dialogue.update(vec![propose(&mut factory, "alice", "pizza")]).unwrap();
        let err = dialogue
            .update(vec![factory.play("bob", None, Locution::Why(prop("pizza")))])
            .unwrap_err();
        assert!(matches!(
            err,
            DialogueError::TargetNotFound { move_id: 1, target: None }
        ));
    }

    #[test]
    fn test_claim_is_unsupported() {
        let mut factory = MoveFactory::new();
        let mut dialogue = open_dialogue();
        let err = dialogue
            .update(vec![factory.play("alice", None, Locution::Claim(prop("p")))])
            .unwrap_err();
        assert!(matches!(err, DialogueError::UnsupportedLocution { .. }));
    }

    #[test]
    fn test_terminated_dialogue_rejects_updates() {
        let mut factory = MoveFactory::new();
        let mut dialogue = open_dialogue();
        let reason = dialogue.check_termination(0, 0).unwrap();
        dialogue.terminate(reason);
        assert_eq!(dialogue.state(), DeliberationState::Terminated);
        assert!(dialogue.termination_reason().is_some());
        let err = dialogue
            .update(vec![propose(&mut factory, "alice", "pizza")])
            .unwrap_err();
        assert!(matches!(err, DialogueError::StateViolation(_)));
    }

    #[test]
    fn test_reused_id_cannot_open_second_proposal() {
        let mut factory = MoveFactory::new();
        let mut dialogue = open_dialogue();
        dialogue
            .update(vec![
                propose(&mut factory, "alice", "pizza"),
                propose(&mut factory, "bob", "sushi"),
            ])
            .unwrap();

        factory.reset();
        let err = dialogue
            .update(vec![propose(&mut factory, "carol", "tacos")])
            .unwrap_err();
        assert!(matches!(err, DialogueError::Tree(TreeError::DuplicateId(0))));
        let ids: Vec<MoveId> = dialogue.proposals().iter().map(|p| p.id()).collect();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn test_reused_id_cannot_join_another_proposal() {
        let mut factory = MoveFactory::new();
        let mut dialogue = open_dialogue();
        dialogue
            .update(vec![
                propose(&mut factory, "alice", "pizza"),
                propose(&mut factory, "bob", "sushi"),
            ])
            .unwrap();

        // id 1 already roots the sushi proposal
        let mut stale = MoveFactory::new();
        stale.play("carol", None, Locution::Inform(prop("hungry")));
        let reused = stale.play("carol", Some(0), Locution::Reject(0));
        assert_eq!(reused.id(), 1);
        let err = dialogue.update(vec![reused.clone()]).unwrap_err();
        assert!(matches!(err, DialogueError::Tree(TreeError::DuplicateId(1))));
        assert!(matches!(
            dialogue.add_move_node(reused),
            Err(DialogueError::Tree(TreeError::DuplicateId(1)))
        ));
        assert_eq!(dialogue.proposals()[0].len(), 1);
        assert!(dialogue.is_in(0).unwrap());
    }

    #[test]
    fn test_failed_batch_undoes_every_kind_of_change() {
        let mut factory = MoveFactory::new();
        let mut dialogue = open_dialogue();
        dialogue
            .update(vec![propose(&mut factory, "alice", "pizza")])
            .unwrap();
        let pair = OptionPair {
            first: prop("pizza"),
            second: prop("sushi"),
        };
        let err = dialogue
            .update(vec![
                factory.play("bob", Some(0), Locution::Reject(0)),
                factory.play("alice", Some(1), Locution::WhyReject(0)),
                propose(&mut factory, "bob", "sushi"),
                factory.play("bob", None, Locution::Inform(prop("open(sushi_bar)"))),
                factory.play("bob", None, Locution::Prefer(pair)),
                factory.play("carol", Some(99), Locution::Reject(99)),
            ])
            .unwrap_err();
        assert!(matches!(err, DialogueError::TargetNotFound { .. }));

        assert_eq!(dialogue.proposals().len(), 1);
        assert_eq!(dialogue.proposals()[0].len(), 1);
        dialogue.proposals()[0].tree().check_integrity().unwrap();
        assert!(dialogue.replies(0).unwrap().is_empty());
        assert!(dialogue.informed_beliefs().is_empty());
        assert!(dialogue.non_targeted().is_empty());
        assert!(dialogue.is_in(0).unwrap());
    }

    #[test]
    fn test_statuses_match_is_in() {
        let mut factory = MoveFactory::new();
        let mut dialogue = open_dialogue();
        dialogue
            .update(vec![
                propose(&mut factory, "alice", "pizza"),
                factory.play("bob", Some(0), Locution::Reject(0)),
                factory.play("alice", Some(1), Locution::WhyReject(0)),
            ])
            .unwrap();
        let proposal = &dialogue.proposals()[0];
        let statuses = proposal.statuses(ConcedeMatching::Structural).unwrap();
        assert_eq!(statuses.len(), 3);
        for id in 0..3 {
            assert_eq!(statuses[&id], dialogue.is_in(id).unwrap());
        }
    }

    #[test]
    fn test_protocol_rules_apply_within_batch() {
        let mut factory = MoveFactory::new();
        let mut dialogue = open_dialogue();
        let err = dialogue
            .update(vec![
                propose(&mut factory, "alice", "pizza"),
                factory.play("alice", Some(0), Locution::WhyPropose(0)),
            ])
            .unwrap_err();
        match err {
            DialogueError::ProtocolViolation(violation) => assert_eq!(violation.offending.id(), 1),
            other => panic!("unexpected error: {other}"),
        }
        assert!(dialogue.proposals().is_empty());
    }
}
