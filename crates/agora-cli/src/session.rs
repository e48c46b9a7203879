//! Transcript replay
//!
//! A transcript is a list of rounds; each turn in a round is one
//! participant's batch of moves, handed to `update` in one call. Move ids
//! are assigned in transcript order, rejected batches included, so targets
//! can be written down before the transcript is replayed.

use agora_core::{IndexedTree, Locution, Move, MoveFactory, MoveId, ParticipantId, Proposition};
use agora_dialogue::{
    DeliberationDialogue, DeliberationOutcome, DeliberationState, DialogueError, EngineConfig,
    PersuasionDialogue, PersuasionOutcome, TerminationReason,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueKind {
    Deliberation,
    Persuasion,
}

/// A recorded or scripted dialogue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub kind: DialogueKind,
    pub topic: Proposition,
    #[serde(default)]
    pub goal: Option<Proposition>,
    pub participants: Vec<ParticipantId>,
    #[serde(default)]
    pub rounds: Vec<Round>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Round {
    #[serde(default)]
    pub turns: Vec<Turn>,
}

/// One participant's turn; no moves means the turn was skipped
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub player: ParticipantId,
    #[serde(default)]
    pub moves: Vec<PlannedMove>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedMove {
    #[serde(default)]
    pub target: Option<MoveId>,
    pub say: Locution,
}

/// The dialogue being replayed
#[derive(Debug)]
pub enum Session {
    Deliberation(DeliberationDialogue),
    Persuasion(PersuasionDialogue),
}

impl Session {
    /// Deliberations start in the deliberating state so proposals are accepted
    pub fn open(transcript: &Transcript, config: EngineConfig) -> Self {
        match transcript.kind {
            DialogueKind::Deliberation => {
                let mut dialogue = DeliberationDialogue::with_config(
                    transcript.topic.clone(),
                    transcript.goal.clone(),
                    config,
                );
                dialogue.set_state(DeliberationState::Deliberating);
                Self::Deliberation(dialogue)
            }
            DialogueKind::Persuasion => Self::Persuasion(PersuasionDialogue::with_config(
                transcript.topic.clone(),
                config,
            )),
        }
    }

    pub fn update(&mut self, moves: Vec<Move>) -> Result<(), DialogueError> {
        match self {
            Self::Deliberation(d) => d.update(moves),
            Self::Persuasion(p) => p.update(moves),
        }
    }

    pub fn check_termination(
        &self,
        participant_count: usize,
        consecutive_skips: usize,
    ) -> Option<TerminationReason> {
        match self {
            Self::Deliberation(d) => d.check_termination(participant_count, consecutive_skips),
            Self::Persuasion(p) => p.check_termination(participant_count, consecutive_skips),
        }
    }

    pub fn terminate(&mut self, reason: TerminationReason) {
        match self {
            Self::Deliberation(d) => d.terminate(reason),
            Self::Persuasion(p) => p.terminate(reason),
        }
    }

    pub fn state(&self) -> String {
        match self {
            Self::Deliberation(d) => d.state().to_string(),
            Self::Persuasion(p) => p.state().to_string(),
        }
    }
}

/// What happened to one turn's batch
#[derive(Debug, Clone, Serialize)]
pub struct BatchRecord {
    pub round: usize,
    pub player: ParticipantId,
    pub moves: Vec<MoveId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchRecord {
    pub fn accepted(&self) -> bool {
        self.error.is_none()
    }
}

/// A transcript after it has been fed through the engine
#[derive(Debug)]
pub struct Replay {
    pub kind: DialogueKind,
    pub topic: Proposition,
    pub session: Session,
    pub batches: Vec<BatchRecord>,
    pub termination: Option<TerminationReason>,
}

/// Feed every turn to the engine, stopping once a termination rule fires
///
/// A rejected batch is recorded and discarded; the player counts as having
/// skipped the turn.
pub fn replay(transcript: &Transcript, config: EngineConfig) -> Replay {
    let participant_count = transcript.participants.len();
    let mut session = Session::open(transcript, config);
    let mut factory = MoveFactory::new();
    let mut batches = Vec::new();
    let mut termination = None;
    let mut skips = 0;

    'rounds: for (round, r) in transcript.rounds.iter().enumerate() {
        for turn in &r.turns {
            if turn.moves.is_empty() {
                skips += 1;
                debug!(round, player = %turn.player, skips, "turn skipped");
            } else {
                let moves: Vec<Move> = turn
                    .moves
                    .iter()
                    .map(|m| factory.play(turn.player.clone(), m.target, m.say.clone()))
                    .collect();
                let ids = moves.iter().map(Move::id).collect();
                let error = match session.update(moves) {
                    Ok(()) => {
                        skips = 0;
                        None
                    }
                    Err(err) => {
                        warn!(round, player = %turn.player, error = %err, "batch discarded");
                        skips += 1;
                        Some(err.to_string())
                    }
                };
                batches.push(BatchRecord {
                    round,
                    player: turn.player.clone(),
                    moves: ids,
                    error,
                });
            }

            if let Some(reason) = session.check_termination(participant_count, skips) {
                info!(round, reason = %reason, "replay stopped");
                session.terminate(reason.clone());
                termination = Some(reason);
                break 'rounds;
            }
        }
    }

    Replay {
        kind: transcript.kind,
        topic: transcript.topic.clone(),
        session,
        batches,
        termination,
    }
}

/// Status of one move in the final state
#[derive(Debug, Clone, Serialize)]
pub struct MoveStatus {
    pub id: MoveId,
    pub player: Option<ParticipantId>,
    pub target: Option<MoveId>,
    pub locution: String,
    pub is_in: bool,
}

impl MoveStatus {
    fn new(mv: &Move, is_in: bool) -> Self {
        Self {
            id: mv.id(),
            player: mv.player().cloned(),
            target: mv.target(),
            locution: mv.locution().to_string(),
            is_in,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Deliberation {
        rule: DeliberationOutcome,
        proposal: Option<MoveId>,
        option: Option<Proposition>,
    },
    Persuasion {
        rule: PersuasionOutcome,
        winners: Vec<ParticipantId>,
    },
}

/// Final state of a replay, ready to print or serialise
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub kind: DialogueKind,
    pub topic: Proposition,
    pub state: String,
    pub batches: Vec<BatchRecord>,
    pub termination: Option<TerminationReason>,
    pub moves: Vec<MoveStatus>,
    pub active_attackers: Vec<MoveId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub informed: Vec<Proposition>,
    pub outcome: Outcome,
}

impl Replay {
    /// First batch the engine refused, if any
    pub fn first_rejection(&self) -> Option<&BatchRecord> {
        self.batches.iter().find(|b| !b.accepted())
    }

    pub fn report(&self) -> Result<Report, DialogueError> {
        let mut moves = Vec::new();
        let (active, informed, outcome) = match &self.session {
            Session::Deliberation(d) => {
                for proposal in d.proposals() {
                    let statuses = proposal.statuses(d.config().concede_matching)?;
                    push_statuses(&mut moves, proposal.tree(), &statuses)?;
                }
                let mut rng = d.config().rng();
                let winner = d.winner(&mut rng)?;
                let outcome = Outcome::Deliberation {
                    rule: d.config().deliberation_outcome,
                    proposal: winner.map(|p| p.id()),
                    option: winner.map(|p| p.option().option.clone()),
                };
                (
                    d.active_attackers()?,
                    d.informed_beliefs().to_vec(),
                    outcome,
                )
            }
            Session::Persuasion(p) => {
                push_statuses(&mut moves, p.tree(), &p.statuses()?)?;
                let outcome = Outcome::Persuasion {
                    rule: p.config().persuasion_outcome,
                    winners: p.winners()?,
                };
                (p.active_attackers()?, Vec::new(), outcome)
            }
        };

        Ok(Report {
            kind: self.kind,
            topic: self.topic.clone(),
            state: self.session.state(),
            batches: self.batches.clone(),
            termination: self.termination.clone(),
            moves,
            active_attackers: active.iter().map(|m| m.id()).collect(),
            informed,
            outcome,
        })
    }
}

/// One row per move, in tree pre-order
fn push_statuses(
    out: &mut Vec<MoveStatus>,
    tree: &IndexedTree<Move>,
    statuses: &HashMap<MoveId, bool>,
) -> Result<(), DialogueError> {
    for node in tree.iter() {
        let is_in = statuses
            .get(&node.id())
            .copied()
            .ok_or(DialogueError::NotInTree(node.id()))?;
        out.push(MoveStatus::new(node.data(), is_in));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_dialogue::TerminationRule;

    const DELIBERATION: &str = r#"{
        "kind": "deliberation",
        "topic": "dinner",
        "participants": ["alice", "bob"],
        "rounds": [
            {"turns": [
                {"player": "alice", "moves": [{"say": {"propose": {"option": "pizza"}}}]},
                {"player": "bob", "moves": [{"target": 0, "say": {"why-propose": 0}}]}
            ]},
            {"turns": [
                {"player": "alice", "moves": [{"say": {"inform": "cheap(pizza)"}}]},
                {"player": "bob", "moves": [
                    {"target": 0, "say": {"why": "pizza"}},
                    {"target": 99, "say": {"why": "pizza"}}
                ]}
            ]},
            {"turns": [{"player": "alice"}, {"player": "bob"}]},
            {"turns": [
                {"player": "alice", "moves": [{"say": {"propose": {"option": "sushi"}}}]}
            ]}
        ]
    }"#;

    const PERSUASION: &str = r#"{
        "kind": "persuasion",
        "topic": "safe(car)",
        "participants": ["alice", "bob"],
        "rounds": [
            {"turns": [
                {"player": "alice", "moves": [{"say": {"claim": "safe(car)"}}]},
                {"player": "bob", "moves": [{"target": 0, "say": {"why": "safe(car)"}}]}
            ]},
            {"turns": [
                {"player": "alice", "moves": [
                    {"target": 1, "say": {"argue": {"claim": "safe(car)", "premises": ["airbags(car)"]}}}
                ]},
                {"player": "bob", "moves": [{"target": 2, "say": {"concede": "safe(car)"}}]}
            ]}
        ]
    }"#;

    fn load(json: &str) -> Transcript {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_rejected_batch_is_discarded_and_counted_as_skip() {
        let replay = replay(&load(DELIBERATION), EngineConfig::default());

        assert_eq!(replay.batches.len(), 4);
        let rejected = replay.first_rejection().unwrap();
        assert_eq!(rejected.round, 1);
        assert_eq!(rejected.moves, vec![3, 4]);

        // one skip from the rejected batch, two from round 2
        let reason = replay.termination.as_ref().unwrap();
        assert_eq!(reason.rule, TerminationRule::InactiveRound);

        let report = replay.report().unwrap();
        assert_eq!(report.state, "terminated");
        let statuses: Vec<(MoveId, bool)> = report.moves.iter().map(|m| (m.id, m.is_in)).collect();
        assert_eq!(statuses, vec![(0, false), (1, true)]);
        assert!(report.active_attackers.is_empty());
        assert_eq!(report.informed, vec![Proposition::parse("cheap(pizza)").unwrap()]);
        assert!(matches!(
            report.outcome,
            Outcome::Deliberation { proposal: None, .. }
        ));
    }

    #[test]
    fn test_persuasion_replay() {
        let replay = replay(&load(PERSUASION), EngineConfig::default());
        assert!(replay.first_rejection().is_none());
        assert!(replay.termination.is_none());

        let report = replay.report().unwrap();
        assert_eq!(report.state, "active");
        let statuses: Vec<(MoveId, bool)> = report.moves.iter().map(|m| (m.id, m.is_in)).collect();
        assert_eq!(statuses, vec![(0, true), (1, false), (2, true), (3, false)]);
        assert_eq!(report.active_attackers, vec![0]);
        match report.outcome {
            Outcome::Persuasion { winners, .. } => {
                assert_eq!(winners, vec![ParticipantId::new("alice")])
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_no_participants_stops_after_first_turn() {
        let mut transcript = load(PERSUASION);
        transcript.participants.clear();
        let replay = replay(&transcript, EngineConfig::default());
        assert_eq!(replay.batches.len(), 1);
        assert_eq!(
            replay.termination.map(|r| r.rule),
            Some(TerminationRule::NoParticipants)
        );
    }

    #[test]
    fn test_overly_nested_topic_fails_to_load() {
        let topic = format!("{}a{}", "f(".repeat(20_000), ")".repeat(20_000));
        let json = format!(
            r#"{{"kind": "persuasion", "topic": "{}", "participants": ["alice"]}}"#,
            topic
        );
        let err = serde_json::from_str::<Transcript>(&json).unwrap_err();
        assert!(err.to_string().contains("nested deeper than 256"));
    }

    #[test]
    fn test_report_serialises() {
        let report = replay(&load(PERSUASION), EngineConfig::default())
            .report()
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["kind"], "persuasion");
        assert_eq!(json["topic"], "safe(car)");
        assert_eq!(json["outcome"]["persuasion"]["rule"], "conflict_resolution");
        assert_eq!(json["moves"][2]["locution"], "argue(safe(car) <= airbags(car))");
    }
}
