//! Dialectical status of moves
//!
//! A move is *in* when it is not a surrender and every attacking reply that
//! is itself in has been surrendered to by its player. Evaluation walks the
//! tree bottom-up with an explicit stack; results are memoised only for the
//! duration of a single query, since any update invalidates them.

use crate::error::DialogueError;
use agora_core::{IndexedTree, Move, MoveId, NodeRef, ParticipantId, Proposition, TreeError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// How a `concede` is compared with the proposition of the move it answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcedeMatching {
    /// Exact term identity
    #[default]
    Structural,
    /// Identity up to consistent variable renaming
    AlphaEquivalent,
}

impl ConcedeMatching {
    pub fn matches(self, conceded: &Proposition, claimed: &Proposition) -> bool {
        match self {
            Self::Structural => conceded == claimed,
            Self::AlphaEquivalent => conceded.alpha_equivalent(claimed),
        }
    }
}

impl fmt::Display for ConcedeMatching {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structural => write!(f, "structural"),
            Self::AlphaEquivalent => write!(f, "alpha_equivalent"),
        }
    }
}

impl FromStr for ConcedeMatching {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "structural" => Ok(Self::Structural),
            "alpha_equivalent" | "alpha-equivalent" | "alpha" => Ok(Self::AlphaEquivalent),
            other => Err(format!("unknown concede matching '{}'", other)),
        }
    }
}

type Memo = HashMap<MoveId, bool>;

/// Whether move `id` is currently in
pub fn is_in(
    tree: &IndexedTree<Move>,
    id: MoveId,
    matching: ConcedeMatching,
) -> Result<bool, DialogueError> {
    if !tree.contains(id) {
        return Err(DialogueError::NotInTree(id));
    }
    let mut memo = Memo::new();
    evaluate(tree, id, matching, &mut memo)
}

/// Status of every move in the tree, sharing one memo across all of them
pub fn statuses(
    tree: &IndexedTree<Move>,
    matching: ConcedeMatching,
) -> Result<HashMap<MoveId, bool>, DialogueError> {
    let mut memo = Memo::with_capacity(tree.len());
    for node in tree.iter() {
        evaluate(tree, node.id(), matching, &mut memo)?;
    }
    Ok(memo)
}

/// Moves that currently stand as live reasons, in pre-order
///
/// The root is included when it opens a proposal or attacks and is in.
/// Children are only visited below an included node.
pub fn active_attackers(
    tree: &IndexedTree<Move>,
    matching: ConcedeMatching,
) -> Result<Vec<&Move>, DialogueError> {
    let Some(root) = tree.root() else {
        return Ok(Vec::new());
    };
    let mut memo = Memo::new();
    let mut out = Vec::new();
    let mut stack = vec![root.id()];
    while let Some(id) = stack.pop() {
        let node = tree.find(id).ok_or(DialogueError::NotInTree(id))?;
        let locution = node.data().locution();
        if !(locution.is_proposal_opening() || locution.is_attacking()) {
            continue;
        }
        if !evaluate(tree, id, matching, &mut memo)? {
            continue;
        }
        out.push(node.data());
        stack.extend(node.child_ids().iter().rev().copied());
    }
    Ok(out)
}

/// Distinct players of the given moves, first appearance order
pub fn distinct_players<'a>(moves: &[&'a Move]) -> Vec<&'a ParticipantId> {
    let mut players: Vec<&ParticipantId> = Vec::new();
    for player in moves.iter().filter_map(|m| m.player()) {
        if !players.contains(&player) {
            players.push(player);
        }
    }
    players
}

fn evaluate(
    tree: &IndexedTree<Move>,
    start: MoveId,
    matching: ConcedeMatching,
    memo: &mut Memo,
) -> Result<bool, DialogueError> {
    // (node, children already scheduled)
    let mut stack = vec![(start, false)];
    while let Some((id, expanded)) = stack.pop() {
        if memo.contains_key(&id) {
            continue;
        }
        let node = tree.find(id).ok_or(DialogueError::NotInTree(id))?;
        if node.data().locution().is_surrendering() {
            memo.insert(id, false);
            continue;
        }
        if !expanded {
            stack.push((id, true));
            for &child in node.child_ids() {
                let child_node = tree
                    .find(child)
                    .ok_or(TreeError::DanglingChild { parent: id, child })?;
                if child_node.data().locution().is_attacking() && !memo.contains_key(&child) {
                    stack.push((child, false));
                }
            }
            continue;
        }
        let status = resolve(node, matching, memo);
        memo.insert(id, status);
    }
    memo.get(&start)
        .copied()
        .ok_or(DialogueError::NotInTree(start))
}

/// Status of a non-surrendering node whose attacking children are memoised
fn resolve(node: NodeRef<'_, Move>, matching: ConcedeMatching, memo: &Memo) -> bool {
    let mut attackers: Vec<Option<&ParticipantId>> = node
        .children()
        .filter(|c| c.data().locution().is_attacking())
        .filter(|c| memo.get(&c.id()).copied().unwrap_or(false))
        .map(|c| c.data().player())
        .collect();
    if attackers.is_empty() {
        return true;
    }

    let claimed = node.data().locution().claimed_proposition();
    for surrender in node.children().filter(|c| c.data().locution().is_surrendering()) {
        let full = match surrender.data().locution().conceded_term() {
            // a concede only counts when it gives up the whole claim
            Some(conceded) => claimed.is_some_and(|claim| matching.matches(conceded, claim)),
            None => true,
        };
        if full {
            let player = surrender.data().player();
            attackers.retain(|attacker| *attacker != player);
        }
    }
    attackers.is_empty()
}
