//! Propositions and argument payloads carried by locutions
//!
//! The inference engine that proves these is external. Here they only need
//! to be printable, parseable and comparable.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Errors produced while parsing a proposition from text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("empty proposition")]
    Empty,
    #[error("unexpected character '{found}' at offset {offset}")]
    Unexpected { found: char, offset: usize },
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("trailing input at offset {0}")]
    Trailing(usize),
    #[error("terms nested deeper than {max} levels")]
    TooDeep { max: usize },
}

/// Deepest compound nesting the parser accepts
pub const MAX_TERM_DEPTH: usize = 256;

/// A first-order term
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Term {
    /// Constant symbol
    Atom(String),
    /// Variable (name starts with an uppercase letter or `_`)
    Var(String),
    /// Functor applied to arguments
    Compound { functor: String, args: Vec<Term> },
}

impl Term {
    pub fn atom(name: impl Into<String>) -> Self {
        Self::Atom(name.into())
    }

    pub fn var(name: impl Into<String>) -> Self {
        Self::Var(name.into())
    }

    pub fn compound(functor: impl Into<String>, args: Vec<Term>) -> Self {
        Self::Compound {
            functor: functor.into(),
            args,
        }
    }

    /// True when the term contains no variables
    pub fn is_ground(&self) -> bool {
        match self {
            Self::Atom(_) => true,
            Self::Var(_) => false,
            Self::Compound { args, .. } => args.iter().all(Term::is_ground),
        }
    }

    /// Equality modulo a consistent, bijective renaming of variables
    pub fn alpha_equivalent(&self, other: &Term) -> bool {
        let mut forward = HashMap::new();
        let mut backward = HashMap::new();
        alpha_eq(self, other, &mut forward, &mut backward)
    }
}

fn alpha_eq<'a>(
    left: &'a Term,
    right: &'a Term,
    forward: &mut HashMap<&'a str, &'a str>,
    backward: &mut HashMap<&'a str, &'a str>,
) -> bool {
    match (left, right) {
        (Term::Atom(a), Term::Atom(b)) => a == b,
        (Term::Var(a), Term::Var(b)) => {
            match (forward.get(a.as_str()), backward.get(b.as_str())) {
                (None, None) => {
                    forward.insert(a.as_str(), b.as_str());
                    backward.insert(b.as_str(), a.as_str());
                    true
                }
                (Some(mapped), Some(inverse)) => *mapped == b.as_str() && *inverse == a.as_str(),
                _ => false,
            }
        }
        (
            Term::Compound { functor: f, args: a },
            Term::Compound { functor: g, args: b },
        ) => {
            f == g
                && a.len() == b.len()
                && a.iter().zip(b).all(|(s, t)| alpha_eq(s, t, forward, backward))
        }
        _ => false,
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Atom(name) | Self::Var(name) => write!(f, "{}", name),
            Self::Compound { functor, args } => {
                write!(f, "{}(", functor)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// A possibly negated term, the unit agents argue about
///
/// Serialized as its display form, e.g. `"~likes(bob, X)"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Proposition {
    pub term: Term,
    pub negated: bool,
}

impl Proposition {
    pub fn new(term: Term) -> Self {
        Self {
            term,
            negated: false,
        }
    }

    /// Shorthand for a ground atom proposition
    pub fn atom(name: impl Into<String>) -> Self {
        Self::new(Term::atom(name))
    }

    /// The complementary proposition
    pub fn negation(&self) -> Self {
        Self {
            term: self.term.clone(),
            negated: !self.negated,
        }
    }

    /// Parse the display form (`p`, `p(a, X)`, `~p(a)`)
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let mut parser = Parser::new(input);
        parser.skip_ws();
        if parser.peek().is_none() {
            return Err(ParseError::Empty);
        }
        let negated = matches!(parser.peek(), Some('~') | Some('!'));
        if negated {
            parser.bump();
            parser.skip_ws();
        }
        let term = parser.term()?;
        parser.skip_ws();
        if parser.peek().is_some() {
            return Err(ParseError::Trailing(parser.pos));
        }
        Ok(Self { term, negated })
    }

    /// Equality modulo variable renaming; polarity must agree
    pub fn alpha_equivalent(&self, other: &Proposition) -> bool {
        self.negated == other.negated && self.term.alpha_equivalent(&other.term)
    }
}

impl fmt::Display for Proposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "~")?;
        }
        write!(f, "{}", self.term)
    }
}

impl FromStr for Proposition {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Proposition {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Proposition> for String {
    fn from(value: Proposition) -> Self {
        value.to_string()
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn unexpected(&self) -> ParseError {
        match self.peek() {
            Some(found) => ParseError::Unexpected {
                found,
                offset: self.pos,
            },
            None => ParseError::UnexpectedEnd,
        }
    }

    fn ident(&mut self) -> Result<&'a str, ParseError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.bump();
        }
        if self.pos == start {
            return Err(self.unexpected());
        }
        Ok(&self.input[start..self.pos])
    }

    fn term(&mut self) -> Result<Term, ParseError> {
        let name = self.ident()?;
        self.skip_ws();
        if self.peek() != Some('(') {
            return Ok(if is_variable_name(name) {
                Term::var(name)
            } else {
                Term::atom(name)
            });
        }

        if self.depth >= MAX_TERM_DEPTH {
            return Err(ParseError::TooDeep {
                max: MAX_TERM_DEPTH,
            });
        }
        self.bump();
        self.skip_ws();
        let mut args = Vec::new();
        if self.peek() == Some(')') {
            self.bump();
            return Ok(Term::compound(name, args));
        }
        self.depth += 1;
        loop {
            self.skip_ws();
            args.push(self.term()?);
            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some(')') => {
                    self.bump();
                    break;
                }
                _ => return Err(self.unexpected()),
            }
        }
        self.depth -= 1;
        Ok(Term::compound(name, args))
    }
}

fn is_variable_name(name: &str) -> bool {
    name.chars()
        .next()
        .is_some_and(|c| c.is_uppercase() || c == '_')
}

fn default_strength() -> f64 {
    1.0
}

/// Proof object returned by the inference engine
///
/// Treated as opaque by the dialogue engine apart from its claim, which a
/// concede has to match to count as a full surrender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    /// Conclusion of the argument
    pub claim: Proposition,
    /// Direct premises
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub premises: Vec<Proposition>,
    /// Strength modifier assigned by the inference engine
    #[serde(default = "default_strength")]
    pub strength: f64,
    /// Arguments supporting individual premises
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_arguments: Vec<Argument>,
}

impl Argument {
    pub fn new(claim: Proposition) -> Self {
        Self {
            claim,
            premises: Vec::new(),
            strength: default_strength(),
            sub_arguments: Vec::new(),
        }
    }

    pub fn with_premise(mut self, premise: Proposition) -> Self {
        self.premises.push(premise);
        self
    }

    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = strength;
        self
    }

    pub fn with_sub_argument(mut self, sub: Argument) -> Self {
        self.sub_arguments.push(sub);
        self
    }

    /// Every premise of this argument and its sub-arguments, first
    /// occurrence order, without duplicates
    pub fn premise_closure(&self) -> Vec<&Proposition> {
        let mut out: Vec<&Proposition> = Vec::new();
        let mut stack = vec![self];
        while let Some(arg) = stack.pop() {
            for premise in &arg.premises {
                if !out.contains(&premise) {
                    out.push(premise);
                }
            }
            for sub in arg.sub_arguments.iter().rev() {
                if !out.contains(&&sub.claim) {
                    out.push(&sub.claim);
                }
                stack.push(sub);
            }
        }
        out
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.claim)?;
        if !self.premises.is_empty() {
            write!(f, " <= ")?;
            for (i, premise) in self.premises.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", premise)?;
            }
        }
        Ok(())
    }
}
