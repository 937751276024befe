pub mod engine;
pub mod ledger;
pub mod locks;

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use engine::VoteEngine;
pub use ledger::VoteLedger;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum VoteKind {
    #[serde(rename = "upvote", alias = "UPVOTE", alias = "up")]
    Up,
    #[serde(rename = "downvote", alias = "DOWNVOTE", alias = "down")]
    Down,
}

impl VoteKind {
    pub const fn opposite(self) -> Self {
        match self {
            VoteKind::Up => VoteKind::Down,
            VoteKind::Down => VoteKind::Up,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VoteKind::Up => "UPVOTE",
            VoteKind::Down => "DOWNVOTE",
        }
    }
}

impl FromStr for VoteKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UPVOTE" => Ok(VoteKind::Up),
            "DOWNVOTE" => Ok(VoteKind::Down),
            other => Err(format!("unknown vote kind `{other}`")),
        }
    }
}

/// One voter's standing vote on one subject.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Vote {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub voter: String,
    pub kind: VoteKind,
}

impl Vote {
    pub fn new(subject_id: Uuid, voter: &str, kind: VoteKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject_id,
            voter: voter.to_owned(),
            kind,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub upvotes: i64,
    pub downvotes: i64,
}

impl Tally {
    pub fn score(&self) -> i64 {
        self.upvotes - self.downvotes
    }

    pub fn total(&self) -> i64 {
        self.upvotes + self.downvotes
    }
}

/// Which branch of the toggle a vote request took.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteEffect {
    Recorded,
    Overridden,
    Retracted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct VoteOutcome {
    pub effect: VoteEffect,
    pub score: i64,
}
