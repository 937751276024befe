use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Error;

use super::{Tally, Vote};

/// Durable record of votes, at most one per (subject, voter).
#[async_trait]
pub trait VoteLedger: Send + Sync {
    async fn find(&self, subject_id: Uuid, voter: &str) -> Result<Option<Vote>, Error>;

    /// Fails with [`Error::AlreadyExists`] if the voter already has a vote on
    /// the subject.
    async fn insert(&self, vote: Vote) -> Result<Vote, Error>;

    /// Persists a flipped kind.
    async fn update(&self, vote: &Vote) -> Result<(), Error>;

    async fn delete(&self, vote: &Vote) -> Result<(), Error>;

    /// Counted by the store, never by loading every vote.
    async fn tally(&self, subject_id: Uuid) -> Result<Tally, Error>;
}
