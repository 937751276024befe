use std::{marker::PhantomData, sync::Arc};

use uuid::Uuid;

use crate::{
    error::Error,
    store::SubjectStore,
    subject::Subject,
    vote::{VoteEngine, VoteKind, VoteLedger, VoteOutcome},
};

/// Lifecycle shared by every votable subject: creation with the author's
/// automatic upvote, author-only edit and soft delete, voting, and score
/// repair. Posts and comments only differ in their store and fields.
pub struct Scored<S, St: ?Sized> {
    store: Arc<St>,
    ledger: Arc<dyn VoteLedger>,
    engine: Arc<VoteEngine>,
    _subject: PhantomData<fn() -> S>,
}

impl<S, St: ?Sized> Clone for Scored<S, St> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            ledger: self.ledger.clone(),
            engine: self.engine.clone(),
            _subject: PhantomData,
        }
    }
}

impl<S, St> Scored<S, St>
where
    S: Subject,
    St: SubjectStore<S> + ?Sized,
{
    pub fn new(store: Arc<St>, ledger: Arc<dyn VoteLedger>, engine: Arc<VoteEngine>) -> Self {
        Self {
            store,
            ledger,
            engine,
            _subject: PhantomData,
        }
    }

    pub fn store(&self) -> &St {
        &self.store
    }

    pub fn ledger(&self) -> &dyn VoteLedger {
        self.ledger.as_ref()
    }

    pub async fn find(&self, id: Uuid) -> Result<S, Error> {
        self.store
            .find(id)
            .await?
            .ok_or_else(|| Error::not_found(S::KIND, id))
    }

    /// Persists a fresh subject, records its author's upvote and returns it
    /// with the aggregated score.
    pub async fn create(&self, subject: S) -> Result<S, Error> {
        let subject = self.store.insert(subject).await?;
        let id = subject.id();

        self.engine
            .toggle(self.ledger.as_ref(), id, subject.author(), VoteKind::Up)
            .await?;
        let subject = self.recompute(id).await?;

        tracing::info!(kind = %S::KIND, %id, author = subject.author(), "Created");
        Ok(subject)
    }

    pub async fn edit<F>(&self, id: Uuid, requester: &str, edit: F) -> Result<S, Error>
    where
        F: FnOnce(&mut S),
    {
        let mut subject = self.owned_by(id, requester).await?;
        edit(&mut subject);

        self.store
            .update(&subject)
            .await?
            .ok_or_else(|| Error::not_found(S::KIND, id))
    }

    /// Deleting twice is a no-op.
    pub async fn delete(&self, id: Uuid, requester: &str) -> Result<(), Error> {
        let subject = self.owned_by(id, requester).await?;
        if subject.is_deleted() {
            return Ok(());
        }

        self.store
            .mark_deleted(id)
            .await?
            .ok_or_else(|| Error::not_found(S::KIND, id))?;

        tracing::info!(kind = %S::KIND, %id, "Soft-deleted");
        Ok(())
    }

    /// Deleted subjects can still be voted on.
    pub async fn vote(&self, id: Uuid, voter: &str, kind: VoteKind) -> Result<VoteOutcome, Error> {
        let subject = self.find(id).await?;

        let effect = self
            .engine
            .toggle(self.ledger.as_ref(), subject.id(), voter, kind)
            .await?;
        let subject = self.recompute(id).await?;

        tracing::debug!(kind = %S::KIND, %id, voter, ?effect, score = subject.score(), "Vote applied");
        Ok(VoteOutcome {
            effect,
            score: subject.score(),
        })
    }

    pub async fn recompute(&self, id: Uuid) -> Result<S, Error> {
        self.engine
            .recompute(self.store.as_ref(), self.ledger.as_ref(), id)
            .await
    }

    async fn owned_by(&self, id: Uuid, requester: &str) -> Result<S, Error> {
        let subject = self.find(id).await?;
        if subject.author() != requester {
            return Err(Error::not_author(requester, S::KIND, id));
        }
        Ok(subject)
    }
}
