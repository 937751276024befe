use uuid::Uuid;

use crate::{
    error::Error,
    store::SubjectStore,
    subject::Subject,
};

use super::{Vote, VoteEffect, VoteKind, VoteLedger, locks::KeyedLocks};

/// Applies vote toggles to a ledger and folds the ledger back into the cached
/// score of the subject.
///
/// Toggles are serialized per (subject, voter) and recomputations per subject,
/// so within one process the one-vote-per-pair invariant is exact and the last
/// score written always comes from a tally taken after every completed ledger
/// write. Across processes the ledger's own uniqueness check backs this up.
#[derive(Default)]
pub struct VoteEngine {
    toggles: KeyedLocks<(Uuid, String)>,
    recomputes: KeyedLocks<Uuid>,
}

impl VoteEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn toggle<L>(
        &self,
        ledger: &L,
        subject_id: Uuid,
        voter: &str,
        kind: VoteKind,
    ) -> Result<VoteEffect, Error>
    where
        L: VoteLedger + ?Sized,
    {
        self.toggles
            .serialize((subject_id, voter.to_owned()), async {
                match apply_toggle(ledger, subject_id, voter, kind).await {
                    // Another process inserted between our lookup and insert;
                    // its vote is now visible, so toggle against it instead.
                    Err(Error::AlreadyExists(_)) => {
                        tracing::warn!(
                            %subject_id,
                            voter,
                            "Concurrent vote detected, retrying toggle against stored vote"
                        );
                        apply_toggle(ledger, subject_id, voter, kind).await
                    }
                    result => result,
                }
            })
            .await
    }

    /// Recomputes `upvotes - downvotes` from the ledger and writes it onto the
    /// subject. Safe to call any number of times.
    pub async fn recompute<S, St, L>(
        &self,
        subjects: &St,
        ledger: &L,
        subject_id: Uuid,
    ) -> Result<S, Error>
    where
        S: Subject,
        St: SubjectStore<S> + ?Sized,
        L: VoteLedger + ?Sized,
    {
        self.recomputes
            .serialize(subject_id, async {
                if subjects.find(subject_id).await?.is_none() {
                    return Err(Error::not_found(S::KIND, subject_id));
                }

                let tally = ledger.tally(subject_id).await?;
                let updated = subjects
                    .set_score(subject_id, tally.score())
                    .await?
                    .ok_or_else(|| Error::not_found(S::KIND, subject_id))?;

                tracing::debug!(
                    kind = %S::KIND,
                    %subject_id,
                    upvotes = tally.upvotes,
                    downvotes = tally.downvotes,
                    score = updated.score(),
                    "Score recomputed"
                );

                Ok(updated)
            })
            .await
    }
}

async fn apply_toggle<L>(
    ledger: &L,
    subject_id: Uuid,
    voter: &str,
    kind: VoteKind,
) -> Result<VoteEffect, Error>
where
    L: VoteLedger + ?Sized,
{
    match ledger.find(subject_id, voter).await? {
        None => {
            ledger.insert(Vote::new(subject_id, voter, kind)).await?;
            Ok(VoteEffect::Recorded)
        }
        Some(mut vote) if vote.kind == kind.opposite() => {
            vote.kind = kind;
            ledger.update(&vote).await?;
            Ok(VoteEffect::Overridden)
        }
        Some(vote) => {
            ledger.delete(&vote).await?;
            Ok(VoteEffect::Retracted)
        }
    }
}
