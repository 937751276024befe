//! Process-local document store. Rows keep insertion order, which is the
//! natural order listings fall back to for unsorted requests and for ties.

use std::collections::HashMap;

use async_trait::async_trait;
use eyre::eyre;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    comment::Comment,
    error::Error,
    listing::{Page, SortBy},
    post::Post,
    subject::Subject,
    vote::{Tally, Vote, VoteKind, VoteLedger},
};

use super::{CommentStore, PostStore, SubjectStore};

pub struct MemoryCollection<S> {
    docs: RwLock<Documents<S>>,
}

struct Documents<S> {
    rows: Vec<S>,
    index: HashMap<Uuid, usize>,
    /// Row positions of the replies to each parent, in insertion order.
    replies: HashMap<Uuid, Vec<usize>>,
}

impl<S: Subject> MemoryCollection<S> {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(Documents {
                rows: Vec::new(),
                index: HashMap::new(),
                replies: HashMap::new(),
            }),
        }
    }

    pub async fn len(&self) -> usize {
        self.docs.read().await.rows.len()
    }

    async fn query<F>(&self, filter: F, sort: Option<SortBy>, page: Option<Page>) -> Vec<S>
    where
        F: Fn(&S) -> bool,
    {
        let docs = self.docs.read().await;
        let mut matched: Vec<S> = docs.rows.iter().filter(|s| filter(*s)).cloned().collect();
        drop(docs);

        if let Some(sort) = sort {
            // stable, so equal keys stay in insertion order
            matched.sort_by(|a, b| sort.compare(a, b));
        }

        match page {
            Some(page) => matched
                .into_iter()
                .skip(page.offset() as usize)
                .take(page.limit() as usize)
                .collect(),
            None => matched,
        }
    }
}

impl<S: Subject> Default for MemoryCollection<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S: Subject> SubjectStore<S> for MemoryCollection<S> {
    async fn insert(&self, subject: S) -> Result<S, Error> {
        let mut docs = self.docs.write().await;
        if docs.index.contains_key(&subject.id()) {
            return Err(Error::AlreadyExists(format!(
                "{} with ID {}",
                S::KIND,
                subject.id()
            )));
        }

        let position = docs.rows.len();
        docs.index.insert(subject.id(), position);
        if let Some(parent_id) = subject.parent_id() {
            docs.replies.entry(parent_id).or_default().push(position);
        }
        docs.rows.push(subject.clone());
        Ok(subject)
    }

    async fn find(&self, id: Uuid) -> Result<Option<S>, Error> {
        let docs = self.docs.read().await;
        Ok(docs.index.get(&id).map(|&i| docs.rows[i].clone()))
    }

    async fn update(&self, subject: &S) -> Result<Option<S>, Error> {
        let mut docs = self.docs.write().await;
        let Some(&i) = docs.index.get(&subject.id()) else {
            return Ok(None);
        };

        let stored = &mut docs.rows[i];
        stored.copy_editable_from(subject);
        Ok(Some(stored.clone()))
    }

    async fn mark_deleted(&self, id: Uuid) -> Result<Option<S>, Error> {
        let mut docs = self.docs.write().await;
        let Some(&i) = docs.index.get(&id) else {
            return Ok(None);
        };

        let stored = &mut docs.rows[i];
        stored.mark_deleted();
        Ok(Some(stored.clone()))
    }

    async fn set_score(&self, id: Uuid, score: i64) -> Result<Option<S>, Error> {
        let mut docs = self.docs.write().await;
        let Some(&i) = docs.index.get(&id) else {
            return Ok(None);
        };

        let stored = &mut docs.rows[i];
        stored.set_score(score);
        Ok(Some(stored.clone()))
    }
}

#[async_trait]
impl PostStore for MemoryCollection<Post> {
    async fn find_by_subreddit(&self, subreddit: &str, page: Page) -> Result<Vec<Post>, Error> {
        Ok(self
            .query(|p| p.subreddit == subreddit, page.sort, Some(page))
            .await)
    }

    async fn find_by_author(&self, author: &str, page: Page) -> Result<Vec<Post>, Error> {
        Ok(self.query(|p| p.author == author, page.sort, Some(page)).await)
    }
}

#[async_trait]
impl CommentStore for MemoryCollection<Comment> {
    async fn find_roots(&self, post_id: Uuid, page: Page) -> Result<Vec<Comment>, Error> {
        Ok(self
            .query(
                |c| c.post_id == post_id && c.parent_id.is_none(),
                page.sort,
                Some(page),
            )
            .await)
    }

    async fn find_children(
        &self,
        parent_id: Uuid,
        sort: Option<SortBy>,
    ) -> Result<Vec<Comment>, Error> {
        let docs = self.docs.read().await;
        let mut children: Vec<Comment> = docs
            .replies
            .get(&parent_id)
            .into_iter()
            .flatten()
            .map(|&i| docs.rows[i].clone())
            .collect();
        drop(docs);

        if let Some(sort) = sort {
            children.sort_by(|a, b| sort.compare(a, b));
        }
        Ok(children)
    }

    async fn find_by_author(&self, author: &str, page: Page) -> Result<Vec<Comment>, Error> {
        Ok(self.query(|c| c.author == author, page.sort, Some(page)).await)
    }
}

/// Votes grouped by subject, then by voter, so a tally only walks the votes of
/// one subject.
#[derive(Default)]
pub struct MemoryLedger {
    votes: RwLock<HashMap<Uuid, HashMap<String, Vote>>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VoteLedger for MemoryLedger {
    async fn find(&self, subject_id: Uuid, voter: &str) -> Result<Option<Vote>, Error> {
        let votes = self.votes.read().await;
        Ok(votes
            .get(&subject_id)
            .and_then(|by_voter| by_voter.get(voter))
            .cloned())
    }

    async fn insert(&self, vote: Vote) -> Result<Vote, Error> {
        let mut votes = self.votes.write().await;
        let by_voter = votes.entry(vote.subject_id).or_default();
        if by_voter.contains_key(&vote.voter) {
            return Err(Error::AlreadyExists(format!(
                "vote by {} on {}",
                vote.voter, vote.subject_id
            )));
        }

        by_voter.insert(vote.voter.clone(), vote.clone());
        Ok(vote)
    }

    async fn update(&self, vote: &Vote) -> Result<(), Error> {
        let mut votes = self.votes.write().await;
        let stored = votes
            .get_mut(&vote.subject_id)
            .and_then(|by_voter| by_voter.get_mut(&vote.voter))
            .filter(|stored| stored.id == vote.id)
            .ok_or_else(|| eyre!("vote {} disappeared before it could be updated", vote.id))?;

        stored.kind = vote.kind;
        Ok(())
    }

    async fn delete(&self, vote: &Vote) -> Result<(), Error> {
        let mut votes = self.votes.write().await;
        if let Some(by_voter) = votes.get_mut(&vote.subject_id) {
            if by_voter.get(&vote.voter).is_some_and(|v| v.id == vote.id) {
                by_voter.remove(&vote.voter);
            }
            if by_voter.is_empty() {
                votes.remove(&vote.subject_id);
            }
        }
        Ok(())
    }

    async fn tally(&self, subject_id: Uuid) -> Result<Tally, Error> {
        let votes = self.votes.read().await;
        let tally = votes
            .get(&subject_id)
            .into_iter()
            .flat_map(|by_voter| by_voter.values())
            .fold(Tally::default(), |mut tally, vote| {
                match vote.kind {
                    VoteKind::Up => tally.upvotes += 1,
                    VoteKind::Down => tally.downvotes += 1,
                }
                tally
            });
        Ok(tally)
    }
}
