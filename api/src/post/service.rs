use std::sync::Arc;

use uuid::Uuid;

use crate::{
    error::Error,
    listing::Page,
    scoring::Scored,
    store::PostStore,
    vote::{VoteEngine, VoteKind, VoteLedger, VoteOutcome},
};

use super::{CreatePost, EditPost, Post};

#[derive(Clone)]
pub struct PostService {
    scored: Scored<Post, dyn PostStore>,
}

impl PostService {
    pub fn new(
        store: Arc<dyn PostStore>,
        ledger: Arc<dyn VoteLedger>,
        engine: Arc<VoteEngine>,
    ) -> Self {
        Self {
            scored: Scored::new(store, ledger, engine),
        }
    }

    pub fn ledger(&self) -> &dyn VoteLedger {
        self.scored.ledger()
    }

    pub async fn find(&self, id: Uuid) -> Result<Post, Error> {
        self.scored.find(id).await
    }

    pub async fn create(&self, author: &str, mut submission: CreatePost) -> Result<Post, Error> {
        submission.validate()?;

        let post = Post::new(
            &submission.subreddit,
            author,
            &submission.title,
            &submission.body,
        );
        self.scored.create(post).await
    }

    pub async fn edit(&self, id: Uuid, requester: &str, mut edit: EditPost) -> Result<Post, Error> {
        edit.validate()?;
        self.scored
            .edit(id, requester, move |post| post.edit_with(edit))
            .await
    }

    pub async fn delete(&self, id: Uuid, requester: &str) -> Result<(), Error> {
        self.scored.delete(id, requester).await
    }

    pub async fn vote(&self, id: Uuid, voter: &str, kind: VoteKind) -> Result<VoteOutcome, Error> {
        self.scored.vote(id, voter, kind).await
    }

    pub async fn recompute(&self, id: Uuid) -> Result<Post, Error> {
        self.scored.recompute(id).await
    }

    pub async fn list_by_subreddit(&self, subreddit: &str, page: Page) -> Result<Vec<Post>, Error> {
        self.scored.store().find_by_subreddit(subreddit, page).await
    }

    pub async fn list_by_author(&self, author: &str, page: Page) -> Result<Vec<Post>, Error> {
        self.scored.store().find_by_author(author, page).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        store::{
            SubjectStore,
            memory::{MemoryCollection, MemoryLedger},
        },
        vote::{Tally, VoteEffect},
    };

    fn service() -> PostService {
        PostService::new(
            Arc::new(MemoryCollection::<Post>::new()),
            Arc::new(MemoryLedger::new()),
            Arc::new(VoteEngine::new()),
        )
    }

    fn submission(title: &str) -> CreatePost {
        CreatePost {
            subreddit: "rust".into(),
            title: title.into(),
            body: "body".into(),
        }
    }

    #[tokio::test]
    async fn created_post_is_upvoted_by_its_author() {
        let posts = service();
        let post = posts.create("alice", submission("hello")).await.unwrap();

        assert_eq!(post.score, 1);
        let vote = posts.ledger().find(post.id, "alice").await.unwrap().unwrap();
        assert_eq!(vote.kind, VoteKind::Up);
        assert_eq!(posts.ledger().tally(post.id).await.unwrap().total(), 1);
    }

    #[tokio::test]
    async fn invalid_submission_is_rejected() {
        let posts = service();
        let result = posts.create("alice", submission("   ")).await;
        assert!(matches!(result, Err(Error::Invalid(_))));
    }

    #[tokio::test]
    async fn score_follows_the_ledger_through_every_toggle() {
        let posts = service();
        let post = posts.create("alice", submission("hello")).await.unwrap();

        let outcome = posts.vote(post.id, "bob", VoteKind::Up).await.unwrap();
        assert_eq!(outcome.effect, VoteEffect::Recorded);
        assert_eq!(outcome.score, 2);

        let outcome = posts.vote(post.id, "bob", VoteKind::Down).await.unwrap();
        assert_eq!(outcome.effect, VoteEffect::Overridden);
        assert_eq!(outcome.score, 0);
        assert_eq!(
            posts.ledger().tally(post.id).await.unwrap(),
            Tally {
                upvotes: 1,
                downvotes: 1
            }
        );

        let outcome = posts.vote(post.id, "bob", VoteKind::Down).await.unwrap();
        assert_eq!(outcome.effect, VoteEffect::Retracted);
        assert_eq!(outcome.score, 1);
        assert!(posts.ledger().find(post.id, "bob").await.unwrap().is_none());
        assert_eq!(posts.find(post.id).await.unwrap().score, 1);
    }

    #[tokio::test]
    async fn author_retracting_own_upvote_drops_score_to_zero() {
        let posts = service();
        let post = posts.create("alice", submission("hello")).await.unwrap();

        let outcome = posts.vote(post.id, "alice", VoteKind::Up).await.unwrap();
        assert_eq!(outcome.effect, VoteEffect::Retracted);
        assert_eq!(outcome.score, 0);
    }

    #[tokio::test]
    async fn voting_on_unknown_post_is_not_found() {
        let posts = service();
        let result = posts.vote(Uuid::new_v4(), "bob", VoteKind::Up).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
    }

    #[tokio::test]
    async fn only_the_author_may_edit_or_delete() {
        let posts = service();
        let post = posts.create("alice", submission("hello")).await.unwrap();

        let edit = EditPost {
            title: "hijacked".into(),
            body: "".into(),
        };
        let result = posts.edit(post.id, "mallory", edit).await;
        assert!(matches!(result, Err(Error::NotAuthor { .. })));

        let result = posts.delete(post.id, "mallory").await;
        assert!(matches!(result, Err(Error::NotAuthor { .. })));

        assert_eq!(posts.find(post.id).await.unwrap(), post);
    }

    #[tokio::test]
    async fn edit_and_delete_keep_the_score() {
        let posts = service();
        let post = posts.create("alice", submission("hello")).await.unwrap();
        posts.vote(post.id, "bob", VoteKind::Up).await.unwrap();

        let edit = EditPost {
            title: "hello, again".into(),
            body: "updated".into(),
        };
        let edited = posts.edit(post.id, "alice", edit).await.unwrap();
        assert_eq!(edited.title, "hello, again");
        assert_eq!(edited.score, 2);
        assert!(edited.edited_at.is_some());

        posts.delete(post.id, "alice").await.unwrap();
        let deleted = posts.find(post.id).await.unwrap();
        assert!(deleted.deleted);
        assert_eq!(deleted.score, 2);
        assert_eq!(deleted.title, "hello, again");

        // still votable once deleted
        let outcome = posts.vote(post.id, "carol", VoteKind::Down).await.unwrap();
        assert_eq!(outcome.score, 1);
    }

    #[tokio::test]
    async fn recompute_repairs_a_drifted_score() {
        let posts = service();
        let post = posts.create("alice", submission("hello")).await.unwrap();
        posts.scored.store().set_score(post.id, 99).await.unwrap();

        let repaired = posts.recompute(post.id).await.unwrap();
        assert_eq!(repaired.score, 1);
    }
}
