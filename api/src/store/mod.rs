//! Storage ports for subjects. Each subject lives in its own collection keyed
//! by ID; votes live in a separate [`VoteLedger`](crate::vote::VoteLedger).

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    comment::Comment,
    error::Error,
    listing::{Page, SortBy},
    post::Post,
    subject::Subject,
};

#[async_trait]
pub trait SubjectStore<S: Subject>: Send + Sync {
    /// Fails with [`Error::AlreadyExists`] on a duplicate ID.
    async fn insert(&self, subject: S) -> Result<S, Error>;

    async fn find(&self, id: Uuid) -> Result<Option<S>, Error>;

    /// Writes the author-editable fields only. Never touches the score or the
    /// deleted flag, so an edit racing a delete cannot undo it.
    async fn update(&self, subject: &S) -> Result<Option<S>, Error>;

    /// Sets the deleted flag. There is no way back.
    async fn mark_deleted(&self, id: Uuid) -> Result<Option<S>, Error>;

    /// The only write path for the cached score.
    async fn set_score(&self, id: Uuid, score: i64) -> Result<Option<S>, Error>;
}

#[async_trait]
pub trait PostStore: SubjectStore<Post> {
    async fn find_by_subreddit(&self, subreddit: &str, page: Page) -> Result<Vec<Post>, Error>;

    async fn find_by_author(&self, author: &str, page: Page) -> Result<Vec<Post>, Error>;
}

#[async_trait]
pub trait CommentStore: SubjectStore<Comment> {
    /// Comments of the post without a parent comment.
    async fn find_roots(&self, post_id: Uuid, page: Page) -> Result<Vec<Comment>, Error>;

    /// Every direct reply to the comment, unpaginated.
    async fn find_children(
        &self,
        parent_id: Uuid,
        sort: Option<SortBy>,
    ) -> Result<Vec<Comment>, Error>;

    async fn find_by_author(&self, author: &str, page: Page) -> Result<Vec<Comment>, Error>;
}
