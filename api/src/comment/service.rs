use std::sync::Arc;

use uuid::Uuid;

use crate::{
    config::DEFAULT_MAX_COMMENT_DEPTH,
    error::Error,
    listing::Page,
    scoring::Scored,
    store::{CommentStore, PostStore, SubjectStore},
    subject::SubjectKind,
    vote::{VoteEngine, VoteKind, VoteLedger, VoteOutcome},
};

use super::{Comment, CommentTree, CreateComment, EditComment, tree};

#[derive(Clone)]
pub struct CommentService {
    scored: Scored<Comment, dyn CommentStore>,
    posts: Arc<dyn PostStore>,
    max_depth: usize,
}

impl CommentService {
    pub fn new(
        store: Arc<dyn CommentStore>,
        posts: Arc<dyn PostStore>,
        ledger: Arc<dyn VoteLedger>,
        engine: Arc<VoteEngine>,
    ) -> Self {
        Self {
            scored: Scored::new(store, ledger, engine),
            posts,
            max_depth: DEFAULT_MAX_COMMENT_DEPTH,
        }
    }

    /// Caps how deep replies nest. Trees are serialized recursively, so this
    /// is what keeps a reply chain from exhausting the stack.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    pub fn ledger(&self) -> &dyn VoteLedger {
        self.scored.ledger()
    }

    pub async fn find(&self, id: Uuid) -> Result<Comment, Error> {
        self.scored.find(id).await
    }

    /// The post must exist, and a reply's parent must be a comment of that
    /// same post, no deeper than one level above the nesting cap.
    pub async fn create(
        &self,
        author: &str,
        mut submission: CreateComment,
    ) -> Result<Comment, Error> {
        submission.validate()?;

        if self.posts.find(submission.post_id).await?.is_none() {
            return Err(Error::not_found(SubjectKind::Post, submission.post_id));
        }

        if let Some(parent_id) = submission.parent_id {
            let parent = self.scored.find(parent_id).await?;
            if parent.post_id != submission.post_id {
                return Err("You're replying to the comment that does not belong to this post".into());
            }
            if self.depth_of(&parent).await? >= self.max_depth {
                return Err(Error::Invalid(format!(
                    "Replies cannot be nested more than {} levels deep",
                    self.max_depth
                )));
            }
        }

        let comment = Comment::new(
            submission.post_id,
            submission.parent_id,
            author,
            &submission.body,
        );
        self.scored.create(comment).await
    }

    pub async fn edit(
        &self,
        id: Uuid,
        requester: &str,
        mut edit: EditComment,
    ) -> Result<Comment, Error> {
        edit.validate()?;
        self.scored
            .edit(id, requester, move |comment| {
                comment.body = edit.body;
                comment.edited_at = Some(crate::subject::now());
            })
            .await
    }

    pub async fn delete(&self, id: Uuid, requester: &str) -> Result<(), Error> {
        self.scored.delete(id, requester).await
    }

    pub async fn vote(&self, id: Uuid, voter: &str, kind: VoteKind) -> Result<VoteOutcome, Error> {
        self.scored.vote(id, voter, kind).await
    }

    pub async fn recompute(&self, id: Uuid) -> Result<Comment, Error> {
        self.scored.recompute(id).await
    }

    pub async fn list_by_author(&self, author: &str, page: Page) -> Result<Vec<Comment>, Error> {
        self.scored.store().find_by_author(author, page).await
    }

    /// Level of the comment in its thread, a top-level comment being 1. Stops
    /// walking up once the cap is reached.
    async fn depth_of(&self, comment: &Comment) -> Result<usize, Error> {
        let mut depth = 1;
        let mut ancestor = comment.parent_id;
        while let Some(id) = ancestor {
            if depth >= self.max_depth {
                break;
            }
            depth += 1;
            ancestor = self.scored.find(id).await?.parent_id;
        }
        Ok(depth)
    }

    /// A post without comments, or an unknown post, yields an empty list.
    pub async fn tree(&self, post_id: Uuid, page: Page) -> Result<Vec<CommentTree>, Error> {
        tree::build_tree(self.scored.store(), post_id, page).await
    }
}
