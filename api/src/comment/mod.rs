pub mod routes;
pub mod service;
pub mod tree;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::subject::{self, Subject, SubjectKind};

pub use service::CommentService;

#[derive(Queryable, Selectable, Insertable, Debug, Serialize, Deserialize, Clone, PartialEq)]
#[diesel(table_name = crate::schema::comments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    /// `None` for a top-level comment.
    pub parent_id: Option<Uuid>,
    pub author: String,
    pub body: String,
    pub score: i64,
    pub commented_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
    pub deleted: bool,
}

impl Comment {
    pub fn new(post_id: Uuid, parent_id: Option<Uuid>, author: &str, body: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            post_id,
            parent_id,
            author: author.to_owned(),
            body: body.to_owned(),
            score: 0,
            commented_at: subject::now(),
            edited_at: None,
            deleted: false,
        }
    }
}

impl Subject for Comment {
    const KIND: SubjectKind = SubjectKind::Comment;

    fn id(&self) -> Uuid {
        self.id
    }

    fn author(&self) -> &str {
        &self.author
    }

    fn score(&self) -> i64 {
        self.score
    }

    fn set_score(&mut self, score: i64) {
        self.score = score;
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.commented_at
    }

    fn is_deleted(&self) -> bool {
        self.deleted
    }

    fn mark_deleted(&mut self) {
        self.deleted = true;
    }

    fn copy_editable_from(&mut self, edited: &Self) {
        self.body.clone_from(&edited.body);
        self.edited_at = edited.edited_at;
    }

    fn parent_id(&self) -> Option<Uuid> {
        self.parent_id
    }
}

/// A comment with its replies, ordered the same way at every depth.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CommentTree {
    #[serde(flatten)]
    pub comment: Comment,
    pub children: Vec<CommentTree>,
}

// the derived drop would recurse once per level
impl Drop for CommentTree {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.children);
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct CreateComment {
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub body: String,
}

impl CreateComment {
    pub fn validate(&mut self) -> Result<(), &'static str> {
        validate_body(&mut self.body)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct EditComment {
    pub body: String,
}

impl EditComment {
    pub fn validate(&mut self) -> Result<(), &'static str> {
        validate_body(&mut self.body)
    }
}

fn validate_body(body: &mut String) -> Result<(), &'static str> {
    *body = body.trim().to_string();
    if body.len() > 10000 {
        return Err("Content too long (max 10000 characters)");
    }

    if body.is_empty() {
        return Err("No content provided");
    }

    Ok(())
}
