use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    Post,
    Comment,
}

impl SubjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectKind::Post => "post",
            SubjectKind::Comment => "comment",
        }
    }
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything votes attach to. The cached `score` is only ever written through
/// [`Subject::set_score`] by the score aggregator.
pub trait Subject: Clone + Send + Sync + 'static {
    const KIND: SubjectKind;

    fn id(&self) -> Uuid;
    fn author(&self) -> &str;
    fn score(&self) -> i64;
    fn set_score(&mut self, score: i64);
    fn created_at(&self) -> DateTime<Utc>;
    fn is_deleted(&self) -> bool;
    fn mark_deleted(&mut self);

    /// Copies the fields an author may change, leaving score, deletion and
    /// identity alone.
    fn copy_editable_from(&mut self, edited: &Self);

    /// The comment this one replies to. Posts have none.
    fn parent_id(&self) -> Option<Uuid> {
        None
    }
}

/// Timestamps are stored with millisecond precision.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}
