pub mod routes;
pub mod service;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::subject::{self, Subject, SubjectKind};

pub use service::PostService;

#[derive(Queryable, Selectable, Insertable, Debug, Serialize, Deserialize, Clone, PartialEq)]
#[diesel(table_name = crate::schema::posts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Post {
    pub id: Uuid,
    pub subreddit: String,
    pub author: String,
    pub title: String,
    pub body: String,
    pub score: i64,
    pub posted_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
    pub deleted: bool,
}

impl Post {
    pub fn new(subreddit: &str, author: &str, title: &str, body: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            subreddit: subreddit.to_owned(),
            author: author.to_owned(),
            title: title.to_owned(),
            body: body.to_owned(),
            score: 0,
            posted_at: subject::now(),
            edited_at: None,
            deleted: false,
        }
    }

    pub fn edit_with(&mut self, edit: EditPost) {
        self.title = edit.title;
        self.body = edit.body;
        self.edited_at = Some(subject::now());
    }
}

impl Subject for Post {
    const KIND: SubjectKind = SubjectKind::Post;

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
        self.posted_at
    }

    fn is_deleted(&self) -> bool {
        self.deleted
    }

    fn mark_deleted(&mut self) {
        self.deleted = true;
    }

    fn copy_editable_from(&mut self, edited: &Self) {
        self.title.clone_from(&edited.title);
        self.body.clone_from(&edited.body);
        self.edited_at = edited.edited_at;
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct CreatePost {
    pub subreddit: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
}

impl CreatePost {
    pub fn validate(&mut self) -> Result<(), &'static str> {
        self.subreddit = self.subreddit.trim().to_string();
        if self.subreddit.is_empty() {
            return Err("No subreddit provided");
        }

        if self.subreddit.len() > 21 {
            return Err("Subreddit name too long (max 21 characters)");
        }

        validate_content(&mut self.title, &mut self.body)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct EditPost {
    pub title: String,
    #[serde(default)]
    pub body: String,
}

impl EditPost {
    pub fn validate(&mut self) -> Result<(), &'static str> {
        validate_content(&mut self.title, &mut self.body)
    }
}

fn validate_content(title: &mut String, body: &mut String) -> Result<(), &'static str> {
    *title = title.trim().to_string();
    if title.is_empty() {
        return Err("No title provided");
    }

    if title.len() > 300 {
        return Err("Title too long (max 300 characters)");
    }

    *body = body.trim().to_string();
    if body.len() > 40000 {
        return Err("Body too long (max 40000 characters)");
    }

    Ok(())
}
