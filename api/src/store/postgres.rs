//! Postgres adapter on `diesel-async` pooled connections.
//!
//! Without a sort key rows come back in whatever order Postgres scans them;
//! ties within a sort key are equally unordered.

use async_trait::async_trait;
use diesel::{pg::Pg, prelude::*, sql_types};
use diesel_async::{
    AsyncPgConnection, RunQueryDsl,
    pooled_connection::{AsyncDieselConnectionManager, deadpool::Pool},
};
use eyre::eyre;
use uuid::Uuid;

use crate::{
    comment::Comment,
    config::DatabaseConfig,
    error::Error,
    listing::{Page, SortBy},
    post::Post,
    schema::{comments, posts},
    vote::{Tally, Vote, VoteLedger},
};

use super::{CommentStore, PostStore, SubjectStore};

pub type DbPool = Pool<AsyncPgConnection>;

pub fn connect(config: &DatabaseConfig) -> eyre::Result<DbPool> {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.url);
    let pool = Pool::builder(manager)
        .max_size(config.max_connections)
        .build()?;
    Ok(pool)
}

/// Posts and comments, each in its own table.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn sorted_posts(query: posts::BoxedQuery<'_, Pg>, sort: Option<SortBy>) -> posts::BoxedQuery<'_, Pg> {
    match sort {
        Some(SortBy::New) => query.order(posts::posted_at.desc()),
        Some(SortBy::Old) => query.order(posts::posted_at.asc()),
        Some(SortBy::Top) => query.order(posts::score.desc()),
        None => query,
    }
}

fn sorted_comments(
    query: comments::BoxedQuery<'_, Pg>,
    sort: Option<SortBy>,
) -> comments::BoxedQuery<'_, Pg> {
    match sort {
        Some(SortBy::New) => query.order(comments::commented_at.desc()),
        Some(SortBy::Old) => query.order(comments::commented_at.asc()),
        Some(SortBy::Top) => query.order(comments::score.desc()),
        None => query,
    }
}

#[async_trait]
impl SubjectStore<Post> for PgStore {
    async fn insert(&self, post: Post) -> Result<Post, Error> {
        let mut conn = self.pool.get().await?;
        let post = diesel::insert_into(posts::table)
            .values(&post)
            .returning(Post::as_returning())
            .get_result(&mut conn)
            .await?;
        Ok(post)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Post>, Error> {
        let mut conn = self.pool.get().await?;
        let post = posts::table
            .find(id)
            .select(Post::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        Ok(post)
    }

    async fn update(&self, post: &Post) -> Result<Option<Post>, Error> {
        let mut conn = self.pool.get().await?;
        let post = diesel::update(posts::table.find(post.id))
            .set((
                posts::title.eq(&post.title),
                posts::body.eq(&post.body),
                posts::edited_at.eq(post.edited_at),
            ))
            .returning(Post::as_returning())
            .get_result(&mut conn)
            .await
            .optional()?;
        Ok(post)
    }

    async fn mark_deleted(&self, id: Uuid) -> Result<Option<Post>, Error> {
        let mut conn = self.pool.get().await?;
        let post = diesel::update(posts::table.find(id))
            .set(posts::deleted.eq(true))
            .returning(Post::as_returning())
            .get_result(&mut conn)
            .await
            .optional()?;
        Ok(post)
    }

    async fn set_score(&self, id: Uuid, score: i64) -> Result<Option<Post>, Error> {
        let mut conn = self.pool.get().await?;
        let post = diesel::update(posts::table.find(id))
            .set(posts::score.eq(score))
            .returning(Post::as_returning())
            .get_result(&mut conn)
            .await
            .optional()?;
        Ok(post)
    }
}

#[async_trait]
impl PostStore for PgStore {
    async fn find_by_subreddit(&self, subreddit: &str, page: Page) -> Result<Vec<Post>, Error> {
        let mut conn = self.pool.get().await?;
        let query = posts::table
            .filter(posts::subreddit.eq(subreddit))
            .into_boxed();
        let posts = sorted_posts(query, page.sort)
            .offset(page.offset() as i64)
            .limit(page.limit() as i64)
            .load::<Post>(&mut conn)
            .await?;
        Ok(posts)
    }

    async fn find_by_author(&self, author: &str, page: Page) -> Result<Vec<Post>, Error> {
        let mut conn = self.pool.get().await?;
        let query = posts::table.filter(posts::author.eq(author)).into_boxed();
        let posts = sorted_posts(query, page.sort)
            .offset(page.offset() as i64)
            .limit(page.limit() as i64)
            .load::<Post>(&mut conn)
            .await?;
        Ok(posts)
    }
}

#[async_trait]
impl SubjectStore<Comment> for PgStore {
    async fn insert(&self, comment: Comment) -> Result<Comment, Error> {
        let mut conn = self.pool.get().await?;
        let comment = diesel::insert_into(comments::table)
            .values(&comment)
            .returning(Comment::as_returning())
            .get_result(&mut conn)
            .await?;
        Ok(comment)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Comment>, Error> {
        let mut conn = self.pool.get().await?;
        let comment = comments::table
            .find(id)
            .select(Comment::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        Ok(comment)
    }

    async fn update(&self, comment: &Comment) -> Result<Option<Comment>, Error> {
        let mut conn = self.pool.get().await?;
        let comment = diesel::update(comments::table.find(comment.id))
            .set((
                comments::body.eq(&comment.body),
                comments::edited_at.eq(comment.edited_at),
            ))
            .returning(Comment::as_returning())
            .get_result(&mut conn)
            .await
            .optional()?;
        Ok(comment)
    }

    async fn mark_deleted(&self, id: Uuid) -> Result<Option<Comment>, Error> {
        let mut conn = self.pool.get().await?;
        let comment = diesel::update(comments::table.find(id))
            .set(comments::deleted.eq(true))
            .returning(Comment::as_returning())
            .get_result(&mut conn)
            .await
            .optional()?;
        Ok(comment)
    }

    async fn set_score(&self, id: Uuid, score: i64) -> Result<Option<Comment>, Error> {
        let mut conn = self.pool.get().await?;
        let comment = diesel::update(comments::table.find(id))
            .set(comments::score.eq(score))
            .returning(Comment::as_returning())
            .get_result(&mut conn)
            .await
            .optional()?;
        Ok(comment)
    }
}

#[async_trait]
impl CommentStore for PgStore {
    async fn find_roots(&self, post_id: Uuid, page: Page) -> Result<Vec<Comment>, Error> {
        let mut conn = self.pool.get().await?;
        let query = comments::table
            .filter(comments::post_id.eq(post_id))
            .filter(comments::parent_id.is_null())
            .into_boxed();
        let comments = sorted_comments(query, page.sort)
            .offset(page.offset() as i64)
            .limit(page.limit() as i64)
            .load::<Comment>(&mut conn)
            .await?;
        Ok(comments)
    }

    async fn find_children(
        &self,
        parent_id: Uuid,
        sort: Option<SortBy>,
    ) -> Result<Vec<Comment>, Error> {
        let mut conn = self.pool.get().await?;
        let query = comments::table
            .filter(comments::parent_id.eq(parent_id))
            .into_boxed();
        let comments = sorted_comments(query, sort).load::<Comment>(&mut conn).await?;
        Ok(comments)
    }

    async fn find_by_author(&self, author: &str, page: Page) -> Result<Vec<Comment>, Error> {
        let mut conn = self.pool.get().await?;
        let query = comments::table
            .filter(comments::author.eq(author))
            .into_boxed();
        let comments = sorted_comments(query, page.sort)
            .offset(page.offset() as i64)
            .limit(page.limit() as i64)
            .load::<Comment>(&mut conn)
            .await?;
        Ok(comments)
    }
}

#[derive(QueryableByName, Debug)]
struct VoteRow {
    #[diesel(sql_type = sql_types::Uuid)]
    id: Uuid,
    #[diesel(sql_type = sql_types::Uuid)]
    subject_id: Uuid,
    #[diesel(sql_type = sql_types::Text)]
    voter: String,
    #[diesel(sql_type = sql_types::Text)]
    kind: String,
}

impl TryFrom<VoteRow> for Vote {
    type Error = Error;

    fn try_from(row: VoteRow) -> Result<Self, Self::Error> {
        Ok(Vote {
            id: row.id,
            subject_id: row.subject_id,
            voter: row.voter,
            kind: row.kind.parse().map_err(|e: String| eyre!(e))?,
        })
    }
}

#[derive(QueryableByName, Debug)]
struct TallyRow {
    #[diesel(sql_type = sql_types::BigInt)]
    upvotes: i64,
    #[diesel(sql_type = sql_types::BigInt)]
    downvotes: i64,
}

/// A vote table keyed by `(subject_id, voter)`. Post and comment votes share
/// one layout in two tables.
#[derive(Clone)]
pub struct PgLedger {
    pool: DbPool,
    table: &'static str,
}

impl PgLedger {
    pub fn posts(pool: DbPool) -> Self {
        Self {
            pool,
            table: "post_votes",
        }
    }

    pub fn comments(pool: DbPool) -> Self {
        Self {
            pool,
            table: "comment_votes",
        }
    }
}

#[async_trait]
impl VoteLedger for PgLedger {
    async fn find(&self, subject_id: Uuid, voter: &str) -> Result<Option<Vote>, Error> {
        let mut conn = self.pool.get().await?;
        let sql = format!(
            "SELECT id, subject_id, voter, kind FROM {} WHERE subject_id = $1 AND voter = $2",
            self.table
        );

        let row = diesel::sql_query(sql)
            .bind::<sql_types::Uuid, _>(subject_id)
            .bind::<sql_types::Text, _>(voter)
            .get_result::<VoteRow>(&mut conn)
            .await
            .optional()?;

        row.map(Vote::try_from).transpose()
    }

    async fn insert(&self, vote: Vote) -> Result<Vote, Error> {
        let mut conn = self.pool.get().await?;
        let sql = format!(
            "INSERT INTO {} (id, subject_id, voter, kind) VALUES ($1, $2, $3, $4)",
            self.table
        );

        diesel::sql_query(sql)
            .bind::<sql_types::Uuid, _>(vote.id)
            .bind::<sql_types::Uuid, _>(vote.subject_id)
            .bind::<sql_types::Text, _>(&vote.voter)
            .bind::<sql_types::Text, _>(vote.kind.as_str())
            .execute(&mut conn)
            .await?;

        Ok(vote)
    }

    async fn update(&self, vote: &Vote) -> Result<(), Error> {
        let mut conn = self.pool.get().await?;
        let sql = format!("UPDATE {} SET kind = $1 WHERE id = $2", self.table);

        let updated = diesel::sql_query(sql)
            .bind::<sql_types::Text, _>(vote.kind.as_str())
            .bind::<sql_types::Uuid, _>(vote.id)
            .execute(&mut conn)
            .await?;

        if updated == 0 {
            return Err(eyre!("vote {} disappeared before it could be updated", vote.id).into());
        }
        Ok(())
    }

    async fn delete(&self, vote: &Vote) -> Result<(), Error> {
        let mut conn = self.pool.get().await?;
        let sql = format!("DELETE FROM {} WHERE id = $1", self.table);

        diesel::sql_query(sql)
            .bind::<sql_types::Uuid, _>(vote.id)
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    async fn tally(&self, subject_id: Uuid) -> Result<Tally, Error> {
        let mut conn = self.pool.get().await?;
        let sql = format!(
            "
            SELECT
                COUNT(*) FILTER (WHERE kind = 'UPVOTE') AS upvotes,
                COUNT(*) FILTER (WHERE kind = 'DOWNVOTE') AS downvotes
            FROM {}
            WHERE subject_id = $1
            ",
            self.table
        );

        let row = diesel::sql_query(sql)
            .bind::<sql_types::Uuid, _>(subject_id)
            .get_result::<TallyRow>(&mut conn)
            .await?;

        Ok(Tally {
            upvotes: row.upvotes,
            downvotes: row.downvotes,
        })
    }
}
