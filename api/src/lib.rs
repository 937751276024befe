pub mod comment;
pub mod config;
pub mod error;
pub mod identity;
pub mod json;
pub mod listing;
pub mod post;
pub mod query;
pub mod schema;
pub mod scoring;
pub mod store;
pub mod subject;
pub mod vote;

use std::sync::Arc;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use comment::{Comment, CommentService};
use config::{ServerConfig, StoreKind};
use post::{Post, PostService};
use store::{
    memory::{MemoryCollection, MemoryLedger},
    postgres::{self, PgLedger, PgStore},
};
use vote::VoteEngine;

#[derive(Clone)]
pub struct App {
    pub config: Arc<ServerConfig>,
    pub posts: PostService,
    pub comments: CommentService,
}

impl App {
    /// Wires every service to process-local storage.
    pub fn in_memory(config: ServerConfig) -> Self {
        let engine = Arc::new(VoteEngine::new());
        let posts = Arc::new(MemoryCollection::<Post>::new());
        let comments = Arc::new(MemoryCollection::<Comment>::new());

        App {
            posts: PostService::new(posts.clone(), Arc::new(MemoryLedger::new()), engine.clone()),
            comments: CommentService::new(
                comments,
                posts,
                Arc::new(MemoryLedger::new()),
                engine,
            )
            .with_max_depth(config.max_comment_depth),
            config: Arc::new(config),
        }
    }

    pub fn postgres(config: ServerConfig, pool: postgres::DbPool) -> Self {
        let engine = Arc::new(VoteEngine::new());
        let store = Arc::new(PgStore::new(pool.clone()));

        App {
            posts: PostService::new(
                store.clone(),
                Arc::new(PgLedger::posts(pool.clone())),
                engine.clone(),
            ),
            comments: CommentService::new(
                store.clone(),
                store,
                Arc::new(PgLedger::comments(pool)),
                engine,
            )
            .with_max_depth(config.max_comment_depth),
            config: Arc::new(config),
        }
    }

    pub fn from_config(config: ServerConfig) -> eyre::Result<Self> {
        match (config.store, config.database.clone()) {
            (StoreKind::Postgres, Some(database)) => {
                let pool = postgres::connect(&database)?;
                tracing::info!(
                    max_connections = database.max_connections,
                    "Using the Postgres store"
                );
                Ok(App::postgres(config, pool))
            }
            (StoreKind::Postgres, None) => Err(eyre::eyre!("Postgres store requires `DATABASE_URL`")),
            (StoreKind::Memory, _) => {
                tracing::warn!("Using the in-memory store, nothing will be persisted");
                Ok(App::in_memory(config))
            }
        }
    }
}

pub fn router(app: App) -> Router {
    Router::new()
        .merge(post::routes::route())
        .merge(comment::routes::route())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;

    fn app() -> Router {
        router(App::in_memory(ServerConfig::default()))
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            request = request.header("x-username", user);
        }
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, payload)
    }

    async fn create_post(app: &Router, user: &str) -> Value {
        let (status, post) = send(
            app,
            "POST",
            "/posts",
            Some(user),
            Some(json!({"subreddit": "rust", "title": "Hello", "body": "world"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        post
    }

    #[tokio::test]
    async fn mutations_require_identity() {
        let app = app();
        let (status, body) = send(
            &app,
            "POST",
            "/posts",
            None,
            Some(json!({"subreddit": "rust", "title": "Hello"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHORIZED");

        let (status, _) = send(&app, "POST", "/posts", Some("  "), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn voting_on_unknown_subject_is_not_found() {
        let app = app();
        let uri = format!("/posts/{}/votes/upvote", Uuid::new_v4());
        let (status, body) = send(&app, "POST", &uri, Some("bob"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");

        let uri = format!("/comments/{}/votes/downvote", Uuid::new_v4());
        let (status, _) = send(&app, "POST", &uri, Some("bob"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn post_lifecycle_over_http() {
        let app = app();
        let post = create_post(&app, "alice").await;
        assert_eq!(post["score"], 1);
        let id = post["id"].as_str().unwrap().to_owned();

        let (status, outcome) =
            send(&app, "POST", &format!("/posts/{id}/votes/downvote"), Some("bob"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome, json!({"effect": "recorded", "score": 0}));

        let (status, body) = send(
            &app,
            "PATCH",
            &format!("/posts/{id}"),
            Some("bob"),
            Some(json!({"title": "mine now"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "NOT_AUTHOR");

        let (status, _) = send(&app, "DELETE", &format!("/posts/{id}"), Some("alice"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, post) = send(&app, "GET", &format!("/posts/{id}"), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(post["deleted"], true);
        assert_eq!(post["title"], "Hello");
        assert_eq!(post["score"], 0);
    }

    #[tokio::test]
    async fn comment_tree_over_http() {
        let app = app();
        let post = create_post(&app, "alice").await;
        let post_id = post["id"].as_str().unwrap().to_owned();

        let (status, root) = send(
            &app,
            "POST",
            "/comments",
            Some("bob"),
            Some(json!({"post_id": post_id, "body": "root"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = send(
            &app,
            "POST",
            "/comments",
            Some("carol"),
            Some(json!({"post_id": post_id, "parent_id": root["id"], "body": "reply"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, tree) = send(
            &app,
            "GET",
            &format!("/posts/{post_id}/comments?sort=new&size=5"),
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(tree[0]["body"], "root");
        assert_eq!(tree[0]["children"][0]["body"], "reply");
        assert_eq!(tree[0]["children"][0]["children"], json!([]));

        let (status, body) = send(
            &app,
            "GET",
            &format!("/posts/{post_id}/comments?size=0"),
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID");

        let (status, listed) =
            send(&app, "GET", "/users/carol/comments?sort=TOP", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reply_chains_are_capped_and_still_render() {
        let app = router(App::in_memory(ServerConfig {
            max_comment_depth: 4,
            ..ServerConfig::default()
        }));
        let post = create_post(&app, "alice").await;
        let post_id = post["id"].as_str().unwrap().to_owned();

        let mut parent = Value::Null;
        for level in 1..=4 {
            let (status, comment) = send(
                &app,
                "POST",
                "/comments",
                Some("bob"),
                Some(json!({"post_id": post_id, "parent_id": parent, "body": format!("level {level}")})),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
            parent = comment["id"].clone();
        }

        let (status, body) = send(
            &app,
            "POST",
            "/comments",
            Some("bob"),
            Some(json!({"post_id": post_id, "parent_id": parent, "body": "level 5"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID");

        let (status, tree) =
            send(&app, "GET", &format!("/posts/{post_id}/comments"), None, None).await;
        assert_eq!(status, StatusCode::OK);
        let mut depth = 0;
        let mut level = &tree;
        while let Some(node) = level.get(0) {
            depth += 1;
            assert_eq!(node["body"], format!("level {depth}"));
            level = &node["children"];
        }
        assert_eq!(depth, 4);
    }

    #[tokio::test]
    async fn malformed_query_uses_the_error_envelope() {
        let app = app();
        let tree = format!("/posts/{}/comments?page=-1", Uuid::new_v4());
        for uri in [
            "/subreddits/rust/posts?page=-1",
            "/users/alice/posts?sort=best",
            "/users/alice/comments?size=lots",
            tree.as_str(),
        ] {
            let (status, body) = send(&app, "GET", uri, None, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["code"], "ERR", "{uri}");
            assert!(body["msg"].is_string(), "{uri}");
        }
    }

    #[tokio::test]
    async fn malformed_body_is_unprocessable() {
        let app = app();
        let (status, body) = send(
            &app,
            "POST",
            "/posts",
            Some("alice"),
            Some(json!({"title": 42})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "ERR");
    }
}
