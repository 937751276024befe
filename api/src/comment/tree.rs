//! Assembles the reply tree of a post from per-parent child queries.
//!
//! The walk is breadth-first over an arena of nodes: every level's child
//! fetches run concurrently (bounded) and the arena is then folded back to
//! front, so children are always complete before their parent is built. No
//! recursion here; how deep threads get is capped when replies are created.

use std::collections::HashSet;

use futures::{StreamExt, TryStreamExt, stream};
use uuid::Uuid;

use crate::{error::Error, listing::Page, store::CommentStore};

use super::{Comment, CommentTree};

/// Upper bound on child queries in flight for one level of the tree.
pub const MAX_CONCURRENT_CHILD_FETCHES: usize = 8;

struct Node {
    comment: Comment,
    children: Vec<usize>,
}

/// Returns one page of top-level comments of the post, each with all of its
/// descendants. `page.sort` orders the roots and every list of replies.
pub async fn build_tree<St>(store: &St, post_id: Uuid, page: Page) -> Result<Vec<CommentTree>, Error>
where
    St: CommentStore + ?Sized,
{
    let mut arena: Vec<Node> = Vec::new();
    let mut visited = HashSet::new();

    let mut roots = Vec::new();
    for comment in store.find_roots(post_id, page).await? {
        if let Some(index) = push_node(&mut arena, &mut visited, comment) {
            roots.push(index);
        }
    }

    let mut frontier = roots.clone();
    while !frontier.is_empty() {
        let parent_ids: Vec<Uuid> = frontier.iter().map(|&i| arena[i].comment.id).collect();

        // `buffered` keeps results in the order of `parent_ids`
        let replies: Vec<Vec<Comment>> = stream::iter(parent_ids)
            .map(|parent_id| store.find_children(parent_id, page.sort))
            .buffered(MAX_CONCURRENT_CHILD_FETCHES)
            .try_collect()
            .await?;

        let mut next = Vec::new();
        for (parent, children) in frontier.into_iter().zip(replies) {
            for child in children {
                let child_id = child.id;
                match push_node(&mut arena, &mut visited, child) {
                    Some(index) => {
                        arena[parent].children.push(index);
                        next.push(index);
                    }
                    None => tracing::warn!(
                        %post_id,
                        comment_id = %child_id,
                        parent_id = %arena[parent].comment.id,
                        "Comment reached twice while building tree, skipping"
                    ),
                }
            }
        }
        frontier = next;
    }

    // a child's index is always greater than its parent's
    let mut built: Vec<Option<CommentTree>> = Vec::with_capacity(arena.len());
    built.resize_with(arena.len(), || None);
    for (index, node) in arena.into_iter().enumerate().rev() {
        let children = node
            .children
            .iter()
            .filter_map(|&child| built[child].take())
            .collect();
        built[index] = Some(CommentTree {
            comment: node.comment,
            children,
        });
    }

    Ok(roots
        .into_iter()
        .filter_map(|index| built[index].take())
        .collect())
}

fn push_node(arena: &mut Vec<Node>, visited: &mut HashSet<Uuid>, comment: Comment) -> Option<usize> {
    if !visited.insert(comment.id) {
        return None;
    }

    arena.push(Node {
        comment,
        children: Vec::new(),
    });
    Some(arena.len() - 1)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::{
        config::DEFAULT_MAX_COMMENT_DEPTH,
        listing::SortBy,
        store::{SubjectStore, memory::MemoryCollection},
    };

    fn comment_at(post_id: Uuid, parent: Option<&Comment>, minutes: i64, score: i64) -> Comment {
        let mut comment = Comment::new(post_id, parent.map(|p| p.id), "alice", "text");
        comment.commented_at =
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes);
        comment.score = score;
        comment
    }

    fn ids(trees: &[CommentTree]) -> Vec<Uuid> {
        trees.iter().map(|t| t.comment.id).collect()
    }

    #[tokio::test]
    async fn chain_is_nested_regardless_of_insertion_order() {
        let store = MemoryCollection::<Comment>::new();
        let post = Uuid::new_v4();
        let a = comment_at(post, None, 0, 1);
        let b = comment_at(post, Some(&a), 1, 1);
        let c = comment_at(post, Some(&b), 2, 1);

        for comment in [&c, &b, &a] {
            store.insert(comment.clone()).await.unwrap();
        }

        let tree = build_tree(&store, post, Page::new(0, 10, Some(SortBy::New)))
            .await
            .unwrap();

        assert_eq!(
            tree,
            vec![CommentTree {
                comment: a,
                children: vec![CommentTree {
                    comment: b,
                    children: vec![CommentTree {
                        comment: c,
                        children: vec![],
                    }],
                }],
            }]
        );
    }

    #[tokio::test]
    async fn paging_applies_to_roots_only() {
        let store = MemoryCollection::<Comment>::new();
        let post = Uuid::new_v4();

        let mut roots = Vec::new();
        for minute in (0..5).map(|i| i * 10) {
            let root = comment_at(post, None, minute, 1);
            store.insert(root.clone()).await.unwrap();
            roots.push((minute, root));
        }
        // every root gets a reply with a nested reply under it
        for (minute, root) in &roots {
            let reply = comment_at(post, Some(root), minute + 1, 1);
            let nested = comment_at(post, Some(&reply), minute + 2, 1);
            store.insert(reply).await.unwrap();
            store.insert(nested).await.unwrap();
        }
        let roots: Vec<Comment> = roots.into_iter().map(|(_, root)| root).collect();
        // unrelated post
        store.insert(comment_at(Uuid::new_v4(), None, 100, 1)).await.unwrap();

        let tree = build_tree(&store, post, Page::new(1, 2, Some(SortBy::New)))
            .await
            .unwrap();

        // newest first: roots[4], roots[3], roots[2], roots[1], roots[0]
        assert_eq!(ids(&tree), vec![roots[2].id, roots[1].id]);
        for node in &tree {
            assert_eq!(node.children.len(), 1);
            assert_eq!(node.children[0].children.len(), 1);
            assert!(node.children[0].children[0].children.is_empty());
        }
    }

    #[tokio::test]
    async fn top_ordering_holds_at_every_level() {
        let store = MemoryCollection::<Comment>::new();
        let post = Uuid::new_v4();

        let low = comment_at(post, None, 0, 2);
        let high = comment_at(post, None, 1, 7);
        let replies = [
            comment_at(post, Some(&high), 2, -1),
            comment_at(post, Some(&high), 3, 10),
            comment_at(post, Some(&high), 4, 3),
        ];
        let nested = [
            comment_at(post, Some(&replies[1]), 5, 0),
            comment_at(post, Some(&replies[1]), 6, 4),
        ];

        for comment in [&low, &high]
            .into_iter()
            .chain(replies.iter())
            .chain(nested.iter())
        {
            store.insert(comment.clone()).await.unwrap();
        }

        let tree = build_tree(&store, post, Page::new(0, 10, Some(SortBy::Top)))
            .await
            .unwrap();

        assert_eq!(ids(&tree), vec![high.id, low.id]);
        assert_eq!(
            ids(&tree[0].children),
            vec![replies[1].id, replies[2].id, replies[0].id]
        );
        assert_eq!(ids(&tree[0].children[0].children), vec![nested[1].id, nested[0].id]);
        assert!(tree[1].children.is_empty());
    }

    #[tokio::test]
    async fn post_without_comments_has_an_empty_tree() {
        let store = MemoryCollection::<Comment>::new();
        let tree = build_tree(&store, Uuid::new_v4(), Page::new(0, 10, None))
            .await
            .unwrap();
        assert!(tree.is_empty());
    }

    #[tokio::test]
    async fn deep_chains_do_not_recurse() {
        let store = MemoryCollection::<Comment>::new();
        let post = Uuid::new_v4();

        let mut parent = comment_at(post, None, 0, 1);
        store.insert(parent.clone()).await.unwrap();
        for depth in 1..1000 {
            let reply = comment_at(post, Some(&parent), depth, 1);
            store.insert(reply.clone()).await.unwrap();
            parent = reply;
        }

        let tree = build_tree(&store, post, Page::new(0, 10, None)).await.unwrap();

        let mut depth = 1;
        let mut node = &tree[0];
        while let Some(child) = node.children.first() {
            depth += 1;
            node = child;
        }
        assert_eq!(depth, 1000);
    }

    #[test]
    fn very_deep_trees_drop_without_recursing() {
        let post = Uuid::new_v4();
        let mut tree = CommentTree {
            comment: comment_at(post, None, 0, 1),
            children: vec![],
        };
        for depth in 1..200_000 {
            tree = CommentTree {
                comment: comment_at(post, None, depth, 1),
                children: vec![tree],
            };
        }
        drop(tree);
    }

    #[tokio::test]
    async fn chain_at_the_default_depth_cap_serializes() {
        let store = MemoryCollection::<Comment>::new();
        let post = Uuid::new_v4();

        let mut parent = comment_at(post, None, 0, 1);
        store.insert(parent.clone()).await.unwrap();
        for depth in 1..DEFAULT_MAX_COMMENT_DEPTH as i64 {
            let reply = comment_at(post, Some(&parent), depth, 1);
            store.insert(reply.clone()).await.unwrap();
            parent = reply;
        }

        let tree = build_tree(&store, post, Page::new(0, 10, None)).await.unwrap();
        let json: serde_json::Value = serde_json::to_value(&tree).unwrap();

        let mut depth = 0;
        let mut level = &json;
        while let Some(node) = level.get(0) {
            depth += 1;
            level = &node["children"];
        }
        assert_eq!(depth, DEFAULT_MAX_COMMENT_DEPTH);
    }

    /// Store whose child query for `looping` also returns `looping` itself.
    struct CorruptStore {
        inner: MemoryCollection<Comment>,
        looping: Comment,
    }

    #[async_trait]
    impl SubjectStore<Comment> for CorruptStore {
        async fn insert(&self, subject: Comment) -> Result<Comment, Error> {
            self.inner.insert(subject).await
        }

        async fn find(&self, id: Uuid) -> Result<Option<Comment>, Error> {
            self.inner.find(id).await
        }

        async fn update(&self, subject: &Comment) -> Result<Option<Comment>, Error> {
            self.inner.update(subject).await
        }

        async fn set_score(&self, id: Uuid, score: i64) -> Result<Option<Comment>, Error> {
            self.inner.set_score(id, score).await
        }

        async fn mark_deleted(&self, id: Uuid) -> Result<Option<Comment>, Error> {
            self.inner.mark_deleted(id).await
        }
    }

    #[async_trait]
    impl CommentStore for CorruptStore {
        async fn find_roots(&self, post_id: Uuid, page: Page) -> Result<Vec<Comment>, Error> {
            self.inner.find_roots(post_id, page).await
        }

        async fn find_children(
            &self,
            parent_id: Uuid,
            sort: Option<SortBy>,
        ) -> Result<Vec<Comment>, Error> {
            let mut children = self.inner.find_children(parent_id, sort).await?;
            if parent_id == self.looping.id {
                children.push(self.looping.clone());
            }
            Ok(children)
        }

        async fn find_by_author(&self, author: &str, page: Page) -> Result<Vec<Comment>, Error> {
            CommentStore::find_by_author(&self.inner, author, page).await
        }
    }

    #[tokio::test]
    async fn comment_reached_twice_is_skipped() {
        let post = Uuid::new_v4();
        let root = comment_at(post, None, 0, 1);
        let reply = comment_at(post, Some(&root), 1, 1);

        let store = CorruptStore {
            inner: MemoryCollection::new(),
            looping: reply.clone(),
        };
        store.insert(root.clone()).await.unwrap();
        store.insert(reply.clone()).await.unwrap();

        let tree = build_tree(&store, post, Page::new(0, 10, None)).await.unwrap();

        assert_eq!(ids(&tree), vec![root.id]);
        assert_eq!(ids(&tree[0].children), vec![reply.id]);
        assert!(tree[0].children[0].children.is_empty());
    }
}
