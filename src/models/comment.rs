//! Comment model
//!
//! Used for both article comments and community post comments; the two only
//! differ in which parent entity `target_id` points at.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::ProfileSummary;

/// Comment row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub user_id: i64,
    /// Article id (article comments) or post id (community post comments)
    pub target_id: i64,
    pub parent_id: Option<i64>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Comment with author and nested replies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub author: Option<ProfileSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub replies: Vec<CommentNode>,
}

/// Build a reply tree from a flat, oldest-first list.
///
/// Replies whose parent is missing from the list are promoted to the root.
pub fn build_comment_tree(comments: Vec<(Comment, Option<ProfileSummary>)>) -> Vec<CommentNode> {
    let ids: std::collections::HashSet<i64> = comments.iter().map(|(c, _)| c.id).collect();
    let mut children: HashMap<i64, Vec<CommentNode>> = HashMap::new();
    let mut roots_in_order = Vec::new();

    for (comment, author) in comments {
        let node = CommentNode {
            comment,
            author,
            replies: Vec::new(),
        };
        match node.comment.parent_id.filter(|p| ids.contains(p)) {
            Some(parent) => children.entry(parent).or_default().push(node),
            None => roots_in_order.push(node),
        }
    }

    fn attach(mut node: CommentNode, children: &mut HashMap<i64, Vec<CommentNode>>) -> CommentNode {
        if let Some(replies) = children.remove(&node.comment.id) {
            node.replies = replies
                .into_iter()
                .map(|reply| attach(reply, children))
                .collect();
        }
        node
    }

    roots_in_order
        .into_iter()
        .map(|root| attach(root, &mut children))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(id: i64, parent_id: Option<i64>) -> (Comment, Option<ProfileSummary>) {
        (
            Comment {
                id,
                user_id: 1,
                target_id: 1,
                parent_id,
                content: format!("comment {}", id),
                created_at: Utc::now(),
                updated_at: None,
            },
            None,
        )
    }

    #[test]
    fn test_build_tree_nests_replies() {
        let tree = build_comment_tree(vec![
            comment(1, None),
            comment(2, Some(1)),
            comment(3, None),
            comment(4, Some(2)),
            comment(5, Some(1)),
        ]);

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].comment.id, 1);
        let reply_ids: Vec<i64> = tree[0].replies.iter().map(|r| r.comment.id).collect();
        assert_eq!(reply_ids, vec![2, 5]);
        assert_eq!(tree[0].replies[0].replies[0].comment.id, 4);
        assert!(tree[1].replies.is_empty());
    }

    #[test]
    fn test_orphan_reply_becomes_root() {
        let tree = build_comment_tree(vec![comment(7, Some(99))]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].comment.id, 7);
    }
}
