use async_trait::async_trait;
use dashmap::DashMap;
use domains::ports::{CommentRepository, PostRepository};
use domains::{Comment, CommentId, Post, PostId, Result, UserId};

#[derive(Debug, Default)]
pub struct InMemoryPostRepository {
    posts: DashMap<PostId, Post>,
}

impl InMemoryPostRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, post: Post) {
        self.posts.insert(post.id, post);
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn find_by_id(&self, id: PostId) -> Result<Option<Post>> {
        Ok(self.posts.get(&id).map(|p| p.clone()))
    }

    async fn count_by_author(&self, author_id: UserId) -> Result<u64> {
        Ok(self
            .posts
            .iter()
            .filter(|p| p.author_id == Some(author_id) && !p.is_deleted)
            .count() as u64)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCommentRepository {
    comments: DashMap<CommentId, Comment>,
}

impl InMemoryCommentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, comment: Comment) {
        self.comments.insert(comment.id, comment);
    }
}

#[async_trait]
impl CommentRepository for InMemoryCommentRepository {
    async fn find_by_id(&self, id: CommentId) -> Result<Option<Comment>> {
        Ok(self.comments.get(&id).map(|c| c.clone()))
    }

    async fn count_by_author(&self, author_id: UserId) -> Result<u64> {
        Ok(self
            .comments
            .iter()
            .filter(|c| c.author_id == Some(author_id) && !c.is_deleted)
            .count() as u64)
    }
}
