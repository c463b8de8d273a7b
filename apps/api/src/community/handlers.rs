use axum::extract::State;
use serde::{Deserialize, Serialize};
use sqlx::types::Json as SqlJson;
use tracing::info;
use uuid::Uuid;

use crate::community::media::Media;
use crate::errors::AppError;
use crate::extract::{Json, Path, Query};
use crate::models::community::{Comment, Message, Post};
use crate::profiles::queries::require_user_by_civic_id;
use crate::profiles::require_civic_id;
use crate::query::params::non_empty;
use crate::query::{select, Filter, Pagination, Predicate};
use crate::state::AppState;

const MAX_CONTENT_CHARS: usize = 5000;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub civic_id: Option<String>,
    pub content: Option<String>,
    pub media: Option<Media>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub civic_id: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PostsResponse {
    pub posts: Vec<Post>,
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub post: Post,
}

#[derive(Debug, Serialize)]
pub struct CommentsResponse {
    pub comments: Vec<Comment>,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub comment: Comment,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: Message,
}

// ────────────────────────────────────────────────────────────────────────────
// Posts
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/community/posts?limit=&offset=
pub async fn handle_list_posts(
    State(state): State<AppState>,
    Query(params): Query<PageQuery>,
) -> Result<Json<PostsResponse>, AppError> {
    let page = Pagination::parse(params.limit.as_deref(), params.offset.as_deref())?;

    let mut query = select(
        "SELECT p.*, u.name AS author_name FROM community_posts p JOIN users u ON u.id = p.author_id",
        Filter::new(),
        "p.created_at DESC, p.id",
        page,
    );
    let posts = query.build_query_as::<Post>().fetch_all(&state.db).await?;

    Ok(Json(PostsResponse { posts }))
}

/// POST /api/community/posts
pub async fn handle_create_post(
    State(state): State<AppState>,
    Json(req): Json<CreatePostRequest>,
) -> Result<Json<PostResponse>, AppError> {
    let civic_id = require_civic_id(req.civic_id.as_deref())?;
    let content = validate_body(req.content.as_deref(), req.media.as_ref(), "Post")?;

    let author = require_user_by_civic_id(&state.db, &civic_id).await?;

    let post = sqlx::query_as::<_, Post>(
        r#"
        WITH inserted AS (
            INSERT INTO community_posts (author_id, content, media)
            VALUES ($1, $2, $3)
            RETURNING *
        )
        SELECT inserted.*, u.name AS author_name
        FROM inserted JOIN users u ON u.id = inserted.author_id
        "#,
    )
    .bind(author.id)
    .bind(&content)
    .bind(req.media.map(SqlJson))
    .fetch_one(&state.db)
    .await?;

    info!("User {} published post {}", author.id, post.id);
    Ok(Json(PostResponse { post }))
}

/// POST /api/community/posts/:post_id/like
pub async fn handle_like_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<PostResponse>, AppError> {
    let post_id = parse_post_id(&post_id)?;

    let post = sqlx::query_as::<_, Post>(
        r#"
        WITH updated AS (
            UPDATE community_posts SET likes = likes + 1
            WHERE id = $1
            RETURNING *
        )
        SELECT updated.*, u.name AS author_name
        FROM updated JOIN users u ON u.id = updated.author_id
        "#,
    )
    .bind(post_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::not_found("Post not found"))?;

    Ok(Json(PostResponse { post }))
}

// ────────────────────────────────────────────────────────────────────────────
// Comments
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/community/posts/:post_id/comments?limit=&offset=
pub async fn handle_list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Query(params): Query<PageQuery>,
) -> Result<Json<CommentsResponse>, AppError> {
    let post_id = parse_post_id(&post_id)?;
    let page = Pagination::parse(params.limit.as_deref(), params.offset.as_deref())?;

    ensure_post_exists(&state, post_id).await?;

    let mut filter = Filter::new();
    filter.and(Predicate::eq("c.post_id", post_id));
    let mut query = select(
        "SELECT c.*, u.name AS author_name FROM community_comments c JOIN users u ON u.id = c.author_id",
        filter,
        "c.created_at ASC, c.id",
        page,
    );
    let comments = query
        .build_query_as::<Comment>()
        .fetch_all(&state.db)
        .await?;

    Ok(Json(CommentsResponse { comments }))
}

/// POST /api/community/posts/:post_id/comments
pub async fn handle_create_comment(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<Json<CommentResponse>, AppError> {
    let post_id = parse_post_id(&post_id)?;
    let civic_id = require_civic_id(req.civic_id.as_deref())?;
    let content = validate_comment(req.content.as_deref())?;

    ensure_post_exists(&state, post_id).await?;
    let author = require_user_by_civic_id(&state.db, &civic_id).await?;

    let comment = sqlx::query_as::<_, Comment>(
        r#"
        WITH inserted AS (
            INSERT INTO community_comments (post_id, author_id, content)
            VALUES ($1, $2, $3)
            RETURNING *
        )
        SELECT inserted.*, u.name AS author_name
        FROM inserted JOIN users u ON u.id = inserted.author_id
        "#,
    )
    .bind(post_id)
    .bind(author.id)
    .bind(&content)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(CommentResponse { comment }))
}

// ────────────────────────────────────────────────────────────────────────────
// Messages
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/community/messages?limit=&offset=
pub async fn handle_list_messages(
    State(state): State<AppState>,
    Query(params): Query<PageQuery>,
) -> Result<Json<MessagesResponse>, AppError> {
    let page = Pagination::parse(params.limit.as_deref(), params.offset.as_deref())?;

    let mut query = select(
        "SELECT m.*, u.name AS author_name FROM community_messages m JOIN users u ON u.id = m.author_id",
        Filter::new(),
        "m.created_at DESC, m.id",
        page,
    );
    let messages = query
        .build_query_as::<Message>()
        .fetch_all(&state.db)
        .await?;

    Ok(Json(MessagesResponse { messages }))
}

/// POST /api/community/messages
pub async fn handle_create_message(
    State(state): State<AppState>,
    Json(req): Json<CreatePostRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let civic_id = require_civic_id(req.civic_id.as_deref())?;
    let content = validate_body(req.content.as_deref(), req.media.as_ref(), "Message")?;

    let author = require_user_by_civic_id(&state.db, &civic_id).await?;

    let message = sqlx::query_as::<_, Message>(
        r#"
        WITH inserted AS (
            INSERT INTO community_messages (author_id, content, media)
            VALUES ($1, $2, $3)
            RETURNING *
        )
        SELECT inserted.*, u.name AS author_name
        FROM inserted JOIN users u ON u.id = inserted.author_id
        "#,
    )
    .bind(author.id)
    .bind(&content)
    .bind(req.media.map(SqlJson))
    .fetch_one(&state.db)
    .await?;

    Ok(Json(MessageResponse { message }))
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

async fn ensure_post_exists(state: &AppState, post_id: Uuid) -> Result<(), AppError> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM community_posts WHERE id = $1)")
            .bind(post_id)
            .fetch_one(&state.db)
            .await?;
    if exists {
        Ok(())
    } else {
        Err(AppError::not_found("Post not found"))
    }
}

fn parse_post_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::validation("Invalid post ID"))
}

/// Returns the trimmed text of a post or message. Text may be empty only when
/// media is attached; attached media must itself be valid.
fn validate_body(content: Option<&str>, media: Option<&Media>, what: &str) -> Result<String, AppError> {
    if let Some(media) = media {
        media.validate()?;
    }
    let content = non_empty(content).unwrap_or_default();
    if content.is_empty() && media.is_none() {
        return Err(AppError::validation(format!(
            "{what} content or media is required"
        )));
    }
    check_length(content, what)?;
    Ok(content.to_string())
}

fn validate_comment(content: Option<&str>) -> Result<String, AppError> {
    let content =
        non_empty(content).ok_or_else(|| AppError::validation("Comment content is required"))?;
    check_length(content, "Comment")?;
    Ok(content.to_string())
}

fn check_length(content: &str, what: &str) -> Result<(), AppError> {
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(AppError::validation(format!(
            "{what} exceeds {MAX_CONTENT_CHARS} characters"
        )));
    }
    Ok(())
}
