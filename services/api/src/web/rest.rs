//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::{chat_task::thinking_delay, mentor_task::mentor_reply_process, state::AppState};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use haven_core::breathing::{DEFAULT_TOTAL_CYCLES, EXERCISES};
use haven_core::domain::{Post, PostView, ReactionKind, Reply, Topic};
use haven_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        list_posts_handler,
        create_post_handler,
        create_reply_handler,
        toggle_reaction_handler,
        list_exercises_handler,
    ),
    components(
        schemas(
            PostResponse,
            ReplyResponse,
            CreatePostRequest,
            CreateReplyRequest,
            ToggleReactionResponse,
            ExerciseResponse,
        )
    ),
    tags(
        (name = "Haven API", description = "API endpoints for the peer-support community.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// A reply as sent to clients. The author field is already resolved to the
/// display name; the owning user id of anonymous content never leaves the
/// server.
#[derive(Serialize, ToSchema)]
pub struct ReplyResponse {
    id: Uuid,
    author: String,
    content: String,
    is_from_mentor: bool,
    created_at: DateTime<Utc>,
}

impl ReplyResponse {
    fn from_domain(reply: &Reply) -> Self {
        Self {
            id: reply.id,
            author: reply.display_author().to_string(),
            content: reply.content.clone(),
            is_from_mentor: reply.is_from_mentor,
            created_at: reply.created_at,
        }
    }
}

/// A post as sent to clients, including the caller's own active reactions.
#[derive(Serialize, ToSchema)]
pub struct PostResponse {
    id: Uuid,
    author: String,
    topic: String,
    content: String,
    is_anonymous: bool,
    hearts: u32,
    hugs: u32,
    relates: u32,
    viewer_reactions: Vec<String>,
    replies: Vec<ReplyResponse>,
    created_at: DateTime<Utc>,
}

impl PostResponse {
    fn from_parts(post: &Post, viewer_reactions: &[ReactionKind]) -> Self {
        Self {
            id: post.id,
            author: post.display_author().to_string(),
            topic: post.topic.as_str().to_string(),
            content: post.content.clone(),
            is_anonymous: post.is_anonymous,
            hearts: post.counts.hearts,
            hugs: post.counts.hugs,
            relates: post.counts.relates,
            viewer_reactions: viewer_reactions
                .iter()
                .map(|k| k.as_str().to_string())
                .collect(),
            replies: post.replies.iter().map(ReplyResponse::from_domain).collect(),
            created_at: post.created_at,
        }
    }

    fn from_view(view: &PostView) -> Self {
        Self::from_parts(&view.post, &view.viewer_reactions)
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreatePostRequest {
    pub content: String,
    pub topic: String,
    #[serde(default)]
    pub is_anonymous: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateReplyRequest {
    pub content: String,
    #[serde(default)]
    pub is_anonymous: bool,
}

/// The result of a reaction toggle: "added", "removed" or "already_applied".
/// Clients refetch the post list afterwards instead of patching counts.
#[derive(Serialize, ToSchema)]
pub struct ToggleReactionResponse {
    outcome: String,
}

/// One entry of the static breathing-exercise catalog.
#[derive(Serialize, ToSchema)]
pub struct ExerciseResponse {
    id: String,
    title: String,
    description: String,
    duration: String,
    difficulty: String,
    inhale: u32,
    hold: u32,
    exhale: u32,
    pause: u32,
    total_cycles: u32,
}

#[derive(Deserialize, IntoParams)]
pub struct ListPostsQuery {
    /// Restrict the feed to one topic; omitted or "all" lists everything.
    topic: Option<String>,
}

//=========================================================================================
// Error Mapping
//=========================================================================================

/// Maps the port taxonomy to HTTP. Conflicts never reach this function for
/// reaction toggles - the ledger resolves them to `already_applied` - but
/// other duplicate writes (e.g. signup) do.
pub fn port_error_response(e: PortError) -> (StatusCode, String) {
    match e {
        PortError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
        PortError::Unauthorized => (
            StatusCode::UNAUTHORIZED,
            "Please sign in to continue".to_string(),
        ),
        PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        PortError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        PortError::Store(msg) => {
            error!("Store failure: {}", msg);
            (
                StatusCode::BAD_GATEWAY,
                "The community space is temporarily unavailable. Please try again.".to_string(),
            )
        }
    }
}

fn parse_topic(raw: &str) -> Result<Topic, (StatusCode, String)> {
    Topic::parse(raw).ok_or_else(|| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("'{}' is not a valid topic", raw),
        )
    })
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List community posts, newest first, with replies and the caller's own
/// reaction state.
#[utoipa::path(
    get,
    path = "/posts",
    params(ListPostsQuery),
    responses(
        (status = 200, description = "The post feed", body = [PostResponse]),
        (status = 401, description = "Not signed in"),
        (status = 502, description = "Store unavailable")
    )
)]
pub async fn list_posts_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Query(query): Query<ListPostsQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let topic = match query.topic.as_deref() {
        None | Some("all") => None,
        Some(raw) => Some(parse_topic(raw)?),
    };

    let views = app_state
        .feed
        .posts(Some(user_id), topic)
        .await
        .map_err(port_error_response)?;

    let body: Vec<PostResponse> = views.iter().map(PostResponse::from_view).collect();
    Ok(Json(body))
}

/// Share a new post. Anonymous posts get a freshly drawn display label.
///
/// In the self-contained variant a deferred mentor reply is scheduled after
/// a successful create.
#[utoipa::path(
    post,
    path = "/posts",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Post created", body = PostResponse),
        (status = 401, description = "Not signed in"),
        (status = 422, description = "Empty content or unknown topic"),
        (status = 502, description = "Store unavailable")
    )
)]
pub async fn create_post_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let topic = parse_topic(&req.topic)?;

    let post = app_state
        .feed
        .submit_post(Some(user_id), &req.content, topic, req.is_anonymous)
        .await
        .map_err(port_error_response)?;

    if app_state.mentor_replies_enabled {
        let feed = app_state.feed.clone();
        let delay = thinking_delay(&app_state.config);
        let token = app_state.shutdown.child_token();
        let pending = post.clone();
        tokio::spawn(async move {
            if let Err(e) = mentor_reply_process(feed, pending, delay, token).await {
                error!("Mentor reply task failed: {:?}", e);
            }
        });
    }

    Ok((
        StatusCode::CREATED,
        Json(PostResponse::from_parts(&post, &[])),
    ))
}

/// Reply to a post.
#[utoipa::path(
    post,
    path = "/posts/{post_id}/replies",
    request_body = CreateReplyRequest,
    params(
        ("post_id" = Uuid, Path, description = "The post being replied to")
    ),
    responses(
        (status = 201, description = "Reply created", body = ReplyResponse),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "No such post"),
        (status = 422, description = "Empty content"),
        (status = 502, description = "Store unavailable")
    )
)]
pub async fn create_reply_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(post_id): Path<Uuid>,
    Json(req): Json<CreateReplyRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let reply = app_state
        .feed
        .submit_reply(Some(user_id), post_id, &req.content, req.is_anonymous)
        .await
        .map_err(port_error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(ReplyResponse::from_domain(&reply)),
    ))
}

/// Toggle one of the caller's reactions on a post. Calling twice with the
/// same arguments restores the original state.
#[utoipa::path(
    post,
    path = "/posts/{post_id}/reactions/{kind}",
    params(
        ("post_id" = Uuid, Path, description = "The post being reacted to"),
        ("kind" = String, Path, description = "One of: hearts, hugs, relates")
    ),
    responses(
        (status = 200, description = "Toggle applied", body = ToggleReactionResponse),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "No such post"),
        (status = 422, description = "Unknown reaction kind"),
        (status = 502, description = "Store unavailable")
    )
)]
pub async fn toggle_reaction_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path((post_id, kind)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let kind = ReactionKind::parse(&kind).ok_or_else(|| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("'{}' is not a valid reaction", kind),
        )
    })?;

    let outcome = app_state
        .ledger
        .toggle(Some(user_id), post_id, kind)
        .await
        .map_err(port_error_response)?;

    Ok(Json(ToggleReactionResponse {
        outcome: outcome.as_str().to_string(),
    }))
}

/// The static breathing-exercise catalog.
#[utoipa::path(
    get,
    path = "/breathing/exercises",
    responses(
        (status = 200, description = "The exercise catalog", body = [ExerciseResponse])
    )
)]
pub async fn list_exercises_handler() -> impl IntoResponse {
    let body: Vec<ExerciseResponse> = EXERCISES
        .iter()
        .map(|e| ExerciseResponse {
            id: e.id.to_string(),
            title: e.title.to_string(),
            description: e.description.to_string(),
            duration: e.duration_label.to_string(),
            difficulty: e.difficulty.to_string(),
            inhale: e.inhale,
            hold: e.hold,
            exhale: e.exhale,
            pause: e.pause,
            total_cycles: DEFAULT_TOTAL_CYCLES,
        })
        .collect();
    Json(body)
}
