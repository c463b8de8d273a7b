pub mod auth;
pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::community::handlers as community;
use crate::founders::handlers as founders;
use crate::investors::{deal_flow, handlers as investors};
use crate::jobseekers::handlers as jobseekers;
use crate::profiles::handlers as profiles;
use crate::research::handlers as research;
use crate::state::AppState;
use crate::uploads::handlers::{self as uploads, UPLOAD_BODY_LIMIT};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .nest("/api", api_routes())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/config", get(auth::auth_config_handler))
        // Users & profiles
        .route("/users", post(profiles::handle_sync_user))
        .route("/profiles/by-role", get(profiles::handle_by_role))
        .route("/profiles/search", get(profiles::handle_search))
        .route(
            "/profiles/:user_id",
            get(profiles::handle_get_profile).put(profiles::handle_update_profile),
        )
        // Investors
        .route(
            "/investor",
            get(investors::handle_list_investors).post(investors::handle_upsert_investor),
        )
        .route(
            "/investor/deal-flow",
            get(deal_flow::handle_list_deals).post(deal_flow::handle_create_deal),
        )
        .route(
            "/investor/deal-flow/:deal_id",
            put(deal_flow::handle_update_deal),
        )
        // Job seekers & founders
        .route(
            "/jobseeker",
            get(jobseekers::handle_list_jobseekers).post(jobseekers::handle_upsert_jobseeker),
        )
        .route(
            "/founder",
            get(founders::handle_list_founders).post(founders::handle_upsert_founder),
        )
        // Community
        .route(
            "/community/posts",
            get(community::handle_list_posts).post(community::handle_create_post),
        )
        .route(
            "/community/posts/:post_id/like",
            post(community::handle_like_post),
        )
        .route(
            "/community/posts/:post_id/comments",
            get(community::handle_list_comments).post(community::handle_create_comment),
        )
        .route(
            "/community/messages",
            get(community::handle_list_messages).post(community::handle_create_message),
        )
        // Resume uploads; `/upload-mongo` is the path existing clients use
        .route(
            "/upload-mongo",
            post(uploads::handle_upload_resume).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route(
            "/resumes/upload",
            post(uploads::handle_upload_resume).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        // Research
        .route("/research", get(research::handle_research))
}
