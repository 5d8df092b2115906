//! JSON API for the memo registry.
//!
//! Endpoints:
//! - `GET    /api/memos?search=&type=&status=`        — filtered listing
//! - `POST   /api/memos`                              — create a memo (DRAFT)
//! - `GET    /api/memos/{id}`                         — detail with children
//! - `PATCH  /api/memos/{id}`                         — direct status edit
//! - `GET    /api/memos/{id}/approvals`               — approval chain
//! - `POST   /api/memos/{id}/approvals`               — attach approvers
//! - `PATCH  /api/memos/{id}/approvals/{step_id}`     — decide a step
//! - `GET    /api/memos/{id}/comments`                — minutes log
//! - `POST   /api/memos/{id}/comments`                — append a comment
//! - `GET    /api/memos/{id}/pdf`                     — rendered document
//! - `PUT    /api/users/{id}/signature`               — replace signature ref
//! - `DELETE /api/users/{id}/signature`               — clear signature ref
//!
//! Handlers stay thin: validation and chain logic live in the core and
//! repository layers; this module maps wire names and error statuses.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use memoreg_core::domain::approval::{ApprovalDecision, ApprovalStepId, ApproverEntry};
use memoreg_core::domain::comment::{Comment, NewComment};
use memoreg_core::domain::memo::{DepartmentId, Memo, MemoId, MemoPriority, MemoStatus, MemoType, NewMemo};
use memoreg_core::domain::user::{User, UserId};
use memoreg_core::errors::DomainError;
use memoreg_db::repositories::{
    ApprovalChainRepository, ApprovalStepDetail, CommentRepository, MemoFilter, MemoRepository,
    RepositoryError, SqlApprovalChainRepository, SqlCommentRepository, SqlMemoRepository,
    SqlUserRepository, UserRepository,
};
use memoreg_db::DbPool;
use memoreg_core::config::RenderingConfig;

use crate::render::{DocumentRenderer, RenderError};

#[derive(Clone)]
pub struct ApiState {
    memos: Arc<SqlMemoRepository>,
    chains: Arc<SqlApprovalChainRepository>,
    comments: Arc<SqlCommentRepository>,
    users: Arc<SqlUserRepository>,
    renderer: Arc<DocumentRenderer>,
}

pub fn router(db_pool: DbPool, rendering: RenderingConfig) -> Result<Router, RenderError> {
    let state = ApiState {
        memos: Arc::new(SqlMemoRepository::new(db_pool.clone())),
        chains: Arc::new(SqlApprovalChainRepository::new(db_pool.clone())),
        comments: Arc::new(SqlCommentRepository::new(db_pool.clone())),
        users: Arc::new(SqlUserRepository::new(db_pool)),
        renderer: Arc::new(DocumentRenderer::new(rendering)?),
    };

    Ok(Router::new()
        .route("/api/memos", get(list_memos).post(create_memo))
        .route("/api/memos/{id}", get(get_memo).patch(patch_memo))
        .route("/api/memos/{id}/approvals", get(list_approvals).post(attach_approvers))
        .route("/api/memos/{id}/approvals/{step_id}", patch(decide_approval))
        .route("/api/memos/{id}/comments", get(list_comments).post(add_comment))
        .route("/api/memos/{id}/pdf", get(render_pdf))
        .route("/api/users/{id}/signature", put(put_signature).delete(delete_signature))
        .with_state(state))
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

pub struct ApiError {
    status: StatusCode,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

impl From<RepositoryError> for ApiError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Domain(DomainError::InvalidInput(message)) => {
                Self { status: StatusCode::BAD_REQUEST, message }
            }
            RepositoryError::Domain(error @ DomainError::NotFound { .. }) => {
                Self { status: StatusCode::NOT_FOUND, message: error.to_string() }
            }
            RepositoryError::Database(source) => {
                error!(
                    event_name = "api.persistence_failure",
                    error = %source,
                    "datastore failure surfaced to client"
                );
                Self {
                    status: StatusCode::SERVICE_UNAVAILABLE,
                    message: "datastore unavailable".to_string(),
                }
            }
            RepositoryError::Decode(detail) => {
                error!(
                    event_name = "api.decode_failure",
                    error = %detail,
                    "stored row failed to decode"
                );
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "internal error".to_string(),
                }
            }
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(value: DomainError) -> Self {
        RepositoryError::from(value).into()
    }
}

fn memo_not_found(id: &MemoId) -> ApiError {
    DomainError::not_found("memo", id.0.clone()).into()
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default)]
pub struct ListMemosQuery {
    pub search: Option<String>,
    #[serde(rename = "type")]
    pub memo_type: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMemoRequest {
    pub subject: String,
    #[serde(rename = "memoBody")]
    pub memo_body: String,
    #[serde(rename = "type")]
    pub memo_type: String,
    pub priority: Option<String>,
    #[serde(rename = "departmentId")]
    pub department_id: Option<String>,
    #[serde(rename = "createdById")]
    pub created_by_id: String,
    pub recipients: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMemoRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct AttachApproversRequest {
    pub approvers: Vec<ApproverEntryRequest>,
}

#[derive(Debug, Deserialize)]
pub struct ApproverEntryRequest {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub order: i64,
}

#[derive(Debug, Deserialize)]
pub struct DecideApprovalRequest {
    pub status: String,
    pub comments: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddCommentRequest {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct SignatureRequest {
    #[serde(rename = "signaturePath")]
    pub signature_path: String,
}

#[derive(Debug, Serialize)]
pub struct DepartmentResponse {
    pub name: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    pub email: String,
    pub role: String,
    pub department: Option<DepartmentResponse>,
    #[serde(rename = "signaturePath")]
    pub signature_path: Option<String>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.0.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
            department: user
                .department
                .as_ref()
                .map(|d| DepartmentResponse { name: d.name.clone(), code: d.code.clone() }),
            signature_path: user.signature_ref.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MemoResponse {
    pub id: String,
    #[serde(rename = "referenceNumber")]
    pub reference_number: String,
    pub subject: String,
    pub body: String,
    #[serde(rename = "type")]
    pub memo_type: &'static str,
    pub priority: &'static str,
    pub status: &'static str,
    #[serde(rename = "departmentId")]
    pub department_id: Option<String>,
    #[serde(rename = "createdById")]
    pub created_by_id: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
    #[serde(rename = "approvedAt")]
    pub approved_at: Option<String>,
}

impl From<&Memo> for MemoResponse {
    fn from(memo: &Memo) -> Self {
        Self {
            id: memo.id.0.clone(),
            reference_number: memo.reference_number.clone(),
            subject: memo.subject.clone(),
            body: memo.body.clone(),
            memo_type: memo.memo_type.as_str(),
            priority: memo.priority.as_str(),
            status: memo.status.as_str(),
            department_id: memo.department_id.as_ref().map(|d| d.0.clone()),
            created_by_id: memo.created_by.0.clone(),
            created_at: memo.created_at.to_rfc3339(),
            updated_at: memo.updated_at.to_rfc3339(),
            approved_at: memo.approved_at.map(|ts| ts.to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApprovalResponse {
    pub id: String,
    #[serde(rename = "memoId")]
    pub memo_id: String,
    #[serde(rename = "approverId")]
    pub approver_id: String,
    pub order: i64,
    pub status: &'static str,
    pub comments: Option<String>,
    #[serde(rename = "approvedAt")]
    pub approved_at: Option<String>,
    pub approver: Option<UserResponse>,
}

impl ApprovalResponse {
    fn from_detail(detail: &ApprovalStepDetail) -> Self {
        let mut response = Self::from_step(&detail.step);
        response.approver = Some(UserResponse::from(&detail.approver));
        response
    }

    fn from_step(step: &memoreg_core::domain::approval::ApprovalStep) -> Self {
        Self {
            id: step.id.0.clone(),
            memo_id: step.memo_id.0.clone(),
            approver_id: step.approver_id.0.clone(),
            order: step.order,
            status: step.status.as_str(),
            comments: step.comments.clone(),
            approved_at: step.decided_at.map(|ts| ts.to_rfc3339()),
            approver: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    #[serde(flatten)]
    pub step: ApprovalResponse,
    #[serde(rename = "memoStatus")]
    pub memo_status: &'static str,
    #[serde(rename = "memoApprovedAt")]
    pub memo_approved_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: String,
    #[serde(rename = "memoId")]
    pub memo_id: String,
    pub comment: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    pub user: UserResponse,
}

impl From<&Comment> for CommentResponse {
    fn from(comment: &Comment) -> Self {
        Self {
            id: comment.id.0.clone(),
            memo_id: comment.memo_id.0.clone(),
            comment: comment.text.clone(),
            created_at: comment.created_at.to_rfc3339(),
            user: UserResponse::from(&comment.author),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecipientResponse {
    pub user: UserResponse,
    #[serde(rename = "addedAt")]
    pub added_at: String,
}

#[derive(Debug, Serialize)]
pub struct MemoDetailResponse {
    #[serde(flatten)]
    pub memo: MemoResponse,
    #[serde(rename = "createdBy")]
    pub created_by: UserResponse,
    pub recipients: Vec<RecipientResponse>,
    pub approvals: Vec<ApprovalResponse>,
    pub comments: Vec<CommentResponse>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// "All" filter values from the dashboard pass through as no-filter.
fn enum_filter(raw: Option<String>) -> Option<String> {
    raw.filter(|value| !value.is_empty() && value != "All")
}

async fn list_memos(
    State(state): State<ApiState>,
    Query(query): Query<ListMemosQuery>,
) -> Result<Json<Vec<MemoResponse>>, ApiError> {
    let filter = MemoFilter {
        search: query.search,
        memo_type: enum_filter(query.memo_type).map(|raw| MemoType::parse(&raw)).transpose()?,
        status: enum_filter(query.status).map(|raw| MemoStatus::parse(&raw)).transpose()?,
    };

    let memos = state.memos.list(filter).await?;
    Ok(Json(memos.iter().map(MemoResponse::from).collect()))
}

async fn create_memo(
    State(state): State<ApiState>,
    Json(request): Json<CreateMemoRequest>,
) -> Result<(StatusCode, Json<MemoResponse>), ApiError> {
    let priority = match request.priority {
        Some(raw) => MemoPriority::parse(&raw)?,
        None => MemoPriority::Medium,
    };

    let new_memo = NewMemo {
        subject: request.subject,
        body: request.memo_body,
        memo_type: MemoType::parse(&request.memo_type)?,
        priority,
        department_id: request.department_id.map(DepartmentId),
        created_by: UserId(request.created_by_id),
        recipient_ids: request.recipients.unwrap_or_default().into_iter().map(UserId).collect(),
    };

    let memo = state.memos.create(new_memo).await?;
    info!(
        event_name = "memo.created",
        memo_id = %memo.id.0,
        reference = %memo.reference_number,
        "memo created"
    );
    Ok((StatusCode::CREATED, Json(MemoResponse::from(&memo))))
}

async fn get_memo(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<MemoDetailResponse>, ApiError> {
    let memo_id = MemoId(id);
    let detail = state.memos.find_by_id(&memo_id).await?.ok_or_else(|| memo_not_found(&memo_id))?;

    Ok(Json(MemoDetailResponse {
        memo: MemoResponse::from(&detail.memo),
        created_by: UserResponse::from(&detail.created_by),
        recipients: detail
            .recipients
            .iter()
            .map(|r| RecipientResponse {
                user: UserResponse::from(&r.user),
                added_at: r.added_at.to_rfc3339(),
            })
            .collect(),
        approvals: detail.steps.iter().map(ApprovalResponse::from_detail).collect(),
        comments: detail.comments.iter().map(CommentResponse::from).collect(),
    }))
}

async fn patch_memo(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateMemoRequest>,
) -> Result<Json<MemoResponse>, ApiError> {
    let status = MemoStatus::parse(&request.status)?;
    let memo = state.memos.set_status(&MemoId(id), status).await?;
    Ok(Json(MemoResponse::from(&memo)))
}

async fn list_approvals(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ApprovalResponse>>, ApiError> {
    let steps = state.chains.list_for_memo(&MemoId(id)).await?;
    Ok(Json(steps.iter().map(ApprovalResponse::from_detail).collect()))
}

async fn attach_approvers(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(request): Json<AttachApproversRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let entries: Vec<ApproverEntry> = request
        .approvers
        .into_iter()
        .map(|entry| ApproverEntry { approver_id: UserId(entry.user_id), order: entry.order })
        .collect();

    let memo_id = MemoId(id);
    let steps = state.chains.attach(&memo_id, &entries).await?;
    info!(
        event_name = "memo.approvers_attached",
        memo_id = %memo_id.0,
        step_count = steps.len(),
        "approval chain attached"
    );
    Ok((StatusCode::CREATED, Json(MessageResponse { message: "Approvers added successfully" })))
}

async fn decide_approval(
    State(state): State<ApiState>,
    Path((id, step_id)): Path<(String, String)>,
    Json(request): Json<DecideApprovalRequest>,
) -> Result<Json<DecisionResponse>, ApiError> {
    let decision = ApprovalDecision::parse(&request.status)?;
    let memo_id = MemoId(id);

    let outcome = state
        .chains
        .decide(&memo_id, &ApprovalStepId(step_id), decision, request.comments)
        .await?;

    info!(
        event_name = "memo.approval_decided",
        memo_id = %memo_id.0,
        step_id = %outcome.step.id.0,
        decision = outcome.step.status.as_str(),
        memo_status = outcome.memo_status.as_str(),
        "approval step decided"
    );

    Ok(Json(DecisionResponse {
        step: ApprovalResponse::from_step(&outcome.step),
        memo_status: outcome.memo_status.as_str(),
        memo_approved_at: outcome.approved_at.map(|ts| ts.to_rfc3339()),
    }))
}

async fn list_comments(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<CommentResponse>>, ApiError> {
    let memo_id = MemoId(id);

    // Listing against an unknown memo is a 404, not an empty list.
    state.memos.find_by_id(&memo_id).await?.ok_or_else(|| memo_not_found(&memo_id))?;

    let comments = state.comments.list_for_memo(&memo_id).await?;
    Ok(Json(comments.iter().map(CommentResponse::from).collect()))
}

async fn add_comment(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(request): Json<AddCommentRequest>,
) -> Result<(StatusCode, Json<CommentResponse>), ApiError> {
    let comment = state
        .comments
        .append(&MemoId(id), &UserId(request.user_id), NewComment { text: request.comment })
        .await?;

    Ok((StatusCode::CREATED, Json(CommentResponse::from(&comment))))
}

async fn render_pdf(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let memo_id = MemoId(id);
    let detail = state.memos.find_by_id(&memo_id).await?.ok_or_else(|| memo_not_found(&memo_id))?;

    let rendered = state.renderer.render_memo(&detail).await.map_err(|error| {
        error!(
            event_name = "memo.render_failed",
            memo_id = %memo_id.0,
            error = %error,
            "document rendering failed"
        );
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "document rendering failed".to_string(),
        }
    })?;

    info!(
        event_name = "memo.rendered",
        memo_id = %memo_id.0,
        pages = rendered.page_count,
        size = rendered.bytes.len(),
        "memo document rendered"
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"memo-{}.pdf\"", detail.memo.reference_number),
        )
        .body(Body::from(rendered.bytes))
        .map_err(|error| ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("response assembly failed: {error}"),
        })
}

async fn put_signature(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(request): Json<SignatureRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    if request.signature_path.trim().is_empty() {
        return Err(DomainError::InvalidInput("signaturePath is required".to_string()).into());
    }

    let user =
        state.users.set_signature_ref(&UserId(id), Some(request.signature_path)).await?;
    Ok(Json(UserResponse::from(&user)))
}

async fn delete_signature(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.users.set_signature_ref(&UserId(id), None).await?;
    Ok(Json(UserResponse::from(&user)))
}
