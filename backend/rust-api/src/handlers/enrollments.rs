use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::{
    extractors::AppJson,
    handlers::ApiError,
    middlewares::auth::JwtClaims,
    models::enrollment::{
        EnrollRequest, EnrollmentStatus, ListEnrollmentsQuery, MarkTopicCompletedRequest,
        UpdateEnrollmentStatusRequest,
    },
    services::{enrollment_service::EnrollmentService, AppState},
};

/// POST /api/enrollments - Enroll in a course
pub async fn enroll(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<EnrollRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let service = EnrollmentService::new(state.mongo.clone());
    let enrollment = service
        .enroll(&claims.sub, &req.course_id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to enroll in course {}: {:?}", req.course_id, e);
            ApiError::from_service(e)
        })?;

    Ok((StatusCode::CREATED, Json(enrollment)))
}

/// GET /api/enrollments - List the caller's enrollments
pub async fn list_enrollments(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Query(query): Query<ListEnrollmentsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let service = EnrollmentService::new(state.mongo.clone());

    let enrollments = service
        .list_enrollments(&claims.sub, query)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(enrollments))
}

/// GET /api/enrollments/:courseId - Enrollment details with progress
pub async fn get_enrollment_details(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let service = EnrollmentService::new(state.mongo.clone());

    let details = service
        .enrollment_details(&claims.sub, &course_id)
        .await
        .map_err(ApiError::from_service)?;

    Ok(Json(details))
}

/// POST /api/enrollments/:courseId/progress - Mark a topic completed
pub async fn mark_topic_completed(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(course_id): Path<String>,
    AppJson(req): AppJson<MarkTopicCompletedRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let service = EnrollmentService::new(state.mongo.clone());

    let details = service
        .mark_topic_completed(&claims.sub, &course_id, req.chapter_order, req.topic_index)
        .await
        .map_err(|e| {
            tracing::error!("Failed to mark topic completed: {:?}", e);
            ApiError::from_service(e)
        })?;

    Ok(Json(details))
}

/// PATCH /api/enrollments/:courseId/status - Update enrollment status
pub async fn update_enrollment_status(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(course_id): Path<String>,
    AppJson(req): AppJson<UpdateEnrollmentStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let status: EnrollmentStatus = req
        .status
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid status value"))?;

    let service = EnrollmentService::new(state.mongo.clone());
    let updated = service
        .update_status(&claims.sub, &course_id, status)
        .await
        .map_err(ApiError::from_service)?;

    Ok(Json(updated))
}

/// DELETE /api/enrollments/:courseId - Unenroll from a course
pub async fn unenroll(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let service = EnrollmentService::new(state.mongo.clone());

    service
        .unenroll(&claims.sub, &course_id)
        .await
        .map_err(ApiError::from_service)?;

    Ok(StatusCode::NO_CONTENT)
}
