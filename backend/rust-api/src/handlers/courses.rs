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
    models::course::{
        CourseStatus, CreateCourseRequest, ExploreCoursesQuery, ListCoursesQuery,
        UpdateCourseRequest, UpdateCourseStatusRequest,
    },
    services::{course_service::CourseService, AppState},
};

/// POST /api/courses - Create a course
pub async fn create_course(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<CreateCourseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let service = CourseService::new(state.mongo.clone());
    let created = service.create_course(&claims.sub, req).await.map_err(|e| {
        tracing::error!("Failed to create course: {:?}", e);
        ApiError::from_service(e)
    })?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/courses - List the caller's courses
pub async fn list_courses(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Query(query): Query<ListCoursesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let service = CourseService::new(state.mongo.clone());

    let courses = service
        .list_courses(&claims.sub, query)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(courses))
}

/// GET /api/courses/explore - Public course catalog
pub async fn explore_courses(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExploreCoursesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let service = CourseService::new(state.mongo.clone());

    let courses = service
        .explore_courses(query)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(courses))
}

/// GET /api/courses/:id - Get one of the caller's courses
pub async fn get_course(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let service = CourseService::new(state.mongo.clone());

    let course = service
        .get_course(&claims.sub, &course_id)
        .await
        .map_err(ApiError::from_service)?;

    Ok(Json(course))
}

/// PUT /api/courses/:id - Update a course
pub async fn update_course(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(course_id): Path<String>,
    AppJson(req): AppJson<UpdateCourseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let service = CourseService::new(state.mongo.clone());
    let updated = service
        .update_course(&claims.sub, &course_id, req)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update course {}: {:?}", course_id, e);
            ApiError::from_service(e)
        })?;

    Ok(Json(updated))
}

/// DELETE /api/courses/:id - Delete a course
pub async fn delete_course(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let service = CourseService::new(state.mongo.clone());

    service
        .delete_course(&claims.sub, &course_id)
        .await
        .map_err(ApiError::from_service)?;

    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /api/courses/:id/status - Patch a course status
pub async fn update_course_status(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(course_id): Path<String>,
    AppJson(req): AppJson<UpdateCourseStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let status: CourseStatus = req
        .status
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid status value"))?;

    let service = CourseService::new(state.mongo.clone());
    let updated = service
        .update_status(&claims.sub, &course_id, status)
        .await
        .map_err(ApiError::from_service)?;

    Ok(Json(updated))
}
