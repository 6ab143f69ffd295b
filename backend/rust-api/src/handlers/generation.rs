use axum::{
    extract::{Extension, Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::{
    extractors::AppJson,
    handlers::ApiError,
    middlewares::auth::JwtClaims,
    models::generation::{CourseLayoutEnvelope, GenerateCourseRequest},
    services::{course_service, course_service::CourseService, AppState},
};

/// POST /api/courses/generate - Generate a course outline from user input
pub async fn generate_course(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<GenerateCourseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_input = req.user_input.trim();
    if user_input.is_empty() {
        return Err(ApiError::bad_request(
            "User input is required and must be a non-empty string",
        ));
    }

    if !state.gemini.is_configured() {
        return Err(ApiError::Internal(
            "Gemini API key is not configured".to_string(),
        ));
    }

    let layout = state
        .gemini
        .generate_course_layout(user_input)
        .await
        .map_err(|e| {
            tracing::error!("Failed to generate course layout: {:?}", e);
            ApiError::Internal(format!("Failed to generate course layout: {}", e))
        })?;

    Ok(Json(layout))
}

/// POST /api/courses/:id/generate-content - Generate per-topic HTML content
/// for a course's stored outline and persist it into generatedChapters.
pub async fn generate_course_content(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let service = CourseService::new(state.mongo.clone());

    let course = service
        .find_owned(&claims.sub, &course_id)
        .await
        .map_err(ApiError::from_service)?;

    let layout = course
        .ai_generated_layout
        .clone()
        .ok_or_else(|| ApiError::bad_request("Course has no generated layout"))?
        .into_relaxed_extjson();

    let envelope: CourseLayoutEnvelope = serde_json::from_value(layout.clone())
        .map_err(|_| ApiError::Internal("Stored course layout is malformed".to_string()))?;

    if !state.gemini.is_configured() {
        return Err(ApiError::Internal(
            "Gemini API key is not configured".to_string(),
        ));
    }

    let contents = state
        .gemini
        .generate_course_content(&layout)
        .await
        .map_err(|e| {
            tracing::error!("Failed to generate course content: {:?}", e);
            ApiError::Internal(format!("Failed to generate course content: {}", e))
        })?;

    let mut chapters = course_service::merge_generated_content(
        &envelope.course.chapters,
        &contents,
        &course.name,
        course.include_videos,
    );

    // Video lookup is best-effort; empty results leave the chapter bare
    if course.include_videos {
        for chapter in &mut chapters {
            if let Some(keywords) = chapter.video_keywords.clone() {
                chapter.youtube_video = state.youtube.search(&keywords, 1).await.into_iter().next();
            }
        }
    }

    let updated = service
        .set_generated_chapters(&claims.sub, &course_id, chapters)
        .await
        .map_err(ApiError::from_service)?;

    Ok(Json(updated))
}
