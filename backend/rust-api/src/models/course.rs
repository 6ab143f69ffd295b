use chrono::{DateTime, Utc};
use mongodb::bson::{oid::ObjectId, Bson};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::Validate;

/// Course model stored in MongoDB "courses" collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub description: String,
    /// Requested number of chapters for generation
    pub chapters: u32,
    #[serde(rename = "includeVideos", default = "default_include_videos")]
    pub include_videos: bool,
    pub category: CourseCategory,
    pub difficulty: CourseDifficulty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<CourseDifficulty>,
    #[serde(
        rename = "bannerImagePrompt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub banner_image_prompt: Option<String>,
    #[serde(rename = "generatedChapters", default)]
    pub generated_chapters: Vec<GeneratedChapter>,
    /// Raw outline blob as returned by the generative service
    #[serde(
        rename = "aiGeneratedLayout",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ai_generated_layout: Option<Bson>,
    #[serde(rename = "createdBy")]
    pub created_by: String,
    #[serde(default)]
    pub status: CourseStatus,
    #[serde(rename = "createdAt", with = "super::bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt", with = "super::bson_datetime_as_chrono")]
    pub updated_at: DateTime<Utc>,
}

fn default_include_videos() -> bool {
    true
}

impl Course {
    /// Topic total used for completion percentages. Derived from the
    /// generated-chapter count, matching the observed behavior of the
    /// enrollment endpoints.
    pub fn total_topics(&self) -> usize {
        self.generated_chapters.len()
    }
}

/// One generated chapter embedded in a course document
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GeneratedChapter {
    #[validate(length(min = 1, message = "Chapter title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Chapter description is required"))]
    pub description: String,
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(
        rename = "videoKeywords",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub video_keywords: Option<String>,
    pub order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(
        rename = "youtubeVideo",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub youtube_video: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CourseCategory {
    Technology,
    Programming,
    Business,
    Marketing,
    Design,
    Health,
    Education,
    Science,
    Arts,
    Language,
}

impl CourseCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseCategory::Technology => "Technology",
            CourseCategory::Programming => "Programming",
            CourseCategory::Business => "Business",
            CourseCategory::Marketing => "Marketing",
            CourseCategory::Design => "Design",
            CourseCategory::Health => "Health",
            CourseCategory::Education => "Education",
            CourseCategory::Science => "Science",
            CourseCategory::Arts => "Arts",
            CourseCategory::Language => "Language",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CourseDifficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl CourseDifficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseDifficulty::Beginner => "Beginner",
            CourseDifficulty::Intermediate => "Intermediate",
            CourseDifficulty::Advanced => "Advanced",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CourseStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl CourseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseStatus::Draft => "draft",
            CourseStatus::Published => "published",
            CourseStatus::Archived => "archived",
        }
    }
}

impl FromStr for CourseStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "draft" => Ok(CourseStatus::Draft),
            "published" => Ok(CourseStatus::Published),
            "archived" => Ok(CourseStatus::Archived),
            _ => Err(format!("Invalid status value: {}", value)),
        }
    }
}

/// Course returned to clients (hex id, RFC 3339 timestamps)
#[derive(Debug, Serialize)]
pub struct CourseResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub chapters: u32,
    #[serde(rename = "includeVideos")]
    pub include_videos: bool,
    pub category: CourseCategory,
    pub difficulty: CourseDifficulty,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<CourseDifficulty>,
    #[serde(rename = "bannerImagePrompt", skip_serializing_if = "Option::is_none")]
    pub banner_image_prompt: Option<String>,
    #[serde(rename = "generatedChapters")]
    pub generated_chapters: Vec<GeneratedChapter>,
    #[serde(rename = "aiGeneratedLayout", skip_serializing_if = "Option::is_none")]
    pub ai_generated_layout: Option<serde_json::Value>,
    #[serde(rename = "createdBy")]
    pub created_by: String,
    pub status: CourseStatus,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<Course> for CourseResponse {
    fn from(course: Course) -> Self {
        CourseResponse {
            id: course.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: course.name,
            description: course.description,
            chapters: course.chapters,
            include_videos: course.include_videos,
            category: course.category,
            difficulty: course.difficulty,
            level: course.level,
            banner_image_prompt: course.banner_image_prompt,
            generated_chapters: course.generated_chapters,
            ai_generated_layout: course
                .ai_generated_layout
                .map(|layout| layout.into_relaxed_extjson()),
            created_by: course.created_by,
            status: course.status,
            created_at: course.created_at,
            updated_at: course.updated_at,
        }
    }
}

/// Short course projection embedded in enrollment listings
#[derive(Debug, Serialize)]
pub struct CourseSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: CourseCategory,
    pub difficulty: CourseDifficulty,
    pub chapters: u32,
    pub status: CourseStatus,
}

impl From<Course> for CourseSummary {
    fn from(course: Course) -> Self {
        CourseSummary {
            id: course.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: course.name,
            description: course.description,
            category: course.category,
            difficulty: course.difficulty,
            chapters: course.chapters,
            status: course.status,
        }
    }
}

/// Request to create a course
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCourseRequest {
    #[validate(length(
        min = 3,
        max = 100,
        message = "Course name must be between 3 and 100 characters"
    ))]
    pub name: String,

    #[validate(length(
        min = 10,
        max = 1000,
        message = "Course description must be between 10 and 1000 characters"
    ))]
    pub description: String,

    #[validate(range(min = 1, max = 20, message = "Number of chapters must be between 1 and 20"))]
    pub chapters: u32,

    #[serde(rename = "includeVideos")]
    pub include_videos: Option<bool>,

    pub category: CourseCategory,

    pub difficulty: CourseDifficulty,

    pub level: Option<CourseDifficulty>,

    #[serde(rename = "bannerImagePrompt")]
    pub banner_image_prompt: Option<String>,

    #[serde(rename = "generatedChapters")]
    #[validate(nested)]
    pub generated_chapters: Option<Vec<GeneratedChapter>>,

    #[serde(rename = "aiGeneratedLayout")]
    pub ai_generated_layout: Option<serde_json::Value>,
}

/// Request to update a course (partial; only supplied fields are applied)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateCourseRequest {
    #[validate(length(
        min = 3,
        max = 100,
        message = "Course name must be between 3 and 100 characters"
    ))]
    pub name: Option<String>,

    #[validate(length(
        min = 10,
        max = 1000,
        message = "Course description must be between 10 and 1000 characters"
    ))]
    pub description: Option<String>,

    #[validate(range(min = 1, max = 20, message = "Number of chapters must be between 1 and 20"))]
    pub chapters: Option<u32>,

    #[serde(rename = "includeVideos")]
    pub include_videos: Option<bool>,

    pub category: Option<CourseCategory>,

    pub difficulty: Option<CourseDifficulty>,

    pub level: Option<CourseDifficulty>,

    #[serde(rename = "bannerImagePrompt")]
    pub banner_image_prompt: Option<String>,

    #[serde(rename = "generatedChapters")]
    #[validate(nested)]
    pub generated_chapters: Option<Vec<GeneratedChapter>>,

    #[serde(rename = "aiGeneratedLayout")]
    pub ai_generated_layout: Option<serde_json::Value>,
}

/// Request to patch a course status
#[derive(Debug, Deserialize)]
pub struct UpdateCourseStatusRequest {
    pub status: String,
}

/// Query params for listing own courses
#[derive(Debug, Deserialize)]
pub struct ListCoursesQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<String>,
}

/// Query params for the public explore listing
#[derive(Debug, Deserialize)]
pub struct ExploreCoursesQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_status_round_trips_through_from_str() {
        assert_eq!("draft".parse::<CourseStatus>().unwrap(), CourseStatus::Draft);
        assert_eq!(
            "published".parse::<CourseStatus>().unwrap(),
            CourseStatus::Published
        );
        assert_eq!(
            "archived".parse::<CourseStatus>().unwrap(),
            CourseStatus::Archived
        );
        assert!("deleted".parse::<CourseStatus>().is_err());
    }

    #[test]
    fn status_names_match_stored_values() {
        assert_eq!(CourseStatus::Draft.as_str(), "draft");
        assert_eq!(CourseStatus::Published.as_str(), "published");
        assert_eq!(CourseStatus::Archived.as_str(), "archived");
    }

    #[test]
    fn create_course_request_validates_field_bounds() {
        let valid: CreateCourseRequest = serde_json::from_value(serde_json::json!({
            "name": "Rust for Beginners",
            "description": "An introductory course covering the Rust language.",
            "chapters": 5,
            "category": "Programming",
            "difficulty": "Beginner",
        }))
        .unwrap();
        assert!(valid.validate().is_ok());

        let mut too_short = valid.clone();
        too_short.name = "ab".to_string();
        assert!(too_short.validate().is_err());

        let mut too_many = valid.clone();
        too_many.chapters = 21;
        assert!(too_many.validate().is_err());
    }

    #[test]
    fn unknown_category_is_rejected_at_deserialization() {
        let result: Result<CreateCourseRequest, _> = serde_json::from_value(serde_json::json!({
            "name": "Rust for Beginners",
            "description": "An introductory course covering the Rust language.",
            "chapters": 5,
            "category": "Cooking",
            "difficulty": "Beginner",
        }));
        assert!(result.is_err());
    }

    #[test]
    fn total_topics_counts_generated_chapters() {
        let course = Course {
            id: None,
            name: "Rust".into(),
            description: "A course".into(),
            chapters: 3,
            include_videos: true,
            category: CourseCategory::Programming,
            difficulty: CourseDifficulty::Beginner,
            level: None,
            banner_image_prompt: None,
            generated_chapters: vec![
                GeneratedChapter {
                    title: "Ownership".into(),
                    description: "Moves and borrows".into(),
                    objectives: vec![],
                    video_keywords: None,
                    order: 1,
                    content: None,
                    youtube_video: None,
                },
                GeneratedChapter {
                    title: "Lifetimes".into(),
                    description: "Borrow checker".into(),
                    objectives: vec![],
                    video_keywords: None,
                    order: 2,
                    content: None,
                    youtube_video: None,
                },
            ],
            ai_generated_layout: None,
            created_by: "user1".into(),
            status: CourseStatus::Draft,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };

        assert_eq!(course.total_topics(), 2);
    }
}
