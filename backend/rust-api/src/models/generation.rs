use serde::{Deserialize, Serialize};
use validator::Validate;

/// Outline returned by the generative service, wrapped in a top-level
/// "course" key per the prompt schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseLayoutEnvelope {
    pub course: CourseLayout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseLayout {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(rename = "includeVideo", default)]
    pub include_video: Option<bool>,
    #[serde(rename = "noOfChapters", default)]
    pub no_of_chapters: Option<u32>,
    #[serde(rename = "bannerImagePrompt", default)]
    pub banner_image_prompt: Option<String>,
    #[serde(default)]
    pub chapters: Vec<LayoutChapter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutChapter {
    #[serde(rename = "chapterName", default)]
    pub chapter_name: String,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
}

/// Per-chapter content block returned by the content-generation call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterContent {
    #[serde(rename = "chapterName", default)]
    pub chapter_name: String,
    #[serde(default)]
    pub topics: Vec<TopicContent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicContent {
    #[serde(default)]
    pub topic: String,
    /// HTML body for the topic
    #[serde(default)]
    pub content: String,
}

/// Request to generate a course outline from free-text input
#[derive(Debug, Deserialize, Validate)]
pub struct GenerateCourseRequest {
    #[serde(rename = "userInput")]
    #[validate(length(min = 1, message = "User input is required"))]
    pub user_input: String,
}
