use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::Validate;

use super::course::CourseSummary;

/// Enrollment model stored in MongoDB "enrollments" collection.
/// One document per (userId, courseId) pair, enforced by a compound
/// unique index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "courseId")]
    pub course_id: ObjectId,
    #[serde(rename = "enrolledAt", with = "super::bson_datetime_as_chrono")]
    pub enrolled_at: DateTime<Utc>,
    #[serde(default)]
    pub status: EnrollmentStatus,
    pub progress: Progress,
    #[serde(
        rename = "completedAt",
        default,
        skip_serializing_if = "Option::is_none",
        with = "super::bson_datetime_as_chrono_option"
    )]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(rename = "createdAt", with = "super::bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt", with = "super::bson_datetime_as_chrono")]
    pub updated_at: DateTime<Utc>,
}

impl Enrollment {
    /// Membership test over completedTopics.
    pub fn is_topic_completed(&self, chapter_order: i32, topic_index: i32) -> bool {
        self.progress.is_topic_completed(chapter_order, topic_index)
    }
}

/// Progress state embedded in an enrollment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    #[serde(rename = "completedTopics", default)]
    pub completed_topics: Vec<CompletedTopic>,
    #[serde(rename = "currentChapter", default)]
    pub current_chapter: i32,
    #[serde(rename = "currentTopic", default)]
    pub current_topic: i32,
    #[serde(rename = "lastAccessedAt", with = "super::bson_datetime_as_chrono")]
    pub last_accessed_at: DateTime<Utc>,
}

impl Progress {
    pub fn new(now: DateTime<Utc>) -> Self {
        Progress {
            completed_topics: Vec::new(),
            current_chapter: 0,
            current_topic: 0,
            last_accessed_at: now,
        }
    }

    pub fn is_topic_completed(&self, chapter_order: i32, topic_index: i32) -> bool {
        self.completed_topics
            .iter()
            .any(|t| t.chapter_order == chapter_order && t.topic_index == topic_index)
    }

    /// Record a completion event: append the pair unless already present,
    /// always move the cursor and touch lastAccessedAt. Returns true when
    /// the pair was newly added. The storage layer enforces the same
    /// append-guard atomically; this is the in-memory contract.
    pub fn mark_topic_completed(
        &mut self,
        chapter_order: i32,
        topic_index: i32,
        now: DateTime<Utc>,
    ) -> bool {
        let added = if self.is_topic_completed(chapter_order, topic_index) {
            false
        } else {
            self.completed_topics.push(CompletedTopic {
                chapter_order,
                topic_index,
                completed_at: now,
            });
            true
        };

        self.current_chapter = chapter_order;
        self.current_topic = topic_index;
        self.last_accessed_at = now;
        added
    }

    /// Drop duplicate (chapterOrder, topicIndex) entries, keeping the first
    /// occurrence and its timestamp. Returns true when anything was removed.
    pub fn dedup_completed_topics(&mut self) -> bool {
        let mut seen = std::collections::HashSet::new();
        let before = self.completed_topics.len();
        self.completed_topics
            .retain(|t| seen.insert((t.chapter_order, t.topic_index)));
        self.completed_topics.len() != before
    }

    /// Completion percentage, 0..=100, rounded half-up. 0 when nothing is
    /// completed or the course has no topics.
    pub fn completion_percentage(&self, total_topics: usize) -> u32 {
        completion_percentage(self.completed_topics.len(), total_topics)
    }
}

pub fn completion_percentage(completed: usize, total_topics: usize) -> u32 {
    if completed == 0 || total_topics == 0 {
        return 0;
    }
    ((completed as f64 / total_topics as f64) * 100.0).round() as u32
}

/// One completed (chapter, topic) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedTopic {
    #[serde(rename = "chapterOrder")]
    pub chapter_order: i32,
    #[serde(rename = "topicIndex")]
    pub topic_index: i32,
    #[serde(rename = "completedAt", with = "super::bson_datetime_as_chrono")]
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    #[default]
    Active,
    Completed,
    Paused,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Active => "active",
            EnrollmentStatus::Completed => "completed",
            EnrollmentStatus::Paused => "paused",
        }
    }
}

impl FromStr for EnrollmentStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "active" => Ok(EnrollmentStatus::Active),
            "completed" => Ok(EnrollmentStatus::Completed),
            "paused" => Ok(EnrollmentStatus::Paused),
            _ => Err(format!("Invalid status value: {}", value)),
        }
    }
}

/// Enrollment returned to clients
#[derive(Debug, Serialize)]
pub struct EnrollmentResponse {
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "courseId")]
    pub course_id: String,
    #[serde(rename = "enrolledAt")]
    pub enrolled_at: DateTime<Utc>,
    pub status: EnrollmentStatus,
    pub progress: ProgressResponse,
    #[serde(rename = "completedAt", skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    #[serde(rename = "completedTopics")]
    pub completed_topics: Vec<CompletedTopicResponse>,
    #[serde(rename = "currentChapter")]
    pub current_chapter: i32,
    #[serde(rename = "currentTopic")]
    pub current_topic: i32,
    #[serde(rename = "lastAccessedAt")]
    pub last_accessed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CompletedTopicResponse {
    #[serde(rename = "chapterOrder")]
    pub chapter_order: i32,
    #[serde(rename = "topicIndex")]
    pub topic_index: i32,
    #[serde(rename = "completedAt")]
    pub completed_at: DateTime<Utc>,
}

impl From<Enrollment> for EnrollmentResponse {
    fn from(enrollment: Enrollment) -> Self {
        EnrollmentResponse {
            id: enrollment.id.map(|id| id.to_hex()).unwrap_or_default(),
            user_id: enrollment.user_id,
            course_id: enrollment.course_id.to_hex(),
            enrolled_at: enrollment.enrolled_at,
            status: enrollment.status,
            progress: ProgressResponse {
                completed_topics: enrollment
                    .progress
                    .completed_topics
                    .into_iter()
                    .map(|t| CompletedTopicResponse {
                        chapter_order: t.chapter_order,
                        topic_index: t.topic_index,
                        completed_at: t.completed_at,
                    })
                    .collect(),
                current_chapter: enrollment.progress.current_chapter,
                current_topic: enrollment.progress.current_topic,
                last_accessed_at: enrollment.progress.last_accessed_at,
            },
            completed_at: enrollment.completed_at,
        }
    }
}

/// Enrollment joined with its course for listings
#[derive(Debug, Serialize)]
pub struct EnrollmentWithCourse {
    #[serde(flatten)]
    pub enrollment: EnrollmentResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<CourseSummary>,
}

/// Computed progress summary returned next to an enrollment
#[derive(Debug, Serialize)]
pub struct ProgressSummary {
    #[serde(rename = "completedTopics")]
    pub completed_topics: usize,
    #[serde(rename = "totalTopics")]
    pub total_topics: usize,
    #[serde(rename = "completionPercentage")]
    pub completion_percentage: u32,
    #[serde(rename = "currentChapter")]
    pub current_chapter: i32,
    #[serde(rename = "currentTopic")]
    pub current_topic: i32,
}

/// Enrollment details plus computed progress
#[derive(Debug, Serialize)]
pub struct EnrollmentDetailsResponse {
    pub enrollment: EnrollmentResponse,
    pub progress: ProgressSummary,
}

/// Request to enroll in a course
#[derive(Debug, Deserialize, Validate)]
pub struct EnrollRequest {
    #[serde(rename = "courseId")]
    #[validate(length(min = 1, message = "Course ID is required"))]
    pub course_id: String,
}

/// Request to mark a topic completed
#[derive(Debug, Deserialize)]
pub struct MarkTopicCompletedRequest {
    #[serde(rename = "chapterOrder")]
    pub chapter_order: i32,
    #[serde(rename = "topicIndex")]
    pub topic_index: i32,
}

/// Request to patch an enrollment status
#[derive(Debug, Deserialize)]
pub struct UpdateEnrollmentStatusRequest {
    pub status: String,
}

/// Query params for listing own enrollments
#[derive(Debug, Deserialize)]
pub struct ListEnrollmentsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn progress_at(ts: i64) -> (Progress, DateTime<Utc>) {
        let now = Utc.timestamp_opt(ts, 0).unwrap();
        (Progress::new(now), now)
    }

    #[test]
    fn mark_topic_completed_adds_pair_and_moves_cursor() {
        let (mut progress, now) = progress_at(1_700_000_000);

        assert!(progress.mark_topic_completed(2, 1, now));

        assert!(progress.is_topic_completed(2, 1));
        assert!(!progress.is_topic_completed(2, 0));
        assert!(!progress.is_topic_completed(1, 1));
        assert_eq!(progress.current_chapter, 2);
        assert_eq!(progress.current_topic, 1);
        assert_eq!(progress.last_accessed_at, now);
    }

    #[test]
    fn mark_topic_completed_twice_is_idempotent() {
        let (mut progress, now) = progress_at(1_700_000_000);
        let later = now + chrono::Duration::seconds(60);

        assert!(progress.mark_topic_completed(1, 0, now));
        assert!(!progress.mark_topic_completed(1, 0, later));

        assert_eq!(progress.completed_topics.len(), 1);
        // First completion timestamp is kept, the cursor still moves
        assert_eq!(progress.completed_topics[0].completed_at, now);
        assert_eq!(progress.last_accessed_at, later);
    }

    #[test]
    fn completion_percentage_table() {
        assert_eq!(completion_percentage(0, 5), 0);
        assert_eq!(completion_percentage(3, 4), 75);
        assert_eq!(completion_percentage(3, 0), 0);
        assert_eq!(completion_percentage(5, 5), 100);
        // half-up rounding: 1/8 = 12.5%
        assert_eq!(completion_percentage(1, 8), 13);
        assert_eq!(completion_percentage(1, 3), 33);
        assert_eq!(completion_percentage(2, 3), 67);
    }

    #[test]
    fn dedup_keeps_first_occurrence_and_its_timestamp() {
        let (mut progress, now) = progress_at(1_700_000_000);
        let later = now + chrono::Duration::seconds(90);

        progress.completed_topics = vec![
            CompletedTopic {
                chapter_order: 1,
                topic_index: 0,
                completed_at: now,
            },
            CompletedTopic {
                chapter_order: 2,
                topic_index: 3,
                completed_at: now,
            },
            CompletedTopic {
                chapter_order: 1,
                topic_index: 0,
                completed_at: later,
            },
        ];

        assert!(progress.dedup_completed_topics());

        assert_eq!(progress.completed_topics.len(), 2);
        assert_eq!(progress.completed_topics[0].chapter_order, 1);
        assert_eq!(progress.completed_topics[0].topic_index, 0);
        assert_eq!(progress.completed_topics[0].completed_at, now);
        assert_eq!(progress.completed_topics[1].chapter_order, 2);
    }

    #[test]
    fn dedup_is_a_noop_on_clean_lists() {
        let (mut progress, now) = progress_at(1_700_000_000);
        progress.mark_topic_completed(1, 0, now);
        progress.mark_topic_completed(1, 1, now);

        assert!(!progress.dedup_completed_topics());
        assert_eq!(progress.completed_topics.len(), 2);
    }

    #[test]
    fn enrollment_status_parses_known_values_only() {
        assert_eq!(
            "active".parse::<EnrollmentStatus>().unwrap(),
            EnrollmentStatus::Active
        );
        assert_eq!(
            "completed".parse::<EnrollmentStatus>().unwrap(),
            EnrollmentStatus::Completed
        );
        assert_eq!(
            "paused".parse::<EnrollmentStatus>().unwrap(),
            EnrollmentStatus::Paused
        );
        assert!("archived".parse::<EnrollmentStatus>().is_err());
    }
}
