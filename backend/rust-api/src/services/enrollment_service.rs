use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::options::IndexOptions;
use mongodb::{Database, IndexModel};

use crate::metrics::{ENROLLMENTS_TOTAL, TOPICS_COMPLETED_TOTAL};
use crate::models::course::{Course, CourseSummary};
use crate::models::enrollment::{
    Enrollment, EnrollmentDetailsResponse, EnrollmentResponse, EnrollmentStatus,
    EnrollmentWithCourse, ListEnrollmentsQuery, Progress, ProgressSummary,
};
use crate::models::{page_params, Paginated, Pagination};
use crate::utils::time::chrono_to_bson;

const ENROLLMENTS_COLLECTION: &str = "enrollments";
const COURSES_COLLECTION: &str = "courses";

pub struct EnrollmentService {
    mongo: Database,
}

impl EnrollmentService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    /// Compound unique index on (userId, courseId): one enrollment per
    /// learner per course, enforced at the storage layer.
    pub async fn ensure_indexes(&self) -> Result<()> {
        let collection = self.mongo.collection::<Enrollment>(ENROLLMENTS_COLLECTION);

        let index = IndexModel::builder()
            .keys(doc! { "userId": 1, "courseId": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        collection
            .create_index(index)
            .await
            .context("Failed to create enrollment index")?;

        Ok(())
    }

    pub async fn enroll(&self, user_id: &str, course_id: &str) -> Result<EnrollmentResponse> {
        let courses = self.mongo.collection::<Course>(COURSES_COLLECTION);
        let collection = self.mongo.collection::<Enrollment>(ENROLLMENTS_COLLECTION);

        let course_oid = ObjectId::parse_str(course_id).context("Invalid course ID format")?;

        // Check if course exists
        courses
            .find_one(doc! { "_id": course_oid })
            .await
            .context("Failed to query course")?
            .ok_or_else(|| anyhow!("Course not found"))?;

        // Check if already enrolled
        let existing = collection
            .find_one(doc! { "userId": user_id, "courseId": course_oid })
            .await
            .context("Failed to check existing enrollment")?;

        if existing.is_some() {
            return Err(anyhow!("Already enrolled in this course"));
        }

        let now = Utc::now();
        let enrollment = Enrollment {
            id: None,
            user_id: user_id.to_string(),
            course_id: course_oid,
            enrolled_at: now,
            status: EnrollmentStatus::Active,
            progress: Progress::new(now),
            completed_at: None,
            created_at: now,
            updated_at: now,
        };

        let insert_result = match collection.insert_one(&enrollment).await {
            Ok(result) => result,
            // The unique index closes the check-then-insert race
            Err(e) if is_duplicate_key_error(&e) => {
                return Err(anyhow!("Already enrolled in this course"));
            }
            Err(e) => return Err(e).context("Failed to insert enrollment"),
        };

        let enrollment_id = insert_result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| anyhow!("Failed to get inserted enrollment ID"))?;

        let created = collection
            .find_one(doc! { "_id": enrollment_id })
            .await
            .context("Failed to fetch created enrollment")?
            .ok_or_else(|| anyhow!("Enrollment not found after creation"))?;

        ENROLLMENTS_TOTAL.with_label_values(&["enrolled"]).inc();

        Ok(EnrollmentResponse::from(created))
    }

    /// List the caller's enrollments, most recently accessed first,
    /// joined with a short course projection.
    pub async fn list_enrollments(
        &self,
        user_id: &str,
        query: ListEnrollmentsQuery,
    ) -> Result<Paginated<EnrollmentWithCourse>> {
        let collection = self.mongo.collection::<Enrollment>(ENROLLMENTS_COLLECTION);

        let mut filter = doc! { "userId": user_id };
        if let Some(status) = query.status.filter(|v| v != "all") {
            filter.insert("status", status);
        }

        let (page, limit) = page_params(query.page, query.limit, 10);

        let total = collection
            .count_documents(filter.clone())
            .await
            .context("Failed to count enrollments")?;

        let mut cursor = collection
            .find(filter)
            .sort(doc! { "progress.lastAccessedAt": -1 })
            .skip((page as u64 - 1) * limit as u64)
            .limit(limit as i64)
            .await
            .context("Failed to query enrollments")?;

        let mut enrollments = Vec::new();
        while cursor.advance().await.context("Failed to advance cursor")? {
            enrollments.push(
                cursor
                    .deserialize_current()
                    .context("Failed to deserialize enrollment")?,
            );
        }

        let mut courses_by_id = self.fetch_courses_for(&enrollments).await?;

        let data = enrollments
            .into_iter()
            .map(|enrollment: Enrollment| {
                let course = courses_by_id
                    .remove(&enrollment.course_id)
                    .map(CourseSummary::from);
                EnrollmentWithCourse {
                    enrollment: EnrollmentResponse::from(enrollment),
                    course,
                }
            })
            .collect();

        Ok(Paginated {
            data,
            pagination: Pagination::new(page, limit, total),
        })
    }

    async fn fetch_courses_for(
        &self,
        enrollments: &[Enrollment],
    ) -> Result<HashMap<ObjectId, Course>> {
        let mut courses_by_id = HashMap::new();
        if enrollments.is_empty() {
            return Ok(courses_by_id);
        }

        let courses = self.mongo.collection::<Course>(COURSES_COLLECTION);
        let course_ids: Vec<ObjectId> = enrollments.iter().map(|e| e.course_id).collect();

        let mut cursor = courses
            .find(doc! { "_id": { "$in": course_ids } })
            .await
            .context("Failed to query enrolled courses")?;

        while cursor.advance().await.context("Failed to advance cursor")? {
            let course: Course = cursor
                .deserialize_current()
                .context("Failed to deserialize course")?;
            if let Some(id) = course.id {
                courses_by_id.insert(id, course);
            }
        }

        Ok(courses_by_id)
    }

    pub async fn enrollment_details(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<EnrollmentDetailsResponse> {
        let collection = self.mongo.collection::<Enrollment>(ENROLLMENTS_COLLECTION);
        let courses = self.mongo.collection::<Course>(COURSES_COLLECTION);

        let course_oid = ObjectId::parse_str(course_id).context("Invalid course ID format")?;

        let enrollment = collection
            .find_one(doc! { "userId": user_id, "courseId": course_oid })
            .await
            .context("Failed to query enrollment")?
            .ok_or_else(|| anyhow!("Enrollment not found"))?;

        let course = courses
            .find_one(doc! { "_id": course_oid })
            .await
            .context("Failed to query course")?
            .ok_or_else(|| anyhow!("Course not found"))?;

        Ok(build_details(enrollment, &course))
    }

    /// Record a completion event. The append is an atomic conditional
    /// update keyed on the (chapterOrder, topicIndex) pair, so concurrent
    /// calls cannot produce duplicates; the cursor fields always move.
    pub async fn mark_topic_completed(
        &self,
        user_id: &str,
        course_id: &str,
        chapter_order: i32,
        topic_index: i32,
    ) -> Result<EnrollmentDetailsResponse> {
        let collection = self.mongo.collection::<Enrollment>(ENROLLMENTS_COLLECTION);
        let courses = self.mongo.collection::<Course>(COURSES_COLLECTION);

        let course_oid = ObjectId::parse_str(course_id).context("Invalid course ID format")?;
        let now_bson = chrono_to_bson(Utc::now());

        let guard = doc! {
            "userId": user_id,
            "courseId": course_oid,
            "progress.completedTopics": { "$not": { "$elemMatch": {
                "chapterOrder": chapter_order,
                "topicIndex": topic_index,
            } } },
        };

        let appended = collection
            .update_one(
                guard,
                doc! { "$push": { "progress.completedTopics": {
                    "chapterOrder": chapter_order,
                    "topicIndex": topic_index,
                    "completedAt": now_bson,
                } } },
            )
            .await
            .context("Failed to record completed topic")?;

        let result = collection
            .update_one(
                doc! { "userId": user_id, "courseId": course_oid },
                doc! { "$set": {
                    "progress.currentChapter": chapter_order,
                    "progress.currentTopic": topic_index,
                    "progress.lastAccessedAt": now_bson,
                    "updatedAt": now_bson,
                } },
            )
            .await
            .context("Failed to update progress cursor")?;

        if result.matched_count == 0 {
            return Err(anyhow!("Enrollment not found"));
        }

        if appended.modified_count > 0 {
            TOPICS_COMPLETED_TOTAL.inc();
        }

        let enrollment = collection
            .find_one(doc! { "userId": user_id, "courseId": course_oid })
            .await
            .context("Failed to fetch updated enrollment")?
            .ok_or_else(|| anyhow!("Enrollment not found after update"))?;

        let course = courses
            .find_one(doc! { "_id": course_oid })
            .await
            .context("Failed to query course")?
            .ok_or_else(|| anyhow!("Course not found"))?;

        Ok(build_details(enrollment, &course))
    }

    pub async fn update_status(
        &self,
        user_id: &str,
        course_id: &str,
        status: EnrollmentStatus,
    ) -> Result<EnrollmentResponse> {
        let collection = self.mongo.collection::<Enrollment>(ENROLLMENTS_COLLECTION);

        let course_oid = ObjectId::parse_str(course_id).context("Invalid course ID format")?;
        let now_bson = chrono_to_bson(Utc::now());

        let mut set_doc = doc! {
            "status": status.as_str(),
            "updatedAt": now_bson,
        };
        // completedAt marks the first completion and survives later
        // transitions away from "completed"
        if status == EnrollmentStatus::Completed {
            set_doc.insert("completedAt", now_bson);
        }

        let result = collection
            .update_one(
                doc! { "userId": user_id, "courseId": course_oid },
                doc! { "$set": set_doc },
            )
            .await
            .context("Failed to update enrollment status")?;

        if result.matched_count == 0 {
            return Err(anyhow!("Enrollment not found"));
        }

        if status == EnrollmentStatus::Completed {
            ENROLLMENTS_TOTAL.with_label_values(&["completed"]).inc();
        }

        let updated = collection
            .find_one(doc! { "userId": user_id, "courseId": course_oid })
            .await
            .context("Failed to fetch updated enrollment")?
            .ok_or_else(|| anyhow!("Enrollment not found after update"))?;

        Ok(EnrollmentResponse::from(updated))
    }

    pub async fn unenroll(&self, user_id: &str, course_id: &str) -> Result<()> {
        let collection = self.mongo.collection::<Enrollment>(ENROLLMENTS_COLLECTION);

        let course_oid = ObjectId::parse_str(course_id).context("Invalid course ID format")?;

        let result = collection
            .delete_one(doc! { "userId": user_id, "courseId": course_oid })
            .await
            .context("Failed to delete enrollment")?;

        if result.deleted_count == 0 {
            return Err(anyhow!("Enrollment not found"));
        }

        ENROLLMENTS_TOTAL.with_label_values(&["unenrolled"]).inc();

        Ok(())
    }

    /// Corrective maintenance for records written before the atomic append
    /// existed: collapse duplicate pairs, keeping first occurrences.
    pub async fn cleanup_completed_topics(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<EnrollmentResponse> {
        let collection = self.mongo.collection::<Enrollment>(ENROLLMENTS_COLLECTION);

        let course_oid = ObjectId::parse_str(course_id).context("Invalid course ID format")?;

        let mut enrollment = collection
            .find_one(doc! { "userId": user_id, "courseId": course_oid })
            .await
            .context("Failed to query enrollment")?
            .ok_or_else(|| anyhow!("Enrollment not found"))?;

        if enrollment.progress.dedup_completed_topics() {
            let topics = mongodb::bson::to_bson(&enrollment.progress.completed_topics)
                .context("Failed to convert completed topics to BSON")?;

            collection
                .update_one(
                    doc! { "userId": user_id, "courseId": course_oid },
                    doc! { "$set": {
                        "progress.completedTopics": topics,
                        "updatedAt": chrono_to_bson(Utc::now()),
                    } },
                )
                .await
                .context("Failed to persist deduplicated topics")?;
        }

        Ok(EnrollmentResponse::from(enrollment))
    }
}

fn build_details(enrollment: Enrollment, course: &Course) -> EnrollmentDetailsResponse {
    let total_topics = course.total_topics();
    let progress = ProgressSummary {
        completed_topics: enrollment.progress.completed_topics.len(),
        total_topics,
        completion_percentage: enrollment.progress.completion_percentage(total_topics),
        current_chapter: enrollment.progress.current_chapter,
        current_topic: enrollment.progress.current_topic,
    };

    EnrollmentDetailsResponse {
        enrollment: EnrollmentResponse::from(enrollment),
        progress,
    }
}

fn is_duplicate_key_error(error: &mongodb::error::Error) -> bool {
    if let mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(ref we)) =
        *error.kind
    {
        return we.code == 11000;
    }
    false
}
