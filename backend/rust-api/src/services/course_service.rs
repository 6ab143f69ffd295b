use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use mongodb::bson::{doc, oid::ObjectId, Bson, Document, Regex};
use mongodb::Database;

use crate::metrics::COURSES_CREATED_TOTAL;
use crate::models::course::{
    Course, CourseResponse, CourseStatus, CreateCourseRequest, ExploreCoursesQuery,
    GeneratedChapter, ListCoursesQuery, UpdateCourseRequest,
};
use crate::models::generation::{ChapterContent, LayoutChapter};
use crate::models::{page_params, Paginated, Pagination};
use crate::utils::time::chrono_to_bson;

const COURSES_COLLECTION: &str = "courses";

pub struct CourseService {
    mongo: Database,
}

impl CourseService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    pub async fn create_course(
        &self,
        owner_id: &str,
        req: CreateCourseRequest,
    ) -> Result<CourseResponse> {
        let collection = self.mongo.collection::<Course>(COURSES_COLLECTION);

        let now = Utc::now();
        let course = Course {
            id: None,
            name: req.name.trim().to_string(),
            description: req.description,
            chapters: req.chapters,
            include_videos: req.include_videos.unwrap_or(true),
            category: req.category,
            difficulty: req.difficulty,
            level: req.level,
            banner_image_prompt: req.banner_image_prompt,
            generated_chapters: req.generated_chapters.unwrap_or_default(),
            ai_generated_layout: match req.ai_generated_layout {
                Some(layout) => Some(layout_to_bson(&layout)?),
                None => None,
            },
            created_by: owner_id.to_string(),
            status: CourseStatus::Draft,
            created_at: now,
            updated_at: now,
        };

        let insert_result = collection
            .insert_one(&course)
            .await
            .context("Failed to insert course")?;

        let course_id = insert_result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| anyhow!("Failed to get inserted course ID"))?;

        let created = collection
            .find_one(doc! { "_id": course_id })
            .await
            .context("Failed to fetch created course")?
            .ok_or_else(|| anyhow!("Course not found after creation"))?;

        COURSES_CREATED_TOTAL
            .with_label_values(&[created.category.as_str()])
            .inc();

        Ok(CourseResponse::from(created))
    }

    /// List courses owned by the caller with optional filters
    pub async fn list_courses(
        &self,
        owner_id: &str,
        query: ListCoursesQuery,
    ) -> Result<Paginated<CourseResponse>> {
        let mut filter = doc! { "createdBy": owner_id };

        if let Some(status) = query.status {
            filter.insert("status", status);
        }
        if let Some(category) = query.category {
            filter.insert("category", category);
        }
        if let Some(difficulty) = query.difficulty {
            filter.insert("difficulty", difficulty);
        }

        let (page, limit) = page_params(query.page, query.limit, 10);
        self.run_listing(filter, page, limit).await
    }

    /// Public catalog listing across all owners. Filter values of "all"
    /// are treated as absent; search matches name or description.
    pub async fn explore_courses(
        &self,
        query: ExploreCoursesQuery,
    ) -> Result<Paginated<CourseResponse>> {
        let mut filter = doc! {};

        if let Some(status) = query.status.filter(|v| v != "all") {
            filter.insert("status", status);
        }
        if let Some(category) = query.category.filter(|v| v != "all") {
            filter.insert("category", category);
        }
        if let Some(difficulty) = query.difficulty.filter(|v| v != "all") {
            filter.insert("difficulty", difficulty);
        }
        if let Some(search) = query.search.filter(|v| !v.is_empty()) {
            // Search by name or description (case-insensitive)
            let regex = Regex {
                pattern: search,
                options: "i".to_string(),
            };
            filter.insert(
                "$or",
                vec![doc! { "name": &regex }, doc! { "description": &regex }],
            );
        }

        let (page, limit) = page_params(query.page, query.limit, 12);
        self.run_listing(filter, page, limit).await
    }

    async fn run_listing(
        &self,
        filter: Document,
        page: u32,
        limit: u32,
    ) -> Result<Paginated<CourseResponse>> {
        let collection = self.mongo.collection::<Course>(COURSES_COLLECTION);

        let total = collection
            .count_documents(filter.clone())
            .await
            .context("Failed to count courses")?;

        let mut cursor = collection
            .find(filter)
            .sort(doc! { "createdAt": -1 })
            .skip((page as u64 - 1) * limit as u64)
            .limit(limit as i64)
            .await
            .context("Failed to query courses")?;

        let mut courses = Vec::new();
        while cursor.advance().await.context("Failed to advance cursor")? {
            let course = cursor
                .deserialize_current()
                .context("Failed to deserialize course")?;
            courses.push(CourseResponse::from(course));
        }

        Ok(Paginated {
            data: courses,
            pagination: Pagination::new(page, limit, total),
        })
    }

    pub async fn get_course(&self, owner_id: &str, course_id: &str) -> Result<CourseResponse> {
        self.find_owned(owner_id, course_id)
            .await
            .map(CourseResponse::from)
    }

    /// Owner-scoped fetch. Missing and not-owned both come back as
    /// "Course not found" so non-owners learn nothing about existence.
    pub async fn find_owned(&self, owner_id: &str, course_id: &str) -> Result<Course> {
        let collection = self.mongo.collection::<Course>(COURSES_COLLECTION);

        let object_id = ObjectId::parse_str(course_id).context("Invalid course ID format")?;

        collection
            .find_one(doc! { "_id": object_id, "createdBy": owner_id })
            .await
            .context("Failed to query course")?
            .ok_or_else(|| anyhow!("Course not found"))
    }

    /// Unscoped fetch used by enrollment flows
    pub async fn find_by_id(&self, course_id: &str) -> Result<Option<Course>> {
        let collection = self.mongo.collection::<Course>(COURSES_COLLECTION);

        let object_id = ObjectId::parse_str(course_id).context("Invalid course ID format")?;

        collection
            .find_one(doc! { "_id": object_id })
            .await
            .context("Failed to query course")
    }

    pub async fn update_course(
        &self,
        owner_id: &str,
        course_id: &str,
        req: UpdateCourseRequest,
    ) -> Result<CourseResponse> {
        let collection = self.mongo.collection::<Course>(COURSES_COLLECTION);

        let object_id = ObjectId::parse_str(course_id).context("Invalid course ID format")?;

        let mut update_doc = doc! {
            "$set": {
                "updatedAt": chrono_to_bson(Utc::now()),
            }
        };

        if let Some(name) = req.name {
            update_doc
                .get_document_mut("$set")?
                .insert("name", name.trim());
        }
        if let Some(description) = req.description {
            update_doc
                .get_document_mut("$set")?
                .insert("description", description);
        }
        if let Some(chapters) = req.chapters {
            update_doc
                .get_document_mut("$set")?
                .insert("chapters", chapters as i32);
        }
        if let Some(include_videos) = req.include_videos {
            update_doc
                .get_document_mut("$set")?
                .insert("includeVideos", include_videos);
        }
        if let Some(category) = req.category {
            update_doc
                .get_document_mut("$set")?
                .insert("category", category.as_str());
        }
        if let Some(difficulty) = req.difficulty {
            update_doc
                .get_document_mut("$set")?
                .insert("difficulty", difficulty.as_str());
        }
        if let Some(level) = req.level {
            update_doc
                .get_document_mut("$set")?
                .insert("level", level.as_str());
        }
        if let Some(banner_image_prompt) = req.banner_image_prompt {
            update_doc
                .get_document_mut("$set")?
                .insert("bannerImagePrompt", banner_image_prompt);
        }
        if let Some(generated_chapters) = req.generated_chapters {
            update_doc
                .get_document_mut("$set")?
                .insert("generatedChapters", chapters_to_bson(&generated_chapters)?);
        }
        if let Some(layout) = req.ai_generated_layout {
            update_doc
                .get_document_mut("$set")?
                .insert("aiGeneratedLayout", layout_to_bson(&layout)?);
        }

        let result = collection
            .update_one(doc! { "_id": object_id, "createdBy": owner_id }, update_doc)
            .await
            .context("Failed to update course")?;

        if result.matched_count == 0 {
            return Err(anyhow!("Course not found"));
        }

        let updated = collection
            .find_one(doc! { "_id": object_id })
            .await
            .context("Failed to fetch updated course")?
            .ok_or_else(|| anyhow!("Course not found after update"))?;

        Ok(CourseResponse::from(updated))
    }

    pub async fn delete_course(&self, owner_id: &str, course_id: &str) -> Result<()> {
        let collection = self.mongo.collection::<Course>(COURSES_COLLECTION);

        let object_id = ObjectId::parse_str(course_id).context("Invalid course ID format")?;

        let result = collection
            .delete_one(doc! { "_id": object_id, "createdBy": owner_id })
            .await
            .context("Failed to delete course")?;

        if result.deleted_count == 0 {
            return Err(anyhow!("Course not found"));
        }

        Ok(())
    }

    pub async fn update_status(
        &self,
        owner_id: &str,
        course_id: &str,
        status: CourseStatus,
    ) -> Result<CourseResponse> {
        let collection = self.mongo.collection::<Course>(COURSES_COLLECTION);

        let object_id = ObjectId::parse_str(course_id).context("Invalid course ID format")?;

        let result = collection
            .update_one(
                doc! { "_id": object_id, "createdBy": owner_id },
                doc! { "$set": {
                    "status": status.as_str(),
                    "updatedAt": chrono_to_bson(Utc::now()),
                } },
            )
            .await
            .context("Failed to update course status")?;

        if result.matched_count == 0 {
            return Err(anyhow!("Course not found"));
        }

        let updated = collection
            .find_one(doc! { "_id": object_id })
            .await
            .context("Failed to fetch updated course")?
            .ok_or_else(|| anyhow!("Course not found after update"))?;

        Ok(CourseResponse::from(updated))
    }

    /// Persist generated chapters produced by the content-generation flow
    pub async fn set_generated_chapters(
        &self,
        owner_id: &str,
        course_id: &str,
        chapters: Vec<GeneratedChapter>,
    ) -> Result<CourseResponse> {
        let collection = self.mongo.collection::<Course>(COURSES_COLLECTION);

        let object_id = ObjectId::parse_str(course_id).context("Invalid course ID format")?;

        let result = collection
            .update_one(
                doc! { "_id": object_id, "createdBy": owner_id },
                doc! { "$set": {
                    "generatedChapters": chapters_to_bson(&chapters)?,
                    "updatedAt": chrono_to_bson(Utc::now()),
                } },
            )
            .await
            .context("Failed to store generated chapters")?;

        if result.matched_count == 0 {
            return Err(anyhow!("Course not found"));
        }

        let updated = collection
            .find_one(doc! { "_id": object_id })
            .await
            .context("Failed to fetch updated course")?
            .ok_or_else(|| anyhow!("Course not found after update"))?;

        Ok(CourseResponse::from(updated))
    }
}

fn layout_to_bson(layout: &serde_json::Value) -> Result<Bson> {
    mongodb::bson::to_bson(layout).context("Failed to convert AI layout to BSON")
}

fn chapters_to_bson(chapters: &[GeneratedChapter]) -> Result<Bson> {
    mongodb::bson::to_bson(chapters).context("Failed to convert generated chapters to BSON")
}

/// Build the stored chapter list from an AI outline and the per-chapter
/// content blocks. Content is matched by chapter name with a positional
/// fallback; video keywords are only produced when the course wants videos.
pub fn merge_generated_content(
    layout_chapters: &[LayoutChapter],
    contents: &[ChapterContent],
    course_name: &str,
    include_videos: bool,
) -> Vec<GeneratedChapter> {
    layout_chapters
        .iter()
        .enumerate()
        .map(|(index, chapter)| {
            let content_block = contents
                .iter()
                .find(|block| block.chapter_name == chapter.chapter_name)
                .or_else(|| contents.get(index));

            let content = content_block.map(|block| {
                block
                    .topics
                    .iter()
                    .map(|topic| format!("<h2>{}</h2>\n{}", topic.topic, topic.content))
                    .collect::<Vec<_>>()
                    .join("\n")
            });

            let description = if chapter.topics.is_empty() {
                chapter.chapter_name.clone()
            } else {
                chapter.topics.join(", ")
            };

            GeneratedChapter {
                title: chapter.chapter_name.clone(),
                description,
                objectives: chapter.topics.clone(),
                video_keywords: include_videos
                    .then(|| format!("{} {}", course_name, chapter.chapter_name)),
                order: (index + 1) as u32,
                content,
                youtube_video: None,
            }
        })
        .collect()
}
