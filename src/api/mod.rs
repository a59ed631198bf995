//! Access to the course platform's REST backend.
//!
//! Services are generic over [CourseBackend] so they can run against [HttpBackend] in
//! production and an in-memory double in tests.

use std::future::Future;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::{
    ContentId, ContentItem, ContentProgress, ContentStatus, Course, CourseId, CourseProgress,
    Member, MemberId, MemberUpdate, ProgressSample,
};

pub use client::*;
pub use error::*;

mod client;
mod error;

/// Response of `POST /file/upload`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Uploaded {
    pub url: String,
}

pub trait CourseBackend: Send + Sync {
    /// The member the session token belongs to.
    fn me(&self) -> impl Future<Output = Result<Member>> + Send;

    fn course(&self, id: CourseId) -> impl Future<Output = Result<Course>> + Send;

    fn course_content(&self, id: CourseId) -> impl Future<Output = Result<Vec<ContentItem>>> + Send;

    fn update_order(
        &self, id: ContentId, sort_order: i64,
    ) -> impl Future<Output = Result<()>> + Send;

    fn update_status(
        &self, id: ContentId, status: ContentStatus,
    ) -> impl Future<Output = Result<()>> + Send;

    fn delete_content(&self, id: ContentId) -> impl Future<Output = Result<()>> + Send;

    fn save_progress(
        &self, id: ContentId, sample: ProgressSample,
    ) -> impl Future<Output = Result<ContentProgress>> + Send;

    fn content_progress(&self, id: ContentId) -> impl Future<Output = Result<ContentProgress>> + Send;

    fn mark_completed(
        &self, id: ContentId, completed: bool,
    ) -> impl Future<Output = Result<ContentProgress>> + Send;

    fn course_progress(&self, id: CourseId) -> impl Future<Output = Result<CourseProgress>> + Send;

    fn upload_file(&self, path: &Path) -> impl Future<Output = Result<Uploaded>> + Send;

    fn members(&self) -> impl Future<Output = Result<Vec<Member>>> + Send;

    fn update_member(
        &self, id: MemberId, update: MemberUpdate,
    ) -> impl Future<Output = Result<Member>> + Send;
}
