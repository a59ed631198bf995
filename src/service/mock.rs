//! In-memory [CourseBackend] that records every call with the (tokio) instant it was made.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use reqwest::StatusCode;
use tokio::time::Instant;

use crate::api::{CourseBackend, Result, StatusSnafu, Uploaded};
use crate::model::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Me,
    Course(CourseId),
    CourseContent(CourseId),
    UpdateOrder(ContentId, i64),
    UpdateStatus(ContentId, ContentStatus),
    DeleteContent(ContentId),
    SaveProgress(ContentId, ProgressSample),
    ContentProgress(ContentId),
    MarkCompleted(ContentId, bool),
    CourseProgress(CourseId),
    UploadFile(String),
    Members,
    UpdateMember(MemberId),
}

#[derive(Debug, Default)]
struct Inner {
    calls: Mutex<Vec<(Instant, Call)>>,
    contents: Mutex<Vec<ContentItem>>,
    completed: Mutex<HashSet<ContentId>>,
    saved: Mutex<HashMap<ContentId, ProgressSample>>,
    failing_orders: Mutex<HashSet<ContentId>>,
    fail_progress: AtomicBool,
}

#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    inner: Arc<Inner>,
}

impl MockBackend {
    pub fn with_contents(contents: Vec<ContentItem>) -> Self {
        let backend = Self::default();
        *backend.inner.contents.lock().unwrap() = contents;
        backend
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.calls.lock().unwrap().iter().map(|(_, call)| call.clone()).collect()
    }

    pub fn timed_calls(&self) -> Vec<(Instant, Call)> {
        self.inner.calls.lock().unwrap().clone()
    }

    pub fn contents(&self) -> Vec<ContentItem> {
        self.inner.contents.lock().unwrap().clone()
    }

    pub fn complete(&self, id: ContentId) {
        self.inner.completed.lock().unwrap().insert(id);
    }

    pub fn fail_order_for(&self, id: ContentId) {
        self.inner.failing_orders.lock().unwrap().insert(id);
    }

    pub fn fail_progress(&self, fail: bool) {
        self.inner.fail_progress.store(fail, Ordering::SeqCst);
    }

    fn record(&self, call: Call) {
        self.inner.calls.lock().unwrap().push((Instant::now(), call));
    }

    fn progress_of(&self, id: ContentId, sample: ProgressSample) -> ContentProgress {
        let is_completed = self.inner.completed.lock().unwrap().contains(&id);
        ContentProgress::new(id, sample.progress_seconds, sample.total_seconds, is_completed)
    }
}

fn server_error<T>(endpoint: &str) -> Result<T> {
    StatusSnafu {
        endpoint,
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: "boom",
    }
    .fail()
}

impl CourseBackend for MockBackend {
    async fn me(&self) -> Result<Member> {
        self.record(Call::Me);
        Ok(Member::new(MemberId(1), "Admin".into(), String::new(), Role::Admin, None))
    }

    async fn course(&self, id: CourseId) -> Result<Course> {
        self.record(Call::Course(id));
        Ok(Course::new(id, format!("Course {id}")))
    }

    async fn course_content(&self, id: CourseId) -> Result<Vec<ContentItem>> {
        self.record(Call::CourseContent(id));
        let mut contents: Vec<ContentItem> = self
            .contents()
            .into_iter()
            .filter(|content| content.course_id == id)
            .collect();
        contents.sort_by_key(|content| content.sort_order);
        Ok(contents)
    }

    async fn update_order(&self, id: ContentId, sort_order: i64) -> Result<()> {
        self.record(Call::UpdateOrder(id, sort_order));
        if self.inner.failing_orders.lock().unwrap().contains(&id) {
            return server_error("courses/content/order");
        }

        let mut contents = self.inner.contents.lock().unwrap();
        if let Some(content) = contents.iter_mut().find(|content| content.id == id) {
            content.sort_order = sort_order;
        }
        Ok(())
    }

    async fn update_status(&self, id: ContentId, status: ContentStatus) -> Result<()> {
        self.record(Call::UpdateStatus(id, status));
        let mut contents = self.inner.contents.lock().unwrap();
        if let Some(content) = contents.iter_mut().find(|content| content.id == id) {
            content.status = status;
        }
        Ok(())
    }

    async fn delete_content(&self, id: ContentId) -> Result<()> {
        self.record(Call::DeleteContent(id));
        self.inner.contents.lock().unwrap().retain(|content| content.id != id);
        Ok(())
    }

    async fn save_progress(&self, id: ContentId, sample: ProgressSample) -> Result<ContentProgress> {
        self.record(Call::SaveProgress(id, sample));
        if self.inner.fail_progress.load(Ordering::SeqCst) {
            return server_error("courses/content/progress");
        }
        self.inner.saved.lock().unwrap().insert(id, sample);
        Ok(self.progress_of(id, sample))
    }

    async fn content_progress(&self, id: ContentId) -> Result<ContentProgress> {
        self.record(Call::ContentProgress(id));
        let sample = self.inner.saved.lock().unwrap().get(&id).copied();
        Ok(self.progress_of(id, sample.unwrap_or(ProgressSample::new(0, 0))))
    }

    async fn mark_completed(&self, id: ContentId, completed: bool) -> Result<ContentProgress> {
        self.record(Call::MarkCompleted(id, completed));
        if self.inner.fail_progress.load(Ordering::SeqCst) {
            return server_error("courses/content/completed");
        }

        let mut done = self.inner.completed.lock().unwrap();
        if completed {
            done.insert(id);
        } else {
            done.remove(&id);
        }
        Ok(ContentProgress::new(id, 0, 0, completed))
    }

    async fn course_progress(&self, id: CourseId) -> Result<CourseProgress> {
        self.record(Call::CourseProgress(id));
        let done = self.inner.completed.lock().unwrap().clone();
        let items = self
            .contents()
            .into_iter()
            .filter(|content| content.course_id == id)
            .map(|content| {
                let completed = done.contains(&content.id);
                ContentProgress::new(content.id, 0, content.duration_seconds, completed)
            })
            .collect();
        Ok(CourseProgress::new(id, items))
    }

    async fn upload_file(&self, path: &Path) -> Result<Uploaded> {
        self.record(Call::UploadFile(path.display().to_string()));
        Ok(Uploaded {
            url: format!("https://cdn.example.com/{}", path.display()),
        })
    }

    async fn members(&self) -> Result<Vec<Member>> {
        self.record(Call::Members);
        Ok(Vec::new())
    }

    async fn update_member(&self, id: MemberId, update: MemberUpdate) -> Result<Member> {
        self.record(Call::UpdateMember(id));
        let role = update.role.unwrap_or_default();
        Ok(Member::new(id, "Member".into(), String::new(), role, None))
    }
}
