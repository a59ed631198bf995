use std::path::Path;

use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use snafu::ResultExt;
use tracing::instrument;
use url::Url;

use super::*;

/// [CourseBackend] over HTTP, authenticated with an optional bearer token.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("base", &self.base.as_str())
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

impl HttpBackend {
    pub fn new(base: Url, token: Option<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("club/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::with_client(client, base, token))
    }

    pub fn with_client(client: reqwest::Client, mut base: Url, token: Option<String>) -> Self {
        // relative joins replace the last segment unless the base is a directory
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Self {
            client,
            base,
            token,
        }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .context(EndpointSnafu { path })
    }

    async fn send(&self, path: &str, request: RequestBuilder) -> Result<Response> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await.context(RequestSnafu { endpoint: path })?;

        match response.status() {
            StatusCode::UNAUTHORIZED => UnauthorizedSnafu { endpoint: path }.fail(),
            StatusCode::FORBIDDEN => ForbiddenSnafu { endpoint: path }.fail(),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                StatusSnafu {
                    endpoint: path,
                    status,
                    body,
                }
                .fail()
            }
            _ => Ok(response),
        }
    }

    async fn decode<T: DeserializeOwned>(path: &str, response: Response) -> Result<T> {
        response.json().await.context(DecodeSnafu { endpoint: path })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path)?;
        let response = self.send(path, self.client.get(url)).await?;
        Self::decode(path, response).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: serde_json::Value) -> Result<T> {
        let url = self.endpoint(path)?;
        let response = self.send(path, self.client.post(url).json(&body)).await?;
        Self::decode(path, response).await
    }

    async fn patch(&self, path: &str, body: serde_json::Value) -> Result<()> {
        let url = self.endpoint(path)?;
        self.send(path, self.client.patch(url).json(&body)).await?;
        Ok(())
    }
}

impl CourseBackend for HttpBackend {
    #[instrument(skip(self))]
    async fn me(&self) -> Result<Member> {
        self.get("members/me").await
    }

    #[instrument(skip(self))]
    async fn course(&self, id: CourseId) -> Result<Course> {
        self.get(&format!("courses/{id}")).await
    }

    #[instrument(skip(self))]
    async fn course_content(&self, id: CourseId) -> Result<Vec<ContentItem>> {
        self.get(&format!("courses/{id}/content")).await
    }

    #[instrument(skip(self))]
    async fn update_order(&self, id: ContentId, sort_order: i64) -> Result<()> {
        self.patch(
            &format!("courses/content/{id}/order"),
            json!({ "sortOrder": sort_order }),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn update_status(&self, id: ContentId, status: ContentStatus) -> Result<()> {
        self.patch(
            &format!("courses/content/{id}/status"),
            json!({ "status": status }),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn delete_content(&self, id: ContentId) -> Result<()> {
        let path = format!("courses/content/{id}");
        let url = self.endpoint(&path)?;
        self.send(&path, self.client.delete(url)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn save_progress(&self, id: ContentId, sample: ProgressSample) -> Result<ContentProgress> {
        let body = json!({
            "progressSeconds": sample.progress_seconds,
            "totalSeconds": sample.total_seconds,
        });
        self.post(&format!("courses/content/{id}/progress"), body).await
    }

    #[instrument(skip(self))]
    async fn content_progress(&self, id: ContentId) -> Result<ContentProgress> {
        self.get(&format!("courses/content/{id}/progress")).await
    }

    #[instrument(skip(self))]
    async fn mark_completed(&self, id: ContentId, completed: bool) -> Result<ContentProgress> {
        self.post(
            &format!("courses/content/{id}/completed"),
            json!({ "isCompleted": completed }),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn course_progress(&self, id: CourseId) -> Result<CourseProgress> {
        self.get(&format!("courses/course/{id}/progress")).await
    }

    #[instrument(skip(self))]
    async fn upload_file(&self, path: &Path) -> Result<Uploaded> {
        let bytes = tokio::fs::read(path).await.context(ReadFileSnafu {
            path: path.display().to_string(),
        })?;

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name));

        let endpoint = "file/upload";
        let url = self.endpoint(endpoint)?;
        let response = self.send(endpoint, self.client.post(url).multipart(form)).await?;
        Self::decode(endpoint, response).await
    }

    #[instrument(skip(self))]
    async fn members(&self) -> Result<Vec<Member>> {
        self.get("members").await
    }

    #[instrument(skip(self))]
    async fn update_member(&self, id: MemberId, update: MemberUpdate) -> Result<Member> {
        let path = format!("members/{id}");
        let url = self.endpoint(&path)?;
        let response = self.send(&path, self.client.patch(url).json(&update)).await?;
        Self::decode(&path, response).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::body::Bytes;
    use axum::extract::{Path as UrlPath, State};
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::routing::{get, patch, post};
    use axum::{Json, Router};
    use serde_json::Value;

    use super::*;
    use crate::model::{Role, SubscriptionStatus};

    type Log = Arc<Mutex<Vec<String>>>;

    fn routes(log: Log) -> Router {
        let api = Router::new()
            .route("/members/me", get(me))
            .route("/members", get(|| async { Json(json!([])) }))
            .route("/members/:id", patch(update_member))
            .route("/courses/:id", get(course))
            .route("/courses/:id/content", get(content))
            .route("/courses/content/:id/order", patch(order))
            .route("/courses/content/:id/progress", post(save_progress))
            .route("/courses/course/:id/progress", get(|| async { AxumStatus::FORBIDDEN }))
            .route("/file/upload", post(upload))
            .with_state(log);

        Router::new().nest("/api", api)
    }

    async fn me(headers: HeaderMap) -> Result<Json<Value>, AxumStatus> {
        match headers.get("authorization").and_then(|v| v.to_str().ok()) {
            Some("Bearer secret") => Ok(Json(json!({
                "id": 5,
                "name": "Ana",
                "role": "admin",
                "subscription": { "status": "active", "startedAt": "2024-01-01T00:00:00Z" }
            }))),
            _ => Err(AxumStatus::UNAUTHORIZED),
        }
    }

    async fn update_member(UrlPath(id): UrlPath<u64>, Json(body): Json<Value>) -> Json<Value> {
        Json(json!({ "id": id, "name": "Ana", "role": body["role"] }))
    }

    async fn course(UrlPath(id): UrlPath<u64>) -> Result<Json<Value>, (AxumStatus, &'static str)> {
        if id == 404 {
            return Err((AxumStatus::NOT_FOUND, "no such course"));
        }
        Ok(Json(json!({ "id": id, "title": "Yoga" })))
    }

    async fn content(UrlPath(id): UrlPath<u64>) -> Json<Value> {
        Json(json!([
            { "id": 1, "courseId": id, "title": "Intro", "sortOrder": 0 },
            { "id": 2, "courseId": id, "title": "Week 1", "unlockType": "week", "unlockValue": 1, "sortOrder": 1 }
        ]))
    }

    async fn order(
        State(log): State<Log>, UrlPath(id): UrlPath<u64>, Json(body): Json<Value>,
    ) -> AxumStatus {
        log.lock().unwrap().push(format!("order {id} {}", body["sortOrder"]));
        AxumStatus::NO_CONTENT
    }

    async fn save_progress(UrlPath(id): UrlPath<u64>, Json(body): Json<Value>) -> Json<Value> {
        let progress = body["progressSeconds"].as_u64().unwrap_or_default();
        let total = body["totalSeconds"].as_u64().unwrap_or_default();
        Json(json!({
            "contentId": id,
            "progressSeconds": progress,
            "totalSeconds": total,
            "isCompleted": total > 0 && progress * 10 >= total * 9,
        }))
    }

    async fn upload(State(log): State<Log>, body: Bytes) -> Json<Value> {
        let body = String::from_utf8_lossy(&body).into_owned();
        log.lock().unwrap().push(body);
        Json(json!({ "url": "https://cdn.example.com/cover.png" }))
    }

    async fn serve(log: Log) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, routes(log)).await.unwrap() });

        format!("http://{address}/api").parse().unwrap()
    }

    async fn backend(token: Option<&str>) -> (HttpBackend, Log) {
        let log = Log::default();
        let base = serve(log.clone()).await;
        let backend = HttpBackend::new(base, token.map(str::to_string)).unwrap();
        (backend, log)
    }

    #[tokio::test]
    async fn base_url_without_trailing_slash_keeps_its_path() {
        let (backend, _) = backend(None).await;
        assert!(backend.base().path().ends_with("/api/"));
        assert_eq!(
            backend.endpoint("/courses/3").unwrap().path(),
            "/api/courses/3"
        );
    }

    #[tokio::test]
    async fn bearer_token_is_sent() {
        let (backend, _) = backend(Some("secret")).await;
        let member = backend.me().await.unwrap();
        assert_eq!(member.role, Role::Admin);
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        let (backend, _) = backend(None).await;
        let error = backend.me().await.unwrap_err();
        assert!(error.is_unauthorized(), "{error}");
    }

    #[tokio::test]
    async fn forbidden_means_no_subscription() {
        let (backend, _) = backend(Some("secret")).await;
        let error = backend.course_progress(CourseId(1)).await.unwrap_err();
        assert!(error.is_forbidden(), "{error}");
    }

    #[tokio::test]
    async fn other_failures_keep_status_and_body() {
        let (backend, _) = backend(None).await;
        let error = backend.course(CourseId(404)).await.unwrap_err();
        match error {
            ApiError::Status { status, body, .. } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(body, "no such course");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn course_content_is_decoded() {
        let (backend, _) = backend(None).await;
        let items = backend.course_content(CourseId(9)).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].course_id, CourseId(9));
        assert_eq!(items[1].unlock_value, 1);
    }

    #[tokio::test]
    async fn order_is_patched_as_camel_case() {
        let (backend, log) = backend(None).await;
        backend.update_order(ContentId(4), 2).await.unwrap();
        assert_eq!(log.lock().unwrap().as_slice(), ["order 4 2"]);
    }

    #[tokio::test]
    async fn saved_progress_reports_completion() {
        let (backend, _) = backend(None).await;
        let progress = backend
            .save_progress(ContentId(3), ProgressSample::new(95, 100))
            .await
            .unwrap();
        assert_eq!(progress.content_id, ContentId(3));
        assert!(progress.is_completed);
    }

    #[tokio::test]
    async fn member_update_round_trips() {
        let (backend, _) = backend(None).await;
        let update = MemberUpdate {
            role: Some(Role::Support),
            status: Some(SubscriptionStatus::Paused),
        };
        let member = backend.update_member(MemberId(5), update).await.unwrap();
        assert_eq!(member.role, Role::Support);
        assert!(backend.members().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upload_sends_the_file_as_multipart() {
        let (backend, log) = backend(None).await;

        let path = std::env::temp_dir().join(format!("club-upload-{}.txt", std::process::id()));
        tokio::fs::write(&path, b"cover image bytes").await.unwrap();

        let uploaded = backend.upload_file(&path).await.unwrap();
        tokio::fs::remove_file(&path).await.ok();

        assert_eq!(uploaded.url, "https://cdn.example.com/cover.png");
        let body = log.lock().unwrap().join("");
        assert!(body.contains("name=\"file\""));
        assert!(body.contains("cover image bytes"));
    }

    #[tokio::test]
    async fn missing_upload_file_is_reported() {
        let (backend, _) = backend(None).await;
        let error = backend
            .upload_file(Path::new("/definitely/not/here.png"))
            .await
            .unwrap_err();
        assert!(matches!(error, ApiError::ReadFile { .. }));
    }
}
