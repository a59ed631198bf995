use std::fmt::Write as _;
use std::path::PathBuf;

use rustyline::{history::MemHistory, Editor};
use snafu::{ResultExt, Snafu};

use crate::{
    api::{ApiError, CourseBackend},
    config::Config,
    model::{now, ContentId, ContentProgress, ContentStatus, Course, CourseId, Member},
    service::{
        progress::{ProgressError, ProgressTracker},
        reorder::{ReorderCoordinator, ReorderError},
        unlock,
    },
};

mod parse;

pub struct Repl {
    inner: Editor<(), MemHistory>,
    message: Option<String>,
}

impl Repl {
    pub fn new() -> Result<Self, ReplError> {
        let config = rustyline::Config::default();
        let inner =
            rustyline::Editor::with_history(config, MemHistory::new()).context(RustylineSnafu)?;

        let repl = Self {
            inner,
            message: None,
        };
        Ok(repl)
    }

    pub async fn prompt(&mut self) -> Action {
        let message = self
            .message
            .as_ref()
            .map(|msg| format!("{msg}\n"))
            .unwrap_or_default();
        let prompt = format!("{}club> ", message);

        let Ok(input) = self.inner.readline(&prompt) else {
            return Action::Exit;
        };

        self.message = None;

        self.inner.add_history_entry(input.clone()).ok();

        match parse::parse(&input) {
            Ok(action) => action,
            Err(err) => {
                self.reply(err.to_string());
                Action::None
            }
        }
    }

    pub fn reply(&mut self, message: String) {
        if let Some(msg) = self.message.as_mut() {
            msg.push('\n');
            msg.push_str(&message);
        } else {
            self.message = Some(message);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Action {
    Course {
        course: CourseId,
    },
    List,
    Tick {
        content: ContentId,
        current_time: f64,
        duration: f64,
    },
    End {
        content: ContentId,
    },
    Toggle {
        content: ContentId,
    },
    Progress {
        content: ContentId,
    },
    Move {
        from: usize,
        to: usize,
    },
    Status {
        content: ContentId,
        status: ContentStatus,
    },
    Delete {
        content: ContentId,
    },
    Members,
    Upload {
        path: PathBuf,
    },
    Exit,
    None,
}

#[derive(Debug, Snafu)]
pub enum ReplError {
    #[snafu(display("failed to initialize REPL: {}", source))]
    Rustyline {
        source: rustyline::error::ReadlineError,
    },
}

/// Failures of a single command. They are reported and the REPL keeps going.
#[derive(Debug, Snafu)]
pub enum ActionError {
    #[snafu(transparent)]
    Api { source: ApiError },

    #[snafu(transparent)]
    Progress { source: ProgressError },

    #[snafu(transparent)]
    Reorder { source: ReorderError },

    #[snafu(display("open a course first with `course <id>`"))]
    NoCourse,

    #[snafu(display("only admins and support staff can edit course content"))]
    StaffOnly,
}

impl ActionError {
    fn api(&self) -> Option<&ApiError> {
        match self {
            ActionError::Api { source } => Some(source),
            ActionError::Progress {
                source: ProgressError::Backend { source },
            } => Some(source),
            ActionError::Reorder {
                source: ReorderError::Backend { source },
            } => Some(source),
            _ => None,
        }
    }

    /// What the member is told, following the 401 / 403 / anything else split.
    pub fn describe(&self) -> String {
        match self.api() {
            Some(error) if error.is_unauthorized() => {
                "your session has expired, log in again and restart".to_string()
            }
            Some(error) if error.is_forbidden() => {
                "No tienes una suscripción activa".to_string()
            }
            Some(error) => format!("something went wrong, reload and try again ({error})"),
            None => self.to_string(),
        }
    }
}

struct OpenCourse<B> {
    course: Course,
    coordinator: ReorderCoordinator<B>,
}

pub async fn start<B>(repl: &mut Repl, config: &Config, backend: B, member: Member)
where
    B: CourseBackend + Clone + 'static,
{
    tracing::info!("starting REPL");

    let tracker = ProgressTracker::new(backend.clone(), config.progress_debounce);
    let mut open: Option<OpenCourse<B>> = None;

    repl.reply(format!("signed in as {}", member.name));

    loop {
        let result = match repl.prompt().await {
            Action::Exit => break,
            Action::None => continue,
            Action::Course { course } => {
                match open_course(course, &backend, &tracker, config).await {
                    Ok(next) => {
                        if let Some(previous) = open.replace(next) {
                            previous.coordinator.shutdown().await;
                        }
                        Ok(render(open.as_ref(), &tracker, &member))
                    }
                    Err(err) => Err(err),
                }
            }
            Action::List => Ok(render(open.as_ref(), &tracker, &member)),
            Action::Tick {
                content,
                current_time,
                duration,
            } => {
                tracker.time_update(content, current_time, duration);
                Ok(format!("content {content} at {current_time}s of {duration}s"))
            }
            Action::End { content } => {
                tracker.ended(content);
                Ok(format!("content {content} ended"))
            }
            Action::Toggle { content } => tracker
                .toggle(content)
                .await
                .map(|done| match done {
                    true => format!("content {content} marked as watched"),
                    false => format!("content {content} marked as not watched"),
                })
                .map_err(ActionError::from),
            Action::Progress { content } => tracker
                .progress(content)
                .await
                .map(|progress| describe_progress(&progress))
                .map_err(ActionError::from),
            Action::Move { from, to } => staff_course(&member, open.as_ref())
                .and_then(|open| Ok(open.coordinator.move_item(from, to)?))
                .map(|()| render(open.as_ref(), &tracker, &member)),
            Action::Status { content, status } => match staff_course(&member, open.as_ref()) {
                Ok(open) => open
                    .coordinator
                    .set_status(content, status)
                    .await
                    .map(|()| format!("content {content} is now {status}"))
                    .map_err(ActionError::from),
                Err(err) => Err(err),
            },
            Action::Delete { content } => match staff_course(&member, open.as_ref()) {
                Ok(open) => open
                    .coordinator
                    .delete(content)
                    .await
                    .map(|()| format!("deleted content {content}"))
                    .map_err(ActionError::from),
                Err(err) => Err(err),
            },
            Action::Members => list_members(&backend, &member).await,
            Action::Upload { path } => backend
                .upload_file(&path)
                .await
                .map(|uploaded| format!("uploaded to {}", uploaded.url))
                .map_err(ActionError::from),
        };

        match result {
            Ok(message) => repl.reply(message),
            Err(err) => capture_error(repl, err),
        }
    }

    tracker.shutdown().await;
    if let Some(open) = open {
        open.coordinator.shutdown().await;
    }
}

async fn open_course<B>(
    course: CourseId, backend: &B, tracker: &ProgressTracker<B>, config: &Config,
) -> Result<OpenCourse<B>, ActionError>
where
    B: CourseBackend + Clone + 'static,
{
    let info = backend.course(course).await?;
    let coordinator =
        ReorderCoordinator::load(course, backend.clone(), config.reorder_debounce).await?;

    // members without a subscription still see the outline, just without progress
    match tracker.load_course(course).await {
        Ok(_) => {}
        Err(ProgressError::Backend { source }) if source.is_forbidden() => {
            tracing::debug!(course.id = %course, "no progress for members without subscription");
        }
        Err(err) => return Err(err.into()),
    }

    Ok(OpenCourse {
        course: info,
        coordinator,
    })
}

fn staff_course<'a, B>(
    member: &Member, open: Option<&'a OpenCourse<B>>,
) -> Result<&'a OpenCourse<B>, ActionError> {
    if !member.is_staff() {
        return StaffOnlySnafu.fail();
    }
    open.ok_or(ActionError::NoCourse)
}

async fn list_members<B: CourseBackend>(backend: &B, member: &Member) -> Result<String, ActionError> {
    if !member.is_staff() {
        return StaffOnlySnafu.fail();
    }

    let members = backend.members().await?;
    let mut out = format!("{} members", members.len());
    for member in members {
        let role = format!("{:?}", member.role).to_lowercase();
        let status = member
            .subscription
            .as_ref()
            .map(|subscription| format!("{:?}", subscription.status).to_lowercase())
            .unwrap_or_else(|| "no subscription".to_string());
        let _ = write!(out, "\n  {:>5}  {:<24} {role:<8} {status}", member.id, member.name);
    }
    Ok(out)
}

fn render<B>(open: Option<&OpenCourse<B>>, tracker: &ProgressTracker<B>, member: &Member) -> String
where
    B: CourseBackend + Clone + 'static,
{
    let Some(open) = open else {
        return ActionError::NoCourse.to_string();
    };

    let gated = unlock::annotate(open.coordinator.items(), member, now());
    let percent = tracker
        .snapshot(open.course.id, gated.iter().map(|item| item.content.id))
        .percent_complete(gated.len());

    let mut out = format!("{} [{}] {percent}% watched", open.course.title, open.course.id);
    for (position, item) in gated.iter().enumerate() {
        let mark = match (item.unlocked, tracker.is_watched(item.content.id)) {
            (false, _) => "locked",
            (true, true) => "done",
            (true, false) => "open",
        };
        let _ = write!(
            out,
            "\n  {position:>2}  #{:<5} {mark:<6} {}",
            item.content.id, item.content.title
        );
        if item.content.status == ContentStatus::Draft {
            out.push_str(" (draft)");
        }
        if let Some(message) = &item.message {
            let _ = write!(out, " - {message}");
        }
    }
    out
}

fn describe_progress(progress: &ContentProgress) -> String {
    let state = if progress.is_completed { ", completed" } else { "" };
    format!(
        "content {} at {}s of {}s ({:.0}% watched{state})",
        progress.content_id,
        progress.progress_seconds,
        progress.total_seconds,
        progress.watched_ratio() * 100.0
    )
}

fn capture_error(repl: &mut Repl, err: ActionError) {
    tracing::error!("{}", err);
    repl.reply(err.describe());
}
