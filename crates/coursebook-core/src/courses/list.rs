//! The signed-in user's course list.
//!
//! Which courses come back is decided by the backend from the account's
//! role; the client only picks labels from the cached profile. Deletion is
//! confirmed first, removes the course from the held list once the backend
//! accepts it, and is reconciled by the next full fetch.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError, ApiResult};
use crate::models::{Course, Profile};

pub const DELETE_CONFIRM_PROMPT: &str =
    "Are you sure you want to delete this course? This action cannot be undone.";
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load courses. Please refresh the page.";
pub const DELETE_FAILED_MESSAGE: &str = "Failed to delete course. Please try again.";

/// How long a failed-delete message stays visible.
pub const DELETE_ERROR_DISMISS_AFTER: Duration = Duration::from_secs(5);

/// Buffer size for background refresh results.
const CHANNEL_BUFFER_SIZE: usize = 4;

/// A background fetch result, tagged with the delete generation current
/// when the fetch was dispatched.
type RefreshResult = (u64, ApiResult<Vec<Course>>);

/// Which slice of the catalogue the backend returns for this user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
    AllSystem,
    Taught,
    Enrolled,
}

impl ListScope {
    /// Scope for a profile; signed-out or unknown users get the student view.
    pub fn for_profile(profile: Option<&Profile>) -> Self {
        match profile {
            Some(p) if p.is_admin() => ListScope::AllSystem,
            Some(p) if p.is_instructor() => ListScope::Taught,
            _ => ListScope::Enrolled,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ListScope::AllSystem => "All System Courses",
            ListScope::Taught => "My Taught Courses",
            ListScope::Enrolled => "My Enrolled Courses",
        }
    }

    pub fn empty_message(&self) -> &'static str {
        match self {
            ListScope::AllSystem => "No courses found in the system.",
            ListScope::Taught => "You haven't created any courses yet.",
            ListScope::Enrolled => "You haven't enrolled in any courses yet.",
        }
    }

    /// Admins and instructors see status/enrollment columns and may edit.
    pub fn can_manage(&self) -> bool {
        matches!(self, ListScope::AllSystem | ListScope::Taught)
    }
}

/// Asks the user to approve a destructive action.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// A message that stops being shown after a fixed delay.
#[derive(Debug, Clone)]
pub struct TransientMessage {
    text: String,
    expires_at: Instant,
}

impl TransientMessage {
    pub fn new(text: String, ttl: Duration) -> Self {
        Self {
            text,
            expires_at: Instant::now() + ttl,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

#[derive(Debug)]
pub enum DeleteOutcome {
    /// The user declined; nothing was sent.
    Cancelled,
    Deleted,
    Failed(ApiError),
}

pub struct CourseList {
    api: ApiClient,
    scope: ListScope,
    courses: Vec<Course>,
    loading: bool,
    error: Option<String>,
    delete_error: Option<TransientMessage>,
    dismiss_after: Duration,
    /// Bumped on every successful delete
    generation: u64,
    /// Deleted course id -> generation of its delete
    deleted: HashMap<i64, u64>,
    results_tx: mpsc::Sender<RefreshResult>,
    results_rx: mpsc::Receiver<RefreshResult>,
}

impl CourseList {
    pub fn new(api: ApiClient) -> Self {
        let scope = ListScope::for_profile(api.session().current().as_ref());
        let (results_tx, results_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        Self {
            api,
            scope,
            courses: Vec::new(),
            loading: true,
            error: None,
            delete_error: None,
            dismiss_after: DELETE_ERROR_DISMISS_AFTER,
            generation: 0,
            deleted: HashMap::new(),
            results_tx,
            results_rx,
        }
    }

    /// Override how long delete errors stay visible.
    pub fn with_dismiss_after(mut self, dismiss_after: Duration) -> Self {
        self.dismiss_after = dismiss_after;
        self
    }

    pub fn scope(&self) -> ListScope {
        self.scope
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The failed-delete message, until it expires.
    pub fn delete_error(&self) -> Option<&str> {
        self.delete_error
            .as_ref()
            .filter(|m| !m.is_expired())
            .map(TransientMessage::text)
    }

    /// Drop an expired delete message. Call from the render loop.
    pub fn dismiss_expired(&mut self) {
        if self.delete_error.as_ref().is_some_and(TransientMessage::is_expired) {
            self.delete_error = None;
        }
    }

    /// Fetch the list and replace whatever is held.
    pub async fn fetch(&mut self) -> ApiResult<()> {
        self.loading = true;
        let result = self.api.fetch_my_courses().await;
        self.apply(result)
    }

    /// Start a fetch on the runtime. Its result is applied by the next
    /// `poll_results`; if this list is gone by then the result is dropped.
    /// Courses deleted after the fetch was dispatched stay removed.
    pub fn refresh_in_background(&mut self) -> JoinHandle<()> {
        self.loading = true;
        let api = self.api.clone();
        let tx = self.results_tx.clone();
        let dispatched_at = self.generation;
        tokio::spawn(async move {
            let result = api.fetch_my_courses().await;
            if tx.send((dispatched_at, result)).await.is_err() {
                debug!("Course list closed before refresh finished, discarding result");
            }
        })
    }

    /// Apply every finished background fetch in arrival order. Returns the
    /// error of the last failed fetch, if any.
    pub fn poll_results(&mut self) -> Option<ApiError> {
        let mut last_error = None;
        while let Ok((dispatched_at, result)) = self.results_rx.try_recv() {
            let result = result.map(|courses| self.without_later_deletes(courses, dispatched_at));
            if let Err(e) = self.apply(result) {
                last_error = Some(e);
            }
        }
        last_error
    }

    fn without_later_deletes(&self, mut courses: Vec<Course>, dispatched_at: u64) -> Vec<Course> {
        let before = courses.len();
        courses.retain(|c| !self.deleted.get(&c.id).is_some_and(|&at| at > dispatched_at));
        if courses.len() != before {
            debug!(dropped = before - courses.len(), "Dropped courses deleted during refresh");
        }
        courses
    }

    fn apply(&mut self, result: ApiResult<Vec<Course>>) -> ApiResult<()> {
        self.loading = false;
        match result {
            Ok(courses) => {
                self.courses = courses;
                self.error = None;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Error fetching courses");
                self.error = Some(LOAD_FAILED_MESSAGE.to_string());
                Err(e)
            }
        }
    }

    /// Delete a course after the user confirms.
    pub async fn delete<C: Confirm + ?Sized>(&mut self, course_id: i64, confirm: &mut C) -> DeleteOutcome {
        if !confirm.confirm(DELETE_CONFIRM_PROMPT) {
            debug!(course_id, "Delete cancelled");
            return DeleteOutcome::Cancelled;
        }

        match self.api.delete_course(course_id).await {
            Ok(()) => {
                self.courses.retain(|c| c.id != course_id);
                self.generation += 1;
                self.deleted.insert(course_id, self.generation);
                self.delete_error = None;
                info!(course_id, "Course deleted");
                DeleteOutcome::Deleted
            }
            Err(e) => {
                warn!(course_id, error = %e, "Error deleting course");
                self.delete_error = Some(TransientMessage::new(
                    e.user_message(DELETE_FAILED_MESSAGE),
                    self.dismiss_after,
                ));
                DeleteOutcome::Failed(e)
            }
        }
    }
}
