//! Create/edit form for a single course.
//!
//! The form moves Loading -> Editing -> Validating -> Submitting and ends
//! either back in Editing (with errors attached) or in NavigatedAway once the
//! backend accepts the course. Client-side validation is a gate in front of
//! the network, not a replacement for the backend's own checks.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::{Category, Course, CoursePayload};

pub const FIX_ERRORS_MESSAGE: &str = "Please fix the errors below.";
pub const SAVE_FAILED_MESSAGE: &str = "Failed to save course. Please try again.";
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load course. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Title,
    Description,
    Category,
    DurationHours,
}

impl Field {
    /// Wire name of the field.
    pub fn name(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Description => "description",
            Field::Category => "category",
            Field::DurationHours => "duration_hours",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

pub type FieldErrors = BTreeMap<Field, &'static str>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    Loading,
    Editing,
    Validating,
    Submitting,
    NavigatedAway,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(i64),
}

/// The editable fields of a course. `category` is the selected category id,
/// `None` while nothing is selected.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseDraft {
    pub title: String,
    pub description: String,
    pub category: Option<i64>,
    pub duration_hours: f64,
    pub is_published: bool,
}

impl Default for CourseDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            category: None,
            duration_hours: 0.0,
            is_published: true,
        }
    }
}

impl CourseDraft {
    /// Prefill from an existing course. A nested category object is reduced
    /// to its id.
    pub fn from_course(course: &Course) -> Self {
        Self {
            title: course.title.clone(),
            description: course.description.clone(),
            category: course.category_id(),
            duration_hours: course.duration_hours,
            is_published: course.is_published,
        }
    }

    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if self.title.trim().is_empty() {
            errors.insert(Field::Title, "Title is required");
        }
        if self.description.trim().is_empty() {
            errors.insert(Field::Description, "Description is required");
        }
        if self.category.is_none() {
            errors.insert(Field::Category, "Category is required");
        }
        // NaN fails this comparison too
        if !(self.duration_hours > 0.0) {
            errors.insert(Field::DurationHours, "Duration must be greater than 0");
        }
        errors
    }

    /// The request body, or `None` while no category is selected.
    pub fn to_payload(&self) -> Option<CoursePayload> {
        Some(CoursePayload {
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category?,
            duration_hours: self.duration_hours,
            is_published: self.is_published,
        })
    }
}

/// What a call to `CourseForm::submit` did.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Validation failed; nothing was sent.
    Invalid,
    /// The backend stored the course; the form is finished.
    Saved(Course),
    /// The backend (or the network) refused; the form is editable again.
    Failed(ApiError),
    /// The form was not in a submittable state.
    NotReady,
}

pub struct CourseForm {
    api: ApiClient,
    mode: FormMode,
    state: FormState,
    draft: CourseDraft,
    categories: Vec<Category>,
    field_errors: FieldErrors,
    error: Option<String>,
}

impl CourseForm {
    pub fn create(api: ApiClient) -> Self {
        Self::with_mode(api, FormMode::Create)
    }

    pub fn edit(api: ApiClient, course_id: i64) -> Self {
        Self::with_mode(api, FormMode::Edit(course_id))
    }

    fn with_mode(api: ApiClient, mode: FormMode) -> Self {
        Self {
            api,
            mode,
            state: FormState::Loading,
            draft: CourseDraft::default(),
            categories: Vec::new(),
            field_errors: FieldErrors::new(),
            error: None,
        }
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    pub fn draft(&self) -> &CourseDraft {
        &self.draft
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn field_errors(&self) -> &FieldErrors {
        &self.field_errors
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.state == FormState::Submitting
    }

    pub fn title(&self) -> &'static str {
        match self.mode {
            FormMode::Create => "Create New Course",
            FormMode::Edit(_) => "Edit Course",
        }
    }

    /// Fetch categories and, when editing, the course being edited. Both
    /// requests run together. A failed category fetch leaves the list empty;
    /// a failed course fetch leaves the draft blank with an error message.
    /// The form is editable afterwards either way; the error is returned so
    /// the caller can react to an expired session.
    pub async fn load(&mut self) -> Result<(), ApiError> {
        self.state = FormState::Loading;
        self.error = None;

        let categories = self.api.fetch_categories();
        let (categories, course) = match self.mode {
            FormMode::Create => (categories.await, None),
            FormMode::Edit(id) => {
                let (categories, course) =
                    futures::future::join(categories, self.api.fetch_course(id)).await;
                (categories, Some(course))
            }
        };

        let mut failure = None;
        match categories {
            Ok(categories) => self.categories = categories,
            Err(e) => {
                warn!(error = %e, "Error fetching categories");
                failure = Some(e);
            }
        }

        match course {
            Some(Ok(course)) => {
                debug!(course_id = course.id, "Loaded course for editing");
                self.draft = CourseDraft::from_course(&course);
            }
            Some(Err(e)) => {
                warn!(error = %e, "Error fetching course");
                self.error = Some(e.user_message(LOAD_FAILED_MESSAGE));
                failure = Some(e);
            }
            None => {}
        }

        self.state = FormState::Editing;
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Apply an edit to the draft. Ignored unless the form is editable.
    pub fn update<F>(&mut self, edit: F) -> bool
    where
        F: FnOnce(&mut CourseDraft),
    {
        if self.state != FormState::Editing {
            debug!(state = ?self.state, "Ignoring edit while form is not editable");
            return false;
        }
        edit(&mut self.draft);
        true
    }

    /// Validate, then create or update the course.
    pub async fn submit(&mut self) -> SubmitOutcome {
        if self.state != FormState::Editing {
            return SubmitOutcome::NotReady;
        }

        self.state = FormState::Validating;
        let errors = self.draft.validate();
        let payload = match self.draft.to_payload() {
            Some(payload) if errors.is_empty() => payload,
            _ => {
                debug!(fields = ?errors.keys().collect::<Vec<_>>(), "Course form failed validation");
                self.field_errors = errors;
                self.error = Some(FIX_ERRORS_MESSAGE.to_string());
                self.state = FormState::Editing;
                return SubmitOutcome::Invalid;
            }
        };

        self.state = FormState::Submitting;
        self.error = None;
        self.field_errors.clear();

        let result = match self.mode {
            FormMode::Create => self.api.create_course(&payload).await,
            FormMode::Edit(id) => self.api.update_course(id, &payload).await,
        };

        match result {
            Ok(course) => {
                info!(course_id = course.id, "Course saved");
                self.state = FormState::NavigatedAway;
                SubmitOutcome::Saved(course)
            }
            Err(e) => {
                warn!(error = %e, "Error saving course");
                // Backend validation lands in the banner, not the field map
                self.error = Some(e.user_message(SAVE_FAILED_MESSAGE));
                self.state = FormState::Editing;
                SubmitOutcome::Failed(e)
            }
        }
    }
}
