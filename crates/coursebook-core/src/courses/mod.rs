//! Course screens as state machines: the create/edit form and the
//! role-scoped list with delete.

pub mod form;
pub mod list;

pub use form::{CourseDraft, CourseForm, Field, FieldErrors, FormMode, FormState, SubmitOutcome};
pub use list::{Confirm, CourseList, DeleteOutcome, ListScope, TransientMessage};
