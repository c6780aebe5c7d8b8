//! Plain-text rendering of profiles, categories and courses.

use std::fmt::Write;

use coursebook_core::courses::{FieldErrors, ListScope};
use coursebook_core::models::{Category, Course, Profile};
use coursebook_core::utils::{format_date, format_hours, truncate};

// ============================================================================
// Column widths
// ============================================================================

const ID_WIDTH: usize = 6;
const TITLE_WIDTH: usize = 32;
const CATEGORY_WIDTH: usize = 16;
const HOURS_WIDTH: usize = 7;
const STATUS_WIDTH: usize = 10;
const NAME_WIDTH: usize = 20;

pub fn profile(profile: &Profile) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} (#{})", profile.display_name(), profile.id);
    if let Some(ref username) = profile.username {
        let _ = writeln!(out, "  Username: {}", username);
    }
    if let Some(ref email) = profile.email {
        let _ = writeln!(out, "  Email:    {}", email);
    }
    let role = if profile.is_superuser {
        format!("{} (superuser)", profile.role)
    } else {
        profile.role.to_string()
    };
    let _ = writeln!(out, "  Role:     {}", role);
    out
}

pub fn categories(categories: &[Category]) -> String {
    if categories.is_empty() {
        return "No categories found.\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(out, "{:>ID_WIDTH$}  Name", "ID");
    for category in categories {
        let _ = writeln!(out, "{:>ID_WIDTH$}  {}", category.id, category.name);
    }
    out
}

/// The course table for a scope. Managers see status and enrollment
/// columns; students see who teaches each course.
pub fn course_table(scope: ListScope, courses: &[Course]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", scope.title());
    if courses.is_empty() {
        let _ = writeln!(out, "{}", scope.empty_message());
        return out;
    }

    let _ = write!(
        out,
        "{:>ID_WIDTH$}  {:<TITLE_WIDTH$}  {:<CATEGORY_WIDTH$}  {:>HOURS_WIDTH$}",
        "ID", "Title", "Category", "Hours"
    );
    if scope.can_manage() {
        let _ = writeln!(out, "  {:<STATUS_WIDTH$}  Enrolled", "Status");
    } else {
        let _ = writeln!(out, "  Instructor");
    }

    for course in courses {
        let _ = write!(
            out,
            "{:>ID_WIDTH$}  {:<TITLE_WIDTH$}  {:<CATEGORY_WIDTH$}  {:>HOURS_WIDTH$}",
            course.id,
            truncate(&course.title, TITLE_WIDTH),
            truncate(&course.category_display(), CATEGORY_WIDTH),
            format_hours(course.duration_hours),
        );
        if scope.can_manage() {
            let _ = writeln!(
                out,
                "  {:<STATUS_WIDTH$}  {}",
                course.status_display(),
                course.enrollment_count.unwrap_or(0)
            );
        } else {
            let _ = writeln!(
                out,
                "  {}",
                truncate(course.instructor_name.as_deref().unwrap_or("-"), NAME_WIDTH)
            );
        }
    }
    out
}

pub fn course_detail(course: &Course) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "#{} {}", course.id, course.title);
    let _ = writeln!(out, "  Category:   {}", course.category_display());
    let _ = writeln!(out, "  Duration:   {}", format_hours(course.duration_hours));
    let _ = writeln!(out, "  Status:     {}", course.status_display());
    if let Some(ref instructor) = course.instructor_name {
        let _ = writeln!(out, "  Instructor: {}", instructor);
    }
    if let Some(count) = course.enrollment_count {
        let _ = writeln!(out, "  Enrolled:   {}", count);
    }
    let _ = writeln!(out, "  Created:    {}", format_date(course.created_at.as_ref()));
    let _ = writeln!(out, "  Updated:    {}", format_date(course.updated_at.as_ref()));
    if !course.description.is_empty() {
        let _ = writeln!(out);
        for line in course.description.lines() {
            let _ = writeln!(out, "  {}", line);
        }
    }
    out
}

pub fn field_errors(errors: &FieldErrors) -> String {
    let mut out = String::new();
    for (field, message) in errors {
        let _ = writeln!(out, "  {}: {}", field, message);
    }
    out
}
