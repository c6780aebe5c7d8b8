//! Course catalogue endpoints.

use tracing::debug;

use crate::models::{Category, Course, CoursePayload, Listing};

use super::client::{ApiClient, ApiResult};

const CATEGORIES_PATH: &str = "/lms/categories/";
const COURSES_PATH: &str = "/lms/courses/";
const MY_COURSES_PATH: &str = "/lms/courses/my_courses/";

fn course_path(id: i64) -> String {
    format!("{}{}/", COURSES_PATH, id)
}

impl ApiClient {
    pub async fn fetch_categories(&self) -> ApiResult<Vec<Category>> {
        let listing: Listing<Category> = self.get(CATEGORIES_PATH).await?;
        let categories = listing.into_items();
        debug!(count = categories.len(), "Fetched categories");
        Ok(categories)
    }

    /// Courses visible to the signed-in user. The backend decides the scope
    /// (all, taught, or enrolled) from the account's role.
    pub async fn fetch_my_courses(&self) -> ApiResult<Vec<Course>> {
        let listing: Listing<Course> = self.get(MY_COURSES_PATH).await?;
        if listing.has_more() {
            debug!("Backend paginated my_courses; only the first page is used");
        }
        let courses = listing.into_items();
        debug!(count = courses.len(), "Fetched courses");
        Ok(courses)
    }

    pub async fn fetch_course(&self, id: i64) -> ApiResult<Course> {
        self.get(&course_path(id)).await
    }

    pub async fn create_course(&self, payload: &CoursePayload) -> ApiResult<Course> {
        self.post(COURSES_PATH, payload).await
    }

    pub async fn update_course(&self, id: i64, payload: &CoursePayload) -> ApiResult<Course> {
        self.put(&course_path(id), payload).await
    }

    pub async fn delete_course(&self, id: i64) -> ApiResult<()> {
        self.delete(&course_path(id)).await
    }
}
