use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A course's category as the backend may send it: either the bare id or
/// the nested category object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryRef {
    Id(i64),
    Nested(Category),
}

impl CategoryRef {
    pub fn id(&self) -> i64 {
        match self {
            CategoryRef::Id(id) => *id,
            CategoryRef::Nested(category) => category.id,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            CategoryRef::Id(_) => None,
            CategoryRef::Nested(category) => Some(&category.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<CategoryRef>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub instructor: Option<i64>,
    #[serde(default)]
    pub instructor_name: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default, deserialize_with = "de_hours")]
    pub duration_hours: f64,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub enrollment_count: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Course {
    pub fn category_id(&self) -> Option<i64> {
        self.category.as_ref().map(CategoryRef::id)
    }

    /// Category label for tables: the server-derived name, else the nested
    /// object's name, else "-".
    pub fn category_display(&self) -> String {
        self.category_name
            .clone()
            .filter(|n| !n.is_empty())
            .or_else(|| {
                self.category
                    .as_ref()
                    .and_then(|c| c.name())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "-".to_string())
    }

    pub fn status_display(&self) -> &'static str {
        if self.is_published {
            "Published"
        } else {
            "Draft"
        }
    }
}

/// Writable course fields sent on create and update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoursePayload {
    pub title: String,
    pub description: String,
    pub category: i64,
    pub duration_hours: f64,
    pub is_published: bool,
}

/// Decimal fields arrive either as JSON numbers or as strings like "12.50".
fn de_hours<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Hours {
        Number(f64),
        Text(String),
        Missing(()),
    }

    match Hours::deserialize(deserializer)? {
        Hours::Number(n) => Ok(n),
        Hours::Text(s) if s.trim().is_empty() => Ok(0.0),
        Hours::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid duration_hours: {}", s))),
        Hours::Missing(()) => Ok(0.0),
    }
}
