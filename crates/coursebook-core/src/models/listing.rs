use serde::Deserialize;

/// A collection response. The backend may paginate (`{"results": [...]}`)
/// or return a bare array depending on the endpoint's configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Page {
        #[serde(default)]
        count: Option<u64>,
        #[serde(default)]
        next: Option<String>,
        #[serde(default)]
        previous: Option<String>,
        results: Vec<T>,
    },
    Bare(Vec<T>),
}

impl<T> Listing<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            Listing::Page { results, .. } => results,
            Listing::Bare(items) => items,
        }
    }

    /// Whether the server reported further pages beyond this one.
    pub fn has_more(&self) -> bool {
        matches!(self, Listing::Page { next: Some(_), .. })
    }
}
