use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// The closed set of literary categories a book can belong to.
///
/// Serialized with the display labels the frontend and the data set use
/// ("General Works", "Arts & Recreation", ...). Unknown labels are rejected
/// at deserialization time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "General Works")]
    GeneralWorks,
    #[serde(rename = "Philosophy & Psychology")]
    PhilosophyPsychology,
    #[serde(rename = "Religion")]
    Religion,
    #[serde(rename = "Social Sciences")]
    SocialSciences,
    #[serde(rename = "Language")]
    Language,
    #[serde(rename = "Science")]
    Science,
    #[serde(rename = "Technology")]
    Technology,
    #[serde(rename = "Arts & Recreation")]
    ArtsRecreation,
    #[serde(rename = "Literature")]
    Literature,
    #[serde(rename = "History, Geography, & Biography")]
    HistoryGeographyBiography,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GeneralWorks => "General Works",
            Self::PhilosophyPsychology => "Philosophy & Psychology",
            Self::Religion => "Religion",
            Self::SocialSciences => "Social Sciences",
            Self::Language => "Language",
            Self::Science => "Science",
            Self::Technology => "Technology",
            Self::ArtsRecreation => "Arts & Recreation",
            Self::Literature => "Literature",
            Self::HistoryGeographyBiography => "History, Geography, & Biography",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == s)
    }

    /// All categories, in shelving order.
    pub const ALL: [Category; 10] = [
        Self::GeneralWorks,
        Self::PhilosophyPsychology,
        Self::Religion,
        Self::SocialSciences,
        Self::Language,
        Self::Science,
        Self::Technology,
        Self::ArtsRecreation,
        Self::Literature,
        Self::HistoryGeographyBiography,
    ];
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// CopyStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a physical copy.
///
/// ```text
/// AVAILABLE ⇄ BORROWED        (owned by the circulation module)
/// AVAILABLE → LOST / DAMAGED / MISSING → AVAILABLE   (catalog edits)
/// ```
///
/// BORROWED is only ever set and cleared by circulation's atomic
/// accept/return units; the catalog refuses to write it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CopyStatus {
    Available,
    Borrowed,
    Lost,
    Damaged,
    Missing,
}

impl CopyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Borrowed => "BORROWED",
            Self::Lost => "LOST",
            Self::Damaged => "DAMAGED",
            Self::Missing => "MISSING",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "AVAILABLE" => Some(Self::Available),
            "BORROWED" => Some(Self::Borrowed),
            "LOST" => Some(Self::Lost),
            "DAMAGED" => Some(Self::Damaged),
            "MISSING" => Some(Self::Missing),
            _ => None,
        }
    }
}

impl std::fmt::Display for CopyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Book / Copy — core data models, map 1:1 to SQL columns
// ---------------------------------------------------------------------------

/// Catalog metadata for a title. Owns zero or more copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    /// Unique across the catalog.
    pub isbn: String,
    pub category: Category,
    pub created_at: String,
    pub updated_at: String,
}

/// A single physical, borrowable instance of a book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Copy {
    pub id: String,
    pub book_id: String,
    pub status: CopyStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// A book together with its copy counts, as listed to browsers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookOverview {
    #[serde(flatten)]
    pub book: Book,
    pub total_copies: i64,
    pub available_copies: i64,
}

/// A copy joined with its book's metadata.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyDetail {
    #[serde(flatten)]
    pub copy: Copy,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub category: Category,
}

// ---------------------------------------------------------------------------
// API request / query types
// ---------------------------------------------------------------------------

/// Body for `POST /books`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddBookRequest {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub category: Category,
    /// Number of physical copies to register up front.
    #[serde(default = "default_copies")]
    pub copies: u32,
}

fn default_copies() -> u32 {
    1
}

/// Body for `PUT /books/{id}` — full metadata replacement.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookRequest {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub category: Category,
}

/// Query parameters for `GET /books`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookListQuery {
    #[serde(default)]
    pub limit: Option<usize>,

    #[serde(default)]
    pub offset: Option<usize>,

    #[serde(default)]
    pub category: Option<String>,

    /// Substring search on title (default) or author, see `by`.
    #[serde(default)]
    pub q: Option<String>,

    /// Search field: "title" or "author".
    #[serde(default)]
    pub by: Option<String>,
}

/// Body for `POST /copies`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCopyRequest {
    pub book_id: String,
}

/// Body for `POST /copies/{id}/@status`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetCopyStatusRequest {
    pub status: CopyStatus,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_roundtrip() {
        for c in Category::ALL {
            let json = serde_json::to_string(&c).unwrap();
            let back: Category = serde_json::from_str(&json).unwrap();
            assert_eq!(c, back);
            assert_eq!(Category::from_str(c.as_str()), Some(c));
        }
    }

    #[test]
    fn category_rejects_unknown_label() {
        let result: Result<Category, _> = serde_json::from_str("\"Cooking\"");
        assert!(result.is_err());
        assert_eq!(Category::from_str("Cooking"), None);
    }

    #[test]
    fn copy_status_roundtrip() {
        for s in [
            CopyStatus::Available,
            CopyStatus::Borrowed,
            CopyStatus::Lost,
            CopyStatus::Damaged,
            CopyStatus::Missing,
        ] {
            let json = serde_json::to_string(&s).unwrap();
            let back: CopyStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(s, back);
            assert_eq!(CopyStatus::from_str(s.as_str()), Some(s));
        }
    }

    #[test]
    fn add_book_request_defaults_one_copy() {
        let json = r#"{"title":"Dune","author":"Frank Herbert","isbn":"9780441172719","category":"Literature"}"#;
        let req: AddBookRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.copies, 1);
        assert_eq!(req.category, Category::Literature);
    }

    #[test]
    fn book_overview_flattens() {
        let overview = BookOverview {
            book: Book {
                id: "b1".into(),
                title: "Dune".into(),
                author: "Frank Herbert".into(),
                isbn: "9780441172719".into(),
                category: Category::Literature,
                created_at: "2026-01-01T00:00:00+00:00".into(),
                updated_at: "2026-01-01T00:00:00+00:00".into(),
            },
            total_copies: 3,
            available_copies: 2,
        };
        let json = serde_json::to_value(&overview).unwrap();
        assert_eq!(json["title"], "Dune");
        assert_eq!(json["totalCopies"], 3);
        assert_eq!(json["availableCopies"], 2);
    }
}
