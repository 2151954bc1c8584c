use serde::{Deserialize, Serialize};

use bookdist_core::validation::{ensure_not_blank, ensure_year};
use bookdist_core::{CatalogId, DomainResult, Entity};

/// Subject category used by the store's secondary index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Textbook,
    Reference,
    Literature,
    Science,
    History,
    Mathematics,
    Language,
    Vocational,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Textbook,
        Category::Reference,
        Category::Literature,
        Category::Science,
        Category::History,
        Category::Mathematics,
        Category::Language,
        Category::Vocational,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Category::Textbook => "Textbook",
            Category::Reference => "Reference",
            Category::Literature => "Literature",
            Category::Science => "Science",
            Category::History => "History",
            Category::Mathematics => "Mathematics",
            Category::Language => "Language",
            Category::Vocational => "Vocational",
        }
    }
}

impl core::fmt::Display for Category {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable identity of a title held in the central inventory.
///
/// Quantities are not stored here; the [`crate::InventoryStore`] owns them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    id: CatalogId,
    title: String,
    author: String,
    category: Category,
    year: i32,
    publisher: String,
    /// Price in smallest currency unit (e.g., paise).
    price: u64,
}

impl CatalogEntry {
    /// Validate and build a catalog entry.
    ///
    /// The id is already validated by [`CatalogId::parse`]; title and author
    /// must be non-blank and the year within the accepted range.
    pub fn new(
        id: CatalogId,
        title: impl Into<String>,
        author: impl Into<String>,
        category: Category,
        year: i32,
        publisher: impl Into<String>,
        price: u64,
    ) -> DomainResult<Self> {
        let title = title.into();
        let author = author.into();
        ensure_not_blank("title", &title)?;
        ensure_not_blank("author", &author)?;
        ensure_year(year)?;

        Ok(Self {
            id,
            title,
            author,
            category,
            year,
            publisher: publisher.into(),
            price,
        })
    }

    pub fn catalog_id(&self) -> &CatalogId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn publisher(&self) -> &str {
        &self.publisher
    }

    pub fn price(&self) -> u64 {
        self.price
    }
}

impl Entity for CatalogEntry {
    type Id = CatalogId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
