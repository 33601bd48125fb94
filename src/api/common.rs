//! Common API utilities and shared types

use serde::Deserialize;

use crate::models::ListParams;

// ============================================================================
// Pagination Defaults
// ============================================================================

/// Default page number (1-indexed)
pub fn default_page() -> u32 {
    1
}

/// Default page size for listings
pub fn default_per_page() -> u32 {
    10
}

// ============================================================================
// Pagination Query Types
// ============================================================================

/// Basic pagination query parameters
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl PaginationQuery {
    pub fn params(&self) -> ListParams {
        ListParams::new(self.page, self.per_page)
    }
}

/// Optional-category listing query (`?category=&page=&per_page=`)
#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl CategoryQuery {
    pub fn params(&self) -> ListParams {
        ListParams::new(self.page, self.per_page)
    }
}

/// Page-only query
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u32,
}
