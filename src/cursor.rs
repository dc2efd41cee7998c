//! # Cursor Utilities
//!
//! Listing endpoints page with a numeric cursor: `cursor` is the 1-based page
//! number and `limit` the page size. This module validates those inputs and
//! derives the pagination metadata returned alongside every page.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{ApiError, validation_error};

/// Page size used when the client does not send one
pub const DEFAULT_LIMIT: u64 = 8;

/// Largest page size a client may request
pub const MAX_LIMIT: u64 = 100;

/// Validated page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number
    pub page: u64,
    pub limit: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    /// Validate raw cursor/limit query values, applying defaults for missing ones.
    pub fn from_query(cursor: Option<u64>, limit: Option<u64>) -> Result<Self, ApiError> {
        let page = cursor.unwrap_or(1);
        if page == 0 {
            return Err(validation_error(
                "Invalid cursor",
                serde_json::json!({ "cursor": "cursor must be at least 1" }),
            ));
        }

        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        if limit == 0 || limit > MAX_LIMIT {
            return Err(validation_error(
                "Invalid limit",
                serde_json::json!({ "limit": format!("limit must be between 1 and {}", MAX_LIMIT) }),
            ));
        }

        Ok(Self { page, limit })
    }

    /// Zero-based page index as used by the SeaORM paginator
    pub fn page_index(&self) -> u64 {
        self.page - 1
    }
}

/// Pagination metadata describing one page of a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total_docs: u64,
    pub limit: u64,
    pub total_pages: u64,
    pub page: u64,
    /// 1-based index of the first document on this page
    pub paging_counter: u64,
    pub has_prev_page: bool,
    pub has_next_page: bool,
    pub prev_page: Option<u64>,
    pub next_page: Option<u64>,
}

impl PageMeta {
    pub fn new(request: PageRequest, total_docs: u64) -> Self {
        let PageRequest { page, limit } = request;
        let total_pages = total_docs.div_ceil(limit).max(1);
        let has_prev_page = page > 1;
        let has_next_page = page < total_pages;

        Self {
            total_docs,
            limit,
            total_pages,
            page,
            paging_counter: (page - 1) * limit + 1,
            has_prev_page,
            has_next_page,
            prev_page: has_prev_page.then(|| page - 1),
            next_page: has_next_page.then(|| page + 1),
        }
    }
}
