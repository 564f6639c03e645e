//! Paginated conversation-group listing.
//!
//! The catalog accumulates `{id, title}` summaries across pages. Merging
//! deduplicates by id and preserves first-seen insertion order; `has_more`
//! derives from whichever total the server reports (`totalPages` or
//! `total`).

use std::collections::HashSet;

use serde::Deserialize;
use tracing::debug;

use super::{ApiClient, ApiError};

const GROUPS_ENDPOINT: &str = "/homework-ai-assistant/conversation-groups";

/// Page size requested from the listing endpoint.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// One conversation thread summary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GroupSummary {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub total: Option<usize>,
}

/// Raw response of one listing page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupsPage {
    #[serde(default)]
    pub groups: Vec<GroupSummary>,
    #[serde(default)]
    pub pagination: Pagination,
}

/// Accumulated, deduplicated group summaries with a paging cursor.
pub struct GroupCatalog {
    groups: Vec<GroupSummary>,
    seen: HashSet<String>,
    next_page: u32,
    limit: u32,
    total_pages: Option<u32>,
    total: Option<usize>,
}

impl GroupCatalog {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_PAGE_LIMIT)
    }

    pub fn with_limit(limit: u32) -> Self {
        Self {
            groups: Vec::new(),
            seen: HashSet::new(),
            next_page: 1,
            limit,
            total_pages: None,
            total: None,
        }
    }

    pub fn groups(&self) -> &[GroupSummary] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Whether another page is worth requesting. Before the first fetch
    /// this is true; afterwards it compares against the server-reported
    /// total, page count preferred.
    pub fn has_more(&self) -> bool {
        match (self.total_pages, self.total) {
            (Some(total_pages), _) => self.next_page <= total_pages,
            (None, Some(total)) => self.groups.len() < total,
            (None, None) => self.next_page == 1,
        }
    }

    /// Merge one page into the catalog. Returns how many summaries were
    /// new; duplicates by id are dropped and first-seen order kept.
    pub fn merge_page(&mut self, page: GroupsPage) -> usize {
        self.total_pages = page.pagination.total_pages.or(self.total_pages);
        self.total = page.pagination.total.or(self.total);

        let mut added = 0;
        for group in page.groups {
            if self.seen.insert(group.id.clone()) {
                self.groups.push(group);
                added += 1;
            } else {
                debug!(id = %group.id, "dropping duplicate group summary");
            }
        }
        self.next_page += 1;
        added
    }

    /// Fetch and merge the next page.
    pub async fn fetch_next_page(&mut self, api: &ApiClient) -> Result<usize, ApiError> {
        let response = api
            .get(GROUPS_ENDPOINT)
            .query(&[("page", self.next_page), ("limit", self.limit)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ApiError::Status(response.status()));
        }
        let page: GroupsPage = response.json().await?;
        Ok(self.merge_page(page))
    }

    /// Drop everything and start paging from the beginning; used when the
    /// server mints a new group and the listing needs a refresh.
    pub fn reset(&mut self) {
        self.groups.clear();
        self.seen.clear();
        self.next_page = 1;
        self.total_pages = None;
        self.total = None;
    }

    /// Refetch the first page from scratch.
    pub async fn refresh(&mut self, api: &ApiClient) -> Result<usize, ApiError> {
        self.reset();
        self.fetch_next_page(api).await
    }
}

impl Default for GroupCatalog {
    fn default() -> Self {
        Self::new()
    }
}
