use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{error::Error, subject::Subject};

pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    /// Newest first
    #[serde(alias = "NEW")]
    New,
    /// Oldest first
    #[serde(alias = "OLD")]
    Old,
    /// Highest score first
    #[serde(alias = "TOP")]
    Top,
}

impl SortBy {
    pub fn compare<S: Subject>(&self, a: &S, b: &S) -> Ordering {
        match self {
            SortBy::New => b.created_at().cmp(&a.created_at()),
            SortBy::Old => a.created_at().cmp(&b.created_at()),
            SortBy::Top => b.score().cmp(&a.score()),
        }
    }
}

/// Query string of every listing endpoint. All fields are optional.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct ListRequest {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Option<SortBy>,
}

impl ListRequest {
    pub fn to_page(self, max_size: u32) -> Result<Page, Error> {
        let size = self.size.unwrap_or(DEFAULT_PAGE_SIZE);
        if size == 0 {
            return Err("Page size must not be less than one".into());
        }

        Ok(Page {
            number: self.page.unwrap_or(0),
            size: size.min(max_size.max(1)),
            sort: self.sort,
        })
    }
}

/// A validated page request. `sort: None` keeps the store's natural order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
    pub sort: Option<SortBy>,
}

impl Page {
    pub fn new(number: u32, size: u32, sort: Option<SortBy>) -> Self {
        Self { number, size, sort }
    }

    pub fn offset(&self) -> u64 {
        self.number as u64 * self.size as u64
    }

    pub fn limit(&self) -> u64 {
        self.size as u64
    }
}
