//! Cursor pagination over the call-log API.
//!
//! The API pages backwards in time: each request after the first asks for calls
//! created strictly before the last call of the previous page, so calls added
//! while the export runs cannot shift page boundaries.

use async_trait::async_trait;
use tracing::debug;

use crate::domain::call::CallRecord;
use crate::errors::FetchError;

/// Largest page the call-log API serves.
pub const PAGE_SIZE: usize = 100;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallListQuery {
    pub assistant_id: String,
    pub limit: usize,
    pub created_at_lt: Option<String>,
}

#[async_trait]
pub trait CallLogSource: Send + Sync {
    async fn list_calls(&self, query: &CallListQuery) -> Result<Vec<CallRecord>, FetchError>;
}

/// Lazy page sequence for one assistant. Ends after the first short page or
/// the first error; build a new pager to start over.
pub struct CallLogPager<'a> {
    source: &'a dyn CallLogSource,
    assistant_id: String,
    cursor: Option<String>,
    exhausted: bool,
    requests: usize,
}

impl<'a> CallLogPager<'a> {
    pub fn new(source: &'a dyn CallLogSource, assistant_id: impl Into<String>) -> Self {
        Self {
            source,
            assistant_id: assistant_id.into(),
            cursor: None,
            exhausted: false,
            requests: 0,
        }
    }

    pub fn requests_issued(&self) -> usize {
        self.requests
    }

    pub async fn next_page(&mut self) -> Result<Option<Vec<CallRecord>>, FetchError> {
        if self.exhausted {
            return Ok(None);
        }

        let query = CallListQuery {
            assistant_id: self.assistant_id.clone(),
            limit: PAGE_SIZE,
            created_at_lt: self.cursor.clone(),
        };
        self.requests += 1;

        let page = match self.source.list_calls(&query).await {
            Ok(page) => page,
            Err(error) => {
                self.exhausted = true;
                return Err(error);
            }
        };

        debug!(
            event_name = "export.fetch.page",
            assistant_id = %self.assistant_id,
            page = self.requests,
            calls = page.len(),
            cursor = query.created_at_lt.as_deref().unwrap_or("none"),
            "fetched call log page"
        );

        if page.len() < PAGE_SIZE {
            self.exhausted = true;
            return Ok(Some(page));
        }

        match page.last().and_then(|call| call.created_at.clone()) {
            Some(cursor) => self.cursor = Some(cursor),
            None => {
                self.exhausted = true;
                let call_id = page.last().map(|call| call.id.clone()).unwrap_or_default();
                return Err(FetchError::MissingCursor { call_id });
            }
        }

        Ok(Some(page))
    }
}

/// Drains every page for `assistant_id`.
pub async fn fetch_all_calls(
    source: &dyn CallLogSource,
    assistant_id: &str,
) -> Result<Vec<CallRecord>, FetchError> {
    let mut pager = CallLogPager::new(source, assistant_id);
    let mut calls = Vec::new();

    while let Some(page) = pager.next_page().await? {
        calls.extend(page);
    }

    Ok(calls)
}
