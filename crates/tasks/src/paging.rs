//! Transport-free pagination.
//!
//! The store hands out results one page at a time with an opaque cursor for the
//! next page. [`Pages`] turns any [`PageSource`] into a lazy, finite,
//! restartable sequence of pages: nothing is fetched until asked for, a page
//! without a cursor ends the sequence, and [`Pages::restart`] begins again from
//! the first page. Test doubles implement [`PageSource`] with canned pages.

use async_trait::async_trait;

use crate::{PageCursor, StoreError, StoreErrorKind};

/// Hard stop for servers that keep returning fresh cursors.
pub const MAX_PAGES: usize = 10_000;

/// One page of results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Cursor of the following page; `None` on the last page.
    pub next: Option<PageCursor>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

/// Fetches one page given the cursor of the previous one (`None` for the first).
#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: Send;

    async fn fetch_page(&self, cursor: Option<&PageCursor>) -> Result<Page<Self::Item>, StoreError>;
}

#[derive(Debug, Clone)]
enum Position {
    Start,
    At(PageCursor),
    Finished,
}

/// Lazy page sequence over a [`PageSource`].
pub struct Pages<S: PageSource> {
    source: S,
    position: Position,
    fetched: usize,
}

impl<S: PageSource> Pages<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            position: Position::Start,
            fetched: 0,
        }
    }

    /// Fetches the next page, or returns `None` once the sequence has ended.
    ///
    /// An error ends the sequence; call [`Pages::restart`] to try again.
    pub async fn next_page(&mut self) -> Option<Result<Vec<S::Item>, StoreError>> {
        let cursor = match &self.position {
            Position::Start => None,
            Position::At(cursor) => Some(cursor.clone()),
            Position::Finished => return None,
        };
        if self.fetched >= MAX_PAGES {
            self.position = Position::Finished;
            return Some(Err(pagination_error(format!(
                "more than {MAX_PAGES} pages"
            ))));
        }

        let page = match self.source.fetch_page(cursor.as_ref()).await {
            Ok(page) => page,
            Err(err) => {
                self.position = Position::Finished;
                return Some(Err(err));
            }
        };
        self.fetched += 1;

        match page.next {
            Some(next) if cursor.as_ref() == Some(&next) => {
                self.position = Position::Finished;
                return Some(Err(pagination_error(format!("cursor '{next}' repeated"))));
            }
            Some(next) => self.position = Position::At(next),
            None => self.position = Position::Finished,
        }
        Some(Ok(page.items))
    }

    /// Rewinds to the first page.
    pub fn restart(&mut self) {
        self.position = Position::Start;
        self.fetched = 0;
    }

    /// Fetches every remaining page and concatenates the items in order.
    pub async fn try_collect(mut self) -> Result<Vec<S::Item>, StoreError> {
        let mut items = Vec::new();
        while let Some(page) = self.next_page().await {
            items.extend(page?);
        }
        Ok(items)
    }

    /// Returns the first item matching `predicate`, fetching no further pages
    /// than needed.
    pub async fn try_find<P>(&mut self, mut predicate: P) -> Result<Option<S::Item>, StoreError>
    where
        P: FnMut(&S::Item) -> bool + Send,
    {
        while let Some(page) = self.next_page().await {
            if let Some(found) = page?.into_iter().find(|item| predicate(item)) {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }
}

fn pagination_error(message: String) -> StoreError {
    StoreError::new("paginate", StoreErrorKind::Decode, message)
}
