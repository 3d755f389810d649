use domain::VideoStub;
use serde::Serialize;

/// Stubs whose title contains `query`, ignoring case, in original order
pub fn search_stubs<'a>(stubs: &'a [VideoStub], query: &str) -> Vec<&'a VideoStub> {
    let needle = query.to_lowercase();
    stubs
        .iter()
        .filter(|stub| stub.title.to_lowercase().contains(&needle))
        .collect()
}

/// Visible slice `[start, end)` of the searched list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    pub start: usize,
    pub end: usize,
}

impl PageWindow {
    pub fn first(page_size: usize) -> Self {
        Self {
            start: 0,
            end: page_size,
        }
    }

    pub fn can_advance(&self, len: usize) -> bool {
        self.end < len
    }

    /// Next window, or `None` once the end of the list is visible
    pub fn advance(&self, page_size: usize, len: usize) -> Option<Self> {
        self.can_advance(len).then(|| Self {
            start: self.end,
            end: self.end + page_size,
        })
    }

    /// The window clamped to `items`
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let end = self.end.min(items.len());
        let start = self.start.min(end);
        &items[start..end]
    }
}

/// Title search text plus its pagination window.
///
/// The window resets whenever the query text changes and only moves forward
/// while the query stays the same.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchState {
    query: String,
    window: PageWindow,
    page_size: usize,
}

/// One rendered page of search results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchPage {
    pub query: String,
    pub window: PageWindow,
    pub total_matches: usize,
    pub has_more: bool,
    pub items: Vec<VideoStub>,
}

impl SearchState {
    pub fn new(page_size: usize) -> Self {
        let page_size = page_size.max(1);
        Self {
            query: String::new(),
            window: PageWindow::first(page_size),
            page_size,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn window(&self) -> PageWindow {
        self.window
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// State after the search box reports `query`
    pub fn with_query(&self, query: &str) -> Self {
        if query == self.query {
            return self.clone();
        }
        Self {
            query: query.to_string(),
            window: PageWindow::first(self.page_size),
            page_size: self.page_size,
        }
    }

    /// State after "load next page"; `None` when the action is unavailable
    pub fn advanced(&self, stubs: &[VideoStub]) -> Option<Self> {
        let matches = search_stubs(stubs, &self.query).len();
        let window = self.window.advance(self.page_size, matches)?;
        Some(Self {
            window,
            ..self.clone()
        })
    }

    pub fn page(&self, stubs: &[VideoStub]) -> SearchPage {
        let matches = search_stubs(stubs, &self.query);
        SearchPage {
            query: self.query.clone(),
            window: self.window,
            total_matches: matches.len(),
            has_more: self.window.can_advance(matches.len()),
            items: self
                .window
                .slice(&matches)
                .iter()
                .map(|stub| (*stub).clone())
                .collect(),
        }
    }
}
