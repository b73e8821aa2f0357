/// Continuation tokens of the page boundaries visited so far.
///
/// Entry `i` is the token that fetches page `i + 1`. The list only grows by forward
/// navigation into unseen pages and is cleared or truncated explicitly.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CursorStore {
    cursors: Vec<String>,
}

impl CursorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.cursors.clear();
    }

    /// Records the `cursor` returned by a successful fetch of `page_index`.
    ///
    /// Returns whether the token was appended. Tokens of already visited boundaries are
    /// never overwritten.
    pub fn record_success(&mut self, page_index: usize, cursor: Option<&str>) -> bool {
        match cursor {
            Some(token) if page_index == self.cursors.len() => {
                self.cursors.push(token.to_string());
                true
            }
            _ => false,
        }
    }

    /// Drops every token beyond the first `len`.
    pub fn truncate(&mut self, len: usize) {
        self.cursors.truncate(len);
    }

    /// Token needed to fetch `page_index`; `None` for the first page or unvisited pages.
    pub fn token_for_page(&self, page_index: usize) -> Option<&str> {
        page_index
            .checked_sub(1)
            .and_then(|idx| self.cursors.get(idx))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.cursors.clone()
    }
}
