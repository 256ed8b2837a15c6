use crate::paginate::{page, total_pages, PageCursor};
use crate::palette::ClassColors;

/// State that lives for one viewing session of a tool: the page the user is
/// on and the class colors handed out so far.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub colors: ClassColors,
    pub cursor: PageCursor,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clamps the cursor for the current list and returns its page.
    pub fn current_page<'a, T>(&mut self, items: &'a [T], page_size: usize) -> &'a [T] {
        let total = total_pages(items.len(), page_size);
        let index = self.cursor.clamped(total);
        page(items, index, page_size)
    }

    /// Index of the first item of the current page within the full list.
    pub fn page_offset(&self, page_size: usize) -> usize {
        self.cursor.index().saturating_mul(page_size)
    }
}
