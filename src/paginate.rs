pub fn total_pages(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    len.div_ceil(page_size)
}

/// Items on page `index`. Out-of-range pages are empty; clamping is the
/// caller's job (see [`PageCursor`]).
pub fn page<T>(items: &[T], index: usize, page_size: usize) -> &[T] {
    let start = index.saturating_mul(page_size).min(items.len());
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}

pub fn clamp_page_index(index: usize, total_pages: usize) -> usize {
    index.min(total_pages.saturating_sub(1))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageCursor {
    index: usize,
}

impl PageCursor {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Re-clamps the stored index after the list or page size changed.
    pub fn clamped(&mut self, total_pages: usize) -> usize {
        self.index = clamp_page_index(self.index, total_pages);
        self.index
    }

    pub fn set(&mut self, index: usize, total_pages: usize) {
        self.index = clamp_page_index(index, total_pages);
    }

    pub fn next(&mut self, total_pages: usize) {
        self.set(self.index.saturating_add(1), total_pages);
    }

    pub fn previous(&mut self) {
        self.index = self.index.saturating_sub(1);
    }

    pub fn has_next(&self, total_pages: usize) -> bool {
        self.index + 1 < total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.index > 0
    }

    pub fn reset(&mut self) {
        self.index = 0;
    }
}

pub fn page_label(index: usize) -> String {
    format!("Page {}", index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seven_items_three_per_page() {
        let items = (0..7).collect::<Vec<_>>();
        assert_eq!(total_pages(items.len(), 3), 3);
        let sizes = (0..3)
            .map(|index| page(&items, index, 3).len())
            .collect::<Vec<_>>();
        assert_eq!(sizes, vec![3, 3, 1]);
    }

    #[test]
    fn pages_reconstruct_items_without_gap_or_overlap() {
        for len in [0usize, 1, 5, 12, 13, 100] {
            for page_size in [1usize, 3, 4, 50] {
                let items = (0..len).collect::<Vec<_>>();
                let rebuilt = (0..total_pages(len, page_size))
                    .flat_map(|index| page(&items, index, page_size).iter().copied())
                    .collect::<Vec<_>>();
                assert_eq!(rebuilt, items, "len={len} page_size={page_size}");
            }
        }
    }

    #[test]
    fn empty_list_has_no_pages() {
        let items: Vec<u8> = Vec::new();
        assert_eq!(total_pages(0, 10), 0);
        assert!(page(&items, 0, 10).is_empty());
        assert_eq!(clamp_page_index(4, 0), 0);
    }

    #[test]
    fn out_of_range_page_is_empty() {
        let items = [1, 2, 3];
        assert!(page(&items, 5, 2).is_empty());
        assert!(page(&items, usize::MAX, 2).is_empty());
        assert_eq!(total_pages(3, 0), 0);
    }

    #[test]
    fn cursor_stays_within_bounds() {
        let mut cursor = PageCursor::default();
        assert!(!cursor.has_previous());
        cursor.previous();
        assert_eq!(cursor.index(), 0);

        cursor.next(3);
        cursor.next(3);
        cursor.next(3);
        assert_eq!(cursor.index(), 2);
        assert!(!cursor.has_next(3));

        cursor.set(10, 3);
        assert_eq!(cursor.index(), 2);

        // page size grew, fewer pages now
        assert_eq!(cursor.clamped(1), 0);
        cursor.reset();
        assert_eq!(cursor.index(), 0);
    }

    #[test]
    fn labels_are_one_based() {
        assert_eq!(page_label(0), "Page 1");
        assert_eq!(page_label(9), "Page 10");
    }
}
