use serde::Serialize;

/// One page of a paginated listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub current_page: u32,
    pub total_pages: u32,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, current_page: u32, page_size: u32, total: u64) -> Self {
        Self {
            items,
            current_page,
            total_pages: page_count(total, page_size),
            total,
        }
    }
}

/// `ceil(total / page_size)`, with a zero page size yielding zero pages.
pub fn page_count(total: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(u64::from(page_size)) as u32
}
