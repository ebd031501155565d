use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 { 1 }
fn default_per_page() -> u64 { 20 }

impl PaginationParams {
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit())
    }

    pub fn limit(&self) -> u64 {
        self.per_page.clamp(1, 100)
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self { page: 1, per_page: 20 }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Paginated<T: Serialize> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl<T: Serialize> Paginated<T> {
    /// Slice one page out of an already ordered result set.
    pub fn from_all(all: Vec<T>, params: &PaginationParams) -> Self {
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(usize::try_from(params.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(params.limit()).unwrap_or(usize::MAX))
            .collect();
        Self::new(items, total, params)
    }

    pub fn new(items: Vec<T>, total: u64, params: &PaginationParams) -> Self {
        let per_page = params.limit();
        let total_pages = total.div_ceil(per_page);
        Self {
            items,
            total,
            page: params.page,
            per_page,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_all_slices_requested_page() {
        let params = PaginationParams { page: 2, per_page: 3 };
        let page = Paginated::from_all((1..=7).collect::<Vec<u32>>(), &params);
        assert_eq!(page.items, vec![4, 5, 6]);
        assert_eq!(page.total, 7);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn zero_per_page_is_clamped() {
        let params = PaginationParams { page: 1, per_page: 0 };
        assert_eq!(params.limit(), 1);
        let page = Paginated::from_all(Vec::<u32>::new(), &params);
        assert_eq!(page.total_pages, 0);
    }

    #[test]
    fn page_far_past_the_end_is_empty() {
        let params = PaginationParams { page: u64::MAX, per_page: 20 };
        assert_eq!(params.offset(), u64::MAX);
        let page = Paginated::from_all(vec![1, 2, 3], &params);
        assert!(page.items.is_empty());
        assert_eq!(page.total, 3);
        assert_eq!(page.page, u64::MAX);
    }
}
