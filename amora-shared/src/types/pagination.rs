use serde::Deserialize;

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
        (self.page.saturating_sub(1)) * self.limit()
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_clamped() {
        let p = PaginationParams { page: 1, per_page: 5000 };
        assert_eq!(p.limit(), 100);
        let p = PaginationParams { page: 1, per_page: 0 };
        assert_eq!(p.limit(), 1);
    }

    #[test]
    fn offset_uses_clamped_limit() {
        let p = PaginationParams { page: 3, per_page: 20 };
        assert_eq!(p.offset(), 40);
    }
}
