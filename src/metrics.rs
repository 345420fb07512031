#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMetrics {
    pub page_number: usize,
    pub command_count: usize,
    pub block_count: usize,
    pub image_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderMetrics {
    pub pages: Vec<PageMetrics>,
    pub images_requested: usize,
    pub images_resolved: usize,
    pub images_failed: usize,
    pub fetch_ms: f64,
    pub layout_ms: f64,
    pub total_bytes: usize,
}

impl RenderMetrics {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}
