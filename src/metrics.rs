#[derive(Debug, Clone, Default)]
pub struct PageMetrics {
    pub page_number: usize,
    pub paragraph_count: usize,
    pub table_count: usize,
    pub line_count: usize,
    pub used_height: f32,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentMetrics {
    pub pages: Vec<PageMetrics>,
    pub section_count: usize,
    pub total_layout_ms: f64,
}
