mod assets;
mod canvas;
mod compose;
mod debug;
mod error;
mod flow;
pub mod format;
mod frame;
mod images;
pub mod inspection;
mod layout;
mod measure;
mod metrics;
mod page_template;
mod pdf;
mod pdfinspect;
mod record;
pub mod sections;
mod source;
mod types;

pub use assets::{AssetBundle, AssetKind};
pub use canvas::{Canvas, Command, Document, Page};
pub use compose::{ReportDocument, Section, compose, serialize};
use debug::DebugLogger;
pub use error::{FetchError, LayoutError, ReportError};
#[cfg(feature = "http")]
pub use images::HttpImageFetcher;
pub use images::{
    CancelToken, FetchStats, ImageFetcher, MemoryImageFetcher, ResolvedImageMap, resolve,
};
pub use layout::{
    Border, BoxStyle, Column, ColumnWidth, Edges, Grid, HAlign, Image, ImageSource, LayoutNode,
    Row, Scaling, Sizing, Slot, Spacer, Table, TableBuilder, TableCell, TableRow, Text, TextSpan,
    TextStyle, VAlign, ZebraStyle,
};
pub use metrics::{PageMetrics, RenderMetrics};
pub use page_template::{PageSetup, PageTemplate, with_page_numbers};
pub use pdfinspect::{
    PdfInspectError, PdfInspectErrorCode, PdfInspectReport, PdfInspectWarning, inspect_pdf_bytes,
    page_text_runs,
};
pub use record::{
    Applicant, DocumentRef, InspectionDetails, PhotoMap, QualityControl, Stakeholder,
    ValuationRecord, ValuationResponse, VehicleDetails, WorkflowStep,
};
pub use source::{DocumentSource, InMemorySource};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
pub use types::{Color, Margins, Pt, Rect, Size, palette};

/// Renders valuation records to PDF. Configuration is fixed at build time;
/// every render is independent and side-effect free apart from the optional
/// debug log.
pub struct ReportEngine {
    setup: PageSetup,
    grid_columns: usize,
    assets: AssetBundle,
    debug: Option<Arc<DebugLogger>>,
}

#[derive(Clone)]
pub struct ReportEngineBuilder {
    page_size: Size,
    margins: Margins,
    content_padding: Pt,
    grid_columns: usize,
    assets: AssetBundle,
    pending_data_uris: Vec<(AssetKind, String)>,
    non_finite: Vec<&'static str>,
    debug_path: Option<PathBuf>,
}

impl ReportEngine {
    pub fn builder() -> ReportEngineBuilder {
        ReportEngineBuilder::new()
    }

    pub fn page_setup(&self) -> &PageSetup {
        &self.setup
    }

    pub fn grid_columns(&self) -> usize {
        self.grid_columns
    }

    pub fn render(
        &self,
        record: &ValuationRecord,
        fetcher: &dyn ImageFetcher,
    ) -> Result<Vec<u8>, ReportError> {
        self.render_with_cancel(record, fetcher, &CancelToken::new())
    }

    /// Looks the record up first; an unknown id is reported before any
    /// image is fetched.
    pub fn render_by_id(
        &self,
        source: &dyn DocumentSource,
        id: &str,
        fetcher: &dyn ImageFetcher,
    ) -> Result<Vec<u8>, ReportError> {
        let record = source
            .lookup(id)
            .ok_or_else(|| ReportError::MissingRecord(id.to_string()))?;
        self.render(&record, fetcher)
    }

    pub fn render_with_cancel(
        &self,
        record: &ValuationRecord,
        fetcher: &dyn ImageFetcher,
        cancel: &CancelToken,
    ) -> Result<Vec<u8>, ReportError> {
        self.render_inner(record, fetcher, cancel)
            .map(|(bytes, _)| bytes)
    }

    pub fn render_with_metrics(
        &self,
        record: &ValuationRecord,
        fetcher: &dyn ImageFetcher,
    ) -> Result<(Vec<u8>, RenderMetrics), ReportError> {
        self.render_inner(record, fetcher, &CancelToken::new())
    }

    /// Builds the document tree from an already resolved image map.
    pub fn build_document(
        &self,
        record: &ValuationRecord,
        images: &ResolvedImageMap,
    ) -> Result<ReportDocument, ReportError> {
        let sections = sections::content_sections(record, images, self.grid_columns)?;
        Ok(compose(
            sections::page_header(record),
            sections,
            sections::page_footer(),
        ))
    }

    fn render_inner(
        &self,
        record: &ValuationRecord,
        fetcher: &dyn ImageFetcher,
        cancel: &CancelToken,
    ) -> Result<(Vec<u8>, RenderMetrics), ReportError> {
        let debug = self.debug.as_deref();
        let result = self.render_pipeline(record, fetcher, cancel, debug);
        if let Some(logger) = debug {
            let context = format!("render:{}", record.id);
            if let Err(err) = &result {
                logger.event(
                    "render.failed",
                    serde_json::json!({ "id": record.id, "error": err.to_string() }),
                );
            }
            logger.emit_summary(&context);
            logger.flush();
        }
        result
    }

    fn render_pipeline(
        &self,
        record: &ValuationRecord,
        fetcher: &dyn ImageFetcher,
        cancel: &CancelToken,
        debug: Option<&DebugLogger>,
    ) -> Result<(Vec<u8>, RenderMetrics), ReportError> {
        let t_fetch = Instant::now();
        let (images, stats) =
            images::resolve_with_stats(&record.photo_urls, fetcher, cancel, debug)?;
        let fetch_ms = t_fetch.elapsed().as_secs_f64() * 1000.0;

        let t_layout = Instant::now();
        let document = self.build_document(record, &images)?;
        let (bytes, pages) = compose::serialize_with(&document, &self.setup, &self.assets, debug)?;
        let layout_ms = t_layout.elapsed().as_secs_f64() * 1000.0;

        let metrics = RenderMetrics {
            pages,
            images_requested: stats.requested,
            images_resolved: stats.resolved,
            images_failed: stats.failed,
            fetch_ms,
            layout_ms,
            total_bytes: bytes.len(),
        };
        Ok((bytes, metrics))
    }
}

impl Default for ReportEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEngineBuilder {
    pub fn new() -> Self {
        let setup = PageSetup::default();
        Self {
            page_size: setup.size,
            margins: setup.margins,
            content_padding: setup.content_padding,
            grid_columns: sections::DEFAULT_GRID_COLUMNS,
            assets: AssetBundle::new(),
            pending_data_uris: Vec::new(),
            non_finite: Vec::new(),
            debug_path: None,
        }
    }

    pub fn page_size(mut self, size: Size) -> Self {
        self.page_size = size;
        self
    }

    pub fn margins(mut self, margins: Margins) -> Self {
        self.margins = margins;
        self
    }

    pub fn margin_all(mut self, value: f32) -> Self {
        if !value.is_finite() {
            self.non_finite.push("margin_all");
        }
        self.margins = Margins::all(value);
        self
    }

    pub fn content_padding(mut self, value: f32) -> Self {
        if !value.is_finite() {
            self.non_finite.push("content_padding");
        }
        self.content_padding = Pt::from_f32(value);
        self
    }

    pub fn grid_columns(mut self, columns: usize) -> Self {
        self.grid_columns = columns;
        self
    }

    pub fn asset(mut self, kind: AssetKind, data: impl Into<Arc<[u8]>>) -> Self {
        self.assets.add(kind, data);
        self
    }

    /// Decoded at `build`; a malformed URI fails the build.
    pub fn asset_data_uri(mut self, kind: AssetKind, uri: impl Into<String>) -> Self {
        self.pending_data_uris.push((kind, uri.into()));
        self
    }

    pub fn register_bundle(mut self, bundle: AssetBundle) -> Self {
        self.assets = bundle;
        self
    }

    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<ReportEngine, ReportError> {
        if let Some(name) = self.non_finite.first() {
            return Err(ReportError::InvalidConfiguration(format!(
                "{} must be a finite number",
                name
            )));
        }
        if self.grid_columns == 0 {
            return Err(ReportError::InvalidConfiguration(
                "grid_columns must be at least 1".to_string(),
            ));
        }
        let setup = PageSetup {
            size: self.page_size,
            margins: self.margins,
            content_padding: self.content_padding,
        };
        setup.validate()?;
        let mut assets = self.assets;
        for (kind, uri) in &self.pending_data_uris {
            assets.add_data_uri(*kind, uri)?;
        }
        let debug = if let Some(path) = self.debug_path {
            Some(Arc::new(DebugLogger::new(path)?))
        } else {
            None
        };
        Ok(ReportEngine {
            setup,
            grid_columns: self.grid_columns,
            assets,
            debug,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn png(width: u32, height: u32, shade: u8) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([shade, 80, 160]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .expect("encode png");
        buf
    }

    fn sample() -> ValuationRecord {
        InMemorySource::sample()
            .expect("sample")
            .lookup("cd8cb1dd-0343-48b1-9831-183c9d31c46f")
            .expect("sample record")
    }

    fn fetcher_for(record: &ValuationRecord) -> MemoryImageFetcher {
        record
            .photo_urls
            .iter()
            .filter(|(_, url)| !url.trim().is_empty())
            .enumerate()
            .fold(MemoryImageFetcher::new(), |fetcher, (idx, (_, url))| {
                fetcher.with_image(url.trim(), png(16, 12, (idx * 13) as u8))
            })
    }

    fn engine() -> ReportEngine {
        ReportEngine::builder().build().expect("engine")
    }

    fn image_objects(bytes: &[u8]) -> usize {
        let needle = b"/Subtype /Image";
        bytes.windows(needle.len()).filter(|w| w == needle).count()
    }

    fn all_text(bytes: &[u8]) -> Vec<Vec<String>> {
        page_text_runs(bytes).expect("text runs")
    }

    #[test]
    fn sample_record_renders_multi_page_report() {
        let record = sample();
        let bytes = engine().render(&record, &fetcher_for(&record)).expect("render");
        let report = inspect_pdf_bytes(&bytes).expect("inspect");
        assert!(report.page_count > 1);

        let pages = all_text(&bytes);
        let total = pages.len();
        for (idx, runs) in pages.iter().enumerate() {
            assert!(runs.contains(&"VALUATION REPORT".to_string()));
            assert!(runs.contains(&format!("Page {} of {}", idx + 1, total)));
        }
        let flat: Vec<&String> = pages.iter().flatten().collect();
        assert!(flat.iter().any(|run| run.as_str() == "RS. 40,000/-"));
        assert!(flat.iter().any(|run| run.as_str() == "BASIC SYSTEMS"));
    }

    #[test]
    fn identical_inputs_produce_identical_bytes() {
        let record = sample();
        let fetcher = fetcher_for(&record);
        let engine = engine();
        let first = engine.render(&record, &fetcher).expect("first");
        let second = engine.render(&record, &fetcher).expect("second");
        assert_eq!(first, second);
    }

    #[test]
    fn empty_photo_map_renders_without_fetching() {
        let mut record = sample();
        record.photo_urls = PhotoMap::new();
        let fetcher = MemoryImageFetcher::new();
        let (bytes, metrics) = engine()
            .render_with_metrics(&record, &fetcher)
            .expect("render");
        assert!(!bytes.is_empty());
        assert_eq!(fetcher.fetch_count(), 0);
        assert_eq!(metrics.images_requested, 0);
        assert!(
            all_text(&bytes)
                .iter()
                .flatten()
                .any(|run| run == sections::NO_PHOTO_LABEL)
        );
    }

    #[test]
    fn record_without_any_values_still_renders() {
        let record = ValuationRecord::from_json(r#"{"id": "blank"}"#).expect("record");
        let bytes = engine()
            .render(&record, &MemoryImageFetcher::new())
            .expect("render");
        let flat: Vec<String> = all_text(&bytes).into_iter().flatten().collect();
        assert!(flat.iter().any(|run| run == "-"));
        assert!(flat.iter().any(|run| run == "No remarks"));
    }

    #[test]
    fn failed_chassis_fetch_degrades_to_placeholder() {
        let record = sample();
        let chassis_url = record
            .photo_urls
            .get(sections::CHASSIS_PHOTO)
            .expect("chassis url")
            .trim()
            .to_string();
        let fetcher = fetcher_for(&record).with_status(chassis_url, 404);
        let (bytes, metrics) = engine()
            .render_with_metrics(&record, &fetcher)
            .expect("render");
        assert!(!bytes.is_empty());
        assert_eq!(metrics.images_failed, 1);
        assert_eq!(metrics.images_resolved, metrics.images_requested - 1);
    }

    #[test]
    fn metrics_cover_every_page() {
        let record = sample();
        let (bytes, metrics) = engine()
            .render_with_metrics(&record, &fetcher_for(&record))
            .expect("render");
        assert_eq!(metrics.total_bytes, bytes.len());
        assert_eq!(
            metrics.page_count(),
            inspect_pdf_bytes(&bytes).expect("inspect").page_count
        );
        assert!(metrics.pages.iter().all(|page| page.command_count > 0));
        let blocks: usize = metrics.pages.iter().map(|page| page.block_count).sum();
        // Split sections count once per page they touch.
        assert!(blocks >= 13);
        assert_eq!(metrics.images_requested, metrics.images_resolved);
    }

    #[test]
    fn cancelled_render_returns_no_bytes() {
        let record = sample();
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = engine()
            .render_with_cancel(&record, &fetcher_for(&record), &cancel)
            .expect_err("cancelled");
        assert!(matches!(err, ReportError::Cancelled));
    }

    struct CountingSource {
        inner: InMemorySource,
        lookups: AtomicUsize,
    }

    impl DocumentSource for CountingSource {
        fn lookup(&self, id: &str) -> Option<ValuationRecord> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.lookup(id)
        }
    }

    #[test]
    fn render_by_id_reports_missing_records() {
        let source = CountingSource {
            inner: InMemorySource::sample().expect("sample"),
            lookups: AtomicUsize::new(0),
        };
        let fetcher = MemoryImageFetcher::new();
        let err = engine()
            .render_by_id(&source, "nope", &fetcher)
            .expect_err("missing");
        assert!(matches!(err, ReportError::MissingRecord(ref id) if id == "nope"));
        assert_eq!(source.lookups.load(Ordering::SeqCst), 1);
        assert_eq!(fetcher.fetch_count(), 0);
    }

    #[test]
    fn render_by_id_renders_known_records() {
        let source = InMemorySource::sample().expect("sample");
        let record = sample();
        let bytes = engine()
            .render_by_id(&source, &record.id, &fetcher_for(&record))
            .expect("render");
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn builder_rejects_invalid_configuration() {
        let zero_grid = ReportEngine::builder().grid_columns(0).build();
        assert!(matches!(zero_grid, Err(ReportError::InvalidConfiguration(_))));

        let nan_margin = ReportEngine::builder().margin_all(f32::NAN).build();
        assert!(matches!(nan_margin, Err(ReportError::InvalidConfiguration(_))));

        let tiny_page = ReportEngine::builder()
            .page_size(Size::new(30.0, 30.0))
            .build();
        assert!(matches!(tiny_page, Err(ReportError::InvalidConfiguration(_))));

        let bad_asset = ReportEngine::builder()
            .asset_data_uri(AssetKind::Logo, "not a data uri")
            .build();
        assert!(matches!(bad_asset, Err(ReportError::Asset(_))));
    }

    #[test]
    fn template_assets_are_embedded() {
        let logo = base64::engine::general_purpose::STANDARD.encode(png(8, 8, 200));
        let engine = ReportEngine::builder()
            .asset_data_uri(AssetKind::Logo, format!("data:image/png;base64,{}", logo))
            .asset(AssetKind::Stamp, png(8, 8, 10))
            .build()
            .expect("engine");
        let mut record = sample();
        record.photo_urls = PhotoMap::new();
        let plain = ReportEngine::builder().build().expect("plain");
        let with_assets = engine
            .render(&record, &MemoryImageFetcher::new())
            .expect("render");
        let without = plain
            .render(&record, &MemoryImageFetcher::new())
            .expect("render");
        assert_eq!(image_objects(&without), 0);
        assert_eq!(image_objects(&with_assets), 2);
    }

    #[test]
    fn undecodable_photo_fails_serialization() {
        let mut record = ValuationRecord::new("broken");
        record
            .photo_urls
            .insert("Front", "https://cdn.example/front.gif");
        let fetcher =
            MemoryImageFetcher::new().with_image("https://cdn.example/front.gif", b"GIF89a".to_vec());
        let err = engine().render(&record, &fetcher).expect_err("gif");
        assert!(matches!(err, ReportError::Serialization(_)));
    }

    #[test]
    fn debug_log_records_render_summary() {
        let path = debug::temp_log_path("engine");
        let engine = ReportEngine::builder()
            .debug_log(&path)
            .build()
            .expect("engine");
        let record = sample();
        engine.render(&record, &fetcher_for(&record)).expect("render");
        let log = std::fs::read_to_string(&path).expect("read log");
        assert!(log.contains("\"type\":\"images.resolved\""));
        assert!(log.contains("\"type\":\"layout.page_break\""));
        assert!(log.contains("\"type\":\"render.summary\""));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn custom_grid_columns_change_row_count() {
        let record = sample();
        let mut images = ResolvedImageMap::new();
        for (name, _) in record.photo_urls.iter() {
            images.insert(name, Arc::<[u8]>::from(png(4, 4, 1)));
        }
        let engine = ReportEngine::builder().grid_columns(4).build().expect("engine");
        let document = engine.build_document(&record, &images).expect("document");
        let grid_section = document.section("photo_grid").expect("grid section");
        let mut rows = None;
        grid_section.node.walk(&mut |node| {
            if let LayoutNode::Grid(grid) = node {
                rows = Some(grid.row_count());
            }
        });
        assert_eq!(rows, Some(images.len().div_ceil(4)));
    }
}
