//! Page composer: stacks sections into one content column, paginates it and
//! decorates every page with the header and footer.

use crate::assets::AssetBundle;
use crate::canvas::{Canvas, Command, Document};
use crate::debug::DebugLogger;
use crate::error::{LayoutError, ReportError};
use crate::flow::Flow;
use crate::frame::{AddResult, Frame};
use crate::layout::LayoutNode;
use crate::metrics::PageMetrics;
use crate::page_template::{PageSetup, PageTemplate, with_page_numbers};
use crate::pdf::document_to_pdf;
use crate::types::Pt;
use serde_json::json;
use std::collections::VecDeque;

/// One named block of report content.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub name: String,
    pub node: LayoutNode,
}

impl Section {
    pub fn new(name: impl Into<String>, node: impl Into<LayoutNode>) -> Self {
        Self {
            name: name.into(),
            node: node.into(),
        }
    }
}

/// Header, ordered content sections and footer of a report. Built once and
/// not changed afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    header: LayoutNode,
    sections: Vec<Section>,
    footer: LayoutNode,
}

impl ReportDocument {
    pub fn header(&self) -> &LayoutNode {
        &self.header
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn footer(&self) -> &LayoutNode {
        &self.footer
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.name == name)
    }
}

pub fn compose(header: LayoutNode, sections: Vec<Section>, footer: LayoutNode) -> ReportDocument {
    ReportDocument {
        header,
        sections,
        footer,
    }
}

/// Lays out and serializes `document` to PDF bytes. Nothing is produced if
/// any part of the tree is invalid.
pub fn serialize(
    document: &ReportDocument,
    setup: &PageSetup,
    assets: &AssetBundle,
) -> Result<Vec<u8>, ReportError> {
    serialize_with(document, setup, assets, None).map(|(bytes, _)| bytes)
}

pub(crate) fn serialize_with(
    document: &ReportDocument,
    setup: &PageSetup,
    assets: &AssetBundle,
    debug: Option<&DebugLogger>,
) -> Result<(Vec<u8>, Vec<PageMetrics>), ReportError> {
    let (laid_out, pages) = layout(document, setup, assets, debug)?;
    let bytes = document_to_pdf(&laid_out, debug)?;
    Ok((bytes, pages))
}

fn check(node: &LayoutNode, name: &str, width: Pt, flow: &Flow<'_>) -> Result<(), LayoutError> {
    node.validate(name)?;
    flow.check_fit(node, width, name)
}

/// Paginates the content and decorates each finished page.
pub(crate) fn layout(
    document: &ReportDocument,
    setup: &PageSetup,
    assets: &AssetBundle,
    debug: Option<&DebugLogger>,
) -> Result<(Document, Vec<PageMetrics>), ReportError> {
    setup.validate()?;
    let flow = Flow::new(assets);
    let body = setup.body_rect();

    // Placeholders are filled before checking so the widest plausible page
    // numbers are what gets measured.
    let header = with_page_numbers(&document.header, 9999, 9999);
    let footer = with_page_numbers(&document.footer, 9999, 9999);
    check(&header, "header", body.width, &flow)?;
    check(&footer, "footer", body.width, &flow)?;

    let template = PageTemplate::new(document.header.clone(), document.footer.clone());
    let content = template.content_rect(setup, &flow)?;
    for section in &document.sections {
        check(&section.node, &section.name, content.width, &flow)?;
    }

    let mut canvas = Canvas::new(setup.size);
    let mut frame = Frame::new(content);
    let mut queue: VecDeque<(&str, LayoutNode)> = document
        .sections
        .iter()
        .map(|section| (section.name.as_str(), section.node.clone()))
        .collect();
    let mut block_counts: Vec<usize> = Vec::new();
    let mut blocks_on_page = 0usize;

    while let Some((name, node)) = queue.pop_front() {
        let reason = match frame.add(node, &flow, &mut canvas, debug) {
            AddResult::Placed => {
                blocks_on_page += 1;
                continue;
            }
            AddResult::Split(rest) => {
                blocks_on_page += 1;
                queue.push_front((name, rest));
                "split"
            }
            AddResult::Overflow(node) => {
                if frame.is_empty() {
                    return Err(LayoutError::new(name, "block cannot be placed on an empty page").into());
                }
                queue.push_front((name, node));
                "overflow"
            }
        };
        let from_page = block_counts.len() + 1;
        if let Some(logger) = debug {
            logger.event(
                "layout.page_break",
                json!({
                    "section": name,
                    "reason": reason,
                    "from_page": from_page,
                    "to_page": from_page + 1,
                }),
            );
            logger.increment("layout.page_break", 1);
        }
        block_counts.push(blocks_on_page);
        blocks_on_page = 0;
        canvas.show_page();
        frame = Frame::new(content);
    }
    block_counts.push(blocks_on_page);

    let mut laid_out = canvas.finish();
    let page_count = laid_out.pages.len();
    let mut metrics = Vec::with_capacity(page_count);
    for (idx, page) in laid_out.pages.iter_mut().enumerate() {
        let (mut commands, images) = template.decorate(idx + 1, page_count, setup, &flow);
        commands.append(&mut page.commands);
        page.commands = commands;
        laid_out.images.extend(images);
        metrics.push(PageMetrics {
            page_number: idx + 1,
            command_count: page.commands.len(),
            block_count: block_counts.get(idx).copied().unwrap_or(0),
            image_count: page
                .commands
                .iter()
                .filter(|c| matches!(c, Command::DrawImage { .. }))
                .count(),
        });
    }
    Ok((laid_out, metrics))
}
