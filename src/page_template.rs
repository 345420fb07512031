use crate::canvas::{Canvas, Command};
use crate::error::ReportError;
use crate::flow::Flow;
use crate::layout::LayoutNode;
use crate::types::{Margins, Pt, Rect, Size};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const PAGE_PLACEHOLDER: &str = "{page}";
pub const PAGES_PLACEHOLDER: &str = "{pages}";

/// Page geometry shared by every page of a report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSetup {
    pub size: Size,
    pub margins: Margins,
    /// Gap kept between the header, the content and the footer.
    pub content_padding: Pt,
}

impl Default for PageSetup {
    fn default() -> Self {
        Self {
            size: Size::a4(),
            margins: Margins::all(20.0),
            content_padding: Pt::from_f32(10.0),
        }
    }
}

impl PageSetup {
    pub fn validate(&self) -> Result<(), ReportError> {
        if !self.size.width.is_positive() || !self.size.height.is_positive() {
            return Err(ReportError::InvalidConfiguration(
                "page size must be positive".to_string(),
            ));
        }
        let margins = [
            self.margins.top,
            self.margins.right,
            self.margins.bottom,
            self.margins.left,
        ];
        if margins.iter().any(|m| *m < Pt::ZERO) || self.content_padding < Pt::ZERO {
            return Err(ReportError::InvalidConfiguration(
                "margins and content padding must not be negative".to_string(),
            ));
        }
        if self.margins.horizontal() >= self.size.width
            || self.margins.vertical() >= self.size.height
        {
            return Err(ReportError::InvalidConfiguration(format!(
                "margins leave no room on a {}x{}pt page",
                self.size.width.to_f32(),
                self.size.height.to_f32()
            )));
        }
        Ok(())
    }

    /// The page inside its margins.
    pub fn body_rect(&self) -> Rect {
        Rect {
            x: Pt::ZERO,
            y: Pt::ZERO,
            width: self.size.width,
            height: self.size.height,
        }
        .inset(self.margins)
    }
}

/// Header and footer drawn on every page, with `{page}` and `{pages}`
/// filled in per page.
#[derive(Debug, Clone)]
pub struct PageTemplate {
    header: LayoutNode,
    footer: LayoutNode,
}

impl PageTemplate {
    pub fn new(header: LayoutNode, footer: LayoutNode) -> Self {
        Self { header, footer }
    }

    /// Area left for flowing content once header, footer and padding are
    /// taken out of the body.
    pub fn content_rect(&self, setup: &PageSetup, flow: &Flow<'_>) -> Result<Rect, ReportError> {
        let body = setup.body_rect();
        let header_h = flow.measure(&self.header, body.width);
        let footer_h = flow.measure(&self.footer, body.width);
        let top = header_h + setup.content_padding;
        let used = top + setup.content_padding + footer_h;
        if used >= body.height {
            return Err(ReportError::InvalidConfiguration(format!(
                "header and footer ({}pt) leave no room for content on a {}pt body",
                used.to_f32(),
                body.height.to_f32()
            )));
        }
        Ok(Rect {
            x: body.x,
            y: body.y + top,
            width: body.width,
            height: body.height - used,
        })
    }

    /// Header and footer commands for one page, wrapped in a save/restore
    /// pair, plus the images they register.
    pub(crate) fn decorate(
        &self,
        page_number: usize,
        page_count: usize,
        setup: &PageSetup,
        flow: &Flow<'_>,
    ) -> (Vec<Command>, BTreeMap<String, Arc<[u8]>>) {
        let body = setup.body_rect();
        let mut scratch = Canvas::new(setup.size);
        scratch.save_state();

        let header = with_page_numbers(&self.header, page_number, page_count);
        flow.draw(&header, &mut scratch, body.x, body.y, body.width);

        let footer = with_page_numbers(&self.footer, page_number, page_count);
        let footer_h = flow.measure(&footer, body.width);
        flow.draw(
            &footer,
            &mut scratch,
            body.x,
            body.y + body.height - footer_h,
            body.width,
        );

        scratch.restore_state();
        (scratch.take_current(), scratch.take_images())
    }
}

/// Copy of `node` with page placeholders replaced in every text span.
pub fn with_page_numbers(node: &LayoutNode, page_number: usize, page_count: usize) -> LayoutNode {
    let mut node = node.clone();
    fill(&mut node, &page_number.to_string(), &page_count.to_string());
    node
}

fn fill(node: &mut LayoutNode, page: &str, pages: &str) {
    match node {
        LayoutNode::Text(text) => {
            for span in &mut text.spans {
                if span.text.contains('{') {
                    span.text = span
                        .text
                        .replace(PAGE_PLACEHOLDER, page)
                        .replace(PAGES_PLACEHOLDER, pages);
                }
            }
        }
        LayoutNode::Row(row) => row.slots.iter_mut().for_each(|s| fill(&mut s.node, page, pages)),
        LayoutNode::Column(column) => column
            .slots
            .iter_mut()
            .for_each(|s| fill(&mut s.node, page, pages)),
        LayoutNode::Grid(grid) => grid
            .children
            .iter_mut()
            .for_each(|child| fill(child, page, pages)),
        LayoutNode::Table(table) => {
            for row in table.header.iter_mut().chain(table.rows.iter_mut()) {
                row.cells
                    .iter_mut()
                    .for_each(|cell| fill(&mut cell.node, page, pages));
            }
        }
        LayoutNode::Image(image) => {
            if let Some(overlay) = image.overlay.as_deref_mut() {
                fill(overlay, page, pages);
            }
        }
        LayoutNode::Spacer(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetBundle;
    use crate::layout::{Column, Text, TextStyle};

    #[test]
    fn default_setup_is_a4_with_twenty_point_margins() {
        let setup = PageSetup::default();
        setup.validate().expect("valid");
        let body = setup.body_rect();
        assert_eq!(body.x, Pt::from_f32(20.0));
        assert_eq!(body.width, Pt::from_f32(555.28));
        assert_eq!(body.height, Pt::from_f32(801.89));
    }

    #[test]
    fn margins_wider_than_page_are_rejected() {
        let setup = PageSetup {
            size: Size::new(100.0, 100.0),
            margins: Margins::all(50.0),
            content_padding: Pt::ZERO,
        };
        assert!(matches!(
            setup.validate(),
            Err(ReportError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn placeholders_are_filled_in_nested_text() {
        let footer: LayoutNode = Column::new()
            .item(Text::new("Page {page} of {pages}", TextStyle::sized(9.0)))
            .into();
        let LayoutNode::Column(filled) = with_page_numbers(&footer, 2, 5) else {
            panic!("column");
        };
        let LayoutNode::Text(text) = &filled.slots[0].node else {
            panic!("text");
        };
        assert_eq!(text.plain_text(), "Page 2 of 5");
    }

    #[test]
    fn content_rect_sits_between_header_and_footer() {
        let assets = AssetBundle::new();
        let flow = Flow::new(&assets);
        let template = PageTemplate::new(
            Text::new("HEADER", TextStyle::sized(10.0)).into(),
            Text::new("FOOTER", TextStyle::sized(10.0)).into(),
        );
        let setup = PageSetup::default();
        let rect = template.content_rect(&setup, &flow).expect("rect");
        // 12pt line each for header and footer, 10pt padding on both sides.
        assert_eq!(rect.y, Pt::from_f32(42.0));
        assert_eq!(rect.height, Pt::from_f32(801.89 - 44.0));
    }

    #[test]
    fn decoration_is_wrapped_in_save_restore() {
        let assets = AssetBundle::new();
        let flow = Flow::new(&assets);
        let template = PageTemplate::new(
            Text::new("HEADER", TextStyle::sized(10.0)).into(),
            Text::new("{page}/{pages}", TextStyle::sized(10.0)).into(),
        );
        let (commands, images) = template.decorate(3, 4, &PageSetup::default(), &flow);
        assert!(images.is_empty());
        assert!(matches!(commands.first(), Some(Command::SaveState)));
        assert!(matches!(commands.last(), Some(Command::RestoreState)));
        assert!(
            commands
                .iter()
                .any(|c| matches!(c, Command::DrawString { text, .. } if text == "3/4"))
        );
    }
}
