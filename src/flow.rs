//! Measuring, drawing and splitting of [`LayoutNode`] trees.
//!
//! Every operation is one exhaustive match over the node kinds. Lengths are
//! converted to [`Pt`] on entry; trees are expected to have passed
//! [`LayoutNode::validate`] and [`Flow::check_fit`] first, so these routines
//! clamp instead of failing.

use crate::assets::AssetBundle;
use crate::canvas::Canvas;
use crate::error::LayoutError;
use crate::layout::{
    BoxStyle, Column, Grid, HAlign, Image, ImageSource, LayoutNode, Row, Scaling, Sizing, Slot,
    Table, TableRow, Text, TextSpan, VAlign,
};
use crate::measure::{FontFace, Line, Run, break_lines, text_width};
use crate::types::{Pt, palette};
use std::io::Cursor;
use std::sync::Arc;

fn pt(value: f32) -> Pt {
    Pt::from_f32(value)
}

// Widths are compared with a little slack so rounding in relative shares
// never trips the fixed-width check.
const FIT_TOLERANCE_MILLI: i64 = 10;

const UNBOUNDED: f32 = 1.0e6;

#[derive(Debug, Clone, Copy)]
struct Insets {
    top: Pt,
    right: Pt,
    bottom: Pt,
    left: Pt,
}

impl Insets {
    fn of(style: &BoxStyle) -> Self {
        let border = style.border.map(|b| pt(b.width)).unwrap_or(Pt::ZERO);
        Self {
            top: pt(style.padding.top) + border,
            right: pt(style.padding.right) + border,
            bottom: pt(style.padding.bottom) + border,
            left: pt(style.padding.left) + border,
        }
    }

    fn horizontal(&self) -> Pt {
        self.left + self.right
    }

    fn vertical(&self) -> Pt {
        self.top + self.bottom
    }
}

fn style_of(node: &LayoutNode) -> BoxStyle {
    node.box_style().copied().unwrap_or_default()
}

fn align_offset(free: Pt, align: HAlign) -> Pt {
    let free = free.max(Pt::ZERO);
    match align {
        HAlign::Start => Pt::ZERO,
        HAlign::Center => free / 2.0,
        HAlign::End => free,
    }
}

fn v_align_offset(free: Pt, align: VAlign) -> Pt {
    let free = free.max(Pt::ZERO);
    match align {
        VAlign::Top => Pt::ZERO,
        VAlign::Middle => free / 2.0,
        VAlign::Bottom => free,
    }
}

fn gaps(spacing: f32, count: usize) -> Pt {
    if count < 2 {
        return Pt::ZERO;
    }
    pt(spacing) * (count - 1) as f32
}

fn text_runs(text: &Text) -> Vec<Run<'_>> {
    text.spans
        .iter()
        .enumerate()
        .map(|(key, span)| Run {
            key,
            face: FontFace::from_style(span.style.bold, span.style.italic),
            font_size: pt(span.style.size),
            text: span.text.as_str(),
        })
        .collect()
}

/// Rebuilds a text node holding exactly `lines`, one hard break per line.
fn text_from_lines(text: &Text, lines: &[Line]) -> Text {
    let base = text.spans.first().map(|s| s.style).unwrap_or_default();
    let mut spans: Vec<TextSpan> = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        if idx > 0 {
            match spans.last_mut() {
                Some(last) => last.text.push('\n'),
                None => spans.push(TextSpan::new("\n", base)),
            }
        }
        for fragment in &line.fragments {
            let style = text
                .spans
                .get(fragment.key)
                .map(|s| s.style)
                .unwrap_or(base);
            spans.push(TextSpan::new(fragment.text.clone(), style));
        }
    }
    Text {
        style: BoxStyle {
            height: None,
            ..text.style
        },
        spans,
        align: text.align,
        link: text.link.clone(),
    }
}

fn image_aspect(data: Option<&Arc<[u8]>>) -> f32 {
    let dims = data.and_then(|bytes| {
        image::ImageReader::new(Cursor::new(bytes.as_ref()))
            .with_guessed_format()
            .ok()?
            .into_dimensions()
            .ok()
    });
    match dims {
        Some((w, h)) if w > 0 && h > 0 => w as f32 / h as f32,
        _ => 1.0,
    }
}

/// Resolves slot widths: fixed and auto first, then relative weights
/// share what is left.
fn distribute(sizings: &[(Sizing, Option<Pt>)], spacing: Pt, inner: Pt) -> Vec<Pt> {
    let mut widths = vec![Pt::ZERO; sizings.len()];
    let mut committed = spacing;
    let mut total_weight = 0.0f32;
    for (idx, (sizing, intrinsic)) in sizings.iter().enumerate() {
        match sizing {
            Sizing::Fixed(v) => {
                widths[idx] = pt(*v);
                committed += widths[idx];
            }
            Sizing::Auto => match intrinsic {
                Some(w) => {
                    widths[idx] = (*w).min((inner - committed).max(Pt::ZERO));
                    committed += widths[idx];
                }
                None => total_weight += 1.0,
            },
            Sizing::Relative(w) => total_weight += *w,
        }
    }
    let remaining = (inner - committed).max(Pt::ZERO);
    if total_weight > 0.0 {
        for (idx, (sizing, intrinsic)) in sizings.iter().enumerate() {
            let weight = match (sizing, intrinsic) {
                (Sizing::Relative(w), _) => *w,
                (Sizing::Auto, None) => 1.0,
                _ => continue,
            };
            widths[idx] = remaining * (weight / total_weight);
        }
    }
    widths
}

/// Layout operations over a node tree, with template assets in scope.
pub struct Flow<'a> {
    assets: &'a AssetBundle,
}

impl<'a> Flow<'a> {
    pub fn new(assets: &'a AssetBundle) -> Self {
        Self { assets }
    }

    fn image_size(&self, image: &Image, avail: Pt) -> (Pt, Pt) {
        let aspect = image_aspect(self.source_bytes(&image.source));
        match (image.width, image.height) {
            (Some(w), Some(h)) => (pt(w).min(avail), pt(h)),
            (Some(w), None) => {
                let w = pt(w).min(avail);
                (w, w / aspect)
            }
            (None, Some(h)) => {
                let h = pt(h);
                match image.scaling {
                    Scaling::FitHeight => ((h * aspect).min(avail), h),
                    Scaling::FitWidth | Scaling::FitArea => (avail, h),
                }
            }
            (None, None) => (avail, avail / aspect),
        }
    }

    fn source_bytes<'s>(&self, source: &'s ImageSource) -> Option<&'s Arc<[u8]>>
    where
        'a: 's,
    {
        match source {
            ImageSource::Inline(data) => Some(data),
            ImageSource::Asset(kind) => self.assets.get(*kind),
            ImageSource::Placeholder { .. } => None,
        }
    }

    fn column_widths(&self, table: &Table, inner: Pt) -> Vec<Pt> {
        let sizings: Vec<(Sizing, Option<Pt>)> = table
            .columns
            .iter()
            .map(|column| (column.sizing(), None))
            .collect();
        distribute(&sizings, Pt::ZERO, inner)
    }

    fn slot_widths(&self, row: &Row, inner: Pt) -> Vec<Pt> {
        let sizings: Vec<(Sizing, Option<Pt>)> = row
            .slots
            .iter()
            .map(|slot| {
                let intrinsic = match slot.sizing {
                    Sizing::Auto => self.intrinsic_width(&slot.node),
                    _ => None,
                };
                (slot.sizing, intrinsic)
            })
            .collect();
        distribute(&sizings, gaps(row.spacing, row.slots.len()), inner)
    }

    fn grid_cell_width(&self, grid: &Grid, inner: Pt) -> Pt {
        let columns = grid.columns.max(1);
        ((inner - gaps(grid.spacing, columns)) / columns as f32).max(Pt::ZERO)
    }

    /// Width the node occupies when offered `avail`.
    pub fn outer_width(&self, node: &LayoutNode, avail: Pt) -> Pt {
        let style = style_of(node);
        let width = match style.max_width {
            Some(max) => avail.min(pt(max)),
            None => avail,
        };
        match node {
            LayoutNode::Image(image) if image.width.is_some() || image.height.is_some() => {
                let insets = Insets::of(&style);
                let (w, _) = self.image_size(image, (width - insets.horizontal()).max(Pt::ZERO));
                (w + insets.horizontal()).min(width)
            }
            _ => width,
        }
    }

    /// Natural width for `Auto` slots; `None` when the node fills whatever
    /// it is given.
    pub fn intrinsic_width(&self, node: &LayoutNode) -> Option<Pt> {
        let style = style_of(node);
        let insets = Insets::of(&style);
        let content = match node {
            LayoutNode::Text(text) => {
                let runs = text_runs(text);
                break_lines(&runs, pt(UNBOUNDED))
                    .iter()
                    .map(|line| line.width)
                    .max()
                    .unwrap_or(Pt::ZERO)
            }
            LayoutNode::Image(image) => {
                let aspect = image_aspect(self.source_bytes(&image.source));
                match (image.width, image.height, image.scaling) {
                    (Some(w), _, _) => pt(w),
                    (None, Some(h), Scaling::FitHeight) => pt(h) * aspect,
                    _ => return None,
                }
            }
            LayoutNode::Spacer(_) => Pt::ZERO,
            LayoutNode::Row(row) => {
                let mut total = gaps(row.spacing, row.slots.len());
                for slot in &row.slots {
                    total += match slot.sizing {
                        Sizing::Fixed(v) => pt(v),
                        _ => self.intrinsic_width(&slot.node)?,
                    };
                }
                total
            }
            LayoutNode::Column(column) => {
                let mut widest = Pt::ZERO;
                for slot in &column.slots {
                    widest = widest.max(self.intrinsic_width(&slot.node)?);
                }
                widest
            }
            LayoutNode::Grid(_) | LayoutNode::Table(_) => return None,
        };
        let width = content + insets.horizontal();
        Some(match style.max_width {
            Some(max) => width.min(pt(max)),
            None => width,
        })
    }

    /// Outer height of the node laid out in `avail` width.
    pub fn measure(&self, node: &LayoutNode, avail: Pt) -> Pt {
        let style = style_of(node);
        if let Some(height) = style.height {
            return pt(height);
        }
        let insets = Insets::of(&style);
        let inner = (self.outer_width(node, avail) - insets.horizontal()).max(Pt::ZERO);
        self.content_height(node, inner) + insets.vertical()
    }

    fn content_height(&self, node: &LayoutNode, inner: Pt) -> Pt {
        match node {
            LayoutNode::Row(row) => {
                let widths = self.slot_widths(row, inner);
                row.slots
                    .iter()
                    .zip(widths)
                    .map(|(slot, w)| self.measure(&slot.node, w))
                    .max()
                    .unwrap_or(Pt::ZERO)
            }
            LayoutNode::Column(column) => {
                let items: Pt = column
                    .slots
                    .iter()
                    .map(|slot| self.slot_height(slot, inner))
                    .sum();
                items + gaps(column.spacing, column.slots.len())
            }
            LayoutNode::Grid(grid) => {
                let heights = self.grid_row_heights(grid, inner);
                let rows = heights.len();
                heights.into_iter().sum::<Pt>() + gaps(grid.spacing, rows)
            }
            LayoutNode::Table(table) => {
                let widths = self.column_widths(table, inner);
                table
                    .header
                    .iter()
                    .chain(table.rows.iter())
                    .map(|row| self.table_row_height(row, &widths))
                    .sum()
            }
            LayoutNode::Text(text) => break_lines(&text_runs(text), inner)
                .iter()
                .map(|line| line.height)
                .sum(),
            LayoutNode::Image(image) => self.image_size(image, inner).1,
            LayoutNode::Spacer(spacer) => pt(spacer.height),
        }
    }

    fn slot_height(&self, slot: &Slot, inner: Pt) -> Pt {
        match slot.sizing {
            Sizing::Fixed(h) => pt(h),
            Sizing::Relative(_) | Sizing::Auto => self.measure(&slot.node, inner),
        }
    }

    fn grid_row_heights(&self, grid: &Grid, inner: Pt) -> Vec<Pt> {
        let cell_width = self.grid_cell_width(grid, inner);
        grid.children
            .chunks(grid.columns.max(1))
            .map(|chunk| {
                chunk
                    .iter()
                    .map(|child| self.measure(child, cell_width))
                    .max()
                    .unwrap_or(Pt::ZERO)
            })
            .collect()
    }

    fn spanned_widths(row: &TableRow, widths: &[Pt]) -> Vec<Pt> {
        let mut column = 0usize;
        row.cells
            .iter()
            .map(|cell| {
                let end = (column + cell.span).min(widths.len());
                let width = widths[column.min(end)..end].iter().copied().sum();
                column = end;
                width
            })
            .collect()
    }

    fn table_row_height(&self, row: &TableRow, widths: &[Pt]) -> Pt {
        row.cells
            .iter()
            .zip(Self::spanned_widths(row, widths))
            .map(|(cell, w)| self.measure(&cell.node, w))
            .max()
            .unwrap_or(Pt::ZERO)
    }

    /// Draws the node with its top-left corner at (`x`, `y`).
    pub fn draw(&self, node: &LayoutNode, canvas: &mut Canvas, x: Pt, y: Pt, avail: Pt) {
        let style = style_of(node);
        let width = self.outer_width(node, avail);
        let height = self.measure(node, avail);
        if let Some(background) = style.background {
            canvas.set_fill_color(background);
            canvas.draw_rect(x, y, width, height);
        }
        let insets = Insets::of(&style);
        let inner_w = (width - insets.horizontal()).max(Pt::ZERO);
        let inner_h = (height - insets.vertical()).max(Pt::ZERO);
        self.draw_content(node, canvas, x + insets.left, y + insets.top, inner_w, inner_h);
        if let Some(border) = style.border {
            let stroke = pt(border.width);
            if stroke.is_positive() {
                canvas.set_stroke_color(border.color);
                canvas.set_line_width(stroke);
                let half = stroke / 2.0;
                canvas.stroke_rect(x + half, y + half, width - stroke, height - stroke);
            }
        }
        let link = match node {
            LayoutNode::Text(text) => text.link.as_deref(),
            LayoutNode::Image(image) => image.link.as_deref(),
            _ => None,
        };
        if let Some(uri) = link {
            canvas.link_area(x, y, width, height, uri);
        }
    }

    fn draw_content(
        &self,
        node: &LayoutNode,
        canvas: &mut Canvas,
        x: Pt,
        y: Pt,
        inner_w: Pt,
        inner_h: Pt,
    ) {
        match node {
            LayoutNode::Row(row) => {
                let widths = self.slot_widths(row, inner_w);
                let mut cursor = x;
                for (slot, slot_w) in row.slots.iter().zip(widths) {
                    let node_w = self.outer_width(&slot.node, slot_w);
                    let node_h = self.measure(&slot.node, slot_w);
                    let dx = align_offset(slot_w - node_w, slot.h_align);
                    let dy = v_align_offset(inner_h - node_h, slot.v_align);
                    self.draw(&slot.node, canvas, cursor + dx, y + dy, slot_w);
                    cursor += slot_w + pt(row.spacing);
                }
            }
            LayoutNode::Column(column) => {
                let mut cursor = y;
                for slot in &column.slots {
                    let slot_h = self.slot_height(slot, inner_w);
                    let node_w = self.outer_width(&slot.node, inner_w);
                    let dx = align_offset(inner_w - node_w, slot.h_align);
                    self.draw(&slot.node, canvas, x + dx, cursor, inner_w);
                    cursor += slot_h + pt(column.spacing);
                }
            }
            LayoutNode::Grid(grid) => {
                let cell_w = self.grid_cell_width(grid, inner_w);
                let heights = self.grid_row_heights(grid, inner_w);
                let mut cursor = y;
                for (chunk, row_h) in grid.children.chunks(grid.columns.max(1)).zip(heights) {
                    for (idx, child) in chunk.iter().enumerate() {
                        let cx = x + (cell_w + pt(grid.spacing)) * idx as f32;
                        self.draw(child, canvas, cx, cursor, cell_w);
                    }
                    cursor += row_h + pt(grid.spacing);
                }
            }
            LayoutNode::Table(table) => {
                let widths = self.column_widths(table, inner_w);
                let mut cursor = y;
                for row in table.header.iter().chain(table.rows.iter()) {
                    let row_h = self.table_row_height(row, &widths);
                    let mut cx = x;
                    for (cell, cell_w) in row.cells.iter().zip(Self::spanned_widths(row, &widths)) {
                        if let Some(background) = cell.background {
                            canvas.set_fill_color(background);
                            canvas.draw_rect(cx, cursor, cell_w, row_h);
                        }
                        self.draw(&cell.node, canvas, cx, cursor, cell_w);
                        cx += cell_w;
                    }
                    cursor += row_h;
                }
            }
            LayoutNode::Text(text) => self.draw_text(text, canvas, x, y, inner_w),
            LayoutNode::Image(image) => self.draw_image(image, canvas, x, y, inner_w),
            LayoutNode::Spacer(spacer) => {
                if let Some(color) = spacer.rule {
                    canvas.set_fill_color(color);
                    canvas.draw_rect(x, y, inner_w, pt(spacer.height));
                }
            }
        }
    }

    fn draw_text(&self, text: &Text, canvas: &mut Canvas, x: Pt, y: Pt, inner_w: Pt) {
        let lines = break_lines(&text_runs(text), inner_w);
        let mut cursor = y;
        for line in &lines {
            let dx = align_offset(inner_w - line.width, text.align);
            let leading = (line.height - line.font_size) / 2.0;
            for fragment in &line.fragments {
                let Some(span) = text.spans.get(fragment.key) else {
                    continue;
                };
                let size = pt(span.style.size);
                let face = FontFace::from_style(span.style.bold, span.style.italic);
                canvas.set_font(face.base_font(), size);
                canvas.set_fill_color(span.style.color);
                canvas.draw_string(
                    x + dx + fragment.offset,
                    cursor + leading + (line.font_size - size),
                    fragment.text.clone(),
                );
            }
            cursor += line.height;
        }
    }

    fn draw_image(&self, image: &Image, canvas: &mut Canvas, x: Pt, y: Pt, inner_w: Pt) {
        let (w, h) = self.image_size(image, inner_w);
        match self.source_bytes(&image.source) {
            Some(data) => {
                let aspect = image_aspect(Some(data));
                let (mut draw_w, mut draw_h) = (w, w / aspect);
                if draw_h > h {
                    draw_h = h;
                    draw_w = h * aspect;
                }
                let resource_id = canvas.register_image(data);
                canvas.draw_image(
                    x + (w - draw_w) / 2.0,
                    y + (h - draw_h) / 2.0,
                    draw_w,
                    draw_h,
                    resource_id,
                );
            }
            None => {
                canvas.set_fill_color(palette::GREY_LIGHTEN5);
                canvas.draw_rect(x, y, w, h);
                canvas.set_stroke_color(palette::GREY_MEDIUM);
                canvas.set_line_width(pt(1.0));
                canvas.stroke_rect(x, y, w, h);
                if let ImageSource::Placeholder { label: Some(label) } = &image.source {
                    let size = pt(10.0);
                    let face = FontFace::Bold;
                    let label_w = text_width(face, size, label);
                    canvas.set_font(face.base_font(), size);
                    canvas.set_fill_color(palette::GREY_DARKEN2);
                    canvas.draw_string(
                        x + align_offset(w - label_w, HAlign::Center),
                        y + (h - size) / 2.0,
                        label.clone(),
                    );
                }
            }
        }
        if let Some(overlay) = &image.overlay {
            let overlay_h = self.measure(overlay, w);
            self.draw(overlay, canvas, x, y + (h - overlay_h).max(Pt::ZERO), w);
        }
    }

    /// Splits the node so that the first part fits in `avail_h`. `None` when
    /// the node is atomic or not even its first child, row or line fits.
    pub fn split(
        &self,
        node: &LayoutNode,
        avail_w: Pt,
        avail_h: Pt,
    ) -> Option<(LayoutNode, LayoutNode)> {
        let style = style_of(node);
        if style.height.is_some() {
            return None;
        }
        let insets = Insets::of(&style);
        let inner_w = (self.outer_width(node, avail_w) - insets.horizontal()).max(Pt::ZERO);
        let inner_h = avail_h - insets.vertical();
        if inner_h <= Pt::ZERO {
            return None;
        }
        match node {
            LayoutNode::Column(column) => self.split_column(column, inner_w, inner_h),
            LayoutNode::Table(table) => self.split_table(table, inner_w, inner_h),
            LayoutNode::Grid(grid) => self.split_grid(grid, inner_w, inner_h),
            LayoutNode::Text(text) => {
                let lines = break_lines(&text_runs(text), inner_w);
                let mut used = Pt::ZERO;
                let mut fit = 0usize;
                for line in &lines {
                    if used + line.height > inner_h {
                        break;
                    }
                    used += line.height;
                    fit += 1;
                }
                if fit == 0 || fit >= lines.len() {
                    return None;
                }
                Some((
                    text_from_lines(text, &lines[..fit]).into(),
                    text_from_lines(text, &lines[fit..]).into(),
                ))
            }
            LayoutNode::Row(_) | LayoutNode::Image(_) | LayoutNode::Spacer(_) => None,
        }
    }

    fn split_column(
        &self,
        column: &Column,
        inner_w: Pt,
        inner_h: Pt,
    ) -> Option<(LayoutNode, LayoutNode)> {
        let part = |slots: Vec<Slot>| -> LayoutNode {
            Column {
                style: BoxStyle {
                    height: None,
                    ..column.style
                },
                spacing: column.spacing,
                slots,
            }
            .into()
        };
        let mut used = Pt::ZERO;
        for (idx, slot) in column.slots.iter().enumerate() {
            let gap = if idx > 0 { pt(column.spacing) } else { Pt::ZERO };
            let height = self.slot_height(slot, inner_w);
            if used + gap + height <= inner_h {
                used += gap + height;
                continue;
            }
            let remaining = inner_h - used - gap;
            let child_split = match slot.sizing {
                Sizing::Fixed(_) => None,
                _ if remaining > Pt::ZERO => self.split(&slot.node, inner_w, remaining),
                _ => None,
            };
            if let Some((first, rest)) = child_split {
                let mut head: Vec<Slot> = column.slots[..idx].to_vec();
                head.push(Slot {
                    node: first,
                    ..slot.clone()
                });
                let mut tail = vec![Slot {
                    node: rest,
                    ..slot.clone()
                }];
                tail.extend_from_slice(&column.slots[idx + 1..]);
                return Some((part(head), part(tail)));
            }
            if idx == 0 {
                return None;
            }
            return Some((
                part(column.slots[..idx].to_vec()),
                part(column.slots[idx..].to_vec()),
            ));
        }
        None
    }

    fn split_table(
        &self,
        table: &Table,
        inner_w: Pt,
        inner_h: Pt,
    ) -> Option<(LayoutNode, LayoutNode)> {
        let widths = self.column_widths(table, inner_w);
        let header_h = table
            .header
            .as_ref()
            .map(|row| self.table_row_height(row, &widths))
            .unwrap_or(Pt::ZERO);
        let mut used = header_h;
        let mut fit = 0usize;
        for row in &table.rows {
            let height = self.table_row_height(row, &widths);
            if used + height > inner_h {
                break;
            }
            used += height;
            fit += 1;
        }
        if fit == 0 || fit >= table.rows.len() {
            return None;
        }
        let part = |rows: &[TableRow]| -> LayoutNode {
            Table {
                style: BoxStyle {
                    height: None,
                    ..table.style
                },
                columns: table.columns.clone(),
                header: table.header.clone(),
                rows: rows.to_vec(),
            }
            .into()
        };
        Some((part(&table.rows[..fit]), part(&table.rows[fit..])))
    }

    fn split_grid(&self, grid: &Grid, inner_w: Pt, inner_h: Pt) -> Option<(LayoutNode, LayoutNode)> {
        let heights = self.grid_row_heights(grid, inner_w);
        let mut used = Pt::ZERO;
        let mut fit = 0usize;
        for (idx, height) in heights.iter().enumerate() {
            let gap = if idx > 0 { pt(grid.spacing) } else { Pt::ZERO };
            if used + gap + *height > inner_h {
                break;
            }
            used += gap + *height;
            fit += 1;
        }
        if fit == 0 || fit >= heights.len() {
            return None;
        }
        let boundary = fit * grid.columns.max(1);
        let part = |children: &[LayoutNode]| -> LayoutNode {
            Grid {
                style: BoxStyle {
                    height: None,
                    ..grid.style
                },
                columns: grid.columns,
                spacing: grid.spacing,
                children: children.to_vec(),
            }
            .into()
        };
        Some((
            part(&grid.children[..boundary]),
            part(&grid.children[boundary..]),
        ))
    }

    /// Checks that every fixed width in the tree fits the width it will be
    /// laid out in.
    pub fn check_fit(&self, node: &LayoutNode, avail: Pt, path: &str) -> Result<(), LayoutError> {
        let style = style_of(node);
        let insets = Insets::of(&style);
        let width = self.outer_width(node, avail);
        if exceeds(insets.horizontal(), width) {
            return Err(LayoutError::new(
                path,
                format!(
                    "padding and border ({}pt) exceed the available width ({}pt)",
                    insets.horizontal().to_f32(),
                    width.to_f32()
                ),
            ));
        }
        let inner = (width - insets.horizontal()).max(Pt::ZERO);
        match node {
            LayoutNode::Row(row) => {
                let fixed: Pt = row
                    .slots
                    .iter()
                    .map(|slot| match slot.sizing {
                        Sizing::Fixed(v) => pt(v),
                        _ => Pt::ZERO,
                    })
                    .sum::<Pt>()
                    + gaps(row.spacing, row.slots.len());
                if exceeds(fixed, inner) {
                    return Err(over_committed(path, fixed, inner));
                }
                let widths = self.slot_widths(row, inner);
                for (idx, (slot, w)) in row.slots.iter().zip(widths).enumerate() {
                    self.check_fit(&slot.node, w, &format!("{}/slot[{}]", path, idx))?;
                }
            }
            LayoutNode::Column(column) => {
                for (idx, slot) in column.slots.iter().enumerate() {
                    self.check_fit(&slot.node, inner, &format!("{}/item[{}]", path, idx))?;
                }
            }
            LayoutNode::Grid(grid) => {
                let spacing = gaps(grid.spacing, grid.columns);
                if exceeds(spacing, inner) {
                    return Err(over_committed(path, spacing, inner));
                }
                let cell_w = self.grid_cell_width(grid, inner);
                for (idx, child) in grid.children.iter().enumerate() {
                    self.check_fit(child, cell_w, &format!("{}/cell[{}]", path, idx))?;
                }
            }
            LayoutNode::Table(table) => {
                let fixed: Pt = table
                    .columns
                    .iter()
                    .map(|column| match column.sizing() {
                        Sizing::Fixed(v) => pt(v),
                        _ => Pt::ZERO,
                    })
                    .sum();
                if exceeds(fixed, inner) {
                    return Err(over_committed(path, fixed, inner));
                }
                let widths = self.column_widths(table, inner);
                let rows = table
                    .header
                    .iter()
                    .map(|row| ("header".to_string(), row))
                    .chain(
                        table
                            .rows
                            .iter()
                            .enumerate()
                            .map(|(idx, row)| (format!("row[{}]", idx), row)),
                    );
                for (label, row) in rows {
                    for (idx, (cell, w)) in row
                        .cells
                        .iter()
                        .zip(Self::spanned_widths(row, &widths))
                        .enumerate()
                    {
                        self.check_fit(&cell.node, w, &format!("{}/{}/cell[{}]", path, label, idx))?;
                    }
                }
            }
            LayoutNode::Image(image) => {
                if let Some(overlay) = &image.overlay {
                    let (w, _) = self.image_size(image, inner);
                    self.check_fit(overlay, w, &format!("{}/overlay", path))?;
                }
            }
            LayoutNode::Text(_) | LayoutNode::Spacer(_) => {}
        }
        Ok(())
    }
}

fn exceeds(used: Pt, avail: Pt) -> bool {
    used.to_milli_i64() > avail.to_milli_i64() + FIT_TOLERANCE_MILLI
}

fn over_committed(path: &str, fixed: Pt, avail: Pt) -> LayoutError {
    LayoutError::new(
        path,
        format!(
            "fixed widths ({}pt) exceed the available width ({}pt)",
            fixed.to_f32(),
            avail.to_f32()
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Command;
    use crate::layout::{ColumnWidth, Spacer, TableBuilder, TableCell, TextStyle};
    use crate::types::{Color, Size};

    fn text(value: &str) -> Text {
        Text::new(value, TextStyle::sized(10.0))
    }

    fn png(width: u32, height: u32) -> Arc<[u8]> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 10, 10]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .expect("encode png");
        Arc::from(buf)
    }

    fn table(rows: usize) -> LayoutNode {
        let mut builder = TableBuilder::new(
            "t",
            vec![ColumnWidth::Fixed(140.0), ColumnWidth::Relative(1.0)],
        );
        builder
            .header(vec![TableCell::new(text("HEAD")).span(2)])
            .expect("header");
        for idx in 0..rows {
            builder
                .row(vec![
                    TableCell::new(text(&format!("label {idx}"))),
                    TableCell::new(text("value")),
                ])
                .expect("row");
        }
        builder.build().into()
    }

    #[test]
    fn relative_slots_share_width_left_after_fixed() {
        let assets = AssetBundle::new();
        let flow = Flow::new(&assets);
        let row = Row::new()
            .spacing(10.0)
            .slot(Slot::fixed(100.0, Spacer::new(1.0)))
            .slot(Slot::relative(1.0, Spacer::new(1.0)))
            .slot(Slot::relative(3.0, Spacer::new(1.0)));
        let widths = flow.slot_widths(&row, pt(520.0));
        assert_eq!(widths[0], pt(100.0));
        assert_eq!(widths[1].to_milli_i64(), 100_000);
        assert_eq!(widths[2].to_milli_i64(), 300_000);
    }

    #[test]
    fn zero_weight_slot_collapses() {
        let assets = AssetBundle::new();
        let flow = Flow::new(&assets);
        let row = Row::new()
            .slot(Slot::relative(0.0, Spacer::new(1.0)))
            .slot(Slot::relative(1.0, Spacer::new(1.0)));
        let widths = flow.slot_widths(&row, pt(200.0));
        assert_eq!(widths, vec![Pt::ZERO, pt(200.0)]);
    }

    #[test]
    fn auto_slot_takes_its_text_width() {
        let assets = AssetBundle::new();
        let flow = Flow::new(&assets);
        let label: LayoutNode = text("AB").into();
        let expected = flow.intrinsic_width(&label).expect("text has width");
        let row = Row::new()
            .slot(Slot::auto(label))
            .slot(Slot::relative(1.0, Spacer::new(1.0)));
        let widths = flow.slot_widths(&row, pt(300.0));
        assert_eq!(widths[0], expected);
        assert_eq!(widths[0] + widths[1], pt(300.0));
    }

    #[test]
    fn over_committed_fixed_widths_report_path() {
        let assets = AssetBundle::new();
        let flow = Flow::new(&assets);
        let node: LayoutNode = Column::new()
            .item(Spacer::new(4.0))
            .item(
                Row::new()
                    .slot(Slot::fixed(300.0, Spacer::new(1.0)))
                    .slot(Slot::fixed(300.0, Spacer::new(1.0))),
            )
            .into();
        let err = flow
            .check_fit(&node, pt(555.0), "content")
            .expect_err("too wide");
        assert_eq!(err.path, "content/item[1]");
        assert!(err.reason.contains("exceed"));
        assert!(flow.check_fit(&node, pt(600.0), "content").is_ok());
    }

    #[test]
    fn column_height_includes_spacing() {
        let assets = AssetBundle::new();
        let flow = Flow::new(&assets);
        let node: LayoutNode = Column::new()
            .spacing(5.0)
            .item(Spacer::new(10.0))
            .item(Spacer::new(20.0))
            .slot(Slot::fixed(7.0, Spacer::new(100.0)))
            .style(BoxStyle::padded(2.0))
            .into();
        assert_eq!(flow.measure(&node, pt(100.0)), pt(10.0 + 20.0 + 7.0 + 10.0 + 4.0));
    }

    #[test]
    fn text_split_keeps_every_word() {
        let assets = AssetBundle::new();
        let flow = Flow::new(&assets);
        let body = "one two three four five six seven eight nine ten eleven twelve";
        let node: LayoutNode = text(body).into();
        let width = pt(60.0);
        let full = flow.measure(&node, width);
        let (first, rest) = flow
            .split(&node, width, full / 2.0)
            .expect("text splits by line");
        assert!(flow.measure(&first, width) <= full / 2.0);
        let words = |n: &LayoutNode| match n {
            LayoutNode::Text(t) => t
                .plain_text()
                .split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>(),
            _ => Vec::new(),
        };
        let mut joined = words(&first);
        joined.extend(words(&rest));
        assert_eq!(joined.join(" "), body);
        assert_eq!(flow.measure(&first, width) + flow.measure(&rest, width), full);
    }

    #[test]
    fn table_split_repeats_header() {
        let assets = AssetBundle::new();
        let flow = Flow::new(&assets);
        let node = table(20);
        let width = pt(400.0);
        let avail = flow.measure(&node, width) / 2.0;
        let (first, rest) = flow.split(&node, width, avail).expect("splits");
        match (&first, &rest) {
            (LayoutNode::Table(a), LayoutNode::Table(b)) => {
                assert!(a.header.is_some());
                assert_eq!(a.header, b.header);
                assert_eq!(a.rows.len() + b.rows.len(), 20);
                assert!(!a.rows.is_empty());
            }
            _ => panic!("expected table halves"),
        }
        assert!(flow.measure(&first, width) <= avail);
    }

    #[test]
    fn grid_splits_on_row_boundaries() {
        let assets = AssetBundle::new();
        let flow = Flow::new(&assets);
        let mut grid = Grid::new(3, 10.0);
        for _ in 0..19 {
            grid.push(Spacer::new(80.0));
        }
        let node: LayoutNode = grid.into();
        let (first, rest) = flow.split(&node, pt(500.0), pt(265.0)).expect("splits");
        match (first, rest) {
            (LayoutNode::Grid(a), LayoutNode::Grid(b)) => {
                assert_eq!(a.children.len(), 9);
                assert_eq!(b.children.len(), 10);
            }
            _ => panic!("expected grid halves"),
        }
    }

    #[test]
    fn row_is_atomic() {
        let assets = AssetBundle::new();
        let flow = Flow::new(&assets);
        let node: LayoutNode = Row::new()
            .slot(Slot::relative(1.0, Spacer::new(100.0)))
            .into();
        assert!(flow.split(&node, pt(100.0), pt(50.0)).is_none());
    }

    #[test]
    fn fit_width_image_follows_aspect_ratio() {
        let assets = AssetBundle::new();
        let flow = Flow::new(&assets);
        let node: LayoutNode = Image::new(ImageSource::Inline(png(40, 20)), Scaling::FitWidth).into();
        assert_eq!(flow.measure(&node, pt(200.0)), pt(100.0));
        let area: LayoutNode = Image::new(ImageSource::Inline(png(40, 20)), Scaling::FitArea)
            .size(80.0, 80.0)
            .into();
        assert_eq!(flow.measure(&area, pt(200.0)), pt(80.0));
        assert_eq!(flow.outer_width(&area, pt(200.0)), pt(80.0));
    }

    #[test]
    fn missing_asset_draws_placeholder_box() {
        let assets = AssetBundle::new();
        let flow = Flow::new(&assets);
        let node: LayoutNode = Image::new(
            ImageSource::Asset(crate::assets::AssetKind::Stamp),
            Scaling::FitArea,
        )
        .size(50.0, 50.0)
        .into();
        let mut canvas = Canvas::new(Size::a4());
        flow.draw(&node, &mut canvas, pt(10.0), pt(10.0), pt(200.0));
        let commands = canvas.take_current();
        assert!(commands.iter().any(|c| matches!(c, Command::StrokeRect { .. })));
        assert!(!commands.iter().any(|c| matches!(c, Command::DrawImage { .. })));
    }

    #[test]
    fn linked_image_emits_link_area_and_resource() {
        let assets = AssetBundle::new();
        let flow = Flow::new(&assets);
        let node: LayoutNode = Image::new(ImageSource::Inline(png(10, 10)), Scaling::FitArea)
            .size(80.0, 80.0)
            .link("https://cdn.example/photo.jpg")
            .overlay(Text::new("3 Jun 2025", TextStyle::sized(8.0).color(Color::WHITE)))
            .into();
        let mut canvas = Canvas::new(Size::a4());
        flow.draw(&node, &mut canvas, Pt::ZERO, Pt::ZERO, pt(300.0));
        let commands = canvas.take_current();
        assert!(commands.iter().any(|c| matches!(c, Command::DrawImage { .. })));
        assert!(commands.iter().any(
            |c| matches!(c, Command::LinkArea { uri, .. } if uri == "https://cdn.example/photo.jpg")
        ));
        let overlay_y = commands.iter().find_map(|c| match c {
            Command::DrawString { y, .. } => Some(*y),
            _ => None,
        });
        assert!(overlay_y.expect("overlay text") > pt(60.0));
        assert_eq!(canvas.take_images().len(), 1);
    }

    #[test]
    fn table_cell_backgrounds_fill_whole_row_height() {
        let assets = AssetBundle::new();
        let flow = Flow::new(&assets);
        let mut builder = TableBuilder::new("t", vec![ColumnWidth::Relative(1.0); 2]);
        builder
            .row(vec![
                TableCell::new(text("short")).background(palette::GREY_LIGHTEN5),
                TableCell::new(text("a\nb\nc")),
            ])
            .expect("row");
        let node: LayoutNode = builder.build().into();
        let mut canvas = Canvas::new(Size::a4());
        flow.draw(&node, &mut canvas, Pt::ZERO, Pt::ZERO, pt(200.0));
        let rect_h = canvas.take_current().into_iter().find_map(|c| match c {
            Command::DrawRect { height, .. } => Some(height),
            _ => None,
        });
        assert_eq!(rect_h, Some(pt(36.0)));
    }
}
