//! Declarative layout tree.
//!
//! Nodes are plain data: sizes, colours and text, never callbacks. Lengths
//! are kept as raw `f32` so that a malformed tree can be reported with the
//! offending node's path by [`LayoutNode::validate`] before anything is laid
//! out.

use crate::assets::AssetKind;
use crate::error::LayoutError;
use crate::types::Color;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sizing {
    Fixed(f32),
    Relative(f32),
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HAlign {
    #[default]
    Start,
    Center,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VAlign {
    #[default]
    Top,
    Middle,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Edges {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Edges {
    pub fn all(value: f32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    fn values(&self) -> [(&'static str, f32); 4] {
        [
            ("padding.top", self.top),
            ("padding.right", self.right),
            ("padding.bottom", self.bottom),
            ("padding.left", self.left),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Border {
    pub width: f32,
    pub color: Color,
}

/// Box decoration shared by every node kind.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoxStyle {
    pub padding: Edges,
    pub background: Option<Color>,
    pub border: Option<Border>,
    /// Forces the outer height of the box.
    pub height: Option<f32>,
    /// Caps the outer width of the box.
    pub max_width: Option<f32>,
}

impl BoxStyle {
    pub fn padded(value: f32) -> Self {
        Self {
            padding: Edges::all(value),
            ..Self::default()
        }
    }

    pub fn padding(mut self, edges: Edges) -> Self {
        self.padding = edges;
        self
    }

    pub fn background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }

    pub fn border(mut self, width: f32, color: Color) -> Self {
        self.border = Some(Border { width, color });
        self
    }

    pub fn height(mut self, height: f32) -> Self {
        self.height = Some(height);
        self
    }

    pub fn max_width(mut self, width: f32) -> Self {
        self.max_width = Some(width);
        self
    }

    fn validate(&self, path: &str) -> Result<(), LayoutError> {
        for (name, value) in self.padding.values() {
            check_length(path, name, value)?;
        }
        if let Some(border) = self.border {
            check_length(path, "border.width", border.width)?;
        }
        if let Some(height) = self.height {
            check_length(path, "height", height)?;
        }
        if let Some(width) = self.max_width {
            check_length(path, "max_width", width)?;
        }
        Ok(())
    }
}

fn check_length(path: &str, name: &str, value: f32) -> Result<(), LayoutError> {
    if !value.is_finite() {
        return Err(LayoutError::new(path, format!("{} is not finite", name)));
    }
    if value < 0.0 {
        return Err(LayoutError::new(
            path,
            format!("{} is negative ({})", name, value),
        ));
    }
    Ok(())
}

fn check_sizing(path: &str, sizing: Sizing) -> Result<(), LayoutError> {
    match sizing {
        Sizing::Fixed(value) => check_length(path, "fixed size", value),
        Sizing::Relative(weight) => check_length(path, "relative weight", weight),
        Sizing::Auto => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub sizing: Sizing,
    pub h_align: HAlign,
    pub v_align: VAlign,
    pub node: LayoutNode,
}

impl Slot {
    pub fn fixed(width: f32, node: impl Into<LayoutNode>) -> Self {
        Self::new(Sizing::Fixed(width), node)
    }

    pub fn relative(weight: f32, node: impl Into<LayoutNode>) -> Self {
        Self::new(Sizing::Relative(weight), node)
    }

    pub fn auto(node: impl Into<LayoutNode>) -> Self {
        Self::new(Sizing::Auto, node)
    }

    fn new(sizing: Sizing, node: impl Into<LayoutNode>) -> Self {
        Self {
            sizing,
            h_align: HAlign::Start,
            v_align: VAlign::Top,
            node: node.into(),
        }
    }

    pub fn align(mut self, h_align: HAlign) -> Self {
        self.h_align = h_align;
        self
    }

    pub fn v_align(mut self, v_align: VAlign) -> Self {
        self.v_align = v_align;
        self
    }
}

/// Children laid out left to right.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    pub style: BoxStyle,
    pub spacing: f32,
    pub slots: Vec<Slot>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn style(mut self, style: BoxStyle) -> Self {
        self.style = style;
        self
    }

    pub fn spacing(mut self, spacing: f32) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn slot(mut self, slot: Slot) -> Self {
        self.slots.push(slot);
        self
    }
}

/// Children stacked top to bottom. Slot sizing applies to height; relative
/// heights behave as auto in flowing content.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Column {
    pub style: BoxStyle,
    pub spacing: f32,
    pub slots: Vec<Slot>,
}

impl Column {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn style(mut self, style: BoxStyle) -> Self {
        self.style = style;
        self
    }

    pub fn spacing(mut self, spacing: f32) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn slot(mut self, slot: Slot) -> Self {
        self.slots.push(slot);
        self
    }

    pub fn item(self, node: impl Into<LayoutNode>) -> Self {
        self.slot(Slot::auto(node))
    }
}

/// Fixed column count; children wrap every `columns` items.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub style: BoxStyle,
    pub columns: usize,
    pub spacing: f32,
    pub children: Vec<LayoutNode>,
}

impl Grid {
    pub fn new(columns: usize, spacing: f32) -> Self {
        Self {
            style: BoxStyle::default(),
            columns,
            spacing,
            children: Vec::new(),
        }
    }

    pub fn style(mut self, style: BoxStyle) -> Self {
        self.style = style;
        self
    }

    pub fn push(&mut self, node: impl Into<LayoutNode>) {
        self.children.push(node.into());
    }

    pub fn row_count(&self) -> usize {
        if self.columns == 0 {
            return 0;
        }
        self.children.len().div_ceil(self.columns)
    }

    /// Unfilled slots in the final row.
    pub fn trailing_empty_slots(&self) -> usize {
        if self.columns == 0 || self.children.is_empty() {
            return 0;
        }
        match self.children.len() % self.columns {
            0 => 0,
            filled => self.columns - filled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnWidth {
    Fixed(f32),
    Relative(f32),
}

impl ColumnWidth {
    pub fn sizing(self) -> Sizing {
        match self {
            ColumnWidth::Fixed(v) => Sizing::Fixed(v),
            ColumnWidth::Relative(v) => Sizing::Relative(v),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableCell {
    pub span: usize,
    pub background: Option<Color>,
    pub node: LayoutNode,
}

impl TableCell {
    pub fn new(node: impl Into<LayoutNode>) -> Self {
        Self {
            span: 1,
            background: None,
            node: node.into(),
        }
    }

    pub fn span(mut self, span: usize) -> Self {
        self.span = span;
        self
    }

    pub fn background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

/// Column definitions are fixed at construction; every row, header
/// included, must span exactly that many columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub style: BoxStyle,
    pub columns: Vec<ColumnWidth>,
    pub header: Option<TableRow>,
    pub rows: Vec<TableRow>,
}

/// Alternating body-row colours selected purely by row index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZebraStyle {
    pub even: Color,
    pub odd: Color,
}

impl ZebraStyle {
    pub fn for_row(&self, index: usize) -> Color {
        if index % 2 == 0 { self.even } else { self.odd }
    }
}

pub struct TableBuilder {
    name: String,
    table: Table,
    striped_rows: usize,
}

impl TableBuilder {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnWidth>) -> Self {
        Self {
            name: name.into(),
            table: Table {
                style: BoxStyle::default(),
                columns,
                header: None,
                rows: Vec::new(),
            },
            striped_rows: 0,
        }
    }

    pub fn style(mut self, style: BoxStyle) -> Self {
        self.table.style = style;
        self
    }

    pub fn column_count(&self) -> usize {
        self.table.columns.len()
    }

    fn check_spans(&self, label: &str, cells: &[TableCell]) -> Result<(), LayoutError> {
        let expected = self.table.columns.len();
        if let Some(idx) = cells.iter().position(|cell| cell.span == 0) {
            return Err(LayoutError::new(
                format!("{}/{}/cell[{}]", self.name, label, idx),
                "column span must be at least 1",
            ));
        }
        let total: usize = cells.iter().map(|cell| cell.span).sum();
        if total != expected {
            return Err(LayoutError::new(
                format!("{}/{}", self.name, label),
                format!(
                    "cell spans sum to {} but the table declares {} columns",
                    total, expected
                ),
            ));
        }
        Ok(())
    }

    pub fn header(&mut self, cells: Vec<TableCell>) -> Result<(), LayoutError> {
        self.check_spans("header", &cells)?;
        self.table.header = Some(TableRow { cells });
        Ok(())
    }

    pub fn row(&mut self, cells: Vec<TableCell>) -> Result<(), LayoutError> {
        let label = format!("row[{}]", self.table.rows.len());
        self.check_spans(&label, &cells)?;
        self.table.rows.push(TableRow { cells });
        Ok(())
    }

    /// Adds a body row whose cells are coloured by the running striped-row
    /// index. Rows added with [`TableBuilder::row`] do not advance it.
    pub fn striped_row<F>(&mut self, zebra: &ZebraStyle, cells: F) -> Result<(), LayoutError>
    where
        F: FnOnce(Color) -> Vec<TableCell>,
    {
        let color = zebra.for_row(self.striped_rows);
        self.row(cells(color))?;
        self.striped_rows += 1;
        Ok(())
    }

    pub fn build(self) -> Table {
        self.table
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub size: f32,
    pub bold: bool,
    pub italic: bool,
    pub color: Color,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            size: 12.0,
            bold: false,
            italic: false,
            color: Color::BLACK,
        }
    }
}

impl TextStyle {
    pub fn sized(size: f32) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,
    pub style: TextStyle,
}

impl TextSpan {
    pub fn new(text: impl Into<String>, style: TextStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub style: BoxStyle,
    pub spans: Vec<TextSpan>,
    pub align: HAlign,
    pub link: Option<String>,
}

impl Text {
    pub fn new(text: impl Into<String>, style: TextStyle) -> Self {
        Self::spans(vec![TextSpan::new(text, style)])
    }

    pub fn spans(spans: Vec<TextSpan>) -> Self {
        Self {
            style: BoxStyle::default(),
            spans,
            align: HAlign::Start,
            link: None,
        }
    }

    pub fn boxed(mut self, style: BoxStyle) -> Self {
        self.style = style;
        self
    }

    pub fn align(mut self, align: HAlign) -> Self {
        self.align = align;
        self
    }

    pub fn centered(self) -> Self {
        self.align(HAlign::Center)
    }

    pub fn link(mut self, url: impl Into<String>) -> Self {
        self.link = Some(url.into());
        self
    }

    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|span| span.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scaling {
    FitWidth,
    FitArea,
    FitHeight,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    Inline(Arc<[u8]>),
    Asset(AssetKind),
    Placeholder { label: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub style: BoxStyle,
    pub source: ImageSource,
    pub scaling: Scaling,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub link: Option<String>,
    pub overlay: Option<Box<LayoutNode>>,
}

impl Image {
    pub fn new(source: ImageSource, scaling: Scaling) -> Self {
        Self {
            style: BoxStyle::default(),
            source,
            scaling,
            width: None,
            height: None,
            link: None,
            overlay: None,
        }
    }

    pub fn placeholder(label: Option<&str>) -> Self {
        Self::new(
            ImageSource::Placeholder {
                label: label.map(str::to_string),
            },
            Scaling::FitArea,
        )
    }

    pub fn boxed(mut self, style: BoxStyle) -> Self {
        self.style = style;
        self
    }

    pub fn size(mut self, width: f32, height: f32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn height(mut self, height: f32) -> Self {
        self.height = Some(height);
        self
    }

    pub fn link(mut self, url: impl Into<String>) -> Self {
        self.link = Some(url.into());
        self
    }

    pub fn overlay(mut self, node: impl Into<LayoutNode>) -> Self {
        self.overlay = Some(Box::new(node.into()));
        self
    }
}

/// Empty block, optionally drawn as a horizontal rule of its own height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spacer {
    pub height: f32,
    pub rule: Option<Color>,
}

impl Spacer {
    pub fn new(height: f32) -> Self {
        Self { height, rule: None }
    }

    pub fn rule(thickness: f32, color: Color) -> Self {
        Self {
            height: thickness,
            rule: Some(color),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayoutNode {
    Row(Row),
    Column(Column),
    Grid(Grid),
    Table(Table),
    Text(Text),
    Image(Image),
    Spacer(Spacer),
}

impl LayoutNode {
    pub fn kind(&self) -> &'static str {
        match self {
            LayoutNode::Row(_) => "row",
            LayoutNode::Column(_) => "column",
            LayoutNode::Grid(_) => "grid",
            LayoutNode::Table(_) => "table",
            LayoutNode::Text(_) => "text",
            LayoutNode::Image(_) => "image",
            LayoutNode::Spacer(_) => "spacer",
        }
    }

    pub fn box_style(&self) -> Option<&BoxStyle> {
        match self {
            LayoutNode::Row(row) => Some(&row.style),
            LayoutNode::Column(column) => Some(&column.style),
            LayoutNode::Grid(grid) => Some(&grid.style),
            LayoutNode::Table(table) => Some(&table.style),
            LayoutNode::Text(text) => Some(&text.style),
            LayoutNode::Image(image) => Some(&image.style),
            LayoutNode::Spacer(_) => None,
        }
    }

    /// Checks every length in the tree. `path` is the name reported for this
    /// node; children extend it.
    pub fn validate(&self, path: &str) -> Result<(), LayoutError> {
        if let Some(style) = self.box_style() {
            style.validate(path)?;
        }
        match self {
            LayoutNode::Row(row) => {
                check_length(path, "spacing", row.spacing)?;
                for (idx, slot) in row.slots.iter().enumerate() {
                    let child = format!("{}/slot[{}]", path, idx);
                    check_sizing(&child, slot.sizing)?;
                    slot.node.validate(&child)?;
                }
            }
            LayoutNode::Column(column) => {
                check_length(path, "spacing", column.spacing)?;
                for (idx, slot) in column.slots.iter().enumerate() {
                    let child = format!("{}/item[{}]", path, idx);
                    check_sizing(&child, slot.sizing)?;
                    slot.node.validate(&child)?;
                }
            }
            LayoutNode::Grid(grid) => {
                check_length(path, "spacing", grid.spacing)?;
                if grid.columns == 0 {
                    return Err(LayoutError::new(path, "grid needs at least one column"));
                }
                for (idx, child) in grid.children.iter().enumerate() {
                    child.validate(&format!("{}/cell[{}]", path, idx))?;
                }
            }
            LayoutNode::Table(table) => {
                if table.columns.is_empty() {
                    return Err(LayoutError::new(path, "table declares no columns"));
                }
                for (idx, column) in table.columns.iter().enumerate() {
                    check_sizing(&format!("{}/column[{}]", path, idx), column.sizing())?;
                }
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
                    let row_path = format!("{}/{}", path, label);
                    let spans: usize = row.cells.iter().map(|cell| cell.span).sum();
                    if spans != table.columns.len() || row.cells.iter().any(|c| c.span == 0) {
                        return Err(LayoutError::new(
                            row_path,
                            format!(
                                "cell spans sum to {} but the table declares {} columns",
                                spans,
                                table.columns.len()
                            ),
                        ));
                    }
                    for (idx, cell) in row.cells.iter().enumerate() {
                        cell.node.validate(&format!("{}/cell[{}]", row_path, idx))?;
                    }
                }
            }
            LayoutNode::Text(text) => {
                for (idx, span) in text.spans.iter().enumerate() {
                    check_length(&format!("{}/span[{}]", path, idx), "font size", span.style.size)?;
                }
            }
            LayoutNode::Image(image) => {
                if let Some(width) = image.width {
                    check_length(path, "width", width)?;
                }
                if let Some(height) = image.height {
                    check_length(path, "height", height)?;
                }
                if let Some(overlay) = &image.overlay {
                    overlay.validate(&format!("{}/overlay", path))?;
                }
            }
            LayoutNode::Spacer(spacer) => check_length(path, "height", spacer.height)?,
        }
        Ok(())
    }

    /// Visits this node and every descendant, depth first.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a LayoutNode)) {
        visit(self);
        match self {
            LayoutNode::Row(row) => row.slots.iter().for_each(|s| s.node.walk(visit)),
            LayoutNode::Column(column) => column.slots.iter().for_each(|s| s.node.walk(visit)),
            LayoutNode::Grid(grid) => grid.children.iter().for_each(|c| c.walk(visit)),
            LayoutNode::Table(table) => {
                for row in table.header.iter().chain(table.rows.iter()) {
                    row.cells.iter().for_each(|c| c.node.walk(visit));
                }
            }
            LayoutNode::Image(image) => {
                if let Some(overlay) = &image.overlay {
                    overlay.walk(visit);
                }
            }
            LayoutNode::Text(_) | LayoutNode::Spacer(_) => {}
        }
    }
}

macro_rules! impl_into_node {
    ($($ty:ident),*) => {
        $(impl From<$ty> for LayoutNode {
            fn from(value: $ty) -> Self {
                LayoutNode::$ty(value)
            }
        })*
    };
}

impl_into_node!(Row, Column, Grid, Table, Text, Image, Spacer);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::palette;

    fn cell(text: &str) -> TableCell {
        TableCell::new(Text::new(text, TextStyle::sized(10.0)))
    }

    #[test]
    fn table_rejects_rows_that_do_not_span_all_columns() {
        let mut builder = TableBuilder::new(
            "details",
            vec![ColumnWidth::Fixed(140.0), ColumnWidth::Relative(1.0)],
        );
        builder.row(vec![cell("A"), cell("B")]).expect("valid row");
        let err = builder.row(vec![cell("A")]).expect_err("short row");
        assert_eq!(err.path, "details/row[1]");
        let err = builder
            .row(vec![cell("A"), cell("B").span(2)])
            .expect_err("long row");
        assert!(err.reason.contains("3"));
        builder
            .row(vec![cell("HEADER").span(2)])
            .expect("full-width span");
        assert_eq!(builder.build().rows.len(), 2);
    }

    #[test]
    fn zero_span_cell_is_rejected() {
        let mut builder = TableBuilder::new("t", vec![ColumnWidth::Relative(1.0)]);
        let err = builder
            .row(vec![cell("A").span(0), cell("B")])
            .expect_err("zero span");
        assert_eq!(err.path, "t/row[0]/cell[0]");
    }

    #[test]
    fn zebra_depends_only_on_row_parity() {
        let zebra = ZebraStyle {
            even: palette::GREY_LIGHTEN5,
            odd: palette::GREY_LIGHTEN1,
        };
        for idx in 0..10 {
            let expected = if idx % 2 == 0 {
                palette::GREY_LIGHTEN5
            } else {
                palette::GREY_LIGHTEN1
            };
            assert_eq!(zebra.for_row(idx), expected);
        }
    }

    #[test]
    fn striped_rows_skip_unstriped_rows_in_index() {
        let zebra = ZebraStyle {
            even: palette::GREY_LIGHTEN5,
            odd: palette::GREY_LIGHTEN1,
        };
        let mut builder = TableBuilder::new("t", vec![ColumnWidth::Relative(1.0)]);
        builder
            .striped_row(&zebra, |bg| vec![cell("a").background(bg)])
            .expect("row");
        builder.row(vec![cell("HEADER")]).expect("row");
        builder
            .striped_row(&zebra, |bg| vec![cell("b").background(bg)])
            .expect("row");
        let table = builder.build();
        assert_eq!(table.rows[0].cells[0].background, Some(palette::GREY_LIGHTEN5));
        assert_eq!(table.rows[2].cells[0].background, Some(palette::GREY_LIGHTEN1));
    }

    #[test]
    fn grid_reports_trailing_slots() {
        let mut grid = Grid::new(3, 10.0);
        for _ in 0..19 {
            grid.push(Spacer::new(1.0));
        }
        assert_eq!(grid.row_count(), 7);
        assert_eq!(grid.trailing_empty_slots(), 2);
        let empty = Grid::new(3, 10.0);
        assert_eq!(empty.row_count(), 0);
        assert_eq!(empty.trailing_empty_slots(), 0);
    }

    #[test]
    fn validate_reports_path_of_bad_length() {
        let node: LayoutNode = Row::new()
            .slot(Slot::fixed(56.0, Spacer::new(1.0)))
            .slot(Slot::relative(1.0, Column::new().item(Spacer::new(-4.0))))
            .into();
        let err = node.validate("header").expect_err("negative");
        assert_eq!(err.path, "header/slot[1]/item[0]");
        assert!(err.reason.contains("negative"));

        let node: LayoutNode = Text::new("x", TextStyle::sized(f32::NAN)).into();
        let err = node.validate("text").expect_err("nan");
        assert_eq!(err.path, "text/span[0]");
    }

    #[test]
    fn zero_relative_weight_is_legal() {
        let node: LayoutNode = Row::new()
            .slot(Slot::relative(0.0, Spacer::new(1.0)))
            .into();
        assert!(node.validate("row").is_ok());
    }
}
