//! Section builders: record + resolved images in, layout tree out.
//!
//! Builders are pure and independent of one another. Every value cell goes
//! through [`crate::format`] so that a missing value still fills its cell
//! with a placeholder.

use crate::assets::AssetKind;
use crate::compose::Section;
use crate::error::LayoutError;
use crate::format::{self, MISSING, NOT_AVAILABLE};
use crate::images::ResolvedImageMap;
use crate::inspection::{self, CATEGORY_ZEBRA, LABEL_WIDTH, category_header, text_cell};
use crate::layout::{
    BoxStyle, Column, ColumnWidth, Edges, Grid, HAlign, Image, ImageSource, LayoutNode, Row,
    Scaling, Slot, Spacer, TableBuilder, TableCell, Text, TextSpan, TextStyle, VAlign, ZebraStyle,
};
use crate::record::ValuationRecord;
use crate::types::{Color, palette};
use chrono::Datelike;

pub const DEFAULT_GRID_COLUMNS: usize = 3;
pub const NO_PHOTO_LABEL: &str = "NO PHOTO AVAILABLE";
pub const CHASSIS_PHOTO: &str = "ChassisNumberPlate";
pub const STENCIL_PHOTO: &str = "ChassisImprint";

const GRID_SPACING: f32 = 10.0;
const THUMBNAIL_SIZE: f32 = 80.0;
const HERO_PLACEHOLDER_HEIGHT: f32 = 160.0;

pub const IDENTITY_ZEBRA: ZebraStyle = ZebraStyle {
    even: palette::GREY_LIGHTEN5,
    odd: palette::GREY_LIGHTEN1,
};

const DISCLAIMER: &str = " We are not responsible for verifying the authenticity of the associated documents of the vehicle. We are not relied on the odometer reading of any vehicle at the time of physical inspection and isn\u{2019}t answerable for verifying the authenticity thereof. Our organization is not responsible for any direct, indirect or exceptional damages for any misuse of this report. As there is no any standard price list for used vehicles, valuation amount mentioned in this report is our professional opinion on the market value of the vehicle based on our standard valuation methodology & procedures. This report is based entirely on the personnel inspection carried out and is issued without prejudice or favour nor bindings.";

const SIGNATORY: &str = "Mahesh Garikina\nLicense No : 74183\nPronto Moto Services";
const REGISTERED_ADDRESS: &str = "Registered Address: F-1, 2-216/A, Vakalapudi, Kakinada, East Godavari Dist, Andhra Pradesh \u{2013} 533005";

fn framed() -> BoxStyle {
    BoxStyle::padded(5.0).border(1.0, palette::BLUE_DARKEN2)
}

fn four_columns() -> Vec<ColumnWidth> {
    vec![
        ColumnWidth::Fixed(LABEL_WIDTH),
        ColumnWidth::Relative(1.0),
        ColumnWidth::Fixed(LABEL_WIDTH),
        ColumnWidth::Relative(1.0),
    ]
}

fn field_value_header(pairs: usize) -> Vec<TableCell> {
    let style = TextStyle::default().bold().color(Color::WHITE);
    (0..pairs)
        .flat_map(|_| ["FIELD", "VALUE"])
        .map(|title| text_cell(title, style, palette::BLUE_DARKEN1))
        .collect()
}

fn label_style(size: f32) -> TextStyle {
    TextStyle::sized(size).bold()
}

/// Logo, brand line and report badge, drawn at the top of every page.
pub fn page_header(record: &ValuationRecord) -> LayoutNode {
    let brand = Text::spans(vec![
        TextSpan::new(
            "PRONTO",
            TextStyle::sized(24.0).bold().color(palette::GREEN_DARKEN1),
        ),
        TextSpan::new(
            " MOTO SERVICES",
            TextStyle::sized(24.0).bold().color(palette::RED_DARKEN1),
        ),
    ])
    .centered();
    let badge = Column::new()
        .item(
            Text::new(
                "VALUATION REPORT",
                TextStyle::sized(12.0).bold().color(Color::WHITE),
            )
            .centered()
            .boxed(BoxStyle::padded(5.0).background(palette::RED_MEDIUM)),
        )
        .item(Spacer::new(5.0))
        .item(
            Text::new(
                format::text(record.vehicle_details.registration_number.as_deref()),
                TextStyle::sized(14.0).bold().color(palette::BLUE_DARKEN1),
            )
            .centered(),
        );
    Row::new()
        .slot(Slot::fixed(
            56.0,
            Image::new(ImageSource::Asset(AssetKind::Logo), Scaling::FitArea).size(56.0, 56.0),
        ))
        .slot(Slot::fixed(10.0, Spacer::new(0.0)))
        .slot(Slot::relative(1.0, brand).v_align(VAlign::Middle))
        .slot(Slot::fixed(180.0, badge).v_align(VAlign::Middle))
        .into()
}

/// Page footer; `{page}` and `{pages}` are filled in per page.
pub fn page_footer() -> LayoutNode {
    Column::new()
        .item(Text::new("Generated by Pronto Moto Services", TextStyle::default()).centered())
        .item(
            Text::new(
                "Page {page} of {pages}",
                TextStyle::sized(9.0).color(palette::GREY_DARKEN2),
            )
            .centered(),
        )
        .into()
}

pub fn identity_table(record: &ValuationRecord) -> Result<LayoutNode, LayoutError> {
    let vehicle = &record.vehicle_details;
    let inspection = &record.inspection_details;
    let rows = [
        (
            "TYPE OF VAL",
            format::text(Some(record.type_of_val.as_str())),
            "DATE",
            format::short_date_or(record.created_at, MISSING),
        ),
        (
            "REPORT REQUESTED BY",
            format::text(record.stakeholder.executive_name.as_deref()),
            "BRANCH",
            format::text(record.stakeholder.name.as_deref()),
        ),
        (
            "INSPECTION DATE",
            format::date_or(inspection.date_of_inspection, MISSING),
            "REF NO",
            format::text(Some(record.reference_number.as_str())),
        ),
        (
            "INSPECTION LOCATION",
            format::text(inspection.inspection_location.as_deref()),
            "REGN NO",
            format::text(vehicle.registration_number.as_deref()),
        ),
    ];

    let mut table = TableBuilder::new("identity_table", four_columns()).style(framed());
    table.header(field_value_header(2))?;
    for (left_label, left_value, right_label, right_value) in rows {
        table.striped_row(&IDENTITY_ZEBRA, |bg| {
            vec![
                text_cell(left_label, label_style(11.0), bg),
                text_cell(&left_value, TextStyle::sized(11.0), palette::BLUE_LIGHTEN4),
                text_cell(right_label, label_style(11.0), bg),
                text_cell(&right_value, TextStyle::sized(11.0), palette::BLUE_LIGHTEN4),
            ]
        })?;
    }
    Ok(table.build().into())
}

fn vehicle_details_table(record: &ValuationRecord) -> Result<LayoutNode, LayoutError> {
    let vehicle = &record.vehicle_details;
    let rows = [
        ("REGISTERED OWNER", format::text(vehicle.owner_name.as_deref())),
        (
            "APPLICANT NAME",
            format::text(record.stakeholder.applicant.name.as_deref()),
        ),
        ("VEHICLE CATEGORY", format::text(vehicle.model.as_deref())),
        ("MAKE", format::text(vehicle.make.as_deref())),
        ("MODEL", format::text(vehicle.model.as_deref())),
        ("CHASSIS NO", format::text(vehicle.chassis_number.as_deref())),
        ("ENGINE NO", format::text(vehicle.engine_number.as_deref())),
        (
            "YEAR OF MFG",
            format::date_or(vehicle.manufactured_date, MISSING),
        ),
        (
            "REGISTRATION DATE",
            format::date_or(vehicle.date_of_registration, MISSING),
        ),
        (
            "CLASS OF VEHICLE",
            format::text(vehicle.class_of_vehicle.as_deref()),
        ),
        ("BODY TYPE", format::text(vehicle.body_type.as_deref())),
        ("OWNER SR NO", format::text(vehicle.owner_serial_no.as_deref())),
        ("HYPOTHECATION", format::bool_text(vehicle.hypothecation)),
    ];

    let mut table = TableBuilder::new(
        "vehicle_block/details",
        vec![ColumnWidth::Fixed(LABEL_WIDTH), ColumnWidth::Relative(1.0)],
    )
    .style(BoxStyle::padded(5.0));
    table.header(field_value_header(1))?;
    for (name, value) in rows {
        table.striped_row(&IDENTITY_ZEBRA, |bg| {
            vec![
                text_cell(name, label_style(11.0), bg),
                text_cell(&value, TextStyle::sized(11.0), bg),
            ]
        })?;
    }
    Ok(table.build().into())
}

fn manufacture_year(record: &ValuationRecord) -> String {
    let vehicle = &record.vehicle_details;
    format::meaningful_date(vehicle.manufactured_date)
        .map(|date| date.year())
        .or(vehicle.year_of_mfg)
        .map(|year| year.to_string())
        .unwrap_or_else(|| MISSING.to_string())
}

/// First resolved photo with the inspection stamp over its lower-left
/// corner, and the model/year caption bar beneath.
fn hero_photo(record: &ValuationRecord, images: &ResolvedImageMap) -> LayoutNode {
    let inspection = &record.inspection_details;
    let photo = match images.first() {
        Some((_, data)) => {
            let mut image = Image::new(ImageSource::Inline(data.clone()), Scaling::FitWidth);
            let overlay_lines: Vec<Text> = [
                format::timestamp(inspection.date_of_inspection)
                    .map(|stamp| Text::new(stamp, TextStyle::sized(9.0).bold().color(Color::WHITE))),
                format::present(inspection.inspection_location.as_deref())
                    .map(|place| Text::new(place, TextStyle::sized(9.0).color(Color::WHITE))),
            ]
            .into_iter()
            .flatten()
            .collect();
            if !overlay_lines.is_empty() {
                let overlay = overlay_lines
                    .into_iter()
                    .fold(Column::new().style(BoxStyle::padded(5.0)), |column, line| {
                        column.item(line)
                    });
                image = image.overlay(overlay);
            }
            image
        }
        None => Image::placeholder(Some(NO_PHOTO_LABEL)).height(HERO_PLACEHOLDER_HEIGHT),
    };

    let caption = Text::new(
        format!(
            "{} \u{2013} {}",
            format::text(record.vehicle_details.model.as_deref()),
            manufacture_year(record)
        ),
        TextStyle::sized(14.0).bold().color(palette::RED_DARKEN4),
    )
    .centered()
    .boxed(
        BoxStyle::padded(5.0)
            .background(Color::WHITE)
            .border(1.0, palette::BLUE_DARKEN2),
    );

    Column::new()
        .style(BoxStyle::padded(5.0))
        .item(photo.boxed(BoxStyle::default().border(1.0, palette::BLUE_DARKEN2)))
        .item(caption)
        .into()
}

pub fn vehicle_block(
    record: &ValuationRecord,
    images: &ResolvedImageMap,
) -> Result<LayoutNode, LayoutError> {
    Ok(Row::new()
        .style(framed())
        .slot(Slot::relative(1.0, vehicle_details_table(record)?))
        .slot(Slot::relative(1.0, hero_photo(record, images)))
        .into())
}

pub fn valuation_banner(record: &ValuationRecord) -> LayoutNode {
    let green = TextStyle::default().bold().color(palette::GREEN_DARKEN1);
    let title = Row::new()
        .slot(Slot::auto(Text::new(
            "VALUATION PRICE",
            TextStyle { size: 18.0, ..green },
        )))
        .slot(
            Slot::auto(
                Image::new(ImageSource::Asset(AssetKind::Calculator), Scaling::FitArea)
                    .size(24.0, 24.0)
                    .boxed(BoxStyle::default().padding(Edges {
                        left: 5.0,
                        ..Edges::default()
                    })),
            )
            .v_align(VAlign::Middle),
        );
    Row::new()
        .style(BoxStyle::padded(5.0).border(2.0, palette::GREEN_DARKEN1))
        .slot(Slot::auto(title).v_align(VAlign::Middle))
        .slot(Slot::relative(1.0, Spacer::new(0.0)))
        .slot(
            Slot::auto(Text::new(
                format::valuation_amount(record.quality_control.valuation_amount),
                TextStyle { size: 20.0, ..green },
            ))
            .v_align(VAlign::Middle),
        )
        .into()
}

fn icon_column(kind: AssetKind, title: &str, value: String, color: Color) -> Column {
    Column::new()
        .slot(
            Slot::auto(Image::new(ImageSource::Asset(kind), Scaling::FitArea).size(20.0, 20.0))
                .align(HAlign::Center),
        )
        .item(Text::new(title, TextStyle::sized(10.0).bold()).centered())
        .item(Text::new(value, TextStyle::sized(10.0).color(color)).centered())
}

pub fn icon_strip(record: &ValuationRecord) -> LayoutNode {
    let vehicle = &record.vehicle_details;
    let fuel = format::present(vehicle.fuel.as_deref())
        .map(str::to_uppercase)
        .unwrap_or_else(|| "N/A".to_string());
    let odometer = vehicle
        .odometer
        .map(|km| format::grouped(km as f64))
        .unwrap_or_else(|| "NOT-WORKING".to_string());
    let colour = format::present(vehicle.colour.as_deref())
        .map(str::to_uppercase)
        .unwrap_or_else(|| "NIL".to_string());
    Row::new()
        .slot(Slot::relative(
            1.0,
            icon_column(AssetKind::Fuel, "FUEL", fuel, palette::BROWN_DARKEN1),
        ))
        .slot(Slot::relative(
            1.0,
            icon_column(
                AssetKind::Odometer,
                "ODO METER",
                odometer,
                palette::GREEN_DARKEN1,
            ),
        ))
        .slot(Slot::relative(
            1.0,
            icon_column(AssetKind::Colour, "COLOUR", colour, palette::PURPLE_DARKEN1),
        ))
        .into()
}

pub fn document_details(record: &ValuationRecord) -> Result<LayoutNode, LayoutError> {
    let vehicle = &record.vehicle_details;
    let na_date = |value| format::date_or(value, NOT_AVAILABLE);
    let categories: [(&str, Vec<[(&str, String); 2]>); 2] = [
        (
            "PERMIT & INSURANCE",
            vec![
                [
                    (
                        "PERMIT NO",
                        format::text_or(vehicle.permit_no.as_deref(), NOT_AVAILABLE),
                    ),
                    (
                        "POLICY NO",
                        format::text_or(vehicle.insurance_policy_no.as_deref(), NOT_AVAILABLE),
                    ),
                ],
                [
                    ("PERMIT VALID UP TO", na_date(vehicle.permit_valid_up_to)),
                    ("INSURANCE VALID UP TO", na_date(vehicle.insurance_valid_up_to)),
                ],
                [
                    ("IDV", format::insured_value(vehicle.idv)),
                    ("", String::new()),
                ],
            ],
        ),
        (
            "FITNESS & TAX",
            vec![[
                ("FITNESS VALID UP TO", na_date(vehicle.fitness_valid_to)),
                ("TAX VALID UP TO", na_date(vehicle.tax_upto)),
            ]],
        ),
    ];

    let mut table = TableBuilder::new("document_details/table", four_columns()).style(framed());
    let span = table.column_count();
    for (header, rows) in &categories {
        table.row(vec![category_header(header, span, 10.0)])?;
        for [(left_label, left_value), (right_label, right_value)] in rows {
            table.striped_row(&CATEGORY_ZEBRA, |bg| {
                vec![
                    text_cell(left_label, label_style(10.0), bg),
                    text_cell(left_value, TextStyle::sized(10.0), palette::BLUE_LIGHTEN4),
                    text_cell(right_label, label_style(10.0), bg),
                    text_cell(right_value, TextStyle::sized(10.0), palette::BLUE_LIGHTEN4),
                ]
            })?;
        }
    }

    Ok(Column::new()
        .item(
            Text::new(
                "DOCUMENT DETAILS",
                TextStyle::default().bold().color(Color::WHITE),
            )
            .boxed(BoxStyle::padded(5.0).background(palette::ORANGE_LIGHTEN3)),
        )
        .item(table.build())
        .into())
}

fn rating_bar(value: String, background: Color, color: Color) -> Text {
    Text::new(value, TextStyle::sized(10.0).bold().color(color))
        .centered()
        .boxed(BoxStyle::padded(5.0).background(background))
}

pub fn rating_bars(record: &ValuationRecord) -> LayoutNode {
    let quality = &record.quality_control;
    Row::new()
        .slot(Slot::relative(
            1.0,
            rating_bar(
                format::text(quality.chassis_punch.as_deref()),
                palette::ORANGE_DARKEN1,
                Color::WHITE,
            ),
        ))
        .slot(Slot::relative(
            1.0,
            rating_bar(
                format::text(quality.overall_rating.as_deref()),
                palette::YELLOW_MEDIUM,
                Color::BLACK,
            ),
        ))
        .slot(Slot::relative(
            1.0,
            rating_bar(
                format::valuation_amount(quality.valuation_amount),
                palette::GREEN_DARKEN1,
                Color::WHITE,
            ),
        ))
        .into()
}

pub fn remarks(record: &ValuationRecord) -> LayoutNode {
    Column::new()
        .style(BoxStyle::padded(5.0).border(1.0, palette::GREY_DARKEN2))
        .item(Text::new("REMARKS :", TextStyle::sized(10.0).bold()))
        .item(Text::new(
            format::text_or(record.quality_control.remarks.as_deref(), "No remarks"),
            TextStyle::sized(10.0),
        ))
        .into()
}

fn image_row(title: &str, data: Option<ImageSource>) -> Row {
    let source = data.unwrap_or(ImageSource::Placeholder { label: None });
    Row::new()
        .slot(Slot::fixed(
            180.0,
            Text::new(title, TextStyle::default().bold().color(Color::WHITE))
                .centered()
                .boxed(
                    BoxStyle::padded(10.0)
                        .background(palette::BLUE_MEDIUM)
                        .height(50.0),
                ),
        ))
        .slot(
            Slot::relative(
                1.0,
                Image::new(source, Scaling::FitArea).height(43.0).boxed(
                    BoxStyle::padded(5.0)
                        .border(1.0, palette::BLUE_MEDIUM)
                        .height(55.0)
                        .max_width(300.0),
                ),
            )
            .align(HAlign::Center),
        )
}

/// Chassis-plate and stencil-trace photos by their fixed names; a missing
/// photo leaves an empty bordered box.
pub fn chassis_rows(images: &ResolvedImageMap) -> LayoutNode {
    let inline = |name: &str| images.get(name).map(|data| ImageSource::Inline(data.clone()));
    Column::new()
        .item(image_row("CHASSIS NO PHOTO", inline(CHASSIS_PHOTO)))
        .item(image_row("STENCIL TRACE", inline(STENCIL_PHOTO)))
        .item(Spacer::new(10.0))
        .into()
}

pub fn disclaimer() -> LayoutNode {
    Text::spans(vec![
        TextSpan::new("DISCLAIMER :", TextStyle::sized(10.0).bold()),
        TextSpan::new(DISCLAIMER, TextStyle::sized(9.0)),
    ])
    .boxed(
        BoxStyle::default()
            .padding(Edges {
                top: 10.0,
                right: 10.0,
                bottom: 15.0,
                left: 10.0,
            })
            .border(1.0, palette::GREY_DARKEN2),
    )
    .into()
}

pub fn signature_block() -> LayoutNode {
    let top_padded = |value: f32| {
        BoxStyle::default().padding(Edges {
            top: value,
            ..Edges::default()
        })
    };
    let details = Column::new()
        .style(BoxStyle::default().padding(Edges {
            left: 20.0,
            ..Edges::default()
        }))
        .item(Text::new("Approved by", TextStyle::sized(10.0).bold()))
        .item(
            Image::new(ImageSource::Asset(AssetKind::Signature), Scaling::FitArea)
                .height(60.0)
                .boxed(top_padded(5.0)),
        )
        .item(Text::new(SIGNATORY, TextStyle::sized(9.0)).boxed(top_padded(5.0)));
    Row::new()
        .slot(Slot::fixed(
            120.0,
            Image::new(ImageSource::Asset(AssetKind::Stamp), Scaling::FitArea).size(120.0, 120.0),
        ))
        .slot(Slot::relative(1.0, details))
        .into()
}

/// Thumbnails of every resolved photo, in photo-map order. Photos that did
/// not resolve are left out rather than placeholdered.
pub fn photo_grid(record: &ValuationRecord, images: &ResolvedImageMap, columns: usize) -> LayoutNode {
    let mut grid = Grid::new(columns, GRID_SPACING);
    for (name, data) in images.iter() {
        let mut thumbnail = Image::new(ImageSource::Inline(data.clone()), Scaling::FitArea)
            .size(THUMBNAIL_SIZE, THUMBNAIL_SIZE);
        let mut caption = Text::new(name, TextStyle::sized(9.0).italic()).centered();
        if let Some(url) = format::present(record.photo_urls.get(name)) {
            thumbnail = thumbnail.link(url);
            caption = caption.link(url);
        }
        grid.push(Column::new().item(thumbnail).item(caption));
    }
    Column::new()
        .item(Spacer::rule(1.0, palette::GREY_LIGHTEN2))
        .item(Spacer::new(5.0))
        .item(Text::new("Photos", TextStyle::default().bold()))
        .item(grid)
        .into()
}

pub fn footer_text() -> LayoutNode {
    let contact = TextStyle::sized(9.0);
    let left_padded = |value: f32| {
        BoxStyle::default().padding(Edges {
            left: value,
            ..Edges::default()
        })
    };
    let contacts = Row::new()
        .slot(Slot::relative(1.0, Spacer::new(0.0)))
        .slot(Slot::auto(Text::new("connect@prontomoto.in", contact)))
        .slot(Slot::auto(
            Text::new("0884-3596574", contact).boxed(left_padded(20.0)),
        ))
        .slot(Slot::auto(
            Text::new("+91 9885755567", contact).boxed(left_padded(20.0)),
        ))
        .slot(Slot::relative(1.0, Spacer::new(0.0)));
    Column::new()
        .item(
            Text::new(
                "THIS REPORT IS ISSUED WITHOUT PREJUDICE",
                TextStyle::sized(10.0).bold(),
            )
            .centered(),
        )
        .item(Spacer::rule(1.0, palette::GREY_LIGHTEN2))
        .item(
            Row::new()
                .slot(Slot::auto(Text::new(REGISTERED_ADDRESS, contact)))
                .slot(Slot::auto(
                    Text::new("www.prontomoto.in", contact).boxed(left_padded(10.0)),
                )),
        )
        .item(contacts)
        .into()
}

/// Every content section in report order.
pub fn content_sections(
    record: &ValuationRecord,
    images: &ResolvedImageMap,
    grid_columns: usize,
) -> Result<Vec<Section>, LayoutError> {
    Ok(vec![
        Section::new("identity_table", identity_table(record)?),
        Section::new("vehicle_block", vehicle_block(record, images)?),
        Section::new("valuation_banner", valuation_banner(record)),
        Section::new("icon_strip", icon_strip(record)),
        Section::new("document_details", document_details(record)?),
        Section::new("rating_bars", rating_bars(record)),
        Section::new("remarks", remarks(record)),
        Section::new(
            "systems_inspection",
            inspection::systems_inspection(record)?,
        ),
        Section::new("chassis_rows", chassis_rows(images)),
        Section::new("disclaimer", disclaimer()),
        Section::new("signature_block", signature_block()),
        Section::new("photo_grid", photo_grid(record, images, grid_columns)),
        Section::new("footer_text", footer_text()),
    ])
}
