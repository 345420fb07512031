//! Systems-inspection taxonomy and the category table it renders through.
//!
//! Each side of the inspection grid is an ordered list of categories, each
//! an ordered list of `(label, field)` pairs. Some fields appear under more
//! than one label; that is how the report is laid out and is kept as is.

use crate::error::LayoutError;
use crate::format;
use crate::layout::{
    BoxStyle, ColumnWidth, HAlign, LayoutNode, Row, Slot, Table, TableBuilder, TableCell, Text,
    TextStyle, ZebraStyle,
};
use crate::record::ValuationRecord;
use crate::types::{Color, palette};

pub type FieldAccessor = fn(&ValuationRecord) -> Option<&str>;

#[derive(Clone, Copy)]
pub struct Category {
    pub header: &'static str,
    pub fields: &'static [(&'static str, FieldAccessor)],
}

pub const LABEL_WIDTH: f32 = 140.0;

pub const CATEGORY_ZEBRA: ZebraStyle = ZebraStyle {
    even: palette::GREY_LIGHTEN1,
    odd: palette::GREY_LIGHTEN5,
};

pub static LEFT_SYSTEMS: &[Category] = &[
    Category {
        header: "BASIC SYSTEMS",
        fields: &[
            ("ENGINE CONDITION", |r| r.inspection_details.engine_condition.as_deref()),
            ("CHASSIS CONDITION", |r| r.inspection_details.chassis_condition.as_deref()),
            ("CABIN ASSY", |r| r.inspection_details.cabin.as_deref()),
            ("LOAD BODY ASSY", |r| r.inspection_details.body_condition.as_deref()),
            ("STEERING SYSTEM", |r| r.inspection_details.steering_assy.as_deref()),
            ("BRAKE SYSTEM", |r| r.inspection_details.brake_system.as_deref()),
            ("ELECTRICAL SYSTEM", |r| r.inspection_details.electric_assembly.as_deref()),
            ("SUSPENSION SYSTEM", |r| r.inspection_details.suspension_system.as_deref()),
            ("FUEL SYSTEM", |r| r.vehicle_details.fuel.as_deref()),
            ("TYRE CONDITION", |r| r.inspection_details.overall_tyre_condition.as_deref()),
        ],
    },
    Category {
        header: "TRANSMISSION SYSTEM",
        fields: &[
            ("GEARBOX ASSY", |r| r.inspection_details.gear_box_assy.as_deref()),
            ("CLUTCH SYSTEM", |r| r.inspection_details.clutch_system.as_deref()),
            ("DIFFERENTIAL ASSY", |r| r.inspection_details.differential_assy.as_deref()),
        ],
    },
    Category {
        header: "COOLING SYSTEM",
        fields: &[
            ("RADIATOR", |r| r.inspection_details.radiator.as_deref()),
            ("INTER COOLER", |r| r.inspection_details.intercooler.as_deref()),
            ("ALL HOSE PIPES", |r| r.inspection_details.all_hose_pipes.as_deref()),
        ],
    },
    Category {
        header: "STEERING SYSTEM",
        fields: &[
            ("STEERING COLUMN", |r| r.inspection_details.steering_assy.as_deref()),
            ("BRAKE SYSTEM", |r| r.inspection_details.brake_system.as_deref()),
            ("SUSPENSION SYSTEM", |r| r.inspection_details.suspension_system.as_deref()),
        ],
    },
];

pub static RIGHT_SYSTEMS: &[Category] = &[
    Category {
        header: "CABIN",
        fields: &[
            ("CABIN", |r| r.inspection_details.cabin.as_deref()),
            ("DASHBOARD", |r| r.inspection_details.dashboard.as_deref()),
            ("ALL GLASSES", |r| r.inspection_details.windshield_glass.as_deref()),
            ("SEATS", |r| r.inspection_details.seats.as_deref()),
        ],
    },
    Category {
        header: "LOAD BODY",
        fields: &[
            ("CABIN", |r| r.inspection_details.cabin.as_deref()),
            ("SEATS", |r| r.inspection_details.seats.as_deref()),
            ("PROPELLER SHAFT", |r| r.inspection_details.propeller_shaft.as_deref()),
            ("BODY CONDITION", |r| r.inspection_details.body_condition.as_deref()),
        ],
    },
    Category {
        header: "ELECTRICAL SYSTEM",
        fields: &[
            ("LIGHTS", |r| r.inspection_details.head_lamps.as_deref()),
            ("BATTERY", |r| r.inspection_details.battery_condition.as_deref()),
            ("WIRING ASSY", |r| r.inspection_details.electric_assembly.as_deref()),
        ],
    },
    Category {
        header: "SUSPENSION SYSTEM",
        fields: &[
            ("FRONT", |r| r.inspection_details.suspension_system.as_deref()),
            ("AXLES", |r| r.inspection_details.propeller_shaft.as_deref()),
        ],
    },
    Category {
        header: "OTHER SYSTEMS",
        fields: &[
            ("AIR CONDITIONER", |r| r.inspection_details.intercooler.as_deref()),
            ("PAINT WORK", |r| r.inspection_details.paint_work.as_deref()),
        ],
    },
];

/// Full-width category banner for a table of `span` columns.
pub(crate) fn category_header(title: &str, span: usize, size: f32) -> TableCell {
    TableCell::new(
        Text::new(title, TextStyle::sized(size).bold().color(Color::WHITE))
            .centered()
            .boxed(BoxStyle::padded(5.0)),
    )
    .span(span)
    .background(palette::BLUE_MEDIUM)
}

pub(crate) fn text_cell(value: &str, style: TextStyle, background: Color) -> TableCell {
    TableCell::new(Text::new(value, style).boxed(BoxStyle::padded(5.0))).background(background)
}

/// Two-column label/value table: one banner per category, then its fields
/// striped by a running index that ignores the banners.
pub fn category_table(
    name: &str,
    categories: &[Category],
    record: &ValuationRecord,
) -> Result<Table, LayoutError> {
    let mut table = TableBuilder::new(
        name,
        vec![ColumnWidth::Fixed(LABEL_WIDTH), ColumnWidth::Relative(1.0)],
    )
    .style(BoxStyle::padded(5.0));
    let span = table.column_count();
    for category in categories {
        table.row(vec![category_header(category.header, span, 12.0)])?;
        for (label, field) in category.fields {
            let value = format::text(field(record));
            table.striped_row(&CATEGORY_ZEBRA, |bg| {
                vec![
                    text_cell(label, TextStyle::sized(10.0).bold(), bg),
                    text_cell(&value, TextStyle::sized(10.0), bg),
                ]
            })?;
        }
    }
    Ok(table.build())
}

/// Left and right inspection tables side by side.
pub fn systems_inspection(record: &ValuationRecord) -> Result<LayoutNode, LayoutError> {
    let left = category_table("systems_inspection/left", LEFT_SYSTEMS, record)?;
    let right = category_table("systems_inspection/right", RIGHT_SYSTEMS, record)?;
    Ok(Row::new()
        .slot(Slot::relative(1.0, left).align(HAlign::Start))
        .slot(Slot::relative(1.0, right).align(HAlign::Start))
        .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::InspectionDetails;

    fn row_texts(table: &Table) -> Vec<Vec<String>> {
        table
            .rows
            .iter()
            .map(|row| {
                row.cells
                    .iter()
                    .map(|cell| match &cell.node {
                        LayoutNode::Text(text) => text.plain_text(),
                        other => panic!("unexpected {} cell", other.kind()),
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn left_taxonomy_keeps_order_and_reused_fields() {
        let mut record = ValuationRecord::new("x");
        record.inspection_details = InspectionDetails {
            steering_assy: Some("Fair".to_string()),
            brake_system: Some("Worn".to_string()),
            ..InspectionDetails::default()
        };
        let table = category_table("left", LEFT_SYSTEMS, &record).expect("table");
        let rows = row_texts(&table);
        assert_eq!(rows.len(), 4 + 10 + 3 + 3 + 3);
        assert_eq!(rows[0], vec!["BASIC SYSTEMS"]);
        assert_eq!(rows[5], vec!["STEERING SYSTEM", "Fair"]);
        assert_eq!(rows[6], vec!["BRAKE SYSTEM", "Worn"]);
        assert_eq!(rows[19], vec!["STEERING SYSTEM"]);
        assert_eq!(rows[20], vec!["STEERING COLUMN", "Fair"]);
        assert_eq!(rows[21], vec!["BRAKE SYSTEM", "Worn"]);
    }

    #[test]
    fn right_taxonomy_headers_in_order() {
        let record = ValuationRecord::new("x");
        let table = category_table("right", RIGHT_SYSTEMS, &record).expect("table");
        let headers: Vec<String> = row_texts(&table)
            .into_iter()
            .filter(|cells| cells.len() == 1)
            .map(|cells| cells[0].clone())
            .collect();
        assert_eq!(
            headers,
            vec![
                "CABIN",
                "LOAD BODY",
                "ELECTRICAL SYSTEM",
                "SUSPENSION SYSTEM",
                "OTHER SYSTEMS"
            ]
        );
    }

    #[test]
    fn missing_conditions_render_dashes() {
        let record = ValuationRecord::new("x");
        let table = category_table("right", RIGHT_SYSTEMS, &record).expect("table");
        for cells in row_texts(&table).into_iter().filter(|c| c.len() == 2) {
            assert_eq!(cells[1], "-");
        }
    }

    #[test]
    fn striping_skips_category_banners() {
        let record = ValuationRecord::new("x");
        let table = category_table("left", LEFT_SYSTEMS, &record).expect("table");
        let mut striped = 0usize;
        for row in &table.rows {
            if row.cells.len() == 1 {
                assert_eq!(row.cells[0].background, Some(palette::BLUE_MEDIUM));
                continue;
            }
            let expected = CATEGORY_ZEBRA.for_row(striped);
            assert!(row.cells.iter().all(|c| c.background == Some(expected)));
            striped += 1;
        }
        assert_eq!(striped, 19);
    }
}
