//! Valuation record model as stored by the valuation service.
//!
//! The JSON shape uses PascalCase keys with a couple of historical
//! exceptions (`id`, `dateOfValuation`, `IDV`, `EngineCC`). Every field the
//! report reads is optional; a missing sub-object deserializes to an empty
//! default rather than failing.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ValuationRecord {
    #[serde(rename = "id")]
    pub id: String,
    #[serde(
        default = "default_type_of_val",
        deserialize_with = "string_or_default"
    )]
    pub type_of_val: String,
    #[serde(
        default = "default_requested_by",
        deserialize_with = "string_or_default"
    )]
    pub report_requested_by: String,
    #[serde(deserialize_with = "string_or_default")]
    pub reference_number: String,
    #[serde(rename = "dateOfValuation")]
    pub date_of_valuation: Option<String>,
    #[serde(deserialize_with = "null_default")]
    pub stakeholder: Stakeholder,
    pub composite_key: Option<String>,
    pub vehicle_number: Option<String>,
    pub applicant_contact: Option<String>,
    pub vehicle_segment: Option<String>,
    #[serde(deserialize_with = "null_default")]
    pub documents: Vec<DocumentRef>,
    #[serde(deserialize_with = "null_default")]
    pub vehicle_details: VehicleDetails,
    #[serde(deserialize_with = "flexible_datetime")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(deserialize_with = "flexible_datetime")]
    pub updated_at: Option<NaiveDateTime>,
    #[serde(deserialize_with = "null_default")]
    pub inspection_details: InspectionDetails,
    #[serde(deserialize_with = "null_default")]
    pub quality_control: QualityControl,
    pub valuation_response: Option<ValuationResponse>,
    pub photo_urls: PhotoMap,
    #[serde(deserialize_with = "null_default")]
    pub workflow: Vec<WorkflowStep>,
    pub status: Option<String>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    #[serde(deserialize_with = "flexible_datetime")]
    pub deleted_at: Option<NaiveDateTime>,
    pub deleted_by: Option<String>,
    #[serde(deserialize_with = "flexible_datetime")]
    pub completed_at: Option<NaiveDateTime>,
    pub completed_by: Option<String>,
    pub assigned_to: Option<String>,
    pub assigned_to_role: Option<String>,
}

impl ValuationRecord {
    /// An otherwise empty record carrying the defaults the valuation service
    /// assigns to new documents.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_of_val: default_type_of_val(),
            report_requested_by: default_requested_by(),
            status: Some("Open".to_string()),
            ..Self::default()
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Stakeholder {
    pub name: Option<String>,
    pub executive_name: Option<String>,
    pub executive_contact: Option<String>,
    pub executive_whatsapp: Option<String>,
    pub executive_email: Option<String>,
    #[serde(deserialize_with = "null_default")]
    pub applicant: Applicant,
    pub vehicle_number: Option<String>,
    pub vehicle_segment: Option<String>,
    #[serde(deserialize_with = "null_default")]
    pub documents: Vec<DocumentRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Applicant {
    pub name: Option<String>,
    pub contact: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DocumentRef {
    #[serde(rename = "Type")]
    pub kind: Option<String>,
    pub file_path: Option<String>,
    #[serde(deserialize_with = "flexible_datetime")]
    pub uploaded_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct VehicleDetails {
    pub registration_number: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub month_of_mfg: Option<i32>,
    pub year_of_mfg: Option<i32>,
    pub body_type: Option<String>,
    pub chassis_number: Option<String>,
    pub engine_number: Option<String>,
    pub colour: Option<String>,
    pub fuel: Option<String>,
    pub owner_name: Option<String>,
    pub present_address: Option<String>,
    pub permanent_address: Option<String>,
    pub hypothecation: Option<bool>,
    pub insurer: Option<String>,
    #[serde(deserialize_with = "flexible_datetime")]
    pub date_of_registration: Option<NaiveDateTime>,
    pub class_of_vehicle: Option<String>,
    #[serde(rename = "EngineCC")]
    pub engine_cc: Option<i32>,
    pub gross_vehicle_weight: Option<f64>,
    pub owner_serial_no: Option<String>,
    pub seating_capacity: Option<i32>,
    pub insurance_policy_no: Option<String>,
    #[serde(deserialize_with = "flexible_datetime")]
    pub insurance_valid_up_to: Option<NaiveDateTime>,
    #[serde(rename = "IDV")]
    pub idv: Option<f64>,
    pub permit_no: Option<String>,
    #[serde(deserialize_with = "flexible_datetime")]
    pub permit_valid_up_to: Option<NaiveDateTime>,
    pub fitness_no: Option<String>,
    #[serde(deserialize_with = "flexible_datetime")]
    pub fitness_valid_to: Option<NaiveDateTime>,
    pub backlist_status: Option<bool>,
    pub rc_status: Option<bool>,
    pub stencil_trace_url: Option<String>,
    pub chassis_no_photo_url: Option<String>,
    pub odometer: Option<i64>,
    pub rto: Option<String>,
    pub lender: Option<String>,
    pub ex_showroom_price: Option<f64>,
    pub category_code: Option<String>,
    pub norms_type: Option<String>,
    pub maker_variant: Option<String>,
    pub pollution_certificate_number: Option<String>,
    #[serde(deserialize_with = "flexible_datetime")]
    pub pollution_certificate_upto: Option<NaiveDateTime>,
    pub permit_type: Option<String>,
    #[serde(deserialize_with = "flexible_datetime")]
    pub permit_issued: Option<NaiveDateTime>,
    #[serde(deserialize_with = "flexible_datetime")]
    pub permit_from: Option<NaiveDateTime>,
    #[serde(deserialize_with = "flexible_datetime")]
    pub tax_upto: Option<NaiveDateTime>,
    pub tax_paid_upto: Option<String>,
    #[serde(deserialize_with = "flexible_datetime")]
    pub manufactured_date: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct InspectionDetails {
    pub vehicle_inspected_by: Option<String>,
    #[serde(deserialize_with = "flexible_datetime")]
    pub date_of_inspection: Option<NaiveDateTime>,
    pub inspection_location: Option<String>,
    pub vehicle_moved: Option<bool>,
    pub engine_started: Option<bool>,
    pub odometer: Option<i64>,
    pub vin_plate: Option<bool>,
    pub body_type: Option<String>,
    pub overall_tyre_condition: Option<String>,
    pub other_accessory_fitment: Option<bool>,
    pub windshield_glass: Option<String>,
    pub road_worthy_condition: Option<bool>,
    pub engine_condition: Option<String>,
    pub suspension_system: Option<String>,
    pub steering_assy: Option<String>,
    pub brake_system: Option<String>,
    pub chassis_condition: Option<String>,
    pub body_condition: Option<String>,
    pub battery_condition: Option<String>,
    pub paint_work: Option<String>,
    pub clutch_system: Option<String>,
    pub gear_box_assy: Option<String>,
    pub propeller_shaft: Option<String>,
    pub differential_assy: Option<String>,
    pub cabin: Option<String>,
    pub dashboard: Option<String>,
    pub seats: Option<String>,
    pub head_lamps: Option<String>,
    pub electric_assembly: Option<String>,
    pub radiator: Option<String>,
    pub intercooler: Option<String>,
    pub all_hose_pipes: Option<String>,
    #[serde(deserialize_with = "null_default")]
    pub photos: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct QualityControl {
    pub overall_rating: Option<String>,
    pub valuation_amount: Option<f64>,
    pub chassis_punch: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ValuationResponse {
    pub raw_response: Option<String>,
    pub low_range: Option<f64>,
    pub mid_range: Option<f64>,
    pub high_range: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct WorkflowStep {
    pub step_order: i32,
    pub template_step_id: i32,
    pub assigned_to_role: Option<String>,
    pub status: Option<String>,
    #[serde(deserialize_with = "flexible_datetime")]
    pub started_at: Option<NaiveDateTime>,
    #[serde(deserialize_with = "flexible_datetime")]
    pub completed_at: Option<NaiveDateTime>,
}

/// Logical photo name to URL, in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhotoMap {
    entries: Vec<(String, String)>,
}

impl PhotoMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces. A replaced key keeps its original position.
    pub fn insert(&mut self, name: impl Into<String>, url: impl Into<String>) {
        let name = name.into();
        let url = url.into();
        if let Some(slot) = self.entries.iter_mut().find(|(key, _)| *key == name) {
            slot.1 = url;
        } else {
            self.entries.push((name, url));
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, url)| url.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, url)| (name.as_str(), url.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PhotoMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = PhotoMap::new();
        for (name, url) in iter {
            map.insert(name, url);
        }
        map
    }
}

impl Serialize for PhotoMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, url) in &self.entries {
            map.serialize_entry(name, url)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PhotoMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PhotoMapVisitor;

        impl<'de> Visitor<'de> for PhotoMapVisitor {
            type Value = PhotoMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of photo names to urls")
            }

            fn visit_unit<E: de::Error>(self) -> Result<PhotoMap, E> {
                Ok(PhotoMap::new())
            }

            fn visit_none<E: de::Error>(self) -> Result<PhotoMap, E> {
                Ok(PhotoMap::new())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<PhotoMap, A::Error> {
                let mut map = PhotoMap::new();
                while let Some((name, url)) = access.next_entry::<String, Option<String>>()? {
                    map.insert(name, url.unwrap_or_default());
                }
                Ok(map)
            }
        }

        deserializer.deserialize_any(PhotoMapVisitor)
    }
}

fn default_type_of_val() -> String {
    "ValuationReport".to_string()
}

fn default_requested_by() -> String {
    "Valuation Team".to_string()
}

fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    null_default(deserializer)
}

/// Accepts RFC 3339 (`...Z`, `+05:30`), naive `YYYY-MM-DDTHH:MM:SS[.f]`,
/// a bare date, or null.
fn flexible_datetime<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<NaiveDateTime>, D::Error> {
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    parse_datetime(raw)
        .map(Some)
        .ok_or_else(|| de::Error::custom(format!("unrecognised date-time {raw:?}")))
}

pub(crate) fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(value) = DateTime::parse_from_rfc3339(raw) {
        return Some(value.naive_utc());
    }
    if let Ok(value) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(value);
    }
    if let Ok(value) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(value);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}
