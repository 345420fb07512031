use crate::error::ReportError;
use base64::Engine;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Fixed artwork used by the report template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AssetKind {
    Logo,
    Calculator,
    Fuel,
    Odometer,
    Colour,
    Stamp,
    Signature,
}

impl AssetKind {
    pub const ALL: [AssetKind; 7] = [
        AssetKind::Logo,
        AssetKind::Calculator,
        AssetKind::Fuel,
        AssetKind::Odometer,
        AssetKind::Colour,
        AssetKind::Stamp,
        AssetKind::Signature,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Logo => "logo",
            AssetKind::Calculator => "calculator",
            AssetKind::Fuel => "fuel",
            AssetKind::Odometer => "odometer",
            AssetKind::Colour => "colour",
            AssetKind::Stamp => "stamp",
            AssetKind::Signature => "signature",
        }
    }

    pub fn from_str(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "logo" => Some(AssetKind::Logo),
            "calculator" => Some(AssetKind::Calculator),
            "fuel" => Some(AssetKind::Fuel),
            "odometer" => Some(AssetKind::Odometer),
            "colour" | "color" => Some(AssetKind::Colour),
            "stamp" => Some(AssetKind::Stamp),
            "signature" => Some(AssetKind::Signature),
            _ => None,
        }
    }
}

/// Template artwork by kind. Kinds without bytes render as placeholder
/// boxes of the same size.
#[derive(Debug, Clone, Default)]
pub struct AssetBundle {
    assets: BTreeMap<AssetKind, Arc<[u8]>>,
}

impl AssetBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: AssetKind, data: impl Into<Arc<[u8]>>) {
        self.assets.insert(kind, data.into());
    }

    pub fn add_data_uri(&mut self, kind: AssetKind, uri: &str) -> Result<(), ReportError> {
        let (_mime, data) = parse_data_uri(uri).ok_or_else(|| {
            ReportError::Asset(format!("invalid data uri for {} asset", kind.as_str()))
        })?;
        self.add(kind, data);
        Ok(())
    }

    pub fn get(&self, kind: AssetKind) -> Option<&Arc<[u8]>> {
        self.assets.get(&kind)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

pub(crate) fn parse_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    let rest = uri.strip_prefix("data:")?;
    let (header, data_part) = rest.split_once(',')?;
    let mime = header
        .split(';')
        .next()
        .filter(|m| !m.is_empty())
        .unwrap_or("application/octet-stream")
        .to_string();
    let data = if header.split(';').any(|p| p == "base64") {
        base64::engine::general_purpose::STANDARD
            .decode(data_part.trim())
            .ok()?
    } else {
        data_part.as_bytes().to_vec()
    };
    Some((mime, data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_uri_decodes_base64_payload() {
        let (mime, data) = parse_data_uri("data:image/png;base64,AAEC").expect("uri");
        assert_eq!(mime, "image/png");
        assert_eq!(data, vec![0u8, 1, 2]);
    }

    #[test]
    fn data_uri_without_base64_is_raw() {
        let (mime, data) = parse_data_uri("data:,hello").expect("uri");
        assert_eq!(mime, "application/octet-stream");
        assert_eq!(data, b"hello".to_vec());
    }

    #[test]
    fn bundle_rejects_malformed_uri() {
        let mut bundle = AssetBundle::new();
        let err = bundle
            .add_data_uri(AssetKind::Logo, "https://example.com/logo.png")
            .expect_err("not a data uri");
        assert!(matches!(err, ReportError::Asset(_)));
        assert!(bundle.is_empty());
        bundle
            .add_data_uri(AssetKind::Stamp, "data:image/png;base64,AAEC")
            .expect("valid");
        assert_eq!(bundle.get(AssetKind::Stamp).map(|d| d.len()), Some(3));
    }

    #[test]
    fn asset_kind_names_round_trip() {
        for kind in AssetKind::ALL {
            assert_eq!(AssetKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(AssetKind::from_str("Color"), Some(AssetKind::Colour));
    }
}
