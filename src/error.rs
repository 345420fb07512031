use std::fmt;

/// A malformed layout tree. `path` names the offending node, e.g.
/// `identity_table/row[3]`.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutError {
    pub path: String,
    pub reason: String,
}

impl LayoutError {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn nested(self, parent: &str) -> Self {
        if parent.is_empty() {
            return self;
        }
        Self {
            path: format!("{}/{}", parent, self.path),
            reason: self.reason,
        }
    }
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

impl std::error::Error for LayoutError {}

#[derive(Debug)]
pub enum ReportError {
    MissingRecord(String),
    Layout(LayoutError),
    Serialization(String),
    InvalidConfiguration(String),
    Cancelled,
    Asset(String),
    Io(std::io::Error),
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::MissingRecord(id) => write!(f, "no valuation record with id {}", id),
            ReportError::Layout(err) => write!(f, "invalid layout at {}", err),
            ReportError::Serialization(message) => {
                write!(f, "pdf serialization failed: {}", message)
            }
            ReportError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            ReportError::Cancelled => write!(f, "render cancelled before images settled"),
            ReportError::Asset(message) => write!(f, "asset error: {}", message),
            ReportError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReportError::Layout(err) => Some(err),
            ReportError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ReportError {
    fn from(value: std::io::Error) -> Self {
        ReportError::Io(value)
    }
}

impl From<LayoutError> for ReportError {
    fn from(value: LayoutError) -> Self {
        ReportError::Layout(value)
    }
}

/// Per-image fetch failure. Never escapes the resolver; the entry is simply
/// left out of the resolved map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    Status(u16),
    Transport(String),
    NotFound,
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Status(code) => write!(f, "unexpected http status {}", code),
            FetchError::Transport(message) => write!(f, "transport error: {}", message),
            FetchError::NotFound => write!(f, "no image registered for url"),
        }
    }
}

impl std::error::Error for FetchError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_layout_error_prefixes_parent_path() {
        let err = LayoutError::new("row[2]", "span sum 3 does not match 4 columns")
            .nested("document_details");
        assert_eq!(err.path, "document_details/row[2]");
        assert_eq!(
            ReportError::from(err).to_string(),
            "invalid layout at document_details/row[2]: span sum 3 does not match 4 columns"
        );
    }

    #[test]
    fn nested_with_empty_parent_keeps_path() {
        let err = LayoutError::new("spacer", "negative height").nested("");
        assert_eq!(err.path, "spacer");
    }
}
