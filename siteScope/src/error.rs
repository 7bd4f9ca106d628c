use std::fmt;

/// Everything that can go wrong while filtering, composing or exporting a report.
#[derive(Debug)]
pub enum ReportError {
    InvalidInput { latitude: f64, longitude: f64 },
    MissingAttribute { dataset: String, attribute: String },
    DatasetLoad { source: String, reason: String },
    Config(String),
    Render(String),
    Pdf(String),
    EmptyReport,
    Io(std::io::Error),
    Csv(csv::Error),
}

impl ReportError {
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, ReportError::InvalidInput { .. })
    }
}

impl From<std::io::Error> for ReportError {
    fn from(err: std::io::Error) -> Self {
        ReportError::Io(err)
    }
}

impl From<csv::Error> for ReportError {
    fn from(err: csv::Error) -> Self {
        ReportError::Csv(err)
    }
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::InvalidInput { latitude, longitude } => write!(
                f,
                "Invalid latitude or longitude! ({}, {})",
                latitude, longitude
            ),
            ReportError::MissingAttribute { dataset, attribute } => {
                write!(f, "Dataset '{}' has no '{}' attribute", dataset, attribute)
            }
            ReportError::DatasetLoad { source, reason } => {
                write!(f, "Failed to load dataset from {}: {}", source, reason)
            }
            ReportError::Config(s) => write!(f, "Config error: {}", s),
            ReportError::Render(s) => write!(f, "Render error: {}", s),
            ReportError::Pdf(s) => write!(f, "PDF error: {}", s),
            ReportError::EmptyReport => write!(f, "Nothing to export: the plot buffer is empty"),
            ReportError::Io(e) => write!(f, "IO error: {}", e),
            ReportError::Csv(e) => write!(f, "CSV error: {}", e),
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReportError::Io(e) => Some(e),
            ReportError::Csv(e) => Some(e),
            _ => None,
        }
    }
}
