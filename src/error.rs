use std::fmt;

/// Errors produced while parsing configuration values or writing output
///
/// Geometry operations never fail, degenerate input just paints nothing.
#[derive(Debug)]
pub enum Error {
    /// Unknown name of an enumeration value
    UnknownName {
        kind: &'static str,
        name: String,
    },
    /// Color expected to be in `#RRGGBB(AA)` format
    InvalidColor(String),
    /// JSON error
    #[cfg(feature = "serde")]
    Json(serde_json::Error),
    /// IO error propagated while writing output
    IoError(std::io::Error),
}

impl Error {
    pub(crate) fn unknown_name(kind: &'static str, name: &str) -> Self {
        Self::UnknownName {
            kind,
            name: name.to_owned(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownName { kind, name } => write!(f, "unknown {}: \"{}\"", kind, name),
            Error::InvalidColor(color) => write!(
                f,
                "color expected to be #RRGGBB(AA) in hexidemical format: \"{}\"",
                color
            ),
            #[cfg(feature = "serde")]
            Error::Json(error) => write!(f, "json: {}", error),
            Error::IoError(error) => write!(f, "io: {}", error),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::IoError(error)
    }
}

#[cfg(feature = "serde")]
impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::Json(error)
    }
}

impl From<Error> for std::io::Error {
    fn from(error: Error) -> Self {
        match error {
            Error::IoError(error) => error,
            _ => Self::new(std::io::ErrorKind::InvalidData, error),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            #[cfg(feature = "serde")]
            Error::Json(error) => Some(error),
            Error::IoError(error) => Some(error),
            _ => None,
        }
    }
}
