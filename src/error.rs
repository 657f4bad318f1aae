use std::fmt;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Zip(zip::result::ZipError),
    Xml(roxmltree::Error),
    /// The package is readable but is not a usable presentation.
    InvalidPptx(String),
    /// The sample slide itself is wrong: unsupported shape kind, no usable shapes,
    /// duplicate labels.
    Authoring(String),
    /// The grid cannot hold a single sample with the given slide size and spacing.
    Layout(String),
    /// The record source is unusable (no data rows, unreadable workbook).
    Data(String),
    /// The drawing protocol was driven out of order.
    Misuse(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Zip(e) => write!(f, "ZIP error: {e}"),
            Error::Xml(e) => write!(f, "XML parse error: {e}"),
            Error::InvalidPptx(msg) => write!(f, "Invalid PPTX: {msg}"),
            Error::Authoring(msg) => write!(f, "Template error: {msg}"),
            Error::Layout(msg) => write!(f, "Layout error: {msg}"),
            Error::Data(msg) => write!(f, "Data error: {msg}"),
            Error::Misuse(msg) => write!(f, "Drawing protocol violated: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Zip(e) => Some(e),
            Error::Xml(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Error::Zip(e)
    }
}

impl From<roxmltree::Error> for Error {
    fn from(e: roxmltree::Error) -> Self {
        Error::Xml(e)
    }
}
