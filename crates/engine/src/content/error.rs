use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentErrorCode {
    UnknownResource,
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownField,
    DuplicateField,
    MissingField,
    InvalidValue,
    ShapeMismatch,
}

#[derive(Debug, Clone)]
pub struct ContentError {
    pub code: ContentErrorCode,
    pub message: String,
    pub resource: String,
    pub file_path: Option<PathBuf>,
    pub location: Option<SourceLocation>,
}

impl ContentError {
    pub(crate) fn new(
        code: ContentErrorCode,
        message: impl Into<String>,
        resource: &str,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            resource: resource.to_string(),
            file_path: None,
            location: None,
        }
    }
}

impl fmt::Display for ContentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {} (resource={}", self.code, self.message, self.resource)?;
        if let Some(path) = &self.file_path {
            write!(f, ", file={}", path.display())?;
        }
        if let Some(loc) = self.location {
            write!(f, ", line={}, column={}", loc.line, loc.column)?;
        }
        f.write_str(")")
    }
}

impl std::error::Error for ContentError {}
