mod error;
mod loader;
mod xml;

pub use error::{ContentError, ContentErrorCode, SourceLocation};
pub use loader::{AssetLoader, MapData, MemoryAssets, ObjectDef, ObjectDefKind};
pub use xml::XmlAssets;
