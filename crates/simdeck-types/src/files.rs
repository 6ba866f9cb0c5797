//! Records returned when retrieving a simulation's data files.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Content-type classification of a stored file.
///
/// Only two classes exist: `.txt` files are plain text, everything else
/// (including the `.json` range files) is reported as generic binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum MimeType {
    /// `text/plain`
    #[serde(rename = "text/plain")]
    TextPlain,
    /// `application/octet-stream`
    #[serde(rename = "application/octet-stream")]
    OctetStream,
}

impl MimeType {
    /// The MIME string for this classification.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TextPlain => "text/plain",
            Self::OctetStream => "application/octet-stream",
        }
    }
}

impl core::fmt::Display for MimeType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One file of a simulation's range, with its full text content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct FileRecord {
    /// File name within the store.
    pub file_name: String,
    /// Full textual content.
    pub content: String,
    /// Content-type classification.
    pub mime_type: MimeType,
}
