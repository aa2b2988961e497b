use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::{debug, info, trace};
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::message::Attachment;

/// How a mail client should present an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Inline,
    Attachment,
    /// No disposition given (the empty string on the command line).
    Unset,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Inline => "inline",
            Disposition::Attachment => "attachment",
            Disposition::Unset => "",
        }
    }

    /// The disposition actually sent to the provider.
    pub fn resolve(self) -> Self {
        match self {
            Disposition::Unset => Disposition::Attachment,
            other => other,
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
#[error("invalid disposition '{0}' (expected 'inline', 'attachment' or '')")]
pub struct ParseDispositionError(String);

impl FromStr for Disposition {
    type Err = ParseDispositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inline" => Ok(Disposition::Inline),
            "attachment" => Ok(Disposition::Attachment),
            "" => Ok(Disposition::Unset),
            other => Err(ParseDispositionError(other.to_string())),
        }
    }
}

impl Serialize for Disposition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.resolve().as_str())
    }
}

#[derive(Error, Debug)]
pub enum AttachmentError {
    #[error("Number of attachments ({attachments}) and dispositions ({dispositions}) must be the same")]
    CountMismatch {
        attachments: usize,
        dispositions: usize,
    },
    #[error("Failed to read attachment '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// An attachment path paired with the disposition it will be sent with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentSpec {
    pub path: PathBuf,
    pub disposition: Disposition,
}

/// Pair every path with a disposition.
///
/// No dispositions means `attachment` for all, a single one is applied to every
/// path, otherwise the counts must match and pairing is positional.
pub fn pair_dispositions(
    paths: &[PathBuf],
    dispositions: &[Disposition],
) -> Result<Vec<AttachmentSpec>, AttachmentError> {
    let dispositions = match dispositions {
        [Disposition::Unset] => &[][..],
        other => other,
    };

    let expanded = match dispositions {
        [] => vec![Disposition::Attachment; paths.len()],
        [only] => vec![*only; paths.len()],
        many if many.len() == paths.len() => many.to_vec(),
        many => {
            return Err(AttachmentError::CountMismatch {
                attachments: paths.len(),
                dispositions: many.len(),
            })
        }
    };

    Ok(paths
        .iter()
        .zip(expanded)
        .map(|(path, disposition)| AttachmentSpec {
            path: path.clone(),
            disposition: disposition.resolve(),
        })
        .collect())
}

/// Pair paths with dispositions and load every file into an attachment record.
///
/// All files are read before returning, so a failure leaves nothing half built.
pub fn reconcile(
    paths: &[PathBuf],
    dispositions: &[Disposition],
) -> Result<Vec<Attachment>, AttachmentError> {
    let specs = pair_dispositions(paths, dispositions)?;
    info!("Loading {} attachment(s)", specs.len());
    specs.iter().map(load).collect()
}

/// Read, encode and type a single attachment.
pub fn load(spec: &AttachmentSpec) -> Result<Attachment, AttachmentError> {
    let bytes = fs::read(&spec.path).map_err(|source| AttachmentError::Read {
        path: spec.path.clone(),
        source,
    })?;
    let filename = display_filename(&spec.path);
    let mime_type = detect_mime_type(&bytes);
    debug!(
        "Attachment {}: {} bytes, type={}, disposition={}",
        filename,
        bytes.len(),
        mime_type,
        spec.disposition
    );

    Ok(Attachment {
        content: STANDARD.encode(&bytes),
        mime_type,
        content_id: filename.clone(),
        filename,
        disposition: spec.disposition,
    })
}

fn display_filename(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Detect the MIME type from file content rather than its extension.
pub fn detect_mime_type(bytes: &[u8]) -> String {
    if let Some(kind) = infer::get(bytes) {
        return kind.mime_type().to_string();
    }
    trace!("No magic signature matched, falling back on content check");
    if bytes.is_empty() {
        "application/x-empty".to_string()
    } else if std::str::from_utf8(bytes).is_ok() {
        "text/plain".to_string()
    } else {
        "application/octet-stream".to_string()
    }
}
