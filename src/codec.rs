//! Structure container codec.
//!
//! Decoding tries the gzip-wrapped form first and falls back to the raw tree
//! unless the caller asserted compression.  Each stage is one
//! [`Flavor`] read returning a `Result`; nothing is detected by catching a
//! failure somewhere deeper.

use crate::nbt::{self, Flavor, NbtCompound, NbtIoError};
use crate::template::{StructureTemplate, TemplateError};
use log::debug;
use thiserror::Error;

/// gzip member header magic.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Request body is empty")]
    EmptyInput,

    #[error("Could not process request body: {0}")]
    BadFormat(String),

    #[error("Could not process request body: {0}")]
    Template(#[from] TemplateError),
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("could not write structure tree: {0}")]
    Tree(#[from] NbtIoError),
}

/// What the transport says about the body's compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionHint {
    /// The sender declared gzip; the raw fallback is skipped.
    Gzip,
    /// Nothing was declared; both forms are tried.
    Unknown,
}

impl CompressionHint {
    /// From a `Content-Encoding` header value.
    pub fn from_content_encoding(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("gzip") => CompressionHint::Gzip,
            _ => CompressionHint::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Binary { compressed: bool },
    Text,
}

impl OutputFormat {
    pub fn is_compressed(&self) -> bool {
        matches!(self, OutputFormat::Binary { compressed: true })
    }
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

pub fn decode(bytes: &[u8], hint: CompressionHint) -> Result<StructureTemplate, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::EmptyInput);
    }

    let compressed = read_compressed(bytes);
    let tree = match (compressed, hint) {
        (Ok(tree), _) => tree,
        (Err(e), CompressionHint::Gzip) => {
            return Err(DecodeError::BadFormat(format!("not a gzip structure: {}", e)))
        }
        (Err(gz), CompressionHint::Unknown) => {
            debug!("gzip stage failed ({}), trying raw tree", gz);
            read_raw(bytes).map_err(|raw| {
                DecodeError::BadFormat(format!(
                    "neither gzip ({}) nor raw structure ({})",
                    gz, raw
                ))
            })?
        }
    };

    let template = StructureTemplate::from_tag(&tree)?;
    debug!(
        "decoded structure {} with {} blocks, {} entities",
        template.size(),
        template.blocks().len(),
        template.entities().len()
    );
    Ok(template)
}

fn read_compressed(bytes: &[u8]) -> Result<NbtCompound, NbtIoError> {
    if !bytes.starts_with(&GZIP_MAGIC) {
        return Err(NbtIoError::from(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "missing gzip header",
        )));
    }
    nbt::read_root(bytes, Flavor::GzCompressed)
}

fn read_raw(bytes: &[u8]) -> Result<NbtCompound, NbtIoError> {
    nbt::read_root(bytes, Flavor::Uncompressed)
}

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

pub fn encode(template: &StructureTemplate, format: OutputFormat) -> Result<Vec<u8>, EncodeError> {
    let tree = template.to_tag();
    match format {
        OutputFormat::Text => Ok(tree.to_string().into_bytes()),
        OutputFormat::Binary { compressed } => {
            let flavor = if compressed {
                Flavor::GzCompressed
            } else {
                Flavor::Uncompressed
            };
            Ok(nbt::write_root(&tree, flavor)?)
        }
    }
}
