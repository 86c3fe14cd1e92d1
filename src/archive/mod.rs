//! ZIP container extraction.
//!
//! Packaged documents are read by scanning local file records from the start
//! of the buffer rather than through the central directory, which tolerates
//! archives whose trailing directory is damaged or missing. Entries are either
//! stored or raw-DEFLATE compressed (no zlib/gzip framing). CRC32 is not
//! verified.

use std::borrow::Cow;
use std::collections::HashMap;
use std::io::Read;

use memchr::memmem;
use tracing::instrument;

use crate::config::ArchiveConfig;
use crate::error::{Error, Result};
use crate::util::decode_markup;

#[cfg(test)]
pub(crate) mod test_helpers;

/// Local file header signature.
pub const LOCAL_HEADER_SIG: &[u8; 4] = b"PK\x03\x04";
/// Central directory file header signature.
pub const CENTRAL_HEADER_SIG: &[u8; 4] = b"PK\x01\x02";
/// End of central directory signature.
pub const END_OF_CENTRAL_DIR_SIG: &[u8; 4] = b"PK\x05\x06";
/// Optional signature in front of a streaming data descriptor.
pub const DATA_DESCRIPTOR_SIG: &[u8; 4] = b"PK\x07\x08";

const LOCAL_HEADER_LEN: usize = 30;
/// General purpose flag bit 3: sizes and CRC follow the payload.
const FLAG_DATA_DESCRIPTOR: u16 = 0x0008;

/// Payload compression of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
}

impl CompressionMethod {
    fn from_raw(method: u16) -> Option<Self> {
        match method {
            0 => Some(CompressionMethod::Stored),
            8 => Some(CompressionMethod::Deflate),
            _ => None,
        }
    }
}

/// One extracted file.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub name: String,
    pub method: CompressionMethod,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    /// Decompressed payload. Empty for directories.
    pub data: Vec<u8>,
}

impl ArchiveEntry {
    /// Directory entries end in a path separator and carry no payload.
    pub fn is_dir(&self) -> bool {
        self.name.ends_with('/')
    }
}

/// All entries of an archive, addressable by name.
#[derive(Debug, Clone, Default)]
pub struct Archive {
    entries: Vec<ArchiveEntry>,
    index: HashMap<String, usize>,
}

impl Archive {
    /// Extract every entry using default options.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_bytes_with(bytes, &ArchiveConfig::default())
    }

    /// Extract every entry from a ZIP-structured buffer.
    #[instrument(level = "debug", skip_all, fields(len = bytes.len()))]
    pub fn from_bytes_with(bytes: &[u8], config: &ArchiveConfig) -> Result<Self> {
        let mut archive = Archive::default();
        let mut pos = 0;

        while let Some(start) = next_local_header(bytes, pos) {
            let (entry, next) = read_entry(bytes, start, config)?;
            tracing::trace!(
                name = %entry.name,
                method = ?entry.method,
                compressed = entry.compressed_size,
                uncompressed = entry.data.len(),
                "Extracted archive entry"
            );
            archive.insert(entry);
            pos = next;
        }

        tracing::debug!(entries = archive.len(), "Archive extracted");
        Ok(archive)
    }

    fn insert(&mut self, entry: ArchiveEntry) {
        // Later duplicates win, matching what a central-directory reader would see.
        if let Some(&existing) = self.index.get(&entry.name) {
            self.entries[existing] = entry;
        } else {
            self.index.insert(entry.name.clone(), self.entries.len());
            self.entries.push(entry);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry names in archive order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Look up an entry, falling back to the percent-decoded name.
    pub fn get(&self, name: &str) -> Option<&ArchiveEntry> {
        if let Some(&i) = self.index.get(name) {
            return Some(&self.entries[i]);
        }
        let decoded = percent_encoding::percent_decode_str(name).decode_utf8().ok()?;
        self.index.get(decoded.as_ref()).map(|&i| &self.entries[i])
    }

    /// Payload bytes of a file entry.
    pub fn read(&self, name: &str) -> Option<&[u8]> {
        self.get(name)
            .filter(|e| !e.is_dir())
            .map(|e| e.data.as_slice())
    }

    /// Payload of a file entry decoded as markup text.
    pub fn read_text(&self, name: &str) -> Option<Cow<'_, str>> {
        self.read(name).map(decode_markup)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// Find the next local header at or after `pos`, stopping at the central directory.
fn next_local_header(bytes: &[u8], pos: usize) -> Option<usize> {
    let rest = bytes.get(pos..)?;
    if rest.starts_with(CENTRAL_HEADER_SIG) || rest.starts_with(END_OF_CENTRAL_DIR_SIG) {
        return None;
    }
    memmem::find(rest, LOCAL_HEADER_SIG).map(|i| pos + i)
}

fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Parse the local record at `start`. Returns the entry and the offset just
/// past its payload.
fn read_entry(
    bytes: &[u8],
    start: usize,
    config: &ArchiveConfig,
) -> Result<(ArchiveEntry, usize)> {
    if start + LOCAL_HEADER_LEN > bytes.len() {
        return Err(Error::Truncated {
            offset: start,
            what: "local file header",
        });
    }

    let flags = read_u16(bytes, start + 6);
    let raw_method = read_u16(bytes, start + 8);
    let mut compressed_size = read_u32(bytes, start + 18) as usize;
    let mut uncompressed_size = read_u32(bytes, start + 22) as u64;
    let name_len = read_u16(bytes, start + 26) as usize;
    let extra_len = read_u16(bytes, start + 28) as usize;

    let name_start = start + LOCAL_HEADER_LEN;
    let data_start = name_start + name_len + extra_len;
    if data_start > bytes.len() {
        return Err(Error::Truncated {
            offset: name_start,
            what: "file name",
        });
    }
    let name = String::from_utf8_lossy(&bytes[name_start..name_start + name_len]).into_owned();

    let streamed = flags & FLAG_DATA_DESCRIPTOR != 0 && compressed_size == 0;
    if streamed {
        let inferred = infer_streamed_sizes(bytes, data_start);
        compressed_size = inferred.compressed;
        if let Some(size) = inferred.uncompressed {
            uncompressed_size = size;
        }
    }

    let data_end = data_start + compressed_size;
    if data_end > bytes.len() {
        return Err(Error::Truncated {
            offset: data_start,
            what: "entry payload",
        });
    }

    let method = CompressionMethod::from_raw(raw_method).ok_or_else(|| {
        Error::UnsupportedCompression {
            name: name.clone(),
            method: raw_method,
        }
    })?;

    let payload = &bytes[data_start..data_end];
    let data = if name.ends_with('/') {
        Vec::new()
    } else {
        match method {
            CompressionMethod::Stored => payload.to_vec(),
            CompressionMethod::Deflate => inflate(
                &name,
                payload,
                uncompressed_size,
                config.inflate_fallback_multiple,
            )?,
        }
    };

    Ok((
        ArchiveEntry {
            name,
            method,
            compressed_size: compressed_size as u64,
            uncompressed_size,
            data,
        },
        data_end,
    ))
}

struct StreamedSizes {
    compressed: usize,
    uncompressed: Option<u64>,
}

/// Infer a streamed entry's payload length from the next record boundary,
/// excluding a trailing data descriptor when one is recognizable.
fn infer_streamed_sizes(bytes: &[u8], data_start: usize) -> StreamedSizes {
    let rest = &bytes[data_start..];
    let boundary = [LOCAL_HEADER_SIG, CENTRAL_HEADER_SIG]
        .iter()
        .filter_map(|sig| memmem::find(rest, *sig))
        .min()
        .unwrap_or(rest.len());
    let span = &rest[..boundary];

    // Signed descriptor: sig, crc32, compressed, uncompressed (16 bytes).
    if span.len() >= 16 && span[span.len() - 16..].starts_with(DATA_DESCRIPTOR_SIG) {
        let at = span.len() - 16;
        return StreamedSizes {
            compressed: at,
            uncompressed: Some(read_u32(span, at + 12) as u64),
        };
    }

    // Unsigned descriptor (12 bytes): accept it when its size field agrees.
    if span.len() >= 12 {
        let at = span.len() - 12;
        if read_u32(span, at + 4) as usize == at {
            return StreamedSizes {
                compressed: at,
                uncompressed: Some(read_u32(span, at + 8) as u64),
            };
        }
    }

    StreamedSizes {
        compressed: span.len(),
        uncompressed: None,
    }
}

/// Inflate a raw DEFLATE stream.
///
/// Output is bounded by the declared size, or by `fallback_multiple` times
/// the compressed length when the entry declares none. A stream that inflates
/// past the bound is an error. Preallocation never exceeds the fallback
/// bound, whatever the header claims.
fn inflate(
    name: &str,
    compressed: &[u8],
    declared: u64,
    fallback_multiple: usize,
) -> Result<Vec<u8>> {
    let fallback = compressed.len().saturating_mul(fallback_multiple.max(1)) as u64;
    let limit = if declared > 0 { declared } else { fallback };
    let capacity = usize::try_from(limit.min(fallback)).unwrap_or(0);

    let mut out = Vec::with_capacity(capacity);
    flate2::read::DeflateDecoder::new(compressed)
        .take(limit.saturating_add(1))
        .read_to_end(&mut out)
        .map_err(|source| Error::Decompress {
            name: name.to_string(),
            source,
        })?;
    if out.len() as u64 > limit {
        return Err(Error::Decompress {
            name: name.to_string(),
            source: std::io::Error::other(format!("inflated past {limit} bytes")),
        });
    }
    Ok(out)
}
