//! Archive fixtures for unit tests.
//!
//! Well-formed archives come from the `zip` crate. [`RawRecords`] writes the
//! local records it will not produce: arbitrary deflate payloads with any
//! declared size, unsigned data descriptors, and no central directory.

use std::io::{Cursor, Write};

use flate2::Compression;
use flate2::write::DeflateEncoder;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn options(compress: bool) -> SimpleFileOptions {
    let method = if compress {
        CompressionMethod::Deflated
    } else {
        CompressionMethod::Stored
    };
    SimpleFileOptions::default().compression_method(method)
}

fn write_entries<W: Write + std::io::Seek>(
    writer: &mut ZipWriter<W>,
    entries: &[(&str, &[u8], bool)],
) {
    for &(name, data, compress) in entries {
        if name.ends_with('/') {
            writer.add_directory(name, options(false)).unwrap();
        } else {
            writer.start_file(name, options(compress)).unwrap();
            writer.write_all(data).unwrap();
        }
    }
}

/// Archive of `(name, data, deflate?)` entries with sizes in every local
/// header and a central directory.
pub fn zip_archive(entries: &[(&str, &[u8], bool)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    write_entries(&mut writer, entries);
    writer.finish().unwrap().into_inner()
}

/// The same, written in streaming mode: zero sizes in each local header and
/// a signed data descriptor after each payload.
pub fn streamed_archive(entries: &[(&str, &[u8], bool)]) -> Vec<u8> {
    let mut writer = ZipWriter::new_stream(Vec::new());
    write_entries(&mut writer, entries);
    writer.finish().unwrap().into_inner()
}

/// Hand-assembled local records without a central directory.
#[derive(Default)]
pub struct RawRecords {
    out: Vec<u8>,
}

impl RawRecords {
    pub fn new() -> Self {
        Self::default()
    }

    fn header(&mut self, name: &str, method: u16, flags: u16, compressed: u32, declared: u32) {
        let out = &mut self.out;
        out.extend_from_slice(b"PK\x03\x04");
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&flags.to_le_bytes());
        out.extend_from_slice(&method.to_le_bytes());
        out.extend_from_slice(&[0; 8]);
        out.extend_from_slice(&compressed.to_le_bytes());
        out.extend_from_slice(&declared.to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(name.as_bytes());
    }

    /// A record with the given method, payload bytes and declared
    /// uncompressed size.
    pub fn record(mut self, name: &str, method: u16, payload: &[u8], declared: u32) -> Self {
        self.header(name, method, 0, payload.len() as u32, declared);
        self.out.extend_from_slice(payload);
        self
    }

    /// A streamed stored record followed by a 12-byte descriptor that has no
    /// signature.
    pub fn unsigned_descriptor(mut self, name: &str, data: &[u8]) -> Self {
        self.header(name, 0, 0x0008, 0, 0);
        self.out.extend_from_slice(data);
        let mut crc = flate2::Crc::new();
        crc.update(data);
        self.out.extend_from_slice(&crc.sum().to_le_bytes());
        self.out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        self.out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.out
    }
}
