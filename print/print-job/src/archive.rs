//! Layer archive writers.

use std::io::{Cursor, Write};

use thiserror::Error;
use tracing::debug;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Name of the configuration manifest inside the archive.
pub const MANIFEST_NAME: &str = "slice-config.json";

/// Archive entry name of a 1-based layer, zero padded to 8 digits so
/// lexicographic order is Z order.
///
/// ```
/// assert_eq!(print_job::archive::layer_file_name(1), "00000001.png");
/// assert_eq!(print_job::archive::layer_file_name(1234), "00001234.png");
/// ```
#[must_use]
pub fn layer_file_name(layer: u32) -> String {
    format!("{layer:08}.png")
}

/// Errors raised while writing an archive.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ArchiveError {
    /// The zip writer failed.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Writing entry data failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The archive was already finished.
    #[error("archive already finished")]
    Finished,
}

/// Destination for layer images and the manifest.
pub trait LayerArchive {
    /// Store an encoded layer image as-is.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] if the entry cannot be written.
    fn add_layer(&mut self, name: &str, image: &[u8]) -> Result<(), ArchiveError>;

    /// Store the configuration manifest.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] if the entry cannot be written.
    fn add_manifest(&mut self, name: &str, json: &[u8]) -> Result<(), ArchiveError>;

    /// Close the archive and return its bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] if finalization fails or the archive was
    /// already finished.
    fn finish(&mut self) -> Result<Vec<u8>, ArchiveError>;
}

/// In-memory zip archive.
///
/// Layer images are stored without compression, the image codec already
/// compresses. The manifest is deflated.
pub struct ZipLayerArchive {
    writer: Option<ZipWriter<Cursor<Vec<u8>>>>,
    entries: usize,
}

impl ZipLayerArchive {
    /// Create an empty archive.
    #[must_use]
    pub fn new() -> Self {
        Self {
            writer: Some(ZipWriter::new(Cursor::new(Vec::new()))),
            entries: 0,
        }
    }

    /// Number of entries written so far.
    #[must_use]
    pub const fn entries(&self) -> usize {
        self.entries
    }

    fn write_entry(
        &mut self,
        name: &str,
        data: &[u8],
        options: SimpleFileOptions,
    ) -> Result<(), ArchiveError> {
        let writer = self.writer.as_mut().ok_or(ArchiveError::Finished)?;
        writer.start_file(name, options)?;
        writer.write_all(data)?;
        self.entries += 1;
        debug!(name, bytes = data.len(), "archive entry written");
        Ok(())
    }
}

impl Default for ZipLayerArchive {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ZipLayerArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipLayerArchive")
            .field("entries", &self.entries)
            .field("finished", &self.writer.is_none())
            .finish()
    }
}

impl LayerArchive for ZipLayerArchive {
    fn add_layer(&mut self, name: &str, image: &[u8]) -> Result<(), ArchiveError> {
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        self.write_entry(name, image, options)
    }

    fn add_manifest(&mut self, name: &str, json: &[u8]) -> Result<(), ArchiveError> {
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        self.write_entry(name, json, options)
    }

    fn finish(&mut self) -> Result<Vec<u8>, ArchiveError> {
        let writer = self.writer.take().ok_or(ArchiveError::Finished)?;
        Ok(writer.finish()?.into_inner())
    }
}
