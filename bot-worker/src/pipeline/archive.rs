//! Archive extraction.
//!
//! The dictionary URL ends in `.txt`, but the upstream server actually
//! serves a ZIP archive containing the text file. That is a documented
//! quirk of the source, not something to work around: we always open
//! the download as an archive and pull out its first entry.

use std::io::{Cursor, Read};
use std::path::Path;

use tracing::info;
use zip::ZipArchive;

use crate::error::JobError;

/// Extract the first entry of the archive at `archive_path` to `dest`.
///
/// Returns the entry's name inside the archive. An archive with no
/// entries is a distinct `EmptyArchive` failure; an unreadable archive
/// is a `Decode` failure.
pub async fn extract_first_entry(archive_path: &Path, dest: &Path) -> Result<String, JobError> {
    let bytes = tokio::fs::read(archive_path).await?;

    // The zip reader is synchronous; run it off the async executor.
    let (name, data) = tokio::task::spawn_blocking(move || extract_in_memory(&bytes))
        .await
        .map_err(|e| JobError::Internal(format!("extraction task failed: {e}")))??;

    tokio::fs::write(dest, &data).await?;

    info!(
        entry = %name,
        bytes = data.len(),
        dest = %dest.display(),
        "dictionary_entry_extracted"
    );

    Ok(name)
}

fn extract_in_memory(bytes: &[u8]) -> Result<(String, Vec<u8>), JobError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| JobError::Decode(format!("not a readable archive: {e}")))?;

    if archive.is_empty() {
        return Err(JobError::EmptyArchive);
    }

    let mut entry = archive
        .by_index(0)
        .map_err(|e| JobError::Decode(format!("archive entry unreadable: {e}")))?;

    let mut data = Vec::with_capacity(entry.size() as usize);
    entry
        .read_to_end(&mut data)
        .map_err(|e| JobError::Decode(format!("archive entry truncated: {e}")))?;

    Ok((entry.name().to_string(), data))
}

/// Build a ZIP archive in memory. Test fixture shared across modules.
#[cfg(test)]
pub(crate) fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}
