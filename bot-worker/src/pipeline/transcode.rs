//! Derived dictionary variants.
//!
//! Dictionary lines carry the Japanese head word in a 【…】 bracket
//! followed by its English gloss. Two opposite per-line filters produce
//! the derived variants:
//!
//! - `HeadwordOnly` strips the gloss and keeps the bracketed head word
//! - `GlossOnly` strips the head-word bracket and keeps the gloss
//!
//! The source file is transcoded in bounded line batches so the full
//! decoded text and the full re-encoded output are never both resident.

use std::path::Path;

use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::error::JobError;
use crate::pipeline::codec::DictionaryCodec;

/// Opening marker of the head-word bracket.
const HEAD_OPEN: char = '【';

/// Closing marker of the head-word bracket.
const HEAD_CLOSE: char = '】';

/// Lines per transcoding batch.
const LINE_BATCH: usize = 4096;

/// Refuse inputs larger than this rather than risk the worker's memory.
const MAX_TRANSCODE_INPUT_BYTES: u64 = 256 * 1024 * 1024;

/// Which side of the head-word bracket a variant keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantKind {
    /// Keep `【headword】`, drop the gloss.
    HeadwordOnly,
    /// Drop `【headword】`, keep the gloss.
    GlossOnly,
}

impl VariantKind {
    /// Output file name for this variant.
    pub fn file_name(self) -> &'static str {
        match self {
            VariantKind::HeadwordOnly => "dictionary_headwords.txt",
            VariantKind::GlossOnly => "dictionary_glosses.txt",
        }
    }

    /// Human-readable name used in follow-up messages.
    pub fn label(self) -> &'static str {
        match self {
            VariantKind::HeadwordOnly => "headwords",
            VariantKind::GlossOnly => "glosses",
        }
    }
}

/// Apply one variant's per-line filter.
///
/// Lines without a complete `【…】` bracket pass through unchanged.
pub fn filter_line(line: &str, kind: VariantKind) -> String {
    let Some(start) = line.find(HEAD_OPEN) else {
        return line.to_string();
    };
    let Some(close_rel) = line[start..].find(HEAD_CLOSE) else {
        return line.to_string();
    };
    let end = start + close_rel + HEAD_CLOSE.len_utf8();

    match kind {
        VariantKind::HeadwordOnly => line[start..end].to_string(),
        VariantKind::GlossOnly => format!("{}{}", &line[..start], &line[end..]),
    }
}

fn ensure_input_size(len: u64) -> Result<(), JobError> {
    if len > MAX_TRANSCODE_INPUT_BYTES {
        return Err(JobError::OutOfMemory);
    }
    Ok(())
}

/// Derive one filtered variant of `src` into `dest`.
///
/// Reads the source as raw bytes, then decodes, filters, and re-encodes
/// in batches of [`LINE_BATCH`] lines. Splitting the raw bytes on `\n`
/// is safe for Shift_JIS: `0x0A` never appears as a trail byte.
/// Returns the written file's size in bytes.
pub async fn derive_variant(
    src: &Path,
    dest: &Path,
    kind: VariantKind,
    codec: &dyn DictionaryCodec,
) -> Result<u64, JobError> {
    let meta = tokio::fs::metadata(src).await?;
    ensure_input_size(meta.len())?;

    let raw = tokio::fs::read(src).await?;
    let lines: Vec<&[u8]> = raw.split(|&b| b == b'\n').collect();
    let total_lines = lines.len();

    let mut out = File::create(dest).await?;
    let mut processed = 0usize;

    for batch in lines.chunks(LINE_BATCH) {
        let mut text = String::new();

        for line in batch {
            processed += 1;
            let decoded = codec.decode(line)?;

            // Preserve CRLF endings through the filter.
            let (body, had_cr) = match decoded.strip_suffix('\r') {
                Some(stripped) => (stripped, true),
                None => (decoded.as_str(), false),
            };

            text.push_str(&filter_line(body, kind));
            if had_cr {
                text.push('\r');
            }
            if processed < total_lines {
                text.push('\n');
            }
        }

        let encoded = codec.encode(&text)?;
        out.write_all(&encoded).await?;

        info!(
            variant = kind.label(),
            lines_processed = processed,
            lines_total = total_lines,
            "dictionary_transcode_progress"
        );
    }

    out.flush().await?;

    let size = tokio::fs::metadata(dest).await?.len();
    info!(
        variant = kind.label(),
        dest = %dest.display(),
        bytes = size,
        "dictionary_variant_written"
    );

    Ok(size)
}
