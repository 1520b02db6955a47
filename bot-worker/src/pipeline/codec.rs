//! Pluggable text codec for the dictionary's legacy encoding.
//!
//! The wisdom-guild dictionary is Shift_JIS, a double-byte-aware 8-bit
//! encoding. The full codec decodes and re-encodes it faithfully; the
//! passthrough codec maps bytes 1:1 to `U+0000..U+00FF` so the file
//! survives a round trip even when real decoding is unavailable. Which
//! codec to use is decided once at startup by a capability probe, never
//! by catching failures mid-job.

use encoding_rs::SHIFT_JIS;
use tracing::{info, warn};

use crate::error::JobError;

/// Decode/encode seam between raw dictionary bytes and filterable text.
pub trait DictionaryCodec: Send + Sync {
    /// Codec name for logs.
    fn name(&self) -> &'static str;

    /// Whether decoded text carries real Japanese characters. When
    /// `false`, bracket filtering degrades to a byte-pattern no-op.
    fn is_lossless_text(&self) -> bool;

    /// Decode raw dictionary bytes into text.
    fn decode(&self, bytes: &[u8]) -> Result<String, JobError>;

    /// Encode text back into dictionary bytes.
    fn encode(&self, text: &str) -> Result<Vec<u8>, JobError>;
}

/// Full Shift_JIS codec backed by `encoding_rs`.
pub struct ShiftJisCodec;

impl DictionaryCodec for ShiftJisCodec {
    fn name(&self) -> &'static str {
        "shift_jis"
    }

    fn is_lossless_text(&self) -> bool {
        true
    }

    fn decode(&self, bytes: &[u8]) -> Result<String, JobError> {
        let (text, _, had_errors) = SHIFT_JIS.decode(bytes);
        if had_errors {
            return Err(JobError::Decode(
                "invalid Shift_JIS byte sequence".to_string(),
            ));
        }
        Ok(text.into_owned())
    }

    fn encode(&self, text: &str) -> Result<Vec<u8>, JobError> {
        let (bytes, _, had_errors) = SHIFT_JIS.encode(text);
        if had_errors {
            return Err(JobError::Decode(
                "text not representable in Shift_JIS".to_string(),
            ));
        }
        Ok(bytes.into_owned())
    }
}

/// Byte-preserving fallback codec.
///
/// Each byte becomes the char with the same scalar value, so
/// encode(decode(b)) == b for any input. Multi-byte Japanese characters
/// are *not* reconstructed, which is exactly the documented degradation.
pub struct PassthroughCodec;

impl DictionaryCodec for PassthroughCodec {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn is_lossless_text(&self) -> bool {
        false
    }

    fn decode(&self, bytes: &[u8]) -> Result<String, JobError> {
        Ok(bytes.iter().map(|&b| b as char).collect())
    }

    fn encode(&self, text: &str) -> Result<Vec<u8>, JobError> {
        text.chars()
            .map(|c| {
                u8::try_from(u32::from(c)).map_err(|_| {
                    JobError::Decode(format!("char {c:?} outside passthrough range"))
                })
            })
            .collect()
    }
}

/// Sample used to probe the full codec at startup.
const PROBE_TEXT: &str = "【辞書】dictionary";

/// Select the dictionary codec by capability probe.
///
/// Runs a known Japanese sample through a Shift_JIS round trip. On
/// success the full codec is used; otherwise the worker degrades to the
/// passthrough codec and says so loudly, because bracket filtering will
/// not match against passthrough-decoded text.
pub fn select_codec() -> Box<dyn DictionaryCodec> {
    let codec = ShiftJisCodec;
    let probe = codec
        .encode(PROBE_TEXT)
        .and_then(|bytes| codec.decode(&bytes));

    match probe {
        Ok(text) if text == PROBE_TEXT => {
            info!(codec = codec.name(), "dictionary_codec_selected");
            Box::new(codec)
        }
        _ => {
            warn!(
                codec = "passthrough",
                "dictionary_codec_degraded: Shift_JIS probe failed, \
                 bracket filtering will not match"
            );
            Box::new(PassthroughCodec)
        }
    }
}
