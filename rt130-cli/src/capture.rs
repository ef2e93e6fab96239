//! Length-framed capture files
//!
//! A capture is a sequence of frames, each `KK` + 5 ASCII digit payload length
//! + payload. Record frames carry the complete record, starting with its own
//! kind code; `LG` frames carry state-of-health log text.

use rt130_decoder::RecordKind;

/// Frame header size: kind (2) + length (5)
pub const FRAME_HEADER_LEN: usize = 7;

/// Code of frames holding log text
pub const LOG_FRAME: &str = "LG";

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Truncated frame at offset {offset}: need {needed} bytes, {available} left")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Bad frame length {raw:?} at offset {offset}")]
    BadLength { offset: usize, raw: String },
}

/// One frame of a capture
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Record { kind: RecordKind, bytes: Vec<u8> },
    Log(String),
    /// Frame with a code the decoder does not know; kept for reporting
    Unknown { code: String, len: usize },
}

/// Split a capture into frames
pub fn read_frames(data: &[u8]) -> Result<Vec<Frame>, CaptureError> {
    let mut frames = Vec::new();
    let mut offset = 0;

    while offset < data.len() {
        let available = data.len() - offset;
        if available < FRAME_HEADER_LEN {
            return Err(CaptureError::Truncated {
                offset,
                needed: FRAME_HEADER_LEN,
                available,
            });
        }

        let code = String::from_utf8_lossy(&data[offset..offset + 2]).into_owned();
        let raw_len = &data[offset + 2..offset + FRAME_HEADER_LEN];
        let len: usize = std::str::from_utf8(raw_len)
            .ok()
            .filter(|s| s.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| CaptureError::BadLength {
                offset,
                raw: String::from_utf8_lossy(raw_len).into_owned(),
            })?;

        let start = offset + FRAME_HEADER_LEN;
        if data.len() - start < len {
            return Err(CaptureError::Truncated {
                offset,
                needed: FRAME_HEADER_LEN + len,
                available,
            });
        }
        let payload = &data[start..start + len];

        let frame = if code == LOG_FRAME {
            Frame::Log(String::from_utf8_lossy(payload).into_owned())
        } else {
            match RecordKind::from_code(&code) {
                Ok(kind) => Frame::Record {
                    kind,
                    bytes: payload.to_vec(),
                },
                Err(_) => {
                    log::warn!("Unknown frame kind {:?} at offset {}, skipping", code, offset);
                    Frame::Unknown { code, len }
                }
            }
        };
        frames.push(frame);
        offset = start + len;
    }

    log::debug!("Read {} frames", frames.len());
    Ok(frames)
}

/// Build one frame
pub fn frame(code: &str, payload: &[u8]) -> Vec<u8> {
    let mut out = format!("{:<2.2}{:05}", code, payload.len()).into_bytes();
    out.extend_from_slice(payload);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_mixed_frames() {
        let mut data = frame("US", b"US2024:060:12:00:00 13.2  3.3+24.5");
        data.extend(frame("LG", b"186:00:00:00 LINK IS UP\n"));
        data.extend(frame("QQ", b"???"));

        let frames = read_frames(&data).unwrap();
        assert_eq!(frames.len(), 3);
        assert!(matches!(&frames[0], Frame::Record { kind: RecordKind::Unit, bytes } if bytes.len() == 34));
        assert_eq!(frames[1], Frame::Log("186:00:00:00 LINK IS UP\n".into()));
        assert_eq!(frames[2], Frame::Unknown { code: "QQ".into(), len: 3 });
    }

    #[test]
    fn test_truncated_payload() {
        let mut data = frame("XC", &[b' '; 71]);
        data.truncate(40);
        assert!(matches!(read_frames(&data), Err(CaptureError::Truncated { offset: 0, .. })));
    }

    #[test]
    fn test_bad_length() {
        assert!(matches!(
            read_frames(b"XC00a12abc"),
            Err(CaptureError::BadLength { offset: 0, .. })
        ));
    }

    #[test]
    fn test_empty_capture() {
        assert!(read_frames(b"").unwrap().is_empty());
    }
}
