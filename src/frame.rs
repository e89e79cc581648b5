//! # Frame Decoder
//!
//! Decodes newline-delimited telemetry frames from the sensor serial link.
//!
//! This module handles:
//! - Splitting a line into a frame-type tag and `key=value` segments
//! - Tolerating malformed segments (dropped silently, frame kept)
//! - Rejecting frames with unknown tags or missing required fields
//! - Producing typed `Frame` candidates for the ingest pipeline
//!
//! Frame grammar (one frame per line):
//!
//! ```text
//! r;bin_id=<id>;level=<0-100>;lid_closed=<true|false>
//! i;bin_id=<id>;height=<int>;width=<int>
//! ```

use std::collections::HashMap;

use crate::error::{BridgeError, Result};

/// A decoded sensor reading frame (`r` tag)
///
/// `lid_closed` is tri-state: the field is optional on the wire, and any
/// value other than `"true"`/`"false"` is treated as absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadingFrame {
    /// Bin id the reading refers to
    pub bin_id: String,
    /// Fill level in percent (0-100)
    pub level: u8,
    /// Lid sensor state, if the frame carried one
    pub lid_closed: Option<bool>,
}

/// A decoded bin dimension update frame (`i` tag)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataFrame {
    /// Bin id the update refers to
    pub bin_id: String,
    /// Bin height in centimeters
    pub height: u32,
    /// Bin width in centimeters
    pub width: u32,
}

/// One decoded line of serial input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Telemetry reading (`r`)
    Reading(ReadingFrame),
    /// Bin metadata update (`i`)
    Metadata(MetadataFrame),
}

/// Decode one newline-terminated line into a typed frame
///
/// # Arguments
///
/// * `line` - One line of serial input, without the trailing newline
///
/// # Returns
///
/// * `Result<Frame>` - Decoded frame, or error if the line is unusable
///
/// # Errors
///
/// Returns `BridgeError::MalformedFrame` if:
/// - The leading tag is not `r` or `i`
/// - A required field is missing or fails to parse
/// - A reading's level is outside 0-100
///
/// Malformed *segments* (no `=`, empty key or value) are dropped without
/// failing the frame; the transport gives no replay, so the decoder keeps
/// whatever is salvageable and lets required-field checks decide.
pub fn decode_line(line: &str) -> Result<Frame> {
    let line = line.trim();
    let mut parts = line.split(';');

    let tag = parts.next().unwrap_or("");
    let fields = collect_fields(parts);

    match tag {
        "r" => decode_reading(line, &fields),
        "i" => decode_metadata(line, &fields),
        other => Err(BridgeError::MalformedFrame(format!(
            "unrecognized tag {:?} in line {:?}",
            other, line
        ))),
    }
}

/// Collect `key=value` segments into a map, dropping malformed ones
///
/// Duplicate keys keep the last occurrence, matching map-overwrite
/// semantics on the device side.
fn collect_fields<'a>(segments: impl Iterator<Item = &'a str>) -> HashMap<&'a str, &'a str> {
    let mut fields = HashMap::new();
    for segment in segments {
        let Some((key, value)) = segment.split_once('=') else {
            continue;
        };
        if key.is_empty() || value.is_empty() {
            continue;
        }
        fields.insert(key, value);
    }
    fields
}

fn decode_reading(line: &str, fields: &HashMap<&str, &str>) -> Result<Frame> {
    let bin_id = require(line, fields, "bin_id")?;
    let level_raw = require(line, fields, "level")?;

    let level: u8 = level_raw.parse().map_err(|_| {
        BridgeError::MalformedFrame(format!("unparseable level {:?} in line {:?}", level_raw, line))
    })?;
    if level > 100 {
        return Err(BridgeError::MalformedFrame(format!(
            "level {} out of range in line {:?}",
            level, line
        )));
    }

    // Tri-state lid field: anything but the two literals means "unknown"
    let lid_closed = match fields.get("lid_closed").copied() {
        Some("true") => Some(true),
        Some("false") => Some(false),
        _ => None,
    };

    Ok(Frame::Reading(ReadingFrame {
        bin_id: bin_id.to_string(),
        level,
        lid_closed,
    }))
}

fn decode_metadata(line: &str, fields: &HashMap<&str, &str>) -> Result<Frame> {
    let bin_id = require(line, fields, "bin_id")?;
    let height = parse_dimension(line, fields, "height")?;
    let width = parse_dimension(line, fields, "width")?;

    Ok(Frame::Metadata(MetadataFrame {
        bin_id: bin_id.to_string(),
        height,
        width,
    }))
}

fn require<'a>(line: &str, fields: &HashMap<&'a str, &'a str>, key: &str) -> Result<&'a str> {
    fields.get(key).copied().ok_or_else(|| {
        BridgeError::MalformedFrame(format!("missing field {:?} in line {:?}", key, line))
    })
}

fn parse_dimension(line: &str, fields: &HashMap<&str, &str>, key: &str) -> Result<u32> {
    let raw = require(line, fields, key)?;
    raw.parse().map_err(|_| {
        BridgeError::MalformedFrame(format!("unparseable {} {:?} in line {:?}", key, raw, line))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_reading_frame() {
        let frame = decode_line("r;bin_id=bin1;level=72;lid_closed=true").unwrap();
        assert_eq!(
            frame,
            Frame::Reading(ReadingFrame {
                bin_id: "bin1".to_string(),
                level: 72,
                lid_closed: Some(true),
            })
        );
    }

    #[test]
    fn test_decode_metadata_frame() {
        let frame = decode_line("i;bin_id=bin1;height=100;width=50").unwrap();
        assert_eq!(
            frame,
            Frame::Metadata(MetadataFrame {
                bin_id: "bin1".to_string(),
                height: 100,
                width: 50,
            })
        );
    }

    #[test]
    fn test_reading_without_lid_field() {
        let frame = decode_line("r;bin_id=bin1;level=10").unwrap();
        match frame {
            Frame::Reading(r) => assert_eq!(r.lid_closed, None),
            other => panic!("expected reading frame, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_lid_value_treated_as_absent() {
        let frame = decode_line("r;bin_id=bin1;level=10;lid_closed=maybe").unwrap();
        match frame {
            Frame::Reading(r) => assert_eq!(r.lid_closed, None),
            other => panic!("expected reading frame, got {:?}", other),
        }
    }

    #[test]
    fn test_lid_false_is_distinct_from_absent() {
        let frame = decode_line("r;bin_id=bin1;level=10;lid_closed=false").unwrap();
        match frame {
            Frame::Reading(r) => assert_eq!(r.lid_closed, Some(false)),
            other => panic!("expected reading frame, got {:?}", other),
        }
    }

    #[test]
    fn test_unrecognized_tag_rejected() {
        assert!(decode_line("x;bin_id=bin1;level=10").is_err());
        assert!(decode_line("").is_err());
    }

    #[test]
    fn test_missing_required_fields_rejected() {
        assert!(decode_line("r;bin_id=bin1").is_err());
        assert!(decode_line("r;level=10").is_err());
        assert!(decode_line("i;bin_id=bin1;height=100").is_err());
        assert!(decode_line("i;height=100;width=50").is_err());
    }

    #[test]
    fn test_malformed_segments_dropped_not_fatal() {
        // Segment without '=', empty key, empty value: all dropped silently
        let frame = decode_line("r;garbage;=5;lid_closed=;bin_id=bin1;level=30").unwrap();
        match frame {
            Frame::Reading(r) => {
                assert_eq!(r.bin_id, "bin1");
                assert_eq!(r.level, 30);
                assert_eq!(r.lid_closed, None, "empty lid value should read as absent");
            }
            other => panic!("expected reading frame, got {:?}", other),
        }
    }

    #[test]
    fn test_dropped_segment_can_remove_required_field() {
        // level= has an empty value, so the frame is missing its level
        assert!(decode_line("r;bin_id=bin1;level=").is_err());
    }

    #[test]
    fn test_level_bounds() {
        assert!(decode_line("r;bin_id=bin1;level=0").is_ok());
        assert!(decode_line("r;bin_id=bin1;level=100").is_ok());
        assert!(decode_line("r;bin_id=bin1;level=101").is_err());
        assert!(decode_line("r;bin_id=bin1;level=-3").is_err());
        assert!(decode_line("r;bin_id=bin1;level=full").is_err());
    }

    #[test]
    fn test_unparseable_dimensions_rejected() {
        assert!(decode_line("i;bin_id=bin1;height=tall;width=50").is_err());
        assert!(decode_line("i;bin_id=bin1;height=100;width=-1").is_err());
    }

    #[test]
    fn test_duplicate_key_last_wins() {
        let frame = decode_line("r;bin_id=bin1;level=10;level=20").unwrap();
        match frame {
            Frame::Reading(r) => assert_eq!(r.level, 20),
            other => panic!("expected reading frame, got {:?}", other),
        }
    }

    #[test]
    fn test_whitespace_trimmed() {
        let frame = decode_line("  r;bin_id=bin1;level=42\r").unwrap();
        match frame {
            Frame::Reading(r) => assert_eq!(r.level, 42),
            other => panic!("expected reading frame, got {:?}", other),
        }
    }
}
