//! Segment label files and their frame-wise expansion.
//!
//! A label file's first line reads
//! `<name>,<start>,<end>,<label>,<start>,<end>,<label>,...` with times in
//! seconds and labels `0` (non-speech) or `1` (speech).

use std::fs;
use std::path::Path;

use crate::error::{Result, VadError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelSegment {
    pub start: f64,
    pub end: f64,
    pub speech: bool,
}

/// Parse one label line. The leading name field is ignored.
pub fn parse_label_line(line: &str) -> std::result::Result<Vec<LabelSegment>, String> {
    let fields: Vec<&str> = line.trim().split(',').skip(1).map(str::trim).collect();
    if fields.len() % 3 != 0 {
        return Err(format!(
            "expected start,end,label triples, got {} fields",
            fields.len()
        ));
    }

    fields
        .chunks_exact(3)
        .map(|triple| {
            let start: f64 = triple[0]
                .parse()
                .map_err(|_| format!("invalid start time `{}`", triple[0]))?;
            let end: f64 = triple[1]
                .parse()
                .map_err(|_| format!("invalid end time `{}`", triple[1]))?;
            let speech = match triple[2] {
                "0" => false,
                "1" => true,
                other => return Err(format!("label must be 0 or 1, got `{other}`")),
            };
            if !start.is_finite() || !end.is_finite() {
                return Err(format!("segment times must be finite ({start}, {end})"));
            }
            if end < start {
                return Err(format!("segment ends before it starts ({start} > {end})"));
            }
            Ok(LabelSegment { start, end, speech })
        })
        .collect()
}

/// Read the segments from the first line of a label file.
pub fn read_label_file(path: impl AsRef<Path>) -> Result<Vec<LabelSegment>> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)?;
    let line = raw.lines().next().unwrap_or_default();
    parse_label_line(line).map_err(|reason| VadError::Label {
        path: path.to_path_buf(),
        reason,
    })
}

/// Expand segments into one 0/1 label per frame of `hop_size` samples.
///
/// Each segment contributes `round((end - start) / frame_duration)` frames
/// (ties to even). The result is truncated to the whole number of frames
/// spanned by the first start and the last end, and never exceeds
/// `max_frames`.
pub fn labels_to_framewise(
    segments: &[LabelSegment],
    hop_size: usize,
    sample_rate: u32,
    max_frames: usize,
) -> Vec<u8> {
    let (Some(first), Some(last)) = (segments.first(), segments.last()) else {
        return Vec::new();
    };
    let frame_duration = hop_size as f64 / sample_rate as f64;
    let span = ((last.end - first.start) / frame_duration).max(0.0) as usize;
    let span = span.min(max_frames);

    let mut framewise = Vec::with_capacity(span);
    for seg in segments {
        let remaining = span - framewise.len();
        if remaining == 0 {
            break;
        }
        let count = ((seg.end - seg.start) / frame_duration).round_ties_even() as usize;
        framewise.extend(std::iter::repeat(u8::from(seg.speech)).take(count.min(remaining)));
    }
    framewise
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_triples_after_name() {
        let segs = parse_label_line("utt01,0.0,0.5,0,0.5,1.25,1\n").unwrap();
        assert_eq!(segs.len(), 2);
        assert_eq!(
            segs[1],
            LabelSegment {
                start: 0.5,
                end: 1.25,
                speech: true
            }
        );
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(parse_label_line("utt,0.0,0.5").is_err());
        assert!(parse_label_line("utt,0.0,0.5,2").is_err());
        assert!(parse_label_line("utt,a,0.5,1").is_err());
        assert!(parse_label_line("utt,1.0,0.5,1").is_err());
    }

    #[test]
    fn expands_segments_at_hop_resolution() {
        // 256 samples at 16 kHz = 16 ms per frame.
        let segs = parse_label_line("x,0.0,0.032,0,0.032,0.096,1").unwrap();
        let frames = labels_to_framewise(&segs, 256, 16_000, usize::MAX);
        assert_eq!(frames, vec![0, 0, 1, 1, 1, 1]);
    }

    #[test]
    fn truncates_to_total_span() {
        // 0.024 s / 0.016 s = 1.5 → rounds to 2 per segment, span = 3 frames.
        let segs = parse_label_line("x,0.0,0.024,1,0.024,0.048,0").unwrap();
        let frames = labels_to_framewise(&segs, 256, 16_000, usize::MAX);
        assert_eq!(frames, vec![1, 1, 0]);
    }

    #[test]
    fn oversized_segment_is_capped_to_span() {
        let segs = [
            LabelSegment {
                start: 0.0,
                end: 1.0e12,
                speech: true,
            },
            LabelSegment {
                start: 0.0,
                end: 0.048,
                speech: false,
            },
        ];
        // Span is 0.048 s = 3 frames, filled by the first segment.
        let frames = labels_to_framewise(&segs, 256, 16_000, usize::MAX);
        assert_eq!(frames, vec![1, 1, 1]);
    }

    #[test]
    fn huge_span_is_capped_to_max_frames() {
        let segs = parse_label_line("x,0,1e18,1").unwrap();
        let frames = labels_to_framewise(&segs, 256, 16_000, 10);
        assert_eq!(frames, vec![1; 10]);
    }

    #[test]
    fn rejects_non_finite_times() {
        assert!(parse_label_line("x,0,inf,1").is_err());
        assert!(parse_label_line("x,NaN,1,1").is_err());
    }

    #[test]
    fn empty_segments_yield_no_frames() {
        assert!(labels_to_framewise(&[], 256, 16_000, usize::MAX).is_empty());
    }

    #[test]
    fn reads_first_line_of_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("a.scv");
        fs::write(&path, "a,0.0,0.016,1\nignored,line").unwrap();
        let segs = read_label_file(&path).unwrap();
        assert_eq!(segs.len(), 1);

        fs::write(&path, "a,0.0,0.016").unwrap();
        assert!(matches!(
            read_label_file(&path),
            Err(VadError::Label { .. })
        ));
    }
}
