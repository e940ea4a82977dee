//! Plain-text outputs: PR rows and per-frame dumps.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use super::metrics::PrPoint;
use crate::events::VadOutput;

/// `"<threshold> <precision> <recall>"` with 2/4/4 decimals.
pub fn format_pr_row(point: &PrPoint) -> String {
    format!(
        "{:.2} {:.4} {:.4}",
        point.threshold, point.precision, point.recall
    )
}

pub fn write_pr_rows(path: impl AsRef<Path>, points: &[PrPoint]) -> io::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut out = io::BufWriter::new(fs::File::create(path)?);
    for point in points {
        writeln!(out, "{}", format_pr_row(point))?;
    }
    out.flush()
}

/// `"[<index>] <probability>, <flag>"`, one line per frame.
pub fn format_frame_line(index: usize, output: &VadOutput) -> String {
    format!(
        "[{index}] {:.6}, {}",
        output.probability,
        output.flag.as_i32()
    )
}

pub fn write_frame_dump<W: Write>(mut out: W, outputs: &[VadOutput]) -> io::Result<()> {
    for (i, output) in outputs.iter().enumerate() {
        writeln!(out, "{}", format_frame_line(i, output))?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::VadFlag;

    #[test]
    fn pr_row_format() {
        let point = PrPoint {
            threshold: 0.5,
            precision: 0.912345,
            recall: 0.8,
            false_positive_rate: 0.0,
            false_negative_rate: 0.0,
        };
        assert_eq!(format_pr_row(&point), "0.50 0.9123 0.8000");
    }

    #[test]
    fn frame_dump_matches_demo_format() {
        let outputs = [
            VadOutput {
                probability: 0.012,
                flag: VadFlag::Silence,
            },
            VadOutput {
                probability: 0.97,
                flag: VadFlag::Speech,
            },
        ];
        let mut buf = Vec::new();
        write_frame_dump(&mut buf, &outputs).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "[0] 0.012000, 0\n[1] 0.970000, 1\n");
    }

    #[test]
    fn pr_rows_written_one_per_line() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out").join("PR_data.txt");
        let points = [0.0f32, 1.0].map(|threshold| PrPoint {
            threshold,
            precision: 1.0,
            recall: 0.5,
            false_positive_rate: 0.0,
            false_negative_rate: 0.5,
        });
        write_pr_rows(&path, &points).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "0.00 1.0000 0.5000\n1.00 1.0000 0.5000\n");
    }
}
