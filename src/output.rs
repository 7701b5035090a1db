//! Tabular interchange formats.
//!
//! Two CSV artifacts exist:
//!
//! - the **final report**, one row per surviving detection:
//!   `id, conf_<class>..., geo_wkt, pixel_wkt` with a header row; and
//! - the **intermediate log**, one row per accumulated global detection
//!   (`raster, min_x, min_y, max_x, max_y, class, score`), appended while
//!   the scan runs so an interrupted run can resume from it without
//!   re-running the detector.
//!
//! Every writer emits `\n` line terminators regardless of host platform.
//! This is a hard requirement of the interchange format, not a preference.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ScanError;
use crate::types::{Detection, PixelBox};

/// What to write when no detections survive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyPolicy {
    /// A well-formed file containing only the header row.
    #[default]
    HeaderOnly,
    /// One zeroed placeholder row marking "no detections".
    Placeholder,
}

/// One fully-enriched output row: sequential per-raster id, per-class
/// confidences (the detection's score in its own class column, zero
/// elsewhere) and both polygon serializations.
#[derive(Clone, Debug, Serialize)]
pub struct DetectionRecord {
    pub id: usize,
    pub scores: Vec<f32>,
    pub geo_wkt: String,
    pub pixel_wkt: String,
}

/// Write the final report for one raster.
///
/// The header names the fixed column order; WKT fields are quoted because
/// they contain commas.
pub fn write_report<W: Write>(
    mut out: W,
    classes: &[String],
    records: &[DetectionRecord],
    empty_policy: EmptyPolicy,
) -> io::Result<()> {
    write!(out, "id")?;
    for class in classes {
        write!(out, ",conf_{class}")?;
    }
    write!(out, ",geo_wkt,pixel_wkt\n")?;

    if records.is_empty() && empty_policy == EmptyPolicy::Placeholder {
        write!(out, "0")?;
        for _ in classes {
            write!(out, ",0")?;
        }
        write!(out, ",\"POLYGON EMPTY\",\"POLYGON EMPTY\"\n")?;
        return out.flush();
    }

    for record in records {
        write!(out, "{}", record.id)?;
        for score in &record.scores {
            write!(out, ",{score}")?;
        }
        write!(out, ",\"{}\",\"{}\"\n", record.geo_wkt, record.pixel_wkt)?;
    }
    out.flush()
}

/// Write the final report to `path`, creating parent directories.
pub fn write_report_file(
    path: &Path,
    classes: &[String],
    records: &[DetectionRecord],
    empty_policy: EmptyPolicy,
) -> Result<(), ScanError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    write_report(BufWriter::new(file), classes, records, empty_policy)?;
    Ok(())
}

/// Append-mode writer for the intermediate detections log.
pub struct IntermediateWriter {
    out: BufWriter<File>,
}

impl IntermediateWriter {
    /// Open `path` for appending, creating it (and parents) if missing.
    pub fn append(path: &Path) -> Result<Self, ScanError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            out: BufWriter::new(file),
        })
    }

    /// Record one accumulated raster-global detection.
    pub fn record(
        &mut self,
        raster: &str,
        detection: &Detection,
        class_name: &str,
    ) -> Result<(), ScanError> {
        let b = &detection.bbox;
        write!(
            self.out,
            "{},{},{},{},{},{},{}\n",
            raster, b.min_x, b.min_y, b.max_x, b.max_y, class_name, detection.score
        )?;
        self.out.flush()?;
        Ok(())
    }
}

/// Read an intermediate detections log back, grouped by raster path (sorted
/// for deterministic iteration). Rows with an empty class field are skipped,
/// as are blank lines. Class names must appear in `classes`.
pub fn read_intermediate(
    path: &Path,
    classes: &[String],
) -> Result<BTreeMap<String, Vec<Detection>>, ScanError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut grouped: BTreeMap<String, Vec<Detection>> = BTreeMap::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        let malformed = |reason: &str| ScanError::MalformedCsv {
            path: path.to_path_buf(),
            line: index + 1,
            reason: reason.to_string(),
        };

        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != 7 {
            return Err(malformed(&format!("expected 7 fields, got {}", fields.len())));
        }
        if fields[5].is_empty() {
            continue;
        }
        let label = classes
            .iter()
            .position(|c| c == fields[5])
            .ok_or_else(|| malformed(&format!("unknown class {:?}", fields[5])))?;

        let mut coords = [0f64; 4];
        for (slot, raw) in coords.iter_mut().zip(&fields[1..5]) {
            *slot = raw
                .parse()
                .map_err(|_| malformed(&format!("bad coordinate {raw:?}")))?;
        }
        let score: f32 = fields[6]
            .parse()
            .map_err(|_| malformed(&format!("bad score {:?}", fields[6])))?;

        grouped.entry(fields[0].to_string()).or_default().push(Detection::new(
            PixelBox::new(coords[0], coords[1], coords[2], coords[3]),
            label,
            score,
        ));
    }

    Ok(grouped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes() -> Vec<String> {
        vec![
            "foundation".to_string(),
            "unfinished".to_string(),
            "completed".to_string(),
        ]
    }

    #[test]
    fn report_header_names_fixed_columns() {
        let mut buf = Vec::new();
        write_report(&mut buf, &classes(), &[], EmptyPolicy::HeaderOnly).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "id,conf_foundation,conf_unfinished,conf_completed,geo_wkt,pixel_wkt\n"
        );
    }

    #[test]
    fn report_rows_quote_wkt_and_end_with_newline_only() {
        let record = DetectionRecord {
            id: 1,
            scores: vec![0.0, 0.75, 0.0],
            geo_wkt: "POLYGON ((0 0, 0 1, 1 1, 1 0, 0 0))".to_string(),
            pixel_wkt: "POLYGON ((0 0, 0 1, 1 1, 1 0, 0 0))".to_string(),
        };
        let mut buf = Vec::new();
        write_report(&mut buf, &classes(), &[record], EmptyPolicy::HeaderOnly).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(!text.contains('\r'), "line terminator must be a bare \\n");
        let rows: Vec<&str> = text.trim_end().split('\n').collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[1].starts_with("1,0,0.75,0,\"POLYGON (("));
    }

    #[test]
    fn placeholder_policy_emits_one_zeroed_row() {
        let mut buf = Vec::new();
        write_report(&mut buf, &classes(), &[], EmptyPolicy::Placeholder).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let rows: Vec<&str> = text.trim_end().split('\n').collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], "0,0,0,0,\"POLYGON EMPTY\",\"POLYGON EMPTY\"");
    }

    #[test]
    fn intermediate_log_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan_intermediate.csv");

        let mut writer = IntermediateWriter::append(&path).unwrap();
        let det = Detection::new(PixelBox::new(310.0, 410.0, 350.0, 450.0), 1, 0.8);
        writer.record("a.tif", &det, "unfinished").unwrap();
        writer
            .record(
                "b.tif",
                &Detection::new(PixelBox::new(0.0, 0.0, 5.0, 5.0), 0, 0.4),
                "foundation",
            )
            .unwrap();
        drop(writer);

        let grouped = read_intermediate(&path, &classes()).unwrap();
        assert_eq!(grouped.len(), 2);
        let a = &grouped["a.tif"];
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].bbox, PixelBox::new(310.0, 410.0, 350.0, 450.0));
        assert_eq!(a[0].label, 1);
        assert_eq!(a[0].score, 0.8);
    }

    #[test]
    fn intermediate_reader_rejects_unknown_class() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "a.tif,0,0,1,1,warehouse,0.5\n").unwrap();
        let err = read_intermediate(&path, &classes()).unwrap_err();
        assert!(matches!(err, ScanError::MalformedCsv { line: 1, .. }));
    }
}
