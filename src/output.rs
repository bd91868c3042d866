use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use csv::Writer;
use serde::Serialize;

use crate::adjacency::GridShape;
use crate::bucket_queue::NIL;
use crate::config::SegmentationMethod;
use crate::errors::{IftError, Result};
use crate::path_function::INFINITY;
use crate::segmentation::Forest;

/// Per-image record written next to the maps
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub filename: String,
    pub method: SegmentationMethod,
    pub width: usize,
    pub height: usize,
    pub seeds: usize,
    pub roots: usize,
    pub removed: usize,
    pub propagations: usize,
    pub conquered: usize,
    pub regions: usize,
    pub path_length: Option<usize>,
    pub elapsed_ms: f64,
}

impl RunSummary {
    /// Number of distinct labels among conquered nodes
    pub fn count_regions(forest: &Forest) -> usize {
        forest
            .value
            .iter()
            .zip(&forest.label)
            .filter(|(value, _)| **value != INFINITY)
            .map(|(_, &label)| label)
            .collect::<BTreeSet<_>>()
            .len()
    }
}

fn axis_name(dim: usize) -> String {
    match dim {
        0 => "X".to_string(),
        1 => "Y".to_string(),
        2 => "Z".to_string(),
        _ => format!("C{}", dim),
    }
}

fn prepare(output_dir: &Path, file: String) -> Result<PathBuf> {
    let output_path = output_dir.join(file);
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(output_path)
}

/// Write one row per node: coordinates, path value, label and predecessor.
/// Unreached values and missing predecessors are left empty.
pub fn write_forest_csv<P: AsRef<Path>>(
    forest: &Forest,
    shape: &GridShape,
    output_dir: P,
    filename: &str,
) -> Result<PathBuf> {
    if forest.len() != shape.size() {
        return Err(IftError::DimensionMismatch {
            map: "forest",
            expected: shape.size(),
            found: forest.len(),
        });
    }
    let output_path = prepare(output_dir.as_ref(), format!("{}_forest.csv", filename))?;

    let mut writer = Writer::from_path(&output_path)?;

    let mut header = vec!["Node".to_string()];
    header.extend((0..shape.ndims()).map(axis_name));
    header.extend(["Value", "Label", "Predecessor"].map(String::from));
    writer.write_record(&header)?;

    for node in 0..forest.len() {
        let mut record = vec![node.to_string()];
        record.extend(shape.coordinates(node).iter().map(|c| c.to_string()));
        let value = forest.value[node];
        record.push(if value == INFINITY { String::new() } else { value.to_string() });
        record.push(forest.label[node].to_string());
        let pred = forest.predecessor[node];
        record.push(if pred == NIL { String::new() } else { pred.to_string() });
        writer.write_record(&record)?;
    }

    writer.flush()?;

    Ok(output_path)
}

/// Write a traced path as `Step,Node,X,Y,...`
pub fn write_path_csv<P: AsRef<Path>>(
    path: &[usize],
    shape: &GridShape,
    output_dir: P,
    filename: &str,
) -> Result<PathBuf> {
    let output_path = prepare(output_dir.as_ref(), format!("{}_path.csv", filename))?;
    let mut writer = Writer::from_path(&output_path)?;

    let mut header = vec!["Step".to_string(), "Node".to_string()];
    header.extend((0..shape.ndims()).map(axis_name));
    writer.write_record(&header)?;

    for (step, &node) in path.iter().enumerate() {
        let mut record = vec![step.to_string(), node.to_string()];
        record.extend(shape.coordinates(node).iter().map(|c| c.to_string()));
        writer.write_record(&record)?;
    }

    writer.flush()?;

    Ok(output_path)
}

/// Write all summaries of a batch as a JSON array
pub fn write_summary_json<P: AsRef<Path>>(summaries: &[RunSummary], path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::File::create(path)?;
    serde_json::to_writer_pretty(file, summaries)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ift::IftStats;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("bial_ift_{}_{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn small_forest() -> Forest {
        Forest {
            value: vec![0, 3, INFINITY, 1],
            label: vec![1, 1, 0, 2],
            predecessor: vec![0, 0, NIL, 3],
            stats: IftStats::default(),
        }
    }

    #[test]
    fn test_forest_csv_rows() {
        let dir = temp_dir("forest_csv");
        let shape = GridShape::planar(2, 2).unwrap();
        let path = write_forest_csv(&small_forest(), &shape, &dir, "img").unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec!["Node", "X", "Y", "Value", "Label", "Predecessor"]
        );
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1].iter().collect::<Vec<_>>(), vec!["1", "1", "0", "3", "1", "0"]);
        assert_eq!(rows[2].iter().collect::<Vec<_>>(), vec!["2", "0", "1", "", "0", ""]);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_forest_csv_checks_shape() {
        let dir = temp_dir("forest_shape");
        let shape = GridShape::planar(3, 2).unwrap();
        assert!(write_forest_csv(&small_forest(), &shape, &dir, "img").is_err());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_region_count_ignores_unreached() {
        assert_eq!(RunSummary::count_regions(&small_forest()), 2);
    }

    #[test]
    fn test_summary_json() {
        let dir = temp_dir("summary_json");
        let summary = RunSummary {
            filename: "img".to_string(),
            method: SegmentationMethod::LiveWire,
            width: 2,
            height: 2,
            seeds: 1,
            roots: 1,
            removed: 4,
            propagations: 3,
            conquered: 4,
            regions: 1,
            path_length: Some(3),
            elapsed_ms: 1.5,
        };
        let path = dir.join("summary.json");
        write_summary_json(&[summary], &path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json[0]["method"], "live_wire");
        assert_eq!(json[0]["path_length"], 3);

        fs::remove_dir_all(&dir).unwrap();
    }
}
