use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::technique::TechniqueId;

/// One locally indexed test specification. Many specs may share a
/// technique.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocalTestSpec {
    pub technique: TechniqueId,
    pub test_id: String,
    pub source_file: String,
}

#[derive(Debug, Error)]
pub enum LocalIndexError {
    /// The local index cannot be read at all. Fatal: no report is produced
    /// without a local technique set.
    #[error("local index unreadable at {root}: {detail}")]
    IndexUnreadable { root: PathBuf, detail: String },
}

/// Loads the atomics index CSVs under `root` into a technique-keyed map.
///
/// The atomics repo ships per-platform index files under `Indexes/`; when
/// that directory is absent, CSV files directly in `root` are read instead.
/// Rows without a parseable technique column are skipped.
pub fn load_local_index(
    root: &Path,
) -> Result<BTreeMap<TechniqueId, Vec<LocalTestSpec>>, LocalIndexError> {
    let files = discover_index_files(root)?;
    if files.is_empty() {
        return Err(LocalIndexError::IndexUnreadable {
            root: root.to_path_buf(),
            detail: "no index CSV files found".to_string(),
        });
    }

    let mut index: BTreeMap<TechniqueId, Vec<LocalTestSpec>> = BTreeMap::new();
    for file in &files {
        let handle = fs::File::open(file).map_err(|e| LocalIndexError::IndexUnreadable {
            root: root.to_path_buf(),
            detail: format!("failed opening {}: {e}", file.display()),
        })?;
        let source_file = file
            .strip_prefix(root)
            .unwrap_or(file)
            .to_string_lossy()
            .to_string();
        let specs =
            parse_index_reader(handle, &source_file).map_err(|e| LocalIndexError::IndexUnreadable {
                root: root.to_path_buf(),
                detail: format!("failed parsing {}: {e}", file.display()),
            })?;
        for spec in specs {
            index.entry(spec.technique).or_default().push(spec);
        }
    }
    debug!(
        "loaded {} techniques from {} index files",
        index.len(),
        files.len()
    );
    Ok(index)
}

/// Parses one index CSV. Column layout follows the atomics `Indexes-CSV`
/// convention: technique in the first column, test GUID in a `Test GUID`
/// column when the header names one, otherwise the second column.
pub fn parse_index_reader<R: Read>(
    reader: R,
    source_file: &str,
) -> Result<Vec<LocalTestSpec>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let guid_column = csv_reader
        .headers()
        .ok()
        .and_then(|headers| {
            headers
                .iter()
                .position(|h| h.to_ascii_lowercase().contains("guid"))
        })
        .unwrap_or(1);

    let mut specs = Vec::new();
    for (row_number, record) in csv_reader.records().enumerate() {
        let record = record?;
        let Some(raw_technique) = record.get(0) else {
            continue;
        };
        let technique = match raw_technique.parse::<TechniqueId>() {
            Ok(technique) => technique,
            Err(_) => match TechniqueId::find_in(raw_technique) {
                Some(technique) => technique,
                None => {
                    warn!(
                        "skipping {source_file} row {}: no technique in {raw_technique:?}",
                        row_number + 2
                    );
                    continue;
                }
            },
        };
        let test_id = record
            .get(guid_column)
            .filter(|v| !v.trim().is_empty())
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|| format!("{technique}#{}", row_number + 1));
        specs.push(LocalTestSpec {
            technique,
            test_id,
            source_file: source_file.to_string(),
        });
    }
    Ok(specs)
}

fn discover_index_files(root: &Path) -> Result<Vec<PathBuf>, LocalIndexError> {
    let indexes_dir = root.join("Indexes");
    let scan_root = if indexes_dir.is_dir() {
        indexes_dir
    } else {
        root.to_path_buf()
    };
    let mut files = Vec::new();
    collect_csv_files(&scan_root, &mut files).map_err(|e| LocalIndexError::IndexUnreadable {
        root: root.to_path_buf(),
        detail: format!("failed listing {}: {e}", scan_root.display()),
    })?;
    files.sort();
    Ok(files)
}

fn collect_csv_files(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_csv_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "csv") {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::localindex::parse_index_reader;
    use crate::technique::TechniqueId;

    #[test]
    fn parses_rows_and_groups_by_guid_column() {
        let csv = "Technique #,Test Name,Test GUID\n\
                   T1027,Obfuscation test,3f5a-01\n\
                   T1027.002,Packed binary,3f5a-02\n\
                   T1047,WMI exec,77aa-01\n";
        let specs =
            parse_index_reader(Cursor::new(csv), "windows-index.csv").expect("parse failed");
        assert_eq!(specs.len(), 3);
        assert_eq!(specs[0].technique, "T1027".parse::<TechniqueId>().unwrap());
        assert_eq!(specs[0].test_id, "3f5a-01");
        // subtechnique collapses onto the parent
        assert_eq!(specs[1].technique, specs[0].technique);
        assert_eq!(specs[2].source_file, "windows-index.csv");
    }

    #[test]
    fn skips_rows_without_a_technique() {
        let csv = "Technique #,Test Name,Test GUID\n\
                   not-a-technique,noise,guid-0\n\
                   T1059,Shell,guid-1\n";
        let specs = parse_index_reader(Cursor::new(csv), "index.csv").expect("parse failed");
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].technique, "T1059".parse::<TechniqueId>().unwrap());
    }

    #[test]
    fn falls_back_to_positional_guid_and_synthetic_ids() {
        let csv = "tid,second\nT1110,\n";
        let specs = parse_index_reader(Cursor::new(csv), "index.csv").expect("parse failed");
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].test_id, "T1110#1");
    }
}
