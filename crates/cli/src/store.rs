//! CSV placement store (`id,x,y,deg`, one row per piece, all group sizes).
//!
//! Reads are per group: a malformed row poisons only its own group.
//! Writes are merge-on-write: the on-disk file is re-read, only the groups
//! being written are replaced, and the result lands via a temp file in the
//! same directory plus an atomic rename. Rows of untouched groups are copied
//! through verbatim, malformed ones included. A row the CSV reader cannot
//! read at all (bad UTF-8, broken quoting) cannot be copied through, so a
//! store holding one is refused for writing instead of silently shrunk.
//!
//! Within one process all writes go through a single caller; the rename does
//! not serialize independent processes that merge at the same instant.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use treepack::prelude::*;

const HEADER: [&str; 4] = ["id", "x", "y", "deg"];

/// A store row as text; parsed only when its group is assembled.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub x: String,
    #[serde(default)]
    pub y: String,
    #[serde(default)]
    pub deg: String,
}

impl RawRow {
    /// Group prefix of the id, if it has one.
    pub fn group(&self) -> Option<usize> {
        self.id
            .split_once('_')
            .and_then(|(g, _)| g.trim().parse().ok())
    }

    fn record(&self) -> Result<PlacementRecord, RecordError> {
        Ok(PlacementRecord {
            id: self.id.parse()?,
            x: self.x.parse()?,
            y: self.y.parse()?,
            deg: self.deg.parse()?,
        })
    }
}

impl From<PlacementRecord> for RawRow {
    fn from(r: PlacementRecord) -> Self {
        Self {
            id: r.id.to_string(),
            x: r.x.to_string(),
            y: r.y.to_string(),
            deg: r.deg.to_string(),
        }
    }
}

/// Decoded groups plus what could not be decoded.
#[derive(Debug, Default)]
pub struct StoreContents {
    pub groups: BTreeMap<usize, Configuration>,
    pub errors: BTreeMap<usize, RecordError>,
    /// Ids of rows that name no group.
    pub unattributed: Vec<String>,
}

/// All rows of the store; a missing or empty file is an empty store.
///
/// Unreadable rows are logged and skipped.
pub fn read_rows(path: &Path) -> Result<Vec<RawRow>> {
    Ok(scan(path)?.rows)
}

struct Scan {
    rows: Vec<RawRow>,
    /// 1-based file lines the CSV reader could not deserialize.
    unreadable: Vec<usize>,
}

fn scan(path: &Path) -> Result<Scan> {
    let mut scan = Scan {
        rows: Vec::new(),
        unreadable: Vec::new(),
    };
    if !path.exists() {
        return Ok(scan);
    }
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("opening store {}", path.display()))?;
    let headers = rdr
        .headers()
        .with_context(|| format!("reading header of {}", path.display()))?
        .clone();
    if headers.is_empty() {
        return Ok(scan);
    }
    for name in HEADER {
        if !headers.iter().any(|h| h == name) {
            bail!("store {} has no {name:?} column", path.display());
        }
    }
    for (i, row) in rdr.deserialize::<RawRow>().enumerate() {
        match row {
            Ok(r) => scan.rows.push(r),
            Err(e) => {
                let line = e.position().map_or(i as u64 + 2, |p| p.line());
                tracing::warn!(line, error = %e, "unreadable store row");
                scan.unreadable.push(line as usize);
            }
        }
    }
    Ok(scan)
}

/// Read and decode every group in the store.
pub fn load(path: &Path, shape: &Arc<BaseShape>) -> Result<StoreContents> {
    Ok(assemble(read_rows(path)?, shape))
}

fn assemble(rows: Vec<RawRow>, shape: &Arc<BaseShape>) -> StoreContents {
    let mut contents = StoreContents::default();
    let mut by_group: BTreeMap<usize, Vec<RawRow>> = BTreeMap::new();
    for row in rows {
        match row.group() {
            Some(g) => by_group.entry(g).or_default().push(row),
            None => contents.unattributed.push(row.id),
        }
    }
    for (group, rows) in by_group {
        let decoded = rows
            .iter()
            .map(RawRow::record)
            .collect::<Result<Vec<_>, _>>()
            .and_then(|records| decode(Arc::clone(shape), group, &records));
        match decoded {
            Ok(config) => {
                contents.groups.insert(group, config);
            }
            Err(e) => {
                tracing::warn!(group, error = %e, "skipping malformed group");
                contents.errors.insert(group, e);
            }
        }
    }
    contents
}

/// Merge `updates` into the store at `path`, replacing only their groups.
pub fn save(path: &Path, updates: &[Configuration]) -> Result<()> {
    let replaced: BTreeSet<usize> = updates.iter().map(Configuration::len).collect();
    let mut grouped: BTreeMap<usize, Vec<RawRow>> = BTreeMap::new();
    let mut stray = Vec::new();
    let scan = scan(path)?;
    if !scan.unreadable.is_empty() {
        bail!(
            "refusing to merge into {}: {} unreadable row(s) at line(s) {:?} would be lost",
            path.display(),
            scan.unreadable.len(),
            scan.unreadable
        );
    }
    for row in scan.rows {
        match row.group() {
            Some(g) if replaced.contains(&g) => {}
            Some(g) => grouped.entry(g).or_default().push(row),
            None => stray.push(row),
        }
    }
    for config in updates {
        grouped.insert(
            config.len(),
            encode(config).into_iter().map(RawRow::from).collect(),
        );
    }

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("creating store dir {}", dir.display()))?;
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temp file in {}", dir.display()))?;
    {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(tmp.as_file_mut());
        wtr.write_record(HEADER)?;
        for row in grouped.values().flatten().chain(&stray) {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
    }
    tmp.persist(path)
        .with_context(|| format!("replacing store {}", path.display()))?;
    tracing::debug!(store = %path.display(), groups = ?replaced, "store merged");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn tree() -> Arc<BaseShape> {
        Arc::new(BaseShape::tree())
    }

    #[test]
    fn missing_file_is_empty_store() {
        let dir = tempdir().unwrap();
        let contents = load(&dir.path().join("none.csv"), &tree()).unwrap();
        assert!(contents.groups.is_empty());
        assert!(contents.errors.is_empty());
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.csv");
        let a = Configuration::grid(tree(), 1, 1.5).unwrap();
        let b = Configuration::from_placements(
            tree(),
            &[Placement::new(0.25, -1.0, 45.0), Placement::new(1.0, 0.5, 300.0)],
        )
        .unwrap();
        save(&path, &[a.clone(), b.clone()]).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("id,x,y,deg\n001_0,s0,s0,s0\n"));
        let contents = load(&path, &tree()).unwrap();
        assert_eq!(contents.groups[&1].placements(), a.placements());
        assert_eq!(contents.groups[&2].placements(), b.placements());
    }

    #[test]
    fn merge_replaces_only_written_groups() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.csv");
        let one = Configuration::grid(tree(), 1, 1.5).unwrap();
        let three = Configuration::grid(tree(), 3, 1.5).unwrap();
        save(&path, &[one.clone(), three]).unwrap();
        let tighter = Configuration::grid(tree(), 3, 1.2).unwrap();
        save(&path, &[tighter.clone()]).unwrap();
        let contents = load(&path, &tree()).unwrap();
        assert_eq!(contents.groups.len(), 2);
        assert_eq!(contents.groups[&1].placements(), one.placements());
        assert_eq!(contents.groups[&3].placements(), tighter.placements());
    }

    #[test]
    fn malformed_group_is_isolated_and_preserved() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.csv");
        fs::write(
            &path,
            "id,x,y,deg\n\
             001_0,s0,s0,s0\n\
             002_0,s0,s0,s0\n\
             002_1,sbad,s0,s0\n\
             junk,1,2,3\n",
        )
        .unwrap();
        let contents = load(&path, &tree()).unwrap();
        assert!(contents.groups.contains_key(&1));
        assert!(matches!(
            contents.errors.get(&2),
            Some(RecordError::BadNumber { .. })
        ));
        assert_eq!(contents.unattributed, vec!["junk".to_string()]);

        save(&path, &[Configuration::grid(tree(), 3, 1.5).unwrap()]).unwrap();
        let rows = read_rows(&path).unwrap();
        assert!(rows.iter().any(|r| r.id == "002_1" && r.x == "sbad"));
        assert_eq!(rows.last().unwrap().id, "junk");
        assert_eq!(rows.iter().filter(|r| r.group() == Some(3)).count(), 3);
    }

    #[test]
    fn incomplete_group_reports_missing_piece() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.csv");
        fs::write(&path, "id,x,y,deg\n003_0,s0,s0,s0\n003_2,s3,s0,s0\n").unwrap();
        let contents = load(&path, &tree()).unwrap();
        assert_eq!(
            contents.errors.get(&3),
            Some(&RecordError::MissingIndex { group: 3, index: 1 })
        );
    }

    #[test]
    fn huge_group_id_is_a_group_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.csv");
        fs::write(
            &path,
            format!("id,x,y,deg\n001_0,s0,s0,s0\n{}_0,s0,s0,s0\n", usize::MAX),
        )
        .unwrap();
        let contents = load(&path, &tree()).unwrap();
        assert!(contents.groups.contains_key(&1));
        assert!(matches!(
            contents.errors.get(&usize::MAX),
            Some(RecordError::MissingIndex { .. })
        ));
    }

    #[test]
    fn unreadable_row_blocks_merge() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.csv");
        let mut bytes = b"id,x,y,deg\n001_0,s0,s0,s0\n002_0,s".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe]);
        bytes.extend_from_slice(b",s0,s0\n002_1,s1,s0,s0\n");
        fs::write(&path, &bytes).unwrap();

        // Reading tolerates the row.
        let contents = load(&path, &tree()).unwrap();
        assert!(contents.groups.contains_key(&1));
        assert!(contents.errors.contains_key(&2));

        // Writing would drop it, so the store stays as it was.
        let err = save(&path, &[Configuration::grid(tree(), 1, 1.5).unwrap()]).unwrap_err();
        assert!(err.to_string().contains("unreadable"));
        assert_eq!(fs::read(&path).unwrap(), bytes);
    }

    #[test]
    fn header_without_required_column_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.csv");
        fs::write(&path, "id,x,y\n001_0,s0,s0\n").unwrap();
        assert!(load(&path, &tree()).is_err());
    }
}
