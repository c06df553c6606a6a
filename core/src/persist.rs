use crate::store::SledStore;
use crate::{IndexConfig, IndexError, TermRecord};
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

pub const META_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: u32,
    pub created_at: String,
    pub version: u32,
    /// Settings the stored term records were built with; a rebuild over the
    /// same data directory reuses them.
    #[serde(default)]
    pub config: IndexConfig,
}

/// Layout of a data directory: the sled store, `meta.json` and an optional
/// JSONL export of the inverted index.
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn store(&self) -> PathBuf { self.root.join("store.sled") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    pub fn terms_export(&self) -> PathBuf { self.root.join("terms.jsonl") }

    pub fn open_store(&self) -> Result<SledStore, IndexError> {
        create_dir_all(&self.root)?;
        SledStore::open(self.store())
    }
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<(), IndexError> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile, IndexError> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

/// Write term records as JSON lines, one record per line.
pub fn export_term_records(path: &Path, records: &[TermRecord]) -> Result<(), IndexError> {
    if let Some(dir) = path.parent() {
        create_dir_all(dir)?;
    }
    let mut w = BufWriter::new(File::create(path)?);
    for record in records {
        serde_json::to_writer(&mut w, record)?;
        w.write_all(b"\n")?;
    }
    w.flush()?;
    Ok(())
}

pub fn load_term_records(path: &Path) -> Result<Vec<TermRecord>, IndexError> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        records.push(serde_json::from_str(&line)?);
    }
    Ok(records)
}
