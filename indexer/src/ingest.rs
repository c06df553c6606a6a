use anyhow::{bail, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use termrank_core::Document;
use walkdir::WalkDir;

#[derive(Debug, Deserialize)]
struct InputDoc {
    id: u32,
    #[serde(alias = "body")]
    content: String,
}

impl From<InputDoc> for Document {
    fn from(doc: InputDoc) -> Self {
        Document { id: doc.id, content: doc.content }
    }
}

/// Read documents from a `.json`/`.jsonl` file, or every such file under a
/// directory (sorted by path so repeated loads give the same corpus order).
pub fn read_documents(input: &Path) -> Result<Vec<Document>> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        bail!("input path {} does not exist", input.display());
    }

    let mut docs = Vec::new();
    for file in files {
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(&file, &mut docs)?;
        } else {
            read_json(&file, &mut docs)?;
        }
    }
    let mut seen = HashSet::with_capacity(docs.len());
    if let Some(dup) = docs.iter().find(|d| !seen.insert(d.id)) {
        bail!("document id {} appears more than once under {}", dup.id, input.display());
    }
    tracing::info!(num_docs = docs.len(), input = %input.display(), "read documents");
    Ok(docs)
}

fn read_jsonl(file: &Path, docs: &mut Vec<Document>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let doc: InputDoc = serde_json::from_str(&line)?;
        docs.push(doc.into());
    }
    Ok(())
}

fn read_json(file: &Path, docs: &mut Vec<Document>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                let doc: InputDoc = serde_json::from_value(v)?;
                docs.push(doc.into());
            }
        }
        serde_json::Value::Object(_) => {
            let doc: InputDoc = serde_json::from_value(json)?;
            docs.push(doc.into());
        }
        _ => tracing::warn!(file = %file.display(), "skipping json file without an object or array"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn reads_json_and_jsonl_from_directory() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.json"), r#"[{"id": 1, "content": "one"}, {"id": 2, "body": "two"}]"#).unwrap();
        fs::write(dir.path().join("b.jsonl"), "{\"id\": 3, \"content\": \"three\"}\n\n{\"id\": 4, \"content\": \"four\"}\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let docs = read_documents(dir.path()).unwrap();
        let ids: Vec<u32> = docs.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(docs[1].content, "two");
    }

    #[test]
    fn duplicate_ids_across_files_are_rejected() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.json"), r#"{"id": 1, "content": "alpha beta"}"#).unwrap();
        fs::write(dir.path().join("b.jsonl"), "{\"id\": 1, \"content\": \"gamma delta\"}\n").unwrap();
        let err = read_documents(dir.path()).unwrap_err();
        assert!(err.to_string().contains("document id 1"));
    }

    #[test]
    fn missing_input_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(read_documents(&dir.path().join("nope.json")).is_err());
    }
}
