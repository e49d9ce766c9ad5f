use crate::error::{Error, Result};
use crate::index::SearchIndex;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Writes the snapshot as JSON. The data goes to a sibling temp file first and is
/// renamed into place, so an existing snapshot survives a failed save.
pub fn save_index(path: &Path, index: &SearchIndex) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = Path::new(&tmp);
    {
        let mut out = BufWriter::new(File::create(tmp)?);
        serde_json::to_writer(&mut out, index)?;
        out.flush()?;
    }
    fs::rename(tmp, path)?;
    tracing::info!(path = %path.display(), num_docs = index.total_documents, "saved index snapshot");
    Ok(())
}

pub fn load_index(path: &Path) -> Result<SearchIndex> {
    let reader = BufReader::new(File::open(path)?);
    let index: SearchIndex = serde_json::from_reader(reader).map_err(|e| {
        if e.is_data() || e.is_syntax() || e.is_eof() {
            Error::Schema { path: path.to_path_buf(), reason: e.to_string() }
        } else {
            Error::Json(e)
        }
    })?;
    validate(&index).map_err(|reason| Error::Schema { path: path.to_path_buf(), reason })?;
    tracing::info!(path = %path.display(), num_docs = index.total_documents, num_terms = index.term_count(), "loaded index snapshot");
    Ok(index)
}

fn validate(index: &SearchIndex) -> std::result::Result<(), String> {
    if index.total_documents != index.document_vectors.len() {
        return Err(format!(
            "totalDocuments is {} but there are {} document vectors",
            index.total_documents,
            index.document_vectors.len()
        ));
    }
    for (term, postings) in &index.inverted_index {
        if let Some((doc, _)) = postings.iter().find(|(doc, _)| !index.document_vectors.contains_key(doc)) {
            return Err(format!("posting for {term:?} references unknown document {doc}"));
        }
    }
    Ok(())
}
