use std::path::Path;

use crate::error::Result;

/// Reads an undirected edge list from a header-less CSV file with one `a,b` pair per row.
///
/// Surrounding whitespace is ignored, rows starting with `#` are comments.
pub fn load_edge_list(path: impl AsRef<Path>) -> Result<Vec<(u32, u32)>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new().has_headers(false).comment(Some(b'#')).trim(csv::Trim::All).from_path(path)?;

    let mut edges = Vec::new();
    for row in reader.deserialize::<(u32, u32)>() {
        edges.push(row?);
    }

    log::debug!("Loaded {} edge(s) from '{}'.", edges.len(), path.display());
    Ok(edges)
}
