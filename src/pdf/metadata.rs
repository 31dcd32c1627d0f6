//! PDF page counting

use std::path::Path;
use lopdf::Document;
use crate::error::{Error, Result};

/// Count the pages of a PDF file
///
/// Walks the page tree rather than trusting the root `Count` entry.
pub fn count_pages(path: &Path) -> Result<usize> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path)?;
    let page_count = doc.get_pages().len();

    if page_count == 0 {
        return Err(Error::EmptyPdf(path.to_path_buf()));
    }

    Ok(page_count)
}
