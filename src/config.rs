//! Pipeline configuration
//!
//! Every value the pipeline needs is collected here. The defaults reproduce
//! the original one-off run: one course, one topic keyword and a `pdf` filter.

use std::collections::HashSet;
use std::path::PathBuf;

/// Course picked by default
pub const DEFAULT_COURSE_NAME: &str = "Czas psychologiczny 2024";
/// Topic substring a material title must contain
pub const DEFAULT_TOPIC_KEYWORD: &str = "Czas";
/// File-type substring a material title must contain
pub const DEFAULT_FILE_TYPE_KEYWORD: &str = "pdf";
/// Name of the storage folder the copies go into
pub const DEFAULT_FOLDER_NAME: &str = "Czas psychologiczny slajdy";
/// Name of the merged output file
pub const DEFAULT_OUTPUT_NAME: &str = "Czas psychologiczny slajdy scalone.pdf";
/// Courses requested from the listing endpoint (no further pages are fetched)
pub const DEFAULT_COURSE_PAGE_SIZE: u32 = 10;
/// Cached authorization token
pub const DEFAULT_TOKEN_PATH: &str = "token.json";
/// OAuth client configuration, read on first authorization only
pub const DEFAULT_CLIENT_SECRETS_PATH: &str = "credentials.json";

/// Case-sensitive dual substring filter applied to material titles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleFilter {
    pub topic: String,
    pub file_type: String,
}

impl TitleFilter {
    pub fn new(topic: impl Into<String>, file_type: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            file_type: file_type.into(),
        }
    }

    /// True when the title contains both substrings, compared byte for byte
    pub fn matches(&self, title: &str) -> bool {
        title.contains(&self.topic) && title.contains(&self.file_type)
    }
}

impl Default for TitleFilter {
    fn default() -> Self {
        Self::new(DEFAULT_TOPIC_KEYWORD, DEFAULT_FILE_TYPE_KEYWORD)
    }
}

/// How a copied file is titled in the destination folder
///
/// The copy title doubles as the local file name of the download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CopyNaming {
    /// Title the copy with the source file's ID
    #[default]
    SourceId,
    /// Keep the source file's title
    SourceTitle,
}

impl CopyNaming {
    /// Title to assign to the copy of `id`/`title`
    pub fn copy_title(&self, id: &str, title: &str) -> String {
        match self {
            CopyNaming::SourceId => id.to_string(),
            CopyNaming::SourceTitle => title.to_string(),
        }
    }
}

/// Everything the pipeline needs to run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Display name of the course to collect from
    pub course_name: String,
    /// Title filter for materials
    pub filter: TitleFilter,
    /// Storage folder created for the copies
    pub folder_name: String,
    /// Merged output file name (relative to `download_dir` when not absolute)
    pub output_name: PathBuf,
    /// Page size for the course listing
    pub course_page_size: u32,
    /// Where downloaded copies and the merged file are written
    pub download_dir: PathBuf,
    /// Copy title policy
    pub copy_naming: CopyNaming,
    /// Cached credential file
    pub token_path: PathBuf,
    /// OAuth client secrets file
    pub client_secrets_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            course_name: DEFAULT_COURSE_NAME.to_string(),
            filter: TitleFilter::default(),
            folder_name: DEFAULT_FOLDER_NAME.to_string(),
            output_name: PathBuf::from(DEFAULT_OUTPUT_NAME),
            course_page_size: DEFAULT_COURSE_PAGE_SIZE,
            download_dir: PathBuf::from("."),
            copy_naming: CopyNaming::default(),
            token_path: PathBuf::from(DEFAULT_TOKEN_PATH),
            client_secrets_path: PathBuf::from(DEFAULT_CLIENT_SECRETS_PATH),
        }
    }
}

impl PipelineConfig {
    /// Local path for a downloaded copy titled `title`
    pub fn local_path_for(&self, title: &str) -> PathBuf {
        self.download_dir.join(local_file_name(title))
    }

    /// Like [`local_path_for`](Self::local_path_for), but numbered
    /// `name (2).ext`, `name (3).ext`, ... until it is not in `taken`
    pub fn unique_local_path_for(&self, title: &str, taken: &HashSet<PathBuf>) -> PathBuf {
        let path = self.local_path_for(title);
        if !taken.contains(&path) {
            return path;
        }

        let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let extension = path.extension().map(|e| e.to_string_lossy().into_owned());
        (2..)
            .map(|n| {
                let name = match &extension {
                    Some(ext) => format!("{} ({}).{}", stem, n, ext),
                    None => format!("{} ({})", stem, n),
                };
                self.download_dir.join(name)
            })
            .find(|candidate| !taken.contains(candidate))
            .unwrap_or(path)
    }

    /// Path of the merged output file
    pub fn output_path(&self) -> PathBuf {
        if self.output_name.is_absolute() {
            self.output_name.clone()
        } else {
            self.download_dir.join(&self.output_name)
        }
    }
}

/// Turn a remote title into a single path component
///
/// Separators would otherwise send the download into another directory.
pub fn local_file_name(title: &str) -> String {
    let name: String = title
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();

    match name.as_str() {
        "" | "." | ".." => format!("_{}", name),
        _ => name,
    }
}
