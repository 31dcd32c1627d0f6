//! End-to-end run: course → materials → copies → downloads → merged PDF
//!
//! Stages run strictly one after another. All copies are made before the
//! first download starts, and downloads happen one at a time in copy order.

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::classroom::{list_courses, list_materials, ClassroomApi};
use crate::config::{CopyNaming, PipelineConfig};
use crate::drive::{copy_file, create_folder, get_file, CopyRecord, DriveApi};
use crate::error::{Error, Result};
use crate::pdf::{merge_pdfs, MergeOptions};
use crate::select::{flatten_materials, select_files, MaterialRef};

/// What a completed run did
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub course_id: String,
    pub folder_id: String,
    /// Materials that passed the title filter
    pub selected: Vec<MaterialRef>,
    /// Copies that were created, in copy order
    pub copies: Vec<CopyRecord>,
    /// Local files, in the same order as `copies`
    pub downloaded: Vec<PathBuf>,
    pub output_path: PathBuf,
    pub page_count: usize,
}

/// Run the whole pipeline against the given API implementations
pub fn run(classroom: &impl ClassroomApi, drive: &impl DriveApi, config: &PipelineConfig) -> Result<PipelineReport> {
    let courses = list_courses(classroom, config.course_page_size).ok_or(Error::CoursesUnavailable)?;
    let course_id = courses
        .get(&config.course_name)
        .cloned()
        .ok_or_else(|| Error::CourseNotFound(config.course_name.clone()))?;

    let materials =
        list_materials(classroom, &course_id).ok_or_else(|| Error::MaterialsUnavailable(course_id.clone()))?;
    let selected = select_files(flatten_materials(&materials), &config.filter);
    info!(course_id = %course_id, selected = selected.len(), "Selected materials");

    if selected.is_empty() {
        return Err(Error::NoMatchingMaterials {
            topic: config.filter.topic.clone(),
            file_type: config.filter.file_type.clone(),
        });
    }

    let folder_id = create_folder(drive, &config.folder_name)
        .ok_or_else(|| Error::FolderNotCreated(config.folder_name.clone()))?;

    let copies = stage_copies(drive, &selected, &folder_id, config.copy_naming);
    if copies.is_empty() {
        return Err(Error::General(format!(
            "None of the {} selected files could be copied",
            selected.len()
        )));
    }

    std::fs::create_dir_all(&config.download_dir)?;
    let output_path = config.output_path();
    let mut taken = HashSet::from([output_path.clone()]);
    let mut downloaded = Vec::with_capacity(copies.len());
    for copy in &copies {
        let local_path = config.unique_local_path_for(&copy.title, &taken);
        get_file(drive, &copy.id, &local_path)?;
        taken.insert(local_path.clone());
        downloaded.push(local_path);
    }

    let page_count = merge_pdfs(&MergeOptions {
        input_paths: downloaded.clone(),
        output_path: output_path.clone(),
    })?;

    Ok(PipelineReport {
        course_id,
        folder_id,
        selected,
        copies,
        downloaded,
        output_path,
        page_count,
    })
}

/// Copy every selected file into the folder, skipping copies that fail
fn stage_copies(
    drive: &impl DriveApi,
    selected: &[MaterialRef],
    folder_id: &str,
    naming: CopyNaming,
) -> Vec<CopyRecord> {
    let mut copies = Vec::with_capacity(selected.len());
    for file in selected {
        let title = naming.copy_title(&file.id, &file.title);
        match copy_file(drive, &file.id, &title, folder_id) {
            Some(copy) => copies.push(copy),
            None => warn!(file_id = %file.id, title = %file.title, "Skipping file that could not be copied"),
        }
    }

    if copies.len() < selected.len() {
        warn!(copied = copies.len(), selected = selected.len(), "Some files were not copied");
    }
    copies
}
