//! Picking which announcement attachments to stage

use crate::classroom::AnnouncementMaterials;
use crate::config::TitleFilter;

/// Remote file referenced by a material
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialRef {
    pub id: String,
    pub title: String,
}

/// Flatten per-announcement materials into file references
///
/// Announcements without materials and materials that are not files are skipped.
/// Order follows the announcements, then the materials within each.
pub fn flatten_materials(materials: &AnnouncementMaterials) -> Vec<MaterialRef> {
    materials
        .iter()
        .flatten()
        .flatten()
        .filter_map(|material| material.drive_file.as_ref())
        .map(|shared| MaterialRef {
            id: shared.drive_file.id.clone(),
            title: shared.drive_file.title.clone(),
        })
        .collect()
}

/// Keep the references whose titles pass the filter
pub fn select_files(files: Vec<MaterialRef>, filter: &TitleFilter) -> Vec<MaterialRef> {
    files.into_iter().filter(|f| filter.matches(&f.title)).collect()
}
