//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use lopdf::{dictionary, Document, Object, Stream};

use classroom_slides::classroom::{Announcement, ClassroomApi, Course, Material};
use classroom_slides::drive::{CopyRecord, DownloadProgress, DriveApi};
use classroom_slides::{Error, Result};

/// Build a PDF whose pages are told apart by their MediaBox width
///
/// `Resources` sits on the page tree node so merging has to carry it down.
pub fn pdf_bytes(widths: &[i64]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for &width in widths {
        let content = format!("BT /F1 12 Tf 10 10 Td (page {}) Tj ET", width);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), 400.into()],
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => widths.len() as i64,
            "Resources" => resources_id,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("Failed to serialize fixture PDF");
    bytes
}

pub fn write_pdf(path: &Path, widths: &[i64]) {
    std::fs::write(path, pdf_bytes(widths)).expect("Failed to write fixture PDF");
}

/// MediaBox widths of every page, in page order
pub fn page_widths(path: &Path) -> Vec<i64> {
    let doc = Document::load(path).expect("Failed to load PDF");
    doc.get_pages()
        .values()
        .map(|&id| {
            let page = doc.get_dictionary(id).expect("Page is not a dictionary");
            let media_box = page
                .get(b"MediaBox")
                .and_then(Object::as_array)
                .expect("Page has no MediaBox");
            media_box[2].as_i64().expect("MediaBox width is not an integer")
        })
        .collect()
}

/// True when every page can resolve its font resources
pub fn pages_have_resources(path: &Path) -> bool {
    let doc = Document::load(path).expect("Failed to load PDF");
    doc.get_pages().values().all(|&id| {
        doc.get_dictionary(id)
            .map(|page| page.has(b"Resources"))
            .unwrap_or(false)
    })
}

pub struct FakeClassroom {
    pub courses: Vec<Course>,
    pub announcements: HashMap<String, Vec<Announcement>>,
    pub fail_courses: bool,
}

impl FakeClassroom {
    pub fn new(courses: &[(&str, &str)]) -> Self {
        Self {
            courses: courses
                .iter()
                .map(|(name, id)| Course { id: id.to_string(), name: name.to_string() })
                .collect(),
            announcements: HashMap::new(),
            fail_courses: false,
        }
    }

    pub fn with_materials(mut self, course_id: &str, materials: Vec<Option<Vec<Material>>>) -> Self {
        let announcements = materials
            .into_iter()
            .map(|materials| Announcement { materials })
            .collect();
        self.announcements.insert(course_id.to_string(), announcements);
        self
    }
}

impl ClassroomApi for FakeClassroom {
    fn courses(&self, page_size: u32) -> Result<Vec<Course>> {
        if self.fail_courses {
            return Err(Error::Api { status: 503, message: "Service unavailable".to_string() });
        }
        Ok(self.courses.iter().take(page_size as usize).cloned().collect())
    }

    fn announcements(&self, course_id: &str) -> Result<Vec<Announcement>> {
        self.announcements
            .get(course_id)
            .cloned()
            .ok_or_else(|| Error::Api { status: 404, message: "Requested entity was not found.".to_string() })
    }
}

/// In-memory storage service that records every call
#[derive(Default)]
pub struct FakeDrive {
    pub contents: RefCell<HashMap<String, Vec<u8>>>,
    pub folders: RefCell<Vec<String>>,
    pub copies: RefCell<Vec<(String, String, String)>>,
    pub downloads: RefCell<Vec<String>>,
    pub fail_folder: bool,
    pub fail_copy_of: Option<String>,
}

impl FakeDrive {
    pub fn with_file(self, id: &str, bytes: Vec<u8>) -> Self {
        self.contents.borrow_mut().insert(id.to_string(), bytes);
        self
    }
}

impl DriveApi for FakeDrive {
    fn create_folder(&self, name: &str) -> Result<String> {
        if self.fail_folder {
            return Err(Error::Api { status: 403, message: "Insufficient permissions".to_string() });
        }
        self.folders.borrow_mut().push(name.to_string());
        Ok(format!("folder-{}", self.folders.borrow().len()))
    }

    fn copy(&self, file_id: &str, title: &str, parent_id: &str) -> Result<CopyRecord> {
        if self.fail_copy_of.as_deref() == Some(file_id) {
            return Err(Error::Api { status: 404, message: format!("File not found: {}.", file_id) });
        }
        let bytes = self
            .contents
            .borrow()
            .get(file_id)
            .cloned()
            .ok_or_else(|| Error::Api { status: 404, message: format!("File not found: {}.", file_id) })?;

        let copy_id = format!("copy-of-{}", file_id);
        self.contents.borrow_mut().insert(copy_id.clone(), bytes);
        self.copies
            .borrow_mut()
            .push((file_id.to_string(), title.to_string(), parent_id.to_string()));
        Ok(CopyRecord { id: copy_id, title: title.to_string() })
    }

    fn download(
        &self,
        file_id: &str,
        sink: &mut dyn Write,
        progress: &mut dyn FnMut(DownloadProgress),
    ) -> Result<u64> {
        let bytes = self
            .contents
            .borrow()
            .get(file_id)
            .cloned()
            .ok_or_else(|| Error::Api { status: 404, message: format!("File not found: {}.", file_id) })?;

        sink.write_all(&bytes)?;
        let total = bytes.len() as u64;
        progress(DownloadProgress { downloaded: total, total: Some(total) });
        self.downloads.borrow_mut().push(file_id.to_string());
        Ok(total)
    }
}
