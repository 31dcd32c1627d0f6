//! Classroom API: course listing and announcement materials

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};

use serde::Deserialize;
use tracing::{debug, error, info};

use crate::api::{check, Session};
use crate::error::Result;

pub const DEFAULT_CLASSROOM_BASE_URL: &str = "https://classroom.googleapis.com";

/// Course as returned by the listing endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Course {
    pub id: String,
    pub name: String,
}

/// Announcement with its (possibly absent) attachments
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Announcement {
    #[serde(default)]
    pub materials: Option<Vec<Material>>,
}

/// Attachment on an announcement; only `drive_file` refers to a remote file
///
/// Links, videos and forms deserialize with `drive_file` unset.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    #[serde(default)]
    pub drive_file: Option<SharedDriveFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedDriveFile {
    pub drive_file: DriveFile,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

impl Material {
    /// Material wrapping a remote file
    pub fn file(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            drive_file: Some(SharedDriveFile {
                drive_file: DriveFile {
                    id: id.into(),
                    title: title.into(),
                },
            }),
        }
    }
}

/// Course name to course ID
pub type CourseMap = HashMap<String, String>;

/// Per-announcement material lists, one entry per announcement
pub type AnnouncementMaterials = Vec<Option<Vec<Material>>>;

/// Remote classroom operations
pub trait ClassroomApi {
    /// First page of courses visible to the caller
    fn courses(&self, page_size: u32) -> Result<Vec<Course>>;

    /// Announcements of one course
    fn announcements(&self, course_id: &str) -> Result<Vec<Announcement>>;
}

#[derive(Debug, Deserialize)]
struct CourseListResponse {
    #[serde(default)]
    courses: Vec<Course>,
    #[serde(default, rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnnouncementListResponse {
    #[serde(default)]
    announcements: Vec<Announcement>,
}

/// HTTP client for the Classroom API
#[derive(Debug, Clone)]
pub struct ClassroomClient {
    session: Session,
    base_url: String,
}

impl ClassroomClient {
    pub fn new(session: Session) -> Self {
        Self::with_base_url(session, DEFAULT_CLASSROOM_BASE_URL)
    }

    pub fn with_base_url(session: Session, base_url: impl Into<String>) -> Self {
        Self {
            session,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl ClassroomApi for ClassroomClient {
    fn courses(&self, page_size: u32) -> Result<Vec<Course>> {
        let url = format!("{}/v1/courses", self.base_url);
        let response = self
            .session
            .get(&url)
            .query(&[("pageSize", page_size)])
            .send()?;
        let listing: CourseListResponse = check(response)?.json()?;

        if listing.next_page_token.is_some() {
            debug!(page_size, "More courses available; only the first page is used");
        }
        Ok(listing.courses)
    }

    fn announcements(&self, course_id: &str) -> Result<Vec<Announcement>> {
        let url = format!("{}/v1/courses/{}/announcements", self.base_url, course_id);
        let response = self.session.get(&url).send()?;
        let listing: AnnouncementListResponse = check(response)?.json()?;
        Ok(listing.announcements)
    }
}

/// List courses as a name-to-ID map
///
/// Prints each course to stdout. API errors are logged and yield `None`. When
/// two courses share a name the later one wins.
pub fn list_courses(api: &impl ClassroomApi, page_size: u32) -> Option<CourseMap> {
    list_courses_to(api, page_size, &mut io::stdout().lock())
}

/// [`list_courses`] printing to `out`
pub fn list_courses_to(api: &impl ClassroomApi, page_size: u32, out: &mut impl Write) -> Option<CourseMap> {
    let courses = match api.courses(page_size) {
        Ok(courses) => courses,
        Err(e) => {
            error!("An error occurred while listing courses: {}", e);
            return None;
        }
    };

    let mut map = CourseMap::new();
    if courses.is_empty() {
        print_line(out, format_args!("No courses found."));
        return Some(map);
    }

    print_line(out, format_args!("Courses:"));
    for course in courses {
        print_line(out, format_args!("Course ID: {}, Course Name: {}", course.id, course.name));
        map.insert(course.name, course.id);
    }
    info!(count = map.len(), "Listed courses");
    Some(map)
}

fn print_line(out: &mut impl Write, line: fmt::Arguments<'_>) {
    if let Err(e) = writeln!(out, "{}", line) {
        debug!("Could not print course listing: {}", e);
    }
}

/// Materials of every announcement in a course, unflattened
///
/// API errors are logged and yield `None`.
pub fn list_materials(api: &impl ClassroomApi, course_id: &str) -> Option<AnnouncementMaterials> {
    match api.announcements(course_id) {
        Ok(announcements) => {
            info!(course_id, count = announcements.len(), "Listed announcements");
            Some(announcements.into_iter().map(|a| a.materials).collect())
        }
        Err(e) => {
            error!(course_id, "An error occurred while listing materials: {}", e);
            None
        }
    }
}
