use std::path::{Path, PathBuf};

const ILLEGAL_CHARS: [char; 9] = ['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// Where a downloaded lecture ends up, relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// Per-course subdirectory. `None` puts the file directly in the base
    /// directory.
    pub course_dir: Option<String>,
    pub file_name: String,
}

impl Destination {
    pub fn directory(&self, base: &Path) -> PathBuf {
        match &self.course_dir {
            Some(course) => base.join(course),
            None => base.to_path_buf(),
        }
    }

    pub fn file_path(&self, base: &Path) -> PathBuf {
        self.directory(base).join(&self.file_name)
    }

    /// `/`-separated path used in user-facing messages.
    pub fn relative_path(&self) -> String {
        match &self.course_dir {
            Some(course) => format!("{}/{}", course, self.file_name),
            None => self.file_name.clone(),
        }
    }
}

/// Replaces characters that are invalid in file or directory names with `-`.
pub fn sanitize_path_component(component: &str) -> String {
    component
        .chars()
        .map(|c| if ILLEGAL_CHARS.contains(&c) { '-' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Course name of a lecture title: whatever precedes the first `-` or `:`
/// separator, cut again at the first `(`.
pub fn course_name(title: &str) -> &str {
    let head = match title.find(['-', ':']) {
        Some(idx) => &title[..idx],
        None => title,
    };
    let head = match head.find('(') {
        Some(idx) => &head[..idx],
        None => head,
    };
    head.trim()
}

/// Empty, `.` and `..` would resolve outside the directory they are joined to.
fn is_usable_component(component: &str) -> bool {
    !component.chars().all(|c| c == '.')
}

pub fn derive_destination(title: Option<&str>, video_url: &str) -> Destination {
    let fallback = || sanitize_path_component(url_basename(video_url));

    match title {
        Some(title) => {
            let course = sanitize_path_component(course_name(title));
            let stem = sanitize_path_component(title);
            Destination {
                course_dir: is_usable_component(&course).then_some(course),
                file_name: if is_usable_component(&stem) {
                    format!("{}.mp4", stem)
                } else {
                    fallback()
                },
            }
        }
        None => Destination {
            course_dir: None,
            file_name: fallback(),
        },
    }
}

fn url_basename(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().unwrap_or(path)
}
