use chrono::{DateTime, Local};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::session::HistoryEntry;

pub const TEXT_MIME: &str = "text/plain";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub data: String,
    pub filename: String,
    pub mime: &'static str,
}

impl Download {
    pub fn new(data: impl Into<String>, filename: String) -> Self {
        Self { data: data.into(), filename, mime: TEXT_MIME }
    }
}

fn stem(content_type: &str) -> String {
    content_type.replace(' ', "_")
}

pub fn version_filename(content_type: &str, version: u32) -> String {
    format!("{}_v{}.txt", stem(content_type), version)
}

pub fn single_filename(content_type: &str) -> String {
    format!("{}_text.txt", stem(content_type))
}

pub fn selected_filename(content_type: &str) -> String {
    format!("{}_selected.txt", stem(content_type))
}

/// `version` is set for multi-variant actions so variants saved within
/// the same second get distinct names.
pub fn timestamped_filename(content_type: &str, version: Option<u32>, now: DateTime<Local>) -> String {
    let ts = now.format("%Y%m%d_%H%M%S");
    match version {
        Some(v) => format!("{}_{}_v{}.txt", stem(content_type), ts, v),
        None => format!("{}_{}.txt", stem(content_type), ts),
    }
}

/// Download for a freshly generated entry; single-variant actions get the
/// plain name, multi-variant ones are numbered.
pub fn download_for(entry: &HistoryEntry, versions_in_action: u32) -> Download {
    let filename = if versions_in_action > 1 {
        version_filename(&entry.content_type, entry.version)
    } else {
        single_filename(&entry.content_type)
    };
    Download::new(entry.text.clone(), filename)
}

pub fn history_download(entry: &HistoryEntry) -> Download {
    Download::new(entry.text.clone(), version_filename(&entry.content_type, entry.version))
}

pub fn selection_download(entry: &HistoryEntry) -> Download {
    Download::new(entry.text.clone(), selected_filename(&entry.content_type))
}

pub fn save_as_txt(dir: &Path, text: &str, content_type: &str, version: Option<u32>) -> anyhow::Result<PathBuf> {
    save_as_txt_at(dir, text, content_type, version, Local::now())
}

/// Never overwrites: a taken name gets a `_2`, `_3`, ... suffix.
fn create_unique(dir: &Path, filename: &str) -> anyhow::Result<(PathBuf, fs::File)> {
    let base = filename.strip_suffix(".txt").unwrap_or(filename);
    let mut n = 1u32;
    loop {
        let path = if n == 1 { dir.join(filename) } else { dir.join(format!("{}_{}.txt", base, n)) };
        match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(f) => return Ok((path, f)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => n += 1,
            Err(e) => anyhow::bail!("failed to create {}: {}", path.display(), e),
        }
    }
}

fn save_as_txt_at(
    dir: &Path,
    text: &str,
    content_type: &str,
    version: Option<u32>,
    now: DateTime<Local>,
) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let (path, mut f) = create_unique(dir, &timestamped_filename(content_type, version, now))?;
    f.write_all(text.as_bytes())?;
    tracing::info!(path = %path.display(), bytes = text.len(), "saved text");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn entry(version: u32) -> HistoryEntry {
        HistoryEntry {
            prompt: "p".into(),
            content_type: "Product Description".into(),
            tone: "Formal".into(),
            length: "Short".into(),
            text: "Crisp linen shirt.".into(),
            version,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn filenames_replace_spaces() {
        assert_eq!(version_filename("Social Media", 2), "Social_Media_v2.txt");
        assert_eq!(single_filename("Blog Post"), "Blog_Post_text.txt");
        assert_eq!(selected_filename("Email"), "Email_selected.txt");
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(timestamped_filename("Creative Writing", None, at), "Creative_Writing_20240309_070501.txt");
        assert_eq!(timestamped_filename("Email", Some(2), at), "Email_20240309_070501_v2.txt");
    }

    #[test]
    fn download_naming_depends_on_variant_count() {
        let d = download_for(&entry(1), 1);
        assert_eq!(d.filename, "Product_Description_text.txt");
        assert_eq!(d.mime, "text/plain");
        assert_eq!(download_for(&entry(3), 3).filename, "Product_Description_v3.txt");
        assert_eq!(history_download(&entry(1)).filename, "Product_Description_v1.txt");
        assert_eq!(selection_download(&entry(2)).data, "Crisp linen shirt.");
    }

    #[test]
    fn save_writes_utf8_into_created_dir() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("exports");
        let at = Local.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let path = save_as_txt_at(&out, "Günaydın dünya", "Blog Post", None, at).unwrap();
        assert_eq!(path, out.join("Blog_Post_20250102_030405.txt"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "Günaydın dünya");
    }

    #[test]
    fn save_into_unwritable_target_errors() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"x").unwrap();
        assert!(save_as_txt(&blocker, "text", "Email", None).is_err());
    }

    #[test]
    fn same_second_saves_never_overwrite() {
        let dir = tempdir().unwrap();
        let at = Local.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let first = save_as_txt_at(dir.path(), "one", "Email", None, at).unwrap();
        let second = save_as_txt_at(dir.path(), "two", "Email", None, at).unwrap();
        assert_eq!(second, dir.path().join("Email_20250102_030405_2.txt"));
        assert_eq!(fs::read_to_string(&first).unwrap(), "one");
        assert_eq!(fs::read_to_string(&second).unwrap(), "two");

        let v1 = save_as_txt_at(dir.path(), "a", "Email", Some(1), at).unwrap();
        let v2 = save_as_txt_at(dir.path(), "b", "Email", Some(2), at).unwrap();
        assert_ne!(v1, v2);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 4);
    }
}
