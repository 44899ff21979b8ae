use crate::error::UploadError;
use log::info;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Store an uploaded file in `dir` under its client-supplied name.
///
/// Only the last path component of `file_name` is kept, so an upload can
/// never land outside `dir`.
pub fn save_upload(
    dir: impl AsRef<Path>,
    file_name: &str,
    bytes: &[u8],
) -> Result<PathBuf, UploadError> {
    let name = sanitize_file_name(file_name)?;
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let path = dir.join(name);
    fs::write(&path, bytes)?;
    info!("saved upload {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}

/// Names of the files in the upload folder, sorted.
pub fn list_uploads(dir: impl AsRef<Path>) -> Result<Vec<String>, UploadError> {
    let entries = match fs::read_dir(dir.as_ref()) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            if let Some(name) = entry.file_name().to_str() {
                files.push(name.to_string());
            }
        }
    }
    files.sort();
    Ok(files)
}

fn sanitize_file_name(file_name: &str) -> Result<&str, UploadError> {
    // Browsers on Windows may send the full client path
    let name = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if name.is_empty() || name == "." || name == ".." {
        return Err(UploadError::InvalidName(file_name.to_string()));
    }
    Ok(name)
}
