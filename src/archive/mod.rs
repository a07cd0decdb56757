use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Zip the files of `dir` (flat, no subdirectories) into `<dir>.zip` next
/// to it. Returns `None` when the directory holds no files.
pub fn create_zip(dir: &Path) -> Result<Option<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .context(format!("Cannot read directory: {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();

    if files.is_empty() {
        return Ok(None);
    }
    files.sort();

    let zip_path = dir.with_extension("zip");
    let file = fs::File::create(&zip_path)
        .context(format!("Cannot create archive: {}", zip_path.display()))?;
    let mut writer = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in &files {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .context("File name is not valid UTF-8")?;

        writer.start_file(name, options)?;
        let mut source = fs::File::open(path)?;
        io::copy(&mut source, &mut writer)?;
        debug!("Added {} to archive", name);
    }

    writer.finish()?;

    let size = fs::metadata(&zip_path).map(|m| m.len()).unwrap_or(0);
    info!("Archived {} files to {} ({} bytes)", files.len(), zip_path.display(), size);

    Ok(Some(zip_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn zips_directory_files_with_flat_names() {
        let base = tempfile::tempdir().unwrap();
        let dir = base.path().join("156900");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("000.jpg"), b"first").unwrap();
        fs::write(dir.join("001.jpg"), b"second").unwrap();

        let zip_path = create_zip(&dir).unwrap().unwrap();
        assert_eq!(zip_path, base.path().join("156900.zip"));

        let mut archive = zip::ZipArchive::new(fs::File::open(&zip_path).unwrap()).unwrap();
        assert_eq!(archive.len(), 2);

        let mut contents = String::new();
        archive
            .by_name("000.jpg")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "first");
    }

    #[test]
    fn empty_directory_is_not_archived() {
        let base = tempfile::tempdir().unwrap();
        let dir = base.path().join("empty");
        fs::create_dir(&dir).unwrap();

        assert!(create_zip(&dir).unwrap().is_none());
        assert!(!base.path().join("empty.zip").exists());
    }
}
