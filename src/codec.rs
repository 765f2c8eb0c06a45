use std::fs;
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbImage};

use crate::error::{Error, Result};

/// `00010.png` → `00010.png.bak`
pub fn backup_path(path: &Path) -> PathBuf {
    path.with_extension(format!(
        "{}.bak",
        path.extension().unwrap_or_default().to_str().unwrap_or("")
    ))
}

pub fn load_rgb(path: &Path) -> Result<RgbImage> {
    if !path.is_file() {
        return Err(Error::NotFound(path.to_path_buf()));
    }
    let img = image::open(path).map_err(|source| Error::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(img.to_rgb8())
}

pub fn save_png(img: &RgbImage, path: &Path) -> Result<()> {
    img.save_with_format(path, ImageFormat::Png)
        .map_err(|source| Error::Write {
            path: path.to_path_buf(),
            source,
        })?;
    log::info!("Image saved to {}", path.display());
    Ok(())
}

/// Move an existing file aside as `<path>.bak`, replacing any older backup.
/// Returns the backup path, or `None` if there was nothing to back up.
pub fn backup(path: &Path) -> Result<Option<PathBuf>> {
    if !path.is_file() {
        return Ok(None);
    }
    let bak = backup_path(path);
    let io_err = |source| Error::Io {
        path: bak.clone(),
        source,
    };
    if bak.exists() {
        fs::remove_file(&bak).map_err(io_err)?;
    }
    fs::rename(path, &bak).map_err(io_err)?;
    log::info!("Backed up {} to {}", path.display(), bak.display());
    Ok(Some(bak))
}

/// Byte-for-byte copy.
pub fn copy_verbatim(from: &Path, to: &Path) -> Result<()> {
    if !from.is_file() {
        return Err(Error::NotFound(from.to_path_buf()));
    }
    fs::copy(from, to).map_err(|source| Error::Io {
        path: to.to_path_buf(),
        source,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use tempfile::tempdir;

    #[test]
    fn backup_path_appends_suffix() {
        assert_eq!(
            backup_path(Path::new("/frames/merged/00010.png")),
            PathBuf::from("/frames/merged/00010.png.bak")
        );
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("00001.png");
        assert!(matches!(load_rgb(&path), Err(Error::NotFound(p)) if p == path));
    }

    #[test]
    fn load_garbage_is_decode_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("00001.png");
        fs::write(&path, b"not a png").unwrap();
        assert!(matches!(load_rgb(&path), Err(Error::Decode { .. })));
    }

    #[test]
    fn save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("00001.png");
        let img = RgbImage::from_fn(4, 3, |x, y| Rgb([x as u8 * 10, y as u8 * 20, 5]));
        save_png(&img, &path).unwrap();
        assert_eq!(load_rgb(&path).unwrap(), img);
    }

    #[test]
    fn save_into_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope").join("00001.png");
        let img = RgbImage::new(2, 2);
        assert!(matches!(save_png(&img, &path), Err(Error::Write { .. })));
    }

    #[test]
    fn backup_replaces_older_backup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("00002.png");
        fs::write(&path, b"first").unwrap();
        fs::write(backup_path(&path), b"stale").unwrap();

        let bak = backup(&path).unwrap().unwrap();
        assert!(!path.exists());
        assert_eq!(fs::read(bak).unwrap(), b"first");
    }

    #[test]
    fn backup_of_missing_file_is_noop() {
        let dir = tempdir().unwrap();
        assert!(backup(&dir.path().join("00003.png")).unwrap().is_none());
    }

    #[test]
    fn copy_verbatim_copies_bytes() {
        let dir = tempdir().unwrap();
        let from = dir.path().join("a.png");
        let to = dir.path().join("b.png");
        fs::write(&from, b"\x89PNG whatever").unwrap();
        fs::write(&to, b"old").unwrap();
        copy_verbatim(&from, &to).unwrap();
        assert_eq!(fs::read(&to).unwrap(), b"\x89PNG whatever");
    }
}
