//! Local file access through `cap-std` ambient directories.

use std::io;

use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8::Dir};

fn split(path: &Utf8Path) -> io::Result<(&Utf8Path, &str)> {
    let parent = match path.parent() {
        Some(dir) if !dir.as_str().is_empty() => dir,
        _ => Utf8Path::new("."),
    };
    let file_name = path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{path} is missing a file name"),
        )
    })?;
    Ok((parent, file_name))
}

/// Whether `path` names an existing file or directory.
#[must_use]
pub fn exists(path: &Utf8Path) -> bool {
    split(path)
        .and_then(|(parent, name)| {
            Dir::open_ambient_dir(parent, ambient_authority())?.try_exists(name)
        })
        .unwrap_or(false)
}

/// Reads a whole file.
///
/// # Errors
///
/// Returns the underlying I/O error, `NotFound` included.
pub fn read_bytes(path: &Utf8Path) -> io::Result<Vec<u8>> {
    let (parent, name) = split(path)?;
    Dir::open_ambient_dir(parent, ambient_authority())?.read(name)
}

/// Reads a whole UTF-8 file.
///
/// # Errors
///
/// Returns the underlying I/O error, including invalid UTF-8.
pub fn read_to_string(path: &Utf8Path) -> io::Result<String> {
    let (parent, name) = split(path)?;
    Dir::open_ambient_dir(parent, ambient_authority())?.read_to_string(name)
}

/// Writes a whole file, replacing existing content.
///
/// # Errors
///
/// Returns the underlying I/O error.
pub fn write_bytes(path: &Utf8Path, contents: &[u8]) -> io::Result<()> {
    let (parent, name) = split(path)?;
    Dir::open_ambient_dir(parent, ambient_authority())?.write(name, contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    fn temp_root(tmp: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(tmp.path().to_path_buf())
            .unwrap_or_else(|path| panic!("temp dir should be utf8: {}", path.display()))
    }

    #[test]
    fn write_then_read_and_exists() {
        let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let path = temp_root(&tmp).join("payload.bin");
        assert!(!exists(&path));
        write_bytes(&path, b"abc").unwrap_or_else(|err| panic!("write: {err}"));
        assert!(exists(&path));
        assert_eq!(
            read_bytes(&path).unwrap_or_else(|err| panic!("read: {err}")),
            b"abc"
        );
    }

    #[test]
    fn missing_file_reports_not_found() {
        let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let err = read_bytes(&temp_root(&tmp).join("missing")).expect_err("missing file");
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
