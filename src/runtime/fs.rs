//! File system operations (read, write, directory, rename).

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use super::RealRuntime;

impl RealRuntime {
    #[tracing::instrument(skip(self, contents))]
    pub(crate) fn write_impl(&self, path: &Path, contents: &[u8]) -> Result<()> {
        fs::write(path, contents)
            .with_context(|| format!("Failed to write to file {}", path.display()))?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn read_to_string_impl(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn rename_impl(&self, from: &Path, to: &Path) -> Result<()> {
        fs::rename(from, to).context("Failed to rename file")?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn create_dir_all_impl(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory {}", path.display()))?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn remove_file_impl(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).context("Failed to remove file")?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn exists_impl(&self, path: &Path) -> bool {
        path.exists()
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn create_file_impl(&self, path: &Path) -> Result<Box<dyn std::io::Write + Send>> {
        let file = fs::File::create(path)
            .with_context(|| format!("Failed to create file {}", path.display()))?;
        Ok(Box::new(std::io::BufWriter::new(file)))
    }
}

#[cfg(test)]
mod tests {
    use crate::runtime::{RealRuntime, Runtime};
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_real_runtime_file_operations() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a/b");

        runtime.create_dir_all(&nested).unwrap();
        assert!(runtime.exists(&nested));

        let file = nested.join("data.json");
        runtime.write(&file, b"{}").unwrap();
        assert_eq!(runtime.read_to_string(&file).unwrap(), "{}");

        let moved = nested.join("moved.json");
        runtime.rename(&file, &moved).unwrap();
        assert!(!runtime.exists(&file));
        assert!(runtime.exists(&moved));

        runtime.remove_file(&moved).unwrap();
        assert!(!runtime.exists(&moved));
    }

    #[test]
    fn test_real_runtime_create_file_writes_through() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");

        {
            let mut writer = runtime.create_file(&path).unwrap();
            writer.write_all(b"hello").unwrap();
            writer.flush().unwrap();
        }

        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
    }

    #[test]
    fn test_read_missing_file_mentions_path() {
        let runtime = RealRuntime;
        let err = runtime
            .read_to_string(std::path::Path::new("/nonexistent/pvcast/site.json"))
            .unwrap_err();
        assert!(err.to_string().contains("site.json"));
    }
}
