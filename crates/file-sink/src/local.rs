//! Local filesystem file writer implementation

use crate::error::SinkError;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Writes whole files into a local directory
pub struct LocalFileWriter;

impl LocalFileWriter {
    /// Write `contents` to `dir/name`, replacing any existing file
    ///
    /// The data goes to a hidden temp file first, is synced, then renamed into
    /// place, so a crash never leaves a truncated file under the final name.
    ///
    /// # Example
    /// ```ignore
    /// let path = LocalFileWriter::write(Path::new("/data/gps_data"), "part-0-0-9.parquet", &bytes).await?;
    /// ```
    pub async fn write(dir: &Path, name: &str, contents: &[u8]) -> Result<PathBuf, SinkError> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| io_error(dir, e))?;

        let final_path = dir.join(name);
        let tmp_path = dir.join(format!(".{name}.tmp"));

        let mut file = tokio::fs::File::create(&tmp_path)
            .await
            .map_err(|e| io_error(&tmp_path, e))?;
        file.write_all(contents)
            .await
            .map_err(|e| io_error(&tmp_path, e))?;
        file.sync_all().await.map_err(|e| io_error(&tmp_path, e))?;
        drop(file);

        tokio::fs::rename(&tmp_path, &final_path)
            .await
            .map_err(|e| io_error(&final_path, e))?;

        Ok(final_path)
    }
}

fn io_error(path: &Path, source: std::io::Error) -> SinkError {
    SinkError::Io {
        location: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_replaces_existing_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("gps_data");

        LocalFileWriter::write(&target, "part-0-0-1.parquet", b"first")
            .await
            .unwrap();
        let path = LocalFileWriter::write(&target, "part-0-0-1.parquet", b"second")
            .await
            .unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        let names: Vec<_> = std::fs::read_dir(&target)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["part-0-0-1.parquet".to_string()]);
    }
}
