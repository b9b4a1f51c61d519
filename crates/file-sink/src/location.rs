use crate::error::SinkError;
use std::path::PathBuf;

/// Where a topic's files are stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkLocation {
    /// Local directory
    Local(PathBuf),
    /// S3 bucket and key prefix (empty or ending with `/`)
    S3 { bucket: String, prefix: String },
}

impl SinkLocation {
    /// Parse a string into a SinkLocation, auto-detecting the location type
    ///
    /// - `s3://bucket/prefix/` -> S3
    /// - Everything else -> Local
    pub fn parse(uri: &str) -> Result<Self, SinkError> {
        if uri.starts_with("s3://") {
            let (bucket, prefix) = parse_s3_uri(uri)?;
            Ok(SinkLocation::S3 { bucket, prefix })
        } else if uri.is_empty() {
            Err(SinkError::InvalidLocation(uri.to_string()))
        } else {
            Ok(SinkLocation::Local(PathBuf::from(uri)))
        }
    }

    /// Location of `name` inside this one.
    pub fn join(&self, name: &str) -> SinkLocation {
        match self {
            SinkLocation::Local(dir) => SinkLocation::Local(dir.join(name)),
            SinkLocation::S3 { bucket, prefix } => SinkLocation::S3 {
                bucket: bucket.clone(),
                prefix: format!("{prefix}{name}/"),
            },
        }
    }

    /// Get a display name for logging
    pub fn display_name(&self) -> String {
        match self {
            SinkLocation::Local(path) => path.display().to_string(),
            SinkLocation::S3 { bucket, prefix } => format!("s3://{bucket}/{prefix}"),
        }
    }
}

/// Parse S3 URI in the format: s3://bucket/prefix/
///
/// The returned prefix is empty or ends with `/`.
pub fn parse_s3_uri(uri: &str) -> Result<(String, String), SinkError> {
    let rest = uri
        .strip_prefix("s3://")
        .ok_or_else(|| SinkError::InvalidLocation(uri.to_string()))?;

    let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));
    if bucket.is_empty() {
        return Err(SinkError::InvalidLocation(uri.to_string()));
    }

    let mut prefix = prefix.to_string();
    if !prefix.is_empty() && !prefix.ends_with('/') {
        prefix.push('/');
    }

    Ok((bucket.to_string(), prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_local_dir() {
        let location = SinkLocation::parse("/data/city/").unwrap();
        assert_eq!(location, SinkLocation::Local(PathBuf::from("/data/city/")));
    }

    #[test]
    fn test_parse_s3_prefix() {
        let location = SinkLocation::parse("s3://city-data/raw").unwrap();
        assert_eq!(
            location,
            SinkLocation::S3 {
                bucket: "city-data".to_string(),
                prefix: "raw/".to_string(),
            }
        );
        assert_eq!(location.display_name(), "s3://city-data/raw/");
    }

    #[test]
    fn test_parse_s3_bucket_only() {
        let (bucket, prefix) = parse_s3_uri("s3://city-data").unwrap();
        assert_eq!(bucket, "city-data");
        assert_eq!(prefix, "");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(SinkLocation::parse("").is_err());
        assert!(SinkLocation::parse("s3:///raw").is_err());
    }

    #[test]
    fn test_join_topic() {
        let root = SinkLocation::parse("s3://city-data/raw/").unwrap();
        assert_eq!(
            root.join("gps_data").display_name(),
            "s3://city-data/raw/gps_data/"
        );

        let local = SinkLocation::parse("/data").unwrap();
        assert_eq!(
            local.join("gps_data"),
            SinkLocation::Local(PathBuf::from("/data/gps_data"))
        );
    }
}
