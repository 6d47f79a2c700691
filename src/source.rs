#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("file path cannot be empty while reading a file")]
    EmptyPath,
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// Read a program's source text from disk.
#[tracing::instrument]
pub fn read_source(path: &str) -> Result<String, SourceError> {
    if path.is_empty() {
        return Err(SourceError::EmptyPath);
    }
    std::fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_path() {
        let error = read_source("").unwrap_err();
        assert!(matches!(error, SourceError::EmptyPath));
        assert_eq!(
            error.to_string(),
            "file path cannot be empty while reading a file"
        );
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            read_source("no-such-program.asm"),
            Err(SourceError::Io { .. })
        ));
    }
}
