use std::sync::Arc;

pub type RivetResult<T> = Result<T, RivetError>;

/// Generic error that contains all the different kinds of errors that may occur when using the API
#[derive(Debug, Clone)]
pub enum RivetError {
    StringError(String),
    IoError(Arc<std::io::Error>),
}

impl std::error::Error for RivetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            RivetError::StringError(_) => None,
            RivetError::IoError(ref e) => Some(&**e),
        }
    }
}

impl core::fmt::Display for RivetError {
    fn fmt(
        &self,
        fmt: &mut core::fmt::Formatter,
    ) -> core::fmt::Result {
        match *self {
            RivetError::StringError(ref e) => e.fmt(fmt),
            RivetError::IoError(ref e) => e.fmt(fmt),
        }
    }
}

impl From<&str> for RivetError {
    fn from(str: &str) -> Self {
        RivetError::StringError(str.to_string())
    }
}

impl From<String> for RivetError {
    fn from(string: String) -> Self {
        RivetError::StringError(string)
    }
}

impl From<std::io::Error> for RivetError {
    fn from(error: std::io::Error) -> Self {
        RivetError::IoError(Arc::new(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn fails_with_str() -> RivetResult<()> {
        Err("texture extent is zero")?
    }

    #[test]
    fn test_question_mark_converts_str() {
        let error = fails_with_str().unwrap_err();
        assert_eq!(error.to_string(), "texture extent is zero");
        assert!(error.source().is_none());
    }

    #[test]
    fn test_io_error_keeps_source() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "demo.ron");
        let error: RivetError = io_error.into();
        assert!(error.source().is_some());

        // Errors are cloneable so they can be stored on resources and reported later
        let cloned = error.clone();
        assert_eq!(cloned.to_string(), error.to_string());
    }
}
