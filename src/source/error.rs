//! Errors raised while ingesting a log source.

use std::fmt;
use std::io;

/// Failure of a log source or one of its handles.
#[derive(Debug)]
pub enum SourceError {
    /// The file or stream could not be opened.
    Open { name: String, source: io::Error },

    /// A read failed for a reason other than reaching the end of input.
    Read { name: String, source: io::Error },

    /// A followed file shrank below the offset already indexed.
    Truncated { name: String, size: u64, offset: u64 },

    /// The random-access handle was used after being closed.
    Closed { name: String },

    /// Releasing the source failed; every failure is kept.
    Close { name: String, errors: Vec<io::Error> },
}

impl SourceError {
    pub(crate) fn open(name: &str, source: io::Error) -> Self {
        SourceError::Open {
            name: name.to_string(),
            source,
        }
    }

    pub(crate) fn read(name: &str, source: io::Error) -> Self {
        SourceError::Read {
            name: name.to_string(),
            source,
        }
    }

    /// Truncation ends the live session but leaves loaded rows valid
    pub fn is_truncation(&self) -> bool {
        matches!(self, SourceError::Truncated { .. })
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Open { name, source } => write!(f, "cannot open {}: {}", name, source),
            SourceError::Read { name, source } => write!(f, "cannot read {}: {}", name, source),
            SourceError::Truncated { name, size, offset } => write!(
                f,
                "{} was truncated: size {} is below the last read offset {}",
                name, size, offset
            ),
            SourceError::Closed { name } => write!(f, "{} is closed", name),
            SourceError::Close { name, errors } => {
                write!(f, "cannot close {}: ", name)?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SourceError::Open { source, .. } | SourceError::Read { source, .. } => Some(source),
            SourceError::Close { errors, .. } => errors
                .first()
                .map(|e| e as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_error_lists_every_failure() {
        let err = SourceError::Close {
            name: "app.log".to_string(),
            errors: vec![
                io::Error::new(io::ErrorKind::Other, "first"),
                io::Error::new(io::ErrorKind::Other, "second"),
            ],
        };

        assert_eq!(err.to_string(), "cannot close app.log: first; second");
    }

    #[test]
    fn test_truncation_is_distinct() {
        let truncated = SourceError::Truncated {
            name: "app.log".to_string(),
            size: 0,
            offset: 42,
        };
        let read = SourceError::read("app.log", io::Error::new(io::ErrorKind::Other, "boom"));

        assert!(truncated.is_truncation());
        assert!(!read.is_truncation());
        assert!(truncated.to_string().contains("42"));
    }
}
