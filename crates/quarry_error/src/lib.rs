use std::error::Error;
use std::fmt;

/// Convenience result type that defaults the error to [`QuarryError`].
pub type Result<T, E = QuarryError> = std::result::Result<T, E>;

/// Macro for returning a "not yet implemented" error for some feature.
///
/// Accepts a feature description as the first argument, with remaining
/// arguments used for formatting.
#[macro_export]
macro_rules! not_implemented {
    ($($arg:tt)*) => {{
        let msg = format!($($arg)*);
        return Err($crate::QuarryError::new(format!("Not implemented: {msg}")));
    }};
}

/// Workspace-wide error type.
///
/// Errors carry a message with enough context to diagnose the failure (byte
/// offset, field path, encoding name) and optionally the lower-level error
/// that triggered it.
#[derive(Debug)]
pub struct QuarryError {
    inner: Box<QuarryErrorInner>,
}

#[derive(Debug)]
struct QuarryErrorInner {
    msg: String,
    source: Option<Box<dyn Error + Send + Sync>>,
}

impl QuarryError {
    pub fn new(msg: impl Into<String>) -> Self {
        QuarryError {
            inner: Box::new(QuarryErrorInner {
                msg: msg.into(),
                source: None,
            }),
        }
    }

    pub fn with_source(msg: impl Into<String>, source: Box<dyn Error + Send + Sync>) -> Self {
        QuarryError {
            inner: Box::new(QuarryErrorInner {
                msg: msg.into(),
                source: Some(source),
            }),
        }
    }
}

impl fmt::Display for QuarryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.msg)?;
        if let Some(source) = &self.inner.source {
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

impl Error for QuarryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.inner.source.as_ref().map(|e| e.as_ref() as _)
    }
}

macro_rules! impl_from_error {
    ($err:ty, $msg:expr) => {
        impl From<$err> for QuarryError {
            fn from(value: $err) -> Self {
                Self::with_source($msg, Box::new(value))
            }
        }
    };
}

impl_from_error!(std::io::Error, "IO error");
impl_from_error!(std::str::Utf8Error, "UTF-8 error");
impl_from_error!(std::string::FromUtf8Error, "UTF-8 error");
impl_from_error!(std::array::TryFromSliceError, "Slice conversion error");
impl_from_error!(std::num::TryFromIntError, "Integer conversion error");

/// Extends results with methods for wrapping the error with additional
/// context.
pub trait ResultExt<T, E> {
    /// Wrap an error with a static context string.
    fn context(self, msg: &'static str) -> Result<T>;

    /// Wrap an error with a context string generated from a function.
    fn context_fn<F: Fn() -> String>(self, f: F) -> Result<T>;
}

impl<T, E> ResultExt<T, E> for Result<T, E>
where
    E: Error + Send + Sync + 'static,
{
    fn context(self, msg: &'static str) -> Result<T> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(QuarryError::with_source(msg, Box::new(e))),
        }
    }

    fn context_fn<F: Fn() -> String>(self, f: F) -> Result<T> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(QuarryError::with_source(f(), Box::new(e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_source() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        let err = QuarryError::with_source("failed to read footer", Box::new(io));

        let s = err.to_string();
        assert!(s.contains("failed to read footer"), "{s}");
        assert!(s.contains("eof"), "{s}");
    }

    #[test]
    fn context_wraps_error() {
        let res: Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "eof",
        ));
        let err = res.context("reading page header").unwrap_err();
        assert!(err.to_string().contains("reading page header"));
    }
}
