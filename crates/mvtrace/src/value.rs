//! Written-value payloads attached to WRITE operations.

use std::fmt::{self, Write as _};

use mvtrace_error::{Result, TraceError};

use crate::render::{BoundedBuf, Escaped, VALUE_CAPACITY};

/// Rendering closure carried by [`Value::Custom`].
pub type RenderFn = Box<dyn Fn(&mut dyn fmt::Write) -> fmt::Result + Send + Sync>;

/// A value written by a transaction, kept only long enough to render it.
///
/// `None` is the "no value" sentinel: it is never rendered, and a WRITE
/// carrying it omits the `wVal` field.
#[derive(Default)]
pub enum Value {
    /// No value attached.
    #[default]
    None,
    /// Rendered as a decimal integer.
    Integer(i64),
    /// Rendered with two fixed decimals.
    Float(f64),
    /// Rendered with line-breaking characters escaped.
    Text(String),
    /// Rendered by the closure, escaped like text.
    Custom(RenderFn),
}

impl Value {
    /// Wrap an integer.
    #[must_use]
    pub const fn integer(v: i64) -> Self {
        Self::Integer(v)
    }

    /// Wrap a float.
    #[must_use]
    pub const fn float(v: f64) -> Self {
        Self::Float(v)
    }

    /// Wrap owned text.
    #[must_use]
    pub fn text(v: impl Into<String>) -> Self {
        Self::Text(v.into())
    }

    /// Copy borrowed text into a new value.
    ///
    /// Fails with [`TraceError::OutOfMemory`] instead of aborting when the
    /// copy cannot be allocated.
    pub fn try_text(v: &str) -> Result<Self> {
        let mut owned = String::new();
        owned
            .try_reserve_exact(v.len())
            .map_err(|_| TraceError::OutOfMemory)?;
        owned.push_str(v);
        Ok(Self::Text(owned))
    }

    /// Wrap a rendering closure.
    #[must_use]
    pub fn custom<F>(render: F) -> Self
    where
        F: Fn(&mut dyn fmt::Write) -> fmt::Result + Send + Sync + 'static,
    {
        Self::Custom(Box::new(render))
    }

    /// Whether this is the "no value" sentinel.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Render into a bounded buffer, or `None` for the sentinel.
    ///
    /// Text and custom output have `\\`, `\n`, `\r` and `\t` escaped so a
    /// value can never end its trace line early. Output longer than
    /// [`VALUE_CAPACITY`] bytes is truncated.
    #[must_use]
    pub fn render(&self) -> Option<BoundedBuf<VALUE_CAPACITY>> {
        let mut out = BoundedBuf::new();
        // BoundedBuf never fails; only a custom closure can.
        let res = match self {
            Self::None => return None,
            Self::Integer(v) => write!(out, "{v}"),
            Self::Float(v) => write!(out, "{v:.2}"),
            Self::Text(v) => {
                out.write_escaped(v);
                Ok(())
            }
            Self::Custom(render) => render(&mut Escaped(&mut out)),
        };
        if res.is_err() {
            tracing::debug!(target: "mvtrace", rendered = out.as_str(), "custom value renderer failed");
        }
        Some(out)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Integer(v) => f.debug_tuple("Integer").field(v).finish(),
            Self::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Self::Text(v) => f.debug_tuple("Text").field(v).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(value: &Value) -> Option<String> {
        value.render().map(|buf| buf.as_str().to_owned())
    }

    #[test]
    fn sentinel_is_never_rendered() {
        let value = Value::None;
        assert!(value.is_none());
        assert_eq!(rendered(&value), None);
    }

    #[test]
    fn integer_renders_decimal() {
        assert_eq!(rendered(&Value::integer(-76_000)).as_deref(), Some("-76000"));
        assert_eq!(
            rendered(&Value::from(i64::MIN)).as_deref(),
            Some("-9223372036854775808")
        );
    }

    #[test]
    fn float_renders_two_decimals() {
        assert_eq!(rendered(&Value::float(3.14159)).as_deref(), Some("3.14"));
        assert_eq!(rendered(&Value::from(2.0)).as_deref(), Some("2.00"));
    }

    #[test]
    fn text_renders_verbatim() {
        assert_eq!(
            rendered(&Value::text("Engineering")).as_deref(),
            Some("Engineering")
        );
        assert_eq!(rendered(&Value::from("")).as_deref(), Some(""));
    }

    #[test]
    fn text_cannot_break_the_line() {
        assert_eq!(
            rendered(&Value::text("x\nOp: COMMIT\t Tx: 9")).as_deref(),
            Some(r"x\nOp: COMMIT\t Tx: 9")
        );
        assert_eq!(rendered(&Value::from(r"C:\dir")).as_deref(), Some(r"C:\\dir"));
    }

    #[test]
    fn custom_output_is_escaped() {
        let value = Value::custom(|out| write!(out, "a\r\n{}", 1));
        assert_eq!(rendered(&value).as_deref(), Some(r"a\r\n1"));
    }

    #[test]
    fn try_text_copies() {
        let source = String::from("76000");
        let value = Value::try_text(&source).unwrap();
        drop(source);
        assert_eq!(rendered(&value).as_deref(), Some("76000"));
    }

    #[test]
    fn oversized_text_truncates() {
        let long = "x".repeat(VALUE_CAPACITY * 3);
        let buf = Value::text(long).render().unwrap();
        assert_eq!(buf.len(), VALUE_CAPACITY);
        assert!(buf.is_truncated());
    }

    #[test]
    fn huge_float_truncates_instead_of_overflowing() {
        let buf = Value::float(f64::MAX).render().unwrap();
        assert_eq!(buf.len(), VALUE_CAPACITY);
        assert!(buf.is_truncated());
    }

    #[test]
    fn custom_closure_renders() {
        let value = Value::custom(|out| write!(out, "salary={}", 51_000));
        assert_eq!(rendered(&value).as_deref(), Some("salary=51000"));
        assert_eq!(format!("{value:?}"), "Custom(..)");
    }

    #[test]
    fn failing_custom_closure_keeps_partial_output() {
        let value = Value::custom(|out| {
            out.write_str("partial")?;
            Err(fmt::Error)
        });
        assert_eq!(rendered(&value).as_deref(), Some("partial"));
    }

    #[test]
    fn value_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Value>();
    }
}
