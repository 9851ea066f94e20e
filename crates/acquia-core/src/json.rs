//! JSON codec for request bodies, responses and configuration dumps.
//!
//! All wire traffic is UTF-8 JSON. Compact encoding is used for request
//! bodies; the pretty and markup-safe forms exist for human-facing output.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::ser::{CharEscape, CompactFormatter, Formatter, PrettyFormatter};
use serde_json::Value;
use std::io;

use crate::error::{Error, Result};

/// Indentation used by [`JsonCodec::encode_pretty`].
pub const PRETTY_INDENT: &[u8] = b"    ";

/// Stateless JSON encoder/decoder.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JsonCodec;

impl JsonCodec {
    /// Compact, deterministic serialization. Forward slashes are never escaped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EncodeError`] if the value cannot be represented as JSON
    /// (for example a map with non-string keys).
    pub fn encode<T>(value: &T) -> Result<String>
    where
        T: Serialize + ?Sized,
    {
        serde_json::to_string(value).map_err(|err| Error::encode(&err))
    }

    /// Pretty-printed serialization with a fixed four-space indent.
    ///
    /// # Errors
    ///
    /// See [`JsonCodec::encode`].
    pub fn encode_pretty<T>(value: &T) -> Result<String>
    where
        T: Serialize + ?Sized,
    {
        write_with(value, PrettyFormatter::with_indent(PRETTY_INDENT))
    }

    /// Serialization safe to embed next to markup: `<`, `>`, `&`, `'` and `"`
    /// inside strings are written as `\u00XX` escapes.
    ///
    /// # Errors
    ///
    /// See [`JsonCodec::encode`].
    pub fn encode_markup_safe<T>(value: &T, pretty: bool) -> Result<String>
    where
        T: Serialize + ?Sized,
    {
        if pretty {
            write_with(
                value,
                HexEscapeFormatter::new(PrettyFormatter::with_indent(PRETTY_INDENT)),
            )
        } else {
            write_with(value, HexEscapeFormatter::new(CompactFormatter))
        }
    }

    /// Decode bytes into a generic JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DecodeError`] on malformed or empty input.
    pub fn decode(bytes: &[u8]) -> Result<Value> {
        serde_json::from_slice(bytes).map_err(|err| Error::DecodeError(err.to_string()))
    }

    /// Decode bytes straight into a typed value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DecodeError`] on malformed input or a shape mismatch.
    pub fn decode_as<T>(bytes: &[u8]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        serde_json::from_slice(bytes).map_err(|err| Error::DecodeError(err.to_string()))
    }
}

fn write_with<T, F>(value: &T, formatter: F) -> Result<String>
where
    T: Serialize + ?Sized,
    F: Formatter,
{
    let mut buf = Vec::with_capacity(128);
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|err| Error::encode(&err))?;
    // serde_json only ever emits valid UTF-8
    String::from_utf8(buf).map_err(|err| Error::EncodeError(err.to_string()))
}

/// Formatter wrapper that hex-escapes markup-significant characters.
struct HexEscapeFormatter<F> {
    inner: F,
}

impl<F> HexEscapeFormatter<F> {
    const fn new(inner: F) -> Self {
        Self { inner }
    }
}

impl<F: Formatter> Formatter for HexEscapeFormatter<F> {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (idx, ch) in fragment.char_indices() {
            let escape: &[u8] = match ch {
                '<' => b"\\u003C",
                '>' => b"\\u003E",
                '&' => b"\\u0026",
                '\'' => b"\\u0027",
                _ => continue,
            };
            if start < idx {
                writer.write_all(fragment[start..idx].as_bytes())?;
            }
            writer.write_all(escape)?;
            start = idx + 1;
        }
        if start < fragment.len() {
            writer.write_all(fragment[start..].as_bytes())?;
        }
        Ok(())
    }

    fn write_char_escape<W>(&mut self, writer: &mut W, char_escape: CharEscape) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        match char_escape {
            CharEscape::Quote => writer.write_all(b"\\u0022"),
            other => self.inner.write_char_escape(writer, other),
        }
    }

    fn begin_array<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.inner.begin_array(writer)
    }

    fn end_array<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.inner.end_array(writer)
    }

    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.inner.begin_array_value(writer, first)
    }

    fn end_array_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.inner.end_array_value(writer)
    }

    fn begin_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.inner.begin_object(writer)
    }

    fn end_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.inner.end_object(writer)
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.inner.begin_object_key(writer, first)
    }

    fn end_object_key<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.inner.end_object_key(writer)
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.inner.begin_object_value(writer)
    }

    fn end_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.inner.end_object_value(writer)
    }
}
