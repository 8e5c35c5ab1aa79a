//! Text decoding and encoding over the buffered layers.
//!
//! [`TextDecoder`] turns the bytes of a [`BufferedReader`](crate::BufferedReader)
//! into text, and [`TextEncoder`] does the reverse for a
//! [`BufferedWriter`](crate::BufferedWriter). Both apply a [`Newline`] policy.
//! The decoder always recognizes all three common line terminators when
//! splitting lines; the policy decides whether they are rewritten to `\n` on
//! the way in. The encoder writes the policy's terminator for each `\n`.
//!
//! [`StringStream`] holds text in memory, with positions counted in
//! characters.

use serde::Deserialize;

use crate::error::{Error, Result};

mod decoder;
mod encoder;
mod encoding;
mod string;

pub use decoder::TextDecoder;
pub use encoder::TextEncoder;
pub use encoding::{DecodeError, EncodeError, Encoding};
pub use string::StringStream;

pub(crate) use encoding::Decoder;

/// How line terminators are translated.
///
/// In configuration files, a newline is written as the terminator string
/// itself, with a missing value meaning [`Universal`](Newline::Universal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "Option<String>")]
pub enum Newline {
	/// Decoding rewrites `\r\n` and `\r` to `\n`. Encoding writes `\n`.
	#[default]
	Universal,
	/// Terminators pass through decoding unchanged. Encoding writes `\n`.
	Lf,
	/// Terminators pass through decoding unchanged. Encoding writes `\r`.
	Cr,
	/// Terminators pass through decoding unchanged. Encoding writes `\r\n`.
	CrLf,
}

impl Newline {
	/// Returns the terminator written in place of each `\n`.
	pub fn as_str(self) -> &'static str {
		match self {
			Newline::Universal | Newline::Lf => "\n",
			Newline::Cr => "\r",
			Newline::CrLf => "\r\n",
		}
	}

	/// Maps a terminator string to its policy, with `None` meaning universal.
	pub fn from_terminator(terminator: Option<&str>) -> Result<Self> {
		match terminator {
			None => Ok(Newline::Universal),
			Some("\n") => Ok(Newline::Lf),
			Some("\r") => Ok(Newline::Cr),
			Some("\r\n") => Ok(Newline::CrLf),
			Some(_) => Err(Error::InvalidOption(r#"newline must be absent, "\n", "\r" or "\r\n""#)),
		}
	}

	pub(crate) fn translates(self) -> bool {
		self == Newline::Universal
	}
}

impl TryFrom<Option<String>> for Newline {
	type Error = Error;

	fn try_from(terminator: Option<String>) -> Result<Self> {
		Newline::from_terminator(terminator.as_deref())
	}
}

/// The number of bytes a [`TextDecoder`] requests per raw read when none is
/// configured.
pub const DEFAULT_CHUNK_SIZE: usize = 128;

/// Construction-time configuration for the text layer.
///
/// ```
/// use layered_io::{Encoding, Newline, TextOptions};
///
/// let options = TextOptions::new()
///     .with_encoding(Encoding::Utf16Little)
///     .with_newline(Newline::CrLf);
/// assert_eq!(options.chunk_size, 128);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TextOptions {
	pub encoding: Encoding,
	pub newline: Newline,

	/// How many bytes the decoder pulls from its reader at a time.
	pub chunk_size: usize,
}

impl Default for TextOptions {
	fn default() -> Self {
		Self {
			encoding: Encoding::Utf8,
			newline: Newline::Universal,
			chunk_size: DEFAULT_CHUNK_SIZE,
		}
	}
}

impl TextOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_encoding(mut self, encoding: Encoding) -> Self {
		self.encoding = encoding;
		self
	}

	pub fn with_newline(mut self, newline: Newline) -> Self {
		self.newline = newline;
		self
	}

	pub fn with_chunk_size(mut self, size: usize) -> Self {
		self.chunk_size = size;
		self
	}

	pub fn validate(&self) -> Result<()> {
		match self.chunk_size {
			0 => Err(Error::InvalidOption("chunk_size must be greater than zero")),
			_ => Ok(()),
		}
	}
}
