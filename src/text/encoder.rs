use std::borrow::Cow;

use super::{Encoding, Newline, TextOptions};
use crate::buffered::BufferedWriter;
use crate::error::Result;
use crate::raw::RawStream;

/// Encodes text into a [`BufferedWriter`].
///
/// Each `\n` written is replaced by the terminator of the configured
/// [`Newline`] policy before encoding.
///
/// ```
/// use layered_io::{BufferedWriter, MemoryStream, Newline, TextEncoder, TextOptions};
///
/// let options = TextOptions::new().with_newline(Newline::CrLf);
/// let mut enc = TextEncoder::with_options(BufferedWriter::new(MemoryStream::new()), options).unwrap();
/// assert_eq!(enc.write("a\nb\n").unwrap(), 4);
/// enc.flush().unwrap();
/// assert_eq!(enc.get_ref().get_ref().value(), b"a\r\nb\r\n");
/// ```
pub struct TextEncoder<W>
where
	W: RawStream,
{
	inner: BufferedWriter<W>,
	encoding: Encoding,
	newline: Newline,
	scratch: Vec<u8>,
}

impl<W> TextEncoder<W>
where
	W: RawStream,
{
	/// Encodes UTF-8, writing `\n` line terminators.
	pub fn new(inner: BufferedWriter<W>) -> Self {
		Self::build(inner, TextOptions::default())
	}

	/// Applies the encoding and newline policy of `options`. The chunk size
	/// only matters when decoding.
	pub fn with_options(inner: BufferedWriter<W>, options: TextOptions) -> Result<Self> {
		options.validate()?;
		Ok(Self::build(inner, options))
	}

	fn build(inner: BufferedWriter<W>, options: TextOptions) -> Self {
		Self {
			inner,
			encoding: options.encoding,
			newline: options.newline,
			scratch: Vec::new(),
		}
	}

	/// Encodes and buffers `text`, returning the number of characters
	/// written.
	///
	/// Text containing a character the encoding cannot represent is rejected
	/// whole, before anything is written. If the writer would block, the
	/// [`Error::WouldBlock`](crate::Error::WouldBlock) count is in encoded
	/// bytes.
	pub fn write(&mut self, text: &str) -> Result<usize> {
		let count = text.chars().count();
		let text = match self.newline.as_str() {
			"\n" => Cow::Borrowed(text),
			newline => Cow::Owned(text.replace('\n', newline)),
		};

		self.scratch.clear();
		self.encoding.encode_into(&text, &mut self.scratch)?;
		self.inner.write(&self.scratch)?;
		Ok(count)
	}

	pub fn flush(&mut self) -> Result<()> {
		self.inner.flush()
	}

	pub fn close(&mut self) -> Result<()> {
		self.inner.close()
	}

	pub fn closed(&self) -> bool {
		self.inner.closed()
	}

	pub fn encoding(&self) -> Encoding {
		self.encoding
	}

	pub fn newline(&self) -> Newline {
		self.newline
	}

	pub fn get_ref(&self) -> &BufferedWriter<W> {
		&self.inner
	}
}
