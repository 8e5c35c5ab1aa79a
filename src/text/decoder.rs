use std::iter::FusedIterator;

use tracing::{debug, trace};

use super::{DecodeError, Decoder, Encoding, Newline, TextOptions};
use crate::buffered::BufferedReader;
use crate::error::{Error, Result};
use crate::raw::{Chunk, RawStream};

/// Decoded text waiting to be returned to the caller.
///
/// A `\r` at the very end of the decoded input so far may be the first half
/// of a `\r\n` whose `\n` has not arrived yet. Such a `\r` is held out of
/// `text` until the next piece of input (or the end of the data) decides
/// what it is.
#[derive(Default)]
struct PendingText {
	text: String,
	/// The number of characters in `text`.
	chars: usize,
	/// The byte length of the prefix of `text` known to hold no terminator.
	scanned: usize,
	cr_pending: bool,
}

impl PendingText {
	/// Appends freshly decoded text, resolving any held `\r` first.
	fn push(&mut self, decoded: &str, last: bool, newline: Newline) {
		let mut text = String::with_capacity(decoded.len() + 1);
		if self.cr_pending {
			text.push('\r');
			self.cr_pending = false;
		}
		text.push_str(decoded);
		if !last && text.ends_with('\r') {
			text.pop();
			self.cr_pending = true;
		}

		if newline.translates() {
			text = text.replace("\r\n", "\n").replace('\r', "\n");
		}
		self.chars += text.chars().count();
		self.text.push_str(&text);
	}

	/// Returns the byte length of the first complete line, terminator
	/// included.
	fn line_len(&mut self) -> Option<usize> {
		let Some(i) = self.text[self.scanned..].find(['\r', '\n']) else {
			self.scanned = self.text.len();
			return None;
		};
		let i = self.scanned + i;
		let rest = &self.text.as_bytes()[i..];
		Some(match rest {
			[b'\r', b'\n', ..] => i + 2,
			_ => i + 1,
		})
	}

	/// Returns the byte length of the first `n` characters, or of all the
	/// text if it is shorter.
	fn char_prefix_len(&self, n: usize) -> usize {
		match n < self.chars {
			true => self.text.char_indices().nth(n).map_or(self.text.len(), |(i, _)| i),
			false => self.text.len(),
		}
	}

	fn take(&mut self, len: usize) -> String {
		let rest = self.text.split_off(len);
		let taken = std::mem::replace(&mut self.text, rest);
		self.chars -= taken.chars().count();
		self.scanned = self.scanned.saturating_sub(len);
		taken
	}
}

/// Decodes the bytes of a [`BufferedReader`] as text.
///
/// Bytes are pulled from the reader in chunks of a configured size, decoded
/// incrementally, and translated according to the [`Newline`] policy. A
/// multi-byte sequence or a `\r\n` split between two chunks is reassembled
/// before any of it is returned, so chunk boundaries are never visible in
/// the output.
///
/// When the reader would block, bounded reads return the text they have,
/// while [`readline`](Self::readline) keeps a partial line for the next call.
/// Once the reader reaches the end of its data, the decoder stays at the end.
///
/// Bytes that cannot be decoded end the text much like the end of the data
/// does. Text decoded before them is returned first, and every read after
/// that fails with the same [`DecodeError`](crate::DecodeError).
///
/// ```
/// use layered_io::{BufferedReader, MemoryStream, TextDecoder};
///
/// let raw = MemoryStream::from_bytes(&b"one\r\ntwo\rthree"[..]);
/// let lines = TextDecoder::new(BufferedReader::new(raw));
/// let lines: Vec<String> = lines.collect::<Result<_, _>>().unwrap();
/// assert_eq!(lines, ["one\n", "two\n", "three"]);
/// ```
pub struct TextDecoder<R> {
	inner: BufferedReader<R>,
	decoder: Decoder,
	encoding: Encoding,
	newline: Newline,
	chunk_size: usize,
	pending: PendingText,
	eof: bool,
	failed: Option<DecodeError>,
	fused: bool,
}

impl<R> TextDecoder<R>
where
	R: RawStream,
{
	/// Decodes UTF-8 with universal newlines.
	pub fn new(inner: BufferedReader<R>) -> Self {
		Self::build(inner, TextOptions::default())
	}

	pub fn with_options(inner: BufferedReader<R>, options: TextOptions) -> Result<Self> {
		options.validate()?;
		Ok(Self::build(inner, options))
	}

	fn build(inner: BufferedReader<R>, options: TextOptions) -> Self {
		Self {
			inner,
			decoder: Decoder::new(options.encoding),
			encoding: options.encoding,
			newline: options.newline,
			chunk_size: options.chunk_size,
			pending: PendingText::default(),
			eof: false,
			failed: None,
			fused: false,
		}
	}

	/// Reads up to `n` characters, or everything up to the end of the data
	/// when `n` is `None`.
	///
	/// A bounded read returns fewer than `n` characters only at the end of the
	/// data or when the reader would block. Nothing at all is reported as
	/// [`Chunk::Eof`] or [`Chunk::WouldBlock`] accordingly.
	pub fn read(&mut self, n: Option<usize>) -> Result<Chunk<String>> {
		self.check_open()?;
		if n == Some(0) {
			return Ok(Chunk::Data(String::new()));
		}

		let mut blocked = false;
		while !self.finished() && n.map_or(true, |n| self.pending.chars < n) {
			if self.fill()?.is_would_block() {
				blocked = true;
				break;
			}
		}

		let len = match n {
			Some(n) => self.pending.char_prefix_len(n),
			None => self.pending.text.len(),
		};
		Ok(match (len, blocked) {
			(0, true) => Chunk::WouldBlock,
			(0, false) => self.end()?,
			(len, _) => Chunk::Data(self.pending.take(len)),
		})
	}

	/// Reads one line, including its terminator.
	///
	/// Lines end at `\n`, `\r\n` or `\r`; under [`Newline::Universal`] each of
	/// these has already become `\n`. The last line of the data may have no
	/// terminator. If the reader would block before a line is complete, the
	/// partial line is kept and [`Chunk::WouldBlock`] is returned.
	pub fn readline(&mut self) -> Result<Chunk<String>> {
		self.check_open()?;
		loop {
			if let Some(len) = self.pending.line_len() {
				return Ok(Chunk::Data(self.pending.take(len)));
			}
			if self.finished() {
				return match self.pending.text.len() {
					0 => self.end(),
					len => Ok(Chunk::Data(self.pending.take(len))),
				};
			}
			if self.fill()?.is_would_block() {
				return Ok(Chunk::WouldBlock);
			}
		}
	}

	fn check_open(&self) -> Result<()> {
		match self.inner.closed() {
			true => Err(Error::Closed),
			false => Ok(()),
		}
	}

	/// Pulls and decodes one chunk from the reader.
	fn fill(&mut self) -> Result<Chunk<()>> {
		let mut decoded = String::new();
		let (result, last) = match self.inner.read(Some(self.chunk_size))? {
			Chunk::Data(bytes) => {
				let result = self.decoder.decode(&bytes, false, &mut decoded);
				trace!(bytes = bytes.len(), chars = decoded.chars().count(), "decoded chunk");
				(result, false)
			}
			Chunk::WouldBlock => return Ok(Chunk::WouldBlock),
			Chunk::Eof => (self.decoder.decode(&[], true, &mut decoded), true),
		};

		// Nothing is decoded past an error, so a held \r is final there too.
		self.pending.push(&decoded, last || result.is_err(), self.newline);
		match result {
			Ok(()) if !last => Ok(Chunk::Data(())),
			Ok(()) => {
				self.eof = true;
				Ok(Chunk::Eof)
			}
			Err(err) => {
				debug!(%err, "decoding stopped");
				self.failed = Some(err);
				Ok(Chunk::Eof)
			}
		}
	}

	/// Returns true once no more text can be decoded.
	fn finished(&self) -> bool {
		self.eof || self.failed.is_some()
	}

	/// Reports the end of the text: the end of the data, or the error that
	/// stopped decoding.
	fn end(&self) -> Result<Chunk<String>> {
		match &self.failed {
			Some(err) => Err(Error::Decode(err.clone())),
			None => Ok(Chunk::Eof),
		}
	}

	pub fn encoding(&self) -> Encoding {
		self.encoding
	}

	pub fn newline(&self) -> Newline {
		self.newline
	}

	pub fn close(&mut self) -> Result<()> {
		self.inner.close()
	}

	pub fn closed(&self) -> bool {
		self.inner.closed()
	}

	pub fn get_ref(&self) -> &BufferedReader<R> {
		&self.inner
	}

	/// Unwraps the reader. Text decoded but not yet returned is lost.
	pub fn into_inner(self) -> BufferedReader<R> {
		self.inner
	}
}

impl<R> Iterator for TextDecoder<R>
where
	R: RawStream,
{
	type Item = Result<String>;

	/// Yields successive lines. A reader that would block produces an
	/// [`Error::WouldBlock`] item, after which iteration can continue.
	fn next(&mut self) -> Option<Self::Item> {
		if self.fused {
			return None;
		}
		match self.readline() {
			Ok(Chunk::Data(line)) => Some(Ok(line)),
			Ok(Chunk::WouldBlock) => Some(Err(Error::WouldBlock { written: 0 })),
			Ok(Chunk::Eof) => {
				self.fused = true;
				None
			}
			Err(err) => {
				self.fused = true;
				Some(Err(err))
			}
		}
	}
}

impl<R> FusedIterator for TextDecoder<R> where R: RawStream {}
