use std::cmp::min;
use std::io::{self, SeekFrom};

use crate::error::{Error, Result};
use crate::raw::{resolve_seek, Chunk};

/// An in-memory text stream, the character counterpart of
/// [`MemoryStream`](crate::MemoryStream).
///
/// Positions count characters rather than bytes. Like a `MemoryStream`, the
/// position may be moved past the end of the text, and a write there fills
/// the gap with NUL characters. Reads never report [`Chunk::WouldBlock`].
///
/// ```
/// use layered_io::{Chunk, StringStream};
/// use std::io::SeekFrom;
///
/// let mut s = StringStream::from_text("h\u{e9}llo");
/// s.seek(SeekFrom::Start(1))?;
/// assert_eq!(s.read(Some(2))?, Chunk::Data("\u{e9}l".to_owned()));
/// assert_eq!(s.tell()?, 3);
/// # Ok::<(), layered_io::Error>(())
/// ```
#[derive(Debug, Default, Clone)]
pub struct StringStream {
	buf: Vec<char>,
	pos: u64,
	closed: bool,
}

impl StringStream {
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a stream holding `text`, positioned at the start.
	pub fn from_text(text: &str) -> Self {
		Self {
			buf: text.chars().collect(),
			pos: 0,
			closed: false,
		}
	}

	/// Returns the full text of the stream, independent of its position.
	pub fn value(&self) -> String {
		self.buf.iter().collect()
	}

	fn check_open(&self) -> Result<()> {
		match self.closed {
			true => Err(Error::Closed),
			false => Ok(()),
		}
	}

	fn offset(&self) -> usize {
		usize::try_from(self.pos).map_or(self.buf.len(), |pos| min(pos, self.buf.len()))
	}

	/// Reads up to `n` characters, or the rest of the text when `n` is
	/// `None`.
	pub fn read(&mut self, n: Option<usize>) -> Result<Chunk<String>> {
		self.check_open()?;
		if n == Some(0) {
			return Ok(Chunk::Data(String::new()));
		}

		let unread = &self.buf[self.offset()..];
		if unread.is_empty() {
			return Ok(Chunk::Eof);
		}
		let len = n.map_or(unread.len(), |n| min(n, unread.len()));
		let text = unread[..len].iter().collect();
		self.pos += len as u64;
		Ok(Chunk::Data(text))
	}

	/// Reads through the next `\n`, or the rest of the text if there is none.
	pub fn readline(&mut self) -> Result<Chunk<String>> {
		self.check_open()?;
		let unread = &self.buf[self.offset()..];
		let len = unread.iter().position(|&ch| ch == '\n').map_or(unread.len(), |i| i + 1);
		self.read(Some(len)).map(|chunk| match len {
			0 => Chunk::Eof,
			_ => chunk,
		})
	}

	/// Writes `text` at the current position, returning its length in
	/// characters.
	pub fn write(&mut self, text: &str) -> Result<usize> {
		self.check_open()?;
		let count = text.chars().count();
		if count == 0 {
			return Ok(0);
		}

		let unaddressable = || Error::InvalidSeek(i128::from(self.pos));
		let start = usize::try_from(self.pos).map_err(|_| unaddressable())?;
		let end = start.checked_add(count).ok_or_else(unaddressable)?;
		if end > self.buf.len() {
			self.buf
				.try_reserve(end - self.buf.len())
				.map_err(|err| io::Error::new(io::ErrorKind::OutOfMemory, err))?;
			self.buf.resize(end, '\0');
		}
		for (slot, ch) in self.buf[start..end].iter_mut().zip(text.chars()) {
			*slot = ch;
		}
		self.pos = end as u64;
		Ok(count)
	}

	pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
		self.check_open()?;
		self.pos = resolve_seek(pos, self.pos, self.buf.len() as u64)?;
		Ok(self.pos)
	}

	pub fn tell(&self) -> Result<u64> {
		self.check_open()?;
		Ok(self.pos)
	}

	/// Cuts the text to `size` characters, or to the current position. The
	/// position does not move.
	pub fn truncate(&mut self, size: Option<u64>) -> Result<u64> {
		self.check_open()?;
		let size = size.unwrap_or(self.pos);
		if let Ok(size) = usize::try_from(size) {
			self.buf.truncate(size);
		}
		Ok(self.buf.len() as u64)
	}

	pub fn close(&mut self) {
		self.closed = true;
	}

	pub fn closed(&self) -> bool {
		self.closed
	}
}

#[cfg(test)]
mod tests {
	use std::io::SeekFrom;

	use super::StringStream;
	use crate::{Chunk, Error};

	const TEXT: &str = "12345\u{e9}789\u{1f600}";

	fn text(s: &str) -> Chunk<String> {
		Chunk::Data(s.to_owned())
	}

	#[test]
	fn string_read_counts_characters() {
		let mut s = StringStream::from_text(TEXT);
		assert_eq!(s.read(Some(1)).unwrap(), text("1"));
		assert_eq!(s.read(Some(5)).unwrap(), text("2345\u{e9}"));
		assert_eq!(s.read(Some(900)).unwrap(), text("789\u{1f600}"));
		assert_eq!(s.read(None).unwrap(), Chunk::Eof);
		assert_eq!(s.read(Some(0)).unwrap(), text(""));
	}

	#[test]
	fn string_seek_and_tell() {
		let mut s = StringStream::from_text(TEXT);
		assert_eq!(s.tell().unwrap(), 0);
		s.read(Some(5)).unwrap();
		s.seek(SeekFrom::Start(0)).unwrap();
		assert_eq!(s.read(None).unwrap(), text(TEXT));

		assert_eq!(s.seek(SeekFrom::Start(5)).unwrap(), 5);
		assert_eq!(s.read(None).unwrap(), text("\u{e9}789\u{1f600}"));
		assert_eq!(s.seek(SeekFrom::End(-1)).unwrap(), 9);

		s.seek(SeekFrom::Start(10000)).unwrap();
		assert_eq!(s.tell().unwrap(), 10000);
		assert_eq!(s.read(Some(1)).unwrap(), Chunk::Eof);
		assert!(matches!(s.seek(SeekFrom::Current(-10001)), Err(Error::InvalidSeek(-1))));
	}

	#[test]
	fn string_write_and_truncate() {
		let mut s = StringStream::new();
		assert_eq!(s.write("h\u{e9}llo").unwrap(), 5);
		s.seek(SeekFrom::End(2)).unwrap();
		assert_eq!(s.write("!").unwrap(), 1);
		assert_eq!(s.value(), "h\u{e9}llo\0\0!");
		s.seek(SeekFrom::Start(1)).unwrap();
		assert_eq!(s.write("a").unwrap(), 1);
		assert_eq!(s.truncate(None).unwrap(), 2);
		assert_eq!(s.value(), "ha");

		s.seek(SeekFrom::Start(u64::MAX)).unwrap();
		assert!(matches!(s.write("x"), Err(Error::InvalidSeek(_))));
	}

	#[test]
	fn string_readline() {
		let mut s = StringStream::from_text("one\ntwo\n\nend");
		assert_eq!(s.readline().unwrap(), text("one\n"));
		assert_eq!(s.readline().unwrap(), text("two\n"));
		assert_eq!(s.readline().unwrap(), text("\n"));
		assert_eq!(s.readline().unwrap(), text("end"));
		assert_eq!(s.readline().unwrap(), Chunk::Eof);
	}

	#[test]
	fn string_closed() {
		let mut s = StringStream::from_text(TEXT);
		s.close();
		assert!(s.closed());
		assert!(matches!(s.read(None), Err(Error::Closed)));
		assert!(matches!(s.write("x"), Err(Error::Closed)));
		assert!(matches!(s.tell(), Err(Error::Closed)));
	}
}
