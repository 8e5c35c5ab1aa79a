use std::cmp::min;
use std::io::{self, SeekFrom};

use super::{resolve_seek, Chunk, RawStream};
use crate::error::{Error, Result};

/// An in-memory raw stream backed by a growable byte buffer.
///
/// A `MemoryStream` is always ready: reads past the end produce
/// [`Chunk::Eof`] and never [`Chunk::WouldBlock`], and writes accept every
/// byte. The position may be moved past the end of the data; the next write
/// there fills the gap with zero bytes.
#[derive(Debug, Default, Clone)]
pub struct MemoryStream {
	buf: Vec<u8>,
	pos: u64,
	closed: bool,
}

impl MemoryStream {
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a stream holding `data`, positioned at the start.
	pub fn from_bytes<B>(data: B) -> Self
	where
		B: Into<Vec<u8>>,
	{
		Self {
			buf: data.into(),
			pos: 0,
			closed: false,
		}
	}

	/// Returns the full contents of the stream, independent of its position.
	pub fn value(&self) -> &[u8] {
		&self.buf
	}

	pub fn into_inner(self) -> Vec<u8> {
		self.buf
	}

	fn check_open(&self) -> Result<()> {
		match self.closed {
			true => Err(Error::Closed),
			false => Ok(()),
		}
	}

	/// Returns the position as an index into the buffer, saturated to the
	/// buffer's length for positions past the end.
	fn offset(&self) -> usize {
		usize::try_from(self.pos).map_or(self.buf.len(), |pos| min(pos, self.buf.len()))
	}
}

impl RawStream for MemoryStream {
	fn readinto(&mut self, buf: &mut [u8]) -> Result<Chunk<usize>> {
		self.check_open()?;
		if buf.is_empty() {
			return Ok(Chunk::Data(0));
		}

		let start = self.offset();
		let unread = &self.buf[start..];
		if unread.is_empty() {
			return Ok(Chunk::Eof);
		}

		let n = min(unread.len(), buf.len());
		buf[..n].copy_from_slice(&unread[..n]);
		self.pos += n as u64;
		Ok(Chunk::Data(n))
	}

	fn write(&mut self, buf: &[u8]) -> Result<usize> {
		self.check_open()?;
		if buf.is_empty() {
			return Ok(0);
		}

		let unaddressable = || Error::InvalidSeek(i128::from(self.pos));
		let start = usize::try_from(self.pos).map_err(|_| unaddressable())?;
		let end = start.checked_add(buf.len()).ok_or_else(unaddressable)?;
		if end > self.buf.len() {
			self.buf
				.try_reserve(end - self.buf.len())
				.map_err(|err| io::Error::new(io::ErrorKind::OutOfMemory, err))?;
			self.buf.resize(end, 0);
		}
		self.buf[start..end].copy_from_slice(buf);
		self.pos = end as u64;
		Ok(buf.len())
	}

	fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
		self.check_open()?;
		self.pos = resolve_seek(pos, self.pos, self.buf.len() as u64)?;
		Ok(self.pos)
	}

	fn close(&mut self) -> Result<()> {
		self.closed = true;
		Ok(())
	}

	fn closed(&self) -> bool {
		self.closed
	}

	fn readable(&self) -> bool {
		true
	}

	fn writable(&self) -> bool {
		true
	}

	fn seekable(&self) -> bool {
		true
	}

	fn tell(&mut self) -> Result<u64> {
		self.check_open()?;
		Ok(self.pos)
	}

	fn truncate(&mut self, size: Option<u64>) -> Result<u64> {
		self.check_open()?;
		let size = size.unwrap_or(self.pos);
		if let Ok(size) = usize::try_from(size) {
			self.buf.truncate(size);
		}
		Ok(self.buf.len() as u64)
	}
}
