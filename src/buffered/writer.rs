use std::io::{self, SeekFrom, Write};

use tracing::debug;

use super::{BufferOptions, WriteBuffer};
use crate::error::{Error, Result};
use crate::raw::RawStream;

/// Wraps a raw stream and coalesces small writes into larger raw writes.
///
/// Writes are held in a buffer until it would overflow or the caller
/// flushes. When the raw stream is non-blocking and not ready, unwritten bytes
/// stay buffered for a later flush rather than being dropped; see
/// [`write`](Self::write) for how far the buffer may grow in that case.
///
/// A writer that is dropped without being closed makes a best-effort attempt
/// to flush, ignoring any error. Call [`close`](Self::close) or
/// [`flush`](Self::flush) to observe flush errors.
pub struct BufferedWriter<R>
where
	R: RawStream,
{
	raw: R,
	buf: WriteBuffer,
}

impl<R> BufferedWriter<R>
where
	R: RawStream,
{
	/// Creates a writer with the default buffer sizes.
	pub fn new(raw: R) -> Self {
		let options = BufferOptions::default();
		Self {
			raw,
			buf: WriteBuffer::new(options.buffer_size, options.resolved_max_buffer_size()),
		}
	}

	pub fn with_options(raw: R, options: BufferOptions) -> Result<Self> {
		options.validate()?;
		Ok(Self {
			raw,
			buf: WriteBuffer::new(options.buffer_size, options.resolved_max_buffer_size()),
		})
	}

	/// Buffers `data`, returning the number of bytes accepted.
	///
	/// If `data` does not fit beside the bytes already buffered, those are
	/// flushed first; if `data` alone exceeds the buffer size, it is written
	/// straight through. Should the raw stream block during either step, the
	/// writer keeps as many bytes as its maximum buffer size allows. If that is
	/// all of `data` the call succeeds; otherwise it fails with
	/// [`Error::WouldBlock`], whose count says how much of `data` was kept.
	pub fn write(&mut self, data: &[u8]) -> Result<usize> {
		self.check_writable()?;
		self.buf.write(&mut self.raw, data)
	}

	/// Writes every buffered byte to the raw stream.
	///
	/// If the raw stream would block, the unwritten bytes stay buffered and
	/// the error reports how many bytes this call wrote.
	pub fn flush(&mut self) -> Result<()> {
		self.check_writable()?;
		self.buf.flush(&mut self.raw)
	}

	/// Returns the logical position: the raw position plus buffered bytes.
	pub fn tell(&mut self) -> Result<u64> {
		self.check_open()?;
		self.buf.tell(&mut self.raw)
	}

	/// Flushes, then seeks the raw stream.
	pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
		self.check_open()?;
		if !self.raw.seekable() {
			return Err(Error::Unsupported("seek"));
		}
		self.buf.flush(&mut self.raw)?;
		self.raw.seek(pos)
	}

	/// Flushes, then cuts the raw stream at `size` (or the current position).
	pub fn truncate(&mut self, size: Option<u64>) -> Result<u64> {
		self.flush()?;
		self.raw.truncate(size)
	}

	/// Flushes buffered bytes, then closes the raw stream.
	///
	/// The raw stream is closed even if the flush fails, in which case the
	/// flush error is returned. Closing an already closed writer does nothing.
	pub fn close(&mut self) -> Result<()> {
		if self.raw.closed() {
			return Ok(());
		}
		let flushed = self.buf.flush(&mut self.raw);
		if let Err(err) = &flushed {
			debug!(%err, pending = self.buf.pending(), "flush before close failed");
		}
		let closed = self.raw.close();
		flushed.and(closed)
	}

	pub fn closed(&self) -> bool {
		self.raw.closed()
	}

	pub fn writable(&self) -> bool {
		self.raw.writable()
	}

	pub fn seekable(&self) -> bool {
		self.raw.seekable()
	}

	pub fn fileno(&self) -> Result<i32> {
		self.raw.fileno()
	}

	/// Returns the number of bytes waiting to be flushed.
	pub fn pending(&self) -> usize {
		self.buf.pending()
	}

	pub fn get_ref(&self) -> &R {
		&self.raw
	}

	fn check_open(&self) -> Result<()> {
		match self.raw.closed() {
			true => Err(Error::Closed),
			false => Ok(()),
		}
	}

	fn check_writable(&self) -> Result<()> {
		self.check_open()?;
		match self.raw.writable() {
			true => Ok(()),
			false => Err(Error::Unsupported("write")),
		}
	}
}

impl<R> Write for BufferedWriter<R>
where
	R: RawStream,
{
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		match BufferedWriter::write(self, buf) {
			// Partial acceptance is a short write in std terms.
			Err(Error::WouldBlock { written }) if written > 0 => Ok(written),
			result => Ok(result?),
		}
	}

	fn flush(&mut self) -> io::Result<()> {
		Ok(BufferedWriter::flush(self)?)
	}
}

impl<R> Drop for BufferedWriter<R>
where
	R: RawStream,
{
	fn drop(&mut self) {
		if !self.raw.closed() && self.buf.pending() > 0 {
			let _ = self.buf.flush(&mut self.raw);
		}
	}
}

#[cfg(test)]
mod tests {
	use std::io::SeekFrom;

	use super::BufferedWriter;
	use crate::buffered::mock::{BlockingWriter, ScriptedStream, Step};
	use crate::{BufferOptions, Error, MemoryStream, RawStream};

	fn options(buffer_size: usize, max_buffer_size: usize) -> BufferOptions {
		BufferOptions::new()
			.with_buffer_size(buffer_size)
			.with_max_buffer_size(max_buffer_size)
	}

	#[test]
	fn buffered_write_is_held() {
		let raw = ScriptedStream::chunks(&[]);
		let writes = raw.writes();
		let mut w = BufferedWriter::with_options(raw, options(8, 16)).unwrap();

		w.write(b"abc").unwrap();
		assert!(writes.borrow().is_empty());
		assert_eq!(w.pending(), 3);
	}

	#[test]
	fn buffered_write_overflow_forwards_everything() {
		let raw = ScriptedStream::chunks(&[]);
		let writes = raw.writes();
		let mut w = BufferedWriter::with_options(raw, options(8, 16)).unwrap();

		w.write(b"abc").unwrap();
		w.write(b"defghijkl").unwrap();
		assert_eq!(writes.borrow().concat(), b"abcdefghijkl");
	}

	#[test]
	fn buffered_flush() {
		let raw = ScriptedStream::chunks(&[]);
		let writes = raw.writes();
		let mut w = BufferedWriter::with_options(raw, options(8, 16)).unwrap();

		w.write(b"abc").unwrap();
		w.flush().unwrap();
		assert_eq!(*writes.borrow(), [b"abc".to_vec()]);
		assert_eq!(w.tell().unwrap(), 42);
		assert_eq!(w.fileno().unwrap(), 42);
	}

	#[test]
	fn buffered_write_nonblocking() {
		let raw = BlockingWriter::new(&[
			Step::Accept(9),
			Step::Accept(2),
			Step::Accept(22),
			Step::Block(6),
			Step::Accept(10),
			Step::Accept(12),
			Step::Accept(12),
		]);
		let accepted = raw.accepted();
		let mut w = BufferedWriter::with_options(raw, options(8, 16)).unwrap();

		let mut expected = Vec::new();
		for chunk in [
			b"asdf".as_slice(),
			b"asdfa".as_slice(),
			b"asdfasdfasdf".as_slice(),
			b"asdfasdfasdf".as_slice(),
			b"asdfasdfasdf".as_slice(),
		] {
			assert_eq!(w.write(chunk).unwrap(), chunk.len());
			expected.extend_from_slice(chunk);
		}
		w.flush().unwrap();
		assert_eq!(*accepted.borrow(), expected);
	}

	#[test]
	fn buffered_write_reports_partial_acceptance() {
		let raw = BlockingWriter::new(&[Step::Block(0), Step::Block(0)]);
		let accepted = raw.accepted();
		let mut w = BufferedWriter::with_options(raw, options(4, 6)).unwrap();

		assert_eq!(w.write(b"ab").unwrap(), 2);
		assert!(matches!(w.write(b"cdefgh"), Err(Error::WouldBlock { written: 4 })));
		assert_eq!(w.pending(), 6);
		assert!(matches!(w.flush(), Err(Error::WouldBlock { written: 0 })));

		w.flush().unwrap();
		assert_eq!(*accepted.borrow(), b"abcdef");
	}

	#[test]
	fn buffered_close_flushes_then_closes() {
		let raw = ScriptedStream::chunks(&[]);
		let writes = raw.writes();
		let mut w = BufferedWriter::new(raw);
		w.write(b"tail").unwrap();
		w.close().unwrap();
		assert!(w.closed());
		assert_eq!(*writes.borrow(), [b"tail".to_vec()]);
		assert!(matches!(w.write(b"x"), Err(Error::Closed)));
		w.close().unwrap();
	}

	#[test]
	fn buffered_close_reports_flush_failure() {
		let raw = BlockingWriter::new(&[Step::Block(1)]);
		let accepted = raw.accepted();
		let mut w = BufferedWriter::new(raw);
		w.write(b"xyz").unwrap();
		assert!(matches!(w.close(), Err(Error::WouldBlock { written: 1 })));
		assert_eq!(*accepted.borrow(), b"x");
	}

	#[test]
	fn buffered_seek_and_truncate_flush_first() {
		let mut w = BufferedWriter::new(MemoryStream::new());
		w.write(b"hello world").unwrap();
		assert_eq!(w.tell().unwrap(), 11);
		assert_eq!(w.seek(SeekFrom::Start(5)).unwrap(), 5);
		assert_eq!(w.get_ref().value(), b"hello world");
		w.write(b"!").unwrap();
		assert_eq!(w.truncate(None).unwrap(), 6);
		assert_eq!(w.get_ref().value(), b"hello!");
	}

	#[test]
	fn buffered_drop_flushes() {
		let raw = ScriptedStream::chunks(&[]);
		let writes = raw.writes();
		{
			let mut w = BufferedWriter::new(raw);
			w.write(b"dropped").unwrap();
		}
		assert_eq!(*writes.borrow(), [b"dropped".to_vec()]);
	}

	#[test]
	fn buffered_write_after_raw_closed() {
		let mut raw = MemoryStream::new();
		raw.close().unwrap();
		let mut w = BufferedWriter::new(raw);
		assert!(matches!(w.write(b"x"), Err(Error::Closed)));
	}
}
