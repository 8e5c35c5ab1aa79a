//! Unbuffered byte streams.

use std::io::SeekFrom;

use crate::error::{Error, Result};

mod file;
mod memory;

pub use file::{FileStream, Mode};
pub use memory::MemoryStream;

/// The outcome of a read that may legitimately produce nothing.
///
/// A non-blocking source can be temporarily empty or permanently exhausted,
/// and callers must handle those cases differently: `WouldBlock` means "try
/// again later", while `Eof` is definite. Keeping them as distinct variants
/// (rather than, say, `None` and an empty buffer) lets the compiler check that
/// every caller handles both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chunk<T> {
	/// The read produced some data. A bounded read of zero bytes produces an
	/// empty `Data`, never `Eof`.
	Data(T),
	/// The source is not ready and produced nothing.
	WouldBlock,
	/// The source is exhausted.
	Eof,
}

impl<T> Chunk<T> {
	pub fn map<U, F>(self, f: F) -> Chunk<U>
	where
		F: FnOnce(T) -> U,
	{
		match self {
			Chunk::Data(t) => Chunk::Data(f(t)),
			Chunk::WouldBlock => Chunk::WouldBlock,
			Chunk::Eof => Chunk::Eof,
		}
	}

	/// Returns the data, if any.
	pub fn data(self) -> Option<T> {
		match self {
			Chunk::Data(t) => Some(t),
			_ => None,
		}
	}

	pub fn is_would_block(&self) -> bool {
		matches!(self, Chunk::WouldBlock)
	}

	pub fn is_eof(&self) -> bool {
		matches!(self, Chunk::Eof)
	}
}

/// An unbuffered source and/or sink of bytes.
///
/// Every buffered layer in this crate depends only on this trait, so file
/// descriptors, in-memory buffers, and test doubles are interchangeable
/// beneath them. Implementations must fail every operation after
/// [`close`](RawStream::close) with [`Error::Closed`].
pub trait RawStream {
	/// Reads up to `buf.len()` bytes into `buf`.
	///
	/// Returns `Data(n)` with `n > 0` when bytes were read (or `Data(0)` for an
	/// empty `buf`), `WouldBlock` when a non-blocking source has nothing yet,
	/// and `Eof` at the end of the stream.
	fn readinto(&mut self, buf: &mut [u8]) -> Result<Chunk<usize>>;

	/// Writes bytes from `buf`, returning how many were accepted.
	///
	/// A short count is not an error; the caller is expected to retry with
	/// the remainder. A non-blocking sink that cannot accept anything right
	/// now returns [`Error::WouldBlock`].
	fn write(&mut self, buf: &[u8]) -> Result<usize>;

	/// Moves the stream position, returning the new absolute position.
	fn seek(&mut self, pos: SeekFrom) -> Result<u64>;

	/// Closes the stream. Closing an already closed stream does nothing.
	fn close(&mut self) -> Result<()>;

	fn closed(&self) -> bool;

	fn readable(&self) -> bool;

	fn writable(&self) -> bool;

	fn seekable(&self) -> bool;

	/// Reads up to `n` bytes, or until the end of the stream when `n` is
	/// `None`.
	///
	/// An unbounded read that has collected some bytes before the source
	/// reports `WouldBlock` returns those bytes.
	fn read(&mut self, n: Option<usize>) -> Result<Chunk<Vec<u8>>> {
		const CHUNK_SIZE: usize = 8 * 1024;

		if let Some(n) = n {
			let mut buf = vec![0; n];
			return Ok(self.readinto(&mut buf)?.map(|len| {
				buf.truncate(len);
				buf
			}));
		}

		let mut out = Vec::new();
		let mut buf = vec![0; CHUNK_SIZE];
		loop {
			match self.readinto(&mut buf)? {
				Chunk::Data(len) => out.extend_from_slice(&buf[..len]),
				Chunk::WouldBlock if out.is_empty() => return Ok(Chunk::WouldBlock),
				Chunk::Eof if out.is_empty() => return Ok(Chunk::Eof),
				Chunk::WouldBlock | Chunk::Eof => return Ok(Chunk::Data(out)),
			}
		}
	}

	/// Returns the current stream position.
	fn tell(&mut self) -> Result<u64> {
		self.seek(SeekFrom::Current(0))
	}

	/// Cuts the stream at `size`, or at the current position when `size` is
	/// `None`, returning the new size. The position is left unchanged.
	fn truncate(&mut self, size: Option<u64>) -> Result<u64> {
		let _ = size;
		Err(Error::Unsupported("truncate"))
	}

	/// Returns the underlying file descriptor, for streams that have one.
	fn fileno(&self) -> Result<i32> {
		Err(Error::Unsupported("fileno"))
	}
}

impl<S> RawStream for Box<S>
where
	S: RawStream + ?Sized,
{
	fn readinto(&mut self, buf: &mut [u8]) -> Result<Chunk<usize>> {
		(**self).readinto(buf)
	}

	fn write(&mut self, buf: &[u8]) -> Result<usize> {
		(**self).write(buf)
	}

	fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
		(**self).seek(pos)
	}

	fn close(&mut self) -> Result<()> {
		(**self).close()
	}

	fn closed(&self) -> bool {
		(**self).closed()
	}

	fn readable(&self) -> bool {
		(**self).readable()
	}

	fn writable(&self) -> bool {
		(**self).writable()
	}

	fn seekable(&self) -> bool {
		(**self).seekable()
	}

	fn read(&mut self, n: Option<usize>) -> Result<Chunk<Vec<u8>>> {
		(**self).read(n)
	}

	fn tell(&mut self) -> Result<u64> {
		(**self).tell()
	}

	fn truncate(&mut self, size: Option<u64>) -> Result<u64> {
		(**self).truncate(size)
	}

	fn fileno(&self) -> Result<i32> {
		(**self).fileno()
	}
}

/// Resolves a seek request against the current position and the stream
/// length, rejecting targets before the start of the stream.
pub(crate) fn resolve_seek(pos: SeekFrom, current: u64, end: u64) -> Result<u64> {
	let target = match pos {
		SeekFrom::Start(offset) => return Ok(offset),
		SeekFrom::Current(delta) => i128::from(current) + i128::from(delta),
		SeekFrom::End(delta) => i128::from(end) + i128::from(delta),
	};
	u64::try_from(target).map_err(|_| Error::InvalidSeek(target))
}
