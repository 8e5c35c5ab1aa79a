use std::io::{self, BufRead, Read, SeekFrom};

use super::{BufferOptions, ReadBuffer};
use crate::error::{Error, Result};
use crate::raw::{Chunk, RawStream};

/// Wraps a raw stream and serves reads from a read-ahead buffer.
///
/// Small reads are satisfied from the buffer without raw I/O whenever it
/// holds enough bytes. When it runs dry, it is refilled by a single raw read
/// of its full capacity, so the sequence of raw reads depends only on the
/// buffer size and the sizes requested.
///
/// ```
/// use layered_io::{BufferedReader, Chunk, MemoryStream};
///
/// let mut reader = BufferedReader::new(MemoryStream::from_bytes(&b"abcdefg"[..]));
/// assert_eq!(reader.read(Some(3)).unwrap(), Chunk::Data(b"abc".to_vec()));
/// assert_eq!(reader.read(None).unwrap(), Chunk::Data(b"defg".to_vec()));
/// assert_eq!(reader.read(None).unwrap(), Chunk::Eof);
/// ```
pub struct BufferedReader<R> {
	raw: R,
	buf: ReadBuffer,
}

impl<R> BufferedReader<R>
where
	R: RawStream,
{
	/// Creates a reader with the default buffer size.
	pub fn new(raw: R) -> Self {
		Self {
			raw,
			buf: ReadBuffer::new(super::DEFAULT_BUFFER_SIZE),
		}
	}

	pub fn with_options(raw: R, options: BufferOptions) -> Result<Self> {
		options.validate()?;
		Ok(Self {
			raw,
			buf: ReadBuffer::new(options.buffer_size),
		})
	}

	/// Reads up to `n` bytes, or everything up to the end of the stream when
	/// `n` is `None`.
	///
	/// A bounded read keeps reading until it has `n` bytes or the stream
	/// ends. Either kind of read returns whatever it has collected if the raw
	/// stream would block part way through; only a read that collected
	/// nothing reports [`Chunk::WouldBlock`].
	pub fn read(&mut self, n: Option<usize>) -> Result<Chunk<Vec<u8>>> {
		self.check_readable()?;
		match n {
			None => self.buf.read_to_end(&mut self.raw),
			Some(n) => {
				let mut out = vec![0; n];
				Ok(self.buf.readinto(&mut self.raw, &mut out)?.map(|len| {
					out.truncate(len);
					out
				}))
			}
		}
	}

	/// Reads into `buf` exactly as [`read`](Self::read) would for
	/// `buf.len()` bytes, returning the count read.
	pub fn readinto(&mut self, buf: &mut [u8]) -> Result<Chunk<usize>> {
		self.check_readable()?;
		self.buf.readinto(&mut self.raw, buf)
	}

	/// Returns the buffered bytes without consuming them, refilling the
	/// buffer first if it is empty.
	pub fn peek(&mut self) -> Result<Chunk<&[u8]>> {
		self.check_readable()?;
		self.buf.peek(&mut self.raw)
	}

	pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
		self.check_open()?;
		self.buf.seek(&mut self.raw, pos)
	}

	/// Returns the logical position, which lags the raw stream's position by
	/// the number of buffered bytes.
	pub fn tell(&mut self) -> Result<u64> {
		self.check_open()?;
		self.buf.tell(&mut self.raw)
	}

	/// Closes the raw stream, unless it is already closed.
	pub fn close(&mut self) -> Result<()> {
		if self.raw.closed() {
			return Ok(());
		}
		self.buf.discard();
		self.raw.close()
	}

	pub fn closed(&self) -> bool {
		self.raw.closed()
	}

	pub fn readable(&self) -> bool {
		self.raw.readable()
	}

	pub fn seekable(&self) -> bool {
		self.raw.seekable()
	}

	pub fn fileno(&self) -> Result<i32> {
		self.raw.fileno()
	}

	/// Gets a reference to the raw stream.
	///
	/// There is no mutable counterpart, as moving the raw stream behind the
	/// buffer's back would corrupt the logical position.
	pub fn get_ref(&self) -> &R {
		&self.raw
	}

	/// Unwraps the raw stream. Any buffered bytes are lost.
	pub fn into_inner(self) -> R {
		self.raw
	}

	fn check_open(&self) -> Result<()> {
		match self.raw.closed() {
			true => Err(Error::Closed),
			false => Ok(()),
		}
	}

	fn check_readable(&self) -> Result<()> {
		self.check_open()?;
		match self.raw.readable() {
			true => Ok(()),
			false => Err(Error::Unsupported("read")),
		}
	}
}

impl<R> Read for BufferedReader<R>
where
	R: RawStream,
{
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		match self.readinto(buf)? {
			Chunk::Data(n) => Ok(n),
			Chunk::Eof => Ok(0),
			Chunk::WouldBlock => Err(io::ErrorKind::WouldBlock.into()),
		}
	}
}

impl<R> BufRead for BufferedReader<R>
where
	R: RawStream,
{
	fn fill_buf(&mut self) -> io::Result<&[u8]> {
		match self.peek()? {
			Chunk::Data(b) => Ok(b),
			Chunk::Eof => Ok(&[]),
			Chunk::WouldBlock => Err(io::ErrorKind::WouldBlock.into()),
		}
	}

	fn consume(&mut self, amt: usize) {
		self.buf.consume(amt);
	}
}
