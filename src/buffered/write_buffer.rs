use std::cmp::min;
use std::io;

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::raw::RawStream;

/// A bounded buffer of bytes written by the caller but not yet accepted by
/// the raw stream.
///
/// The buffer normally holds at most `capacity` bytes. While the raw stream
/// keeps blocking it may grow up to `max_buffer_size`, past which writes are
/// only partially accepted.
pub(crate) struct WriteBuffer {
	buf: Vec<u8>,
	capacity: usize,
	max_buffer_size: usize,
}

impl WriteBuffer {
	pub(crate) fn new(capacity: usize, max_buffer_size: usize) -> Self {
		Self {
			buf: Vec::with_capacity(capacity),
			capacity,
			max_buffer_size,
		}
	}

	pub(crate) fn pending(&self) -> usize {
		self.buf.len()
	}

	/// Writes the pending bytes until the raw stream has accepted all of
	/// them.
	///
	/// Each raw write removes exactly the prefix the stream accepted, and a
	/// short write is retried with the remainder. If the stream would block,
	/// the remainder stays pending and the error reports how many bytes this
	/// call managed to write.
	pub(crate) fn flush<R>(&mut self, raw: &mut R) -> Result<()>
	where
		R: RawStream,
	{
		let mut written = 0;
		while !self.buf.is_empty() {
			match raw.write(&self.buf) {
				Ok(0) => {
					return Err(Error::Io(io::Error::new(
						io::ErrorKind::WriteZero,
						"raw stream accepted no buffered bytes",
					)));
				}
				Ok(n) => {
					let n = min(n, self.buf.len());
					trace!(offered = self.buf.len(), accepted = n, "flushed write buffer");
					self.buf.drain(..n);
					written += n;
				}
				Err(Error::WouldBlock { written: n }) => {
					let n = min(n, self.buf.len());
					self.buf.drain(..n);
					written += n;
					debug!(written, pending = self.buf.len(), "write buffer flush would block");
					return Err(Error::WouldBlock { written });
				}
				Err(err) => return Err(err),
			}
		}
		Ok(())
	}

	/// Buffers `data`, flushing to the raw stream when the buffer would
	/// overflow.
	///
	/// If `data` does not fit beside the pending bytes, those are flushed
	/// first. `data` is then buffered, and if it alone exceeds the capacity it
	/// is written straight through. When the raw stream would block, as much
	/// of `data` is kept as `max_buffer_size` allows: a call that retains every
	/// byte succeeds, while one that cannot fails with
	/// [`Error::WouldBlock`] counting the bytes of `data` that were accepted.
	///
	/// Any other raw error is returned with `data` still pending.
	pub(crate) fn write<R>(&mut self, raw: &mut R, data: &[u8]) -> Result<usize>
	where
		R: RawStream,
	{
		if data.is_empty() {
			return Ok(0);
		}

		if !self.buf.is_empty() && self.buf.len() + data.len() > self.capacity {
			match self.flush(raw) {
				Ok(()) => {}
				Err(Error::WouldBlock { .. }) => return self.accept_blocked(data),
				Err(err) => return Err(err),
			}
		}

		self.buf.extend_from_slice(data);
		if self.buf.len() > self.capacity {
			match self.flush(raw) {
				Ok(()) => {}
				Err(Error::WouldBlock { .. }) if self.buf.len() > self.max_buffer_size => {
					// Everything pending came from `data`, as the buffer was
					// empty before it was appended.
					let overage = self.buf.len() - self.max_buffer_size;
					self.buf.truncate(self.max_buffer_size);
					return Err(Error::WouldBlock {
						written: data.len() - overage,
					});
				}
				Err(Error::WouldBlock { .. }) => {}
				Err(err) => return Err(err),
			}
		}
		Ok(data.len())
	}

	/// Keeps as much of `data` as fits under `max_buffer_size` after a flush
	/// blocked.
	fn accept_blocked(&mut self, data: &[u8]) -> Result<usize> {
		let room = self.max_buffer_size.saturating_sub(self.buf.len());
		let take = min(room, data.len());
		self.buf.extend_from_slice(&data[..take]);
		match take == data.len() {
			true => Ok(take),
			false => Err(Error::WouldBlock { written: take }),
		}
	}

	/// Returns the logical position: the raw position plus the pending bytes.
	pub(crate) fn tell<R>(&self, raw: &mut R) -> Result<u64>
	where
		R: RawStream,
	{
		Ok(raw.tell()? + self.buf.len() as u64)
	}
}
