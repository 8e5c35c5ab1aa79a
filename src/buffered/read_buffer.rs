use std::cmp::min;
use std::io::SeekFrom;

use tracing::trace;

use crate::error::{Error, Result};
use crate::raw::{Chunk, RawStream};

/// A fixed-capacity read-ahead buffer.
///
/// The backing array is divided into three contiguous sections: bytes already
/// consumed by the caller (`..pos`), bytes fetched but not yet consumed
/// (`pos..filled`), and free space (`filled..`). The buffer only refills once
/// it is fully consumed, and a refill replaces its entire contents.
///
/// The buffer does not own its raw stream; every operation that may perform
/// I/O borrows one, so that a single stream can sit under both a read buffer
/// and a write buffer.
pub(crate) struct ReadBuffer {
	buf: Box<[u8]>,
	pos: usize,
	filled: usize,
}

impl ReadBuffer {
	pub(crate) fn new(capacity: usize) -> Self {
		Self {
			buf: vec![0; capacity].into_boxed_slice(),
			pos: 0,
			filled: 0,
		}
	}

	pub(crate) fn capacity(&self) -> usize {
		self.buf.len()
	}

	/// Returns the fetched bytes the caller has not consumed yet.
	pub(crate) fn buffered(&self) -> &[u8] {
		&self.buf[self.pos..self.filled]
	}

	pub(crate) fn unconsumed(&self) -> usize {
		self.filled - self.pos
	}

	pub(crate) fn consume(&mut self, amt: usize) {
		self.pos = min(self.pos + amt, self.filled);
	}

	/// Forgets all buffered bytes without touching the raw stream.
	pub(crate) fn discard(&mut self) {
		self.pos = 0;
		self.filled = 0;
	}

	/// Copies as many unconsumed bytes as fit into `dst`, consuming them.
	fn copy_out(&mut self, dst: &mut [u8]) -> usize {
		let n = min(self.unconsumed(), dst.len());
		dst[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
		self.pos += n;
		n
	}

	/// Replaces the (fully consumed) buffer with one raw read of its full
	/// capacity.
	fn refill<R>(&mut self, raw: &mut R) -> Result<Chunk<usize>>
	where
		R: RawStream,
	{
		debug_assert_eq!(self.unconsumed(), 0, "refilled a read buffer with unconsumed bytes");
		self.discard();
		let result = match raw.readinto(&mut self.buf)? {
			// A raw stream should never produce 0 bytes for a non-empty
			// buffer, but if one does, looping on it would never end.
			Chunk::Data(0) => Chunk::Eof,
			result => result,
		};
		if let Chunk::Data(n) = result {
			self.filled = n;
		}
		trace!(capacity = self.capacity(), ?result, "refilled read buffer");
		Ok(result)
	}

	/// Fills `dst` from the buffer, then from the raw stream until `dst` is
	/// full, the stream ends, or the stream would block.
	///
	/// Remainders no larger than the capacity are fetched through the buffer
	/// with full-capacity reads, keeping any excess for later calls. Larger
	/// remainders bypass the buffer and go straight into `dst`. Bytes already
	/// copied into `dst` are always reported, even if the raw stream then
	/// blocks.
	pub(crate) fn readinto<R>(&mut self, raw: &mut R, dst: &mut [u8]) -> Result<Chunk<usize>>
	where
		R: RawStream,
	{
		if dst.is_empty() {
			return Ok(Chunk::Data(0));
		}

		let mut copied = self.copy_out(dst);
		let mut blocked = false;
		while copied < dst.len() {
			let result = match dst.len() - copied {
				need if need > self.capacity() => match raw.readinto(&mut dst[copied..])? {
					Chunk::Data(0) => Chunk::Eof,
					result => result,
				},
				_ => self
					.refill(raw)?
					.map(|_| self.copy_out(&mut dst[copied..])),
			};
			match result {
				Chunk::Data(n) => copied += n,
				Chunk::WouldBlock => {
					blocked = true;
					break;
				}
				Chunk::Eof => break,
			}
		}

		Ok(match (copied, blocked) {
			(0, true) => Chunk::WouldBlock,
			(0, false) => Chunk::Eof,
			(n, _) => Chunk::Data(n),
		})
	}

	/// Reads everything left in the buffer and the raw stream, refilling with
	/// full-capacity reads until the stream ends or would block.
	pub(crate) fn read_to_end<R>(&mut self, raw: &mut R) -> Result<Chunk<Vec<u8>>>
	where
		R: RawStream,
	{
		let mut out = self.buffered().to_vec();
		self.discard();

		let mut blocked = false;
		loop {
			match self.refill(raw)? {
				Chunk::Data(_) => {
					out.extend_from_slice(self.buffered());
					self.discard();
				}
				Chunk::WouldBlock => {
					blocked = true;
					break;
				}
				Chunk::Eof => break,
			}
		}

		Ok(match (out.is_empty(), blocked) {
			(true, true) => Chunk::WouldBlock,
			(true, false) => Chunk::Eof,
			(false, _) => Chunk::Data(out),
		})
	}

	/// Returns the unconsumed bytes without consuming them, refilling once
	/// if the buffer is empty.
	pub(crate) fn peek<R>(&mut self, raw: &mut R) -> Result<Chunk<&[u8]>>
	where
		R: RawStream,
	{
		if self.unconsumed() == 0 {
			match self.refill(raw)? {
				Chunk::Data(_) => {}
				Chunk::WouldBlock => return Ok(Chunk::WouldBlock),
				Chunk::Eof => return Ok(Chunk::Eof),
			}
		}
		Ok(Chunk::Data(self.buffered()))
	}

	/// Returns the logical position: the raw position less the bytes fetched
	/// ahead of the caller.
	pub(crate) fn tell<R>(&self, raw: &mut R) -> Result<u64>
	where
		R: RawStream,
	{
		let raw_pos = raw.tell()?;
		raw_pos
			.checked_sub(self.unconsumed() as u64)
			.ok_or_else(|| Error::InvalidSeek(i128::from(raw_pos) - self.unconsumed() as i128))
	}

	/// Moves the logical position.
	///
	/// A target inside the span of bytes the buffer currently holds only
	/// moves the read cursor, without any raw I/O beyond asking the raw stream
	/// for its position. Any other target discards the buffer and seeks the
	/// raw stream.
	pub(crate) fn seek<R>(&mut self, raw: &mut R, pos: SeekFrom) -> Result<u64>
	where
		R: RawStream,
	{
		if !raw.seekable() {
			return Err(Error::Unsupported("seek"));
		}

		let target = match pos {
			SeekFrom::End(_) => {
				self.discard();
				return raw.seek(pos);
			}
			SeekFrom::Start(target) => i128::from(target),
			SeekFrom::Current(delta) => i128::from(self.tell(raw)?) + i128::from(delta),
		};
		let target = u64::try_from(target).map_err(|_| Error::InvalidSeek(target))?;

		if self.filled > 0 {
			let raw_pos = raw.tell()?;
			if let Some(start) = raw_pos.checked_sub(self.filled as u64) {
				if (start..=raw_pos).contains(&target) {
					// The difference is at most `filled`, so it fits.
					self.pos = usize::try_from(target - start).unwrap_or(self.filled);
					return Ok(target);
				}
			}
		}

		self.discard();
		raw.seek(SeekFrom::Start(target))
	}

	/// Moves the raw stream back over any unconsumed bytes and discards them,
	/// so that the raw position equals the logical position.
	pub(crate) fn rewind_raw<R>(&mut self, raw: &mut R) -> Result<()>
	where
		R: RawStream,
	{
		let unconsumed = self.unconsumed();
		if unconsumed > 0 {
			let delta = i64::try_from(unconsumed).map_err(|_| Error::InvalidSeek(-(unconsumed as i128)))?;
			raw.seek(SeekFrom::Current(-delta))?;
		}
		self.discard();
		Ok(())
	}
}
