//! Scripted raw streams for exercising the buffered layers.

use std::cell::RefCell;
use std::cmp::min;
use std::collections::VecDeque;
use std::io::SeekFrom;
use std::rc::Rc;

use crate::{Chunk, Error, MemoryStream, RawStream, Result};

/// A shared record of what a mock stream saw, kept readable after the mock
/// itself moves into a buffered wrapper.
pub(crate) type Log<T> = Rc<RefCell<Vec<T>>>;

/// A raw stream that produces a fixed script of reads and records writes.
///
/// Each read pops the next script entry: `Some(bytes)` produces those bytes
/// (the remainder stays queued if the caller's buffer is smaller), and `None`
/// reports would-block. An exhausted script reads as end of file. Seeking is
/// accepted and ignored, and the position is always 42.
pub(crate) struct ScriptedStream {
	reads: VecDeque<Option<Vec<u8>>>,
	writes: Log<Vec<u8>>,
	closed: bool,
}

impl ScriptedStream {
	pub(crate) fn new<I>(reads: I) -> Self
	where
		I: IntoIterator<Item = Option<&'static [u8]>>,
	{
		Self {
			reads: reads.into_iter().map(|r| r.map(<[u8]>::to_vec)).collect(),
			writes: Log::default(),
			closed: false,
		}
	}

	/// Builds a script with no would-block entries.
	pub(crate) fn chunks(chunks: &[&'static [u8]]) -> Self {
		Self::new(chunks.iter().copied().map(Some))
	}

	pub(crate) fn writes(&self) -> Log<Vec<u8>> {
		Rc::clone(&self.writes)
	}
}

impl RawStream for ScriptedStream {
	fn readinto(&mut self, buf: &mut [u8]) -> Result<Chunk<usize>> {
		match self.reads.pop_front() {
			None => Ok(Chunk::Eof),
			Some(None) => Ok(Chunk::WouldBlock),
			Some(Some(mut data)) => {
				let n = min(data.len(), buf.len());
				buf[..n].copy_from_slice(&data[..n]);
				if n < data.len() {
					self.reads.push_front(Some(data.split_off(n)));
				}
				Ok(Chunk::Data(n))
			}
		}
	}

	fn write(&mut self, buf: &[u8]) -> Result<usize> {
		self.writes.borrow_mut().push(buf.to_vec());
		Ok(buf.len())
	}

	fn seek(&mut self, _: SeekFrom) -> Result<u64> {
		Ok(42)
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

	fn fileno(&self) -> Result<i32> {
		Ok(42)
	}
}

/// A memory stream that records the size of every raw read it serves, with
/// 0 standing for end of file.
pub(crate) struct RecordingStream {
	inner: MemoryStream,
	reads: Log<usize>,
}

impl RecordingStream {
	pub(crate) fn new(data: &[u8]) -> Self {
		Self {
			inner: MemoryStream::from_bytes(data),
			reads: Log::default(),
		}
	}

	pub(crate) fn reads(&self) -> Log<usize> {
		Rc::clone(&self.reads)
	}
}

impl RawStream for RecordingStream {
	fn readinto(&mut self, buf: &mut [u8]) -> Result<Chunk<usize>> {
		let result = self.inner.readinto(buf)?;
		self.reads.borrow_mut().push(match result {
			Chunk::Data(n) => n,
			_ => 0,
		});
		Ok(result)
	}

	fn write(&mut self, buf: &[u8]) -> Result<usize> {
		self.inner.write(buf)
	}

	fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
		self.inner.seek(pos)
	}

	fn close(&mut self) -> Result<()> {
		self.inner.close()
	}

	fn closed(&self) -> bool {
		self.inner.closed()
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

	fn truncate(&mut self, size: Option<u64>) -> Result<u64> {
		self.inner.truncate(size)
	}
}

/// One scripted response of a [`BlockingWriter`].
#[derive(Debug, Clone, Copy)]
pub(crate) enum Step {
	/// Accept up to this many of the offered bytes.
	Accept(usize),
	/// Accept up to this many of the offered bytes, then report would-block.
	Block(usize),
}

/// A write-only stream whose acceptance of each write follows a script.
///
/// Every write attempt is recorded in full, whatever was accepted. Once the
/// script runs out, every write is accepted in full.
pub(crate) struct BlockingWriter {
	script: VecDeque<Step>,
	attempts: Log<Vec<u8>>,
	accepted: Log<u8>,
}

impl BlockingWriter {
	pub(crate) fn new(script: &[Step]) -> Self {
		Self {
			script: script.iter().copied().collect(),
			attempts: Log::default(),
			accepted: Log::default(),
		}
	}

	pub(crate) fn attempts(&self) -> Log<Vec<u8>> {
		Rc::clone(&self.attempts)
	}

	/// Returns the concatenation of every byte the stream accepted.
	pub(crate) fn accepted(&self) -> Log<u8> {
		Rc::clone(&self.accepted)
	}
}

impl RawStream for BlockingWriter {
	fn readinto(&mut self, _: &mut [u8]) -> Result<Chunk<usize>> {
		Err(Error::Unsupported("read"))
	}

	fn write(&mut self, buf: &[u8]) -> Result<usize> {
		self.attempts.borrow_mut().push(buf.to_vec());
		let step = self.script.pop_front().unwrap_or(Step::Accept(usize::MAX));
		let (Step::Accept(n) | Step::Block(n)) = step;
		let n = min(n, buf.len());
		self.accepted.borrow_mut().extend_from_slice(&buf[..n]);
		match step {
			Step::Accept(_) => Ok(n),
			Step::Block(_) => Err(Error::WouldBlock { written: n }),
		}
	}

	fn seek(&mut self, _: SeekFrom) -> Result<u64> {
		Err(Error::Unsupported("seek"))
	}

	fn close(&mut self) -> Result<()> {
		Ok(())
	}

	fn closed(&self) -> bool {
		false
	}

	fn readable(&self) -> bool {
		false
	}

	fn writable(&self) -> bool {
		true
	}

	fn seekable(&self) -> bool {
		false
	}
}
