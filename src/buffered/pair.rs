use super::{BufferOptions, BufferedReader, BufferedWriter};
use crate::error::Result;
use crate::raw::{Chunk, RawStream};

/// Joins a readable stream and a writable stream into one duplex stream, as
/// for the two ends of a socket or a pair of pipes.
///
/// The two sides are buffered independently and never interact, so unlike
/// [`BufferedRandom`](super::BufferedRandom) neither side needs to be
/// seekable.
pub struct BufferedRwPair<R, W>
where
	W: RawStream,
{
	reader: BufferedReader<R>,
	writer: BufferedWriter<W>,
}

impl<R, W> BufferedRwPair<R, W>
where
	R: RawStream,
	W: RawStream,
{
	pub fn new(reader: R, writer: W) -> Self {
		Self {
			reader: BufferedReader::new(reader),
			writer: BufferedWriter::new(writer),
		}
	}

	/// Buffers both sides with the same options.
	pub fn with_options(reader: R, writer: W, options: BufferOptions) -> Result<Self> {
		Ok(Self {
			reader: BufferedReader::with_options(reader, options)?,
			writer: BufferedWriter::with_options(writer, options)?,
		})
	}

	pub fn read(&mut self, n: Option<usize>) -> Result<Chunk<Vec<u8>>> {
		self.reader.read(n)
	}

	pub fn readinto(&mut self, buf: &mut [u8]) -> Result<Chunk<usize>> {
		self.reader.readinto(buf)
	}

	pub fn peek(&mut self) -> Result<Chunk<&[u8]>> {
		self.reader.peek()
	}

	pub fn write(&mut self, data: &[u8]) -> Result<usize> {
		self.writer.write(data)
	}

	pub fn flush(&mut self) -> Result<()> {
		self.writer.flush()
	}

	/// Closes the writing side, flushing it, then the reading side. Both are
	/// closed even if the first fails; the first error is returned.
	pub fn close(&mut self) -> Result<()> {
		let written = self.writer.close();
		let read = self.reader.close();
		written.and(read)
	}

	/// Returns true once the writing side is closed.
	pub fn closed(&self) -> bool {
		self.writer.closed()
	}

	pub fn readable(&self) -> bool {
		self.reader.readable()
	}

	pub fn writable(&self) -> bool {
		self.writer.writable()
	}

	pub fn reader(&self) -> &R {
		self.reader.get_ref()
	}

	pub fn writer(&self) -> &W {
		self.writer.get_ref()
	}
}
