use std::io::SeekFrom;

use tracing::debug;

use super::{BufferOptions, ReadBuffer, WriteBuffer};
use crate::error::{Error, Result};
use crate::raw::{Chunk, RawStream};

/// Buffers both reads and writes over a single seekable raw stream.
///
/// At most one of the two buffers is active at a time. Before any read, bytes
/// waiting in the write buffer are flushed, so the read starts from the
/// position those writes left behind. Before any write, bytes read ahead but
/// not consumed are discarded and the raw stream is moved back over them, so
/// the write lands at the caller's logical position rather than past the
/// read-ahead.
///
/// Like [`BufferedWriter`](super::BufferedWriter), a dropped `BufferedRandom`
/// makes a best-effort attempt to flush.
pub struct BufferedRandom<R>
where
	R: RawStream,
{
	raw: R,
	reader: ReadBuffer,
	writer: WriteBuffer,
}

impl<R> BufferedRandom<R>
where
	R: RawStream,
{
	/// Wraps `raw` with the default buffer sizes.
	///
	/// Fails with [`Error::Unsupported`] if `raw` is not seekable, since the
	/// two buffers could not otherwise be kept in agreement.
	pub fn new(raw: R) -> Result<Self> {
		Self::with_options(raw, BufferOptions::default())
	}

	pub fn with_options(raw: R, options: BufferOptions) -> Result<Self> {
		options.validate()?;
		if !raw.seekable() {
			return Err(Error::Unsupported("random access to a non-seekable stream"));
		}
		Ok(Self {
			raw,
			reader: ReadBuffer::new(options.buffer_size),
			writer: WriteBuffer::new(options.buffer_size, options.resolved_max_buffer_size()),
		})
	}

	/// Reads up to `n` bytes, or to the end of the stream, after flushing any
	/// pending writes. See [`BufferedReader::read`](super::BufferedReader::read).
	pub fn read(&mut self, n: Option<usize>) -> Result<Chunk<Vec<u8>>> {
		self.prepare_read()?;
		match n {
			None => self.reader.read_to_end(&mut self.raw),
			Some(n) => {
				let mut out = vec![0; n];
				Ok(self.reader.readinto(&mut self.raw, &mut out)?.map(|len| {
					out.truncate(len);
					out
				}))
			}
		}
	}

	pub fn readinto(&mut self, buf: &mut [u8]) -> Result<Chunk<usize>> {
		self.prepare_read()?;
		self.reader.readinto(&mut self.raw, buf)
	}

	pub fn peek(&mut self) -> Result<Chunk<&[u8]>> {
		self.prepare_read()?;
		self.reader.peek(&mut self.raw)
	}

	/// Buffers `data` at the logical position, after discarding any
	/// read-ahead. See [`BufferedWriter::write`](super::BufferedWriter::write).
	pub fn write(&mut self, data: &[u8]) -> Result<usize> {
		self.prepare_write()?;
		self.writer.write(&mut self.raw, data)
	}

	pub fn flush(&mut self) -> Result<()> {
		self.check_open()?;
		self.writer.flush(&mut self.raw)
	}

	/// Flushes pending writes, then moves the logical position. A target
	/// inside the read-ahead only moves the read cursor.
	pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
		self.check_open()?;
		self.writer.flush(&mut self.raw)?;
		self.reader.seek(&mut self.raw, pos)
	}

	pub fn tell(&mut self) -> Result<u64> {
		self.check_open()?;
		match self.writer.pending() {
			0 => self.reader.tell(&mut self.raw),
			_ => self.writer.tell(&mut self.raw),
		}
	}

	/// Cuts the stream at `size`, or at the logical position when `size` is
	/// `None`. The logical position is left unchanged.
	pub fn truncate(&mut self, size: Option<u64>) -> Result<u64> {
		self.check_open()?;
		self.writer.flush(&mut self.raw)?;
		self.reader.rewind_raw(&mut self.raw)?;
		self.raw.truncate(size)
	}

	/// Flushes pending writes, then closes the raw stream. As with
	/// [`BufferedWriter::close`](super::BufferedWriter::close), the raw stream
	/// is closed even when the flush fails.
	pub fn close(&mut self) -> Result<()> {
		if self.raw.closed() {
			return Ok(());
		}
		let flushed = self.writer.flush(&mut self.raw);
		if let Err(err) = &flushed {
			debug!(%err, pending = self.writer.pending(), "flush before close failed");
		}
		self.reader.discard();
		let closed = self.raw.close();
		flushed.and(closed)
	}

	pub fn closed(&self) -> bool {
		self.raw.closed()
	}

	pub fn readable(&self) -> bool {
		self.raw.readable()
	}

	pub fn writable(&self) -> bool {
		self.raw.writable()
	}

	pub fn fileno(&self) -> Result<i32> {
		self.raw.fileno()
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

	fn prepare_read(&mut self) -> Result<()> {
		self.check_open()?;
		if !self.raw.readable() {
			return Err(Error::Unsupported("read"));
		}
		self.writer.flush(&mut self.raw)
	}

	fn prepare_write(&mut self) -> Result<()> {
		self.check_open()?;
		if !self.raw.writable() {
			return Err(Error::Unsupported("write"));
		}
		self.reader.rewind_raw(&mut self.raw)
	}
}

impl<R> Drop for BufferedRandom<R>
where
	R: RawStream,
{
	fn drop(&mut self) {
		if !self.raw.closed() && self.writer.pending() > 0 {
			let _ = self.writer.flush(&mut self.raw);
		}
	}
}

#[cfg(test)]
mod tests {
	use std::io::SeekFrom;

	use super::BufferedRandom;
	use crate::buffered::mock::{BlockingWriter, ScriptedStream};
	use crate::{BufferOptions, Chunk, Error, MemoryStream};

	fn data(bytes: &[u8]) -> Chunk<Vec<u8>> {
		Chunk::Data(bytes.to_vec())
	}

	#[test]
	fn random_read_then_write() {
		let raw = ScriptedStream::chunks(&[b"asdf", b"ghjk"]);
		let writes = raw.writes();
		let options = BufferOptions::new().with_buffer_size(8).with_max_buffer_size(12);
		let mut rw = BufferedRandom::with_options(raw, options).unwrap();

		assert_eq!(rw.read(Some(2)).unwrap(), data(b"as"));
		rw.write(b"ddd").unwrap();
		rw.write(b"eee").unwrap();
		assert!(writes.borrow().is_empty());

		// The read forces the pending writes out first.
		assert_eq!(rw.read(None).unwrap(), data(b"ghjk"));
		assert_eq!(*writes.borrow(), [b"dddeee".to_vec()]);
	}

	#[test]
	fn random_seek_and_tell() {
		let mut rw = BufferedRandom::new(MemoryStream::from_bytes(&b"asdfghjkl"[..])).unwrap();

		assert_eq!(rw.read(Some(2)).unwrap(), data(b"as"));
		assert_eq!(rw.tell().unwrap(), 2);
		rw.seek(SeekFrom::Start(0)).unwrap();
		assert_eq!(rw.read(Some(4)).unwrap(), data(b"asdf"));

		rw.write(b"asdf").unwrap();
		assert_eq!(rw.tell().unwrap(), 8);
		rw.seek(SeekFrom::Start(0)).unwrap();
		assert_eq!(rw.read(None).unwrap(), data(b"asdfasdfl"));
		assert_eq!(rw.tell().unwrap(), 9);
		assert_eq!(rw.seek(SeekFrom::End(-4)).unwrap(), 5);
		assert_eq!(rw.tell().unwrap(), 5);
		assert_eq!(rw.seek(SeekFrom::Current(2)).unwrap(), 7);
		assert_eq!(rw.tell().unwrap(), 7);
		assert_eq!(rw.read(Some(11)).unwrap(), data(b"fl"));
	}

	#[test]
	fn random_write_discards_read_ahead() {
		let mut rw = BufferedRandom::new(MemoryStream::from_bytes(&b"0123456789"[..])).unwrap();
		assert_eq!(rw.read(Some(3)).unwrap(), data(b"012"));
		rw.write(b"abc").unwrap();
		rw.flush().unwrap();
		assert_eq!(rw.get_ref().value(), b"012abc6789");
		assert_eq!(rw.read(Some(2)).unwrap(), data(b"67"));
	}

	#[test]
	fn random_truncate_keeps_position() {
		let mut rw = BufferedRandom::new(MemoryStream::from_bytes(&b"0123456789"[..])).unwrap();
		assert_eq!(rw.read(Some(4)).unwrap(), data(b"0123"));
		assert_eq!(rw.truncate(None).unwrap(), 4);
		assert_eq!(rw.tell().unwrap(), 4);
		assert_eq!(rw.get_ref().value(), b"0123");
		assert_eq!(rw.read(None).unwrap(), Chunk::Eof);
	}

	#[test]
	fn random_requires_seekable() {
		let result = BufferedRandom::new(BlockingWriter::new(&[]));
		assert!(matches!(result, Err(Error::Unsupported(_))));
	}

	#[test]
	fn random_close_flushes() {
		let mut rw = BufferedRandom::new(MemoryStream::new()).unwrap();
		rw.write(b"kept").unwrap();
		rw.close().unwrap();
		assert!(rw.closed());
		assert_eq!(rw.get_ref().value(), b"kept");
		assert!(matches!(rw.read(None), Err(Error::Closed)));
	}
}
