use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};

use tracing::trace;

use super::{Chunk, RawStream};
use crate::error::{Error, Result};

/// The access a [`FileStream`] grants over its file.
///
/// The mode only gates operations at this layer; the file itself must have
/// been opened with matching permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mode {
	pub readable: bool,
	pub writable: bool,
}

impl Mode {
	pub const READ: Mode = Mode {
		readable: true,
		writable: false,
	};

	pub const WRITE: Mode = Mode {
		readable: false,
		writable: true,
	};

	pub const READ_WRITE: Mode = Mode {
		readable: true,
		writable: true,
	};
}

/// A raw stream over an already opened file, pipe, or other OS handle.
///
/// OS-level "would block" conditions from a non-blocking descriptor are
/// reported as [`Chunk::WouldBlock`] for reads and [`Error::WouldBlock`] for
/// writes. Interrupted system calls are retried.
#[derive(Debug)]
pub struct FileStream {
	file: Option<File>,
	mode: Mode,
	seekable: bool,
}

impl FileStream {
	/// Wraps `file` with the given access mode.
	///
	/// Seekability is probed once here, so a pipe or terminal reports
	/// `seekable() == false` for its whole lifetime.
	pub fn new(mut file: File, mode: Mode) -> Self {
		let seekable = file.stream_position().is_ok();
		Self {
			file: Some(file),
			mode,
			seekable,
		}
	}

	/// Switches the underlying descriptor into or out of non-blocking mode.
	#[cfg(unix)]
	pub fn set_nonblocking(&mut self, nonblocking: bool) -> Result<()> {
		use std::os::unix::io::AsRawFd;

		let fd = self.file()?.as_raw_fd();

		// SAFETY: These are FFI calls to libc on a descriptor that we own and
		// that stays open for the duration of the calls. fcntl reports
		// failure through its return value, which we check.
		unsafe {
			let flags = libc::fcntl(fd, libc::F_GETFL);
			if flags < 0 {
				return Err(io::Error::last_os_error().into());
			}
			let flags = match nonblocking {
				true => flags | libc::O_NONBLOCK,
				false => flags & !libc::O_NONBLOCK,
			};
			if libc::fcntl(fd, libc::F_SETFL, flags) < 0 {
				return Err(io::Error::last_os_error().into());
			}
		}
		Ok(())
	}

	fn file(&mut self) -> Result<&mut File> {
		self.file.as_mut().ok_or(Error::Closed)
	}

	fn seekable_file(&mut self) -> Result<&mut File> {
		if !self.seekable {
			return Err(Error::Unsupported("seek"));
		}
		self.file()
	}
}

impl RawStream for FileStream {
	fn readinto(&mut self, buf: &mut [u8]) -> Result<Chunk<usize>> {
		if !self.mode.readable {
			return Err(Error::Unsupported("read"));
		}
		if buf.is_empty() {
			return Ok(Chunk::Data(0));
		}

		let file = self.file()?;
		loop {
			match file.read(buf) {
				Ok(0) => return Ok(Chunk::Eof),
				Ok(n) => return Ok(Chunk::Data(n)),
				Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
				Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
					trace!("raw file read would block");
					return Ok(Chunk::WouldBlock);
				}
				Err(err) => return Err(err.into()),
			}
		}
	}

	fn write(&mut self, buf: &[u8]) -> Result<usize> {
		if !self.mode.writable {
			return Err(Error::Unsupported("write"));
		}

		let file = self.file()?;
		loop {
			match file.write(buf) {
				Ok(n) => return Ok(n),
				Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
				Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
					return Err(Error::WouldBlock { written: 0 });
				}
				Err(err) => return Err(err.into()),
			}
		}
	}

	fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
		Ok(self.seekable_file()?.seek(pos)?)
	}

	fn close(&mut self) -> Result<()> {
		// Dropping the handle closes the descriptor exactly once.
		self.file = None;
		Ok(())
	}

	fn closed(&self) -> bool {
		self.file.is_none()
	}

	fn readable(&self) -> bool {
		self.mode.readable
	}

	fn writable(&self) -> bool {
		self.mode.writable
	}

	fn seekable(&self) -> bool {
		self.seekable
	}

	fn truncate(&mut self, size: Option<u64>) -> Result<u64> {
		if !self.mode.writable {
			return Err(Error::Unsupported("truncate"));
		}
		let file = self.seekable_file()?;
		let size = match size {
			Some(size) => size,
			None => file.stream_position()?,
		};
		file.set_len(size)?;
		Ok(size)
	}

	#[cfg(unix)]
	fn fileno(&self) -> Result<i32> {
		use std::os::unix::io::AsRawFd;

		self.file.as_ref().map(AsRawFd::as_raw_fd).ok_or(Error::Closed)
	}
}
