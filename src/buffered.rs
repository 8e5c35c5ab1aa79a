//! Buffered wrappers over raw streams.
//!
//! Each wrapper owns exactly one [`RawStream`](crate::RawStream) and one or
//! both of two fixed-capacity buffers:
//!
//! - A *read buffer* holds bytes fetched from the raw stream ahead of the
//!   caller. It is refilled by exactly one raw read, sized to its capacity,
//!   whenever it runs dry.
//! - A *write buffer* holds bytes the caller has written but the raw stream
//!   has not yet accepted. It drains through as many raw writes as the stream
//!   needs, keeping any unaccepted remainder when the stream would block.
//!
//! [`BufferedRandom`] combines the two over a single seekable stream and keeps
//! at most one of them active at a time, so that the raw stream's position
//! always agrees with the caller's logical position before the opposite
//! operation proceeds.

use serde::Deserialize;

use crate::error::{Error, Result};

mod pair;
mod random;
mod read_buffer;
mod reader;
mod write_buffer;
mod writer;

pub use pair::BufferedRwPair;
pub use random::BufferedRandom;
pub use reader::BufferedReader;
pub use writer::BufferedWriter;

pub(crate) use read_buffer::ReadBuffer;
pub(crate) use write_buffer::WriteBuffer;

/// The buffer capacity used when none is configured.
pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

/// Construction-time configuration for the buffered wrappers.
///
/// Options can be built in code or deserialized from a configuration file;
/// omitted fields take their defaults.
///
/// ```
/// use layered_io::BufferOptions;
///
/// let options = BufferOptions::new().with_buffer_size(64).with_max_buffer_size(256);
/// assert_eq!(options.buffer_size, 64);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BufferOptions {
	/// The capacity of each buffer, and the size of each raw read that
	/// refills a read buffer.
	pub buffer_size: usize,

	/// The most bytes a write buffer may hold while its raw stream keeps
	/// blocking. `None` means twice `buffer_size`.
	pub max_buffer_size: Option<usize>,
}

impl Default for BufferOptions {
	fn default() -> Self {
		Self {
			buffer_size: DEFAULT_BUFFER_SIZE,
			max_buffer_size: None,
		}
	}
}

impl BufferOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_buffer_size(mut self, size: usize) -> Self {
		self.buffer_size = size;
		self
	}

	pub fn with_max_buffer_size(mut self, size: usize) -> Self {
		self.max_buffer_size = Some(size);
		self
	}

	/// Checks that the options describe usable buffers.
	pub fn validate(&self) -> Result<()> {
		if self.buffer_size == 0 {
			return Err(Error::InvalidOption("buffer_size must be greater than zero"));
		}
		if self.resolved_max_buffer_size() < self.buffer_size {
			return Err(Error::InvalidOption(
				"max_buffer_size must be at least buffer_size",
			));
		}
		Ok(())
	}

	pub(crate) fn resolved_max_buffer_size(&self) -> usize {
		self
			.max_buffer_size
			.unwrap_or_else(|| self.buffer_size.saturating_mul(2))
	}
}

#[cfg(test)]
pub(crate) mod mock;

#[cfg(test)]
mod tests {
	use super::BufferOptions;
	use crate::Error;

	#[test]
	fn options_defaults() {
		let options = BufferOptions::default();
		assert_eq!(options.buffer_size, 8192);
		assert_eq!(options.resolved_max_buffer_size(), 16384);
		assert!(options.validate().is_ok());
	}

	#[test]
	fn options_validation() {
		assert!(matches!(
			BufferOptions::new().with_buffer_size(0).validate(),
			Err(Error::InvalidOption(_)),
		));
		assert!(matches!(
			BufferOptions::new()
				.with_buffer_size(8)
				.with_max_buffer_size(4)
				.validate(),
			Err(Error::InvalidOption(_)),
		));
	}

	#[test]
	fn options_from_toml() {
		let options: BufferOptions = toml::from_str("buffer_size = 16").unwrap();
		assert_eq!(options, BufferOptions::new().with_buffer_size(16));
		assert_eq!(options.resolved_max_buffer_size(), 32);

		let options: BufferOptions =
			toml::from_str("buffer_size = 8\nmax_buffer_size = 12").unwrap();
		assert_eq!(options.resolved_max_buffer_size(), 12);

		assert!(toml::from_str::<BufferOptions>("buffer_sise = 8").is_err());
	}
}
