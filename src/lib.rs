//! Layered raw, buffered and text I/O that understands non-blocking streams.
//!
//! The stack is built from three layers, each depending only on the one
//! beneath it:
//!
//! - [`RawStream`] is an unbuffered byte source and sink, implemented here by
//!   [`MemoryStream`] and [`FileStream`].
//! - [`BufferedReader`], [`BufferedWriter`], [`BufferedRandom`] and
//!   [`BufferedRwPair`] add read-ahead and write-behind buffering.
//! - [`TextDecoder`] and [`TextEncoder`] translate between bytes and text,
//!   with configurable encodings and newline handling. [`StringStream`] is
//!   an in-memory text stream.
//!
//! Reads distinguish three outcomes through [`Chunk`]: some data, nothing
//! *yet* ([`Chunk::WouldBlock`]), and nothing *ever* ([`Chunk::Eof`]). Writes
//! to a stream that would block fail with [`Error::WouldBlock`], whose count
//! tells the caller how much was accepted. No layer drops bytes it has
//! accepted or fetched because a stream would block.
//!
//! ```
//! use layered_io::{BufferedRandom, Chunk, MemoryStream};
//! use std::io::SeekFrom;
//!
//! let mut file = BufferedRandom::new(MemoryStream::new())?;
//! file.write(b"hello world\n")?;
//! file.seek(SeekFrom::Start(0))?;
//! assert_eq!(file.read(Some(5))?, Chunk::Data(b"hello".to_vec()));
//! # Ok::<(), layered_io::Error>(())
//! ```

#![deny(
	// Enforce some additional strictness on unsafe code.
	unsafe_op_in_unsafe_fn,
	clippy::undocumented_unsafe_blocks,
	// Deny a number of `as` casts in favor of safer alternatives.
	clippy::as_underscore,
	clippy::ptr_as_ptr,
	clippy::cast_lossless,
	clippy::cast_possible_truncation,
	clippy::checked_conversions,
	clippy::unnecessary_cast,
	// More general style-type things.
	clippy::from_over_into,
	clippy::semicolon_if_nothing_returned,
)]

mod buffered;
mod error;
mod raw;
mod text;

pub use buffered::{
	BufferOptions, BufferedRandom, BufferedReader, BufferedRwPair, BufferedWriter, DEFAULT_BUFFER_SIZE,
};
pub use error::{Error, Result};
pub use raw::{Chunk, FileStream, MemoryStream, Mode, RawStream};
pub use text::{
	DecodeError, EncodeError, Encoding, Newline, StringStream, TextDecoder, TextEncoder, TextOptions,
	DEFAULT_CHUNK_SIZE,
};
