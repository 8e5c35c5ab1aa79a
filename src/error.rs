use std::io;
use std::result;

use thiserror::Error;

use crate::text::{DecodeError, EncodeError};

/// The result produced by every fallible operation in the stack.
pub type Result<T> = result::Result<T, Error>;

/// An error produced by a raw, buffered, or text layer.
///
/// "Would block" is an error only for writes. Reads report it in-band through
/// [`Chunk::WouldBlock`](crate::Chunk::WouldBlock), alongside
/// [`Chunk::Eof`](crate::Chunk::Eof), so that the two kinds of "nothing" can
/// never be confused.
#[derive(Debug, Error)]
pub enum Error {
	/// A non-blocking raw stream could not accept more bytes right now.
	///
	/// `written` counts the bytes that were accepted before blocking. Bytes
	/// past that count were neither written nor dropped: a buffered writer
	/// still holds them for a later flush.
	#[error("operation would block after {written} bytes")]
	WouldBlock { written: usize },

	/// The stream was closed before the operation was attempted.
	#[error("I/O operation on closed stream")]
	Closed,

	/// The stream lacks the capability the operation needs.
	#[error("unsupported operation: {0}")]
	Unsupported(&'static str),

	/// A seek resolved to a position before the start of the stream, or a
	/// write landed at a position the stream cannot address.
	#[error("invalid seek to position {0}")]
	InvalidSeek(i128),

	/// A construction-time option was out of range.
	#[error("invalid option: {0}")]
	InvalidOption(&'static str),

	#[error("unknown encoding: {0}")]
	UnknownEncoding(String),

	#[error(transparent)]
	Decode(#[from] DecodeError),

	#[error(transparent)]
	Encode(#[from] EncodeError),

	#[error(transparent)]
	Io(#[from] io::Error),
}

impl Error {
	/// Returns true for a would-block error, regardless of its byte count.
	pub fn is_would_block(&self) -> bool {
		matches!(self, Error::WouldBlock { .. })
	}
}

impl From<Error> for io::Error {
	fn from(err: Error) -> Self {
		match err {
			Error::Io(err) => err,
			Error::WouldBlock { .. } => io::Error::new(io::ErrorKind::WouldBlock, err),
			Error::Closed | Error::InvalidSeek(_) | Error::InvalidOption(_) => {
				io::Error::new(io::ErrorKind::InvalidInput, err)
			}
			Error::Unsupported(_) => io::Error::new(io::ErrorKind::Unsupported, err),
			Error::UnknownEncoding(_) | Error::Decode(_) | Error::Encode(_) => {
				io::Error::new(io::ErrorKind::InvalidData, err)
			}
		}
	}
}
