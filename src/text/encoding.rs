//! Byte encodings for the text layer, with incremental decoding.

use std::fmt::{self, Display};
use std::str::{self, FromStr};

use serde::Deserialize;
use thiserror::Error;

use crate::error::Result;

/// A text encoding the text layer can decode from and encode to.
///
/// Encodings are looked up by name, ignoring case and treating `-` and `_`
/// alike:
///
/// ```
/// use layered_io::Encoding;
///
/// assert_eq!("UTF_16_LE".parse::<Encoding>().unwrap(), Encoding::Utf16Little);
/// assert_eq!(Encoding::Latin1.name(), "latin-1");
/// ```
///
/// The UTF-16 and UTF-32 encodings have a fixed byte order and neither
/// expect nor produce a byte order mark. A leading BOM decodes as U+FEFF like
/// any other character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum Encoding {
	#[default]
	Utf8,
	Utf16Little,
	Utf16Big,
	Utf32Little,
	Utf32Big,
	Latin1,
	Ascii,
}

impl Encoding {
	/// Looks up an encoding by name.
	pub fn from_name(name: &str) -> Result<Self> {
		let normalized = name.to_ascii_lowercase().replace('_', "-");
		Ok(match normalized.as_str() {
			"utf-8" | "utf8" => Encoding::Utf8,
			"utf-16-le" | "utf-16le" | "utf16-le" | "utf16le" => Encoding::Utf16Little,
			"utf-16-be" | "utf-16be" | "utf16-be" | "utf16be" => Encoding::Utf16Big,
			"utf-32-le" | "utf-32le" | "utf32-le" | "utf32le" => Encoding::Utf32Little,
			"utf-32-be" | "utf-32be" | "utf32-be" | "utf32be" => Encoding::Utf32Big,
			"latin-1" | "latin1" | "iso-8859-1" | "iso8859-1" => Encoding::Latin1,
			"ascii" | "us-ascii" => Encoding::Ascii,
			_ => return Err(crate::Error::UnknownEncoding(name.to_owned())),
		})
	}

	/// Returns the canonical name of the encoding.
	pub fn name(self) -> &'static str {
		match self {
			Encoding::Utf8 => "utf-8",
			Encoding::Utf16Little => "utf-16-le",
			Encoding::Utf16Big => "utf-16-be",
			Encoding::Utf32Little => "utf-32-le",
			Encoding::Utf32Big => "utf-32-be",
			Encoding::Latin1 => "latin-1",
			Encoding::Ascii => "ascii",
		}
	}

	/// Decodes a complete byte sequence in one pass.
	pub fn decode(self, bytes: &[u8]) -> std::result::Result<String, DecodeError> {
		let mut out = String::with_capacity(bytes.len());
		Decoder::new(self).decode(bytes, true, &mut out)?;
		Ok(out)
	}

	/// Encodes `text`, appending the bytes to `out`.
	///
	/// Nothing is appended if any character of `text` cannot be represented.
	pub fn encode_into(self, text: &str, out: &mut Vec<u8>) -> std::result::Result<(), EncodeError> {
		let unrepresentable = |limit: u32| {
			text.chars().find(|&ch| u32::from(ch) > limit).map(|ch| EncodeError {
				encoding: self,
				ch,
			})
		};

		match self {
			Encoding::Utf8 => out.extend_from_slice(text.as_bytes()),
			Encoding::Utf16Little => text.encode_utf16().for_each(|u| out.extend_from_slice(&u.to_le_bytes())),
			Encoding::Utf16Big => text.encode_utf16().for_each(|u| out.extend_from_slice(&u.to_be_bytes())),
			Encoding::Utf32Little => text.chars().for_each(|ch| out.extend_from_slice(&u32::from(ch).to_le_bytes())),
			Encoding::Utf32Big => text.chars().for_each(|ch| out.extend_from_slice(&u32::from(ch).to_be_bytes())),
			Encoding::Latin1 | Encoding::Ascii => {
				let limit = match self {
					Encoding::Ascii => 0x7F,
					_ => 0xFF,
				};
				if let Some(err) = unrepresentable(limit) {
					return Err(err);
				}
				// Every character is at most `limit`, so each fits in a byte.
				out.extend(text.chars().map(|ch| u8::try_from(ch).unwrap_or(b'?')));
			}
		}
		Ok(())
	}

	pub fn encode(self, text: &str) -> std::result::Result<Vec<u8>, EncodeError> {
		let mut out = Vec::with_capacity(text.len());
		self.encode_into(text, &mut out)?;
		Ok(out)
	}
}

impl Display for Encoding {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl FromStr for Encoding {
	type Err = crate::Error;

	fn from_str(s: &str) -> Result<Self> {
		Encoding::from_name(s)
	}
}

impl TryFrom<String> for Encoding {
	type Error = crate::Error;

	fn try_from(name: String) -> Result<Self> {
		Encoding::from_name(&name)
	}
}

/// Malformed input for an encoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
	/// The bytes at `offset` are not valid in the encoding.
	#[error("invalid {encoding} sequence at byte {offset}")]
	Invalid { encoding: Encoding, offset: u64 },

	/// The data ended part way through a sequence that starts at `offset`.
	#[error("incomplete {encoding} sequence at byte {offset} at end of data")]
	Incomplete { encoding: Encoding, offset: u64 },
}

impl DecodeError {
	pub fn encoding(&self) -> Encoding {
		match self {
			DecodeError::Invalid { encoding, .. } | DecodeError::Incomplete { encoding, .. } => *encoding,
		}
	}

	/// Returns the absolute offset of the offending bytes in the decoded
	/// stream.
	pub fn offset(&self) -> u64 {
		match self {
			DecodeError::Invalid { offset, .. } | DecodeError::Incomplete { offset, .. } => *offset,
		}
	}
}

/// A character that an encoding cannot represent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot encode {ch:?} as {encoding}")]
pub struct EncodeError {
	pub encoding: Encoding,
	pub ch: char,
}

/// An incremental decoder that accepts input in arbitrary pieces.
///
/// A sequence split across two pieces is held back until the rest of it
/// arrives, so that piece boundaries never produce errors of their own.
pub(crate) struct Decoder {
	encoding: Encoding,
	tail: Vec<u8>,
	/// The absolute offset of the first byte of `tail`.
	pos: u64,
	failed: Option<DecodeError>,
}

impl Decoder {
	pub(crate) fn new(encoding: Encoding) -> Self {
		Self {
			encoding,
			tail: Vec::new(),
			pos: 0,
			failed: None,
		}
	}

	/// Decodes `input`, appending text to `out`.
	///
	/// Unless `last` is set, an incomplete sequence at the end of `input` is
	/// kept for the next call. When `last` is set, one is an error.
	///
	/// On an error, the text before the offending bytes is still appended to
	/// `out`. The decoder then stops, and every later call returns the same
	/// error.
	pub(crate) fn decode(
		&mut self,
		input: &[u8],
		last: bool,
		out: &mut String,
	) -> std::result::Result<(), DecodeError> {
		if let Some(err) = &self.failed {
			return Err(err.clone());
		}

		let mut bytes = std::mem::take(&mut self.tail);
		bytes.extend_from_slice(input);

		let used = match self.encoding {
			Encoding::Utf8 => self.decode_utf8(&bytes, out),
			Encoding::Utf16Little => self.decode_utf16(&bytes, u16::from_le_bytes, out),
			Encoding::Utf16Big => self.decode_utf16(&bytes, u16::from_be_bytes, out),
			Encoding::Utf32Little => self.decode_utf32(&bytes, u32::from_le_bytes, out),
			Encoding::Utf32Big => self.decode_utf32(&bytes, u32::from_be_bytes, out),
			Encoding::Latin1 => {
				out.extend(bytes.iter().map(|&b| char::from(b)));
				Ok(bytes.len())
			}
			Encoding::Ascii => {
				let valid = bytes.iter().position(|b| !b.is_ascii()).unwrap_or(bytes.len());
				out.extend(bytes[..valid].iter().map(|&b| char::from(b)));
				match valid < bytes.len() {
					true => Err(self.invalid(valid)),
					false => Ok(valid),
				}
			}
		};
		let used = used.and_then(|used| match used < bytes.len() && last {
			true => Err(DecodeError::Incomplete {
				encoding: self.encoding,
				offset: self.pos + used as u64,
			}),
			false => Ok(used),
		});

		match used {
			Ok(used) => {
				self.pos += used as u64;
				self.tail = bytes.split_off(used);
				Ok(())
			}
			Err(err) => {
				self.pos = err.offset();
				self.failed = Some(err.clone());
				Err(err)
			}
		}
	}

	fn invalid(&self, index: usize) -> DecodeError {
		DecodeError::Invalid {
			encoding: self.encoding,
			offset: self.pos + index as u64,
		}
	}

	/// Returns the number of bytes consumed; the rest is an incomplete tail.
	fn decode_utf8(&self, bytes: &[u8], out: &mut String) -> std::result::Result<usize, DecodeError> {
		match str::from_utf8(bytes) {
			Ok(text) => {
				out.push_str(text);
				Ok(bytes.len())
			}
			Err(err) => {
				let valid = err.valid_up_to();
				// The prefix was just validated, so this cannot fail.
				out.push_str(str::from_utf8(&bytes[..valid]).unwrap_or_default());
				match err.error_len() {
					None => Ok(valid),
					Some(_) => Err(self.invalid(valid)),
				}
			}
		}
	}

	fn decode_utf16(
		&self,
		bytes: &[u8],
		unit: fn([u8; 2]) -> u16,
		out: &mut String,
	) -> std::result::Result<usize, DecodeError> {
		let unit_at = |i: usize| bytes.get(i..i + 2).map(|b| unit([b[0], b[1]]));

		let mut i = 0;
		while let Some(lead) = unit_at(i) {
			if !(0xD800..=0xDFFF).contains(&lead) {
				out.push(char::from_u32(u32::from(lead)).ok_or_else(|| self.invalid(i))?);
				i += 2;
				continue;
			}
			if lead >= 0xDC00 {
				// A trailing surrogate with no leading surrogate.
				return Err(self.invalid(i));
			}
			let Some(trail) = unit_at(i + 2) else {
				break;
			};
			if !(0xDC00..=0xDFFF).contains(&trail) {
				return Err(self.invalid(i));
			}
			let ch = 0x1_0000 + ((u32::from(lead - 0xD800) << 10) | u32::from(trail - 0xDC00));
			out.push(char::from_u32(ch).ok_or_else(|| self.invalid(i))?);
			i += 4;
		}
		Ok(i)
	}

	fn decode_utf32(
		&self,
		bytes: &[u8],
		unit: fn([u8; 4]) -> u32,
		out: &mut String,
	) -> std::result::Result<usize, DecodeError> {
		let mut i = 0;
		while let Some(b) = bytes.get(i..i + 4) {
			let value = unit([b[0], b[1], b[2], b[3]]);
			out.push(char::from_u32(value).ok_or_else(|| self.invalid(i))?);
			i += 4;
		}
		Ok(i)
	}
}
