#![no_main]

use libfuzzer_sys::fuzz_target;

use layered_io::{BufferOptions, BufferedReader, Chunk, Encoding, MemoryStream, TextDecoder, TextOptions};

// Decoding through small, arbitrarily sized buffers and chunks must agree
// with decoding all of the bytes at once.
fuzz_target!(|input: &[u8]| {
	let Some((&sizes, data)) = input.split_first() else {
		return;
	};
	let buffer_size = usize::from(sizes & 0x0F) + 1;
	let chunk_size = usize::from(sizes >> 4) + 1;

	for encoding in [Encoding::Utf8, Encoding::Utf16Little] {
		let expected = encoding
			.decode(data)
			.map(|text| text.replace("\r\n", "\n").replace('\r', "\n"));

		let raw = MemoryStream::from_bytes(data);
		let options = BufferOptions::new().with_buffer_size(buffer_size);
		let reader = BufferedReader::with_options(raw, options).unwrap();
		let options = TextOptions::new().with_encoding(encoding).with_chunk_size(chunk_size);
		let mut text = TextDecoder::with_options(reader, options).unwrap();

		// Text before undecodable bytes comes first, then the error.
		let mut decoded = String::new();
		let got = loop {
			match text.read(None) {
				Ok(Chunk::Data(text)) => decoded.push_str(&text),
				Ok(Chunk::Eof) => break Ok(decoded),
				Ok(Chunk::WouldBlock) => panic!("memory stream reported would-block"),
				Err(err) => break Err(err),
			}
		};
		match (expected, got) {
			(Ok(expected), Ok(got)) => assert_eq!(expected, got),
			(Err(_), Err(_)) => {}
			(expected, got) => panic!("one-shot decode gave {expected:?}, chunked decode gave {got:?}"),
		}
	}
});
