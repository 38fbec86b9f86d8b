use std::borrow::Cow;

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};

/// Text decoded from a locale file plus the encoding it was read with.
#[derive(Debug)]
pub struct DecodedText<'a> {
    pub text: Cow<'a, str>,
    pub encoding: &'static Encoding,
    pub had_bom: bool,
    pub had_errors: bool,
}

/// Decodes file bytes to text. A BOM wins, then strict UTF-8, then the chardetng guess.
pub fn decode(bytes: &[u8]) -> DecodedText<'_> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, had_errors) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return DecodedText {
            text,
            encoding,
            had_bom: true,
            had_errors,
        };
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return DecodedText {
            text: Cow::Borrowed(text),
            encoding: UTF_8,
            had_bom: false,
            had_errors: false,
        };
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);

    DecodedText {
        text,
        encoding,
        had_bom: false,
        had_errors,
    }
}
