//! Hexadecimal formatting of fingerprints and Key IDs.

/// Conversions for hexadecimal numbers.
pub mod hex {
    use crate::Error;
    use crate::Result;

    const UPPER: &[u8; 16] = b"0123456789ABCDEF";
    const LOWER: &[u8; 16] = b"0123456789abcdef";

    /// Encodes `buffer` as uppercase hexadecimal digits.
    pub fn encode<B: AsRef<[u8]>>(buffer: B) -> String {
        encode_with(buffer.as_ref(), false)
    }

    /// Like [`encode`], with a space after every four digits.
    pub fn encode_pretty<B: AsRef<[u8]>>(buffer: B) -> String {
        encode_with(buffer.as_ref(), true)
    }

    /// Encodes `buffer` as lowercase hexadecimal digits, last digit
    /// first.
    ///
    /// Reversing the digits of a fingerprint turns the Key ID, its
    /// suffix, into a prefix.
    pub fn encode_reversed<B: AsRef<[u8]>>(buffer: B) -> String {
        let buffer = buffer.as_ref();
        let mut s = String::with_capacity(buffer.len() * 2);
        for b in buffer.iter().rev() {
            s.push(LOWER[(b & 0x0f) as usize] as char);
            s.push(LOWER[(b >> 4) as usize] as char);
        }
        s
    }

    /// Decodes hexadecimal digits of either case.
    pub fn decode<H: AsRef<str>>(hex: H) -> Result<Vec<u8>> {
        decode_with(hex.as_ref(), false)
    }

    /// Like [`decode`], ignoring spaces.
    pub fn decode_pretty<H: AsRef<str>>(hex: H) -> Result<Vec<u8>> {
        decode_with(hex.as_ref(), true)
    }

    fn encode_with(buffer: &[u8], pretty: bool) -> String {
        let mut s = String::with_capacity(buffer.len() * 5 / 2);
        for (i, b) in buffer.iter().enumerate() {
            if pretty && i > 0 && i % 2 == 0 {
                s.push(' ');
            }
            s.push(UPPER[(b >> 4) as usize] as char);
            s.push(UPPER[(b & 0x0f) as usize] as char);
        }
        s
    }

    fn decode_with(hex: &str, pretty: bool) -> Result<Vec<u8>> {
        let invalid = || Error::InvalidArgument(
            format!("Invalid hex: {:?}", hex));

        let nibbles = hex.chars()
            .filter(|c| ! (pretty && *c == ' '))
            .map(|c| c.to_digit(16).map(|d| d as u8))
            .collect::<Option<Vec<u8>>>()
            .ok_or_else(invalid)?;
        if nibbles.len() % 2 != 0 {
            return Err(invalid().into());
        }

        Ok(nibbles.chunks(2).map(|n| (n[0] << 4) | n[1]).collect())
    }
}
