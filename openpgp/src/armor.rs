//! ASCII Armor.
//!
//! Key servers exchange certificates as ASCII-armored public key
//! blocks (see [RFC 4880, section 6]).  This module converts between
//! armored text and binary packet streams.
//!
//! [RFC 4880, section 6]: https://tools.ietf.org/html/rfc4880#section-6
//!
//! # Scope
//!
//! Armor headers are accepted and skipped.  The checksum is verified
//! if present.  Multipart messages are not supported, but several
//! armored blocks in one input are decoded one after the other.
//!
//! # Examples
//!
//! ```rust
//! # fn main() -> keyserver_openpgp::Result<()> {
//! use keyserver_openpgp::armor::{armor, dearmor, Kind};
//!
//! let text = armor(Kind::PublicKey, b"\xb4\x03Bob");
//! assert!(text.starts_with("-----BEGIN PGP PUBLIC KEY BLOCK-----\n"));
//! assert_eq!(dearmor(text.as_bytes())?, b"\xb4\x03Bob");
//! # Ok(()) }
//! ```

use std::str;

use crate::{
    Error,
    Result,
};

/// The encoded output stream must be represented in lines of no more
/// than 76 characters each (see [RFC 4880, section 6.3]).  GnuPG uses
/// 64.
///
/// [RFC 4880, section 6.3]: https://tools.ietf.org/html/rfc4880#section-6.3
const LINE_LENGTH: usize = 64;

const LINE_ENDING: &str = "\n";

const TRACE : bool = false;

/// Specifies the type of data (see [RFC 4880, section 6.2]).
///
/// [RFC 4880, section 6.2]: https://tools.ietf.org/html/rfc4880#section-6.2
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Kind {
    /// A generic OpenPGP message.
    Message,
    /// A transferable public key.
    PublicKey,
    /// A transferable secret key.
    SecretKey,
    /// A detached signature.
    Signature,
}

impl Kind {
    fn blurb(&self) -> &'static str {
        match self {
            Kind::Message => "MESSAGE",
            Kind::PublicKey => "PUBLIC KEY BLOCK",
            Kind::SecretKey => "PRIVATE KEY BLOCK",
            Kind::Signature => "SIGNATURE",
        }
    }

    fn from_blurb(blurb: &str) -> Option<Self> {
        [Kind::Message, Kind::PublicKey, Kind::SecretKey, Kind::Signature]
            .iter().find(|k| k.blurb() == blurb).copied()
    }

    fn begin(&self) -> String {
        format!("-----BEGIN PGP {}-----", self.blurb())
    }

    fn end(&self) -> String {
        format!("-----END PGP {}-----", self.blurb())
    }
}

/// Armors `data`.
///
/// The result carries no armor headers and ends with a line ending.
pub fn armor(kind: Kind, data: &[u8]) -> String {
    let encoded = base64::encode(data);

    let mut s = String::with_capacity(encoded.len() * 65 / 64 + 80);
    s.push_str(&kind.begin());
    s.push_str(LINE_ENDING);
    s.push_str(LINE_ENDING);
    // Base64 is ASCII, any split is a valid one.
    for line in encoded.as_bytes().chunks(LINE_LENGTH) {
        s.push_str(&String::from_utf8_lossy(line));
        s.push_str(LINE_ENDING);
    }
    let crc = crc24(data).to_be_bytes();
    s.push('=');
    s.push_str(&base64::encode(&crc[1..]));
    s.push_str(LINE_ENDING);
    s.push_str(&kind.end());
    s.push_str(LINE_ENDING);
    s
}

/// Decodes every armored block in `data`.
///
/// Text before, between and after the blocks is ignored.  The
/// decoded blocks are concatenated.
///
/// # Errors
///
/// Fails with [`Error::MalformedArmor`] if there is no armored block,
/// if a block is not terminated, if its body is not valid base64, or
/// if its checksum does not match.
pub fn dearmor(data: &[u8]) -> Result<Vec<u8>> {
    tracer!(TRACE, "dearmor");

    let text = str::from_utf8(data).map_err(|e| Error::MalformedArmor(
        format!("Not ASCII: {}", e)))?;
    let mut lines = text.lines().map(|l| l.trim_end());

    let mut result = Vec::new();
    let mut blocks = 0;
    while let Some(kind) = next_block(&mut lines)? {
        t!("Found {:?} block", kind);
        result.extend(block(&mut lines, kind)?);
        blocks += 1;
    }

    if blocks == 0 {
        return Err(Error::MalformedArmor("No armored data found".into())
                   .into());
    }
    Ok(result)
}

// Skips to the next armor header line and returns its kind.
fn next_block<'a, I>(lines: &mut I) -> Result<Option<Kind>>
    where I: Iterator<Item = &'a str>
{
    for line in lines {
        let blurb = match line.strip_prefix("-----BEGIN PGP ")
            .and_then(|l| l.strip_suffix("-----"))
        {
            Some(blurb) => blurb,
            None => continue,
        };
        return Kind::from_blurb(blurb).map(Some).ok_or_else(|| {
            Error::MalformedArmor(format!("Unknown armor kind {:?}", blurb))
                .into()
        });
    }
    Ok(None)
}

// Decodes the block following an armor header line.
fn block<'a, I>(lines: &mut I, kind: Kind) -> Result<Vec<u8>>
    where I: Iterator<Item = &'a str>
{
    let end = kind.end();
    let mut body = String::new();
    let mut checksum = None;
    let mut in_headers = true;

    loop {
        let line = lines.next().ok_or_else(|| Error::MalformedArmor(
            format!("Missing {:?}", end)))?;

        if in_headers {
            // Armor headers are "Key: Value" lines, terminated by an
            // empty line.  Some encoders omit them entirely.
            if line.is_empty() {
                in_headers = false;
                continue;
            }
            if line.contains(": ") {
                continue;
            }
            in_headers = false;
        }

        if line == end {
            break;
        }
        if line.starts_with("-----") {
            return Err(Error::MalformedArmor(
                format!("Expected {:?}, got {:?}", end, line)).into());
        }
        if let Some(sum) = line.strip_prefix('=') {
            checksum = Some(sum.to_string());
            continue;
        }
        body.push_str(line);
    }

    let data = base64::decode(&body).map_err(|e| Error::MalformedArmor(
        format!("Invalid base64: {}", e)))?;

    if let Some(sum) = checksum {
        let sum = base64::decode(&sum).map_err(|e| Error::MalformedArmor(
            format!("Invalid checksum: {}", e)))?;
        if sum.len() != 3 {
            return Err(Error::MalformedArmor(
                format!("Checksum has {} bytes, expected 3", sum.len()))
                       .into());
        }
        let expected =
            (sum[0] as u32) << 16 | (sum[1] as u32) << 8 | sum[2] as u32;
        let got = crc24(&data);
        if expected != got {
            return Err(Error::MalformedArmor(
                format!("Bad CRC sum: expected {:06x}, got {:06x}",
                        expected, got)).into());
        }
    }

    Ok(data)
}

const CRC24_INIT: u32 = 0xB704CE;
const CRC24_POLY: u32 = 0x1864CFB;

/// Computes the CRC-24 (see [RFC 4880, section 6.1]).
///
/// [RFC 4880, section 6.1]: https://tools.ietf.org/html/rfc4880#section-6.1
fn crc24(data: &[u8]) -> u32 {
    let mut n = CRC24_INIT;
    for octet in data {
        n ^= (*octet as u32) << 16;
        for _ in 0..8 {
            n <<= 1;
            if n & 0x1000000 > 0 {
                n ^= CRC24_POLY;
            }
        }
    }
    n & 0xFFFFFF
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn crc() {
        let b = b"foobarbaz";
        let crcs = [
            0xb704ce,
            0x6d2804,
            0xa2d10d,
            0x4fc255,
            0x7aafca,
            0xc79c46,
            0x7334de,
            0x77dc72,
            0x000f65,
            0xf40d86,
        ];

        for len in 0..b.len() + 1 {
            assert_eq!(crc24(&b[..len]), crcs[len]);
        }
    }

    quickcheck::quickcheck! {
        fn roundtrip(data: Vec<u8>) -> bool {
            let text = armor(Kind::PublicKey, &data);
            text.lines().all(|l| l.len() <= LINE_LENGTH)
                && dearmor(text.as_bytes()).unwrap() == data
        }
    }

    fn malformed(text: &str) -> bool {
        matches!(dearmor(text.as_bytes()).unwrap_err().downcast_ref::<Error>(),
                 Some(Error::MalformedArmor(_)))
    }

    #[test]
    fn headers_and_line_endings() {
        let text = "Here is my key:\r\n\
                    \r\n\
                    -----BEGIN PGP PUBLIC KEY BLOCK-----\r\n\
                    Comment: Alice's key\r\n\
                    Version: 1.0\r\n\
                    \r\n\
                    tANC\r\n\
                    b2I=\r\n\
                    =ylRg\r\n\
                    -----END PGP PUBLIC KEY BLOCK-----\r\n\
                    Thanks!\r\n";
        assert_eq!(dearmor(text.as_bytes()).unwrap(), b"\xb4\x03Bob");
    }

    #[test]
    fn checksum_is_optional() {
        let text = "-----BEGIN PGP PUBLIC KEY BLOCK-----\n\
                    tANCb2I=\n\
                    -----END PGP PUBLIC KEY BLOCK-----\n";
        assert_eq!(dearmor(text.as_bytes()).unwrap(), b"\xb4\x03Bob");
    }

    #[test]
    fn several_blocks() {
        let mut text = armor(Kind::PublicKey, b"\xb4\x03Bob");
        text.push_str("\n");
        text.push_str(&armor(Kind::PublicKey, b"\xcd\x05Alice"));
        assert_eq!(dearmor(text.as_bytes()).unwrap(),
                   b"\xb4\x03Bob\xcd\x05Alice");
    }

    #[test]
    fn errors() {
        let good = armor(Kind::PublicKey, b"\xb4\x03Bob");

        assert!(malformed("no armor here"));
        assert!(malformed(&good.replace("=ylRg", "=ylRh")));
        assert!(malformed(&good.replace("-----END PGP PUBLIC KEY BLOCK-----",
                                        "")));
        assert!(malformed(&good.replace("-----END PGP PUBLIC KEY BLOCK-----",
                                        "-----END PGP SIGNATURE-----")));
        assert!(malformed(&good.replace("tANC", "t!NC")));
        assert!(malformed("-----BEGIN PGP POSTCARD-----\n"));
    }
}
