use std::borrow::Cow;
use std::fmt;
use std::io;

#[cfg(test)]
use quickcheck::{Arbitrary, Gen};

use crate::Result;
use crate::packet::Tag;
use crate::parse::ParsedPacket;
use crate::serialize::SerializeBody;

/// Holds a UserID packet.
///
/// According to [RFC 4880], the text is by convention UTF-8 encoded
/// and in "mail name-addr" form, i.e., "Name (Comment)
/// <email@example.com>".  Nothing enforces that, so the value is
/// kept as bytes.
///
/// See [Section 5.11 of RFC 4880] for details.
///
///   [RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.11
///   [Section 5.11 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.11
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct UserIDBody {
    value: Vec<u8>,
}

impl From<Vec<u8>> for UserIDBody {
    fn from(value: Vec<u8>) -> Self {
        UserIDBody { value }
    }
}

impl From<&[u8]> for UserIDBody {
    fn from(u: &[u8]) -> Self {
        u.to_vec().into()
    }
}

impl<'a> From<&'a str> for UserIDBody {
    fn from(u: &'a str) -> Self {
        u.as_bytes().into()
    }
}

impl fmt::Display for UserIDBody {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl fmt::Debug for UserIDBody {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("UserIDBody")
            .field("value", &self.to_string_lossy())
            .finish()
    }
}

impl UserIDBody {
    /// Gets the user ID packet's value.
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Returns the value as text, replacing invalid UTF-8 sequences.
    pub fn to_string_lossy(&self) -> Cow<str> {
        String::from_utf8_lossy(&self.value)
    }

    /// Returns the address part of a conventional "Name <address>"
    /// user ID.
    ///
    /// This does not validate the address.
    pub fn email(&self) -> Option<String> {
        let text = self.to_string_lossy();
        let start = text.rfind('<')?;
        let end = start + text[start..].find('>')?;
        let addr = text[start + 1..end].trim();
        if addr.is_empty() {
            None
        } else {
            Some(addr.to_string())
        }
    }
}

impl ParsedPacket for UserIDBody {
    const TAG: Tag = Tag::UserID;

    fn parse_body(body: &[u8]) -> Result<Self> {
        Ok(body.into())
    }
}

impl SerializeBody for UserIDBody {
    fn serialize_body(&self, o: &mut dyn io::Write) -> Result<()> {
        o.write_all(&self.value)?;
        Ok(())
    }
}

assert_send_and_sync!(UserIDBody);

#[cfg(test)]
impl Arbitrary for UserIDBody {
    fn arbitrary(g: &mut Gen) -> Self {
        Vec::<u8>::arbitrary(g).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    quickcheck::quickcheck! {
        fn roundtrip(u: UserIDBody) -> bool {
            UserIDBody::parse_body(&u.body_to_vec().unwrap()).unwrap() == u
        }
    }

    #[test]
    fn email() {
        assert_eq!(UserIDBody::from("Alice <alice@example.org>").email(),
                   Some("alice@example.org".into()));
        assert_eq!(UserIDBody::from("Bob (work) < bob@example.org >").email(),
                   Some("bob@example.org".into()));
        assert_eq!(UserIDBody::from("alice@example.org").email(), None);
        assert_eq!(UserIDBody::from("Carol <>").email(), None);
        assert_eq!(UserIDBody::from(&b"Dave \xff <d@example.org>"[..])
                   .email(),
                   Some("d@example.org".into()));
    }
}
