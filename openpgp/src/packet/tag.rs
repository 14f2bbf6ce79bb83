code_table! {
    /// Packet tags ([RFC 4880, section 4.3]).
    ///
    /// A certificate only ever holds keys, user IDs, user attributes,
    /// signatures and the packets the parser keeps as "other"
    /// content, but the whole table is listed so foreign packets can
    /// be named when they are rejected.
    ///
    /// [RFC 4880, section 4.3]: https://tools.ietf.org/html/rfc4880#section-4.3
    pub enum Tag ("packet", private 60..=63) {
        /// Must not be used.
        Reserved = 0 => "reserved packet",
        /// Public-key encrypted session key.
        PKESK = 1 => "PKESK",
        /// Signature.
        Signature = 2 => "signature",
        /// Symmetric-key encrypted session key.
        SKESK = 3 => "SKESK",
        /// One-pass signature.
        OnePassSig = 4 => "one-pass signature",
        /// Secret primary key.
        SecretKey = 5 => "secret key",
        /// Public primary key.
        PublicKey = 6 => "public key",
        /// Secret subkey.
        SecretSubkey = 7 => "secret subkey",
        /// Compressed data.
        CompressedData = 8 => "compressed data",
        /// Symmetrically encrypted data.
        SED = 9 => "SED",
        /// Marker, to be ignored.
        Marker = 10 => "marker",
        /// Literal data.
        Literal = 11 => "literal data",
        /// Trust information, local to a keyring.
        Trust = 12 => "trust",
        /// User ID.
        UserID = 13 => "user ID",
        /// Public subkey.
        PublicSubkey = 14 => "public subkey",
        /// User attribute.
        UserAttribute = 17 => "user attribute",
        /// Integrity protected encrypted data.
        SEIP = 18 => "SEIP",
        /// Modification detection code.
        MDC = 19 => "MDC",
        /// AEAD encrypted data.
        AED = 20 => "AED",
    }
}

impl Tag {
    /// Returns whether a packet with this tag can never be part of a
    /// transferable public key.
    ///
    /// Unknown and private tags are accepted, they may name a
    /// component type this crate does not know yet.
    pub fn is_foreign_to_certs(&self) -> bool {
        use self::Tag::*;
        matches!(self,
                 Reserved | PKESK | SKESK | OnePassSig | CompressedData
                 | SED | Literal | SEIP | MDC | AED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    quickcheck::quickcheck! {
        fn six_bit_tags(u: u8) -> bool {
            let u = u & 0x3f;
            let tag = Tag::from(u);
            u8::from(tag) == u
                && matches!(tag, Tag::Private(_)) == (u >= 60)
        }
    }

    #[test]
    fn display() {
        assert_eq!(Tag::UserAttribute.to_string(), "user attribute");
        assert_eq!(Tag::from(61).to_string(), "private packet 61");
        assert_eq!(Tag::from(42).to_string(), "unknown packet 42");
    }

    #[test]
    fn foreign() {
        assert!(Tag::Literal.is_foreign_to_certs());
        assert!(! Tag::Signature.is_foreign_to_certs());
        assert!(! Tag::Unknown(42).is_foreign_to_certs());
        assert!(! Tag::Trust.is_foreign_to_certs());
    }
}
