// Defines a `t!` macro local to the calling function.  `t!` logs its
// arguments at trace level, prefixed by `$func`, if `$TRACE` is set.
//
// A macro defined by a macro cannot have repetitions of its own,
// hence one arm per arity.
macro_rules! tracer {
    ( $TRACE:expr, $func:expr ) => {
        #[allow(unused_macros)]
        macro_rules! t {
            ( $fmt:literal ) => {
                if $TRACE { log::trace!(concat!("{}: ", $fmt), $func) }
            };
            ( $fmt:literal, $a:expr ) => {
                if $TRACE { log::trace!(concat!("{}: ", $fmt), $func, $a) }
            };
            ( $fmt:literal, $a:expr, $b:expr ) => {
                if $TRACE {
                    log::trace!(concat!("{}: ", $fmt), $func, $a, $b)
                }
            };
            ( $fmt:literal, $a:expr, $b:expr, $c:expr ) => {
                if $TRACE {
                    log::trace!(concat!("{}: ", $fmt), $func, $a, $b, $c)
                }
            };
        }
    };
}

// Declares a code table: the enum, both conversions, `Display`, and
// an `Arbitrary` implementation drawing from all 256 codes.  Codes
// in `$private` map to `Private`, other unlisted codes to `Unknown`.
macro_rules! code_table {
    (
        $(#[$attr:meta])*
        pub enum $name:ident ($what:literal, private $private:pat) {
            $( $(#[$vattr:meta])* $variant:ident = $code:literal
               => $display:literal, )*
        }
    ) => {
        $(#[$attr])*
        #[non_exhaustive]
        #[derive(Clone, Copy, Hash, PartialEq, Eq, Debug, PartialOrd, Ord)]
        pub enum $name {
            $( $(#[$vattr])* $variant, )*
            #[doc = concat!("A private or experimental ", $what, ".")]
            Private(u8),
            #[doc = concat!("An unassigned ", $what, ".")]
            Unknown(u8),
        }

        impl From<u8> for $name {
            fn from(u: u8) -> Self {
                match u {
                    $( $code => $name::$variant, )*
                    $private => $name::Private(u),
                    u => $name::Unknown(u),
                }
            }
        }

        impl From<$name> for u8 {
            fn from(v: $name) -> u8 {
                match v {
                    $( $name::$variant => $code, )*
                    $name::Private(u) | $name::Unknown(u) => u,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                match self {
                    $( $name::$variant => f.write_str($display), )*
                    $name::Private(u) =>
                        write!(f, concat!("private ", $what, " {}"), u),
                    $name::Unknown(u) =>
                        write!(f, concat!("unknown ", $what, " {}"), u),
                }
            }
        }

        #[cfg(test)]
        impl quickcheck::Arbitrary for $name {
            fn arbitrary(g: &mut quickcheck::Gen) -> Self {
                <u8 as quickcheck::Arbitrary>::arbitrary(g).into()
            }
        }
    };
}

/// Statically checks that `$x` is `Send` and `Sync`.
///
/// ```ignore
/// pub struct Keyring {}
/// assert_send_and_sync!(Keyring);
/// ```
macro_rules! assert_send_and_sync {
    ( $x:ty ) => {
        impl crate::types::Sendable for $x {}
        impl crate::types::Syncable for $x {}
    };
}
