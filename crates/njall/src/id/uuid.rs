use core::{fmt, str::FromStr};

use crate::{Error, Result};

/// A 128-bit, time-ordered identifier using the UUID version 8 layout.
///
/// The value is packed into a single [`u128`]. Fields are laid out from the
/// most significant bit to the least significant bit:
///
/// ```text
///  Bit Index:  127            80 79   76 75        64 63  62 61            0
///              +----------------+-------+------------+------+--------------+
///  Field:      | timestamp (48) | ver(4)| counter(12)|var(2)| random (62)  |
///              +----------------+-------+------------+------+--------------+
///              |<------------------- MSB --- 128 bits --- LSB ------------>|
/// ```
///
/// - `timestamp`: milliseconds since the Unix epoch
/// - `version`: always `0b1000` (8)
/// - `counter`: per-millisecond counter maintained by the generator
/// - `variant`: always `0b10`
/// - `random`: 62 fresh random bits per identifier
///
/// Because the timestamp and counter occupy the high bits, the natural
/// ordering of `Uuid` (and of its byte and textual forms) follows generation
/// order for identifiers produced by one generator.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Uuid {
    id: u128,
}

impl Uuid {
    pub const RANDOM_BITS: u32 = 62;
    pub const VARIANT_BITS: u32 = 2;
    pub const COUNTER_BITS: u32 = 12;
    pub const VERSION_BITS: u32 = 4;
    pub const TIMESTAMP_BITS: u32 = 48;

    pub const RANDOM_SHIFT: u32 = 0;
    pub const VARIANT_SHIFT: u32 = Self::RANDOM_SHIFT + Self::RANDOM_BITS;
    pub const COUNTER_SHIFT: u32 = Self::VARIANT_SHIFT + Self::VARIANT_BITS;
    pub const VERSION_SHIFT: u32 = Self::COUNTER_SHIFT + Self::COUNTER_BITS;
    pub const TIMESTAMP_SHIFT: u32 = Self::VERSION_SHIFT + Self::VERSION_BITS;

    pub const RANDOM_MASK: u64 = (1 << Self::RANDOM_BITS) - 1;
    pub const VARIANT_MASK: u8 = (1 << Self::VARIANT_BITS) - 1;
    pub const COUNTER_MASK: u16 = (1 << Self::COUNTER_BITS) - 1;
    pub const VERSION_MASK: u8 = (1 << Self::VERSION_BITS) - 1;
    pub const TIMESTAMP_MASK: u64 = (1 << Self::TIMESTAMP_BITS) - 1;

    /// The fixed version nibble.
    pub const VERSION: u8 = 0b1000;
    /// The fixed variant bits (`0b10`).
    pub const VARIANT: u8 = 0b10;

    /// The all-zero identifier. It is not a valid version 8 identifier.
    pub const NIL: Self = Self { id: 0 };

    /// Length of the canonical `8-4-4-4-12` textual form.
    pub const HYPHENATED_LEN: usize = 36;
    /// Length of the unhyphenated textual form.
    pub const SIMPLE_LEN: usize = 32;

    const HYPHEN_POSITIONS: [usize; 4] = [8, 13, 18, 23];

    /// Builds an identifier from its variable components.
    ///
    /// Version and variant bits are always set to their fixed values. Inputs
    /// wider than their field are truncated to the field width.
    #[must_use]
    pub const fn from_components(timestamp: u64, counter: u16, random: u64) -> Self {
        let t = ((timestamp & Self::TIMESTAMP_MASK) as u128) << Self::TIMESTAMP_SHIFT;
        let v = (Self::VERSION as u128) << Self::VERSION_SHIFT;
        let c = ((counter & Self::COUNTER_MASK) as u128) << Self::COUNTER_SHIFT;
        let var = (Self::VARIANT as u128) << Self::VARIANT_SHIFT;
        let r = ((random & Self::RANDOM_MASK) as u128) << Self::RANDOM_SHIFT;
        Self {
            id: t | v | c | var | r,
        }
    }

    /// Extracts the millisecond timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> u64 {
        (self.id >> Self::TIMESTAMP_SHIFT) as u64 & Self::TIMESTAMP_MASK
    }

    /// Extracts the version nibble.
    #[must_use]
    pub const fn version(&self) -> u8 {
        (self.id >> Self::VERSION_SHIFT) as u8 & Self::VERSION_MASK
    }

    /// Extracts the 12-bit counter.
    #[must_use]
    pub const fn counter(&self) -> u16 {
        (self.id >> Self::COUNTER_SHIFT) as u16 & Self::COUNTER_MASK
    }

    /// Extracts the two variant bits.
    #[must_use]
    pub const fn variant(&self) -> u8 {
        (self.id >> Self::VARIANT_SHIFT) as u8 & Self::VARIANT_MASK
    }

    /// Extracts the 62-bit random tail.
    #[must_use]
    pub const fn random(&self) -> u64 {
        (self.id >> Self::RANDOM_SHIFT) as u64 & Self::RANDOM_MASK
    }

    /// Returns `true` if the version and variant bits hold their fixed values.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.version() == Self::VERSION && self.variant() == Self::VARIANT
    }

    /// The most significant 64 bits (timestamp, version, counter).
    #[must_use]
    pub const fn most_significant_bits(&self) -> u64 {
        (self.id >> 64) as u64
    }

    /// The least significant 64 bits (variant, random).
    #[must_use]
    pub const fn least_significant_bits(&self) -> u64 {
        self.id as u64
    }

    /// Builds an identifier from its high and low halves.
    #[must_use]
    pub const fn from_u64_pair(msb: u64, lsb: u64) -> Self {
        Self {
            id: ((msb as u128) << 64) | lsb as u128,
        }
    }

    /// Converts this type into its raw type representation.
    #[must_use]
    pub const fn to_raw(&self) -> u128 {
        self.id
    }

    /// Converts a raw type into this type.
    #[must_use]
    pub const fn from_raw(raw: u128) -> Self {
        Self { id: raw }
    }

    /// Returns the 16 big-endian bytes of the identifier.
    #[must_use]
    pub const fn to_bytes(&self) -> [u8; 16] {
        self.id.to_be_bytes()
    }

    /// Reads an identifier from 16 big-endian bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self {
            id: u128::from_be_bytes(bytes),
        }
    }

    /// Parses the hyphenated (`8-4-4-4-12`) or simple (32 hex digit) form.
    /// Hex digits may be upper or lower case.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLength`] for inputs of any other length,
    /// [`Error::MissingHyphen`] when a group separator is absent, and
    /// [`Error::InvalidCharacter`] for non-hex digits.
    pub fn parse_str(s: &str) -> Result<Self> {
        let bytes = s.as_bytes();
        let hyphenated = match bytes.len() {
            Self::HYPHENATED_LEN => true,
            Self::SIMPLE_LEN => false,
            len => return Err(Error::InvalidLength { len }),
        };

        let mut raw = 0_u128;
        for (index, &byte) in bytes.iter().enumerate() {
            if hyphenated && Self::HYPHEN_POSITIONS.contains(&index) {
                if byte != b'-' {
                    return Err(Error::MissingHyphen { index });
                }
                continue;
            }
            let nibble = match byte {
                b'0'..=b'9' => byte - b'0',
                b'a'..=b'f' => byte - b'a' + 10,
                b'A'..=b'F' => byte - b'A' + 10,
                _ => return Err(Error::InvalidCharacter { index }),
            };
            raw = (raw << 4) | u128::from(nibble);
        }

        Ok(Self::from_raw(raw))
    }
}

const _: () = {
    // Compile-time check: the fields must cover the backing integer exactly.
    assert!(
        Uuid::TIMESTAMP_BITS
            + Uuid::VERSION_BITS
            + Uuid::COUNTER_BITS
            + Uuid::VARIANT_BITS
            + Uuid::RANDOM_BITS
            == u128::BITS,
        "Layout must match underlying type width"
    );
};

impl From<Uuid> for u128 {
    fn from(id: Uuid) -> Self {
        id.to_raw()
    }
}

impl From<u128> for Uuid {
    fn from(raw: u128) -> Self {
        Self::from_raw(raw)
    }
}

impl From<Uuid> for [u8; 16] {
    fn from(id: Uuid) -> Self {
        id.to_bytes()
    }
}

impl From<[u8; 16]> for Uuid {
    fn from(bytes: [u8; 16]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl FromStr for Uuid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_str(s)
    }
}

impl fmt::Display for Uuid {
    /// Writes the canonical lowercase `8-4-4-4-12` form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.id;
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
            (id >> 96) as u32,
            (id >> 80) as u16,
            (id >> 64) as u16,
            (id >> 48) as u16,
            id as u64 & 0xFFFF_FFFF_FFFF,
        )
    }
}

impl fmt::LowerHex for Uuid {
    /// Writes the 32-digit unhyphenated form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.id)
    }
}

impl fmt::Debug for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Uuid")
            .field("id", &format_args!("{self}"))
            .field("timestamp", &self.timestamp())
            .field("counter", &self.counter())
            .field("random", &self.random())
            .finish()
    }
}
