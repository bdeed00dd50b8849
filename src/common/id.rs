//! Kademlia Id of a peer or a lookup key
use rand::Rng;
use sha2::{Digest, Sha256};
use std::{
    fmt::{self, Debug, Display, Formatter},
    str::FromStr,
};

use crate::{Error, Result};

/// The size of kad ids in bytes.
pub const ID_SIZE: usize = 32;
/// The size of kad ids in bits.
pub const ID_BITS: usize = ID_SIZE * 8;

#[derive(Clone, Copy, PartialEq, Ord, PartialOrd, Eq, Hash)]
/// Kademlia Id, a coordinate in the XOR metric space.
///
/// Ordering is the unsigned big-endian ordering of the bytes, so comparing two
/// results of [Id::xor] compares distances.
pub struct Id(pub [u8; ID_SIZE]);

impl Id {
    pub fn random() -> Id {
        let mut rng = rand::thread_rng();
        let random_bytes: [u8; ID_SIZE] = rng.gen();

        Id(random_bytes)
    }

    /// Create a new Id from some bytes. Returns Err if `bytes` is not of length
    /// [ID_SIZE](crate::common::ID_SIZE).
    pub fn from_bytes<T: AsRef<[u8]>>(bytes: T) -> Result<Id> {
        let bytes = bytes.as_ref();
        if bytes.len() != ID_SIZE {
            return Err(Error::InvalidIdSize(bytes.len()));
        }

        let mut tmp: [u8; ID_SIZE] = [0; ID_SIZE];
        tmp[..ID_SIZE].clone_from_slice(&bytes[..ID_SIZE]);

        Ok(Id(tmp))
    }

    /// Derive the kad id of an arbitrary key, by hashing it with SHA-256.
    pub fn from_key<T: AsRef<[u8]>>(key: T) -> Id {
        let digest = Sha256::digest(key.as_ref());

        Id(digest.into())
    }

    /// XOR distance between this Id and another.
    pub fn xor(&self, other: &Id) -> Id {
        let mut result = [0_u8; ID_SIZE];

        for (i, byte) in result.iter_mut().enumerate() {
            *byte = self.0[i] ^ other.0[i];
        }

        Id(result)
    }

    /// Number of leading bits this Id shares with `other`.
    ///
    /// Shared prefix with self is [ID_BITS].
    pub fn common_prefix_len(&self, other: &Id) -> usize {
        for i in 0..ID_SIZE {
            let a = self.0[i];
            let b = other.0[i];

            if a != b {
                // leading zeros so far + leading zeros of this byte
                return i * 8 + (a ^ b).leading_zeros() as usize;
            }
        }

        ID_BITS
    }

    /// Returns `true` if the bit at `index` (0 is the most significant bit) is set.
    pub fn bit(&self, index: usize) -> bool {
        let byte = self.0[index / 8];

        byte & (0x80 >> (index % 8)) != 0
    }

    /// Return a copy of this Id with the bit at `index` flipped.
    pub fn flip_bit(&self, index: usize) -> Id {
        let mut bytes = self.0;
        bytes[index / 8] ^= 0x80 >> (index % 8);

        Id(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ID_SIZE] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }

        Ok(())
    }
}

impl Debug for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Id({self})")
    }
}

impl From<[u8; ID_SIZE]> for Id {
    fn from(bytes: [u8; ID_SIZE]) -> Id {
        Id(bytes)
    }
}

impl FromStr for Id {
    type Err = Error;

    fn from_str(s: &str) -> Result<Id> {
        if s.len() % 2 != 0 {
            return Err(Error::InvalidIdSize(s.len()));
        }

        let bytes = (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16))
            .collect::<std::result::Result<Vec<u8>, _>>()
            .map_err(|_| Error::Static("Invalid hex string"))?;

        Id::from_bytes(bytes)
    }
}
