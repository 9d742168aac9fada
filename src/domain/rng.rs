/// Level random number generator.
///
/// Two 8-bit counters mixed by a fixed shift/xor step, plus the blob
/// modifier. Replays store only the seed triple, so every step here must
/// match the reference sequence bit for bit.

use serde::Serialize;

pub const DEFAULT_BLOB_SEED: u8 = 0x55;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LevelRng {
    pub rng1: u8,
    pub rng2: u8,
    pub blob: u8,
    /// Blob modifier cycles 0..4 instead of the xor schedule.
    pub blob_4pat: bool,
}

impl Default for LevelRng {
    fn default() -> Self {
        LevelRng { rng1: 0, rng2: 0, blob: DEFAULT_BLOB_SEED, blob_4pat: false }
    }
}

impl LevelRng {
    pub fn new(rng_seed: u16, blob_seed: u8, blob_4pat: bool) -> Self {
        LevelRng {
            rng1: (rng_seed & 0xff) as u8,
            rng2: (rng_seed >> 8) as u8,
            blob: blob_seed,
            blob_4pat,
        }
    }

    pub fn random(&mut self) -> u8 {
        let mut n: i16 = (self.rng1 >> 2) as i16 - self.rng1 as i16;
        if self.rng1 & 0x02 == 0 {
            n -= 1;
        }
        self.rng1 = (self.rng1 >> 1) | (self.rng2 & 0x80);
        self.rng2 = (self.rng2 << 1) | (n & 0x01) as u8;
        self.rng1 ^ self.rng2
    }

    pub fn blob_mod(&mut self) -> u8 {
        if self.blob_4pat {
            self.blob = self.blob.wrapping_add(1) % 4;
        } else {
            let mut m = self.blob as u16 * 2;
            if m < 255 {
                m ^= 0x1d;
            }
            self.blob = (m & 0xff) as u8;
        }
        self.blob
    }
}
