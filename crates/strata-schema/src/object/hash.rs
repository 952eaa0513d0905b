/// 64-bit FNV-1a.
///
/// Persistent hashes must be identical across process runs and across
/// independently loaded schema snapshots, so a fixed-key hash is required
/// rather than the randomized std hasher.
pub(crate) struct Fnv64(u64);

const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const PRIME: u64 = 0x0000_0100_0000_01b3;

impl Fnv64 {
    pub(crate) fn new() -> Self {
        Self(OFFSET_BASIS)
    }

    pub(crate) fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.0 ^= u64::from(*byte);
            self.0 = self.0.wrapping_mul(PRIME);
        }
    }

    pub(crate) fn write_u8(&mut self, v: u8) {
        self.write(&[v]);
    }

    pub(crate) fn write_str(&mut self, v: &str) {
        // Length-prefixed so that adjacent strings cannot alias.
        self.write(&(v.len() as u64).to_le_bytes());
        self.write(v.as_bytes());
    }

    pub(crate) fn finish(&self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let mut a = Fnv64::new();
        a.write_str("std::str");
        let mut b = Fnv64::new();
        b.write_str("std::str");
        assert_eq!(a.finish(), b.finish());
    }

    #[test]
    fn length_prefix_prevents_aliasing() {
        let mut a = Fnv64::new();
        a.write_str("ab");
        a.write_str("c");
        let mut b = Fnv64::new();
        b.write_str("a");
        b.write_str("bc");
        assert_ne!(a.finish(), b.finish());
    }
}
