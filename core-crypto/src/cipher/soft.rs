//! Self-contained Blowfish-CBC, for builds without the native backend.

use async_trait::async_trait;
use bytes::Bytes;

use super::tables::{P_INIT, S_INIT};
use super::{check_chunk_len, check_key_len, ChunkCipher, CipherBackend, BLOCK_SIZE};
use crate::error::Result;

const ROUNDS: usize = 16;

/// Keyed Blowfish state: the P-array and S-boxes after the key schedule.
#[derive(Clone)]
struct Blowfish {
    p: [u32; ROUNDS + 2],
    s: Box<[[u32; 256]; 4]>,
}

impl Blowfish {
    /// Standard key schedule. `key` must be 4 to 56 bytes.
    fn new(key: &[u8]) -> Self {
        let mut state = Self {
            p: P_INIT,
            s: Box::new(S_INIT),
        };

        let mut key_bytes = key.iter().copied().cycle();
        for p in state.p.iter_mut() {
            let mut word = 0u32;
            for _ in 0..4 {
                // `key` is never empty, so the cycle never ends.
                word = (word << 8) | u32::from(key_bytes.next().unwrap_or_default());
            }
            *p ^= word;
        }

        let (mut l, mut r) = (0u32, 0u32);
        for i in (0..ROUNDS + 2).step_by(2) {
            (l, r) = state.encrypt_block(l, r);
            state.p[i] = l;
            state.p[i + 1] = r;
        }
        for sbox in 0..4 {
            for i in (0..256).step_by(2) {
                (l, r) = state.encrypt_block(l, r);
                state.s[sbox][i] = l;
                state.s[sbox][i + 1] = r;
            }
        }

        state
    }

    #[inline]
    fn f(&self, x: u32) -> u32 {
        let [a, b, c, d] = x.to_be_bytes();
        (self.s[0][a as usize].wrapping_add(self.s[1][b as usize]) ^ self.s[2][c as usize])
            .wrapping_add(self.s[3][d as usize])
    }

    fn encrypt_block(&self, mut l: u32, mut r: u32) -> (u32, u32) {
        for i in (0..ROUNDS).step_by(2) {
            l ^= self.p[i];
            r ^= self.f(l);
            r ^= self.p[i + 1];
            l ^= self.f(r);
        }
        (r ^ self.p[ROUNDS + 1], l ^ self.p[ROUNDS])
    }

    fn decrypt_block(&self, mut l: u32, mut r: u32) -> (u32, u32) {
        for i in (3..ROUNDS + 2).rev().step_by(2) {
            l ^= self.p[i];
            r ^= self.f(l);
            r ^= self.p[i - 1];
            l ^= self.f(r);
        }
        (r ^ self.p[0], l ^ self.p[1])
    }
}

fn split_block(block: &[u8]) -> (u32, u32) {
    let mut l = [0u8; 4];
    let mut r = [0u8; 4];
    l.copy_from_slice(&block[..4]);
    r.copy_from_slice(&block[4..BLOCK_SIZE]);
    (u32::from_be_bytes(l), u32::from_be_bytes(r))
}

/// Blowfish-CBC implemented in this crate.
pub struct SoftBlowfishCipher {
    blowfish: Blowfish,
    iv: [u8; BLOCK_SIZE],
}

impl SoftBlowfishCipher {
    pub fn new(key: &[u8], iv: [u8; BLOCK_SIZE]) -> Result<Self> {
        check_key_len(key.len())?;
        Ok(Self {
            blowfish: Blowfish::new(key),
            iv,
        })
    }

    fn decrypt(&self, chunk: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(chunk.len());
        let mut prev = self.iv;

        for block in chunk.chunks_exact(BLOCK_SIZE) {
            let (l, r) = split_block(block);
            let (l, r) = self.blowfish.decrypt_block(l, r);

            let mut plain = [0u8; BLOCK_SIZE];
            plain[..4].copy_from_slice(&l.to_be_bytes());
            plain[4..].copy_from_slice(&r.to_be_bytes());
            for (p, c) in plain.iter_mut().zip(prev.iter()) {
                *p ^= c;
            }

            out.extend_from_slice(&plain);
            prev.copy_from_slice(block);
        }

        out
    }
}

#[async_trait]
impl ChunkCipher for SoftBlowfishCipher {
    fn backend(&self) -> CipherBackend {
        CipherBackend::Soft
    }

    async fn decrypt_chunk(&self, chunk: Bytes) -> Result<Bytes> {
        check_chunk_len(chunk.len())?;
        Ok(Bytes::from(self.decrypt(&chunk)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CryptoError;

    fn ecb_encrypt(key: &[u8], plaintext: [u8; 8]) -> [u8; 8] {
        let bf = Blowfish::new(key);
        let (l, r) = split_block(&plaintext);
        let (l, r) = bf.encrypt_block(l, r);
        let mut out = [0u8; 8];
        out[..4].copy_from_slice(&l.to_be_bytes());
        out[4..].copy_from_slice(&r.to_be_bytes());
        out
    }

    #[test]
    fn test_ecb_vector_zero_key() {
        assert_eq!(
            hex::encode(ecb_encrypt(&[0u8; 8], [0u8; 8])),
            "4ef997456198dd78"
        );
    }

    #[test]
    fn test_ecb_vector_ones_key() {
        assert_eq!(
            hex::encode(ecb_encrypt(&[0xffu8; 8], [0xffu8; 8])),
            "51866fd5b85ecb8a"
        );
    }

    #[test]
    fn test_block_round_trip() {
        let bf = Blowfish::new(b"stripe-key");
        let (l, r) = bf.encrypt_block(0x0123_4567, 0x89ab_cdef);
        assert_eq!(bf.decrypt_block(l, r), (0x0123_4567, 0x89ab_cdef));
    }

    #[tokio::test]
    async fn test_cbc_vector() {
        let key = hex::decode("0123456789ABCDEFF0E1D2C3B4A59687").unwrap();
        let iv = [0xfe, 0xdc, 0xba, 0x98, 0x76, 0x54, 0x32, 0x10];
        let ciphertext = hex::decode(
            "6b77b4d63006dee605b156e27403979358deb9e7154616d959f1652bd5ff92cc",
        )
        .unwrap();

        let cipher = SoftBlowfishCipher::new(&key, iv).unwrap();
        let plaintext = cipher.decrypt_chunk(Bytes::from(ciphertext)).await.unwrap();

        assert_eq!(&plaintext[..28], b"7654321 Now is the time for ");
        assert_eq!(&plaintext[28..], &[0, 0, 0, 0]);
    }

    #[tokio::test]
    async fn test_rejects_misaligned_and_empty_chunks() {
        let cipher = SoftBlowfishCipher::new(&[1u8; 16], [0u8; 8]).unwrap();
        for len in [0usize, 7, 2047] {
            let err = cipher
                .decrypt_chunk(Bytes::from(vec![0u8; len]))
                .await
                .unwrap_err();
            assert!(matches!(err, CryptoError::DecryptionFailed(_)), "len {}", len);
        }
    }

    #[test]
    fn test_rejects_bad_key_length() {
        assert!(matches!(
            SoftBlowfishCipher::new(&[], [0u8; 8]),
            Err(CryptoError::InvalidKeyLength(0))
        ));
        assert!(matches!(
            SoftBlowfishCipher::new(&[0u8; 57], [0u8; 8]),
            Err(CryptoError::InvalidKeyLength(57))
        ));
    }
}
