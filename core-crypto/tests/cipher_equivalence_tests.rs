//! Both chunk cipher backends must agree byte for byte.

#![cfg(feature = "native-cipher")]

use bytes::Bytes;
use core_crypto::{
    derive_track_key, ChunkCipher, MasterSecret, NativeBlowfishCipher, SoftBlowfishCipher,
    STRIPE_IV,
};
use rand::{rngs::StdRng, Rng, RngCore, SeedableRng};

fn backends(key: &[u8], iv: [u8; 8]) -> (NativeBlowfishCipher, SoftBlowfishCipher) {
    (
        NativeBlowfishCipher::new(key, iv).unwrap(),
        SoftBlowfishCipher::new(key, iv).unwrap(),
    )
}

#[tokio::test]
async fn test_backends_agree_on_random_chunks() {
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for _ in 0..32 {
        let mut key = [0u8; 16];
        rng.fill_bytes(&mut key);
        let (native, soft) = backends(&key, STRIPE_IV);

        let blocks = rng.gen_range(1..=256);
        let mut chunk = vec![0u8; blocks * 8];
        rng.fill_bytes(&mut chunk);
        let chunk = Bytes::from(chunk);

        let a = native.decrypt_chunk(chunk.clone()).await.unwrap();
        let b = soft.decrypt_chunk(chunk).await.unwrap();
        assert_eq!(a, b);
    }
}

#[tokio::test]
async fn test_backends_agree_on_odd_key_lengths() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut chunk = vec![0u8; 2048];
    rng.fill_bytes(&mut chunk);
    let chunk = Bytes::from(chunk);

    for key_len in [4usize, 8, 13, 16, 32, 56] {
        let key: Vec<u8> = (0..key_len).map(|_| rng.gen()).collect();
        let (native, soft) = backends(&key, [9, 8, 7, 6, 5, 4, 3, 2]);

        assert_eq!(
            native.decrypt_chunk(chunk.clone()).await.unwrap(),
            soft.decrypt_chunk(chunk.clone()).await.unwrap(),
            "key length {}",
            key_len
        );
    }
}

#[tokio::test]
async fn test_backends_agree_on_derived_track_key() {
    let secret = MasterSecret::new("0123456789abcdef").unwrap();
    let key = derive_track_key("3135556", &secret).unwrap();
    let (native, soft) = backends(key.as_bytes(), STRIPE_IV);

    let chunk = Bytes::from((0..2048u32).map(|i| (i * 31 % 251) as u8).collect::<Vec<_>>());

    assert_eq!(
        native.decrypt_chunk(chunk.clone()).await.unwrap(),
        soft.decrypt_chunk(chunk).await.unwrap()
    );
}

#[tokio::test]
async fn test_backends_reject_the_same_inputs() {
    let (native, soft) = backends(&[3u8; 16], STRIPE_IV);

    for len in [0usize, 1, 9, 2049] {
        let chunk = Bytes::from(vec![0u8; len]);
        assert_eq!(
            native.decrypt_chunk(chunk.clone()).await.unwrap_err(),
            soft.decrypt_chunk(chunk).await.unwrap_err()
        );
    }
}
