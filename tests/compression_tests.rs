// Compression Tests for DocStore
// These tests exercise the LZ4 block codec through its public API

use docstore::compress::{compress, decompress, CompressionMode};
use proptest::prelude::*;
use rand::Rng;

const MODES: [CompressionMode; 2] = [CompressionMode::Fast, CompressionMode::High];

/// Walk an LZ4 block and check the sequence layout, returning the decoded length.
fn validate_block(block: &[u8]) -> usize {
    let mut pos = 0;
    let mut produced = 0usize;
    let mut last_match_end = 0usize;
    let mut last_match_start = 0usize;
    let mut last_distance = 0usize;

    let read_len = |pos: &mut usize, mut len: usize| {
        if len == 15 {
            loop {
                let b = block[*pos];
                *pos += 1;
                len += b as usize;
                if b != 255 {
                    break;
                }
            }
        }
        len
    };

    loop {
        let token = block[pos];
        pos += 1;
        let literals = read_len(&mut pos, (token >> 4) as usize);
        pos += literals;
        produced += literals;
        assert!(pos <= block.len(), "literals run past the block");

        if pos == block.len() {
            // the block ends with a literal-only sequence
            assert_eq!(token & 0x0F, 0);
            break;
        }

        let distance = u16::from_le_bytes([block[pos], block[pos + 1]]) as usize;
        pos += 2;
        assert!(distance > 0 && distance <= produced, "bad distance {}", distance);
        // matches are extended as far as they go, so a match never resumes the previous one
        assert!(
            literals > 0 || distance != last_distance,
            "match at {} continues the previous match",
            produced
        );
        last_distance = distance;

        let match_len = read_len(&mut pos, (token & 0x0F) as usize) + 4;
        last_match_start = produced;
        produced += match_len;
        last_match_end = produced;
    }

    if last_match_end > 0 {
        assert!(produced - last_match_end >= 5, "last 5 bytes must be literals");
        assert!(produced - last_match_start >= 12, "last match starts too close to the end");
    }
    produced
}

fn text_like(len: usize) -> Vec<u8> {
    let words: [&[u8]; 8] = [b"lorem ", b"ipsum ", b"dolor ", b"sit ", b"amet ", b"stored ", b"field ", b"chunk "];
    let mut rng = rand::rng();
    let mut data = Vec::with_capacity(len + 8);
    while data.len() < len {
        data.extend_from_slice(words[rng.random_range(0..words.len())]);
    }
    data.truncate(len);
    data
}

#[test]
fn test_empty_input() {
    for mode in MODES {
        let compressed = compress(&[], mode);
        assert_eq!(compressed, vec![0u8]);
        assert!(decompress(&compressed, 0, 0, 0).unwrap().is_empty());
    }
}

#[test]
fn test_short_inputs_are_literals() {
    for len in 1..=12 {
        let data = vec![b'a'; len];
        for mode in MODES {
            let compressed = compress(&data, mode);
            // too short for any match
            assert_eq!(compressed.len(), 1 + len);
            assert_eq!(decompress(&compressed, len, 0, len).unwrap(), data);
        }
    }
}

#[test]
fn test_long_run() {
    let data = vec![0x42u8; 100_000];
    for mode in MODES {
        let compressed = compress(&data, mode);
        assert!(compressed.len() < 1_000, "run compressed to {} bytes", compressed.len());
        assert_eq!(validate_block(&compressed), data.len());
        assert_eq!(decompress(&compressed, data.len(), 0, data.len()).unwrap(), data);
    }
}

#[test]
fn test_long_matches_are_not_split() {
    // periodic data yields one long match per period change
    let mut data = b"0123456789abcdef".repeat(2_000);
    data.extend_from_slice(&b"zyxwvutsrq".repeat(3_000));
    for mode in MODES {
        let compressed = compress(&data, mode);
        assert_eq!(validate_block(&compressed), data.len());
        assert!(compressed.len() < 400, "{:?} block is {} bytes", mode, compressed.len());
    }
}

#[test]
fn test_matches_near_window_limit() {
    // a repeat 65535 bytes back is the farthest reachable one
    let mut rng = rand::rng();
    let mut unique: Vec<u8> = (0..65_535).map(|_| rng.random()).collect();
    let head: Vec<u8> = unique[..64].to_vec();
    unique.extend_from_slice(&head);
    unique.extend_from_slice(&[0u8; 32]);

    for mode in MODES {
        let compressed = compress(&unique, mode);
        assert_eq!(validate_block(&compressed), unique.len());
        assert_eq!(decompress(&compressed, unique.len(), 0, unique.len()).unwrap(), unique);
    }
}

#[test]
fn test_high_compresses_text_better() {
    let data = text_like(64 * 1024);
    let fast = compress(&data, CompressionMode::Fast);
    let high = compress(&data, CompressionMode::High);
    assert!(high.len() <= fast.len());
    assert!(fast.len() < data.len() / 2);
}

#[test]
fn test_reference_decoder_agrees() {
    for len in [13, 100, 4096, 60 * 1024] {
        let data = text_like(len);
        for mode in MODES {
            let compressed = compress(&data, mode);
            let reference = lz4_flex::block::decompress(&compressed, data.len()).unwrap();
            assert_eq!(reference, data, "{:?} block of {} bytes", mode, len);
        }
    }
}

#[test]
fn test_truncated_block_fails() {
    let data = text_like(10_000);
    let compressed = compress(&data, CompressionMode::Fast);
    let truncated = &compressed[..compressed.len() / 2];
    let err = decompress(truncated, data.len(), 0, data.len()).unwrap_err();
    assert!(err.is_corruption(), "{}", err);
}

#[test]
fn test_wrong_original_length_fails() {
    let data = text_like(5_000);
    let compressed = compress(&data, CompressionMode::High);
    assert!(decompress(&compressed, data.len() - 1, 0, data.len() - 1).is_err());
    assert!(decompress(&compressed, data.len() + 1, 0, data.len() + 1).is_err());
}

#[test]
fn test_invalid_range_rejected() {
    let data = text_like(100);
    let compressed = compress(&data, CompressionMode::Fast);
    assert!(decompress(&compressed, 100, 90, 20).is_err());
    assert!(decompress(&compressed, 100, usize::MAX, 2).is_err());
}

fn compressible() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        prop::collection::vec(0u8..4, 0..4096),
        prop::collection::vec(any::<u8>(), 0..2048),
        (prop::collection::vec(any::<u8>(), 1..64), 1usize..200).prop_map(|(unit, times)| unit.repeat(times)),
    ]
}

proptest! {
    #[test]
    fn prop_roundtrip(data in compressible()) {
        for mode in MODES {
            let compressed = compress(&data, mode);
            prop_assert_eq!(validate_block(&compressed), data.len());
            let restored = decompress(&compressed, data.len(), 0, data.len()).unwrap();
            prop_assert_eq!(&restored, &data);
        }
    }

    #[test]
    fn prop_partial_range(data in compressible(), a in any::<prop::sample::Index>(), b in any::<prop::sample::Index>()) {
        prop_assume!(!data.is_empty());
        let offset = a.index(data.len());
        let len = b.index(data.len() - offset + 1);
        for mode in MODES {
            let compressed = compress(&data, mode);
            let window = decompress(&compressed, data.len(), offset, len).unwrap();
            prop_assert_eq!(&window[..], &data[offset..offset + len]);
        }
    }

    #[test]
    fn prop_high_never_larger(data in compressible()) {
        let fast = compress(&data, CompressionMode::Fast);
        let high = compress(&data, CompressionMode::High);
        prop_assert!(high.len() <= fast.len());
    }

    #[test]
    fn prop_reference_decoder(data in compressible()) {
        prop_assume!(!data.is_empty());
        for mode in MODES {
            let compressed = compress(&data, mode);
            let reference = lz4_flex::block::decompress(&compressed, data.len()).unwrap();
            prop_assert_eq!(&reference, &data);
        }
    }
}
