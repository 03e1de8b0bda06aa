//! Single-byte frame checksum.
//!
//! The checksum covers the payload only (frame type through the last
//! type-specific byte); the delimiter and length field are excluded.

/// Checksum for `payload`: `0xFF - (sum mod 256)`.
pub fn compute(payload: &[u8]) -> u8 {
    0xFF_u8.wrapping_sub(sum(payload))
}

/// Validate a payload followed by its checksum byte.
///
/// A correct checksum brings the byte sum to 0xFF, so the checksum of the
/// whole run is zero.
pub fn is_valid(payload_with_checksum: &[u8]) -> bool {
    compute(payload_with_checksum) == 0
}

fn sum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_of_local_command() {
        assert_eq!(compute(&[0x08, 0x01]), 0xF6);
        assert!(is_valid(&[0x08, 0x01, 0xF6]));
    }

    #[test]
    fn sum_wraps_modulo_256() {
        assert_eq!(compute(&[0xFF, 0xFF]), 0x01);
        assert_eq!(compute(&[0xFF]), 0x00);
        assert_eq!(compute(&[]), 0xFF);
    }

    #[test]
    fn appended_checksum_always_validates() {
        let payloads: [&[u8]; 4] = [
            b"",
            &[0x10, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF],
            b"TxData1B",
            &[0x7E, 0x7D, 0x11, 0x13, 0xFF, 0x00],
        ];
        for payload in payloads {
            let mut framed = payload.to_vec();
            framed.push(compute(payload));
            assert!(is_valid(&framed), "payload {payload:02x?}");
        }
    }

    #[test]
    fn any_single_bit_flip_invalidates() {
        let mut framed = vec![0x08, 0x01, b'N', b'D'];
        framed.push(compute(&framed));

        for index in 0..framed.len() {
            for bit in 0..8 {
                let mut corrupted = framed.clone();
                corrupted[index] ^= 1 << bit;
                assert!(!is_valid(&corrupted), "flip byte {index} bit {bit}");
            }
        }
    }
}
