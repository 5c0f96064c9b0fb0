//! CRC-8 (x^8 + x^2 + x + 1) as used by the AD3552R interface
use ::crc::{Algorithm, Crc};

/// CRC-8/SMBUS polynomial seeded with 0xA5
const CRC_8_AD3552R: Algorithm<u8> = Algorithm {
    width: 8,
    poly: 0x07,
    init: 0xA5,
    refin: false,
    refout: false,
    xorout: 0x00,
    check: 0x57,
    residue: 0x00,
};

pub(crate) const CRC_AD3552R: Crc<u8> = Crc::<u8>::new(&CRC_8_AD3552R);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_value() {
        assert_eq!(CRC_AD3552R.checksum(b"123456789"), CRC_8_AD3552R.check);
    }

    #[test]
    fn appending_crc_leaves_zero_remainder() {
        let frame = [0x36, 0x0B, 0xB8, 0x03, 0xE8];
        let crc = CRC_AD3552R.checksum(&frame);
        assert_eq!(crc, 0x9B);
        let mut with_crc = [0u8; 6];
        with_crc[..5].copy_from_slice(&frame);
        with_crc[5] = crc;
        assert_eq!(CRC_AD3552R.checksum(&with_crc), 0);
    }
}
