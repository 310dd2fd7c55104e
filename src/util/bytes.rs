//! Byte-order primitives shared by every parser in the crate.
//!
//! All persisted and on-wire structures handled here are little-endian unless
//! the helper name says otherwise (SCSI pages are big-endian). Structures are
//! always assembled and disassembled field by field; nothing is cast over a
//! raw buffer.

/// Extract an integer from `raw`, treating the byte at `msb` as most
/// significant and walking one byte at a time toward `lsb`.
///
/// `msb > lsb` reads a little-endian field (the usual case for ATA raw
/// attribute bytes), `msb < lsb` reads a big-endian one. An empty slice yields
/// 0 and a range lying entirely outside `raw` yields `u64::MAX`. Ranges wider
/// than eight bytes keep the eight bytes nearest `lsb`.
pub fn bytes_to_u64(raw: &[u8], msb: usize, lsb: usize) -> u64 {
    if raw.is_empty() {
        return 0;
    }
    let last = raw.len() - 1;
    if msb > last && lsb > last {
        return u64::MAX;
    }
    let msb = msb.min(last);
    let lsb = lsb.min(last);

    let mut value = 0u64;
    if msb >= lsb {
        let msb = msb.min(lsb + 7);
        for i in (lsb..=msb).rev() {
            value = (value << 8) | u64::from(raw[i]);
        }
    } else {
        let msb = msb.max(lsb.saturating_sub(7));
        for b in &raw[msb..=lsb] {
            value = (value << 8) | u64::from(*b);
        }
    }
    value
}

pub fn le_u16(buf: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([buf[off], buf[off + 1]])
}

pub fn le_u32(buf: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
}

pub fn le_u64(buf: &[u8], off: usize) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&buf[off..off + 8]);
    u64::from_le_bytes(b)
}

/// 128-bit little-endian counter as used by the NVMe SMART / health page.
pub fn le_u128(buf: &[u8], off: usize) -> u128 {
    let mut b = [0u8; 16];
    b.copy_from_slice(&buf[off..off + 16]);
    u128::from_le_bytes(b)
}

pub fn be_u16(buf: &[u8], off: usize) -> u16 {
    u16::from_be_bytes([buf[off], buf[off + 1]])
}

pub fn be_u32(buf: &[u8], off: usize) -> u32 {
    u32::from_be_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
}

pub fn put_le_u16(buf: &mut [u8], off: usize, v: u16) {
    buf[off..off + 2].copy_from_slice(&v.to_le_bytes());
}

pub fn put_le_u32(buf: &mut [u8], off: usize, v: u32) {
    buf[off..off + 4].copy_from_slice(&v.to_le_bytes());
}

pub fn put_le_u64(buf: &mut [u8], off: usize, v: u64) {
    buf[off..off + 8].copy_from_slice(&v.to_le_bytes());
}

pub fn put_be_u16(buf: &mut [u8], off: usize, v: u16) {
    buf[off..off + 2].copy_from_slice(&v.to_be_bytes());
}

pub fn put_be_u32(buf: &mut [u8], off: usize, v: u32) {
    buf[off..off + 4].copy_from_slice(&v.to_be_bytes());
}

/// Copy `text` into `buf[off..off + width]`, space padding on the right and
/// truncating anything longer than `width`.
pub fn put_padded_ascii(buf: &mut [u8], off: usize, width: usize, text: &str) {
    let field = &mut buf[off..off + width];
    field.fill(b' ');
    for (dst, src) in field.iter_mut().zip(text.bytes()) {
        *dst = src;
    }
}

/// Read a space/NUL padded ASCII field, trimming padding on both ends.
pub fn ascii_field(buf: &[u8], off: usize, width: usize) -> String {
    buf[off..off + width]
        .iter()
        .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { ' ' })
        .collect::<String>()
        .trim()
        .to_string()
}

/// ATA IDENTIFY strings store each pair of characters byte-swapped.
pub fn ata_string(buf: &[u8], off: usize, width: usize) -> String {
    buf[off..off + width]
        .chunks_exact(2)
        .flat_map(|pair| [pair[1], pair[0]])
        .map(|b| if b.is_ascii_graphic() || b == b' ' { b as char } else { ' ' })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Round `n` up to the next multiple of `align` (a power of two).
pub fn round_up(n: u64, align: u64) -> u64 {
    (n + align - 1) & !(align - 1)
}

/// True when the 8-bit sum of `page` is zero.
pub fn checksum_ok(page: &[u8]) -> bool {
    page.iter().fold(0u8, |acc, b| acc.wrapping_add(*b)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_little_endian_range() {
        let raw = [0x34, 0x12, 0x00, 0x00, 0x05, 0x00, 0x00];
        assert_eq!(bytes_to_u64(&raw, 1, 0), 0x1234);
        assert_eq!(bytes_to_u64(&raw, 3, 0), 0x1234);
        assert_eq!(bytes_to_u64(&raw, 5, 4), 5);
        assert_eq!(bytes_to_u64(&raw, 0, 0), 0x34);
    }

    #[test]
    fn reversed_indices_read_big_endian() {
        let raw = [0x12, 0x34, 0x56];
        assert_eq!(bytes_to_u64(&raw, 0, 2), 0x123456);
        assert_eq!(bytes_to_u64(&raw, 2, 0), 0x563412);
    }

    #[test]
    fn degenerate_ranges() {
        assert_eq!(bytes_to_u64(&[], 3, 0), 0);
        assert_eq!(bytes_to_u64(&[1, 2, 3], 9, 8), u64::MAX);
        // partially out of range is clamped to the slice
        assert_eq!(bytes_to_u64(&[1, 2, 3], 9, 1), 0x0302);
    }

    #[test]
    fn padded_ascii_round_trips() {
        let mut buf = [0u8; 12];
        put_padded_ascii(&mut buf, 2, 8, "FARM");
        assert_eq!(&buf[2..10], b"FARM    ");
        assert_eq!(ascii_field(&buf, 2, 8), "FARM");
        put_padded_ascii(&mut buf, 0, 4, "TOOLONG");
        assert_eq!(&buf[0..4], b"TOOL");
    }

    #[test]
    fn ata_strings_are_byte_swapped() {
        let raw = b"TSM0 0  ";
        assert_eq!(ata_string(raw, 0, 8), "ST0M0");
    }

    #[test]
    fn rounding_and_checksum() {
        assert_eq!(round_up(480, 512), 512);
        assert_eq!(round_up(512, 512), 512);
        assert_eq!(round_up(0, 512), 0);
        let mut page = [0u8; 512];
        page[0] = 1;
        page[511] = 0xFF;
        assert!(checksum_ok(&page));
        page[3] = 1;
        assert!(!checksum_ok(&page));
    }
}
