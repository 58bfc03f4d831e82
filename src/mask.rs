use crate::error::Error;
use std::io::Write;

/// Outbound payloads are masked through a scratch buffer of this size, so a
/// large message never needs a second allocation of its own length.
pub(crate) const MASK_BUFFER_SIZE: usize = 1024;

/// XORs `buf` in place with the 4-byte key. `offset` is how far into the
/// payload the slice starts; carrying it between chunks keeps the rolling key
/// index aligned. Applying the same call twice restores the input.
pub(crate) fn apply_mask(buf: &mut [u8], key: [u8; 4], offset: usize) {
    for (i, byte) in buf.iter_mut().enumerate() {
        *byte ^= key[(offset + i) % 4];
    }
}

/// Masks `data` chunk by chunk through the fixed scratch buffer and writes
/// each chunk to the stream. The remainder after the full chunks is exactly
/// the tail of `data`, and the key index survives every chunk boundary.
pub(crate) fn write_masked<W: Write + ?Sized>(
    writer: &mut W,
    data: &[u8],
    key: [u8; 4],
) -> Result<(), Error> {
    let mut scratch = [0u8; MASK_BUFFER_SIZE];
    let mut offset = 0;

    for chunk in data.chunks(MASK_BUFFER_SIZE) {
        let masked = &mut scratch[..chunk.len()];
        masked.copy_from_slice(chunk);
        apply_mask(masked, key, offset);
        writer.write_all(masked)?;
        offset += chunk.len();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 251) as u8).collect()
    }

    #[test]
    fn masking_is_self_inverse() {
        let key = [0x37, 0xFA, 0x21, 0x3D];
        for len in [0, 1, 3, 4, 5, 125, 1000] {
            let original = payload(len);
            let mut masked = original.clone();
            apply_mask(&mut masked, key, 0);
            apply_mask(&mut masked, key, 0);
            assert_eq!(masked, original);
        }
    }

    #[test]
    fn offset_keeps_the_key_rolling() {
        let key = [1, 2, 3, 4];
        let original = payload(64);

        // Masking the halves separately with a carried offset must equal
        // masking the whole in one call.
        let mut whole = original.clone();
        apply_mask(&mut whole, key, 0);

        let mut split = original.clone();
        let (head, tail) = split.split_at_mut(31);
        apply_mask(head, key, 0);
        apply_mask(tail, key, 31);
        assert_eq!(split, whole);
    }

    #[test]
    fn write_masked_roundtrip_across_chunk_boundary() {
        let key = [0xA0, 0x0B, 0x5C, 0xD7];
        for len in [
            MASK_BUFFER_SIZE - 1,
            MASK_BUFFER_SIZE,
            MASK_BUFFER_SIZE + 1,
            3 * MASK_BUFFER_SIZE + 7,
        ] {
            let original = payload(len);
            let mut wire = Vec::new();
            write_masked(&mut wire, &original, key).unwrap();
            assert_eq!(wire.len(), len);

            apply_mask(&mut wire, key, 0);
            assert_eq!(wire, original);
        }
    }
}
