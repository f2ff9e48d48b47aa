/// Internet checksum (RFC 1071) over `buffer`.
///
/// Words are summed big-endian, an odd trailing byte is padded with a zero low
/// byte, and carries are folded back into the low 16 bits before the one's
/// complement is taken. Store the result with `to_be_bytes`.
pub fn checksum(buffer: &[u8]) -> u16 {
    let mut sum = 0u64;

    let mut words = buffer.chunks_exact(2);
    for word in &mut words {
        sum += u64::from(u16::from_be_bytes([word[0], word[1]]));
    }
    if let [last] = words.remainder() {
        sum += u64::from(*last) << 8;
    }

    while (sum >> 16) > 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }

    !(sum as u16)
}

/// Computes the checksum of `buffer` with the checksum field at `offset`
/// zeroed, then writes it into that field.
pub fn write_checksum(buffer: &mut [u8], offset: usize) {
    buffer[offset] = 0;
    buffer[offset + 1] = 0;
    let sum = checksum(buffer);
    buffer[offset..offset + 2].copy_from_slice(&sum.to_be_bytes());
}

/// A buffer carrying a correct checksum sums to `0xffff`, so its checksum is zero.
pub fn verify(buffer: &[u8]) -> bool {
    checksum(buffer) == 0
}
