use derive_more::Display;

/// The endianness of each element in a stored chunk, either `big` or `little`.
///
/// N5 chunks are big endian and Zarr chunks are little endian.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Display)]
pub enum Endianness {
    /// Little endian.
    Little,

    /// Big endian.
    Big,
}

impl Endianness {
    /// Return true if the endianness matches the endianness of the CPU.
    #[must_use]
    pub fn is_native(self) -> bool {
        self == NATIVE_ENDIAN
    }
}

/// The endianness of the CPU.
pub const NATIVE_ENDIAN: Endianness = if cfg!(target_endian = "big") {
    Endianness::Big
} else {
    Endianness::Little
};

/// Convert the elements of `bytes` between native endianness and `endianness`.
///
/// This is a no-op for native endianness or single byte elements.
pub(crate) fn convert_endianness(bytes: &mut [u8], element_size: usize, endianness: Endianness) {
    if !endianness.is_native() && element_size > 1 {
        for element in bytes.chunks_exact_mut(element_size) {
            element.reverse();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endianness_conversion() {
        let mut bytes = 0x0102u16.to_ne_bytes().to_vec();
        bytes.extend(0x0304u16.to_ne_bytes());
        convert_endianness(&mut bytes, 2, Endianness::Big);
        assert_eq!(bytes, vec![1, 2, 3, 4]);
        convert_endianness(&mut bytes, 2, Endianness::Big);
        convert_endianness(&mut bytes, 2, Endianness::Little);
        assert_eq!(bytes, [0x0102u16.to_le_bytes(), 0x0304u16.to_le_bytes()].concat());
        let mut single = vec![1, 2, 3];
        convert_endianness(&mut single, 1, Endianness::Big);
        assert_eq!(single, vec![1, 2, 3]);
    }
}
