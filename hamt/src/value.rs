//! Convenience conversions between fixed-width value types and their little-endian byte encoding.

/// A value type with a natural fixed-width little-endian encoding: `u8`/`u16`/`u32`/`u64` and
/// their floating-point counterparts `f32`/`f64`.
///
/// [`crate::Builder::dump`] and [`crate::Reader::get`] use this trait so callers can work with
/// native numeric types instead of raw byte slices.
pub trait FixedWidthValue: Copy {
    /// Width of the encoded value, in bytes: one of 1, 2, 4, 8.
    const WIDTH: u8;

    /// Appends the little-endian encoding of `self` to `out`.
    fn write_le(self, out: &mut Vec<u8>);

    /// Decodes a value from the first `Self::WIDTH` bytes of `bytes`.
    ///
    /// `bytes` must be at least `Self::WIDTH` bytes long.
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_fixed_width_int {
    ($t:ty) => {
        impl FixedWidthValue for $t {
            const WIDTH: u8 = ::std::mem::size_of::<$t>() as u8;

            #[inline] fn write_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            #[inline] fn read_le(bytes: &[u8]) -> Self {
                let mut buf = [0u8; ::std::mem::size_of::<$t>()];
                buf.copy_from_slice(&bytes[..::std::mem::size_of::<$t>()]);
                <$t>::from_le_bytes(buf)
            }
        }
    };
}

impl_fixed_width_int!(u8);
impl_fixed_width_int!(u16);
impl_fixed_width_int!(u32);
impl_fixed_width_int!(u64);

impl FixedWidthValue for f32 {
    const WIDTH: u8 = 4;

    #[inline] fn write_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    #[inline] fn read_le(bytes: &[u8]) -> Self {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&bytes[..4]);
        f32::from_le_bytes(buf)
    }
}

impl FixedWidthValue for f64 {
    const WIDTH: u8 = 8;

    #[inline] fn write_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    #[inline] fn read_le(bytes: &[u8]) -> Self {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&bytes[..8]);
        f64::from_le_bytes(buf)
    }
}
