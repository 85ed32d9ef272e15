use std::fmt::Debug;
use voracious_radix_sort::RadixSort;

/// A fixed-width, totally ordered value stored back to back in record files.
///
/// Record files carry no header, footer or separators: a file of `n * SIZE`
/// bytes holds exactly `n` records, each encoded little-endian.
pub trait Record: Copy + Ord + Send + Sync + Debug + 'static {
    /// Width of one encoded record in bytes.
    const SIZE: usize;

    /// The encoded form, always exactly `SIZE` bytes.
    type Bytes: AsRef<[u8]>;

    fn encode(&self) -> Self::Bytes;

    /// Decodes one record. A window that is not exactly `SIZE` bytes long is
    /// a short read and yields `None`.
    fn decode(bytes: &[u8]) -> Option<Self>;

    /// Sorts `values` in memory by the natural order.
    fn sort_records(values: &mut [Self], _threads: usize) {
        values.sort_unstable();
    }
}

macro_rules! impl_record_for_primitive {
    ($($t:ty),*) => {
        $(
            impl Record for $t {
                const SIZE: usize = std::mem::size_of::<$t>();
                type Bytes = [u8; std::mem::size_of::<$t>()];

                #[inline]
                fn encode(&self) -> Self::Bytes {
                    self.to_le_bytes()
                }

                #[inline]
                fn decode(bytes: &[u8]) -> Option<Self> {
                    bytes.try_into().ok().map(<$t>::from_le_bytes)
                }

                fn sort_records(values: &mut [Self], threads: usize) {
                    if threads > 1 {
                        values.voracious_mt_sort(threads);
                    } else {
                        values.voracious_sort();
                    }
                }
            }
        )*
    };
}

impl_record_for_primitive!(u8, u16, u32, u64, u128, i8, i16, i32, i64, i128);

/// Number of whole records in `byte_len` bytes.
#[inline]
pub fn record_count<R: Record>(byte_len: u64) -> u64 {
    byte_len / R::SIZE as u64
}

/// Bytes past the last whole record, dropped on read.
#[inline]
pub fn trailing_bytes<R: Record>(byte_len: u64) -> u64 {
    byte_len % R::SIZE as u64
}

/// Decodes every whole record in `bytes`, returning the values and the number
/// of trailing bytes that could not form a record.
pub fn decode_all<R: Record>(bytes: &[u8]) -> (Vec<R>, usize) {
    let chunks = bytes.chunks_exact(R::SIZE);
    let remainder = chunks.remainder().len();
    let values = chunks.filter_map(R::decode).collect();
    (values, remainder)
}

pub fn encode_all<R: Record>(values: &[R]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(values.len() * R::SIZE);
    for value in values {
        bytes.extend_from_slice(value.encode().as_ref());
    }
    bytes
}
