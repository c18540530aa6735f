//! File-size-based chunk sizing for the byte pump.
//!
//! Larger files get bigger read/write chunks — fewer round trips through
//! the async runtime per megabyte served, at the cost of a larger transient
//! buffer per in-flight transfer.

const KIB: usize = 1024;
const MIB: usize = 1024 * KIB;

const TINY_CHUNK: usize = 32 * KIB;
const SMALL_CHUNK: usize = 128 * KIB;
const MEDIUM_CHUNK: usize = 512 * KIB;
const LARGE_CHUNK: usize = 2 * MIB;

const SMALL_THRESHOLD: u64 = MIB as u64;
const MEDIUM_THRESHOLD: u64 = 32 * MIB as u64;
const LARGE_THRESHOLD: u64 = 256 * MIB as u64;

/// Pick a read/transfer chunk size for a resource of `total_size` bytes.
///
/// Unknown size (HTTP origin without `Content-Length`, e.g. chunked
/// transfer-encoding upstream) falls back to [`SMALL_CHUNK`] — big enough to
/// amortize syscall overhead, small enough not to over-buffer a resource
/// that might turn out to be tiny.
pub fn chunk_size_for(total_size: Option<u64>) -> usize {
    match total_size {
        None => SMALL_CHUNK,
        Some(size) if size < SMALL_THRESHOLD => TINY_CHUNK,
        Some(size) if size < MEDIUM_THRESHOLD => SMALL_CHUNK,
        Some(size) if size < LARGE_THRESHOLD => MEDIUM_CHUNK,
        Some(_) => LARGE_CHUNK,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_size_uses_small_chunk() {
        assert_eq!(chunk_size_for(None), SMALL_CHUNK);
    }

    #[test]
    fn tiny_file_uses_tiny_chunk() {
        assert_eq!(chunk_size_for(Some(500 * 1024)), TINY_CHUNK);
    }

    #[test]
    fn boundary_at_one_mib_uses_small_chunk() {
        assert_eq!(chunk_size_for(Some(MIB as u64)), SMALL_CHUNK);
    }

    #[test]
    fn mid_size_file_uses_medium_chunk() {
        assert_eq!(chunk_size_for(Some(100 * MIB as u64)), MEDIUM_CHUNK);
    }

    #[test]
    fn boundary_at_256_mib_uses_large_chunk() {
        assert_eq!(chunk_size_for(Some(LARGE_THRESHOLD)), LARGE_CHUNK);
    }

    #[test]
    fn huge_file_uses_large_chunk() {
        assert_eq!(chunk_size_for(Some(10 * 1024 * MIB as u64)), LARGE_CHUNK);
    }
}
