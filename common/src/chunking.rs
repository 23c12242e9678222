//! Block-size bookkeeping shared between the backup pipeline and the
//! `VerifyConsistency` check in the recreate engine (spec §4.9 P5).

/// Number of blocks a blockset of the given total `length` decomposes into
/// under `blocksize`. A zero-length blockset still has zero blocks.
pub fn block_count_for_length(length: u64, blocksize: u64) -> u64 {
    if length == 0 {
        0
    } else {
        length.div_ceil(blocksize)
    }
}

/// Number of blocklist-hash entries a blockset needs (spec §3 invariant 5):
/// none or one hash for blocksets of at most `blocksize` bytes, otherwise
/// `ceil(block_count / hashes_per_block)`.
pub fn blocklist_hash_count(length: u64, blocksize: u64, hashes_per_block: u64) -> u64 {
    let blocks = block_count_for_length(length, blocksize);
    if blocks <= 1 {
        blocks.min(1)
    } else {
        blocks.div_ceil(hashes_per_block)
    }
}

/// The size of the chunk at `chunk_idx` (0-based) out of `total_chunks`
/// chunks covering a file of `file_size` bytes, each `chunk_size` bytes
/// except possibly the last.
pub fn calculate_chunk_size(
    chunk_idx: u64,
    total_chunks: u64,
    file_size: u64,
    chunk_size: u64,
) -> usize {
    if chunk_idx == total_chunks - 1 {
        let remaining = file_size - (chunk_idx * chunk_size);
        remaining as usize
    } else {
        chunk_size as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_chunk_size() {
        const CHUNK_SIZE: u64 = 1024;

        let file_size = 2048;
        assert_eq!(calculate_chunk_size(0, 2, file_size, CHUNK_SIZE), 1024);
        assert_eq!(calculate_chunk_size(1, 2, file_size, CHUNK_SIZE), 1024);

        let file_size = 2500;
        assert_eq!(calculate_chunk_size(0, 3, file_size, CHUNK_SIZE), 1024);
        assert_eq!(calculate_chunk_size(1, 3, file_size, CHUNK_SIZE), 1024);
        assert_eq!(calculate_chunk_size(2, 3, file_size, CHUNK_SIZE), 452);

        let file_size = 500;
        assert_eq!(calculate_chunk_size(0, 1, file_size, CHUNK_SIZE), 500);
    }

    #[test]
    fn block_counts_match_ceiling_division() {
        assert_eq!(block_count_for_length(0, 100), 0);
        assert_eq!(block_count_for_length(1, 100), 1);
        assert_eq!(block_count_for_length(100, 100), 1);
        assert_eq!(block_count_for_length(101, 100), 2);
    }

    #[test]
    fn blocklist_hash_counts_follow_invariant_5() {
        // At most one block: zero or one hash.
        assert_eq!(blocklist_hash_count(0, 100, 10), 0);
        assert_eq!(blocklist_hash_count(100, 100, 10), 1);
        // More than one block: ceil(blocks / hashes_per_block).
        assert_eq!(blocklist_hash_count(250, 100, 10), 1);
        assert_eq!(blocklist_hash_count(1050, 100, 10), 2);
    }
}
