//! Splitting bulk submissions into transport-sized batches.

/// Partition `items` into consecutive chunks of at most `limit` items.
///
/// Order is preserved within and across chunks; only the last chunk may be
/// shorter than `limit`. An empty slice yields no chunks.
///
/// # Panics
///
/// Panics if `limit` is zero. The limit is always an internal constant, so a
/// zero here is a programming error rather than a runtime condition.
pub fn split<T>(items: &[T], limit: usize) -> Vec<&[T]> {
    assert!(limit > 0, "batch limit must be positive");
    items.chunks(limit).collect()
}
