//! Static division of work into contiguous batches.

/// Split `items` into at most `workers` contiguous batches of
/// `ceil(len / workers)` items each. The last batch may be shorter and
/// fewer batches are produced when there are fewer items than workers.
pub fn partition<T>(items: Vec<T>, workers: usize) -> Vec<Vec<T>> {
    if items.is_empty() {
        return Vec::new();
    }
    let size = items.len().div_ceil(workers.max(1));

    let mut batches = Vec::with_capacity(workers);
    let mut rest = items.into_iter().peekable();
    while rest.peek().is_some() {
        batches.push(rest.by_ref().take(size).collect());
    }
    batches
}
