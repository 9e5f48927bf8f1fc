//! Scoped worker threads for CPU bound scoring across impressions.
//!
//! Scoring is pure, so a batch is split into contiguous chunks and each chunk
//! is handled by its own thread. Output order always matches input order.

use std::thread;

/// Apply `f` to every item using up to `workers` threads.
pub fn parallel_map<T, R, F>(items: &[T], workers: usize, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(usize, &T) -> R + Sync,
{
    let workers = workers.max(1).min(items.len());
    if workers <= 1 {
        return items.iter().enumerate().map(|(idx, item)| f(idx, item)).collect();
    }

    let chunk = items.len().div_ceil(workers);
    let f = &f;
    thread::scope(|scope| {
        let handles: Vec<_> = items
            .chunks(chunk)
            .enumerate()
            .map(|(n, slice)| {
                let offset = n * chunk;
                scope.spawn(move || {
                    slice
                        .iter()
                        .enumerate()
                        .map(|(idx, item)| f(offset + idx, item))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut out = Vec::with_capacity(items.len());
        for handle in handles {
            match handle.join() {
                Ok(part) => out.extend(part),
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_order_across_workers() {
        let items: Vec<u32> = (0..103).collect();
        let out = parallel_map(&items, 4, |idx, x| (idx, x * 2));
        assert_eq!(out.len(), items.len());
        for (i, (idx, doubled)) in out.into_iter().enumerate() {
            assert_eq!(idx, i);
            assert_eq!(doubled, items[i] * 2);
        }
    }

    #[test]
    fn handles_empty_and_single_worker() {
        let empty: Vec<u8> = Vec::new();
        assert!(parallel_map(&empty, 8, |_, x| *x).is_empty());
        assert_eq!(parallel_map(&[1, 2, 3], 0, |_, x| x + 1), vec![2, 3, 4]);
    }
}
