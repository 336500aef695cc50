//! Bounded worker pool for independent transfer tasks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

/// Run `task` over every item on at most `concurrency` scoped threads.
///
/// Workers pull the next index from a shared counter, so a slow item never
/// holds up the queue behind it. Returns once every task has finished, with
/// results in item order. A panicking task is re-raised on the caller.
pub fn run_bounded<T, R, F>(items: &[T], concurrency: usize, task: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    if items.is_empty() {
        return Vec::new();
    }

    let workers = concurrency.clamp(1, items.len());
    let next = AtomicUsize::new(0);
    let (next, task) = (&next, &task);
    let mut slots: Vec<Option<R>> = items.iter().map(|_| None).collect();

    thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                scope.spawn(move || {
                    let mut done = Vec::new();
                    loop {
                        let idx = next.fetch_add(1, Ordering::Relaxed);
                        let Some(item) = items.get(idx) else {
                            break;
                        };
                        done.push((idx, task(item)));
                    }
                    done
                })
            })
            .collect();

        for handle in handles {
            match handle.join() {
                Ok(done) => {
                    for (idx, result) in done {
                        slots[idx] = Some(result);
                    }
                }
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
    });

    slots.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    #[test]
    fn test_results_in_item_order() {
        let items: Vec<u64> = (0..20).collect();
        let results = run_bounded(&items, 4, |n| {
            thread::sleep(Duration::from_millis(20 - n));
            n * 10
        });
        assert_eq!(results, items.iter().map(|n| n * 10).collect::<Vec<_>>());
    }

    #[test]
    fn test_concurrency_is_bounded() {
        let items: Vec<usize> = (0..12).collect();
        let active = AtomicUsize::new(0);
        let peak = Mutex::new(0usize);

        run_bounded(&items, 3, |_| {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            {
                let mut peak = peak.lock().unwrap();
                *peak = (*peak).max(now);
            }
            thread::sleep(Duration::from_millis(10));
            active.fetch_sub(1, Ordering::SeqCst);
        });

        let peak = peak.into_inner().unwrap();
        assert!(peak >= 1 && peak <= 3, "peak was {}", peak);
    }

    #[test]
    fn test_empty_and_zero_concurrency() {
        let none: Vec<i32> = run_bounded(&[] as &[i32], 4, |n| *n);
        assert!(none.is_empty());

        let results = run_bounded(&[1, 2, 3], 0, |n| n + 1);
        assert_eq!(results, vec![2, 3, 4]);
    }

    #[test]
    fn test_every_item_runs_once() {
        let items: Vec<usize> = (0..50).collect();
        let seen = Mutex::new(Vec::new());
        run_bounded(&items, 8, |n| seen.lock().unwrap().push(*n));

        let mut seen = seen.into_inner().unwrap();
        seen.sort_unstable();
        assert_eq!(seen, items);
    }
}
