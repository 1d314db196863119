//! Parallel fan-out for scoring passes.
//!
//! Scoring is the only parallel phase: workers read the entity graph and
//! write nothing but the classifier cache, so they run unconstrained on
//! the rayon pool. Committing happens afterwards on the caller's thread.

use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;

use crate::errors::Result;

/// Progress receiver: called with the completed fraction in [0, 1].
pub type Progress<'a> = &'a (dyn Fn(f64) + Sync);

/// No-op progress receiver for callers that don't report.
pub fn no_progress() -> Progress<'static> {
    fn noop(_: f64) {}
    static NOOP: &(dyn Fn(f64) + Sync) = &noop;
    NOOP
}

/// Run `worker` over every item of `work` on the thread pool.
///
/// Results come back in input order. Progress is reported roughly every
/// half percent of the work set; any worker error aborts the pass and
/// surfaces to the caller. Already-completed work is not undone.
pub fn run_in_parallel<T, R, W>(work: &[T], worker: W, progress: Progress) -> Result<Vec<R>>
where
    T: Sync,
    R: Send,
    W: Fn(&T) -> anyhow::Result<R> + Sync,
{
    if work.is_empty() {
        return Ok(Vec::new());
    }

    let items_done = AtomicUsize::new(0);
    let update_rate = (work.len() / 200).max(1);

    let results = work
        .par_iter()
        .map(|item| {
            let result = worker(item)?;
            let done = items_done.fetch_add(1, Ordering::Relaxed) + 1;

            if done % update_rate == 0 {
                progress(done as f64 / work.len() as f64);
            }

            Ok(result)
        })
        .collect::<anyhow::Result<Vec<R>>>()?;

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    #[test]
    fn empty_work_set_returns_immediately() {
        let calls = AtomicUsize::new(0);
        let results = run_in_parallel(
            &[] as &[u32],
            |_| {
                calls.fetch_add(1, Ordering::Relaxed);
                Ok(())
            },
            no_progress(),
        )
        .unwrap();

        assert!(results.is_empty());
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn results_preserve_input_order() {
        let work: Vec<u32> = (0..1000).collect();
        let results = run_in_parallel(&work, |&x| Ok(x * 2), no_progress()).unwrap();

        assert_eq!(results.len(), 1000);
        assert!(results.iter().enumerate().all(|(i, &r)| r == i as u32 * 2));
    }

    #[test]
    fn worker_failure_aborts_the_pass() {
        let work: Vec<u32> = (0..100).collect();
        let outcome = run_in_parallel(
            &work,
            |&x| {
                if x == 42 {
                    anyhow::bail!("worker exploded on {x}")
                }
                Ok(x)
            },
            no_progress(),
        );

        assert!(outcome.is_err());
    }

    #[test]
    fn progress_reaches_completion() {
        let reported = Mutex::new(Vec::new());
        let work: Vec<u32> = (0..400).collect();

        run_in_parallel(
            &work,
            |&x| Ok(x),
            &|fraction| reported.lock().unwrap().push(fraction),
        )
        .unwrap();

        let reported = reported.lock().unwrap();
        assert!(!reported.is_empty(), "progress should have been reported");
        assert!(reported.iter().any(|&f| (f - 1.0).abs() < f64::EPSILON));
    }
}
