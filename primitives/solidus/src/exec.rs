//! Task execution for proof pipelines.
//!
//! The core never spawns threads of its own: every parallelizable unit (a
//! per-swap proof, a per-bit range proof, an independent verification) is
//! handed to an [`Executor`]. With a pool the tasks run on rayon workers;
//! without one they run inline on the caller's thread. Results always come
//! back in submission order, so observable behavior is identical either way.

use rayon::prelude::*;

use crate::error::CryptoError;

/// A boxed unit of proof work.
pub type Task<T> = Box<dyn FnOnce() -> T + Send>;

pub struct Executor {
    pool: Option<rayon::ThreadPool>,
}

impl Executor {
    /// Run every task inline on the caller's thread.
    pub fn inline() -> Self {
        Self { pool: None }
    }

    /// Run tasks on a dedicated rayon pool of `threads` workers.
    pub fn with_threads(threads: usize) -> Result<Self, CryptoError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|_| CryptoError::InvalidConfig("executor thread pool"))?;
        Ok(Self { pool: Some(pool) })
    }

    /// Execute all tasks, returning results in submission order.
    pub fn run_all<T: Send>(&self, tasks: Vec<Task<T>>) -> Vec<T> {
        match &self.pool {
            Some(pool) => pool.install(|| tasks.into_par_iter().map(|task| task()).collect()),
            None => tasks.into_iter().map(|task| task()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn squares(exec: &Executor) -> Vec<u64> {
        let tasks: Vec<Task<u64>> = (0..32u64).map(|i| Box::new(move || i * i) as _).collect();
        exec.run_all(tasks)
    }

    #[test]
    fn results_keep_submission_order() {
        let expected: Vec<u64> = (0..32).map(|i| i * i).collect();
        assert_eq!(squares(&Executor::inline()), expected);
        assert_eq!(
            squares(&Executor::with_threads(4).expect("pool")),
            expected
        );
    }
}
