//! Membership-query façade over the reuse tree.
//!
//! [`ReuseOracle`] answers each query from the cheapest available source:
//! the cache itself, a SUL run resumed from a fetched system state (suffix
//! only, no reset), or a full SUL run. Every SUL run is inserted back into
//! the tree.
//!
//! Locking protocol: lookup and state fetch happen under the tree lock, the
//! SUL call happens outside it, and the insert re-acquires it. The driver is
//! shared by reference, so concurrent callers overlap only in the short tree
//! sections; their SUL runs proceed in parallel. Between fetch and insert
//! other threads may have grown the tree; the insert walks forward from the
//! fetched node and either matches the edges they created or fails
//! deterministically on a genuine output conflict.

use crate::error::QueryError;
use crate::tree::ReuseTree;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

/// Outcome of one SUL run: the produced output word plus the system state
/// the SUL ended in.
#[derive(Debug, Clone)]
pub struct QueryResult<S, O> {
    pub output: Vec<O>,
    pub new_state: S,
}

/// Driver for a SUL that can capture its configuration after a run and
/// resume execution from a captured configuration later.
///
/// Methods take `&self`: when a [`ReuseOracle`] is shared across threads the
/// driver is invoked concurrently, and it manages its own synchronization
/// (per-thread connections, a handle pool, or an internal lock).
pub trait ReuseCapableOracle<S, I, O> {
    type Error: std::error::Error;

    /// Reset the SUL and step it through `input`. The output has length
    /// `|input|`; `new_state` captures the final SUL configuration.
    fn process_query(&self, input: &[I]) -> Result<QueryResult<S, O>, Self::Error>;

    /// Resume the SUL from `state` and step it through `suffix`. The state
    /// is consumed; resuming from the same state twice is undefined.
    fn continue_query(&self, suffix: &[I], state: S) -> Result<QueryResult<S, O>, Self::Error>;
}

/// A membership query split into prefix and suffix. Only the suffix part of
/// the output is reported back; the prefix merely positions the SUL.
#[derive(Debug, Clone)]
pub struct MealyQuery<I> {
    pub prefix: Vec<I>,
    pub suffix: Vec<I>,
}

/// Membership-query oracle caching through a [`ReuseTree`].
///
/// Thread-safe: the tree sits behind a mutex that is never held across a
/// driver call, and the driver is shared by reference. Two threads querying
/// at the same time serialize only on the tree walks; their SUL runs overlap.
pub struct ReuseOracle<S, I, O, R> {
    tree: Mutex<ReuseTree<S, I, O>>,
    sul: R,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Tree invariants hold at every return point; a poisoned guard is usable.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S, I, O, R> ReuseOracle<S, I, O, R>
where
    I: Eq + Hash + Clone,
    O: Eq + Hash + Clone,
    R: ReuseCapableOracle<S, I, O>,
{
    pub fn new(tree: ReuseTree<S, I, O>, sul: R) -> Self {
        ReuseOracle {
            tree: Mutex::new(tree),
            sul,
        }
    }

    /// Run `f` on the tree under its lock. `f` must not call back into the
    /// oracle.
    pub fn with_tree<T>(&self, f: impl FnOnce(&mut ReuseTree<S, I, O>) -> T) -> T {
        f(&mut lock(&self.tree))
    }

    /// Consume the oracle, returning the tree and the driver.
    pub fn into_parts(self) -> (ReuseTree<S, I, O>, R) {
        (
            self.tree.into_inner().unwrap_or_else(PoisonError::into_inner),
            self.sul,
        )
    }

    /// Answer one membership query.
    ///
    /// Returns the cached output (full length) on a cache hit, the full run
    /// output when no system state was reusable, or the continuation-run
    /// output when one was: in that case the word covers only the suffix
    /// that actually ran, and the caller trims to the length it expects
    /// ([`process_queries`](Self::process_queries) does exactly that).
    pub fn process_query(&self, query: &[I]) -> Result<Vec<O>, QueryError<O, R::Error>> {
        let fetched = {
            let mut tree = lock(&self.tree);
            if let Some(output) = tree.get_output(query) {
                trace!(len = query.len(), "query answered from cache");
                return Ok(output);
            }
            tree.fetch_system_state(query)
        };

        match fetched {
            None => {
                let result = self.sul.process_query(query).map_err(QueryError::Sul)?;
                debug!(len = query.len(), "full SUL run");
                let output = result.output.clone();
                lock(&self.tree).insert(query, result)?;
                Ok(output)
            }
            Some(fetched) => {
                let suffix = &query[fetched.prefix_len..];
                let result = self
                    .sul
                    .continue_query(suffix, fetched.state)
                    .map_err(QueryError::Sul)?;
                debug!(
                    reused_prefix = fetched.prefix_len,
                    suffix_len = suffix.len(),
                    "SUL run resumed from stored state"
                );
                let output = result.output.clone();
                lock(&self.tree).insert_from(suffix, fetched.node, result)?;
                Ok(output)
            }
        }
    }

    /// Answer a batch of prefix/suffix queries, trimming each answer to its
    /// suffix length.
    pub fn process_queries(
        &self,
        queries: &[MealyQuery<I>],
    ) -> Result<Vec<Vec<O>>, QueryError<O, R::Error>> {
        queries
            .iter()
            .map(|query| {
                let input: Vec<I> = query
                    .prefix
                    .iter()
                    .chain(query.suffix.iter())
                    .cloned()
                    .collect();
                let output = self.process_query(&input)?;
                let cut = output.len().saturating_sub(query.suffix.len());
                Ok(output[cut..].to_vec())
            })
            .collect()
    }
}
