//! Streaming (symbol-at-a-time) oracle cache.
//!
//! A symbol-query oracle exposes the SUL one step at a time: `query` applies
//! a single input at the current position, `reset` returns to the initial
//! state. [`SymbolQueryCache`] sits in front of such an oracle and records
//! every observed transition in an incrementally grown Mealy automaton.
//!
//! As long as the walk since the last reset stayed inside the cache, the
//! delegate is not touched at all, not even for the reset. On the first
//! uncached symbol the delegate is reset and the cached trace replayed
//! (outputs discarded) to bring it to the cache's position; from then on the
//! walk is delegated and recorded.

use crate::alphabet::Alphabet;
use crate::mealy::{IncrementalMealy, INITIAL_STATE};
use std::hash::Hash;
use tracing::debug;

/// Oracle answering one symbol at a time from the current SUL position.
pub trait SymbolQueryOracle<I, O> {
    /// Apply `input` at the current position and return the emitted output.
    fn query(&mut self, input: &I) -> O;

    /// Return the SUL to its initial state.
    fn reset(&mut self);
}

/// Transition cache for a [`SymbolQueryOracle`]. Single-threaded by
/// contract: one walker, one cache.
pub struct SymbolQueryCache<I, O, D> {
    cache: IncrementalMealy<O>,
    alphabet: Alphabet<I>,
    delegate: D,
    current_state: u32,
    current_trace: Vec<I>,
    /// Whether `current_state` is consistent with the delegate's position.
    /// Starts out false: the delegate's position is unknown until the first
    /// [`reset`](Self::reset).
    trace_valid: bool,
}

impl<I, O, D> SymbolQueryCache<I, O, D>
where
    I: Eq + Hash + Clone,
    O: Eq + Clone,
    D: SymbolQueryOracle<I, O>,
{
    pub fn new(delegate: D, alphabet: Alphabet<I>) -> Self {
        let cache = IncrementalMealy::new(alphabet.len());
        SymbolQueryCache {
            cache,
            alphabet,
            delegate,
            current_state: INITIAL_STATE,
            current_trace: Vec::new(),
            trace_valid: false,
        }
    }

    /// Apply `input` at the current walk position.
    ///
    /// Answered from the cache when possible; otherwise the delegate is
    /// brought to the current position (reset + trace replay) and queried.
    ///
    /// # Panics
    ///
    /// Panics if `input` is not part of the alphabet.
    pub fn query(&mut self, input: &I) -> O {
        let index = match self.alphabet.index_of(input) {
            Some(index) => index,
            None => panic!("queried symbol is not part of the cache alphabet"),
        };

        if self.trace_valid {
            if let Some((successor, output)) = self.cache.successor(self.current_state, index) {
                let (successor, output) = (*successor, output.clone());
                self.current_trace.push(input.clone());
                self.current_state = successor;
                return output;
            }
            // First uncached symbol of this walk: move the delegate to the
            // cache's position, discarding the replay outputs.
            self.trace_valid = false;
            self.delegate.reset();
            debug!(replayed = self.current_trace.len(), "cache miss, replaying trace");
            for symbol in &self.current_trace {
                self.delegate.query(symbol);
            }
        }

        let output = self.delegate.query(input);
        let next = match self.cache.successor(self.current_state, index) {
            // Revisited a cached transition with an unverified trace; the
            // delegate must agree with the recording.
            Some((successor, cached)) => {
                debug_assert!(*cached == output, "delegate contradicts cached output");
                *successor
            }
            None => {
                let successor = self.cache.add_state();
                self.cache
                    .add_transition(self.current_state, index, successor, output.clone());
                successor
            }
        };
        self.current_state = next;
        output
    }

    /// Start a new walk from the initial state.
    ///
    /// The delegate is not reset here; that is deferred until the walk
    /// actually needs it (first cache miss).
    pub fn reset(&mut self) {
        self.current_state = INITIAL_STATE;
        self.current_trace.clear();
        self.trace_valid = true;
    }

    /// Number of states the cache automaton has grown to.
    pub fn cached_states(&self) -> u32 {
        self.cache.num_states()
    }
}
