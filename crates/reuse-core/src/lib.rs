//! Prefix-sharing reuse cache for automata-learning membership-query oracles.
//!
//! A membership query runs an input word against the system under learning
//! (SUL) from its reset state and records the output word the run produced.
//! Each query costs one SUL reset plus one SUL step per symbol, and a
//! learning experiment issues millions of queries whose input words overlap
//! heavily in prefixes. This crate caches observed behavior in a
//! prefix-sharing tree ([`ReuseTree`]) whose nodes can additionally hold
//! *reusable system states*: opaque SUL configurations that let a new query
//! resume execution mid-run instead of replaying the shared prefix after a
//! reset.
//!
//! Two symbol classes enrich the tree with reflexive ("pumping") edges:
//! model-invariant inputs (e.g. idempotent reads that leave the SUL
//! unchanged) and failure outputs (the SUL rolled back, e.g. an aborted
//! transaction). Once one occurrence is observed, any repetition of that
//! transition at the same node is answered from cache without touching the
//! SUL.
//!
//! [`ReuseOracle`] is the membership-oracle façade combining the tree with a
//! [`ReuseCapableOracle`] SUL driver. [`SymbolQueryCache`] is an independent
//! front-end for symbol-at-a-time oracles, backed by an incrementally grown
//! Mealy automaton.

pub mod alphabet;
pub mod error;
pub mod mealy;
pub mod node;
pub mod oracle;
pub mod symbol_cache;
pub mod tree;

pub use alphabet::Alphabet;
pub use error::{QueryError, ReuseError};
pub use node::{NodeResult, ReuseEdge, ReuseNode};
pub use oracle::{MealyQuery, QueryResult, ReuseCapableOracle, ReuseOracle};
pub use symbol_cache::{SymbolQueryCache, SymbolQueryOracle};
pub use tree::{ReuseTree, ReuseTreeBuilder};
