//! Memoization, ordering, and duplicate-suppression wrappers.
//!
//! Each wrapper owns the function it wraps and its own cache; nothing is
//! shared between instances. Inputs are compared with `PartialEq`, which is
//! deep equality for the owned tuples callers pass in.
//!
//! - [`Memoize`]: time-boxed result cache, any number of distinct inputs.
//! - [`Latest`]: every outstanding call resolves to the most recently
//!   dispatched call's result.
//! - [`SkipDuplicate`]: single-slot cache keyed by the last input.

mod latest;
mod skip;
mod timed;

pub use latest::Latest;
pub use skip::SkipDuplicate;
pub use timed::{CacheEntry, Memoize};
