//! Index computation for salted tokens.
//!
//! The exchange ships five small integer functions to the browser. Each takes five salts
//! (in a fixed, per-function order) and yields one character position to strip from
//! the token. This module owns that argument-order table; the functions themselves are
//! supplied through [`IndexFunctions`] so the table can be exercised without the real
//! module.

use super::model::TokenIndices;
use crate::core::error::{AuthError, EngineError};
use std::fmt;

/// The five exported functions, in the order their results appear in [`TokenIndices`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFn {
    Cdx,
    Rdx,
    Bdx,
    Ndx,
    Mdx,
}

impl IndexFn {
    pub const ALL: [IndexFn; 5] = [
        IndexFn::Cdx,
        IndexFn::Rdx,
        IndexFn::Bdx,
        IndexFn::Ndx,
        IndexFn::Mdx,
    ];

    /// Export name inside the module.
    pub fn export_name(self) -> &'static str {
        match self {
            IndexFn::Cdx => "cdx",
            IndexFn::Rdx => "rdx",
            IndexFn::Bdx => "bdx",
            IndexFn::Ndx => "ndx",
            IndexFn::Mdx => "mdx",
        }
    }
}

impl fmt::Display for IndexFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.export_name())
    }
}

/// A table of five pure `(i32, i32, i32, i32, i32) -> i32` functions.
///
/// Implemented by [`WasmIndexFunctions`](super::wasm::WasmIndexFunctions) for the real
/// module. Calls never overlap for one token manager, but implementations must still
/// be `Send + Sync` because acquisitions run on spawned tasks.
pub trait IndexFunctions: Send + Sync {
    /// Invoke `func` with `args` exactly as given.
    fn call(&self, func: IndexFn, args: [i32; 5]) -> Result<i32, EngineError>;

    /// Free any runtime behind the table. Later calls may fail.
    fn release(&self) {}
}

/// Salt positions are 0-based: `[s1, s2, s3, s4, s5]` is `[0, 1, 2, 3, 4]`.
type Permutation = [usize; 5];

const ACCESS_ORDER: [(IndexFn, Permutation); 5] = [
    (IndexFn::Cdx, [0, 1, 2, 3, 4]),
    (IndexFn::Rdx, [0, 1, 3, 2, 4]),
    (IndexFn::Bdx, [0, 1, 3, 2, 4]),
    (IndexFn::Ndx, [0, 1, 3, 2, 4]),
    (IndexFn::Mdx, [0, 1, 3, 2, 4]),
];

const REFRESH_ORDER: [(IndexFn, Permutation); 5] = [
    (IndexFn::Cdx, [1, 0, 2, 4, 3]),
    (IndexFn::Rdx, [1, 0, 3, 2, 4]),
    (IndexFn::Bdx, [1, 0, 3, 2, 4]),
    (IndexFn::Ndx, [1, 0, 3, 2, 4]),
    (IndexFn::Mdx, [1, 0, 3, 2, 4]),
];

fn run_table(
    funcs: &dyn IndexFunctions,
    table: &[(IndexFn, Permutation); 5],
    salts: [i32; 5],
) -> Result<[i32; 5], AuthError> {
    let mut out = [0i32; 5];
    for (slot, (func, perm)) in out.iter_mut().zip(table.iter()) {
        let args = perm.map(|i| salts[i]);
        *slot = funcs
            .call(*func, args)
            .map_err(|source| AuthError::Engine {
                function: func.export_name(),
                source,
            })?;
    }
    Ok(out)
}

/// Compute the junk positions for both tokens of one response.
///
/// Any failing call aborts the whole computation; partial results are never returned.
pub fn compute_indices(
    funcs: &dyn IndexFunctions,
    salts: [i32; 5],
) -> Result<TokenIndices, AuthError> {
    let access = run_table(funcs, &ACCESS_ORDER, salts)?;
    let refresh = run_table(funcs, &REFRESH_ORDER, salts)?;
    Ok(TokenIndices { access, refresh })
}
