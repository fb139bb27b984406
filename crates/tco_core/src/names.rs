//! Fresh-name generation for the parameter binding table (B) and the loop
//! sentinel table (L).
//!
//! Both tables are keyed off a single random prefix, minted once per
//! decoration, with at least 64 bits of entropy so the synthesized names
//! cannot collide with anything in the original source. The sentinel prefix
//! is distinct from the parameter prefix so the two ranges can never
//! collide with each other either, independent of collisions with user
//! code.

use rand::RngCore;
use rustc_hash::FxHashSet;

/// Base-36 rendering of 64 random bits, prefixed with `_tco` so the result
/// is always a legal Python identifier even if the random digits happen to
/// start with something numeric-looking after encoding.
fn fresh_prefix(tag: &str) -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    let bits = u64::from_le_bytes(bytes);
    format!("_tco_{tag}_{bits:016x}")
}

/// All identifiers that lexically occur anywhere in the original function's
/// source. Used only to *prove* non-capture in debug assertions and tests;
/// the random prefix already makes a real collision astronomically
/// unlikely, so this is a cheap belt-and-suspenders check, not the primary
/// defense.
pub type SourceIdentifiers = FxHashSet<String>;

/// Mints a prefix that provably does not collide with any name in
/// `existing`, retrying with a fresh random draw in the (never expected to
/// trigger) event of a collision.
fn collision_free_prefix(tag: &str, existing: &SourceIdentifiers) -> String {
    loop {
        let prefix = fresh_prefix(tag);
        if !existing.iter().any(|name| name.contains(&prefix)) {
            return prefix;
        }
    }
}

/// Parameter binding table B: original parameter name -> fresh local name.
#[derive(Debug, Clone)]
pub struct ParamBindings {
    prefix: String,
    order: Vec<String>,
    hoisted: std::collections::HashMap<String, String>,
}

impl ParamBindings {
    pub fn new(params: &[String], existing: &SourceIdentifiers) -> Self {
        let prefix = collision_free_prefix("p", existing);
        let mut hoisted = std::collections::HashMap::with_capacity(params.len());
        for p in params {
            hoisted.insert(p.clone(), format!("{prefix}_{p}"));
        }
        Self {
            prefix,
            order: params.to_vec(),
            hoisted,
        }
    }

    /// The fresh local `hᵢ` that shadows original parameter `p`, if `p` is a
    /// declared parameter of the decorated function.
    pub fn hoisted_name(&self, param: &str) -> Option<&str> {
        self.hoisted.get(param).map(String::as_str)
    }

    pub fn params_in_order(&self) -> &[String] {
        &self.order
    }

    pub fn hoisted_in_order(&self) -> Vec<&str> {
        self.order
            .iter()
            .map(|p| self.hoisted_name(p).expect("every param was hoisted"))
            .collect()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

/// Loop sentinel table L: loop node identity -> fresh flag name.
///
/// Loops are identified by position (a simple incrementing counter assigned
/// during the transformer's single descent), since the transformer visits
/// each loop node exactly once and never needs to look one up out of order.
#[derive(Debug, Clone)]
pub struct LoopSentinels {
    prefix: String,
    next_id: u32,
}

impl LoopSentinels {
    pub fn new(existing: &SourceIdentifiers) -> Self {
        Self {
            prefix: collision_free_prefix("loop", existing),
            next_id: 0,
        }
    }

    /// Allocates a fresh sentinel flag name for the next loop encountered
    /// during descent.
    pub fn allocate(&mut self) -> String {
        let name = format!("{}_{}", self.prefix, self.next_id);
        self.next_id += 1;
        name
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_bindings_are_unique_per_decoration() {
        let existing = SourceIdentifiers::default();
        let a = ParamBindings::new(&["n".into(), "acc".into()], &existing);
        let b = ParamBindings::new(&["n".into(), "acc".into()], &existing);
        assert_ne!(a.prefix(), b.prefix());
        assert_ne!(a.hoisted_name("n"), b.hoisted_name("n"));
    }

    #[test]
    fn hoisted_name_only_defined_for_declared_params() {
        let existing = SourceIdentifiers::default();
        let b = ParamBindings::new(&["n".into()], &existing);
        assert!(b.hoisted_name("n").is_some());
        assert!(b.hoisted_name("other").is_none());
    }

    #[test]
    fn loop_sentinel_prefix_distinct_from_param_prefix() {
        let existing = SourceIdentifiers::default();
        let params = ParamBindings::new(&["n".into()], &existing);
        let loops = LoopSentinels::new(&existing);
        assert_ne!(params.prefix(), loops.prefix());
    }

    #[test]
    fn loop_sentinels_increment() {
        let existing = SourceIdentifiers::default();
        let mut loops = LoopSentinels::new(&existing);
        let a = loops.allocate();
        let b = loops.allocate();
        assert_ne!(a, b);
    }
}
