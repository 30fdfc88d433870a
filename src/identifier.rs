//! Short identifiers for fleet instances.

use std::collections::HashSet;

use rand::distr::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::Identifier;

/// Length of every generated identifier.
pub const IDENTIFIER_LEN: usize = 8;

/// Pre-seeded into the used set so it can never be handed out.
pub const RESERVED_SENTINEL: &str = "pigeonhive";

/// Hands out identifiers that are unique for the generator's lifetime.
pub struct IdentifierGenerator<R = StdRng> {
    rng: R,
    used: HashSet<String>,
}

impl IdentifierGenerator<StdRng> {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }
}

impl Default for IdentifierGenerator<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> IdentifierGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        let mut used = HashSet::new();
        used.insert(RESERVED_SENTINEL.to_string());
        Self { rng, used }
    }

    /// Marks names that are already taken elsewhere, e.g. services that
    /// were created by an earlier run and are still in the cluster.
    pub fn with_reserved<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.used.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn next(&mut self) -> Identifier {
        loop {
            let candidate: String = (&mut self.rng)
                .sample_iter(Alphanumeric)
                .take(IDENTIFIER_LEN)
                .map(|b| char::from(b).to_ascii_lowercase())
                .collect();
            if self.used.insert(candidate.clone()) {
                return Identifier::new(candidate);
            }
        }
    }

    #[cfg(test)]
    fn issued_or_reserved(&self, name: &str) -> bool {
        self.used.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_short_lowercase_and_distinct() {
        let mut generator = IdentifierGenerator::with_rng(StdRng::seed_from_u64(42));
        let mut seen = HashSet::new();
        for _ in 0..5_000 {
            let id = generator.next();
            assert_eq!(id.as_str().len(), IDENTIFIER_LEN);
            assert!(id
                .as_str()
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
            assert_ne!(id.as_str(), RESERVED_SENTINEL);
            assert!(seen.insert(id), "identifier handed out twice");
        }
    }

    #[test]
    fn sentinel_is_reserved_from_the_start() {
        let generator = IdentifierGenerator::with_rng(StdRng::seed_from_u64(1));
        assert!(generator.issued_or_reserved(RESERVED_SENTINEL));
    }

    #[test]
    fn reserved_names_are_skipped() {
        let first = IdentifierGenerator::with_rng(StdRng::seed_from_u64(7)).next();

        // Same seed would produce the same first draw; reserving it forces a retry.
        let mut generator = IdentifierGenerator::with_rng(StdRng::seed_from_u64(7))
            .with_reserved([first.as_str()]);
        let second = generator.next();
        assert_ne!(first, second);
        assert!(generator.issued_or_reserved(second.as_str()));
    }
}
