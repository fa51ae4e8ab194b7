use std::fmt;

/// Lifetime of the values a provider produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    /// Built at most once per container and cached for its whole lifetime.
    Singleton,
    /// Built anew for every resolution that reaches the provider.
    Transient,
}

impl Scope {
    pub fn is_singleton(self) -> bool {
        matches!(self, Scope::Singleton)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Singleton => f.write_str("singleton"),
            Scope::Transient => f.write_str("transient"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_singleton_is_cached() {
        assert!(Scope::Singleton.is_singleton());
        assert!(!Scope::Transient.is_singleton());
    }
}
