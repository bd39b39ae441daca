//! Explicit cache state.

/// A derived value that is either current or needs rebuilding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Cached<T> {
    /// Matches the inputs it was built from.
    Fresh(T),
    /// Must be rebuilt before the next read.
    #[default]
    Stale,
}

impl<T> Cached<T> {
    /// Whether the value can be read without a rebuild.
    #[must_use]
    pub const fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh(_))
    }

    /// The value, if fresh.
    #[must_use]
    pub const fn get(&self) -> Option<&T> {
        match self {
            Self::Fresh(value) => Some(value),
            Self::Stale => None,
        }
    }

    /// Marks the value for rebuild.
    pub fn invalidate(&mut self) {
        *self = Self::Stale;
    }

    /// Returns the fresh value, building it with `build` first if stale.
    pub fn get_or_build(&mut self, build: impl FnOnce() -> T) -> T
    where
        T: Clone,
    {
        if let Self::Fresh(value) = self {
            return value.clone();
        }
        let value = build();
        *self = Self::Fresh(value.clone());
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_once_until_invalidated() {
        let mut cache = Cached::default();
        let mut builds = 0;

        assert_eq!(cache.get_or_build(|| { builds += 1; 7 }), 7);
        assert_eq!(cache.get_or_build(|| { builds += 1; 8 }), 7);
        assert_eq!(builds, 1);

        cache.invalidate();
        assert!(!cache.is_fresh());
        assert_eq!(cache.get_or_build(|| { builds += 1; 9 }), 9);
        assert_eq!(builds, 2);
    }

    #[test]
    fn stale_has_no_value() {
        let cache: Cached<u8> = Cached::Stale;
        assert_eq!(cache.get(), None);
    }
}
