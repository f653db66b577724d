/// Types that carry a model-wide identifier and a display name.
pub trait HasIdentifier {
    fn identifier(&self) -> &str;

    /// Falls back to the identifier when no display name is set.
    fn display_name(&self) -> &str {
        self.identifier()
    }
}

impl<T: HasIdentifier + ?Sized> HasIdentifier for &T {
    fn identifier(&self) -> &str {
        (*self).identifier()
    }
    fn display_name(&self) -> &str {
        (*self).display_name()
    }
}

/// Sorting helpers for slices of `T: HasIdentifier`.
pub trait SortByIdentifier {
    /// Stable, ascending sort by identifier.
    fn sort_by_identifier(&mut self);
}

impl<T: HasIdentifier> SortByIdentifier for [T] {
    fn sort_by_identifier(&mut self) {
        self.sort_by(|a, b| a.identifier().cmp(b.identifier()));
    }
}

/// Returns the first identifier that appears more than once.
pub fn first_duplicate<'a, I>(ids: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = std::collections::HashSet::new();
    ids.into_iter().find(|id| !seen.insert(*id))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Item(&'static str);

    impl HasIdentifier for Item {
        fn identifier(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn test_sort_by_identifier() {
        let mut items = vec![Item("c"), Item("a"), Item("b")];
        items.sort_by_identifier();
        let ids: Vec<&str> = items.iter().map(|i| i.identifier()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_first_duplicate() {
        assert_eq!(first_duplicate(["a", "b", "a"]), Some("a"));
        assert_eq!(first_duplicate(["a", "b"]), None);
    }
}
