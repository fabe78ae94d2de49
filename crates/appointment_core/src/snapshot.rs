//! crates/appointment_core/src/snapshot.rs
//!
//! Read-only views handed out by the `list` operations.

use std::fmt;
use std::sync::Arc;

type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// An immutable copy of a collection taken at read time.
///
/// Iteration is lazy (the optional predicate runs as items are pulled) and
/// restartable: every call to `iter` starts again from the first item, and
/// clones share the same backing slice.
pub struct Snapshot<T> {
    items: Arc<[T]>,
    predicate: Option<Predicate<T>>,
}

impl<T> Snapshot<T> {
    pub(crate) fn new(items: Vec<T>) -> Self {
        Self {
            items: items.into(),
            predicate: None,
        }
    }

    pub(crate) fn filtered<F>(items: Vec<T>, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self {
            items: items.into(),
            predicate: Some(Arc::new(predicate)),
        }
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            inner: self.items.iter(),
            predicate: self.predicate.as_deref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Number of items that pass the filter. Walks the snapshot.
    pub fn count(&self) -> usize {
        self.iter().count()
    }

    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.iter().cloned().collect()
    }
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
            predicate: self.predicate.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Snapshot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, T> IntoIterator for &'a Snapshot<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct Iter<'a, T> {
    inner: std::slice::Iter<'a, T>,
    predicate: Option<&'a (dyn Fn(&T) -> bool + Send + Sync)>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        match self.predicate {
            None => self.inner.next(),
            Some(keep) => self.inner.by_ref().find(|item| keep(item)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn iterating_twice_yields_the_same_items() {
        let snapshot = Snapshot::filtered(vec![1, 2, 3, 4], |n: &i32| n % 2 == 0);
        let first: Vec<_> = snapshot.iter().copied().collect();
        let second: Vec<_> = (&snapshot).into_iter().copied().collect();
        assert_eq!(first, vec![2, 4]);
        assert_eq!(first, second);
        assert_eq!(snapshot.count(), 2);
    }

    #[test]
    fn predicate_runs_only_as_items_are_pulled() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let snapshot = Snapshot::filtered(vec![1, 2, 3, 4], move |_: &i32| {
            seen.fetch_add(1, Ordering::SeqCst);
            true
        });
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(snapshot.iter().next(), Some(&1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
