use std::{any::type_name, fmt::Debug, hash::Hash, iter::Iterator, marker::PhantomData};

/// A typed integer handle. The phantom parameter keeps ids for
/// different kinds of objects from being mixed up.
pub struct ID<T>(usize, PhantomData<fn() -> T>);

impl<T> Hash for ID<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl<T> Clone for ID<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ID<T> {}

impl<T> Debug for ID<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = type_name::<T>().rsplit("::").next().unwrap_or("?");
        write!(f, "{}#{}", name, self.0)
    }
}

impl<T> PartialEq for ID<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq(&other.0)
    }
}

impl<T> Eq for ID<T> {}

impl<T> Ord for ID<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl<T> PartialOrd for ID<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Hands out increasing ids, starting at 1.
pub struct IDFactory<I>(usize, PhantomData<fn() -> I>);

impl<T> IDFactory<ID<T>> {
    pub fn new() -> Self {
        Self(0, PhantomData)
    }

    pub fn get_id(&mut self) -> ID<T> {
        self.0 += 1;
        ID(self.0, PhantomData)
    }
}

impl<T> Default for IDFactory<ID<T>> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Iterator for IDFactory<ID<T>> {
    type Item = ID<T>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.get_id())
    }
}
