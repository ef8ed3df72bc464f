use std::marker::PhantomData;

use crate::Idx;

/// A map from arena indices to values, backed by a dense `Vec` the way
/// `la-arena`'s `ArenaMap` is. Indices that were never written read back as
/// `None` rather than panicking, since inference results are sparse (not
/// every expression gets, say, a field resolution).
#[derive(Clone, PartialEq, Eq)]
pub struct ArenaMap<IDX, V> {
    v: Vec<Option<V>>,
    _ty: PhantomData<IDX>,
}

impl<T, V> Default for ArenaMap<Idx<T>, V> {
    fn default() -> Self {
        ArenaMap { v: Vec::new(), _ty: PhantomData }
    }
}

impl<T, V> ArenaMap<Idx<T>, V> {
    pub fn insert(&mut self, idx: Idx<T>, value: V) {
        let idx = Self::to_idx(idx);
        if self.v.len() <= idx {
            self.v.resize_with(idx + 1, || None);
        }
        self.v[idx] = Some(value);
    }

    pub fn get(&self, idx: Idx<T>) -> Option<&V> {
        self.v.get(Self::to_idx(idx)).and_then(|it| it.as_ref())
    }

    pub fn get_mut(&mut self, idx: Idx<T>) -> Option<&mut V> {
        self.v.get_mut(Self::to_idx(idx)).and_then(|it| it.as_mut())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.v.iter().filter_map(|it| it.as_ref())
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.v.iter_mut().filter_map(|it| it.as_mut())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Idx<T>, &V)> {
        self.v.iter().enumerate().filter_map(|(idx, o)| Some((Self::from_idx(idx), o.as_ref()?)))
    }

    pub fn len(&self) -> usize {
        self.v.iter().filter(|it| it.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.v.iter().all(|it| it.is_none())
    }

    fn to_idx(idx: Idx<T>) -> usize {
        u32::from(idx.into_raw()) as usize
    }

    fn from_idx(idx: usize) -> Idx<T> {
        Idx::from_raw((idx as u32).into())
    }
}

impl<T, V> std::ops::Index<Idx<T>> for ArenaMap<Idx<T>, V> {
    type Output = V;
    fn index(&self, idx: Idx<T>) -> &V {
        self.get(idx).expect("index out of bounds")
    }
}
