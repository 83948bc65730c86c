use std::iter::repeat_with;
use std::ops::{Deref, DerefMut, Index, IndexMut};

use serde::{Deserialize, Serialize};

use common::ArrayVec;

/// Dense 2d grid with linear storage
#[derive(Serialize, Deserialize, Clone)]
pub struct DynamicGrid<T> {
    dims: [usize; 2],
    /// Pinned and never moved
    data: Box<[T]>,
}

impl<T: Default> DynamicGrid<T> {
    pub fn new(dims: [usize; 2]) -> Self {
        let len = dims[0] * dims[1];
        assert_ne!(len, 0);

        let data = repeat_with(T::default).take(len).collect();
        DynamicGrid { dims, data }
    }

    pub fn flatten_coords(&self, [x, y]: [usize; 2]) -> usize {
        let [xs, _ys] = self.dims;
        x + xs * y
    }

    pub fn unflatten_index(&self, index: usize) -> [usize; 2] {
        let [xs, _ys] = self.dims;
        [index % xs, index / xs]
    }

    #[inline]
    pub fn is_coord_in_range(&self, [x, y]: [usize; 2]) -> bool {
        x < self.dims[0] && y < self.dims[1]
    }

    #[inline]
    pub fn is_in_range(&self, idx: usize) -> bool {
        idx < self.data.len()
    }

    pub fn dimensions(&self) -> [usize; 2] {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.data.iter()
    }

    pub fn iter_coords(&self) -> impl Iterator<Item = ([usize; 2], &T)> + '_ {
        self.data
            .iter()
            .enumerate()
            .map(move |(i, t)| (self.unflatten_index(i), t))
    }

    pub fn fill_with(&mut self, mut f: impl FnMut() -> T) {
        self.data.iter_mut().for_each(|t| *t = f());
    }

    /// Filters out out-of-bounds neighbours. Cardinal only without the
    /// 8neighbours feature
    pub fn neighbours(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        // cheaper to pass around an idx and unflatten than to pass coords
        let coord = self.unflatten_index(index);

        let x0 = Some(coord[0]);
        let xp1 = Some(coord[0] + 1);
        let xs1 = coord[0].checked_sub(1);

        let y0 = Some(coord[1]);
        let yp1 = Some(coord[1] + 1);
        let ys1 = coord[1].checked_sub(1);

        ArrayVec::from([
            x0.zip(ys1),
            #[cfg(feature = "8neighbours")]
            xp1.zip(ys1),
            xp1.zip(y0),
            #[cfg(feature = "8neighbours")]
            xp1.zip(yp1),
            x0.zip(yp1),
            #[cfg(feature = "8neighbours")]
            xs1.zip(yp1),
            xs1.zip(y0),
            #[cfg(feature = "8neighbours")]
            xs1.zip(ys1),
        ])
        .into_iter()
        .flatten()
        .filter_map(move |(x, y)| {
            let coord = [x, y];
            if self.is_coord_in_range(coord) {
                Some(self.flatten_coords(coord))
            } else {
                None
            }
        })
    }

    /// In-bounds cardinal neighbours regardless of the 8neighbours feature
    pub fn cardinal_neighbours(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        let [x, y] = self.unflatten_index(index);

        ArrayVec::from([
            Some(x).zip(y.checked_sub(1)),
            Some(x + 1).zip(Some(y)),
            Some(x).zip(Some(y + 1)),
            x.checked_sub(1).zip(Some(y)),
        ])
        .into_iter()
        .flatten()
        .filter_map(move |(x, y)| {
            let coord = [x, y];
            if self.is_coord_in_range(coord) {
                Some(self.flatten_coords(coord))
            } else {
                None
            }
        })
    }
}

impl<T> Index<usize> for DynamicGrid<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.data[index]
    }
}

impl<T> IndexMut<usize> for DynamicGrid<T> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.data[index]
    }
}

impl<T: Default> Index<[usize; 2]> for DynamicGrid<T> {
    type Output = T;

    fn index(&self, coords: [usize; 2]) -> &Self::Output {
        self.index(self.flatten_coords(coords))
    }
}

impl<T: Default> IndexMut<[usize; 2]> for DynamicGrid<T> {
    fn index_mut(&mut self, coords: [usize; 2]) -> &mut Self::Output {
        self.index_mut(self.flatten_coords(coords))
    }
}

impl<T> AsRef<[T]> for DynamicGrid<T> {
    fn as_ref(&self) -> &[T] {
        &self.data
    }
}

impl<T> Deref for DynamicGrid<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl<T> DerefMut for DynamicGrid<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.data
    }
}

pub trait GridCoord<T: Default> {
    fn into_index(self, grid: &DynamicGrid<T>) -> usize;
    fn into_coord(self, grid: &DynamicGrid<T>) -> [usize; 2];
}

impl<T: Default> GridCoord<T> for usize {
    fn into_index(self, _: &DynamicGrid<T>) -> usize {
        self
    }

    fn into_coord(self, grid: &DynamicGrid<T>) -> [usize; 2] {
        grid.unflatten_index(self)
    }
}

impl<T: Default> GridCoord<T> for [usize; 2] {
    fn into_index(self, grid: &DynamicGrid<T>) -> usize {
        grid.flatten_coords(self)
    }

    fn into_coord(self, _: &DynamicGrid<T>) -> [usize; 2] {
        self
    }
}
