use serde::{Deserialize, Serialize};

/// Width and height of every level map.
pub const LEVEL_SIZE: usize = 32;
pub const MAP_CELLS: usize = LEVEL_SIZE * LEVEL_SIZE;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid2D<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

impl<T: Clone> Grid2D<T> {
    pub fn new(width: usize, height: usize, value: T) -> Self {
        let len = width.saturating_mul(height);
        Self {
            width,
            height,
            data: vec![value; len],
        }
    }

    pub fn square(value: T) -> Self {
        Self::new(LEVEL_SIZE, LEVEL_SIZE, value)
    }
}

impl<T> Grid2D<T> {
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> &T {
        &self.data[self.idx(x, y)]
    }

    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut T {
        let idx = self.idx(x, y);
        &mut self.data[idx]
    }

    #[inline]
    pub fn at(&self, pos: usize) -> &T {
        &self.data[pos]
    }

    #[inline]
    pub fn at_mut(&mut self, pos: usize) -> &mut T {
        &mut self.data[pos]
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}

/// Chebyshev distance between two linear positions on a level map.
pub fn chebyshev(a: usize, b: usize) -> usize {
    let (ax, ay) = (a % LEVEL_SIZE, a / LEVEL_SIZE);
    let (bx, by) = (b % LEVEL_SIZE, b / LEVEL_SIZE);
    ax.abs_diff(bx).max(ay.abs_diff(by))
}
