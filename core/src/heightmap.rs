use crate::error::{Result, TerrainError, check_dimensions};

// Row-of-rows form handed across the call boundary, access as `map[y][x]`.
pub type HeightMap2D = Vec<Vec<f32>>;

// 2D height map stored row-major: `height` rows of `width` cells
#[derive(Debug, Clone, PartialEq)]
pub struct Heightmap {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl Heightmap {
    // Flat map of zeros
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    pub fn from_vec(width: usize, height: usize, data: Vec<f32>) -> Result<Self> {
        check_dimensions(data.len(), width, height)?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    // Every row must have the same length as the first one
    pub fn from_rows(rows: HeightMap2D) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        let actual: usize = rows.iter().map(Vec::len).sum();
        if rows.iter().any(|row| row.len() != width) {
            return Err(TerrainError::DimensionMismatch {
                width,
                height,
                expected: width * height,
                actual,
            });
        }
        let data = rows.into_iter().flatten().collect();
        Self::from_vec(width, height, data)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        self.data[y * self.width + x] = value;
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks(self.width.max(1))
    }

    pub fn to_rows(&self) -> HeightMap2D {
        self.rows().map(<[f32]>::to_vec).collect()
    }

    pub fn min_max(&self) -> (f32, f32) {
        self.data
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }

    // Accumulated in f64 so large maps don't drown in rounding
    pub fn sum(&self) -> f64 {
        self.data.iter().map(|&v| v as f64).sum()
    }

    // Largest absolute height step between 4-neighbours
    pub fn max_neighbor_diff(&self) -> f32 {
        let mut max = 0.0f32;
        for y in 0..self.height {
            for x in 0..self.width {
                let h = self.get(x, y);
                if x + 1 < self.width {
                    max = max.max((h - self.get(x + 1, y)).abs());
                }
                if y + 1 < self.height {
                    max = max.max((h - self.get(x, y + 1)).abs());
                }
            }
        }
        max
    }

    // Rescale into [0, 1]; a flat map becomes all zeros
    pub fn normalize(&mut self) {
        let (min, max) = self.min_max();
        let range = max - min;
        if !(range > f32::EPSILON) {
            self.data.fill(0.0);
            return;
        }
        for v in self.data.iter_mut() {
            *v = (*v - min) / range;
        }
    }

    pub fn clamp01(&mut self) {
        for v in self.data.iter_mut() {
            *v = v.clamp(0.0, 1.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Heightmap;
    use crate::error::TerrainError;

    #[test]
    fn rows_roundtrip_keeps_layout() {
        let rows = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]];
        let map = Heightmap::from_rows(rows.clone()).unwrap();
        assert_eq!(map.width(), 3);
        assert_eq!(map.height(), 2);
        assert_eq!(map.get(2, 1), 6.0);
        assert_eq!(map.to_rows(), rows);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let rows = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(matches!(
            Heightmap::from_rows(rows),
            Err(TerrainError::DimensionMismatch { actual: 3, .. })
        ));
    }

    #[test]
    fn normalize_spans_unit_interval() {
        let mut map = Heightmap::from_vec(2, 2, vec![-3.0, 1.0, 5.0, 0.0]).unwrap();
        map.normalize();
        let (min, max) = map.min_max();
        assert_eq!(min, 0.0);
        assert_eq!(max, 1.0);
        assert_eq!(map.get(1, 0), 0.5);
    }

    #[test]
    fn normalize_flat_map_is_zero() {
        let mut map = Heightmap::from_vec(2, 1, vec![7.0, 7.0]).unwrap();
        map.normalize();
        assert_eq!(map.as_slice(), &[0.0, 0.0]);
    }

    #[test]
    fn max_neighbor_diff_checks_both_axes() {
        let map = Heightmap::from_vec(2, 2, vec![0.0, 1.0, 4.0, 2.0]).unwrap();
        assert_eq!(map.max_neighbor_diff(), 4.0);
    }

    #[test]
    fn clamp01_clips() {
        let mut map = Heightmap::from_vec(3, 1, vec![-0.5, 0.25, 1.5]).unwrap();
        map.clamp01();
        assert_eq!(map.as_slice(), &[0.0, 0.25, 1.0]);
    }
}
