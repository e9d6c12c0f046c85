use rand::seq::SliceRandom;

use crate::{NoiseField, seeded_stream};

// Seeded 2D gradient (Perlin) noise, a single octave in [-1, 1]
#[derive(Debug, Clone)]
pub struct Perlin2D {
    seed: u64,
    perm: [u8; 512], // permutation table (256 duplicated)
}

impl Perlin2D {
    pub fn new(seed: u64) -> Self {
        // Fisher–Yates shuffle of 0..256 driven by this instance's own stream
        let mut p: Vec<u8> = (0..=255u8).collect();
        p.shuffle(&mut seeded_stream(seed));

        // Duplicated so `perm[perm[xi] + yi + 1]` never needs a second mask
        let mut perm = [0u8; 512];
        for (i, slot) in perm.iter_mut().enumerate() {
            *slot = p[i & 255];
        }

        Self { seed, perm }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    // Ken Perlin's quintic: 6t^5 − 15t^4 + 10t^3
    // First and second derivatives vanish at t=0 and t=1,
    // so neighbouring lattice cells join without creases.
    #[inline]
    fn fade(t: f64) -> f64 {
        t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
    }

    #[inline]
    fn lerp(a: f64, b: f64, t: f64) -> f64 {
        a + t * (b - a)
    }

    // Pick one of the diagonal gradients (±1, ±1) from the hash and
    // dot it with the offset to the corner
    #[inline]
    fn grad(hash: u8, x: f64, y: f64) -> f64 {
        let h = hash & 0xF;
        let (u, v) = if h < 8 { (x, y) } else { (y, x) };
        let u = if h & 1 == 0 { u } else { -u };
        let v = if h & 2 == 0 { v } else { -v };
        u + v
    }

    // Wrap a lattice coordinate into 0..256. Two's complement masking keeps
    // negative coordinates periodic and identical on every platform.
    #[inline]
    fn lattice(c: f64) -> usize {
        ((c as i64) & 255) as usize
    }

    fn noise(&self, x: f64, y: f64) -> f64 {
        let x0 = x.floor();
        let y0 = y.floor();
        let xi = Self::lattice(x0);
        let yi = Self::lattice(y0);
        let xf = x - x0;
        let yf = y - y0;
        let u = Self::fade(xf);
        let v = Self::fade(yf);

        let p = &self.perm;
        let a = p[xi] as usize + yi;
        let b = p[xi + 1] as usize + yi;

        let x1 = Self::lerp(
            Self::grad(p[a], xf, yf),
            Self::grad(p[b], xf - 1.0, yf),
            u,
        );
        let x2 = Self::lerp(
            Self::grad(p[a + 1], xf, yf - 1.0),
            Self::grad(p[b + 1], xf - 1.0, yf - 1.0),
            u,
        );
        Self::lerp(x1, x2, v)
    }
}

impl NoiseField for Perlin2D {
    fn sample(&self, x: f64, y: f64) -> f64 {
        // Diagonal gradients peak at exactly ±1 in a cell centre
        self.noise(x, y).clamp(-1.0, 1.0)
    }
}

// One-shot sample at (x, y) for `seed`. Builds the permutation table on every
// call; hold a `Perlin2D` when sampling more than a handful of points.
pub fn sample(x: f64, y: f64, seed: u64) -> f64 {
    Perlin2D::new(seed).sample(x, y)
}

#[cfg(test)]
mod tests {
    use super::{Perlin2D, sample};
    use crate::NoiseField;

    #[test]
    fn perlin2_determinism() {
        let p1 = Perlin2D::new(1234);
        let p2 = Perlin2D::new(1234);
        // Same seed ⇒ same output
        let a = p1.sample(10.5, -3.7);
        let b = p2.sample(10.5, -3.7);
        assert_eq!(a.to_bits(), b.to_bits());
        assert_eq!(sample(10.5, -3.7, 1234).to_bits(), a.to_bits());
    }

    #[test]
    fn perlin2_seed_changes_field() {
        let p1 = Perlin2D::new(1);
        let p2 = Perlin2D::new(2);
        let differs = (0..64).any(|i| {
            let x = i as f64 * 0.37 + 0.11;
            let y = i as f64 * 0.53 + 0.29;
            p1.sample(x, y) != p2.sample(x, y)
        });
        assert!(differs);
    }

    #[test]
    // Stays within [-1.0, 1.0] range
    fn perlin2_range() {
        let p = Perlin2D::new(0);
        for i in -200..200 {
            for j in -20..20 {
                let v = p.sample(i as f64 * 0.173, j as f64 * 0.291);
                assert!((-1.0..=1.0).contains(&v), "value {} out of range", v);
            }
        }
    }

    #[test]
    fn perlin2_zero_on_lattice() {
        let p = Perlin2D::new(99);
        for &(x, y) in &[(0.0, 0.0), (3.0, -7.0), (-256.0, 512.0)] {
            assert_eq!(p.sample(x, y), 0.0);
        }
    }

    #[test]
    fn perlin2_continuous_across_cell_edge() {
        let p = Perlin2D::new(7);
        let eps = 1e-7;
        let left = p.sample(5.0 - eps, 2.4);
        let right = p.sample(5.0 + eps, 2.4);
        assert!((left - right).abs() < 1e-5);
    }

    #[test]
    fn perlin2_wraps_every_256_cells() {
        let p = Perlin2D::new(3);
        let a = p.sample(1.25, 0.75);
        let b = p.sample(1.25 + 256.0, 0.75 - 256.0);
        assert!((a - b).abs() < 1e-9);
    }
}
