// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Convolution kernels: Gaussian smoothing kernels and Sobel derivative
// pairs. Kernels are cheap to build and are regenerated per invocation
// rather than cached.

/// A square convolution kernel with odd side length, stored row-major.
#[derive(Debug, Clone)]
pub struct Kernel {
    size: usize,
    weights: Vec<f64>,
}

impl Kernel {
    /// A zero-filled kernel. `size` must be odd.
    fn zeroed(size: usize) -> Self {
        assert!(size % 2 == 1, "kernel size must be odd, got {size}");
        Self {
            size,
            weights: vec![0.0; size * size],
        }
    }

    /// Build a kernel from literal rows (used for the fixed Sobel templates).
    fn from_rows(rows: &[&[f64]]) -> Self {
        let size = rows.len();
        let mut kernel = Self::zeroed(size);
        for (r, row) in rows.iter().enumerate() {
            for (c, &w) in row.iter().enumerate() {
                kernel.weights[r * size + c] = w;
            }
        }
        kernel
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Half the side length, rounded down. Convolution loops run over
    /// offsets in `-radius..=radius`.
    pub fn radius(&self) -> i32 {
        (self.size / 2) as i32
    }

    /// Weight at `(row, col)`.
    pub fn at(&self, row: usize, col: usize) -> f64 {
        self.weights[row * self.size + col]
    }

    fn at_mut(&mut self, row: usize, col: usize) -> &mut f64 {
        &mut self.weights[row * self.size + col]
    }

    pub fn sum(&self) -> f64 {
        self.weights.iter().sum()
    }

    pub fn abs_sum(&self) -> f64 {
        self.weights.iter().map(|w| w.abs()).sum()
    }

    /// Scale every weight so the sum of absolute values becomes 1.
    /// A zero kernel is left untouched.
    fn normalize_abs(&mut self) {
        let sum = self.abs_sum();
        if sum != 0.0 {
            for w in &mut self.weights {
                *w /= sum;
            }
        }
    }
}

/// Generate a `size` x `size` Gaussian kernel with standard deviation
/// `sigma`, normalized to sum to 1.
pub fn gaussian(size: usize, sigma: f64) -> Kernel {
    let mut kernel = Kernel::zeroed(size);
    let radius = kernel.radius();
    let mut sum = 0.0;

    for i in 0..size {
        for j in 0..size {
            let x = f64::from(i as i32 - radius);
            let y = f64::from(j as i32 - radius);
            let w = (1.0 / (2.0 * std::f64::consts::PI * sigma * sigma))
                * (-(x * x + y * y) / (2.0 * sigma * sigma)).exp();
            *kernel.at_mut(i, j) = w;
            sum += w;
        }
    }

    for w in &mut kernel.weights {
        *w /= sum;
    }

    kernel
}

/// Generate the Sobel X/Y kernel pair for the given odd size.
///
/// Sizes 3 and 5 are the exact small-integer templates; larger sizes use
/// a Gaussian-derivative approximation with `sigma = size / 3`, normalized
/// so the absolute values sum to 1.
pub fn sobel_pair(size: usize) -> (Kernel, Kernel) {
    assert!(size % 2 == 1, "Sobel kernel size must be odd, got {size}");

    if size == 3 {
        return (
            Kernel::from_rows(&[
                &[-1.0, 0.0, 1.0],
                &[-2.0, 0.0, 2.0],
                &[-1.0, 0.0, 1.0],
            ]),
            Kernel::from_rows(&[
                &[-1.0, -2.0, -1.0],
                &[0.0, 0.0, 0.0],
                &[1.0, 2.0, 1.0],
            ]),
        );
    }

    if size == 5 {
        return (
            Kernel::from_rows(&[
                &[-2.0, -1.0, 0.0, 1.0, 2.0],
                &[-3.0, -2.0, 0.0, 2.0, 3.0],
                &[-4.0, -3.0, 0.0, 3.0, 4.0],
                &[-3.0, -2.0, 0.0, 2.0, 3.0],
                &[-2.0, -1.0, 0.0, 1.0, 2.0],
            ]),
            Kernel::from_rows(&[
                &[-2.0, -2.0, -4.0, -2.0, -2.0],
                &[-1.0, -1.0, -2.0, -1.0, -1.0],
                &[0.0, 0.0, 0.0, 0.0, 0.0],
                &[1.0, 1.0, 2.0, 1.0, 1.0],
                &[2.0, 2.0, 4.0, 2.0, 2.0],
            ]),
        );
    }

    let mut kx = Kernel::zeroed(size);
    let mut ky = Kernel::zeroed(size);
    let radius = kx.radius();
    let sigma = size as f64 / 3.0;

    for i in 0..size {
        for j in 0..size {
            let x = f64::from(j as i32 - radius);
            let y = f64::from(i as i32 - radius);
            let falloff = (-(x * x + y * y) / (2.0 * sigma * sigma)).exp();
            *kx.at_mut(i, j) = -x * falloff;
            *ky.at_mut(i, j) = -y * falloff;
        }
    }

    kx.normalize_abs();
    ky.normalize_abs();

    (kx, ky)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gaussian_sums_to_one() {
        for size in [3usize, 5, 7, 9] {
            let kernel = gaussian(size, 1.4);
            assert!(
                (kernel.sum() - 1.0).abs() < 1e-6,
                "size {size}: sum was {}",
                kernel.sum()
            );
        }
    }

    #[test]
    fn gaussian_peak_is_central() {
        let kernel = gaussian(5, 1.4);
        let center = kernel.at(2, 2);
        for i in 0..5 {
            for j in 0..5 {
                assert!(kernel.at(i, j) <= center);
            }
        }
    }

    #[test]
    fn gaussian_is_symmetric() {
        let kernel = gaussian(5, 1.0);
        for i in 0..5 {
            for j in 0..5 {
                assert_eq!(kernel.at(i, j), kernel.at(4 - i, 4 - j));
                assert_eq!(kernel.at(i, j), kernel.at(j, i));
            }
        }
    }

    #[test]
    #[should_panic(expected = "must be odd")]
    fn even_gaussian_size_panics() {
        gaussian(4, 1.0);
    }

    #[test]
    fn sobel_3x3_is_the_integer_template() {
        let (kx, ky) = sobel_pair(3);
        assert_eq!(kx.at(0, 0), -1.0);
        assert_eq!(kx.at(1, 0), -2.0);
        assert_eq!(kx.at(1, 2), 2.0);
        assert_eq!(kx.at(1, 1), 0.0);
        assert_eq!(ky.at(0, 1), -2.0);
        assert_eq!(ky.at(2, 1), 2.0);
        assert_eq!(ky.at(1, 1), 0.0);
    }

    #[test]
    fn sobel_5x5_is_the_integer_template() {
        let (kx, ky) = sobel_pair(5);
        assert_eq!(kx.at(2, 0), -4.0);
        assert_eq!(kx.at(2, 4), 4.0);
        assert_eq!(ky.at(0, 2), -4.0);
        assert_eq!(ky.at(4, 2), 4.0);
    }

    #[test]
    fn generated_sobel_abs_sums_to_one() {
        for size in [7usize, 9, 11] {
            let (kx, ky) = sobel_pair(size);
            assert!(
                (kx.abs_sum() - 1.0).abs() < 1e-6,
                "size {size}: |Sx| sum was {}",
                kx.abs_sum()
            );
            assert!(
                (ky.abs_sum() - 1.0).abs() < 1e-6,
                "size {size}: |Sy| sum was {}",
                ky.abs_sum()
            );
        }
    }

    #[test]
    fn generated_sobel_x_is_antisymmetric_in_x() {
        let (kx, _) = sobel_pair(7);
        let size = kx.size();
        for i in 0..size {
            for j in 0..size {
                let mirrored = kx.at(i, size - 1 - j);
                assert!((kx.at(i, j) + mirrored).abs() < 1e-12);
            }
        }
    }

    #[test]
    #[should_panic(expected = "must be odd")]
    fn even_sobel_size_panics() {
        sobel_pair(6);
    }
}
