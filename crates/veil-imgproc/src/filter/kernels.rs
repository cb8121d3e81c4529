use veil_image::{image::try_alloc, ImageError};

/// A square 2D kernel of side `2 * radius + 1`, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel2d {
    radius: usize,
    weights: Vec<f64>,
}

impl Kernel2d {
    /// The half-width of the kernel.
    pub fn radius(&self) -> usize {
        self.radius
    }

    /// The side length of the kernel, `2 * radius + 1`.
    pub fn side(&self) -> usize {
        2 * self.radius + 1
    }

    /// The weights, row-major, indexed by `(dy + radius) * side + (dx + radius)`.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// The weight at offset `(dx, dy)`, or `None` outside `[-radius, radius]`.
    pub fn get(&self, dx: isize, dy: isize) -> Option<f64> {
        let r = self.radius as isize;
        if dx.abs() > r || dy.abs() > r {
            return None;
        }
        let idx = (dy + r) as usize * self.side() + (dx + r) as usize;
        self.weights.get(idx).copied()
    }

    /// The sum of all the weights.
    pub fn sum(&self) -> f64 {
        self.weights.iter().sum()
    }
}

/// Create a 2D isotropic gaussian kernel.
///
/// The entry at offset `(dx, dy)` is the gaussian density
/// `exp(-(dx² + dy²) / (2σ²)) / (2πσ²)`. The weights are not renormalized:
/// when `radius` is small compared to `sigma` the kernel sums to less than one
/// and the blurred image darkens.
///
/// # Arguments
///
/// * `radius` - The half-width of the kernel.
/// * `sigma` - The standard deviation of the gaussian.
///
/// # Errors
///
/// Returns [`ImageError::InvalidSigma`] if `sigma` is not positive and finite, and
/// [`ImageError::AllocationFailed`] if the weight table cannot be allocated.
pub fn gaussian_kernel_2d(radius: usize, sigma: f64) -> Result<Kernel2d, ImageError> {
    if !(sigma.is_finite() && sigma > 0.0) {
        return Err(ImageError::InvalidSigma(sigma));
    }

    let side = radius
        .checked_mul(2)
        .and_then(|s| s.checked_add(1))
        .ok_or(ImageError::AllocationFailed(usize::MAX))?;
    let len = side
        .checked_mul(side)
        .ok_or(ImageError::AllocationFailed(usize::MAX))?;

    let mut weights = try_alloc(len, 0.0f64)?;

    let scale2 = 2.0 * sigma * sigma;
    let scale1 = 1.0 / (scale2 * std::f64::consts::PI);
    let r = radius as isize;

    for (i, row) in weights.chunks_exact_mut(side).enumerate() {
        let dy = i as isize - r;
        for (j, w) in row.iter_mut().enumerate() {
            let dx = j as isize - r;
            *w = scale1 * (-((dx * dx + dy * dy) as f64) / scale2).exp();
        }
    }

    let kernel = Kernel2d { radius, weights };

    let mass = kernel.sum();
    if mass < 0.95 {
        log::warn!(
            "gaussian kernel with radius {} and sigma {} keeps only {:.1}% of its mass",
            radius,
            sigma,
            mass * 100.0
        );
    }

    Ok(kernel)
}

// uniform weights of the sliding window, used to check it against a direct sum
#[cfg(test)]
pub(crate) fn box_blur_kernel_1d(radius: usize) -> Vec<f64> {
    let kernel_size = 2 * radius + 1;
    vec![1.0 / kernel_size as f64; kernel_size]
}
