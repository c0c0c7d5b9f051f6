use super::types::{ForegroundExtractor, BACKGROUND, FOREGROUND};
use image::{GrayImage, Luma};
use ndarray::{s, Array2, Array3, ArrayViewMut1};

/// Mask value for pixels that look like a shadow cast on the background
pub const SHADOW: u8 = 127;

/// Tuning of the per-pixel Gaussian mixture
#[derive(Debug, Clone, PartialEq)]
pub struct MixtureParams {
    /// Number of frames the learning rate settles at (1 / history)
    pub history: u32,
    /// Gaussians kept per pixel
    pub mixtures: usize,
    /// Squared Mahalanobis distance under which a pixel is background
    pub var_threshold: f32,
    /// Squared Mahalanobis distance under which a sample updates an existing Gaussian
    pub var_threshold_gen: f32,
    pub var_init: f32,
    pub var_min: f32,
    pub var_max: f32,
    /// Share of the total weight that makes up the background
    pub background_ratio: f32,
    /// Weight decay that prunes Gaussians no sample supports any more
    pub complexity_reduction: f32,
    pub detect_shadows: bool,
    /// Lowest brightness ratio against the background still counted as shadow
    pub shadow_tau: f32,
}

impl MixtureParams {
    pub fn with_threshold(var_threshold: f32) -> Self {
        Self {
            var_threshold,
            ..Self::default()
        }
    }
}

impl Default for MixtureParams {
    fn default() -> Self {
        Self {
            history: 500,
            mixtures: 5,
            var_threshold: 16.0,
            var_threshold_gen: 9.0,
            var_init: 15.0,
            var_min: 4.0,
            var_max: 75.0,
            background_ratio: 0.9,
            complexity_reduction: 0.05,
            detect_shadows: true,
            shadow_tau: 0.5,
        }
    }
}

/// Adaptive background model: a small mixture of Gaussians per pixel
///
/// The model is continuously updated by every frame. Gaussians are kept
/// sorted by weight, and the heaviest ones that together reach
/// `background_ratio` describe the empty scene.
///
/// Output mask values: `BACKGROUND`, `SHADOW` or `FOREGROUND`.
pub struct MixtureBackground {
    params: MixtureParams,

    // Per-pixel parameters, indexed [row, column, gaussian]
    weights: Array3<f32>,
    means: Array3<f32>,
    variances: Array3<f32>,
    // Gaussians in use per pixel
    modes: Array2<u8>,

    frames_seen: u64,
}

impl MixtureBackground {
    pub fn new(params: MixtureParams) -> Self {
        let mixtures = params.mixtures.clamp(1, u8::MAX as usize);
        let params = MixtureParams { mixtures, ..params };
        Self {
            weights: Array3::zeros((0, 0, mixtures)),
            means: Array3::zeros((0, 0, mixtures)),
            variances: Array3::zeros((0, 0, mixtures)),
            modes: Array2::zeros((0, 0)),
            params,
            frames_seen: 0,
        }
    }

    /// Number of frames folded into the model since the last reset
    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    fn learning_rate(&self) -> f32 {
        let window = (2 * self.frames_seen).min(self.params.history.max(1) as u64);
        1.0 / window.max(1) as f32
    }

    /// Start a fresh model where every pixel is exactly the given frame
    fn seed(&mut self, frame: &GrayImage) {
        let (width, height) = frame.dimensions();
        let shape = (height as usize, width as usize, self.params.mixtures);

        tracing::debug!("Seeding mixture background at {}x{}", width, height);

        self.weights = Array3::zeros(shape);
        self.means = Array3::zeros(shape);
        self.variances = Array3::zeros(shape);
        self.modes = Array2::from_elem((shape.0, shape.1), 1);

        for (x, y, pixel) in frame.enumerate_pixels() {
            let (row, col) = (y as usize, x as usize);
            self.weights[[row, col, 0]] = 1.0;
            self.means[[row, col, 0]] = pixel[0] as f32;
            self.variances[[row, col, 0]] = self.params.var_init;
        }
        self.frames_seen = 1;
    }
}

impl ForegroundExtractor for MixtureBackground {
    fn extract(&mut self, frame: &GrayImage) -> GrayImage {
        let _span = tracing::debug_span!("mixture_background").entered();

        let (width, height) = frame.dimensions();

        // The first frame only seeds the model; with no history there is nothing to compare
        if self.frames_seen == 0 || self.modes.dim() != (height as usize, width as usize) {
            self.seed(frame);
            return GrayImage::new(width, height);
        }

        self.frames_seen += 1;
        let alpha = self.learning_rate();

        let mut mask = GrayImage::new(width, height);
        for (x, y, pixel) in frame.enumerate_pixels() {
            let (row, col) = (y as usize, x as usize);
            let label = update_pixel(
                &self.params,
                alpha,
                pixel[0] as f32,
                PixelModel {
                    weight: self.weights.slice_mut(s![row, col, ..]),
                    mean: self.means.slice_mut(s![row, col, ..]),
                    variance: self.variances.slice_mut(s![row, col, ..]),
                    modes: &mut self.modes[[row, col]],
                },
            );
            mask.put_pixel(x, y, Luma([label]));
        }

        mask
    }

    fn reset_state(&mut self) {
        tracing::info!("Resetting mixture background model");
        let mixtures = self.params.mixtures;
        self.weights = Array3::zeros((0, 0, mixtures));
        self.means = Array3::zeros((0, 0, mixtures));
        self.variances = Array3::zeros((0, 0, mixtures));
        self.modes = Array2::zeros((0, 0));
        self.frames_seen = 0;
    }

    fn name(&self) -> &'static str {
        "mixture-background"
    }
}

struct PixelModel<'a> {
    weight: ArrayViewMut1<'a, f32>,
    mean: ArrayViewMut1<'a, f32>,
    variance: ArrayViewMut1<'a, f32>,
    modes: &'a mut u8,
}

impl PixelModel<'_> {
    fn swap(&mut self, a: usize, b: usize) {
        self.weight.swap(a, b);
        self.mean.swap(a, b);
        self.variance.swap(a, b);
    }
}

/// Fold one sample into a pixel's mixture and classify it
fn update_pixel(params: &MixtureParams, alpha: f32, value: f32, mut px: PixelModel<'_>) -> u8 {
    let prune = -alpha * params.complexity_reduction;
    let alpha1 = 1.0 - alpha;

    let mut modes = *px.modes as usize;
    let mut background = false;
    let mut fits = false;
    let mut total_weight = 0.0;

    let mut mode = 0;
    while mode < modes {
        let mut weight = alpha1 * px.weight[mode] + prune;
        let mut slot = mode;

        if !fits {
            let var = px.variance[mode];
            let diff = px.mean[mode] - value;
            let dist2 = diff * diff;

            if total_weight < params.background_ratio && dist2 < params.var_threshold * var {
                background = true;
            }

            if dist2 < params.var_threshold_gen * var {
                fits = true;

                weight += alpha;
                let k = alpha / weight;
                px.mean[mode] -= k * diff;
                px.variance[mode] =
                    (var + k * (dist2 - var)).clamp(params.var_min, params.var_max);

                // Keep Gaussians sorted by descending weight
                while slot > 0 && weight >= px.weight[slot - 1] {
                    px.swap(slot, slot - 1);
                    slot -= 1;
                }
            }
        }

        if weight < -prune {
            weight = 0.0;
            modes -= 1;
        }

        px.weight[slot] = weight;
        total_weight += weight;
        mode += 1;
    }

    if total_weight > 0.0 {
        let norm = 1.0 / total_weight;
        for m in 0..modes {
            px.weight[m] *= norm;
        }
    }

    if !fits {
        // Replace the weakest Gaussian, or add one if there is room
        let slot = if modes == params.mixtures {
            modes - 1
        } else {
            modes += 1;
            modes - 1
        };

        if modes == 1 {
            px.weight[slot] = 1.0;
        } else {
            px.weight[slot] = alpha;
            for m in 0..modes - 1 {
                px.weight[m] *= alpha1;
            }
        }
        px.mean[slot] = value;
        px.variance[slot] = params.var_init;

        let mut slot = slot;
        while slot > 0 && alpha >= px.weight[slot - 1] {
            px.swap(slot, slot - 1);
            slot -= 1;
        }
    }

    *px.modes = modes as u8;

    if background {
        BACKGROUND
    } else if params.detect_shadows && is_shadow(params, value, &px, modes) {
        SHADOW
    } else {
        FOREGROUND
    }
}

/// A sample darker than, but proportional to, a background Gaussian is a shadow
fn is_shadow(params: &MixtureParams, value: f32, px: &PixelModel<'_>, modes: usize) -> bool {
    let mut total_weight = 0.0;

    for mode in 0..modes {
        let mean = px.mean[mode];
        let denominator = mean * mean;
        if denominator == 0.0 {
            return false;
        }

        let ratio = value * mean / denominator;
        if (params.shadow_tau..=1.0).contains(&ratio) {
            let diff = ratio * mean - value;
            if diff * diff < params.var_threshold * px.variance[mode] * ratio * ratio {
                return true;
            }
        }

        total_weight += px.weight[mode];
        if total_weight > params.background_ratio {
            return false;
        }
    }

    false
}
