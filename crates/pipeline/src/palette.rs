use planeseg_core::Rgb;

const SATURATION: f32 = 0.85;
const VALUE: f32 = 0.95;

/// `n` display colors with evenly spaced hues, starting at red.
pub fn generate_colors(n: usize) -> Vec<Rgb> {
    (0..n)
        .map(|i| Rgb::from_hsv(360.0 * i as f32 / n as f32, SATURATION, VALUE))
        .collect()
}
