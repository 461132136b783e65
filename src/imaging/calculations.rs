//! Pure calculation functions for derivative widths and dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Build the width preset: every base width plus its double (for 2x displays),
/// limited to `(0, max_width]`, ascending and deduplicated.
///
/// ```
/// # use folio::imaging::width_preset;
/// assert_eq!(width_preset(&[480, 960], 3840), vec![480, 960, 1920]);
/// assert_eq!(width_preset(&[1000, 2000], 2500), vec![1000, 2000]);
/// ```
pub fn width_preset(base_widths: &[u32], max_width: u32) -> Vec<u32> {
    let mut widths: Vec<u32> = base_widths
        .iter()
        .flat_map(|&w| [w, w.saturating_mul(2)])
        .filter(|&w| w > 0 && w <= max_width)
        .collect();
    widths.sort_unstable();
    widths.dedup();
    widths
}

/// Widths to render for one source image.
///
/// - Original width unknown: every preset width (the preset is already capped).
/// - Original width known: preset widths up to `min(original, max_width)`, plus
///   that capped value itself so the native resolution is always available.
///
/// Never empty: if nothing qualifies, the capped original width (or the
/// smallest preset width, or `max_width`) is returned on its own.
pub fn target_widths(preset: &[u32], max_width: u32, original_width: Option<u32>) -> Vec<u32> {
    let original = original_width.filter(|&w| w > 0);
    let limit = original.map_or(max_width, |w| w.min(max_width));

    let mut widths: Vec<u32> = preset
        .iter()
        .copied()
        .filter(|&w| w > 0 && w <= limit)
        .collect();
    if original.is_some() {
        widths.push(limit);
    }
    widths.sort_unstable();
    widths.dedup();

    if widths.is_empty() {
        let fallback = match original {
            Some(_) => limit,
            None => preset.first().copied().unwrap_or(max_width),
        };
        widths.push(fallback);
    }
    widths
}

/// Dimensions after fitting `original` inside `target_width` without enlarging.
///
/// The height follows the source aspect ratio and is at least 1 pixel.
///
/// ```
/// # use folio::imaging::fit_inside;
/// assert_eq!(fit_inside((4000, 3000), 960), (960, 720));
/// assert_eq!(fit_inside((800, 600), 960), (800, 600));
/// ```
pub fn fit_inside(original: (u32, u32), target_width: u32) -> (u32, u32) {
    let (orig_w, orig_h) = original;
    if target_width >= orig_w || orig_w == 0 {
        return original;
    }
    let ratio = target_width as f64 / orig_w as f64;
    let height = (orig_h as f64 * ratio).round().max(1.0) as u32;
    (target_width, height)
}
