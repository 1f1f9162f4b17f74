//! Listing quality score in `[0, 1]`.

const TITLE_WEIGHT: f64 = 0.4;
const DESCRIPTION_WEIGHT: f64 = 0.4;
const IMAGE_WEIGHT: f64 = 0.2;

/// Title length at which the title component saturates.
pub const TARGET_TITLE_CHARS: usize = 70;
/// Description length at which the description component saturates.
pub const TARGET_DESCRIPTION_CHARS: usize = 500;
pub const TARGET_IMAGES: usize = 5;

#[allow(clippy::cast_precision_loss)]
fn ratio(actual: usize, target: usize) -> f64 {
    if target == 0 {
        return 1.0;
    }
    (actual as f64 / target as f64).clamp(0.0, 1.0)
}

/// Weighted average of title length, description length and image count,
/// each clamped to `[0, 1]` before weighting.
#[must_use]
pub fn quality_score(title: &str, description: &str, image_count: usize) -> f64 {
    let title = ratio(title.chars().count(), TARGET_TITLE_CHARS);
    let description = ratio(description.chars().count(), TARGET_DESCRIPTION_CHARS);
    let images = ratio(image_count, TARGET_IMAGES);
    (TITLE_WEIGHT * title + DESCRIPTION_WEIGHT * description + IMAGE_WEIGHT * images)
        .clamp(0.0, 1.0)
}
