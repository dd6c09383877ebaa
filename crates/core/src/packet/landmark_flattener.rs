use crate::shared::landmark::Hand;

/// Mirrors `y` about the horizontal axis of a frame `height` pixels tall.
///
/// Applying it twice with the same height returns the input.
pub fn flip_vertical(y: i32, height: i32) -> i32 {
    height - y
}

/// Flattens a hand into `[x0, H - y0, z0, x1, H - y1, z1, ...]`.
///
/// `height` is the configured capture height, not necessarily the height of
/// the frame the hand was detected in.
pub fn flatten_hand(hand: &Hand, height: i32) -> Vec<i32> {
    hand.landmarks()
        .iter()
        .flat_map(|lm| [lm.x, flip_vertical(lm.y, height), lm.z])
        .collect()
}
