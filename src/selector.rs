// src/selector.rs
//! Top-N cut over an already ranked sequence. No reordering, no padding.

/// First `top_n` entries, verbatim. Returns everything when fewer survive.
pub fn select_top<T>(mut ranked: Vec<T>, top_n: usize) -> Vec<T> {
    ranked.truncate(top_n);
    ranked
}
