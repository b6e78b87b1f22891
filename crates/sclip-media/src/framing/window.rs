//! Fixed-length window selection over frame intensities.

use sclip_models::SelectionWindow;

/// Find the contiguous `desired_len` window with the largest total intensity.
///
/// Runs a single sliding sum over the sequence. Ties resolve to the earliest
/// window, so an all-zero sequence selects the first one. When the sequence
/// is shorter than `desired_len` (or `desired_len` is zero) the whole-clip
/// fallback `(0, 0)` is returned.
pub fn select_window(intensities: &[u32], desired_len: usize) -> SelectionWindow {
    if desired_len == 0 || intensities.len() < desired_len {
        return SelectionWindow::whole_clip();
    }

    let mut current: u64 = intensities[..desired_len].iter().map(|&v| v as u64).sum();
    let mut best = current;
    let mut best_start = 0usize;

    for start in 1..=intensities.len() - desired_len {
        current = current - intensities[start - 1] as u64 + intensities[start + desired_len - 1] as u64;
        if current > best {
            best = current;
            best_start = start;
        }
    }

    SelectionWindow::new(best_start, desired_len)
}

/// Number of frames needed to cover `seconds` at `fps`.
pub fn frames_for_duration(seconds: f64, fps: f64) -> usize {
    if seconds <= 0.0 || fps <= 0.0 {
        return 0;
    }
    (seconds * fps).round() as usize
}
