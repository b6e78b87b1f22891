//! Focus point aggregation.

use sclip_models::{FocusPoint, FrameActionProfile, Point, SelectionWindow};

use crate::error::{MediaError, MediaResult};

/// Integer-truncating mean of a non-empty set of points.
pub fn average_point(points: &[Point]) -> MediaResult<FocusPoint> {
    if points.is_empty() {
        return Err(MediaError::EmptyFocusSet);
    }

    let (sum_x, sum_y) = points.iter().fold((0i64, 0i64), |(sx, sy), p| {
        (sx + p.x as i64, sy + p.y as i64)
    });
    let n = points.len() as i64;

    Ok(Point::new((sum_x / n) as i32, (sum_y / n) as i32))
}

/// Focus point for the selected window of a profile.
///
/// Falls back to the analysis frame center when the window is the
/// whole-clip fallback or does not lie inside the profile.
pub fn focus_for_window(profile: &FrameActionProfile, window: &SelectionWindow) -> FocusPoint {
    profile
        .peaks_in(window)
        .and_then(|peaks| average_point(&peaks).ok())
        .unwrap_or_else(|| profile.analysis_center())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sclip_models::FrameAction;

    #[test]
    fn test_average_point() {
        let points = [Point::new(10, 10), Point::new(20, 10), Point::new(30, 10)];
        assert_eq!(average_point(&points).unwrap(), Point::new(20, 10));
    }

    #[test]
    fn test_average_truncates() {
        let points = [Point::new(1, 0), Point::new(2, 1)];
        assert_eq!(average_point(&points).unwrap(), Point::new(1, 0));
    }

    #[test]
    fn test_average_empty_is_error() {
        assert!(matches!(average_point(&[]), Err(MediaError::EmptyFocusSet)));
    }

    #[test]
    fn test_focus_for_window() {
        let frames = vec![
            FrameAction::new(0, Point::ORIGIN),
            FrameAction::new(9, Point::new(100, 40)),
            FrameAction::new(9, Point::new(120, 60)),
            FrameAction::new(1, Point::new(0, 0)),
        ];
        let profile = FrameActionProfile::new(frames, 160, 120);

        assert_eq!(
            focus_for_window(&profile, &SelectionWindow::new(1, 2)),
            Point::new(110, 50)
        );
        assert_eq!(
            focus_for_window(&profile, &SelectionWindow::whole_clip()),
            Point::new(80, 60)
        );
    }
}
