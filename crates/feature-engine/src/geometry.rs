//! Landmark geometry signals
//!
//! Eye openness, mouth opening and finger spread, computed straight from
//! detector coordinates. Indices follow the 468-point face mesh and the
//! 21-point hand layout.

use landmarks::{FaceDetection, HandDetection, Point2};
use serde::{Deserialize, Serialize};

/// Face mesh indices outlining each eye (corner, upper lid, corner, lower lid)
pub const LEFT_EYE: [usize; 6] = [33, 160, 158, 133, 153, 144];
pub const RIGHT_EYE: [usize; 6] = [362, 385, 387, 263, 373, 380];

pub const NOSE_TIP: usize = 1;
pub const UPPER_LIP: usize = 13;
pub const LOWER_LIP: usize = 14;
pub const CHIN: usize = 152;

pub const WRIST: usize = 0;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_TIP: usize = 12;
pub const RING_TIP: usize = 16;
pub const PINKY_TIP: usize = 20;

/// Eye-closed thresholds, applied identically to both eyes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EyeThresholds {
    /// Closed when height / width is at or below this
    pub closed_ratio: f64,
    /// Closed when height is below this fraction of width
    pub closed_height_factor: f64,
}

impl Default for EyeThresholds {
    fn default() -> Self {
        Self {
            closed_ratio: 0.20,
            closed_height_factor: 0.12,
        }
    }
}

/// Bounding-box openness of one eye
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeMetrics {
    pub width: f64,
    pub height: f64,
    /// height / width
    pub aspect_ratio: f64,
    pub closed: bool,
}

impl EyeMetrics {
    /// Measure the eye outlined by `indices`.
    ///
    /// Needs at least two resolvable points and a non-zero width.
    pub fn measure(
        face: &FaceDetection,
        indices: &[usize],
        thresholds: &EyeThresholds,
    ) -> Option<Self> {
        let points: Vec<Point2> = indices.iter().filter_map(|&i| face.point(i)).collect();
        if points.len() < 2 {
            return None;
        }

        let (min_x, max_x, min_y, max_y) = points.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
            |(min_x, max_x, min_y, max_y), p| {
                (min_x.min(p.x), max_x.max(p.x), min_y.min(p.y), max_y.max(p.y))
            },
        );

        let width = max_x - min_x;
        let height = max_y - min_y;
        if width <= f64::EPSILON {
            return None;
        }

        let aspect_ratio = height / width;
        let closed = aspect_ratio <= thresholds.closed_ratio
            || height < thresholds.closed_height_factor * width;

        Some(Self {
            width,
            height,
            aspect_ratio,
            closed,
        })
    }
}

/// Both eyes of one face
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EyePair {
    pub left: Option<EyeMetrics>,
    pub right: Option<EyeMetrics>,
}

impl EyePair {
    pub fn measure(face: &FaceDetection, thresholds: &EyeThresholds) -> Self {
        Self {
            left: EyeMetrics::measure(face, &LEFT_EYE, thresholds),
            right: EyeMetrics::measure(face, &RIGHT_EYE, thresholds),
        }
    }

    /// Exactly one eye closed, the other open. Both must be measurable.
    pub fn is_wink(&self) -> bool {
        match (self.left, self.right) {
            (Some(l), Some(r)) => l.closed != r.closed,
            _ => false,
        }
    }

    /// `[left ratio, right ratio, left closed, right closed]`, zeros when unmeasured
    pub fn signals(&self) -> [f64; 4] {
        let ratio = |m: Option<EyeMetrics>| m.map(|m| m.aspect_ratio).unwrap_or(0.0);
        let closed = |m: Option<EyeMetrics>| match m {
            Some(m) if m.closed => 1.0,
            _ => 0.0,
        };
        [
            ratio(self.left),
            ratio(self.right),
            closed(self.left),
            closed(self.right),
        ]
    }
}

/// Vertical lip gap divided by nose-to-chin height
pub fn mouth_open_ratio(face: &FaceDetection) -> Option<f64> {
    let upper = face.point(UPPER_LIP)?;
    let lower = face.point(LOWER_LIP)?;
    let nose = face.point(NOSE_TIP)?;
    let chin = face.point(CHIN)?;

    let face_height = nose.distance(&chin);
    if face_height <= f64::EPSILON {
        return None;
    }
    Some((lower.y - upper.y).abs() / face_height)
}

/// Wrist-to-fingertip spread of one hand
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FingerSpread {
    /// Mean of index and middle distances
    pub avg_open: f64,
    /// Mean of ring and pinky distances
    pub avg_closed: f64,
}

impl FingerSpread {
    pub fn new(avg_open: f64, avg_closed: f64) -> Self {
        Self {
            avg_open,
            avg_closed,
        }
    }

    pub fn measure(hand: &HandDetection) -> Option<Self> {
        let wrist = hand.point(WRIST)?;
        let reach = |tip: usize| hand.point(tip).map(|p| wrist.distance(&p));

        let index = reach(INDEX_TIP)?;
        let middle = reach(MIDDLE_TIP)?;
        let ring = reach(RING_TIP)?;
        let pinky = reach(PINKY_TIP)?;

        Some(Self::new((index + middle) / 2.0, (ring + pinky) / 2.0))
    }

    /// Index and middle extended clearly further than ring and pinky
    pub fn is_v_shape(&self, min_ratio: f64) -> bool {
        self.avg_closed > 0.0 && self.avg_open > self.avg_closed * min_ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use landmarks::Keypoint;

    /// Face mesh with only the listed indices populated
    fn mesh(points: &[(usize, f64, f64)]) -> FaceDetection {
        let mut keypoints = vec![Keypoint::Missing; 468];
        for &(i, x, y) in points {
            keypoints[i] = Keypoint::xy(x, y);
        }
        FaceDetection::new(keypoints)
    }

    fn eye(indices: &[usize; 6], cx: f64, width: f64, height: f64) -> Vec<(usize, f64, f64)> {
        vec![
            (indices[0], cx - width / 2.0, 100.0),
            (indices[1], cx - width / 6.0, 100.0 - height / 2.0),
            (indices[2], cx + width / 6.0, 100.0 - height / 2.0),
            (indices[3], cx + width / 2.0, 100.0),
            (indices[4], cx + width / 6.0, 100.0 + height / 2.0),
            (indices[5], cx - width / 6.0, 100.0 + height / 2.0),
        ]
    }

    #[test]
    fn test_open_and_closed_eyes() {
        let mut points = eye(&LEFT_EYE, 200.0, 30.0, 10.0);
        points.extend(eye(&RIGHT_EYE, 300.0, 30.0, 3.0));
        let pair = EyePair::measure(&mesh(&points), &EyeThresholds::default());

        let left = pair.left.unwrap();
        let right = pair.right.unwrap();
        assert!(!left.closed);
        assert!(right.closed);
        assert!((right.aspect_ratio - 0.1).abs() < 1e-9);
        assert!(pair.is_wink());
        assert_eq!(pair.signals(), [left.aspect_ratio, right.aspect_ratio, 0.0, 1.0]);
    }

    #[test]
    fn test_both_closed_is_not_wink() {
        let mut points = eye(&LEFT_EYE, 200.0, 30.0, 2.0);
        points.extend(eye(&RIGHT_EYE, 300.0, 30.0, 2.0));
        let pair = EyePair::measure(&mesh(&points), &EyeThresholds::default());
        assert!(!pair.is_wink());
    }

    #[test]
    fn test_unmeasurable_eye() {
        // Single point and zero width both leave the eye unmeasured
        let face = mesh(&[
            (LEFT_EYE[0], 10.0, 10.0),
            (RIGHT_EYE[1], 5.0, 1.0),
            (RIGHT_EYE[4], 5.0, 9.0),
        ]);
        let pair = EyePair::measure(&face, &EyeThresholds::default());
        assert!(pair.left.is_none());
        assert!(pair.right.is_none());
        assert!(!pair.is_wink());
        assert_eq!(pair.signals(), [0.0; 4]);
    }

    #[test]
    fn test_mouth_open_ratio() {
        let face = mesh(&[
            (NOSE_TIP, 100.0, 100.0),
            (CHIN, 100.0, 200.0),
            (UPPER_LIP, 100.0, 150.0),
            (LOWER_LIP, 100.0, 160.0),
        ]);
        assert!((mouth_open_ratio(&face).unwrap() - 0.1).abs() < 1e-9);
        assert!(mouth_open_ratio(&mesh(&[])).is_none());
    }

    #[test]
    fn test_mouth_ratio_ignores_lateral_offset() {
        let skewed = mesh(&[
            (NOSE_TIP, 100.0, 100.0),
            (CHIN, 100.0, 200.0),
            (UPPER_LIP, 90.0, 150.0),
            (LOWER_LIP, 130.0, 150.0),
        ]);
        assert_eq!(mouth_open_ratio(&skewed), Some(0.0));
    }

    #[test]
    fn test_v_shape_ratio() {
        assert!(FingerSpread::new(100.0, 80.0).is_v_shape(1.2));
        assert!(!FingerSpread::new(90.0, 80.0).is_v_shape(1.2));
        assert!(!FingerSpread::new(90.0, 0.0).is_v_shape(1.2));
    }

    #[test]
    fn test_finger_spread_from_hand() {
        let mut keypoints = vec![Keypoint::xy(0.0, 0.0); 21];
        keypoints[INDEX_TIP] = Keypoint::xy(0.0, 100.0);
        keypoints[MIDDLE_TIP] = Keypoint::xy(0.0, 100.0);
        keypoints[RING_TIP] = Keypoint::xy(0.0, 40.0);
        keypoints[PINKY_TIP] = Keypoint::xy(0.0, 40.0);
        let spread = FingerSpread::measure(&HandDetection::new(keypoints)).unwrap();
        assert_eq!(spread, FingerSpread::new(100.0, 40.0));
        assert!(spread.is_v_shape(1.2));
    }
}
