//! Keypoint shapes and coordinate extraction

use serde::{Deserialize, Serialize};

/// 2D point in detector pixel space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point2) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Object-shaped keypoint as emitted by the detector.
///
/// Any subset of the coordinate fields may be present.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PointKeypoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec<f64>>,

    #[serde(default, rename = "positionRaw", skip_serializing_if = "Option::is_none")]
    pub position_raw: Option<Vec<f64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,

    /// Detection confidence (0-1)
    #[serde(default, alias = "confidence", skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    /// Named body part (e.g. "nose", "leftShoulder")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part: Option<String>,
}

/// A single landmark entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Keypoint {
    /// `[x, y]` or `[x, y, score]`
    Pair(Vec<f64>),
    /// Object with `position` / `positionRaw` / `x`,`y`
    Point(PointKeypoint),
    /// `null` slot in the detector output
    Missing,
}

impl Keypoint {
    /// Plain `x`/`y` keypoint
    pub fn xy(x: f64, y: f64) -> Self {
        Keypoint::Point(PointKeypoint {
            x: Some(x),
            y: Some(y),
            ..Default::default()
        })
    }

    /// `x`/`y` keypoint with a confidence score
    pub fn scored(x: f64, y: f64, score: f64) -> Self {
        Keypoint::Point(PointKeypoint {
            x: Some(x),
            y: Some(y),
            score: Some(score),
            ..Default::default()
        })
    }

    /// Named body-part keypoint using the `position` pair
    pub fn part(name: &str, x: f64, y: f64, score: f64) -> Self {
        Keypoint::Point(PointKeypoint {
            position: Some(vec![x, y]),
            score: Some(score),
            part: Some(name.to_string()),
            ..Default::default()
        })
    }

    /// Resolve the 2D coordinate.
    ///
    /// Tries `position`, then `positionRaw`, then `x`/`y`, then the array
    /// form. First match wins.
    pub fn coordinate(&self) -> Option<Point2> {
        match self {
            Keypoint::Point(p) => pair(p.position.as_deref())
                .or_else(|| pair(p.position_raw.as_deref()))
                .or_else(|| match (p.x, p.y) {
                    (Some(x), Some(y)) => Some(Point2::new(x, y)),
                    _ => None,
                }),
            Keypoint::Pair(values) => pair(Some(values.as_slice())),
            Keypoint::Missing => None,
        }
    }

    /// Confidence score, if the detector reported one
    pub fn score(&self) -> Option<f64> {
        match self {
            Keypoint::Point(p) => p.score,
            Keypoint::Pair(values) => values.get(2).copied(),
            Keypoint::Missing => None,
        }
    }

    /// Body-part name, if the detector reported one
    pub fn part_name(&self) -> Option<&str> {
        match self {
            Keypoint::Point(p) => p.part.as_deref(),
            _ => None,
        }
    }
}

fn pair(values: Option<&[f64]>) -> Option<Point2> {
    match values {
        Some([x, y, ..]) => Some(Point2::new(*x, *y)),
        _ => None,
    }
}

/// Collect every resolvable coordinate, skipping unresolvable keypoints
pub fn coordinates(keypoints: &[Keypoint]) -> Vec<Point2> {
    keypoints.iter().filter_map(Keypoint::coordinate).collect()
}
