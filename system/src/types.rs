use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type StrokeId = u64;
pub type Username = String;

/// Every present user keyed by display name.
pub type Pencils = BTreeMap<Username, Pencil>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub id: StrokeId,
    pub color: String,
    pub points: Vec<Point>,
}

impl Stroke {
    pub fn new(id: StrokeId, start: Point, color: String) -> Self {
        Self {
            id,
            color,
            points: vec![start],
        }
    }

    pub fn add_point(&mut self, point: Point) {
        self.points.push(point);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pencil {
    pub username: Username,
    pub position: Point,
    /// Stroke being drawn between `down` and `up`.
    pub current_line: Option<StrokeId>,
}

impl Pencil {
    pub fn new(position: Point, username: Username) -> Self {
        Self {
            username,
            position,
            current_line: None,
        }
    }
}
