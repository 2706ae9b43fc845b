//! Rectangle detection from image contours
//!
//! The image is binarized with Otsu's threshold (dark shapes become
//! foreground), outer contours are simplified with Douglas-Peucker and every
//! four-cornered polygon that passes the request limits is reported.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::contrast::otsu_level;
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;
use tracing::debug;

use crate::vision::detector::{DetectionError, Detector, RectangleObservation, RectangleRequest};
use crate::vision::models::NormalizedPoint;

/// Douglas-Peucker tolerance as a fraction of the contour perimeter
const POLYGON_EPSILON: f64 = 0.02;

/// Contour-based rectangle detector
#[derive(Debug, Default)]
pub struct ContourRectangleDetector;

impl ContourRectangleDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Detector for ContourRectangleDetector {
    type Request = RectangleRequest;
    type Observation = RectangleObservation;

    fn name(&self) -> &'static str {
        "contours"
    }

    fn detect(
        &self,
        image: &DynamicImage,
        request: &RectangleRequest,
    ) -> Result<Vec<RectangleObservation>, DetectionError> {
        let gray = image.to_luma8();
        let (width, height) = gray.dimensions();

        let Some(dark) = binarize(&gray) else {
            debug!("Uniform image, no shapes to detect");
            return Ok(vec![]);
        };
        let light = invert(&dark);

        let mut observations = Vec::new();
        for binary in [&dark, &light] {
            for corners in quadrilaterals(binary) {
                let (side_w, side_h) = side_lengths(&corners);
                if !request.accepts(side_w, side_h, width, height) {
                    continue;
                }

                let confidence = rectangularity(&corners);
                observations.push(RectangleObservation {
                    corners: corners.map(|(x, y)| {
                        NormalizedPoint::new(x / width as f32, y / height as f32)
                    }),
                    confidence,
                });
            }
        }

        debug!("Contour detector found {} quadrilaterals", observations.len());
        Ok(observations)
    }
}

/// Four-cornered outer contours of a binary image that do not touch its border
fn quadrilaterals(binary: &GrayImage) -> Vec<[(f32, f32); 4]> {
    let (width, height) = binary.dimensions();
    find_contours::<i32>(binary)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.points.len() >= 4)
        .filter(|c| !touches_border(&c.points, width, height))
        .filter_map(|contour| {
            let epsilon = arc_length(&contour.points, true) * POLYGON_EPSILON;
            let polygon = approximate_polygon_dp(&contour.points, epsilon, true);
            quadrilateral(&polygon, epsilon as f32)
        })
        .collect()
}

/// Threshold with Otsu's level, dark pixels as foreground; `None` for images
/// without contrast
fn binarize(gray: &GrayImage) -> Option<GrayImage> {
    let min = gray.pixels().map(|p| p[0]).min()?;
    let max = gray.pixels().map(|p| p[0]).max()?;
    if min == max {
        return None;
    }
    let level = otsu_level(gray);
    Some(GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y)[0] <= level {
            Luma([255])
        } else {
            Luma([0])
        }
    }))
}

/// Swap foreground and background of a binary image
fn invert(binary: &GrayImage) -> GrayImage {
    GrayImage::from_fn(binary.width(), binary.height(), |x, y| {
        Luma([255 - binary.get_pixel(x, y)[0]])
    })
}

fn touches_border(points: &[Point<i32>], width: u32, height: u32) -> bool {
    let max_x = width as i32 - 1;
    let max_y = height as i32 - 1;
    points
        .iter()
        .any(|p| p.x <= 0 || p.y <= 0 || p.x >= max_x || p.y >= max_y)
}

/// Order a four-point polygon as top-left, top-right, bottom-right, bottom-left.
///
/// The simplified contour may still hold the start point of the trace as an
/// extra vertex on a straight edge; such vertices are dropped first.
fn quadrilateral(polygon: &[Point<i32>], epsilon: f32) -> Option<[(f32, f32); 4]> {
    let mut points: Vec<(f32, f32)> = polygon.iter().map(|p| (p.x as f32, p.y as f32)).collect();
    points.dedup();
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    let points = drop_collinear(points, epsilon);
    if points.len() != 4 {
        return None;
    }

    let by = |key: fn(&(f32, f32)) -> f32, largest: bool| {
        let iter = points.iter().copied();
        if largest {
            iter.max_by(|a, b| key(a).total_cmp(&key(b)))
        } else {
            iter.min_by(|a, b| key(a).total_cmp(&key(b)))
        }
    };

    let top_left = by(|p| p.0 + p.1, false)?;
    let bottom_right = by(|p| p.0 + p.1, true)?;
    let top_right = by(|p| p.0 - p.1, true)?;
    let bottom_left = by(|p| p.0 - p.1, false)?;
    Some([top_left, top_right, bottom_right, bottom_left])
}

/// Remove vertices lying within `epsilon` of the line through their neighbours
fn drop_collinear(mut points: Vec<(f32, f32)>, epsilon: f32) -> Vec<(f32, f32)> {
    loop {
        let n = points.len();
        if n <= 3 {
            return points;
        }
        let redundant = (0..n).find(|&i| {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            distance_to_line(points[i], prev, next) < epsilon
        });
        match redundant {
            Some(i) => {
                points.remove(i);
            }
            None => return points,
        }
    }
}

fn distance_to_line(p: (f32, f32), a: (f32, f32), b: (f32, f32)) -> f32 {
    let length = distance(a, b);
    if length == 0.0 {
        return distance(p, a);
    }
    ((b.0 - a.0) * (a.1 - p.1) - (a.0 - p.0) * (b.1 - a.1)).abs() / length
}

fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

/// Mean horizontal and vertical side lengths
fn side_lengths(c: &[(f32, f32); 4]) -> (f32, f32) {
    let width = (distance(c[0], c[1]) + distance(c[3], c[2])) / 2.0;
    let height = (distance(c[0], c[3]) + distance(c[1], c[2])) / 2.0;
    (width, height)
}

/// Polygon area over the area of its side-length rectangle, in `[0, 1]`
fn rectangularity(c: &[(f32, f32); 4]) -> f32 {
    let shoelace: f32 = (0..4)
        .map(|i| {
            let (x1, y1) = c[i];
            let (x2, y2) = c[(i + 1) % 4];
            x1 * y2 - x2 * y1
        })
        .sum::<f32>()
        .abs()
        / 2.0;
    let (w, h) = side_lengths(c);
    if w * h <= 0.0 {
        return 0.0;
    }
    (shoelace / (w * h)).clamp(0.0, 1.0)
}
