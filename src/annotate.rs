//! Result overlays
//!
//! Draws the detection results of a snapshot on top of the source image:
//! text boxes, rectangle outlines, the pose skeleton and barcode boxes, each
//! in its own color.

use anyhow::{Context, Result};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use std::path::Path;
use tracing::info;

use crate::acquisition::SelectedImage;
use crate::vision::{JointName, NormalizedRect, PoseResult, VisionSnapshot};

const TEXT_COLOR: Rgba<u8> = Rgba([0, 122, 255, 255]);
const RECTANGLE_COLOR: Rgba<u8> = Rgba([52, 199, 89, 255]);
const POSE_COLOR: Rgba<u8> = Rgba([255, 149, 0, 255]);
const BARCODE_COLOR: Rgba<u8> = Rgba([175, 82, 222, 255]);

/// Skeleton segments drawn between located joints
const BONES: [(JointName, JointName); 16] = [
    (JointName::Nose, JointName::LeftEye),
    (JointName::Nose, JointName::RightEye),
    (JointName::LeftEye, JointName::LeftEar),
    (JointName::RightEye, JointName::RightEar),
    (JointName::LeftShoulder, JointName::RightShoulder),
    (JointName::LeftShoulder, JointName::LeftElbow),
    (JointName::LeftElbow, JointName::LeftWrist),
    (JointName::RightShoulder, JointName::RightElbow),
    (JointName::RightElbow, JointName::RightWrist),
    (JointName::LeftShoulder, JointName::LeftHip),
    (JointName::RightShoulder, JointName::RightHip),
    (JointName::LeftHip, JointName::RightHip),
    (JointName::LeftHip, JointName::LeftKnee),
    (JointName::LeftKnee, JointName::LeftAnkle),
    (JointName::RightHip, JointName::RightKnee),
    (JointName::RightKnee, JointName::RightAnkle),
];

/// Draw every result in the snapshot over the image
pub fn annotate(image: &DynamicImage, snapshot: &VisionSnapshot) -> RgbaImage {
    let mut canvas = image.to_rgba8();

    for text in &snapshot.texts {
        outline(&mut canvas, &text.bounding_box, TEXT_COLOR);
    }

    for rectangle in &snapshot.rectangles {
        let (width, height) = canvas.dimensions();
        let corners = rectangle.corners.map(|c| {
            let (x, y) = c.to_pixels(width, height);
            (x as f32, y as f32)
        });
        for (start, end) in corners.iter().zip(corners.iter().cycle().skip(1)) {
            draw_line_segment_mut(&mut canvas, *start, *end, RECTANGLE_COLOR);
        }
    }

    if let Some(pose) = &snapshot.pose {
        draw_pose(&mut canvas, pose);
    }

    for barcode in &snapshot.barcodes {
        outline(&mut canvas, &barcode.bounding_box, BARCODE_COLOR);
    }

    canvas
}

/// Decode the selected image, draw the results and write a PNG
pub fn save_annotated(image: &SelectedImage, snapshot: &VisionSnapshot, path: &Path) -> Result<()> {
    let decoded = image.decode().context("Failed to decode image for annotation")?;
    let annotated = annotate(&decoded, snapshot);
    annotated
        .save(path)
        .with_context(|| format!("Failed to write annotated image: {:?}", path))?;
    info!("Wrote annotated image to {:?}", path);
    Ok(())
}

fn outline(canvas: &mut RgbaImage, bounds: &NormalizedRect, color: Rgba<u8>) {
    let (width, height) = canvas.dimensions();
    let (left, top, w, h) = bounds.to_pixels(width, height);
    // imageproc rejects empty rectangles
    let rect = Rect::at(left, top).of_size(w.max(1), h.max(1));
    draw_hollow_rect_mut(canvas, rect, color);
}

fn draw_pose(canvas: &mut RgbaImage, pose: &PoseResult) {
    let (width, height) = canvas.dimensions();
    let radius = (width.min(height) / 100).max(2) as i32;
    let to_pixels = |name: JointName| {
        pose.joint(name).map(|j| {
            let (x, y) = j.location.to_pixels(width, height);
            (x as f32, y as f32)
        })
    };

    for (from, to) in BONES {
        if let (Some(start), Some(end)) = (to_pixels(from), to_pixels(to)) {
            draw_line_segment_mut(canvas, start, end, POSE_COLOR);
        }
    }

    for joint in &pose.joints {
        let center = joint.location.to_pixels(width, height);
        draw_filled_circle_mut(canvas, center, radius, POSE_COLOR);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::{
        DetectedBarcode, DetectedRectangle, DetectedText, NormalizedPoint, PoseJoint, Symbology,
    };
    use std::time::Duration;

    fn white(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba([255, 255, 255, 255]),
        ))
    }

    #[test]
    fn test_empty_snapshot_leaves_image_unchanged() {
        let image = white(20, 20);
        let annotated = annotate(&image, &VisionSnapshot::default());
        assert_eq!(annotated, image.to_rgba8());
    }

    #[test]
    fn test_text_box_is_outlined() {
        let snapshot = VisionSnapshot {
            texts: vec![DetectedText {
                text: "hello".to_string(),
                confidence: 0.9,
                bounding_box: NormalizedRect::new(0.1, 0.2, 0.5, 0.3),
                processing_time: Duration::ZERO,
            }],
            ..Default::default()
        };

        let annotated = annotate(&white(100, 100), &snapshot);
        assert_eq!(*annotated.get_pixel(10, 20), TEXT_COLOR);
        assert_eq!(*annotated.get_pixel(30, 20), TEXT_COLOR);
        // interior stays untouched
        assert_eq!(*annotated.get_pixel(30, 35), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_rectangle_corners_are_connected() {
        let snapshot = VisionSnapshot {
            rectangles: vec![DetectedRectangle {
                bounding_box: NormalizedRect::new(0.2, 0.2, 0.6, 0.6),
                confidence: 0.9,
                corners: [
                    NormalizedPoint::new(0.2, 0.2),
                    NormalizedPoint::new(0.8, 0.2),
                    NormalizedPoint::new(0.8, 0.8),
                    NormalizedPoint::new(0.2, 0.8),
                ],
            }],
            ..Default::default()
        };

        let annotated = annotate(&white(100, 100), &snapshot);
        assert_eq!(*annotated.get_pixel(50, 20), RECTANGLE_COLOR);
        assert_eq!(*annotated.get_pixel(80, 50), RECTANGLE_COLOR);
        assert_eq!(*annotated.get_pixel(50, 80), RECTANGLE_COLOR);
        // closing edge from bottom-left back to top-left
        assert_eq!(*annotated.get_pixel(20, 50), RECTANGLE_COLOR);
    }

    #[test]
    fn test_pose_joints_are_marked() {
        let snapshot = VisionSnapshot {
            pose: Some(PoseResult {
                joints: vec![
                    PoseJoint {
                        name: JointName::LeftShoulder,
                        location: NormalizedPoint::new(0.25, 0.5),
                        confidence: 0.9,
                    },
                    PoseJoint {
                        name: JointName::RightShoulder,
                        location: NormalizedPoint::new(0.75, 0.5),
                        confidence: 0.9,
                    },
                ],
                processing_time: Duration::ZERO,
            }),
            ..Default::default()
        };

        let annotated = annotate(&white(100, 100), &snapshot);
        assert_eq!(*annotated.get_pixel(25, 50), POSE_COLOR);
        // bone between the shoulders
        assert_eq!(*annotated.get_pixel(50, 50), POSE_COLOR);
    }

    #[test]
    fn test_zero_sized_barcode_box_does_not_panic() {
        let snapshot = VisionSnapshot {
            barcodes: vec![DetectedBarcode {
                payload: "x".to_string(),
                symbology: Symbology::Qr,
                bounding_box: NormalizedRect::new(0.5, 0.5, 0.0, 0.0),
            }],
            ..Default::default()
        };

        let annotated = annotate(&white(10, 10), &snapshot);
        assert_eq!(annotated.dimensions(), (10, 10));
    }

    #[test]
    fn test_save_annotated_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annotated.png");
        let selected = SelectedImage::new(
            crate::acquisition::image::test_images::solid_png(8, 8),
            crate::acquisition::MediaSource::Library,
        );

        save_annotated(&selected, &VisionSnapshot::default(), &path).unwrap();
        let written = image::open(&path).unwrap();
        assert_eq!(written.width(), 8);
    }
}
