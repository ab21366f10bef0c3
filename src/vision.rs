//! Production landmark acquisition: camera capture, UltraFace detection
//! and a 468-point face mesh, reduced to the six-point eye contours the
//! pipeline consumes. Compiled only with the `vision` feature.

use crate::config::VideoConfig;
use crate::source::LandmarkSource;
use crate::types::{EyeContour, FrameInput, Point2D};
use anyhow::{anyhow, Context, Result};
use colored::*;
use image::{imageops::FilterType, ImageBuffer, Rgb};
use nokhwa::{
    pixel_format::RgbFormat,
    utils::{CameraIndex, RequestedFormat, RequestedFormatType},
    Camera,
};
use ort::session::{builder::GraphOptimizationLevel, Session};

type Frame = ImageBuffer<Rgb<u8>, Vec<u8>>;

// Mesh landmark indices for the six EAR points per eye, in p1..p6 order
const LEFT_EYE_IDX: [usize; 6] = [33, 160, 158, 133, 153, 144];
const RIGHT_EYE_IDX: [usize; 6] = [263, 387, 385, 362, 380, 373];

pub struct CameraSource {
    camera: Camera,
}

impl CameraSource {
    pub fn new(index: u32) -> Result<Self> {
        let cam_index = CameraIndex::Index(index);
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
        let mut camera =
            Camera::new(cam_index, requested).context("Failed to create camera instance")?;

        camera
            .open_stream()
            .map_err(|e| anyhow!(e))
            .context("Failed to open camera stream")?;

        println!(
            "{}",
            format!("Opened camera: {}", camera.info().human_name()).green()
        );
        println!("Format: {}", camera.camera_format());

        Ok(Self { camera })
    }

    pub fn capture(&mut self) -> Result<Frame> {
        let frame = self
            .camera
            .frame()
            .map_err(|e| anyhow!(e))
            .context("Failed to get frame")?;
        let decoded = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| anyhow!(e))
            .context("Failed to decode frame")?;
        Ok(decoded)
    }
}

#[derive(Debug, Clone, Copy)]
struct Roi {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

/// UltraFace single-face detector (320x240 input, anchor decode).
struct FaceDetector {
    session: Session,
    anchors: Vec<(f32, f32, f32, f32)>, // cx, cy, w, h
}

impl FaceDetector {
    fn new(model_path: &str) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(model_path)?;

        let anchors = generate_anchors(320, 240);
        Ok(Self { session, anchors })
    }

    fn detect(&mut self, frame: &Frame) -> Result<Option<Roi>> {
        let resized = image::imageops::resize(frame, 320, 240, FilterType::Triangle);

        // NCHW [1, 3, 240, 320], normalized (pixel - 127) / 128
        let mut input_data = Vec::with_capacity(3 * 240 * 320);
        for channel in 0..3 {
            for y in 0..240 {
                for x in 0..320 {
                    let p = resized.get_pixel(x, y)[channel];
                    input_data.push((p as f32 - 127.0) / 128.0);
                }
            }
        }

        let input_tensor = ort::value::Tensor::from_array((vec![1, 3, 240, 320], input_data))?;
        let outputs = self.session.run(ort::inputs![input_tensor])?;

        let (_scores_shape, scores_data) = outputs["scores"].try_extract_tensor::<f32>()?;
        let (_boxes_shape, boxes_data) = outputs["boxes"].try_extract_tensor::<f32>()?;

        let best = Self::post_process(&self.anchors, scores_data, boxes_data, 0.7);

        Ok(best.map(|roi| {
            // Scale back to the original frame
            let sx = frame.width() as f32 / 320.0;
            let sy = frame.height() as f32 / 240.0;
            Roi {
                x: roi.x * sx,
                y: roi.y * sy,
                width: roi.width * sx,
                height: roi.height * sy,
            }
        }))
    }

    fn post_process(
        anchors: &[(f32, f32, f32, f32)],
        scores_raw: &[f32],
        boxes_raw: &[f32],
        threshold: f32,
    ) -> Option<Roi> {
        // UltraFace decode variances
        let center_variance = 0.1;
        let size_variance = 0.2;

        let mut best_score = 0.0;
        let mut best = None;

        for (i, &(ax, ay, aw, ah)) in anchors.iter().enumerate() {
            let score = scores_raw[i * 2 + 1];
            if score > threshold && score > best_score {
                let cx_enc = boxes_raw[i * 4];
                let cy_enc = boxes_raw[i * 4 + 1];
                let w_enc = boxes_raw[i * 4 + 2];
                let h_enc = boxes_raw[i * 4 + 3];

                let cx = cx_enc * center_variance * aw + ax;
                let cy = cy_enc * center_variance * ah + ay;
                let w = (w_enc * size_variance).exp() * aw;
                let h = (h_enc * size_variance).exp() * ah;

                best_score = score;
                best = Some(Roi {
                    x: (cx - w / 2.0) * 320.0,
                    y: (cy - h / 2.0) * 240.0,
                    width: w * 320.0,
                    height: h * 240.0,
                });
            }
        }

        best
    }
}

fn generate_anchors(width: usize, height: usize) -> Vec<(f32, f32, f32, f32)> {
    let shrinkage_list = [8, 16, 32, 64];
    let min_boxes = [
        vec![10.0, 16.0, 24.0],
        vec![32.0, 48.0],
        vec![64.0, 96.0],
        vec![128.0, 192.0, 256.0],
    ];
    let mut anchors = Vec::new();

    let w = width as f32;
    let h = height as f32;

    for (i, &shrinkage) in shrinkage_list.iter().enumerate() {
        let feature_h = (h / shrinkage as f32).ceil() as usize;
        let feature_w = (w / shrinkage as f32).ceil() as usize;

        for v in 0..feature_h {
            for u in 0..feature_w {
                let cx = (u as f32 * shrinkage as f32 + shrinkage as f32 / 2.0) / w;
                let cy = (v as f32 * shrinkage as f32 + shrinkage as f32 / 2.0) / h;

                for &min_box in &min_boxes[i] {
                    anchors.push((cx, cy, min_box / w, min_box / h));
                }
            }
        }
    }
    anchors
}

/// Camera + detector + face mesh, producing eye contours per frame.
pub struct MeshLandmarkSource {
    camera: CameraSource,
    detector: FaceDetector,
    mesh_session: Session,
}

impl MeshLandmarkSource {
    pub fn new(video: &VideoConfig, mesh_model: &str, detector_model: &str) -> Result<Self> {
        let camera = CameraSource::new(video.camera_index)?;

        println!("Loading face detector from {}...", detector_model);
        let detector = FaceDetector::new(detector_model)
            .with_context(|| format!("Failed to load detector model {}", detector_model))?;

        println!("Loading face mesh from {}...", mesh_model);
        let mesh_session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(mesh_model)
            .with_context(|| format!("Failed to load mesh model {}", mesh_model))?;

        Ok(Self {
            camera,
            detector,
            mesh_session,
        })
    }

    fn mesh_points(&mut self, frame: &Frame) -> Result<Option<Vec<Point2D>>> {
        let roi = match self.detector.detect(frame)? {
            Some(roi) => roi,
            None => return Ok(None),
        };

        // Expand the ROI a little so the mesh sees some context
        let pad_w = roi.width * 0.25;
        let pad_h = roi.height * 0.25;
        let x = (roi.x - pad_w / 2.0).max(0.0);
        let y = (roi.y - pad_h / 2.0).max(0.0);
        let w = (roi.width + pad_w).min(frame.width() as f32 - x);
        let h = (roi.height + pad_h).min(frame.height() as f32 - y);

        let crop = image::imageops::crop_imm(frame, x as u32, y as u32, w as u32, h as u32)
            .to_image();
        let scale_x = w / 192.0;
        let scale_y = h / 192.0;

        // NHWC [1, 192, 192, 3], normalized to [-1, 1]
        let resized = image::imageops::resize(&crop, 192, 192, FilterType::Triangle);
        let mut input_data = Vec::with_capacity(192 * 192 * 3);
        for py in 0..192 {
            for px in 0..192 {
                let pixel = resized.get_pixel(px, py);
                input_data.push((pixel[0] as f32 / 127.5) - 1.0);
                input_data.push((pixel[1] as f32 / 127.5) - 1.0);
                input_data.push((pixel[2] as f32 / 127.5) - 1.0);
            }
        }

        let input = ort::value::Tensor::from_array((vec![1, 192, 192, 3], input_data))?;
        let outputs = self.mesh_session.run(ort::inputs![input])?;
        let (_shape, data) = outputs[0].try_extract_tensor::<f32>()?;

        if data.len() < 1404 {
            return Ok(None);
        }

        let mut points = Vec::with_capacity(468);
        for i in 0..468 {
            // Mesh local (0..192) -> crop -> full frame
            points.push(Point2D::new(
                x + data[i * 3] * scale_x,
                y + data[i * 3 + 1] * scale_y,
            ));
        }
        Ok(Some(points))
    }
}

fn contour_from(points: &[Point2D], indices: &[usize; 6]) -> EyeContour {
    EyeContour::new([
        points[indices[0]],
        points[indices[1]],
        points[indices[2]],
        points[indices[3]],
        points[indices[4]],
        points[indices[5]],
    ])
}

impl LandmarkSource for MeshLandmarkSource {
    fn name(&self) -> String {
        "Face Mesh (468 pts)".to_string()
    }

    fn next_frame(&mut self) -> Result<FrameInput> {
        let frame = self.camera.capture()?;
        match self.mesh_points(&frame)? {
            Some(points) => Ok(FrameInput::Face {
                left_eye: contour_from(&points, &LEFT_EYE_IDX),
                right_eye: contour_from(&points, &RIGHT_EYE_IDX),
            }),
            None => Ok(FrameInput::NoFace),
        }
    }
}
