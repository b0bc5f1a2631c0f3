//! Real-time object detection relay.
//!
//! Clients push frames over a WebSocket (`/ws`); each frame is decoded, shrunk to the
//! configured budget, run through an ONNX YOLO model on a dedicated worker thread, and
//! answered with boxes, confidences, labels and per-detection identities.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
