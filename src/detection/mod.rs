//! Plate detection building blocks
//!
//! `preprocessing` binarizes a frame, `contours` and `plates` propose
//! plate-shaped regions, `ocr` reads them and `aggregate` turns raw readings
//! into results.

pub mod aggregate;
pub mod contours;
pub mod ingest;
pub mod ocr;
pub mod plates;
pub mod preprocessing;
pub mod preview;

pub use aggregate::{aggregate, clean_text};
pub use ingest::decode_image_bytes;
pub use ocr::{OcrSettings, OcrsRecognizer, TextRecognizer};
pub use plates::{PlateGeometry, propose};
pub use preprocessing::preprocess;
pub use preview::{decode_preview, encode_preview};
