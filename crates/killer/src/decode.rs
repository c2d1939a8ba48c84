//! QR code detection in camera frames.

use image::DynamicImage;
use tracing::{debug, trace};

/// Decode every readable QR code in `frame`.
///
/// Grids that are detected but fail to decode are skipped, so an empty vector
/// means no payload could be read from this frame.
#[must_use]
pub fn decode_payloads(frame: &DynamicImage) -> Vec<String> {
    let mut prepared = rqrr::PreparedImage::prepare(frame.to_luma8());
    let grids = prepared.detect_grids();
    trace!(grids = grids.len(), "Detected QR grids");

    grids
        .iter()
        .filter_map(|grid| match grid.decode() {
            Ok((meta, content)) => {
                debug!(version = meta.version.0, "Decoded QR payload");
                Some(content)
            }
            Err(e) => {
                debug!(error = %e, "Bad QR grid");
                None
            }
        })
        .collect()
}

/// Decode the first readable QR code in `frame`.
#[must_use]
pub fn decode_first(frame: &DynamicImage) -> Option<String> {
    decode_payloads(frame).into_iter().next()
}
