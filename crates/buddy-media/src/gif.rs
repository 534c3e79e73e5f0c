//! GIF frame sampling.

use buddy_core::error::MediaError;
use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, DynamicImage, ImageDecoder, ImageFormat, Limits};
use std::collections::HashMap;
use std::io::Cursor;

/// Largest accepted canvas side, in pixels.
const MAX_GIF_SIDE: u32 = 4096;

/// Frames to sample from an `n`-frame animation: second, middle,
/// second-to-last. Indices repeat for very short animations.
pub fn gif_frame_indices(frame_count: usize) -> Vec<usize> {
    if frame_count == 0 {
        return Vec::new();
    }
    let second = usize::from(frame_count > 1);
    let middle = frame_count / 2;
    let pre_last = frame_count.saturating_sub(2);
    vec![second, middle, pre_last]
}

fn decode_error(e: image::ImageError) -> MediaError {
    MediaError::Decode(format!("failed to decode gif: {e}"))
}

fn open_decoder(data: &[u8]) -> Result<GifDecoder<Cursor<&[u8]>>, MediaError> {
    let mut decoder = GifDecoder::new(Cursor::new(data)).map_err(decode_error)?;
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_GIF_SIDE);
    limits.max_image_height = Some(MAX_GIF_SIDE);
    decoder
        .set_limits(limits)
        .map_err(|e| MediaError::Decode(format!("gif exceeds decode limits: {e}")))?;
    Ok(decoder)
}

/// Re-encode the sampled frames as PNG.
///
/// Decodes twice: once to count frames, once to keep the sampled ones, so
/// at most one decoded frame and three encoded ones are held at a time.
/// CPU-bound; call from a blocking task.
pub fn gif_frames_to_png(data: &[u8]) -> Result<Vec<Vec<u8>>, MediaError> {
    let mut count = 0usize;
    for frame in open_decoder(data)?.into_frames() {
        frame.map_err(decode_error)?;
        count += 1;
    }
    if count == 0 {
        return Err(MediaError::Decode("gif has no frames".into()));
    }

    let wanted = gif_frame_indices(count);
    let last_wanted = wanted.iter().copied().max().unwrap_or_default();

    let mut encoded: HashMap<usize, Vec<u8>> = HashMap::with_capacity(wanted.len());
    for (idx, frame) in open_decoder(data)?
        .into_frames()
        .enumerate()
        .take(last_wanted + 1)
    {
        let frame = frame.map_err(decode_error)?;
        if !wanted.contains(&idx) {
            continue;
        }
        let mut png = Vec::new();
        DynamicImage::ImageRgba8(frame.into_buffer())
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| MediaError::Decode(format!("failed to encode gif frame: {e}")))?;
        encoded.insert(idx, png);
    }

    wanted
        .iter()
        .map(|idx| {
            encoded
                .get(idx)
                .cloned()
                .ok_or_else(|| MediaError::Decode(format!("gif frame {idx} missing")))
        })
        .collect()
}
