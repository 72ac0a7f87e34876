//! A self-contained GIF89a encoder/decoder: its own bit-level LZW codec,
//! sub-block framer, median-cut color quantizer, and canvas compositor, with
//! no reliance on any host graphics system or the `gif` crate.
//!
//! Four entry points cover the common cases:
//!
//! - [`encode_static_gif`] — single truecolor frame in, GIF bytes out.
//! - [`encode_animated_gif`] — multiple truecolor frames sharing one
//!   quantized palette, GIF bytes out.
//! - [`decode_gif`] — GIF bytes in, stream metadata plus full-canvas frames
//!   out.
//! - [`quantize`] — the median-cut color reducer on its own, for callers who
//!   only need an indexed image.
//!
//! [`GifWriter`] is also public for callers who want per-frame control
//! beyond what the two `encode_*` functions offer.

mod bitio;
mod compositor;
pub mod error;
mod lzw;
pub mod model;
#[path = "quantize.rs"]
mod quantizer;
mod reader;
mod subblock;
pub mod writer;

pub use error::{EncodingError, ValidationError};
pub use model::{
    DecodedGif, DisposalMethod, FrameRecord, GifInfo, IndexedImage, MetadataBag, Palette, RgbColor,
    TruecolorImage,
};
pub use writer::{FrameOptions, GifWriter};

/// Options for [`encode_static_gif`].
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    /// Upper bound on the quantized palette size, `1..=256`.
    pub max_colors: u16,
    /// Background color; mapped to the nearest entry in the quantized
    /// palette. Defaults to palette index 0.
    pub background: Option<RgbColor>,
    pub pixel_aspect_ratio: u8,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        EncodeOptions { max_colors: 256, background: None, pixel_aspect_ratio: 0 }
    }
}

/// Options for [`encode_animated_gif`].
#[derive(Debug, Clone)]
pub struct AnimationOptions {
    /// Upper bound on the shared palette size, `1..=256`, built from the
    /// first frame only (§4.5 "Shared-palette mode").
    pub max_colors: u16,
    /// Netscape loop count; `0` means infinite.
    pub loops: u16,
    pub background: Option<RgbColor>,
    pub pixel_aspect_ratio: u8,
    /// Default per-frame delay, used for any frame without an override in
    /// `frame_options`.
    pub delay_ms: u32,
    pub disposal: DisposalMethod,
    pub transparent_index: Option<u8>,
    /// Per-frame overrides, matched to `frames` by index. Frames past the
    /// end of this list (or all of them, if `None`) use the defaults above.
    pub frame_options: Option<Vec<FrameOptions>>,
}

impl Default for AnimationOptions {
    fn default() -> Self {
        AnimationOptions {
            max_colors: 256,
            loops: 0,
            background: None,
            pixel_aspect_ratio: 0,
            delay_ms: 100,
            disposal: DisposalMethod::Unspecified,
            transparent_index: None,
            frame_options: None,
        }
    }
}

/// Quantizes `image` to at most `max_colors` palette entries and returns the
/// resulting indexed image (C5, §4.5).
pub fn quantize(image: &TruecolorImage, max_colors: u16) -> Result<IndexedImage, ValidationError> {
    quantizer::quantize(image, max_colors)
}

/// Encodes a single truecolor image as a static (one-frame) GIF (C6/C10,
/// §6.2).
pub fn encode_static_gif(image: &TruecolorImage, opts: &EncodeOptions) -> Result<Vec<u8>, ValidationError> {
    if opts.max_colors == 0 || opts.max_colors > 256 {
        return Err(ValidationError::MaxColorsOutOfRange(u32::from(opts.max_colors)));
    }
    let indexed = quantizer::quantize(image, opts.max_colors)?;
    let background_index = opts.background.map(|c| indexed.palette().nearest_index(c)).unwrap_or(0);

    log::debug!(
        "encode_static_gif: {}x{} -> {} colors",
        image.width(),
        image.height(),
        indexed.palette().len()
    );

    Ok(GifWriter::new()
        .write_header()
        .write_logical_screen(indexed.width(), indexed.height(), Some(indexed.palette()), background_index, opts.pixel_aspect_ratio)?
        .write_frame(&indexed, 0, 0, &FrameOptions::default(), false)?
        .finish())
}

/// Encodes a sequence of same-sized truecolor frames as an animated GIF
/// (C6/C10, §6.2). The palette is quantized from the first frame only and
/// shared by every later frame (§4.5 "Shared-palette mode", §9 Open
/// Question 3).
pub fn encode_animated_gif(frames: &[TruecolorImage], opts: &AnimationOptions) -> Result<Vec<u8>, ValidationError> {
    if opts.max_colors == 0 || opts.max_colors > 256 {
        return Err(ValidationError::MaxColorsOutOfRange(u32::from(opts.max_colors)));
    }
    let Some(first) = frames.first() else {
        return Err(ValidationError::NoFrames);
    };
    let width = first.width();
    let height = first.height();
    for (index, frame) in frames.iter().enumerate().skip(1) {
        if frame.width() != width || frame.height() != height {
            return Err(ValidationError::FrameSizeMismatch {
                index,
                width: u32::from(frame.width()),
                height: u32::from(frame.height()),
                expected_width: u32::from(width),
                expected_height: u32::from(height),
            });
        }
    }

    let first_indexed = quantizer::quantize(first, opts.max_colors)?;
    let palette = first_indexed.palette().clone();
    let background_index = opts.background.map(|c| palette.nearest_index(c)).unwrap_or(0);

    log::debug!("encode_animated_gif: {} frames, {}x{}, {} shared colors", frames.len(), width, height, palette.len());

    let mut writer = GifWriter::new()
        .write_header()
        .write_logical_screen(width, height, Some(&palette), background_index, opts.pixel_aspect_ratio)?
        .write_animation_info(opts.loops);

    for (index, frame) in frames.iter().enumerate() {
        let indexed = if index == 0 { first_indexed.clone() } else { quantizer::map_to_existing_palette(frame, &palette)? };

        let frame_opts = opts
            .frame_options
            .as_ref()
            .and_then(|overrides| overrides.get(index))
            .cloned()
            .unwrap_or_else(|| FrameOptions {
                delay_ms: opts.delay_ms,
                disposal: opts.disposal,
                transparent_index: opts.transparent_index,
            });

        writer = writer.write_frame(&indexed, 0, 0, &frame_opts, true)?;
    }

    Ok(writer.finish())
}

/// Decodes a GIF byte stream into its stream metadata and full-canvas frame
/// records (C7/C8/C10, §6.2, §4.7 "two views").
pub fn decode_gif(bytes: &[u8]) -> Result<DecodedGif, EncodingError> {
    reader::decode_gif(bytes)
}

/// Parses just the stream metadata (dimensions, frame count, total
/// duration, extensions) without decompressing any frame's pixels (§4.7
/// "two views": the lightweight one).
pub fn read_gif_info(bytes: &[u8]) -> Result<GifInfo, EncodingError> {
    reader::read_info(bytes)
}
