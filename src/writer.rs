//! Writer state machine (C6, §4.6): serializes header, logical screen,
//! optional animation-loop extension, and per-frame graphics-control +
//! image descriptor + indexed pixels. Modeled as a type-stated builder
//! (§9 "Builder pattern") so illegal call orders are caught at compile time
//! rather than with a runtime state guard.

use std::marker::PhantomData;

use bytes::{BufMut, BytesMut};

use crate::error::ValidationError;
use crate::lzw;
use crate::model::{validate_dimensions, DisposalMethod, IndexedImage, Palette};
use crate::subblock::write_sub_blocks;

const GIF_HEADER: &[u8; 6] = b"GIF89a";
const NETSCAPE_IDENTIFIER: &[u8; 11] = b"NETSCAPE2.0";

/// Per-frame delay/disposal/transparency metadata (§4.6 "Per-frame").
#[derive(Debug, Clone, Default)]
pub struct FrameOptions {
    pub delay_ms: u32,
    pub disposal: DisposalMethod,
    pub transparent_index: Option<u8>,
}

impl FrameOptions {
    /// Whether this frame needs a graphics control extension on its own
    /// merits, independent of whether the GIF as a whole is animated.
    pub(crate) fn carries_metadata(&self) -> bool {
        self.delay_ms != 0 || self.disposal != DisposalMethod::Unspecified || self.transparent_index.is_some()
    }
}

/// Marker types for [`GifWriter`]'s state machine (§4.6, §9 "Builder pattern").
pub struct Initial;
pub struct HeaderWritten;
pub struct ScreenWritten;

/// Type-stated GIF byte-stream builder. Each stage consumes the previous
/// state and returns the next, so writing a frame before the logical
/// screen descriptor is a compile error rather than a runtime one.
pub struct GifWriter<State> {
    buf: BytesMut,
    _state: PhantomData<State>,
}

impl Default for GifWriter<Initial> {
    fn default() -> Self {
        GifWriter { buf: BytesMut::new(), _state: PhantomData }
    }
}

impl GifWriter<Initial> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits `"GIF89a"` (§4.6 "Header").
    pub fn write_header(mut self) -> GifWriter<HeaderWritten> {
        log::trace!("writer: header");
        self.buf.put_slice(GIF_HEADER);
        GifWriter { buf: self.buf, _state: PhantomData }
    }
}

impl GifWriter<HeaderWritten> {
    /// Emits the logical screen descriptor and, if present, the padded
    /// global color table (§4.6 "Logical screen descriptor").
    pub fn write_logical_screen(
        mut self,
        width: u16,
        height: u16,
        global_palette: Option<&Palette>,
        background_color_index: u8,
        pixel_aspect_ratio: u8,
    ) -> Result<GifWriter<ScreenWritten>, ValidationError> {
        validate_dimensions(width, height)?;
        log::debug!("writer: logical screen {width}x{height}, global_palette={}", global_palette.is_some());

        self.buf.put_u16_le(width);
        self.buf.put_u16_le(height);

        let packed = match global_palette {
            Some(p) => {
                if p.is_empty() {
                    return Err(ValidationError::EmptyPalette);
                }
                if p.len() > 256 {
                    return Err(ValidationError::PaletteTooLarge { len: p.len() });
                }
                0b1_111_0_000 | Palette::size_field(p.len())
            }
            None => 0b0_111_0_000,
        };
        self.buf.put_u8(packed);
        self.buf.put_u8(background_color_index);
        self.buf.put_u8(pixel_aspect_ratio);

        if let Some(p) = global_palette {
            write_padded_palette(&mut self.buf, p);
        }

        Ok(GifWriter { buf: self.buf, _state: PhantomData })
    }
}

impl GifWriter<ScreenWritten> {
    /// Emits the Netscape 2.0 application extension carrying the animation
    /// loop count (§4.6 "Animation info", §6.1).
    pub fn write_animation_info(mut self, loop_count: u16) -> Self {
        log::debug!("writer: NETSCAPE2.0 loop_count={loop_count}");
        self.buf.put_u8(0x21);
        self.buf.put_u8(0xFF);
        self.buf.put_u8(11);
        self.buf.put_slice(NETSCAPE_IDENTIFIER);
        self.buf.put_u8(0x03);
        self.buf.put_u8(0x01);
        self.buf.put_u16_le(loop_count);
        self.buf.put_u8(0x00);
        self
    }

    /// Emits one frame: an optional graphics control extension, the image
    /// descriptor, the padded local color table, and the LZW-compressed
    /// indexed pixels (§4.6 "Per-frame"). `force_gce` is set by callers
    /// encoding an animated GIF, where every frame carries a graphics
    /// control extension regardless of whether its own options are default.
    pub fn write_frame(
        mut self,
        image: &IndexedImage,
        left: u16,
        top: u16,
        opts: &FrameOptions,
        force_gce: bool,
    ) -> Result<Self, ValidationError> {
        validate_dimensions(image.width(), image.height())?;
        if left.checked_add(image.width()).is_none() || top.checked_add(image.height()).is_none() {
            return Err(ValidationError::InvalidSubRectangle {
                left,
                top,
                width: image.width(),
                height: image.height(),
            });
        }

        if force_gce || opts.carries_metadata() {
            self.write_graphics_control(opts);
        }

        log::trace!("writer: frame at ({left},{top}) {}x{}", image.width(), image.height());
        self.buf.put_u8(0x2C);
        self.buf.put_u16_le(left);
        self.buf.put_u16_le(top);
        self.buf.put_u16_le(image.width());
        self.buf.put_u16_le(image.height());

        let palette = image.palette();
        let packed = 0b1_0_0_00_000 | Palette::size_field(palette.len());
        self.buf.put_u8(packed);
        write_padded_palette(&mut self.buf, palette);

        let min_code_size = lzw_min_code_size(palette.len());
        self.buf.put_u8(min_code_size);
        let compressed = lzw::compress(image.indices(), min_code_size)
            .expect("lzw_min_code_size guarantees every index fits under the chosen clear code");
        self.buf.put_slice(&write_sub_blocks(&compressed));

        Ok(self)
    }

    fn write_graphics_control(&mut self, opts: &FrameOptions) {
        let delay_centiseconds = ((opts.delay_ms as f64 / 10.0).round() as u32).min(65535) as u16;
        let packed = (opts.disposal.to_code() & 0b111) << 2 | opts.transparent_index.is_some() as u8;
        log::trace!("writer: graphics control delay={delay_centiseconds}cs packed={packed:#04x}");
        self.buf.put_u8(0x21);
        self.buf.put_u8(0xF9);
        self.buf.put_u8(4);
        self.buf.put_u8(packed);
        self.buf.put_u16_le(delay_centiseconds);
        self.buf.put_u8(opts.transparent_index.unwrap_or(0));
        self.buf.put_u8(0x00);
    }

    /// Emits the trailer byte and returns the finished byte stream
    /// (§4.6 "Trailer").
    pub fn finish(mut self) -> Vec<u8> {
        self.buf.put_u8(0x3B);
        self.buf.to_vec()
    }
}

fn write_padded_palette(buf: &mut BytesMut, palette: &Palette) {
    let mut bytes = palette.to_rgb_bytes();
    let padded_len = Palette::padded_entry_count(palette.len()) * 3;
    bytes.resize(padded_len, 0);
    buf.put_slice(&bytes);
}

/// Smallest `n ∈ [2, 8]` such that `2^n >= paletteLen` (§4.3 "initialCodeSize",
/// GIF minimum of 2 even for a 2-color palette).
pub(crate) fn lzw_min_code_size(palette_len: usize) -> u8 {
    let mut n = 2u8;
    while (1usize << n) < palette_len {
        n += 1;
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RgbColor;

    fn gray_palette(n: usize) -> Palette {
        Palette::new((0..n).map(|i| RgbColor::new(i as u8, i as u8, i as u8)).collect()).unwrap()
    }

    #[test]
    fn header_and_trailer_bracket_the_stream() {
        let palette = gray_palette(2);
        let image = IndexedImage::new(1, 1, palette.clone(), vec![0]).unwrap();
        let bytes = GifWriter::new()
            .write_header()
            .write_logical_screen(1, 1, Some(&palette), 0, 0)
            .unwrap()
            .write_frame(&image, 0, 0, &FrameOptions::default(), false)
            .unwrap()
            .finish();
        assert_eq!(&bytes[..6], b"GIF89a");
        assert_eq!(*bytes.last().unwrap(), 0x3B);
    }

    #[test]
    fn global_color_table_is_padded_to_power_of_two() {
        let palette = gray_palette(3);
        let bytes = GifWriter::new()
            .write_header()
            .write_logical_screen(4, 4, Some(&palette), 0, 0)
            .unwrap()
            .finish();
        // header(6) + width/height(4) + packed(1) + bg(1) + par(1) = 13 bytes
        // before the color table, which for 3 colors pads to 4 entries (12 bytes).
        let table_start = 13;
        let table = &bytes[table_start..table_start + 12];
        assert_eq!(&table[..9], &palette.to_rgb_bytes()[..]);
        assert_eq!(&table[9..], &[0, 0, 0]);
    }

    #[test]
    fn lzw_min_code_size_matches_gif_minimum_and_palette_growth() {
        assert_eq!(lzw_min_code_size(1), 2);
        assert_eq!(lzw_min_code_size(2), 2);
        assert_eq!(lzw_min_code_size(3), 2);
        assert_eq!(lzw_min_code_size(4), 2);
        assert_eq!(lzw_min_code_size(5), 3);
        assert_eq!(lzw_min_code_size(256), 8);
    }

    #[test]
    fn frame_with_no_metadata_and_no_force_omits_graphics_control() {
        let palette = gray_palette(2);
        let image = IndexedImage::new(1, 1, palette.clone(), vec![0]).unwrap();
        let bytes = GifWriter::new()
            .write_header()
            .write_logical_screen(1, 1, Some(&palette), 0, 0)
            .unwrap()
            .write_frame(&image, 0, 0, &FrameOptions::default(), false)
            .unwrap()
            .finish();
        // No 0x21 0xF9 graphics control block should appear before the 0x2C
        // image descriptor.
        let image_descriptor_pos = bytes.iter().position(|&b| b == 0x2C).unwrap();
        assert!(!bytes[..image_descriptor_pos].contains(&0xF9));
    }

    #[test]
    fn animated_frame_forces_graphics_control_even_with_default_options() {
        let palette = gray_palette(2);
        let image = IndexedImage::new(1, 1, palette.clone(), vec![0]).unwrap();
        let bytes = GifWriter::new()
            .write_header()
            .write_logical_screen(1, 1, Some(&palette), 0, 0)
            .unwrap()
            .write_frame(&image, 0, 0, &FrameOptions::default(), true)
            .unwrap()
            .finish();
        assert!(bytes.contains(&0xF9));
    }
}
