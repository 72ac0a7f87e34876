//! Shared data model (§3, C9): the value types every other module builds
//! on, plus the validation helpers that keep their invariants honest.

use crate::error::ValidationError;

/// An 8-bit RGB triple. Immutable value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        RgbColor { r, g, b }
    }

    pub(crate) fn squared_distance(self, other: RgbColor) -> u32 {
        let dr = i32::from(self.r) - i32::from(other.r);
        let dg = i32::from(self.g) - i32::from(other.g);
        let db = i32::from(self.b) - i32::from(other.b);
        (dr * dr + dg * dg + db * db) as u32
    }
}

/// An ordered sequence of 1–256 RGB colors.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Palette(Vec<RgbColor>);

impl Palette {
    pub fn new(colors: Vec<RgbColor>) -> Result<Self, ValidationError> {
        if colors.is_empty() {
            return Err(ValidationError::EmptyPalette);
        }
        if colors.len() > 256 {
            return Err(ValidationError::PaletteTooLarge { len: colors.len() });
        }
        Ok(Palette(colors))
    }

    pub fn colors(&self) -> &[RgbColor] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Flattened RGB triplets, as the wire format and LZW palette-size
    /// calculations want them.
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.0.len() * 3);
        for c in &self.0 {
            out.push(c.r);
            out.push(c.g);
            out.push(c.b);
        }
        out
    }

    /// Smallest `s` in `0..=7` such that `2^(s+1) >= colorCount` (§4.6).
    pub(crate) fn size_field(color_count: usize) -> u8 {
        for s in 0..=7u8 {
            if (1usize << (s + 1)) >= color_count {
                return s;
            }
        }
        7
    }

    pub(crate) fn padded_entry_count(color_count: usize) -> usize {
        1usize << (Self::size_field(color_count) + 1)
    }

    /// Finds the index of the color nearest to `target` (squared Euclidean,
    /// no square root — §4.5).
    pub(crate) fn nearest_index(&self, target: RgbColor) -> u8 {
        let mut best_idx = 0usize;
        let mut best_dist = u32::MAX;
        for (i, c) in self.0.iter().enumerate() {
            let d = c.squared_distance(target);
            if d < best_dist {
                best_dist = d;
                best_idx = i;
                if d == 0 {
                    break;
                }
            }
        }
        best_idx as u8
    }
}

/// `(width, height)` plus `width*height*4` bytes of row-major RGBA pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TruecolorImage {
    width: u16,
    height: u16,
    data: Vec<u8>,
}

impl TruecolorImage {
    pub fn new(width: u16, height: u16, data: Vec<u8>) -> Result<Self, ValidationError> {
        validate_dimensions(width, height)?;
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(ValidationError::BufferLengthMismatch {
                width: width as u32,
                height: height as u32,
                expected,
                actual: data.len(),
            });
        }
        Ok(TruecolorImage { width, height, data })
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel(&self, x: u16, y: u16) -> [u8; 4] {
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        [self.data[offset], self.data[offset + 1], self.data[offset + 2], self.data[offset + 3]]
    }
}

/// `(width, height)` plus a palette and `width*height` index bytes, each
/// `< palette.len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedImage {
    width: u16,
    height: u16,
    palette: Palette,
    indices: Vec<u8>,
}

impl IndexedImage {
    pub fn new(
        width: u16,
        height: u16,
        palette: Palette,
        indices: Vec<u8>,
    ) -> Result<Self, ValidationError> {
        validate_dimensions(width, height)?;
        let expected = width as usize * height as usize;
        if indices.len() != expected {
            return Err(ValidationError::BufferLengthMismatch {
                width: width as u32,
                height: height as u32,
                expected,
                actual: indices.len(),
            });
        }
        validate_pixel_indices(&indices, palette.len())?;
        Ok(IndexedImage { width, height, palette, indices })
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn indices(&self) -> &[u8] {
        &self.indices
    }
}

/// How a frame's sub-rectangle should be treated before the next frame is
/// drawn (§4.8, GLOSSARY "Disposal method").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisposalMethod {
    /// `0` — decoder is not required to take any specific action.
    #[default]
    Unspecified,
    /// `1` — leave the sub-rectangle as-is.
    DoNotDispose,
    /// `2` — restore the sub-rectangle to the background color.
    RestoreBackground,
    /// `3` — restore the sub-rectangle from a pre-draw snapshot.
    RestorePrevious,
}

impl DisposalMethod {
    pub(crate) fn to_code(self) -> u8 {
        match self {
            DisposalMethod::Unspecified => 0,
            DisposalMethod::DoNotDispose => 1,
            DisposalMethod::RestoreBackground => 2,
            DisposalMethod::RestorePrevious => 3,
        }
    }

    pub(crate) fn from_code(code: u8) -> Self {
        match code & 0b111 {
            1 => DisposalMethod::DoNotDispose,
            2 => DisposalMethod::RestoreBackground,
            3 => DisposalMethod::RestorePrevious,
            _ => DisposalMethod::Unspecified,
        }
    }
}

/// A decoded frame: full-canvas RGBA image plus the metadata that produced
/// it (§3 "Frame record (decoded)").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRecord {
    pub canvas: TruecolorImage,
    pub delay_ms: u32,
    pub disposal: DisposalMethod,
    pub left: u16,
    pub top: u16,
    pub sub_width: u16,
    pub sub_height: u16,
    pub transparent_index: Option<u8>,
    /// Set when this record is a placeholder substituted for a frame whose
    /// LZW stream failed to decompress (§4.8 corrupt-frame tolerance).
    pub is_placeholder: bool,
}

/// Metadata captured from extension blocks while decoding (§3 "metadata
/// bag").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataBag {
    /// Names of application/unknown extensions encountered, in order
    /// (e.g. `"NETSCAPE2.0"`, `"XMP DataXMP"`).
    pub extensions: Vec<String>,
    pub comments: Vec<String>,
    pub xmp: Option<String>,
}

/// Everything decoded about the GIF stream besides the frame pixels
/// themselves (§3 "GIF stream descriptor").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GifInfo {
    pub is_89a: bool,
    pub width: u16,
    pub height: u16,
    pub global_palette: Option<Palette>,
    pub background_color_index: u8,
    pub pixel_aspect_ratio: u8,
    pub loop_count: Option<u16>,
    pub frame_count: usize,
    pub total_duration_ms: u32,
    pub metadata: MetadataBag,
}

/// The full decode result: lightweight info plus composited frames
/// (§4.7 "two views").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedGif {
    pub info: GifInfo,
    pub frames: Vec<FrameRecord>,
}

pub(crate) fn validate_dimensions(width: u16, height: u16) -> Result<(), ValidationError> {
    if width == 0 {
        return Err(ValidationError::DimensionOutOfRange { field: "width", value: 0 });
    }
    if height == 0 {
        return Err(ValidationError::DimensionOutOfRange { field: "height", value: 0 });
    }
    Ok(())
}

pub(crate) fn validate_pixel_indices(indices: &[u8], palette_len: usize) -> Result<(), ValidationError> {
    for (position, &index) in indices.iter().enumerate() {
        if index as usize >= palette_len {
            return Err(ValidationError::IndexOutOfPalette {
                index,
                position,
                palette_len,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_size_field_matches_gif_spec_table() {
        assert_eq!(Palette::size_field(1), 0);
        assert_eq!(Palette::size_field(2), 0);
        assert_eq!(Palette::size_field(3), 1);
        assert_eq!(Palette::size_field(4), 1);
        assert_eq!(Palette::size_field(5), 2);
        assert_eq!(Palette::size_field(256), 7);
    }

    #[test]
    fn palette_padded_entry_count_is_power_of_two() {
        assert_eq!(Palette::padded_entry_count(3), 4);
        assert_eq!(Palette::padded_entry_count(4), 4);
        assert_eq!(Palette::padded_entry_count(5), 8);
        assert_eq!(Palette::padded_entry_count(256), 256);
    }

    #[test]
    fn truecolor_image_rejects_mismatched_buffer() {
        let err = TruecolorImage::new(2, 2, vec![0u8; 10]).unwrap_err();
        assert_eq!(
            err,
            ValidationError::BufferLengthMismatch { width: 2, height: 2, expected: 16, actual: 10 }
        );
    }

    #[test]
    fn indexed_image_rejects_out_of_range_index() {
        let palette = Palette::new(vec![RgbColor::new(0, 0, 0)]).unwrap();
        let err = IndexedImage::new(1, 1, palette, vec![5]).unwrap_err();
        assert_eq!(
            err,
            ValidationError::IndexOutOfPalette { index: 5, position: 0, palette_len: 1 }
        );
    }

    #[test]
    fn nearest_index_picks_closest_color() {
        let palette = Palette::new(vec![
            RgbColor::new(0, 0, 0),
            RgbColor::new(255, 255, 255),
            RgbColor::new(255, 0, 0),
        ])
        .unwrap();
        assert_eq!(palette.nearest_index(RgbColor::new(250, 10, 10)), 2);
        assert_eq!(palette.nearest_index(RgbColor::new(10, 10, 10)), 0);
    }
}
