//! Median-cut color quantizer (C5, §4.5). Reduces a truecolor image to a
//! palette of at most `max_colors` entries and an index image mapping each
//! pixel into it.
//!
//! Unlike the neural-net quantizer this replaces, median-cut needs no
//! learning-rate schedule: it recursively splits the populated color cube
//! along its widest (perceptually weighted) axis until it has enough boxes
//! or runs out of colors to split.

use std::collections::HashMap;

use crate::error::ValidationError;
use crate::model::{validate_dimensions, IndexedImage, Palette, RgbColor, TruecolorImage};

/// Perceptual channel weights applied before picking a box's split axis —
/// blue varies are less visually salient than red or green (§4.5 step 3).
const RED_WEIGHT: f64 = 1.0;
const GREEN_WEIGHT: f64 = 0.8;
const BLUE_WEIGHT: f64 = 0.5;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    fn value(self, c: RgbColor) -> u8 {
        match self {
            Channel::Red => c.r,
            Channel::Green => c.g,
            Channel::Blue => c.b,
        }
    }
}

struct Box_ {
    colors: Vec<RgbColor>,
}

impl Box_ {
    fn range(&self, channel: Channel) -> u32 {
        let (mut lo, mut hi) = (u8::MAX, u8::MIN);
        for &c in &self.colors {
            let v = channel.value(c);
            lo = lo.min(v);
            hi = hi.max(v);
        }
        u32::from(hi) - u32::from(lo)
    }

    /// The widest axis after applying the perceptual weights, or `None` if
    /// the box is a single color (nothing left to split on).
    fn widest_weighted_channel(&self) -> Option<Channel> {
        if self.colors.len() <= 1 {
            return None;
        }
        let weighted = [
            (Channel::Red, self.range(Channel::Red) as f64 * RED_WEIGHT),
            (Channel::Green, self.range(Channel::Green) as f64 * GREEN_WEIGHT),
            (Channel::Blue, self.range(Channel::Blue) as f64 * BLUE_WEIGHT),
        ];
        weighted.into_iter().max_by(|a, b| a.1.partial_cmp(&b.1).unwrap()).map(|(ch, _)| ch)
    }

    fn mean_color(&self) -> RgbColor {
        let (mut r, mut g, mut b) = (0u64, 0u64, 0u64);
        for &c in &self.colors {
            r += u64::from(c.r);
            g += u64::from(c.g);
            b += u64::from(c.b);
        }
        let n = self.colors.len() as u64;
        RgbColor::new((r / n) as u8, (g / n) as u8, (b / n) as u8)
    }

    /// Splits `self` into two boxes along `channel`'s median, via
    /// quickselect rather than a full sort (§4.5 step 3 "linear-time
    /// selection"). Returns `None` if the split is degenerate (one side
    /// would be empty).
    fn split(mut self, channel: Channel) -> Option<(Box_, Box_)> {
        let mid = self.colors.len() / 2;
        self.colors.select_nth_unstable_by_key(mid, |c| channel.value(*c));
        let median = channel.value(self.colors[mid]);

        let (lower, upper): (Vec<RgbColor>, Vec<RgbColor>) =
            self.colors.into_iter().partition(|&c| channel.value(c) < median);

        if lower.is_empty() || upper.is_empty() {
            return None;
        }
        Some((Box_ { colors: lower }, Box_ { colors: upper }))
    }
}

/// Reduces `image` to a palette of at most `max_colors` entries (`1..=256`)
/// and the corresponding per-pixel index image.
pub fn quantize(image: &TruecolorImage, max_colors: u16) -> Result<IndexedImage, ValidationError> {
    if max_colors == 0 || max_colors > 256 {
        return Err(ValidationError::MaxColorsOutOfRange(u32::from(max_colors)));
    }
    validate_dimensions(image.width(), image.height())?;

    let mut unique: HashMap<RgbColor, ()> = HashMap::new();
    let pixel_count = image.width() as usize * image.height() as usize;
    let mut all_colors = Vec::with_capacity(pixel_count);
    for i in 0..pixel_count {
        let offset = i * 4;
        let c = RgbColor::new(image.data()[offset], image.data()[offset + 1], image.data()[offset + 2]);
        if unique.insert(c, ()).is_none() {
            all_colors.push(c);
        }
    }

    let palette = build_palette(all_colors, max_colors as usize)?;
    let indices = map_pixels_to_palette(image, &palette);

    IndexedImage::new(image.width(), image.height(), palette, indices)
}

/// Builds a palette of at most `max_colors` entries from `colors` via
/// median-cut box splitting (§4.5 steps 2–4).
fn build_palette(colors: Vec<RgbColor>, max_colors: usize) -> Result<Palette, ValidationError> {
    let mut boxes = vec![Box_ { colors }];

    while boxes.len() < max_colors {
        let Some(largest_idx) = boxes
            .iter()
            .enumerate()
            .max_by_key(|(_, b)| b.colors.len())
            .map(|(i, _)| i)
        else {
            break;
        };

        if boxes[largest_idx].colors.len() <= 1 {
            break;
        }

        let Some(channel) = boxes[largest_idx].widest_weighted_channel() else {
            break;
        };

        let target = boxes.swap_remove(largest_idx);
        match target.split(channel) {
            Some((lower, upper)) => {
                boxes.push(lower);
                boxes.push(upper);
            }
            None => {
                // Degenerate split: this box cannot be usefully divided
                // further, put it back and stop trying to grow the palette.
                boxes.push(target);
                break;
            }
        }
    }

    let mean_colors: Vec<RgbColor> = boxes.iter().map(Box_::mean_color).collect();
    Palette::new(mean_colors)
}

/// Maps `image`'s pixels through an already-built `palette` instead of
/// quantizing a new one (§4.5 "Shared-palette mode"): used to apply an
/// animation's first-frame palette to every later frame.
pub(crate) fn map_to_existing_palette(image: &TruecolorImage, palette: &Palette) -> Result<IndexedImage, ValidationError> {
    validate_dimensions(image.width(), image.height())?;
    let indices = map_pixels_to_palette(image, palette);
    IndexedImage::new(image.width(), image.height(), palette.clone(), indices)
}

/// Maps every pixel in `image` to its nearest color in `palette` (§4.5
/// step 5): exact matches for colors drawn from the training set, nearest
/// neighbor for anything else (e.g. a later frame reusing the first
/// frame's shared palette).
fn map_pixels_to_palette(image: &TruecolorImage, palette: &Palette) -> Vec<u8> {
    let pixel_count = image.width() as usize * image.height() as usize;
    let mut cache: HashMap<RgbColor, u8> = HashMap::new();
    let mut indices = Vec::with_capacity(pixel_count);
    for i in 0..pixel_count {
        let offset = i * 4;
        let c = RgbColor::new(image.data()[offset], image.data()[offset + 1], image.data()[offset + 2]);
        let idx = *cache.entry(c).or_insert_with(|| palette.nearest_index(c));
        indices.push(idx);
    }
    indices
}
