//! Canvas compositor (C8, §4.8): applies disposal methods and per-frame
//! sub-rectangle overlays to reconstruct full-canvas RGBA output for each
//! decoded frame.

use crate::model::{DisposalMethod, FrameRecord, Palette, TruecolorImage};

/// GIF interlace passes: `(starting row, row step)` (§4.8 step 4,
/// GLOSSARY "Interlacing").
const INTERLACE_PASSES: [(u16, u16); 4] = [(0, 8), (4, 8), (2, 4), (1, 2)];

/// Reorders an interlaced sub-image's rows (stored pass-by-pass in the
/// bitstream) back into top-to-bottom order.
pub(crate) fn deinterlace_rows(indices: &[u8], width: u16, height: u16) -> Vec<u8> {
    let width = width as usize;
    let mut out = vec![0u8; indices.len()];
    let mut src_row = 0usize;
    for &(start, step) in &INTERLACE_PASSES {
        let mut row = start;
        while row < height {
            let src_start = src_row * width;
            let dst_start = row as usize * width;
            out[dst_start..dst_start + width].copy_from_slice(&indices[src_start..src_start + width]);
            src_row += 1;
            row += step;
        }
    }
    out
}

/// Holds the persistent RGBA canvas and the bookkeeping needed to apply the
/// *next* frame's pre-draw disposal step (§4.8 steps 1–2).
pub struct CanvasCompositor {
    canvas: Vec<u8>,
    width: u16,
    height: u16,
    background_rgba: [u8; 4],
    previous_disposal: DisposalMethod,
    previous_rect: (u16, u16, u16, u16),
    snapshot: Option<Vec<u8>>,
}

impl CanvasCompositor {
    /// `background_rgba` is the global palette's background color, or
    /// transparent black (`[0,0,0,0]`) when there is no global palette
    /// (§4.8 "initialized to background color... or transparent").
    pub fn new(width: u16, height: u16, background_rgba: [u8; 4]) -> Self {
        let canvas = background_rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        CanvasCompositor {
            canvas,
            width,
            height,
            background_rgba,
            previous_disposal: DisposalMethod::Unspecified,
            previous_rect: (0, 0, width, height),
            snapshot: None,
        }
    }

    /// Composites a successfully decoded frame onto the canvas and returns
    /// its full-canvas record (§4.8 steps 1–6).
    #[allow(clippy::too_many_arguments)]
    pub fn composite_frame(
        &mut self,
        local_palette: &Palette,
        indices: &[u8],
        left: u16,
        top: u16,
        sub_width: u16,
        sub_height: u16,
        interlaced: bool,
        transparent_index: Option<u8>,
        delay_ms: u32,
        disposal: DisposalMethod,
    ) -> FrameRecord {
        self.apply_previous_disposal();
        self.snapshot_if_needed(disposal);

        let ordered = if interlaced { deinterlace_rows(indices, sub_width, sub_height) } else { indices.to_vec() };
        self.draw_subrect(&ordered, local_palette, left, top, sub_width, sub_height, transparent_index);

        self.previous_disposal = disposal;
        self.previous_rect = (left, top, sub_width, sub_height);

        self.emit_record(delay_ms, disposal, left, top, sub_width, sub_height, transparent_index, false)
    }

    /// Emits a placeholder frame for an image record whose LZW stream
    /// failed to decompress (§4.8 "corrupt-frame tolerance"): a white
    /// sub-rectangle, with disposal still applied so later frames stay in
    /// sync.
    #[allow(clippy::too_many_arguments)]
    pub fn composite_placeholder(
        &mut self,
        left: u16,
        top: u16,
        sub_width: u16,
        sub_height: u16,
        delay_ms: u32,
        disposal: DisposalMethod,
    ) -> FrameRecord {
        log::warn!("compositor: substituting placeholder frame at ({left},{top}) {sub_width}x{sub_height}");
        self.apply_previous_disposal();
        self.snapshot_if_needed(disposal);
        self.fill_rect(left, top, sub_width, sub_height, [255, 255, 255, 255]);

        self.previous_disposal = disposal;
        self.previous_rect = (left, top, sub_width, sub_height);

        self.emit_record(delay_ms, disposal, left, top, sub_width, sub_height, None, true)
    }

    fn snapshot_if_needed(&mut self, disposal: DisposalMethod) {
        if disposal == DisposalMethod::RestorePrevious {
            self.snapshot = Some(self.canvas.clone());
        }
    }

    fn apply_previous_disposal(&mut self) {
        match self.previous_disposal {
            DisposalMethod::Unspecified | DisposalMethod::DoNotDispose => {}
            DisposalMethod::RestoreBackground => {
                log::trace!("compositor: restoring {:?} to background", self.previous_rect);
                let (left, top, w, h) = self.previous_rect;
                self.fill_rect(left, top, w, h, self.background_rgba);
            }
            DisposalMethod::RestorePrevious => {
                if let Some(snapshot) = self.snapshot.take() {
                    log::trace!("compositor: restoring canvas from previous snapshot");
                    self.canvas = snapshot;
                }
            }
        }
    }

    fn fill_rect(&mut self, left: u16, top: u16, w: u16, h: u16, rgba: [u8; 4]) {
        let canvas_w = self.width as usize;
        let canvas_h = self.height as usize;
        for y in 0..h as usize {
            let cy = top as usize + y;
            if cy >= canvas_h {
                break;
            }
            for x in 0..w as usize {
                let cx = left as usize + x;
                if cx >= canvas_w {
                    continue;
                }
                let offset = (cy * canvas_w + cx) * 4;
                self.canvas[offset..offset + 4].copy_from_slice(&rgba);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_subrect(
        &mut self,
        indices: &[u8],
        palette: &Palette,
        left: u16,
        top: u16,
        w: u16,
        h: u16,
        transparent_index: Option<u8>,
    ) {
        let canvas_w = self.width as usize;
        let canvas_h = self.height as usize;
        for y in 0..h as usize {
            let cy = top as usize + y;
            if cy >= canvas_h {
                break;
            }
            for x in 0..w as usize {
                let idx = indices[y * w as usize + x];
                if Some(idx) == transparent_index {
                    continue;
                }
                let cx = left as usize + x;
                if cx >= canvas_w {
                    continue;
                }
                let color = palette.colors()[idx as usize];
                let offset = (cy * canvas_w + cx) * 4;
                self.canvas[offset] = color.r;
                self.canvas[offset + 1] = color.g;
                self.canvas[offset + 2] = color.b;
                self.canvas[offset + 3] = 255;
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn emit_record(
        &self,
        delay_ms: u32,
        disposal: DisposalMethod,
        left: u16,
        top: u16,
        sub_width: u16,
        sub_height: u16,
        transparent_index: Option<u8>,
        is_placeholder: bool,
    ) -> FrameRecord {
        let canvas = TruecolorImage::new(self.width, self.height, self.canvas.clone())
            .expect("compositor canvas always matches width*height*4");
        FrameRecord {
            canvas,
            delay_ms,
            disposal,
            left,
            top,
            sub_width,
            sub_height,
            transparent_index,
            is_placeholder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RgbColor;

    #[test]
    fn deinterlace_reorders_rows_into_top_to_bottom() {
        // S4: 16 one-pixel-wide rows, input stored as [R0,R8,R4,R12,R2,R6,R10,R14,R1,R3,R5,R7,R9,R11,R13,R15].
        let pass_order = [0u8, 8, 4, 12, 2, 6, 10, 14, 1, 3, 5, 7, 9, 11, 13, 15];
        let deinterlaced = deinterlace_rows(&pass_order, 1, 16);
        let expected: Vec<u8> = (0..16).collect();
        assert_eq!(deinterlaced, expected);
    }

    #[test]
    fn background_color_fills_canvas_on_construction() {
        let compositor = CanvasCompositor::new(2, 2, [10, 20, 30, 255]);
        assert_eq!(compositor.canvas, vec![10, 20, 30, 255, 10, 20, 30, 255, 10, 20, 30, 255, 10, 20, 30, 255]);
    }

    #[test]
    fn disposal_restore_background_clears_previous_frames_rectangle() {
        let palette = Palette::new(vec![RgbColor::new(0, 0, 0), RgbColor::new(255, 255, 255)]).unwrap();
        let mut compositor = CanvasCompositor::new(2, 2, [0, 0, 0, 0]);

        // Frame 1: fully opaque white, disposal = RestoreBackground.
        compositor.composite_frame(&palette, &[1, 1, 1, 1], 0, 0, 2, 2, false, None, 0, DisposalMethod::RestoreBackground);

        // Frame 2: fully opaque black over the whole canvas.
        let record =
            compositor.composite_frame(&palette, &[0, 0, 0, 0], 0, 0, 2, 2, false, None, 0, DisposalMethod::Unspecified);

        // The background-restore from frame 1's disposal should have applied
        // before frame 2 drew, and frame 2 overwrote everything anyway; the
        // final canvas should equal frame 2's pixels exactly (property 7).
        assert_eq!(record.canvas.data(), &[0, 0, 0, 255, 0, 0, 0, 255, 0, 0, 0, 255, 0, 0, 0, 255]);
    }

    #[test]
    fn transparent_index_leaves_underlying_canvas_untouched() {
        let palette = Palette::new(vec![RgbColor::new(255, 0, 0), RgbColor::new(0, 255, 0)]).unwrap();
        let mut compositor = CanvasCompositor::new(1, 1, [9, 9, 9, 255]);
        let record = compositor.composite_frame(&palette, &[0], 0, 0, 1, 1, false, Some(0), 0, DisposalMethod::Unspecified);
        assert_eq!(record.canvas.data(), &[9, 9, 9, 255]);
    }

    #[test]
    fn placeholder_frame_is_white_and_marked() {
        let mut compositor = CanvasCompositor::new(2, 2, [0, 0, 0, 255]);
        let record = compositor.composite_placeholder(0, 0, 2, 2, 100, DisposalMethod::Unspecified);
        assert!(record.is_placeholder);
        assert!(record.canvas.data().chunks(4).all(|px| px == [255, 255, 255, 255]));
    }

    #[test]
    fn restore_previous_snapshots_canvas_before_drawing() {
        let palette = Palette::new(vec![RgbColor::new(1, 2, 3), RgbColor::new(4, 5, 6)]).unwrap();
        let mut compositor = CanvasCompositor::new(1, 1, [0, 0, 0, 0]);

        // Frame 1 draws color 0 and asks to be restored to "previous" (the
        // pre-frame-1 background) once frame 2 is processed.
        compositor.composite_frame(&palette, &[0], 0, 0, 1, 1, false, None, 0, DisposalMethod::RestorePrevious);

        // Frame 2 draws somewhere that doesn't cover this pixel isn't
        // possible at 1x1, so instead verify disposal restores to background.
        let record = compositor.composite_frame(&palette, &[1], 0, 0, 1, 1, false, Some(1), 0, DisposalMethod::Unspecified);
        assert_eq!(record.canvas.data(), &[0, 0, 0, 0]);
    }
}
