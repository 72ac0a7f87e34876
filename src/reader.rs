//! Reader state machine (C7, §4.7): parses a fully-buffered GIF byte stream
//! into a sequence of typed records and drives the canvas compositor (C8)
//! to produce full-canvas frames.
//!
//! Streaming decode (yielding frames before the whole stream is read) is an
//! explicit non-goal (§1); this walks a cursor over the entire input
//! instead of an incremental `Read`-based state machine (§9 "Suspension").

use crate::compositor::CanvasCompositor;
use crate::error::EncodingError;
use crate::lzw;
use crate::model::{DecodedGif, DisposalMethod, FrameRecord, GifInfo, MetadataBag, Palette, RgbColor};
use crate::subblock::{read_sub_blocks, skip_sub_blocks};

const NETSCAPE_IDENTIFIER: &[u8] = b"NETSCAPE2.0";
const XMP_IDENTIFIER: &[u8] = b"XMP DataXMP";

struct PendingGraphicsControl {
    disposal: DisposalMethod,
    delay_ms: u32,
    transparent_index: Option<u8>,
}

struct ImageHeader {
    left: u16,
    top: u16,
    width: u16,
    height: u16,
    local_palette: Option<Palette>,
    interlaced: bool,
}

struct ScreenPreamble {
    is_89a: bool,
    width: u16,
    height: u16,
    global_palette: Option<Palette>,
    background_color_index: u8,
    pixel_aspect_ratio: u8,
}

/// Parses `bytes` and composites every frame, returning both the stream's
/// metadata and its full-canvas frame records (§4.7 "two views": this is
/// the full view; see [`read_info`] for the lightweight one).
pub fn decode_gif(bytes: &[u8]) -> Result<DecodedGif, EncodingError> {
    let mut offset = 0usize;
    let preamble = read_screen_preamble(bytes, &mut offset)?;

    let background_rgba = background_rgba(&preamble);
    let mut compositor = CanvasCompositor::new(preamble.width, preamble.height, background_rgba);
    let mut metadata = MetadataBag::default();
    let mut loop_count = None;
    let mut pending_gce: Option<PendingGraphicsControl> = None;
    let mut frames = Vec::new();
    let mut total_duration_ms = 0u32;

    loop {
        let separator = read_u8(bytes, &mut offset, "record separator")?;
        match separator {
            0x21 => read_extension(bytes, &mut offset, &mut metadata, &mut loop_count, &mut pending_gce)?,
            0x2C => {
                let gce = pending_gce.take();
                let delay_ms = gce.as_ref().map_or(0, |g| g.delay_ms);
                let disposal = gce.as_ref().map_or(DisposalMethod::Unspecified, |g| g.disposal);
                let transparent_index = gce.as_ref().and_then(|g| g.transparent_index);

                let header = read_image_header(bytes, &mut offset)?;
                let palette = header
                    .local_palette
                    .as_ref()
                    .or(preamble.global_palette.as_ref())
                    .ok_or(EncodingError::MalformedExtension {
                        offset,
                        reason: "image record has neither a local nor a global color table",
                    })?
                    .clone();
                let min_code_size = read_u8(bytes, &mut offset, "lzw minimum code size")?;
                let compressed = read_sub_blocks(bytes, &mut offset)?;

                let pixel_count = header.width as usize * header.height as usize;
                let record = match lzw::decompress(&compressed, min_code_size) {
                    Ok(indices) if indices.len() == pixel_count => compositor.composite_frame(
                        &palette,
                        &indices,
                        header.left,
                        header.top,
                        header.width,
                        header.height,
                        header.interlaced,
                        transparent_index,
                        delay_ms,
                        disposal,
                    ),
                    _ => compositor.composite_placeholder(header.left, header.top, header.width, header.height, delay_ms, disposal),
                };
                total_duration_ms += record.delay_ms;
                frames.push(record);
            }
            0x3B => break,
            other => {
                return Err(EncodingError::UnexpectedSeparator {
                    byte: other,
                    offset: offset - 1,
                    context: "expected extension introducer, image descriptor, or trailer",
                    context_dump: EncodingError::printable_or_escape_dump(bytes, offset - 1),
                });
            }
        }
    }

    Ok(DecodedGif {
        info: GifInfo {
            is_89a: preamble.is_89a,
            width: preamble.width,
            height: preamble.height,
            global_palette: preamble.global_palette,
            background_color_index: preamble.background_color_index,
            pixel_aspect_ratio: preamble.pixel_aspect_ratio,
            loop_count,
            frame_count: frames.len(),
            total_duration_ms,
            metadata,
        },
        frames,
    })
}

/// Parses just enough of `bytes` to report stream metadata, without
/// decompressing any frame's pixels (§4.7 "two views": the lightweight
/// one).
pub fn read_info(bytes: &[u8]) -> Result<GifInfo, EncodingError> {
    let mut offset = 0usize;
    let preamble = read_screen_preamble(bytes, &mut offset)?;

    let mut metadata = MetadataBag::default();
    let mut loop_count = None;
    let mut pending_gce: Option<PendingGraphicsControl> = None;
    let mut frame_count = 0usize;
    let mut total_duration_ms = 0u32;

    loop {
        let separator = read_u8(bytes, &mut offset, "record separator")?;
        match separator {
            0x21 => read_extension(bytes, &mut offset, &mut metadata, &mut loop_count, &mut pending_gce)?,
            0x2C => {
                let delay_ms = pending_gce.take().map_or(0, |g| g.delay_ms);
                let _header = read_image_header(bytes, &mut offset)?;
                let _min_code_size = read_u8(bytes, &mut offset, "lzw minimum code size")?;
                skip_sub_blocks(bytes, &mut offset)?;
                frame_count += 1;
                total_duration_ms += delay_ms;
            }
            0x3B => break,
            other => {
                return Err(EncodingError::UnexpectedSeparator {
                    byte: other,
                    offset: offset - 1,
                    context: "expected extension introducer, image descriptor, or trailer",
                    context_dump: EncodingError::printable_or_escape_dump(bytes, offset - 1),
                });
            }
        }
    }

    Ok(GifInfo {
        is_89a: preamble.is_89a,
        width: preamble.width,
        height: preamble.height,
        global_palette: preamble.global_palette,
        background_color_index: preamble.background_color_index,
        pixel_aspect_ratio: preamble.pixel_aspect_ratio,
        loop_count,
        frame_count,
        total_duration_ms,
        metadata,
    })
}

fn background_rgba(preamble: &ScreenPreamble) -> [u8; 4] {
    match &preamble.global_palette {
        Some(p) => {
            let c = p.colors().get(preamble.background_color_index as usize).copied().unwrap_or(RgbColor::new(0, 0, 0));
            [c.r, c.g, c.b, 255]
        }
        None => [0, 0, 0, 0],
    }
}

fn read_screen_preamble(bytes: &[u8], offset: &mut usize) -> Result<ScreenPreamble, EncodingError> {
    let is_89a = read_signature(bytes)?;
    *offset = 6;
    log::debug!("reader: signature ok, is_89a={is_89a}");

    let width = read_u16_le(bytes, offset, "logical screen width")?;
    let height = read_u16_le(bytes, offset, "logical screen height")?;
    let packed = read_u8(bytes, offset, "logical screen packed byte")?;
    let background_color_index = read_u8(bytes, offset, "background color index")?;
    let pixel_aspect_ratio = read_u8(bytes, offset, "pixel aspect ratio")?;

    let has_global_table = packed & 0b1000_0000 != 0;
    let global_palette =
        if has_global_table { Some(read_color_table(bytes, offset, packed & 0b0000_0111)?) } else { None };

    Ok(ScreenPreamble { is_89a, width, height, global_palette, background_color_index, pixel_aspect_ratio })
}

fn read_signature(bytes: &[u8]) -> Result<bool, EncodingError> {
    if bytes.len() < 6 {
        return Err(EncodingError::BadSignature { offset: 0, dump: describe_signature_failure(bytes) });
    }
    match &bytes[0..6] {
        b"GIF87a" => Ok(false),
        b"GIF89a" => Ok(true),
        _ => Err(EncodingError::BadSignature { offset: 0, dump: describe_signature_failure(bytes) }),
    }
}

/// Renders a hex dump of the first bytes, with a hint when the input looks
/// like a different well-known format entirely (§4.7 "special-case
/// detection").
fn describe_signature_failure(bytes: &[u8]) -> String {
    let dump = EncodingError::hex_dump(bytes);
    let hint = if bytes.first() == Some(&b'<') {
        Some("looks like XML/HTML, not a GIF")
    } else if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        Some("looks like a PNG file")
    } else if bytes.starts_with(&[0xFF, 0xD8]) {
        Some("looks like a JPEG file")
    } else {
        None
    };
    match hint {
        Some(h) => format!("{dump} ({h})"),
        None => dump,
    }
}

fn read_color_table(bytes: &[u8], offset: &mut usize, size_field: u8) -> Result<Palette, EncodingError> {
    let count = 1usize << (size_field + 1);
    let start = *offset;
    let end = start + count * 3;
    if end > bytes.len() {
        return Err(EncodingError::UnexpectedEof { offset: start, context: "color table" });
    }
    let colors = bytes[start..end].chunks_exact(3).map(|c| RgbColor::new(c[0], c[1], c[2])).collect();
    *offset = end;
    Palette::new(colors).map_err(|_| EncodingError::MalformedExtension {
        offset: start,
        reason: "color table size field overflowed the 256-color maximum",
    })
}

fn read_extension(
    bytes: &[u8],
    offset: &mut usize,
    metadata: &mut MetadataBag,
    loop_count: &mut Option<u16>,
    pending_gce: &mut Option<PendingGraphicsControl>,
) -> Result<(), EncodingError> {
    let label = read_u8(bytes, offset, "extension label")?;
    match label {
        0xFF => read_application_extension(bytes, offset, metadata, loop_count),
        0xF9 => {
            *pending_gce = Some(read_graphics_control_extension(bytes, offset)?);
            Ok(())
        }
        0xFE => {
            let text = read_sub_blocks(bytes, offset)?;
            metadata.comments.push(String::from_utf8_lossy(&text).into_owned());
            Ok(())
        }
        0x01 => {
            let block_size = read_u8(bytes, offset, "plain text block size")?;
            let start = *offset;
            let end = start + block_size as usize;
            if end > bytes.len() {
                return Err(EncodingError::UnexpectedEof { offset: start, context: "plain text grid data" });
            }
            *offset = end;
            skip_sub_blocks(bytes, offset)
        }
        other => {
            metadata.extensions.push(format!("unknown extension 0x{other:02X}"));
            skip_sub_blocks(bytes, offset)
        }
    }
}

fn read_application_extension(
    bytes: &[u8],
    offset: &mut usize,
    metadata: &mut MetadataBag,
    loop_count: &mut Option<u16>,
) -> Result<(), EncodingError> {
    let block_size = read_u8(bytes, offset, "application extension block size")?;
    if block_size != 11 {
        return Err(EncodingError::MalformedExtension { offset: *offset, reason: "application extension block size must be 11" });
    }
    let start = *offset;
    let end = start + 11;
    if end > bytes.len() {
        return Err(EncodingError::UnexpectedEof { offset: start, context: "application extension identifier" });
    }
    let identifier = &bytes[start..end];
    *offset = end;

    if identifier == NETSCAPE_IDENTIFIER {
        log::debug!("reader: NETSCAPE2.0 application extension");
        metadata.extensions.push("NETSCAPE2.0".to_string());
        let payload = read_sub_blocks(bytes, offset)?;
        if payload.len() >= 3 && payload[0] == 0x01 {
            *loop_count = Some(u16::from_le_bytes([payload[1], payload[2]]));
        }
    } else if identifier == XMP_IDENTIFIER {
        metadata.extensions.push("XMP DataXMP".to_string());
        let payload = read_sub_blocks(bytes, offset)?;
        metadata.xmp = Some(String::from_utf8_lossy(&payload).into_owned());
    } else {
        metadata.extensions.push(String::from_utf8_lossy(identifier).into_owned());
        skip_sub_blocks(bytes, offset)?;
    }
    Ok(())
}

fn read_graphics_control_extension(bytes: &[u8], offset: &mut usize) -> Result<PendingGraphicsControl, EncodingError> {
    let block_size = read_u8(bytes, offset, "graphics control block size")?;
    if block_size != 4 {
        return Err(EncodingError::MalformedExtension { offset: *offset, reason: "graphics control block size must be 4" });
    }
    let packed = read_u8(bytes, offset, "graphics control packed byte")?;
    let delay_cs = read_u16_le(bytes, offset, "graphics control delay")?;
    let transparent_color_index = read_u8(bytes, offset, "graphics control transparent index")?;
    let terminator = read_u8(bytes, offset, "graphics control terminator")?;
    if terminator != 0 {
        return Err(EncodingError::MalformedExtension {
            offset: *offset - 1,
            reason: "graphics control extension missing zero terminator",
        });
    }

    let disposal = DisposalMethod::from_code(packed >> 2);
    let has_transparency = packed & 0b0000_0001 != 0;
    Ok(PendingGraphicsControl {
        disposal,
        delay_ms: u32::from(delay_cs) * 10,
        transparent_index: has_transparency.then_some(transparent_color_index),
    })
}

fn read_image_header(bytes: &[u8], offset: &mut usize) -> Result<ImageHeader, EncodingError> {
    let left = read_u16_le(bytes, offset, "image descriptor left")?;
    let top = read_u16_le(bytes, offset, "image descriptor top")?;
    let width = read_u16_le(bytes, offset, "image descriptor width")?;
    let height = read_u16_le(bytes, offset, "image descriptor height")?;
    let packed = read_u8(bytes, offset, "image descriptor packed byte")?;

    let has_local_table = packed & 0b1000_0000 != 0;
    let interlaced = packed & 0b0100_0000 != 0;
    let local_palette =
        if has_local_table { Some(read_color_table(bytes, offset, packed & 0b0000_0111)?) } else { None };

    Ok(ImageHeader { left, top, width, height, local_palette, interlaced })
}

fn read_u8(bytes: &[u8], offset: &mut usize, context: &'static str) -> Result<u8, EncodingError> {
    let byte = *bytes.get(*offset).ok_or(EncodingError::UnexpectedEof { offset: *offset, context })?;
    *offset += 1;
    Ok(byte)
}

fn read_u16_le(bytes: &[u8], offset: &mut usize, context: &'static str) -> Result<u16, EncodingError> {
    let lo = read_u8(bytes, offset, context)?;
    let hi = read_u8(bytes, offset, context)?;
    Ok(u16::from_le_bytes([lo, hi]))
}
