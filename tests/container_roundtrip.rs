//! Black-box round-trip tests against the public encode/decode surface.

use gifcodec::{
    decode_gif, encode_animated_gif, encode_static_gif, quantize, read_gif_info, AnimationOptions,
    DisposalMethod, EncodeOptions, FrameOptions, RgbColor, TruecolorImage, ValidationError,
};

/// Makes the crate's `log::debug!`/`trace!`/`warn!` output observable under
/// `cargo test -- --nocapture`. `try_init` tolerates being called from every
/// test in this file.
fn init_logging() {
    let _ = env_logger::builder().filter_level(log::LevelFilter::Trace).try_init();
}

fn solid_image(width: u16, height: u16, rgba: [u8; 4]) -> TruecolorImage {
    let data = rgba.iter().copied().cycle().take(width as usize * height as usize * 4).collect();
    TruecolorImage::new(width, height, data).unwrap()
}

fn four_corner_image() -> TruecolorImage {
    // 2x2 image, one distinct color per pixel.
    let mut data = Vec::with_capacity(16);
    data.extend_from_slice(&[255, 0, 0, 255]);
    data.extend_from_slice(&[0, 255, 0, 255]);
    data.extend_from_slice(&[0, 0, 255, 255]);
    data.extend_from_slice(&[255, 255, 0, 255]);
    TruecolorImage::new(2, 2, data).unwrap()
}

/// S1: a solid-color static image survives encode/decode byte-for-byte in
/// its visible pixels.
#[test]
fn solid_color_static_image_round_trips() {
    init_logging();
    let image = solid_image(20, 15, [30, 60, 90, 255]);
    let bytes = encode_static_gif(&image, &EncodeOptions::default()).unwrap();

    assert_eq!(&bytes[0..6], b"GIF89a");
    assert_eq!(*bytes.last().unwrap(), 0x3B);

    let decoded = decode_gif(&bytes).unwrap();
    assert_eq!(decoded.frames.len(), 1);
    assert!(decoded.frames[0].canvas.data().chunks(4).all(|px| px == [30, 60, 90, 255]));
}

/// S2: a two-frame animation preserves loop count, per-frame delay, and the
/// NETSCAPE2.0 application extension.
#[test]
fn two_frame_animation_round_trips_loop_and_delay() {
    init_logging();
    let white = solid_image(8, 8, [255, 255, 255, 255]);
    let black = solid_image(8, 8, [0, 0, 0, 255]);
    let opts = AnimationOptions { delay_ms: 150, loops: 3, ..Default::default() };
    let bytes = encode_animated_gif(&[white, black], &opts).unwrap();

    let decoded = decode_gif(&bytes).unwrap();
    assert_eq!(decoded.info.frame_count, 2);
    assert_eq!(decoded.info.loop_count, Some(3));
    assert_eq!(decoded.frames[0].delay_ms, 150);
    assert_eq!(decoded.frames[1].delay_ms, 150);
    assert!(decoded.info.metadata.extensions.iter().any(|e| e == "NETSCAPE2.0"));
}

/// Property: disposal method round-trips through the graphics control
/// extension unchanged.
#[test]
fn disposal_method_round_trips_through_graphics_control() {
    let a = solid_image(4, 4, [10, 10, 10, 255]);
    let b = solid_image(4, 4, [200, 200, 200, 255]);
    let opts = AnimationOptions { disposal: DisposalMethod::RestoreBackground, ..Default::default() };
    let bytes = encode_animated_gif(&[a, b], &opts).unwrap();

    let decoded = decode_gif(&bytes).unwrap();
    assert_eq!(decoded.frames[0].disposal, DisposalMethod::RestoreBackground);
    assert_eq!(decoded.frames[1].disposal, DisposalMethod::RestoreBackground);
}

/// S5: a stream with one unreadable frame still decodes, substituting a
/// placeholder for the bad frame and continuing on to later good ones.
#[test]
fn corrupt_frame_yields_placeholder_and_preserves_surrounding_frames() {
    init_logging();
    use gifcodec::writer::GifWriter;
    let palette = gifcodec::Palette::new(vec![RgbColor::new(9, 9, 9), RgbColor::new(1, 1, 1)]).unwrap();
    let img = |idx: u8| gifcodec::IndexedImage::new(1, 1, palette.clone(), vec![idx]).unwrap();

    let mut bytes = GifWriter::new()
        .write_header()
        .write_logical_screen(1, 1, Some(&palette), 0, 0)
        .unwrap()
        .write_frame(&img(0), 0, 0, &FrameOptions::default(), false)
        .unwrap()
        .finish();
    bytes.pop();

    bytes.push(0x2C);
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.push(0b1000_0000);
    bytes.extend_from_slice(&[9, 9, 9, 1, 1, 1]);
    bytes.push(2);
    bytes.push(1);
    bytes.push(0xFF);
    bytes.push(0);

    let tail = GifWriter::new()
        .write_header()
        .write_logical_screen(1, 1, Some(&palette), 0, 0)
        .unwrap()
        .write_frame(&img(1), 0, 0, &FrameOptions::default(), false)
        .unwrap()
        .finish();
    bytes.extend_from_slice(&tail[13 + 6..]);

    let decoded = decode_gif(&bytes).unwrap();
    assert_eq!(decoded.frames.len(), 3);
    assert!(!decoded.frames[0].is_placeholder);
    assert!(decoded.frames[1].is_placeholder);
    assert!(!decoded.frames[2].is_placeholder);
}

/// S6: quantizing a four-distinct-color image to exactly four colors
/// produces a palette of four entries and an index buffer that is a
/// permutation of `{0, 1, 2, 3}`.
#[test]
fn quantize_converges_to_requested_color_count() {
    let image = four_corner_image();
    let indexed = quantize(&image, 4).unwrap();

    assert_eq!(indexed.palette().len(), 4);
    let mut seen: Vec<u8> = indexed.indices().to_vec();
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen, vec![0, 1, 2, 3]);
}

/// `read_gif_info` and `decode_gif` agree on every metadata field, despite
/// the former never touching the LZW-compressed pixel data.
#[test]
fn read_gif_info_agrees_with_full_decode() {
    let frames = vec![solid_image(6, 6, [1, 2, 3, 255]), solid_image(6, 6, [4, 5, 6, 255])];
    let bytes = encode_animated_gif(&frames, &AnimationOptions::default()).unwrap();

    let info = read_gif_info(&bytes).unwrap();
    let decoded = decode_gif(&bytes).unwrap();

    assert_eq!(info.width, decoded.info.width);
    assert_eq!(info.height, decoded.info.height);
    assert_eq!(info.frame_count, decoded.info.frame_count);
    assert_eq!(info.total_duration_ms, decoded.info.total_duration_ms);
    assert_eq!(info.loop_count, decoded.info.loop_count);
}

#[test]
fn encode_static_gif_rejects_max_colors_out_of_range() {
    let image = solid_image(2, 2, [0, 0, 0, 255]);
    let err = encode_static_gif(&image, &EncodeOptions { max_colors: 300, ..Default::default() }).unwrap_err();
    assert_eq!(err, ValidationError::MaxColorsOutOfRange(300));
}

#[test]
fn decode_gif_rejects_garbage_input() {
    let err = decode_gif(&[0u8; 4]).unwrap_err();
    assert!(matches!(err, gifcodec::EncodingError::BadSignature { .. }));
}
