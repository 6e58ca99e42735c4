// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end scenarios: a real server on an ephemeral port, real client
// sockets, full request/reply round trips.

use std::net::SocketAddr;
use std::time::Duration;

use image::{ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect as DrawRect;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;

use papercrop_core::ServerConfig;
use papercrop_net::codec::{decode_image, encode_image, EOF_MARKER};
use papercrop_net::{ImageKind, Server};

/// Start a server on an ephemeral port; returns its address and the
/// shutdown trigger.
async fn spawn_server() -> (SocketAddr, watch::Sender<bool>) {
    let config = ServerConfig {
        host: "127.0.0.1".into(),
        port: 0,
        num_workers: 4,
        ..Default::default()
    };
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let server = Server::bind(config, shutdown_rx).await.expect("bind server");
    let addr = server.local_addr().expect("local addr");
    tokio::spawn(server.run());
    (addr, shutdown_tx)
}

/// One full exchange: connect, send `bytes` + the EOF marker, read the
/// reply until the server closes.
async fn roundtrip(addr: SocketAddr, bytes: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.expect("connect");
    stream.write_all(bytes).await.expect("send image");
    stream.write_all(EOF_MARKER).await.expect("send marker");

    let mut reply = Vec::new();
    stream.read_to_end(&mut reply).await.expect("read reply");
    reply
}

/// White canvas with a black rectangular border, outer corners at
/// `(x0, y0)`-`(x1, y1)`, three pixels thick.
fn bordered_sheet(w: u32, h: u32, x0: i32, y0: i32, x1: i32, y1: i32) -> RgbaImage {
    let mut img = RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255]));
    let black = Rgba([0, 0, 0, 255]);
    for inset in 0..3 {
        let rect = DrawRect::at(x0 + inset, y0 + inset).of_size(
            (x1 - x0 - 2 * inset) as u32,
            (y1 - y0 - 2 * inset) as u32,
        );
        draw_hollow_rect_mut(&mut img, rect, black);
    }
    img
}

#[tokio::test]
async fn bordered_rectangle_comes_back_cropped() {
    let (addr, _shutdown) = spawn_server().await;

    let sheet = bordered_sheet(200, 200, 40, 30, 160, 170);
    let request = encode_image(&sheet, ImageKind::Png).expect("encode");
    let reply = roundtrip(addr, &request).await;

    let (cropped, kind) = decode_image(&reply).expect("decode reply");
    assert_eq!(kind, ImageKind::Png);

    // The crop should hug the drawn border; allow slack for edge
    // localization around the 3px stroke.
    let (w, h) = cropped.dimensions();
    assert!(
        (108..=132).contains(&w),
        "crop width {w} far from the 120px border"
    );
    assert!(
        (128..=152).contains(&h),
        "crop height {h} far from the 140px border"
    );
}

#[tokio::test]
async fn solid_black_degenerates_to_a_center_pixel() {
    let (addr, _shutdown) = spawn_server().await;

    let solid = RgbaImage::from_pixel(100, 100, Rgba([0, 0, 0, 255]));
    let request = encode_image(&solid, ImageKind::Png).expect("encode");
    let reply = roundtrip(addr, &request).await;

    let (cropped, kind) = decode_image(&reply).expect("decode reply");
    assert_eq!(kind, ImageKind::Png);
    assert_eq!(cropped.dimensions(), (1, 1));
}

#[tokio::test]
async fn gray_ramp_single_row_is_degenerate_but_valid() {
    let (addr, _shutdown) = spawn_server().await;

    let mut ramp = RgbaImage::new(4, 1);
    for (x, v) in [0u8, 85, 170, 255].into_iter().enumerate() {
        ramp.put_pixel(x as u32, 0, Rgba([v, v, v, 255]));
    }
    let request = encode_image(&ramp, ImageKind::Png).expect("encode");
    let reply = roundtrip(addr, &request).await;

    // Too short for edge detection: the reply is the degenerate crop.
    let (cropped, _) = decode_image(&reply).expect("decode reply");
    assert_eq!(cropped.dimensions(), (1, 1));
}

#[tokio::test]
async fn jpeg_request_gets_a_jpeg_reply() {
    let (addr, _shutdown) = spawn_server().await;

    let sheet = bordered_sheet(160, 160, 20, 20, 140, 140);
    let request = encode_image(&sheet, ImageKind::Jpeg).expect("encode");
    let reply = roundtrip(addr, &request).await;

    let (_, kind) = decode_image(&reply).expect("decode reply");
    assert_eq!(kind, ImageKind::Jpeg);
}

#[tokio::test]
async fn two_simultaneous_clients_both_get_replies() {
    let (addr, _shutdown) = spawn_server().await;

    let sheet = bordered_sheet(160, 160, 20, 20, 140, 140);
    let request = encode_image(&sheet, ImageKind::Jpeg).expect("encode");

    let (a, b) = tokio::join!(roundtrip(addr, &request), roundtrip(addr, &request));
    for reply in [a, b] {
        let (_, kind) = decode_image(&reply).expect("decode reply");
        assert_eq!(kind, ImageKind::Jpeg);
    }
}

#[tokio::test]
async fn truncated_upload_gets_no_reply_and_server_survives() {
    let (addr, _shutdown) = spawn_server().await;

    let sheet = bordered_sheet(160, 160, 20, 20, 140, 140);
    let request = encode_image(&sheet, ImageKind::Png).expect("encode");

    // Send half the image with no marker, then hang up.
    {
        let mut stream = TcpStream::connect(addr).await.expect("connect");
        stream
            .write_all(&request[..request.len() / 2])
            .await
            .expect("partial send");
        stream.shutdown().await.expect("shutdown write");

        let mut reply = Vec::new();
        stream.read_to_end(&mut reply).await.expect("read");
        assert!(reply.is_empty(), "no reply expected for a truncated upload");
    }

    // The server must still serve the next client.
    let reply = roundtrip(addr, &request).await;
    assert!(decode_image(&reply).is_ok());
}

#[tokio::test]
async fn png_reply_is_lossless_for_a_full_frame_border() {
    // A border at the very edge of the image makes the crop cover
    // (almost) the whole frame, so pixels can be compared directly.
    let (addr, _shutdown) = spawn_server().await;

    let sheet = bordered_sheet(120, 120, 2, 2, 118, 118);
    let request = encode_image(&sheet, ImageKind::Png).expect("encode");
    let reply = roundtrip(addr, &request).await;

    let (cropped, _) = decode_image(&reply).expect("decode reply");
    let (w, h) = cropped.dimensions();
    assert!(w >= 100 && h >= 100, "crop {w}x{h} too small for edge border");

    // PNG round-trips exactly: interior pixels must be pure white.
    let center = cropped.get_pixel(w / 2, h / 2);
    assert_eq!(center, &Rgba([255, 255, 255, 255]));
}

#[tokio::test]
async fn shutdown_stops_the_accept_loop() {
    let (addr, shutdown) = spawn_server().await;
    shutdown.send(true).expect("signal");

    // Give the loop a moment to observe the signal; connects then fail
    // (or succeed briefly and never progress past the semaphore).
    tokio::time::sleep(Duration::from_millis(200)).await;
    let outcome = TcpStream::connect(addr).await;
    if let Ok(mut stream) = outcome {
        // The listener may already be gone; if the connect raced the
        // close, the socket reads EOF without a reply.
        let mut reply = Vec::new();
        let n = tokio::time::timeout(Duration::from_secs(2), stream.read_to_end(&mut reply))
            .await
            .expect("read timed out")
            .unwrap_or(0);
        assert_eq!(n, 0);
    }
}

#[test]
fn request_framing_matches_the_protocol() {
    // The request frame is image bytes + ASCII EOF, nothing else.
    let img = RgbaImage::from_pixel(4, 4, Rgba([9, 9, 9, 255]));
    let mut bytes = encode_image(&img, ImageKind::Png).expect("encode");
    assert_eq!(image::guess_format(&bytes).expect("guess"), ImageFormat::Png);
    bytes.extend_from_slice(EOF_MARKER);
    assert!(bytes.ends_with(b"EOF"));
}
