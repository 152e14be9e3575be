// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Channel clients against in-process device simulators.

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::{BufRead, BufReader, Cursor, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use touchagent_core::{
    CaptureMode, ControlChannel, ControlCommand, ControlReply, FrameSource, Point, StreamSource,
    Swipe, TouchDevice,
};
use touchagent_io::codec::write_packet;
use touchagent_io::{ControlClient, ScreenshotClient, TouchClient, VideoStreamListener};

const WAIT: Duration = Duration::from_secs(5);

fn bind() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

/// A PNG large enough to pass the screenshot length check.
fn noisy_png(width: u32, height: u32) -> Vec<u8> {
    let mut state = 0x2545_f491u32;
    let image = RgbImage::from_fn(width, height, |_, _| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let [a, b, c, _] = state.to_le_bytes();
        Rgb([a, b, c])
    });
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    assert!(bytes.len() > 1024);
    bytes
}

fn read_line(reader: &mut BufReader<TcpStream>) -> Option<String> {
    let mut line = String::new();
    match reader.read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim_end().to_string()),
    }
}

#[test]
fn test_touch_commands_use_line_protocol() {
    let (listener, port) = bind();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut writer = stream.try_clone().unwrap();
        let mut reader = BufReader::new(stream);
        while let Some(line) = read_line(&mut reader) {
            writer.write_all(b"OK\n").unwrap();
            tx.send(line).unwrap();
        }
    });

    let client = TouchClient::new("127.0.0.1", port, Duration::from_millis(100));
    assert!(!client.is_connected());
    assert!(client.tap(Point::new(10, 20), Duration::ZERO));
    assert!(client.is_connected());
    assert!(client.swipe(&Swipe::new(Point::new(1, 2), Point::new(3, 4), 5)));

    assert_eq!(rx.recv_timeout(WAIT).unwrap(), "tap 10 20");
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), "swipe 1 2 3 4 5");
}

#[test]
fn test_touch_reconnects_after_peer_drop() {
    let (listener, port) = bind();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for connection in 0..2 {
            let (stream, _) = listener.accept().unwrap();
            let mut writer = stream.try_clone().unwrap();
            let mut reader = BufReader::new(stream);
            if connection == 0 {
                let line = read_line(&mut reader).unwrap();
                writer.write_all(b"OK\n").unwrap();
                tx.send((connection, line)).unwrap();
                // Dropping both halves closes the first connection.
                continue;
            }
            while let Some(line) = read_line(&mut reader) {
                tx.send((connection, line)).unwrap();
            }
        }
    });

    let client = TouchClient::new("127.0.0.1", port, Duration::from_millis(100));
    assert!(client.tap(Point::new(1, 1), Duration::ZERO));
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), (0, "tap 1 1".to_string()));
    thread::sleep(Duration::from_millis(50));

    // The next tap may be lost on the dead socket; the one after must arrive on the new one.
    client.tap(Point::new(2, 2), Duration::ZERO);
    assert!(client.tap(Point::new(3, 3), Duration::ZERO));

    let deadline = Instant::now() + WAIT;
    let mut last = None;
    while Instant::now() < deadline {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(entry) => {
                let done = entry.1 == "tap 3 3";
                last = Some(entry);
                if done {
                    break;
                }
            }
            Err(_) => continue,
        }
    }
    assert_eq!(last, Some((1, "tap 3 3".to_string())));
}

#[test]
fn test_touch_without_server_fails_quietly() {
    let (listener, port) = bind();
    drop(listener);
    let client = TouchClient::new("127.0.0.1", port, Duration::from_millis(100));
    assert!(!client.tap(Point::new(0, 0), Duration::ZERO));
    assert!(!client.is_connected());
    assert!(!client.reconnect());
}

#[test]
fn test_screenshot_round_trip() {
    let png = noisy_png(64, 48);
    let (listener, port) = bind();
    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut writer = stream.try_clone().unwrap();
        let mut reader = BufReader::new(stream);
        while let Some(line) = read_line(&mut reader) {
            assert_eq!(line, "screenshot");
            write_packet(&mut writer, &png).unwrap();
        }
    });

    let client = ScreenshotClient::new("127.0.0.1", port, Duration::from_secs(2));
    let first = client.capture_frame().expect("first frame");
    let second = client.capture_frame().expect("second frame");
    assert_eq!((first.width(), first.height()), (64, 48));
    assert!(second.seq() > first.seq());
}

#[test]
fn test_screenshot_rejects_malformed_length() {
    let (listener, port) = bind();
    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut writer = stream.try_clone().unwrap();
        let mut reader = BufReader::new(stream);
        if read_line(&mut reader).is_some() {
            write_packet(&mut writer, &[0u8; 16]).unwrap();
        }
        thread::sleep(Duration::from_millis(200));
    });

    let client = ScreenshotClient::new("127.0.0.1", port, Duration::from_secs(2));
    assert!(client.capture_frame().is_none());
}

#[test]
fn test_control_query_and_switch() {
    let (listener, port) = bind();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for reply in ["STATUS:VIDEO_STREAM_MODE\n", "ACK_SWITCH_TO_SCREENSHOT\n", "HUH\n"] {
            let (stream, _) = listener.accept().unwrap();
            let mut writer = stream.try_clone().unwrap();
            let mut reader = BufReader::new(stream);
            let command = read_line(&mut reader).unwrap();
            writer.write_all(reply.as_bytes()).unwrap();
            tx.send(command).unwrap();
        }
    });

    let client = ControlClient::new("127.0.0.1", port, Duration::from_secs(2));
    assert_eq!(client.query_mode(), Some(CaptureMode::VideoStream));
    assert_eq!(
        client.send(ControlCommand::SwitchToScreenshot),
        Some(ControlReply::ScreenshotAck)
    );
    assert_eq!(
        client.send(ControlCommand::SwitchToVideo),
        Some(ControlReply::Unknown("HUH".into()))
    );

    assert_eq!(rx.recv_timeout(WAIT).unwrap(), "query_status");
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), "SWITCH_TO_SCREENSHOT");
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), "switch_to_video");
}

#[test]
fn test_video_listener_keeps_latest_frame() {
    let png = noisy_png(32, 32);
    let (listener, port) = bind();
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        for _ in 0..3 {
            // Split each packet across two writes to exercise reassembly.
            let mut wire = Vec::new();
            write_packet(&mut wire, &png).unwrap();
            let (head, tail) = wire.split_at(wire.len() / 2);
            if stream.write_all(head).is_err() {
                return;
            }
            thread::sleep(Duration::from_millis(10));
            if stream.write_all(tail).is_err() {
                return;
            }
        }
        thread::sleep(Duration::from_secs(2));
    });

    let video = VideoStreamListener::new("127.0.0.1", port, Duration::from_secs(2));
    assert!(video.capture_frame().is_none());
    assert!(video.start());

    let deadline = Instant::now() + WAIT;
    while !video.is_ready() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(20));
    }
    assert!(video.is_ready());
    let frame = video.capture_frame().expect("decoded frame");
    assert_eq!((frame.width(), frame.height()), (32, 32));

    video.stop();
}
