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

use super::decoder::{ImagePacketDecoder, PacketDecoder};
use crate::codec::{LengthBounds, PacketAssembler};
use crate::error::GatewayError;
use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use touchagent_core::{Frame, FrameSource, Signal, StreamSource};

const CHANNEL: &str = "video";
const POLL_INTERVAL: Duration = Duration::from_millis(200);

type DecoderFactory = Box<dyn Fn() -> Box<dyn PacketDecoder> + Send + Sync>;

#[derive(Default)]
struct StreamState {
    latest: Mutex<Option<Frame>>,
    ready: Signal,
    seq: AtomicU64,
}

/// Receives the video stream on a background thread and keeps the latest frame.
///
/// Each [`start`](StreamSource::start) opens a fresh connection and a fresh decoder.
/// The frame buffer only ever holds the most recent picture; consumers that fall
/// behind skip frames rather than queue them.
pub struct VideoStreamListener {
    addr: String,
    connect_timeout: Duration,
    decoder_factory: DecoderFactory,
    state: Arc<StreamState>,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl VideoStreamListener {
    /// A listener for streams of self-contained encoded images.
    pub fn new(host: &str, port: u16, connect_timeout: Duration) -> Self {
        Self::with_decoder(host, port, connect_timeout, || {
            Box::new(ImagePacketDecoder) as Box<dyn PacketDecoder>
        })
    }

    /// A listener using decoders produced by `factory`.
    pub fn with_decoder<F>(host: &str, port: u16, connect_timeout: Duration, factory: F) -> Self
    where
        F: Fn() -> Box<dyn PacketDecoder> + Send + Sync + 'static,
    {
        Self {
            addr: format!("{host}:{port}"),
            connect_timeout,
            decoder_factory: Box::new(factory),
            state: Arc::new(StreamState::default()),
            running: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
        }
    }

    fn receive(
        addr: &str,
        connect_timeout: Duration,
        running: &AtomicBool,
        state: &StreamState,
        decoder: &mut dyn PacketDecoder,
    ) -> Result<(), GatewayError> {
        let mut stream = crate::connect(addr, connect_timeout)?;
        stream
            .set_read_timeout(Some(POLL_INTERVAL))
            .map_err(|e| GatewayError::io(CHANNEL, e))?;
        log::info!("VideoStreamListener: receiving from {addr}.");

        let mut assembler = PacketAssembler::new(LengthBounds::VIDEO);
        let mut chunk = vec![0u8; 64 * 1024];

        while running.load(Ordering::Relaxed) {
            match stream.read(&mut chunk) {
                Ok(0) => return Err(GatewayError::Closed(CHANNEL)),
                Ok(n) => assembler.push(&chunk[..n]),
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    continue
                }
                Err(e) => return Err(GatewayError::io(CHANNEL, e)),
            }

            while let Some(packet) = assembler.next_packet()? {
                match decoder.decode(&packet) {
                    Ok(Some(image)) => {
                        let seq = state.seq.fetch_add(1, Ordering::Relaxed) + 1;
                        *state.latest.lock().unwrap_or_else(PoisonError::into_inner) =
                            Some(Frame::from_dynamic(image, seq));
                        if !state.ready.replace(true) {
                            log::info!("VideoStreamListener: first frame decoded.");
                        }
                    }
                    Ok(None) => {}
                    Err(e) => log::debug!("VideoStreamListener: dropped packet: {e}"),
                }
            }
        }
        Ok(())
    }
}

impl FrameSource for VideoStreamListener {
    fn capture_frame(&self) -> Option<Frame> {
        self.state
            .latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl StreamSource for VideoStreamListener {
    fn start(&self) -> bool {
        self.stop();

        *self.state.latest.lock().unwrap_or_else(PoisonError::into_inner) = None;
        self.state.ready.clear();
        self.running.store(true, Ordering::SeqCst);

        let addr = self.addr.clone();
        let connect_timeout = self.connect_timeout;
        let running = Arc::clone(&self.running);
        let state = Arc::clone(&self.state);
        let mut decoder = (self.decoder_factory)();
        decoder.reset();

        let spawned = thread::Builder::new()
            .name("video-stream".into())
            .spawn(move || {
                if let Err(e) =
                    Self::receive(&addr, connect_timeout, &running, &state, decoder.as_mut())
                {
                    log::warn!("VideoStreamListener: stream ended: {e}");
                }
                running.store(false, Ordering::SeqCst);
                log::info!("VideoStreamListener: thread stopped.");
            });

        match spawned {
            Ok(handle) => {
                *self.handle.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
                true
            }
            Err(e) => {
                log::error!("VideoStreamListener: failed to spawn receiver: {e}");
                self.running.store(false, Ordering::SeqCst);
                false
            }
        }
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::error!("VideoStreamListener: receiver thread panicked.");
            }
        }
    }

    fn is_ready(&self) -> bool {
        self.state.ready.is_set()
    }
}

impl Drop for VideoStreamListener {
    fn drop(&mut self) {
        self.stop();
    }
}
