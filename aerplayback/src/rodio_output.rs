//! Rodio-backed audio output
//!
//! Playback runs on a dedicated OS thread that owns the rodio output stream
//! and sink; callers talk to it over a crossbeam command channel. Rodio's
//! stream handle is not `Send`, so it never leaves the audio thread.
//!
//! The stream is fetched with a blocking HTTP reader piped straight into the
//! decoder. Internet radio sources are not seekable, so the reader reports
//! seeks as unsupported and the decoder probes from the head of the stream.

use crate::device::AudioOutput;
use crate::error::{Error, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use std::io::{Read, Seek, SeekFrom};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

const COMMAND_TIMEOUT: Duration = Duration::from_secs(20);

enum Command {
    SetSource(String),
    ClearSource,
    Load(Sender<Result<()>>),
    Play(Sender<Result<()>>),
    Pause,
    SetVolume(f32),
    Shutdown,
}

/// Non-seekable reader over a live stream.
///
/// The decoder wants `Read + Seek + Send + Sync`; the mutex provides `Sync`
/// and seeking reports the current position only, anything else is refused.
struct LiveStream<R> {
    inner: Mutex<R>,
    position: Mutex<u64>,
}

impl<R: Read> LiveStream<R> {
    fn new(inner: R) -> Self {
        Self {
            inner: Mutex::new(inner),
            position: Mutex::new(0),
        }
    }
}

impl<R: Read> Read for LiveStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| std::io::Error::other("stream reader poisoned"))?;
        let n = inner.read(buf)?;
        if let Ok(mut position) = self.position.lock() {
            *position += n as u64;
        }
        Ok(n)
    }
}

impl<R: Read> Seek for LiveStream<R> {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        match pos {
            SeekFrom::Current(0) => {
                let position = self
                    .position
                    .lock()
                    .map_err(|_| std::io::Error::other("stream reader poisoned"))?;
                Ok(*position)
            }
            _ => Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "live streams are not seekable",
            )),
        }
    }
}

/// Audio output driving a rodio sink on a dedicated thread.
pub struct RodioOutput {
    commands: Sender<Command>,
    source: Mutex<Option<String>>,
    playing: AtomicBool,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl RodioOutput {
    /// Spawns the audio thread and initializes the default output device.
    ///
    /// Blocks until the device is ready or initialization failed.
    pub fn new() -> Result<Self> {
        let (commands, command_rx) = bounded::<Command>(16);
        let (init_tx, init_rx) = bounded::<std::result::Result<(), String>>(1);

        let thread = std::thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || audio_thread(command_rx, init_tx))
            .map_err(|e| Error::device(format!("Failed to spawn audio thread: {e}")))?;

        let init = init_rx
            .recv()
            .map_err(|_| Error::device("Audio thread terminated during init"))?;
        init.map_err(Error::Device)?;

        info!("Audio output initialized");
        Ok(Self {
            commands,
            source: Mutex::new(None),
            playing: AtomicBool::new(false),
            thread: Mutex::new(Some(thread)),
        })
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| Error::Channel("audio thread has exited".into()))
    }

    fn send_and_wait(
        &self,
        make: impl FnOnce(Sender<Result<()>>) -> Command,
    ) -> Result<()> {
        let (ack_tx, ack_rx) = bounded(1);
        self.send(make(ack_tx))?;
        ack_rx
            .recv_timeout(COMMAND_TIMEOUT)
            .map_err(|_| Error::Channel("audio thread did not answer".into()))?
    }
}

impl AudioOutput for RodioOutput {
    fn set_source(&self, url: &str) -> Result<()> {
        *self.source.lock().map_err(|_| Error::device("source lock poisoned"))? =
            Some(url.to_string());
        self.playing.store(false, Ordering::SeqCst);
        self.send(Command::SetSource(url.to_string()))
    }

    fn clear_source(&self) -> Result<()> {
        *self.source.lock().map_err(|_| Error::device("source lock poisoned"))? = None;
        self.playing.store(false, Ordering::SeqCst);
        self.send(Command::ClearSource)
    }

    fn load(&self) -> Result<()> {
        self.send_and_wait(Command::Load)
    }

    fn play(&self) -> Result<()> {
        self.send_and_wait(Command::Play)?;
        self.playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn pause(&self) -> Result<()> {
        self.playing.store(false, Ordering::SeqCst);
        self.send(Command::Pause)
    }

    fn set_volume(&self, volume: f32) -> Result<()> {
        self.send(Command::SetVolume(volume.clamp(0.0, 1.0)))
    }

    fn source(&self) -> Option<String> {
        self.source.lock().ok().and_then(|s| s.clone())
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}

impl Drop for RodioOutput {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Ok(mut thread) = self.thread.lock() {
            if let Some(handle) = thread.take() {
                let _ = handle.join();
            }
        }
    }
}

struct AudioThread {
    _stream: OutputStream,
    handle: OutputStreamHandle,
    http: reqwest::blocking::Client,
    sink: Option<Sink>,
    source: Option<String>,
    volume: f32,
}

fn audio_thread(commands: Receiver<Command>, init: Sender<std::result::Result<(), String>>) {
    let (stream, handle) = match OutputStream::try_default() {
        Ok(pair) => pair,
        Err(e) => {
            let _ = init.send(Err(format!("No audio output device: {e}")));
            return;
        }
    };
    let http = match reqwest::blocking::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            let _ = init.send(Err(format!("HTTP client init failed: {e}")));
            return;
        }
    };
    let _ = init.send(Ok(()));

    let mut state = AudioThread {
        _stream: stream,
        handle,
        http,
        sink: None,
        source: None,
        volume: 1.0,
    };

    while let Ok(command) = commands.recv() {
        match command {
            Command::SetSource(url) => {
                debug!(url = %url, "Audio source set");
                state.sink = None;
                state.source = Some(url);
            }
            Command::ClearSource => {
                state.sink = None;
                state.source = None;
            }
            Command::Load(ack) => {
                let result = state.prepare();
                let _ = ack.send(result);
            }
            Command::Play(ack) => {
                let result = state.play();
                let _ = ack.send(result);
            }
            Command::Pause => {
                if let Some(sink) = &state.sink {
                    sink.pause();
                }
            }
            Command::SetVolume(volume) => {
                state.volume = volume;
                if let Some(sink) = &state.sink {
                    sink.set_volume(volume);
                }
            }
            Command::Shutdown => break,
        }
    }
    debug!("Audio thread exiting");
}

impl AudioThread {
    /// Opens the stream and builds a paused sink around it.
    fn prepare(&mut self) -> Result<()> {
        let url = self.source.clone().ok_or(Error::NoSource)?;

        let response = self.http.get(&url).send()?.error_for_status()?;
        let reader = LiveStream::new(response);
        let decoder = Decoder::new(reader)
            .map_err(|e| Error::Decode(format!("{e}")))?;

        let sink = Sink::try_new(&self.handle)
            .map_err(|e| Error::device(format!("Sink creation failed: {e}")))?;
        sink.set_volume(self.volume);
        sink.pause();
        sink.append(decoder);

        debug!(url = %url, "Stream prepared");
        self.sink = Some(sink);
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        // A finished sink means the stream ended behind us; rebuild it.
        let needs_prepare = match &self.sink {
            Some(sink) => sink.empty(),
            None => true,
        };
        if needs_prepare {
            if let Err(e) = self.prepare() {
                warn!(error = %e, "Stream preparation failed");
                self.sink = None;
                return Err(e);
            }
        }
        if let Some(sink) = &self.sink {
            sink.play();
        }
        Ok(())
    }
}
