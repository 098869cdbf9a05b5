use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::encode::audio::AudioChunk;
use crate::encode::sink::{MediaSink, SinkConfig};
use crate::foundation::core::{Affine, FrameIndex, Rgba8Premul};
use crate::foundation::error::{CliplaneError, CliplaneResult};
use crate::render::draw::{ClipDraw, composite};
use crate::render::surface::Surface;

/// Messages sent to the export worker.
#[derive(Debug)]
pub enum WorkerCommand {
    /// Allocate the canvas and start the sink.
    Begin {
        cfg: SinkConfig,
        background: Rgba8Premul,
    },
    /// Composite `draws` and encode the result.
    Frame {
        index: FrameIndex,
        timestamp_us: i64,
        key: bool,
        draws: Vec<ClipDraw>,
    },
    Audio(AudioChunk),
    Finish,
    Abort,
}

/// Messages sent back by the export worker.
#[derive(Debug)]
pub enum WorkerReply {
    Ready,
    /// The frame was composited and handed to the sink; the export may send the next one.
    FramePrinted(FrameIndex),
    Output(Vec<u8>),
    Failed(CliplaneError),
}

/// Compositing and encoding on a dedicated thread.
///
/// The worker owns the sink and its own canvas. Frames are acknowledged one at a time so the
/// export never runs more than one frame ahead of the encoder. Audio is fire-and-forget; an audio
/// failure is reported on the next acknowledgement.
pub struct ExportWorker {
    cmd_tx: Sender<WorkerCommand>,
    reply_rx: Receiver<WorkerReply>,
    handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for ExportWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportWorker")
            .field("running", &self.handle.is_some())
            .finish()
    }
}

impl ExportWorker {
    pub fn spawn(sink: Box<dyn MediaSink>) -> CliplaneResult<Self> {
        let (cmd_tx, cmd_rx) = unbounded();
        let (reply_tx, reply_rx) = unbounded();
        let handle = std::thread::Builder::new()
            .name("cliplane-export".to_owned())
            .spawn(move || run(sink, &cmd_rx, &reply_tx))
            .map_err(|e| CliplaneError::encode(format!("failed to spawn export worker: {e}")))?;
        Ok(Self {
            cmd_tx,
            reply_rx,
            handle: Some(handle),
        })
    }

    pub fn begin(&self, cfg: SinkConfig, background: Rgba8Premul) -> CliplaneResult<()> {
        self.send(WorkerCommand::Begin { cfg, background })?;
        match self.recv()? {
            WorkerReply::Ready => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    /// Send one frame and wait until the worker has encoded it.
    pub fn print_frame(
        &self,
        index: FrameIndex,
        timestamp_us: i64,
        key: bool,
        draws: Vec<ClipDraw>,
    ) -> CliplaneResult<()> {
        self.send(WorkerCommand::Frame {
            index,
            timestamp_us,
            key,
            draws,
        })?;
        match self.recv()? {
            WorkerReply::FramePrinted(done) if done == index => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    pub fn push_audio(&self, chunk: AudioChunk) -> CliplaneResult<()> {
        self.send(WorkerCommand::Audio(chunk))
    }

    /// Finalize the container and return its bytes.
    pub fn finish(mut self) -> CliplaneResult<Vec<u8>> {
        self.send(WorkerCommand::Finish)?;
        let reply = self.recv();
        self.join();
        match reply? {
            WorkerReply::Output(bytes) => Ok(bytes),
            other => Err(unexpected(&other)),
        }
    }

    pub fn abort(mut self) {
        let _ = self.cmd_tx.send(WorkerCommand::Abort);
        self.join();
    }

    fn send(&self, cmd: WorkerCommand) -> CliplaneResult<()> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| CliplaneError::encode("export worker exited unexpectedly"))
    }

    fn recv(&self) -> CliplaneResult<WorkerReply> {
        match self.reply_rx.recv() {
            Ok(WorkerReply::Failed(e)) => Err(e),
            Ok(reply) => Ok(reply),
            Err(_) => Err(CliplaneError::encode("export worker exited unexpectedly")),
        }
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            tracing::warn!("export worker panicked");
        }
    }
}

impl Drop for ExportWorker {
    fn drop(&mut self) {
        if self.handle.is_some() {
            let _ = self.cmd_tx.send(WorkerCommand::Abort);
            self.join();
        }
    }
}

fn unexpected(reply: &WorkerReply) -> CliplaneError {
    CliplaneError::encode(format!("unexpected export worker reply: {reply:?}"))
}

fn run(
    mut sink: Box<dyn MediaSink>,
    commands: &Receiver<WorkerCommand>,
    replies: &Sender<WorkerReply>,
) {
    let mut canvas: Option<(Surface, Rgba8Premul)> = None;
    let mut deferred: Option<CliplaneError> = None;

    for cmd in commands.iter() {
        let reply = match cmd {
            WorkerCommand::Begin { cfg, background } => match sink.begin(cfg) {
                Ok(()) => {
                    canvas = Some((Surface::new(cfg.width, cfg.height), background));
                    WorkerReply::Ready
                }
                Err(e) => WorkerReply::Failed(e),
            },
            WorkerCommand::Frame {
                index,
                timestamp_us,
                key,
                draws,
            } => {
                let printed = match (deferred.take(), canvas.as_mut()) {
                    (Some(e), _) => Err(e),
                    (None, None) => Err(CliplaneError::encode("export worker not started")),
                    (None, Some((surface, background))) => {
                        composite(surface, *background, Affine::IDENTITY, &draws)
                            .and_then(|()| sink.push_video(surface, timestamp_us, key))
                    }
                };
                match printed {
                    Ok(()) => WorkerReply::FramePrinted(index),
                    Err(e) => WorkerReply::Failed(e),
                }
            }
            WorkerCommand::Audio(chunk) => {
                if deferred.is_none()
                    && let Err(e) = sink.push_audio(&chunk)
                {
                    deferred = Some(e);
                }
                continue;
            }
            WorkerCommand::Finish => {
                let out = match deferred.take() {
                    Some(e) => Err(e),
                    None => sink.finish(),
                };
                let reply = match out {
                    Ok(bytes) => WorkerReply::Output(bytes),
                    Err(e) => {
                        sink.abort();
                        WorkerReply::Failed(e)
                    }
                };
                let _ = replies.send(reply);
                return;
            }
            WorkerCommand::Abort => {
                sink.abort();
                return;
            }
        };
        if replies.send(reply).is_err() {
            break;
        }
    }

    // Handle dropped without Finish.
    sink.abort();
}

#[cfg(test)]
#[path = "../../tests/unit/encode/worker.rs"]
mod tests;
