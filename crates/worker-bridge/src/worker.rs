//! The worker thread and the consumer side of its channel.

use std::cell::Cell;
use std::thread::JoinHandle;
use std::time::Duration;

use cad_types::ObjectSpec;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use geom_kernel::{KernelBundle, KernelError};
use tracing::{debug, error, info, warn};

use crate::collab::{DisplaySink, DocumentSource};
use crate::config::WorkerConfig;
use crate::dispatch::dispatch;
use crate::messages::{
    DocumentContent, ErrorPayload, LoadFilePayload, RegisterPayload, WorkerReply, WorkerRequest,
};
use crate::worker_state::{WorkerError, WorkerState};

enum Inbound {
    Request {
        request: WorkerRequest,
        reply_to: Sender<WorkerReply>,
    },
    Shutdown,
}

/// Owns the worker thread. Dropping it shuts the thread down.
pub struct Worker {
    inbox: Sender<Inbound>,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    /// Starts the worker thread. The kernel is created on that thread by
    /// `bootstrap`; if it fails, every request is answered with a fatal
    /// ERROR.
    pub fn spawn<K, F>(config: WorkerConfig, bootstrap: F) -> Result<Self, WorkerError>
    where
        K: KernelBundle + 'static,
        F: FnOnce() -> Result<K, KernelError> + Send + 'static,
    {
        let (inbox, rx) = unbounded();
        let thread = std::thread::Builder::new()
            .name("cad-worker".to_string())
            .spawn(move || run(rx, config, bootstrap))?;
        Ok(Self {
            inbox,
            thread: Some(thread),
        })
    }

    /// A new consumer with its own reply channel. Call
    /// [`Consumer::register`] before sending work.
    pub fn connect(&self, name: impl Into<String>) -> Consumer {
        let (replies_tx, replies) = unbounded();
        Consumer {
            name: name.into(),
            inbox: self.inbox.clone(),
            replies_tx,
            replies,
            next_id: Cell::new(1),
        }
    }

    /// Stops the thread after it has answered everything queued so far.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.inbox.send(Inbound::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("worker thread panicked");
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run<K, F>(rx: Receiver<Inbound>, config: WorkerConfig, bootstrap: F)
where
    K: KernelBundle,
    F: FnOnce() -> Result<K, KernelError>,
{
    let mut kernel = match bootstrap() {
        Ok(k) => {
            info!("kernel ready");
            Ok(k)
        }
        Err(e) => {
            error!(error = %e, "kernel bootstrap failed");
            Err(WorkerError::Bootstrap(e.to_string()))
        }
    };
    let mut state = WorkerState::new(config);

    for inbound in rx.iter() {
        let (request, reply_to) = match inbound {
            Inbound::Shutdown => break,
            Inbound::Request { request, reply_to } => (request, reply_to),
        };
        let reply = match &mut kernel {
            Ok(k) => dispatch(&mut state, request, k),
            Err(e) => WorkerReply::error(request.id(), e),
        };
        if reply_to.send(reply).is_err() {
            debug!("consumer went away before its reply");
        }
    }

    if let Ok(k) = &mut kernel {
        state.release_all(k);
    }
    info!("worker stopped");
}

/// A consumer's end of the worker channel.
///
/// Requests are answered in the order they were sent.
pub struct Consumer {
    name: String,
    inbox: Sender<Inbound>,
    replies_tx: Sender<WorkerReply>,
    replies: Receiver<WorkerReply>,
    next_id: Cell<u64>,
}

impl Consumer {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Allocates a correlation id.
    pub fn next_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    /// Queues a request without waiting.
    pub fn send(&self, request: WorkerRequest) -> Result<(), WorkerError> {
        self.inbox
            .send(Inbound::Request {
                request,
                reply_to: self.replies_tx.clone(),
            })
            .map_err(|_| WorkerError::Disconnected)
    }

    /// Queues a request given in wire form.
    pub fn send_json(&self, raw: &str) -> Result<(), WorkerError> {
        self.send(WorkerRequest::from_json(raw)?)
    }

    pub fn recv(&self) -> Result<WorkerReply, WorkerError> {
        self.replies.recv().map_err(|_| WorkerError::Disconnected)
    }

    /// `Ok(None)` on timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<WorkerReply>, WorkerError> {
        match self.replies.recv_timeout(timeout) {
            Ok(reply) => Ok(Some(reply)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(WorkerError::Disconnected),
        }
    }

    /// Sends a request and waits for the reply with the same id. Replies to
    /// earlier requests that were never received are discarded.
    pub fn request(&self, request: WorkerRequest) -> Result<WorkerReply, WorkerError> {
        let id = request.id();
        self.send(request)?;
        loop {
            let reply = self.recv()?;
            if reply.id() == id {
                return Ok(reply);
            }
            warn!(expected = id, got = reply.id(), "discarding stale reply");
        }
    }

    /// REGISTER; returns once the worker answers INITIALIZED.
    pub fn register(&self) -> Result<(), WorkerError> {
        let request = WorkerRequest::Register {
            id: self.next_id(),
            payload: RegisterPayload {
                id: self.name.clone(),
            },
        };
        expect_ok(self.request(request)?).map(|_| ())
    }

    /// LOAD_FILE; returns the DISPLAY_SHAPE reply.
    pub fn load_file(&self, content: DocumentContent) -> Result<WorkerReply, WorkerError> {
        let request = WorkerRequest::LoadFile {
            id: self.next_id(),
            payload: LoadFilePayload { content },
        };
        expect_ok(self.request(request)?)
    }

    /// Evaluates a bare object list with default options.
    pub fn load_objects(&self, objects: Vec<ObjectSpec>) -> Result<WorkerReply, WorkerError> {
        self.load_file(DocumentContent {
            objects,
            ..DocumentContent::default()
        })
    }

    /// Pulls the document from `source`, evaluates it and pushes the result
    /// into `sink`.
    pub fn sync(
        &self,
        source: &dyn DocumentSource,
        sink: &mut dyn DisplaySink,
    ) -> Result<(), WorkerError> {
        if let WorkerReply::DisplayShape {
            payload, hidden, ..
        } = self.load_file(source.content())?
        {
            sink.display(&payload, &hidden);
        }
        Ok(())
    }
}

fn expect_ok(reply: WorkerReply) -> Result<WorkerReply, WorkerError> {
    match reply {
        WorkerReply::Error {
            payload: ErrorPayload { message, fatal },
            ..
        } => Err(WorkerError::Remote { message, fatal }),
        other => Ok(other),
    }
}
