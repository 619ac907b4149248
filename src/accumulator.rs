//! buffering of a response body
//!
//! The body is read by a spawned task that sends every chunk, in arrival
//! order, over a channel. An [`Accumulator`] on the receiving side appends
//! the chunks and assembles the final body once the channel closes. The task
//! is aborted when its handle is dropped, which closes the connection.
use crate::{error::AccumulationErr, stream::BodyReader};
use std::io;
use tokio::{
    io::AsyncBufRead,
    sync::mpsc::{self, Receiver, Sender},
};
use tokio_util::task::AbortOnDropHandle;

const CHANNEL_CAPACITY: usize = 32;

/// Message sent by the body task.
pub type Chunk = io::Result<Vec<u8>>;

/// Append-only ordered buffer of body chunks.
#[derive(Debug, Default)]
pub struct Accumulator {
    chunks: Vec<Vec<u8>>,
    len: usize,
}

impl Accumulator {
    pub fn new() -> Accumulator {
        Accumulator::default()
    }

    pub fn push(&mut self, chunk: Vec<u8>) {
        self.len += chunk.len();
        self.chunks.push(chunk);
    }

    /// Number of bytes buffered so far.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Receives chunks until the sender is gone, failing on the first error.
    pub async fn drain(&mut self, receiver: &mut Receiver<Chunk>) -> Result<(), AccumulationErr> {
        while let Some(chunk) = receiver.recv().await {
            self.push(chunk.map_err(AccumulationErr::Stream)?);
        }

        Ok(())
    }

    /// Concatenates buffered chunks into raw bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        let mut body = Vec::with_capacity(self.len);

        for chunk in self.chunks {
            body.extend(chunk);
        }

        body
    }

    /// Concatenates buffered chunks into the body text. Invalid UTF-8
    /// sequences are replaced with `U+FFFD`.
    pub fn finish(self) -> String {
        match String::from_utf8(self.into_bytes()) {
            Ok(body) => body,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }
}

/// Spawns the task reading `body` to its end. Chunks arrive on the returned
/// receiver; the channel closes after the last chunk or the first error.
pub fn spawn_body_task<R>(mut body: BodyReader<R>) -> (Receiver<Chunk>, AbortOnDropHandle<()>)
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);

    let handle = tokio::spawn(async move {
        pump(&mut body, &sender).await;
    });

    (receiver, AbortOnDropHandle::new(handle))
}

async fn pump<R>(body: &mut BodyReader<R>, sender: &Sender<Chunk>)
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let next = match body.next_chunk().await {
            Ok(Some(chunk)) => Ok(chunk),
            Ok(None) => break,
            Err(e) => Err(e),
        };
        let failed = next.is_err();

        // a closed channel means the request was dropped
        if sender.send(next).await.is_err() || failed {
            break;
        }
    }
}

/// Collects the body read by `spawn_body_task` into a string.
pub async fn collect(
    mut receiver: Receiver<Chunk>,
    handle: AbortOnDropHandle<()>,
) -> Result<String, AccumulationErr> {
    let mut accumulator = Accumulator::new();
    let drained = accumulator.drain(&mut receiver).await;

    drop(receiver);
    handle.await?;
    drained?;

    Ok(accumulator.finish())
}
