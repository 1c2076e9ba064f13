// SPDX-License-Identifier: MIT
//
// devrandom: Quantum Entropy Stream
// Copyright (c) 2025 Valer Bocan, PhD, CSSLP
// Email: valer.bocan@upt.ro
//
// Department of Computer and Information Technology
// Politehnica University of Timisoara

//! Sink side of the pipeline
//!
//! Drains the entropy channel, hex-decodes each block and writes the raw
//! bytes to an injected [`AsyncWrite`] handle. Failures are reported on the
//! error channel and the loop carries on; only a closed channel or shutdown
//! ends it.

use crate::{pipeline::TaskContext, protocol::EntropyBlock, Error, Result};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Writes decoded entropy to a byte sink
pub struct SinkWriter<W> {
    sink: W,
}

impl<W> SinkWriter<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    /// Decode one block and write it, returning the number of bytes written
    ///
    /// Decoded bytes are written in sequence order. The payload is
    /// byte-granular, so little-endian output is the identity.
    pub async fn write_block(&mut self, block: &EntropyBlock) -> Result<usize> {
        let bytes = block.decode()?;
        self.sink.write_all(&bytes).await.map_err(Error::Sink)?;
        self.sink.flush().await.map_err(Error::Sink)?;
        Ok(bytes.len())
    }

    /// Writer loop: consume blocks until the channel closes or shutdown
    ///
    /// On shutdown, blocks already queued on the channel are still written
    /// before the loop ends. The sink is handed back to the caller.
    pub async fn run(mut self, mut entropy: mpsc::Receiver<EntropyBlock>, ctx: TaskContext) -> W {
        loop {
            let block = tokio::select! {
                biased;
                _ = ctx.shutdown().cancelled() => {
                    self.drain(&mut entropy, &ctx).await;
                    break;
                }
                block = entropy.recv() => match block {
                    Some(block) => block,
                    None => {
                        debug!("Entropy channel closed, writer stopping");
                        break;
                    }
                },
            };
            self.consume(block, &ctx).await;
        }
        self.sink
    }

    async fn drain(&mut self, entropy: &mut mpsc::Receiver<EntropyBlock>, ctx: &TaskContext) {
        entropy.close();
        let mut drained = 0usize;
        while let Ok(block) = entropy.try_recv() {
            self.consume(block, ctx).await;
            drained += 1;
        }
        debug!(drained, "Shutdown signalled, writer stopping");
    }

    async fn consume(&mut self, block: EntropyBlock, ctx: &TaskContext) {
        match self.write_block(&block).await {
            Ok(written) => {
                trace!(written, "Wrote entropy block");
                ctx.metrics().record_written(written);
            }
            Err(e) => ctx.report(e).await,
        }
    }
}
