use crate::blocks::{BlockReader, block_count};
use crate::config::Config;
use crate::constants::FILE_MISSING_MESSAGE;
use crate::topic::TopicPrefix;
use crate::transport::Transport;
use anyhow::{Context, Result};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// What one run accomplished.
#[derive(Debug)]
pub enum Outcome {
    Published(TransferSummary),
    /// The file could not be stat'd; nothing was published.
    FileMissing { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSummary {
    pub file: PathBuf,
    pub topic: TopicPrefix,
    pub blocks: usize,
    pub bytes: u64,
}

impl fmt::Display for TransferSummary {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        writeln!(f, "Published \"{}\"", self.file.display())?;
        if self.blocks == 0 {
            write!(f, "       to \"{}\" (no blocks)", self.topic)
        } else {
            write!(f, "       to \"{}{{0..{}}}\"", self.topic, self.blocks - 1)
        }
    }
}

/// Publish the block count and then every block of the configured file,
/// one acknowledged message at a time. The user-facing line goes to
/// `console` before the transport is disconnected, which happens on every
/// path that returns `Ok`.
pub fn run<T: Transport>(
    config: &Config,
    mut transport: T,
    console: &mut impl Write,
) -> Result<Outcome> {
    let file_size = match fs::metadata(&config.file) {
        Ok(meta) => meta.len(),
        Err(e) => {
            debug!("cannot stat {:?}: {e}", config.file);
            writeln!(console, "{FILE_MISSING_MESSAGE}")?;
            transport.disconnect()?;
            return Ok(Outcome::FileMissing {
                path: config.file.clone(),
            });
        }
    };
    let count = block_count(file_size, config.block_size);
    info!(
        file = %config.file.display(),
        size = file_size,
        blocks = count,
        topic = %config.topic,
        "publishing"
    );

    transport
        .publish(
            config.topic.count_topic(),
            count.to_string().into_bytes(),
            config.qos,
            config.retain,
        )
        .context("failed to publish block count")?;

    // The count is already out (and possibly retained), so losing the file
    // now is fatal rather than a quiet file-missing exit.
    let file = File::open(&config.file).with_context(|| {
        format!(
            "failed to open {:?} after announcing {count} blocks",
            config.file
        )
    })?;

    let mut blocks = 0usize;
    let mut bytes = 0u64;
    for block in BlockReader::new(BufReader::new(file), config.block_size) {
        let block = block.with_context(|| format!("failed to read {:?}", config.file))?;
        let len = block.data.len() as u64;
        transport
            .publish(
                &config.topic.block_topic(block.index),
                block.data,
                config.qos,
                config.retain,
            )
            .with_context(|| format!("failed to publish block {}", block.index))?;
        blocks += 1;
        bytes += len;
    }
    if blocks != count {
        warn!(
            "{:?} changed while publishing: announced {count} blocks, sent {blocks}",
            config.file
        );
    }

    let summary = TransferSummary {
        file: config.file.clone(),
        topic: config.topic.clone(),
        blocks,
        bytes,
    };
    info!(blocks, bytes, "transfer complete");
    writeln!(console, "{summary}")?;
    transport.disconnect()?;
    Ok(Outcome::Published(summary))
}
