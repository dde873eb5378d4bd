//! Session loop.

use crate::fetch::fetch_graph;
use crate::{Command, ListEntry, ProtocolError, ProtocolHandler, Result, Session, WorkItem};
use std::io::{BufRead, Write};

/// One remote-helper session over a reader/writer pair.
pub struct Protocol<H> {
    handler: H,
    session: Session,
    queue: Vec<WorkItem>,
    batch: bool,
}

impl<H: ProtocolHandler> Protocol<H> {
    /// Initializes `handler` for `session`.
    pub fn new(mut handler: H, session: Session) -> Result<Self> {
        handler
            .initialize(&session)
            .map_err(ProtocolError::handler)?;
        Ok(Self {
            handler,
            session,
            queue: Vec::new(),
            batch: false,
        })
    }

    /// Returns the handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Serves commands from `reader` until the batch is flushed.
    ///
    /// Output goes to `writer` only; the handler is finished after a
    /// successful flush and never after an error. The blank line closing a
    /// batch is only written if the batch held `push` or `fetch` commands.
    pub fn run<R: BufRead, W: Write>(&mut self, mut reader: R, mut writer: W) -> Result<()> {
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                if self.queue.is_empty() {
                    tracing::debug!("Input closed, nothing queued");
                    return Ok(());
                }
                return Err(ProtocolError::UnexpectedEof(self.queue.len()));
            }

            let text = line.trim_end_matches(|c: char| c == '\n' || c == '\r');
            tracing::debug!("< {}", text);

            match Command::parse(text)? {
                Command::Capabilities => {
                    for capability in self.handler.capabilities() {
                        reply(&mut writer, capability)?;
                    }
                    reply(&mut writer, "")?;
                    writer.flush()?;
                }
                Command::List { for_push } => {
                    let entries = self
                        .handler
                        .list(for_push)
                        .map_err(ProtocolError::handler)?;
                    self.write_list(&mut writer, &entries)?;
                }
                Command::Push {
                    local,
                    remote,
                    force,
                } => {
                    self.batch = true;
                    if force {
                        tracing::info!(%local, %remote, "Forced update requested, pushing unconditionally");
                    }
                    self.queue.push(WorkItem::Push { local, remote });
                }
                Command::Fetch { hash, name } => {
                    self.batch = true;
                    if hash.is_zero() {
                        tracing::debug!(%name, "Skipping fetch of null object");
                    } else {
                        self.queue.push(WorkItem::Fetch { hash, name });
                    }
                }
                Command::Flush => {
                    self.flush(&mut writer)?;
                    break;
                }
            }
        }

        self.handler.finish().map_err(ProtocolError::handler)
    }

    fn write_list<W: Write>(&self, writer: &mut W, entries: &[ListEntry]) -> Result<()> {
        for entry in entries {
            reply(writer, &entry.to_string())?;
        }
        reply(writer, "")?;
        writer.flush()?;
        Ok(())
    }

    fn flush<W: Write>(&mut self, writer: &mut W) -> Result<()> {
        tracing::debug!(queued = self.queue.len(), "Processing queued commands");

        for item in std::mem::take(&mut self.queue) {
            match item {
                WorkItem::Push { local, remote } => {
                    let confirmed = self
                        .handler
                        .push(&local, &remote)
                        .map_err(ProtocolError::handler)?;
                    reply(writer, &format!("ok {}", confirmed))?;
                }
                WorkItem::Fetch { hash, name } => {
                    fetch_graph(&self.session, &mut self.handler, &hash)?;
                    self.session.tracker.set_ref(&name, &hash)?;
                }
            }
        }

        if self.batch {
            reply(writer, "")?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn reply<W: Write>(writer: &mut W, line: &str) -> Result<()> {
    tracing::trace!("> {}", line);
    writeln!(writer, "{}", line)?;
    Ok(())
}
