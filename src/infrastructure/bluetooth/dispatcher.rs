//! Command dispatch over a resolved characteristic.

use crate::infrastructure::bluetooth::adapter::{AdapterError, RadioAdapter};
use crate::infrastructure::bluetooth::protocol::{CommandKind, EncodedCommand};
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
#[error("writing command {index} ({kind}) failed")]
pub struct DispatchError {
    /// Zero-based position of the failed command in the sequence
    pub index: usize,
    pub kind: CommandKind,
    #[source]
    pub source: AdapterError,
}

pub struct CommandDispatcher<'a, A: RadioAdapter> {
    adapter: &'a A,
}

impl<'a, A: RadioAdapter> CommandDispatcher<'a, A> {
    pub fn new(adapter: &'a A) -> Self {
        Self { adapter }
    }

    /// Write `commands` in order, each only after the previous one was
    /// acknowledged. Stops at the first failed write; earlier writes are
    /// not undone.
    pub async fn send(
        &self,
        characteristic: &A::Characteristic,
        commands: &[EncodedCommand],
    ) -> Result<(), DispatchError> {
        info!("Sending {} commands...", commands.len());

        for (index, command) in commands.iter().enumerate() {
            debug!("Writing '{}'", command);
            if let Err(source) = self.adapter.write(characteristic, command.as_bytes()).await {
                error!("Write {} ({}) failed: {}", index, command.kind(), source);
                return Err(DispatchError {
                    index,
                    kind: command.kind(),
                    source,
                });
            }
        }

        info!("All commands sent");
        Ok(())
    }
}
