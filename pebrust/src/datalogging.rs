//! Data logging session control

use tracing::{debug, info, warn};

use pebrust_core::{DataLoggingCommand, Inbound, Outbound};
use pebrust_types::DataLoggingSession;

use crate::emulator::Emulator;
use crate::error::{Phase, Result};

impl Emulator {
    /// List the open data logging sessions
    ///
    /// Asks the watch to re-announce every session. There is no end marker;
    /// the list is complete once the watch stayed quiet for the configured
    /// idle time.
    pub async fn list_sessions(&self) -> Result<Vec<DataLoggingSession>> {
        self.send(&Outbound::DataLogging(DataLoggingCommand::ReportOpenSessions(
            Vec::new(),
        )))
        .await?;

        let mut sessions = Vec::new();
        while let Some(message) = self.next_message_within(self.config().datalogging_idle).await? {
            match message {
                Inbound::DataLoggingOpenSession(session) => {
                    debug!(%session, "Open session");
                    sessions.push(session);
                }
                other => self.dispatch(other).await?,
            }
        }

        info!(count = sessions.len(), "Data logging sessions listed");
        Ok(sessions)
    }

    /// Ask whether the watch sends logged data
    ///
    /// `None` when the watch did not answer.
    pub async fn get_send_enabled(&self) -> Result<Option<bool>> {
        self.send(&Outbound::DataLogging(DataLoggingCommand::GetSendEnable))
            .await?;

        let response = self
            .wait_for(Phase::DataLogging, self.config().send_enable_timeout, |message| {
                match message {
                    Inbound::DataLoggingSendEnable(enabled) => Ok(enabled),
                    other => Err(other),
                }
            })
            .await;

        match response {
            Ok(enabled) => Ok(Some(enabled)),
            Err(e) if e.is_timeout() => {
                warn!("No send-enable response");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Turn sending of logged data on or off
    pub async fn set_send_enabled(&self, enabled: bool) -> Result<()> {
        self.send(&Outbound::DataLogging(DataLoggingCommand::SetSendEnable(enabled)))
            .await?;
        info!(enabled, "Data logging send enable set");
        Ok(())
    }
}
