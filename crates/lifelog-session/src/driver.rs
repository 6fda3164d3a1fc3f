use std::sync::Arc;
use std::time::Duration;

use lifelog_frame::ControlFrame;
use lifelog_transport::Transport;
use tokio::runtime::Handle;
use tracing::debug;

use crate::config::SessionConfig;
use crate::error::Result;
use crate::registry::SessionRegistry;
use crate::result::result_channel;
use crate::session::TransferSession;

/// Run one lifelog transfer on `connection` and return the step count.
pub async fn request(
    registry: &SessionRegistry,
    connection: Arc<dyn Transport>,
    timeout: Duration,
) -> Result<u32> {
    let config = SessionConfig {
        timeout,
        ..SessionConfig::default()
    };
    request_with_config(registry, connection, &config).await
}

/// Run one lifelog transfer with explicit configuration.
///
/// Registers a fresh session for the connection, asks the device to start,
/// and waits for the session to resolve. Notifications for the transfer must
/// be fed into `registry` while this future is pending. Dropping the future
/// retires the session.
pub async fn request_with_config(
    registry: &SessionRegistry,
    connection: Arc<dyn Transport>,
    config: &SessionConfig,
) -> Result<u32> {
    let (slot, result) = result_channel(config.timeout);
    let session = Arc::new(TransferSession::new(
        Arc::clone(&connection),
        slot,
        config.clone(),
        Handle::current(),
    ));
    let _guard = registry.register(session)?;

    let start = ControlFrame::start(config.category).to_hex_text()?;
    debug!(connection = %connection.id(), timeout = ?config.timeout, "requesting lifelog transfer");
    connection.write(config.category, start).await?;

    result.get_result().await
}
