use async_trait::async_trait;
use rj_core::Notifier;

/// Writes notifications to the log instead of sending them anywhere.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &str) -> anyhow::Result<()> {
        tracing::info!(target: "rj::notify", %message, "notification");
        Ok(())
    }
}
