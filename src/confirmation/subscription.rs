//! Scoped push registration

use crate::network::{Connection, SubscriptionId};
use std::sync::Arc;

/// Owns one push registration and releases it exactly once
pub struct SubscriptionGuard {
    connection: Arc<dyn Connection>,
    id: Option<SubscriptionId>,
}

impl SubscriptionGuard {
    pub fn new(connection: Arc<dyn Connection>, id: SubscriptionId) -> Self {
        Self {
            connection,
            id: Some(id),
        }
    }

    /// Release the registration; later calls do nothing
    pub async fn release(&mut self) {
        if let Some(id) = self.id.take() {
            if let Err(e) = self.connection.remove_signature_listener(id).await {
                tracing::warn!("Failed to remove signature listener {}: {}", id, e);
            } else {
                tracing::debug!("Released signature listener {}", id);
            }
        }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        let Some(id) = self.id.take() else {
            return;
        };
        // Reached only when the owning future was cancelled before release
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let connection = Arc::clone(&self.connection);
            handle.spawn(async move {
                if let Err(e) = connection.remove_signature_listener(id).await {
                    tracing::warn!("Failed to remove signature listener {}: {}", id, e);
                }
            });
        }
    }
}
