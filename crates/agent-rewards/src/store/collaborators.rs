use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::info;

use crate::ids::IdentityId;
use crate::workflows::onboarding::{
    IdentityError, IdentityProvider, NewIdentity, NotificationError, NotificationSender,
    WelcomeMessage,
};

/// Identity provider for local runs: one identity per email, nothing leaves the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryIdentityProvider {
    identities: Arc<Mutex<HashMap<String, IdentityId>>>,
}

impl MemoryIdentityProvider {
    pub fn identity_for(&self, email: &str) -> Option<IdentityId> {
        self.identities
            .lock()
            .ok()
            .and_then(|identities| identities.get(email).copied())
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn provision(&self, identity: NewIdentity) -> Result<IdentityId, IdentityError> {
        let mut identities = self
            .identities
            .lock()
            .map_err(|_| IdentityError::Unavailable("identity registry lock poisoned".to_string()))?;
        if identities.contains_key(&identity.email) {
            return Err(IdentityError::AlreadyExists(identity.email));
        }
        let id = IdentityId::generate();
        identities.insert(identity.email.clone(), id);
        info!(identity_id = %id, email = %identity.email, role = identity.role, "identity provisioned");
        Ok(id)
    }
}

/// Keeps welcome messages in memory instead of sending them.
#[derive(Debug, Default, Clone)]
pub struct MemoryOutbox {
    messages: Arc<Mutex<Vec<WelcomeMessage>>>,
}

impl MemoryOutbox {
    pub fn messages(&self) -> Vec<WelcomeMessage> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl NotificationSender for MemoryOutbox {
    async fn send_welcome(&self, message: WelcomeMessage) -> Result<(), NotificationError> {
        let mut messages = self
            .messages
            .lock()
            .map_err(|_| NotificationError("outbox lock poisoned".to_string()))?;
        info!(to = %message.to, "welcome message queued");
        messages.push(message);
        Ok(())
    }
}
