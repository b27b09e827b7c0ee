//! Web Push sender with VAPID signing.

use async_trait::async_trait;
use web_push::{
    ContentEncoding, HyperWebPushClient, SubscriptionInfo, VapidSignatureBuilder, WebPushClient,
    WebPushError, WebPushMessageBuilder, URL_SAFE_NO_PAD,
};

use super::{PushSendError, PushSender, PushSubscription};
use crate::error::Error;

/// Sends notifications over the Web Push protocol, signing each request with
/// the configured VAPID key pair.
pub struct WebPushSender {
    client: HyperWebPushClient,
    vapid_private_key: String,
    contact: Option<String>,
}

impl WebPushSender {
    pub fn new(vapid_private_key: String, contact: Option<String>) -> Result<Self, Error> {
        if vapid_private_key.is_empty() {
            return Err(Error::Configuration(
                "push signing key must not be empty".to_string(),
            ));
        }
        Ok(Self {
            client: HyperWebPushClient::new(),
            vapid_private_key,
            contact,
        })
    }
}

#[async_trait]
impl PushSender for WebPushSender {
    async fn send(
        &self,
        subscription: &PushSubscription,
        payload: &str,
    ) -> Result<(), PushSendError> {
        let info = SubscriptionInfo::new(
            subscription.endpoint.clone(),
            subscription.keys.p256dh.clone(),
            subscription.keys.auth.clone(),
        );

        let mut signature =
            VapidSignatureBuilder::from_base64(&self.vapid_private_key, URL_SAFE_NO_PAD, &info)
                .map_err(|e| PushSendError::Failed(format!("vapid key rejected: {}", e)))?;
        if let Some(contact) = &self.contact {
            signature.add_claim("sub", contact.clone());
        }
        let signature = signature
            .build()
            .map_err(|e| PushSendError::Failed(format!("vapid signing failed: {}", e)))?;

        let mut builder = WebPushMessageBuilder::new(&info);
        builder.set_payload(ContentEncoding::Aes128Gcm, payload.as_bytes());
        builder.set_vapid_signature(signature);
        let message = builder
            .build()
            .map_err(|e| PushSendError::Failed(format!("message build failed: {}", e)))?;

        match self.client.send(message).await {
            Ok(()) => Ok(()),
            Err(err @ (WebPushError::EndpointNotFound | WebPushError::EndpointNotValid)) => {
                Err(PushSendError::Rejected(err.to_string()))
            }
            Err(err) => Err(PushSendError::Failed(err.to_string())),
        }
    }
}
