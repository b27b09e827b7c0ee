//! Credential resolution for upstream store API calls.
//!
//! A request identifies its store either inline (the caller supplies the
//! consumer pair directly) or by the opaque correlation handle issued at
//! signup, in which case the credential set comes from the record store. The
//! secondary (Razorpay) pair is stored encrypted and resolves through the
//! cipher.

pub mod cipher;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::records::{RecordStoreClient, StoreRecord};

/// Concrete credential set for the upstream store API.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpstreamCredentials {
    pub store_url: String,
    pub consumer_key: String,
    pub consumer_secret: String,
}

/// How a request identifies its store.
#[derive(Clone, Debug)]
pub enum CredentialHint {
    /// Credentials supplied with the request itself
    Inline {
        store_url: String,
        consumer_key: String,
        consumer_secret: String,
    },
    /// Reference to a stored record by correlation handle
    Stored { app_user_id: String },
}

/// Resolve a hint into a concrete credential set.
///
/// Inline hints must be complete; stored hints must name a known handle
/// whose record has completed the handshake.
pub async fn resolve(
    hint: CredentialHint,
    records: &RecordStoreClient,
) -> Result<UpstreamCredentials, Error> {
    match hint {
        CredentialHint::Inline {
            store_url,
            consumer_key,
            consumer_secret,
        } => {
            if store_url.is_empty() || consumer_key.is_empty() || consumer_secret.is_empty() {
                return Err(Error::Validation(
                    "inline credentials require store_url, consumer_key and consumer_secret"
                        .to_string(),
                ));
            }
            Ok(UpstreamCredentials {
                store_url,
                consumer_key,
                consumer_secret,
            })
        }
        CredentialHint::Stored { app_user_id } => {
            let store = records
                .find_store_by_handle(&app_user_id)
                .await?
                .ok_or_else(|| Error::NotFound("unknown store handle".to_string()))?;
            if !store.is_connected() {
                return Err(Error::Validation(
                    "store has not completed the connection handshake".to_string(),
                ));
            }
            Ok(UpstreamCredentials {
                store_url: store.store_url,
                consumer_key: store.consumer_key,
                consumer_secret: store.consumer_secret,
            })
        }
    }
}

/// Decrypted secondary credential pair.
#[derive(Clone, Debug)]
pub struct SecondaryCredentials {
    pub key_id: String,
    pub key_secret: String,
}

/// Resolve the stored secondary pair, decrypting the secret.
///
/// Integrity failures from the cipher propagate untouched.
pub fn resolve_secondary(record: &StoreRecord, key: &[u8]) -> Result<SecondaryCredentials, Error> {
    if !record.has_secondary() {
        return Err(Error::NotFound(
            "secondary credentials are not connected for this store".to_string(),
        ));
    }
    let key_secret = cipher::decrypt(&record.razorpay_key_secret_enc, key)?;
    Ok(SecondaryCredentials {
        key_id: record.razorpay_key_id.clone(),
        key_secret,
    })
}
