use keyring::Entry;

const SERVICE_NAME: &str = "com.photosorter.app";

/// Credential manager backed by the OS keychain / credential store
pub struct CredentialManager;

impl CredentialManager {
    /// Store an API key in the keychain.
    ///
    /// The key is read back through a fresh entry afterwards, so a store
    /// that accepts writes without persisting them is reported as an error.
    pub fn store_api_key(provider: &str, api_key: &str) -> Result<(), String> {
        write_key(&entry(provider)?, api_key)?;

        match read_key(&entry(provider)?) {
            Ok(stored) if stored == api_key => {
                tracing::debug!(provider, "Stored API key in keychain");
                Ok(())
            }
            _ => Err("The system keychain did not keep the API key".to_string()),
        }
    }

    /// Get an API key from the keychain
    pub fn get_api_key(provider: &str) -> Result<String, String> {
        read_key(&entry(provider)?)
    }

    /// Delete an API key from the keychain
    pub fn delete_api_key(provider: &str) -> Result<(), String> {
        if let Ok(entry) = Entry::new(SERVICE_NAME, provider) {
            let _ = entry.delete_credential();
            tracing::debug!(provider, "Deleted API key from keychain");
        }
        Ok(())
    }

    /// Check if an API key is configured
    pub fn has_api_key(provider: &str) -> bool {
        Self::get_api_key(provider).is_ok()
    }
}

fn entry(provider: &str) -> Result<Entry, String> {
    Entry::new(SERVICE_NAME, provider).map_err(|e| format!("Keychain unavailable: {}", e))
}

fn write_key(entry: &Entry, api_key: &str) -> Result<(), String> {
    entry
        .set_password(api_key)
        .map_err(|e| format!("Failed to store API key: {}", e))
}

fn read_key(entry: &Entry) -> Result<String, String> {
    entry.get_password().map_err(|e| match e {
        keyring::Error::NoEntry => "API key not found".to_string(),
        other => format!("Failed to read API key: {}", other),
    })
}
