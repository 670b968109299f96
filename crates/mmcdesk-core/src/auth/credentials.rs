use anyhow::{Context, Result};
use keyring::Entry;
use tracing::debug;

const SERVICE_NAME: &str = "mmcdesk";

/// What a keychain entry is kept for. Each slot is a separate entry, so
/// parking a registration password never clobbers a remembered login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// "Remember me" password used for non-interactive sign-in
    Remembered,
    /// Password entered at registration, held until the emailed code is
    /// confirmed and the account signs in
    PendingRegistration,
}

impl Slot {
    fn prefix(self) -> &'static str {
        match self {
            Slot::Remembered => "login",
            Slot::PendingRegistration => "pending",
        }
    }
}

/// Keychain account name for a slot and username.
fn account(slot: Slot, username: &str) -> String {
    format!("{}:{}", slot.prefix(), username)
}

/// Console passwords kept in the OS keychain.
pub struct CredentialStore;

impl CredentialStore {
    pub fn store(slot: Slot, username: &str, password: &str) -> Result<()> {
        Self::entry(slot, username)?
            .set_password(password)
            .context("Failed to store password in keychain")
    }

    /// Stored password, or `None` when there is no entry or the keychain
    /// cannot be read.
    pub fn get_password(slot: Slot, username: &str) -> Option<String> {
        match Self::entry(slot, username).map(|entry| entry.get_password()) {
            Ok(Ok(password)) => Some(password),
            Ok(Err(keyring::Error::NoEntry)) => None,
            Ok(Err(e)) => {
                debug!(error = %e, ?slot, "Keychain read failed");
                None
            }
            Err(e) => {
                debug!(error = %e, ?slot, "Keychain entry unavailable");
                None
            }
        }
    }

    /// Remove an entry. A missing entry is not an error.
    pub fn delete(slot: Slot, username: &str) -> Result<()> {
        match Self::entry(slot, username)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete credential from keychain"),
        }
    }

    /// Finish with a parked registration password: keep it as the
    /// remembered login when `remember` is set, and drop the parked copy.
    pub fn settle_pending(username: &str, remember: bool) -> Result<()> {
        if remember {
            if let Some(password) = Self::get_password(Slot::PendingRegistration, username) {
                Self::store(Slot::Remembered, username, &password)?;
            }
        }
        Self::delete(Slot::PendingRegistration, username)
    }

    fn entry(slot: Slot, username: &str) -> Result<Entry> {
        Entry::new(SERVICE_NAME, &account(slot, username)).context("Failed to create keyring entry")
    }
}
