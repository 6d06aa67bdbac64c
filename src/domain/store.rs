use crate::app::{Result, WatchError};

/// The store selection that scopes a catalog and its snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreContext {
    pub pincode: String,
    pub name: String,
}

impl StoreContext {
    /// Resolve the store for a pincode.
    ///
    /// The storefront does not expose a pincode-to-store lookup, so the
    /// configured default store names the context, falling back to the
    /// pincode itself.
    pub fn resolve(pincode: Option<&str>, default_store: &str) -> Result<Self> {
        let pincode = pincode
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or(WatchError::MissingStoreSelection)?;

        let name = match default_store.trim() {
            "" => pincode.to_string(),
            store => store.to_string(),
        };

        Ok(Self {
            pincode: pincode.to_string(),
            name,
        })
    }

    pub fn key(&self) -> &str {
        &self.name
    }
}
