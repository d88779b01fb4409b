/// Maps a MAC address to the organisation that owns its OUI.
pub trait VendorLookup: Send + Sync {
    fn find_vendor(&self, mac: &str) -> Option<String>;
}
