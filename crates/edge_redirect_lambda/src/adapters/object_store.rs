use edge_redirect_core::contract::PrefixListing;

/// Read-only listing of keys under a prefix, grouped by `delimiter`.
pub trait PrefixLister {
    fn list_prefix(&self, prefix: &str, delimiter: &str) -> Result<PrefixListing, String>;
}
