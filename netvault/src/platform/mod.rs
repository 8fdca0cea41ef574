//! Vendor command profiles.
//!
//! Each supported vendor family is one row in a static table: the setup
//! commands that disable paging or escalate privilege, the configuration
//! dump command, the prompt that marks command completion, and the noise
//! lines the normalizer drops. Adding a vendor means adding a row.

mod profile;
mod vendor;

pub use profile::VendorProfile;
pub use vendor::Vendor;
