//! Image handling for classification and corpus maintenance.
//!
//! - **sniff**: decide an image's real format from its leading bytes
//! - **normalize**: re-encode formats the vision APIs reject as JPEG
//! - **loader**: read local files or download URLs, then sniff and normalize
//! - **discovery**: find image files in directories
//! - **audit**: report mislabeled extensions, oversized files, largest images

pub mod audit;
pub mod discovery;
pub mod loader;
pub mod normalize;
pub mod sniff;

// Re-exports for convenient access
pub use audit::{audit_directory, AuditReport};
pub use discovery::{DiscoveredFile, FileDiscovery};
pub use loader::{ImageLoader, ImageSource, PreparedImage};
pub use normalize::to_jpeg_bytes;
pub use sniff::{sniff_bytes, Sniffed, WireFormat};
