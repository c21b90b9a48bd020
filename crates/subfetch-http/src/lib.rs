pub mod client;
pub mod content;
pub mod scheme;

pub use client::{DEFAULT_USER_AGENT, HttpLoader};
pub use content::{ContentResolver, DirectoryResolver};
pub use scheme::SchemeLoader;
