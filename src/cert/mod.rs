pub mod identity;
pub mod store;

pub use identity::{build_server_config, load_server_config};
pub use store::{CertBundle, CertStore};
