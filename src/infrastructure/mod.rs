pub mod cloud_foundry;
pub mod core;
pub mod envelope_reader;
pub mod gcp;
pub mod mock;
pub mod observability;
pub mod stdout;

pub use cloud_foundry::CloudControllerClient;
pub use envelope_reader::{decode_envelope, spawn_envelope_reader};
pub use stdout::StdoutLogAdapter;
