pub mod digest;

pub use digest::{fingerprint_file, Fingerprint};
