mod error;
mod gzip;
mod seal;
mod sign;

pub use error::CodecError;
pub use gzip::{compress, decompress};
pub use seal::{Opener, Sealer};
pub use sign::{HASH_HEADER, Signer};
