//! Script loading for the Rhai harness.
//!
//! - `codec`: the Script table layout (verify, extract `args`, build)
//! - `loader`: pulls the Script from the host into a fixed buffer and
//!   rejects anything oversized or malformed before guest code exists

pub mod codec;
pub mod loader;

pub use codec::{encode_script, script_args, verify_script, CodecError};
pub use loader::{load_and_verify, load_and_verify_with, LoadError, Script, ARGS_SIZE, SCRIPT_SIZE};
