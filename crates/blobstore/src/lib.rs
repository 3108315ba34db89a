//! # Blobstore
//!
//! Content assembly and content-addressed storage for file-like resources.
//!
//! This crate provides functionality to:
//! - Assemble final file bytes from a payload plus sorted prefix/suffix fragments
//! - Address content by its SHA-1 digest
//! - Store and fetch objects in a local directory or in memory
//!
//! ## Example
//!
//! ```no_run
//! use blobstore::{Assembled, Assembler, ContentStore, DirStore, Fragment, Payload};
//!
//! let store = DirStore::open("/var/lib/converge/objects")?;
//! let assembler = Assembler::new("\n");
//!
//! let out = assembler.assemble(
//!     &Payload::Bytes(b"server=db1\n".to_vec()),
//!     &[Fragment::new("# managed file")],
//!     &[],
//! )?;
//! if let Assembled::Content(content) = out {
//!     store.upload_if_absent(&content.hash, &content.bytes)?;
//! }
//! # Ok::<(), blobstore::Error>(())
//! ```

mod assemble;
mod error;
mod hash;
mod store;

pub use assemble::{Assembled, Assembler, Content, Fragment, Payload};
pub use error::{Error, Result};
pub use hash::{hash_content, is_valid_hash, validate_hash, verify};
pub use store::{ContentStore, DirStore, MemoryStore};
