//! Codec library for the three LyraDB on-disk formats.
//!
//! | Format | Extension | Contents |
//! |--------|-----------|----------|
//! | database container | `.lyradb` | header, key/value records, footer index, trailer checksum |
//! | iterator token | `.lyradbite` | restartable scan position bound to one container generation |
//! | archive | `.lyra` | named entries with per-entry integrity and optional compression |
//!
//! All operations are synchronous pure functions over caller-supplied byte
//! buffers; reading those buffers from a file or socket is the caller's
//! concern.  Decoded handles ([`Container`], [`Archive`]) are immutable
//! zero-copy views and can be shared across threads.
//!
//! ```
//! use lyradb_formats::{Container, ContainerBuilder};
//!
//! let mut builder = ContainerBuilder::new();
//! builder.push("a", "1");
//! builder.push("b", "2");
//! let bytes = builder.finish()?;
//!
//! let db = Container::decode(&bytes)?;
//! assert_eq!(db.get(b"a")?, b"1");
//!
//! // Stream records, pause, resume later from a plain-value token.
//! let mut scan = db.scan();
//! scan.next();
//! let token = scan.snapshot();
//! let rest: Vec<_> = db.resume(&token)?.collect::<Result<_, _>>()?;
//! assert_eq!(rest.len(), 1);
//! # Ok::<(), lyradb_formats::FormatError>(())
//! ```

pub mod archive;
pub mod checksum;
pub mod codec;
pub mod container;
pub mod cursor;
pub mod error;
pub mod header;
pub mod iterator;
pub mod validator;

pub use archive::{Archive, ArchiveBuilder, EntryRecord};
pub use codec::{Codec, CodecId};
pub use container::{Container, ContainerBuilder, Record, Scan};
pub use error::{FormatError, Result};
pub use header::{FormatHeader, FormatKind, Version, CURRENT_VERSION};
pub use iterator::ResumeToken;
