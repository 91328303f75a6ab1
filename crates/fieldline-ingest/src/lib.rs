//! Device lifecycle and telemetry ingestion for the Fieldline pipeline.
//!
//! Two workflows form the public surface:
//!
//! - **Establish device** — registers a device identity on first sighting of
//!   its individual name, or re-confirms an existing one. Registration is
//!   idempotent; a message whose device id disagrees with the id already on
//!   record for that name is rejected without mutation.
//! - **Observe temperature** — records a single temperature reading for a
//!   device that is `ESTABLISHED` and active. Observation primary keys come
//!   from a per-table monotonic counter.
//!
//! Both workflows take an opaque message ref, resolve it to a raw envelope
//! through [`source`], decode it with [`envelope`], and drive the
//! [`directory`], [`allocator`], and [`recorder`] modules. Internally every
//! step returns a typed result; the `handle_*` shims in [`workflow`] preserve
//! the host contract of always returning status code `0`, with failures
//! reported through log lines only.
//!
//! # Usage
//!
//! ```rust,ignore
//! use fieldline_ingest::{source, workflow};
//!
//! let message_ref = source::store_message(&conn, raw_json)?;
//! let status = workflow::handle_establish_device(&mut conn, message_ref);
//! assert_eq!(status, 0);
//! ```

pub mod allocator;
pub mod directory;
pub mod envelope;
pub mod recorder;
pub mod source;
pub mod workflow;

mod error;

pub use error::{DecodeError, IngestError};
pub use workflow::{EstablishOutcome, ObserveOutcome};
