//! License validation and hardware binding for Tollgate.
//!
//! This crate decides, at every start and periodically while the host runs,
//! whether this installation may run, on which machine, and for how long.
//! It reconciles three inputs: the locally persisted record, the remote
//! registry, and live hardware probes.
//!
//! # Components
//!
//! - [`collect`]: hashed hardware fingerprint of this machine
//! - [`match_fingerprints`]: K-of-N fuzzy comparison with a per-field report
//! - [`StateMachine`]: transition rules between [`LicenseState`]s
//! - [`GraceWindow`]: offline grace arithmetic
//! - [`find_recovery`]: auto-recovery of a lost local record
//! - [`TransferCoordinator`]: transfer ceiling and pending transfers
//! - [`LicenseEngine`]: the entry points the host calls
//! - [`BackgroundValidator`]: periodic revalidation
//!
//! # Failure policy
//!
//! - Registry unreachable or slow: fall back to the cached record within the
//!   offline grace window, never a hard failure on its own
//! - Local record unreadable: treated as not activated (fail closed)
//! - Revocation: once observed it is cached and enforced offline forever

mod callbacks;
mod clock;
mod collector;
mod config;
mod engine;
mod error;
mod grace;
mod matcher;
mod outcome;
mod recovery;
mod state;
mod transfer;
mod validator;

pub use callbacks::{HostCallbacks, NoopCallbacks};
pub use clock::{Clock, ManualClock, SystemClock};
pub use collector::{collect, host_label, FingerprintSource, StaticProbe, SystemProbe};
pub use config::EngineConfig;
pub use engine::{EngineBuilder, LicenseEngine};
pub use error::{LicenseError, LicenseResult};
pub use grace::GraceWindow;
pub use matcher::{match_fingerprints, FieldOutcome, FieldReport, MatchReport, MismatchKind};
pub use outcome::{Decision, ValidationOutcome};
pub use recovery::{find_recovery, RecoveryCandidate, RecoveryScan};
pub use state::{BlockReason, LicenseState, StateMachine};
pub use transfer::{Confirmed, PendingTransfer, Rejected, TransferCoordinator, VerificationCapability};
pub use validator::{BackgroundValidator, ValidatorHandle};
