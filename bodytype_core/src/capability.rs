//! Capability probing primitives shared by every host adapter.
//!
//! Host APIs are not fixed at build time, so every lookup against a host
//! object is a probe that may come back empty. Absence is an expected outcome
//! and is carried as a [`CapabilityError`] rather than a panic. Diagnostics for
//! a failed probe are emitted at most once per [`FailureSite`] per process.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

/// Why a probed capability could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    /// No accessor, constructor or method with an acceptable name exists.
    #[error("capability absent: {what}")]
    Absent { what: String },
    /// An entry point was found but its arity or parameter types do not line
    /// up with what the caller can supply.
    #[error("record shape mismatch for {what}: {detail}")]
    ShapeMismatch { what: String, detail: String },
}

impl CapabilityError {
    pub fn absent(what: impl Into<String>) -> Self {
        CapabilityError::Absent { what: what.into() }
    }

    pub fn mismatch(what: impl Into<String>, detail: impl Into<String>) -> Self {
        CapabilityError::ShapeMismatch {
            what: what.into(),
            detail: detail.into(),
        }
    }
}

/// Try each candidate in order and return the first successful probe.
///
/// Shape mismatches reported by individual candidates are remembered so the
/// final error explains the closest miss; otherwise the result is
/// [`CapabilityError::Absent`] naming `what`.
pub fn probe_first<C, T, I, F>(what: &str, candidates: I, mut probe: F) -> Result<T, CapabilityError>
where
    I: IntoIterator<Item = C>,
    F: FnMut(C) -> Result<T, CapabilityError>,
{
    let mut mismatch = None;
    for candidate in candidates {
        match probe(candidate) {
            Ok(found) => return Ok(found),
            Err(err @ CapabilityError::ShapeMismatch { .. }) => {
                mismatch.get_or_insert(err);
            }
            Err(CapabilityError::Absent { .. }) => {}
        }
    }
    Err(mismatch.unwrap_or_else(|| CapabilityError::absent(what)))
}

/// Places in the probing pipeline that report a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureSite {
    LocateRecord,
    ReadTargetField,
    RebuildRecord,
    CommitRecord,
    MessageColor,
    MessageClick,
}

impl FailureSite {
    pub const COUNT: usize = 6;

    pub const ALL: [FailureSite; FailureSite::COUNT] = [
        FailureSite::LocateRecord,
        FailureSite::ReadTargetField,
        FailureSite::RebuildRecord,
        FailureSite::CommitRecord,
        FailureSite::MessageColor,
        FailureSite::MessageClick,
    ];

    fn index(self) -> usize {
        match self {
            FailureSite::LocateRecord => 0,
            FailureSite::ReadTargetField => 1,
            FailureSite::RebuildRecord => 2,
            FailureSite::CommitRecord => 3,
            FailureSite::MessageColor => 4,
            FailureSite::MessageClick => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FailureSite::LocateRecord => "locate_record",
            FailureSite::ReadTargetField => "read_target_field",
            FailureSite::RebuildRecord => "rebuild_record",
            FailureSite::CommitRecord => "commit_record",
            FailureSite::MessageColor => "message_color",
            FailureSite::MessageClick => "message_click",
        }
    }
}

impl fmt::Display for FailureSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One latch per failure site; a latch trips on the first report only.
#[derive(Debug)]
pub struct OnceLatch {
    tripped: [AtomicBool; FailureSite::COUNT],
}

impl OnceLatch {
    pub const fn new() -> Self {
        const UNSET: AtomicBool = AtomicBool::new(false);
        Self {
            tripped: [UNSET; FailureSite::COUNT],
        }
    }

    /// Returns `true` for the first caller at `site`, `false` afterwards.
    pub fn trip(&self, site: FailureSite) -> bool {
        self.tripped[site.index()]
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_tripped(&self, site: FailureSite) -> bool {
        self.tripped[site.index()].load(Ordering::Acquire)
    }
}

impl Default for OnceLatch {
    fn default() -> Self {
        Self::new()
    }
}

static DIAGNOSTICS: OnceLatch = OnceLatch::new();

/// Emit the diagnostic for `site` unless one was already emitted by this
/// process. Returns whether a line was written.
pub fn report_once(site: FailureSite, err: &CapabilityError) -> bool {
    report_once_with(&DIAGNOSTICS, site, err)
}

pub(crate) fn report_once_with(latch: &OnceLatch, site: FailureSite, err: &CapabilityError) -> bool {
    if !latch.trip(site) {
        return false;
    }
    tracing::warn!(
        target: "bodytypes::adapter",
        site = %site,
        error = %err,
        "capability.unavailable"
    );
    true
}
