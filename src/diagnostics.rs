// ABOUTME: Diagnostics accumulator for non-fatal warnings during a transition.
// ABOUTME: Collects warnings that shouldn't abort a transition but must reach the operator.

/// Collects non-fatal warnings during transitions.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!(kind = ?warning.kind, "{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Whether a warning of the given kind was collected.
    pub fn has(&self, kind: WarningKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }

    /// Move all warnings from `other` into this accumulator.
    pub fn absorb(&mut self, other: Diagnostics) {
        self.warnings.extend(other.warnings);
    }
}

/// A non-fatal warning collected during a transition.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// A migration scan or config parse failed.
    pub fn detection(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::Detection,
            message: message.into(),
        }
    }

    /// Hosts returned different directory listings.
    pub fn unsynced_hosts(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::UnsyncedHosts,
            message: message.into(),
        }
    }

    /// Removing an old release failed.
    pub fn prune(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::Prune,
            message: message.into(),
        }
    }

    /// Hosts disagree on a pointer target or a revision.
    pub fn host_mismatch(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::HostMismatch,
            message: message.into(),
        }
    }

    /// Create an SSH disconnect warning.
    pub fn ssh_disconnect(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::SshDisconnect,
            message: message.into(),
        }
    }
}

/// Categories of warnings that can occur during a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Migration scan or `config.json` parse failure.
    Detection,
    /// Directory listings differ between hosts.
    UnsyncedHosts,
    /// Retention pruning failed; stale releases remain.
    Prune,
    /// Pointer targets or revisions differ between hosts.
    HostMismatch,
    /// Failed to cleanly disconnect SSH session.
    SshDisconnect,
}
