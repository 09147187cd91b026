// ABOUTME: Cross-host directory listing reconciliation.
// ABOUTME: Flags hosts whose listing differs from the first and picks the most complete one.

/// Directory names gathered from every host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirListing {
    /// The operative listing: the longest host listing, first host on ties.
    pub dirs: Vec<String>,
    /// Raw listing per host, in host order.
    pub per_host: Vec<(String, Vec<String>)>,
    pub unsynced: bool,
}

impl DirListing {
    /// Operator-facing description of the disagreement, if any.
    pub fn unsynced_report(&self) -> Option<String> {
        if !self.unsynced {
            return None;
        }
        let mut report = String::from("Unsynced directories between the servers!");
        for (host, dirs) in &self.per_host {
            report.push_str(&format!("\n  {host}: {}", dirs.join(" ")));
        }
        Some(report)
    }
}

/// Compare every host's listing with the first host's.
pub fn reconcile_listings(per_host: Vec<(String, Vec<String>)>) -> DirListing {
    let first = per_host.first().map(|(_, dirs)| dirs);
    let unsynced = per_host.iter().any(|(_, dirs)| Some(dirs) != first);

    let mut dirs: &[String] = &[];
    for (_, listing) in &per_host {
        if listing.len() > dirs.len() {
            dirs = listing;
        }
    }

    DirListing {
        dirs: dirs.to_vec(),
        unsynced,
        per_host,
    }
}
