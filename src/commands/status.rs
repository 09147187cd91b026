// ABOUTME: Status command implementation.
// ABOUTME: Shows where the pointers point on each server and the release listing.

use relink::config::Config;
use relink::diagnostics::{Diagnostics, Warning};
use relink::error::{Error, Result};
use relink::output::Output;
use relink::release::{ReleaseLayout, ReleaseSet};
use relink::remote::RemoteOps;
use relink::transition::read_pointers;

use super::{connect, emit_warnings};

pub async fn status(config: Config, output: Output) -> Result<()> {
    let releases = config.releases()?;
    let layout = ReleaseLayout::new(&releases.releases, &releases.current);

    let fleet = connect(&config, &output).await?;
    let remote = RemoteOps::new(&fleet);
    let result = async {
        let pointers = read_pointers(remote, &layout).await?;
        let listing = remote.list_dirs(&layout.root).await?;
        Ok::<_, Error>((pointers, listing))
    }
    .await;

    let mut diag = Diagnostics::default();
    fleet.disconnect(&mut diag).await;
    let (pointers, listing) = result?;

    let unknown = || "(unreadable)".to_string();
    for host in &pointers {
        let mut lines = vec![
            format!("current:     {}", host.current.clone().unwrap_or_else(unknown)),
            format!("last-worked: {}", host.last_worked.clone().unwrap_or_else(unknown)),
        ];
        if host.staging_left {
            lines.push(format!("{} is left from an interrupted update", layout.staging));
        }
        output.block(&format!("[{}]", host.host), &lines.join("\n"));
    }

    let set = ReleaseSet::from_names(&layout.root, &listing.dirs);
    let names: Vec<&str> = set.iter().map(|r| r.name.as_str()).collect();
    output.block(&format!("Releases in {}:", layout.root), &names.join("\n"));
    if let Some(report) = listing.unsynced_report() {
        diag.warn(Warning::unsynced_hosts(report));
    }

    emit_warnings(&diag, &output);
    output.success(&format!(
        "{} release(s) on {} server(s)",
        set.len(),
        pointers.len()
    ));
    Ok(())
}
