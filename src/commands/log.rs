// ABOUTME: Log command implementation.
// ABOUTME: Prints the tail of the configured application log from every server.

use relink::config::Config;
use relink::diagnostics::Diagnostics;
use relink::error::{Error, Result};
use relink::output::Output;
use relink::remote::{RemoteOps, shell};

use super::{connect, emit_warnings};

pub async fn log(config: Config, lines: usize, output: Output) -> Result<()> {
    let path = config
        .log_path
        .clone()
        .ok_or_else(|| Error::InvalidConfig("log_path is not configured".to_string()))?;

    let fleet = connect(&config, &output).await?;
    let result = RemoteOps::new(&fleet)
        .run(&shell::tail(&path, lines).muted())
        .await;

    let mut diag = Diagnostics::default();
    fleet.disconnect(&mut diag).await;

    for host in result? {
        output.block(&format!("[{}] {path}", host.host), &host.stdout);
    }
    emit_warnings(&diag, &output);
    Ok(())
}
