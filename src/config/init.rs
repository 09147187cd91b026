// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates a commented relink.yml template.

use std::path::Path;

use crate::error::{Error, Result};

use super::{CONFIG_FILENAME, Config};

pub fn init_config(dir: &Path, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let yaml = generate_template_yaml(&Config::template())?;
    std::fs::write(&config_path, yaml)?;

    Ok(())
}

fn generate_template_yaml(config: &Config) -> Result<String> {
    let server = config.servers.first();
    let update = config.releases()?;
    let target = update
        .targets
        .first()
        .ok_or_else(|| Error::InvalidConfig("template has no update targets".to_string()))?;
    let optional = |value: &Option<String>| value.clone().unwrap_or_default();

    Ok(format!(
        r#"servers:
  - {user}@{host}
  # - host: {host}
  #   port: {port}
  #   key_path: ~/.ssh/id_ed25519
  #   trust_first_connection: true

# Live application tree (sync works here, config.json is read from here)
app_path: {app_path}
branch: {branch}
# owner: deploy
# reset_dir_script: sudo /usr/local/bin/reset-app-perms
restart_script: {restart}
show_status_script: {status}
# open_url: https://app.example.com/
# install_command: {install}
# status_delay: 2s
# log_path: /var/log/app/app.log

update:
  releases: {releases}
  current: {current}
  keep_releases: {keep}
  targets:
    - id: {target_id}
      path: {target_path}
    # - id: modules
    #   path: modules
    #   recursive: true

# destinations:
#   staging:
#     servers:
#       - deploy@staging.example.com
"#,
        user = server.user.as_deref().unwrap_or("deploy"),
        host = server.host,
        port = server.port,
        app_path = config.app_path,
        branch = optional(&config.branch),
        restart = optional(&config.restart_script),
        status = optional(&config.show_status_script),
        install = config.install_command,
        releases = update.releases,
        current = update.current,
        keep = update.keep_releases,
        target_id = target.id,
        target_path = target.path,
    ))
}
