// ABOUTME: Shell command builders for pointer, directory, and git operations.
// ABOUTME: Also provides POSIX path helpers for remote paths.

use super::RemoteCommand;

/// Single-quote `value` unless it only contains characters that are safe
/// unquoted.
pub fn quote(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-+:@=,%".contains(c));
    if safe {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

pub fn trim_trailing_slash(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        "/"
    } else {
        trimmed
    }
}

/// Join two remote path segments. `.` and empty children yield `base`.
pub fn join(base: &str, child: &str) -> String {
    let child = child.trim_start_matches("./");
    let child = trim_trailing_slash(child);
    if child.is_empty() || child == "." {
        return trim_trailing_slash(base).to_string();
    }
    if child.starts_with('/') {
        return child.to_string();
    }
    let base = trim_trailing_slash(base);
    if base.is_empty() || base == "." {
        return child.to_string();
    }
    if base == "/" {
        format!("/{child}")
    } else {
        format!("{base}/{child}")
    }
}

pub fn basename(path: &str) -> &str {
    let path = trim_trailing_slash(path);
    path.rsplit('/').next().unwrap_or(path)
}

pub fn readlink(link: &str) -> RemoteCommand {
    RemoteCommand::new(format!("readlink {}", quote(link))).muted()
}

/// Force-repoint `link` at `target`.
pub fn relink(target: &str, link: &str) -> RemoteCommand {
    RemoteCommand::new(format!("ln -nfs {} {}", quote(target), quote(link)))
}

pub fn move_dir(from: &str, to: &str) -> RemoteCommand {
    RemoteCommand::new(format!("mv {} {}", quote(from), quote(to)))
}

pub fn remove_dir(path: &str) -> RemoteCommand {
    RemoteCommand::new(format!("rm -Rf {}", quote(path)))
}

/// Copy a tree keeping symlinks as symlinks.
pub fn copy_tree(from: &str, to: &str) -> RemoteCommand {
    RemoteCommand::new(format!(
        "cp -r --preserve=links {}/ {}",
        quote(trim_trailing_slash(from)),
        quote(to)
    ))
}

pub fn remove_logs(dir: &str) -> RemoteCommand {
    RemoteCommand::new(format!("rm -f {}/*.log", quote(dir)))
}

pub fn dir_exists(path: &str) -> RemoteCommand {
    RemoteCommand::new(format!("test -d {}", quote(path))).muted()
}

/// Names of the immediate subdirectories of `path`, one per line.
pub fn list_dirs(path: &str) -> RemoteCommand {
    RemoteCommand::new(r#"ls -d */ | cut -f1 -d"/""#)
        .in_dir(path)
        .muted()
}

pub fn reset_permissions(owner: &str, path: &str) -> RemoteCommand {
    let path = quote(path);
    let owner = quote(owner);
    RemoteCommand::new(format!(
        "sudo /usr/bin/chown -R {owner}:{owner} {path} && sudo /usr/bin/chmod -R g+w {path}"
    ))
}

pub fn git_head(dir: &str) -> RemoteCommand {
    RemoteCommand::new("git rev-parse HEAD").in_dir(dir).muted()
}

pub fn git_current_branch(dir: &str) -> RemoteCommand {
    RemoteCommand::new("git rev-parse --abbrev-ref HEAD")
        .in_dir(dir)
        .muted()
}

pub fn git_fetch(dir: &str) -> RemoteCommand {
    RemoteCommand::new("git fetch").in_dir(dir)
}

/// Fetch, check out `branch`, and hard-reset to its remote tip.
pub fn git_checkout_tip(dir: &str, branch: &str) -> RemoteCommand {
    let branch = quote(branch);
    RemoteCommand::new(format!(
        "git fetch && git checkout {branch} && git reset --hard origin/{branch}"
    ))
    .in_dir(dir)
}

pub fn git_checkout(dir: &str, branch: &str) -> RemoteCommand {
    RemoteCommand::new(format!("git checkout {}", quote(branch))).in_dir(dir)
}

pub fn git_reset_to_origin(dir: &str, branch: &str) -> RemoteCommand {
    RemoteCommand::new(format!("git reset --hard origin/{}", quote(branch))).in_dir(dir)
}

/// Name and status of files changed since `since`.
pub fn git_changes_since(dir: &str, since: &str) -> RemoteCommand {
    RemoteCommand::new(format!("git diff --name-status {}..", quote(since)))
        .in_dir(dir)
        .muted()
}

/// Files that differ from the remote branch tip.
pub fn git_incoming_names(dir: &str, branch: &str) -> RemoteCommand {
    RemoteCommand::new(format!("git diff --name-only origin/{}", quote(branch)))
        .in_dir(dir)
        .muted()
}

pub fn git_incoming_status(dir: &str, branch: &str) -> RemoteCommand {
    RemoteCommand::new(format!("git diff --name-status ..origin/{}", quote(branch)))
        .in_dir(dir)
        .muted()
}

/// Incoming diff of a single file.
pub fn git_incoming_file(dir: &str, branch: &str, file: &str) -> RemoteCommand {
    RemoteCommand::new(format!(
        "git diff ..origin/{} -- {}",
        quote(branch),
        quote(file)
    ))
    .in_dir(dir)
    .muted()
}

pub fn git_recent(dir: &str) -> RemoteCommand {
    RemoteCommand::new("git log --oneline -n5").in_dir(dir).muted()
}

pub fn git_history_graph(dir: &str) -> RemoteCommand {
    RemoteCommand::new(r#"git log --pretty=format:"%h %ad | %s%d [%an]" --graph --date=short -n5"#)
        .in_dir(dir)
        .muted()
}

/// Recent commits plus what the last reset changed.
pub fn git_reset_summary(dir: &str) -> RemoteCommand {
    RemoteCommand::new("git log --oneline -n5 && git diff --name-status @{1}.. || true")
        .in_dir(dir)
        .muted()
}

pub fn list_files(dir: &str) -> RemoteCommand {
    RemoteCommand::new("ls").in_dir(dir).muted()
}

pub fn read_file(dir: &str, file: &str) -> RemoteCommand {
    RemoteCommand::new(format!("cat ./{}", quote(file)))
        .in_dir(dir)
        .muted()
}

pub fn tail(path: &str, lines: usize) -> RemoteCommand {
    RemoteCommand::new(format!("tail -n{lines} {}", quote(path)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_leaves_plain_paths_alone() {
        assert_eq!(quote("/srv/releases/release-01.02.2024-1706745600000"), "/srv/releases/release-01.02.2024-1706745600000");
    }

    #[test]
    fn quote_escapes_single_quotes() {
        assert_eq!(quote("it's"), r"'it'\''s'");
        assert_eq!(quote(""), "''");
        assert_eq!(quote("a b"), "'a b'");
    }

    #[test]
    fn join_handles_dot_and_slashes() {
        assert_eq!(join("/srv/app/", "."), "/srv/app");
        assert_eq!(join("/srv/app", "./modules/"), "/srv/app/modules");
        assert_eq!(join("/srv/app", ""), "/srv/app");
        assert_eq!(join("/", "srv"), "/srv");
        assert_eq!(join("/srv/app", "/opt/other"), "/opt/other");
        assert_eq!(join(".", "billing"), "billing");
    }

    #[test]
    fn basename_ignores_trailing_slash() {
        assert_eq!(basename("/srv/releases/release-1/"), "release-1");
        assert_eq!(basename("app"), "app");
    }

    #[test]
    fn trim_trailing_slash_keeps_root() {
        assert_eq!(trim_trailing_slash("/srv/app//"), "/srv/app");
        assert_eq!(trim_trailing_slash("/"), "/");
    }

    #[test]
    fn copy_tree_copies_contents_of_source() {
        let cmd = copy_tree("/srv/app/", "/srv/releases/current-update");
        assert_eq!(
            cmd.script(),
            "cp -r --preserve=links /srv/app/ /srv/releases/current-update"
        );
    }

    #[test]
    fn lookups_are_muted() {
        assert!(readlink("/srv/app").is_muted());
        assert!(list_dirs("/srv/releases").is_muted());
        assert!(!relink("/a", "/b").is_muted());
    }

    #[test]
    fn reset_permissions_uses_owner_twice() {
        let cmd = reset_permissions("deploy", "/srv/app");
        assert_eq!(
            cmd.script(),
            "sudo /usr/bin/chown -R deploy:deploy /srv/app && sudo /usr/bin/chmod -R g+w /srv/app"
        );
    }
}
