// Copyright 2025 Chisomo Makombo Sakala
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
use glusto::config::Settings;
use glusto::connection::ConnectionPool;
use glusto::connection::SshOptions;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use tempfile::TempDir;
use tempfile::tempdir;

fn options() -> SshOptions {
  SshOptions {
    log_color: false,
    ..SshOptions::default()
  }
}

/// Writes executable stand-ins for ssh and scp into a temp dir.
///
/// The fake ssh runs its last argument through the local shell. The fake
/// scp strips any `host:` prefix from its last two arguments and copies.
#[cfg(unix)]
fn fake_clients() -> (TempDir, PathBuf, PathBuf) {
  use std::os::unix::fs::PermissionsExt;

  let temp = tempdir().unwrap();
  let ssh = temp.path().join("ssh");
  let scp = temp.path().join("scp");
  fs::write(&ssh, "#!/bin/sh\nfor last; do :; done\nexec sh -c \"$last\"\n").unwrap();
  fs::write(
    &scp,
    "#!/bin/sh\n\
     while [ $# -gt 2 ]; do shift; done\n\
     exec cp \"${1#*:}\" \"${2#*:}\"\n",
  )
  .unwrap();
  for script in [&ssh, &scp] {
    fs::set_permissions(script, fs::Permissions::from_mode(0o755)).unwrap();
  }
  (temp, ssh, scp)
}

#[cfg(unix)]
fn fake_pool(ssh: &Path, scp: &Path) -> ConnectionPool {
  ConnectionPool::new(SshOptions {
    ssh_program: ssh.to_path_buf(),
    scp_program: scp.to_path_buf(),
    use_controlpersist: false,
    ..options()
  })
}

#[test]
fn test_ssh_args() {
  let opts = SshOptions {
    port: 2222,
    connect_timeout: 5,
    keyfile: Some(PathBuf::from("/root/.ssh/id_rsa")),
    ..options()
  };
  assert_eq!(
    opts.ssh_args(),
    [
      "-T",
      "-oPort=2222",
      "-oPasswordAuthentication=no",
      "-oStrictHostKeyChecking=no",
      "-oConnectTimeout=5",
      "-oIdentityFile=/root/.ssh/id_rsa",
      "-oControlMaster=auto",
      "-oControlPersist=4h",
      "-oControlPath=~/.ssh/glusto-ssh-%r@%h:%p",
    ]
  );

  let plain = SshOptions {
    use_controlpersist: false,
    ..options()
  };
  assert!(!plain.ssh_args().iter().any(|arg| arg.starts_with("-oControl")));
  assert_eq!(plain.scp_args()[..2], ["-P", "22"]);
}

#[test]
fn test_connections_are_cached_per_user_and_host() {
  let pool = ConnectionPool::from_settings(&Settings::default());
  let first = pool.connection("server1", None);
  let again = pool.clone().connection("server1", Some("root"));
  pool.connection("server1", Some("admin"));

  assert!(std::sync::Arc::ptr_eq(&first, &again));
  assert_eq!(pool.connections(), ["admin@server1", "root@server1"]);
  assert_eq!(
    first.command_args("uptime")[first.command_args("uptime").len() - 2..],
    ["root@server1", "uptime"]
  );
}

#[tokio::test]
async fn test_run_local() {
  let pool = ConnectionPool::new(options());

  let result = pool.run_local("echo hello; echo oops >&2").await.unwrap();
  assert!(result.success());
  assert_eq!(result.stdout, "hello\n");
  assert_eq!(result.stderr, "oops\n");

  let result = pool.run_on(None, "exit 3", None).await.unwrap();
  assert_eq!(result.into_parts(), (3, String::new(), String::new()));
}

#[cfg(unix)]
#[tokio::test]
async fn test_run_serial_and_parallel() {
  let (_temp, ssh, scp) = fake_clients();
  let pool = fake_pool(&ssh, &scp);
  let hosts = vec!["server1".to_string(), "server2".to_string()];

  let result = pool.run("server1", "echo remote", None).await.unwrap();
  assert_eq!(result.stdout, "remote\n");

  let serial = pool.run_serial(&hosts, "echo serial", None).await.unwrap();
  let parallel = pool.run_parallel(&hosts, "echo parallel", Some("admin")).await.unwrap();

  assert_eq!(serial.keys().collect::<Vec<_>>(), ["server1", "server2"]);
  assert!(serial.values().all(|result| result.stdout == "serial\n"));
  assert!(parallel.values().all(|result| result.stdout == "parallel\n"));
  assert_eq!(
    pool.connections(),
    ["admin@server1", "admin@server2", "root@server1", "root@server2"]
  );

  pool.close_all().await;
  assert!(pool.connections().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_run_async_and_kill() {
  let (_temp, ssh, scp) = fake_clients();
  let pool = fake_pool(&ssh, &scp);

  let pending = pool.run_async("server1", "echo later", None).await.unwrap();
  assert_eq!(pending.identifier(), "root@server1");
  let result = pending.communicate().await.unwrap();
  assert_eq!(result.stdout, "later\n");

  let mut pending = pool.run_async("server1", "sleep 5", None).await.unwrap();
  pending.kill().await.unwrap();
  let result = pending.communicate().await.unwrap();
  assert!(!result.success());
}

#[cfg(unix)]
#[tokio::test]
async fn test_upload_and_download() {
  let (temp, ssh, scp) = fake_clients();
  let pool = fake_pool(&ssh, &scp);

  let local = temp.path().join("local.txt");
  let remote = temp.path().join("remote.txt");
  let back = temp.path().join("back.txt");
  fs::write(&local, "payload").unwrap();

  pool
    .upload("server1", &local, remote.to_str().unwrap(), None)
    .await
    .unwrap();
  assert_eq!(fs::read_to_string(&remote).unwrap(), "payload");

  pool
    .download("server1", remote.to_str().unwrap(), &back, None)
    .await
    .unwrap();
  assert_eq!(fs::read_to_string(&back).unwrap(), "payload");

  let err = pool
    .download("server1", "/nonexistent/file", &back, None)
    .await
    .unwrap_err();
  assert!(err.to_string().contains("/nonexistent/file"));
}

#[tokio::test]
async fn test_missing_ssh_binary_is_an_error() {
  let pool = ConnectionPool::new(SshOptions {
    ssh_program: PathBuf::from("/nonexistent/ssh"),
    ..options()
  });
  let err = pool.run("server1", "true", None).await.unwrap_err();
  assert!(err.to_string().contains("/nonexistent/ssh"));
}
