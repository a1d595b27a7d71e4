/*
 * bubblebox-core
 *
 * Copyright (C) 2025-2026 Bubblebox Contributors
 * SPDX-License-Identifier: GPL-3.0-only
 *
 * This library is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, version 3.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use std::{
    fs::{self, DirBuilder},
    io::ErrorKind as IoErrorKind,
    os::unix::fs::{DirBuilderExt, FileTypeExt},
    path::{Path, PathBuf},
    process::{id, Command},
};

use toml::Table;

use crate::{
    config::{service::Service, ServiceConfig},
    constants::{FILE_NAME_METADATA, FILE_NAME_SERVICES, HELPER_SOCKET_NAME},
    err,
    exec::{RunnerSettings, SandboxRunner},
    homeplugin::HomePlugin,
    log::{Level, Logger},
    profile::Profile,
    rpc::{HelperRpcClient, RpcResponse},
    utils::{env_var, print_warning},
    Error,
    ErrorGeneric,
    ErrorKind,
    Result,
};

pub const METADATA_KEY_PROFILE: &str = "creation_profile_name";
pub const METADATA_KEY_DESKTOP_ENTRY: &str = "desktop_entry_name";

/// Host paths of one instance's runtime state. All five live under a single
/// 0700 parent whose exclusive creation is the per-instance run lock.
#[derive(Clone, Debug)]
pub struct RuntimePaths {
    instance: String,
    root: PathBuf,
    helper_dir: PathBuf,
    helper_socket: PathBuf,
    dbus_session_socket: PathBuf,
    dbus_system_socket: PathBuf,
}

impl RuntimePaths {
    pub fn new(runtime_base: &Path, instance: &str) -> Self {
        let root = runtime_base.join(instance);
        let helper_dir = root.join("helper");

        Self {
            instance: instance.into(),
            helper_socket: helper_dir.join(HELPER_SOCKET_NAME),
            dbus_session_socket: root.join("dbus_session_proxy"),
            dbus_system_socket: root.join("dbus_system_proxy"),
            helper_dir,
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn helper_dir(&self) -> &Path {
        &self.helper_dir
    }

    pub fn helper_socket(&self) -> &Path {
        &self.helper_socket
    }

    pub fn dbus_session_socket(&self) -> &Path {
        &self.dbus_session_socket
    }

    pub fn dbus_system_socket(&self) -> &Path {
        &self.dbus_system_socket
    }

    /// Take the per-instance lock: the runtime root is created 0700 and
    /// exclusively, so the loser of a race gets `AlreadyRunning`.
    pub fn acquire(&self) -> Result<()> {
        if let Some(base) = self.root.parent() {
            fs::create_dir_all(base).prepend_io(|| base.to_string_lossy().into())?;
        }

        match DirBuilder::new().mode(0o700).create(&self.root) {
            Ok(()) => (),
            Err(error) => match error.kind() {
                IoErrorKind::AlreadyExists => err!(ErrorKind::AlreadyRunning(self.instance.clone()))?,
                _ => err!(ErrorKind::IOError(self.root.to_string_lossy().into(), error.kind()))?,
            },
        }

        match DirBuilder::new().mode(0o700).create(&self.helper_dir) {
            Ok(()) => Ok(()),
            Err(error) => err!(ErrorKind::IOError(self.helper_dir.to_string_lossy().into(), error.kind())),
        }
    }

    /// Drop-phase removal: strict reverse order of creation, absence is
    /// fine, anything else is reported and skipped.
    pub fn release(&self) {
        remove(&self.helper_socket, false);
        remove(&self.helper_dir, true);
        remove(&self.dbus_session_socket, false);
        remove(&self.dbus_system_socket, false);
        remove(&self.root, true);
    }
}

fn remove(path: &Path, dir: bool) {
    let result = match dir {
        true => fs::remove_dir(path),
        false => fs::remove_file(path),
    };

    match result {
        Ok(()) => (),
        Err(error) if error.kind() == IoErrorKind::NotFound => (),
        Err(error) => print_warning(&format!("failed to remove '{}': {error}", path.display())),
    }
}

/// A named on-disk directory holding one sandboxed application's home,
/// service configuration and metadata.
#[derive(Debug)]
pub struct Instance {
    name: String,
    directory: PathBuf,
}

impl Instance {
    pub fn new(data_dir: &Path, name: &str) -> Result<Self> {
        let directory = data_dir.join(name);

        if !directory.is_dir() {
            err!(ErrorKind::InstanceMissing(name.into()))?
        }

        Ok(Self {
            name: name.into(),
            directory,
        })
    }

    /// Materialise the directory tree of a new instance and seed its
    /// configuration from `profile`.
    pub fn create(data_dir: &Path, name: &str, profile: Option<&Profile>) -> Result<Self> {
        let directory = data_dir.join(name);

        if directory.exists() {
            err!(ErrorKind::InstanceExists(name.into()))?
        }

        fs::create_dir_all(data_dir).prepend_io(|| data_dir.to_string_lossy().into())?;
        fs::create_dir(&directory).prepend_io(|| directory.to_string_lossy().into())?;
        fs::create_dir(directory.join("home")).prepend_io(|| directory.to_string_lossy().into())?;

        let instance = Self {
            name: name.into(),
            directory,
        };
        let config = match profile {
            Some(profile) => profile.service_config(),
            None => {
                let mut config = ServiceConfig::new();

                let _ = config.enable("common");
                config
            }
        };

        instance.save_config(&config)?;

        if let Some(profile) = profile {
            instance.set_metadata_value(METADATA_KEY_PROFILE, profile.name)?;
        }

        Ok(instance)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn home_path(&self) -> PathBuf {
        self.directory.join("home")
    }

    pub fn config_path(&self) -> PathBuf {
        self.directory.join(FILE_NAME_SERVICES)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.directory.join(FILE_NAME_METADATA)
    }

    pub fn runtime_paths(&self, runtime_base: &Path) -> RuntimePaths {
        RuntimePaths::new(runtime_base, &self.name)
    }

    pub fn is_running(&self, runtime_base: &Path) -> bool {
        fs::metadata(self.runtime_paths(runtime_base).helper_socket())
            .map(|m| m.file_type().is_socket())
            .unwrap_or(false)
    }

    // region Configuration

    pub fn load_config(&self, catalog: &[&'static dyn Service]) -> Result<ServiceConfig> {
        let path = self.config_path();
        let contents = fs::read_to_string(&path).prepend_io(|| path.to_string_lossy().into())?;

        ServiceConfig::from_toml_str(&contents, catalog)
    }

    pub fn save_config(&self, config: &ServiceConfig) -> Result<()> {
        let path = self.config_path();

        fs::write(&path, config.to_toml_string()?).prepend_io(|| path.to_string_lossy().into())
    }

    /// Copy the config to a scratch file, hand it to `$EDITOR`, and adopt
    /// the result only if the file was touched and still validates.
    pub fn edit_config(&self, catalog: &[&'static dyn Service]) -> Result<()> {
        let editor = env_var("EDITOR")?;
        let temp_path = std::env::temp_dir().join(format!("bubblebox-{}-{}.toml", self.name, id()));

        fs::copy(self.config_path(), &temp_path).prepend_io(|| temp_path.to_string_lossy().into())?;

        let edit_result = self.run_editor(&editor, &temp_path, catalog);
        let _ = fs::remove_file(&temp_path);

        edit_result
    }

    fn run_editor(&self, editor: &str, temp_path: &Path, catalog: &[&'static dyn Service]) -> Result<()> {
        let initial_mtime = fs::metadata(temp_path)
            .and_then(|m| m.modified())
            .prepend_io(|| temp_path.to_string_lossy().into())?;

        match Command::new(editor).arg(temp_path).status() {
            Ok(_) => (),
            Err(error) => err!(ErrorKind::ProcessInitFailure("$EDITOR", error.kind()))?,
        }

        let final_mtime = fs::metadata(temp_path)
            .and_then(|m| m.modified())
            .prepend_io(|| temp_path.to_string_lossy().into())?;

        if final_mtime <= initial_mtime {
            println!("File not modified. Not overwriting config");
            return Ok(());
        }

        let contents = fs::read_to_string(temp_path).prepend_io(|| temp_path.to_string_lossy().into())?;

        // Reject the edit outright rather than persisting a broken config.
        let _ = ServiceConfig::from_toml_str(&contents, catalog)?;

        fs::write(self.config_path(), contents).prepend_io(|| self.config_path().to_string_lossy().into())
    }

    // endregion

    // region Metadata

    fn metadata_table(&self) -> Result<Table> {
        match fs::read_to_string(self.metadata_path()) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(table) => Ok(table),
                Err(error) => err!(ErrorKind::Config(error.to_string())),
            },
            Err(error) if error.kind() == IoErrorKind::NotFound => Ok(Table::new()),
            Err(error) => err!(ErrorKind::IOError(self.metadata_path().to_string_lossy().into(), error.kind())),
        }
    }

    pub fn metadata_value(&self, key: &str) -> Result<Option<String>> {
        Ok(self.metadata_table()?.get(key).and_then(|v| v.as_str()).map(String::from))
    }

    /// Read-modify-write: every other key in the metadata file survives.
    pub fn set_metadata_value(&self, key: &str, value: &str) -> Result<()> {
        let mut table = self.metadata_table()?;

        let _ = table.insert(key.into(), toml::Value::String(value.into()));

        let contents = match toml::to_string(&table) {
            Ok(contents) => contents,
            Err(error) => err!(ErrorKind::Config(error.to_string()))?,
        };

        fs::write(self.metadata_path(), contents).prepend_io(|| self.metadata_path().to_string_lossy().into())
    }

    // endregion

    /// Launch the sandbox for this instance.
    pub fn run(
        &self,
        runtime_base: &Path,
        catalog: &[&'static dyn Service],
        plugins: &[&dyn HomePlugin],
        settings: RunnerSettings,
    ) -> Result<()> {
        let config = self.load_config(catalog)?;
        let paths = self.runtime_paths(runtime_base);
        let dry_run = settings.dry_run;
        let result = SandboxRunner::new(self.home_path(), paths, &config, catalog, plugins, settings).run();

        if !dry_run {
            if let Ok(mut logger) = Logger::new("bubblebox").init() {
                let _ = match &result {
                    Ok(()) => logger.log(Level::Info, &format!("instance '{}' exited cleanly", self.name)),
                    Err(error) => logger.log(Level::Error, &format!("instance '{}' failed: {error}", self.name)),
                };
            }
        }

        result
    }

    /// Run a command inside the already-running sandbox over the helper
    /// socket.
    pub fn send_run_rpc(
        &self,
        runtime_base: &Path,
        args_to_run: Vec<String>,
        wait_response: bool,
    ) -> Result<Option<RpcResponse>> {
        let paths = self.runtime_paths(runtime_base);

        HelperRpcClient::new(&self.name, paths.helper_socket()).send_run(args_to_run, wait_response)
    }
}

/// Instance names found under the data directory, sorted.
pub fn list_instances(data_dir: &Path) -> Result<Vec<String>> {
    let entries = match fs::read_dir(data_dir) {
        Ok(entries) => entries,
        Err(error) if error.kind() == IoErrorKind::NotFound => return Ok(Vec::new()),
        Err(error) => err!(ErrorKind::IOError(data_dir.to_string_lossy().into(), error.kind()))?,
    };
    let mut names = Vec::new();

    for entry in entries {
        let entry = entry.prepend_io(|| data_dir.to_string_lossy().into())?;

        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }
    }

    names.sort_unstable();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use std::{env::temp_dir, os::unix::fs::PermissionsExt, sync::Mutex};

    use super::*;
    use crate::{config::default_catalog, profile::find_profile};

    // The editor tests all mutate $EDITOR; one at a time.
    static EDITOR_LOCK: Mutex<()> = Mutex::new(());

    fn scratch(tag: &str) -> PathBuf {
        let dir = temp_dir().join(format!("bubblebox-instance-{tag}-{}", id()));
        let _ = fs::remove_dir_all(&dir);

        fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// A stand-in editor: waits out the mtime granularity, then applies
    /// `body` to the file it was handed.
    fn editor_script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("editor.sh");

        fs::write(&path, format!("#!/bin/sh\nsleep 0.1\n{body}\n")).unwrap();

        let mut permissions = fs::metadata(&path).unwrap().permissions();

        permissions.set_mode(0o755);
        fs::set_permissions(&path, permissions).unwrap();
        path
    }

    #[test]
    fn create_materialises_the_tree() {
        let data = scratch("create");
        let instance = Instance::create(&data, "alice", find_profile("firefox")).unwrap();

        assert!(instance.home_path().is_dir());
        assert!(instance.config_path().is_file());
        assert_eq!(instance.metadata_value(METADATA_KEY_PROFILE).unwrap().unwrap(), "firefox");

        let services = fs::read_to_string(instance.config_path()).unwrap();
        assert!(services.contains("executable_name = \"firefox\""));

        assert_eq!(list_instances(&data).unwrap(), vec!["alice".to_owned()]);
        fs::remove_dir_all(&data).unwrap();
    }

    #[test]
    fn create_refuses_an_existing_instance() {
        let data = scratch("exists");

        let _ = Instance::create(&data, "alice", None).unwrap();
        let error = Instance::create(&data, "alice", None).unwrap_err();

        assert!(matches!(error.downcast::<ErrorKind>(), Ok(ErrorKind::InstanceExists(_))));
        fs::remove_dir_all(&data).unwrap();
    }

    #[test]
    fn missing_instance_is_reported() {
        let data = scratch("missing");
        let error = Instance::new(&data, "ghost").unwrap_err();

        assert!(matches!(error.downcast::<ErrorKind>(), Ok(ErrorKind::InstanceMissing(_))));
        fs::remove_dir_all(&data).unwrap();
    }

    #[test]
    fn metadata_setters_compose() {
        let data = scratch("metadata");
        let instance = Instance::create(&data, "alice", None).unwrap();

        instance.set_metadata_value(METADATA_KEY_PROFILE, "firefox").unwrap();
        instance.set_metadata_value(METADATA_KEY_DESKTOP_ENTRY, "firefox.desktop").unwrap();

        assert_eq!(instance.metadata_value(METADATA_KEY_PROFILE).unwrap().unwrap(), "firefox");
        assert_eq!(
            instance.metadata_value(METADATA_KEY_DESKTOP_ENTRY).unwrap().unwrap(),
            "firefox.desktop"
        );
        fs::remove_dir_all(&data).unwrap();
    }

    #[test]
    fn runtime_lock_is_exclusive() {
        let base = scratch("lock");
        let paths = RuntimePaths::new(&base, "alice");

        paths.acquire().unwrap();

        let error = paths.acquire().unwrap_err();
        assert!(matches!(error.downcast::<ErrorKind>(), Ok(ErrorKind::AlreadyRunning(_))));

        paths.release();
        assert!(!paths.root().exists());

        // Released lock can be taken again.
        paths.acquire().unwrap();
        paths.release();
        fs::remove_dir_all(&base).unwrap();
    }

    #[test]
    fn unmodified_edit_preserves_config_bytes() {
        let _guard = EDITOR_LOCK.lock().unwrap();
        let data = scratch("edit");
        let instance = Instance::create(&data, "alice", find_profile("firefox")).unwrap();
        let before = fs::read(instance.config_path()).unwrap();

        std::env::set_var("EDITOR", "/bin/true");
        instance.edit_config(default_catalog()).unwrap();

        assert_eq!(fs::read(instance.config_path()).unwrap(), before);
        fs::remove_dir_all(&data).unwrap();
    }

    #[test]
    fn modified_edit_is_validated_and_adopted() {
        let _guard = EDITOR_LOCK.lock().unwrap();
        let data = scratch("edit-modified");
        let instance = Instance::create(&data, "alice", None).unwrap();
        let script = editor_script(&data, "printf '\\n[network]\\nshare_network = false\\n' >> \"$1\"");

        std::env::set_var("EDITOR", script.to_str().unwrap());
        instance.edit_config(default_catalog()).unwrap();

        let contents = fs::read_to_string(instance.config_path()).unwrap();

        assert!(contents.contains("share_network = false"));
        fs::remove_dir_all(&data).unwrap();
    }

    #[test]
    fn invalid_edit_is_rejected_and_config_kept() {
        let _guard = EDITOR_LOCK.lock().unwrap();
        let data = scratch("edit-invalid");
        let instance = Instance::create(&data, "alice", None).unwrap();
        let before = fs::read(instance.config_path()).unwrap();
        let script = editor_script(&data, "printf '[teleporter]\\n' > \"$1\"");

        std::env::set_var("EDITOR", script.to_str().unwrap());

        let error = instance.edit_config(default_catalog()).unwrap_err();

        assert!(matches!(error.downcast::<ErrorKind>(), Ok(ErrorKind::Config(_))));
        assert_eq!(fs::read(instance.config_path()).unwrap(), before);
        fs::remove_dir_all(&data).unwrap();
    }
}
