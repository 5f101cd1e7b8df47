use anyhow::{anyhow, Context, Result};
use ingredient_core::PackageFormat;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// A native package ready to be handed to the OS package manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeInstall<'a> {
    pub format: PackageFormat,
    pub artifact: &'a Path,
    pub install_dir: &'a Path,
}

/// Host primitives the orchestrators drive but do not implement.
pub trait HostOps {
    fn install_package(&self, request: &NativeInstall<'_>) -> Result<()>;

    /// Unpacks `archive` into `destination` as-is, without stripping.
    fn extract_archive(&self, archive: &Path, format: PackageFormat, destination: &Path)
        -> Result<()>;

    fn ensure_group(&self, group: &str, member: &str) -> Result<()>;

    fn chown_recursive(&self, path: &Path, user: &str, group: &str) -> Result<()>;
}

/// Shells out to the platform tools.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandHost;

impl HostOps for CommandHost {
    fn install_package(&self, request: &NativeInstall<'_>) -> Result<()> {
        let mut command = build_native_install_command(request)?;
        debug!(command = ?command, "installing native package");
        run_command(
            &mut command,
            &format!(
                "failed to install {} package {}",
                request.format.as_str(),
                request.artifact.display()
            ),
        )
    }

    fn extract_archive(
        &self,
        archive: &Path,
        format: PackageFormat,
        destination: &Path,
    ) -> Result<()> {
        let mut command = build_extract_command(archive, format, destination)?;
        debug!(command = ?command, "extracting archive");
        run_command(
            &mut command,
            &format!("failed to extract {}", archive.display()),
        )
    }

    fn ensure_group(&self, group: &str, member: &str) -> Result<()> {
        if cfg!(windows) {
            return Err(anyhow!("group management is not supported on Windows hosts"));
        }
        run_command(
            &mut build_group_add_command(group),
            &format!("failed to create group {group}"),
        )?;
        run_command(
            &mut build_group_append_command(group, member),
            &format!("failed to add {member} to group {group}"),
        )
    }

    fn chown_recursive(&self, path: &Path, user: &str, group: &str) -> Result<()> {
        if cfg!(windows) {
            return Err(anyhow!("ownership changes are not supported on Windows hosts"));
        }
        run_command(
            &mut build_chown_command(path, user, group),
            &format!("Give ownership of {} to {user}:{group}", path.display()),
        )
    }
}

pub(crate) fn build_native_install_command(request: &NativeInstall<'_>) -> Result<Command> {
    match request.format {
        PackageFormat::Rpm => {
            let mut command = Command::new("rpm");
            command.arg("-U").arg("--replacepkgs").arg(request.artifact);
            Ok(command)
        }
        PackageFormat::Deb => {
            let mut command = Command::new("dpkg");
            command.arg("-i").arg(request.artifact);
            Ok(command)
        }
        PackageFormat::Msi => Ok(build_msi_install_command(
            request.artifact,
            request.install_dir,
        )),
        other => Err(anyhow!(
            "{} is not a native package format",
            other.as_str()
        )),
    }
}

/// Options passed to msiexec; INSTALLDIR keeps its own quoting because
/// msiexec parses the raw command line.
pub fn msi_install_options(install_dir: &Path) -> String {
    format!(
        "LAUNCHSPLUNK=0 INSTALL_SHORTCUT=0 AGREETOLICENSE=Yes INSTALLDIR=\"{}\"",
        install_dir.display()
    )
}

pub(crate) fn build_msi_install_command(artifact: &Path, install_dir: &Path) -> Command {
    let mut command = Command::new("msiexec");
    command.arg("/i").arg(artifact).arg("/qn");

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        command.raw_arg(msi_install_options(install_dir));
    }
    #[cfg(not(windows))]
    {
        command.arg(msi_install_options(install_dir));
    }
    command
}

pub(crate) fn build_group_add_command(group: &str) -> Command {
    let mut command = Command::new("groupadd");
    command.arg("-f").arg(group);
    command
}

pub(crate) fn build_group_append_command(group: &str, member: &str) -> Command {
    let mut command = Command::new("usermod");
    command.arg("-a").arg("-G").arg(group).arg(member);
    command
}

pub(crate) fn build_chown_command(path: &Path, user: &str, group: &str) -> Command {
    let mut command = Command::new("chown");
    command.arg("-R").arg(format!("{user}:{group}")).arg(path);
    command
}

pub(crate) fn build_extract_command(
    archive: &Path,
    format: PackageFormat,
    destination: &Path,
) -> Result<Command> {
    let command = match format {
        PackageFormat::TarGz => {
            let mut command = Command::new("tar");
            command.arg("-xzf").arg(archive).arg("-C").arg(destination);
            command
        }
        PackageFormat::Zip if cfg!(windows) => {
            let mut command = Command::new("powershell");
            command.arg("-NoProfile").arg("-Command").arg(format!(
                "Expand-Archive -LiteralPath {} -DestinationPath {} -Force",
                ps_literal(archive),
                ps_literal(destination)
            ));
            command
        }
        PackageFormat::Zip => {
            let mut command = Command::new("unzip");
            command.arg("-q").arg("-o").arg(archive).arg("-d").arg(destination);
            command
        }
        other => {
            return Err(anyhow!(
                "{} artifacts cannot be extracted: {}",
                other.as_str(),
                archive.display()
            ))
        }
    };
    Ok(command)
}

/// Runs `command` to completion; a non-zero exit carries its stderr, or its
/// stdout when stderr is empty.
pub(crate) fn run_command(command: &mut Command, action: &str) -> Result<()> {
    let program = command.get_program().to_string_lossy().into_owned();
    let output = command
        .output()
        .with_context(|| format!("{action}: could not start {program}"))?;
    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let detail = if stderr.trim().is_empty() {
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    } else {
        stderr.trim().to_string()
    };
    Err(anyhow!("{action}: {program} exited with {}: {detail}", output.status))
}

/// Single-quoted PowerShell literal for `path`.
fn ps_literal(path: &Path) -> String {
    format!("'{}'", path.display().to_string().replace('\'', "''"))
}
