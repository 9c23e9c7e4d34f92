use sysinfo::System;
use tracing::{debug, warn};

use crate::error::InstanceError;
use crate::Result;

/// Finds a process other than `own_pid` running under `own_name`.
///
/// ### Arguments
/// - `processes` - `(pid, name)` pairs of the process table
/// - `own_pid` - the pid of the current process
/// - `own_name` - the process name of the current process
pub fn find_other_instance<'a>(
    processes: impl IntoIterator<Item = (u32, &'a str)>,
    own_pid: u32,
    own_name: &str,
) -> Option<u32> {
    processes
        .into_iter()
        .find(|(pid, name)| *pid != own_pid && *name == own_name)
        .map(|(pid, _)| pid)
}

/// Fails if another process with the same name as the current one is running.
///
/// A process table that cannot be read is logged and does not stop the applet.
pub fn ensure_single_instance() -> Result<()> {
    admit_instance(lookup_other_instance())
}

fn admit_instance(lookup: std::result::Result<Option<u32>, InstanceError>) -> Result<()> {
    match lookup {
        Ok(Some(pid)) => Err(InstanceError::AlreadyRunning { pid }.into()),
        Ok(None) => Ok(()),
        Err(e) => {
            warn!("Skipping the single instance check: {e}");
            Ok(())
        }
    }
}

fn lookup_other_instance() -> std::result::Result<Option<u32>, InstanceError> {
    let own_pid = sysinfo::get_current_pid().map_err(|e| InstanceError::LookupFailed {
        reason: e.to_string(),
    })?;

    let mut system = System::new();
    system.refresh_processes();

    let own_name = system
        .process(own_pid)
        .map(|process| process.name().to_string())
        .ok_or_else(|| InstanceError::LookupFailed {
            reason: format!("process {own_pid} not found in the process table"),
        })?;

    debug!("Checking for other '{own_name}' processes");

    // Threads of this process are listed as tasks whose parent is this process.
    let processes = system
        .processes()
        .iter()
        .filter(|(_, process)| process.parent() != Some(own_pid))
        .map(|(pid, process)| (pid.as_u32(), process.name()));

    Ok(find_other_instance(processes, own_pid.as_u32(), &own_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppletError;
    use tracing_test::traced_test;

    #[test]
    fn ignores_own_process() {
        let processes = [(1, "systemd"), (42, "protontray"), (77, "bash")];
        assert_eq!(find_other_instance(processes, 42, "protontray"), None);
    }

    #[test]
    fn finds_other_process_with_same_name() {
        let processes = [(1, "systemd"), (42, "protontray"), (99, "protontray")];
        assert_eq!(find_other_instance(processes, 42, "protontray"), Some(99));
    }

    #[test]
    fn other_instance_is_refused() {
        let result = admit_instance(Ok(Some(99)));
        assert!(matches!(
            result,
            Err(AppletError::Instance(InstanceError::AlreadyRunning { pid: 99 }))
        ));
    }

    #[test]
    #[traced_test]
    fn unreadable_process_table_is_tolerated() {
        let result = admit_instance(Err(InstanceError::LookupFailed {
            reason: "permission denied".to_string(),
        }));

        assert!(result.is_ok());
        assert!(logs_contain("Skipping the single instance check"));
    }
}
