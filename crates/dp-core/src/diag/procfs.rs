//! Diagnostic commands served from /proc (Linux-only).
//!
//! Each command reads one view of `/proc/<pid>` and returns it as text.
//! Collection is modelled as draining objects handed over through
//! [`DiagnosticInterface::retire`] and, on glibc, returning freed heap pages
//! to the kernel.

use super::{CommandInfo, DiagnosticError, DiagnosticInterface, DiagnosticResult};
use std::any::Any;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::{debug, trace};

const COMMANDS: &[CommandInfo] = &[
    CommandInfo {
        name: "help",
        description: "List available diagnostic commands",
    },
    CommandInfo {
        name: "VM.status",
        description: "Process status summary (/proc/<pid>/status)",
    },
    CommandInfo {
        name: "VM.limits",
        description: "Resource limits (/proc/<pid>/limits)",
    },
    CommandInfo {
        name: "VM.maps",
        description: "Memory mappings (/proc/<pid>/maps)",
    },
    CommandInfo {
        name: "VM.smaps_rollup",
        description: "Aggregated memory usage (/proc/<pid>/smaps_rollup)",
    },
    CommandInfo {
        name: "VM.command_line",
        description: "Command line the process was started with",
    },
    CommandInfo {
        name: "VM.io",
        description: "I/O counters (/proc/<pid>/io)",
    },
    CommandInfo {
        name: "VM.fd",
        description: "Open file descriptors and their targets",
    },
    CommandInfo {
        name: "Thread.print",
        description: "Threads with their names and scheduler states",
    },
    CommandInfo {
        name: "GC.run",
        description: "Run a collection cycle",
    },
];

/// Diagnostic interface backed by `/proc/<pid>`.
pub struct ProcfsDiagnostics {
    root: PathBuf,
    retired: Mutex<Vec<Box<dyn Any + Send>>>,
    collections: AtomicU64,
}

impl ProcfsDiagnostics {
    /// Interface for the current process. Fails if procfs is not mounted or
    /// not readable.
    pub fn for_self() -> io::Result<Self> {
        Self::at(PathBuf::from("/proc/self"))
    }

    /// Interface for another process.
    pub fn for_pid(pid: u32) -> io::Result<Self> {
        Self::at(PathBuf::from(format!("/proc/{pid}")))
    }

    fn at(root: PathBuf) -> io::Result<Self> {
        fs::metadata(root.join("status"))?;
        Ok(Self {
            root,
            retired: Mutex::new(Vec::new()),
            collections: AtomicU64::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Completed collection cycles.
    pub fn collections(&self) -> u64 {
        self.collections.load(Ordering::Relaxed)
    }

    fn read(&self, command: &str, file: &str) -> DiagnosticResult {
        fs::read_to_string(self.root.join(file)).map_err(|source| DiagnosticError::Access {
            command: command.to_string(),
            source,
        })
    }

    fn command_line(&self, command: &str) -> DiagnosticResult {
        let raw = fs::read(self.root.join("cmdline")).map_err(|source| DiagnosticError::Access {
            command: command.to_string(),
            source,
        })?;
        let args: Vec<String> = raw
            .split(|b| *b == 0)
            .filter(|arg| !arg.is_empty())
            .map(|arg| String::from_utf8_lossy(arg).into_owned())
            .collect();
        Ok(format!("{}\n", args.join(" ")))
    }

    fn fd_listing(&self, command: &str) -> DiagnosticResult {
        let access = |source| DiagnosticError::Access {
            command: command.to_string(),
            source,
        };
        let mut fds: Vec<(u32, String)> = Vec::new();
        for entry in fs::read_dir(self.root.join("fd")).map_err(access)? {
            let entry = entry.map_err(access)?;
            let Some(fd) = entry.file_name().to_str().and_then(|s| s.parse().ok()) else {
                continue;
            };
            // The fd may close between read_dir and read_link.
            let target = fs::read_link(entry.path())
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "?".to_string());
            fds.push((fd, target));
        }
        fds.sort_unstable_by_key(|(fd, _)| *fd);

        let mut out = String::new();
        for (fd, target) in fds {
            let _ = writeln!(out, "fd {fd} -> {target}");
        }
        Ok(out)
    }

    fn thread_listing(&self, command: &str) -> DiagnosticResult {
        let access = |source| DiagnosticError::Access {
            command: command.to_string(),
            source,
        };
        let mut threads: Vec<(u32, String, char)> = Vec::new();
        for entry in fs::read_dir(self.root.join("task")).map_err(access)? {
            let entry = entry.map_err(access)?;
            let Some(tid) = entry.file_name().to_str().and_then(|s| s.parse().ok()) else {
                continue;
            };
            let task = entry.path();
            let comm = fs::read_to_string(task.join("comm"))
                .map(|s| s.trim_end().to_string())
                .unwrap_or_default();
            let state = fs::read_to_string(task.join("stat"))
                .ok()
                .and_then(|stat| stat_state(&stat))
                .unwrap_or('?');
            threads.push((tid, comm, state));
        }
        threads.sort_unstable_by_key(|(tid, _, _)| *tid);

        let mut out = String::new();
        let _ = writeln!(out, "{} thread(s)", threads.len());
        for (tid, comm, state) in threads {
            let _ = writeln!(out, "\"{comm}\" tid={tid} state={state}");
        }
        Ok(out)
    }

    fn help(&self) -> String {
        let mut out = String::new();
        for info in COMMANDS {
            let _ = writeln!(out, "{:<16} {}", info.name, info.description);
        }
        out
    }

    /// Drop every retired object and trim the heap. Returns how many objects
    /// were released.
    fn collect(&self) -> usize {
        let drained: Vec<Box<dyn Any + Send>> = {
            let mut retired = self
                .retired
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            std::mem::take(&mut *retired)
        };
        let released = drained.len();
        drop(drained);
        trim_heap();
        let cycle = self.collections.fetch_add(1, Ordering::Relaxed) + 1;
        trace!(cycle, released, "collection cycle complete");
        released
    }
}

/// Scheduler state from a `stat` line. The comm field may contain spaces and
/// parentheses, so parse from the last `)`.
fn stat_state(stat: &str) -> Option<char> {
    let rest = &stat[stat.rfind(')')? + 1..];
    rest.split_whitespace().next()?.chars().next()
}

#[cfg(target_env = "gnu")]
fn trim_heap() {
    // SAFETY: malloc_trim only releases free pages held by the allocator.
    unsafe {
        libc::malloc_trim(0);
    }
}

#[cfg(not(target_env = "gnu"))]
fn trim_heap() {}

impl DiagnosticInterface for ProcfsDiagnostics {
    fn invoke(&self, command: &str) -> DiagnosticResult {
        match command {
            "help" => Ok(self.help()),
            "VM.status" => self.read(command, "status"),
            "VM.limits" => self.read(command, "limits"),
            "VM.maps" => self.read(command, "maps"),
            "VM.smaps_rollup" => self.read(command, "smaps_rollup"),
            "VM.io" => self.read(command, "io"),
            "VM.command_line" => self.command_line(command),
            "VM.fd" => self.fd_listing(command),
            "Thread.print" => self.thread_listing(command),
            "GC.run" => {
                let released = self.collect();
                Ok(format!("Collection complete: {released} object(s) released\n"))
            }
            _ => Err(DiagnosticError::UnknownCommand {
                command: command.to_string(),
            }),
        }
    }

    fn commands(&self) -> Vec<CommandInfo> {
        COMMANDS.to_vec()
    }

    fn retire(&self, object: Box<dyn Any + Send>) {
        self.retired
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(object);
        debug!("object retired for collection");
    }

    fn request_collection(&self) {
        self.collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_stat_state_handles_parens_in_comm() {
        assert_eq!(stat_state("1234 (my (odd) proc) S 1 1234"), Some('S'));
        assert_eq!(stat_state("1 (init) R 0"), Some('R'));
        assert_eq!(stat_state("garbage"), None);
    }

    #[test]
    fn test_self_status_readable() {
        let procfs = ProcfsDiagnostics::for_self().expect("procfs available");
        let status = procfs.invoke("VM.status").unwrap();
        assert!(status.contains("Pid:"));
    }

    #[test]
    fn test_thread_print_lists_current_thread() {
        let procfs = ProcfsDiagnostics::for_self().unwrap();
        let listing = procfs.invoke("Thread.print").unwrap();
        assert!(listing.lines().next().unwrap().ends_with("thread(s)"));
        assert!(listing.contains("tid="));
    }

    #[test]
    fn test_command_line_is_single_line() {
        let procfs = ProcfsDiagnostics::for_self().unwrap();
        let cmdline = procfs.invoke("VM.command_line").unwrap();
        assert_eq!(cmdline.matches('\n').count(), 1);
    }

    #[test]
    fn test_unknown_command() {
        let procfs = ProcfsDiagnostics::for_self().unwrap();
        let err = procfs.invoke("VM.flags").unwrap_err();
        assert!(matches!(err, DiagnosticError::UnknownCommand { .. }));
    }

    #[test]
    fn test_help_lists_every_command() {
        let procfs = ProcfsDiagnostics::for_self().unwrap();
        let help = procfs.invoke("help").unwrap();
        for info in procfs.commands() {
            assert!(help.contains(info.name), "missing {}", info.name);
        }
    }

    #[test]
    fn test_for_pid_targets_that_process() {
        let pid = std::process::id();
        let procfs = ProcfsDiagnostics::for_pid(pid).unwrap();
        assert_eq!(procfs.root(), Path::new(&format!("/proc/{pid}")));
        let status = procfs.invoke("VM.status").unwrap();
        assert!(status.contains(&format!("Pid:\t{pid}")));
    }

    #[test]
    fn test_missing_pid_is_unavailable() {
        assert!(ProcfsDiagnostics::for_pid(u32::MAX).is_err());
    }

    #[test]
    fn test_collection_releases_retired_objects() {
        let procfs = ProcfsDiagnostics::for_self().unwrap();
        let sentinel = Arc::new(0u64);
        let observed = Arc::downgrade(&sentinel);
        procfs.retire(Box::new(sentinel));
        assert_eq!(observed.strong_count(), 1);

        let output = procfs.invoke("GC.run").unwrap();
        assert!(output.contains("1 object(s) released"));
        assert_eq!(observed.strong_count(), 0);
        assert_eq!(procfs.collections(), 1);
    }
}
