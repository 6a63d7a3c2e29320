use crate::error::{AppError, Result};
use crate::state::state_manager::State;
use crate::utils::path_utils;
use chrono::Utc;
use dashmap::DashMap;
use log::{error, info, warn};
use serde::Serialize;
use std::collections::VecDeque;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use sysinfo::{Pid, ProcessesToUpdate, Signal, System};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use uuid::Uuid;

const LOG_RING_CAPACITY: usize = 10_000;
const CRASH_TAIL_LINES: usize = 120;
const KILL_GRACE: Duration = Duration::from_secs(5);
const KILL_POLL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrashKind {
    Memory,
    JavaVersion,
    ModConflict,
    LoaderIssue,
    Unknown,
}

impl CrashKind {
    pub fn summary(&self) -> &'static str {
        match self {
            CrashKind::Memory => "Ran out of memory",
            CrashKind::JavaVersion => "Java version mismatch",
            CrashKind::ModConflict => "Incompatible mods",
            CrashKind::LoaderIssue => "Mod loader failure",
            CrashKind::Unknown => "Unknown crash",
        }
    }
}

/// Inspects the log tail rule by rule over the whole tail; `Unknown` only
/// when no rule matched.
pub fn classify_crash<S: AsRef<str>>(tail: &[S]) -> CrashKind {
    let any = |needle: &str| tail.iter().any(|line| line.as_ref().contains(needle));

    if any("OutOfMemoryError") {
        return CrashKind::Memory;
    }
    if any("java.lang.UnsupportedClassVersionError")
        || any("has been compiled by a more recent version")
    {
        return CrashKind::JavaVersion;
    }
    if any("Incompatible mods found") {
        return CrashKind::ModConflict;
    }
    if any("net.fabricmc.loader") || any("org.quiltmc.loader") {
        return CrashKind::LoaderIssue;
    }
    CrashKind::Unknown
}

#[derive(Debug, Serialize, Clone)]
pub struct CrashLogEntry {
    pub file_name: String,
    pub content: String,
}

struct ProcessInfo {
    pid: u32,
    kill_requested: Arc<AtomicBool>,
}

/// Tracks running game children. The map is the only shared mutable state:
/// the launcher inserts on spawn, the monitor removes on exit, kill looks
/// up. Nothing else reads it.
pub struct ProcessManager {
    processes: DashMap<Uuid, ProcessInfo>,
}

impl ProcessManager {
    pub fn new() -> Self {
        Self {
            processes: DashMap::new(),
        }
    }

    pub fn is_running(&self, instance_id: Uuid) -> bool {
        self.processes.contains_key(&instance_id)
    }

    /// Spawns the game process with `cwd` set to the instance's `.minecraft`
    /// and wires the supervision tasks: a line reader per output stream
    /// feeding `instance-log` events, the per-launch log file and the crash
    /// ring, plus a monitor that settles the instance state on exit.
    pub async fn spawn(
        &self,
        instance_id: Uuid,
        java_path: &str,
        args: Vec<String>,
        game_dir: std::path::PathBuf,
    ) -> Result<u32> {
        fs::create_dir_all(&game_dir).await?;
        fs::create_dir_all(path_utils::instance_logs_dir(instance_id)).await?;

        // Truncated on every launch; only the latest run is kept.
        let log_file = fs::File::create(path_utils::last_launch_log_path(instance_id)).await?;
        let log_file = Arc::new(Mutex::new(log_file));
        let ring: Arc<Mutex<VecDeque<String>>> =
            Arc::new(Mutex::new(VecDeque::with_capacity(LOG_RING_CAPACITY)));

        let mut child = tokio::process::Command::new(java_path)
            .args(&args)
            .current_dir(&game_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| AppError::ProcessSpawnFailed(e.to_string()))?;

        let pid = child
            .id()
            .ok_or_else(|| AppError::ProcessSpawnFailed("no pid after spawn".to_string()))?;

        let kill_requested = Arc::new(AtomicBool::new(false));
        self.processes.insert(
            instance_id,
            ProcessInfo {
                pid,
                kill_requested: Arc::clone(&kill_requested),
            },
        );
        info!("Spawned instance {} as pid {}", instance_id, pid);

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdout_task = stdout.map(|out| {
            tokio::spawn(stream_lines(
                out,
                instance_id,
                Arc::clone(&ring),
                Arc::clone(&log_file),
            ))
        });
        let stderr_task = stderr.map(|err| {
            tokio::spawn(stream_lines(
                err,
                instance_id,
                Arc::clone(&ring),
                Arc::clone(&log_file),
            ))
        });

        let start = Instant::now();
        tokio::spawn(async move {
            let exit_status = child.wait().await;

            // Let the readers drain whatever is left in the pipes.
            if let Some(task) = stdout_task {
                let _ = task.await;
            }
            if let Some(task) = stderr_task {
                let _ = task.await;
            }

            let exit_code = match exit_status {
                Ok(status) => status.code(),
                Err(e) => {
                    error!("wait() failed for instance {}: {}", instance_id, e);
                    None
                }
            };

            let killed = kill_requested.load(Ordering::SeqCst);
            let clean = exit_code == Some(0) || killed;
            let elapsed_secs = start.elapsed().as_secs();
            let playtime_minutes = (elapsed_secs + 30) / 60;

            info!(
                "Instance {} exited (code: {:?}, killed: {}, ran {}s)",
                instance_id, exit_code, killed, elapsed_secs
            );

            let state = match State::get().await {
                Ok(state) => state,
                Err(e) => {
                    error!("Monitor for {} lost launcher state: {}", instance_id, e);
                    return;
                }
            };

            state.process_manager.processes.remove(&instance_id);

            let crash_summary = if clean {
                None
            } else {
                let tail: Vec<String> = {
                    let ring = ring.lock().await;
                    let skip = ring.len().saturating_sub(CRASH_TAIL_LINES);
                    ring.iter().skip(skip).cloned().collect()
                };
                let kind = classify_crash(&tail);
                if let Err(e) =
                    write_crash_report(instance_id, exit_code, kind, &tail).await
                {
                    error!("Failed to write crash report for {}: {}", instance_id, e);
                }
                Some(kind.summary().to_string())
            };

            match state
                .instance_manager
                .mark_exited(instance_id, !clean, crash_summary, playtime_minutes)
                .await
            {
                Ok(updated) => state.event_state.emit_instance_state(&updated),
                Err(e) => error!(
                    "Failed to settle exit state for instance {}: {}",
                    instance_id, e
                ),
            }
        });

        Ok(pid)
    }

    /// TERM, up to five seconds of grace, then KILL. The monitor treats the
    /// exit as user-initiated, so the instance lands in `ready`.
    pub async fn kill(&self, instance_id: Uuid) -> Result<()> {
        let (pid, kill_requested) = {
            let info = self
                .processes
                .get(&instance_id)
                .ok_or(AppError::ProcessNotFound(instance_id))?;
            (info.pid, Arc::clone(&info.kill_requested))
        };

        kill_requested.store(true, Ordering::SeqCst);
        info!("Stopping instance {} (pid {})", instance_id, pid);

        let sys_pid = Pid::from(pid as usize);
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[sys_pid]), false);

        let Some(process) = sys.process(sys_pid) else {
            warn!("Pid {} already gone before kill", pid);
            return Ok(());
        };
        if process.kill_with(Signal::Term).is_none() {
            // Platform without TERM (Windows); fall through to the hard kill.
            process.kill();
        }

        let deadline = Instant::now() + KILL_GRACE;
        while Instant::now() < deadline {
            tokio::time::sleep(KILL_POLL).await;
            sys.refresh_processes(ProcessesToUpdate::Some(&[sys_pid]), false);
            if sys.process(sys_pid).is_none() {
                return Ok(());
            }
        }

        warn!("Pid {} survived the grace period, sending KILL", pid);
        sys.refresh_processes(ProcessesToUpdate::Some(&[sys_pid]), false);
        if let Some(process) = sys.process(sys_pid) {
            process.kill();
        }
        Ok(())
    }

    pub async fn crash_logs(&self, instance_id: Uuid) -> Result<Vec<CrashLogEntry>> {
        let dir = path_utils::crashes_dir(instance_id);
        let mut entries = Vec::new();
        if !dir.exists() {
            return Ok(entries);
        }

        let mut read_dir = fs::read_dir(&dir).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.ends_with(".txt") {
                continue;
            }
            let bytes = fs::read(entry.path()).await?;
            entries.push(CrashLogEntry {
                file_name: name,
                content: String::from_utf8_lossy(&bytes).to_string(),
            });
        }

        entries.sort_by(|a, b| b.file_name.cmp(&a.file_name));
        Ok(entries)
    }

    pub async fn clear_logs(&self, instance_id: Uuid) -> Result<()> {
        for dir in [
            path_utils::instance_logs_dir(instance_id),
            path_utils::crashes_dir(instance_id),
        ] {
            if dir.exists() {
                fs::remove_dir_all(&dir).await?;
            }
        }
        info!("Cleared logs for instance {}", instance_id);
        Ok(())
    }
}

/// Streams one pipe line by line: lossy UTF-8, trimmed, into the ring, the
/// per-launch log file and an `instance-log` event each.
async fn stream_lines<R>(
    reader: R,
    instance_id: Uuid,
    ring: Arc<Mutex<VecDeque<String>>>,
    log_file: Arc<Mutex<fs::File>>,
) where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buffer = Vec::new();

    loop {
        buffer.clear();
        match reader.read_until(b'\n', &mut buffer).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buffer);
                let line = line.trim_end_matches(['\n', '\r']);
                if line.is_empty() {
                    continue;
                }

                {
                    let mut ring = ring.lock().await;
                    if ring.len() == LOG_RING_CAPACITY {
                        ring.pop_front();
                    }
                    ring.push_back(line.to_string());
                }

                {
                    let mut file = log_file.lock().await;
                    let _ = file.write_all(line.as_bytes()).await;
                    let _ = file.write_all(b"\n").await;
                }

                if let Ok(state) = State::get().await {
                    state.event_state.emit_instance_log(instance_id, line);
                }
            }
            Err(e) => {
                warn!("Log stream for {} ended with error: {}", instance_id, e);
                break;
            }
        }
    }
}

async fn write_crash_report(
    instance_id: Uuid,
    exit_code: Option<i32>,
    kind: CrashKind,
    tail: &[String],
) -> Result<()> {
    let dir = path_utils::crashes_dir(instance_id);
    fs::create_dir_all(&dir).await?;

    let path = dir.join(format!("{}.txt", Utc::now().timestamp()));
    let mut content = format!(
        "Instance {} crashed at {}\nExit code: {:?}\nClassification: {}\n\n--- last {} log lines ---\n",
        instance_id,
        Utc::now().to_rfc3339(),
        exit_code,
        kind.summary(),
        tail.len()
    );
    for line in tail {
        content.push_str(line);
        content.push('\n');
    }

    path_utils::atomic_write(&path, content.as_bytes()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_out_of_memory() {
        let tail = [
            "[Worker-Main-5/INFO]: Preparing spawn area",
            "java.lang.OutOfMemoryError: Java heap space",
            "\tat net.minecraft.client.Minecraft.run(Minecraft.java:630)",
        ];
        assert_eq!(classify_crash(&tail), CrashKind::Memory);
    }

    #[test]
    fn classifies_java_version_mismatch() {
        let by_exception = ["java.lang.UnsupportedClassVersionError: net/minecraft/client/main/Main"];
        assert_eq!(classify_crash(&by_exception), CrashKind::JavaVersion);

        let by_message =
            ["Main has been compiled by a more recent version of the Java Runtime (class file version 65.0)"];
        assert_eq!(classify_crash(&by_message), CrashKind::JavaVersion);
    }

    #[test]
    fn classifies_mod_conflict_before_loader_issue() {
        let tail = [
            "net.fabricmc.loader.impl.FormattedException: Mod resolution failed",
            "Incompatible mods found!",
        ];
        assert_eq!(classify_crash(&tail), CrashKind::ModConflict);
    }

    #[test]
    fn classifies_loader_stack_as_loader_issue() {
        let tail = [
            "Caused by: java.lang.RuntimeException: oops",
            "\tat net.fabricmc.loader.impl.launch.knot.Knot.launch(Knot.java:74)",
        ];
        assert_eq!(classify_crash(&tail), CrashKind::LoaderIssue);
    }

    #[test]
    fn unknown_only_when_no_rule_matches() {
        let tail = ["Exception in thread \"Render thread\" java.lang.NullPointerException"];
        assert_eq!(classify_crash(&tail), CrashKind::Unknown);
        assert_eq!(classify_crash::<&str>(&[]), CrashKind::Unknown);
    }

    #[test]
    fn memory_wins_over_later_rules() {
        let tail = [
            "java.lang.OutOfMemoryError: Metaspace",
            "\tat net.fabricmc.loader.impl.launch.knot.Knot.launch(Knot.java:74)",
        ];
        assert_eq!(classify_crash(&tail), CrashKind::Memory);
    }
}
