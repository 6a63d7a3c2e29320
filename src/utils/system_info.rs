use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingSystem {
    Windows,
    Linux,
    Osx,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Architecture {
    X86,
    X64,
    Arm,
    Aarch64,
    Unknown,
}

impl OperatingSystem {
    /// Name used by Mojang rule objects and natives classifiers.
    pub fn rule_name(&self) -> Option<&'static str> {
        match self {
            OperatingSystem::Windows => Some("windows"),
            OperatingSystem::Linux => Some("linux"),
            OperatingSystem::Osx => Some("osx"),
            OperatingSystem::Unknown => None,
        }
    }

    pub fn classpath_separator(&self) -> &'static str {
        match self {
            OperatingSystem::Windows => ";",
            _ => ":",
        }
    }
}

impl Architecture {
    pub fn rule_name(&self) -> Option<&'static str> {
        match self {
            Architecture::X86 => Some("x86"),
            Architecture::X64 => Some("x64"),
            Architecture::Arm => Some("arm"),
            Architecture::Aarch64 => Some("aarch64"),
            Architecture::Unknown => None,
        }
    }

    /// Value substituted into `${arch}` in natives classifiers.
    pub fn bits(&self) -> &'static str {
        match self {
            Architecture::X86 | Architecture::Arm => "32",
            _ => "64",
        }
    }
}

pub const OS: OperatingSystem = if cfg!(target_os = "windows") {
    OperatingSystem::Windows
} else if cfg!(target_os = "macos") {
    OperatingSystem::Osx
} else if cfg!(target_os = "linux") {
    OperatingSystem::Linux
} else {
    OperatingSystem::Unknown
};

pub const ARCHITECTURE: Architecture = if cfg!(target_arch = "x86") {
    Architecture::X86
} else if cfg!(target_arch = "x86_64") {
    Architecture::X64
} else if cfg!(target_arch = "arm") {
    Architecture::Arm
} else if cfg!(target_arch = "aarch64") {
    Architecture::Aarch64
} else {
    Architecture::Unknown
};

#[derive(Debug, Serialize, Clone)]
pub struct SystemInfo {
    pub os: String,
    pub arch: String,
    pub total_memory_mb: u64,
    pub cpu_count: usize,
}

pub fn collect_system_info() -> SystemInfo {
    let mut sys = sysinfo::System::new();
    sys.refresh_memory();
    sys.refresh_cpu_all();
    SystemInfo {
        os: OS.rule_name().unwrap_or("unknown").to_string(),
        arch: ARCHITECTURE.rule_name().unwrap_or("unknown").to_string(),
        total_memory_mb: sys.total_memory() / (1024 * 1024),
        cpu_count: sys.cpus().len(),
    }
}
