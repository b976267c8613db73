//! Installer run options

/// Where Composer should fetch packages from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InstallMethod {
    #[default]
    Dist,
    Source,
}

/// Composer output verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
    VeryVerbose,
    Debug,
}

/// Independent toggles for one installer run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOptions {
    /// Allow the lock file to change (`composer update`) instead of
    /// installing exactly what it records.
    pub update: bool,
    pub dry_run: bool,
    pub dev_mode: bool,
    pub install_method: InstallMethod,
    pub optimize_autoloader: bool,
    pub dump_autoloader: bool,
    pub prefer_stable: bool,
    pub prefer_lowest: bool,
    pub ignore_platform_requirements: bool,
    pub verbosity: Verbosity,
    /// Backup restored over the manifest unless the run succeeds.
    pub revert_file: Option<comp_fs::NormalizedPath>,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            update: false,
            dry_run: false,
            dev_mode: false,
            install_method: InstallMethod::Dist,
            optimize_autoloader: false,
            dump_autoloader: true,
            prefer_stable: true,
            prefer_lowest: false,
            ignore_platform_requirements: false,
            verbosity: Verbosity::Normal,
            revert_file: None,
        }
    }
}

impl InstallOptions {
    pub fn install() -> Self {
        Self::default()
    }

    pub fn update() -> Self {
        Self {
            update: true,
            ..Self::default()
        }
    }

    pub fn command(&self) -> &'static str {
        if self.update { "update" } else { "install" }
    }

    /// Composer command-line arguments, without the working directory.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![self.command().to_string(), "--no-interaction".to_string()];
        let mut flag = |on: bool, name: &str| {
            if on {
                args.push(name.to_string());
            }
        };

        flag(self.dry_run, "--dry-run");
        flag(!self.dev_mode, "--no-dev");
        flag(self.install_method == InstallMethod::Dist, "--prefer-dist");
        flag(self.install_method == InstallMethod::Source, "--prefer-source");
        flag(self.optimize_autoloader, "--optimize-autoloader");
        flag(!self.dump_autoloader, "--no-autoloader");
        flag(self.update && self.prefer_stable, "--prefer-stable");
        flag(self.update && self.prefer_lowest, "--prefer-lowest");
        flag(self.ignore_platform_requirements, "--ignore-platform-reqs");

        match self.verbosity {
            Verbosity::Quiet => args.push("--quiet".to_string()),
            Verbosity::Normal => {}
            Verbosity::Verbose => args.push("-v".to_string()),
            Verbosity::VeryVerbose => args.push("-vv".to_string()),
            Verbosity::Debug => args.push("-vvv".to_string()),
        }
        args
    }
}
