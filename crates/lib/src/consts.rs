/// Config file names looked up in the project root, in order.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["buildmatrix.yml", "buildmatrix.yaml", ".buildmatrix.yml"];

pub const DEFAULT_DIST: &str = "dist";

pub const DEFAULT_MAIN: &str = ".";

/// Binary name used when a build declares none. Every target gets its own file.
pub const DEFAULT_BINARY: &str = "{{.Binary}}_{{.Os}}_{{.Arch}}{{.Arm}}";

pub const DEFAULT_LDFLAGS: &str = "-s -w -X main.version={{.Version}} -X main.commit={{.Commit}} -X main.date={{.Date}}";

/// Toolchain executable invoked for every target.
pub const DEFAULT_TOOLCHAIN: &str = "go";

/// Name of the artifact list written into the dist directory.
pub const ARTIFACTS_FILE: &str = "artifacts.json";

/// Environment variables that supply version metadata.
pub const ENV_VERSION: &str = "BUILDMATRIX_VERSION";
pub const ENV_TAG: &str = "BUILDMATRIX_TAG";
pub const ENV_COMMIT: &str = "BUILDMATRIX_COMMIT";

/// Overrides the toolchain executable.
pub const ENV_TOOLCHAIN: &str = "BUILDMATRIX_GO";
