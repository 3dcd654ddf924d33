use std::path::{Path, PathBuf};

use crate::error::ConnectionError;

/// The two kinds of tool-provider script we know how to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerKind {
    Python,
    Node,
}

impl ServerKind {
    /// Classify a script by the literal suffix of its path. Dotfiles such
    /// as `tools/.py` count, since only the trailing text is checked.
    pub fn from_path(path: &Path) -> Option<Self> {
        let path = path.to_string_lossy();
        if path.ends_with(".py") {
            Some(ServerKind::Python)
        } else if path.ends_with(".js") {
            Some(ServerKind::Node)
        } else {
            None
        }
    }

    /// Fixed launcher command for this kind.
    pub fn launcher(self) -> &'static str {
        match self {
            ServerKind::Python => "python",
            ServerKind::Node => "node",
        }
    }
}

/// How to start a tool provider: program plus arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub kind: ServerKind,
    pub program: String,
    pub args: Vec<String>,
    pub script: PathBuf,
}

impl LaunchSpec {
    /// Validate the script suffix and map it to its launcher.
    ///
    /// Fails with `InvalidServerType` for anything but `.py` / `.js`.
    pub fn for_script(path: impl AsRef<Path>) -> Result<Self, ConnectionError> {
        let path = path.as_ref();
        let kind = ServerKind::from_path(path)
            .ok_or_else(|| ConnectionError::InvalidServerType(path.display().to_string()))?;
        Ok(Self {
            kind,
            program: kind.launcher().to_string(),
            args: vec![path.display().to_string()],
            script: path.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_python_script() {
        let spec = LaunchSpec::for_script("servers/weather.py").unwrap();
        assert_eq!(spec.kind, ServerKind::Python);
        assert_eq!(spec.program, "python");
        assert_eq!(spec.args, vec!["servers/weather.py".to_string()]);
    }

    #[test]
    fn test_node_script() {
        let spec = LaunchSpec::for_script("/opt/tools/index.js").unwrap();
        assert_eq!(spec.kind, ServerKind::Node);
        assert_eq!(spec.program, "node");
        assert_eq!(spec.script, PathBuf::from("/opt/tools/index.js"));
    }

    #[test]
    fn test_unrecognized_suffixes() {
        for bad in ["server.rb", "server", "server.py.bak", "server.ts", "PY"] {
            let err = LaunchSpec::for_script(bad).unwrap_err();
            assert!(
                matches!(err, ConnectionError::InvalidServerType(ref p) if p == bad),
                "{bad} should be rejected, got {err:?}"
            );
        }
    }

    #[test]
    fn test_dotfile_scripts_match_on_suffix() {
        assert_eq!(ServerKind::from_path(Path::new("tools/.py")), Some(ServerKind::Python));
        let spec = LaunchSpec::for_script(".js").unwrap();
        assert_eq!(spec.program, "node");
    }

    #[test]
    fn test_suffix_is_case_sensitive() {
        assert!(ServerKind::from_path(Path::new("server.PY")).is_none());
    }
}
