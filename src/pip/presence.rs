//! 安装前的存在性检查
//!
//! `pip search` 在 PyPI 关闭 XML-RPC 接口后已无法使用，因此检查方式做成可配置：
//! 退出码是主要判断依据，文本标记只作为补充。

use super::types::CommandOutput;
use serde::{Deserialize, Serialize};

/// `pip search` 失败时的输出标记
pub const SEARCH_ERROR_MARKER: &str = "ERROR";
/// `pip search` 无结果时的输出标记
pub const SEARCH_NO_MATCH_MARKER: &str = "No match found";
/// `pip show` 找不到包时的输出标记
pub const SHOW_NOT_FOUND_MARKER: &str = "WARNING: Package(s) not found";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PresenceCheck {
    /// `pip index versions <name>`
    #[default]
    Index,
    /// `pip install --dry-run --no-deps <name>`
    DryRun,
    /// 旧版 `pip search <name>`
    Search,
    /// 不检查，直接安装
    Skip,
}

impl PresenceCheck {
    /// 检查命令的参数；`Skip` 返回 None
    pub fn args<'a>(&self, name: &'a str) -> Option<Vec<&'a str>> {
        match self {
            PresenceCheck::Index => Some(vec!["index", "versions", name]),
            PresenceCheck::DryRun => Some(vec!["install", "--dry-run", "--no-deps", name]),
            PresenceCheck::Search => Some(vec!["search", name]),
            PresenceCheck::Skip => None,
        }
    }

    /// 根据检查命令的输出判断包是否存在于索引中
    pub fn is_available(&self, output: &CommandOutput) -> bool {
        if !output.success() {
            return false;
        }
        match self {
            PresenceCheck::Search => {
                !output.stdout.contains(SEARCH_ERROR_MARKER)
                    && !output.stdout.contains(SEARCH_NO_MATCH_MARKER)
            }
            _ => true,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PresenceCheck::Index => "index",
            PresenceCheck::DryRun => "dry-run",
            PresenceCheck::Search => "search",
            PresenceCheck::Skip => "skip",
        }
    }
}

/// 根据 `pip show <name>` 的输出判断包是否已安装
pub fn is_installed(output: &CommandOutput) -> bool {
    output.success()
        && !output.stdout.trim().is_empty()
        && !output.stdout.contains(SHOW_NOT_FOUND_MARKER)
        && !output.stderr.contains(SHOW_NOT_FOUND_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(stdout: &str, stderr: &str, code: i32) -> CommandOutput {
        CommandOutput {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            code: Some(code),
        }
    }

    #[test]
    fn markers_are_pinned() {
        assert_eq!(SEARCH_ERROR_MARKER, "ERROR");
        assert_eq!(SEARCH_NO_MATCH_MARKER, "No match found");
        assert_eq!(SHOW_NOT_FOUND_MARKER, "WARNING: Package(s) not found");
    }

    #[test]
    fn check_arguments() {
        assert_eq!(
            PresenceCheck::Index.args("requests"),
            Some(vec!["index", "versions", "requests"])
        );
        assert_eq!(
            PresenceCheck::DryRun.args("requests"),
            Some(vec!["install", "--dry-run", "--no-deps", "requests"])
        );
        assert_eq!(PresenceCheck::Search.args("requests"), Some(vec!["search", "requests"]));
        assert_eq!(PresenceCheck::Skip.args("requests"), None);
    }

    #[test]
    fn exit_code_decides_for_index_and_dry_run() {
        let found = output("requests (2.31.0)\nAvailable versions: 2.31.0", "", 0);
        let missing = output("", "ERROR: No matching distribution found for nope", 1);
        for check in [PresenceCheck::Index, PresenceCheck::DryRun] {
            assert!(check.is_available(&found));
            assert!(!check.is_available(&missing));
        }
    }

    #[test]
    fn search_falls_back_to_markers() {
        let check = PresenceCheck::Search;
        assert!(check.is_available(&output("requests (2.31.0) - HTTP for Humans.", "", 0)));
        assert!(!check.is_available(&output("No match found", "", 0)));
        assert!(!check.is_available(&output("ERROR: XMLRPC request failed", "", 0)));
        assert!(!check.is_available(&output("requests (2.31.0)", "", 23)));
    }

    #[test]
    fn installed_requires_zero_exit_and_content() {
        assert!(is_installed(&output("Name: six\nVersion: 1.16.0\n", "", 0)));
        assert!(!is_installed(&output("", "", 0)));
        assert!(!is_installed(&output("   \n", "", 0)));
        assert!(!is_installed(&output("", "WARNING: Package(s) not found: six", 1)));
        assert!(!is_installed(&output("", "WARNING: Package(s) not found: six", 0)));
    }

    #[test]
    fn default_check_is_index() {
        assert_eq!(PresenceCheck::default(), PresenceCheck::Index);
    }
}
