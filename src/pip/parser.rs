//! 输出解析函数

use super::types::PackageRecord;

/// freeze 格式中名称与版本之间的分隔符
pub const VERSION_SEPARATOR: &str = "==";

/// 清理终端输出中的 ANSI 转义序列和特殊字符
pub fn clean_terminal_output(input: &str) -> String {
    let mut result = String::new();
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\x1b' => {
                if chars.peek() == Some(&'[') {
                    chars.next();
                    while let Some(&next) = chars.peek() {
                        chars.next();
                        if next.is_ascii_alphabetic() {
                            break;
                        }
                    }
                }
            }
            c if c.is_control() && c != '\t' => {}
            _ => result.push(c),
        }
    }

    result
}

/// 解析 `pip list --format=freeze` 输出。
///
/// 每行在第一个 `==` 处截断，只保留包名；没有分隔符的行
/// （`-e ...` 可编辑安装、`name @ url`、注释、空行）直接丢弃。
pub fn parse_freeze_list(output: &str) -> Vec<PackageRecord> {
    output
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            match line.split_once(VERSION_SEPARATOR) {
                Some((name, _)) if !name.trim().is_empty() => Some(PackageRecord {
                    name: name.trim().to_string(),
                }),
                _ => {
                    if !line.is_empty() {
                        log::debug!("parse_freeze_list: 丢弃无法解析的行 {:?}", line);
                    }
                    None
                }
            }
        })
        .collect()
}

/// 检查用户输入的包名，返回去除首尾空白后的名称。
///
/// 以 `-` 开头的名称会被 pip 当作选项解析，直接拒绝。
pub fn validate_package_name(input: &str) -> Result<&str, String> {
    let name = input.trim();
    if name.is_empty() {
        return Err("包名不能为空".to_string());
    }
    if name.starts_with('-') {
        return Err(format!("无效的包名 '{}'：不能以 '-' 开头", name));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(format!("无效的包名 '{}'：不能包含空白字符", name));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(records: &[PackageRecord]) -> Vec<&str> {
        records.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn freeze_lines_keep_order_and_names() {
        let output = "requests==2.31.0\nurllib3==2.0.7\ncertifi==2023.7.22\n";
        let records = parse_freeze_list(output);
        assert_eq!(names(&records), ["requests", "urllib3", "certifi"]);
    }

    #[test]
    fn name_is_substring_before_first_separator() {
        let records = parse_freeze_list("odd==1.0==extra\n");
        assert_eq!(names(&records), ["odd"]);
    }

    #[test]
    fn malformed_lines_are_dropped() {
        let output = "\
requests==2.31.0
-e git+https://github.com/psf/black@abc#egg=black
# Editable install with no version control
mypkg @ file:///tmp/mypkg

==1.0
six==1.16.0
";
        let records = parse_freeze_list(output);
        assert_eq!(names(&records), ["requests", "six"]);
    }

    #[test]
    fn empty_output_yields_no_records() {
        assert!(parse_freeze_list("").is_empty());
    }

    #[test]
    fn clean_strips_ansi_and_control_chars() {
        assert_eq!(
            clean_terminal_output("\x1b[32mSuccessfully\x1b[0m installed\x07"),
            "Successfully installed"
        );
    }

    #[test]
    fn package_name_validation() {
        assert_eq!(validate_package_name("  requests "), Ok("requests"));
        assert_eq!(validate_package_name("numpy>=1.26"), Ok("numpy>=1.26"));
        assert!(validate_package_name("").is_err());
        assert!(validate_package_name("   ").is_err());
        assert!(validate_package_name("--index-url=http://x").is_err());
        assert!(validate_package_name("two words").is_err());
    }
}
