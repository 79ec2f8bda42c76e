//! Rendering and installing the generated executables.
//!
//! Each mocked command becomes a small POSIX `sh` script. The normalized
//! table is written twice: once as a JSON comment for whoever inspects a
//! preserved temp dir, and once as single-quoted shell literals that drive
//! the dispatch. The scripts depend on nothing but `/bin/sh` and `printf`.
//!
//! Output text is passed to `printf` as its format, escaped so that it prints
//! verbatim. NUL bytes, which no shell variable can hold, travel as `\000`.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;

use crate::behavior::{NormalizedBehavior, Reaction};
use crate::error::{MockError, Result};

/// Fixed part of every script: print the non-empty streams, then exit.
const REPLY_FN: &str = r#"reply() {
    if [ -n "$1" ]; then
        printf "$1\n"
    fi
    if [ -n "$2" ]; then
        printf "$2\n" >&2
    fi
    exit "$3"
}
"#;

/// Quote `s` for a POSIX shell. Inside single quotes nothing is special
/// except the quote itself, which is closed, escaped and reopened.
pub fn shell_quote(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('\'');
    for c in s.chars() {
        if c == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(c);
        }
    }
    quoted.push('\'');
    quoted
}

/// Escape `s` for use as a `printf` format that prints `s` unchanged.
///
/// Octal escapes always carry three digits so a following digit is not
/// swallowed into them. A leading `-` is escaped too, or `printf` would take
/// it for an option.
fn printf_escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for (i, c) in s.chars().enumerate() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '%' => escaped.push_str("%%"),
            '\0' => escaped.push_str("\\000"),
            '-' if i == 0 => escaped.push_str("\\055"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Exit statuses are 8 bits wide; wrap the configured code the way the
/// kernel would.
fn exit_status(code: i32) -> i32 {
    code.rem_euclid(256)
}

fn reply_line(reaction: &Reaction) -> String {
    format!(
        "reply {} {} {}",
        shell_quote(&printf_escape(&reaction.stdout)),
        shell_quote(&printf_escape(&reaction.stderr)),
        exit_status(reaction.returncode)
    )
}

/// Test for an exact argument list. Each comparison is prefixed with `x` so
/// arguments such as `-n` or `(` are never read as `[` operators.
fn match_condition(args: &[String]) -> String {
    let mut cond = format!("[ \"$#\" -eq {} ]", args.len());
    for (i, arg) in args.iter().enumerate() {
        let _ = write!(
            cond,
            " && [ \"x${{{}}}\" = {} ]",
            i + 1,
            shell_quote(&format!("x{}", arg))
        );
    }
    cond
}

fn table_json(behavior: &NormalizedBehavior) -> serde_json::Value {
    let mut rules: Vec<serde_json::Value> = behavior
        .exact()
        .map(|(args, r)| {
            json!({
                "args": args,
                "stdout": r.stdout,
                "stderr": r.stderr,
                "returncode": r.returncode,
            })
        })
        .collect();
    let w = behavior.wildcard();
    rules.push(json!({
        "args": null,
        "stdout": w.stdout,
        "stderr": w.stderr,
        "returncode": w.returncode,
    }));
    serde_json::Value::Array(rules)
}

/// Render the script for `command`.
pub fn render_script(command: &str, behavior: &NormalizedBehavior) -> String {
    let mut script = String::from("#!/bin/sh\n");
    let _ = writeln!(script, "# Mocked command {:?} generated by shmock.", command);
    let _ = writeln!(script, "# Behavior table (\"args\": null is the fallback):");
    let _ = writeln!(script, "# {}", table_json(behavior));
    script.push('\n');
    script.push_str(REPLY_FN);
    script.push('\n');

    for (args, reaction) in behavior.exact() {
        let _ = writeln!(script, "if {}; then", match_condition(args));
        let _ = writeln!(script, "    {}", reply_line(reaction));
        script.push_str("fi\n");
    }
    let _ = writeln!(script, "{}", reply_line(behavior.wildcard()));
    script
}

/// Reject names that cannot be a plain file inside the mock directory.
pub fn validate_command_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\0')
    {
        return Err(MockError::InvalidCommandName(name.to_string()));
    }
    Ok(())
}

/// Write the script for `command` into `dir` and make it executable by its
/// owner. Returns the script path.
pub fn install_script(dir: &Path, command: &str, behavior: &NormalizedBehavior) -> Result<PathBuf> {
    validate_command_name(command)?;
    // argv strings end at the first NUL, so such a key could never be matched.
    let unmatchable = behavior
        .exact()
        .map(|(args, _)| args)
        .find(|args| args.iter().any(|a| a.contains('\0')));
    if let Some(args) = unmatchable {
        return Err(MockError::UnmatchableArguments {
            command: command.to_string(),
            args: args.to_vec(),
        });
    }
    let path = dir.join(command);
    fs::write(&path, render_script(command, behavior)).map_err(|source| {
        MockError::WriteScript {
            path: path.clone(),
            source,
        }
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o700)).map_err(|source| {
            MockError::Permissions {
                path: path.clone(),
                source,
            }
        })?;
    }

    tracing::debug!(
        "installed mock `{}` ({} exact keys) at {}",
        command,
        behavior.len() - 1,
        path.display()
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::{normalize_behavior, BehaviorSpec, PartialReaction};
    use std::process::Command;
    use tempfile::tempdir;

    #[test]
    fn quote_handles_single_quotes() {
        assert_eq!(shell_quote("plain"), "'plain'");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
    }

    #[test]
    fn printf_escape_neutralizes_format_syntax() {
        assert_eq!(printf_escape("plain text"), "plain text");
        assert_eq!(printf_escape("50% \\n"), "50%% \\\\n");
        assert_eq!(printf_escape("a\0b\01"), "a\\000b\\0001");
        assert_eq!(printf_escape("-n x-y"), "\\055n x-y");
    }

    #[test]
    fn exit_status_wraps_like_the_kernel() {
        assert_eq!(exit_status(42), 42);
        assert_eq!(exit_status(256), 0);
        assert_eq!(exit_status(-1), 255);
    }

    #[test]
    fn rendered_script_has_one_branch_per_exact_key() {
        let behavior = normalize_behavior(
            &BehaviorSpec::table()
                .when("param1", "foo")
                .when(["param2", "y"], "bar"),
        );
        let script = render_script("foo", &behavior);
        assert!(script.starts_with("#!/bin/sh\n"));
        assert_eq!(script.matches("\nif ").count(), 2);
        assert!(script.contains(r#"if [ "$#" -eq 1 ] && [ "x${1}" = 'xparam1' ]; then"#));
        assert!(script.contains(
            r#"if [ "$#" -eq 2 ] && [ "x${1}" = 'xparam2' ] && [ "x${2}" = 'xy' ]; then"#
        ));
        assert!(script.trim_end().ends_with(
            "reply 'These parameters are not mocked!' 'These parameters are not mocked!' 1"
        ));
    }

    #[test]
    fn json_header_describes_the_table() {
        let behavior = normalize_behavior(&BehaviorSpec::table().when((), "no args"));
        let script = render_script("foo", &behavior);
        let header = script
            .lines()
            .nth(3)
            .and_then(|l| l.strip_prefix("# "))
            .expect("json header line");
        let value: serde_json::Value = serde_json::from_str(header).expect("valid json");
        assert_eq!(value[0]["args"], json!([]));
        assert_eq!(value[0]["stdout"], "no args");
        assert_eq!(value[1]["args"], serde_json::Value::Null);
        assert_eq!(value[1]["returncode"], 1);
    }

    #[test]
    fn rejects_names_outside_the_directory() {
        for bad in ["", ".", "..", "a/b", "/bin/ls", "nul\0"] {
            assert!(
                matches!(validate_command_name(bad), Err(MockError::InvalidCommandName(_))),
                "{:?} should be rejected",
                bad
            );
        }
        validate_command_name("git-lfs").expect("plain name is fine");
    }

    #[cfg(unix)]
    #[test]
    fn installed_script_is_owner_executable() {
        use std::os::unix::fs::PermissionsExt;
        let td = tempdir().unwrap();
        let behavior = normalize_behavior(&"hi".into());
        let path = install_script(td.path(), "hello", &behavior).unwrap();
        assert_eq!(path, td.path().join("hello"));
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[cfg(unix)]
    #[test]
    fn output_bytes_are_reproduced_verbatim() {
        let behavior = normalize_behavior(
            &BehaviorSpec::table()
                .when(
                    "nul",
                    PartialReaction::new()
                        .stdout("a\0b\01")
                        .stderr("-n 100% \\t done"),
                )
                .otherwise("%s\\c %d"),
        );
        let td = tempdir().unwrap();
        let path = install_script(td.path(), "bytes", &behavior).unwrap();

        let out = Command::new(&path).arg("nul").output().unwrap();
        assert_eq!(out.stdout, b"a\0b\x001\n");
        assert_eq!(out.stderr, b"-n 100% \\t done\n");
        assert_eq!(out.status.code(), Some(0));

        let out = Command::new(&path).output().unwrap();
        assert_eq!(out.stdout, b"%s\\c %d\n");
    }

    #[test]
    fn nul_in_argument_key_is_rejected() {
        let behavior = normalize_behavior(&BehaviorSpec::table().when(["ok", "a\0b"], "never"));
        let td = tempdir().unwrap();
        let err = install_script(td.path(), "nulkey", &behavior).unwrap_err();
        match err {
            MockError::UnmatchableArguments { command, args } => {
                assert_eq!(command, "nulkey");
                assert_eq!(args, vec!["ok".to_string(), "a\0b".to_string()]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!td.path().join("nulkey").exists());
    }

    #[cfg(unix)]
    #[test]
    fn awkward_arguments_match_exactly() {
        let awkward = vec![
            "it's".to_string(),
            "two words".to_string(),
            "$HOME".to_string(),
            "-n".to_string(),
            "(".to_string(),
            "line\nbreak".to_string(),
            "".to_string(),
        ];
        let many: Vec<String> = (1..=11).map(|i| i.to_string()).collect();
        let behavior = normalize_behavior(
            &BehaviorSpec::table()
                .when(awkward.clone(), PartialReaction::new().stdout("a'b $x").returncode(3))
                .when(many.clone(), "eleven"),
        );
        let td = tempdir().unwrap();
        let path = install_script(td.path(), "odd", &behavior).unwrap();

        let out = Command::new(&path).args(&awkward).output().unwrap();
        assert_eq!(String::from_utf8_lossy(&out.stdout), "a'b $x\n");
        assert_eq!(out.status.code(), Some(3));

        let out = Command::new(&path).args(&many).output().unwrap();
        assert_eq!(String::from_utf8_lossy(&out.stdout), "eleven\n");

        // The eleventh argument must take part in the comparison.
        let mut near_miss = many.clone();
        near_miss[10] = "1".into();
        let out = Command::new(&path).args(&near_miss).output().unwrap();
        assert_eq!(out.status.code(), Some(1));
    }
}
