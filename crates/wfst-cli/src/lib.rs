// wfst-cli: shared utilities for the command-line tools.

use std::process;

/// Print an error message and exit with code 1.
pub fn fatal(msg: &str) -> ! {
    eprintln!("error: {msg}");
    process::exit(1);
}

/// Check if `--help` or `-h` is in the args.
pub fn wants_help(args: &[String]) -> bool {
    args.iter().any(|a| a == "--help" || a == "-h")
}

/// Split args into flags (`-`/`--` prefixed) and positional arguments.
pub fn split_flags(args: &[String]) -> (Vec<String>, Vec<String>) {
    let mut flags = Vec::new();
    let mut positional = Vec::new();
    for arg in args {
        if arg.starts_with('-') && arg.len() > 1 {
            flags.push(arg.clone());
        } else {
            positional.push(arg.clone());
        }
    }
    (flags, positional)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_detection() {
        let args = vec!["foo".to_string(), "-h".to_string()];
        assert!(wants_help(&args));
        assert!(!wants_help(&["foo".to_string()]));
    }

    #[test]
    fn flags_are_separated_from_positionals() {
        let args = vec![
            "--optimize".to_string(),
            "in.att".to_string(),
            "out.fst".to_string(),
        ];
        let (flags, positional) = split_flags(&args);
        assert_eq!(flags, vec!["--optimize".to_string()]);
        assert_eq!(positional, vec!["in.att".to_string(), "out.fst".to_string()]);
    }
}
