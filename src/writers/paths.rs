use std::path::{Path, PathBuf};

/// Inserts `_<tag>` before the first `.` of the file name, or appends it when there is none.
/// `out/run.scaff.txt` with tag `best` becomes `out/run_best.scaff.txt`.
pub fn postfix_path(path: &Path, tag: &str) -> PathBuf {
    let file_name: String = match path.file_name() {
        Some(f) => f.to_string_lossy().to_string(),
        None => return path.join(format!("_{tag}"))
    };
    let tagged: String = match file_name.split_once('.') {
        Some((stem, rest)) => format!("{stem}_{tag}.{rest}"),
        None => format!("{file_name}_{tag}")
    };
    path.with_file_name(tagged)
}

/// Appends `suffix` to an output prefix, `out/run` + `.scaff.txt` gives `out/run.scaff.txt`
pub fn prefixed_path(prefix: &Path, suffix: &str) -> PathBuf {
    let mut full = prefix.as_os_str().to_os_string();
    full.push(suffix);
    PathBuf::from(full)
}

/// Creates the parent directory of an output file if it is missing
/// # Errors
/// * if the directory cannot be created
pub fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postfix_path() {
        assert_eq!(postfix_path(Path::new("out/run.scaff.txt"), "best"), PathBuf::from("out/run_best.scaff.txt"));
        assert_eq!(postfix_path(Path::new("run"), "x"), PathBuf::from("run_x"));
        assert_eq!(postfix_path(Path::new("/tmp/a.b"), "1"), PathBuf::from("/tmp/a_1.b"));
    }

    #[test]
    fn test_prefixed_path() {
        assert_eq!(prefixed_path(Path::new("out/run"), ".opt.txt"), PathBuf::from("out/run.opt.txt"));
        assert_eq!(prefixed_path(Path::new("run.v1"), ".scaff.txt"), PathBuf::from("run.v1.scaff.txt"));
    }

    #[test]
    fn test_ensure_parent_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b").join("run.scaff.txt");
        ensure_parent_dir(&nested).unwrap();
        assert!(tmp.path().join("a").join("b").is_dir());
        ensure_parent_dir(Path::new("run.scaff.txt")).unwrap();
    }
}
