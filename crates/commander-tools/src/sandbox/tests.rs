//! Tests for the path sandbox

use super::*;
use std::path::PathBuf;

fn sandbox_for(dir: &Path) -> PathSandbox {
    PathSandbox::new([dir.to_path_buf()], dir, dir)
}

#[test]
fn test_normalize_for_comparison() {
    assert_eq!(normalize_for_comparison("C:\\Users\\Bob"), "c:/users/bob");
    assert_eq!(normalize_for_comparison("c:/users/bob/"), "c:/users/bob");
    assert_eq!(normalize_for_comparison("/home/u/./docs/../x"), "/home/u/x");
    assert_eq!(normalize_for_comparison("/home//u///"), "/home/u");
    assert_eq!(normalize_for_comparison("/../.."), "");
    assert_eq!(normalize_for_comparison("C:\\.."), "c:");
}

#[test]
fn test_lexical_normalize() {
    assert_eq!(
        lexical_normalize(Path::new("/home/u/./a/../b")),
        PathBuf::from("/home/u/b")
    );
    assert_eq!(lexical_normalize(Path::new("/../etc")), PathBuf::from("/etc"));
}

#[test]
fn test_outside_allow_list_denied() {
    let home = tempfile::tempdir().unwrap();
    let cwd = tempfile::tempdir().unwrap();
    let sandbox = PathSandbox::new(
        [cwd.path().to_path_buf(), home.path().to_path_buf()],
        home.path(),
        cwd.path(),
    );

    let err = sandbox.validate("/etc/passwd").unwrap_err();
    match err {
        Error::AccessDenied { path, allowed } => {
            assert_eq!(path, "/etc/passwd");
            assert_eq!(allowed.len(), 2);
        }
        other => panic!("expected AccessDenied, got {:?}", other),
    }
}

#[test]
fn test_tilde_expansion() {
    let sandbox = PathSandbox::new(["/home/u"], "/home/u", "/home/u");
    let resolved = sandbox.validate("~/docs/notes.txt").unwrap();
    assert_eq!(resolved, PathBuf::from("/home/u/docs/notes.txt"));

    assert_eq!(sandbox.validate("~").unwrap(), PathBuf::from("/home/u"));
}

#[test]
fn test_sibling_prefix_not_matched() {
    let sandbox = PathSandbox::new(["/home/user"], "/home/user", "/home/user");
    assert!(sandbox.validate("/home/userx/file").is_err());
    assert!(sandbox.validate("/home/user/file").is_ok());
    assert!(sandbox.validate("/home/user").is_ok());
}

#[test]
fn test_case_insensitive_match() {
    let sandbox = PathSandbox::new(["/Home/User"], "/Home/User", "/Home/User");
    assert!(sandbox.validate("/home/user/notes.txt").is_ok());
}

#[test]
fn test_relative_path_resolves_against_cwd() {
    let dir = tempfile::tempdir().unwrap();
    let sandbox = sandbox_for(dir.path());

    let resolved = sandbox.validate("sub/file.txt").unwrap();
    assert_eq!(resolved, dir.path().join("sub/file.txt"));

    // climbing out through .. is caught after normalisation
    assert!(sandbox.validate("../outside.txt").is_err());
    assert!(sandbox.validate("sub/../../outside.txt").is_err());
}

#[cfg(unix)]
#[test]
fn test_symlink_escape_denied() {
    let inside = tempfile::tempdir().unwrap();
    let outside = tempfile::tempdir().unwrap();
    let secret = outside.path().join("secret.txt");
    std::fs::write(&secret, "top secret").unwrap();

    let link = inside.path().join("innocent.txt");
    std::os::unix::fs::symlink(&secret, &link).unwrap();

    let sandbox = sandbox_for(inside.path());
    let err = sandbox.validate(link.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, Error::AccessDenied { .. }));
}

#[cfg(unix)]
#[test]
fn test_symlinked_directory_escape_denied() {
    let inside = tempfile::tempdir().unwrap();
    let outside = tempfile::tempdir().unwrap();
    std::fs::write(outside.path().join("data.txt"), "x").unwrap();

    let link = inside.path().join("linked");
    std::os::unix::fs::symlink(outside.path(), &link).unwrap();

    let sandbox = sandbox_for(inside.path());
    assert!(sandbox.validate(link.join("data.txt").to_str().unwrap()).is_err());
    // new files under the linked directory would land outside as well
    assert!(sandbox.validate(link.join("new.txt").to_str().unwrap()).is_err());
}

#[cfg(unix)]
#[test]
fn test_dangling_symlink_escape_denied() {
    let inside = tempfile::tempdir().unwrap();
    let link = inside.path().join("dangling");
    std::os::unix::fs::symlink("/nonexistent-commander-target/file", &link).unwrap();

    let sandbox = sandbox_for(inside.path());
    assert!(sandbox.validate(link.to_str().unwrap()).is_err());
}

#[cfg(unix)]
#[test]
fn test_symlink_inside_sandbox_allowed() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("real.txt");
    std::fs::write(&target, "ok").unwrap();
    let link = dir.path().join("alias.txt");
    std::os::unix::fs::symlink(&target, &link).unwrap();

    let sandbox = sandbox_for(dir.path());
    // the pre-resolution path is returned
    assert_eq!(sandbox.validate(link.to_str().unwrap()).unwrap(), link);
}

#[test]
fn test_from_whitelist_resolution() {
    let home = Path::new("/home/u");
    let cwd = Path::new("/work");
    let entries = vec![
        String::new(),
        "projects".to_string(),
        "/srv/data/".to_string(),
        "~/notes".to_string(),
    ];
    let sandbox = PathSandbox::from_whitelist(&entries, home, cwd);
    let dirs: Vec<PathBuf> = sandbox.allowed_directories().to_vec();

    assert_eq!(
        dirs,
        vec![
            PathBuf::from("/work"),
            PathBuf::from("/home/u"),
            PathBuf::from("/home/u/projects"),
            PathBuf::from("/srv/data"),
            PathBuf::from("/home/u/notes"),
        ]
    );
}

#[test]
fn test_from_whitelist_empty_allows_home() {
    let sandbox =
        PathSandbox::from_whitelist(&[], Path::new("/home/u"), Path::new("/work"));
    assert!(sandbox.validate("/home/u/a.txt").is_ok());
    assert!(sandbox.validate("/work/b.txt").is_ok());
    assert!(sandbox.validate("/etc/hosts").is_err());
}

#[test]
fn test_from_whitelist_drive_path() {
    let sandbox = PathSandbox::from_whitelist(
        &["D:\\Projects".to_string()],
        Path::new("/home/u"),
        Path::new("/work"),
    );
    let normalized: Vec<String> = sandbox
        .allowed_directories()
        .iter()
        .map(|d| normalize_for_comparison(&d.to_string_lossy()))
        .collect();
    assert!(normalized.contains(&"d:/projects".to_string()));
}
