//! End-to-end tests of the filesystem adapter over the contents API client

mod common;

use ::common::prelude::*;
use axum::http::{Method, StatusCode};

use crate::common::FakeApi;

async fn readdir(fs: &GitFs<GithubClient>, path: &str) -> Vec<String> {
    let mut names = Vec::new();
    fs.readdir(path, &mut |name: &str| names.push(name.to_string()))
        .await
        .unwrap();
    names
}

async fn read_to_end(fs: &GitFs<GithubClient>, path: &str) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = [0u8; 7];
    loop {
        let n = fs.read(path, &mut buf, out.len() as i64).await.unwrap();
        if n == 0 {
            return out;
        }
        out.extend_from_slice(&buf[..n]);
    }
}

#[tokio::test]
async fn test_browse_and_read() {
    let api = FakeApi::start().await;
    api.repo.insert("/README.md", b"# hello, filesystem");
    api.repo.insert("/src/lib.rs", b"pub fn answer() -> u32 { 42 }");
    let fs = GitFs::new(api.client());

    assert_eq!(readdir(&fs, "/").await, vec![".", "..", "README.md", "src"]);
    assert_eq!(readdir(&fs, "/src").await, vec![".", "..", "lib.rs"]);

    let attr = fs.getattr("/src/lib.rs").await.unwrap();
    assert_eq!(attr.size, 29);
    assert!(fs.getattr("/src").await.unwrap().is_dir());

    fs.open("/README.md", libc::O_RDONLY).await.unwrap();
    assert_eq!(read_to_end(&fs, "/README.md").await, b"# hello, filesystem");
    fs.release("/README.md").await.unwrap();

    // One raw fetch no matter how many chunks were read
    let raw_fetches = api
        .repo
        .requests()
        .into_iter()
        .filter(|r| r.accept.as_deref() == Some("application/vnd.github.v3.raw"))
        .count();
    assert_eq!(raw_fetches, 1);
}

#[tokio::test]
async fn test_create_write_release_commits() {
    let api = FakeApi::start().await;
    let fs = GitFs::new(api.client());

    fs.create("/notes/today.md").await.unwrap();
    fs.write("/notes/today.md", b"- write ", 0).await.unwrap();
    fs.write("/notes/today.md", b"tests", 8).await.unwrap();
    assert!(api.repo.file("/notes/today.md").is_none());

    fs.release("/notes/today.md").await.unwrap();
    assert_eq!(
        api.repo.file("/notes/today.md").as_deref(),
        Some(&b"- write tests"[..])
    );

    let puts = api
        .repo
        .requests()
        .into_iter()
        .filter(|r| r.method == Method::PUT)
        .count();
    assert_eq!(puts, 1);
}

#[tokio::test]
async fn test_edit_existing_file_in_place() {
    let api = FakeApi::start().await;
    api.repo.insert("/config.toml", b"level = \"info\"\n");
    let fs = GitFs::new(api.client());
    readdir(&fs, "/").await;

    fs.open("/config.toml", libc::O_RDWR).await.unwrap();
    fs.write("/config.toml", b"debug\"\n", 9).await.unwrap();
    fs.release("/config.toml").await.unwrap();

    assert_eq!(
        api.repo.file("/config.toml").as_deref(),
        Some(&b"level = \"debug\"\n"[..])
    );
}

#[tokio::test]
async fn test_unlink_deletes_remote_object() {
    let api = FakeApi::start().await;
    api.repo.insert("/tmp.txt", b"x");
    let fs = GitFs::new(api.client());
    readdir(&fs, "/").await;

    fs.unlink("/tmp.txt").await.unwrap();
    assert!(api.repo.file("/tmp.txt").is_none());
    assert_eq!(readdir(&fs, "/").await, vec![".", ".."]);
}

#[tokio::test]
async fn test_lookup_without_listing() {
    let api = FakeApi::start().await;
    api.repo.insert("/deep/tree/leaf.txt", b"leaf");
    let fs = GitFs::new(api.client());

    assert!(fs.lookup("/deep").await.unwrap().is_dir());
    assert_eq!(fs.lookup("/deep/tree/leaf.txt").await.unwrap().size, 4);

    let err = fs.lookup("/deep/missing").await.unwrap_err();
    assert_eq!(err.errno(), libc::ENOENT);
}

#[tokio::test]
async fn test_flush_conflict_is_busy_and_retriable() {
    let api = FakeApi::start().await;
    api.repo.insert("/shared.txt", b"base");
    let fs = GitFs::new(api.client());
    readdir(&fs, "/").await;

    fs.write("/shared.txt", b"mine", 0).await.unwrap();
    api.repo.fail_next(Method::PUT, StatusCode::CONFLICT);

    let err = fs.release("/shared.txt").await.unwrap_err();
    assert!(matches!(err, FsError::Remote(_)));
    assert_eq!(err.errno(), libc::EBUSY);
    assert_eq!(api.repo.file("/shared.txt").as_deref(), Some(&b"base"[..]));

    fs.release("/shared.txt").await.unwrap();
    assert_eq!(api.repo.file("/shared.txt").as_deref(), Some(&b"mine"[..]));
}

#[tokio::test]
async fn test_listing_failure_surfaces() {
    let api = FakeApi::start().await;
    let fs = GitFs::new(api.client());
    api.repo.fail_next(Method::GET, StatusCode::BAD_GATEWAY);

    let mut names = Vec::new();
    let err = fs
        .readdir("/", &mut |name: &str| names.push(name.to_string()))
        .await
        .unwrap_err();
    assert_eq!(names, vec![".", ".."]);
    assert_eq!(err.errno(), libc::EIO);
}
