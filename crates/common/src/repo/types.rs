//! Wire shapes of the contents API

use serde::{Deserialize, Serialize};

/// Ordered entries of one remote directory
pub type DirectoryListing = Vec<ContentEntry>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    #[default]
    File,
    Dir,
    Symlink,
    Submodule,
}

impl EntryKind {
    pub fn is_dir(&self) -> bool {
        matches!(self, EntryKind::Dir)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryLinks {
    #[serde(rename = "self", default)]
    pub self_url: Option<String>,
    #[serde(default)]
    pub git: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
}

/// One element of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEntry {
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub sha: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub git_url: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(rename = "_links", default)]
    pub links: EntryLinks,
}

/// Metadata of a single remote object.
///
/// `sha` is the version token: it must accompany any update or delete of
/// an existing object, and the remote store rejects writes carrying a
/// stale one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFileMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub sha: String,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "type", default)]
    pub kind: EntryKind,
    /// Base64 content, newline-wrapped by the remote store
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
}

impl RemoteFileMetadata {
    /// Metadata for a path that the remote store answered with a listing
    pub fn directory(path: &str) -> Self {
        let name = path.rsplit('/').next().unwrap_or_default().to_string();
        Self {
            name,
            path: path.trim_start_matches('/').to_string(),
            kind: EntryKind::Dir,
            ..Default::default()
        }
    }

    /// The version token, if the object has one
    pub fn version_token(&self) -> Option<&str> {
        if self.sha.is_empty() {
            None
        } else {
            Some(&self.sha)
        }
    }
}

/// Body of a create-or-update request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRequest {
    pub message: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sha: Option<String>,
}

/// Body of a delete request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub message: String,
    pub sha: String,
}

/// A contents GET answers with an object for files and an array for
/// directories
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ContentsResponse {
    Directory(Vec<serde::de::IgnoredAny>),
    Object(RemoteFileMetadata),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_decodes_full_shape() {
        let json = r#"[{
            "name": "README.md",
            "path": "README.md",
            "sha": "3d21ec53a331a6f037a91c368710b99387d012c1",
            "size": 5362,
            "url": "https://api.github.com/repos/octo/hello/contents/README.md",
            "html_url": "https://github.com/octo/hello/blob/main/README.md",
            "git_url": "https://api.github.com/repos/octo/hello/git/blobs/3d21ec53",
            "download_url": "https://raw.githubusercontent.com/octo/hello/main/README.md",
            "type": "file",
            "_links": {
                "self": "https://api.github.com/repos/octo/hello/contents/README.md",
                "git": "https://api.github.com/repos/octo/hello/git/blobs/3d21ec53",
                "html": "https://github.com/octo/hello/blob/main/README.md"
            }
        }, {
            "name": "src",
            "path": "src",
            "sha": "a84d88e7554fc1fa21bcbc4efae3c782a70d2b9d",
            "size": 0,
            "download_url": null,
            "type": "dir"
        }]"#;

        let listing: DirectoryListing = serde_json::from_str(json).unwrap();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].kind, EntryKind::File);
        assert_eq!(listing[0].size, 5362);
        assert!(listing[0].links.self_url.is_some());
        assert!(listing[1].kind.is_dir());
        assert!(listing[1].download_url.is_none());
    }

    #[test]
    fn test_minimal_entry_decodes() {
        let listing: DirectoryListing =
            serde_json::from_str(r#"[{"name":"a.txt","type":"file","size":12}]"#).unwrap();
        assert_eq!(listing[0].name, "a.txt");
        assert_eq!(listing[0].size, 12);
        assert!(listing[0].sha.is_empty());
    }

    #[test]
    fn test_contents_response_distinguishes_dirs() {
        let dir: ContentsResponse = serde_json::from_str(r#"[]"#).unwrap();
        assert!(matches!(dir, ContentsResponse::Directory(_)));

        let file: ContentsResponse = serde_json::from_str(
            r#"{"name":"a","path":"a","sha":"abc","size":3,"type":"file","content":"YWJj\n","encoding":"base64"}"#,
        )
        .unwrap();
        match file {
            ContentsResponse::Object(meta) => {
                assert_eq!(meta.version_token(), Some("abc"));
                assert_eq!(meta.encoding.as_deref(), Some("base64"));
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_upload_omits_missing_sha() {
        let body = UploadRequest {
            message: "m".to_string(),
            content: "YQ==".to_string(),
            sha: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("sha").is_none());

        let body = UploadRequest {
            sha: Some("abc".to_string()),
            ..body
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["sha"], "abc");
    }

    #[test]
    fn test_directory_metadata_has_no_token() {
        let meta = RemoteFileMetadata::directory("/src/bin");
        assert_eq!(meta.name, "bin");
        assert_eq!(meta.path, "src/bin");
        assert!(meta.kind.is_dir());
        assert!(meta.version_token().is_none());
    }
}
