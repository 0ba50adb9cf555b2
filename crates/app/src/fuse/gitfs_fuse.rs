//! `fuser::Filesystem` over the path-addressed [`FilesystemOps`] contract
//!
//! Each callback resolves inodes to paths, runs the adapter operation on the
//! tokio runtime and replies with the operation's errno on failure.

use std::ffi::OsStr;
use std::time::{Duration, SystemTime};

use common::cache::NodeKind;
use common::fs::{FilesystemOps, FsError, FsStats, NodeAttr};
use fuser::{
    FileAttr, FileType, Filesystem, KernelConfig, ReplyAttr, ReplyCreate, ReplyData,
    ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyOpen, ReplyStatfs, ReplyWrite, Request,
    TimeOrNow,
};
use libc::c_int;
use tokio::runtime::Handle;

use crate::fuse::InodeTable;

/// FUSE filesystem for one mounted repository branch
pub struct GitFuse<F> {
    /// Tokio runtime handle for async operations
    rt: Handle,
    fs: F,
    inodes: InodeTable,
    read_only: bool,
    uid: u32,
    gid: u32,
    /// Reported as every timestamp; the remote store has no per-file times
    mounted_at: SystemTime,
}

impl<F: FilesystemOps> GitFuse<F> {
    /// Default TTL for FUSE attributes
    const ATTR_TTL: Duration = Duration::from_secs(1);

    /// Block size for FUSE
    const BLOCK_SIZE: u32 = 512;

    pub fn new(rt: Handle, fs: F, read_only: bool) -> Self {
        Self {
            rt,
            fs,
            inodes: InodeTable::new(),
            read_only,
            uid: unsafe { libc::getuid() },
            gid: unsafe { libc::getgid() },
            mounted_at: SystemTime::now(),
        }
    }

    fn make_attr(&self, inode: u64, attr: &NodeAttr) -> FileAttr {
        let (kind, perm) = match attr.kind {
            NodeKind::Directory => (FileType::Directory, 0o755),
            NodeKind::File => (FileType::RegularFile, 0o644),
        };

        FileAttr {
            ino: inode,
            size: attr.size,
            blocks: attr.size.div_ceil(Self::BLOCK_SIZE as u64),
            atime: self.mounted_at,
            mtime: self.mounted_at,
            ctime: self.mounted_at,
            crtime: self.mounted_at,
            kind,
            perm,
            nlink: 1,
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            blksize: Self::BLOCK_SIZE,
            flags: 0,
        }
    }

    fn path_of(&self, ino: u64) -> Result<String, c_int> {
        self.inodes
            .get_path(ino)
            .map(str::to_string)
            .ok_or(libc::ENOENT)
    }

    fn child_path(&self, parent: u64, name: &OsStr) -> Result<String, c_int> {
        let name = name.to_str().ok_or(libc::EINVAL)?;
        let parent = self.inodes.get_path(parent).ok_or(libc::ENOENT)?;
        Ok(InodeTable::join(parent, name))
    }

    fn check_writable(&self) -> Result<(), c_int> {
        if self.read_only {
            return Err(libc::EROFS);
        }
        Ok(())
    }

    /// Run one adapter operation to completion, logging a failure
    fn run<T>(
        &self,
        op: &'static str,
        path: &str,
        fut: impl std::future::Future<Output = Result<T, FsError>>,
    ) -> Result<T, c_int> {
        self.rt.block_on(fut).map_err(|e| {
            match &e {
                FsError::NotFound(_) => tracing::debug!(op, path, "not found"),
                _ => tracing::warn!(op, path, error = %e, "filesystem operation failed"),
            }
            e.errno()
        })
    }

    fn do_lookup(&mut self, parent: u64, name: &OsStr) -> Result<FileAttr, c_int> {
        let path = self.child_path(parent, name)?;
        let attr = self.run("lookup", &path, self.fs.lookup(&path))?;
        let ino = self.inodes.get_or_create(&path);
        Ok(self.make_attr(ino, &attr))
    }

    fn do_getattr(&mut self, ino: u64) -> Result<FileAttr, c_int> {
        let path = self.path_of(ino)?;
        let attr = self.run("getattr", &path, self.fs.getattr(&path))?;
        Ok(self.make_attr(ino, &attr))
    }

    fn do_setattr(&mut self, ino: u64, size: Option<u64>) -> Result<FileAttr, c_int> {
        let path = self.path_of(ino)?;
        if let Some(size) = size {
            self.check_writable()?;
            self.run("truncate", &path, self.fs.truncate(&path, size))?;
        }
        self.do_getattr(ino)
    }

    fn do_open(&mut self, ino: u64, flags: i32) -> Result<(), c_int> {
        let path = self.path_of(ino)?;
        if flags & libc::O_ACCMODE != libc::O_RDONLY || flags & libc::O_TRUNC != 0 {
            self.check_writable()?;
        }
        self.run("open", &path, self.fs.open(&path, flags))
    }

    fn do_read(&mut self, ino: u64, offset: i64, size: u32) -> Result<Vec<u8>, c_int> {
        let path = self.path_of(ino)?;
        let mut buf = vec![0u8; size as usize];
        let n = self.run("read", &path, self.fs.read(&path, &mut buf, offset))?;
        buf.truncate(n);
        Ok(buf)
    }

    fn do_write(&mut self, ino: u64, offset: i64, data: &[u8]) -> Result<u32, c_int> {
        self.check_writable()?;
        let path = self.path_of(ino)?;
        let n = self.run("write", &path, self.fs.write(&path, data, offset))?;
        Ok(n as u32)
    }

    fn do_release(&mut self, ino: u64) -> Result<(), c_int> {
        let path = self.path_of(ino)?;
        self.run("release", &path, self.fs.release(&path))
    }

    fn do_create(&mut self, parent: u64, name: &OsStr) -> Result<FileAttr, c_int> {
        self.check_writable()?;
        let path = self.child_path(parent, name)?;
        self.run("create", &path, self.fs.create(&path))?;
        let attr = self.run("getattr", &path, self.fs.getattr(&path))?;
        let ino = self.inodes.get_or_create(&path);
        Ok(self.make_attr(ino, &attr))
    }

    fn do_mkdir(&mut self, parent: u64, name: &OsStr) -> Result<FileAttr, c_int> {
        self.check_writable()?;
        let path = self.child_path(parent, name)?;
        self.run("mkdir", &path, self.fs.mkdir(&path))?;
        let ino = self.inodes.get_or_create(&path);
        Ok(self.make_attr(ino, &NodeAttr::directory()))
    }

    fn do_unlink(&mut self, parent: u64, name: &OsStr) -> Result<(), c_int> {
        self.check_writable()?;
        let path = self.child_path(parent, name)?;
        self.run("unlink", &path, self.fs.unlink(&path))?;
        self.inodes.remove_by_path(&path);
        Ok(())
    }

    fn do_rmdir(&mut self, parent: u64, name: &OsStr) -> Result<(), c_int> {
        self.check_writable()?;
        let path = self.child_path(parent, name)?;
        self.run("rmdir", &path, self.fs.rmdir(&path))
    }

    fn do_opendir(&mut self, ino: u64) -> Result<(), c_int> {
        let path = self.path_of(ino)?;
        self.run("opendir", &path, self.fs.opendir(&path))
    }

    /// Every entry of the directory, `.` and `..` included
    fn do_readdir(&mut self, ino: u64) -> Result<Vec<(u64, FileType, String)>, c_int> {
        let path = self.path_of(ino)?;

        let mut names = Vec::new();
        self.run(
            "readdir",
            &path,
            self.fs
                .readdir(&path, &mut |name: &str| names.push(name.to_string())),
        )?;

        let mut entries = Vec::with_capacity(names.len());
        for name in names {
            let (entry_ino, kind) = match name.as_str() {
                "." => (ino, FileType::Directory),
                ".." => {
                    let parent = InodeTable::parent_path(&path);
                    let parent_ino = self
                        .inodes
                        .get_inode(&parent)
                        .unwrap_or(InodeTable::ROOT_INODE);
                    (parent_ino, FileType::Directory)
                }
                _ => {
                    let child = InodeTable::join(&path, &name);
                    let kind = match self.rt.block_on(self.fs.getattr(&child)) {
                        Ok(attr) if attr.is_dir() => FileType::Directory,
                        _ => FileType::RegularFile,
                    };
                    (self.inodes.get_or_create(&child), kind)
                }
            };
            entries.push((entry_ino, kind, name));
        }

        Ok(entries)
    }

    fn do_statfs(&mut self, ino: u64) -> Result<FsStats, c_int> {
        let path = self.path_of(ino)?;
        self.run("statfs", &path, self.fs.statfs(&path))
    }
}

impl<F: FilesystemOps> Filesystem for GitFuse<F> {
    fn init(&mut self, _req: &Request<'_>, _config: &mut KernelConfig) -> Result<(), c_int> {
        tracing::info!(read_only = self.read_only, "FUSE filesystem initialized");
        Ok(())
    }

    fn destroy(&mut self) {
        tracing::info!("FUSE filesystem destroyed");
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        match self.do_lookup(parent, name) {
            Ok(attr) => reply.entry(&Self::ATTR_TTL, &attr, 0),
            Err(e) => reply.error(e),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        match self.do_getattr(ino) {
            Ok(attr) => reply.attr(&Self::ATTR_TTL, &attr),
            Err(e) => reply.error(e),
        }
    }

    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        match self.do_setattr(ino, size) {
            Ok(attr) => reply.attr(&Self::ATTR_TTL, &attr),
            Err(e) => reply.error(e),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        match self.do_open(ino, flags) {
            Ok(()) => reply.opened(0, 0),
            Err(e) => reply.error(e),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        match self.do_read(ino, offset, size) {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(e),
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        match self.do_write(ino, offset, data) {
            Ok(written) => reply.written(written),
            Err(e) => reply.error(e),
        }
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        match self.do_release(ino) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e),
        }
    }

    fn create(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        flags: i32,
        reply: ReplyCreate,
    ) {
        match self.do_create(parent, name) {
            Ok(attr) => reply.created(&Self::ATTR_TTL, &attr, 0, 0, flags as u32),
            Err(e) => reply.error(e),
        }
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        match self.do_mkdir(parent, name) {
            Ok(attr) => reply.entry(&Self::ATTR_TTL, &attr, 0),
            Err(e) => reply.error(e),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        match self.do_unlink(parent, name) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e),
        }
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        match self.do_rmdir(parent, name) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e),
        }
    }

    fn opendir(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        match self.do_opendir(ino) {
            Ok(()) => reply.opened(0, 0),
            Err(e) => reply.error(e),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let entries = match self.do_readdir(ino) {
            Ok(entries) => entries,
            Err(e) => {
                reply.error(e);
                return;
            }
        };

        let skip = usize::try_from(offset).unwrap_or(0);
        for (i, (ino, kind, name)) in entries.into_iter().enumerate().skip(skip) {
            if reply.add(ino, (i + 1) as i64, kind, &name) {
                break;
            }
        }
        reply.ok();
    }

    fn releasedir(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _flags: i32,
        reply: ReplyEmpty,
    ) {
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyStatfs) {
        match self.do_statfs(ino) {
            Ok(stats) => reply.statfs(
                stats.blocks,
                stats.blocks_free,
                stats.blocks_available,
                stats.files,
                stats.files_free,
                stats.block_size,
                stats.name_max,
                stats.fragment_size,
            ),
            Err(e) => reply.error(e),
        }
    }
}
