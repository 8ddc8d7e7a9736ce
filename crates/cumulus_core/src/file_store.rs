//! File operations against the remote store
//!
//! Every operation opens its own store session, runs its primitive
//! sequence, and drops the session on every exit path. Validation
//! failures are returned before any I/O; everything after that is caught
//! here, logged with the operation and path, and folded into the
//! operation's textual or boolean outcome. Nothing is retried and no
//! partial completion is rolled back, so an upload interrupted
//! mid-stream leaves a truncated target behind.
//!
//! The existence-check-then-act sequences in upload, rename, copy and
//! move are not serialized: two concurrent callers targeting the same
//! path race on the store's primitives and the winner is unspecified.

use crate::error::required_field;
use crate::{CloudFileRecord, CoreError, Result, ServiceConfig};
use cumulus_store::{
    final_segment, join, parent_of, sibling, PathResolver, StoreClient,
};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

/// Fixed buffer size for stream copies.
const COPY_BUF_SIZE: usize = 8 * 1024;

/// The six file operations over an injectable store client.
pub struct FileStore {
    client: Arc<dyn StoreClient>,
    resolver: PathResolver,
    staging_dir: PathBuf,
}

impl FileStore {
    pub fn new<P: Into<PathBuf>>(
        client: Arc<dyn StoreClient>,
        resolver: PathResolver,
        staging_dir: P,
    ) -> Self {
        Self {
            client,
            resolver,
            staging_dir: staging_dir.into(),
        }
    }

    pub fn from_config(client: Arc<dyn StoreClient>, config: &ServiceConfig) -> Self {
        Self::new(
            client,
            PathResolver::new(config.store.root.clone()),
            config.download.staging_dir.clone(),
        )
    }

    // ===== upload =====

    /// Stream a payload into a new entry under the upload path. Never
    /// overwrites; a conflicting target is reported in the status text.
    pub fn upload(
        &self,
        owner_id: &str,
        upload_path: &str,
        file_name: &str,
        file_size: &str,
        source: &mut dyn Read,
    ) -> Result<String> {
        let record = CloudFileRecord::new(owner_id, file_name, file_size, upload_path)?;
        let target = join(&self.resolver.resolve(upload_path)?, &record.file_name);

        match self.try_upload(&target, source) {
            Ok(()) => {
                tracing::info!("file uploaded: {}", target);
                Ok("file uploaded successfully".to_string())
            }
            Err(CoreError::AlreadyExists(_)) => {
                Ok("file already exists, upload failed".to_string())
            }
            Err(e) => {
                tracing::error!("file upload failed for {}: {}", target, e);
                Ok(format!("file upload failed: {}", e))
            }
        }
    }

    fn try_upload(&self, target: &str, source: &mut dyn Read) -> Result<()> {
        let session = self.client.open_session()?;

        let parent = parent_of(target);
        if !session.exists(parent)? {
            session.mkdir_parents(parent)?;
        }
        if session.exists(target)? {
            return Err(CoreError::AlreadyExists(target.to_string()));
        }

        let mut sink = session.create_write(target)?;
        copy_stream(source, sink.as_mut())?;
        Ok(())
    }

    // ===== download =====

    /// Stream a remote entry into the shared local staging directory.
    /// The staging file is named after the final path segment, so
    /// colliding segments overwrite each other's staged copy.
    pub fn download(&self, owner_id: &str, upload_path: &str) -> Result<String> {
        required_field(owner_id, "ownerId")?;
        required_field(upload_path, "uploadPath")?;
        let remote = self.resolver.resolve(upload_path)?;

        match self.try_download(&remote) {
            Ok(local) => {
                tracing::info!("file downloaded: {} -> {}", remote, local.display());
                Ok(format!(
                    "file downloaded successfully, saved to {}",
                    local.display()
                ))
            }
            Err(CoreError::NotFound(_)) => {
                Ok("file download failed, file does not exist".to_string())
            }
            Err(e) => {
                tracing::error!("file download failed for {}: {}", remote, e);
                Ok(format!("file download failed: {}", e))
            }
        }
    }

    fn try_download(&self, remote: &str) -> Result<PathBuf> {
        let session = self.client.open_session()?;

        if !session.exists(remote)? {
            return Err(CoreError::NotFound(remote.to_string()));
        }

        std::fs::create_dir_all(&self.staging_dir)?;
        let local = self.staging_dir.join(final_segment(remote));
        tracing::info!("downloading {} to {}", remote, local.display());

        let mut reader = session.open_read(remote)?;
        let mut sink = std::fs::File::create(&local)?;
        copy_stream(reader.as_mut(), &mut sink)?;
        Ok(local)
    }

    // ===== delete =====

    /// Delete an entry; directories are removed recursively.
    pub fn delete(&self, owner_id: &str, upload_path: &str) -> Result<String> {
        required_field(owner_id, "ownerId")?;
        required_field(upload_path, "uploadPath")?;
        let remote = self.resolver.resolve(upload_path)?;

        match self.try_delete(&remote) {
            Ok(true) => Ok("file/directory deleted successfully".to_string()),
            Ok(false) => Ok("file/directory delete failed".to_string()),
            Err(CoreError::NotFound(_)) => {
                Ok("file delete failed, file does not exist".to_string())
            }
            Err(e) => {
                tracing::error!("file delete failed for {}: {}", remote, e);
                Ok(format!("file delete failed: {}", e))
            }
        }
    }

    fn try_delete(&self, remote: &str) -> Result<bool> {
        let session = self.client.open_session()?;

        if !session.exists(remote)? {
            return Err(CoreError::NotFound(remote.to_string()));
        }

        let is_dir = session
            .status(remote)?
            .map(|meta| meta.is_dir)
            .unwrap_or(false);
        Ok(session.delete(remote, is_dir)?)
    }

    // ===== list =====

    /// List the immediate children of a path, one record per child. An
    /// absent path yields an empty sequence, never an error; a failure
    /// mid-listing is logged and whatever was collected is returned.
    pub fn list(&self, owner_id: &str, path: &str) -> Result<Vec<CloudFileRecord>> {
        required_field(owner_id, "ownerId")?;
        required_field(path, "path")?;
        let remote = self.resolver.resolve(path)?;

        let mut records = Vec::new();
        if let Err(e) = self.collect_listing(&remote, owner_id, &mut records) {
            tracing::error!("listing failed for {}: {}", remote, e);
        }
        Ok(records)
    }

    fn collect_listing(
        &self,
        remote: &str,
        owner_id: &str,
        out: &mut Vec<CloudFileRecord>,
    ) -> Result<()> {
        let session = self.client.open_session()?;

        if !session.exists(remote)? {
            return Ok(());
        }
        for entry in session.list_children(remote)? {
            out.push(CloudFileRecord::from_listing(
                entry.name, entry.size, entry.path, owner_id, remote,
            ));
        }
        Ok(())
    }

    // ===== rename =====

    /// Rename an entry in place. A taken sibling name fails without
    /// mutating anything; an absent source is reported by the store's
    /// rename primitive itself.
    pub fn rename(
        &self,
        owner_id: &str,
        upload_path: &str,
        new_file_name: &str,
    ) -> Result<bool> {
        required_field(owner_id, "ownerId")?;
        required_field(upload_path, "uploadPath")?;
        let remote = self.resolver.resolve(upload_path)?;
        let target = sibling(&remote, new_file_name);

        match self.try_rename(&remote, &target) {
            Ok(renamed) => Ok(renamed),
            Err(e) => {
                tracing::error!("file rename failed for {}: {}", remote, e);
                Ok(false)
            }
        }
    }

    fn try_rename(&self, from: &str, to: &str) -> Result<bool> {
        let session = self.client.open_session()?;

        if session.exists(to)? {
            return Ok(false);
        }
        Ok(session.rename(from, to)?)
    }

    // ===== copy / move =====

    /// Duplicate an entry under a target directory via a full stream
    /// copy. The source remains present afterwards.
    pub fn copy_file(
        &self,
        source_owner_id: &str,
        source_upload_path: &str,
        target_upload_path: &str,
    ) -> Result<bool> {
        let (source, target_dir) =
            self.resolve_transfer(source_owner_id, source_upload_path, target_upload_path)?;

        match self.try_copy(&source, &target_dir) {
            Ok(done) => Ok(done),
            Err(e) => {
                tracing::error!("file copy failed for {}: {}", source, e);
                Ok(false)
            }
        }
    }

    /// Relocate an entry under a target directory via the store's atomic
    /// rename. The source is gone afterwards.
    pub fn move_file(
        &self,
        source_owner_id: &str,
        source_upload_path: &str,
        target_upload_path: &str,
    ) -> Result<bool> {
        let (source, target_dir) =
            self.resolve_transfer(source_owner_id, source_upload_path, target_upload_path)?;

        match self.try_move(&source, &target_dir) {
            Ok(done) => Ok(done),
            Err(e) => {
                tracing::error!("file move failed for {}: {}", source, e);
                Ok(false)
            }
        }
    }

    fn resolve_transfer(
        &self,
        source_owner_id: &str,
        source_upload_path: &str,
        target_upload_path: &str,
    ) -> Result<(String, String)> {
        required_field(source_owner_id, "sourceOwnerId")?;
        required_field(source_upload_path, "sourceUploadPath")?;
        required_field(target_upload_path, "targetUploadPath")?;
        Ok((
            self.resolver.resolve(source_upload_path)?,
            self.resolver.resolve(target_upload_path)?,
        ))
    }

    /// Shared precondition sequence for copy and move: source must
    /// exist, the target directory is created if missing, and a taken
    /// target fails the operation. Returns the target path when the
    /// transfer should proceed.
    fn prepare_transfer(
        &self,
        session: &dyn cumulus_store::StoreSession,
        source: &str,
        target_dir: &str,
        op: &str,
    ) -> Result<Option<String>> {
        if !session.exists(source)? {
            tracing::error!("{} failed, source does not exist: {}", op, source);
            return Ok(None);
        }

        let target = join(target_dir, final_segment(source));
        let parent = parent_of(&target);
        if !session.exists(parent)? {
            session.mkdir_parents(parent)?;
        }
        if session.exists(&target)? {
            tracing::error!("{} failed, target already exists: {}", op, target);
            return Ok(None);
        }
        Ok(Some(target))
    }

    fn try_copy(&self, source: &str, target_dir: &str) -> Result<bool> {
        let session = self.client.open_session()?;

        let Some(target) = self.prepare_transfer(session.as_ref(), source, target_dir, "copy")?
        else {
            return Ok(false);
        };

        let mut reader = session.open_read(source)?;
        let mut sink = session.create_write(&target)?;
        copy_stream(reader.as_mut(), sink.as_mut())?;

        tracing::info!("file copied: {} -> {}", source, target);
        Ok(true)
    }

    fn try_move(&self, source: &str, target_dir: &str) -> Result<bool> {
        let session = self.client.open_session()?;

        let Some(target) = self.prepare_transfer(session.as_ref(), source, target_dir, "move")?
        else {
            return Ok(false);
        };

        let moved = session.rename(source, &target)?;
        if moved {
            tracing::info!("file moved: {} -> {}", source, target);
        }
        Ok(moved)
    }
}

/// Copy bytes between streams with a fixed-size buffer until end of
/// stream, then flush the sink.
fn copy_stream(reader: &mut dyn Read, writer: &mut dyn Write) -> std::io::Result<u64> {
    let mut buf = [0u8; COPY_BUF_SIZE];
    let mut total = 0u64;

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n])?;
        total += n as u64;
    }

    writer.flush()?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cumulus_store::{MemoryStore, StoreSession};

    const ROOT: &str = "cumulus://main/";

    fn fixture() -> (MemoryStore, FileStore, tempfile::TempDir) {
        let store = MemoryStore::new(ROOT);
        let staging = tempfile::tempdir().unwrap();
        let file_store = FileStore::new(
            Arc::new(store.clone()),
            PathResolver::new(ROOT),
            staging.path(),
        );
        (store, file_store, staging)
    }

    fn read_remote(store: &MemoryStore, path: &str) -> Vec<u8> {
        let session = store.open_session().unwrap();
        let mut reader = session.open_read(path).unwrap();
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_upload_then_list_shows_the_entry() {
        let (_store, files, _staging) = fixture();

        let payload = b"hello world";
        let status = files
            .upload("u-1", "/docs", "a.txt", &payload.len().to_string(), &mut &payload[..])
            .unwrap();
        assert_eq!(status, "file uploaded successfully");

        let records = files.list("u-1", "/docs").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].file_name, "a.txt");
        assert_eq!(records[0].file_size, payload.len() as u64);
        assert_eq!(records[0].owner_id, "u-1");
        assert_eq!(
            records[0].file_path.as_deref(),
            Some("cumulus://main/docs/a.txt")
        );
    }

    #[test]
    fn test_upload_is_not_idempotent() {
        let (store, files, _staging) = fixture();

        files
            .upload("u-1", "/docs", "a.txt", "8", &mut &b"original"[..])
            .unwrap();
        let status = files
            .upload("u-1", "/docs", "a.txt", "7", &mut &b"changed"[..])
            .unwrap();

        assert_eq!(status, "file already exists, upload failed");
        assert_eq!(read_remote(&store, "cumulus://main/docs/a.txt"), b"original");
    }

    #[test]
    fn test_upload_rejects_invalid_arguments_before_io() {
        let (store, files, _staging) = fixture();

        assert!(matches!(
            files.upload("", "/docs", "a.txt", "1", &mut &b"x"[..]),
            Err(CoreError::InvalidArgument(_))
        ));
        assert!(matches!(
            files.upload("u-1", "/docs", "a.txt", "big", &mut &b"x"[..]),
            Err(CoreError::InvalidArgument(_))
        ));

        // Nothing was created.
        let session = store.open_session().unwrap();
        assert!(!session.exists("cumulus://main/docs").unwrap());
    }

    #[test]
    fn test_download_stages_the_payload() {
        let (_store, files, staging) = fixture();

        files
            .upload("u-1", "/docs", "a.txt", "5", &mut &b"bytes"[..])
            .unwrap();
        let status = files.download("u-1", "/docs/a.txt").unwrap();

        let staged = staging.path().join("a.txt");
        assert!(status.contains(&staged.display().to_string()));
        assert_eq!(std::fs::read(&staged).unwrap(), b"bytes");
    }

    #[test]
    fn test_download_absent_file_reports_not_found() {
        let (_store, files, _staging) = fixture();
        let status = files.download("u-1", "/docs/missing.txt").unwrap();
        assert_eq!(status, "file download failed, file does not exist");
    }

    #[test]
    fn test_staging_collision_on_shared_final_segment() {
        // The staging directory is shared and files are named by their
        // final path segment only, so the second download wins.
        let (_store, files, staging) = fixture();

        files.upload("u-1", "/a", "data.bin", "5", &mut &b"first"[..]).unwrap();
        files.upload("u-1", "/b", "data.bin", "6", &mut &b"second"[..]).unwrap();

        files.download("u-1", "/a/data.bin").unwrap();
        files.download("u-1", "/b/data.bin").unwrap();

        let staged = staging.path().join("data.bin");
        assert_eq!(std::fs::read(&staged).unwrap(), b"second");
    }

    #[test]
    fn test_delete_file_and_directory() {
        let (store, files, _staging) = fixture();

        files.upload("u-1", "/docs/sub", "a.txt", "1", &mut &b"x"[..]).unwrap();
        files.upload("u-1", "/docs", "b.txt", "1", &mut &b"y"[..]).unwrap();

        assert_eq!(
            files.delete("u-1", "/docs/b.txt").unwrap(),
            "file/directory deleted successfully"
        );
        // Directories go recursively.
        assert_eq!(
            files.delete("u-1", "/docs").unwrap(),
            "file/directory deleted successfully"
        );

        let session = store.open_session().unwrap();
        assert!(!session.exists("cumulus://main/docs").unwrap());
    }

    #[test]
    fn test_delete_absent_path_has_no_side_effect() {
        let (store, files, _staging) = fixture();

        let status = files.delete("u-1", "/docs/missing.txt").unwrap();
        assert_eq!(status, "file delete failed, file does not exist");

        let session = store.open_session().unwrap();
        assert!(!session.exists("cumulus://main/docs").unwrap());
    }

    #[test]
    fn test_list_absent_and_childless_paths_yield_empty() {
        let (store, files, _staging) = fixture();

        assert!(files.list("u-1", "/nowhere").unwrap().is_empty());

        store
            .open_session()
            .unwrap()
            .mkdir_parents("cumulus://main/empty")
            .unwrap();
        assert!(files.list("u-1", "/empty").unwrap().is_empty());
    }

    #[test]
    fn test_rename_refuses_taken_sibling() {
        let (store, files, _staging) = fixture();

        files.upload("u-1", "/docs", "a.txt", "1", &mut &b"a"[..]).unwrap();
        files.upload("u-1", "/docs", "b.txt", "1", &mut &b"b"[..]).unwrap();

        assert!(!files.rename("u-1", "/docs/a.txt", "b.txt").unwrap());

        // Both entries unchanged.
        assert_eq!(read_remote(&store, "cumulus://main/docs/a.txt"), b"a");
        assert_eq!(read_remote(&store, "cumulus://main/docs/b.txt"), b"b");
    }

    #[test]
    fn test_rename_replaces_the_final_segment() {
        let (store, files, _staging) = fixture();

        files.upload("u-1", "/docs", "a.txt", "1", &mut &b"a"[..]).unwrap();

        assert!(files.rename("u-1", "/docs/a.txt", "renamed.txt").unwrap());
        let session = store.open_session().unwrap();
        assert!(!session.exists("cumulus://main/docs/a.txt").unwrap());
        assert!(session.exists("cumulus://main/docs/renamed.txt").unwrap());
    }

    #[test]
    fn test_rename_absent_source_returns_false() {
        let (_store, files, _staging) = fixture();
        assert!(!files.rename("u-1", "/docs/missing.txt", "new.txt").unwrap());
    }

    #[test]
    fn test_copy_duplicates_bytes_and_keeps_source() {
        let (store, files, _staging) = fixture();

        files.upload("u-1", "/docs", "a.txt", "7", &mut &b"payload"[..]).unwrap();

        assert!(files.copy_file("u-1", "/docs/a.txt", "/backup").unwrap());
        assert_eq!(read_remote(&store, "cumulus://main/docs/a.txt"), b"payload");
        assert_eq!(read_remote(&store, "cumulus://main/backup/a.txt"), b"payload");
    }

    #[test]
    fn test_copy_refuses_existing_target() {
        let (store, files, _staging) = fixture();

        files.upload("u-1", "/docs", "a.txt", "3", &mut &b"new"[..]).unwrap();
        files.upload("u-1", "/backup", "a.txt", "3", &mut &b"old"[..]).unwrap();

        assert!(!files.copy_file("u-1", "/docs/a.txt", "/backup").unwrap());
        assert_eq!(read_remote(&store, "cumulus://main/backup/a.txt"), b"old");
    }

    #[test]
    fn test_move_relocates_and_second_move_fails() {
        let (store, files, _staging) = fixture();

        files.upload("u-1", "/docs", "a.txt", "7", &mut &b"payload"[..]).unwrap();

        assert!(files.move_file("u-1", "/docs/a.txt", "/archive").unwrap());
        let session = store.open_session().unwrap();
        assert!(!session.exists("cumulus://main/docs/a.txt").unwrap());
        assert_eq!(read_remote(&store, "cumulus://main/archive/a.txt"), b"payload");

        // Source is gone now.
        assert!(!files.move_file("u-1", "/docs/a.txt", "/archive").unwrap());
    }

    #[test]
    fn test_transfer_requires_all_three_inputs() {
        let (_store, files, _staging) = fixture();

        assert!(matches!(
            files.copy_file("", "/docs/a.txt", "/backup"),
            Err(CoreError::InvalidArgument(_))
        ));
        assert!(matches!(
            files.move_file("u-1", "", "/backup"),
            Err(CoreError::InvalidArgument(_))
        ));
        assert!(matches!(
            files.move_file("u-1", "/docs/a.txt", " "),
            Err(CoreError::InvalidArgument(_))
        ));
    }

    // ===== check-then-act race =====

    /// Client wrapper whose sessions answer `exists = false` for one
    /// pinned path, simulating two callers that both passed the
    /// existence check before either created the target.
    struct PinnedExists {
        inner: MemoryStore,
        pinned: String,
    }

    impl StoreClient for PinnedExists {
        fn open_session(&self) -> cumulus_store::Result<Box<dyn StoreSession>> {
            Ok(Box::new(PinnedSession {
                inner: self.inner.open_session()?,
                pinned: self.pinned.clone(),
            }))
        }
    }

    struct PinnedSession {
        inner: Box<dyn StoreSession>,
        pinned: String,
    }

    impl StoreSession for PinnedSession {
        fn exists(&self, path: &str) -> cumulus_store::Result<bool> {
            if path == self.pinned {
                return Ok(false);
            }
            self.inner.exists(path)
        }

        fn status(&self, path: &str) -> cumulus_store::Result<Option<cumulus_store::EntryMeta>> {
            self.inner.status(path)
        }

        fn list_children(&self, path: &str) -> cumulus_store::Result<Vec<cumulus_store::EntryMeta>> {
            self.inner.list_children(path)
        }

        fn open_read(&self, path: &str) -> cumulus_store::Result<Box<dyn Read + Send>> {
            self.inner.open_read(path)
        }

        fn create_write(&self, path: &str) -> cumulus_store::Result<Box<dyn Write + Send>> {
            self.inner.create_write(path)
        }

        fn delete(&self, path: &str, recursive: bool) -> cumulus_store::Result<bool> {
            self.inner.delete(path, recursive)
        }

        fn rename(&self, from: &str, to: &str) -> cumulus_store::Result<bool> {
            self.inner.rename(from, to)
        }

        fn mkdir_parents(&self, path: &str) -> cumulus_store::Result<()> {
            self.inner.mkdir_parents(path)
        }
    }

    #[test]
    fn test_upload_check_then_act_race_lets_the_last_writer_win() {
        // With both callers past the existence check, the second create
        // replaces the first caller's bytes.
        let store = MemoryStore::new(ROOT);
        let staging = tempfile::tempdir().unwrap();
        let racing = FileStore::new(
            Arc::new(PinnedExists {
                inner: store.clone(),
                pinned: "cumulus://main/docs/a.txt".to_string(),
            }),
            PathResolver::new(ROOT),
            staging.path(),
        );

        racing.upload("u-1", "/docs", "a.txt", "5", &mut &b"first"[..]).unwrap();
        racing.upload("u-2", "/docs", "a.txt", "6", &mut &b"second"[..]).unwrap();

        assert_eq!(read_remote(&store, "cumulus://main/docs/a.txt"), b"second");
    }
}
