//! Regular files with content from the content store

use std::sync::Arc;

use blobstore::{ContentStore, hash_content, verify};
use declarative::{
    ChangeSet, CrudHandler, CurrentState, Error, FileKind, HandlerContext, ResourceDescriptor,
    Result, Value,
};

use super::{apply_ownership, apply_permissions, path_of, stat_attributes, store_error};

pub struct FileHandler {
    store: Arc<dyn ContentStore>,
}

impl FileHandler {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Fetch the bytes for `hash`, refusing anything that does not hash to it
    fn fetch(&self, hash: &str) -> Result<Vec<u8>> {
        let bytes = self.store.download(hash).map_err(store_error)?;
        verify(hash, &bytes).map_err(store_error)?;
        Ok(bytes)
    }

    /// Declared content, or nothing for a file without a hash
    fn desired_bytes(&self, desired: &ResourceDescriptor) -> Result<Vec<u8>> {
        match desired.opt_text("hash")? {
            Some(hash) => self.fetch(hash),
            None => Ok(Vec::new()),
        }
    }
}

impl CrudHandler for FileHandler {
    fn name(&self) -> &'static str {
        "posix_file"
    }

    fn managed(&self) -> &'static [&'static str] {
        &["hash", "owner", "group", "permissions"]
    }

    fn read(&self, ctx: &HandlerContext, desired: &ResourceDescriptor) -> Result<CurrentState> {
        let path = path_of(desired);
        if !ctx.io.file_exists(path) {
            return Ok(CurrentState::Purged);
        }
        let stat = ctx.io.stat(path)?;
        if stat.kind != FileKind::File {
            return Err(Error::conflict(format!(
                "{} exists but is not a regular file",
                path.display()
            )));
        }

        let content = ctx.io.read(path)?;
        let hash = hash_content(&content);
        // Keep the current bytes as a baseline for diffs
        if self
            .store
            .upload_if_absent(&hash, &content)
            .map_err(store_error)?
        {
            log::debug!("{}: stored current content {hash}", ctx.resource());
        }

        let mut attrs = stat_attributes(&stat);
        attrs.insert("hash".to_string(), Value::Text(hash));
        Ok(CurrentState::Present(attrs))
    }

    fn create(&self, ctx: &HandlerContext, desired: &ResourceDescriptor) -> Result<()> {
        let path = path_of(desired);
        if ctx.io.file_exists(path) {
            return Err(Error::conflict(format!(
                "cannot create file {}, because it already exists",
                path.display()
            )));
        }
        let bytes = self.desired_bytes(desired)?;
        ctx.io.put(path, &bytes)?;
        apply_permissions(ctx, desired)?;
        apply_ownership(ctx, desired)
    }

    fn update(
        &self,
        ctx: &HandlerContext,
        desired: &ResourceDescriptor,
        changes: &ChangeSet,
    ) -> Result<()> {
        let path = path_of(desired);
        if !ctx.io.file_exists(path) {
            return Err(Error::not_found(format!(
                "cannot update file {}, because it does not exist",
                path.display()
            )));
        }
        if changes.contains("hash") {
            let bytes = self.desired_bytes(desired)?;
            ctx.io.put(path, &bytes)?;
        }
        if changes.contains("permissions") {
            apply_permissions(ctx, desired)?;
        }
        if changes.contains_any(&["owner", "group"]) {
            apply_ownership(ctx, desired)?;
        }
        Ok(())
    }

    fn delete(&self, ctx: &HandlerContext, desired: &ResourceDescriptor) -> Result<()> {
        let path = path_of(desired);
        if ctx.io.file_exists(path) {
            ctx.io.remove(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blobstore::MemoryStore;
    use declarative::{Handler, HostIo, MockIo, Outcome, ResourceKind};

    const PATH: &str = "/tmp/a";

    fn setup(content: &[u8]) -> (MockIo, Arc<MemoryStore>, Handler, String) {
        let store = Arc::new(MemoryStore::new());
        let hash = store.upload(content).unwrap();
        let handler = Handler::crud(FileHandler::new(Arc::clone(&store) as Arc<dyn ContentStore>));
        (MockIo::new(), store, handler, hash)
    }

    fn desired(hash: &str) -> ResourceDescriptor {
        ResourceDescriptor::new(ResourceKind::File, PATH)
            .with("path", PATH)
            .with("hash", hash)
            .with("permissions", 644_i64)
    }

    fn reconcile(io: &MockIo, handler: &Handler, d: &ResourceDescriptor) -> (Outcome, ChangeSet) {
        let ctx = HandlerContext::new(io, d, false);
        handler.reconcile(&ctx, d).unwrap()
    }

    #[test]
    fn test_create_then_converged() {
        let (io, _store, handler, hash) = setup(b"hello\n");
        let d = desired(&hash);

        let (outcome, _) = reconcile(&io, &handler, &d);
        assert_eq!(outcome, Outcome::Created);
        assert_eq!(io.content(PATH).unwrap(), b"hello\n");
        assert_eq!(io.meta_of(PATH).unwrap().2, 0o644);

        let (outcome, changes) = reconcile(&io, &handler, &d);
        assert_eq!(outcome, Outcome::Unchanged);
        assert!(changes.is_empty());
    }

    #[test]
    fn test_create_sets_mode_before_ownership() {
        let (io, _store, handler, hash) = setup(b"x");
        let d = desired(&hash)
            .with("permissions", 600_i64)
            .with("owner", "nginx")
            .with("group", "nginx");
        reconcile(&io, &handler, &d);
        assert_eq!(
            io.meta_of(PATH).unwrap(),
            ("nginx".to_string(), "nginx".to_string(), 0o600)
        );
    }

    #[test]
    fn test_update_only_changed_facets() {
        let (io, store, handler, hash) = setup(b"new\n");
        io.add_file(PATH, "old\n");
        io.set_meta(PATH, "root", "root", 0o600);

        let (outcome, changes) = reconcile(&io, &handler, &desired(&hash));
        assert_eq!(outcome, Outcome::Updated);
        assert!(changes.contains("hash"));
        assert!(changes.contains("permissions"));
        assert!(!changes.contains("owner"));
        assert_eq!(io.content(PATH).unwrap(), b"new\n");
        assert_eq!(io.meta_of(PATH).unwrap().2, 0o644);

        // The previous content was kept as a baseline
        assert!(store.exists(&hash_content(b"old\n")).unwrap());
    }

    #[test]
    fn test_permissions_only_change_keeps_content() {
        let (io, _store, handler, hash) = setup(b"same");
        io.add_file(PATH, "same");
        io.set_meta(PATH, "root", "root", 0o755);

        let (outcome, changes) = reconcile(&io, &handler, &desired(&hash));
        assert_eq!(outcome, Outcome::Updated);
        assert_eq!(changes.len(), 1);
        assert_eq!(io.meta_of(PATH).unwrap().2, 0o644);
    }

    #[test]
    fn test_integrity_mismatch_never_writes() {
        let store = Arc::new(MemoryStore::new());
        let expected = hash_content(b"expected");
        store.insert_raw(&expected, "tampered");
        let handler = Handler::crud(FileHandler::new(store));
        let io = MockIo::new();

        let d = desired(&expected);
        let ctx = HandlerContext::new(&io, &d, false);
        let err = handler.reconcile(&ctx, &d).unwrap_err();
        assert!(matches!(err, Error::IntegrityMismatch { .. }));
        assert!(!io.file_exists(std::path::Path::new(PATH)));
    }

    #[test]
    fn test_missing_content_is_not_found() {
        let (io, _store, handler, _) = setup(b"");
        let d = desired(&hash_content(b"never uploaded"));
        let ctx = HandlerContext::new(&io, &d, false);
        assert!(handler.reconcile(&ctx, &d).unwrap_err().is_not_found());
    }

    #[test]
    fn test_directory_in_the_way_is_conflict() {
        let (io, _store, handler, hash) = setup(b"x");
        io.add_dir(PATH);
        let d = desired(&hash);
        let ctx = HandlerContext::new(&io, &d, false);
        let err = handler.reconcile(&ctx, &d).unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
    }

    #[test]
    fn test_purge() {
        let (io, _store, handler, hash) = setup(b"x");
        io.add_file(PATH, "x");
        let d = desired(&hash).purged();

        let (outcome, _) = reconcile(&io, &handler, &d);
        assert_eq!(outcome, Outcome::Purged);
        assert!(io.content(PATH).is_none());

        let (outcome, _) = reconcile(&io, &handler, &d);
        assert_eq!(outcome, Outcome::Unchanged);
    }

    #[test]
    fn test_create_refuses_existing_path() {
        let store = Arc::new(MemoryStore::new());
        let hash = store.upload(b"x").unwrap();
        let handler = FileHandler::new(store);
        let io = MockIo::new();
        io.add_file(PATH, "x");

        let d = desired(&hash);
        let ctx = HandlerContext::new(&io, &d, false);
        assert!(matches!(handler.create(&ctx, &d), Err(Error::Conflict { .. })));
    }
}
