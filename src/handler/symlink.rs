//! Symbolic links, identified by the link path (`target`)

use std::path::Path;

use declarative::{
    Attributes, ChangeSet, CrudHandler, CurrentState, Error, HandlerContext, HostIo,
    ResourceDescriptor, Result, Value,
};

use super::path_of;

const LN_PATHS: [&str; 2] = ["/usr/bin/ln", "/bin/ln"];

pub struct SymlinkHandler;

impl CrudHandler for SymlinkHandler {
    fn name(&self) -> &'static str {
        "posix_symlink"
    }

    fn managed(&self) -> &'static [&'static str] {
        &["source"]
    }

    fn available(&self, io: &dyn HostIo) -> bool {
        LN_PATHS.iter().any(|p| io.file_exists(Path::new(p)))
    }

    fn read(&self, ctx: &HandlerContext, desired: &ResourceDescriptor) -> Result<CurrentState> {
        let target = path_of(desired);
        if !ctx.io.file_exists(target) {
            return Ok(CurrentState::Purged);
        }
        if !ctx.io.is_symlink(target) {
            return Err(Error::conflict(format!(
                "the target of {} already exists but is not a symlink",
                ctx.resource()
            )));
        }
        let mut attrs = Attributes::new();
        attrs.insert("source".to_string(), Value::Text(ctx.io.readlink(target)?));
        Ok(CurrentState::Present(attrs))
    }

    fn create(&self, ctx: &HandlerContext, desired: &ResourceDescriptor) -> Result<()> {
        ctx.io.symlink(desired.text("source")?, path_of(desired))
    }

    /// Links cannot be retargeted in place
    fn update(
        &self,
        ctx: &HandlerContext,
        desired: &ResourceDescriptor,
        _changes: &ChangeSet,
    ) -> Result<()> {
        let source = desired.text("source")?;
        let target = path_of(desired);
        ctx.io.remove(target)?;
        ctx.io.symlink(source, target)
    }

    fn delete(&self, ctx: &HandlerContext, desired: &ResourceDescriptor) -> Result<()> {
        ctx.io.remove(path_of(desired))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{Handler, MockIo, Outcome, ResourceKind};

    const TARGET: &str = "/opt/app/current";

    fn desired(source: &str) -> ResourceDescriptor {
        ResourceDescriptor::new(ResourceKind::Symlink, TARGET)
            .with("target", TARGET)
            .with("source", source)
    }

    fn reconcile(io: &MockIo, d: &ResourceDescriptor) -> Result<(Outcome, ChangeSet)> {
        let ctx = HandlerContext::new(io, d, false);
        Handler::crud(SymlinkHandler).reconcile(&ctx, d)
    }

    #[test]
    fn test_available_with_ln() {
        let io = MockIo::new();
        assert!(!SymlinkHandler.available(&io));
        io.add_binary("/bin/ln");
        assert!(SymlinkHandler.available(&io));
    }

    #[test]
    fn test_create_and_retarget() {
        let io = MockIo::new();
        let (outcome, _) = reconcile(&io, &desired("/opt/app/releases/41")).unwrap();
        assert_eq!(outcome, Outcome::Created);

        let (outcome, changes) = reconcile(&io, &desired("/opt/app/releases/42")).unwrap();
        assert_eq!(outcome, Outcome::Updated);
        assert_eq!(
            changes.get("source").unwrap().current,
            Some(Value::from("/opt/app/releases/41"))
        );
        assert_eq!(
            io.readlink(Path::new(TARGET)).unwrap(),
            "/opt/app/releases/42"
        );

        let (outcome, _) = reconcile(&io, &desired("/opt/app/releases/42")).unwrap();
        assert_eq!(outcome, Outcome::Unchanged);
    }

    #[test]
    fn test_regular_file_at_target_is_never_overwritten() {
        let io = MockIo::new();
        io.add_file(TARGET, "precious");

        let err = reconcile(&io, &desired("/opt/app/releases/42")).unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
        assert_eq!(io.content(TARGET).unwrap(), b"precious");

        // Purging does not remove it either
        assert!(reconcile(&io, &desired("x").purged()).is_err());
        assert_eq!(io.content(TARGET).unwrap(), b"precious");
    }

    #[test]
    fn test_purge() {
        let io = MockIo::new();
        io.add_symlink("/opt/app/releases/41", TARGET);
        let (outcome, _) = reconcile(&io, &desired("/opt/app/releases/41").purged()).unwrap();
        assert_eq!(outcome, Outcome::Purged);
        assert!(!io.file_exists(Path::new(TARGET)));
    }
}
