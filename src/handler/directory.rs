//! Directories: existence, ownership and mode

use declarative::{
    ChangeSet, CrudHandler, CurrentState, Error, FileKind, HandlerContext, ResourceDescriptor,
    Result,
};

use super::{apply_ownership, apply_permissions, path_of, stat_attributes};

pub struct DirectoryHandler;

impl CrudHandler for DirectoryHandler {
    fn name(&self) -> &'static str {
        "posix_directory"
    }

    fn managed(&self) -> &'static [&'static str] {
        &["owner", "group", "permissions"]
    }

    fn read(&self, ctx: &HandlerContext, desired: &ResourceDescriptor) -> Result<CurrentState> {
        let path = path_of(desired);
        if !ctx.io.file_exists(path) {
            return Ok(CurrentState::Purged);
        }
        let stat = ctx.io.stat(path)?;
        if stat.kind != FileKind::Directory {
            return Err(Error::conflict(format!(
                "{} exists but is not a directory",
                path.display()
            )));
        }
        Ok(CurrentState::Present(stat_attributes(&stat)))
    }

    fn create(&self, ctx: &HandlerContext, desired: &ResourceDescriptor) -> Result<()> {
        ctx.io.mkdir(path_of(desired))?;
        apply_permissions(ctx, desired)?;
        apply_ownership(ctx, desired)
    }

    fn update(
        &self,
        ctx: &HandlerContext,
        desired: &ResourceDescriptor,
        changes: &ChangeSet,
    ) -> Result<()> {
        if changes.contains("permissions") {
            apply_permissions(ctx, desired)?;
        }
        if changes.contains_any(&["owner", "group"]) {
            apply_ownership(ctx, desired)?;
        }
        Ok(())
    }

    /// Non-recursive: a directory with content is left in place and fails
    fn delete(&self, ctx: &HandlerContext, desired: &ResourceDescriptor) -> Result<()> {
        ctx.io.rmdir(path_of(desired))
    }
}
