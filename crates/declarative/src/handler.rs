//! Handler traits - the two reconciliation protocols behind one interface
//!
//! File-like resources and remote entries follow a CRUD protocol: read the
//! current state, then create, update or delete. Services and packages follow
//! a diff-apply protocol: check takes a snapshot, list changes compares it
//! with the descriptor, then apply runs imperative actions.
//! [`Handler`] unifies both so callers only see `reconcile(desired)`.

use crate::context::HandlerContext;
use crate::descriptor::{Attributes, ResourceDescriptor};
use crate::diff::ChangeSet;
use crate::error::Result;
use crate::io::HostIo;
use crate::types::{Outcome, Value};

/// Current state as read by a CRUD handler
#[derive(Debug, Clone, PartialEq)]
pub enum CurrentState {
    /// Entity exists with these attribute values
    Present(Attributes),
    /// Entity does not exist
    Purged,
}

/// CRUD reconciliation protocol
pub trait CrudHandler: Send + Sync {
    /// Handler name shown in reports
    fn name(&self) -> &'static str;

    /// Attribute names this handler reads and changes
    ///
    /// Desired attributes outside this list are never diffed.
    fn managed(&self) -> &'static [&'static str];

    /// Cheap, side-effect-free availability probe
    fn available(&self, _io: &dyn HostIo) -> bool {
        true
    }

    /// Reason to leave this resource alone entirely, if any
    fn ignore(&self, _desired: &ResourceDescriptor) -> Option<String> {
        None
    }

    fn read(&self, ctx: &HandlerContext, desired: &ResourceDescriptor) -> Result<CurrentState>;

    /// Create the entity; fails if something already occupies the identity
    fn create(&self, ctx: &HandlerContext, desired: &ResourceDescriptor) -> Result<()>;

    /// Apply only the attributes in `changes`
    fn update(
        &self,
        ctx: &HandlerContext,
        desired: &ResourceDescriptor,
        changes: &ChangeSet,
    ) -> Result<()>;

    fn delete(&self, ctx: &HandlerContext, desired: &ResourceDescriptor) -> Result<()>;

    fn can_reload(&self) -> bool {
        false
    }

    fn reload(&self, _ctx: &HandlerContext, _desired: &ResourceDescriptor) -> Result<()> {
        Ok(())
    }
}

/// Diff-apply reconciliation protocol
pub trait DiffHandler: Send + Sync {
    /// Handler name shown in reports
    fn name(&self) -> &'static str;

    /// Cheap, side-effect-free availability probe
    fn available(&self, io: &dyn HostIo) -> bool;

    /// Reason to leave this resource alone entirely, if any
    fn ignore(&self, _desired: &ResourceDescriptor) -> Option<String> {
        None
    }

    /// Snapshot of trackable attributes
    ///
    /// Returns `Error::NotFound` if the entity does not exist at all.
    fn check(&self, ctx: &HandlerContext, desired: &ResourceDescriptor) -> Result<Attributes>;

    /// Changes needed to take the `check` snapshot to the desired state
    ///
    /// Empty when converged. Runs no commands.
    fn list_changes(&self, desired: &ResourceDescriptor, current: &Attributes)
    -> Result<ChangeSet>;

    /// Run one action per logical group of changed attributes
    fn apply(
        &self,
        ctx: &HandlerContext,
        desired: &ResourceDescriptor,
        changes: &ChangeSet,
    ) -> Result<Outcome>;

    fn can_reload(&self) -> bool {
        false
    }

    fn reload(&self, _ctx: &HandlerContext, _desired: &ResourceDescriptor) -> Result<()> {
        Ok(())
    }
}

/// A reconciler for one resource kind, speaking either protocol
pub enum Handler {
    Crud(Box<dyn CrudHandler>),
    Diff(Box<dyn DiffHandler>),
}

impl Handler {
    pub fn crud(handler: impl CrudHandler + 'static) -> Self {
        Self::Crud(Box::new(handler))
    }

    pub fn diff(handler: impl DiffHandler + 'static) -> Self {
        Self::Diff(Box::new(handler))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Crud(h) => h.name(),
            Self::Diff(h) => h.name(),
        }
    }

    pub fn available(&self, io: &dyn HostIo) -> bool {
        match self {
            Self::Crud(h) => h.available(io),
            Self::Diff(h) => h.available(io),
        }
    }

    pub fn can_reload(&self) -> bool {
        match self {
            Self::Crud(h) => h.can_reload(),
            Self::Diff(h) => h.can_reload(),
        }
    }

    fn ignore(&self, desired: &ResourceDescriptor) -> Option<String> {
        match self {
            Self::Crud(h) => h.ignore(desired),
            Self::Diff(h) => h.ignore(desired),
        }
    }

    fn reload(&self, ctx: &HandlerContext, desired: &ResourceDescriptor) -> Result<()> {
        match self {
            Self::Crud(h) => h.reload(ctx, desired),
            Self::Diff(h) => h.reload(ctx, desired),
        }
    }

    /// Converge one resource and report what happened
    ///
    /// A resource carrying a deferred value is skipped before anything is
    /// read. In dry-run mode the change-set is computed and the outcome is
    /// `Skipped` whenever something would change.
    pub fn reconcile(
        &self,
        ctx: &HandlerContext,
        desired: &ResourceDescriptor,
    ) -> Result<(Outcome, ChangeSet)> {
        if let Some((attribute, reason)) = desired.deferred_attribute() {
            log::info!("{}: skipped, {attribute} is not yet known", ctx.resource());
            return Ok((
                Outcome::skipped(format!("{attribute} is not yet known: {reason}")),
                ChangeSet::new(),
            ));
        }
        if let Some(reason) = self.ignore(desired) {
            log::info!("{}: skipped, {reason}", ctx.resource());
            return Ok((Outcome::skipped(reason), ChangeSet::new()));
        }

        let (outcome, changes) = match self {
            Self::Crud(h) => reconcile_crud(h.as_ref(), ctx, desired)?,
            Self::Diff(h) => reconcile_diff(h.as_ref(), ctx, desired)?,
        };

        if desired.reload
            && outcome.is_change()
            && self.can_reload()
            && let Err(e) = self.reload(ctx, desired)
        {
            log::warn!("{}: reload failed: {e}", ctx.resource());
        }
        Ok((outcome, changes))
    }
}

/// Desired attributes restricted to the ones a handler manages, in declared order
pub fn managed_attributes(desired: &ResourceDescriptor, names: &[&str]) -> Attributes {
    desired
        .attributes
        .iter()
        .filter(|(name, _)| names.contains(&name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

fn reconcile_crud(
    handler: &dyn CrudHandler,
    ctx: &HandlerContext,
    desired: &ResourceDescriptor,
) -> Result<(Outcome, ChangeSet)> {
    let wanted = managed_attributes(desired, handler.managed());
    match (handler.read(ctx, desired)?, desired.purged) {
        (CurrentState::Purged, true) => Ok((Outcome::Unchanged, ChangeSet::new())),
        (CurrentState::Purged, false) => {
            let mut changes = ChangeSet::between(&Attributes::new(), &wanted);
            changes.insert("purged", Some(Value::Bool(true)), Value::Bool(false));
            if ctx.dry_run {
                return Ok((Outcome::skipped("dry run"), changes));
            }
            handler.create(ctx, desired)?;
            log::info!("{}: created", ctx.resource());
            Ok((Outcome::Created, changes))
        }
        (CurrentState::Present(_), true) => {
            let mut changes = ChangeSet::new();
            changes.insert("purged", Some(Value::Bool(false)), Value::Bool(true));
            if ctx.dry_run {
                return Ok((Outcome::skipped("dry run"), changes));
            }
            handler.delete(ctx, desired)?;
            log::info!("{}: purged", ctx.resource());
            Ok((Outcome::Purged, changes))
        }
        (CurrentState::Present(current), false) => {
            let changes = ChangeSet::between(&current, &wanted);
            if changes.is_empty() {
                return Ok((Outcome::Unchanged, changes));
            }
            if ctx.dry_run {
                return Ok((Outcome::skipped("dry run"), changes));
            }
            handler.update(ctx, desired, &changes)?;
            log::info!("{}: updated {changes}", ctx.resource());
            Ok((Outcome::Updated, changes))
        }
    }
}

fn reconcile_diff(
    handler: &dyn DiffHandler,
    ctx: &HandlerContext,
    desired: &ResourceDescriptor,
) -> Result<(Outcome, ChangeSet)> {
    let current = match handler.check(ctx, desired) {
        Ok(current) => current,
        Err(e) if e.is_not_found() && desired.purged => {
            return Ok((Outcome::Unchanged, ChangeSet::new()));
        }
        Err(e) => return Err(e),
    };
    let changes = handler.list_changes(desired, &current)?;
    if changes.is_empty() {
        return Ok((Outcome::Unchanged, changes));
    }
    if ctx.dry_run {
        return Ok((Outcome::skipped("dry run"), changes));
    }
    let outcome = handler.apply(ctx, desired, &changes)?;
    log::info!("{}: {} {changes}", ctx.resource(), outcome.label());
    Ok((outcome, changes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::mock::MockIo;
    use crate::types::ResourceKind;
    use std::sync::Mutex;

    /// CRUD handler over a single in-memory attribute map
    struct MemoryCrud {
        state: Mutex<Option<Attributes>>,
    }

    impl MemoryCrud {
        fn new(state: Option<Attributes>) -> Self {
            Self {
                state: Mutex::new(state),
            }
        }
    }

    impl CrudHandler for MemoryCrud {
        fn name(&self) -> &'static str {
            "memory"
        }

        fn managed(&self) -> &'static [&'static str] {
            &["value"]
        }

        fn read(&self, _ctx: &HandlerContext, _d: &ResourceDescriptor) -> Result<CurrentState> {
            Ok(match self.state.lock().unwrap().clone() {
                Some(attrs) => CurrentState::Present(attrs),
                None => CurrentState::Purged,
            })
        }

        fn create(&self, _ctx: &HandlerContext, d: &ResourceDescriptor) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            if state.is_some() {
                return Err(Error::conflict("occupied"));
            }
            *state = Some(managed_attributes(d, self.managed()));
            Ok(())
        }

        fn update(&self, _ctx: &HandlerContext, _d: &ResourceDescriptor, c: &ChangeSet) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            let attrs = state.as_mut().ok_or_else(|| Error::not_found("entry"))?;
            for (name, change) in c.iter() {
                attrs.insert(name.clone(), change.desired.clone());
            }
            Ok(())
        }

        fn delete(&self, _ctx: &HandlerContext, _d: &ResourceDescriptor) -> Result<()> {
            *self.state.lock().unwrap() = None;
            Ok(())
        }
    }

    /// Diff handler over one optional attribute, counting snapshots taken
    struct MemoryDiff {
        value: Mutex<Option<String>>,
        checks: Mutex<usize>,
    }

    impl MemoryDiff {
        fn new(value: Option<&str>) -> Self {
            Self {
                value: Mutex::new(value.map(str::to_string)),
                checks: Mutex::new(0),
            }
        }
    }

    impl DiffHandler for MemoryDiff {
        fn name(&self) -> &'static str {
            "memory-diff"
        }

        fn available(&self, _io: &dyn HostIo) -> bool {
            true
        }

        fn check(&self, _ctx: &HandlerContext, _d: &ResourceDescriptor) -> Result<Attributes> {
            *self.checks.lock().unwrap() += 1;
            let value = self.value.lock().unwrap().clone().ok_or_else(|| Error::not_found("entry"))?;
            let mut attrs = Attributes::new();
            attrs.insert("value".into(), Value::from(value));
            Ok(attrs)
        }

        fn list_changes(&self, d: &ResourceDescriptor, current: &Attributes) -> Result<ChangeSet> {
            let mut changes = ChangeSet::new();
            let wanted = d.require("value")?;
            if current.get("value") != Some(wanted) {
                changes.insert("value", current.get("value").cloned(), wanted.clone());
            }
            Ok(changes)
        }

        fn apply(&self, _ctx: &HandlerContext, _d: &ResourceDescriptor, c: &ChangeSet) -> Result<Outcome> {
            let change = c.get("value").ok_or_else(|| Error::not_found("change"))?;
            *self.value.lock().unwrap() = change.desired.as_str().map(str::to_string);
            Ok(Outcome::Updated)
        }
    }

    fn desired(value: &str) -> ResourceDescriptor {
        ResourceDescriptor::new(ResourceKind::File, "/tmp/a").with("value", value)
    }

    #[test]
    fn test_crud_create_then_unchanged() {
        let io = MockIo::new();
        let handler = Handler::crud(MemoryCrud::new(None));
        let d = desired("x");
        let ctx = HandlerContext::new(&io, &d, false);

        let (outcome, changes) = handler.reconcile(&ctx, &d).unwrap();
        assert_eq!(outcome, Outcome::Created);
        assert!(changes.contains("value"));

        let (outcome, changes) = handler.reconcile(&ctx, &d).unwrap();
        assert_eq!(outcome, Outcome::Unchanged);
        assert!(changes.is_empty());
    }

    #[test]
    fn test_crud_update_and_purge() {
        let io = MockIo::new();
        let mut current = Attributes::new();
        current.insert("value".into(), Value::from("old"));
        let handler = Handler::crud(MemoryCrud::new(Some(current)));

        let d = desired("new");
        let ctx = HandlerContext::new(&io, &d, false);
        let (outcome, _) = handler.reconcile(&ctx, &d).unwrap();
        assert_eq!(outcome, Outcome::Updated);

        let gone = desired("new").purged();
        let (outcome, _) = handler.reconcile(&ctx, &gone).unwrap();
        assert_eq!(outcome, Outcome::Purged);
        let (outcome, _) = handler.reconcile(&ctx, &gone).unwrap();
        assert_eq!(outcome, Outcome::Unchanged);
    }

    #[test]
    fn test_deferred_skips_before_read() {
        let io = MockIo::new();
        let handler = Handler::crud(MemoryCrud::new(None));
        let d = ResourceDescriptor::new(ResourceKind::File, "/tmp/a")
            .with("value", Value::deferred("db address"));
        let ctx = HandlerContext::new(&io, &d, false);

        let (outcome, _) = handler.reconcile(&ctx, &d).unwrap();
        assert!(matches!(outcome, Outcome::Skipped { .. }));
        let (outcome, _) = handler.reconcile(&ctx, &desired("x")).unwrap();
        assert_eq!(outcome, Outcome::Created);
    }

    #[test]
    fn test_diff_changes_come_from_one_snapshot() {
        let io = MockIo::new();
        let memory = MemoryDiff::new(Some("old"));
        let d = desired("new");
        let ctx = HandlerContext::new(&io, &d, false);

        let (outcome, changes) = reconcile_diff(&memory, &ctx, &d).unwrap();
        assert_eq!(outcome, Outcome::Updated);
        assert_eq!(changes.get("value").unwrap().current, Some(Value::from("old")));
        assert_eq!(*memory.checks.lock().unwrap(), 1);

        let (outcome, _) = reconcile_diff(&memory, &ctx, &d).unwrap();
        assert_eq!(outcome, Outcome::Unchanged);
        assert_eq!(*memory.checks.lock().unwrap(), 2);
    }

    #[test]
    fn test_diff_missing_entity() {
        let io = MockIo::new();
        let memory = MemoryDiff::new(None);
        let d = desired("x");
        let ctx = HandlerContext::new(&io, &d, false);

        assert!(reconcile_diff(&memory, &ctx, &d).unwrap_err().is_not_found());
        let (outcome, _) = reconcile_diff(&memory, &ctx, &d.purged()).unwrap();
        assert_eq!(outcome, Outcome::Unchanged);
    }

    #[test]
    fn test_dry_run_reports_changes_without_applying() {
        let io = MockIo::new();
        let handler = Handler::crud(MemoryCrud::new(None));
        let d = desired("x");
        let ctx = HandlerContext::new(&io, &d, true);

        let (outcome, changes) = handler.reconcile(&ctx, &d).unwrap();
        assert_eq!(outcome, Outcome::skipped("dry run"));
        assert!(!changes.is_empty());
        let (outcome, _) = handler.reconcile(&ctx, &d).unwrap();
        assert_eq!(outcome, Outcome::skipped("dry run"));
    }
}
