//! Value propagation between paths and models

use super::{effective, Document};
use crate::core::error::{XmpError, XmpResult};
use crate::core::flags::SyncFlags;
use crate::core::xpath::Path;
use crate::model::path::{self as model_path, Outcome};
use crate::model::Model;

/// Pure value conversion applied while syncing
pub type Converter<'a> = &'a dyn Fn(&str) -> String;

impl Document {
    /// Copy the value at `source` to `dest` when `flags` allow it
    ///
    /// Equal values are left alone. An empty source needs `DELETE`, an empty
    /// destination needs `CREATE` and a populated one needs `REPLACE`,
    /// `DELETE`, `APPEND` or `UNIQUE`. Transitions the flags do not allow are
    /// skipped without error. An allowed overwrite of a list destination
    /// still follows the list rules: `UNIQUE` adds a missing value, `APPEND`
    /// always adds, otherwise the list is replaced.
    ///
    /// ```
    /// use xmpdoc::{Document, SyncFlags};
    ///
    /// let mut doc = Document::new();
    /// doc.set("xmp:CreatorTool", "Camera 1.0", SyncFlags::DEFAULT).unwrap();
    /// doc.sync("xmp:CreatorTool", "xmpMM:DocumentID", SyncFlags::CREATE).unwrap();
    /// assert_eq!(doc.get("xmpMM:DocumentID").unwrap(), "Camera 1.0");
    /// ```
    pub fn sync(&mut self, source: &str, dest: &str, flags: SyncFlags) -> XmpResult<()> {
        self.sync_with(&Path::parse(source)?, &Path::parse(dest)?, flags, None)
    }

    /// [`Document::sync`] with parsed paths and an optional converter
    pub fn sync_with(
        &mut self,
        source: &Path,
        dest: &Path,
        flags: SyncFlags,
        converter: Option<Converter<'_>>,
    ) -> XmpResult<()> {
        let nofail = flags.contains(SyncFlags::NOFAIL);
        let result = self.sync_path(source, dest, effective(flags), converter);
        suppress(result, nofail, dest)
    }

    /// Sync from this document into a detached model
    pub fn sync_to(
        &self,
        model: &mut dyn Model,
        source: &Path,
        dest: &Path,
        flags: SyncFlags,
        converter: Option<Converter<'_>>,
    ) -> XmpResult<()> {
        let nofail = flags.contains(SyncFlags::NOFAIL);
        let result = self.sync_model_path(model, source, dest, effective(flags), converter);
        suppress(result, nofail, dest)
    }

    /// Let every bound model reconcile itself with every other one
    pub fn sync_models(&mut self) -> XmpResult<()> {
        let tops: Vec<_> = self.tree.children(self.root).to_vec();
        let mut models = Vec::new();
        for top in tops {
            if let Some(model) = self.tree[top].model.take() {
                models.push((top, model));
            }
        }

        let mut result = Ok(());
        'outer: for i in 0..models.len() {
            let (left, rest) = models.split_at_mut(i);
            let Some(((_, current), right)) = rest.split_first_mut() else {
                break;
            };
            for (_, other) in left.iter().chain(right.iter()) {
                if let Err(e) = current.sync_model(&**other) {
                    result = Err(e);
                    break 'outer;
                }
            }
        }

        for (top, model) in models {
            self.tree[top].model = Some(model);
        }
        if result.is_ok() {
            self.dirty = true;
        }
        result
    }

    fn sync_path(
        &mut self,
        source: &Path,
        dest: &Path,
        flags: SyncFlags,
        converter: Option<Converter<'_>>,
    ) -> XmpResult<()> {
        let current = self.value_or_empty(source)?;
        let existing = self.value_or_empty(dest)?;
        match gate(&current, &existing, flags, converter) {
            Some(value) => self.apply_path(dest, &value, authorized(flags, &value, &existing)),
            None => Ok(()),
        }
    }

    fn sync_model_path(
        &self,
        model: &mut dyn Model,
        source: &Path,
        dest: &Path,
        flags: SyncFlags,
        converter: Option<Converter<'_>>,
    ) -> XmpResult<()> {
        let current = self.value_or_empty(source)?;
        let existing = model_path::lookup(&self.ctx, model.as_record(), dest)?.unwrap_or_default();
        let Some(value) = gate(&current, &existing, flags, converter) else {
            return Ok(());
        };
        let flags = authorized(flags, &value, &existing);
        match model_path::apply(&self.ctx, model.as_record_mut(), dest, &value, flags)? {
            Outcome::NotFound => Err(XmpError::path_not_found(dest)),
            Outcome::Changed | Outcome::Unchanged => Ok(()),
        }
    }

    fn value_or_empty(&self, path: &Path) -> XmpResult<String> {
        match self.get_path(path) {
            Err(XmpError::NotFound(_)) => Ok(String::new()),
            result => result,
        }
    }
}

/// Value to write to a destination holding `existing`, if any
fn gate(
    current: &str,
    existing: &str,
    flags: SyncFlags,
    converter: Option<Converter<'_>>,
) -> Option<String> {
    if current == existing {
        return None;
    }
    if current.is_empty() && !flags.contains(SyncFlags::DELETE) {
        return None;
    }
    if existing.is_empty() && !current.is_empty() && !flags.contains(SyncFlags::CREATE) {
        return None;
    }
    if !existing.is_empty() && !flags.can_overwrite() {
        return None;
    }
    let value = match converter {
        Some(convert) if !current.is_empty() => convert(current),
        _ => current.to_string(),
    };
    if value == existing || (value.is_empty() && !flags.contains(SyncFlags::DELETE)) {
        return None;
    }
    Some(value)
}

/// Flags letting the path engine perform a write `gate` approved
///
/// Overwrites pass on any of the overwrite flags, the path engine wants
/// `REPLACE` for them.
fn authorized(flags: SyncFlags, value: &str, existing: &str) -> SyncFlags {
    if value.is_empty() || existing.is_empty() {
        flags
    } else {
        flags | SyncFlags::REPLACE
    }
}

fn suppress(result: XmpResult<()>, nofail: bool, dest: &Path) -> XmpResult<()> {
    match result {
        Err(e) if nofail && !e.is_parse_error() => {
            tracing::debug!(path = %dest, error = %e, "ignoring failed sync");
            Ok(())
        }
        result => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate() {
        let all = SyncFlags::DEFAULT;
        assert_eq!(gate("a", "a", all, None), None);
        assert_eq!(gate("a", "", all, None).as_deref(), Some("a"));
        assert_eq!(gate("a", "", SyncFlags::REPLACE, None), None);
        assert_eq!(gate("a", "b", SyncFlags::CREATE, None), None);
        assert_eq!(gate("", "b", SyncFlags::CREATE | SyncFlags::REPLACE, None), None);
        assert_eq!(gate("", "b", SyncFlags::DELETE, None).as_deref(), Some(""));

        let upper = |s: &str| s.to_uppercase();
        assert_eq!(gate("a", "", all, Some(&upper)).as_deref(), Some("A"));
        assert_eq!(gate("a", "A", all, Some(&upper)), None);
        let blank = |_: &str| String::new();
        assert_eq!(gate("a", "b", SyncFlags::REPLACE, Some(&blank)), None);
    }

    #[test]
    fn test_authorized() {
        assert_eq!(authorized(SyncFlags::UNIQUE, "a", "b"), SyncFlags::UNIQUE | SyncFlags::REPLACE);
        assert_eq!(authorized(SyncFlags::CREATE, "a", ""), SyncFlags::CREATE);
        assert_eq!(authorized(SyncFlags::DELETE, "", "b"), SyncFlags::DELETE);
    }
}
