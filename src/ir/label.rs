//! Label identity and the alias-merge rule.
//!
//! A [`Label`] is either a primary binding or — after `assign_label` collapses
//! two labels pointing at the same instruction — an alias sharing the
//! primary's `id`/`name`/`global`. Rather than chasing pointer redirects (as
//! the original source does by mutating two heap records in lock-step), we
//! keep every label in a flat arena indexed by its *original* allocation
//! slot and simply overwrite the alias's fields to mirror the primary's when
//! a merge happens; `Label::id` after a merge no longer matches the slot it
//! lives in, which is the whole point of an alias.

use std::collections::HashSet;

/// A label: either a primary binding or, once merged, an alias sharing its
/// primary's `id`/`name`/`global` fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Label {
    pub id: u32,
    pub name: Option<String>,
    pub global: bool,
    pub is_alias: bool,
}

impl Label {
    fn new(id: u32, name: Option<String>, global: bool) -> Self {
        Label {
            id,
            name,
            global,
            is_alias: false,
        }
    }
}

/// A handle into a [`LabelTable`], stable across aliasing (it always refers
/// to the same arena slot, even if that slot's `id` changes due to a merge).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LabelHandle(u32);

/// Owns every [`Label`] allocated for a single [`crate::ir::Program`].
///
/// There is deliberately no process-wide singleton here: per the
/// "process-wide state → explicit context field" design note, each `Program`
/// owns its own table, so compiling several programs in the same process
/// never leaks identifiers between them.
#[derive(Default)]
pub struct LabelTable {
    labels: Vec<Label>,
    names_in_use: HashSet<String>,
}

fn sanitize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

impl LabelTable {
    pub fn new() -> Self {
        LabelTable {
            labels: Vec::new(),
            names_in_use: HashSet::new(),
        }
    }

    /// Sanitise `name`, keeping only `[A-Za-z0-9_]`, and disambiguate
    /// against every name ever handed out by this table by appending
    /// `_<n>` for the lowest free `n` starting at 0.
    fn dedup_name(&mut self, name: &str) -> String {
        let base = sanitize(name);
        if !self.names_in_use.contains(&base) {
            self.names_in_use.insert(base.clone());
            return base;
        }
        let mut n = 0u32;
        loop {
            let candidate = format!("{base}_{n}");
            if !self.names_in_use.contains(&candidate) {
                self.names_in_use.insert(candidate.clone());
                return candidate;
            }
            n += 1;
        }
    }

    /// Allocate a fresh label, optionally named, `global` if requested by
    /// the caller (`new_label` in the Program API never sets `global`
    /// itself; `_start` is special-cased by `Program::new`).
    pub fn new_label(&mut self, name: Option<&str>, global: bool) -> LabelHandle {
        let id = self.labels.len() as u32;
        let name = name.map(|n| self.dedup_name(n));
        self.labels.push(Label::new(id, name, global));
        LabelHandle(id)
    }

    pub fn get(&self, handle: LabelHandle) -> &Label {
        &self.labels[handle.0 as usize]
    }

    pub fn get_mut(&mut self, handle: LabelHandle) -> &mut Label {
        &mut self.labels[handle.0 as usize]
    }

    /// Collapse `incoming` into `pending`: the alias-merge rule of spec.md
    /// §3. `incoming` adopts `pending`'s `id`, names are merged (the named
    /// one wins, or the smaller id if both or neither are named), both are
    /// promoted to `global` if either was, and `incoming` is marked
    /// `is_alias`.
    pub fn merge_alias(&mut self, pending: LabelHandle, incoming: LabelHandle) {
        debug_assert_ne!(pending, incoming, "a label cannot alias itself");

        let pending_label = self.get(pending).clone();
        let incoming_label = self.get(incoming).clone();

        let name = match (&pending_label.name, &incoming_label.name) {
            (Some(_), _) => pending_label.name.clone(),
            (None, Some(_)) => incoming_label.name.clone(),
            (None, None) => None,
        };
        // When both are named, or neither is, prefer the smaller id.
        let name = if pending_label.name.is_some() && incoming_label.name.is_some() {
            if pending_label.id <= incoming_label.id {
                pending_label.name.clone()
            } else {
                incoming_label.name.clone()
            }
        } else {
            name
        };

        let global = pending_label.global || incoming_label.global;

        let merged = self.get_mut(pending);
        merged.name = name.clone();
        merged.global = global;

        let alias = self.get_mut(incoming);
        alias.id = pending_label.id;
        alias.name = name;
        alias.global = global;
        alias.is_alias = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_sanitised_and_deduped() {
        let mut t = LabelTable::new();
        let a = t.new_label(Some("foo bar!"), false);
        let b = t.new_label(Some("foo_bar"), false);
        assert_eq!(t.get(a).name.as_deref(), Some("foobar"));
        assert_eq!(t.get(b).name.as_deref(), Some("foo_bar_0"));
    }

    #[test]
    fn alias_merge_promotes_global_and_prefers_named() {
        let mut t = LabelTable::new();
        let pending = t.new_label(None, false);
        let incoming = t.new_label(Some("loop"), true);
        t.merge_alias(pending, incoming);

        assert_eq!(t.get(pending).id, t.get(incoming).id);
        assert_eq!(t.get(pending).name.as_deref(), Some("loop"));
        assert!(t.get(pending).global);
        assert!(t.get(incoming).global);
        assert!(!t.get(pending).is_alias);
        assert!(t.get(incoming).is_alias);
    }

    #[test]
    fn alias_merge_prefers_lowest_id_when_both_named() {
        let mut t = LabelTable::new();
        let pending = t.new_label(Some("first"), false);
        let incoming = t.new_label(Some("second"), false);
        t.merge_alias(pending, incoming);
        assert_eq!(t.get(pending).name.as_deref(), Some("first"));
    }
}
