//! Entity graph: classes, members and vars for both sides, with match
//! links, hierarchy sets and the classifier cache.
//!
//! The graph is arena-owned: entities live in `Vec`s on [`MatchEnv`] and
//! reference each other through copyable ids. Back-references (member to
//! class, var to method) are lookup relations, not ownership. After
//! construction only match links and tentative/mapped names mutate, and
//! the mutation primitives are crate-private so every write goes through
//! the match arbiter.

mod builder;
mod class;
mod ids;
mod insn;
mod member;

pub use builder::{ClassDecl, FieldDecl, GraphBuilder, MethodDecl, VarDecl};
pub use class::Class;
pub use ids::{ClassId, FieldId, MethodId, Side, VarId};
pub use insn::{Insn, Operand};
pub use member::{Field, Method, MethodVar};

use std::collections::HashMap;

use crate::cache::ClassifierCache;

/// The populated two-sided entity graph.
#[derive(Debug)]
pub struct MatchEnv {
    pub(crate) classes: Vec<Class>,
    pub(crate) methods: Vec<Method>,
    pub(crate) fields: Vec<Field>,
    pub(crate) vars: Vec<MethodVar>,
    pub(crate) classes_a: Vec<ClassId>,
    pub(crate) classes_b: Vec<ClassId>,
    pub(crate) by_id_a: HashMap<String, ClassId>,
    pub(crate) by_id_b: HashMap<String, ClassId>,
    pub(crate) hier_groups: Vec<Vec<MethodId>>,
    pub(crate) cache: ClassifierCache,
}

impl MatchEnv {
    /// Input classes on side A, in declaration order.
    pub fn classes_a(&self) -> &[ClassId] {
        &self.classes_a
    }

    /// Input classes on side B, in declaration order.
    pub fn classes_b(&self) -> &[ClassId] {
        &self.classes_b
    }

    pub fn classes(&self, side: Side) -> &[ClassId] {
        match side {
            Side::A => &self.classes_a,
            Side::B => &self.classes_b,
        }
    }

    pub fn class(&self, id: ClassId) -> &Class {
        &self.classes[id.index()]
    }

    pub fn method(&self, id: MethodId) -> &Method {
        &self.methods[id.index()]
    }

    pub fn field(&self, id: FieldId) -> &Field {
        &self.fields[id.index()]
    }

    pub fn var(&self, id: VarId) -> &MethodVar {
        &self.vars[id.index()]
    }

    /// Resolve a class by type descriptor on the given side.
    pub fn cls_by_id(&self, side: Side, id: &str) -> Option<ClassId> {
        match side {
            Side::A => self.by_id_a.get(id).copied(),
            Side::B => self.by_id_b.get(id).copied(),
        }
    }

    /// Side-B class lookup by descriptor, the peer resolution used by the
    /// unobfuscated pre-pass.
    pub fn local_cls_by_id_b(&self, id: &str) -> Option<ClassId> {
        self.by_id_b.get(id).copied()
    }

    /// Method lookup by composite id (name + descriptor).
    pub fn method_by_id(&self, cls: ClassId, id: &str) -> Option<MethodId> {
        self.class(cls)
            .methods
            .iter()
            .copied()
            .find(|&m| self.method(m).id() == id)
    }

    /// Name-only method lookup; resolves only when exactly one candidate
    /// carries the name.
    pub fn method_by_name(&self, cls: ClassId, name: &str) -> Option<MethodId> {
        let mut found = None;

        for &m in &self.class(cls).methods {
            if self.method(m).name == name {
                if found.is_some() {
                    return None;
                }

                found = Some(m);
            }
        }

        found
    }

    pub fn field_by_id(&self, cls: ClassId, id: &str) -> Option<FieldId> {
        self.class(cls)
            .fields
            .iter()
            .copied()
            .find(|&f| self.field(f).id() == id)
    }

    /// Name-only field lookup; resolves only when the name is unique.
    pub fn field_by_name(&self, cls: ClassId, name: &str) -> Option<FieldId> {
        let mut found = None;

        for &f in &self.class(cls).fields {
            if self.field(f).name == name {
                if found.is_some() {
                    return None;
                }

                found = Some(f);
            }
        }

        found
    }

    /// All methods overriding or overridden by `m` along supertype and
    /// subtype chains, `m` included.
    pub fn hierarchy_members(&self, m: MethodId) -> &[MethodId] {
        &self.hier_groups[self.method(m).hier_group as usize]
    }

    /// Any member of `m`'s hierarchy set that currently has a match.
    pub fn matched_hierarchy_member(&self, m: MethodId) -> Option<MethodId> {
        self.hierarchy_members(m)
            .iter()
            .copied()
            .find(|&h| self.method(h).matched.is_some())
    }

    /// Effective mapped name: the entity's own, else its peer's, else none.
    pub fn class_mapped_name(&self, id: ClassId) -> Option<&str> {
        let cls = self.class(id);

        cls.mapped_name.as_deref().or_else(|| {
            cls.matched
                .and_then(|peer| self.class(peer).mapped_name.as_deref())
        })
    }

    pub fn method_mapped_name(&self, id: MethodId) -> Option<&str> {
        let m = self.method(id);

        m.mapped_name.as_deref().or_else(|| {
            m.matched
                .and_then(|peer| self.method(peer).mapped_name.as_deref())
        })
    }

    pub fn field_mapped_name(&self, id: FieldId) -> Option<&str> {
        let f = self.field(id);

        f.mapped_name.as_deref().or_else(|| {
            f.matched
                .and_then(|peer| self.field(peer).mapped_name.as_deref())
        })
    }

    pub fn var_mapped_name(&self, id: VarId) -> Option<&str> {
        let v = self.var(id);

        v.mapped_name.as_deref().or_else(|| {
            v.matched
                .and_then(|peer| self.var(peer).mapped_name.as_deref())
        })
    }

    /// The entity's own mapped name, without falling back to the peer.
    pub fn method_own_mapped_name(&self, id: MethodId) -> Option<&str> {
        self.method(id).mapped_name.as_deref()
    }

    pub fn var_own_mapped_name(&self, id: VarId) -> Option<&str> {
        self.var(id).mapped_name.as_deref()
    }

    /// Whether every arg of the method has an effective mapped name.
    pub fn has_all_args_mapped(&self, m: MethodId) -> bool {
        self.method(m)
            .args
            .iter()
            .all(|&arg| self.var_mapped_name(arg).is_some())
    }

    /// Matched, with every real member matched as well.
    pub fn fully_matched(&self, id: ClassId) -> bool {
        let cls = self.class(id);

        if cls.matched.is_none() {
            return false;
        }

        cls.methods
            .iter()
            .all(|&m| !self.method(m).real || self.method(m).matched.is_some())
            && cls
                .fields
                .iter()
                .all(|&f| !self.field(f).real || self.field(f).matched.is_some())
    }

    pub fn cache(&self) -> &ClassifierCache {
        &self.cache
    }

    // Display strings for log lines.

    pub fn class_display(&self, id: ClassId) -> &str {
        &self.class(id).name
    }

    pub fn method_display(&self, id: MethodId) -> String {
        let m = self.method(id);
        format!("{}.{}{}", self.class(m.class).name, m.name, m.desc)
    }

    pub fn field_display(&self, id: FieldId) -> String {
        let f = self.field(id);
        format!("{}.{}", self.class(f.class).name, f.name)
    }

    pub fn var_display(&self, id: VarId) -> String {
        let v = self.var(id);
        format!("{}:{}", self.method_display(v.method), v.index)
    }

    // Mutation primitives, arbiter-only.

    pub(crate) fn set_class_match(&mut self, id: ClassId, peer: Option<ClassId>) {
        self.classes[id.index()].matched = peer;
    }

    pub(crate) fn set_method_match(&mut self, id: MethodId, peer: Option<MethodId>) {
        self.methods[id.index()].matched = peer;
    }

    pub(crate) fn set_field_match(&mut self, id: FieldId, peer: Option<FieldId>) {
        self.fields[id.index()].matched = peer;
    }

    pub(crate) fn set_var_match(&mut self, id: VarId, peer: Option<VarId>) {
        self.vars[id.index()].matched = peer;
    }

    pub(crate) fn set_class_mapped_name(&mut self, id: ClassId, name: Option<String>) {
        self.classes[id.index()].mapped_name = name;
    }

    pub(crate) fn set_method_mapped_name(&mut self, id: MethodId, name: Option<String>) {
        self.methods[id.index()].mapped_name = name;
    }

    pub(crate) fn set_field_mapped_name(&mut self, id: FieldId, name: Option<String>) {
        self.fields[id.index()].mapped_name = name;
    }

    pub(crate) fn set_var_mapped_name(&mut self, id: VarId, name: Option<String>) {
        self.vars[id.index()].mapped_name = name;
    }

    pub(crate) fn set_class_tmp_name(&mut self, id: ClassId, name: Option<String>) {
        self.classes[id.index()].tmp_name = name;
    }

    pub(crate) fn set_method_tmp_name(&mut self, id: MethodId, name: Option<String>) {
        self.methods[id.index()].tmp_name = name;
    }

    pub(crate) fn set_field_tmp_name(&mut self, id: FieldId, name: Option<String>) {
        self.fields[id.index()].tmp_name = name;
    }

    pub(crate) fn set_var_tmp_name(&mut self, id: VarId, name: Option<String>) {
        self.vars[id.index()].tmp_name = name;
    }
}
