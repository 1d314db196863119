//! Match arbiter: the only component that mutates the entity graph.
//!
//! Every operation checks its contract before touching anything, logs a
//! single line, re-establishes link symmetry on both sides, runs the
//! cascades (arrays, unobfuscated members, method hierarchies), and
//! clears the classifier cache.

mod auto;
mod merge;
mod propagation;
mod status;

pub use status::MatchingStatus;

use log::info;

use crate::config::MatcherConfig;
use crate::errors::{Error, Result};
use crate::graph::{ClassId, FieldId, MatchEnv, MethodId, VarId};

/// The matching engine: owns the graph, arbitrates all mutations, and
/// drives the automatic passes.
pub struct Matcher {
    pub(crate) env: MatchEnv,
    pub(crate) config: MatcherConfig,
}

impl Matcher {
    pub fn new(env: MatchEnv) -> Self {
        Self {
            env,
            config: MatcherConfig::default(),
        }
    }

    pub fn with_config(env: MatchEnv, config: MatcherConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { env, config })
    }

    pub fn env(&self) -> &MatchEnv {
        &self.env
    }

    pub fn into_env(self) -> MatchEnv {
        self.env
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Pair every class whose identifier survived obfuscation on both
    /// sides. Run once after loading, before any scoring pass.
    pub fn match_unobfuscated(&mut self) -> Result<()> {
        let pairs: Vec<(ClassId, ClassId)> = self
            .env
            .classes_a()
            .iter()
            .filter(|&&cls| !self.env.class(cls).is_name_obfuscated())
            .filter_map(|&cls| {
                let peer = self.env.local_cls_by_id_b(self.env.class(cls).id())?;

                (!self.env.class(peer).is_name_obfuscated()).then_some((cls, peer))
            })
            .collect();

        for (a, b) in pairs {
            self.match_classes(a, b)?;
        }

        Ok(())
    }

    /// Match two classes and cascade to arrays and unobfuscated members.
    pub fn match_classes(&mut self, a: ClassId, b: ClassId) -> Result<()> {
        let (dims_a, dims_b) = (self.env.class(a).array_dims(), self.env.class(b).array_dims());

        if dims_a != dims_b {
            return Err(Error::ArrayDimensionMismatch {
                a: self.env.class_display(a).to_string(),
                a_dims: dims_a,
                b: self.env.class_display(b).to_string(),
                b_dims: dims_b,
            });
        }

        if self.env.class(a).matched() == Some(b) {
            return Ok(());
        }

        info!(
            "match class {} -> {}{}",
            self.env.class_display(a),
            self.env.class_display(b),
            mapped_suffix(self.env.class_mapped_name(a))
        );

        if let Some(prev) = self.env.class(a).matched() {
            self.env.set_class_match(prev, None);
            self.unmatch_members_quiet(a);
        }

        if let Some(prev) = self.env.class(b).matched() {
            self.env.set_class_match(prev, None);
            self.unmatch_members_quiet(b);
        }

        self.env.set_class_match(a, Some(b));
        self.env.set_class_match(b, Some(a));

        self.cascade_arrays(a, b)?;
        self.cascade_members(a, b)?;

        self.env.cache().clear();
        Ok(())
    }

    fn cascade_arrays(&mut self, a: ClassId, b: ClassId) -> Result<()> {
        if self.env.class(a).is_array() {
            let elem_a = self.env.class(a).element().expect("array without element");
            let elem_b = self.env.class(b).element().expect("array without element");

            if !self.env.class(elem_a).has_match() {
                self.match_classes(elem_a, elem_b)?;
            }

            return Ok(());
        }

        for array_a in self.env.class(a).arrays().to_vec() {
            let dims = self.env.class(array_a).array_dims();

            let peer = self
                .env
                .class(b)
                .arrays()
                .iter()
                .copied()
                .find(|&array_b| {
                    !self.env.class(array_b).has_match()
                        && self.env.class(array_b).array_dims() == dims
                });

            if let Some(array_b) = peer {
                self.match_classes(array_a, array_b)?;
            }
        }

        Ok(())
    }

    /// Bind members that are not obfuscated, or that the method hierarchy
    /// already pins down.
    fn cascade_members(&mut self, a: ClassId, b: ClassId) -> Result<()> {
        for sm in self.env.class(a).methods().to_vec() {
            if !self.env.method(sm).is_name_obfuscated() {
                let dst = self
                    .env
                    .method_by_id(b, &self.env.method(sm).id())
                    .or_else(|| self.env.method_by_name(b, self.env.method(sm).name()));

                if let Some(dst) = dst {
                    self.match_methods(sm, dst)?;
                    continue;
                }
            }

            let Some(matched_sibling) = self.env.matched_hierarchy_member(sm) else {
                continue;
            };

            let peer = self
                .env
                .method(matched_sibling)
                .matched()
                .expect("matched hierarchy member has a peer");
            let dst_hierarchy = self.env.hierarchy_members(peer);

            if dst_hierarchy.len() <= 1 {
                continue;
            }

            let dst = self
                .env
                .class(b)
                .methods()
                .iter()
                .copied()
                .find(|dst| dst_hierarchy.contains(dst));

            if let Some(dst) = dst {
                self.match_methods(sm, dst)?;
            }
        }

        for sf in self.env.class(a).fields().to_vec() {
            if self.env.field(sf).is_name_obfuscated() {
                continue;
            }

            let dst = self
                .env
                .field_by_id(b, &self.env.field(sf).id())
                .or_else(|| self.env.field_by_name(b, self.env.field(sf).name()));

            if let Some(dst) = dst {
                self.match_fields(sf, dst)?;
            }
        }

        Ok(())
    }

    /// Match two methods and cascade across their hierarchy sets.
    pub fn match_methods(&mut self, a: MethodId, b: MethodId) -> Result<()> {
        let owner_match = self.env.class(self.env.method(a).class()).matched();

        if owner_match != Some(self.env.method(b).class()) {
            return Err(Error::UnmatchedOwners {
                kind: "method",
                a: self.env.method_display(a),
                b: self.env.method_display(b),
            });
        }

        if self.env.method(a).matched() == Some(b) {
            return Ok(());
        }

        info!(
            "match method {} -> {}{}",
            self.env.method_display(a),
            self.env.method_display(b),
            mapped_suffix(self.env.method_mapped_name(a))
        );

        if let Some(prev) = self.env.method(a).matched() {
            self.env.set_method_match(prev, None);
            self.unmatch_vars_quiet(a);
            self.unmatch_vars_quiet(prev);
        }

        if let Some(prev) = self.env.method(b).matched() {
            self.env.set_method_match(prev, None);
            self.unmatch_vars_quiet(b);
            self.unmatch_vars_quiet(prev);
        }

        self.env.set_method_match(a, Some(b));
        self.env.set_method_match(b, Some(a));

        self.cascade_hierarchy(a, b)?;

        self.env.cache().clear();
        Ok(())
    }

    /// Bind unmatched hierarchy siblings whose classes are already matched
    /// and whose peer class holds a member of `b`'s hierarchy set.
    fn cascade_hierarchy(&mut self, a: MethodId, b: MethodId) -> Result<()> {
        let src_hierarchy = self.env.hierarchy_members(a).to_vec();

        if src_hierarchy.len() <= 1 {
            return Ok(());
        }

        let dst_hierarchy = self.env.hierarchy_members(b).to_vec();

        for sm in src_hierarchy {
            if self.env.method(sm).has_match() {
                continue;
            }

            let Some(cls_match) = self.env.class(self.env.method(sm).class()).matched() else {
                continue;
            };

            let dst = self
                .env
                .class(cls_match)
                .methods()
                .iter()
                .copied()
                .find(|dst| dst_hierarchy.contains(dst));

            if let Some(dst) = dst {
                self.match_methods(sm, dst)?;
            }
        }

        Ok(())
    }

    /// Match two fields.
    pub fn match_fields(&mut self, a: FieldId, b: FieldId) -> Result<()> {
        let owner_match = self.env.class(self.env.field(a).class()).matched();

        if owner_match != Some(self.env.field(b).class()) {
            return Err(Error::UnmatchedOwners {
                kind: "field",
                a: self.env.field_display(a),
                b: self.env.field_display(b),
            });
        }

        if self.env.field(a).matched() == Some(b) {
            return Ok(());
        }

        info!(
            "match field {} -> {}{}",
            self.env.field_display(a),
            self.env.field_display(b),
            mapped_suffix(self.env.field_mapped_name(a))
        );

        if let Some(prev) = self.env.field(a).matched() {
            self.env.set_field_match(prev, None);
        }

        if let Some(prev) = self.env.field(b).matched() {
            self.env.set_field_match(prev, None);
        }

        self.env.set_field_match(a, Some(b));
        self.env.set_field_match(b, Some(a));

        self.env.cache().clear();
        Ok(())
    }

    /// Match two args, or two locals, of matched methods.
    pub fn match_vars(&mut self, a: VarId, b: VarId) -> Result<()> {
        let owner_match = self.env.method(self.env.var(a).method()).matched();

        if owner_match != Some(self.env.var(b).method()) {
            return Err(Error::UnmatchedVarOwners {
                a: self.env.var_display(a),
                b: self.env.var_display(b),
            });
        }

        if self.env.var(a).is_arg() != self.env.var(b).is_arg() {
            return Err(Error::VarKindMismatch {
                a: self.env.var_display(a),
                b: self.env.var_display(b),
            });
        }

        if self.env.var(a).matched() == Some(b) {
            return Ok(());
        }

        info!(
            "match {} {} -> {}{}",
            var_kind(self.env.var(a).is_arg()),
            self.env.var_display(a),
            self.env.var_display(b),
            mapped_suffix(self.env.var_mapped_name(a))
        );

        if let Some(prev) = self.env.var(a).matched() {
            self.env.set_var_match(prev, None);
        }

        if let Some(prev) = self.env.var(b).matched() {
            self.env.set_var_match(prev, None);
        }

        self.env.set_var_match(a, Some(b));
        self.env.set_var_match(b, Some(a));

        self.env.cache().clear();
        Ok(())
    }

    /// Drop a class match, all member/var matches under it, and the
    /// matches of its array chain.
    pub fn unmatch_class(&mut self, cls: ClassId) -> Result<()> {
        let Some(peer) = self.env.class(cls).matched() else {
            return Ok(());
        };

        info!(
            "unmatch class {} (was {}){}",
            self.env.class_display(cls),
            self.env.class_display(peer),
            mapped_suffix(self.env.class_mapped_name(cls))
        );

        self.env.set_class_match(peer, None);
        self.env.set_class_match(cls, None);

        self.unmatch_members_quiet(cls);

        if self.env.class(cls).is_array() {
            let element = self.env.class(cls).element().expect("array without element");
            self.unmatch_class(element)?;
        } else {
            for array in self.env.class(cls).arrays().to_vec() {
                self.unmatch_class(array)?;
            }
        }

        self.env.cache().clear();
        Ok(())
    }

    /// Drop a method match; cascades to its args and every matched
    /// member of its hierarchy set.
    pub fn unmatch_method(&mut self, m: MethodId) -> Result<()> {
        let Some(peer) = self.env.method(m).matched() else {
            return Ok(());
        };

        info!(
            "unmatch method {} (was {}){}",
            self.env.method_display(m),
            self.env.method_display(peer),
            mapped_suffix(self.env.method_mapped_name(m))
        );

        for arg in self.env.method(m).args().to_vec() {
            self.unmatch_var(arg)?;
        }

        self.env.set_method_match(peer, None);
        self.env.set_method_match(m, None);

        for sibling in self.env.hierarchy_members(m).to_vec() {
            self.unmatch_method(sibling)?;
        }

        self.env.cache().clear();
        Ok(())
    }

    /// Drop a field match.
    pub fn unmatch_field(&mut self, f: FieldId) -> Result<()> {
        let Some(peer) = self.env.field(f).matched() else {
            return Ok(());
        };

        info!(
            "unmatch field {} (was {}){}",
            self.env.field_display(f),
            self.env.field_display(peer),
            mapped_suffix(self.env.field_mapped_name(f))
        );

        self.env.set_field_match(peer, None);
        self.env.set_field_match(f, None);

        self.env.cache().clear();
        Ok(())
    }

    /// Drop a var match.
    pub fn unmatch_var(&mut self, v: VarId) -> Result<()> {
        let Some(peer) = self.env.var(v).matched() else {
            return Ok(());
        };

        info!(
            "unmatch {} {} (was {}){}",
            var_kind(self.env.var(v).is_arg()),
            self.env.var_display(v),
            self.env.var_display(peer),
            mapped_suffix(self.env.var_mapped_name(v))
        );

        self.env.set_var_match(peer, None);
        self.env.set_var_match(v, None);

        self.env.cache().clear();
        Ok(())
    }

    // Mapped and tentative names are assigned through the arbiter so the
    // graph's mutation surface stays in one place.

    pub fn set_class_mapped_name(&mut self, id: ClassId, name: Option<String>) {
        self.env.set_class_mapped_name(id, name);
    }

    pub fn set_method_mapped_name(&mut self, id: MethodId, name: Option<String>) {
        self.env.set_method_mapped_name(id, name);
    }

    pub fn set_field_mapped_name(&mut self, id: FieldId, name: Option<String>) {
        self.env.set_field_mapped_name(id, name);
    }

    pub fn set_var_mapped_name(&mut self, id: VarId, name: Option<String>) {
        self.env.set_var_mapped_name(id, name);
    }

    pub fn set_class_tmp_name(&mut self, id: ClassId, name: Option<String>) {
        self.env.set_class_tmp_name(id, name);
    }

    pub fn set_method_tmp_name(&mut self, id: MethodId, name: Option<String>) {
        self.env.set_method_tmp_name(id, name);
    }

    pub fn set_field_tmp_name(&mut self, id: FieldId, name: Option<String>) {
        self.env.set_field_tmp_name(id, name);
    }

    pub fn set_var_tmp_name(&mut self, id: VarId, name: Option<String>) {
        self.env.set_var_tmp_name(id, name);
    }

    /// Silently drop every member and var match under a class. Used when
    /// a class match is rebound or removed; the class-level log line
    /// covers the cascade.
    fn unmatch_members_quiet(&mut self, cls: ClassId) {
        for m in self.env.class(cls).methods().to_vec() {
            if let Some(peer) = self.env.method(m).matched() {
                self.env.set_method_match(peer, None);
                self.env.set_method_match(m, None);
                self.unmatch_vars_quiet(m);
                self.unmatch_vars_quiet(peer);
            }
        }

        for f in self.env.class(cls).fields().to_vec() {
            if let Some(peer) = self.env.field(f).matched() {
                self.env.set_field_match(peer, None);
                self.env.set_field_match(f, None);
            }
        }
    }

    fn unmatch_vars_quiet(&mut self, m: MethodId) {
        for var in self.all_vars(m) {
            if let Some(peer) = self.env.var(var).matched() {
                self.env.set_var_match(peer, None);
                self.env.set_var_match(var, None);
            }
        }
    }

    fn all_vars(&self, m: MethodId) -> Vec<VarId> {
        let method = self.env.method(m);
        method
            .args()
            .iter()
            .chain(method.locals())
            .copied()
            .collect()
    }
}

fn mapped_suffix(name: Option<&str>) -> String {
    match name {
        Some(name) => format!(" ({name})"),
        None => String::new(),
    }
}

fn var_kind(is_arg: bool) -> &'static str {
    if is_arg {
        "method arg"
    } else {
        "method var"
    }
}
