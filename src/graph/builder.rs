//! Programmatic graph construction.
//!
//! The loader (or a test fixture) declares classes with JVM descriptors;
//! the builder resolves type references, creating library placeholders for
//! anything not declared, registers array classes with their element, and
//! computes method hierarchy sets over supertype/subtype chains.

use std::collections::{HashMap, HashSet};

use crate::cache::ClassifierCache;
use crate::errors::{Error, Result};
use crate::graph::class::Class;
use crate::graph::ids::{ClassId, FieldId, MethodId, Side, VarId};
use crate::graph::insn::{Insn, Operand};
use crate::graph::member::{Field, Method, MethodVar};
use crate::graph::MatchEnv;

const PRIMITIVES: &str = "VZBCSIJFD";

/// Declaration of one class to add to the graph.
#[derive(Debug, Clone)]
pub struct ClassDecl {
    name: String,
    uri: Option<String>,
    name_obfuscated: bool,
    superclass: Option<String>,
    interfaces: Vec<String>,
    methods: Vec<MethodDecl>,
    fields: Vec<FieldDecl>,
}

impl ClassDecl {
    /// A new input class. `name` is the internal name (`a/b/C`), or a full
    /// descriptor for arrays and primitives.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();

        Self {
            uri: Some(format!("input:{name}")),
            name,
            name_obfuscated: false,
            superclass: None,
            interfaces: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn obfuscated(mut self) -> Self {
        self.name_obfuscated = true;
        self
    }

    /// Mark the class as a library/synthesized placeholder (no uri).
    pub fn library(mut self) -> Self {
        self.uri = None;
        self
    }

    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn extends(mut self, name: impl Into<String>) -> Self {
        self.superclass = Some(name.into());
        self
    }

    pub fn implements(mut self, name: impl Into<String>) -> Self {
        self.interfaces.push(name.into());
        self
    }

    pub fn method(mut self, method: MethodDecl) -> Self {
        self.methods.push(method);
        self
    }

    pub fn field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }
}

/// Declaration of one method.
#[derive(Debug, Clone)]
pub struct MethodDecl {
    name: String,
    desc: String,
    real: bool,
    name_obfuscated: bool,
    insns: Vec<Insn>,
    args: Vec<VarDecl>,
    locals: Vec<VarDecl>,
}

impl MethodDecl {
    pub fn new(name: impl Into<String>, desc: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            desc: desc.into(),
            real: true,
            name_obfuscated: false,
            insns: Vec::new(),
            args: Vec::new(),
            locals: Vec::new(),
        }
    }

    pub fn obfuscated(mut self) -> Self {
        self.name_obfuscated = true;
        self
    }

    /// Synthesized hierarchy placeholder, not present in the input.
    pub fn placeholder(mut self) -> Self {
        self.real = false;
        self
    }

    pub fn insn(mut self, opcode: u16) -> Self {
        self.insns.push(Insn::new(opcode));
        self
    }

    pub fn insn_op(mut self, opcode: u16, operand: Operand) -> Self {
        self.insns.push(Insn::with(opcode, operand));
        self
    }

    pub fn insns(mut self, insns: Vec<Insn>) -> Self {
        self.insns = insns;
        self
    }

    /// Override the auto-generated arg var at the next position.
    pub fn arg(mut self, var: VarDecl) -> Self {
        self.args.push(var);
        self
    }

    pub fn local(mut self, var: VarDecl) -> Self {
        self.locals.push(var);
        self
    }
}

/// Declaration of one field.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    name: String,
    desc: String,
    value: Option<Operand>,
    real: bool,
    name_obfuscated: bool,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, desc: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            desc: desc.into(),
            value: None,
            real: true,
            name_obfuscated: false,
        }
    }

    pub fn obfuscated(mut self) -> Self {
        self.name_obfuscated = true;
        self
    }

    pub fn placeholder(mut self) -> Self {
        self.real = false;
        self
    }

    /// Constant initializer value.
    pub fn value(mut self, value: Operand) -> Self {
        self.value = Some(value);
        self
    }
}

/// Declaration of one arg or local var.
#[derive(Debug, Clone)]
pub struct VarDecl {
    name: String,
    ty: Option<String>,
    lv_index: Option<u16>,
    asm_index: i32,
    start_insn: u32,
    end_insn: Option<u32>,
    name_obfuscated: bool,
}

impl VarDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: None,
            lv_index: None,
            asm_index: -1,
            start_insn: 0,
            end_insn: None,
            name_obfuscated: true,
        }
    }

    /// Type descriptor; required for locals, ignored for args (which take
    /// theirs from the method descriptor).
    pub fn ty(mut self, desc: impl Into<String>) -> Self {
        self.ty = Some(desc.into());
        self
    }

    pub fn lv(mut self, lv_index: u16) -> Self {
        self.lv_index = Some(lv_index);
        self
    }

    pub fn asm(mut self, asm_index: i32) -> Self {
        self.asm_index = asm_index;
        self
    }

    /// Lifetime range: start inclusive, end exclusive.
    pub fn span(mut self, start_insn: u32, end_insn: u32) -> Self {
        self.start_insn = start_insn;
        self.end_insn = Some(end_insn);
        self
    }

    /// Keep the original name as meaningful (not obfuscated).
    pub fn plain(mut self) -> Self {
        self.name_obfuscated = false;
        self
    }
}

/// Builds a [`MatchEnv`] from class declarations.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    decls: Vec<(Side, ClassDecl)>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn class(&mut self, side: Side, decl: ClassDecl) -> &mut Self {
        self.decls.push((side, decl));
        self
    }

    pub fn build(self) -> Result<MatchEnv> {
        let mut state = BuildState::default();

        // Shells first so later references resolve to declared classes
        // instead of placeholders.
        let mut shells = Vec::with_capacity(self.decls.len());

        for (side, decl) in &self.decls {
            let desc = name_to_desc(&decl.name);
            let id = state.get_or_create(*side, &desc)?;

            if !state.declared.insert(id) {
                return Err(Error::Graph(format!(
                    "class {} declared twice on side {side:?}",
                    decl.name
                )));
            }

            let cls = &mut state.classes[id.index()];
            cls.uri = decl.uri.clone();
            cls.name_obfuscated = decl.name_obfuscated;
            shells.push(id);
        }

        // Array obfuscation follows the element, regardless of the order
        // the declarations arrived in.
        for index in 0..state.classes.len() {
            if let Some(element) = state.classes[index].element {
                state.classes[index].name_obfuscated = state.classes[element.index()].name_obfuscated;
            }
        }

        for ((side, decl), id) in self.decls.iter().zip(shells) {
            state.populate(*side, id, decl)?;
        }

        let hier_groups = state.compute_hierarchy();

        Ok(MatchEnv {
            classes: state.classes,
            methods: state.methods,
            fields: state.fields,
            vars: state.vars,
            classes_a: state.classes_a,
            classes_b: state.classes_b,
            by_id_a: state.by_id_a,
            by_id_b: state.by_id_b,
            hier_groups,
            cache: ClassifierCache::new(),
        })
    }
}

#[derive(Default)]
struct BuildState {
    classes: Vec<Class>,
    methods: Vec<Method>,
    fields: Vec<Field>,
    vars: Vec<MethodVar>,
    classes_a: Vec<ClassId>,
    classes_b: Vec<ClassId>,
    by_id_a: HashMap<String, ClassId>,
    by_id_b: HashMap<String, ClassId>,
    declared: HashSet<ClassId>,
}

impl BuildState {
    fn by_id(&mut self, side: Side) -> &mut HashMap<String, ClassId> {
        match side {
            Side::A => &mut self.by_id_a,
            Side::B => &mut self.by_id_b,
        }
    }

    /// Resolve a descriptor on a side, creating a placeholder (and array
    /// chain) when nothing is declared for it.
    fn get_or_create(&mut self, side: Side, desc: &str) -> Result<ClassId> {
        if let Some(&id) = self.by_id(side).get(desc) {
            return Ok(id);
        }

        let dims = desc.bytes().take_while(|&b| b == b'[').count();

        if dims > 0 {
            let element = self.get_or_create(side, &desc[dims..])?;
            let name_obfuscated = self.classes[element.index()].name_obfuscated;
            let id = self.push_class(
                side,
                Class {
                    id: desc.to_string(),
                    name: desc.to_string(),
                    side,
                    uri: None,
                    name_obfuscated,
                    array_dims: dims as u8,
                    element: Some(element),
                    arrays: Vec::new(),
                    superclass: None,
                    interfaces: Vec::new(),
                    children: Vec::new(),
                    methods: Vec::new(),
                    fields: Vec::new(),
                    tmp_name: None,
                    mapped_name: None,
                    matched: None,
                },
            );
            self.classes[element.index()].arrays.push(id);
            return Ok(id);
        }

        let name = if let Some(inner) = desc.strip_prefix('L').and_then(|d| d.strip_suffix(';')) {
            inner.to_string()
        } else if desc.len() == 1 && PRIMITIVES.contains(desc) {
            desc.to_string()
        } else {
            return Err(Error::InvalidDescriptor(desc.to_string()));
        };

        let id = self.push_class(
            side,
            Class {
                id: desc.to_string(),
                name,
                side,
                uri: None,
                name_obfuscated: false,
                array_dims: 0,
                element: None,
                arrays: Vec::new(),
                superclass: None,
                interfaces: Vec::new(),
                children: Vec::new(),
                methods: Vec::new(),
                fields: Vec::new(),
                tmp_name: None,
                mapped_name: None,
                matched: None,
            },
        );
        Ok(id)
    }

    fn push_class(&mut self, side: Side, cls: Class) -> ClassId {
        let id = ClassId::new(self.classes.len());
        self.by_id(side).insert(cls.id.clone(), id);
        self.classes.push(cls);

        match side {
            Side::A => self.classes_a.push(id),
            Side::B => self.classes_b.push(id),
        }

        id
    }

    fn populate(&mut self, side: Side, id: ClassId, decl: &ClassDecl) -> Result<()> {
        if let Some(superclass) = &decl.superclass {
            let sup = self.get_or_create(side, &name_to_desc(superclass))?;
            self.classes[id.index()].superclass = Some(sup);
            self.classes[sup.index()].children.push(id);
        }

        for itf_name in &decl.interfaces {
            let itf = self.get_or_create(side, &name_to_desc(itf_name))?;
            self.classes[id.index()].interfaces.push(itf);
            self.classes[itf.index()].children.push(id);
        }

        for (position, mdecl) in decl.methods.iter().enumerate() {
            let mid = self.add_method(side, id, position as u32, mdecl)?;
            self.classes[id.index()].methods.push(mid);
        }

        for (position, fdecl) in decl.fields.iter().enumerate() {
            let field_type = self.get_or_create(side, &fdecl.desc)?;
            let fid = FieldId::new(self.fields.len());
            self.fields.push(Field {
                class: id,
                name: fdecl.name.clone(),
                desc: fdecl.desc.clone(),
                field_type,
                value: fdecl.value.clone(),
                position: position as u32,
                real: fdecl.real,
                name_obfuscated: fdecl.name_obfuscated,
                tmp_name: None,
                mapped_name: None,
                matched: None,
            });
            self.classes[id.index()].fields.push(fid);
        }

        Ok(())
    }

    fn add_method(
        &mut self,
        side: Side,
        class: ClassId,
        position: u32,
        decl: &MethodDecl,
    ) -> Result<MethodId> {
        let (param_descs, ret_desc) = split_method_desc(&decl.desc)?;
        let ret_type = self.get_or_create(side, &ret_desc)?;
        let mid = MethodId::new(self.methods.len());
        let insn_count = decl.insns.len() as u32;

        let mut args = Vec::with_capacity(param_descs.len());

        for (index, param_desc) in param_descs.iter().enumerate() {
            let var_type = self.get_or_create(side, param_desc)?;
            let decl_var = decl.args.get(index);
            args.push(self.push_var(mid, true, index as u16, var_type, insn_count, decl_var));
        }

        if decl.args.len() > param_descs.len() {
            return Err(Error::Graph(format!(
                "method {}{} declares more arg vars than descriptor parameters",
                decl.name, decl.desc
            )));
        }

        let arg_count = args.len() as u16;
        let mut locals = Vec::with_capacity(decl.locals.len());

        for (index, var) in decl.locals.iter().enumerate() {
            let ty_desc = var.ty.as_deref().unwrap_or("Ljava/lang/Object;");
            let var_type = self.get_or_create(side, ty_desc)?;
            let local = self.push_var(mid, false, index as u16, var_type, insn_count, Some(var));
            // Locals default to slots past the args when unspecified.
            if var.lv_index.is_none() {
                self.vars[local.index()].lv_index = arg_count + index as u16;
            }
            locals.push(local);
        }

        self.methods.push(Method {
            class,
            name: decl.name.clone(),
            desc: decl.desc.clone(),
            ret_type,
            args,
            locals,
            insns: decl.insns.clone(),
            position,
            real: decl.real,
            name_obfuscated: decl.name_obfuscated,
            hier_group: 0,
            tmp_name: None,
            mapped_name: None,
            matched: None,
        });

        Ok(mid)
    }

    fn push_var(
        &mut self,
        method: MethodId,
        is_arg: bool,
        index: u16,
        var_type: ClassId,
        insn_count: u32,
        decl: Option<&VarDecl>,
    ) -> VarId {
        let id = VarId::new(self.vars.len());

        let (name, name_obfuscated, lv_index, asm_index, start_insn, end_insn) = match decl {
            Some(var) => (
                var.name.clone(),
                var.name_obfuscated,
                var.lv_index.unwrap_or(index),
                var.asm_index,
                var.start_insn,
                var.end_insn.unwrap_or(insn_count),
            ),
            None => (format!("var{index}"), true, index, -1, 0, insn_count),
        };

        self.vars.push(MethodVar {
            method,
            is_arg,
            index,
            lv_index,
            asm_index,
            var_type,
            start_insn,
            end_insn,
            name,
            name_obfuscated,
            tmp_name: None,
            mapped_name: None,
            matched: None,
        });

        id
    }

    /// Union same-name+descriptor methods along supertype chains into
    /// hierarchy groups; every method lands in exactly one group.
    fn compute_hierarchy(&mut self) -> Vec<Vec<MethodId>> {
        let mut uf = UnionFind::new(self.methods.len());

        for (cls_index, cls) in self.classes.iter().enumerate() {
            if cls.methods.is_empty() {
                continue;
            }

            for anc in self.ancestors(ClassId::new(cls_index)) {
                for &m in &cls.methods {
                    let method = &self.methods[m.index()];

                    let overridden = self.classes[anc.index()].methods.iter().copied().find(|&o| {
                        let other = &self.methods[o.index()];
                        other.name == method.name && other.desc == method.desc
                    });

                    if let Some(o) = overridden {
                        uf.union(m.index(), o.index());
                    }
                }
            }
        }

        let mut group_of_root: HashMap<usize, u32> = HashMap::new();
        let mut groups: Vec<Vec<MethodId>> = Vec::new();

        for index in 0..self.methods.len() {
            let root = uf.find(index);
            let group = *group_of_root.entry(root).or_insert_with(|| {
                groups.push(Vec::new());
                (groups.len() - 1) as u32
            });
            groups[group as usize].push(MethodId::new(index));
            self.methods[index].hier_group = group;
        }

        groups
    }

    /// Transitive supertype closure (superclasses and interfaces), the
    /// class itself excluded.
    fn ancestors(&self, id: ClassId) -> Vec<ClassId> {
        let mut seen = HashSet::new();
        let mut queue = vec![id];
        let mut out = Vec::new();

        while let Some(current) = queue.pop() {
            let cls = &self.classes[current.index()];

            for &parent in cls.superclass.iter().chain(cls.interfaces.iter()) {
                if seen.insert(parent) {
                    out.push(parent);
                    queue.push(parent);
                }
            }
        }

        out
    }
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            let root = self.find(self.parent[x]);
            self.parent[x] = root;
        }
        self.parent[x]
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[ra] = rb;
        }
    }
}

fn name_to_desc(name: &str) -> String {
    if name.starts_with('[') || (name.len() == 1 && PRIMITIVES.contains(name)) {
        name.to_string()
    } else {
        format!("L{name};")
    }
}

/// Split a method descriptor into parameter descriptors and the return
/// descriptor.
fn split_method_desc(desc: &str) -> Result<(Vec<String>, String)> {
    let inner = desc
        .strip_prefix('(')
        .ok_or_else(|| Error::InvalidDescriptor(desc.to_string()))?;
    let close = inner
        .find(')')
        .ok_or_else(|| Error::InvalidDescriptor(desc.to_string()))?;

    let (params, ret) = (&inner[..close], &inner[close + 1..]);

    if ret.is_empty() {
        return Err(Error::InvalidDescriptor(desc.to_string()));
    }

    let mut out = Vec::new();
    let mut rest = params;

    while !rest.is_empty() {
        let (token, remainder) = next_desc(rest, desc)?;
        out.push(token);
        rest = remainder;
    }

    let (ret_token, trailing) = next_desc(ret, desc)?;

    if !trailing.is_empty() {
        return Err(Error::InvalidDescriptor(desc.to_string()));
    }

    Ok((out, ret_token))
}

fn next_desc<'a>(s: &'a str, whole: &str) -> Result<(String, &'a str)> {
    let dims = s.bytes().take_while(|&b| b == b'[').count();
    let rest = &s[dims..];

    let elem_len = match rest.as_bytes().first() {
        Some(b'L') => {
            rest.find(';')
                .ok_or_else(|| Error::InvalidDescriptor(whole.to_string()))?
                + 1
        }
        Some(&b) if PRIMITIVES.contains(b as char) => 1,
        _ => return Err(Error::InvalidDescriptor(whole.to_string())),
    };

    let len = dims + elem_len;
    Ok((s[..len].to_string(), &s[len..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_method_descriptors() {
        let (params, ret) = split_method_desc("(I[La/B;J)V").unwrap();
        assert_eq!(params, vec!["I", "[La/B;", "J"]);
        assert_eq!(ret, "V");

        let (params, ret) = split_method_desc("()Ljava/lang/String;").unwrap();
        assert!(params.is_empty());
        assert_eq!(ret, "Ljava/lang/String;");
    }

    #[test]
    fn rejects_malformed_descriptors() {
        assert!(split_method_desc("I)V").is_err());
        assert!(split_method_desc("(IV").is_err());
        assert!(split_method_desc("(I)").is_err());
        assert!(split_method_desc("(Q)V").is_err());
    }

    #[test]
    fn builds_placeholders_for_unresolved_refs() {
        let mut builder = GraphBuilder::new();
        builder.class(
            Side::A,
            ClassDecl::new("a").method(MethodDecl::new("m", "(Lx;)V")),
        );
        let env = builder.build().unwrap();

        let x = env.cls_by_id(Side::A, "Lx;").expect("placeholder created");
        assert!(env.class(x).uri().is_none(), "placeholder has no uri");
        assert!(!env.class(x).is_input());
    }

    #[test]
    fn registers_array_classes_with_element() {
        let mut builder = GraphBuilder::new();
        builder.class(Side::A, ClassDecl::new("a").obfuscated());
        builder.class(Side::A, ClassDecl::new("[La;"));
        builder.class(Side::A, ClassDecl::new("[[La;"));
        let env = builder.build().unwrap();

        let a = env.cls_by_id(Side::A, "La;").unwrap();
        let arr1 = env.cls_by_id(Side::A, "[La;").unwrap();
        let arr2 = env.cls_by_id(Side::A, "[[La;").unwrap();

        assert_eq!(env.class(a).arrays(), &[arr1, arr2]);
        assert_eq!(env.class(arr1).element(), Some(a));
        assert_eq!(env.class(arr2).element(), Some(a));
        assert_eq!(env.class(arr2).array_dims(), 2);
    }

    #[test]
    fn computes_hierarchy_across_gaps() {
        // C extends S extends T; only C and T declare m()V.
        let mut builder = GraphBuilder::new();
        builder.class(
            Side::A,
            ClassDecl::new("t").method(MethodDecl::new("m", "()V")),
        );
        builder.class(Side::A, ClassDecl::new("s").extends("t"));
        builder.class(
            Side::A,
            ClassDecl::new("c")
                .extends("s")
                .method(MethodDecl::new("m", "()V")),
        );
        let env = builder.build().unwrap();

        let c = env.cls_by_id(Side::A, "Lc;").unwrap();
        let cm = env.method_by_id(c, "m()V").unwrap();
        assert_eq!(env.hierarchy_members(cm).len(), 2);
    }

    #[test]
    fn generates_arg_vars_from_descriptor() {
        let mut builder = GraphBuilder::new();
        builder.class(
            Side::A,
            ClassDecl::new("a").method(MethodDecl::new("m", "(IJ)V")),
        );
        let env = builder.build().unwrap();

        let a = env.cls_by_id(Side::A, "La;").unwrap();
        let m = env.method_by_id(a, "m(IJ)V").unwrap();
        assert_eq!(env.method(m).args().len(), 2);

        let arg0 = env.var(env.method(m).args()[0]);
        assert!(arg0.is_arg());
        assert_eq!(arg0.index(), 0);
        assert_eq!(env.class(arg0.var_type()).id(), "I");
    }
}
