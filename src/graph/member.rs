//! Method, field and method-var entities.

use crate::graph::ids::{ClassId, FieldId, MethodId, VarId};
use crate::graph::insn::{Insn, Operand};

/// A method on one side. The composite id is `name + descriptor`.
#[derive(Debug)]
pub struct Method {
    pub(crate) class: ClassId,
    pub(crate) name: String,
    pub(crate) desc: String,
    pub(crate) ret_type: ClassId,
    pub(crate) args: Vec<VarId>,
    pub(crate) locals: Vec<VarId>,
    pub(crate) insns: Vec<Insn>,
    pub(crate) position: u32,
    pub(crate) real: bool,
    pub(crate) name_obfuscated: bool,
    pub(crate) hier_group: u32,
    pub(crate) tmp_name: Option<String>,
    pub(crate) mapped_name: Option<String>,
    pub(crate) matched: Option<MethodId>,
}

impl Method {
    pub fn class(&self) -> ClassId {
        self.class
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn desc(&self) -> &str {
        &self.desc
    }

    /// Composite id: name + descriptor.
    pub fn id(&self) -> String {
        format!("{}{}", self.name, self.desc)
    }

    pub fn ret_type(&self) -> ClassId {
        self.ret_type
    }

    pub fn args(&self) -> &[VarId] {
        &self.args
    }

    pub fn locals(&self) -> &[VarId] {
        &self.locals
    }

    pub fn insns(&self) -> &[Insn] {
        &self.insns
    }

    /// Ordinal of the method within its class.
    pub fn position(&self) -> u32 {
        self.position
    }

    /// Present in the input, as opposed to a synthesized hierarchy
    /// placeholder.
    pub fn is_real(&self) -> bool {
        self.real
    }

    pub fn is_name_obfuscated(&self) -> bool {
        self.name_obfuscated
    }

    pub fn matched(&self) -> Option<MethodId> {
        self.matched
    }

    pub fn has_match(&self) -> bool {
        self.matched.is_some()
    }

    pub fn tmp_name(&self) -> Option<&str> {
        self.tmp_name.as_deref()
    }
}

/// A field on one side.
#[derive(Debug)]
pub struct Field {
    pub(crate) class: ClassId,
    pub(crate) name: String,
    pub(crate) desc: String,
    pub(crate) field_type: ClassId,
    pub(crate) value: Option<Operand>,
    pub(crate) position: u32,
    pub(crate) real: bool,
    pub(crate) name_obfuscated: bool,
    pub(crate) tmp_name: Option<String>,
    pub(crate) mapped_name: Option<String>,
    pub(crate) matched: Option<FieldId>,
}

impl Field {
    pub fn class(&self) -> ClassId {
        self.class
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn desc(&self) -> &str {
        &self.desc
    }

    pub fn id(&self) -> String {
        format!("{};;{}", self.name, self.desc)
    }

    pub fn field_type(&self) -> ClassId {
        self.field_type
    }

    /// Constant initializer, when the field has one.
    pub fn value(&self) -> Option<&Operand> {
        self.value.as_ref()
    }

    pub fn position(&self) -> u32 {
        self.position
    }

    pub fn is_real(&self) -> bool {
        self.real
    }

    pub fn is_name_obfuscated(&self) -> bool {
        self.name_obfuscated
    }

    pub fn matched(&self) -> Option<FieldId> {
        self.matched
    }

    pub fn has_match(&self) -> bool {
        self.matched.is_some()
    }

    pub fn tmp_name(&self) -> Option<&str> {
        self.tmp_name.as_deref()
    }
}

/// An argument or local variable of a method.
#[derive(Debug)]
pub struct MethodVar {
    pub(crate) method: MethodId,
    pub(crate) is_arg: bool,
    pub(crate) index: u16,
    pub(crate) lv_index: u16,
    pub(crate) asm_index: i32,
    pub(crate) var_type: ClassId,
    pub(crate) start_insn: u32,
    pub(crate) end_insn: u32,
    pub(crate) name: String,
    pub(crate) name_obfuscated: bool,
    pub(crate) tmp_name: Option<String>,
    pub(crate) mapped_name: Option<String>,
    pub(crate) matched: Option<VarId>,
}

impl MethodVar {
    pub fn method(&self) -> MethodId {
        self.method
    }

    pub fn is_arg(&self) -> bool {
        self.is_arg
    }

    /// Position among the args, or among the locals, of the owning method.
    pub fn index(&self) -> u16 {
        self.index
    }

    /// Slot in the local-variable table.
    pub fn lv_index(&self) -> u16 {
        self.lv_index
    }

    /// Ordinal within the instruction stream, -1 when unknown.
    pub fn asm_index(&self) -> i32 {
        self.asm_index
    }

    pub fn var_type(&self) -> ClassId {
        self.var_type
    }

    /// First instruction covering the var, inclusive.
    pub fn start_insn(&self) -> u32 {
        self.start_insn
    }

    /// End of the var's lifetime, exclusive.
    pub fn end_insn(&self) -> u32 {
        self.end_insn
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_name_obfuscated(&self) -> bool {
        self.name_obfuscated
    }

    pub fn matched(&self) -> Option<VarId> {
        self.matched
    }

    pub fn has_match(&self) -> bool {
        self.matched.is_some()
    }

    pub fn tmp_name(&self) -> Option<&str> {
        self.tmp_name.as_deref()
    }
}
