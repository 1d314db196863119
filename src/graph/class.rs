//! Class entities.

use crate::graph::ids::{ClassId, FieldId, MethodId, Side};

/// A class on one side of the comparison.
///
/// `id` is the JVM type descriptor (`La/b/C;`, `[I`, ...) and doubles as
/// the lookup key within a side. Array classes carry the innermost
/// element class and a positive dimension count; non-array classes track
/// every live array class instantiated over them.
#[derive(Debug)]
pub struct Class {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) side: Side,
    pub(crate) uri: Option<String>,
    pub(crate) name_obfuscated: bool,
    pub(crate) array_dims: u8,
    pub(crate) element: Option<ClassId>,
    pub(crate) arrays: Vec<ClassId>,
    pub(crate) superclass: Option<ClassId>,
    pub(crate) interfaces: Vec<ClassId>,
    pub(crate) children: Vec<ClassId>,
    pub(crate) methods: Vec<MethodId>,
    pub(crate) fields: Vec<FieldId>,
    pub(crate) tmp_name: Option<String>,
    pub(crate) mapped_name: Option<String>,
    pub(crate) matched: Option<ClassId>,
}

impl Class {
    /// Type descriptor, the stable identifier within a side.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Internal name (descriptor without `L`/`;` for object types).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Origin of the class bytes; `None` for synthesized or library
    /// placeholders.
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    /// Whether the class came from an input artifact.
    pub fn is_input(&self) -> bool {
        self.uri.is_some()
    }

    pub fn is_name_obfuscated(&self) -> bool {
        self.name_obfuscated
    }

    pub fn is_array(&self) -> bool {
        self.array_dims > 0
    }

    pub fn array_dims(&self) -> u8 {
        self.array_dims
    }

    /// Innermost element class for arrays.
    pub fn element(&self) -> Option<ClassId> {
        self.element
    }

    /// Live array classes whose element is this class.
    pub fn arrays(&self) -> &[ClassId] {
        &self.arrays
    }

    pub fn superclass(&self) -> Option<ClassId> {
        self.superclass
    }

    pub fn interfaces(&self) -> &[ClassId] {
        &self.interfaces
    }

    pub fn children(&self) -> &[ClassId] {
        &self.children
    }

    pub fn methods(&self) -> &[MethodId] {
        &self.methods
    }

    pub fn fields(&self) -> &[FieldId] {
        &self.fields
    }

    pub fn matched(&self) -> Option<ClassId> {
        self.matched
    }

    pub fn has_match(&self) -> bool {
        self.matched.is_some()
    }

    pub fn tmp_name(&self) -> Option<&str> {
        self.tmp_name.as_deref()
    }
}
