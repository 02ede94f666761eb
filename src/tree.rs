use std::{collections::HashMap, sync::Arc};

use serde_json::Value;
use thiserror::Error;

use crate::{
    dialect::{Dialect, POS_ITEM, POS_PROP, POS_SELF},
    equiv::equals,
    pointer::JsonPointer,
    reference::{Fragment, SchemaRef},
};

static NULL: Value = Value::Null;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("json-pointer {ptr:?} does not exist in {document}")]
    DanglingPointer { document: String, ptr: String },
}

/// How references are matched to documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Addressing {
    /// only the loading uri of a document addresses it
    #[default]
    Canonical,
    /// `id` members inside a document also address their subtrees
    Inline,
}

/// A loaded schema document: its loading reference, value and id index.
#[derive(Debug)]
pub struct Document {
    reference: SchemaRef,
    value: Value,
    dialect: Dialect,
    ids: HashMap<SchemaRef, JsonPointer>,
}

impl Document {
    pub(crate) fn new(reference: SchemaRef, value: Value, default_dialect: Dialect) -> Self {
        let reference = reference.document();
        let dialect = Dialect::detect(&value, default_dialect);
        let mut ids = HashMap::new();
        collect_ids(dialect, &value, &reference, JsonPointer::root(), &mut ids);
        Self {
            reference,
            value,
            dialect,
            ids,
        }
    }

    pub fn reference(&self) -> &SchemaRef {
        &self.reference
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// returns the resolution scope in effect at `ptr`
    fn scope_at(&self, ptr: &JsonPointer) -> SchemaRef {
        let mut scope = self.reference.clone();
        let mut v = &self.value;
        let mut tokens = ptr.tokens();
        loop {
            if let Some(id) = node_id(self.dialect, v) {
                if let Ok(r) = scope.resolve(id) {
                    if !r.is_anonymous() {
                        scope = r.document();
                    }
                }
            }
            let Some(tok) = tokens.next() else {
                return scope;
            };
            v = match v {
                Value::Object(obj) => match obj.get(tok) {
                    Some(v) => v,
                    None => return scope,
                },
                Value::Array(arr) => match tok.parse::<usize>().ok().and_then(|i| arr.get(i)) {
                    Some(v) => v,
                    None => return scope,
                },
                _ => return scope,
            };
        }
    }
}

// id of a schema node. `id` is ignored next to `$ref`, as all other members are.
fn node_id(dialect: Dialect, v: &Value) -> Option<&str> {
    let Value::Object(obj) = v else {
        return None;
    };
    if obj.contains_key("$ref") {
        return None;
    }
    match obj.get(dialect.id_keyword()) {
        Some(Value::String(id)) => Some(id),
        _ => None,
    }
}

fn collect_ids(
    dialect: Dialect,
    v: &Value,
    scope: &SchemaRef,
    ptr: JsonPointer,
    ids: &mut HashMap<SchemaRef, JsonPointer>,
) {
    let Value::Object(obj) = v else {
        return;
    };

    let mut scope = scope.clone();
    if let Some(id) = node_id(dialect, v) {
        match scope.resolve(id) {
            Ok(r) => {
                if let Fragment::Name(_) = r.fragment() {
                    ids.entry(r.clone()).or_insert_with(|| ptr.clone());
                }
                if !r.is_anonymous() && !r.same_document(&scope) || ptr.is_root() {
                    scope = r.document();
                    ids.entry(scope.clone()).or_insert_with(|| ptr.clone());
                }
            }
            Err(e) => tracing::warn!(%id, at = %ptr, "ignoring invalid id: {e}"),
        }
    }

    for (kw, &pos) in dialect.subschemas() {
        let Some(v) = obj.get(*kw) else {
            continue;
        };
        let kw_ptr = ptr.prop(kw);
        if pos & POS_SELF != 0 && v.is_object() {
            collect_ids(dialect, v, &scope, kw_ptr.clone(), ids);
        }
        if pos & POS_ITEM != 0 {
            if let Value::Array(arr) = v {
                for (i, item) in arr.iter().enumerate() {
                    collect_ids(dialect, item, &scope, kw_ptr.item(i), ids);
                }
            }
        }
        if pos & POS_PROP != 0 {
            if let Value::Object(obj) = v {
                for (name, item) in obj {
                    collect_ids(dialect, item, &scope, kw_ptr.prop(name), ids);
                }
            }
        }
    }
}

/// A cursor into a schema document: the document plus a json-pointer
/// to the current node. Cloning is cheap.
///
/// The current pointer always exists in the document.
#[derive(Debug, Clone)]
pub struct SchemaTree {
    doc: Arc<Document>,
    ptr: JsonPointer,
    addressing: Addressing,
}

impl SchemaTree {
    pub(crate) fn new(doc: Arc<Document>, addressing: Addressing) -> Self {
        Self {
            doc,
            ptr: JsonPointer::root(),
            addressing,
        }
    }

    /// A tree over `value` which was loaded without uri.
    pub fn anonymous(value: Value, dialect: Dialect, addressing: Addressing) -> Self {
        let doc = Document::new(SchemaRef::anonymous(), value, dialect);
        Self::new(Arc::new(doc), addressing)
    }

    pub fn document(&self) -> &Arc<Document> {
        &self.doc
    }

    pub fn loading_ref(&self) -> &SchemaRef {
        &self.doc.reference
    }

    pub fn pointer(&self) -> &JsonPointer {
        &self.ptr
    }

    pub fn dialect(&self) -> Dialect {
        self.doc.dialect
    }

    pub fn addressing(&self) -> Addressing {
        self.addressing
    }

    /// loading reference with the current pointer as fragment
    pub fn current_ref(&self) -> SchemaRef {
        self.doc.reference.with_pointer(self.ptr.clone())
    }

    pub fn base_value(&self) -> &Value {
        &self.doc.value
    }

    pub fn current_node(&self) -> &Value {
        debug_assert!(self.ptr.lookup(&self.doc.value).is_some());
        self.ptr.lookup(&self.doc.value).unwrap_or(&NULL)
    }

    /// Moves the cursor down by the relative pointer `rel`.
    pub fn append(&self, rel: &JsonPointer) -> Result<Self, TreeError> {
        self.at(self.ptr.join(rel))
    }

    /// Moves the cursor to the absolute pointer `ptr` of the same document.
    pub fn at(&self, ptr: JsonPointer) -> Result<Self, TreeError> {
        if ptr.lookup(&self.doc.value).is_none() {
            return Err(TreeError::DanglingPointer {
                document: self.doc.reference.to_string(),
                ptr: ptr.to_string(),
            });
        }
        Ok(Self {
            doc: Arc::clone(&self.doc),
            ptr,
            addressing: self.addressing,
        })
    }

    /// A tree over another document, positioned at `fragment`.
    pub fn with_base(&self, doc: Arc<Document>, fragment: &Fragment) -> Result<Self, TreeError> {
        let tree = Self::new(doc, self.addressing);
        let target = SchemaRef {
            locator: tree.doc.reference.locator.clone(),
            fragment: fragment.clone(),
        };
        match tree.locate(&target) {
            Some(ptr) => tree.at(ptr),
            None => Err(TreeError::DanglingPointer {
                document: tree.doc.reference.to_string(),
                ptr: fragment.to_string(),
            }),
        }
    }

    /// Resolution scope at the current node, against which relative
    /// `$ref` values are resolved.
    pub fn scope(&self) -> SchemaRef {
        match self.addressing {
            Addressing::Canonical => self.doc.reference.clone(),
            Addressing::Inline => self.doc.scope_at(&self.ptr),
        }
    }

    /// Finds the pointer addressed by `target` inside this document.
    pub fn locate(&self, target: &SchemaRef) -> Option<JsonPointer> {
        let found = match (self.addressing, &target.fragment) {
            (Addressing::Inline, Fragment::Name(_)) => self.doc.ids.get(target).cloned(),
            (Addressing::Inline, Fragment::Pointer(ptr)) => {
                match self.doc.ids.get(&target.document()) {
                    Some(base) => Some(base.join(ptr)),
                    None if target.same_document(&self.doc.reference) => Some(ptr.clone()),
                    None => None,
                }
            }
            (Addressing::Canonical, Fragment::Pointer(ptr))
                if target.same_document(&self.doc.reference) =>
            {
                Some(ptr.clone())
            }
            (Addressing::Canonical, _) => None,
        };
        found.filter(|ptr| ptr.lookup(&self.doc.value).is_some())
    }
}

impl PartialEq for SchemaTree {
    fn eq(&self, other: &Self) -> bool {
        self.current_ref() == other.current_ref()
            && equals(self.current_node(), other.current_node())
    }
}
