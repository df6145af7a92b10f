#![forbid(unsafe_code)]

//! ABI schema resolution: descriptor in, immutable type graph out.
//!
//! The graph is index-based: every node lives in one `Vec` and refers to its
//! children by position, so recursive schemas need no pointer cycles and the
//! finished [`Contract`] is plain shareable data. Alias chains and struct
//! inheritance are resolved with an explicit depth counter capped at 32.

use std::collections::BTreeMap;

use crate::abi::{AbiDef, StructDef};
use crate::primitive::Primitive;
use crate::types::Name;
use crate::{Error, Result, MAX_ABI_DEPTH};

/// One resolved struct field.
#[derive(Clone, Debug)]
pub(crate) struct AbiField {
    pub(crate) name: String,
    pub(crate) type_id: usize,
}

/// Flattened struct layout: base fields precede own fields.
#[derive(Clone, Debug)]
pub(crate) struct StructLayout {
    pub(crate) base: Option<usize>,
    pub(crate) fields: Vec<AbiField>,
}

#[derive(Clone, Debug)]
pub(crate) enum TypeKind {
    Primitive(Primitive),
    /// Resolved alias; always points at a non-alias node.
    Alias(usize),
    Optional(usize),
    Array(usize),
    Struct(StructLayout),
}

#[derive(Clone, Debug)]
pub(crate) struct TypeNode {
    pub(crate) name: String,
    pub(crate) kind: TypeKind,
}

/// Root type handle for one codec call: either a node in the graph or a
/// transient `T?`/`T[]` synthesized for a suffix name the resolution phase
/// never materialized.
#[derive(Debug)]
pub(crate) enum RootType {
    Id(usize),
    Synth(TypeNode),
}

/// An immutable, resolved type graph plus the action-name table.
///
/// Construction happens once per ABI; afterwards the contract is read-only
/// and can serve any number of concurrent codec calls.
#[derive(Debug)]
pub struct Contract {
    nodes: Vec<TypeNode>,
    index: BTreeMap<String, usize>,
    action_types: BTreeMap<Name, String>,
}

impl Contract {
    /// Resolve an ABI descriptor into a contract.
    pub fn new(abi: &AbiDef) -> Result<Self> {
        let mut builder = Builder {
            nodes: Vec::new(),
            index: BTreeMap::new(),
        };

        for (name, primitive) in Primitive::ALL {
            builder.push_node(name, BuildKind::Done(TypeKind::Primitive(primitive)));
        }
        let quantity = builder.get_type("asset", 0)?;
        let issuer = builder.get_type("name", 0)?;
        builder.push_node(
            "extended_asset",
            BuildKind::Done(TypeKind::Struct(StructLayout {
                base: None,
                fields: vec![
                    AbiField {
                        name: "quantity".to_owned(),
                        type_id: quantity,
                    },
                    AbiField {
                        name: "contract".to_owned(),
                        type_id: issuer,
                    },
                ],
            })),
        );

        for alias in &abi.types {
            if alias.new_type_name.is_empty() {
                return Err(Error::MissingTypeName);
            }
            builder.add_node(
                &alias.new_type_name,
                BuildKind::Alias {
                    target: &alias.type_name,
                    resolved: None,
                },
            )?;
        }
        for def in &abi.structs {
            if def.name.is_empty() {
                return Err(Error::MissingStructName);
            }
            builder.add_node(
                &def.name,
                BuildKind::Struct {
                    def,
                    base: None,
                    fields: Vec::new(),
                    filled: false,
                },
            )?;
        }

        let alias_ids: Vec<usize> = builder
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, (_, kind))| matches!(kind, BuildKind::Alias { .. }))
            .map(|(id, _)| id)
            .collect();
        for id in alias_ids {
            let name = builder.nodes[id].0.clone();
            builder.get_type(&name, 0)?;
        }

        let struct_ids: Vec<usize> = builder
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, (_, kind))| matches!(kind, BuildKind::Struct { .. }))
            .map(|(id, _)| id)
            .collect();
        for id in struct_ids {
            builder.fill_struct(id, 0)?;
        }

        let mut action_types = BTreeMap::new();
        for action in &abi.actions {
            action_types.insert(action.name, action.type_name.clone());
        }

        let nodes = builder
            .nodes
            .into_iter()
            .map(|(name, kind)| TypeNode {
                name,
                kind: match kind {
                    BuildKind::Done(kind) => kind,
                    BuildKind::Alias { resolved, .. } => TypeKind::Alias(
                        resolved.expect("aliases are resolved before conversion"),
                    ),
                    BuildKind::Struct { base, fields, .. } => {
                        TypeKind::Struct(StructLayout { base, fields })
                    }
                },
            })
            .collect();

        Ok(Contract {
            nodes,
            index: builder.index,
            action_types,
        })
    }

    /// The argument type name registered for an action, if any.
    pub fn action_type(&self, action: Name) -> Option<&str> {
        self.action_types.get(&action).map(String::as_str)
    }

    pub(crate) fn node(&self, id: usize) -> &TypeNode {
        &self.nodes[id]
    }

    pub(crate) fn root_node<'a>(&'a self, root: &'a RootType) -> &'a TypeNode {
        match root {
            RootType::Id(id) => &self.nodes[*id],
            RootType::Synth(node) => node,
        }
    }

    fn skip_alias(&self, mut id: usize) -> usize {
        while let TypeKind::Alias(target) = &self.nodes[id].kind {
            id = *target;
        }
        id
    }

    /// Look up a type by name without mutating the graph. Suffix forms that
    /// were never materialized during resolution come back as transient
    /// nodes.
    pub(crate) fn resolve_root(&self, name: &str, depth: usize) -> Result<RootType> {
        if depth >= MAX_ABI_DEPTH {
            return Err(Error::AbiRecursionLimit);
        }
        if let Some(&id) = self.index.get(name) {
            return Ok(RootType::Id(self.skip_alias(id)));
        }
        let (prefix, synthesize): (&str, fn(usize) -> TypeKind) =
            if let Some(prefix) = name.strip_suffix('?') {
                (prefix, TypeKind::Optional)
            } else if let Some(prefix) = name.strip_suffix("[]") {
                (prefix, TypeKind::Array)
            } else {
                return Err(Error::UnknownType(name.to_owned()));
            };
        let inner_id = match self.resolve_root(prefix, depth + 1)? {
            RootType::Id(id)
                if !matches!(
                    self.nodes[id].kind,
                    TypeKind::Optional(_) | TypeKind::Array(_)
                ) =>
            {
                id
            }
            // The inner type is itself an optional or array.
            _ => return Err(Error::NestedOptionalOrArray),
        };
        Ok(RootType::Synth(TypeNode {
            name: name.to_owned(),
            kind: synthesize(inner_id),
        }))
    }
}

enum BuildKind<'a> {
    Done(TypeKind),
    Alias {
        target: &'a str,
        resolved: Option<usize>,
    },
    Struct {
        def: &'a StructDef,
        base: Option<usize>,
        fields: Vec<AbiField>,
        filled: bool,
    },
}

struct Builder<'a> {
    nodes: Vec<(String, BuildKind<'a>)>,
    index: BTreeMap<String, usize>,
}

impl<'a> Builder<'a> {
    fn push_node(&mut self, name: &str, kind: BuildKind<'a>) -> usize {
        let id = self.nodes.len();
        self.nodes.push((name.to_owned(), kind));
        self.index.insert(name.to_owned(), id);
        id
    }

    fn add_node(&mut self, name: &str, kind: BuildKind<'a>) -> Result<usize> {
        if self.index.contains_key(name) {
            return Err(Error::TypeRedefinition(name.to_owned()));
        }
        Ok(self.push_node(name, kind))
    }

    /// Find a type by name, resolving alias chains and synthesizing `T?` and
    /// `T[]` nodes on demand.
    fn get_type(&mut self, name: &str, depth: usize) -> Result<usize> {
        if depth >= MAX_ABI_DEPTH {
            return Err(Error::AbiRecursionLimit);
        }
        if let Some(&id) = self.index.get(name) {
            return match &self.nodes[id].1 {
                BuildKind::Alias {
                    resolved: Some(target),
                    ..
                } => Ok(*target),
                BuildKind::Alias {
                    target,
                    resolved: None,
                } => {
                    let target = *target;
                    let resolved = self.get_type(target, depth + 1)?;
                    if let BuildKind::Alias { resolved: slot, .. } = &mut self.nodes[id].1 {
                        *slot = Some(resolved);
                    }
                    Ok(resolved)
                }
                _ => Ok(id),
            };
        }

        let (prefix, synthesize): (&str, fn(usize) -> TypeKind) =
            if let Some(prefix) = name.strip_suffix('?') {
                (prefix, TypeKind::Optional)
            } else if let Some(prefix) = name.strip_suffix("[]") {
                (prefix, TypeKind::Array)
            } else {
                return Err(Error::UnknownType(name.to_owned()));
            };
        let inner = self.get_type(prefix, depth + 1)?;
        if matches!(
            self.nodes[inner].1,
            BuildKind::Done(TypeKind::Optional(_)) | BuildKind::Done(TypeKind::Array(_))
        ) {
            return Err(Error::NestedOptionalOrArray);
        }
        Ok(self.push_node(name, BuildKind::Done(synthesize(inner))))
    }

    /// Flatten a struct's inherited and own fields, caching the result.
    fn fill_struct(&mut self, id: usize, depth: usize) -> Result<()> {
        if depth >= MAX_ABI_DEPTH {
            return Err(Error::AbiRecursionLimit);
        }
        let def = match &self.nodes[id].1 {
            BuildKind::Struct { filled: true, .. } => return Ok(()),
            BuildKind::Struct { def, .. } => *def,
            // Built-in structs arrive pre-flattened.
            BuildKind::Done(TypeKind::Struct(_)) => return Ok(()),
            _ => return Err(Error::NotAStruct(self.nodes[id].0.clone())),
        };

        let mut base = None;
        let mut fields = Vec::new();
        if !def.base.is_empty() {
            let base_id = self.get_type(&def.base, depth + 1)?;
            self.fill_struct(base_id, depth + 1)?;
            fields = match &self.nodes[base_id].1 {
                BuildKind::Struct {
                    fields: base_fields,
                    ..
                } => base_fields.clone(),
                BuildKind::Done(TypeKind::Struct(layout)) => layout.fields.clone(),
                _ => return Err(Error::NotAStruct(self.nodes[base_id].0.clone())),
            };
            base = Some(base_id);
        }
        for field in &def.fields {
            let type_id = self.get_type(&field.type_name, depth + 1)?;
            fields.push(AbiField {
                name: field.name.clone(),
                type_id,
            });
        }

        if let BuildKind::Struct {
            base: base_slot,
            fields: field_slot,
            filled,
            ..
        } = &mut self.nodes[id].1
        {
            *base_slot = base;
            *field_slot = fields;
            *filled = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::AbiDef;

    fn abi(json: &str) -> AbiDef {
        AbiDef::from_json(json).expect("parse abi")
    }

    #[test]
    fn builtin_types_are_available() {
        let contract = Contract::new(&AbiDef::default()).expect("empty abi resolves");
        for (name, _) in Primitive::ALL {
            assert!(
                contract.resolve_root(name, 0).is_ok(),
                "missing builtin {name}"
            );
        }
        assert!(contract.resolve_root("extended_asset", 0).is_ok());
    }

    #[test]
    fn suffix_forms_resolve_without_nesting() {
        let contract = Contract::new(&AbiDef::default()).expect("resolve");
        assert!(contract.resolve_root("uint8?", 0).is_ok());
        assert!(contract.resolve_root("uint8[]", 0).is_ok());
        for name in ["uint8??", "uint8[][]", "uint8[]?", "uint8?[]"] {
            assert!(
                matches!(
                    contract.resolve_root(name, 0),
                    Err(Error::NestedOptionalOrArray)
                ),
                "accepted {name}"
            );
        }
    }

    #[test]
    fn unknown_type_is_reported_by_name() {
        let contract = Contract::new(&AbiDef::default()).expect("resolve");
        let err = contract.resolve_root("mystery", 0).unwrap_err();
        assert_eq!(err.to_string(), "unknown type \"mystery\"");
    }

    #[test]
    fn aliases_resolve_past_chains() {
        let abi = abi(r#"{
            "types": [
                {"new_type_name": "a", "type": "b"},
                {"new_type_name": "b", "type": "uint32"}
            ]
        }"#);
        let contract = Contract::new(&abi).expect("resolve");
        let root = contract.resolve_root("a", 0).expect("lookup a");
        let node = contract.root_node(&root);
        assert!(matches!(node.kind, TypeKind::Primitive(Primitive::Uint32)));
    }

    #[test]
    fn alias_cycle_hits_the_depth_cap() {
        let err = Contract::new(&abi(r#"{
            "types": [
                {"new_type_name": "a", "type": "b"},
                {"new_type_name": "b", "type": "a"}
            ]
        }"#))
        .unwrap_err();
        assert_eq!(err.to_string(), "abi recursion limit reached");
    }

    #[test]
    fn redefinitions_are_rejected() {
        let err = Contract::new(&abi(r#"{
            "types": [{"new_type_name": "name", "type": "uint64"}]
        }"#))
        .unwrap_err();
        assert_eq!(err.to_string(), "abi redefines type \"name\"");

        let err = Contract::new(&abi(r#"{
            "structs": [
                {"name": "thing", "base": "", "fields": []},
                {"name": "thing", "base": "", "fields": []}
            ]
        }"#))
        .unwrap_err();
        assert_eq!(err.to_string(), "abi redefines type \"thing\"");
    }

    #[test]
    fn missing_names_are_rejected() {
        let err = Contract::new(&abi(r#"{"types": [{"new_type_name": "", "type": "name"}]}"#))
            .unwrap_err();
        assert_eq!(err.to_string(), "abi has a type with a missing name");

        let err = Contract::new(&abi(r#"{"structs": [{"name": "", "base": "", "fields": []}]}"#))
            .unwrap_err();
        assert_eq!(err.to_string(), "abi has a struct with a missing name");
    }

    #[test]
    fn inheritance_flattens_base_fields_first() {
        let abi = abi(r#"{
            "structs": [
                {"name": "parent", "base": "", "fields": [{"name": "p", "type": "uint8"}]},
                {"name": "child", "base": "parent", "fields": [{"name": "c", "type": "uint8"}]}
            ]
        }"#);
        let contract = Contract::new(&abi).expect("resolve");
        let root = contract.resolve_root("child", 0).expect("lookup child");
        match &contract.root_node(&root).kind {
            TypeKind::Struct(layout) => {
                let names: Vec<&str> =
                    layout.fields.iter().map(|f| f.name.as_str()).collect();
                assert_eq!(names, ["p", "c"]);
                assert!(layout.base.is_some());
            }
            other => panic!("child resolved to {other:?}"),
        }
    }

    #[test]
    fn non_struct_base_is_rejected() {
        let err = Contract::new(&abi(r#"{
            "structs": [{"name": "broken", "base": "uint8", "fields": []}]
        }"#))
        .unwrap_err();
        assert_eq!(err.to_string(), "abi type \"uint8\" is not a struct");
    }

    #[test]
    fn extended_asset_can_serve_as_base() {
        let abi = abi(r#"{
            "structs": [{"name": "wrapped", "base": "extended_asset",
                         "fields": [{"name": "memo", "type": "string"}]}]
        }"#);
        let contract = Contract::new(&abi).expect("resolve");
        let root = contract.resolve_root("wrapped", 0).expect("lookup");
        match &contract.root_node(&root).kind {
            TypeKind::Struct(layout) => {
                let names: Vec<&str> =
                    layout.fields.iter().map(|f| f.name.as_str()).collect();
                assert_eq!(names, ["quantity", "contract", "memo"]);
            }
            other => panic!("wrapped resolved to {other:?}"),
        }
    }

    #[test]
    fn deep_inheritance_chain_is_capped() {
        // The deepest child comes first, so filling it must walk the whole
        // ancestor chain in one recursive descent.
        let mut structs = String::new();
        for i in 0..40 {
            if i > 0 {
                structs.push(',');
            }
            let base = if i == 39 {
                String::new()
            } else {
                format!("s{}", i + 1)
            };
            structs.push_str(&format!(
                r#"{{"name": "s{i}", "base": "{base}", "fields": []}}"#
            ));
        }
        let err = Contract::new(&abi(&format!(r#"{{"structs": [{structs}]}}"#))).unwrap_err();
        assert_eq!(err.to_string(), "abi recursion limit reached");
    }

    #[test]
    fn resolved_contracts_are_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Contract>();
    }

    #[test]
    fn action_types_are_recorded() {
        let abi = abi(r#"{
            "structs": [{"name": "noop", "base": "", "fields": []}],
            "actions": [{"name": "doit", "type": "noop", "ricardian_contract": ""}]
        }"#);
        let contract = Contract::new(&abi).expect("resolve");
        assert_eq!(contract.action_type(Name::from_str("doit")), Some("noop"));
        assert_eq!(contract.action_type(Name::from_str("other")), None);
    }
}
