//! Compilation State: nested scopes plus global by-id tables.
//!
//! Scopes ("spaces") own name tables and are pushed and popped as the
//! lowerer walks the tree. Every entity is also recorded in a global table
//! keyed by id, which is what byte lowering consults once the nesting is
//! gone.

use std::collections::HashMap;

use malachite_common::NumericKind;

use crate::error::StateError;

pub type VariableId = u64;
pub type TypeId = u64;
pub type FunctionId = u64;
pub type ScopeId = u64;
pub type LabelId = u64;

/// Hands out ids for one compilation.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    variables: u64,
    types: u64,
    functions: u64,
    scopes: u64,
    labels: u64,
}

impl IdAllocator {
    pub fn variable(&mut self) -> VariableId {
        bump(&mut self.variables)
    }

    pub fn type_id(&mut self) -> TypeId {
        bump(&mut self.types)
    }

    pub fn function(&mut self) -> FunctionId {
        bump(&mut self.functions)
    }

    pub fn scope(&mut self) -> ScopeId {
        bump(&mut self.scopes)
    }

    pub fn label(&mut self) -> LabelId {
        bump(&mut self.labels)
    }
}

fn bump(counter: &mut u64) -> u64 {
    let id = *counter;
    *counter += 1;
    id
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Primitive,
    Class,
    Alias,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Type {
    pub id: TypeId,
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    pub category: TypeCategory,
    /// How the VM reads values of this type. `None` for `void`.
    pub vm_kind: Option<NumericKind>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub id: VariableId,
    pub name: String,
    pub type_id: TypeId,
    pub is_const: bool,
    /// The scope the variable was declared in.
    pub scope: ScopeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub id: FunctionId,
    pub name: String,
    pub params: Vec<TypeId>,
    pub return_type: TypeId,
}

#[derive(Debug, Clone, Default)]
struct Space {
    id: ScopeId,
    variables: HashMap<String, VariableId>,
    types: HashMap<String, TypeId>,
    functions: HashMap<String, Vec<FunctionId>>,
}

/// Primitive types seeded into the global space: name, size, VM kind.
const PRIMITIVES: [(&str, u64, Option<NumericKind>); 6] = [
    ("void", 1, None),
    ("int", 8, Some(NumericKind::Int)),
    ("uint", 8, Some(NumericKind::Uint)),
    ("float", 8, Some(NumericKind::Double)),
    ("bool", 1, Some(NumericKind::Uint)),
    ("char", 1, Some(NumericKind::Int)),
];

/// Scopes and symbol tables for one compilation.
#[derive(Debug, Clone)]
pub struct CompilationState {
    ids: IdAllocator,
    /// Innermost last. Index 0 is the global space and is never popped.
    spaces: Vec<Space>,
    variables: HashMap<VariableId, Variable>,
    types: HashMap<TypeId, Type>,
    functions: HashMap<FunctionId, Function>,
}

impl Default for CompilationState {
    fn default() -> Self {
        Self::new()
    }
}

impl CompilationState {
    /// A state holding only the global space with the primitive types.
    pub fn new() -> Self {
        let mut ids = IdAllocator::default();
        let global = Space {
            id: ids.scope(),
            ..Space::default()
        };
        let mut state = Self {
            ids,
            spaces: vec![global],
            variables: HashMap::new(),
            types: HashMap::new(),
            functions: HashMap::new(),
        };
        for (name, size, vm_kind) in PRIMITIVES {
            // The global space starts empty, so these never collide.
            let _ = state.declare_type(name, size, TypeCategory::Primitive, vm_kind);
        }
        state
    }

    // ---- Scopes ----

    /// Open a new innermost scope.
    pub fn push_scope(&mut self) -> ScopeId {
        let id = self.ids.scope();
        self.spaces.push(Space {
            id,
            ..Space::default()
        });
        id
    }

    /// Close the innermost scope. Its entities stay in the global tables.
    pub fn pop_scope(&mut self) -> Result<ScopeId, StateError> {
        if self.spaces.len() <= 1 {
            return Err(StateError::GlobalScope);
        }
        self.spaces
            .pop()
            .map(|space| space.id)
            .ok_or(StateError::GlobalScope)
    }

    /// Number of open scopes above the global space.
    pub fn depth(&self) -> usize {
        self.spaces.len() - 1
    }

    fn current(&mut self) -> &mut Space {
        let last = self.spaces.len() - 1;
        &mut self.spaces[last]
    }

    // ---- Declarations ----

    pub fn declare_variable(
        &mut self,
        name: &str,
        type_id: TypeId,
        is_const: bool,
    ) -> Result<VariableId, StateError> {
        if self.current().variables.contains_key(name) {
            return Err(StateError::Redeclared {
                name: name.to_string(),
            });
        }
        let id = self.ids.variable();
        let scope = self.current().id;
        self.current().variables.insert(name.to_string(), id);
        self.variables.insert(
            id,
            Variable {
                id,
                name: name.to_string(),
                type_id,
                is_const,
                scope,
            },
        );
        Ok(id)
    }

    pub fn declare_type(
        &mut self,
        name: &str,
        size: u64,
        category: TypeCategory,
        vm_kind: Option<NumericKind>,
    ) -> Result<TypeId, StateError> {
        if self.current().types.contains_key(name) {
            return Err(StateError::Redeclared {
                name: name.to_string(),
            });
        }
        let id = self.ids.type_id();
        self.current().types.insert(name.to_string(), id);
        self.types.insert(
            id,
            Type {
                id,
                name: name.to_string(),
                size,
                category,
                vm_kind,
            },
        );
        Ok(id)
    }

    /// Declare a function. Declarations under the same name accumulate as
    /// overloads.
    pub fn declare_function(
        &mut self,
        name: &str,
        params: Vec<TypeId>,
        return_type: TypeId,
    ) -> FunctionId {
        let id = self.ids.function();
        self.current()
            .functions
            .entry(name.to_string())
            .or_default()
            .push(id);
        self.functions.insert(
            id,
            Function {
                id,
                name: name.to_string(),
                params,
                return_type,
            },
        );
        id
    }

    pub fn new_label(&mut self) -> LabelId {
        self.ids.label()
    }

    // ---- Lookup, innermost scope first ----

    pub fn find_variable(&self, name: &str) -> Option<&Variable> {
        self.spaces
            .iter()
            .rev()
            .find_map(|space| space.variables.get(name))
            .and_then(|id| self.variables.get(id))
    }

    pub fn find_type(&self, name: &str) -> Option<&Type> {
        self.spaces
            .iter()
            .rev()
            .find_map(|space| space.types.get(name))
            .and_then(|id| self.types.get(id))
    }

    /// Every visible overload of `name`, innermost scope first and in
    /// declaration order within a scope.
    pub fn find_function_overloads(&self, name: &str) -> Vec<&Function> {
        self.spaces
            .iter()
            .rev()
            .filter_map(|space| space.functions.get(name))
            .flatten()
            .filter_map(|id| self.functions.get(id))
            .collect()
    }

    /// The first visible overload taking `arity` arguments.
    pub fn resolve_overload(&self, name: &str, arity: usize) -> Option<&Function> {
        self.find_function_overloads(name)
            .into_iter()
            .find(|f| f.params.len() == arity)
    }

    // ---- Global tables ----

    pub fn variable(&self, id: VariableId) -> Option<&Variable> {
        self.variables.get(&id)
    }

    pub fn type_of(&self, id: TypeId) -> Option<&Type> {
        self.types.get(&id)
    }

    pub fn function(&self, id: FunctionId) -> Option<&Function> {
        self.functions.get(&id)
    }

    /// All variables ever declared, ordered by id.
    pub fn variables(&self) -> Vec<&Variable> {
        let mut all: Vec<&Variable> = self.variables.values().collect();
        all.sort_by_key(|v| v.id);
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_are_seeded() {
        let state = CompilationState::new();
        let int = state.find_type("int").unwrap();
        assert_eq!(int.size, 8);
        assert_eq!(int.vm_kind, Some(NumericKind::Int));
        assert_eq!(state.find_type("bool").unwrap().size, 1);
        assert_eq!(state.find_type("void").unwrap().vm_kind, None);
        assert_eq!(state.depth(), 0);
    }

    #[test]
    fn shadowing_and_pop() {
        let mut state = CompilationState::new();
        let int = state.find_type("int").unwrap().id;
        state.push_scope();
        let outer = state.declare_variable("x", int, false).unwrap();
        state.push_scope();
        let inner = state.declare_variable("x", int, true).unwrap();
        assert_ne!(outer, inner);
        assert_eq!(state.find_variable("x").unwrap().id, inner);
        state.pop_scope().unwrap();
        assert_eq!(state.find_variable("x").unwrap().id, outer);
        assert!(state.variable(inner).is_some());
    }

    #[test]
    fn redeclaration_in_same_scope_fails() {
        let mut state = CompilationState::new();
        let int = state.find_type("int").unwrap().id;
        state.push_scope();
        state.declare_variable("x", int, false).unwrap();
        assert_eq!(
            state.declare_variable("x", int, false),
            Err(StateError::Redeclared {
                name: "x".to_string()
            })
        );
    }

    #[test]
    fn global_scope_cannot_be_popped() {
        let mut state = CompilationState::new();
        assert_eq!(state.pop_scope(), Err(StateError::GlobalScope));
        state.push_scope();
        assert!(state.pop_scope().is_ok());
        assert_eq!(state.pop_scope(), Err(StateError::GlobalScope));
    }

    #[test]
    fn overloads_resolve_by_arity_first_match() {
        let mut state = CompilationState::new();
        let int = state.find_type("int").unwrap().id;
        let float = state.find_type("float").unwrap().id;
        let one = state.declare_function("f", vec![int], int);
        let _other_one = state.declare_function("f", vec![float], float);
        let two = state.declare_function("f", vec![int, int], int);
        assert_eq!(state.find_function_overloads("f").len(), 3);
        assert_eq!(state.resolve_overload("f", 1).map(|f| f.id), Some(one));
        assert_eq!(state.resolve_overload("f", 2).map(|f| f.id), Some(two));
        assert!(state.resolve_overload("f", 3).is_none());
    }

    #[test]
    fn labels_are_unique() {
        let mut state = CompilationState::new();
        let a = state.new_label();
        let b = state.new_label();
        assert_ne!(a, b);
    }
}
