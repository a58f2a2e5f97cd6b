use crate::ast::{Identifier, Type};
use std::collections::HashMap;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    Var,
    Const,
    Func,
    Array,
}

/// One declared name. For functions `ty` is the return type; for arrays it
/// is the element type.
#[derive(Clone, Debug, PartialEq)]
pub struct Symbol {
    pub name: Identifier,
    pub ty: Type,
    pub kind: SymbolKind,
    pub scope_level: usize,
    pub array_size: Option<usize>,
    pub param_types: Option<Vec<Type>>,
}

impl Symbol {
    pub fn var(name: Identifier, ty: Type, scope_level: usize) -> Self {
        Self {
            name,
            ty,
            kind: SymbolKind::Var,
            scope_level,
            array_size: None,
            param_types: None,
        }
    }

    pub fn constant(name: Identifier, ty: Type, scope_level: usize) -> Self {
        Self {
            kind: SymbolKind::Const,
            ..Self::var(name, ty, scope_level)
        }
    }

    pub fn array(name: Identifier, ty: Type, size: usize, scope_level: usize) -> Self {
        Self {
            kind: SymbolKind::Array,
            array_size: Some(size),
            ..Self::var(name, ty, scope_level)
        }
    }

    pub fn function(name: Identifier, return_type: Type, param_types: Vec<Type>) -> Self {
        Self {
            name,
            ty: return_type,
            kind: SymbolKind::Func,
            scope_level: 0,
            array_size: None,
            param_types: Some(param_types),
        }
    }
}

/// A stack of scope frames. Lookup walks outward; declaration checks only
/// the innermost frame, which is what makes shadowing legal.
pub struct SymbolTable {
    scopes: Vec<HashMap<Identifier, Symbol>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
        }
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn exit_scope(&mut self) {
        debug_assert!(self.scopes.len() > 1, "cannot pop the global scope");
        self.scopes.pop();
    }

    pub fn level(&self) -> usize {
        self.scopes.len() - 1
    }

    /// Define `symbol` in the innermost scope. Fails if the name is already
    /// taken there.
    pub fn declare(&mut self, symbol: Symbol) -> std::result::Result<(), ()> {
        let current = self.scopes.last_mut().expect("always one scope");
        if current.contains_key(&symbol.name) {
            return Err(());
        }
        current.insert(symbol.name.clone(), symbol);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
