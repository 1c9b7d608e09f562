//! Arena storage for declarations with name-based lookup.

use std::collections::HashMap;

use super::{Declaration, TypeReference};

/// Index of a declaration in the model arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(u32);

impl DeclId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Mutable accumulator for declarations handed over by the external parser.
///
/// Declaration order is preserved; it is the stable sort key used for
/// deterministic tie-breaking later in the pipeline.
#[derive(Debug, Default)]
pub struct ModelBuilder {
    declarations: Vec<Declaration>,
    by_name: HashMap<String, DeclId>,
    duplicates: Vec<String>,
}

impl ModelBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a declaration. The first declaration under a qualified name wins;
    /// later duplicates are recorded and surfaced by the loader.
    pub fn push(&mut self, declaration: Declaration) -> DeclId {
        let qualified = declaration.name.qualified();
        if let Some(existing) = self.by_name.get(&qualified) {
            self.duplicates.push(qualified);
            return *existing;
        }
        let id = DeclId(u32::try_from(self.declarations.len()).unwrap_or(u32::MAX));
        self.by_name.insert(qualified, id);
        self.declarations.push(declaration);
        id
    }

    #[must_use]
    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }

    /// Freeze into the read-only snapshot shared across workers.
    #[must_use]
    pub fn freeze(self) -> DeclarationModel {
        DeclarationModel {
            declarations: self.declarations,
            by_name: self.by_name,
        }
    }
}

/// Read-only snapshot of every declaration in a generation run.
#[derive(Debug)]
pub struct DeclarationModel {
    declarations: Vec<Declaration>,
    by_name: HashMap<String, DeclId>,
}

impl DeclarationModel {
    /// # Panics
    /// Panics if `id` was minted by a different model.
    #[must_use]
    pub fn get(&self, id: DeclId) -> &Declaration {
        &self.declarations[id.index()]
    }

    /// Resolve a qualified name to its declaration, if it was parsed.
    #[must_use]
    pub fn lookup(&self, qualified: &str) -> Option<DeclId> {
        self.by_name.get(qualified).copied()
    }

    /// Resolve a type reference against the arena. Bare (non-qualified) names
    /// never resolve here; they denote primitives or generic parameters.
    #[must_use]
    pub fn resolve(&self, reference: &TypeReference) -> Option<DeclId> {
        if reference.is_module_qualified() {
            self.lookup(&reference.name)
        } else {
            None
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Iterate declarations in declaration order.
    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = (DeclId, &Declaration)> {
        self.declarations
            .iter()
            .enumerate()
            .map(|(index, declaration)| {
                (DeclId(u32::try_from(index).unwrap_or(u32::MAX)), declaration)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Accessibility, DeclarationKind, QualifiedName};

    fn declaration(module: &str, name: &str) -> Declaration {
        Declaration {
            kind: DeclarationKind::Class,
            name: QualifiedName::new(module, name),
            generic_params: Vec::new(),
            supertypes: Vec::new(),
            members: Vec::new(),
            accessibility: Accessibility::Public,
            is_open: true,
        }
    }

    #[test]
    fn push_and_lookup_round_trip() {
        let mut builder = ModelBuilder::new();
        let id = builder.push(declaration("App", "Service"));
        let model = builder.freeze();
        assert_eq!(model.lookup("App.Service"), Some(id));
        assert_eq!(model.get(id).name.name, "Service");
        assert_eq!(model.lookup("App.Missing"), None);
    }

    #[test]
    fn duplicate_names_keep_first_declaration() {
        let mut builder = ModelBuilder::new();
        let first = builder.push(declaration("App", "Service"));
        let second = builder.push(declaration("App", "Service"));
        assert_eq!(first, second);
        assert_eq!(builder.duplicates(), ["App.Service"]);
    }

    #[test]
    fn bare_names_never_resolve() {
        let mut builder = ModelBuilder::new();
        builder.push(declaration("App", "Service"));
        let model = builder.freeze();
        assert_eq!(model.resolve(&TypeReference::named("Service")), None);
        assert!(model
            .resolve(&TypeReference::named("App.Service"))
            .is_some());
    }
}
