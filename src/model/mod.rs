//! Immutable declaration model consumed by the mock synthesis pipeline.
//!
//! The model is built once per generation run from the external parser's
//! output and frozen before any resolution starts. Declarations live in an
//! arena addressed by [`DeclId`]; inheritance and conformance edges are plain
//! name references resolved against the arena.

mod arena;

pub use arena::{DeclId, DeclarationModel, ModelBuilder};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Module-qualified declaration name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    pub module: String,
    pub name: String,
}

impl QualifiedName {
    #[must_use]
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
        }
    }

    #[must_use]
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.module, self.name)
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.name)
    }
}

/// Reference to a type by name, with resolved generic arguments.
///
/// A reference may be dangling: the named declaration was not part of the
/// parsed set. That is recoverable; the resolver erases such types to a safe
/// placeholder and records a diagnostic.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeReference {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<TypeReference>,
}

/// Placeholder substituted for types whose declaration is missing from the model.
pub const ERASED_TYPE: &str = "AnyObject";

impl TypeReference {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
        }
    }

    #[must_use]
    pub fn generic(name: impl Into<String>, arguments: Vec<TypeReference>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    #[must_use]
    pub fn erased() -> Self {
        Self::named(ERASED_TYPE)
    }

    /// References written as `Module.Name` point at project declarations and
    /// must resolve against the model; bare names (primitives, generics) are
    /// passed through verbatim.
    #[must_use]
    pub fn is_module_qualified(&self) -> bool {
        self.name.contains('.')
    }

    /// Render the reference, including generic arguments.
    #[must_use]
    pub fn render(&self) -> String {
        if self.arguments.is_empty() {
            self.name.clone()
        } else {
            let args: Vec<String> = self.arguments.iter().map(TypeReference::render).collect();
            format!("{}<{}>", self.name, args.join(", "))
        }
    }
}

impl fmt::Display for TypeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Generic parameter declared on a type or member.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericParam {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<TypeReference>,
}

/// Mapping from generic parameter names to concrete type arguments, composed
/// along an inheritance edge.
#[derive(Clone, Debug, Default)]
pub struct Substitution {
    bindings: HashMap<String, TypeReference>,
}

impl Substitution {
    #[must_use]
    pub fn identity() -> Self {
        Self::default()
    }

    /// Bind the parameters of `params` to `arguments` supplied at an
    /// inheritance/conformance site, applying `outer` to the arguments first
    /// so chains of generic bases compose.
    #[must_use]
    pub fn bind(outer: &Substitution, params: &[GenericParam], arguments: &[TypeReference]) -> Self {
        let mut bindings = HashMap::new();
        for (param, argument) in params.iter().zip(arguments.iter()) {
            bindings.insert(param.name.clone(), outer.apply(argument));
        }
        Self { bindings }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Apply the substitution recursively through a type reference.
    #[must_use]
    pub fn apply(&self, reference: &TypeReference) -> TypeReference {
        if let Some(bound) = self.bindings.get(&reference.name) {
            if reference.arguments.is_empty() {
                return bound.clone();
            }
        }
        TypeReference {
            name: reference.name.clone(),
            arguments: reference
                .arguments
                .iter()
                .map(|argument| self.apply(argument))
                .collect(),
        }
    }
}

/// Accessibility level of a declaration or member.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accessibility {
    Private,
    Internal,
    Public,
}

impl Accessibility {
    /// Members below internal visibility cannot be reproduced by generated code.
    #[must_use]
    pub fn reachable_from_mock(self) -> bool {
        self >= Accessibility::Internal
    }
}

impl Default for Accessibility {
    fn default() -> Self {
        Accessibility::Internal
    }
}

/// Failability of a constructor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Failability {
    Ordinary,
    Failable,
    /// Failable with implicit unwrapping at use sites.
    ForceUnwrapped,
}

/// Whether a constructor can signal failure by throwing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Throwing {
    NonThrowing,
    Throws,
}

/// Designated/convenience/required classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConstructorRole {
    Designated,
    Convenience,
    Required,
}

/// The 3x2x3 constructor classification driving synthesis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConstructorVariant {
    pub failability: Failability,
    pub throwing: Throwing,
    pub role: ConstructorRole,
}

impl ConstructorVariant {
    #[must_use]
    pub fn plain() -> Self {
        Self {
            failability: Failability::Ordinary,
            throwing: Throwing::NonThrowing,
            role: ConstructorRole::Designated,
        }
    }

    #[must_use]
    pub fn is_required(self) -> bool {
        matches!(self.role, ConstructorRole::Required)
    }

    #[must_use]
    pub fn is_convenience(self) -> bool {
        matches!(self.role, ConstructorRole::Convenience)
    }

    #[must_use]
    pub fn can_anchor_delegation(self) -> bool {
        matches!(
            self.role,
            ConstructorRole::Designated | ConstructorRole::Required
        )
    }
}

/// Kind of a member, carrying the constructor classification where relevant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    Method,
    Property,
    Constructor(ConstructorVariant),
    Subscript,
}

impl MemberKind {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            MemberKind::Method => "method",
            MemberKind::Property => "property",
            MemberKind::Constructor(_) => "constructor",
            MemberKind::Subscript => "subscript",
        }
    }
}

/// A declared parameter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeReference,
}

impl Parameter {
    #[must_use]
    pub fn new(name: impl Into<String>, ty: TypeReference) -> Self {
        Self {
            label: None,
            name: name.into(),
            ty,
        }
    }
}

/// Identity of a member within one type: name plus parameter-type signature.
///
/// Two members with the same key are the same member for override purposes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct SignatureKey {
    pub kind: &'static str,
    pub name: String,
    pub parameters: Vec<String>,
}

impl fmt::Display for SignatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.parameters.join(", "))
    }
}

/// A declared member of a type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub kind: MemberKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(default, rename = "returns", skip_serializing_if = "Option::is_none")]
    pub return_type: Option<TypeReference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generic_params: Vec<GenericParam>,
    #[serde(default)]
    pub is_static: bool,
    /// Writable property or mutating method.
    #[serde(default)]
    pub is_mutable: bool,
    #[serde(default)]
    pub accessibility: Accessibility,
}

impl Member {
    /// Override-set key after applying `substitution` to parameter types.
    #[must_use]
    pub fn signature_key(&self, substitution: &Substitution) -> SignatureKey {
        SignatureKey {
            kind: self.kind.label(),
            name: self.name.clone(),
            parameters: self
                .parameters
                .iter()
                .map(|parameter| substitution.apply(&parameter.ty).render())
                .collect(),
        }
    }

    #[must_use]
    pub fn constructor_variant(&self) -> Option<ConstructorVariant> {
        match self.kind {
            MemberKind::Constructor(variant) => Some(variant),
            _ => None,
        }
    }
}

/// Protocol-like or class-like classification of a declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclarationKind {
    Interface,
    Class,
}

/// A parsed type declaration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Declaration {
    pub kind: DeclarationKind,
    #[serde(flatten)]
    pub name: QualifiedName,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generic_params: Vec<GenericParam>,
    /// Base class and conformances, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supertypes: Vec<TypeReference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<Member>,
    #[serde(default)]
    pub accessibility: Accessibility,
    /// Classes sealed against subclassing cannot be mocked.
    #[serde(default = "default_open")]
    pub is_open: bool,
}

fn default_open() -> bool {
    true
}

impl Declaration {
    /// Whether subclass-style substitution is possible at all. Interfaces are
    /// always open; classes must not be sealed.
    #[must_use]
    pub fn is_open_to_override(&self) -> bool {
        match self.kind {
            DeclarationKind::Interface => true,
            DeclarationKind::Class => self.is_open,
        }
    }

    #[must_use]
    pub fn constructors(&self) -> impl Iterator<Item = &Member> + '_ {
        self.members
            .iter()
            .filter(|member| matches!(member.kind, MemberKind::Constructor(_)))
    }
}
