//! Override-set resolution across inheritance and conformance graphs.
//!
//! For each mockable declaration the resolver walks its supertype graph,
//! bases first, and merges directly declared members into a single override
//! set keyed by member signature. A member declared closer to the target
//! shadows one inherited from further away; equal-distance duplicates are
//! either merged (structurally identical, first declaration wins) or fatal.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use crate::constructors::{plan_constructors, ConstructorPlan};
use crate::diagnostics::DiagnosticSink;
use crate::model::{
    DeclId, DeclarationKind, DeclarationModel, GenericParam, Member, MemberKind, QualifiedName,
    SignatureKey, Substitution, TypeReference,
};

/// A member of the override set, with provenance preserved for diagnostics.
#[derive(Clone, Debug)]
pub struct ResolvedMember {
    pub member: Member,
    pub key: SignatureKey,
    pub declared_in: QualifiedName,
    /// Distance from the target declaration in the supertype walk; zero for
    /// directly declared members.
    pub distance: u32,
}

impl ResolvedMember {
    #[must_use]
    pub fn is_inherited(&self) -> bool {
        self.distance > 0
    }
}

/// Fully resolved input for constructor planning and emission.
#[derive(Debug)]
pub struct MockableType {
    pub id: DeclId,
    pub name: QualifiedName,
    pub kind: DeclarationKind,
    pub generic_params: Vec<GenericParam>,
    /// Deduplicated, conflict-resolved members in stable resolution order.
    pub override_set: Vec<ResolvedMember>,
    pub constructor_plan: ConstructorPlan,
}

impl MockableType {
    /// Resolve `target` against the full model and plan its constructors.
    ///
    /// Recoverable conditions (unresolved references, ambiguous diamonds) are
    /// reported through `sink`; fatal conditions abort this type only.
    ///
    /// # Errors
    /// Returns a [`ResolveFailure`] for inheritance cycles, irreconcilable
    /// equal-distance members, and unreproducible constructor sets.
    pub fn build(
        model: &DeclarationModel,
        target: DeclId,
        sink: &mut DiagnosticSink,
    ) -> Result<Self, ResolveFailure> {
        let declaration = model.get(target);
        let walk = resolve_override_set(model, target, sink)?;
        let plan = plan_constructors(&declaration.name, &walk, sink)?;
        Ok(Self {
            id: target,
            name: declaration.name.clone(),
            kind: declaration.kind,
            generic_params: declaration.generic_params.clone(),
            override_set: walk.members,
            constructor_plan: plan,
        })
    }
}

/// Fatal, per-type resolution failures. Other types in the run are unaffected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolveFailure {
    /// The supertype graph contains a cycle reachable from the target.
    Cycle { path: Vec<String> },
    /// Two equal-distance members collide and cannot be reconciled.
    IrreconcilableMembers {
        signature: String,
        first: String,
        second: String,
    },
    /// A required constructor is invisible to generated code.
    InaccessibleRequiredConstructor { signature: String },
    /// Only convenience constructors exist and every base resolved, so no
    /// designated constructor is reachable anywhere.
    NoDesignatedConstructor,
}

impl fmt::Display for ResolveFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveFailure::Cycle { path } => {
                write!(f, "inheritance cycle: {}", path.join(" -> "))
            }
            ResolveFailure::IrreconcilableMembers {
                signature,
                first,
                second,
            } => write!(
                f,
                "member `{signature}` is declared incompatibly by both `{first}` and `{second}`"
            ),
            ResolveFailure::InaccessibleRequiredConstructor { signature } => write!(
                f,
                "required constructor `{signature}` is not visible to generated code"
            ),
            ResolveFailure::NoDesignatedConstructor => {
                write!(f, "no designated constructor is reachable")
            }
        }
    }
}

/// Intermediate result of the supertype walk, consumed by constructor planning.
#[derive(Debug)]
pub struct OverrideWalk {
    pub members: Vec<ResolvedMember>,
    pub has_unresolved_base: bool,
}

/// Walk the supertype graph of `target` and merge declared members.
///
/// # Errors
/// Returns [`ResolveFailure::Cycle`] when the graph loops back on itself and
/// [`ResolveFailure::IrreconcilableMembers`] for equal-distance collisions
/// that cannot be merged.
pub fn resolve_override_set(
    model: &DeclarationModel,
    target: DeclId,
    sink: &mut DiagnosticSink,
) -> Result<OverrideWalk, ResolveFailure> {
    detect_cycle(model, target)?;

    let origin = model.get(target).name.qualified();
    let mut members: Vec<ResolvedMember> = Vec::new();
    let mut by_key: HashMap<SignatureKey, usize> = HashMap::new();
    let mut erased_names: HashSet<String> = HashSet::new();
    let mut has_unresolved_base = false;

    let mut queue: VecDeque<(DeclId, u32, Substitution)> = VecDeque::new();
    let mut visited: HashSet<DeclId> = HashSet::new();
    queue.push_back((target, 0, Substitution::identity()));
    visited.insert(target);

    while let Some((id, distance, substitution)) = queue.pop_front() {
        let declaration = model.get(id);

        for member in &declaration.members {
            // Private required constructors stay in the walk so planning can
            // reject the type instead of silently dropping the signature.
            let required_constructor = matches!(
                member.kind,
                MemberKind::Constructor(variant) if variant.is_required()
            );
            if !member.accessibility.reachable_from_mock() && !required_constructor {
                continue;
            }
            let resolved = erase_dangling_types(
                model,
                member,
                &substitution,
                &origin,
                &mut erased_names,
                sink,
            );
            let key = resolved.signature_key(&Substitution::identity());
            merge_member(
                &mut members,
                &mut by_key,
                ResolvedMember {
                    member: resolved,
                    key,
                    declared_in: declaration.name.clone(),
                    distance,
                },
                sink,
                &origin,
            )?;
        }

        for supertype in &declaration.supertypes {
            let Some(base) = model.resolve(supertype) else {
                if supertype.is_module_qualified() {
                    has_unresolved_base = true;
                    sink.push_warning(
                        format!(
                            "base type `{}` was not part of the parsed set; its members are unknown",
                            supertype.render()
                        ),
                        origin.clone(),
                    );
                }
                continue;
            };
            if visited.insert(base) {
                let edge = Substitution::bind(
                    &substitution,
                    &model.get(base).generic_params,
                    &supertype.arguments,
                );
                queue.push_back((base, distance + 1, edge));
            }
        }
    }

    tracing::debug!(
        target: "resolve",
        declaration = %origin,
        members = members.len(),
        unresolved_base = has_unresolved_base,
        "override set resolved"
    );

    Ok(OverrideWalk {
        members,
        has_unresolved_base,
    })
}

/// Depth-first three-colour walk over supertype edges; a back edge is fatal.
fn detect_cycle(model: &DeclarationModel, target: DeclId) -> Result<(), ResolveFailure> {
    #[derive(Clone, Copy, PartialEq)]
    enum Colour {
        InProgress,
        Done,
    }

    let mut colours: HashMap<DeclId, Colour> = HashMap::new();
    // Stack frames carry the remaining supertype references of their node.
    let mut stack: Vec<(DeclId, usize)> = vec![(target, 0)];
    colours.insert(target, Colour::InProgress);
    let mut path: Vec<DeclId> = vec![target];

    while let Some((id, edge)) = stack.pop() {
        let declaration = model.get(id);
        if edge >= declaration.supertypes.len() {
            colours.insert(id, Colour::Done);
            path.pop();
            continue;
        }
        stack.push((id, edge + 1));
        let Some(base) = model.resolve(&declaration.supertypes[edge]) else {
            continue;
        };
        match colours.get(&base) {
            Some(Colour::InProgress) => {
                let mut names: Vec<String> = path
                    .iter()
                    .skip_while(|entry| **entry != base)
                    .map(|entry| model.get(*entry).name.qualified())
                    .collect();
                names.push(model.get(base).name.qualified());
                return Err(ResolveFailure::Cycle { path: names });
            }
            Some(Colour::Done) => {}
            None => {
                colours.insert(base, Colour::InProgress);
                path.push(base);
                stack.push((base, 0));
            }
        }
    }
    Ok(())
}

/// Apply the inheritance-site substitution and erase references to types the
/// parser never handed over. Erasure keeps the member usable; the mock cannot
/// name a type that does not exist.
fn erase_dangling_types(
    model: &DeclarationModel,
    member: &Member,
    substitution: &Substitution,
    origin: &str,
    already_erased: &mut HashSet<String>,
    sink: &mut DiagnosticSink,
) -> Member {
    let mut resolved = member.clone();
    for parameter in &mut resolved.parameters {
        parameter.ty = erase_reference(
            model,
            &substitution.apply(&parameter.ty),
            origin,
            already_erased,
            sink,
        );
    }
    if let Some(return_type) = resolved.return_type.take() {
        resolved.return_type = Some(erase_reference(
            model,
            &substitution.apply(&return_type),
            origin,
            already_erased,
            sink,
        ));
    }
    resolved
}

fn erase_reference(
    model: &DeclarationModel,
    reference: &TypeReference,
    origin: &str,
    already_erased: &mut HashSet<String>,
    sink: &mut DiagnosticSink,
) -> TypeReference {
    if reference.is_module_qualified() && model.resolve(reference).is_none() {
        if already_erased.insert(reference.name.clone()) {
            sink.push_warning(
                format!(
                    "type `{}` is not in the parsed set; erased to `{}`",
                    reference.name,
                    TypeReference::erased().name
                ),
                origin.to_owned(),
            );
        }
        return TypeReference::erased();
    }
    TypeReference {
        name: reference.name.clone(),
        arguments: reference
            .arguments
            .iter()
            .map(|argument| erase_reference(model, argument, origin, already_erased, sink))
            .collect(),
    }
}

/// Merge one resolved member into the accumulating override set.
fn merge_member(
    members: &mut Vec<ResolvedMember>,
    by_key: &mut HashMap<SignatureKey, usize>,
    incoming: ResolvedMember,
    sink: &mut DiagnosticSink,
    origin: &str,
) -> Result<(), ResolveFailure> {
    let Some(&existing_index) = by_key.get(&incoming.key) else {
        by_key.insert(incoming.key.clone(), members.len());
        members.push(incoming);
        return Ok(());
    };
    let existing = &members[existing_index];

    // Levels are processed in distance order, so the existing entry is never
    // further away than the incoming one.
    if existing.distance < incoming.distance {
        return Ok(());
    }

    if structurally_identical(&existing.member, &incoming.member) {
        sink.push_warning(
            format!(
                "member `{}` is declared by both `{}` and `{}`; keeping the first declaration",
                incoming.key, existing.declared_in, incoming.declared_in
            ),
            origin.to_owned(),
        );
        return Ok(());
    }

    Err(ResolveFailure::IrreconcilableMembers {
        signature: incoming.key.to_string(),
        first: existing.declared_in.qualified(),
        second: incoming.declared_in.qualified(),
    })
}

fn structurally_identical(a: &Member, b: &Member) -> bool {
    a.kind == b.kind
        && a.return_type == b.return_type
        && a.is_static == b.is_static
        && a.parameters
            .iter()
            .zip(b.parameters.iter())
            .all(|(left, right)| left.ty == right.ty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Accessibility, Declaration, ModelBuilder, Parameter};

    fn method(name: &str, params: &[(&str, &str)], returns: Option<&str>) -> Member {
        Member {
            kind: MemberKind::Method,
            name: name.into(),
            parameters: params
                .iter()
                .map(|(param, ty)| Parameter::new(*param, TypeReference::named(*ty)))
                .collect(),
            return_type: returns.map(TypeReference::named),
            generic_params: Vec::new(),
            is_static: false,
            is_mutable: false,
            accessibility: Accessibility::Public,
        }
    }

    fn class(module: &str, name: &str, supertypes: &[&str], members: Vec<Member>) -> Declaration {
        Declaration {
            kind: DeclarationKind::Class,
            name: QualifiedName::new(module, name),
            generic_params: Vec::new(),
            supertypes: supertypes
                .iter()
                .map(|base| TypeReference::named(*base))
                .collect(),
            members,
            accessibility: Accessibility::Public,
            is_open: true,
        }
    }

    fn interface(module: &str, name: &str, supertypes: &[&str], members: Vec<Member>) -> Declaration {
        Declaration {
            kind: DeclarationKind::Interface,
            ..class(module, name, supertypes, members)
        }
    }

    #[test]
    fn closer_declaration_overrides_inherited_member() {
        let mut builder = ModelBuilder::new();
        builder.push(class(
            "App",
            "Base",
            &[],
            vec![method("describe", &[], Some("String"))],
        ));
        let child = builder.push(class(
            "App",
            "Child",
            &["App.Base"],
            vec![method("describe", &[], Some("String"))],
        ));
        let model = builder.freeze();

        let mut sink = DiagnosticSink::default();
        let walk = resolve_override_set(&model, child, &mut sink).unwrap();
        assert_eq!(walk.members.len(), 1);
        assert_eq!(walk.members[0].declared_in.name, "Child");
        assert_eq!(walk.members[0].distance, 0);
    }

    #[test]
    fn diamond_conformance_merges_to_one_member() {
        let mut builder = ModelBuilder::new();
        builder.push(interface(
            "App",
            "Readable",
            &[],
            vec![method("close", &[], None)],
        ));
        builder.push(interface(
            "App",
            "Writable",
            &[],
            vec![method("close", &[], None)],
        ));
        let target = builder.push(interface(
            "App",
            "Stream",
            &["App.Readable", "App.Writable"],
            vec![],
        ));
        let model = builder.freeze();

        let mut sink = DiagnosticSink::default();
        let walk = resolve_override_set(&model, target, &mut sink).unwrap();
        assert_eq!(walk.members.len(), 1, "diamond merges to a single member");
        assert_eq!(walk.members[0].declared_in.name, "Readable");
        let diagnostics = sink.into_vec();
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("keeping the first declaration"));
    }

    #[test]
    fn equal_distance_incompatible_members_are_fatal() {
        let mut builder = ModelBuilder::new();
        builder.push(interface(
            "App",
            "A",
            &[],
            vec![method("value", &[], Some("Int"))],
        ));
        builder.push(interface(
            "App",
            "B",
            &[],
            vec![method("value", &[], Some("String"))],
        ));
        let target = builder.push(interface("App", "Both", &["App.A", "App.B"], vec![]));
        let model = builder.freeze();

        let mut sink = DiagnosticSink::default();
        let failure = resolve_override_set(&model, target, &mut sink).unwrap_err();
        assert!(matches!(
            failure,
            ResolveFailure::IrreconcilableMembers { .. }
        ));
    }

    #[test]
    fn inheritance_cycle_is_fatal_for_the_type() {
        let mut builder = ModelBuilder::new();
        builder.push(class("App", "A", &["App.B"], vec![]));
        let b = builder.push(class("App", "B", &["App.A"], vec![]));
        let model = builder.freeze();

        let mut sink = DiagnosticSink::default();
        let failure = resolve_override_set(&model, b, &mut sink).unwrap_err();
        let ResolveFailure::Cycle { path } = failure else {
            panic!("expected a cycle failure");
        };
        assert!(path.len() >= 2);
    }

    #[test]
    fn generic_base_members_are_substituted() {
        let mut builder = ModelBuilder::new();
        builder.push(Declaration {
            generic_params: vec![GenericParam {
                name: "Element".into(),
                constraints: Vec::new(),
            }],
            ..interface(
                "App",
                "Store",
                &[],
                vec![method("first", &[], Some("Element"))],
            )
        });
        let target = builder.push(Declaration {
            supertypes: vec![TypeReference::generic(
                "App.Store",
                vec![TypeReference::named("Int")],
            )],
            ..interface("App", "IntStore", &[], vec![])
        });
        let model = builder.freeze();

        let mut sink = DiagnosticSink::default();
        let walk = resolve_override_set(&model, target, &mut sink).unwrap();
        let first = &walk.members[0];
        assert_eq!(
            first.member.return_type.as_ref().map(TypeReference::render),
            Some("Int".into())
        );
    }

    #[test]
    fn dangling_member_types_are_erased_with_diagnostic() {
        let mut builder = ModelBuilder::new();
        let target = builder.push(interface(
            "App",
            "Uses",
            &[],
            vec![method("fetch", &[("request", "Net.Request")], Some("Int"))],
        ));
        let model = builder.freeze();

        let mut sink = DiagnosticSink::default();
        let walk = resolve_override_set(&model, target, &mut sink).unwrap();
        assert_eq!(walk.members[0].member.parameters[0].ty.name, "AnyObject");
        assert!(!sink.is_empty(), "erasure must leave a diagnostic behind");
    }

    #[test]
    fn unresolved_base_is_recoverable_and_flagged() {
        let mut builder = ModelBuilder::new();
        let target = builder.push(class("App", "Orphan", &["Vendor.Base"], vec![]));
        let model = builder.freeze();

        let mut sink = DiagnosticSink::default();
        let walk = resolve_override_set(&model, target, &mut sink).unwrap();
        assert!(walk.has_unresolved_base);
        assert!(!sink.is_empty());
    }

    #[test]
    fn mockable_type_carries_constructor_plan() {
        let mut builder = ModelBuilder::new();
        let target = builder.push(class("App", "Plain", &[], vec![]));
        let model = builder.freeze();

        let mut sink = DiagnosticSink::default();
        let mockable = MockableType::build(&model, target, &mut sink).unwrap();
        assert_eq!(mockable.name.qualified(), "App.Plain");
        assert_eq!(
            mockable.constructor_plan.constructors.len(),
            1,
            "a type without constructors gets a synthesized no-argument one"
        );
    }
}
