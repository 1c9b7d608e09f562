//! Constructor planning for generated mocks.
//!
//! Decides which constructors a mock exposes and how each one delegates,
//! applying the rules in order: required signatures are mandatory, designated
//! constructors are overridden, convenience constructors delegate to a
//! designated anchor, failable and throwing signatures are preserved but the
//! generated body always succeeds, and a type without constructors gets a
//! synthesized no-argument one.

use crate::diagnostics::DiagnosticSink;
use crate::model::{
    ConstructorRole, ConstructorVariant, Parameter, QualifiedName, SignatureKey,
};
use crate::resolve::{OverrideWalk, ResolveFailure, ResolvedMember};

/// How a planned constructor's body is shaped at emission time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DelegationShape {
    /// Overrides a designated or required constructor directly.
    Direct,
    /// Convenience constructor delegating to the anchor signature.
    Delegates { anchor: SignatureKey },
    /// Convenience signature emitted as designated because the only designated
    /// constructors live behind an unresolved base.
    PromotedConvenience,
    /// The type declared no constructors; a no-argument one is synthesized.
    SynthesizedDefault,
}

/// One constructor the generated mock will expose.
#[derive(Clone, Debug)]
pub struct PlannedConstructor {
    pub variant: ConstructorVariant,
    pub parameters: Vec<Parameter>,
    pub key: SignatureKey,
    pub shape: DelegationShape,
    pub declared_in: Option<QualifiedName>,
}

/// Output of constructor planning for one mockable type.
#[derive(Debug, Default)]
pub struct ConstructorPlan {
    pub constructors: Vec<PlannedConstructor>,
}

impl ConstructorPlan {
    /// Signatures the subtype relationship makes mandatory.
    #[must_use]
    pub fn required(&self) -> impl Iterator<Item = &PlannedConstructor> {
        self.constructors
            .iter()
            .filter(|constructor| constructor.variant.is_required())
    }
}

/// Plan the constructors for one type from its resolved override walk.
///
/// # Errors
/// Returns [`ResolveFailure::InaccessibleRequiredConstructor`] when a
/// required constructor is invisible to generated code, and
/// [`ResolveFailure::NoDesignatedConstructor`] when only convenience
/// constructors exist and every base resolved.
pub fn plan_constructors(
    name: &QualifiedName,
    walk: &OverrideWalk,
    sink: &mut DiagnosticSink,
) -> Result<ConstructorPlan, ResolveFailure> {
    let declared: Vec<&ResolvedMember> = walk
        .members
        .iter()
        .filter(|member| member.member.constructor_variant().is_some())
        .collect();

    if declared.is_empty() {
        return Ok(ConstructorPlan {
            constructors: vec![synthesized_default()],
        });
    }

    // The anchor a convenience constructor delegates to: the first declared
    // designated or required constructor, in declaration order.
    let anchor = declared
        .iter()
        .find(|member| {
            member
                .member
                .constructor_variant()
                .is_some_and(ConstructorVariant::can_anchor_delegation)
        })
        .map(|member| member.key.clone());

    let mut plan = ConstructorPlan::default();
    for member in declared {
        let Some(variant) = member.member.constructor_variant() else {
            continue;
        };
        let shape = match variant.role {
            ConstructorRole::Required => {
                if !member.member.accessibility.reachable_from_mock() {
                    return Err(ResolveFailure::InaccessibleRequiredConstructor {
                        signature: member.key.to_string(),
                    });
                }
                DelegationShape::Direct
            }
            ConstructorRole::Designated => DelegationShape::Direct,
            ConstructorRole::Convenience => match &anchor {
                Some(anchor) => DelegationShape::Delegates {
                    anchor: anchor.clone(),
                },
                None if walk.has_unresolved_base => {
                    sink.push_warning(
                        format!(
                            "no designated constructor is reachable past the unresolved base; \
                             emitting `{}` as designated",
                            member.key
                        ),
                        name.qualified(),
                    );
                    DelegationShape::PromotedConvenience
                }
                None => return Err(ResolveFailure::NoDesignatedConstructor),
            },
        };
        plan.constructors.push(PlannedConstructor {
            variant,
            parameters: member.member.parameters.clone(),
            key: member.key.clone(),
            shape,
            declared_in: Some(member.declared_in.clone()),
        });
    }
    Ok(plan)
}

fn synthesized_default() -> PlannedConstructor {
    PlannedConstructor {
        variant: ConstructorVariant::plain(),
        parameters: Vec::new(),
        key: SignatureKey {
            kind: "constructor",
            name: "init".into(),
            parameters: Vec::new(),
        },
        shape: DelegationShape::SynthesizedDefault,
        declared_in: None,
    }
}
