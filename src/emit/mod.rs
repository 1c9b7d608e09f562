//! Rendering of resolved mock types into generated source artifacts.
//!
//! Output is deterministic: member order follows resolution order, and no
//! timestamps or environment details are written. Each mock delegates every
//! member to the embedded runtime: record into the ledger, then consult the
//! stub table for a result.

mod writer;

pub use writer::CodeWriter;

use std::path::PathBuf;

use crate::constructors::{DelegationShape, PlannedConstructor};
use crate::model::{
    Accessibility, ConstructorRole, DeclarationKind, Failability, GenericParam, Member,
    MemberKind, Parameter, Throwing, TypeReference, ERASED_TYPE,
};
use crate::resolve::MockableType;
use crate::runtime::{ConstructionPolicy, MissingStubPolicy};

/// File name suffix shared by every generated artifact.
pub const GENERATED_FILE_SUFFIX: &str = "Mocks.generated.swift";

/// Default artifact file name for a module.
#[must_use]
pub fn default_artifact_name(module: &str) -> String {
    format!("{module}{GENERATED_FILE_SUFFIX}")
}

/// Emission switches taken from the generator configuration.
#[derive(Clone, Debug)]
pub struct EmitOptions {
    /// Import the owning module explicitly instead of assuming same-module
    /// visibility.
    pub import_module: bool,
    /// Conditional-compilation expression wrapped around the whole artifact.
    pub preprocessor_condition: Option<String>,
    /// Missing-stub policy baked into each generated instance.
    pub policy: MissingStubPolicy,
    /// Whether failable constructors succeed or hand back the absence marker.
    pub construction: ConstructionPolicy,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            import_module: true,
            preprocessor_condition: None,
            policy: MissingStubPolicy::Fail,
            construction: ConstructionPolicy::Succeed,
        }
    }
}

/// One emitted source unit, ready for the external file writer.
#[derive(Clone, Debug)]
pub struct GeneratedArtifact {
    pub path: PathBuf,
    pub contents: String,
    /// Mock type names defined in this artifact.
    pub types: Vec<String>,
}

/// Render one mock type definition as a source block.
#[must_use]
pub fn render_mock(mockable: &MockableType, mock_name: &str, options: &EmitOptions) -> String {
    let mut writer = CodeWriter::new();
    let original = &mockable.name;
    let generics = render_generic_params(&mockable.generic_params);
    let supertype = render_supertype(mockable);

    writer.linef(format_args!("/// Mock of `{original}`."));
    writer.open(format!(
        "public final class {mock_name}{generics}: {supertype} {{"
    ));
    writer.linef(format_args!(
        "public let mock: MockCore = MockCore(type: \"{mock_name}\", policy: {}, construction: {})",
        policy_literal(options.policy),
        construction_literal(options.construction)
    ));
    if has_static_members(mockable) {
        writer.linef(format_args!(
            "public static let classMock: MockCore = MockCore(type: \"{mock_name}.class\", policy: {}, construction: {})",
            policy_literal(options.policy),
            construction_literal(options.construction)
        ));
    }

    for constructor in &mockable.constructor_plan.constructors {
        writer.blank();
        render_constructor(&mut writer, mockable, constructor);
    }

    for member in &mockable.override_set {
        match member.member.kind {
            MemberKind::Constructor(_) => {}
            MemberKind::Method => {
                writer.blank();
                render_method(&mut writer, mockable, &member.member);
            }
            MemberKind::Property => {
                writer.blank();
                render_property(&mut writer, mockable, &member.member);
            }
            MemberKind::Subscript => {
                writer.blank();
                render_subscript(&mut writer, &member.member);
            }
        }
    }

    writer.close("}");
    writer.finish()
}

/// Assemble rendered mock blocks into one artifact.
///
/// `imports` lists the owning modules; merged artifacts carry one import per
/// contributing module.
#[must_use]
pub fn render_artifact(
    path: PathBuf,
    label: &str,
    imports: &[String],
    blocks: &[(String, String)],
    options: &EmitOptions,
) -> GeneratedArtifact {
    let mut writer = CodeWriter::new();
    writer.line("// Generated by mocksmith. Do not edit.");
    writer.linef(format_args!("// Target module: {label}"));
    writer.blank();
    if let Some(condition) = options.preprocessor_condition.as_deref() {
        writer.linef(format_args!("#if {condition}"));
        writer.blank();
    }
    if options.import_module && !imports.is_empty() {
        for import in imports {
            writer.linef(format_args!("import {import}"));
        }
        writer.blank();
    }

    let mut types = Vec::with_capacity(blocks.len());
    for (index, (mock_name, block)) in blocks.iter().enumerate() {
        if index > 0 {
            writer.blank();
        }
        for line in block.lines() {
            writer.line(line);
        }
        types.push(mock_name.clone());
    }

    if options.preprocessor_condition.is_some() {
        writer.blank();
        writer.line("#endif");
    }

    GeneratedArtifact {
        path,
        contents: writer.finish(),
        types,
    }
}

/// Member identity used by the ledger and stub table, in selector form.
#[must_use]
pub fn member_identity(member: &Member) -> String {
    match member.kind {
        MemberKind::Method => selector(&member.name, &member.parameters),
        MemberKind::Property => member.name.clone(),
        MemberKind::Constructor(_) => selector("init", &member.parameters),
        MemberKind::Subscript => selector("subscript", &member.parameters),
    }
}

// Labels alone cannot tell overloads apart, so the identity carries the
// rendered parameter types as well.
fn selector(name: &str, parameters: &[Parameter]) -> String {
    let entries: Vec<String> = parameters
        .iter()
        .map(|parameter| {
            format!(
                "{}: {}",
                parameter.label.as_deref().unwrap_or(&parameter.name),
                parameter.ty.render()
            )
        })
        .collect();
    format!("{name}({})", entries.join(", "))
}

fn policy_literal(policy: MissingStubPolicy) -> &'static str {
    match policy {
        MissingStubPolicy::ReturnDefault => ".returnDefault",
        MissingStubPolicy::Fail => ".fail",
    }
}

fn construction_literal(construction: ConstructionPolicy) -> &'static str {
    match construction {
        ConstructionPolicy::Succeed => ".succeed",
        ConstructionPolicy::Fail => ".fail",
    }
}

fn has_static_members(mockable: &MockableType) -> bool {
    mockable
        .override_set
        .iter()
        .any(|member| member.member.is_static)
}

fn render_supertype(mockable: &MockableType) -> String {
    let arguments: Vec<String> = mockable
        .generic_params
        .iter()
        .map(|param| param.name.clone())
        .collect();
    if arguments.is_empty() {
        mockable.name.name.clone()
    } else {
        format!("{}<{}>", mockable.name.name, arguments.join(", "))
    }
}

fn render_generic_params(params: &[GenericParam]) -> String {
    if params.is_empty() {
        return String::new();
    }
    let rendered: Vec<String> = params
        .iter()
        .map(|param| {
            if param.constraints.is_empty() {
                param.name.clone()
            } else {
                let constraints: Vec<String> = param
                    .constraints
                    .iter()
                    .map(TypeReference::render)
                    .collect();
                format!("{}: {}", param.name, constraints.join(" & "))
            }
        })
        .collect();
    format!("<{}>", rendered.join(", "))
}

fn render_parameter_list(parameters: &[Parameter]) -> String {
    let rendered: Vec<String> = parameters
        .iter()
        .map(|parameter| match parameter.label.as_deref() {
            Some(label) if label != parameter.name => {
                format!("{label} {}: {}", parameter.name, parameter.ty.render())
            }
            _ => format!("{}: {}", parameter.name, parameter.ty.render()),
        })
        .collect();
    rendered.join(", ")
}

fn recorded_args(parameters: &[Parameter]) -> String {
    let names: Vec<&str> = parameters
        .iter()
        .map(|parameter| parameter.name.as_str())
        .collect();
    format!("[{}]", names.join(", "))
}

fn access_keyword(accessibility: Accessibility) -> &'static str {
    match accessibility {
        Accessibility::Public => "public ",
        // Internal is the source default; private members never reach emission.
        Accessibility::Internal | Accessibility::Private => "",
    }
}

fn render_constructor(
    writer: &mut CodeWriter,
    mockable: &MockableType,
    constructor: &PlannedConstructor,
) {
    let identity = selector("init", &constructor.parameters);
    let is_class = matches!(mockable.kind, DeclarationKind::Class);

    // Role and shape decide the introducer keywords; the failability and
    // throwing axes only shape the signature. Every combination is spelled
    // out so a new variant forces this match to be revisited.
    let introducer = match (constructor.variant.role, &constructor.shape) {
        (ConstructorRole::Required, _) => "required ",
        (ConstructorRole::Convenience, DelegationShape::Delegates { .. }) => "convenience ",
        (ConstructorRole::Convenience, _) => "",
        (ConstructorRole::Designated, DelegationShape::Direct) if is_class => "override ",
        (ConstructorRole::Designated, _) => "",
    };
    let name = match constructor.variant.failability {
        Failability::Ordinary => "init",
        Failability::Failable => "init?",
        Failability::ForceUnwrapped => "init!",
    };
    let effect = match constructor.variant.throwing {
        Throwing::Throws => " throws",
        Throwing::NonThrowing => "",
    };

    let annotation = shape_annotation(&constructor.shape, constructor.variant.role);
    writer.linef(format_args!("/// `{identity}` {annotation}"));
    writer.open(format!(
        "public {introducer}{name}({}){effect} {{",
        render_parameter_list(&constructor.parameters)
    ));

    if let DelegationShape::Delegates { anchor } = &constructor.shape {
        let target = mockable
            .constructor_plan
            .constructors
            .iter()
            .find(|candidate| &candidate.key == anchor);
        if let Some(target) = target {
            let forwarded: Vec<String> = target
                .parameters
                .iter()
                .map(|parameter| anchor_argument(parameter, &constructor.parameters))
                .collect();
            writer.linef(format_args!("self.init({})", forwarded.join(", ")));
        }
    } else if is_class && constructor.shape == DelegationShape::Direct {
        let forwarded: Vec<String> = constructor
            .parameters
            .iter()
            .map(|parameter| {
                format!(
                    "{}: {}",
                    parameter.label.as_deref().unwrap_or(&parameter.name),
                    parameter.name
                )
            })
            .collect();
        writer.linef(format_args!("super.init({})", forwarded.join(", ")));
    }

    // A failable signature still yields a structurally complete instance;
    // failure is surfaced through the absence marker on the core.
    if constructor.variant.failability != Failability::Ordinary {
        writer.open("if mock.constructionIndicatesFailure() {");
        writer.line("mock.markAbsent()");
        writer.close("}");
    }

    writer.linef(format_args!(
        "mock.record(\"{identity}\", {})",
        recorded_args(&constructor.parameters)
    ));
    writer.close("}");
}

/// Argument passed to the anchor for one of its parameters: the matching
/// convenience argument when one exists, a default-constructed value
/// otherwise. Erased types have no initializer, so a bridged unit stands in.
fn anchor_argument(anchor_param: &Parameter, convenience_params: &[Parameter]) -> String {
    let label = anchor_param.label.as_deref().unwrap_or(&anchor_param.name);
    let rendered = anchor_param.ty.render();
    let matched = convenience_params.iter().find(|own| {
        own.label.as_deref().unwrap_or(&own.name) == label && own.ty.render() == rendered
    });
    let value = match matched {
        Some(own) => own.name.clone(),
        None if rendered == ERASED_TYPE => "() as AnyObject".to_owned(),
        None => format!("{rendered}()"),
    };
    format!("{label}: {value}")
}

fn shape_annotation(shape: &DelegationShape, role: ConstructorRole) -> String {
    match shape {
        DelegationShape::Direct => match role {
            ConstructorRole::Required => "[required]".into(),
            ConstructorRole::Designated => "[designated]".into(),
            ConstructorRole::Convenience => "[convenience]".into(),
        },
        DelegationShape::Delegates { anchor } => {
            format!("[convenience, delegates to `{anchor}`]")
        }
        DelegationShape::PromotedConvenience => "[convenience emitted as designated]".into(),
        DelegationShape::SynthesizedDefault => "[synthesized]".into(),
    }
}

fn render_method(writer: &mut CodeWriter, mockable: &MockableType, member: &Member) {
    let identity = member_identity(member);
    let is_class = matches!(mockable.kind, DeclarationKind::Class);
    let access = access_keyword(member.accessibility);
    let override_keyword = if is_class { "override " } else { "" };
    let scope = if member.is_static { "class " } else { "" };
    let generics = render_generic_params(&member.generic_params);
    let return_clause = member
        .return_type
        .as_ref()
        .map(|ty| format!(" -> {}", ty.render()))
        .unwrap_or_default();
    let core = if member.is_static { "Self.classMock" } else { "mock" };

    writer.open(format!(
        "{access}{override_keyword}{scope}func {}{generics}({}){return_clause} {{",
        member.name,
        render_parameter_list(&member.parameters)
    ));
    writer.linef(format_args!(
        "{core}.record(\"{identity}\", {})",
        recorded_args(&member.parameters)
    ));
    match member.return_type.as_ref() {
        Some(return_type) => writer.linef(format_args!(
            "return {core}.answer(\"{identity}\", {}, returning: \"{}\")",
            recorded_args(&member.parameters),
            return_type.render()
        )),
        None => {
            writer.linef(format_args!(
                "{core}.answer(\"{identity}\", {}, returning: nil)",
                recorded_args(&member.parameters)
            ));
        }
    }
    writer.close("}");
}

fn render_property(writer: &mut CodeWriter, mockable: &MockableType, member: &Member) {
    let identity = member_identity(member);
    let is_class = matches!(mockable.kind, DeclarationKind::Class);
    let access = access_keyword(member.accessibility);
    let override_keyword = if is_class { "override " } else { "" };
    let scope = if member.is_static { "class " } else { "" };
    let value_type = member
        .return_type
        .as_ref()
        .map(TypeReference::render)
        .unwrap_or_else(|| TypeReference::erased().name);
    let core = if member.is_static { "Self.classMock" } else { "mock" };

    writer.open(format!(
        "{access}{override_keyword}{scope}var {}: {value_type} {{",
        member.name
    ));
    writer.open("get {");
    writer.linef(format_args!("{core}.record(\"{identity}.get\", [])"));
    writer.linef(format_args!(
        "return {core}.answer(\"{identity}.get\", [], returning: \"{value_type}\")"
    ));
    writer.close("}");
    if member.is_mutable {
        writer.open("set {");
        writer.linef(format_args!("{core}.record(\"{identity}.set\", [newValue])"));
        writer.close("}");
    }
    writer.close("}");
}

fn render_subscript(writer: &mut CodeWriter, member: &Member) {
    let identity = member_identity(member);
    let access = access_keyword(member.accessibility);
    let value_type = member
        .return_type
        .as_ref()
        .map(TypeReference::render)
        .unwrap_or_else(|| TypeReference::erased().name);

    writer.open(format!(
        "{access}subscript({}) -> {value_type} {{",
        render_parameter_list(&member.parameters)
    ));
    writer.open("get {");
    writer.linef(format_args!(
        "mock.record(\"{identity}.get\", {})",
        recorded_args(&member.parameters)
    ));
    writer.linef(format_args!(
        "return mock.answer(\"{identity}.get\", {}, returning: \"{value_type}\")",
        recorded_args(&member.parameters)
    ));
    writer.close("}");
    if member.is_mutable {
        writer.open("set {");
        writer.linef(format_args!(
            "mock.record(\"{identity}.set\", {})",
            recorded_args(&member.parameters)
        ));
        writer.close("}");
    }
    writer.close("}");
}
