//! Generation entry point: eligibility, parallel per-type synthesis, and
//! artifact assembly.
//!
//! The declaration model is a read-only snapshot, so independent types run
//! through resolve/plan/emit concurrently. Mock names are claimed in
//! declaration order before dispatch, keeping output independent of worker
//! scheduling. A failure in one type never blocks the rest of the run.

use rayon::prelude::*;
use serde::Serialize;
use std::path::PathBuf;

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::emit::{
    default_artifact_name, render_artifact, render_mock, EmitOptions, GeneratedArtifact,
};
use crate::error::{Error, Result};
use crate::model::{DeclId, DeclarationKind, DeclarationModel};
use crate::naming::NameArbiter;
use crate::resolve::MockableType;
use crate::runtime::{ConstructionPolicy, MissingStubPolicy};

/// Where generated artifacts land.
#[derive(Clone, Debug)]
pub enum OutputLayout {
    /// One artifact per target module under this directory, using the
    /// default `<Module>Mocks.generated.swift` file name.
    PerModule(PathBuf),
    /// Explicit output paths, one per target module, in target order.
    Explicit(Vec<PathBuf>),
    /// All mocks merged into a single artifact.
    Merged(PathBuf),
}

/// Configuration record accepted by the entry point.
#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    /// Modules whose declarations are mocked.
    pub target_modules: Vec<String>,
    pub outputs: OutputLayout,
    /// Conditional-compilation expression honoured by the emitted artifact.
    pub preprocessor_condition: Option<String>,
    /// Whether generated code imports the owning module explicitly.
    pub import_module: bool,
    /// Restrict mocking to interface-like declarations.
    pub only_protocols: bool,
    pub missing_stub_policy: MissingStubPolicy,
    /// Whether generated failable constructors succeed or hand back absent
    /// instances.
    pub construction_policy: ConstructionPolicy,
}

impl GeneratorConfig {
    #[must_use]
    pub fn for_modules(target_modules: Vec<String>, output_dir: PathBuf) -> Self {
        Self {
            target_modules,
            outputs: OutputLayout::PerModule(output_dir),
            preprocessor_condition: None,
            import_module: true,
            only_protocols: false,
            missing_stub_policy: MissingStubPolicy::Fail,
            construction_policy: ConstructionPolicy::Succeed,
        }
    }

    fn emit_options(&self) -> EmitOptions {
        EmitOptions {
            import_module: self.import_module,
            preprocessor_condition: self.preprocessor_condition.clone(),
            policy: self.missing_stub_policy,
            construction: self.construction_policy,
        }
    }
}

/// Per-type result of a generation run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "status")]
pub enum TypeStatus {
    Generated { mock_name: String },
    Skipped { reason: String },
    Failed,
}

/// Outcome of one declaration, with its accumulated diagnostics.
#[derive(Clone, Debug, Serialize)]
pub struct TypeOutcome {
    /// Qualified name of the originating declaration.
    pub name: String,
    #[serde(flatten)]
    pub status: TypeStatus,
    pub diagnostics: Vec<Diagnostic>,
}

/// Result of a whole generation run: partial success by design.
#[derive(Debug)]
pub struct GenerationReport {
    pub artifacts: Vec<GeneratedArtifact>,
    pub outcomes: Vec<TypeOutcome>,
}

impl GenerationReport {
    #[must_use]
    pub fn failures(&self) -> impl Iterator<Item = &TypeOutcome> {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome.status, TypeStatus::Failed))
    }

    #[must_use]
    pub fn generated(&self) -> impl Iterator<Item = &TypeOutcome> {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome.status, TypeStatus::Generated { .. }))
    }
}

/// Work item for the parallel phase, or an outcome decided up front.
enum Pending {
    Ready(TypeOutcome),
    Job { id: DeclId, mock_name: String },
}

/// One successfully rendered mock, grouped into artifacts afterwards.
struct RenderedMock {
    module: String,
    mock_name: String,
    block: String,
}

/// Mock generation engine.
pub struct Generator;

impl Generator {
    /// Run generation over the model for the configured targets.
    ///
    /// Fatal per-type conditions are reported in the outcome list; the run
    /// itself only fails for configuration-level problems.
    ///
    /// # Errors
    /// Fails when no target modules are configured or the explicit output
    /// list does not match the target count.
    pub fn generate(model: &DeclarationModel, config: &GeneratorConfig) -> Result<GenerationReport> {
        if config.target_modules.is_empty() {
            return Err(Error::generate("no target modules configured"));
        }
        if let OutputLayout::Explicit(paths) = &config.outputs {
            if paths.len() != config.target_modules.len() {
                return Err(Error::generate(format!(
                    "{} output path(s) configured for {} target module(s)",
                    paths.len(),
                    config.target_modules.len()
                )));
            }
        }

        tracing::info!(
            target: "generate",
            targets = %config.target_modules.join(", "),
            declarations = model.len(),
            "generation run started"
        );

        // Names are claimed sequentially in declaration order so the
        // disambiguation choice never depends on worker arrival order.
        let arbiter = NameArbiter::new();
        let pending = Self::plan_run(model, config, &arbiter);
        let options = config.emit_options();

        let processed: Vec<(TypeOutcome, Option<RenderedMock>)> = pending
            .into_par_iter()
            .map(|entry| match entry {
                Pending::Ready(outcome) => (outcome, None),
                Pending::Job { id, mock_name } => {
                    Self::generate_type(model, id, mock_name, &options)
                }
            })
            .collect();

        let mut outcomes = Vec::with_capacity(processed.len());
        let mut rendered = Vec::new();
        for (outcome, block) in processed {
            outcomes.push(outcome);
            rendered.extend(block);
        }

        let artifacts = Self::assemble_artifacts(config, &options, rendered);

        tracing::info!(
            target: "generate",
            generated = outcomes
                .iter()
                .filter(|outcome| matches!(outcome.status, TypeStatus::Generated { .. }))
                .count(),
            failed = outcomes
                .iter()
                .filter(|outcome| matches!(outcome.status, TypeStatus::Failed))
                .count(),
            artifacts = artifacts.len(),
            "generation run finished"
        );

        Ok(GenerationReport {
            artifacts,
            outcomes,
        })
    }

    /// Decide eligibility per declaration and claim mock names, in
    /// declaration order.
    fn plan_run(
        model: &DeclarationModel,
        config: &GeneratorConfig,
        arbiter: &NameArbiter,
    ) -> Vec<Pending> {
        let mut pending = Vec::new();
        for (id, declaration) in model.iter() {
            if !config
                .target_modules
                .iter()
                .any(|module| *module == declaration.name.module)
            {
                continue;
            }
            let qualified = declaration.name.qualified();

            if config.only_protocols && matches!(declaration.kind, DeclarationKind::Class) {
                pending.push(Pending::Ready(TypeOutcome {
                    name: qualified,
                    status: TypeStatus::Skipped {
                        reason: "class-like declarations excluded by protocol-only mode".into(),
                    },
                    diagnostics: Vec::new(),
                }));
                continue;
            }
            if !declaration.is_open_to_override() {
                let mut sink = DiagnosticSink::default();
                sink.push_error(
                    "declaration is sealed against subclassing and cannot be mocked",
                    qualified.clone(),
                );
                pending.push(Pending::Ready(TypeOutcome {
                    name: qualified,
                    status: TypeStatus::Failed,
                    diagnostics: sink.into_vec(),
                }));
                continue;
            }
            if !declaration.accessibility.reachable_from_mock() {
                pending.push(Pending::Ready(TypeOutcome {
                    name: qualified,
                    status: TypeStatus::Skipped {
                        reason: "declaration is not visible outside its file".into(),
                    },
                    diagnostics: Vec::new(),
                }));
                continue;
            }

            let mock_name = arbiter.claim(&declaration.name);
            pending.push(Pending::Job { id, mock_name });
        }
        pending
    }

    /// Resolve, plan, and render one type in isolation.
    fn generate_type(
        model: &DeclarationModel,
        id: DeclId,
        mock_name: String,
        options: &EmitOptions,
    ) -> (TypeOutcome, Option<RenderedMock>) {
        let declaration = model.get(id);
        let qualified = declaration.name.qualified();
        let mut sink = DiagnosticSink::default();

        match MockableType::build(model, id, &mut sink) {
            Ok(mockable) => {
                let block = render_mock(&mockable, &mock_name, options);
                let outcome = TypeOutcome {
                    name: qualified,
                    status: TypeStatus::Generated {
                        mock_name: mock_name.clone(),
                    },
                    diagnostics: sink.into_vec(),
                };
                let rendered = RenderedMock {
                    module: declaration.name.module.clone(),
                    mock_name,
                    block,
                };
                (outcome, Some(rendered))
            }
            Err(failure) => {
                sink.push_error(failure.to_string(), qualified.clone());
                tracing::warn!(
                    target: "generate",
                    declaration = %qualified,
                    error = %failure,
                    "type failed; continuing with the rest of the run"
                );
                (
                    TypeOutcome {
                        name: qualified,
                        status: TypeStatus::Failed,
                        diagnostics: sink.into_vec(),
                    },
                    None,
                )
            }
        }
    }

    /// Group rendered mocks into artifacts per the configured layout.
    fn assemble_artifacts(
        config: &GeneratorConfig,
        options: &EmitOptions,
        rendered: Vec<RenderedMock>,
    ) -> Vec<GeneratedArtifact> {
        let blocks_for = |module: &str| -> Vec<(String, String)> {
            rendered
                .iter()
                .filter(|mock| mock.module == module)
                .map(|mock| (mock.mock_name.clone(), mock.block.clone()))
                .collect()
        };

        match &config.outputs {
            OutputLayout::PerModule(directory) => config
                .target_modules
                .iter()
                .filter_map(|module| {
                    let blocks = blocks_for(module);
                    if blocks.is_empty() {
                        return None;
                    }
                    Some(render_artifact(
                        directory.join(default_artifact_name(module)),
                        module,
                        std::slice::from_ref(module),
                        &blocks,
                        options,
                    ))
                })
                .collect(),
            OutputLayout::Explicit(paths) => config
                .target_modules
                .iter()
                .zip(paths.iter())
                .map(|(module, path)| {
                    render_artifact(
                        path.clone(),
                        module,
                        std::slice::from_ref(module),
                        &blocks_for(module),
                        options,
                    )
                })
                .collect(),
            OutputLayout::Merged(path) => {
                let blocks: Vec<(String, String)> = rendered
                    .iter()
                    .map(|mock| (mock.mock_name.clone(), mock.block.clone()))
                    .collect();
                let label = config.target_modules.join("+");
                vec![render_artifact(
                    path.clone(),
                    &label,
                    &config.target_modules,
                    &blocks,
                    options,
                )]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Accessibility, Declaration, DeclarationKind, Member, MemberKind, ModelBuilder, Parameter,
        QualifiedName, TypeReference,
    };

    fn declaration(kind: DeclarationKind, module: &str, name: &str) -> Declaration {
        Declaration {
            kind,
            name: QualifiedName::new(module, name),
            generic_params: Vec::new(),
            supertypes: Vec::new(),
            members: vec![Member {
                kind: MemberKind::Method,
                name: "run".into(),
                parameters: vec![Parameter::new("input", TypeReference::named("Int"))],
                return_type: Some(TypeReference::named("Bool")),
                generic_params: Vec::new(),
                is_static: false,
                is_mutable: false,
                accessibility: Accessibility::Public,
            }],
            accessibility: Accessibility::Public,
            is_open: true,
        }
    }

    fn config() -> GeneratorConfig {
        GeneratorConfig::for_modules(vec!["App".into()], PathBuf::from("out"))
    }

    #[test]
    fn non_target_modules_are_ignored() {
        let mut builder = ModelBuilder::new();
        builder.push(declaration(DeclarationKind::Interface, "App", "Service"));
        builder.push(declaration(DeclarationKind::Interface, "Other", "Service"));
        let model = builder.freeze();

        let report = Generator::generate(&model, &config()).unwrap();
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].name, "App.Service");
    }

    #[test]
    fn protocol_only_mode_skips_classes() {
        let mut builder = ModelBuilder::new();
        builder.push(declaration(DeclarationKind::Class, "App", "Store"));
        builder.push(declaration(DeclarationKind::Interface, "App", "Feed"));
        let model = builder.freeze();

        let mut config = config();
        config.only_protocols = true;
        let report = Generator::generate(&model, &config).unwrap();

        assert!(matches!(
            report.outcomes[0].status,
            TypeStatus::Skipped { .. }
        ));
        assert!(matches!(
            report.outcomes[1].status,
            TypeStatus::Generated { .. }
        ));
    }

    #[test]
    fn sealed_classes_fail_per_type() {
        let mut builder = ModelBuilder::new();
        builder.push(Declaration {
            is_open: false,
            ..declaration(DeclarationKind::Class, "App", "Sealed")
        });
        let model = builder.freeze();

        let report = Generator::generate(&model, &config()).unwrap();
        assert!(matches!(report.outcomes[0].status, TypeStatus::Failed));
        assert!(!report.outcomes[0].diagnostics.is_empty());
        assert!(report.artifacts.is_empty(), "failed types emit nothing");
    }

    #[test]
    fn empty_target_list_is_a_run_level_error() {
        let model = ModelBuilder::new().freeze();
        let mut config = config();
        config.target_modules.clear();
        assert!(Generator::generate(&model, &config).is_err());
    }

    #[test]
    fn explicit_outputs_must_match_target_count() {
        let model = ModelBuilder::new().freeze();
        let mut config = config();
        config.outputs = OutputLayout::Explicit(vec![]);
        assert!(Generator::generate(&model, &config).is_err());
    }

    #[test]
    fn merged_layout_produces_a_single_artifact() {
        let mut builder = ModelBuilder::new();
        builder.push(declaration(DeclarationKind::Interface, "App", "Feed"));
        builder.push(declaration(DeclarationKind::Interface, "Net", "Client"));
        let model = builder.freeze();

        let mut config = config();
        config.target_modules = vec!["App".into(), "Net".into()];
        config.outputs = OutputLayout::Merged(PathBuf::from("AllMocks.generated.swift"));
        let report = Generator::generate(&model, &config).unwrap();

        assert_eq!(report.artifacts.len(), 1);
        let artifact = &report.artifacts[0];
        assert_eq!(artifact.types, ["FeedMock", "ClientMock"]);
        assert!(artifact.contents.contains("import App"));
        assert!(artifact.contents.contains("import Net"));
    }

    #[test]
    fn per_module_layout_derives_default_paths() {
        let mut builder = ModelBuilder::new();
        builder.push(declaration(DeclarationKind::Interface, "App", "Feed"));
        let model = builder.freeze();

        let report = Generator::generate(&model, &config()).unwrap();
        assert_eq!(report.artifacts.len(), 1);
        assert_eq!(
            report.artifacts[0].path,
            PathBuf::from("out/AppMocks.generated.swift")
        );
    }
}
