//! Loading of the declaration model handed over by the external parser.
//!
//! The parser owns syntax validity, macro expansion, and conditional
//! compilation; what arrives here is a finalized, serialized model. Nothing
//! is re-validated beyond structural well-formedness.

use serde::Deserialize;
use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::model::{Declaration, DeclarationModel, ModelBuilder};

/// Errors produced while loading a serialized declaration model.
#[derive(Debug)]
pub enum ModelError {
    Parse(serde_json::Error),
    DuplicateDeclarations(Vec<String>),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Parse(err) => write!(f, "malformed model: {err}"),
            ModelError::DuplicateDeclarations(names) => {
                write!(f, "duplicate declarations: {}", names.join(", "))
            }
        }
    }
}

impl StdError for ModelError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ModelError::Parse(err) => Some(err),
            ModelError::DuplicateDeclarations(_) => None,
        }
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(error: serde_json::Error) -> Self {
        ModelError::Parse(error)
    }
}

#[derive(Debug, Deserialize)]
struct ModelFile {
    declarations: Vec<Declaration>,
}

/// Deserialize a model from JSON text and freeze it.
///
/// # Errors
/// Returns [`ModelError::Parse`] for malformed JSON and
/// [`ModelError::DuplicateDeclarations`] when two declarations share a
/// qualified name.
pub fn load_model_str(json: &str) -> std::result::Result<DeclarationModel, ModelError> {
    let file: ModelFile = serde_json::from_str(json)?;
    let mut builder = ModelBuilder::new();
    for declaration in file.declarations {
        builder.push(declaration);
    }
    if !builder.duplicates().is_empty() {
        return Err(ModelError::DuplicateDeclarations(
            builder.duplicates().to_vec(),
        ));
    }
    Ok(builder.freeze())
}

/// Read and deserialize a model file from disk.
///
/// # Errors
/// Fails when the file cannot be read or the model does not deserialize.
pub fn load_model(path: &Path) -> Result<DeclarationModel> {
    let json = fs::read_to_string(path)?;
    let model = load_model_str(&json)?;
    tracing::debug!(
        target: "input",
        path = %path.display(),
        declarations = model.len(),
        "declaration model loaded"
    );
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DeclarationKind, MemberKind};

    const SAMPLE: &str = r#"{
      "declarations": [
        {
          "kind": "interface",
          "module": "App",
          "name": "Feed",
          "accessibility": "public",
          "members": [
            {
              "kind": "method",
              "name": "item",
              "parameters": [
                { "name": "index", "type": { "name": "Int" } }
              ],
              "returns": { "name": "String" },
              "accessibility": "public"
            }
          ]
        },
        {
          "kind": "class",
          "module": "App",
          "name": "Session",
          "is_open": false,
          "supertypes": [ { "name": "App.Feed" } ],
          "members": [
            {
              "kind": { "constructor": {
                "failability": "failable",
                "throwing": "non-throwing",
                "role": "required"
              } },
              "name": "init",
              "parameters": [
                { "name": "token", "type": { "name": "String" } }
              ]
            }
          ]
        }
      ]
    }"#;

    #[test]
    fn sample_model_round_trips() {
        let model = load_model_str(SAMPLE).unwrap();
        assert_eq!(model.len(), 2);

        let feed = model.lookup("App.Feed").map(|id| model.get(id)).unwrap();
        assert_eq!(feed.kind, DeclarationKind::Interface);
        assert_eq!(feed.members[0].name, "item");

        let session = model.lookup("App.Session").map(|id| model.get(id)).unwrap();
        assert!(!session.is_open);
        assert!(matches!(
            session.members[0].kind,
            MemberKind::Constructor(variant) if variant.is_required()
        ));
    }

    #[test]
    fn duplicate_declarations_are_rejected() {
        let json = r#"{
          "declarations": [
            { "kind": "class", "module": "App", "name": "Twice" },
            { "kind": "class", "module": "App", "name": "Twice" }
          ]
        }"#;
        let err = load_model_str(json).unwrap_err();
        assert!(matches!(err, ModelError::DuplicateDeclarations(names) if names == ["App.Twice"]));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            load_model_str("{ not json"),
            Err(ModelError::Parse(_))
        ));
    }
}
