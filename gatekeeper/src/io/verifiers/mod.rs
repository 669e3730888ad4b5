//! Concrete verifier adapters for external tools.

pub mod document;
pub mod script;

use crate::core::types::ArtifactKind;
use crate::io::config::OrchestratorConfig;
use crate::io::verifier::Verifier;

use self::document::DocumentBuildVerifier;
use self::script::ScriptVerifier;

/// Build the verifier set for an artifact kind from configuration.
///
/// Documents and manuscripts get the document-build verifier; numeric
/// scripts and exploration artifacts get the script-execution verifier.
pub fn for_kind(config: &OrchestratorConfig, kind: ArtifactKind) -> Vec<Box<dyn Verifier>> {
    let command = config.verifier_command(kind).to_vec();
    match kind {
        ArtifactKind::Document | ArtifactKind::Manuscript => {
            vec![Box::new(DocumentBuildVerifier::new(
                command,
                config.output_limit_bytes,
            ))]
        }
        ArtifactKind::NumericScript | ArtifactKind::ExplorationArtifact => {
            vec![Box::new(ScriptVerifier::new(
                command,
                config.output_limit_bytes,
            ))]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_expected_verifiers() {
        let config = OrchestratorConfig::default();
        let doc = for_kind(&config, ArtifactKind::Manuscript);
        assert_eq!(doc.len(), 1);
        assert_eq!(doc[0].name(), "document-build");

        let script = for_kind(&config, ArtifactKind::NumericScript);
        assert_eq!(script.len(), 1);
        assert_eq!(script[0].name(), "script-run");
    }
}
