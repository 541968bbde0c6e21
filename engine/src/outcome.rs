//! Outcome classification. Pure: no view, no state.

use keycheck_types::{ActionOutput, Outcome, Settlement};
use tracing::warn;

use crate::error::ScenarioError;

/// Success, or the tag named by the error's kind.
#[must_use]
pub fn classify(result: &Result<ActionOutput, ScenarioError>) -> Outcome {
    match result {
        Ok(_) => Outcome::Success,
        Err(err) => Outcome::from_error_kind(err.kind_name()),
    }
}

/// Classify `result` against `expected` and render its output.
///
/// Unknown outcomes log the raw error for the operator.
#[must_use]
pub fn settle(
    selector: &str,
    expected: Outcome,
    result: &Result<ActionOutput, ScenarioError>,
    id_prefix_len: usize,
) -> Settlement {
    let outcome = classify(result);
    let output = match result {
        Ok(output) => output.render(id_prefix_len),
        Err(_) => ActionOutput::Nothing.render(id_prefix_len),
    };
    if let Err(err) = result
        && outcome == Outcome::Unknown
    {
        warn!(selector, kind = err.kind_name(), "Unclassified scenario error: {err:?}");
    }
    Settlement::new(expected, outcome, output)
}

#[cfg(test)]
mod tests {
    use keycheck_core::{CeremonyError, QueryError};
    use keycheck_types::{ActionOutput, CredentialId, Outcome};

    use super::{classify, settle};
    use crate::error::ScenarioError;

    #[test]
    fn success_is_success_whatever_the_output() {
        assert_eq!(classify(&Ok(ActionOutput::Nothing)), Outcome::Success);
        assert_eq!(classify(&Ok(ActionOutput::Text("x".into()))), Outcome::Success);
    }

    #[test]
    fn ceremony_errors_map_by_kind() {
        let dup = Err(ScenarioError::from(CeremonyError::invalid_state("exists")));
        assert_eq!(classify(&dup), Outcome::InvalidStateError);
        let refused = Err(ScenarioError::from(CeremonyError::not_allowed("cancelled")));
        assert_eq!(classify(&refused), Outcome::NotAllowedError);
        let aborted = Err(ScenarioError::from(CeremonyError::other("AbortError", "aborted")));
        assert_eq!(classify(&aborted), Outcome::Unknown);
    }

    #[test]
    fn query_precondition_maps_to_its_tag() {
        let err = Err(ScenarioError::from(QueryError::NoAvailableRegistrations));
        assert_eq!(classify(&err), Outcome::NoAvailableRegistrations);
    }

    #[test]
    fn local_failures_are_unknown() {
        assert_eq!(
            classify(&Err(ScenarioError::MissingPrerequisite("identify-existing-registration"))),
            Outcome::Unknown
        );
        assert_eq!(
            classify(&Err(ScenarioError::Check("not the same registration!".into()))),
            Outcome::Unknown
        );
    }

    #[test]
    fn invalid_state_against_expectations() {
        let result = Err(ScenarioError::from(CeremonyError::invalid_state("exists")));
        assert!(settle("dup", Outcome::InvalidStateError, &result, 8).matched);
        assert!(!settle("dup", Outcome::Success, &result, 8).matched);
    }

    #[test]
    fn settled_output_renders_credential_ids() {
        let id = CredentialId::parse("0123456789abcdef").unwrap();
        let settlement = settle("reg", Outcome::Success, &Ok(ActionOutput::Credential(id)), 8);
        assert_eq!(settlement.output, "01234567???");
        assert_eq!(settlement.outcome, Outcome::Success);
    }

    #[test]
    fn failed_actions_show_placeholder_output() {
        let result = Err(ScenarioError::from(QueryError::NoAvailableRegistrations));
        assert_eq!(settle("auth", Outcome::Success, &result, 8).output, "-");
    }
}
