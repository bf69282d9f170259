//! Data contract with the external answer matcher.
//!
//! This crate does not decide whether an answer is correct. It only packages
//! `{field, accepted variants, submitted value}` triples for a matcher and
//! guarantees every checkable field has something to match against.

use std::collections::HashMap;

use crate::errors::{SubmissionError, ValidationError};
use crate::registry::FieldId;
use crate::template::TemplateDocument;

/// One field's worth of input for the matcher
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchRequest {
    pub field_id: FieldId,
    pub accepted_variants: Vec<String>,
    pub submitted_value: String,
}

/// The matcher seam. Implemented outside this crate.
pub trait AnswerMatcher {
    fn is_correct(&self, request: &MatchRequest) -> bool;
}

impl<F> AnswerMatcher for F
where
    F: Fn(&MatchRequest) -> bool,
{
    fn is_correct(&self, request: &MatchRequest) -> bool {
        self(request)
    }
}

/// Matcher verdicts summed over one submission
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tally {
    pub correct: usize,
    pub total: usize,
}

/// Requests for every checkable field, in registry order.
///
/// Fields without a submission get an empty `submitted_value`. Fails if the
/// template would not pass publish validation.
pub fn build_requests(
    doc: &TemplateDocument,
    submitted: &HashMap<FieldId, String>,
) -> Result<Vec<MatchRequest>, ValidationError> {
    let issues = doc.fields().validate_for_publish();
    if !issues.is_empty() {
        return Err(ValidationError { issues });
    }
    Ok(doc
        .fields()
        .iter()
        .filter(|f| f.checkable())
        .map(|f| MatchRequest {
            field_id: f.id(),
            accepted_variants: f.accepted_variants().to_vec(),
            submitted_value: submitted.get(&f.id()).cloned().unwrap_or_default(),
        })
        .collect())
}

/// One student's answers plus who sent them
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Submission {
    pub first_name: String,
    pub last_name: String,
    pub class: String,
    pub answers: HashMap<FieldId, String>,
}

impl Submission {
    /// Check the sender's class, then build the match requests.
    ///
    /// A template with no allowed classes accepts any class.
    pub fn prepare(&self, doc: &TemplateDocument) -> Result<Vec<MatchRequest>, SubmissionError> {
        let class = self.class.trim();
        let allowed = doc.allowed_classes();
        if !allowed.is_empty() && !allowed.contains(class) {
            return Err(SubmissionError::ClassNotAllowed { class: class.to_string() });
        }
        Ok(build_requests(doc, &self.answers)?)
    }
}

/// Run a matcher over prepared requests
pub fn tally(matcher: &impl AnswerMatcher, requests: &[MatchRequest]) -> Tally {
    Tally {
        correct: requests.iter().filter(|r| matcher.is_correct(r)).count(),
        total: requests.len(),
    }
}
