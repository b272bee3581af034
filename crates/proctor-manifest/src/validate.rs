use std::collections::HashSet;
use std::fmt;

use proctor_core::{ExpectedResponse, TestCase, TestManifest};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Every problem found in one manifest, not just the first.
#[derive(Debug, Error, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

pub fn validate_manifest(manifest: &TestManifest) -> Result<(), ValidationErrors> {
    let mut errs = Vec::new();

    if manifest.test_cases.is_empty() {
        errs.push(ValidationError::new("test_cases", "at least one test case is required"));
    }

    let mut seen = HashSet::new();
    for (i, tc) in manifest.test_cases.iter().enumerate() {
        let prefix = format!("test_cases[{i}]");
        if !tc.name.is_empty() && !seen.insert(tc.name.as_str()) {
            errs.push(ValidationError::new(
                format!("{prefix}.name"),
                format!("duplicate test case name {:?}", tc.name),
            ));
        }
        errs.extend(test_case_errors(&prefix, tc));
    }

    if errs.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(errs))
    }
}

pub fn validate_test_case(tc: &TestCase) -> Result<(), ValidationErrors> {
    let errs = test_case_errors("", tc);
    if errs.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(errs))
    }
}

fn test_case_errors(prefix: &str, tc: &TestCase) -> Vec<ValidationError> {
    let field = |name: &str| {
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}.{name}")
        }
    };
    let mut errs = Vec::new();

    if tc.name.trim().is_empty() {
        errs.push(ValidationError::new(field("name"), "test case name is required"));
    }
    if tc.request.method.trim().is_empty() {
        errs.push(ValidationError::new(field("request.method"), "HTTP method is required"));
    }
    if tc.request.path.trim().is_empty() {
        errs.push(ValidationError::new(field("request.path"), "path is required"));
    }

    match &tc.snapshot {
        Some(path) if path.as_os_str().is_empty() => {
            errs.push(ValidationError::new(field("snapshot"), "snapshot path is empty"));
        }
        None if tc.expectations.is_empty() => {
            errs.push(ValidationError::new(
                field("expectations"),
                "at least one expectation or a snapshot is required",
            ));
        }
        _ => {}
    }

    for (i, exp) in tc.expectations.iter().enumerate() {
        if let ExpectedResponse::Immediate(imm) = &exp.response {
            if imm.status_code != 0 && !(100..=599).contains(&imm.status_code) {
                errs.push(ValidationError::new(
                    field(&format!("expectations[{i}].immediate_response.status_code")),
                    format!("{} is not an HTTP status code", imm.status_code),
                ));
            }
        }
    }

    errs
}
