//! Diagnostic types and the catalogue of analyzer messages.
//!
//! Every diagnostic carries a stable numeric code (rendered as `THROW###`),
//! a category, a byte span and, where it concerns one exception type, the
//! fully qualified type name as a machine-readable payload for fixers.

use serde::Serialize;

// =============================================================================
// Diagnostic Types
// =============================================================================

/// Diagnostic category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticCategory {
    Warning = 0,
    Error = 1,
    Suggestion = 2,
    Message = 3,
}

impl DiagnosticCategory {
    pub const fn name(self) -> &'static str {
        match self {
            DiagnosticCategory::Warning => "warning",
            DiagnosticCategory::Error => "error",
            DiagnosticCategory::Suggestion => "suggestion",
            DiagnosticCategory::Message => "message",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DiagnosticMessage {
    pub code: u32,
    pub category: DiagnosticCategory,
    pub message: &'static str,
}

/// Related information for a diagnostic (e.g. "declared here" locations).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DiagnosticRelatedInformation {
    pub file: String,
    pub start: u32,
    pub length: u32,
    pub message_text: String,
}

/// An analyzer diagnostic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub category: DiagnosticCategory,
    pub code: u32,
    pub file: String,
    pub start: u32,
    pub length: u32,
    pub message_text: String,
    /// Fully qualified name of the exception type the diagnostic is about.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_type: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related_information: Vec<DiagnosticRelatedInformation>,
}

impl Diagnostic {
    /// Build a diagnostic from a catalogue entry, substituting `{0}`, `{1}`...
    pub fn from_message(
        message: &DiagnosticMessage,
        file: impl Into<String>,
        start: u32,
        length: u32,
        args: &[&str],
    ) -> Self {
        Self {
            category: message.category,
            code: message.code,
            file: file.into(),
            start,
            length,
            message_text: format_message(message.message, args),
            exception_type: None,
            related_information: Vec::new(),
        }
    }

    pub fn with_exception_type(mut self, full_name: impl Into<String>) -> Self {
        self.exception_type = Some(full_name.into());
        self
    }

    pub fn with_related(
        mut self,
        file: impl Into<String>,
        start: u32,
        length: u32,
        message: impl Into<String>,
    ) -> Self {
        self.related_information.push(DiagnosticRelatedInformation {
            file: file.into(),
            start,
            length,
            message_text: message.into(),
        });
        self
    }

    /// Rendered code, e.g. `THROW001`.
    pub fn code_label(&self) -> String {
        format!("THROW{:03}", self.code)
    }

    pub fn is_warning(&self) -> bool {
        matches!(
            self.category,
            DiagnosticCategory::Warning | DiagnosticCategory::Error
        )
    }
}

pub fn get_message(code: u32) -> Option<&'static DiagnosticMessage> {
    DIAGNOSTIC_MESSAGES.iter().find(|m| m.code == code)
}

pub fn format_message(message: &str, args: &[&str]) -> String {
    let mut result = message.to_string();
    for (i, arg) in args.iter().enumerate() {
        result = result.replace(&format!("{{{i}}}"), arg);
    }
    result
}

// =============================================================================
// Catalogue
// =============================================================================

pub mod diagnostic_codes {
    pub const UNHANDLED_EXCEPTION: u32 = 1;
    pub const EXCEPTION_CLASSIFIED_INFORMATIONAL: u32 = 2;
    pub const EXCEPTION_DECLARED_VIA_MOST_GENERAL_TYPE: u32 = 3;
    pub const EXCEPTION_THROWN_VIA_MOST_GENERAL_TYPE: u32 = 4;
    pub const DUPLICATE_DECLARATION: u32 = 5;
    pub const DECLARATION_REDUNDANT_BY_HIERARCHY: u32 = 6;
    pub const MISSING_DECLARATION_RELATIVE_TO_BASE_MEMBER: u32 = 7;
    pub const MISSING_DECLARATION_PROPAGATED_FROM_BASE_MEMBER: u32 = 8;
    pub const DOCUMENTATION_DECLARES_WITHOUT_CONTRACT: u32 = 9;
    pub const THROWS_DECLARATION_INVALID_ON_FULL_PROPERTY: u32 = 10;
    pub const REDUNDANT_DECLARATION_NEVER_THROWN: u32 = 11;
    pub const REDUNDANT_TYPED_CATCH_CLAUSE: u32 = 12;
    pub const REDUNDANT_CATCH_ALL_CLAUSE: u32 = 13;
    pub const CATCH_HANDLES_NO_REMAINING_EXCEPTIONS: u32 = 14;
    pub const CATCH_OVERSHADOWED_BY_EARLIER_CLAUSE: u32 = 15;
    pub const UNREACHABLE_CODE: u32 = 16;
    pub const UNREACHABLE_CODE_SECONDARY: u32 = 17;
    pub const IMPLICITLY_DECLARED_EXCEPTION_IN_DEFERRED_PIPELINE: u32 = 18;
    pub const DEFERRED_PIPELINE_ESCAPES_BOUNDARY: u32 = 19;
}

pub mod diagnostic_messages {
    use super::{DiagnosticCategory, DiagnosticMessage, diagnostic_codes};

    pub const UNHANDLED_EXCEPTION: DiagnosticMessage = DiagnosticMessage {
        code: diagnostic_codes::UNHANDLED_EXCEPTION,
        category: DiagnosticCategory::Warning,
        message: "Exception '{0}' is neither handled nor declared.",
    };
    pub const EXCEPTION_CLASSIFIED_INFORMATIONAL: DiagnosticMessage = DiagnosticMessage {
        code: diagnostic_codes::EXCEPTION_CLASSIFIED_INFORMATIONAL,
        category: DiagnosticCategory::Message,
        message: "Exception '{0}' may be thrown here.",
    };
    pub const EXCEPTION_DECLARED_VIA_MOST_GENERAL_TYPE: DiagnosticMessage = DiagnosticMessage {
        code: diagnostic_codes::EXCEPTION_DECLARED_VIA_MOST_GENERAL_TYPE,
        category: DiagnosticCategory::Warning,
        message: "Avoid declaring the general exception type '{0}'; declare specific exception types.",
    };
    pub const EXCEPTION_THROWN_VIA_MOST_GENERAL_TYPE: DiagnosticMessage = DiagnosticMessage {
        code: diagnostic_codes::EXCEPTION_THROWN_VIA_MOST_GENERAL_TYPE,
        category: DiagnosticCategory::Warning,
        message: "Avoid throwing the general exception type '{0}'; throw a specific exception type.",
    };
    pub const DUPLICATE_DECLARATION: DiagnosticMessage = DiagnosticMessage {
        code: diagnostic_codes::DUPLICATE_DECLARATION,
        category: DiagnosticCategory::Warning,
        message: "Exception '{0}' is declared more than once.",
    };
    pub const DECLARATION_REDUNDANT_BY_HIERARCHY: DiagnosticMessage = DiagnosticMessage {
        code: diagnostic_codes::DECLARATION_REDUNDANT_BY_HIERARCHY,
        category: DiagnosticCategory::Warning,
        message: "Declaration of '{0}' is redundant because '{1}' is also declared.",
    };
    pub const MISSING_DECLARATION_RELATIVE_TO_BASE_MEMBER: DiagnosticMessage =
        DiagnosticMessage {
            code: diagnostic_codes::MISSING_DECLARATION_RELATIVE_TO_BASE_MEMBER,
            category: DiagnosticCategory::Warning,
            message: "Exception '{0}' is declared here but not by the base or interface member '{1}'.",
        };
    pub const MISSING_DECLARATION_PROPAGATED_FROM_BASE_MEMBER: DiagnosticMessage =
        DiagnosticMessage {
            code: diagnostic_codes::MISSING_DECLARATION_PROPAGATED_FROM_BASE_MEMBER,
            category: DiagnosticCategory::Warning,
            message: "Exception '{0}' is declared by the base or interface member '{1}' but not here.",
        };
    pub const DOCUMENTATION_DECLARES_WITHOUT_CONTRACT: DiagnosticMessage = DiagnosticMessage {
        code: diagnostic_codes::DOCUMENTATION_DECLARES_WITHOUT_CONTRACT,
        category: DiagnosticCategory::Warning,
        message: "Exception '{0}' is documented but not declared.",
    };
    pub const THROWS_DECLARATION_INVALID_ON_FULL_PROPERTY: DiagnosticMessage =
        DiagnosticMessage {
            code: diagnostic_codes::THROWS_DECLARATION_INVALID_ON_FULL_PROPERTY,
            category: DiagnosticCategory::Warning,
            message: "Exception declarations on property '{0}' must be placed on its accessors.",
        };
    pub const REDUNDANT_DECLARATION_NEVER_THROWN: DiagnosticMessage = DiagnosticMessage {
        code: diagnostic_codes::REDUNDANT_DECLARATION_NEVER_THROWN,
        category: DiagnosticCategory::Warning,
        message: "Exception '{0}' is declared but never thrown.",
    };
    pub const REDUNDANT_TYPED_CATCH_CLAUSE: DiagnosticMessage = DiagnosticMessage {
        code: diagnostic_codes::REDUNDANT_TYPED_CATCH_CLAUSE,
        category: DiagnosticCategory::Warning,
        message: "Exception '{0}' is never thrown within the try block.",
    };
    pub const REDUNDANT_CATCH_ALL_CLAUSE: DiagnosticMessage = DiagnosticMessage {
        code: diagnostic_codes::REDUNDANT_CATCH_ALL_CLAUSE,
        category: DiagnosticCategory::Warning,
        message: "Catch-all clause is redundant; no exceptions remain to be handled.",
    };
    pub const CATCH_HANDLES_NO_REMAINING_EXCEPTIONS: DiagnosticMessage = DiagnosticMessage {
        code: diagnostic_codes::CATCH_HANDLES_NO_REMAINING_EXCEPTIONS,
        category: DiagnosticCategory::Warning,
        message: "Catch clause for '{0}' handles no remaining exceptions.",
    };
    pub const CATCH_OVERSHADOWED_BY_EARLIER_CLAUSE: DiagnosticMessage = DiagnosticMessage {
        code: diagnostic_codes::CATCH_OVERSHADOWED_BY_EARLIER_CLAUSE,
        category: DiagnosticCategory::Warning,
        message: "Catch clause for '{0}' is overshadowed by an earlier clause for '{1}'.",
    };
    pub const UNREACHABLE_CODE: DiagnosticMessage = DiagnosticMessage {
        code: diagnostic_codes::UNREACHABLE_CODE,
        category: DiagnosticCategory::Warning,
        message: "Unreachable code detected.",
    };
    pub const UNREACHABLE_CODE_SECONDARY: DiagnosticMessage = DiagnosticMessage {
        code: diagnostic_codes::UNREACHABLE_CODE_SECONDARY,
        category: DiagnosticCategory::Suggestion,
        message: "Unreachable code detected.",
    };
    pub const IMPLICITLY_DECLARED_EXCEPTION_IN_DEFERRED_PIPELINE: DiagnosticMessage =
        DiagnosticMessage {
            code: diagnostic_codes::IMPLICITLY_DECLARED_EXCEPTION_IN_DEFERRED_PIPELINE,
            category: DiagnosticCategory::Message,
            message: "Exception '{0}' is implicitly declared by the deferred query and surfaces where it is enumerated.",
        };
    pub const DEFERRED_PIPELINE_ESCAPES_BOUNDARY: DiagnosticMessage = DiagnosticMessage {
        code: diagnostic_codes::DEFERRED_PIPELINE_ESCAPES_BOUNDARY,
        category: DiagnosticCategory::Warning,
        message: "Deferred query that may throw '{0}' leaves this scope without being enumerated.",
    };
}

pub static DIAGNOSTIC_MESSAGES: &[DiagnosticMessage] = &[
    diagnostic_messages::UNHANDLED_EXCEPTION,
    diagnostic_messages::EXCEPTION_CLASSIFIED_INFORMATIONAL,
    diagnostic_messages::EXCEPTION_DECLARED_VIA_MOST_GENERAL_TYPE,
    diagnostic_messages::EXCEPTION_THROWN_VIA_MOST_GENERAL_TYPE,
    diagnostic_messages::DUPLICATE_DECLARATION,
    diagnostic_messages::DECLARATION_REDUNDANT_BY_HIERARCHY,
    diagnostic_messages::MISSING_DECLARATION_RELATIVE_TO_BASE_MEMBER,
    diagnostic_messages::MISSING_DECLARATION_PROPAGATED_FROM_BASE_MEMBER,
    diagnostic_messages::DOCUMENTATION_DECLARES_WITHOUT_CONTRACT,
    diagnostic_messages::THROWS_DECLARATION_INVALID_ON_FULL_PROPERTY,
    diagnostic_messages::REDUNDANT_DECLARATION_NEVER_THROWN,
    diagnostic_messages::REDUNDANT_TYPED_CATCH_CLAUSE,
    diagnostic_messages::REDUNDANT_CATCH_ALL_CLAUSE,
    diagnostic_messages::CATCH_HANDLES_NO_REMAINING_EXCEPTIONS,
    diagnostic_messages::CATCH_OVERSHADOWED_BY_EARLIER_CLAUSE,
    diagnostic_messages::UNREACHABLE_CODE,
    diagnostic_messages::UNREACHABLE_CODE_SECONDARY,
    diagnostic_messages::IMPLICITLY_DECLARED_EXCEPTION_IN_DEFERRED_PIPELINE,
    diagnostic_messages::DEFERRED_PIPELINE_ESCAPES_BOUNDARY,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_unique_and_resolvable() {
        let mut codes: Vec<u32> = DIAGNOSTIC_MESSAGES.iter().map(|m| m.code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), DIAGNOSTIC_MESSAGES.len());
        for code in codes {
            assert_eq!(get_message(code).map(|m| m.code), Some(code));
        }
    }

    #[test]
    fn message_arguments_are_substituted() {
        let diag = Diagnostic::from_message(
            &diagnostic_messages::DECLARATION_REDUNDANT_BY_HIERARCHY,
            "a.cs",
            3,
            4,
            &["System.IO.IOException", "System.Exception"],
        );
        assert_eq!(
            diag.message_text,
            "Declaration of 'System.IO.IOException' is redundant because 'System.Exception' is also declared."
        );
        assert_eq!(diag.code_label(), "THROW006");
        assert!(diag.is_warning());
    }
}
