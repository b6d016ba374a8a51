//! Index record types.
//!
//! A [`SourceRecord`] is the canonical description of one Go source file:
//! its package, its imports, its functions and its top-level variables.
//! Records are created whole from a successful parse and replace any earlier
//! record for the same path; they are never patched in place.
//!
//! The serialized form is the on-disk index schema:
//!
//! ```text
//! { "package": "...", "imports": ["..."],
//!   "functions": [ { "name": "...", "docs": "...", "params": ["..."],
//!                    "param_types": ["..."], "return_types": ["..."] } ],
//!   "variables": [ { "name": "...", "type": "...", "docs": "..." } ] }
//! ```

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Documentation record for a single source file.
///
/// # Examples
///
/// ```
/// use dw_core::{FunctionRecord, SourceRecord};
///
/// let mut record = SourceRecord::new("mathx");
/// record.imports.push("fmt".to_owned());
/// record.functions.push(
///     FunctionRecord::new("Add")
///         .with_docs("Add adds two ints")
///         .with_param("x", "int")
///         .with_param("y", "int")
///         .with_return("int"),
/// );
///
/// assert_eq!(record.package, "mathx");
/// assert_eq!(record.function("Add").map(|f| f.params.len()), Some(2));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Declared package name.
    pub package: String,

    /// Import paths in source order, without quotes.
    pub imports: Vec<String>,

    /// Function and method declarations in source order.
    pub functions: Vec<FunctionRecord>,

    /// Top-level `var` and `const` specs in source order.
    pub variables: Vec<VariableRecord>,
}

impl SourceRecord {
    /// Creates an empty record for the given package.
    #[must_use]
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            ..Self::default()
        }
    }

    /// Returns the first function with the given name.
    #[must_use]
    pub fn function(&self, name: &str) -> Option<&FunctionRecord> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Returns the first variable with the given name.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&VariableRecord> {
        self.variables.iter().find(|v| v.name == name)
    }
}

/// A function or method declaration.
///
/// `params` and `param_types` are aligned: `param_types[i]` is the rendered
/// type of `params[i]`. Parameters declared as a group (`x, y int`) produce
/// one entry per name. Unnamed parameters have an empty name.
///
/// Uses [`SmallVec`] for the parameter lists, which rarely exceed four entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRecord {
    /// Function or method name.
    pub name: String,

    /// Sanitized doc comment; empty when undocumented.
    pub docs: String,

    /// Parameter names in declaration order.
    pub params: SmallVec<[String; 4]>,

    /// Rendered parameter types, aligned with `params`.
    pub param_types: SmallVec<[String; 4]>,

    /// Rendered result types in declaration order.
    pub return_types: SmallVec<[String; 2]>,
}

impl FunctionRecord {
    /// Creates a record with no docs, parameters or results.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the doc text.
    #[must_use]
    pub fn with_docs(mut self, docs: impl Into<String>) -> Self {
        self.docs = docs.into();
        self
    }

    /// Appends a parameter and its rendered type.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        self.push_param(name, ty);
        self
    }

    /// Appends a rendered result type.
    #[must_use]
    pub fn with_return(mut self, ty: impl Into<String>) -> Self {
        self.return_types.push(ty.into());
        self
    }

    /// Appends a parameter and its rendered type, keeping both lists aligned.
    pub fn push_param(&mut self, name: impl Into<String>, ty: impl Into<String>) {
        self.params.push(name.into());
        self.param_types.push(ty.into());
    }
}

/// A top-level `var` or `const` spec.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableRecord {
    /// First declared name of the spec.
    pub name: String,

    /// Rendered declared type; empty when the type is inferred.
    #[serde(rename = "type")]
    pub ty: String,

    /// Doc comment, or the trailing same-line comment when there is none.
    pub docs: String,
}

impl VariableRecord {
    /// Creates a variable record.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: impl Into<String>, docs: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            docs: docs.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SourceRecord {
        let mut record = SourceRecord::new("mathx");
        record.imports = vec!["fmt".to_owned(), "strings".to_owned()];
        record.functions.push(
            FunctionRecord::new("Add")
                .with_docs("Add adds two ints")
                .with_param("x", "int")
                .with_param("y", "int")
                .with_return("int"),
        );
        record
            .variables
            .push(VariableRecord::new("Limit", "int", "Limit caps the total"));
        record
    }

    #[test]
    fn test_push_param_keeps_lists_aligned() {
        let mut function = FunctionRecord::new("Join");
        function.push_param("parts", "[]string");
        function.push_param("sep", "string");
        assert_eq!(function.params.len(), function.param_types.len());
        assert_eq!(function.param_types[1], "string");
    }

    #[test]
    fn test_lookup_helpers() {
        let record = sample();
        assert!(record.function("Add").is_some());
        assert!(record.function("Sub").is_none());
        assert_eq!(record.variable("Limit").map(|v| v.ty.as_str()), Some("int"));
    }

    #[test]
    fn test_variable_type_field_is_named_type() {
        let json = serde_json::to_value(VariableRecord::new("x", "int", "")).unwrap();
        assert_eq!(json["type"], "int");
        assert!(json.get("ty").is_none());
    }

    #[test]
    fn test_record_schema_snapshot() {
        insta::assert_json_snapshot!(sample(), @r#"
        {
          "package": "mathx",
          "imports": [
            "fmt",
            "strings"
          ],
          "functions": [
            {
              "name": "Add",
              "docs": "Add adds two ints",
              "params": [
                "x",
                "y"
              ],
              "param_types": [
                "int",
                "int"
              ],
              "return_types": [
                "int"
              ]
            }
          ],
          "variables": [
            {
              "name": "Limit",
              "type": "int",
              "docs": "Limit caps the total"
            }
          ]
        }
        "#);
    }
}
