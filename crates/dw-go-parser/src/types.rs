//! Canonical rendering of Go type expressions.
//!
//! [`TypeExpr`] is a closed sum over the type shapes the index summarizes.
//! [`TypeExpr::from_node`] maps a tree-sitter type node onto it and
//! [`TypeExpr::render`] turns it into a deterministic string. Rendering is
//! total: shapes outside the set become [`TypeExpr::Unknown`], which renders
//! as [`UNKNOWN_TYPE`].
//!
//! | Shape | Rendering |
//! |-------|-----------|
//! | identifier | `int` |
//! | qualified name | `http.Request` |
//! | pointer | `*T` |
//! | slice or array | `[]T` |
//! | map | `map[K]V` |
//! | channel (any direction) | `chan T` |
//! | function | `func(A, B)` |
//! | interface | `interface{}` |
//! | variadic element | `...T` |
//! | generic instantiation | `List[T]` |
//! | anything else | `<unknown type>` |
//!
//! # Examples
//!
//! ```
//! use dw_go_parser::TypeExpr;
//!
//! let ty = TypeExpr::map(TypeExpr::ident("string"), TypeExpr::slice(TypeExpr::ident("int")));
//! assert_eq!(ty.render(), "map[string][]int");
//! assert_eq!(TypeExpr::Unknown.render(), "<unknown type>");
//! ```

use std::fmt;

use tree_sitter::Node;

/// Sentinel rendered for type shapes the renderer does not summarize.
pub const UNKNOWN_TYPE: &str = "<unknown type>";

/// A Go type expression reduced to the shapes the index renders.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeExpr {
    /// A plain type name such as `int` or `Reader`.
    Ident(String),
    /// A package-qualified name such as `io.Reader`.
    Qualified {
        /// Package identifier.
        package: String,
        /// Type name within the package.
        name: String,
    },
    /// `*T`
    Pointer(Box<TypeExpr>),
    /// `[]T`, also used for fixed-length arrays.
    Slice(Box<TypeExpr>),
    /// `map[K]V`
    Map {
        /// Key type.
        key: Box<TypeExpr>,
        /// Value type.
        value: Box<TypeExpr>,
    },
    /// `chan T`, regardless of direction.
    Chan(Box<TypeExpr>),
    /// `func(...)`; only parameter types are rendered.
    Func(Vec<TypeExpr>),
    /// Any interface type.
    Interface,
    /// The element type of a variadic parameter.
    Ellipsis(Box<TypeExpr>),
    /// A generic type instantiation such as `List[int]`.
    Generic {
        /// The instantiated type.
        base: Box<TypeExpr>,
        /// Type arguments in order.
        args: Vec<TypeExpr>,
    },
    /// A shape outside the rendered set (struct literals, constraints, ...).
    Unknown,
}

impl TypeExpr {
    /// Creates an identifier type.
    #[must_use]
    pub fn ident(name: impl Into<String>) -> Self {
        Self::Ident(name.into())
    }

    /// Creates a qualified type.
    #[must_use]
    pub fn qualified(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Qualified {
            package: package.into(),
            name: name.into(),
        }
    }

    /// Creates a pointer type.
    #[must_use]
    pub fn pointer(inner: Self) -> Self {
        Self::Pointer(Box::new(inner))
    }

    /// Creates a slice type.
    #[must_use]
    pub fn slice(element: Self) -> Self {
        Self::Slice(Box::new(element))
    }

    /// Creates a map type.
    #[must_use]
    pub fn map(key: Self, value: Self) -> Self {
        Self::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// Creates a channel type.
    #[must_use]
    pub fn chan(element: Self) -> Self {
        Self::Chan(Box::new(element))
    }

    /// Builds a type expression from a tree-sitter type node.
    ///
    /// Never fails: unrecognized node kinds map to [`TypeExpr::Unknown`].
    #[must_use]
    pub fn from_node(node: Node<'_>, source: &[u8]) -> Self {
        match node.kind() {
            "type_identifier" | "identifier" => Self::Ident(text(node, source)),
            "qualified_type" => {
                match (
                    node.child_by_field_name("package"),
                    node.child_by_field_name("name"),
                ) {
                    (Some(package), Some(name)) => {
                        Self::qualified(text(package, source), text(name, source))
                    }
                    _ => Self::Unknown,
                }
            }
            "pointer_type" => first_named(node).map_or(Self::Unknown, |inner| {
                Self::pointer(Self::from_node(inner, source))
            }),
            "slice_type" | "array_type" | "implicit_length_array_type" => {
                Self::from_field(node, "element", source).map_or(Self::Unknown, Self::slice)
            }
            "map_type" => match (
                Self::from_field(node, "key", source),
                Self::from_field(node, "value", source),
            ) {
                (Some(key), Some(value)) => Self::map(key, value),
                _ => Self::Unknown,
            },
            "channel_type" => {
                Self::from_field(node, "value", source).map_or(Self::Unknown, Self::chan)
            }
            "function_type" => node
                .child_by_field_name("parameters")
                .map_or(Self::Unknown, |params| {
                    Self::Func(parameter_types(params, source))
                }),
            "interface_type" => Self::Interface,
            "generic_type" => {
                let Some(base) = Self::from_field(node, "type", source) else {
                    return Self::Unknown;
                };
                let args = node
                    .child_by_field_name("type_arguments")
                    .map(|list| {
                        let mut cursor = list.walk();
                        list.named_children(&mut cursor)
                            .filter(|child| child.kind() != "comment")
                            .map(|child| Self::from_node(child, source))
                            .collect()
                    })
                    .unwrap_or_default();
                Self::Generic {
                    base: Box::new(base),
                    args,
                }
            }
            // Wrappers around a single type
            "parenthesized_type" | "type_elem" => {
                let mut cursor = node.walk();
                let mut types = node
                    .named_children(&mut cursor)
                    .filter(|child| child.kind() != "comment");
                match (types.next(), types.next()) {
                    (Some(inner), None) => Self::from_node(inner, source),
                    _ => Self::Unknown,
                }
            }
            _ => Self::Unknown,
        }
    }

    /// Renders the type as a canonical string.
    #[must_use]
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Returns `true` for the unknown sentinel.
    #[inline]
    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    fn from_field(node: Node<'_>, field: &str, source: &[u8]) -> Option<Self> {
        node.child_by_field_name(field)
            .map(|child| Self::from_node(child, source))
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(name) => f.write_str(name),
            Self::Qualified { package, name } => write!(f, "{package}.{name}"),
            Self::Pointer(inner) => write!(f, "*{inner}"),
            Self::Slice(element) => write!(f, "[]{element}"),
            Self::Map { key, value } => write!(f, "map[{key}]{value}"),
            Self::Chan(element) => write!(f, "chan {element}"),
            Self::Func(params) => {
                f.write_str("func(")?;
                write_joined(f, params)?;
                f.write_str(")")
            }
            Self::Interface => f.write_str("interface{}"),
            Self::Ellipsis(element) => write!(f, "...{element}"),
            Self::Generic { base, args } => {
                write!(f, "{base}[")?;
                write_joined(f, args)?;
                f.write_str("]")
            }
            Self::Unknown => f.write_str(UNKNOWN_TYPE),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[TypeExpr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// A single parameter: its name (empty when unnamed) and its type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Parameter name, empty for unnamed parameters.
    pub name: String,
    /// Parameter type.
    pub ty: TypeExpr,
}

/// Expands a `parameter_list` node into one [`Param`] per declared name.
///
/// `x, y int` yields two parameters of type `int`. A declaration without
/// names (`func(int, string)`) yields one unnamed parameter per type.
/// Variadic parameters get an [`TypeExpr::Ellipsis`] type.
#[must_use]
pub fn expand_parameters(list: Node<'_>, source: &[u8]) -> Vec<Param> {
    let mut params = Vec::new();
    let mut cursor = list.walk();

    for decl in list.named_children(&mut cursor) {
        let variadic = match decl.kind() {
            "parameter_declaration" => false,
            "variadic_parameter_declaration" => true,
            _ => continue,
        };

        let ty = decl
            .child_by_field_name("type")
            .map_or(TypeExpr::Unknown, |node| TypeExpr::from_node(node, source));
        let ty = if variadic {
            TypeExpr::Ellipsis(Box::new(ty))
        } else {
            ty
        };

        let mut name_cursor = decl.walk();
        let names: Vec<String> = decl
            .children_by_field_name("name", &mut name_cursor)
            .map(|name| text(name, source))
            .collect();

        if names.is_empty() {
            params.push(Param {
                name: String::new(),
                ty,
            });
        } else {
            params.extend(names.into_iter().map(|name| Param {
                name,
                ty: ty.clone(),
            }));
        }
    }

    params
}

/// Returns one type per parameter in a `parameter_list` node.
#[must_use]
pub fn parameter_types(list: Node<'_>, source: &[u8]) -> Vec<TypeExpr> {
    expand_parameters(list, source)
        .into_iter()
        .map(|param| param.ty)
        .collect()
}

/// Returns the result types of a function's `result` field.
///
/// A bare type yields one entry; a parenthesized result list yields one entry
/// per result, with named groups expanded per name.
#[must_use]
pub fn result_types(result: Node<'_>, source: &[u8]) -> Vec<TypeExpr> {
    if result.kind() == "parameter_list" {
        parameter_types(result, source)
    } else {
        vec![TypeExpr::from_node(result, source)]
    }
}

fn first_named(node: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .find(|child| child.kind() != "comment")
}

fn text(node: Node<'_>, source: &[u8]) -> String {
    node.utf8_text(source).unwrap_or_default().to_owned()
}
