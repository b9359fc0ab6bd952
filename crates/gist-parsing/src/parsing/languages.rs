//! Language-specific configurations for block extraction
//!
//! Each supported language is a data entry: its extensions, its tree-sitter
//! grammar, and the node types that count as units (functions, methods) or
//! containers (classes, structs). Adding a language means adding an entry
//! here; the extractor itself has no per-language branches.

use lazy_static::lazy_static;
use std::collections::HashMap;
use std::path::Path;
use tree_sitter::Language;

/// Configuration for a specific programming language
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    /// The language identifier (e.g., "rust", "python")
    pub id: &'static str,
    /// File extensions associated with this language (lowercase, no dot)
    pub extensions: &'static [&'static str],
    /// Tree-sitter language parser
    pub tree_sitter_language: Option<Language>,
    /// Node types emitted as function blocks
    pub unit_node_types: &'static [&'static str],
    /// Node types emitted as class blocks and tracked as enclosing scopes
    pub container_node_types: &'static [&'static str],
    /// Fields tried, in order, when resolving a container's name
    pub container_name_fields: &'static [&'static str],
    /// Containers without a `body` field are references, not definitions
    pub container_requires_body: bool,
}

impl LanguageConfig {
    /// Creates a new language configuration
    pub const fn new(id: &'static str) -> Self {
        Self {
            id,
            extensions: &[],
            tree_sitter_language: None,
            unit_node_types: &[],
            container_node_types: &[],
            container_name_fields: &["name"],
            container_requires_body: false,
        }
    }

    /// Builder method to set extensions
    pub const fn with_extensions(mut self, extensions: &'static [&'static str]) -> Self {
        self.extensions = extensions;
        self
    }

    /// Builder method to set tree-sitter language
    pub fn with_tree_sitter(mut self, language: Language) -> Self {
        self.tree_sitter_language = Some(language);
        self
    }

    /// Builder method to set unit (function/method) node types
    pub const fn with_unit_nodes(mut self, node_types: &'static [&'static str]) -> Self {
        self.unit_node_types = node_types;
        self
    }

    /// Builder method to set container (class/struct) node types
    pub const fn with_container_nodes(mut self, node_types: &'static [&'static str]) -> Self {
        self.container_node_types = node_types;
        self
    }

    /// Builder method to set the fields searched for a container name
    pub const fn with_container_name_fields(mut self, fields: &'static [&'static str]) -> Self {
        self.container_name_fields = fields;
        self
    }

    /// Builder method to skip body-less containers (C/C++ type references)
    pub const fn with_container_body_required(mut self) -> Self {
        self.container_requires_body = true;
        self
    }

    /// Whether `kind` is a unit node type for this language
    pub fn is_unit(&self, kind: &str) -> bool {
        self.unit_node_types.contains(&kind)
    }

    /// Whether `kind` is a container node type for this language
    pub fn is_container(&self, kind: &str) -> bool {
        self.container_node_types.contains(&kind)
    }
}

const JS_UNITS: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "method_definition",
];
const TS_CONTAINERS: &[&str] = &["class_declaration", "abstract_class_declaration"];

lazy_static! {
    /// Registry of all supported language configurations
    pub static ref LANGUAGE_REGISTRY: HashMap<&'static str, LanguageConfig> = {
        let mut registry = HashMap::new();

        registry.insert(
            "python",
            LanguageConfig::new("python")
                .with_extensions(&["py", "pyi"])
                .with_tree_sitter(tree_sitter_python::LANGUAGE.into())
                .with_unit_nodes(&["function_definition"])
                .with_container_nodes(&["class_definition"]),
        );

        registry.insert(
            "javascript",
            LanguageConfig::new("javascript")
                .with_extensions(&["js", "mjs", "cjs", "jsx"])
                .with_tree_sitter(tree_sitter_javascript::LANGUAGE.into())
                .with_unit_nodes(JS_UNITS)
                .with_container_nodes(&["class_declaration"]),
        );

        registry.insert(
            "typescript",
            LanguageConfig::new("typescript")
                .with_extensions(&["ts", "mts", "cts"])
                .with_tree_sitter(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())
                .with_unit_nodes(JS_UNITS)
                .with_container_nodes(TS_CONTAINERS),
        );

        registry.insert(
            "tsx",
            LanguageConfig::new("tsx")
                .with_extensions(&["tsx"])
                .with_tree_sitter(tree_sitter_typescript::LANGUAGE_TSX.into())
                .with_unit_nodes(JS_UNITS)
                .with_container_nodes(TS_CONTAINERS),
        );

        registry.insert(
            "cpp",
            LanguageConfig::new("cpp")
                .with_extensions(&["cpp", "cc", "cxx", "hpp", "hh", "hxx"])
                .with_tree_sitter(tree_sitter_cpp::LANGUAGE.into())
                .with_unit_nodes(&["function_definition"])
                .with_container_nodes(&["class_specifier", "struct_specifier"])
                .with_container_body_required(),
        );

        registry.insert(
            "c",
            LanguageConfig::new("c")
                .with_extensions(&["c", "h"])
                .with_tree_sitter(tree_sitter_c::LANGUAGE.into())
                .with_unit_nodes(&["function_definition"])
                .with_container_nodes(&["struct_specifier"])
                .with_container_body_required(),
        );

        registry.insert(
            "rust",
            LanguageConfig::new("rust")
                .with_extensions(&["rs"])
                .with_tree_sitter(tree_sitter_rust::LANGUAGE.into())
                .with_unit_nodes(&["function_item"])
                .with_container_nodes(&["impl_item", "struct_item", "enum_item", "trait_item"])
                // `impl Foo` has no name field; the implemented type stands in
                .with_container_name_fields(&["name", "type"]),
        );

        registry.insert(
            "go",
            LanguageConfig::new("go")
                .with_extensions(&["go"])
                .with_tree_sitter(tree_sitter_go::LANGUAGE.into())
                .with_unit_nodes(&["function_declaration", "method_declaration"])
                .with_container_nodes(&["type_spec"]),
        );

        registry.insert(
            "java",
            LanguageConfig::new("java")
                .with_extensions(&["java"])
                .with_tree_sitter(tree_sitter_java::LANGUAGE.into())
                .with_unit_nodes(&["method_declaration", "constructor_declaration"])
                .with_container_nodes(&[
                    "class_declaration",
                    "interface_declaration",
                    "enum_declaration",
                    "record_declaration",
                ]),
        );

        registry
    };

    /// Map of file extensions to language IDs
    pub static ref EXTENSION_MAP: HashMap<&'static str, &'static str> = {
        let mut map = HashMap::new();

        for (lang_id, config) in LANGUAGE_REGISTRY.iter() {
            for ext in config.extensions {
                map.insert(*ext, *lang_id);
            }
        }

        map
    };
}

/// Gets a language configuration by ID
pub fn get_language_config(language_id: &str) -> Option<&'static LanguageConfig> {
    LANGUAGE_REGISTRY.get(language_id)
}

/// Gets a language ID from a file extension (case-insensitive, no leading dot)
pub fn get_language_from_extension(extension: &str) -> Option<&'static str> {
    EXTENSION_MAP
        .get(extension.to_ascii_lowercase().as_str())
        .copied()
}

/// Gets a language ID from a path's extension
pub fn get_language_from_path(path: &Path) -> Option<&'static str> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(get_language_from_extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_registry_initialization() {
        assert_eq!(LANGUAGE_REGISTRY.len(), 9);
        for lang in [
            "python",
            "javascript",
            "typescript",
            "tsx",
            "cpp",
            "c",
            "rust",
            "go",
            "java",
        ] {
            let config = get_language_config(lang).unwrap();
            assert_eq!(config.id, lang);
            assert!(
                config.tree_sitter_language.is_some(),
                "Language {lang} has no tree-sitter"
            );
            assert!(
                !config.unit_node_types.is_empty(),
                "Language {lang} has no unit nodes"
            );
            assert!(
                !config.container_node_types.is_empty(),
                "Language {lang} has no container nodes"
            );
        }
    }

    #[test]
    fn test_extension_coverage() {
        let common_extensions = vec![
            ("py", "python"),
            ("pyi", "python"),
            ("js", "javascript"),
            ("jsx", "javascript"),
            ("ts", "typescript"),
            ("tsx", "tsx"),
            ("cpp", "cpp"),
            ("hpp", "cpp"),
            ("c", "c"),
            ("h", "c"),
            ("rs", "rust"),
            ("go", "go"),
            ("java", "java"),
        ];

        for (ext, expected_lang) in common_extensions {
            assert_eq!(
                get_language_from_extension(ext),
                Some(expected_lang),
                "Extension '{ext}' should map to '{expected_lang}'"
            );
        }
    }

    #[test]
    fn test_extension_matching_is_case_insensitive() {
        assert_eq!(get_language_from_extension("PY"), Some("python"));
        assert_eq!(
            get_language_from_path(Path::new("src/Widget.TSX")),
            Some("tsx")
        );
    }

    #[test]
    fn test_unsupported_extensions() {
        assert_eq!(get_language_from_extension("md"), None);
        assert_eq!(get_language_from_extension(""), None);
        assert_eq!(get_language_from_path(Path::new("Makefile")), None);
    }

    #[test]
    fn test_extension_uniqueness() {
        let mut extension_count: HashMap<&str, Vec<&str>> = HashMap::new();

        for (lang_id, config) in LANGUAGE_REGISTRY.iter() {
            for ext in config.extensions {
                extension_count.entry(ext).or_default().push(lang_id);
            }
        }

        for (ext, langs) in &extension_count {
            assert_eq!(
                langs.len(),
                1,
                "Extension '{ext}' maps to multiple languages: {langs:?}"
            );
        }
    }

    #[test]
    fn test_node_type_lookup() {
        let python = get_language_config("python").unwrap();
        assert!(python.is_unit("function_definition"));
        assert!(python.is_container("class_definition"));
        assert!(!python.is_unit("class_definition"));

        let rust = get_language_config("rust").unwrap();
        assert_eq!(rust.container_name_fields, &["name", "type"]);

        let c = get_language_config("c").unwrap();
        assert!(c.container_requires_body);
    }
}
