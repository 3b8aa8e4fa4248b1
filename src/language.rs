/// Supported source languages and language-family heuristics
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    C,
    Cpp,
    JavaScript,
    Python,
    Java,
    Rust,
    Go,
    /// Unrecognized language; behaves exactly like C's line-scanning path
    Other,
}

impl Language {
    /// Languages whose allocation primitives are matched with the C-family
    /// pattern set (malloc/calloc/realloc/free/new/delete)
    pub fn is_c_family(self) -> bool {
        matches!(self, Language::C | Language::Cpp | Language::Other)
    }

    /// Default element size in bytes: 8 for dynamically-typed/managed
    /// languages, 4 for statically-sized-value languages
    pub fn default_primitive_size(self) -> u64 {
        match self {
            Language::JavaScript | Language::Python | Language::Java => 8,
            Language::C | Language::Cpp | Language::Rust | Language::Go | Language::Other => 4,
        }
    }

    /// Detect a language from a file extension, for the CLI
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        match ext.as_str() {
            "c" | "h" => Language::C,
            "cpp" | "cc" | "cxx" | "hpp" | "hh" => Language::Cpp,
            "js" | "mjs" | "jsx" => Language::JavaScript,
            "py" => Language::Python,
            "java" => Language::Java,
            "rs" => Language::Rust,
            "go" => Language::Go,
            _ => Language::Other,
        }
    }

    pub fn all() -> &'static [Language] {
        &[
            Language::C,
            Language::Cpp,
            Language::JavaScript,
            Language::Python,
            Language::Java,
            Language::Rust,
            Language::Go,
        ]
    }
}

impl FromStr for Language {
    type Err = std::convert::Infallible;

    /// Unknown names parse to `Other` rather than failing
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "c" => Language::C,
            "cpp" | "c++" | "cplusplus" => Language::Cpp,
            "javascript" | "js" | "node" | "nodejs" => Language::JavaScript,
            "python" | "py" => Language::Python,
            "java" => Language::Java,
            "rust" | "rs" => Language::Rust,
            "go" | "golang" => Language::Go,
            _ => Language::Other,
        })
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::JavaScript => "javascript",
            Language::Python => "python",
            Language::Java => "java",
            Language::Rust => "rust",
            Language::Go => "go",
            Language::Other => "other",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases_and_unknowns() {
        assert_eq!("C++".parse::<Language>().unwrap(), Language::Cpp);
        assert_eq!("nodejs".parse::<Language>().unwrap(), Language::JavaScript);
        assert_eq!("fortran".parse::<Language>().unwrap(), Language::Other);
    }

    #[test]
    fn detects_from_extension() {
        assert_eq!(Language::from_path(Path::new("a/b/leaky.c")), Language::C);
        assert_eq!(Language::from_path(Path::new("x.hpp")), Language::Cpp);
        assert_eq!(Language::from_path(Path::new("x.mjs")), Language::JavaScript);
        assert_eq!(Language::from_path(Path::new("noext")), Language::Other);
    }

    #[test]
    fn unknown_language_is_c_family() {
        assert!(Language::Other.is_c_family());
        assert!(!Language::Java.is_c_family());
        assert_eq!(Language::Other.default_primitive_size(), 4);
        assert_eq!(Language::Python.default_primitive_size(), 8);
    }
}
