use std::path::Path;

/// Lowercase extension with its leading dot, or `""` when the file has none.
/// Dotfiles such as `.bashrc` have no extension.
pub fn extension_of(path: &Path) -> String {
    path.extension().and_then(|e| e.to_str()).map(|e| format!(".{}", e.to_lowercase())).unwrap_or_default()
}

/// Best-effort language label from a lowercase extension; `"unknown"` otherwise.
pub fn language_for(extension: &str) -> &'static str {
    match extension {
        ".py" | ".pyi" => "python",
        ".js" | ".jsx" | ".mjs" | ".cjs" => "javascript",
        ".ts" | ".tsx" => "typescript",
        ".java" => "java",
        ".c" | ".h" => "c",
        ".cpp" | ".cc" | ".cxx" | ".hpp" | ".hh" => "cpp",
        ".cs" => "csharp",
        ".go" => "go",
        ".rs" => "rust",
        ".rb" => "ruby",
        ".php" => "php",
        ".swift" => "swift",
        ".kt" | ".kts" => "kotlin",
        ".scala" => "scala",
        ".sh" | ".bash" | ".zsh" | ".fish" => "shell",
        ".r" => "r",
        ".m" => "matlab",
        ".sql" => "sql",
        ".html" | ".htm" => "html",
        ".css" => "css",
        ".scss" => "scss",
        ".sass" => "sass",
        ".less" => "less",
        ".xml" => "xml",
        ".json" => "json",
        ".yaml" | ".yml" => "yaml",
        ".toml" => "toml",
        ".ini" | ".cfg" => "ini",
        ".conf" => "conf",
        ".md" | ".markdown" => "markdown",
        ".rst" => "restructuredtext",
        ".txt" => "text",
        ".vue" => "vue",
        ".svelte" => "svelte",
        ".lua" => "lua",
        ".ex" | ".exs" => "elixir",
        ".hs" => "haskell",
        ".dart" => "dart",
        ".zig" => "zig",
        _ => "unknown",
    }
}
