//! Language Detection
//!
//! Maps file paths, project file listings and user utterances to language
//! tags. All lookups are driven by static ordered tables: the first matching
//! entry wins, so detection is total and deterministic.

use std::path::Path;
use std::sync::OnceLock;

use ignore::WalkBuilder;
use regex::Regex;

use crate::utils::error::{AppError, AppResult};

/// Extension table. Extensions are lowercase and include the leading dot.
const LANGUAGE_MAP: &[(&str, &[&str])] = &[
    ("typescript", &[".ts", ".tsx", ".mts", ".cts"]),
    ("javascript", &[".js", ".jsx", ".mjs", ".cjs"]),
    ("go", &[".go"]),
    ("python", &[".py", ".pyw"]),
    ("rust", &[".rs"]),
    ("ruby", &[".rb"]),
    ("java", &[".java"]),
    ("kotlin", &[".kt", ".kts"]),
    ("swift", &[".swift"]),
    ("csharp", &[".cs"]),
    ("cpp", &[".cpp", ".cc", ".cxx", ".hpp", ".h"]),
    ("c", &[".c"]),
    ("php", &[".php"]),
    ("dart", &[".dart"]),
    ("elixir", &[".ex", ".exs"]),
    ("erlang", &[".erl", ".hrl"]),
    ("zig", &[".zig"]),
    ("lua", &[".lua"]),
    ("scala", &[".scala", ".sc"]),
    ("clojure", &[".clj", ".cljs", ".cljc"]),
    ("haskell", &[".hs"]),
    ("vue", &[".vue"]),
    ("svelte", &[".svelte"]),
    ("astro", &[".astro"]),
];

/// Framework table. An indicator matches a path whose final segment equals
/// it, or a path that ends with it.
const FRAMEWORK_INDICATORS: &[(&str, &[&str])] = &[
    ("nextjs", &["next.config.js", "next.config.mjs", "next.config.ts"]),
    ("react", &["react", "react-dom"]),
    ("vue", &[".vue"]),
    ("svelte", &[".svelte"]),
    ("astro", &["astro.config.mjs", "astro.config.ts"]),
    ("tailwind", &["tailwind.config.js", "tailwind.config.ts"]),
    ("prisma", &["prisma/schema.prisma"]),
    ("drizzle", &["drizzle.config.ts"]),
];

/// "in <language>" phrases, checked in order against the lowercased text.
const UTTERANCE_PATTERNS: &[(&str, &str)] = &[
    (r"\bin\s+typescript\b", "typescript"),
    (r"\bin\s+javascript\b", "javascript"),
    (r"\bin\s+go\b", "go"),
    (r"\bin\s+golang\b", "go"),
    (r"\bin\s+python\b", "python"),
    (r"\bin\s+rust\b", "rust"),
    (r"\bin\s+ruby\b", "ruby"),
    (r"\bin\s+java\b", "java"),
    (r"\bin\s+kotlin\b", "kotlin"),
    (r"\bin\s+swift\b", "swift"),
    // `#` and `+` are not word characters, so `\b` cannot close these two
    (r"\bin\s+c#(?:\W|$)", "csharp"),
    (r"\bin\s+c\+\+(?:\W|$)", "cpp"),
    (r"\bin\s+php\b", "php"),
    (r"\bin\s+dart\b", "dart"),
    (r"\bin\s+elixir\b", "elixir"),
    (r"\bin\s+react\b", "react"),
    (r"\bin\s+next\.?js\b", "nextjs"),
    (r"\bin\s+vue\b", "vue"),
    (r"\bin\s+svelte\b", "svelte"),
];

fn utterance_patterns() -> &'static Vec<(Regex, &'static str)> {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        UTTERANCE_PATTERNS
            .iter()
            .filter_map(|(pattern, tag)| Regex::new(pattern).ok().map(|re| (re, *tag)))
            .collect()
    })
}

/// Final path segment, accepting both `/` and `\` separators.
fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Extension of the final path segment: lowercased, dot included.
fn extension_of(path: &str) -> Option<String> {
    let name = file_name(path);
    name.rfind('.').map(|idx| name[idx..].to_lowercase())
}

/// Look up the language of a single path.
pub fn language_for_extension(path: &str) -> Option<&'static str> {
    let ext = extension_of(path)?;
    LANGUAGE_MAP
        .iter()
        .find(|(_, extensions)| extensions.contains(&ext.as_str()))
        .map(|(tag, _)| *tag)
}

/// Distinct languages of the given paths, in order of first appearance.
pub fn languages_for_files<S: AsRef<str>>(paths: &[S]) -> Vec<&'static str> {
    let mut found: Vec<&'static str> = Vec::new();
    for path in paths {
        if let Some(tag) = language_for_extension(path.as_ref()) {
            if !found.contains(&tag) {
                found.push(tag);
            }
        }
    }
    found
}

/// Frameworks indicated by the given paths, in table order.
pub fn frameworks_for_files<S: AsRef<str>>(paths: &[S]) -> Vec<&'static str> {
    FRAMEWORK_INDICATORS
        .iter()
        .filter(|(_, indicators)| {
            paths.iter().any(|path| {
                let path = path.as_ref();
                let name = file_name(path);
                indicators
                    .iter()
                    .any(|indicator| name == *indicator || path.ends_with(indicator))
            })
        })
        .map(|(framework, _)| *framework)
        .collect()
}

/// Language named by an "in <language>" phrase in free text.
pub fn language_from_utterance(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    utterance_patterns()
        .iter()
        .find(|(re, _)| re.is_match(&lower))
        .map(|(_, tag)| *tag)
}

/// Every tag in the extension table.
pub fn supported_languages() -> Vec<&'static str> {
    LANGUAGE_MAP.iter().map(|(tag, _)| *tag).collect()
}

/// List project files relative to `project_root`, `/`-separated.
///
/// Honors .gitignore files and skips hidden entries. Stops after `limit`
/// files.
pub fn collect_project_files(project_root: &Path, limit: usize) -> AppResult<Vec<String>> {
    if !project_root.is_dir() {
        return Err(AppError::not_found(format!(
            "Project root {}",
            project_root.display()
        )));
    }

    let mut builder = WalkBuilder::new(project_root);
    builder
        .hidden(true)
        .follow_links(false)
        .git_ignore(true)
        .git_exclude(true)
        .require_git(false);

    let mut files = Vec::new();
    for entry in builder.build() {
        if files.len() >= limit {
            tracing::debug!(limit, "project scan hit file limit");
            break;
        }
        let Ok(entry) = entry else {
            continue;
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(project_root) else {
            continue;
        };
        let rel = rel.to_string_lossy().replace('\\', "/");
        if !rel.is_empty() {
            files.push(rel);
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_for_extension() {
        assert_eq!(language_for_extension("src/app.tsx"), Some("typescript"));
        assert_eq!(language_for_extension("lib/Main.JAVA"), Some("java"));
        assert_eq!(language_for_extension("include/util.h"), Some("cpp"));
        assert_eq!(language_for_extension("src\\win\\main.rs"), Some("rust"));
        assert_eq!(language_for_extension("Dockerfile"), None);
        assert_eq!(language_for_extension("notes.txt"), None);
    }

    #[test]
    fn test_extension_taken_from_final_segment() {
        assert_eq!(language_for_extension("v1.2/Makefile"), None);
        assert_eq!(language_for_extension("archive.tar.go"), Some("go"));
    }

    #[test]
    fn test_languages_for_files_dedups_in_first_seen_order() {
        assert_eq!(languages_for_files(&["a.ts", "b.ts", "c.tsx"]), vec!["typescript"]);
        assert_eq!(
            languages_for_files(&["main.py", "lib.rs", "tool.py", "index.js"]),
            vec!["python", "rust", "javascript"]
        );
        assert!(languages_for_files(&["README.md", "Dockerfile"]).is_empty());
    }

    #[test]
    fn test_frameworks_for_files() {
        let paths = [
            "web/next.config.mjs",
            "prisma/schema.prisma",
            "src/components/Button.vue",
            "tailwind.config.ts",
        ];
        assert_eq!(
            frameworks_for_files(&paths),
            vec!["nextjs", "vue", "tailwind", "prisma"]
        );
        assert!(frameworks_for_files(&["src/main.rs"]).is_empty());
    }

    #[test]
    fn test_language_from_utterance() {
        assert_eq!(
            language_from_utterance("In TypeScript, prefer interfaces over types"),
            Some("typescript")
        );
        assert_eq!(language_from_utterance("always wrap errors in golang"), Some("go"));
        assert_eq!(language_from_utterance("use spans in C# code"), Some("csharp"));
        assert_eq!(language_from_utterance("avoid raw new in c++"), Some("cpp"));
        assert_eq!(language_from_utterance("in next.js use app router"), Some("nextjs"));
        assert_eq!(language_from_utterance("in javascript use const"), Some("javascript"));
    }

    #[test]
    fn test_language_from_utterance_is_word_bounded() {
        assert_eq!(language_from_utterance("ingoing requests are logged"), None);
        assert_eq!(language_from_utterance("written in gopher style"), None);
        assert_eq!(language_from_utterance("always use tabs"), None);
    }

    #[test]
    fn test_supported_languages_follow_table() {
        let langs = supported_languages();
        assert_eq!(langs.first(), Some(&"typescript"));
        assert_eq!(langs.last(), Some(&"astro"));
        assert_eq!(langs.len(), 24);
    }

    #[test]
    fn test_collect_project_files_respects_gitignore_and_hidden() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::create_dir_all(root.join("target")).unwrap();
        std::fs::create_dir_all(root.join(".agent-context/context")).unwrap();
        std::fs::write(root.join(".gitignore"), "target/\n").unwrap();
        std::fs::write(root.join("src/main.rs"), "fn main() {}").unwrap();
        std::fs::write(root.join("target/out.js"), "").unwrap();
        std::fs::write(root.join(".agent-context/context/rust.md"), "").unwrap();

        let files = collect_project_files(root, 100).unwrap();
        assert_eq!(files, vec!["src/main.rs".to_string()]);
    }

    #[test]
    fn test_collect_project_files_limit_and_missing_root() {
        let tmp = tempfile::tempdir().unwrap();
        for i in 0..5 {
            std::fs::write(tmp.path().join(format!("f{}.py", i)), "").unwrap();
        }
        assert_eq!(collect_project_files(tmp.path(), 3).unwrap().len(), 3);
        assert!(collect_project_files(&tmp.path().join("nope"), 3).is_err());
    }
}
