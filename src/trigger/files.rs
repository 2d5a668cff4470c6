//! Edited-file trigger.
//!
//! Decides whether a file the agent just edited touches user interface code
//! and is worth a visual verification. Paths are matched against built-in
//! glob sets per UI category; code files that match nothing are checked for
//! terminal UI library imports. Projects opt in to automatic verification
//! with a `glimpse: auto-verify` line in their `CLAUDE.md`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use regex::Regex;
use serde::Serialize;

use crate::checklist::TargetKind;
use crate::ports::FileSystem;

/// Kind of UI a file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UiCategory {
    /// Web components and routes.
    Webapp,
    /// Stylesheets and themes.
    Styles,
    /// Desktop UI definitions.
    Gui,
    /// Command-line and terminal UI code.
    Tui,
}

impl UiCategory {
    /// Lowercase category name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Webapp => "webapp",
            Self::Styles => "styles",
            Self::Gui => "gui",
            Self::Tui => "tui",
        }
    }

    /// Target kind to capture after editing a file of this category.
    #[must_use]
    pub fn target_kind(self) -> TargetKind {
        match self {
            Self::Webapp | Self::Styles => TargetKind::Webapp,
            Self::Gui => TargetKind::Gui,
            Self::Tui => TargetKind::Tui,
        }
    }
}

impl fmt::Display for UiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Checked in order; the first category with a matching glob wins.
const UI_GLOBS: &[(UiCategory, &[&str])] = &[
    (
        UiCategory::Webapp,
        &[
            "**/*.tsx",
            "**/*.jsx",
            "**/*.vue",
            "**/*.svelte",
            "**/*.astro",
            "**/pages/**/*.tsx",
            "**/pages/**/*.jsx",
            "**/pages/**/*.vue",
            "**/app/**/*.tsx",
            "**/app/**/*.jsx",
            "**/components/**/*.tsx",
            "**/components/**/*.jsx",
            "**/components/**/*.vue",
            "**/components/**/*.svelte",
        ],
    ),
    (
        UiCategory::Styles,
        &[
            "**/*.css",
            "**/*.scss",
            "**/*.sass",
            "**/*.less",
            "**/*.styled.ts",
            "**/*.styled.tsx",
            "**/*.styles.ts",
            "**/*.styles.tsx",
            "**/tailwind.config.*",
            "**/theme/**/*",
            "**/themes/**/*",
        ],
    ),
    (
        UiCategory::Gui,
        &[
            "**/*.xaml",
            "**/*.axaml",
            "**/*.fxml",
            "**/*.ui",
            "**/*.qml",
            "**/*.glade",
            "**/*.Designer.cs",
            "**/renderer/**/*.ts",
            "**/renderer/**/*.tsx",
        ],
    ),
    (
        UiCategory::Tui,
        &[
            "**/cli/**/*.py",
            "**/cli/**/*.ts",
            "**/cli/**/*.js",
            "**/tui/**/*.py",
            "**/tui/**/*.ts",
            "**/tui/**/*.js",
            "**/*_cli.py",
            "**/*_tui.py",
            "**/*_cli.ts",
            "**/*_tui.ts",
            "**/cli.py",
            "**/tui.py",
        ],
    ),
];

/// Pattern name reported for content-based matches.
pub const TUI_IMPORT_PATTERN: &str = "content:tui-import";

const CODE_EXTENSIONS: [&str; 5] = ["py", "ts", "tsx", "js", "jsx"];

static TUI_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?m)^\s*(?:import\s+(?:curses|blessed|rich|textual|prompt_toolkit)\b|from\s+(?:curses|blessed|rich|textual|prompt_toolkit)(?:\.\w+)*\s+import\b)|import\s+\{[^}]*\}\s+from\s+['"]ink['"]|require\(\s*['"]ink['"]\s*\)"#,
    )
    .expect("valid tui import regex")
});

static AUTO_VERIFY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)glimpse:\s*auto-verify").expect("valid auto-verify regex"));
static AUTO_VERIFY_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"glimpse-url:\s*(\S+)").expect("valid url regex"));
static AUTO_VERIFY_PORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"glimpse-port:\s*(\d+)").expect("valid port regex"));

static BUILTIN: LazyLock<FileClassifier> = LazyLock::new(FileClassifier::builtin);

/// Why a file should be verified.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileMatch {
    /// Category of the file.
    pub category: UiCategory,
    /// Glob that matched, or [`TUI_IMPORT_PATTERN`].
    pub pattern: String,
    /// 1.0 for path matches, 0.9 for content matches.
    pub confidence: f64,
}

impl FileMatch {
    /// One-line explanation.
    #[must_use]
    pub fn reason(&self) -> String {
        if self.pattern == TUI_IMPORT_PATTERN {
            "file imports a terminal UI library".to_string()
        } else {
            format!("file matches {} pattern {}", self.category, self.pattern)
        }
    }
}

struct CategorySet {
    category: UiCategory,
    globs: GlobSet,
    patterns: &'static [&'static str],
}

/// Path classifier over the built-in UI globs.
pub struct FileClassifier {
    sets: Vec<CategorySet>,
}

impl FileClassifier {
    fn builtin() -> Self {
        let sets = UI_GLOBS
            .iter()
            .map(|(category, patterns)| {
                let mut builder = GlobSetBuilder::new();
                for pattern in *patterns {
                    builder.add(
                        GlobBuilder::new(pattern)
                            .case_insensitive(true)
                            .literal_separator(true)
                            .build()
                            .expect("built-in UI globs are valid"),
                    );
                }
                CategorySet {
                    category: *category,
                    globs: builder.build().expect("built-in UI glob sets compile"),
                    patterns,
                }
            })
            .collect();
        Self { sets }
    }

    /// The shared built-in classifier.
    #[must_use]
    pub fn shared() -> &'static Self {
        &BUILTIN
    }

    /// Match a path against the globs only.
    #[must_use]
    pub fn classify_path(&self, path: &Path) -> Option<FileMatch> {
        let normalized = path.to_string_lossy().replace('\\', "/");
        self.sets.iter().find_map(|set| {
            let first = set.globs.matches(normalized.as_str()).into_iter().min()?;
            Some(FileMatch {
                category: set.category,
                pattern: set.patterns[first].to_string(),
                confidence: 1.0,
            })
        })
    }

    /// Match a path, then fall back to scanning code files for terminal UI
    /// imports. Unreadable files simply do not match.
    #[must_use]
    pub fn classify(&self, fs: &dyn FileSystem, path: &Path) -> Option<FileMatch> {
        if let Some(found) = self.classify_path(path) {
            return Some(found);
        }
        let is_code = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| CODE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
        if !is_code {
            return None;
        }
        let text = fs.read_to_string(path).ok()?;
        TUI_IMPORT.is_match(&text).then(|| FileMatch {
            category: UiCategory::Tui,
            pattern: TUI_IMPORT_PATTERN.to_string(),
            confidence: 0.9,
        })
    }
}

/// Whether editing `path` should trigger a verification, and why.
#[must_use]
pub fn should_auto_verify(fs: &dyn FileSystem, path: &Path) -> Option<FileMatch> {
    FileClassifier::shared().classify(fs, path)
}

/// Project opt-in to verification after UI edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutoVerifyConfig {
    /// The `CLAUDE.md` that enabled it.
    pub source: PathBuf,
    /// `glimpse-url:` value.
    pub url: Option<String>,
    /// `glimpse-port:` value.
    pub port: Option<u16>,
}

impl AutoVerifyConfig {
    /// The configured URL, or a localhost URL on the configured port.
    #[must_use]
    pub fn target_url(&self) -> Option<String> {
        self.url.clone().or_else(|| self.port.map(|p| format!("http://localhost:{p}")))
    }
}

/// Read the opt-in from `<root>/CLAUDE.md`, then `<task_dir>/CLAUDE.md`.
/// The first file carrying the marker wins.
#[must_use]
pub fn auto_verify_config(
    fs: &dyn FileSystem,
    project_root: &Path,
    task_dir: &Path,
) -> Option<AutoVerifyConfig> {
    [project_root.join("CLAUDE.md"), task_dir.join("CLAUDE.md")].into_iter().find_map(|path| {
        let text = fs.read_to_string(&path).ok()?;
        if !AUTO_VERIFY.is_match(&text) {
            return None;
        }
        let url = AUTO_VERIFY_URL.captures(&text).map(|c| c[1].to_string());
        let port = AUTO_VERIFY_PORT.captures(&text).and_then(|c| c[1].parse().ok());
        Some(AutoVerifyConfig { source: path, url, port })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemFs;

    fn category(path: &str) -> Option<UiCategory> {
        FileClassifier::shared().classify_path(Path::new(path)).map(|m| m.category)
    }

    #[test]
    fn ui_paths_are_categorized() {
        assert_eq!(category("src/components/Button.tsx"), Some(UiCategory::Webapp));
        assert_eq!(category("/home/me/app/src/App.VUE"), Some(UiCategory::Webapp));
        assert_eq!(category("styles/main.scss"), Some(UiCategory::Styles));
        assert_eq!(category("tailwind.config.js"), Some(UiCategory::Styles));
        assert_eq!(category("src/theme/colors.ts"), Some(UiCategory::Styles));
        assert_eq!(category("Views\\MainWindow.xaml"), Some(UiCategory::Gui));
        assert_eq!(category("forms/Main.Designer.cs"), Some(UiCategory::Gui));
        assert_eq!(category("electron/renderer/index.ts"), Some(UiCategory::Gui));
        assert_eq!(category("tools/cli/main.py"), Some(UiCategory::Tui));
        assert_eq!(category("deploy_cli.py"), Some(UiCategory::Tui));
    }

    #[test]
    fn non_ui_paths_do_not_match() {
        assert_eq!(category("src/lib.rs"), None);
        assert_eq!(category("README.md"), None);
        assert_eq!(category("server/api.py"), None);
        assert_eq!(category("src/client.py"), None);
    }

    #[test]
    fn first_matching_glob_is_reported() {
        let found =
            FileClassifier::shared().classify_path(Path::new("src/components/Nav.tsx")).unwrap();
        assert_eq!(found.pattern, "**/*.tsx");
        assert!((found.confidence - 1.0).abs() < f64::EPSILON);
        assert_eq!(found.reason(), "file matches webapp pattern **/*.tsx");
    }

    #[test]
    fn tui_imports_are_found_in_code_files() {
        let fs = MemFs::new();
        fs.write(Path::new("/p/menu.py"), "import os\nfrom rich.console import Console\n").unwrap();
        fs.write(Path::new("/p/app.js"), "const { render } = require('ink');\n").unwrap();
        fs.write(Path::new("/p/plain.py"), "import json\n").unwrap();
        fs.write(Path::new("/p/notes.txt"), "import curses\n").unwrap();

        let found = should_auto_verify(&fs, Path::new("/p/menu.py")).unwrap();
        assert_eq!(found.category, UiCategory::Tui);
        assert_eq!(found.pattern, TUI_IMPORT_PATTERN);
        assert!(should_auto_verify(&fs, Path::new("/p/app.js")).is_some());
        assert!(should_auto_verify(&fs, Path::new("/p/plain.py")).is_none());
        assert!(should_auto_verify(&fs, Path::new("/p/notes.txt")).is_none());
        assert!(should_auto_verify(&fs, Path::new("/p/missing.py")).is_none());
    }

    #[test]
    fn categories_map_to_target_kinds() {
        assert_eq!(UiCategory::Styles.target_kind(), TargetKind::Webapp);
        assert_eq!(UiCategory::Gui.target_kind(), TargetKind::Gui);
        assert_eq!(UiCategory::Tui.target_kind(), TargetKind::Tui);
    }

    #[test]
    fn auto_verify_is_opt_in() {
        let fs = MemFs::new();
        let root = Path::new("/p");
        let tasks = Path::new("/p/.claude");
        assert!(auto_verify_config(&fs, root, tasks).is_none());

        fs.write(Path::new("/p/CLAUDE.md"), "# Project\nNo markers here.\n").unwrap();
        fs.write(
            Path::new("/p/.claude/CLAUDE.md"),
            "glimpse: auto-verify\nglimpse-port: 5173\n",
        )
        .unwrap();
        let config = auto_verify_config(&fs, root, tasks).unwrap();
        assert_eq!(config.source, Path::new("/p/.claude/CLAUDE.md"));
        assert_eq!(config.port, Some(5173));
        assert_eq!(config.target_url().as_deref(), Some("http://localhost:5173"));

        fs.write(Path::new("/p/CLAUDE.md"), "Glimpse: Auto-Verify\nglimpse-url: http://app.test\n").unwrap();
        let config = auto_verify_config(&fs, root, tasks).unwrap();
        assert_eq!(config.source, Path::new("/p/CLAUDE.md"));
        assert_eq!(config.target_url().as_deref(), Some("http://app.test"));
    }
}
