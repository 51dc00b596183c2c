//! Configuration in, tagged code out.
use glob::Pattern;
use serde::Serialize;
use snafu::prelude::*;
use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::{
    EmptyTagSnafu, Error, InvalidKindSnafu, InvalidLineSnafu, MissingPathSnafu, NotPythonSnafu,
    PatternSnafu, Result,
};

/// The kind of declaration a tag was found in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum DeclKind {
    #[serde(rename = "function")]
    Function,
    #[serde(rename = "class")]
    Type,
}

impl DeclKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclKind::Function => "function",
            DeclKind::Type => "class",
        }
    }
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeclKind {
    type Err = Error;

    /// ```rust
    /// use tag_finder_lib::model::DeclKind;
    ///
    /// assert_eq!("function".parse::<DeclKind>().unwrap(), DeclKind::Function);
    /// assert_eq!("class".parse::<DeclKind>().unwrap(), DeclKind::Type);
    /// assert!("module".parse::<DeclKind>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "function" => Ok(DeclKind::Function),
            "class" | "type" => Ok(DeclKind::Type),
            kind => InvalidKindSnafu { kind }.fail(),
        }
    }
}

/// One declaration whose source contains the tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TaggedCode {
    file_path: PathBuf,
    name: String,
    line: usize,
    /// Line the code starts on, before `line` when there are decorators or
    /// comments above the keyword.
    first_line: usize,
    code: String,
    kind: DeclKind,
}

impl TaggedCode {
    /// Fails if `line` is zero, lines start at 1.
    pub fn new(
        file_path: impl Into<PathBuf>,
        name: impl Into<String>,
        line: usize,
        code: impl Into<String>,
        kind: DeclKind,
    ) -> Result<Self> {
        let name = name.into();
        ensure!(line >= 1, InvalidLineSnafu { name, line });
        Ok(TaggedCode {
            file_path: file_path.into(),
            name,
            line,
            first_line: line,
            code: code.into(),
            kind,
        })
    }

    /// Set the line the code starts on. Fails unless it is between 1 and
    /// the keyword's line.
    pub fn with_first_line(mut self, first_line: usize) -> Result<Self> {
        ensure!(
            (1..=self.line).contains(&first_line),
            InvalidLineSnafu {
                name: &self.name,
                line: first_line
            }
        );
        self.first_line = first_line;
        Ok(self)
    }

    /// Path of the file, relative to the search root where possible.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The 1-based line of the declaration's keyword.
    pub fn line(&self) -> usize {
        self.line
    }

    /// The line [`TaggedCode::code`] starts on.
    pub fn first_line(&self) -> usize {
        self.first_line
    }

    /// The declaration's full source, body included.
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn kind(&self) -> DeclKind {
        self.kind
    }
}

/// What to search for, and where.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExtractorConfig {
    tag: String,
    root: PathBuf,
    include_functions: bool,
    include_types: bool,
    file_pattern: String,
    #[serde(skip)]
    pattern: Pattern,
    #[serde(skip)]
    single_file: bool,
}

impl ExtractorConfig {
    pub const DEFAULT_FILE_PATTERN: &'static str = "*.py";

    /// Validate the tag and root path. Both kinds of declaration are included
    /// and the file pattern is `*.py` until changed.
    ///
    /// The root must exist, and if it is a file it must be a Python file. It
    /// is stored in canonical form.
    pub fn new(tag: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let tag = tag.into();
        ensure!(!tag.is_empty(), EmptyTagSnafu);

        let root = root.as_ref();
        let root = root
            .canonicalize()
            .context(MissingPathSnafu { path: root })?;
        let single_file = root.is_file();
        ensure!(
            !single_file || root.extension().is_some_and(|ext| ext == "py"),
            NotPythonSnafu { path: &root }
        );

        Ok(ExtractorConfig {
            tag,
            root,
            include_functions: true,
            include_types: true,
            file_pattern: Self::DEFAULT_FILE_PATTERN.to_string(),
            pattern: Pattern::new(Self::DEFAULT_FILE_PATTERN).context(PatternSnafu {
                pattern: Self::DEFAULT_FILE_PATTERN,
            })?,
            single_file,
        })
    }

    pub fn with_functions(mut self, include: bool) -> Self {
        self.include_functions = include;
        self
    }

    pub fn with_types(mut self, include: bool) -> Self {
        self.include_types = include;
        self
    }

    /// Set the glob used to pick files in directory mode. Fails if the
    /// pattern is not a valid glob.
    pub fn with_file_pattern(mut self, pattern: impl Into<String>) -> Result<Self> {
        let file_pattern = pattern.into();
        self.pattern = Pattern::new(&file_pattern).context(PatternSnafu {
            pattern: &file_pattern,
        })?;
        self.file_pattern = file_pattern;
        Ok(self)
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn include_functions(&self) -> bool {
        self.include_functions
    }

    pub fn include_types(&self) -> bool {
        self.include_types
    }

    pub fn file_pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Whether the root is a single file rather than a directory.
    pub fn is_single_file(&self) -> bool {
        self.single_file
    }

    /// The directory that match paths are relative to.
    pub fn base_path(&self) -> &Path {
        if self.single_file {
            self.root.parent().unwrap_or(&self.root)
        } else {
            &self.root
        }
    }
}

/// Everything one extraction run found.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExtractionResult {
    pub config: ExtractorConfig,
    /// In the order they were found: file by file, then in document order.
    pub matches: Vec<TaggedCode>,
    /// Files that were read and searched, whether or not they matched.
    pub processed_files: usize,
    /// One `"<path>: <reason>"` line per file that could not be searched.
    pub skipped_files: Vec<String>,
}

impl ExtractionResult {
    pub fn new(config: ExtractorConfig) -> Self {
        ExtractionResult {
            config,
            matches: vec![],
            processed_files: 0,
            skipped_files: vec![],
        }
    }

    pub fn total_matches(&self) -> usize {
        self.matches.len()
    }

    /// Matches grouped by file path. Groups iterate in path order and keep
    /// the order the matches were found in.
    pub fn group_by_file(&self) -> BTreeMap<&Path, Vec<&TaggedCode>> {
        let mut grouped: BTreeMap<&Path, Vec<&TaggedCode>> = BTreeMap::new();
        for tagged in self.matches.iter() {
            grouped.entry(tagged.file_path()).or_default().push(tagged);
        }
        grouped
    }

    /// Like [`ExtractionResult::group_by_file`] but each group is sorted by
    /// line.
    pub fn group_by_file_and_line(&self) -> BTreeMap<&Path, Vec<&TaggedCode>> {
        let mut grouped = self.group_by_file();
        for group in grouped.values_mut() {
            group.sort_by_key(|tagged| tagged.line());
        }
        grouped
    }
}
