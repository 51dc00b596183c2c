//! Running an extraction over every file the configuration points at.
use snafu::ResultExt;
use std::path::{Path, PathBuf};

use crate::{
    collector::TagCollector,
    finder::FileSearcher,
    model::{ExtractionResult, ExtractorConfig, TaggedCode},
    syntax, Diagnostics, Error, IoSnafu, Message, Result, Utf8Snafu,
};

pub struct TagExtractor<'a> {
    config: ExtractorConfig,
    diagnostics: &'a mut dyn Diagnostics,
}

impl<'a> TagExtractor<'a> {
    pub fn new(config: ExtractorConfig, diagnostics: &'a mut dyn Diagnostics) -> Self {
        TagExtractor {
            config,
            diagnostics,
        }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Search every file, one at a time in path order. Files that can't be
    /// read or parsed are listed in the result's skipped files instead of
    /// stopping the run.
    pub fn extract(&mut self) -> ExtractionResult {
        let mut result = ExtractionResult::new(self.config.clone());

        self.diagnostics.send(Message::FindingFiles {
            root: self.config.root().to_path_buf(),
        });
        let found = FileSearcher::find(&self.config);
        self.diagnostics.send(Message::FoundFiles {
            count: found.files.len(),
        });

        for (path, err) in found.unreadable {
            self.skip_unreadable(&mut result, &path, err);
        }
        for path in found.files.iter() {
            self.process_file(&mut result, path);
        }

        self.diagnostics.send(Message::Finished {
            processed: result.processed_files,
            matches: result.total_matches(),
            skipped: result.skipped_files.len(),
        });
        result
    }

    fn process_file(&mut self, result: &mut ExtractionResult, path: &Path) {
        let relative = self.relative_path(path);
        log::trace!("Reading {path:?}");
        self.diagnostics.send(Message::ProcessingFile {
            path: relative.clone(),
        });

        match self.extract_from_file(path, &relative) {
            Ok(None) => {
                result.processed_files += 1;
                self.diagnostics
                    .send(Message::NoTagInFile { path: relative });
            }
            Ok(Some(matches)) => {
                result.processed_files += 1;
                self.diagnostics.send(Message::FoundMatches {
                    path: relative,
                    count: matches.len(),
                });
                result.matches.extend(matches);
            }
            Err(err) => self.skip(result, &relative, err.to_string()),
        }
    }

    /// Skip an entry the file search could not read.
    fn skip_unreadable(&mut self, result: &mut ExtractionResult, path: &Path, err: Error) {
        let relative = self.relative_path(path);
        self.skip(result, &relative, err.to_string());
    }

    fn skip(&mut self, result: &mut ExtractionResult, path: &Path, reason: String) {
        log::warn!("skipping {}: {reason}", path.display());
        result
            .skipped_files
            .push(format!("{}: {reason}", path.display()));
        self.diagnostics.send(Message::SkippedFile {
            path: path.to_path_buf(),
            reason,
        });
    }

    /// The tagged code in one file, or `None` if the tag appears nowhere in
    /// it and parsing was skipped.
    fn extract_from_file(&self, path: &Path, relative: &Path) -> Result<Option<Vec<TaggedCode>>> {
        let bytes = std::fs::read(path).context(IoSnafu)?;
        let source = String::from_utf8(bytes).context(Utf8Snafu)?;
        let source = source.strip_prefix('\u{feff}').unwrap_or(&source);

        let tag = self.config.tag();
        if !source.contains(tag) {
            return Ok(None);
        }

        let module = syntax::parse_module(source)?;
        let candidates = TagCollector::new(
            tag,
            self.config.include_functions(),
            self.config.include_types(),
            source,
        )
        .collect(&module)?;

        let matches = candidates
            .into_iter()
            .map(|candidate| {
                TaggedCode::new(
                    relative,
                    candidate.name,
                    candidate.line,
                    candidate.code,
                    candidate.kind,
                )
                .and_then(|tagged| tagged.with_first_line(candidate.first_line))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(matches))
    }

    /// The path relative to the configured base, or as given if it lies
    /// outside of it.
    fn relative_path(&self, path: &Path) -> PathBuf {
        path.strip_prefix(self.config.base_path())
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::DeclKind;
    use std::fs;

    const TAGGED_FUNCTION: &str = "
def test_func():
    # TODO: implement this
    pass
";

    fn extract(config: ExtractorConfig) -> ExtractionResult {
        TagExtractor::new(config, &mut ()).extract()
    }

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn single_tagged_function() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(dir.path(), "test.py", TAGGED_FUNCTION);

        let result = extract(ExtractorConfig::new("TODO:", &file).unwrap());
        assert_eq!(result.total_matches(), 1);
        assert_eq!(result.processed_files, 1);
        assert!(result.skipped_files.is_empty());

        let tagged = &result.matches[0];
        assert_eq!(tagged.name(), "test_func");
        assert_eq!(tagged.kind(), DeclKind::Function);
        assert_eq!(tagged.line(), 2);
        assert_eq!(tagged.file_path(), Path::new("test.py"));
    }

    #[test]
    fn untagged_class_is_left_out() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(
            dir.path(),
            "test.py",
            &format!("{TAGGED_FUNCTION}\nclass Plain:\n    pass\n"),
        );
        let result = extract(ExtractorConfig::new("TODO:", &file).unwrap());
        assert_eq!(result.total_matches(), 1);
    }

    #[test]
    fn two_files_in_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "test1.py", TAGGED_FUNCTION);
        write(dir.path(), "sub/test2.py", TAGGED_FUNCTION);

        let result = extract(ExtractorConfig::new("TODO:", dir.path()).unwrap());
        assert_eq!(result.total_matches(), 2);
        assert_eq!(result.processed_files, 2);
        let grouped = result.group_by_file();
        assert_eq!(
            grouped.keys().copied().collect::<Vec<_>>(),
            vec![Path::new("sub/test2.py"), Path::new("test1.py")]
        );
    }

    #[test]
    fn file_without_the_tag() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(dir.path(), "test.py", "def test_func():\n    pass\n");

        let mut messages = vec![];
        let config = ExtractorConfig::new("TODO:", &file).unwrap();
        let result = TagExtractor::new(config, &mut messages).extract();
        assert_eq!(result.total_matches(), 0);
        assert_eq!(result.processed_files, 1);
        assert!(result.skipped_files.is_empty());
        assert!(messages.contains(&Message::NoTagInFile {
            path: "test.py".into()
        }));
    }

    #[test]
    fn malformed_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a_broken.py", "def broken(:\n    # TODO: fix\n");
        write(dir.path(), "b_good.py", TAGGED_FUNCTION);
        fs::write(dir.path().join("c_binary.py"), b"# TODO: \xff\xfe\n").unwrap();

        let mut messages = vec![];
        let config = ExtractorConfig::new("TODO:", dir.path()).unwrap();
        let result = TagExtractor::new(config, &mut messages).extract();
        assert_eq!(result.processed_files, 1);
        assert_eq!(result.total_matches(), 1);
        assert_eq!(result.skipped_files.len(), 2);
        assert!(result.skipped_files[0].starts_with("a_broken.py: Syntax error on line "));
        assert!(result.skipped_files[1].starts_with("c_binary.py: File is not valid UTF-8"));
        assert_eq!(
            messages.last(),
            Some(&Message::Finished {
                processed: 1,
                matches: 1,
                skipped: 2
            })
        );
    }

    #[test]
    fn invalid_statements_are_syntax_errors() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.py", "x = = 1\ndef broken():\n    # TODO: fix\n");
        write(
            dir.path(),
            "b.py",
            "def f(x y):\n    # TODO: fix\n    return return\n",
        );
        write(dir.path(), "c.py", TAGGED_FUNCTION);

        let result = extract(ExtractorConfig::new("TODO:", dir.path()).unwrap());
        assert_eq!(result.processed_files, 1);
        assert_eq!(result.total_matches(), 1);
        assert_eq!(result.matches[0].file_path(), Path::new("c.py"));
        assert_eq!(result.skipped_files.len(), 2);
        assert!(result.skipped_files[0].starts_with("a.py: Syntax error on line 1"));
        assert!(result.skipped_files[1].starts_with("b.py: Syntax error on line "));
    }

    #[test]
    fn comments_above_a_declaration_are_part_of_it() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(
            dir.path(),
            "test.py",
            "import os\n\n# TODO: refactor this\n@cache\ndef f():\n    pass\n",
        );
        let result = extract(ExtractorConfig::new("TODO:", &file).unwrap());
        assert_eq!(result.total_matches(), 1);
        let tagged = &result.matches[0];
        assert_eq!(tagged.name(), "f");
        assert_eq!(tagged.line(), 5);
        assert_eq!(tagged.first_line(), 3);
    }

    #[test]
    fn nested_declarations_match_twice() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(
            dir.path(),
            "test.py",
            "class Outer:\n    def inner(self):\n        # TODO: later\n        pass\n",
        );
        let result = extract(ExtractorConfig::new("TODO:", &file).unwrap());
        assert_eq!(
            result
                .matches
                .iter()
                .map(|t| (t.name(), t.kind()))
                .collect::<Vec<_>>(),
            vec![("Outer", DeclKind::Type), ("inner", DeclKind::Function)]
        );
        assert!(result
            .matches
            .iter()
            .all(|t| t.code().contains("TODO:") && t.line() >= 1));
    }

    #[test]
    fn kinds_can_be_excluded() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(
            dir.path(),
            "test.py",
            &format!("{TAGGED_FUNCTION}\nclass Tagged:\n    # TODO: implement this\n    pass\n"),
        );

        let config = ExtractorConfig::new("TODO:", &file).unwrap();
        let functions = extract(config.clone().with_types(false));
        assert_eq!(functions.total_matches(), 1);
        assert!(functions
            .matches
            .iter()
            .all(|t| t.kind() == DeclKind::Function));

        let types = extract(config.with_functions(false));
        assert_eq!(types.total_matches(), 1);
        assert!(types.matches.iter().all(|t| t.kind() == DeclKind::Type));
    }

    #[test]
    fn empty_directory_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = extract(ExtractorConfig::new("TODO:", dir.path()).unwrap());
        assert_eq!(result.total_matches(), 0);
        assert_eq!(result.processed_files, 0);
        assert!(result.skipped_files.is_empty());
    }

    #[test]
    fn extraction_is_repeatable() {
        let config = ExtractorConfig::new("TODO:", "test_data/project").unwrap();
        let mut sink: Vec<Message> = vec![];
        let mut extractor = TagExtractor::new(config, &mut sink);
        let first = extractor.extract();
        let second = extractor.extract();
        assert_eq!(first, second);
    }

    #[test]
    fn test_data_project() {
        let config = ExtractorConfig::new("TODO:", "test_data/project").unwrap();
        let result = extract(config);
        assert_eq!(result.processed_files, 3);
        assert_eq!(result.skipped_files.len(), 1);
        assert!(result.skipped_files[0].starts_with("pkg/broken.py: "));
        assert_eq!(
            result
                .matches
                .iter()
                .map(|t| format!("{}:{}:{}", t.file_path().display(), t.line(), t.name()))
                .collect::<Vec<_>>(),
            vec![
                "app.py:8:main",
                "pkg/models.py:4:Order",
                "pkg/models.py:13:total",
                "pkg/models.py:19:refund",
            ]
        );
    }

    #[test]
    fn files_outside_the_base_keep_their_path() {
        let config = ExtractorConfig::new("TODO:", "test_data/project").unwrap();
        let mut sink: Vec<Message> = vec![];
        let extractor = TagExtractor::new(config, &mut sink);
        let outside = Path::new("/somewhere/else.py");
        assert_eq!(extractor.relative_path(outside), outside.to_path_buf());
    }

    #[test]
    fn unreadable_entries_are_listed_relative_to_the_base() {
        let config = ExtractorConfig::new("TODO:", "test_data/project").unwrap();
        let locked = config.root().join("pkg/locked");
        let mut result = ExtractionResult::new(config.clone());
        let mut sink: Vec<Message> = vec![];
        TagExtractor::new(config, &mut sink).skip_unreadable(
            &mut result,
            &locked,
            Error::EmptyTag,
        );
        assert_eq!(result.skipped_files.len(), 1);
        assert!(
            result.skipped_files[0].starts_with("pkg/locked: "),
            "{}",
            result.skipped_files[0]
        );
        assert_eq!(
            sink,
            vec![Message::SkippedFile {
                path: "pkg/locked".into(),
                reason: Error::EmptyTag.to_string(),
            }]
        );
    }
}
