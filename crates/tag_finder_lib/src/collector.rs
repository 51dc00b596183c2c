//! Collecting the declarations whose source contains a tag.
use snafu::OptionExt;

use crate::{
    model::DeclKind,
    syntax::{
        visit::{self, Visitor},
        Def, LineIndex, Module,
    },
    RenderSnafu, Result,
};

/// A declaration that contains the tag, before it is tied to a file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub name: String,
    pub kind: DeclKind,
    /// 1-based line of the declaration's keyword.
    pub line: usize,
    /// 1-based line the code starts on, at the first comment or decorator
    /// above the keyword when there are any.
    pub first_line: usize,
    /// The declaration's source, decorators and body included.
    pub code: String,
}

/// Visits declarations and keeps the ones whose rendered source contains the
/// tag. A tag inside a nested declaration is also inside everything that
/// encloses it, so each enclosing declaration is collected too.
pub struct TagCollector<'a> {
    tag: &'a str,
    include_functions: bool,
    include_types: bool,
    source: &'a str,
    lines: LineIndex,
    results: Vec<Candidate>,
}

impl<'a> TagCollector<'a> {
    pub fn new(
        tag: &'a str,
        include_functions: bool,
        include_types: bool,
        source: &'a str,
    ) -> Self {
        TagCollector {
            tag,
            include_functions,
            include_types,
            source,
            lines: LineIndex::new(source),
            results: vec![],
        }
    }

    /// Walk the module, returning candidates in document order.
    ///
    /// ```rust
    /// use tag_finder_lib::{collector::TagCollector, model::DeclKind, syntax::parse_module};
    ///
    /// let src = "\n\ndef later():\n    # TODO: write me\n    pass\n";
    /// let module = parse_module(src).unwrap();
    /// let found = TagCollector::new("TODO:", true, true, src)
    ///     .collect(&module)
    ///     .unwrap();
    ///
    /// assert_eq!(found.len(), 1);
    /// assert_eq!(found[0].name, "later");
    /// assert_eq!(found[0].kind, DeclKind::Function);
    /// assert_eq!(found[0].line, 3);
    /// ```
    pub fn collect(mut self, module: &Module) -> Result<Vec<Candidate>> {
        visit::walk(&module.body, &mut self)?;
        Ok(self.results)
    }

    fn check(&mut self, def: &Def, kind: DeclKind) -> Result<()> {
        let code = def.span.render(self.source).context(RenderSnafu {
            name: &def.name,
            start: def.span.start,
            end: def.span.end,
        })?;
        if !code.contains(self.tag) {
            return Ok(());
        }

        let line = self.lines.line_of(def.keyword).unwrap_or(1);
        let first_line = self.lines.line_of(def.span.start).unwrap_or(line).min(line);
        log::debug!("found '{}' in {kind} '{}' on line {line}", self.tag, def.name);
        self.results.push(Candidate {
            name: def.name.clone(),
            kind,
            line,
            first_line,
            code: code.to_string(),
        });
        Ok(())
    }
}

impl Visitor for TagCollector<'_> {
    fn on_function(&mut self, def: &Def) -> Result<()> {
        if self.include_functions {
            self.check(def, DeclKind::Function)?;
        }
        Ok(())
    }

    fn on_type(&mut self, def: &Def) -> Result<()> {
        if self.include_types {
            self.check(def, DeclKind::Type)?;
        }
        Ok(())
    }
}
