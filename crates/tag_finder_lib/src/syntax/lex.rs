//! # Reading comment lines around declarations.
use nom::{bytes::complete as bytes, character::complete as character, combinator, IResult, Parser};

/// Eat leading whitespace, returning its width in columns. Tabs advance to
/// the next multiple of eight and a form feed resets the count.
///
/// ```rust
/// use tag_finder_lib::syntax::lex::*;
///
/// assert_eq!(indentation("    pass"), Ok(("pass", 4)));
/// assert_eq!(indentation("  \tpass"), Ok(("pass", 8)));
/// ```
pub fn indentation(i: &str) -> IResult<&str, usize> {
    let (i, ws) = bytes::take_while(|c: char| c == ' ' || c == '\t' || c == '\x0c')(i)?;
    let width = ws.chars().fold(0, |col, c| match c {
        '\t' => (col / 8 + 1) * 8,
        '\x0c' => 0,
        _ => col + 1,
    });
    Ok((i, width))
}

/// Eat a comment, up to but not including the end of the line.
///
/// ```rust
/// use tag_finder_lib::syntax::lex::*;
///
/// assert_eq!(comment("# TODO: soon\nx = 1"), Ok(("\nx = 1", "# TODO: soon")));
/// ```
pub fn comment(i: &str) -> IResult<&str, &str> {
    combinator::recognize((
        character::char('#'),
        bytes::take_till(|c| c == '\r' || c == '\n'),
    ))
    .parse(i)
}

/// Eat a physical line that holds nothing but a comment, returning the
/// comment's indentation and text.
///
/// ```rust
/// use tag_finder_lib::syntax::lex::*;
///
/// assert_eq!(comment_line("    # TODO: later"), Ok(("", (4, "# TODO: later"))));
/// assert!(comment_line("x = 1  # not alone").is_err());
/// assert!(comment_line("").is_err());
/// ```
pub fn comment_line(i: &str) -> IResult<&str, (usize, &str)> {
    let (i, indent) = indentation(i)?;
    let (i, text) = comment(i)?;
    let (i, _) = combinator::opt(character::line_ending).parse(i)?;
    let (i, _) = combinator::eof(i)?;
    Ok((i, (indent, text)))
}

/// Whether the line is empty or only whitespace.
pub fn is_blank(line: &str) -> bool {
    indentation(line).is_ok_and(|(rest, _)| rest.trim_end_matches(['\r', '\n']).is_empty())
}
