//! Term parser (C2): translates the statement language (spec §4.1, §6) into
//! a typed [`Term`] tree plus truth/priority/question annotations.
//!
//! Implemented as a hand-written operator-precedence parser, in the
//! teacher's style of small focused parsing functions rather than a parser
//! combinator crate — the grammar is fixed and small enough that a
//! recursive-descent implementation reads more plainly than a combinator
//! pipeline would.

use crate::error::ParseError;
use crate::term::{Term, TermType};
use crate::truth::TruthValue;

/// Binary connective precedence table (spec §4.1): lower precedence parses
/// first (outermost).
const IMPLICATION: &str = "==>";
const EQUIVALENCE: &str = "<=>";
const CONJUNCTION: &str = "&&";
const DISJUNCTION: &str = "||";
const INHERITANCE: &str = "-->";
const SIMILARITY: &str = "<->";

/// Result of parsing one statement line.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedStatement {
    pub term: Term,
    pub truth: Option<TruthValue>,
    pub priority: Option<f64>,
    pub is_question: bool,
}

type PResult<T> = std::result::Result<T, ParseError>;

/// Parse one statement: `term ('.' | '?') truthAnno?`.
pub fn parse_statement(input: &str) -> PResult<ParsedStatement> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ParseError::new(0, "a non-empty statement"));
    }

    let (stmt_str, anno_str) = split_annotation(trimmed);
    let (term_str, is_question, terminator_pos) = split_terminator(stmt_str)?;

    let term = Parser::new(term_str).parse_full_term()?;
    let (truth, priority) = parse_annotation(anno_str, terminator_pos)?;

    Ok(ParsedStatement {
        term,
        truth,
        priority,
        is_question,
    })
}

/// Find the `.`/`?` terminator, respecting nested brackets. Callers must
/// strip any trailing `%...%`/`#...#` annotation first (via
/// `split_annotation`) so the string passed here ends right after the
/// terminator. Scans left-to-right tracking bracket depth and stops at the
/// first depth-0 '.' or '?'.
fn split_terminator(s: &str) -> PResult<(&str, bool, usize)> {
    let mut depth: i32 = 0;
    for (idx, ch) in s.char_indices() {
        match ch {
            '(' | '<' => depth += 1,
            ')' | '>' => depth -= 1,
            '.' if depth == 0 => return Ok((&s[..idx], false, idx)),
            '?' if depth == 0 => return Ok((&s[..idx], true, idx)),
            _ => {}
        }
        if depth < 0 {
            return Err(ParseError::new(idx, "balanced brackets"));
        }
    }
    Err(ParseError::new(s.len(), "statement terminator '.' or '?'"))
}

/// Split off a trailing `%f;c%` / `%f;c;p%` / `#p#` annotation, if present.
fn split_annotation(s: &str) -> (&str, &str) {
    let s = s.trim();
    if let Some(rest) = s.strip_suffix('%') {
        if let Some(start) = rest.rfind('%') {
            return (s[..start].trim_end(), &s[start..]);
        }
    }
    if let Some(rest) = s.strip_suffix('#') {
        if let Some(start) = rest.rfind('#') {
            return (s[..start].trim_end(), &s[start..]);
        }
    }
    (s, "")
}

fn parse_annotation(anno: &str, base_pos: usize) -> PResult<(Option<TruthValue>, Option<f64>)> {
    if anno.is_empty() {
        return Ok((None, None));
    }
    if let Some(inner) = anno.strip_prefix('%').and_then(|r| r.strip_suffix('%')) {
        let parts: Vec<&str> = inner.split(';').collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(ParseError::new(base_pos, "'%f;c%' or '%f;c;p%'"));
        }
        let f: f64 = parts[0]
            .trim()
            .parse()
            .map_err(|_| ParseError::new(base_pos, "numeric frequency"))?;
        let c: f64 = parts[1]
            .trim()
            .parse()
            .map_err(|_| ParseError::new(base_pos, "numeric confidence"))?;
        let p: f64 = if parts.len() == 3 {
            parts[2]
                .trim()
                .parse()
                .map_err(|_| ParseError::new(base_pos, "numeric priority"))?
        } else {
            0.8
        };
        return Ok((Some(TruthValue::new(f, c, p)), None));
    }
    if let Some(inner) = anno.strip_prefix('#').and_then(|r| r.strip_suffix('#')) {
        let p: f64 = inner
            .trim()
            .parse()
            .map_err(|_| ParseError::new(base_pos, "numeric priority"))?;
        return Ok((None, Some(p)));
    }
    Err(ParseError::new(base_pos, "'%...%' or '#...#' annotation"))
}

/// Recursive-descent term parser over the precedence table.
struct Parser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn parse_full_term(&mut self) -> PResult<Term> {
        self.skip_ws();
        let term = self.parse_implication_level()?;
        self.skip_ws();
        if self.pos != self.bytes.len() {
            return Err(ParseError::new(self.pos, "end of term"));
        }
        Ok(term)
    }

    fn skip_ws(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek_op(&self, op: &str) -> bool {
        self.input[self.pos..].starts_with(op)
    }

    // Precedence 1 (outermost): ==> and <=>
    fn parse_implication_level(&mut self) -> PResult<Term> {
        let left = self.parse_conjunction_level()?;
        self.skip_ws();
        if self.peek_op(IMPLICATION) {
            self.pos += IMPLICATION.len();
            self.skip_ws();
            let right = self.parse_implication_level()?;
            return Ok(Term::compound(TermType::Implication, vec![left, right]));
        }
        if self.peek_op(EQUIVALENCE) {
            self.pos += EQUIVALENCE.len();
            self.skip_ws();
            let right = self.parse_implication_level()?;
            return Ok(Term::compound(TermType::Equivalence, vec![left, right]));
        }
        Ok(left)
    }

    // Precedence 2: && and ||
    fn parse_conjunction_level(&mut self) -> PResult<Term> {
        let left = self.parse_inheritance_level()?;
        self.skip_ws();
        if self.peek_op(CONJUNCTION) {
            self.pos += CONJUNCTION.len();
            self.skip_ws();
            let right = self.parse_conjunction_level()?;
            return Ok(Term::compound(TermType::Conjunction, vec![left, right]));
        }
        if self.peek_op(DISJUNCTION) {
            self.pos += DISJUNCTION.len();
            self.skip_ws();
            let right = self.parse_conjunction_level()?;
            return Ok(Term::compound(TermType::Disjunction, vec![left, right]));
        }
        Ok(left)
    }

    // Precedence 3: --> and <->
    fn parse_inheritance_level(&mut self) -> PResult<Term> {
        let left = self.parse_primary()?;
        self.skip_ws();
        if self.peek_op(INHERITANCE) {
            self.pos += INHERITANCE.len();
            self.skip_ws();
            let right = self.parse_primary()?;
            return Ok(Term::compound(TermType::Inheritance, vec![left, right]));
        }
        if self.peek_op(SIMILARITY) {
            self.pos += SIMILARITY.len();
            self.skip_ws();
            let right = self.parse_primary()?;
            return Ok(Term::compound(TermType::Similarity, vec![left, right]));
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> PResult<Term> {
        self.skip_ws();
        if self.pos >= self.bytes.len() {
            return Err(ParseError::new(self.pos, "a term"));
        }

        match self.bytes[self.pos] {
            b'!' => {
                self.pos += 1;
                self.skip_ws();
                let inner = self.parse_primary()?;
                Ok(Term::compound(TermType::Negation, vec![inner]))
            }
            b'<' => self.parse_angle_bracket_term(),
            b'(' => self.parse_paren_term(),
            b'$' | b'?' => self.parse_variable(),
            _ => self.parse_atom(),
        }
    }

    /// `<term op term>` — an explicitly bracketed binary relation.
    fn parse_angle_bracket_term(&mut self) -> PResult<Term> {
        let start = self.pos;
        self.pos += 1; // consume '<'
        self.skip_ws();
        let left = self.parse_conjunction_level()?;
        self.skip_ws();
        let ty = if self.peek_op(INHERITANCE) {
            self.pos += INHERITANCE.len();
            TermType::Inheritance
        } else if self.peek_op(SIMILARITY) {
            self.pos += SIMILARITY.len();
            TermType::Similarity
        } else if self.peek_op(IMPLICATION) {
            self.pos += IMPLICATION.len();
            TermType::Implication
        } else if self.peek_op(EQUIVALENCE) {
            self.pos += EQUIVALENCE.len();
            TermType::Equivalence
        } else {
            return Err(ParseError::new(self.pos, "an infix operator"));
        };
        self.skip_ws();
        let right = self.parse_conjunction_level()?;
        self.skip_ws();
        if self.pos >= self.bytes.len() || self.bytes[self.pos] != b'>' {
            return Err(ParseError::new(start, "closing '>'"));
        }
        self.pos += 1;
        Ok(Term::compound(ty, vec![left, right]))
    }

    /// `(term (op term)+)`, `(,term…)`, `(*term…)`, `(/term…)`, `(\term…)`.
    fn parse_paren_term(&mut self) -> PResult<Term> {
        let start = self.pos;
        self.pos += 1; // consume '('
        self.skip_ws();

        if self.pos < self.bytes.len()
            && matches!(self.bytes[self.pos], b',' | b'*' | b'/' | b'\\')
        {
            let marker = self.bytes[self.pos];
            self.pos += 1;
            let args = self.parse_comma_list()?;
            self.expect_close_paren(start)?;
            let ty = match marker {
                b'/' => TermType::ImageExt,
                b'\\' => TermType::ImageInt,
                _ => TermType::Product,
            };
            return Ok(Term::compound(ty, args));
        }

        let first = self.parse_conjunction_level()?;
        self.skip_ws();

        if self.pos < self.bytes.len() && self.bytes[self.pos] == b',' {
            let mut args = vec![first];
            while self.pos < self.bytes.len() && self.bytes[self.pos] == b',' {
                self.pos += 1;
                self.skip_ws();
                args.push(self.parse_conjunction_level()?);
                self.skip_ws();
            }
            self.expect_close_paren(start)?;
            return Ok(Term::compound(TermType::Product, args));
        }

        if self.peek_op(CONJUNCTION) || self.peek_op(DISJUNCTION) {
            let mut ty = None;
            let mut args = vec![first];
            loop {
                self.skip_ws();
                if self.peek_op(CONJUNCTION) {
                    ty = Some(TermType::Conjunction);
                    self.pos += CONJUNCTION.len();
                } else if self.peek_op(DISJUNCTION) {
                    ty = Some(TermType::Disjunction);
                    self.pos += DISJUNCTION.len();
                } else {
                    break;
                }
                self.skip_ws();
                args.push(self.parse_inheritance_level()?);
            }
            self.expect_close_paren(start)?;
            return Ok(Term::compound(ty.unwrap_or(TermType::Conjunction), args));
        }

        self.expect_close_paren(start)?;
        Ok(first)
    }

    fn parse_comma_list(&mut self) -> PResult<Vec<Term>> {
        self.skip_ws();
        let mut args = vec![self.parse_conjunction_level()?];
        loop {
            self.skip_ws();
            if self.pos < self.bytes.len() && self.bytes[self.pos] == b',' {
                self.pos += 1;
                self.skip_ws();
                args.push(self.parse_conjunction_level()?);
            } else {
                break;
            }
        }
        Ok(args)
    }

    fn expect_close_paren(&mut self, open_pos: usize) -> PResult<()> {
        self.skip_ws();
        if self.pos >= self.bytes.len() || self.bytes[self.pos] != b')' {
            return Err(ParseError::new(open_pos, "closing ')'"));
        }
        self.pos += 1;
        Ok(())
    }

    fn parse_variable(&mut self) -> PResult<Term> {
        self.pos += 1; // consume '$' or '?'
        let name = self.take_identifier()?;
        Ok(Term::variable(name))
    }

    /// A bare atom, or — when the identifier names a `TermType` and is
    /// immediately followed by `(` — an explicit typed compound in the
    /// same `Type(arg1,arg2,…)` shape as a canonical edge id. This is the
    /// only surface syntax for term types with no dedicated infix/prefix
    /// operator (`TemporalRelation`, `Instance`, `Property`, `Term`);
    /// types that do have one (`Inheritance`, `Conjunction`, …) accept
    /// both forms.
    fn parse_atom(&mut self) -> PResult<Term> {
        let start = self.pos;
        let name = self.take_identifier()?;
        if self.pos < self.bytes.len() && self.bytes[self.pos] == b'(' {
            if let Some(ty) = TermType::from_name(&name) {
                self.pos += 1; // consume '('
                self.skip_ws();
                let args = if self.pos < self.bytes.len() && self.bytes[self.pos] == b')' {
                    Vec::new()
                } else {
                    self.parse_comma_list()?
                };
                self.expect_close_paren(start)?;
                return Ok(Term::compound(ty, args));
            }
        }
        Ok(Term::atom(name))
    }

    fn take_identifier(&mut self) -> PResult<String> {
        let start = self.pos;
        while self.pos < self.bytes.len() {
            let c = self.bytes[self.pos];
            if c.is_ascii_alphanumeric() || c == b'_' || c == b'-' && self.pos > start {
                // Disallow '-' from colliding with '-->' lookahead.
                if c == b'-' && self.input[self.pos..].starts_with(INHERITANCE) {
                    break;
                }
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(ParseError::new(start, "an identifier"));
        }
        Ok(self.input[start..self.pos].to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_inheritance_assertion() {
        let parsed = parse_statement("<a --> b>.").unwrap();
        assert_eq!(parsed.term.canonical(), "Inheritance(a,b)");
        assert!(!parsed.is_question);
        assert!(parsed.truth.is_none());
    }

    #[test]
    fn parses_truth_annotation() {
        let parsed = parse_statement("<a --> b>. %0.8;0.7%").unwrap();
        let tv = parsed.truth.unwrap();
        assert!((tv.frequency - 0.8).abs() < 1e-9);
        assert!((tv.confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn parses_priority_annotation() {
        let parsed = parse_statement("<a --> b>. #0.95#").unwrap();
        assert_eq!(parsed.priority, Some(0.95));
    }

    #[test]
    fn parses_question() {
        let parsed = parse_statement("<moon --> cheese>?").unwrap();
        assert!(parsed.is_question);
    }

    #[test]
    fn parses_negation() {
        let parsed = parse_statement("!<a --> b>.").unwrap();
        assert_eq!(parsed.term.canonical(), "Negation(Inheritance(a,b))");
    }

    #[test]
    fn parses_conjunction() {
        let parsed = parse_statement("(a && b).").unwrap();
        assert_eq!(parsed.term.canonical(), "Conjunction(a,b)");
    }

    #[test]
    fn parses_implication() {
        let parsed = parse_statement("<a ==> b>.").unwrap();
        assert_eq!(parsed.term.canonical(), "Implication(a,b)");
    }

    #[test]
    fn parses_product() {
        let parsed = parse_statement("(bird*flyer).").unwrap();
        assert_eq!(parsed.term.canonical(), "Product(bird,flyer)");
    }

    #[test]
    fn parses_variable() {
        let parsed = parse_statement("<$x --> bird>.").unwrap();
        assert_eq!(parsed.term.canonical(), "Inheritance($x,bird)");
    }

    #[test]
    fn parses_typed_compound_for_a_term_type_with_no_dedicated_operator() {
        let parsed = parse_statement("TemporalRelation(a,b,before). %0.9;0.9%").unwrap();
        assert_eq!(parsed.term.canonical(), "TemporalRelation(a,b,before)");
    }

    #[test]
    fn typed_compound_syntax_also_works_for_types_with_an_infix_form() {
        let parsed = parse_statement("Inheritance(tweety,bird).").unwrap();
        assert_eq!(parsed.term.canonical(), "Inheritance(tweety,bird)");
    }

    #[test]
    fn unbalanced_delimiters_fail_with_position() {
        let err = parse_statement("<a --> b.").unwrap_err();
        assert!(err.position > 0);
    }

    #[test]
    fn ignores_operators_inside_nested_brackets_when_finding_terminator() {
        let parsed = parse_statement("<(a && b) --> c>.").unwrap();
        assert_eq!(parsed.term.canonical(), "Inheritance(Conjunction(a,b),c)");
    }

    #[test]
    fn parses_penguin_non_flyer_example_from_scenario_s2() {
        let parsed =
            parse_statement("(penguin --> (bird*!flyer)). #0.95#").unwrap();
        assert_eq!(
            parsed.term.canonical(),
            "Inheritance(penguin,Product(bird,Negation(flyer)))"
        );
    }
}
