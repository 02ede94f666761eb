use std::borrow::Cow;

use regex::Regex;
use regex_syntax::ast::{self, parse::Parser, *};

/// Compiles ECMA 262 `pattern` into an unanchored [`Regex`].
pub(crate) fn compile(pattern: &str) -> Result<Regex, String> {
    let translated = translate(pattern).map_err(|e| e.to_owned())?;
    Regex::new(&translated).map_err(|e| e.to_string())
}

/// Rewrites ECMA 262 syntax that the regex crate reads differently.
/// Unknown escapes are left for the regex crate to reject.
pub(crate) fn translate(pattern: &str) -> Result<Cow<str>, &'static str> {
    let mut pattern = Cow::Borrowed(pattern);
    let mut ast = loop {
        match Parser::new().parse(&pattern) {
            Ok(ast) => break ast,
            Err(e) => match rewrite_escape(&e) {
                Some(s) => pattern = Cow::Owned(s),
                None => return Ok(pattern),
            },
        }
    };

    // each pass rewrites one class; repeat until nothing changes
    loop {
        let rewriter = ClassRewriter {
            pattern: &pattern,
            out: None,
        };
        let Some(s) = ast::visit(&ast, rewriter)? else {
            return Ok(pattern);
        };
        match Parser::new().parse(&s) {
            Ok(next) => {
                ast = next;
                pattern = Cow::Owned(s);
            }
            Err(_) => return Ok(pattern),
        }
    }
}

// escapes valid in ECMA 262 but rejected by the regex crate
fn rewrite_escape(e: &Error) -> Option<String> {
    if !matches!(e.kind(), ErrorKind::EscapeUnrecognized) {
        return None;
    }
    let pat = e.pattern();
    let (start, end) = (e.span().start.offset, e.span().end.offset);
    match &pat[start..end] {
        r"\/" => Some(format!("{}/{}", &pat[..start], &pat[end..])),
        r"\c" => {
            let letter = pat[end..].chars().next().filter(char::is_ascii_alphabetic)?;
            let ctrl = (letter as u8 % 32) as char;
            Some(format!("{}{ctrl}{}", &pat[..start], &pat[end + 1..]))
        }
        _ => None,
    }
}

// \d \w \s are ascii-only in ECMA 262 (\s has its own set)
struct ClassRewriter<'a> {
    pattern: &'a str,
    out: Option<String>,
}

impl<'a> ClassRewriter<'a> {
    fn replace(&mut self, perl: &ClassPerl) {
        let (set, negated) = match perl.kind {
            ClassPerlKind::Digit => ("0-9", perl.negated),
            ClassPerlKind::Word => ("A-Za-z0-9_", perl.negated),
            ClassPerlKind::Space => (
                " \t\n\r\u{000b}\u{000c}\u{00a0}\u{feff}\u{2003}\u{2029}",
                perl.negated,
            ),
        };
        let with = if negated {
            format!("[^{set}]")
        } else {
            format!("[{set}]")
        };
        let (start, end) = (perl.span.start.offset, perl.span.end.offset);
        self.out = Some(format!(
            "{}{with}{}",
            &self.pattern[..start],
            &self.pattern[end..]
        ));
    }
}

impl<'a> Visitor for ClassRewriter<'a> {
    type Output = Option<String>;
    type Err = &'static str;

    fn finish(self) -> Result<Self::Output, Self::Err> {
        Ok(self.out)
    }

    fn visit_class_set_item_pre(&mut self, item: &ClassSetItem) -> Result<(), Self::Err> {
        if self.out.is_none() {
            if let ClassSetItem::Perl(perl) = item {
                self.replace(perl);
            }
        }
        Ok(())
    }

    fn visit_post(&mut self, ast: &Ast) -> Result<(), Self::Err> {
        if self.out.is_some() {
            return Ok(());
        }
        match ast {
            Ast::Class(Class::Perl(perl)) => self.replace(perl),
            Ast::Literal(Literal {
                kind: LiteralKind::Special(SpecialLiteralKind::Bell),
                ..
            }) => return Err("\\a is not an ECMA 262 control escape"),
            _ => {}
        }
        Ok(())
    }
}
